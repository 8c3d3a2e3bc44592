//! Canonical LR(0) collection, obtained by determinizing the item automaton.

use crate::{
    automaton::{NfaBuilder, StateID},
    collection::{CanonicalCollection, CollectionState, Item, LR0Item},
    grammar::{Grammar, ProductionID, SymbolID, TerminalSet},
    types::Map,
};

/// Build the canonical LR(0) collection of `g`.
///
/// Every production becomes a chain of item states linked by its body
/// symbols. An item whose next symbol is a nonterminal gets an epsilon edge
/// to the initial item of each production of that nonterminal. Subset
/// construction over this graph yields the item sets.
pub fn build(g: &Grammar) -> CanonicalCollection {
    let mut builder = NfaBuilder::<SymbolID, ()>::new();
    // NFA state index -> item
    let mut items: Vec<LR0Item> = vec![];
    let mut chains: Map<ProductionID, Vec<StateID>> = Map::default();

    for production in g.productions.values() {
        let mut chain = Vec::with_capacity(production.body().len() + 1);
        for dot in 0..=production.body().len() {
            chain.push(builder.add_state());
            items.push(LR0Item {
                production: production.id(),
                dot: dot as u16,
            });
        }
        builder.set_accepting(chain[production.body().len()], true);
        chains.insert(production.id(), chain);
    }

    for production in g.productions.values() {
        let chain = &chains[&production.id()];
        for (dot, symbol) in production.body().iter().enumerate() {
            builder.add_transition(chain[dot], *symbol, chain[dot + 1]);
            if let SymbolID::N(n) = symbol {
                for callee in g.productions_of(*n) {
                    builder.add_epsilon(chain[dot], chains[&callee.id()][0]);
                }
            }
        }
    }

    let start = chains[&ProductionID::ACCEPT][0];
    let nfa = builder.build(start);
    let dfa = nfa.determinize_with(|_| Some(()));

    let states = dfa
        .states()
        .map(|(_, state)| {
            let mut state_items: Vec<Item> = state
                .members()
                .iter()
                .map(|member| Item {
                    core: items[member.into_raw() as usize],
                    lookaheads: TerminalSet::default(),
                })
                .collect();
            state_items.sort_by_key(|item| item.core);
            CollectionState {
                items: state_items,
                transitions: state
                    .transitions()
                    .map(|(symbol, next)| (*symbol, next))
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        "LR(0): {} item states -> {} item sets",
        nfa.len(),
        states.len()
    );

    CanonicalCollection { states }
}
