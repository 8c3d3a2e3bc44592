//! The implementation of LR(1) automaton.

use crate::{
    automaton::StateID,
    collection::{CanonicalCollection, CollectionState, Item, LR0Item},
    first_follow::FirstSets,
    grammar::{Grammar, ProductionID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Queue},
};
use std::collections::{BTreeMap, VecDeque};

// - key: the center of an item
// - value: the lookaheads, unioned over every item sharing that center
type ItemSet = BTreeMap<LR0Item, TerminalSet>;

/// Build the canonical LR(1) collection of `g`.
///
/// Items with the same center inside one item set are kept as a single item
/// whose lookaheads are the union of theirs.
pub fn build(g: &Grammar, first: &FirstSets) -> CanonicalCollection {
    let gen = Generator { g, first };

    let mut initial = ItemSet::new();
    initial.insert(
        LR0Item::new(ProductionID::ACCEPT),
        Some(TerminalID::EOI).into_iter().collect(),
    );
    gen.closure(&mut initial);

    let mut states = States::default();
    states.intern(initial);

    while let Some(current) = states.pending.pop_front() {
        let items: ItemSet = states.list[current.into_raw() as usize]
            .items
            .iter()
            .map(|item| (item.core, item.lookaheads.clone()))
            .collect();

        for (symbol, mut next) in gen.kernels(&items) {
            gen.closure(&mut next);
            let next = states.intern(next);
            states.list[current.into_raw() as usize]
                .transitions
                .insert(symbol, next);
        }
    }

    tracing::debug!("LR(1): {} item sets", states.list.len());

    CanonicalCollection {
        states: states.list,
    }
}

#[derive(Default)]
struct States {
    list: Vec<CollectionState>,
    // item sets are compared by their sorted contents
    index: Map<ItemSet, StateID>,
    pending: VecDeque<StateID>,
}

impl States {
    fn intern(&mut self, item_set: ItemSet) -> StateID {
        if let Some(id) = self.index.get(&item_set) {
            return *id;
        }
        let id = StateID::from_raw(self.list.len() as u32);
        self.list.push(CollectionState {
            items: item_set
                .iter()
                .map(|(core, lookaheads)| Item {
                    core: *core,
                    lookaheads: lookaheads.clone(),
                })
                .collect(),
            transitions: Map::default(),
        });
        self.index.insert(item_set, id);
        self.pending.push_back(id);
        id
    }
}

struct Generator<'g> {
    g: &'g Grammar,
    first: &'g FirstSets,
}

impl Generator<'_> {
    /// Add every item predicted by `items` until nothing changes.
    fn closure(&self, items: &mut ItemSet) {
        let mut queue: Queue<LR0Item> = items.keys().copied().collect();

        while let Some(core) = queue.pop() {
            // [A -> alpha . N beta, L]
            let n = match core.next_symbol(self.g) {
                Some(SymbolID::N(n)) => n,
                _ => continue,
            };

            // FIRST(beta), plus L when beta can vanish
            let mut lookaheads = self.first.of_sequence(core.rest(self.g));
            if lookaheads.remove(TerminalID::EPSILON) {
                lookaheads.union_with(&items[&core]);
            }

            for production in self.g.productions_of(n) {
                let predicted = LR0Item::new(production.id());
                let entry = items.entry(predicted).or_default();
                if entry.is_empty() || !lookaheads.is_subset(entry) {
                    entry.union_with(&lookaheads);
                    // the new lookaheads have to flow into its own predictions
                    queue.push(predicted);
                }
            }
        }
    }

    /// The items obtained by moving the dot over each symbol, before closure.
    /// Symbols are listed in the order they first appear after a dot.
    fn kernels(&self, items: &ItemSet) -> Map<SymbolID, ItemSet> {
        let mut kernels: Map<SymbolID, ItemSet> = Map::default();
        for (core, lookaheads) in items {
            if let Some(symbol) = core.next_symbol(self.g) {
                kernels
                    .entry(symbol)
                    .or_default()
                    .entry(core.advance())
                    .or_default()
                    .union_with(lookaheads);
            }
        }
        kernels
    }
}
