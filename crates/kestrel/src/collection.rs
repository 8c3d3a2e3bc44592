//! Items and canonical collections shared by the LR(0) and LR(1) builders.

use crate::{
    automaton::StateID,
    grammar::{Grammar, ProductionID, SymbolID, TerminalSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// A production with a dot position, `A -> X . Y Z`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub dot: u16,
}

impl LR0Item {
    pub const fn new(production: ProductionID) -> Self {
        Self { production, dot: 0 }
    }

    /// The symbol right after the dot, or `None` for a completed item.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .body()
            .get(self.dot as usize)
            .copied()
    }

    /// The symbols after the one right after the dot.
    pub fn rest<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        let body = g.production(self.production).body();
        body.get(self.dot as usize + 1..).unwrap_or(&[])
    }

    pub fn advance(self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.dot as usize == g.production(self.production).body().len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} -> [", g.nonterminals[&production.head()])?;
            for (i, symbol) in production.body().iter().enumerate() {
                if i == self.dot as usize {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol(*symbol))?;
            }
            if production.body().len() == self.dot as usize {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// An item together with its lookahead terminals. The lookaheads of an
/// LR(0) collection are always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub core: LR0Item,
    pub lookaheads: TerminalSet,
}

#[derive(Debug, Clone)]
pub struct CollectionState {
    /// Items ordered by center.
    pub items: Vec<Item>,
    pub transitions: Map<SymbolID, StateID>,
}

impl CollectionState {
    /// Items with the dot at the end of their production.
    pub fn completed_items<'a>(&'a self, g: &'a Grammar) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |item| item.core.is_complete(g))
    }
}

/// The item-set automaton of a grammar. State `i` has id `StateID::from_raw(i)`,
/// and the initial state is [`StateID::START`].
#[derive(Debug, Clone)]
pub struct CanonicalCollection {
    pub states: Vec<CollectionState>,
}

impl CanonicalCollection {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateID) -> &CollectionState {
        &self.states[id.into_raw() as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateID, &CollectionState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_raw(i as u32), state))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## items")?;
                for item in &state.items {
                    write!(f, "- {}", item.core.display(g))?;
                    if !item.lookaheads.is_empty() {
                        write!(f, "  {}", item.lookaheads.display(g))?;
                    }
                    writeln!(f)?;
                }
                if !state.transitions.is_empty() {
                    writeln!(f, "## transitions")?;
                    for (symbol, next) in &state.transitions {
                        writeln!(f, "- {} => {:?}", g.symbol(*symbol), next)?;
                    }
                }
            }
            Ok(())
        })
    }
}
