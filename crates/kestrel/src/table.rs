//! Calculation of the parse table with conflict detection.

use crate::{
    automaton::StateID,
    collection::CanonicalCollection,
    first_follow::{FirstSets, FollowSets},
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    lr0, lr1,
    types::Map,
    util::display_fn,
};
use kestrel_runtime::{definition as rt, parser::Token};
use std::fmt;

/// How the item sets and the reduce lookaheads are computed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Method {
    /// LR(0) item sets, reducing on the FOLLOW set of the production head.
    SLR1,
    /// LR(1) item sets, reducing on the lookaheads of each item.
    #[default]
    LR1,
}

impl Method {
    /// Build the canonical collection this method works on.
    pub fn collection(self, g: &Grammar, first: &FirstSets) -> CanonicalCollection {
        match self {
            Method::SLR1 => lr0::build(g),
            Method::LR1 => lr1::build(g, first),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::SLR1 => f.write_str("SLR(1)"),
            Method::LR1 => f.write_str("LR(1)"),
        }
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(n) => write!(f, "shift({:?})", n),
            Action::Reduce(p) => write!(f, "reduce({})", p),
            Action::Accept => f.write_str("accept"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error(
        "conflict in state {state:?} on `{terminal_name}': {existing} vs {incoming}{detail}"
    )]
    Conflict {
        state: StateID,
        terminal: TerminalID,
        terminal_name: String,
        existing: Action,
        incoming: Action,
        /// The productions involved, rendered for humans.
        detail: String,
    },
}

#[derive(Debug, Default)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// A conflict-free table. Read-only once generated.
#[derive(Debug)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
    // head and body length of every production, for reductions
    reductions: Map<ProductionID, (NonterminalID, usize)>,
}

impl ParseTable {
    pub fn generate(g: &Grammar, method: Method) -> Result<Self, TableError> {
        let first = FirstSets::new(g);
        let collection = method.collection(g, &first);
        let follow = match method {
            Method::SLR1 => Some(FollowSets::new(g, &first)),
            Method::LR1 => None,
        };
        let table = Self::from_collection(g, &collection, follow.as_ref())?;
        tracing::debug!("{} table: {} states", method, table.states.len());
        Ok(table)
    }

    /// Fill the table from an item-set automaton.
    ///
    /// With `follow`, completed items reduce on the FOLLOW set of their
    /// head. Without it, they reduce on their own lookaheads.
    pub fn from_collection(
        g: &Grammar,
        collection: &CanonicalCollection,
        follow: Option<&FollowSets>,
    ) -> Result<Self, TableError> {
        let mut states = Map::default();
        for (id, state) in collection.iter() {
            let mut row = ParseTableRow::default();

            for (symbol, next) in &state.transitions {
                match symbol {
                    SymbolID::T(t) => register(g, id, &mut row, *t, Action::Shift(*next))?,
                    SymbolID::N(n) => {
                        row.gotos.insert(*n, *next);
                    }
                }
            }

            for item in state.completed_items(g) {
                let production = item.core.production;
                if production == ProductionID::ACCEPT {
                    register(g, id, &mut row, TerminalID::EOI, Action::Accept)?;
                    continue;
                }
                let lookaheads = match follow {
                    Some(follow) => follow.get(g.production(production).head()),
                    None => &item.lookaheads,
                };
                for t in lookaheads.iter() {
                    register(g, id, &mut row, t, Action::Reduce(production))?;
                }
            }

            states.insert(id, row);
        }

        let reductions = g
            .productions
            .values()
            .map(|p| (p.id(), (p.head(), p.body().len())))
            .collect();

        Ok(Self { states, reductions })
    }

    pub fn action(&self, state: StateID, terminal: TerminalID) -> Option<Action> {
        self.states.get(&state)?.actions.get(&terminal).copied()
    }

    pub fn goto(&self, state: StateID, nonterminal: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&nonterminal).copied()
    }

    /// The terminals that have an action in `state`.
    pub fn expected_terminals(&self, state: StateID) -> impl Iterator<Item = TerminalID> + '_ {
        self.states
            .get(&state)
            .into_iter()
            .flat_map(|row| row.actions.keys().copied())
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                for (token, action) in &row.actions {
                    let token = &g.terminals[token];
                    match action {
                        Action::Shift(n) => {
                            writeln!(f, "- {} => shift({:?})", token, n)?;
                        }
                        Action::Reduce(reduce) => {
                            let reduce = g.production(*reduce);
                            writeln!(f, "- {} => reduce({})", token, reduce.display(g))?;
                        }
                        Action::Accept => {
                            writeln!(f, "- {} => accept", token)?;
                        }
                    }
                }

                if !row.gotos.is_empty() {
                    writeln!(f, "## gotos")?;
                    for (symbol, goto) in &row.gotos {
                        writeln!(f, "- {} => goto({:?})", g.nonterminals[symbol], goto)?;
                    }
                }
            }
            Ok(())
        })
    }
}

fn register(
    g: &Grammar,
    state: StateID,
    row: &mut ParseTableRow,
    terminal: TerminalID,
    incoming: Action,
) -> Result<(), TableError> {
    match row.actions.get(&terminal) {
        None => {
            row.actions.insert(terminal, incoming);
            Ok(())
        }
        Some(existing) if *existing == incoming => Ok(()),
        Some(existing) => {
            let mut detail = String::new();
            for action in [existing, &incoming] {
                if let Action::Reduce(p) = action {
                    detail.push_str(&format!("\n  {}: {}", p, g.production(*p).display(g)));
                }
            }
            Err(TableError::Conflict {
                state,
                terminal,
                terminal_name: g.terminals[&terminal].name().to_owned(),
                existing: *existing,
                incoming,
                detail,
            })
        }
    }
}

impl rt::ParseTable for ParseTable {
    type State = StateID;
    type Symbol = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = ProductionID;

    fn initial_state(&self) -> Self::State {
        StateID::START
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> rt::ParseAction<Self::State, Self::Nonterminal, Self::Reduce> {
        let terminal = lookahead.unwrap_or(TerminalID::EOI);
        match self.action(current, terminal) {
            Some(Action::Shift(next)) => rt::ParseAction::Shift(next),
            Some(Action::Reduce(production)) => match self.reductions.get(&production) {
                Some(&(head, arity)) => rt::ParseAction::Reduce {
                    production,
                    head,
                    arity,
                },
                None => rt::ParseAction::Error,
            },
            Some(Action::Accept) => rt::ParseAction::Accept,
            None => rt::ParseAction::Error,
        }
    }

    fn goto(&self, current: Self::State, nonterminal: Self::Nonterminal) -> Option<Self::State> {
        self.goto(current, nonterminal)
    }
}

impl Token<TerminalID> for TerminalID {
    fn as_symbol(&self) -> TerminalID {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;
    use kestrel_runtime::{parser::Parser, ParseError};

    fn terminals(g: &Grammar, names: &str) -> Vec<TerminalID> {
        names
            .split_whitespace()
            .map(|name| g.terminal_by_name(name).unwrap())
            .collect()
    }

    // S -> L = R | R ; L -> * R | id ; R -> L
    fn assignment_grammar() -> Grammar {
        Grammar::define(|g| {
            let eq = g.terminal("=")?;
            let star = g.terminal("*")?;
            let id = g.terminal("id")?;
            let s = g.nonterminal("S")?;
            let l = g.nonterminal("L")?;
            let r = g.nonterminal("R")?;
            g.production(s, [N(l), T(eq), N(r)])?;
            g.production(s, [N(r)])?;
            g.production(l, [T(star), N(r)])?;
            g.production(l, [T(id)])?;
            g.production(r, [N(l)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn lr1_accepts_what_slr1_rejects() {
        let g = assignment_grammar();

        let err = ParseTable::generate(&g, Method::SLR1).unwrap_err();
        let TableError::Conflict {
            terminal_name,
            existing,
            incoming,
            ..
        } = err;
        assert_eq!(terminal_name, "=");
        assert!(matches!(existing, Action::Shift(..)));
        assert!(matches!(incoming, Action::Reduce(..)));

        let table = ParseTable::generate(&g, Method::LR1).unwrap();
        let parser = Parser::new(&table);
        assert!(parser.parse(terminals(&g, "* id = id")).is_ok());
        assert!(parser.parse(terminals(&g, "id")).is_ok());
        let err = parser.parse(terminals(&g, "id = = id")).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { index: 2, .. }));
    }

    #[test]
    fn reduce_reduce_conflict_names_state_and_terminal() {
        // S -> A | B ; A -> x ; B -> x
        let g = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.production(s, [N(a)])?;
            g.production(s, [N(b)])?;
            g.production(a, [T(x)])?;
            g.production(b, [T(x)])?;
            Ok(())
        })
        .unwrap();

        for method in [Method::SLR1, Method::LR1] {
            let err = ParseTable::generate(&g, method).unwrap_err();
            let TableError::Conflict {
                state,
                terminal,
                existing,
                incoming,
                ..
            } = &err;
            assert_ne!(*state, StateID::START);
            assert_eq!(*terminal, TerminalID::EOI);
            assert!(matches!(existing, Action::Reduce(..)));
            assert!(matches!(incoming, Action::Reduce(..)));
            assert!(err.to_string().contains("`$eoi'"));
        }
    }

    #[test]
    fn one_action_per_entry_and_accept_on_eoi() {
        let g = assignment_grammar();
        let table = ParseTable::generate(&g, Method::LR1).unwrap();

        let accepting: Vec<_> = table
            .states
            .iter()
            .filter(|(_, row)| row.actions.get(&TerminalID::EOI) == Some(&Action::Accept))
            .collect();
        assert_eq!(accepting.len(), 1);

        let start = g.start_symbol;
        let after_start = table.goto(StateID::START, start).unwrap();
        assert_eq!(table.action(after_start, TerminalID::EOI), Some(Action::Accept));

        let expected: Vec<_> = table.expected_terminals(StateID::START).collect();
        assert_eq!(expected, terminals(&g, "* id"));
    }
}
