//! FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The FIRST set of every nonterminal symbol.
///
/// A set contains [`TerminalID::EPSILON`] iff its nonterminal is nullable.
#[derive(Debug)]
pub struct FirstSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Self {
        let mut map: Map<NonterminalID, TerminalSet> = g
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();

        // Repeat until no set grows.
        let mut changed = true;
        let mut rounds = 0;
        while changed {
            changed = false;
            rounds += 1;
            for production in g.productions.values() {
                let mut added = TerminalSet::default();
                let mut nullable = true;
                for symbol in production.body() {
                    match symbol {
                        SymbolID::T(t) => {
                            added.insert(*t);
                            nullable = false;
                        }
                        SymbolID::N(n) => {
                            let first = &map[n];
                            added.union_with(first);
                            added.remove(TerminalID::EPSILON);
                            nullable = first.contains(TerminalID::EPSILON);
                        }
                    }
                    if !nullable {
                        break;
                    }
                }
                if nullable {
                    added.insert(TerminalID::EPSILON);
                }

                let current = &mut map[&production.head()];
                if !added.is_subset(current) {
                    current.union_with(&added);
                    changed = true;
                }
            }
        }
        tracing::trace!("FIRST sets converged after {} rounds", rounds);

        Self { map }
    }

    /// `FIRST(symbol)`
    pub fn get(&self, symbol: SymbolID) -> TerminalSet {
        match symbol {
            SymbolID::T(t) => Some(t).into_iter().collect(),
            SymbolID::N(n) => self.map[&n].clone(),
        }
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.map[&n].contains(TerminalID::EPSILON)
    }

    /// `FIRST(symbols)`. Contains [`TerminalID::EPSILON`] iff every symbol
    /// in the sequence is nullable, in particular when it is empty.
    pub fn of_sequence(&self, symbols: &[SymbolID]) -> TerminalSet {
        let mut res = TerminalSet::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    res.insert(*t);
                    return res;
                }
                SymbolID::N(n) => {
                    let first = &self.map[n];
                    res.union_with(first);
                    res.remove(TerminalID::EPSILON);
                    if !first.contains(TerminalID::EPSILON) {
                        return res;
                    }
                }
            }
        }
        res.insert(TerminalID::EPSILON);
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_sets("FIRST", &self.map, g)
    }
}

/// The FOLLOW set of every nonterminal symbol.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn new(g: &Grammar, first: &FirstSets) -> Self {
        let mut map: Map<NonterminalID, TerminalSet> = g
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();
        map[&NonterminalID::START].insert(TerminalID::EOI);
        map[&g.start_symbol].insert(TerminalID::EOI);

        let mut changed = true;
        while changed {
            changed = false;
            for production in g.productions.values() {
                let body = production.body();
                for (i, symbol) in body.iter().enumerate() {
                    let n = match symbol {
                        SymbolID::N(n) => *n,
                        SymbolID::T(..) => continue,
                    };

                    let mut added = first.of_sequence(&body[i + 1..]);
                    if added.remove(TerminalID::EPSILON) {
                        added.union_with(&map[&production.head()]);
                    }

                    let current = &mut map[&n];
                    if !added.is_subset(current) {
                        current.union_with(&added);
                        changed = true;
                    }
                }
            }
        }

        Self { map }
    }

    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        &self.map[&n]
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_sets("FOLLOW", &self.map, g)
    }
}

fn display_sets<'g>(
    label: &'g str,
    map: &'g Map<NonterminalID, TerminalSet>,
    g: &'g Grammar,
) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        for (n, set) in map {
            writeln!(f, "{}({}) = {}", label, g.nonterminals[n], set.display(g))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::{N, T};

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminals[&t].name().to_owned()).collect()
    }

    #[test]
    fn expression_grammar() {
        // E -> T E' ; E' -> + T E' | ε ; T -> F T' ; T' -> * F T' | ε ; F -> ( E ) | id
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let star = g.terminal("*")?;
            let lparen = g.terminal("(")?;
            let rparen = g.terminal(")")?;
            let id = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            let e_ = g.nonterminal("E'")?;
            let t = g.nonterminal("T")?;
            let t_ = g.nonterminal("T'")?;
            let f = g.nonterminal("F")?;
            g.production(e, [N(t), N(e_)])?;
            g.production(e_, [T(plus), N(t), N(e_)])?;
            g.production(e_, [])?;
            g.production(t, [N(f), N(t_)])?;
            g.production(t_, [T(star), N(f), N(t_)])?;
            g.production(t_, [])?;
            g.production(f, [T(lparen), N(e), T(rparen)])?;
            g.production(f, [T(id)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        let n = |name| g.nonterminal_by_name(name).unwrap();

        assert_eq!(names(&g, &first.get(N(n("E")))), ["(", "id"]);
        assert_eq!(names(&g, &first.get(N(n("E'")))), ["$epsilon", "+"]);
        assert_eq!(names(&g, &first.get(N(n("T'")))), ["$epsilon", "*"]);
        assert!(first.is_nullable(n("T'")));
        assert!(!first.is_nullable(n("F")));

        assert_eq!(names(&g, follow.get(n("E"))), ["$eoi", ")"]);
        assert_eq!(names(&g, follow.get(n("E'"))), ["$eoi", ")"]);
        assert_eq!(names(&g, follow.get(n("T"))), ["$eoi", "+", ")"]);
        assert_eq!(names(&g, follow.get(n("F"))), ["$eoi", "+", "*", ")"]);
    }

    #[test]
    fn nullable_chain_and_sequences() {
        // S -> A B c ; A -> a | ε ; B -> B b | ε
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;
            g.production(s, [N(a_), N(b_), T(c)])?;
            g.production(a_, [T(a)])?;
            g.production(a_, [])?;
            g.production(b_, [N(b_), T(b)])?;
            g.production(b_, [])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        let a = g.nonterminal_by_name("A").unwrap();
        let b = g.nonterminal_by_name("B").unwrap();

        assert_eq!(names(&g, &first.get(N(g.start_symbol))), ["a", "b", "c"]);
        assert_eq!(names(&g, &first.of_sequence(&[N(a), N(b)])), ["$epsilon", "a", "b"]);
        assert_eq!(names(&g, &first.of_sequence(&[])), ["$epsilon"]);
        assert_eq!(names(&g, follow.get(a)), ["b", "c"]);
        assert_eq!(names(&g, follow.get(b)), ["b", "c"]);
    }
}
