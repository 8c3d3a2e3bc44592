//! Grammar types.

use crate::{
    types::Map,
    util::{display_fn, write_separated},
};
use std::{borrow::Cow, fmt, fs, hash::Hash, io, marker::PhantomData, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    /// Reserved symbol standing for the empty string inside FIRST sets.
    /// It never appears in a production body.
    pub const EPSILON: Self = Self::from_raw(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    pub const fn is_eoi(self) -> bool {
        self.raw == Self::EOI.raw
    }

    pub const fn is_epsilon(self) -> bool {
        self.raw == Self::EPSILON.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The head of the augmented start production.
    pub const START: Self = Self::from_raw(0);
    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Cow<'static, str>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented production `$start -> S`.
    pub const ACCEPT: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// A production rule `head -> body`.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    head: NonterminalID,
    body: Vec<SymbolID>,
}
impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    pub fn head(&self) -> NonterminalID {
        self.head
    }

    /// The right-hand side. Empty for an epsilon production.
    pub fn body(&self) -> &[SymbolID] {
        &self.body[..]
    }

    // `"Head -> S1 S2 S3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminals[&self.head])?;
            if self.body.is_empty() {
                return f.write_str(" ε");
            }
            for symbol in &self.body {
                write!(f, " {}", g.symbol(*symbol))?;
            }
            Ok(())
        })
    }
}

/// A set of terminal symbols, stored as a bit set over the raw ids.
#[derive(Debug, Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // raw ids always come from a u16
        self.inner.iter().map(|raw| TerminalID::from_raw(raw as u16))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            write_separated(f, ", ", self.iter().map(|t| &g.terminals[&t]))?;
            f.write_str("}")
        })
    }
}

// Equality and ordering look at the members only, never at the capacity
// of the underlying storage.
impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}

impl Hash for TerminalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for t in self.iter() {
            t.hash(state);
        }
    }
}

impl PartialOrd for TerminalSet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TerminalSet {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

/// The grammar definition used to derive the parser tables.
///
/// The augmented production [`ProductionID::ACCEPT`] (`$start -> S`) is
/// always present.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(f, "{}: {}", production.id(), production.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        crate::syntax::parse(source)
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_production_id: ProductionID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$eoi".into(),
            },
        );
        def.terminals.insert(
            TerminalID::EPSILON,
            Terminal {
                id: TerminalID::EPSILON,
                name: "$epsilon".into(),
            },
        );

        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: "$start".into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Iterate over the productions whose head is `head`, in declaration order.
    pub fn productions_of(&self, head: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.productions.values().filter(move |p| p.head == head)
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id)
    }

    pub fn symbol(&self, symbol: SymbolID) -> impl fmt::Display + '_ {
        display_fn(move |f| match symbol {
            SymbolID::T(t) => write!(f, "{}", self.terminals[&t]),
            SymbolID::N(n) => write!(f, "{}", self.nonterminals[&n]),
        })
    }

    /// Terminals that may appear in the input, excluding the reserved ones.
    pub fn user_terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals
            .values()
            .filter(|t| t.id != TerminalID::EOI && t.id != TerminalID::EPSILON)
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        verify_name(name)?;
        if self.is_declared(name) {
            return Err(GrammarDefError::DuplicateSymbol { name: name.into() });
        }

        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or("too many terminal symbols")?;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned().into(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        verify_name(name)?;
        if self.is_declared(name) {
            return Err(GrammarDefError::DuplicateSymbol { name: name.into() });
        }

        let id = NonterminalID::from_raw(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or("too many nonterminal symbols")?;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned().into(),
            },
        );

        Ok(id)
    }

    /// Add the production `head -> body` to this grammar.
    ///
    /// The returned id identifies the production in reduction traces.
    pub fn production<I>(&mut self, head: NonterminalID, body: I) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if head == NonterminalID::START || !self.nonterminals.contains_key(&head) {
            return Err("unknown or reserved production head".into());
        }

        let body: Vec<SymbolID> = body.into_iter().collect();
        // item dots are stored as u16
        if body.len() > usize::from(u16::MAX) {
            return Err("the production body is too long".into());
        }
        for symbol in &body {
            let known = match symbol {
                SymbolID::T(t) => {
                    *t != TerminalID::EOI && *t != TerminalID::EPSILON && self.terminals.contains_key(t)
                }
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
            };
            if !known {
                return Err(format!("unknown or reserved symbol {:?} in a production body", symbol).into());
            }
        }

        if let Some(existing) = self
            .productions
            .values()
            .find(|p| p.head == head && p.body == body)
        {
            return Err(GrammarDefError::DuplicateProduction {
                id: existing.id,
                head: self.nonterminals[&head].name.to_string(),
            });
        }

        let id = ProductionID::from_raw(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or("too many productions")?;
        self.productions.insert(id, Production { id, head, body });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UnknownStartSymbol);
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn is_declared(&self, name: &str) -> bool {
        self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name)
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // Without an explicit start symbol, use the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarDefError::EmptyGrammar)?,
        };

        self.productions.insert(
            ProductionID::ACCEPT,
            Production {
                id: ProductionID::ACCEPT,
                head: NonterminalID::START,
                body: vec![SymbolID::N(start)],
            },
        );
        // keep `$accept` first so iteration follows id order
        self.productions.sort_keys();

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(#[source] io::Error),

    #[error("syntax error at {line}:{column}: {msg}")]
    Syntax {
        line: usize,
        column: usize,
        msg: String,
    },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("duplicate production for `{head}' (first declared as {id})")]
    DuplicateProduction { id: ProductionID, head: String },

    #[error("the start symbol is not a declared nonterminal")]
    UnknownStartSymbol,

    #[error("the grammar has no nonterminal symbols")]
    EmptyGrammar,

    #[error("{}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_name(name: &str) -> Result<(), GrammarDefError> {
    if name.is_empty() {
        return Err("the symbol name must not be empty".into());
    }
    if name.starts_with('$') {
        return Err(format!("`{}': names starting with `$' are reserved", name).into());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("`{}': the symbol name must not contain whitespace", name).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::{N, T};

    #[test]
    fn define_assigns_reserved_ids() {
        let mut handles = vec![];
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            handles.push(g.production(s, [T(a), N(s)])?);
            handles.push(g.production(s, [])?);
            Ok(())
        })
        .unwrap();

        assert_eq!(g.start_symbol, g.nonterminal_by_name("S").unwrap());
        assert_eq!(g.terminals[&TerminalID::EOI].name(), "$eoi");
        assert!(TerminalID::EOI.is_eoi());
        assert!(TerminalID::EPSILON.is_epsilon());

        let accept = g.production(ProductionID::ACCEPT);
        assert_eq!(accept.head(), NonterminalID::START);
        assert_eq!(accept.body(), [N(g.start_symbol)]);
        assert_eq!(g.productions.keys().next(), Some(&ProductionID::ACCEPT));

        assert_eq!(handles.len(), 2);
        assert_ne!(handles[0], handles[1]);
        assert_eq!(g.production(handles[1]).display(&g).to_string(), "S -> ε");
        assert_eq!(g.production(handles[0]).display(&g).to_string(), "S -> a S");
        assert_eq!(g.productions_of(g.start_symbol).count(), 2);
    }

    #[test]
    fn explicit_start_symbol() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let x = g.nonterminal("X")?;
            let y = g.nonterminal("Y")?;
            g.production(x, [T(a)])?;
            g.production(y, [N(x)])?;
            g.start_symbol(y)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(g.nonterminals[&g.start_symbol].name(), "Y");
    }

    #[test]
    fn rejects_bad_definitions() {
        let err = Grammar::define(|g| {
            g.terminal("a")?;
            g.nonterminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));

        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.production(s, [T(a)])?;
            g.production(s, [T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateProduction { .. }));

        let err = Grammar::define(|g| {
            g.terminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::EmptyGrammar));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.production(s, [T(TerminalID::EOI)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Other { .. }));

        assert!(Grammar::define(|g| g.terminal("$x").map(drop)).is_err());
        assert!(Grammar::define(|g| g.terminal("a b").map(drop)).is_err());
    }

    #[test]
    fn rejects_bodies_longer_than_a_dot_can_index() {
        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.production(s, vec![T(a); usize::from(u16::MAX) + 1])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Other { .. }));
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn terminal_set_compares_by_members() {
        let mut a: TerminalSet = [TerminalID::from_raw(3), TerminalID::EOI].into_iter().collect();
        let b: TerminalSet = [TerminalID::EOI, TerminalID::from_raw(3)].into_iter().collect();
        assert_eq!(a, b);

        a.insert(TerminalID::from_raw(100));
        a.remove(TerminalID::from_raw(100));
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(b.is_subset(&a));
        assert_eq!(a.iter().collect::<Vec<_>>(), [TerminalID::EOI, TerminalID::from_raw(3)]);
    }
}
