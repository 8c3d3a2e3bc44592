//! Reader for the textual grammar format.
//!
//! ```text
//! # comments run to the end of the line
//! Expr -> Expr '+' Term | Term ;
//! Term -> 'id' | %empty ;
//! ```
//!
//! Identifiers that appear as the head of some rule are nonterminals, every
//! other symbol is a terminal. The head of the first rule is the start
//! symbol. The reader is itself built with this crate: a [`Lexer`] for the
//! tokens and an LR(1) table for the rules.

use crate::{
    automaton::StateID,
    grammar::{Grammar, GrammarDefError, NonterminalID, ProductionID, SymbolID, TerminalID},
    lexer::{Lexer, LexerError, Token, TokenKind},
    table::{Method, ParseTable, TableError},
    types::Map,
};
use kestrel_runtime::{parser::Parser, ParseError};

pub fn parse(source: &str) -> Result<Grammar, GrammarDefError> {
    let reader = Reader::new().map_err(|err| GrammarDefError::Other {
        msg: format!("failed to build the grammar reader: {}", err),
    })?;
    let rules = reader.read(source)?;
    define(&rules)
}

#[derive(Debug, thiserror::Error)]
enum ReaderError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Grammar(#[from] GrammarDefError),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// The rules of the grammar format itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MetaRule {
    RulesMany,
    RulesOne,
    Rule,
    AlternativesMany,
    AlternativesOne,
    SequenceMany,
    SequenceOne,
    SequenceEmpty,
    Symbol,
}

struct Reader {
    meta: Grammar,
    rules: Map<ProductionID, MetaRule>,
    lexer: Lexer<TerminalID>,
    table: ParseTable,
}

impl Reader {
    fn new() -> Result<Self, ReaderError> {
        use SymbolID::{N, T};

        let mut rules = Map::default();
        let mut terminals = Map::default();
        let meta = Grammar::define(|g| {
            let ident = g.terminal("ident")?;
            let quoted = g.terminal("quoted")?;
            let arrow = g.terminal("->")?;
            let bar = g.terminal("|")?;
            let semicolon = g.terminal(";")?;
            let empty = g.terminal("%empty")?;
            terminals.extend([
                ("ident", ident),
                ("quoted", quoted),
                ("arrow", arrow),
                ("bar", bar),
                ("semicolon", semicolon),
                ("empty", empty),
            ]);

            let rule_list = g.nonterminal("Rules")?;
            let rule = g.nonterminal("Rule")?;
            let alternatives = g.nonterminal("Alternatives")?;
            let sequence = g.nonterminal("Sequence")?;
            let symbol = g.nonterminal("Symbol")?;

            let productions = [
                (rule_list, vec![N(rule_list), N(rule)], MetaRule::RulesMany),
                (rule_list, vec![N(rule)], MetaRule::RulesOne),
                (
                    rule,
                    vec![T(ident), T(arrow), N(alternatives), T(semicolon)],
                    MetaRule::Rule,
                ),
                (
                    alternatives,
                    vec![N(alternatives), T(bar), N(sequence)],
                    MetaRule::AlternativesMany,
                ),
                (alternatives, vec![N(sequence)], MetaRule::AlternativesOne),
                (sequence, vec![N(sequence), N(symbol)], MetaRule::SequenceMany),
                (sequence, vec![N(symbol)], MetaRule::SequenceOne),
                (sequence, vec![T(empty)], MetaRule::SequenceEmpty),
                (symbol, vec![T(ident)], MetaRule::Symbol),
                (symbol, vec![T(quoted)], MetaRule::Symbol),
            ];
            for (head, body, kind) in productions {
                let id = g.production(head, body)?;
                rules.insert(id, kind);
            }
            Ok(())
        })?;

        let lexer = Lexer::define(|def| {
            def.skip("[ \t\r\n]+")?;
            def.skip("#[ -~\t]*")?;
            def.token("%empty", terminals["empty"])?;
            def.token("->", terminals["arrow"])?;
            def.token(r"\|", terminals["bar"])?;
            def.token(";", terminals["semicolon"])?;
            def.token("[A-Za-z_][A-Za-z0-9_']*", terminals["ident"])?;
            def.token("'[!-&(-~]+'", terminals["quoted"])?;
            Ok(())
        })?;

        let table = ParseTable::generate(&meta, Method::LR1)?;

        Ok(Self {
            meta,
            rules,
            lexer,
            table,
        })
    }

    fn read<'s>(&self, source: &'s str) -> Result<Vec<RuleDef<'s>>, GrammarDefError> {
        let tokens = self.lexer.tokenize(source);
        if let Some(invalid) = tokens.iter().find(|t| !t.is_valid()) {
            return Err(syntax_error(
                invalid,
                format!("unexpected character {:?}", invalid.lexeme),
            ));
        }

        // everything but the end marker
        let input: Vec<&Token<'s, TerminalID>> = tokens
            .iter()
            .filter(|t| t.terminal().is_some())
            .collect();
        let symbols: Vec<TerminalID> = input.iter().filter_map(|t| t.terminal().copied()).collect();

        let parser = Parser::new(&self.table);
        let derivation = match parser.parse(symbols) {
            Ok(derivation) => derivation,
            Err(err) => {
                let token = match input.get(err.index()).copied().or_else(|| tokens.last()) {
                    Some(token) => token,
                    None => return Err(err.to_string().into()),
                };
                return Err(self.parse_error(token, err));
            }
        };

        let root = derivation
            .evaluate(
                input.iter().copied(),
                Node::Token,
                |production, args| match self.rules.get(production) {
                    Some(rule) => reduce(*rule, args),
                    None => Node::Malformed,
                },
            )
            .map_err(|err| GrammarDefError::Other {
                msg: format!("failed to evaluate the grammar source: {}", err),
            })?;

        match root {
            Node::Rules(rules) => Ok(rules),
            _ => Err("failed to evaluate the grammar source".into()),
        }
    }

    fn parse_error(
        &self,
        token: &Token<'_, TerminalID>,
        err: ParseError<StateID>,
    ) -> GrammarDefError {
        let found = match token.kind {
            TokenKind::End => "end of input".to_owned(),
            _ => format!("`{}'", token.lexeme),
        };
        let msg = match err {
            ParseError::Syntax { state, .. } => {
                let expected: Vec<&str> = self
                    .table
                    .expected_terminals(state)
                    .map(|t| self.meta.terminals[&t].name())
                    .collect();
                format!(
                    "unexpected {}, expected one of: {}",
                    found,
                    expected.join(" ")
                )
            }
            err => format!("unexpected {} ({})", found, err),
        };
        syntax_error(token, msg)
    }
}

fn syntax_error(token: &Token<'_, TerminalID>, msg: String) -> GrammarDefError {
    GrammarDefError::Syntax {
        line: token.line,
        column: token.column,
        msg,
    }
}

#[derive(Debug)]
struct RuleDef<'s> {
    head: &'s str,
    alternatives: Vec<Vec<SymbolRef<'s>>>,
}

#[derive(Debug, Copy, Clone)]
struct SymbolRef<'s> {
    name: &'s str,
    quoted: bool,
}

#[derive(Debug)]
enum Node<'t, 's> {
    Token(&'t Token<'s, TerminalID>),
    Symbol(SymbolRef<'s>),
    Sequence(Vec<SymbolRef<'s>>),
    Alternatives(Vec<Vec<SymbolRef<'s>>>),
    Rule(RuleDef<'s>),
    Rules(Vec<RuleDef<'s>>),
    Malformed,
}

fn reduce<'t, 's>(rule: MetaRule, args: Vec<Node<'t, 's>>) -> Node<'t, 's> {
    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or(Node::Malformed);
    match rule {
        MetaRule::RulesMany => match (next(), next()) {
            (Node::Rules(mut rules), Node::Rule(rule)) => {
                rules.push(rule);
                Node::Rules(rules)
            }
            _ => Node::Malformed,
        },
        MetaRule::RulesOne => match next() {
            Node::Rule(rule) => Node::Rules(vec![rule]),
            _ => Node::Malformed,
        },
        MetaRule::Rule => match (next(), next(), next(), next()) {
            (Node::Token(head), _, Node::Alternatives(alternatives), _) => Node::Rule(RuleDef {
                head: head.lexeme,
                alternatives,
            }),
            _ => Node::Malformed,
        },
        MetaRule::AlternativesMany => match (next(), next(), next()) {
            (Node::Alternatives(mut alternatives), _, Node::Sequence(sequence)) => {
                alternatives.push(sequence);
                Node::Alternatives(alternatives)
            }
            _ => Node::Malformed,
        },
        MetaRule::AlternativesOne => match next() {
            Node::Sequence(sequence) => Node::Alternatives(vec![sequence]),
            _ => Node::Malformed,
        },
        MetaRule::SequenceMany => match (next(), next()) {
            (Node::Sequence(mut sequence), Node::Symbol(symbol)) => {
                sequence.push(symbol);
                Node::Sequence(sequence)
            }
            _ => Node::Malformed,
        },
        MetaRule::SequenceOne => match next() {
            Node::Symbol(symbol) => Node::Sequence(vec![symbol]),
            _ => Node::Malformed,
        },
        MetaRule::SequenceEmpty => Node::Sequence(vec![]),
        MetaRule::Symbol => match next() {
            Node::Token(token) => {
                let lexeme: &'s str = token.lexeme;
                let quoted = lexeme.starts_with('\'');
                let name = if quoted {
                    &lexeme[1..lexeme.len() - 1]
                } else {
                    lexeme
                };
                Node::Symbol(SymbolRef { name, quoted })
            }
            _ => Node::Malformed,
        },
    }
}

fn define(rules: &[RuleDef<'_>]) -> Result<Grammar, GrammarDefError> {
    Grammar::define(|g| {
        let mut nonterminals: Map<&str, NonterminalID> = Map::default();
        for rule in rules {
            if !nonterminals.contains_key(rule.head) {
                nonterminals.insert(rule.head, g.nonterminal(rule.head)?);
            }
        }

        let mut terminals: Map<&str, TerminalID> = Map::default();
        for symbol in rules.iter().flat_map(|r| r.alternatives.iter().flatten()) {
            let is_nonterminal = !symbol.quoted && nonterminals.contains_key(symbol.name);
            if !is_nonterminal && !terminals.contains_key(symbol.name) {
                terminals.insert(symbol.name, g.terminal(symbol.name)?);
            }
        }

        for rule in rules {
            let head = nonterminals[rule.head];
            for alternative in &rule.alternatives {
                let body = alternative.iter().map(|symbol| {
                    match (symbol.quoted, nonterminals.get(symbol.name)) {
                        (false, Some(n)) => SymbolID::N(*n),
                        _ => SymbolID::T(terminals[symbol.name]),
                    }
                });
                g.production(head, body.collect::<Vec<_>>())?;
            }
        }

        Ok(())
    })
}
