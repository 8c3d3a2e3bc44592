//! Regular expressions and their Thompson construction.

use crate::automaton::{Nfa, NfaBuilder, StateID};
use std::fmt;

/// The syntax tree of a regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Regex {
    /// Matches the empty string.
    Empty,
    Literal(char),
    /// Any character in one of the inclusive ranges.
    Class(Vec<(char, char)>),
    Concat(Box<Regex>, Box<Regex>),
    Alt(Box<Regex>, Box<Regex>),
    Star(Box<Regex>),
    Plus(Box<Regex>),
    Optional(Box<Regex>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{kind} (at position {position})")]
pub struct RegexError {
    /// Character offset in the pattern where the problem was found.
    pub position: usize,
    pub kind: RegexErrorKind,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegexErrorKind {
    #[error("unclosed group")]
    UnclosedGroup,
    #[error("unmatched `)`")]
    UnmatchedParen,
    #[error("escape at the end of the pattern")]
    DanglingEscape,
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("empty character class")]
    EmptyClass,
    #[error("character range `{0}-{1}` is out of order")]
    ReversedRange(char, char),
    #[error("`{0}` has nothing to repeat")]
    MissingOperand(char),
}

/// The entry and exit states of a compiled expression.
///
/// The exit state is never marked accepting here; whoever assembles the
/// final automaton decides which exits are final.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub initial: StateID,
    pub accept: StateID,
}

impl Regex {
    pub fn parse(pattern: &str) -> Result<Self, RegexError> {
        let mut parser = Parser {
            chars: pattern.chars().collect(),
            pos: 0,
        };
        let regex = parser.alternation()?;
        if parser.pos < parser.chars.len() {
            // alternation() only stops early on a `)` with no opening partner.
            return Err(parser.error(RegexErrorKind::UnmatchedParen));
        }
        Ok(regex)
    }

    /// Append the states recognizing this expression to `builder`.
    pub fn compile<T>(&self, builder: &mut NfaBuilder<char, T>) -> Fragment {
        match self {
            Regex::Empty => {
                let initial = builder.add_state();
                let accept = builder.add_state();
                builder.add_epsilon(initial, accept);
                Fragment { initial, accept }
            }
            Regex::Literal(c) => {
                let initial = builder.add_state();
                let accept = builder.add_state();
                builder.add_transition(initial, *c, accept);
                Fragment { initial, accept }
            }
            Regex::Class(ranges) => {
                let initial = builder.add_state();
                let accept = builder.add_state();
                for &(lo, hi) in ranges {
                    for c in lo..=hi {
                        builder.add_transition(initial, c, accept);
                    }
                }
                Fragment { initial, accept }
            }
            Regex::Concat(a, b) => {
                let a = a.compile(builder);
                let b = b.compile(builder);
                builder.add_epsilon(a.accept, b.initial);
                Fragment {
                    initial: a.initial,
                    accept: b.accept,
                }
            }
            Regex::Alt(a, b) => {
                let initial = builder.add_state();
                let a = a.compile(builder);
                let b = b.compile(builder);
                let accept = builder.add_state();
                builder.add_epsilon(initial, a.initial);
                builder.add_epsilon(initial, b.initial);
                builder.add_epsilon(a.accept, accept);
                builder.add_epsilon(b.accept, accept);
                Fragment { initial, accept }
            }
            Regex::Star(a) => {
                let inner = a.compile(builder);
                star(builder, inner)
            }
            Regex::Plus(a) => {
                let first = a.compile(builder);
                let again = a.compile(builder);
                let rest = star(builder, again);
                builder.add_epsilon(first.accept, rest.initial);
                Fragment {
                    initial: first.initial,
                    accept: rest.accept,
                }
            }
            Regex::Optional(a) => {
                Regex::Alt(a.clone(), Box::new(Regex::Empty)).compile(builder)
            }
        }
    }

    /// Build a standalone automaton whose only final state is the exit of
    /// this expression.
    pub fn to_nfa(&self) -> Nfa<char, ()> {
        let mut builder = NfaBuilder::new();
        let fragment = self.compile(&mut builder);
        builder.set_accepting(fragment.accept, true);
        builder.build(fragment.initial)
    }

    /// Return whether the expression matches the empty string.
    pub fn is_nullable(&self) -> bool {
        match self {
            Regex::Empty | Regex::Star(..) | Regex::Optional(..) => true,
            Regex::Literal(..) | Regex::Class(..) => false,
            Regex::Concat(a, b) => a.is_nullable() && b.is_nullable(),
            Regex::Alt(a, b) => a.is_nullable() || b.is_nullable(),
            Regex::Plus(a) => a.is_nullable(),
        }
    }
}

fn star<T>(builder: &mut NfaBuilder<char, T>, inner: Fragment) -> Fragment {
    let initial = builder.add_state();
    let accept = builder.add_state();
    builder.add_epsilon(initial, inner.initial);
    builder.add_epsilon(initial, accept);
    builder.add_epsilon(inner.accept, inner.initial);
    builder.add_epsilon(inner.accept, accept);
    Fragment { initial, accept }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn escaped(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
            if "|*+?()[]\\-".contains(c) {
                f.write_str("\\")?;
            }
            write!(f, "{}", c)
        }
        match self {
            Regex::Empty => Ok(()),
            Regex::Literal(c) => escaped(f, *c),
            Regex::Class(ranges) => {
                f.write_str("[")?;
                for &(lo, hi) in ranges {
                    escaped(f, lo)?;
                    if lo != hi {
                        f.write_str("-")?;
                        escaped(f, hi)?;
                    }
                }
                f.write_str("]")
            }
            Regex::Concat(a, b) => write!(f, "{}{}", a, b),
            Regex::Alt(a, b) => write!(f, "({}|{})", a, b),
            Regex::Star(a) => write!(f, "({})*", a),
            Regex::Plus(a) => write!(f, "({})+", a),
            Regex::Optional(a) => write!(f, "({})?", a),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, kind: RegexErrorKind) -> RegexError {
        RegexError {
            position: self.pos,
            kind,
        }
    }

    fn alternation(&mut self) -> Result<Regex, RegexError> {
        let mut lhs = self.concatenation()?;
        while self.peek() == Some('|') {
            self.pos += 1;
            let rhs = self.concatenation()?;
            lhs = Regex::Alt(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn concatenation(&mut self) -> Result<Regex, RegexError> {
        let mut acc: Option<Regex> = None;
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let item = self.repetition()?;
            acc = Some(match acc {
                Some(lhs) => Regex::Concat(Box::new(lhs), Box::new(item)),
                None => item,
            });
        }
        Ok(acc.unwrap_or(Regex::Empty))
    }

    fn repetition(&mut self) -> Result<Regex, RegexError> {
        let mut inner = self.atom()?;
        while let Some(c) = self.peek() {
            inner = match c {
                '*' => Regex::Star(Box::new(inner)),
                '+' => Regex::Plus(Box::new(inner)),
                '?' => Regex::Optional(Box::new(inner)),
                _ => break,
            };
            self.pos += 1;
        }
        Ok(inner)
    }

    fn atom(&mut self) -> Result<Regex, RegexError> {
        let start = self.pos;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Regex::Empty),
        };
        match c {
            '(' => {
                let inner = self.alternation()?;
                if self.bump() != Some(')') {
                    return Err(RegexError {
                        position: start,
                        kind: RegexErrorKind::UnclosedGroup,
                    });
                }
                Ok(inner)
            }
            '[' => self.class(start),
            '\\' => self.escaped().map(Regex::Literal),
            '*' | '+' | '?' => Err(RegexError {
                position: start,
                kind: RegexErrorKind::MissingOperand(c),
            }),
            c => Ok(Regex::Literal(c)),
        }
    }

    fn escaped(&mut self) -> Result<char, RegexError> {
        match self.bump() {
            Some(c) => Ok(c),
            None => Err(RegexError {
                position: self.pos - 1,
                kind: RegexErrorKind::DanglingEscape,
            }),
        }
    }

    fn class(&mut self, start: usize) -> Result<Regex, RegexError> {
        let unterminated = RegexError {
            position: start,
            kind: RegexErrorKind::UnterminatedClass,
        };

        let mut ranges = vec![];
        loop {
            let lo = match self.bump() {
                Some(']') => break,
                Some('\\') => self.escaped()?,
                Some(c) => c,
                None => return Err(unterminated),
            };

            // A `-` right before `]` is taken literally.
            let is_range = self.peek() == Some('-')
                && matches!(self.chars.get(self.pos + 1), Some(c) if *c != ']');
            if !is_range {
                ranges.push((lo, lo));
                continue;
            }
            let range_start = self.pos - 1;
            self.pos += 1;
            let hi = match self.bump() {
                Some('\\') => self.escaped()?,
                Some(c) => c,
                None => return Err(unterminated),
            };
            if hi < lo {
                return Err(RegexError {
                    position: range_start,
                    kind: RegexErrorKind::ReversedRange(lo, hi),
                });
            }
            ranges.push((lo, hi));
        }

        if ranges.is_empty() {
            return Err(RegexError {
                position: start,
                kind: RegexErrorKind::EmptyClass,
            });
        }
        Ok(Regex::Class(ranges))
    }
}
