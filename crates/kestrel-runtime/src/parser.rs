//! Parser.

use crate::{
    definition::{ParseAction, ParseTable},
    derivation::{Derivation, Step},
};

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

/// The shift-reduce parser driven based on a parse table.
///
/// The parser itself holds no per-input state, so one instance can run any
/// number of parses.
#[derive(Debug)]
pub struct Parser<TDef> {
    definition: TDef,
}

impl<TDef> Parser<TDef>
where
    TDef: ParseTable,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &TDef {
        &self.definition
    }

    /// Run the table over `tokens`, followed by the end of input.
    ///
    /// The first token without an action aborts the parse. Its position is
    /// reported in the error, where the end of input counts as the position
    /// right after the last token.
    pub fn parse<I>(
        &self,
        tokens: I,
    ) -> Result<Derivation<TDef::Reduce>, ParseError<TDef::State>>
    where
        I: IntoIterator,
        I::Item: Token<TDef::Symbol>,
    {
        let _span = tracing::trace_span!("parse").entered();

        let mut tokens = tokens.into_iter();
        let mut lookahead = tokens.next();
        let mut index = 0;
        let mut state_stack = vec![self.definition.initial_state()];
        let mut derivation = Derivation::default();

        loop {
            let current = *state_stack
                .last()
                .ok_or(ParseError::StackUnderflow { index })?;
            let symbol = lookahead.as_ref().map(|t| t.as_symbol());

            match self.definition.action(current, symbol) {
                ParseAction::Shift(next) => {
                    if lookahead.is_none() {
                        // the end of input is never consumed
                        return Err(ParseError::Syntax {
                            index,
                            state: current,
                        });
                    }
                    tracing::trace!(index, "shift");
                    state_stack.push(next);
                    derivation.steps.push(Step::Shift);
                    lookahead = tokens.next();
                    index += 1;
                }

                ParseAction::Reduce {
                    production,
                    head,
                    arity,
                } => {
                    tracing::trace!(index, arity, "reduce");
                    let at = state_stack
                        .len()
                        .checked_sub(arity)
                        .filter(|at| *at > 0)
                        .ok_or(ParseError::StackUnderflow { index })?;
                    state_stack.truncate(at);

                    let top = state_stack[at - 1];
                    let next = self
                        .definition
                        .goto(top, head)
                        .ok_or(ParseError::MissingGoto { index, state: top })?;
                    state_stack.push(next);

                    derivation.reductions.push(production);
                    derivation.steps.push(Step::Reduce { arity });
                }

                ParseAction::Accept => {
                    tracing::trace!(index, "accept");
                    derivation.steps.push(Step::Accept);
                    return Ok(derivation);
                }

                ParseAction::Error => {
                    tracing::trace!(index, "no action");
                    return Err(ParseError::Syntax {
                        index,
                        state: current,
                    });
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError<S> {
    /// The token at `index` has no action in `state`.
    #[error("unexpected token at index {index}")]
    Syntax { index: usize, state: S },

    /// The table has no goto entry from `state` for the reduced head.
    #[error("missing goto entry while reducing before token {index}")]
    MissingGoto { index: usize, state: S },

    #[error("state stack underflow before token {index}")]
    StackUnderflow { index: usize },
}

impl<S> ParseError<S> {
    /// The position of the token where the parse stopped.
    pub fn index(&self) -> usize {
        match self {
            Self::Syntax { index, .. }
            | Self::MissingGoto { index, .. }
            | Self::StackUnderflow { index } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // S -> a S | b
    //
    // 0: S' -> . S        a: s2  b: s3  S: 1
    // 1: S' -> S .        $: accept
    // 2: S -> a . S       a: s2  b: s3  S: 4
    // 3: S -> b .         $: r(S -> b)
    // 4: S -> a S .       $: r(S -> a S)
    struct Table;

    impl ParseTable for Table {
        type State = u8;
        type Symbol = char;
        type Nonterminal = char;
        type Reduce = &'static str;

        fn initial_state(&self) -> u8 {
            0
        }

        fn action(&self, current: u8, lookahead: Option<char>) -> ParseAction<u8, char, &'static str> {
            match (current, lookahead) {
                (0 | 2, Some('a')) => ParseAction::Shift(2),
                (0 | 2, Some('b')) => ParseAction::Shift(3),
                (1, None) => ParseAction::Accept,
                (3, None) => ParseAction::Reduce {
                    production: "S -> b",
                    head: 'S',
                    arity: 1,
                },
                (4, None) => ParseAction::Reduce {
                    production: "S -> a S",
                    head: 'S',
                    arity: 2,
                },
                _ => ParseAction::Error,
            }
        }

        fn goto(&self, current: u8, nonterminal: char) -> Option<u8> {
            match (current, nonterminal) {
                (0, 'S') => Some(1),
                (2, 'S') => Some(4),
                _ => None,
            }
        }
    }

    impl Token<char> for char {
        fn as_symbol(&self) -> char {
            *self
        }
    }

    #[test]
    fn produces_reverse_rightmost_derivation() {
        let parser = Parser::new(Table);
        let derivation = parser.parse("aab".chars()).unwrap();
        assert_eq!(derivation.reductions, ["S -> b", "S -> a S", "S -> a S"]);
        assert_eq!(
            derivation.steps,
            [
                Step::Shift,
                Step::Shift,
                Step::Shift,
                Step::Reduce { arity: 1 },
                Step::Reduce { arity: 2 },
                Step::Reduce { arity: 2 },
                Step::Accept,
            ]
        );
    }

    #[test]
    fn reports_the_first_offending_token() {
        let parser = Parser::new(&Table);
        assert_eq!(
            parser.parse("aba".chars()).unwrap_err(),
            ParseError::Syntax { index: 2, state: 3 }
        );
        assert_eq!(
            parser.parse("baab".chars()).unwrap_err(),
            ParseError::Syntax { index: 1, state: 3 }
        );
        // running out of input counts as the token after the last one
        assert_eq!(parser.parse("aa".chars()).unwrap_err().index(), 2);
        assert_eq!(parser.parse("".chars()).unwrap_err().index(), 0);
    }
}
