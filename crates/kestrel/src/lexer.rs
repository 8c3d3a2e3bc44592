//! Maximal-munch scanner built from prioritized regular expressions.

use crate::{
    automaton::{Dfa, NfaBuilder, StateID},
    regex::{Regex, RegexError},
};
use std::{fmt, ops::Range};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LexerError {
    #[error("invalid pattern #{index} `{pattern}`")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: RegexError,
    },

    #[error("pattern #{index} `{pattern}` matches the empty string")]
    EmptyMatch { index: usize, pattern: String },
}

#[derive(Debug)]
struct Rule<K> {
    pattern: String,
    regex: Regex,
    // `None` for skipped matches
    kind: Option<K>,
}

/// Collects token definitions in declaration order.
///
/// Earlier definitions win when two of them match the same longest prefix.
#[derive(Debug)]
pub struct LexerDef<K> {
    rules: Vec<Rule<K>>,
}

impl<K> LexerDef<K> {
    /// Declare a token of the given kind.
    pub fn token(&mut self, pattern: &str, kind: K) -> Result<&mut Self, LexerError> {
        self.push(pattern, Some(kind))
    }

    /// Declare a pattern whose matches are consumed but never emitted.
    pub fn skip(&mut self, pattern: &str) -> Result<&mut Self, LexerError> {
        self.push(pattern, None)
    }

    fn push(&mut self, pattern: &str, kind: Option<K>) -> Result<&mut Self, LexerError> {
        let index = self.rules.len();
        let regex = Regex::parse(pattern).map_err(|source| LexerError::InvalidPattern {
            index,
            pattern: pattern.to_owned(),
            source,
        })?;
        // a zero-width match would never advance the cursor
        if regex.is_nullable() {
            return Err(LexerError::EmptyMatch {
                index,
                pattern: pattern.to_owned(),
            });
        }
        self.rules.push(Rule {
            pattern: pattern.to_owned(),
            regex,
            kind,
        });
        Ok(self)
    }
}

/// A compiled scanner. Immutable, and reusable across any number of inputs.
#[derive(Debug)]
pub struct Lexer<K> {
    dfa: Dfa<char, usize>,
    rules: Vec<Rule<K>>,
}

impl<K> Lexer<K> {
    pub fn define<F>(f: F) -> Result<Self, LexerError>
    where
        F: FnOnce(&mut LexerDef<K>) -> Result<(), LexerError>,
    {
        let mut def = LexerDef { rules: vec![] };
        f(&mut def)?;
        Self::build(def.rules)
    }

    /// Build a scanner from `(pattern, kind)` pairs, highest priority first.
    pub fn new<'p, I>(definitions: I) -> Result<Self, LexerError>
    where
        I: IntoIterator<Item = (&'p str, K)>,
    {
        Self::define(|def| {
            for (pattern, kind) in definitions {
                def.token(pattern, kind)?;
            }
            Ok(())
        })
    }

    fn build(rules: Vec<Rule<K>>) -> Result<Self, LexerError> {
        let mut builder = NfaBuilder::new();
        let start = builder.add_state();
        for (priority, rule) in rules.iter().enumerate() {
            let fragment = rule.regex.compile(&mut builder);
            builder.set_accepting(fragment.accept, true);
            builder.set_tag(fragment.accept, priority);
            builder.add_epsilon(start, fragment.initial);
        }
        let nfa = builder.build(start);

        // Tags are declaration indices, so the smallest one is the winner.
        let dfa = nfa.determinize();
        tracing::debug!(
            "lexer: {} definitions, {} NFA states, {} DFA states",
            rules.len(),
            nfa.len(),
            dfa.len()
        );

        Ok(Self { dfa, rules })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|rule| rule.pattern.as_str())
    }

    /// Scan `input` lazily. The last item is always the end marker.
    pub fn tokens<'l, 'i>(&'l self, input: &'i str) -> Tokens<'l, 'i, K> {
        Tokens {
            lexer: self,
            input,
            offset: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    pub fn tokenize<'i>(&self, input: &'i str) -> Vec<Token<'i, K>>
    where
        K: Clone,
    {
        self.tokens(input).collect()
    }

    /// Return the end offset and rule index of the longest match at `offset`.
    fn longest_match(&self, input: &str, offset: usize) -> Option<(usize, usize)> {
        let mut state = StateID::START;
        let mut last_accept = None;
        for (i, c) in input[offset..].char_indices() {
            match self.dfa.next(state, &c) {
                Some(next) => state = next,
                None => break,
            }
            if let Some(priority) = self.dfa.state(state).tag() {
                last_accept = Some((offset + i + c.len_utf8(), *priority));
            }
        }
        last_accept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind<K> {
    Terminal(K),
    /// A character no definition matches.
    Invalid,
    /// The end of the input.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'i, K> {
    pub kind: TokenKind<K>,
    pub lexeme: &'i str,
    /// Byte range of the lexeme in the input.
    pub span: Range<usize>,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in characters.
    pub column: usize,
}

impl<K> Token<'_, K> {
    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, TokenKind::Invalid)
    }

    pub fn terminal(&self) -> Option<&K> {
        match &self.kind {
            TokenKind::Terminal(kind) => Some(kind),
            _ => None,
        }
    }
}

impl<K: fmt::Debug> fmt::Display for Token<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Terminal(kind) => write!(f, "{:?}", kind)?,
            TokenKind::Invalid => f.write_str("<invalid>")?,
            TokenKind::End => return write!(f, "<end> at {}:{}", self.line, self.column),
        }
        write!(f, " {:?} at {}:{}", self.lexeme, self.line, self.column)
    }
}

/// Iterator returned by [`Lexer::tokens`].
#[derive(Debug)]
pub struct Tokens<'l, 'i, K> {
    lexer: &'l Lexer<K>,
    input: &'i str,
    offset: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'i, K> Tokens<'_, 'i, K> {
    fn advance(&mut self, end: usize) -> Token<'i, K> {
        let lexeme = &self.input[self.offset..end];
        let token = Token {
            kind: TokenKind::End,
            lexeme,
            span: self.offset..end,
            line: self.line,
            column: self.column,
        };
        for c in lexeme.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = end;
        token
    }
}

impl<'i, K: Clone> Iterator for Tokens<'_, 'i, K> {
    type Item = Token<'i, K>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.offset >= self.input.len() {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(self.advance(self.input.len()));
            }

            match self.lexer.longest_match(self.input, self.offset) {
                Some((end, priority)) => {
                    let mut token = self.advance(end);
                    match &self.lexer.rules[priority].kind {
                        Some(kind) => {
                            token.kind = TokenKind::Terminal(kind.clone());
                            tracing::trace!(rule = priority, lexeme = token.lexeme, "emit");
                            return Some(token);
                        }
                        None => continue,
                    }
                }
                None => {
                    // Nothing matches here. Give up on exactly one character.
                    let width = self.input[self.offset..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    let mut token = self.advance(self.offset + width);
                    token.kind = TokenKind::Invalid;
                    tracing::trace!(
                        line = token.line,
                        column = token.column,
                        "invalid character {:?}",
                        token.lexeme
                    );
                    return Some(token);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum T {
        Ab,
        A,
        Keyword,
        Ident,
        Number,
    }

    fn kinds<K: Clone>(lexer: &Lexer<K>, input: &str) -> Vec<TokenKind<K>> {
        lexer.tokens(input).map(|t| t.kind).collect()
    }

    #[test]
    fn longest_match_wins() {
        let lexer = Lexer::new([("ab", T::Ab), ("a", T::A)]).unwrap();
        assert_eq!(
            kinds(&lexer, "ab"),
            [TokenKind::Terminal(T::Ab), TokenKind::End]
        );
        assert_eq!(
            kinds(&lexer, "aab"),
            [
                TokenKind::Terminal(T::A),
                TokenKind::Terminal(T::Ab),
                TokenKind::End
            ]
        );
    }

    #[test]
    fn earlier_definition_breaks_ties() {
        let lexer = Lexer::new([("if", T::Keyword), ("[a-z]+", T::Ident)]).unwrap();
        assert_eq!(
            kinds(&lexer, "if"),
            [TokenKind::Terminal(T::Keyword), TokenKind::End]
        );
        // longer identifiers are not cut at the keyword
        let tokens = lexer.tokenize("iffy");
        assert_eq!(tokens[0].kind, TokenKind::Terminal(T::Ident));
        assert_eq!(tokens[0].lexeme, "iffy");

        let lexer = Lexer::new([("[a-z]+", T::Ident), ("if", T::Keyword)]).unwrap();
        assert_eq!(
            kinds(&lexer, "if"),
            [TokenKind::Terminal(T::Ident), TokenKind::End]
        );
    }

    #[test]
    fn backs_off_to_last_accepting_position() {
        // "abc" is not a token, so the scanner falls back to "ab" then
        // gives up on "c".
        let lexer = Lexer::new([("ab", T::Ab), ("abcd", T::Keyword)]).unwrap();
        let tokens = lexer.tokenize("abc");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Terminal(T::Ab));
        assert_eq!(tokens[1].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].lexeme, "c");
        assert_eq!(tokens[2].kind, TokenKind::End);
    }

    #[test]
    fn empty_input_yields_only_the_end_marker() {
        let lexer = Lexer::new([("a", T::A)]).unwrap();
        let tokens = lexer.tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::End);
        assert_eq!(tokens[0].span, 0..0);

        // no definitions at all still scans
        let lexer = Lexer::<T>::new([]).unwrap();
        assert_eq!(kinds(&lexer, ""), [TokenKind::End]);
        assert_eq!(kinds(&lexer, "x"), [TokenKind::Invalid, TokenKind::End]);
    }

    #[test]
    fn invalid_characters_do_not_stop_the_scan() {
        let lexer = Lexer::define(|def| {
            def.token("[0-9]+", T::Number)?;
            def.skip(" +")?;
            Ok(())
        })
        .unwrap();
        let tokens = lexer.tokenize("12 é?3");
        let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.lexeme)).collect();
        assert_eq!(
            summary,
            [
                (TokenKind::Terminal(T::Number), "12"),
                (TokenKind::Invalid, "é"),
                (TokenKind::Invalid, "?"),
                (TokenKind::Terminal(T::Number), "3"),
                (TokenKind::End, ""),
            ]
        );
        assert!(!tokens[1].is_valid());
        assert!(tokens[3].is_valid());
        assert_eq!(tokens[2].span, 5..6);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let lexer = Lexer::define(|def| {
            def.token("[a-z]+", T::Ident)?;
            def.skip("[ \n]+")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(lexer.patterns().collect::<Vec<_>>(), ["[a-z]+", "[ \n]+"]);

        let tokens = lexer.tokenize("ab cd\n  ef\n");
        let positions: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(positions, [(1, 1), (1, 4), (2, 3), (3, 1)]);
    }

    #[test]
    fn rejects_bad_definitions() {
        let err = Lexer::new([("a", T::A), ("b*", T::Ab)]).unwrap_err();
        assert!(matches!(err, LexerError::EmptyMatch { index: 1, .. }));

        let err = Lexer::new([("(a", T::A)]).unwrap_err();
        assert!(matches!(err, LexerError::InvalidPattern { index: 0, .. }));

        let err = Lexer::new([("a", T::A), ("[b-a]", T::Ab)]).unwrap_err();
        assert!(matches!(err, LexerError::InvalidPattern { index: 1, .. }));
    }
}
