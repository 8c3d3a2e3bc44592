//! Scanning, table generation and parsing wired together.

use kestrel::{
    grammar::{Grammar, TerminalID},
    lexer::{Lexer, TokenKind},
    runtime::{ParseError, Parser, Step},
    table::{Method, ParseTable, TableError},
};

const ARITHMETIC: &str = "
E -> E '+' T | T ;
T -> T '*' F | F ;
F -> '(' E ')' | num ;
";

struct Calculator {
    grammar: Grammar,
    lexer: Lexer<TerminalID>,
}

impl Calculator {
    fn new() -> Self {
        let grammar = Grammar::from_str(ARITHMETIC).unwrap();
        let t = |name: &str| grammar.terminal_by_name(name).unwrap();
        let lexer = Lexer::define(|def| {
            def.skip("[ \t\n]+")?;
            def.token(r"\+", t("+"))?;
            def.token(r"\*", t("*"))?;
            def.token(r"\(", t("("))?;
            def.token(r"\)", t(")"))?;
            def.token("[0-9]+", t("num"))?;
            Ok(())
        })
        .unwrap();
        Self { grammar, lexer }
    }

    fn eval(&self, method: Method, source: &str) -> Result<i64, ParseError<kestrel::automaton::StateID>> {
        let table = ParseTable::generate(&self.grammar, method).unwrap();
        let tokens = self.lexer.tokenize(source);
        assert!(tokens.iter().all(|t| t.is_valid()), "{:?}", tokens);
        let input: Vec<_> = tokens.iter().filter(|t| t.terminal().is_some()).collect();

        let derivation = Parser::new(&table).parse(input.iter().filter_map(|t| t.terminal().copied()))?;
        let value = derivation
            .evaluate(
                input.iter(),
                |token| token.lexeme.parse::<i64>().unwrap_or(0),
                |production, args| {
                    let rule = self.grammar.production(*production).display(&self.grammar).to_string();
                    match rule.as_str() {
                        "E -> E + T" => args[0] + args[2],
                        "T -> T * F" => args[0] * args[2],
                        "F -> ( E )" => args[1],
                        _ => args[0],
                    }
                },
            )
            .unwrap();
        Ok(value)
    }
}

#[test]
fn evaluates_with_precedence_and_grouping() {
    let calc = Calculator::new();
    for method in [Method::SLR1, Method::LR1] {
        assert_eq!(calc.eval(method, "2 + 3 * 4"), Ok(14));
        assert_eq!(calc.eval(method, "(2 + 3) * 4"), Ok(20));
        assert_eq!(calc.eval(method, "1 + 2 + 3"), Ok(6));
        assert_eq!(calc.eval(method, "((7))"), Ok(7));
    }
}

#[test]
fn reports_the_offending_token_index() {
    let calc = Calculator::new();
    for method in [Method::SLR1, Method::LR1] {
        let err = calc.eval(method, "2 + * 3").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { index: 2, .. }));
        // an unfinished input stops at the end marker
        assert_eq!(calc.eval(method, "2 +").unwrap_err().index(), 2);
        assert_eq!(calc.eval(method, "").unwrap_err().index(), 0);
    }
}

#[test]
fn reductions_form_a_reverse_rightmost_derivation() {
    let calc = Calculator::new();
    let g = &calc.grammar;
    let table = ParseTable::generate(g, Method::LR1).unwrap();
    let input: Vec<_> = calc
        .lexer
        .tokens("1 + 2")
        .filter_map(|t| t.terminal().copied())
        .collect();

    let derivation = Parser::new(&table).parse(input).unwrap();
    let rules: Vec<String> = derivation
        .reductions
        .iter()
        .map(|p| g.production(*p).display(g).to_string())
        .collect();
    assert_eq!(
        rules,
        [
            "F -> num",
            "T -> F",
            "E -> T",
            "F -> num",
            "T -> F",
            "E -> E + T",
        ]
    );

    let shifts = derivation.steps.iter().filter(|s| **s == Step::Shift).count();
    assert_eq!(shifts, 3);
    assert_eq!(derivation.steps.last(), Some(&Step::Accept));
}

#[test]
fn empty_input_is_accepted_by_nullable_start() {
    let g = Grammar::from_str("S -> '(' S ')' S | %empty ;").unwrap();
    let table = ParseTable::generate(&g, Method::SLR1).unwrap();
    let derivation = Parser::new(&table).parse(Vec::<TerminalID>::new()).unwrap();
    assert_eq!(derivation.reductions.len(), 1);
    assert_eq!(derivation.steps, [Step::Reduce { arity: 0 }, Step::Accept]);
}

#[test]
fn conflicts_surface_before_parsing() {
    let g = Grammar::from_str("E -> E '+' E | id ;").unwrap();
    let err = ParseTable::generate(&g, Method::LR1).unwrap_err();
    let TableError::Conflict { terminal_name, .. } = &err;
    assert_eq!(terminal_name, "+");
}

#[test]
fn scanner_feeds_terminal_ids() {
    let calc = Calculator::new();
    let kinds: Vec<_> = calc.lexer.tokens("12+(3)").map(|t| t.kind).collect();
    let t = |name: &str| TokenKind::Terminal(calc.grammar.terminal_by_name(name).unwrap());
    assert_eq!(
        kinds,
        [t("num"), t("+"), t("("), t("num"), t(")"), TokenKind::End]
    );

    let tokens = calc.lexer.tokenize("1 $ 2");
    assert_eq!(tokens[1].kind, TokenKind::Invalid);
    assert_eq!(tokens[1].span, 2..3);
}
