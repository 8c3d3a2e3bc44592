use kestrel::{
    grammar::Grammar,
    table::{Method, ParseTable},
};
use std::{env, path::PathBuf};

fn load(name: &str) -> Grammar {
    Grammar::from_file(
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
            .join("tests")
            .join(format!("{}.kst", name)),
    )
    .unwrap()
}

macro_rules! define_tests {
    ($($name:ident => { slr1: $slr1:expr, lr1: $lr1:expr }),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name));
            let slr1 = ParseTable::generate(&grammar, Method::SLR1);
            assert_eq!(slr1.is_ok(), $slr1, "SLR(1): {:?}", slr1.err());
            let lr1 = ParseTable::generate(&grammar, Method::LR1);
            assert_eq!(lr1.is_ok(), $lr1, "LR(1): {:?}", lr1.err());
        }
    )*};
}

define_tests! {
    arithmetic => { slr1: true, lr1: true },
    arithmetic_ll => { slr1: true, lr1: true },
    assignment => { slr1: false, lr1: true },
    balanced => { slr1: true, lr1: true },
    pairs => { slr1: true, lr1: true },
    ambiguous => { slr1: false, lr1: false },
}
