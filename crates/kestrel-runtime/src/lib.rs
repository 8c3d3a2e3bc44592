//! Runtime support for tables produced by `kestrel`: the shift-reduce
//! driver and the evaluation of its reduction traces.

pub mod definition;
pub mod derivation;
pub mod parser;

pub use crate::{
    definition::{ParseAction, ParseTable},
    derivation::{Derivation, EvalError, Step},
    parser::{ParseError, Parser, Token},
};
