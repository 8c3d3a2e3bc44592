//! Finite automata, maximal-munch lexers and LR parse tables.

pub mod automaton;
pub mod collection;
pub mod first_follow;
pub mod grammar;
pub mod lexer;
pub mod lr0;
pub mod lr1;
pub mod regex;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

pub use kestrel_runtime as runtime;
