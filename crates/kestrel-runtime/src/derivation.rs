//! Reduction traces and their bottom-up evaluation.

use std::fmt;

/// One move of the shift-reduce driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Shift,
    /// Collapse the last `arity` values into one.
    Reduce { arity: usize },
    Accept,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Shift => f.write_str("shift"),
            Step::Reduce { arity } => write!(f, "reduce/{}", arity),
            Step::Accept => f.write_str("accept"),
        }
    }
}

/// The output of a successful parse.
///
/// `reductions` lists the reduced productions in order, which read as a
/// reverse rightmost derivation. `steps` is the full action trace; its
/// `Reduce` entries line up one to one with `reductions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation<R> {
    pub reductions: Vec<R>,
    pub steps: Vec<Step>,
}

impl<R> Default for Derivation<R> {
    fn default() -> Self {
        Self {
            reductions: vec![],
            steps: vec![],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvalError {
    #[error("step {step}: ran out of tokens")]
    MissingToken { step: usize },

    #[error("step {step}: ran out of reductions")]
    MissingReduction { step: usize },

    #[error("step {step}: not enough values on the stack")]
    StackUnderflow { step: usize },

    #[error("accepted with {remaining} values on the stack")]
    Unbalanced { remaining: usize },

    #[error("the trace does not end with accept")]
    NotAccepted,
}

impl<R> Derivation<R> {
    /// Replay the trace against `tokens`, bottom-up.
    ///
    /// `shift` turns each consumed token into a value. `reduce` receives the
    /// production handle and the values of its body, left to right (empty
    /// for an epsilon production). The value left on accept is returned.
    pub fn evaluate<I, V, S, F>(&self, tokens: I, mut shift: S, mut reduce: F) -> Result<V, EvalError>
    where
        I: IntoIterator,
        S: FnMut(I::Item) -> V,
        F: FnMut(&R, Vec<V>) -> V,
    {
        let mut tokens = tokens.into_iter();
        let mut reductions = self.reductions.iter();
        let mut stack: Vec<V> = vec![];

        for (step, action) in self.steps.iter().enumerate() {
            match *action {
                Step::Shift => {
                    let token = tokens.next().ok_or(EvalError::MissingToken { step })?;
                    stack.push(shift(token));
                }
                Step::Reduce { arity } => {
                    let production = reductions
                        .next()
                        .ok_or(EvalError::MissingReduction { step })?;
                    let at = stack
                        .len()
                        .checked_sub(arity)
                        .ok_or(EvalError::StackUnderflow { step })?;
                    let args = stack.split_off(at);
                    stack.push(reduce(production, args));
                }
                Step::Accept => {
                    return match (stack.pop(), stack.len()) {
                        (Some(value), 0) => Ok(value),
                        (None, _) => Err(EvalError::Unbalanced { remaining: 0 }),
                        (Some(..), n) => Err(EvalError::Unbalanced { remaining: n + 1 }),
                    };
                }
            }
        }

        Err(EvalError::NotAccepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_tree_from_the_trace() {
        // S -> a S | b, input "a b"
        let derivation = Derivation {
            reductions: vec!["S -> b", "S -> a S"],
            steps: vec![
                Step::Shift,
                Step::Shift,
                Step::Reduce { arity: 1 },
                Step::Reduce { arity: 2 },
                Step::Accept,
            ],
        };
        let tree = derivation
            .evaluate(
                ["a", "b"],
                |t| t.to_owned(),
                |p, args| format!("{}({})", p.split(' ').next().unwrap(), args.join(",")),
            )
            .unwrap();
        assert_eq!(tree, "S(a,S(b))");
    }

    #[test]
    fn epsilon_reductions_get_no_arguments() {
        let derivation = Derivation {
            reductions: vec![0u32],
            steps: vec![Step::Reduce { arity: 0 }, Step::Accept],
        };
        let value = derivation
            .evaluate(Vec::<()>::new(), |_| 0usize, |_, args| {
                assert!(args.is_empty());
                42
            })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn malformed_traces() {
        let derivation = Derivation {
            reductions: vec![()],
            steps: vec![Step::Shift, Step::Reduce { arity: 2 }, Step::Accept],
        };
        let err = derivation.evaluate([1], |t| t, |_, _| 0).unwrap_err();
        assert_eq!(err, EvalError::StackUnderflow { step: 1 });

        let derivation = Derivation::<()> {
            reductions: vec![],
            steps: vec![Step::Shift, Step::Shift],
        };
        let err = derivation.evaluate([1], |t| t, |_, _| 0).unwrap_err();
        assert_eq!(err, EvalError::MissingToken { step: 1 });

        let derivation = Derivation::<()> {
            reductions: vec![],
            steps: vec![Step::Shift, Step::Shift, Step::Accept],
        };
        let err = derivation.evaluate([1, 2], |t| t, |_, _| 0).unwrap_err();
        assert_eq!(err, EvalError::Unbalanced { remaining: 2 });

        let derivation = Derivation::<()>::default();
        let err = derivation.evaluate([1], |t| t, |_, _| 0).unwrap_err();
        assert_eq!(err, EvalError::NotAccepted);
    }
}
