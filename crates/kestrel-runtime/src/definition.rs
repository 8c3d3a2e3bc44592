//! The table interface consumed by the driver.

/// A read-only LR table: one action per (state, lookahead) and one goto
/// per (state, nonterminal).
pub trait ParseTable {
    type State: Copy;
    type Symbol: Copy;
    type Nonterminal: Copy;

    /// The handle reported for each reduction, typically a production id.
    type Reduce: Clone;

    fn initial_state(&self) -> Self::State;

    /// `lookahead` is `None` at the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Nonterminal, Self::Reduce>;

    /// The state entered after reducing to `nonterminal` with `current` on top.
    fn goto(&self, current: Self::State, nonterminal: Self::Nonterminal) -> Option<Self::State>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;
    type Nonterminal = T::Nonterminal;
    type Reduce = T::Reduce;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Nonterminal, Self::Reduce> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, nonterminal: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, nonterminal)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<S, N, R> {
    /// Consume the lookahead and push the state.
    Shift(S),

    /// Pop `arity` states, then push the goto of `head`.
    Reduce { production: R, head: N, arity: usize },

    Accept,

    /// No entry for this lookahead.
    Error,
}
