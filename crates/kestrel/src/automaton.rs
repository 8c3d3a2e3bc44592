//! Epsilon-NFA and its determinization by subset construction.
//!
//! States live in an arena owned by the automaton and are addressed by
//! [`StateID`]. Ids are handed out by an [`NfaBuilder`], so independent
//! constructions never share a counter.

use crate::types::{Map, Set};
use bit_set::BitSet;
use std::{collections::VecDeque, fmt, hash::Hash};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    /// The start state of every [`Dfa`].
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A state of an epsilon-NFA.
#[derive(Debug, Clone)]
pub struct State<S, T> {
    accepting: bool,
    tag: Option<T>,
    transitions: Map<S, Set<StateID>>,
    epsilons: Set<StateID>,
}

impl<S, T> State<S, T> {
    fn new() -> Self {
        Self {
            accepting: false,
            tag: None,
            transitions: Map::default(),
            epsilons: Set::default(),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn tag(&self) -> Option<&T> {
        self.tag.as_ref()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&S, &Set<StateID>)> + '_ {
        self.transitions.iter()
    }

    pub fn epsilons(&self) -> impl Iterator<Item = StateID> + '_ {
        self.epsilons.iter().copied()
    }
}

/// Allocates the states of an NFA under construction.
#[derive(Debug)]
pub struct NfaBuilder<S, T> {
    states: Vec<State<S, T>>,
}

impl<S, T> Default for NfaBuilder<S, T> {
    fn default() -> Self {
        Self { states: vec![] }
    }
}

impl<S, T> NfaBuilder<S, T>
where
    S: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, non-accepting state with no edges.
    pub fn add_state(&mut self) -> StateID {
        debug_assert!(self.states.len() < u32::MAX as usize);
        let id = StateID(self.states.len() as u32);
        self.states.push(State::new());
        id
    }

    pub fn add_transition(&mut self, from: StateID, symbol: S, to: StateID) {
        self.states[from.index()]
            .transitions
            .entry(symbol)
            .or_default()
            .insert(to);
    }

    pub fn add_epsilon(&mut self, from: StateID, to: StateID) {
        self.states[from.index()].epsilons.insert(to);
    }

    pub fn set_accepting(&mut self, id: StateID, accepting: bool) {
        self.states[id.index()].accepting = accepting;
    }

    pub fn set_tag(&mut self, id: StateID, tag: T) {
        self.states[id.index()].tag = Some(tag);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Finish the construction, using `start` as the initial state.
    pub fn build(self, start: StateID) -> Nfa<S, T> {
        debug_assert!(start.index() < self.states.len(), "unknown start state");
        Nfa {
            states: self.states,
            start,
        }
    }
}

/// An epsilon-nondeterministic finite automaton.
#[derive(Debug, Clone)]
pub struct Nfa<S, T> {
    states: Vec<State<S, T>>,
    start: StateID,
}

impl<S, T> Nfa<S, T>
where
    S: Copy + Eq + Hash,
{
    pub fn start(&self) -> StateID {
        self.start
    }

    pub fn state(&self, id: StateID) -> &State<S, T> {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State<S, T>)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID(i as u32), state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Return the states reachable from `seeds` through epsilon edges only,
    /// sorted by id and without duplicates.
    pub fn epsilon_closure<I>(&self, seeds: I) -> Vec<StateID>
    where
        I: IntoIterator<Item = StateID>,
    {
        let mut seen = BitSet::with_capacity(self.states.len());
        let mut worklist = vec![];
        for seed in seeds {
            if seen.insert(seed.index()) {
                worklist.push(seed);
            }
        }
        while let Some(id) = worklist.pop() {
            for next in self.state(id).epsilons() {
                if seen.insert(next.index()) {
                    worklist.push(next);
                }
            }
        }
        seen.iter().map(|raw| StateID(raw as u32)).collect()
    }

    /// Simulate the automaton over `input` and report whether it ends up in
    /// an accepting state.
    pub fn accepts<I>(&self, input: I) -> bool
    where
        I: IntoIterator<Item = S>,
    {
        let mut current = self.epsilon_closure(Some(self.start));
        for symbol in input {
            let moved: Vec<StateID> = current
                .iter()
                .filter_map(|id| self.state(*id).transitions.get(&symbol))
                .flat_map(|dests| dests.iter().copied())
                .collect();
            if moved.is_empty() {
                return false;
            }
            current = self.epsilon_closure(moved);
        }
        current.iter().any(|id| self.state(*id).accepting)
    }

    /// Subset construction. Each result state is final when one of its
    /// members is, and carries the smallest tag among its final members.
    pub fn determinize(&self) -> Dfa<S, T>
    where
        T: Ord + Clone,
    {
        self.determinize_with(|tags| tags.iter().min().map(|tag| (*tag).clone()))
    }

    /// Subset construction with a custom policy for merging the tags of
    /// the final members of a result state.
    ///
    /// `resolve` receives the tags of the final members (in id order) and
    /// is only called for final result states.
    pub fn determinize_with<U, F>(&self, mut resolve: F) -> Dfa<S, U>
    where
        F: FnMut(&[&T]) -> Option<U>,
    {
        let mut gen = SubsetConstruction {
            nfa: self,
            index: Map::default(),
            states: vec![],
            pending: VecDeque::new(),
        };

        let start = self.epsilon_closure(Some(self.start));
        gen.intern(start, &mut resolve);

        while let Some(current) = gen.pending.pop_front() {
            let members = gen.states[current.index()].members.clone();

            // Destinations of each non-epsilon symbol, in order of first appearance.
            let mut moves: Map<S, Vec<StateID>> = Map::default();
            for member in members.iter() {
                for (symbol, dests) in &self.state(*member).transitions {
                    moves
                        .entry(*symbol)
                        .or_default()
                        .extend(dests.iter().copied());
                }
            }

            for (symbol, dests) in moves {
                let closure = self.epsilon_closure(dests);
                let next = gen.intern(closure, &mut resolve);
                gen.states[current.index()].transitions.insert(symbol, next);
            }
        }

        tracing::debug!(
            "determinize: {} NFA states -> {} DFA states",
            self.states.len(),
            gen.states.len()
        );

        Dfa { states: gen.states }
    }
}

struct SubsetConstruction<'a, S, T, U> {
    nfa: &'a Nfa<S, T>,
    // keyed by the sorted member ids, so equal sets collapse into one state
    index: Map<Box<[StateID]>, StateID>,
    states: Vec<DfaState<S, U>>,
    pending: VecDeque<StateID>,
}

impl<S, T, U> SubsetConstruction<'_, S, T, U>
where
    S: Copy + Eq + Hash,
{
    fn intern<F>(&mut self, members: Vec<StateID>, resolve: &mut F) -> StateID
    where
        F: FnMut(&[&T]) -> Option<U>,
    {
        let members = members.into_boxed_slice();
        if let Some(id) = self.index.get(&members) {
            return *id;
        }

        let finals: Vec<&T> = members
            .iter()
            .map(|id| self.nfa.state(*id))
            .filter(|state| state.accepting)
            .filter_map(|state| state.tag.as_ref())
            .collect();
        let accepting = members.iter().any(|id| self.nfa.state(*id).accepting);
        let tag = if accepting { resolve(&finals) } else { None };

        let id = StateID(self.states.len() as u32);
        self.index.insert(members.clone(), id);
        self.states.push(DfaState {
            members,
            accepting,
            tag,
            transitions: Map::default(),
        });
        self.pending.push_back(id);
        id
    }
}

/// A state of the deterministic automaton produced by [`Nfa::determinize`].
#[derive(Debug, Clone)]
pub struct DfaState<S, T> {
    members: Box<[StateID]>,
    accepting: bool,
    tag: Option<T>,
    transitions: Map<S, StateID>,
}

impl<S, T> DfaState<S, T> {
    /// The NFA states this state stands for, sorted by id.
    pub fn members(&self) -> &[StateID] {
        &self.members
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn tag(&self) -> Option<&T> {
        self.tag.as_ref()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&S, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, next)| (symbol, *next))
    }
}

/// A deterministic finite automaton. The start state is [`StateID::START`].
#[derive(Debug, Clone)]
pub struct Dfa<S, T> {
    states: Vec<DfaState<S, T>>,
}

impl<S, T> Dfa<S, T>
where
    S: Eq + Hash,
{
    pub fn start(&self) -> StateID {
        StateID::START
    }

    pub fn state(&self, id: StateID) -> &DfaState<S, T> {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &DfaState<S, T>)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID(i as u32), state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Follow the edge labeled `symbol`, if any.
    #[inline]
    pub fn next(&self, current: StateID, symbol: &S) -> Option<StateID> {
        self.states[current.index()].transitions.get(symbol).copied()
    }

    pub fn accepts<I>(&self, input: I) -> bool
    where
        I: IntoIterator<Item = S>,
    {
        let mut current = self.start();
        for symbol in input {
            match self.next(current, &symbol) {
                Some(next) => current = next,
                None => return false,
            }
        }
        self.state(current).accepting
    }
}
