pub mod dfa;
pub mod trace;

/// Index of a state inside a [`dfa::Dfa`]'s arena.
///
/// Ids are handed out in insertion order and never reused, so they stay
/// valid for the lifetime of the automaton that produced them.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct StateId(pub u16);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("state {0:?} is not defined")]
    UnknownState(String),
    #[error("too many states defined (limit is {})", u16::MAX as u32 + 1)]
    TooManyStates,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("automaton has no start state")]
    MissingStartState,
}
