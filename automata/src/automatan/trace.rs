use std::fmt::Display;

use super::{StateId, dfa::Dfa};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "event", rename_all = "snake_case")
)]
pub enum RunEvent {
    Started {
        state: StateId,
    },
    Consumed {
        from: StateId,
        symbol: char,
        to: StateId,
    },
    /// No transition for `symbol`; the input is rejected. `position` is a
    /// byte offset into the input.
    Stuck {
        state: StateId,
        symbol: char,
        position: usize,
    },
    Finished {
        state: StateId,
        accepted: bool,
    },
}

/// Receives events while a [`Dfa`] executes. Observers never influence the
/// outcome of a run.
pub trait RunObserver {
    fn observe(&mut self, event: RunEvent);
}

impl RunObserver for () {
    fn observe(&mut self, _: RunEvent) {}
}

impl<T: RunObserver + ?Sized> RunObserver for &mut T {
    fn observe(&mut self, event: RunEvent) {
        (**self).observe(event)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Trace {
    events: Vec<RunEvent>,
}

impl RunObserver for Trace {
    fn observe(&mut self, event: RunEvent) {
        self.events.push(event);
    }
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<RunEvent> {
        self.events
    }

    pub fn displayable_with<'a>(
        &'a self,
        dfa: &'a Dfa,
    ) -> impl Iterator<Item = RunEventDisplay<'a>> {
        self.events.iter().map(move |event| event.display_with(dfa))
    }
}

impl RunEvent {
    pub fn display_with<'a>(&'a self, dfa: &'a Dfa) -> RunEventDisplay<'a> {
        RunEventDisplay { dfa, event: self }
    }
}

pub struct RunEventDisplay<'a> {
    dfa: &'a Dfa,
    event: &'a RunEvent,
}

impl<'a> RunEventDisplay<'a> {
    fn name(&self, id: StateId) -> &'a str {
        self.dfa.get(id).map(|s| s.name()).unwrap_or("<unknown>")
    }
}

impl<'a> Display for RunEventDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self.event {
            RunEvent::Started { state } => write!(f, "starting at state {}", self.name(state)),
            RunEvent::Consumed { from, symbol, to } => write!(
                f,
                "at state {}, reading symbol {symbol:?} -> {}",
                self.name(from),
                self.name(to)
            ),
            RunEvent::Stuck { state, symbol, .. } => write!(
                f,
                "no transition from state {} on symbol {symbol:?}, rejecting",
                self.name(state)
            ),
            RunEvent::Finished { state, accepted } => write!(
                f,
                "ended at state {} ({})",
                self.name(state),
                if accepted { "accepting" } else { "non-accepting" }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_renders_state_names() {
        let mut dfa = Dfa::new();
        dfa.add_state("even", true).unwrap();
        dfa.add_state("odd", false).unwrap();
        dfa.add_transition("even", '1', "odd").unwrap();
        dfa.set_start("even").unwrap();

        let mut trace = Trace::new();
        assert_eq!(dfa.run_observed("11", &mut trace), Ok(false));

        let lines: Vec<String> = trace
            .displayable_with(&dfa)
            .map(|line| line.to_string())
            .collect();
        assert_eq!(
            lines,
            [
                "starting at state even",
                "at state even, reading symbol '1' -> odd",
                "no transition from state odd on symbol '1', rejecting",
            ]
        );
    }

    #[test]
    fn observer_through_mut_ref() {
        let mut dfa = Dfa::new();
        dfa.add_state("s", true).unwrap();
        dfa.set_start("s").unwrap();

        let mut trace = Trace::new();
        let mut by_ref = &mut trace;
        assert_eq!(dfa.run_observed("", &mut by_ref), Ok(true));
        assert_eq!(
            trace.into_events(),
            [
                RunEvent::Started { state: StateId(0) },
                RunEvent::Finished { state: StateId(0), accepted: true },
            ]
        );
    }
}
