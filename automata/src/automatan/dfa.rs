use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt::Display,
};

use super::{
    BuildError, RunError, StateId,
    trace::{RunEvent, RunObserver},
};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct State {
    name: String,
    accepting: bool,
    transitions: HashMap<char, StateId>,
}

impl State {
    pub fn new(name: impl Into<String>, accepting: bool) -> Self {
        Self {
            name: name.into(),
            accepting,
            transitions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Binds `symbol` to `target`, returning the target it was previously
    /// bound to. A state only ever holds one target per symbol.
    pub fn add_transition(&mut self, symbol: char, target: StateId) -> Option<StateId> {
        self.transitions.insert(symbol, target)
    }

    pub fn next_state(&self, symbol: char) -> Option<StateId> {
        self.transitions.get(&symbol).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (char, StateId)> + '_ {
        self.transitions.iter().map(|(k, v)| (*k, *v))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Added {
    Fresh(StateId),
    /// The name was already taken. The old state's outgoing transitions are
    /// gone, but edges pointing at it still resolve to the same id.
    Replaced(StateId),
}

impl Added {
    pub fn id(self) -> StateId {
        match self {
            Added::Fresh(id) | Added::Replaced(id) => id,
        }
    }

    pub fn is_replaced(self) -> bool {
        matches!(self, Added::Replaced(_))
    }
}

/// A deterministic finite automaton over `char` symbols.
///
/// States live in an arena and are addressed by [`StateId`]. Construction
/// happens through [`Dfa::add_state`], [`Dfa::add_transition`] and
/// [`Dfa::set_start`]; every execution method takes `&self`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Dfa {
    states: Vec<State>,
    #[cfg_attr(feature = "serde", serde(skip))]
    names: HashMap<String, StateId>,
    start: Option<StateId>,
}

impl std::ops::Index<StateId> for Dfa {
    type Output = State;

    fn index(&self, index: StateId) -> &State {
        &self.states[index.index()]
    }
}

impl Dfa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(
        &mut self,
        name: impl Into<String>,
        accepting: bool,
    ) -> Result<Added, BuildError> {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            self.states[id.index()] = State::new(name, accepting);
            return Ok(Added::Replaced(id));
        }

        let id = match self.states.len().try_into() {
            Ok(ok) => StateId(ok),
            Err(_) => return Err(BuildError::TooManyStates),
        };
        self.names.insert(name.clone(), id);
        self.states.push(State::new(name, accepting));
        Ok(Added::Fresh(id))
    }

    /// Binds the start state. An unknown name leaves the automaton without
    /// a start state, which [`Dfa::run`] then reports.
    pub fn set_start(&mut self, name: &str) -> Result<StateId, BuildError> {
        self.start = self.state_id(name);
        self.start.ok_or_else(|| BuildError::UnknownState(name.to_owned()))
    }

    /// Adds `from --symbol--> to`. Nothing changes if either state is
    /// unknown. On success returns the target previously bound to
    /// `(from, symbol)`, if any.
    pub fn add_transition(
        &mut self,
        from: &str,
        symbol: char,
        to: &str,
    ) -> Result<Option<StateId>, BuildError> {
        let from = self
            .state_id(from)
            .ok_or_else(|| BuildError::UnknownState(from.to_owned()))?;
        let to = self
            .state_id(to)
            .ok_or_else(|| BuildError::UnknownState(to.to_owned()))?;
        Ok(self.states[from.index()].add_transition(symbol, to))
    }

    pub fn get(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.state_id(name).map(|id| &self[id])
    }

    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, v)| (StateId(i as u16), v))
    }

    /// Derived from the per-state flags on every call.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states()
            .filter(|(_, state)| state.accepting)
            .map(|(id, _)| id)
    }

    pub fn alphabet(&self) -> BTreeSet<char> {
        self.states
            .iter()
            .flat_map(|state| state.transitions.keys().copied())
            .collect()
    }

    pub fn step(&self, from: StateId, symbol: char) -> Option<StateId> {
        self.get(from)?.next_state(symbol)
    }

    pub fn run(&self, input: &str) -> Result<bool, RunError> {
        self.run_observed(input, &mut ())
    }

    pub fn run_observed(
        &self,
        input: &str,
        observer: &mut impl RunObserver,
    ) -> Result<bool, RunError> {
        let mut simulator = Simulator::begin(self, input)?;
        observer.observe(RunEvent::Started {
            state: simulator.state(),
        });
        loop {
            match simulator.step(observer) {
                SimulatorResult::Pending => {}
                SimulatorResult::Accept(_) => return Ok(true),
                SimulatorResult::Reject(_) => return Ok(false),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatorResult {
    Pending,
    Accept(StateId),
    Reject(StateId),
}

/// Runs a [`Dfa`] one symbol at a time.
pub struct Simulator<'a> {
    dfa: &'a Dfa,
    input: &'a str,
    position: usize,
    state: StateId,
    halted: Option<SimulatorResult>,
}

impl<'a> Simulator<'a> {
    pub fn begin(dfa: &'a Dfa, input: &'a str) -> Result<Self, RunError> {
        let state = dfa.start.ok_or(RunError::MissingStartState)?;
        Ok(Self {
            dfa,
            input,
            position: 0,
            state,
            halted: None,
        })
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    /// Byte offset of the next symbol to consume.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Consumes one symbol. Once the simulator halts every further call
    /// returns the same result without emitting events.
    pub fn step(&mut self, observer: &mut impl RunObserver) -> SimulatorResult {
        if let Some(halted) = self.halted {
            return halted;
        }

        let Some(symbol) = self
            .input
            .get(self.position..)
            .and_then(|c| c.chars().next())
        else {
            let accepted = self.dfa[self.state].accepting;
            observer.observe(RunEvent::Finished {
                state: self.state,
                accepted,
            });
            return self.halt(if accepted {
                SimulatorResult::Accept(self.state)
            } else {
                SimulatorResult::Reject(self.state)
            });
        };

        match self.dfa[self.state].next_state(symbol) {
            Some(next) => {
                observer.observe(RunEvent::Consumed {
                    from: self.state,
                    symbol,
                    to: next,
                });
                self.state = next;
                self.position += symbol.len_utf8();
                SimulatorResult::Pending
            }
            None => {
                observer.observe(RunEvent::Stuck {
                    state: self.state,
                    symbol,
                    position: self.position,
                });
                self.halt(SimulatorResult::Reject(self.state))
            }
        }
    }

    fn halt(&mut self, result: SimulatorResult) -> SimulatorResult {
        self.halted = Some(result);
        result
    }
}

impl Display for Dfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let alphabet = self.alphabet();
        let width = self
            .states
            .iter()
            .map(|s| s.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);

        write!(f, "{:>4}", "")?;
        write!(f, "{:<width$}", "")?;
        for symbol in &alphabet {
            write!(f, " | {symbol:<width$}")?;
        }
        writeln!(f)?;

        for (id, state) in self.states() {
            let start = if self.start == Some(id) { "->" } else { "  " };
            let accepting = if state.accepting { "*" } else { " " };
            write!(f, "{start}{accepting} {:<width$}", state.name)?;
            for symbol in &alphabet {
                let target = state
                    .next_state(*symbol)
                    .map(|to| self[to].name.as_str())
                    .unwrap_or("-");
                write!(f, " | {target:<width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ------ loading

use crate::loader::{
    Context, Spanned,
    ast::Description,
    log::{Issue, LogSink},
};

impl Dfa {
    /// Builds the automaton a [`Description`] describes. Every problem is
    /// reported to `ctx`; the result is always the best automaton the
    /// description allows.
    pub fn compile(description: &Description<'_>, ctx: &mut Context<'_>) -> Dfa {
        let mut dfa = Dfa::new();

        let mut seen = HashSet::new();
        let names = description
            .start
            .iter()
            .chain(&description.accepting)
            .chain(&description.others);
        for Spanned(name, span) in names {
            if !seen.insert(*name) {
                continue;
            }
            let accepting = description.accepting.iter().any(|a| a.0 == *name);
            if let Err(err) = dfa.add_state(*name, accepting) {
                ctx.emit_error(err.to_string(), *span);
            }
        }

        for Spanned(transition, span) in &description.transitions {
            match dfa.add_transition(transition.from, transition.symbol, transition.to) {
                Ok(None) => {}
                Ok(Some(previous)) => {
                    let previous = dfa[previous].name().to_owned();
                    ctx.emit_warning(
                        format!(
                            "transition from {:?} on {:?} redefined (previously to {previous:?})",
                            transition.from, transition.symbol
                        ),
                        *span,
                    )
                    .issue(Issue::TransitionRedefined);
                }
                Err(err) => {
                    ctx.emit_warning(format!("{err}, transition dropped"), *span)
                        .issue(Issue::UnknownStateReference);
                }
            }
        }

        if let Some(Spanned(start, span)) = description.start
            && let Err(err) = dfa.set_start(start)
        {
            ctx.emit_error(err.to_string(), span)
                .issue(Issue::UnknownStateReference);
        }

        dfa
    }
}
