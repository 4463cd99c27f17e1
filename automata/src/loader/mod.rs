use crate::{
    automatan::dfa::Dfa,
    loader::log::{LogEntry, LogSink, Logs},
};

pub mod ast;
pub mod lexer;
pub mod log;
pub mod parser;

/// First line of a description written in the sectioned layout.
pub const SECTIONED_MARKER: &str = "%dfa";

/// Spellings of the empty test string in the sectioned layout.
pub const EPSILON: &[&str] = &["~", "epsilon", "ε", "ϵ", "ɛ"];

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span(pub usize, pub usize);

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct Spanned<T>(pub T, pub Span);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Sectioned if the description starts with [`SECTIONED_MARKER`],
    /// legacy otherwise.
    #[default]
    Auto,
    /// Position-dependent lines; the third line is classified by the length
    /// of its first token.
    Legacy,
    /// `key: value` sections after the marker line.
    Sectioned,
}

#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub layout: Layout,
    /// Warn when the legacy heuristic reads a line as transitions even
    /// though some of its tokens are not three characters long.
    pub flag_ambiguity: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            layout: Layout::Auto,
            flag_ambiguity: true,
        }
    }
}

pub struct Context<'a> {
    logs: Logs,
    src: &'a str,
}

impl<'a> LogSink for Context<'a> {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry {
        self.logs.emit(entry)
    }
}

impl<'a> Context<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            logs: Logs::new(),
            src,
        }
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    pub fn eof(&self) -> Span {
        Span(self.src.len(), self.src.len())
    }

    pub fn into_logs(self) -> Logs {
        self.logs
    }
}

/// An automaton together with the test strings that followed it and
/// everything the loader had to say about the description.
#[derive(Debug)]
pub struct Loaded {
    pub dfa: Dfa,
    pub tests: Vec<String>,
    pub logs: Logs,
}

/// Loads a description. Never fails: problems end up in [`Loaded::logs`]
/// and the automaton holds whatever could be recovered.
pub fn load(src: &str, options: Options) -> Loaded {
    let mut ctx = Context::new(src);
    let description = parser::Parser::new(&mut ctx, options).parse();
    let dfa = Dfa::compile(&description, &mut ctx);
    Loaded {
        dfa,
        tests: description
            .tests
            .iter()
            .map(|Spanned(test, _)| test.to_string())
            .collect(),
        logs: ctx.into_logs(),
    }
}
