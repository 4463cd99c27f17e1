use std::fmt::Display;

use crate::loader::Span;

/// Non-fatal problems the loader knows how to recover from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum Issue {
    MalformedTransitionToken,
    UnknownStateReference,
    TransitionRedefined,
    MissingLine,
    EmptyStart,
    AmbiguousLayout,
    ExtraStartTokens,
    MalformedSection,
    UnknownSection,
    DuplicateSection,
}

#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Logs {
    logs: Vec<LogEntry>,
    has_error: bool,
}

pub trait LogSink {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry;

    fn emit_error_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(msg, None, LogLevel::Error))
    }

    fn emit_error(&mut self, msg: impl Into<String>, span: Span) -> &mut LogEntry {
        self.emit(LogEntry::new(msg, Some(span), LogLevel::Error))
    }

    fn emit_warning(&mut self, msg: impl Into<String>, span: Span) -> &mut LogEntry {
        self.emit(LogEntry::new(msg, Some(span), LogLevel::Warning))
    }

    fn emit_warning_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(msg, None, LogLevel::Warning))
    }

    fn emit_help_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(msg, None, LogLevel::Help))
    }
}

impl LogSink for Logs {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry {
        self.has_error |= matches!(entry.level, LogLevel::Error);
        self.logs.push(entry);
        let last = self.logs.len() - 1;
        &mut self.logs[last]
    }
}

impl Logs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_errors(&self) -> bool {
        self.has_error
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Top-level issues in emission order.
    pub fn issues(&self) -> impl Iterator<Item = Issue> + '_ {
        self.logs.iter().filter_map(|entry| entry.issue)
    }

    /// Renders entries against `src`; `color` adds ANSI styling.
    pub fn display_with<'a>(
        &'a self,
        src: &'a str,
        color: bool,
    ) -> impl Iterator<Item = LogEntryDisplay<'a>> {
        self.logs
            .iter()
            .map(move |entry| LogEntryDisplay { src, entry, color })
    }

    pub fn displayable_with<'a>(
        &'a self,
        src: &'a str,
    ) -> impl Iterator<Item = LogEntryDisplay<'a>> {
        self.display_with(src, true)
    }

    pub fn plain_with<'a>(&'a self, src: &'a str) -> impl Iterator<Item = LogEntryDisplay<'a>> {
        self.display_with(src, false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum LogLevel {
    Warning,
    Error,
    Help,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LogEntry {
    pub message: String,
    pub span: Option<Span>,
    pub level: LogLevel,
    pub issue: Option<Issue>,
    pub child: Option<Box<LogEntry>>,
}

impl LogEntry {
    pub fn new(msg: impl Into<String>, span: Option<Span>, level: LogLevel) -> Self {
        Self {
            message: msg.into(),
            span,
            level,
            issue: None,
            child: None,
        }
    }

    pub fn issue(&mut self, issue: Issue) -> &mut Self {
        self.issue = Some(issue);
        self
    }
}

/// Attaches a follow-up note (usually help) to an entry.
impl LogSink for LogEntry {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry {
        self.child.insert(Box::new(entry))
    }
}

pub struct LogEntryDisplay<'a> {
    src: &'a str,
    entry: &'a LogEntry,
    color: bool,
}

impl<'a> Display for LogEntryDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const RESET: &str = "\x1b[0;22m";
        const BOLD: &str = "\x1b[1m";
        const RED: &str = "\x1b[31m";
        const GREEN: &str = "\x1b[32m";
        const YELLOW: &str = "\x1b[33m";
        const CYAN: &str = "\x1b[36m";

        let paint = |code: &'static str| if self.color { code } else { "" };
        let (reset, bold, cyan) = (paint(RESET), paint(BOLD), paint(CYAN));

        let mut next_entry = Some(self.entry);
        while let Some(entry) = next_entry {
            let (label, color) = match entry.level {
                LogLevel::Help => ("help", GREEN),
                LogLevel::Warning => ("warning", YELLOW),
                LogLevel::Error => ("error", RED),
            };
            writeln!(
                f,
                "{bold}{}{label}{reset}{bold}: {}{reset}",
                paint(color),
                entry.message
            )?;

            // spans produced by the loader never cross a line break
            if let Some(Span(start, end)) = entry.span
                && let Some(before) = self.src.get(..start)
            {
                let line_start = before.rfind('\n').map(|v| v + 1).unwrap_or(0);
                let line_end = self.src[start..]
                    .find('\n')
                    .map(|v| v + start)
                    .unwrap_or(self.src.len());
                let line = self.src[line_start..line_end].trim_end_matches('\r');
                let number = before.matches('\n').count() + 1;
                let gutter = number.to_string().len();

                writeln!(f, "{bold}{cyan}{number}: {reset}{}", line.replace('\t', " "))?;
                write!(f, "{bold}{cyan}{:gutter$}  ", "")?;
                let underline_from = self.src[line_start..start].chars().count();
                let underline_len = self
                    .src
                    .get(start..end.min(line_end))
                    .map(|s| s.chars().count())
                    .unwrap_or(0)
                    .max(1);
                writeln!(
                    f,
                    "{:underline_from$}{}{reset}",
                    "",
                    "~".repeat(underline_len)
                )?;
            }
            next_entry = entry.child.as_deref();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_tracked() {
        let mut logs = Logs::new();
        logs.emit_warning("careful", Span(0, 1));
        assert!(!logs.contains_errors());
        logs.emit_error_locless("broken").issue(Issue::MissingLine);
        assert!(logs.contains_errors());
        assert_eq!(logs.issues().collect::<Vec<_>>(), [Issue::MissingLine]);
        assert_eq!(logs.entries().len(), 2);
    }

    #[test]
    fn children_chain() {
        let mut logs = Logs::new();
        logs.emit_warning_locless("outer").emit_help_locless("inner");
        let entry = &logs.entries()[0];
        assert_eq!(entry.child.as_ref().map(|c| c.message.as_str()), Some("inner"));
        assert!(matches!(entry.child.as_ref().map(|c| c.level), Some(LogLevel::Help)));
    }

    #[test]
    fn color_is_optional() {
        let src = "a\n";
        let mut logs = Logs::new();
        logs.emit_error("bad", Span(0, 1));

        let colored = logs.display_with(src, true).next().unwrap().to_string();
        assert!(colored.contains("\x1b[31m"));
        assert_eq!(colored, logs.displayable_with(src).next().unwrap().to_string());

        let plain = logs.display_with(src, false).next().unwrap().to_string();
        assert!(!plain.contains('\x1b'));
        assert_eq!(plain, "error: bad\n1: a\n   ~\n");
        assert_eq!(plain, logs.plain_with(src).next().unwrap().to_string());
    }

    #[test]
    fn plain_display_underlines_span() {
        let src = "q1\nq0\n0a1 ab 1b1\n";
        let mut logs = Logs::new();
        logs.emit_warning("malformed transition", Span(10, 12))
            .emit_help_locless("transitions are written as three characters");

        let rendered = logs.plain_with(src).next().unwrap().to_string();
        let expected = [
            "warning: malformed transition",
            "3: 0a1 ab 1b1",
            "       ~~",
            "help: transitions are written as three characters",
            "",
        ];
        assert_eq!(rendered, expected.join("\n"));
    }
}
