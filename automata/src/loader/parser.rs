use std::collections::HashSet;

use crate::loader::log::{Issue, LogSink};
use crate::loader::{Context, EPSILON, Layout, Options, SECTIONED_MARKER, Span};

use crate::loader::Spanned as S;

use super::ast::*;
use super::lexer::Lexer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Section {
    Accepting,
    Start,
    States,
    Transitions,
    Tests,
}

pub struct Parser<'a, 'b> {
    ctx: &'b mut Context<'a>,
    options: Options,
}

impl<'a, 'b> Parser<'a, 'b> {
    pub fn new(ctx: &'b mut Context<'a>, options: Options) -> Self {
        Parser { ctx, options }
    }

    pub fn parse(&mut self) -> Description<'a> {
        let lines: Vec<_> = Lexer::new(self.ctx.src()).collect();
        let sectioned = match self.options.layout {
            Layout::Auto => lines.first().is_some_and(|l| l.0 == SECTIONED_MARKER),
            Layout::Legacy => false,
            Layout::Sectioned => true,
        };
        if sectioned {
            self.parse_sectioned(&lines)
        } else {
            self.parse_legacy(&lines)
        }
    }

    /// ```text
    /// <accepting states>
    /// <start state>
    /// [<other states>]
    /// <transitions>
    /// <test strings>...
    /// ```
    ///
    /// The optional state line is only recognised by shape: if the first
    /// token of the third line is three characters long the line is taken to
    /// be the transition list.
    fn parse_legacy(&mut self, lines: &[S<&'a str>]) -> Description<'a> {
        let mut description = Description::default();
        let eof = self.ctx.eof();
        let mut lines = lines.iter().copied();

        let Some(accepting) = lines.next() else {
            self.ctx
                .emit_error_locless("empty description, expected a line of accepting states")
                .issue(Issue::MissingLine);
            return description;
        };
        description.accepting = Lexer::words(accepting).collect();

        let Some(start) = lines.next() else {
            self.ctx
                .emit_error("expected the start state on the second line", eof)
                .issue(Issue::MissingLine);
            return description;
        };
        self.parse_start(start, &mut description);

        let Some(third) = lines.next() else {
            self.ctx
                .emit_error("expected a line of transitions", eof)
                .issue(Issue::MissingLine);
            return description;
        };

        let first_len = Lexer::words(third).next().map(|w| w.0.chars().count());
        let transitions = if first_len == Some(3) {
            if self.options.flag_ambiguity
                && let Some(odd) = Lexer::words(third).find(|w| w.0.chars().count() != 3)
            {
                self.ctx
                    .emit_warning(
                        "line read as transitions because its first token is three characters long",
                        third.1,
                    )
                    .issue(Issue::AmbiguousLayout)
                    .emit_help_locless(format!(
                        "{:?} is not a transition; if this line lists states, rename the first one or use the '{SECTIONED_MARKER}' layout",
                        odd.0
                    ));
            }
            third
        } else {
            description.others = Lexer::words(third).collect();
            let Some(line) = lines.next() else {
                self.ctx
                    .emit_error("expected a line of transitions after the state list", eof)
                    .issue(Issue::MissingLine);
                return description;
            };
            line
        };

        for word in Lexer::words(transitions) {
            match Transition::from_compact(word.0) {
                Some(transition) => description.transitions.push(S(transition, word.1)),
                None => self.malformed_transition(word, "<from><symbol><to>"),
            }
        }

        description.tests = lines.collect();
        description
    }

    /// ```text
    /// %dfa
    /// accept: q1
    /// start: q0
    /// states: q2 q3
    /// transitions: q0,a,q1 q1,a,q0
    /// tests:
    /// aa
    /// ~
    /// ```
    ///
    /// Sections before `tests:` may come in any order; every line after it
    /// is a test string.
    fn parse_sectioned(&mut self, lines: &[S<&'a str>]) -> Description<'a> {
        let mut description = Description::default();
        let mut lines = lines.iter().copied().peekable();
        if lines.peek().is_some_and(|l| l.0 == SECTIONED_MARKER) {
            lines.next();
        }

        let mut seen = HashSet::new();
        while let Some(line) = lines.next() {
            let Some((key, value)) = split_section(line) else {
                self.ctx
                    .emit_error("expected a section of the form `key: value`", line.1)
                    .issue(Issue::MalformedSection);
                continue;
            };

            let section = match key.0 {
                "accept" | "accepting" | "final" => Section::Accepting,
                "start" | "initial" => Section::Start,
                "states" => Section::States,
                "transitions" | "delta" => Section::Transitions,
                "tests" => Section::Tests,
                name => {
                    self.ctx
                        .emit_warning(
                            format!("unknown section {name:?}, expected 'accept' | 'start' | 'states' | 'transitions' | 'tests'"),
                            key.1,
                        )
                        .issue(Issue::UnknownSection);
                    continue;
                }
            };
            if !seen.insert(section) {
                self.ctx
                    .emit_warning("section already set, replacing the earlier one", key.1)
                    .issue(Issue::DuplicateSection);
            }

            match section {
                Section::Accepting => description.accepting = Lexer::words(value).collect(),
                Section::Start => {
                    description.start = None;
                    self.parse_start(value, &mut description);
                    if description.start.is_none() {
                        self.ctx
                            .emit_error("start state cannot be empty", line.1)
                            .issue(Issue::EmptyStart);
                    }
                }
                Section::States => description.others = Lexer::words(value).collect(),
                Section::Transitions => {
                    description.transitions.clear();
                    for word in Lexer::words(value) {
                        // `0,1` is the compact form with ',' as its symbol
                        let transition = Transition::from_delimited(word.0)
                            .or_else(|| Transition::from_compact(word.0));
                        match transition {
                            Some(transition) => {
                                description.transitions.push(S(transition, word.1))
                            }
                            None => self.malformed_transition(
                                word,
                                "<from>,<symbol>,<to> or <from><symbol><to>",
                            ),
                        }
                    }
                }
                Section::Tests => {
                    let first = trim(value);
                    if !first.0.is_empty() {
                        description.tests.push(test_string(first));
                    }
                    description.tests.extend(lines.by_ref().map(test_string));
                }
            }
        }

        if !seen.contains(&Section::Start) {
            self.ctx
                .emit_error_locless("start state never defined")
                .issue(Issue::MissingLine)
                .emit_help_locless("add: start: <state>");
        }

        description
    }

    fn parse_start(&mut self, line: S<&'a str>, description: &mut Description<'a>) {
        let mut words = Lexer::words(line);
        description.start = words.next();
        for S(extra, span) in words {
            self.ctx
                .emit_warning(
                    format!("unexpected {extra:?}, the start state is a single name"),
                    span,
                )
                .issue(Issue::ExtraStartTokens);
        }
    }

    fn malformed_transition(&mut self, word: S<&'a str>, form: &str) {
        self.ctx
            .emit_warning(format!("malformed transition {:?}, skipped", word.0), word.1)
            .issue(Issue::MalformedTransitionToken)
            .emit_help_locless(format!("transitions are written as {form}"));
    }
}

fn split_section<'a>(line: S<&'a str>) -> Option<(S<&'a str>, S<&'a str>)> {
    let (key, value) = line.0.split_once(':')?;
    let key = trim(S(key, Span(line.1.0, line.1.0 + key.len())));
    if key.0.is_empty() {
        return None;
    }
    let value_start = line.1.0 + line.0.len() - value.len();
    Some((key, S(value, Span(value_start, line.1.1))))
}

fn trim(S(text, Span(start, _)): S<&str>) -> S<&str> {
    let start = start + (text.len() - text.trim_start().len());
    let text = text.trim();
    S(text, Span(start, start + text.len()))
}

fn test_string(line: S<&str>) -> S<&str> {
    if EPSILON.contains(&line.0) {
        S("", line.1)
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::log::{LogLevel, Logs};

    fn parse(src: &str, options: Options) -> (Description<'_>, Logs) {
        let mut ctx = Context::new(src);
        let description = Parser::new(&mut ctx, options).parse();
        (description, ctx.into_logs())
    }

    fn names<'a>(items: &[S<&'a str>]) -> Vec<&'a str> {
        items.iter().map(|S(name, _)| *name).collect()
    }

    fn transitions(description: &Description<'_>) -> Vec<String> {
        description
            .transitions
            .iter()
            .map(|S(t, _)| format!("{}{}{}", t.from, t.symbol, t.to))
            .collect()
    }

    #[test]
    fn legacy_without_state_list() {
        let src = "1\n0\n0a1 1a0 1b1 0b0\na\naa\n\nab\n";
        let (description, logs) = parse(src, Options::default());
        assert!(logs.is_empty());
        assert_eq!(names(&description.accepting), ["1"]);
        assert_eq!(description.start.map(|s| s.0), Some("0"));
        assert!(description.others.is_empty());
        assert_eq!(transitions(&description), ["0a1", "1a0", "1b1", "0b0"]);
        assert_eq!(names(&description.tests), ["a", "aa", "ab"]);
    }

    #[test]
    fn legacy_with_state_list() {
        let src = "  A B \nS\nX Y\nSaA AbB BcX\nabc\n";
        let (description, logs) = parse(src, Options::default());
        assert!(logs.is_empty());
        assert_eq!(names(&description.accepting), ["A", "B"]);
        assert_eq!(names(&description.others), ["X", "Y"]);
        assert_eq!(transitions(&description), ["SaA", "AbB", "BcX"]);
        assert_eq!(names(&description.tests), ["abc"]);
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        let src = "1\n0\n0a1 ab 1b1 0b0x\n";
        let options = Options {
            flag_ambiguity: false,
            ..Options::default()
        };
        let (description, logs) = parse(src, options);
        assert_eq!(transitions(&description), ["0a1", "1b1"]);
        assert_eq!(
            logs.issues().collect::<Vec<_>>(),
            [Issue::MalformedTransitionToken, Issue::MalformedTransitionToken]
        );
        assert!(!logs.contains_errors());
        let spans: Vec<_> = logs.entries().iter().filter_map(|e| e.span).collect();
        assert_eq!(spans, [Span(8, 10), Span(15, 19)]);
    }

    #[test]
    fn mixed_length_transition_line_is_flagged() {
        let src = "1\n0\n0a1 q7\n";
        let (description, logs) = parse(src, Options::default());
        assert_eq!(transitions(&description), ["0a1"]);
        assert!(description.others.is_empty());
        assert_eq!(
            logs.issues().collect::<Vec<_>>(),
            [Issue::AmbiguousLayout, Issue::MalformedTransitionToken]
        );
        assert!(matches!(logs.entries()[0].level, LogLevel::Warning));
    }

    #[test]
    fn three_character_state_name_reads_as_transition() {
        // "xyz" was meant as the list of other states; the heuristic takes it
        // as the transition x --y--> z and the real transition line becomes a
        // test string
        let src = "1\n0\nxyz\n0a1 1a0\naa\n";
        let (description, logs) = parse(src, Options::default());
        assert!(description.others.is_empty());
        assert_eq!(transitions(&description), ["xyz"]);
        assert_eq!(names(&description.tests), ["0a1 1a0", "aa"]);
        assert!(logs.is_empty());
    }

    #[test]
    fn two_character_first_token_reads_as_state_list() {
        let src = "q1\nq0\nq2 abc\n0a1\n";
        let (description, _) = parse(src, Options::default());
        assert_eq!(names(&description.others), ["q2", "abc"]);
        assert_eq!(transitions(&description), ["0a1"]);
        assert!(description.tests.is_empty());
    }

    #[test]
    fn extra_start_tokens_warn() {
        let src = "1\n0 2\n0a1\n";
        let (description, logs) = parse(src, Options::default());
        assert_eq!(description.start.map(|s| s.0), Some("0"));
        assert_eq!(logs.issues().collect::<Vec<_>>(), [Issue::ExtraStartTokens]);
        assert_eq!(logs.entries()[0].span, Some(Span(4, 5)));
    }

    #[test]
    fn missing_lines_are_errors() {
        for (src, expected_start) in [
            ("", None),
            ("1\n", None),
            ("1\n0\n", Some("0")),
            ("1\n0\nq2 q3\n", Some("0")),
        ] {
            let (description, logs) = parse(src, Options::default());
            assert!(logs.contains_errors(), "{src:?}");
            assert_eq!(logs.issues().collect::<Vec<_>>(), [Issue::MissingLine]);
            assert_eq!(description.start.map(|s| s.0), expected_start);
            assert!(description.transitions.is_empty());
        }
    }

    #[test]
    fn sectioned_layout() {
        let src = "%dfa\n\
                   start: q0\n\
                   accept: q1\n\
                   states: q2\n\
                   transitions: q0,a,q1 q1,a,q0 0b0\n\
                   tests:\n\
                   aa\n\
                   ~\n\
                   start: not a section\n";
        let (description, logs) = parse(src, Options::default());
        assert!(logs.is_empty());
        assert_eq!(description.start.map(|s| s.0), Some("q0"));
        assert_eq!(names(&description.accepting), ["q1"]);
        assert_eq!(names(&description.others), ["q2"]);
        assert_eq!(transitions(&description), ["q0aq1", "q1aq0", "0b0"]);
        assert_eq!(names(&description.tests), ["aa", "", "start: not a section"]);
    }

    #[test]
    fn sectioned_empty_accepting_and_inline_test() {
        let src = "%dfa\naccept:\nstart: s\ntransitions: sas\ntests: a\n";
        let (description, logs) = parse(src, Options::default());
        assert!(logs.is_empty());
        assert!(description.accepting.is_empty());
        assert_eq!(names(&description.tests), ["a"]);
        let S(_, span) = description.tests[0];
        assert_eq!(&src[span.0..span.1], "a");
    }

    #[test]
    fn sectioned_problems() {
        let src = "%dfa\nstart: q0\nbogus: 1\nno colon here\nstart: q1\ntransitions: q0,ab,q1\n";
        let (description, logs) = parse(src, Options::default());
        assert_eq!(description.start.map(|s| s.0), Some("q1"));
        assert!(description.transitions.is_empty());
        assert_eq!(
            logs.issues().collect::<Vec<_>>(),
            [
                Issue::UnknownSection,
                Issue::MalformedSection,
                Issue::DuplicateSection,
                Issue::MalformedTransitionToken,
            ]
        );
    }

    #[test]
    fn sectioned_comma_symbol() {
        let src = "%dfa\nstart: 0\ntransitions: 0,1 q0,,,q1 a,b q0,ab,q1\n";
        let (description, logs) = parse(src, Options::default());
        assert_eq!(transitions(&description), ["0,1", "q0,q1", "a,b"]);
        assert_eq!(
            logs.issues().collect::<Vec<_>>(),
            [Issue::MalformedTransitionToken]
        );
        assert_eq!(logs.entries()[0].span, Some(Span(43, 51)));
    }

    #[test]
    fn sectioned_empty_start() {
        let (description, logs) = parse("%dfa\nstart:\naccept: a\n", Options::default());
        assert!(description.start.is_none());
        assert!(logs.contains_errors());
        assert_eq!(logs.issues().collect::<Vec<_>>(), [Issue::EmptyStart]);
    }

    #[test]
    fn sectioned_without_start() {
        let (description, logs) = parse("%dfa\naccept: a\n", Options::default());
        assert!(description.start.is_none());
        assert!(logs.contains_errors());
        assert_eq!(logs.issues().collect::<Vec<_>>(), [Issue::MissingLine]);
    }

    #[test]
    fn forced_layouts() {
        let src = "start: s\ntransitions: sas\n";
        let options = Options {
            layout: Layout::Sectioned,
            ..Options::default()
        };
        let (description, _) = parse(src, options);
        assert_eq!(description.start.map(|s| s.0), Some("s"));

        // the marker is just another line to the legacy parser
        let src = "%dfa\nstart: s\n";
        let (description, _) = parse(src, Options { layout: Layout::Legacy, ..Options::default() });
        assert_eq!(names(&description.accepting), ["%dfa"]);
        assert_eq!(description.start.map(|s| s.0), Some("start:"));
    }
}
