use crate::loader::{Span, Spanned};

/// Splits a description into trimmed, non-blank lines.
///
/// Every span is a byte range into the original source, so diagnostics can
/// point back at the exact line or token.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    pub fn words(line: Spanned<&'a str>) -> Words<'a> {
        Words {
            line: line.0,
            base: line.1.0,
            position: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.input.len() {
            let start = self.position;
            let rest = &self.input[start..];
            let len = rest.find('\n').map(|v| v + 1).unwrap_or(rest.len());
            self.position += len;

            let raw = &rest[..len];
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let offset = start + (raw.len() - raw.trim_start().len());
            return Some(Spanned(trimmed, Span(offset, offset + trimmed.len())));
        }
        None
    }
}

pub struct Words<'a> {
    line: &'a str,
    base: usize,
    position: usize,
}

impl<'a> Iterator for Words<'a> {
    type Item = Spanned<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.line[self.position..];
        let start = self.position + (rest.len() - rest.trim_start().len());
        let rest = &self.line[start..];
        if rest.is_empty() {
            self.position = self.line.len();
            return None;
        }
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.position = start + len;
        Some(Spanned(
            &rest[..len],
            Span(self.base + start, self.base + start + len),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped() {
        let src = "\n  q1 q2 \r\n\n\t\nq0\n   ";
        let lines: Vec<_> = Lexer::new(src).collect();
        assert_eq!(
            lines,
            [Spanned("q1 q2", Span(3, 8)), Spanned("q0", Span(14, 16))]
        );
        for Spanned(line, Span(start, end)) in lines {
            assert_eq!(&src[start..end], line);
        }
    }

    #[test]
    fn words_keep_absolute_spans() {
        let src = "x\n0a1  ab\t1b1";
        let line = Lexer::new(src).nth(1).unwrap();
        let words: Vec<_> = Lexer::words(line).collect();
        assert_eq!(
            words,
            [
                Spanned("0a1", Span(2, 5)),
                Spanned("ab", Span(7, 9)),
                Spanned("1b1", Span(10, 13)),
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(Lexer::new("").count(), 0);
        assert_eq!(Lexer::new(" \n\n \t ").count(), 0);
        assert_eq!(Lexer::words(Spanned("", Span(0, 0))).count(), 0);
    }
}
