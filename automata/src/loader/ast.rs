use super::Spanned;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<'a> {
    pub from: &'a str,
    pub symbol: char,
    pub to: &'a str,
}

/// The sections of a description, before any state is resolved.
#[derive(Clone, Debug, Default)]
pub struct Description<'a> {
    pub accepting: Vec<Spanned<&'a str>>,
    pub start: Option<Spanned<&'a str>>,
    pub others: Vec<Spanned<&'a str>>,
    pub transitions: Vec<Spanned<Transition<'a>>>,
    pub tests: Vec<Spanned<&'a str>>,
}

impl<'a> Transition<'a> {
    /// Reads the compact `<from><symbol><to>` form, one character each.
    pub fn from_compact(token: &'a str) -> Option<Self> {
        let mut chars = token.char_indices();
        chars.next()?;
        let (symbol_at, symbol) = chars.next()?;
        let (to_at, _) = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Some(Transition {
            from: &token[..symbol_at],
            symbol,
            to: &token[to_at..],
        })
    }

    /// Reads `from,symbol,to`, where state names may be any length but the
    /// symbol is a single character. Names cannot contain ',', so the symbol
    /// sits between the first and the last comma and may itself be ','.
    pub fn from_delimited(token: &'a str) -> Option<Self> {
        let (from, rest) = token.split_once(',')?;
        let (symbol, to) = rest.rsplit_once(',')?;
        if from.is_empty() || to.is_empty() {
            return None;
        }
        let mut symbol = symbol.chars();
        let (Some(c), None) = (symbol.next(), symbol.next()) else {
            return None;
        };
        Some(Transition {
            from,
            symbol: c,
            to,
        })
    }
}
