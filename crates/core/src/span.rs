//! Character spans in the `start:end` upload format.

use serde::{Deserialize, Serialize};

/// A half-open character span (`end` exclusive) into a context string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Parse the literal `start:end` format. Both parts must be plain
    /// decimal digits and `end >= start`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (start, end) = raw
            .split_once(':')
            .ok_or_else(|| format!("index '{raw}' is not in start:end format"))?;
        let parse_part = |part: &str| -> Result<usize, String> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("index '{raw}' is not in start:end format"));
            }
            part.parse()
                .map_err(|_| format!("index '{raw}' is out of range"))
        };
        let span = Self {
            start: parse_part(start)?,
            end: parse_part(end)?,
        };
        if span.end < span.start {
            return Err(format!("index '{raw}' ends before it starts"));
        }
        Ok(span)
    }

    /// Whether this span lies fully inside `outer`.
    pub fn within(&self, outer: &Span) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }

    /// Whether the span fits a context of `len` characters.
    pub fn fits(&self, len: usize) -> bool {
        self.end <= len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_spans() {
        assert_eq!(Span::parse("3:17").unwrap(), Span { start: 3, end: 17 });
        assert_eq!(Span::parse("0:0").unwrap(), Span { start: 0, end: 0 });
    }

    #[test]
    fn rejects_malformed_spans() {
        for raw in ["", "3", "3:", ":4", "a:b", "3:4:5", "-1:4", "3 :4"] {
            assert!(Span::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn rejects_inverted_spans() {
        assert!(Span::parse("5:3").is_err());
    }

    #[test]
    fn containment_and_fit() {
        let sentence = Span { start: 0, end: 20 };
        let token = Span { start: 4, end: 9 };
        assert!(token.within(&sentence));
        assert!(!sentence.within(&token));
        assert!(sentence.fits(20));
        assert!(!sentence.fits(19));
    }
}
