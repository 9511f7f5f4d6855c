use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct Position {
    pub line: u32,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Position {
    pub fn new(line: u32, column: usize) -> Self {
        Position { line, column }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// Smallest range covering both `self` and `other`.
    pub fn merge(&self, other: &Range) -> Range {
        Range {
            start: std::cmp::min(self.start, other.start),
            end: std::cmp::max(self.end, other.end),
        }
    }
}

impl<'a> From<Span<'a>> for Range {
    fn from(span: Span<'a>) -> Self {
        let fragment = span.fragment();

        Range {
            start: Position {
                line: span.location_line(),
                column: span.get_utf8_column(),
            },
            end: Position {
                line: span.location_line(),
                column: span.get_utf8_column() + fragment.chars().count(),
            },
        }
    }
}

impl<'a> From<Span<'a>> for Position {
    fn from(span: Span<'a>) -> Self {
        Position {
            line: span.location_line(),
            column: span.get_utf8_column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::overlapping(
        Range::new(Position::new(1, 4), Position::new(1, 8)),
        Range::new(Position::new(1, 1), Position::new(1, 5)),
        Range::new(Position::new(1, 1), Position::new(1, 8))
    )]
    #[case::across_lines(
        Range::new(Position::new(2, 1), Position::new(2, 3)),
        Range::new(Position::new(1, 9), Position::new(1, 12)),
        Range::new(Position::new(1, 9), Position::new(2, 3))
    )]
    fn test_merge(#[case] a: Range, #[case] b: Range, #[case] expected: Range) {
        assert_eq!(a.merge(&b), expected);
    }

    #[test]
    fn test_from_span() {
        let span = Span::new("word");
        let range: Range = span.into();
        assert_eq!(range.start, Position::new(1, 1));
        assert_eq!(range.end, Position::new(1, 5));
    }
}
