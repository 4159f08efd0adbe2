use std::fmt;

/// A line/column pair. Both are one-based, the way editors and the parser
/// report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The position `columns` characters to the right on the same line.
    pub fn advance(self, columns: u32) -> Self {
        Self {
            line: self.line,
            column: self.column + columns,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
