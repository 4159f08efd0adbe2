//! # Source Ranges
//!
//! A `Span` names the file a node was parsed from together with the
//! positions of its first and last character. Both bounds are inclusive.
//!
//! The file name is reference counted: a module with a few thousand nodes
//! shares a single allocation for it.
use crate::Position;
use std::{
    cmp::{max, min},
    fmt,
    rc::Rc,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    file: Rc<str>,
    /// position of the first char in the span.
    start: Position,
    /// position of the last char in the span.
    end: Position,
}

impl Span {
    pub fn new(file: Rc<str>, a: Position, b: Position) -> Self {
        Self {
            file,
            start: min(a, b),
            end: max(a, b),
        }
    }

    pub fn from_single_position(file: Rc<str>, position: Position) -> Self {
        Self::new(file, position, position)
    }

    /// A span that points nowhere in particular. Used for synthesized
    /// nodes and in tests.
    pub fn dummy() -> Self {
        Self::from_single_position(Rc::from("<unknown>"), Position::new(0, 0))
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }
}

/// `file  start,end`, the prefix of every rendered diagnostic.
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {},{}", self.file, self.start, self.end)
    }
}
