//! Source location tracking for diagnostics.
//!
//! Provides [`Span`] to point at the offending source location and [`Name`],
//! an identifier together with the span where it was written. Names double as
//! edge labels in dependency and capture bookkeeping.

use std::fmt;

/// A span of source code, represented by its starting position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// An identifier and the location it was written at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub span: Span,
    pub string: String,
}

impl Name {
    pub fn new(string: impl Into<String>, span: Span) -> Self {
        Self {
            span,
            string: string.into(),
        }
    }

    /// A name with no source location, used for built-ins.
    pub fn synthetic(string: impl Into<String>) -> Self {
        Self::new(string, Span::default())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.string
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}
