//! Source location tracking for error reporting.
//!
//! # Design
//!
//! - `Span` — compact source location (byte range plus file id)
//! - `SourceMap` — manages all source files and provides lookup operations
//! - `SourceFile` — single source file with line indexing
//!
//! # Examples
//!
//! ```
//! # use minitri_ast::foundation::span::*;
//! # use std::path::PathBuf;
//! let mut map = SourceMap::new();
//! let file_id = map.add_file(PathBuf::from("test.mt"), "let x ~ 42\nin x := 1".to_string());
//! let span = Span::new(file_id, 4, 5);
//!
//! assert_eq!(map.snippet(&span), "x");
//! assert_eq!(map.line_col(&span), (1, 5));
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

/// Compact source location reference.
///
/// Points to a byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Index into SourceMap.files
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0)
    }

    /// Create a span from a byte range.
    pub fn from_range(file_id: u16, range: Range<usize>) -> Self {
        Self::new(file_id, range.start as u32, range.end as u32)
    }

    /// Merge two spans (returns span covering both).
    ///
    /// # Panics
    /// Panics if spans are from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Collection of all source files in a compilation.
///
/// Provides lookup operations for converting Spans into human-readable
/// locations and snippets.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with line indexing.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute or relative path to this file
    pub path: PathBuf,
    /// Original source text
    pub source: String,
    /// Byte offsets of each line start
    ///
    /// line_starts[0] is always 0 (start of file).
    pub line_starts: Vec<u32>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        let id = self.files.len() as u16;
        self.files.push(SourceFile {
            path,
            source,
            line_starts,
        });
        id
    }

    /// Path of the file a span points into.
    ///
    /// # Panics
    /// Panics if the span's file id is unknown to this map.
    pub fn file_path(&self, span: &Span) -> &Path {
        &self.file(span).path
    }

    /// Source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = self.file(span);
        &file.source[span.start as usize..span.end as usize]
    }

    /// 1-based line and column of a span's start position.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        let file = self.file(span);
        let line = file.line_starts.partition_point(|&s| s <= span.start);
        let line_start = file.line_starts[line - 1];
        (line as u32, span.start - line_start + 1)
    }

    fn file(&self, span: &Span) -> &SourceFile {
        self.files
            .get(span.file_id as usize)
            .expect("BUG: span refers to a file not in this SourceMap")
    }
}
