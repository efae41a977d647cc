//! Incremental extraction of top-level objects from a JSON array.
//!
//! The scanner never holds more than the object currently being captured.
//! It tracks brace depth outside string literals and string/escape state
//! inside them; state survives across `consume` calls, so chunks may split
//! the input anywhere, including inside a string, an escape pair or a
//! multi-byte UTF-8 character.

use kbsplit_core::AppError;
use std::borrow::Cow;
use thiserror::Error;

/// Structural failure detected while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A `}` appeared with no open object.
    #[error("unbalanced '}}' at byte {offset}")]
    UnbalancedClose { offset: u64 },

    /// The input ended while an object was still open.
    #[error("input ended at byte {offset} inside an object opened at byte {object_start} (depth {depth})")]
    Truncated {
        offset: u64,
        object_start: u64,
        depth: usize,
    },
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Structural(err.to_string())
    }
}

/// Source text of one complete top-level object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    /// Byte offset of the opening `{` in the input
    pub offset: u64,

    /// Exact bytes from `{` to the matching `}`
    pub bytes: Vec<u8>,
}

impl RawObject {
    /// Text of the object, with invalid UTF-8 replaced (for logs).
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Totals for a scan that reached end of input cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub bytes: u64,
    pub objects: u64,
}

/// Scanner state carried between chunks.
#[derive(Debug, Default)]
pub struct ObjectScanner {
    depth: usize,
    in_string: bool,
    escaped: bool,
    buffer: Vec<u8>,
    offset: u64,
    object_start: u64,
    emitted: u64,
    failed: Option<ScanError>,
}

impl ObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk and return every object completed inside it.
    ///
    /// Bytes outside any object (the enclosing `[`, commas, whitespace,
    /// the closing `]`) are dropped.
    ///
    /// A stray `}` stops the scan. Objects completed before it in the same
    /// chunk are still returned; the error is held in [`Self::error`] and
    /// raised by every later `consume` and by `finish`.
    pub fn consume(&mut self, chunk: &[u8]) -> Result<Vec<RawObject>, ScanError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let mut completed = Vec::new();

        for &byte in chunk {
            let position = self.offset;
            self.offset += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'"' {
                    self.in_string = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                }
            } else {
                match byte {
                    b'{' => {
                        if self.depth == 0 {
                            self.buffer.clear();
                            self.object_start = position;
                        }
                        self.depth += 1;
                    }
                    b'}' => {
                        if self.depth == 0 {
                            self.failed = Some(ScanError::UnbalancedClose { offset: position });
                            break;
                        }
                        self.depth -= 1;
                        if self.depth == 0 {
                            self.buffer.push(byte);
                            self.emitted += 1;
                            completed.push(RawObject {
                                offset: self.object_start,
                                bytes: std::mem::take(&mut self.buffer),
                            });
                            continue;
                        }
                    }
                    b'"' => self.in_string = true,
                    _ => {}
                }
            }

            if self.depth > 0 {
                self.buffer.push(byte);
            }
        }

        Ok(completed)
    }

    /// Signal end of input.
    pub fn finish(self) -> Result<ScanSummary, ScanError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if self.depth > 0 {
            return Err(ScanError::Truncated {
                offset: self.offset,
                object_start: self.object_start,
                depth: self.depth,
            });
        }

        Ok(ScanSummary {
            bytes: self.offset,
            objects: self.emitted,
        })
    }

    /// Current count of unmatched `{`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Structural error that stopped the scan, if any.
    pub fn error(&self) -> Option<&ScanError> {
        self.failed.as_ref()
    }

    /// Objects emitted so far.
    pub fn objects_emitted(&self) -> u64 {
        self.emitted
    }

    /// Size of the partially captured object.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}
