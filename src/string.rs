//! The encoded-string model (C2). Grounded in `fsw_string` and the
//! `fsw_str*` family of functions in the original `fsw_core.h`/`fsw_core.c`.
//!
//! Rust's `alloc::string::String` already guarantees valid UTF-8, so the
//! UTF-8 variant here is a thin wrapper around one; the other encodings
//! keep their own byte/code-unit buffers, matching the on-disk byte
//! layouts the ext2 and ReiserFS drivers actually produce.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{FsError, FsResult};

/// The wire/on-disk encoding backing an [`EncodedString`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Empty,
    Iso8859_1,
    Utf8,
    Utf16Le,
}

/// A string tagged with its backing encoding. Cross-encoding equality is
/// defined for ISO-8859-1 against UTF-16LE (§4.2); pairs involving UTF-8
/// against a different encoding are recognized but not guaranteed equal,
/// matching the open case the original implementation leaves unresolved.
#[derive(Debug, Clone)]
pub enum EncodedString {
    Empty,
    Iso8859_1(Vec<u8>),
    Utf8(String),
    Utf16Le(Vec<u16>),
}

impl Default for EncodedString {
    fn default() -> Self {
        EncodedString::Empty
    }
}

impl EncodedString {
    pub fn encoding(&self) -> Encoding {
        match self {
            EncodedString::Empty => Encoding::Empty,
            EncodedString::Iso8859_1(_) => Encoding::Iso8859_1,
            EncodedString::Utf8(_) => Encoding::Utf8,
            EncodedString::Utf16Le(_) => Encoding::Utf16Le,
        }
    }

    /// Builds an ISO-8859-1 string from raw on-disk bytes, trimming
    /// trailing NUL padding (the common layout for fixed-size label
    /// fields in both ext2 and ReiserFS superblocks).
    pub fn from_iso8859_1_padded(bytes: &[u8]) -> Self {
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if len == 0 {
            EncodedString::Empty
        } else {
            EncodedString::Iso8859_1(bytes[..len].to_vec())
        }
    }

    /// Builds an ISO-8859-1 string from an exact-length byte slice with
    /// no NUL termination to trim (directory entry names, which are
    /// stored as `name_len` raw bytes rather than padded to a fixed
    /// field width).
    pub fn from_iso8859_1_exact(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            EncodedString::Empty
        } else {
            EncodedString::Iso8859_1(bytes)
        }
    }

    /// Character count; 0 for an empty string.
    pub fn len(&self) -> usize {
        match self {
            EncodedString::Empty => 0,
            EncodedString::Iso8859_1(b) => b.len(),
            EncodedString::Utf8(s) => s.chars().count(),
            EncodedString::Utf16Le(u) => u.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff the decoded character sequences are identical.
    pub fn eq(&self, other: &EncodedString) -> bool {
        use EncodedString::*;
        match (self, other) {
            (Empty, Empty) => true,
            (Empty, o) => o.is_empty(),
            (s, Empty) => s.is_empty(),
            (Iso8859_1(a), Iso8859_1(b)) => a == b,
            (Utf8(a), Utf8(b)) => a == b,
            (Utf16Le(a), Utf16Le(b)) => a == b,
            (Iso8859_1(a), Utf16Le(b)) | (Utf16Le(b), Iso8859_1(a)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(&c8, &c16)| c16 == c8 as u16)
            }
            // UTF-8 against a differing encoding: recognized but not
            // required to compare equal (§4.2, §9).
            _ => false,
        }
    }

    /// Convenience comparison against an ISO-8859-1 literal, e.g. `"."`
    /// or `".."` path components.
    pub fn eq_cstr(&self, literal: &str) -> bool {
        self.eq(&EncodedString::Iso8859_1(literal.as_bytes().to_vec()))
    }

    /// Allocates a copy of this string re-encoded as `target`. Supported
    /// conversions: identity (same encoding), and ISO-8859-1 to UTF-16LE
    /// widening. Anything else fails with [`FsError::Unsupported`].
    pub fn duplicate_coerced(&self, target: Encoding) -> FsResult<EncodedString> {
        if self.is_empty() {
            return Ok(EncodedString::Empty);
        }
        match (self, target) {
            (EncodedString::Iso8859_1(b), Encoding::Iso8859_1) => {
                Ok(EncodedString::Iso8859_1(b.clone()))
            }
            (EncodedString::Utf8(s), Encoding::Utf8) => Ok(EncodedString::Utf8(s.clone())),
            (EncodedString::Utf16Le(u), Encoding::Utf16Le) => Ok(EncodedString::Utf16Le(u.clone())),
            (EncodedString::Iso8859_1(b), Encoding::Utf16Le) => {
                Ok(EncodedString::Utf16Le(b.iter().map(|&c| c as u16).collect()))
            }
            _ => Err(FsError::Unsupported),
        }
    }

    /// Splits off the leading path component up to (not including) the
    /// first occurrence of `separator`, advancing `self` past it. An
    /// empty string yields an empty element and stays empty.
    pub fn split(&mut self, separator: char) -> EncodedString {
        match self {
            EncodedString::Empty => EncodedString::Empty,
            EncodedString::Iso8859_1(buf) => {
                let sep = separator as u8;
                match buf.iter().position(|&c| c == sep) {
                    Some(i) => {
                        let element = buf[..i].to_vec();
                        *buf = buf[i + 1..].to_vec();
                        if buf.is_empty() {
                            *self = EncodedString::Empty;
                        }
                        wrap_iso(element)
                    }
                    None => {
                        let element = core::mem::take(buf);
                        *self = EncodedString::Empty;
                        wrap_iso(element)
                    }
                }
            }
            EncodedString::Utf16Le(buf) => {
                let sep = separator as u16;
                match buf.iter().position(|&c| c == sep) {
                    Some(i) => {
                        let element = buf[..i].to_vec();
                        *buf = buf[i + 1..].to_vec();
                        if buf.is_empty() {
                            *self = EncodedString::Empty;
                        }
                        wrap_u16(element)
                    }
                    None => {
                        let element = core::mem::take(buf);
                        *self = EncodedString::Empty;
                        wrap_u16(element)
                    }
                }
            }
            EncodedString::Utf8(buf) => match buf.find(separator) {
                Some(i) => {
                    let element = buf[..i].to_string();
                    *buf = buf[i + separator.len_utf8()..].to_string();
                    if buf.is_empty() {
                        *self = EncodedString::Empty;
                    }
                    wrap_utf8(element)
                }
                None => {
                    let element = core::mem::take(buf);
                    *self = EncodedString::Empty;
                    wrap_utf8(element)
                }
            },
        }
    }
}

fn wrap_iso(b: Vec<u8>) -> EncodedString {
    if b.is_empty() {
        EncodedString::Empty
    } else {
        EncodedString::Iso8859_1(b)
    }
}

fn wrap_u16(b: Vec<u16>) -> EncodedString {
    if b.is_empty() {
        EncodedString::Empty
    } else {
        EncodedString::Utf16Le(b)
    }
}

fn wrap_utf8(s: String) -> EncodedString {
    if s.is_empty() {
        EncodedString::Empty
    } else {
        EncodedString::Utf8(s)
    }
}
