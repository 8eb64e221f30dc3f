// Copyright 2026 keypack developers, https://github.com/keypack-rs/keypack
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Streaming tokenizer over an encoded tuple

use std::borrow::Cow;

use memchr::{memchr, memchr_iter};

use crate::element::{
    self, BYTES, DECIMAL, DIRECTORY, DOUBLE, ESCAPE, FALSE, FLOAT, INTZERO, LEGACY_NESTED,
    NEGINTSTART, NESTED, NIL, POSINTEND, STRING, SYSTEM, TRUE, UUID, UUID64, VERSIONSTAMP,
    VERSIONSTAMP_USER,
};
use crate::error::{PackError, PackResult};
use crate::writer::MAX_NESTING_DEPTH;

/// Streaming parser over an encoded tuple.
///
/// The reader borrows the input and walks it element by element without
/// decoding payloads: [`parse_next`](TupleReader::parse_next) yields the byte
/// extent of the next element. The depth counter mirrors the writer's and
/// controls how a `0x00` byte is read: at depth 0 it is a Nil element, at
/// depth ≥ 1 it is a Nil only when followed by `0xFF` and otherwise
/// terminates the current nested tuple.
#[derive(Debug, Clone)]
pub struct TupleReader<'de> {
    input: &'de [u8],
    pos: usize,
    depth: usize,
}

impl<'de> TupleReader<'de> {
    /// Starts tokenizing a top-level tuple encoding.
    pub fn new(input: &'de [u8]) -> Self {
        TupleReader {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Starts tokenizing the raw payload of a nested tuple (nesting code and
    /// terminator already stripped), so Nil escaping is in force from the
    /// first byte.
    pub fn embedded(input: &'de [u8]) -> Self {
        TupleReader {
            input,
            pos: 0,
            depth: 1,
        }
    }

    /// The byte at the cursor, if any.
    pub fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Current cursor offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of currently open nested tuples.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bytes left between the cursor and the end of the input.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// The not-yet-consumed tail of the input.
    pub fn rest(&self) -> &'de [u8] {
        &self.input[self.pos..]
    }

    /// Advances past the next element and returns its complete on-wire form,
    /// type code and terminator included.
    ///
    /// Returns `Ok(None)` at end of input, or when an end-of-nested-tuple
    /// marker is consumed at depth ≥ 1. No payload is decoded; truncated
    /// input, the legacy nested code `0x03` and unknown codes fail with
    /// `MalformedInput`.
    pub fn parse_next(&mut self) -> PackResult<Option<&'de [u8]>> {
        let code = match self.input.get(self.pos) {
            None => return Ok(None),
            Some(&code) => code,
        };
        if code == NIL && self.depth > 0 && self.input.get(self.pos + 1) != Some(&ESCAPE) {
            // end-of-nested marker
            self.pos += 1;
            return Ok(None);
        }
        let len = element_len(self.input, self.pos, self.depth)?;
        let span = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(Some(span))
    }

    /// Skips the next `n` elements.
    ///
    /// Fails with `MalformedInput` when the stream ends, or an element is
    /// malformed, before `n` elements went by.
    pub fn skip(&mut self, n: usize) -> PackResult<()> {
        for _ in 0..n {
            if self.parse_next()?.is_none() {
                return Err(PackError::truncated(self.pos));
            }
        }
        Ok(())
    }

    pub(crate) fn parse_byte(&mut self) -> PackResult<u8> {
        match self.input.get(self.pos) {
            None => Err(PackError::truncated(self.pos)),
            Some(&byte) => {
                self.pos += 1;
                Ok(byte)
            }
        }
    }

    pub(crate) fn parse_bytes(&mut self, n: usize) -> PackResult<&'de [u8]> {
        if self.remaining() < n {
            return Err(PackError::truncated(self.input.len()));
        }
        let bytes = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Error for finding `found` where a specific element type was required:
    /// a valid but different type code means the conversion is unsupported,
    /// anything else means the input is broken. Decimal stays unimplemented
    /// whatever the requested type.
    pub(crate) fn mismatch_at(&self, offset: usize, found: u8) -> PackError {
        if found == DECIMAL {
            PackError::Unimplemented { offset }
        } else if element::is_known_code(found) {
            PackError::UnsupportedCoercion {
                code: found,
                offset,
            }
        } else {
            PackError::MalformedInput { offset }
        }
    }

    pub(crate) fn mismatch(&self, found: u8) -> PackError {
        self.mismatch_at(self.pos, found)
    }

    pub(crate) fn expect(&mut self, expected: u8) -> PackResult<()> {
        let offset = self.pos;
        let found = self.parse_byte()?;
        if found == expected {
            Ok(())
        } else {
            Err(self.mismatch_at(offset, found))
        }
    }

    /// Consumes a Nil element, honoring depth-sensitive escaping.
    pub(crate) fn parse_nil(&mut self) -> PackResult<()> {
        self.expect(NIL)?;
        if self.depth > 0 {
            let offset = self.pos;
            let found = self.parse_byte()?;
            if found != ESCAPE {
                return Err(PackError::MalformedInput { offset });
            }
        }
        Ok(())
    }

    /// Consumes the nesting code and enters the nested tuple.
    pub(crate) fn enter_nested(&mut self) -> PackResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(PackError::DepthExceeded {
                max: MAX_NESTING_DEPTH,
            });
        }
        self.expect(NESTED)?;
        self.depth += 1;
        Ok(())
    }

    /// Consumes the end-of-nested terminator and leaves the nested tuple.
    pub(crate) fn leave_nested(&mut self) -> PackResult<()> {
        if self.depth == 0 {
            return Err(PackError::UnbalancedNesting { depth: 0 });
        }
        let offset = self.pos;
        let found = self.parse_byte()?;
        if found != NIL {
            return Err(self.mismatch_at(offset, found));
        }
        self.depth -= 1;
        Ok(())
    }

    /// True when the cursor sits on the end of the current tuple: end of
    /// input, or (at depth ≥ 1) an unescaped terminator byte.
    pub(crate) fn at_tuple_end(&self) -> bool {
        match self.peek_byte() {
            None => true,
            Some(NIL) if self.depth > 0 => self.input.get(self.pos + 1) != Some(&ESCAPE),
            _ => false,
        }
    }

    /// Reads an escaped string/bytes payload through its terminator,
    /// borrowing when no escape sequences occur.
    pub(crate) fn parse_slice(&mut self) -> PackResult<Cow<'de, [u8]>> {
        let start = self.pos;
        let input = &self.input[start..];
        let mut bytes = Vec::new();
        let mut pos = 0;
        for idx in memchr_iter(NIL, input) {
            let next = idx + 1;
            if input.get(next) == Some(&ESCAPE) {
                // keep the NUL, drop the escape
                bytes.extend_from_slice(&input[pos..next]);
                pos = next + 1;
            } else {
                let slice = &input[pos..idx];
                self.pos = start + next;
                return Ok(if pos == 0 {
                    Cow::Borrowed(slice)
                } else {
                    bytes.extend_from_slice(slice);
                    Cow::Owned(bytes)
                });
            }
        }
        Err(PackError::truncated(self.input.len()))
    }

    pub(crate) fn parse_string(&mut self) -> PackResult<Cow<'de, str>> {
        let offset = self.pos;
        match self.parse_slice()? {
            Cow::Borrowed(slice) => std::str::from_utf8(slice)
                .map(Cow::Borrowed)
                .map_err(|_| PackError::MalformedInput { offset }),
            Cow::Owned(vec) => String::from_utf8(vec)
                .map(Cow::Owned)
                .map_err(|_| PackError::MalformedInput { offset }),
        }
    }
}

/// Extent in bytes of the element starting at `input[start]`, where `depth`
/// nested tuples are open around it.
///
/// Nested tuples are walked iteratively with a level counter; only the byte
/// extent is computed, payloads are never interpreted.
fn element_len(input: &[u8], start: usize, depth: usize) -> PackResult<usize> {
    let mut pos = start;
    let mut level = depth;
    loop {
        let code = match input.get(pos) {
            None => return Err(PackError::truncated(pos)),
            Some(&code) => code,
        };
        match code {
            NIL => {
                if level == 0 {
                    pos += 1;
                } else if input.get(pos + 1) == Some(&ESCAPE) {
                    pos += 2;
                } else if level == depth {
                    // a terminator is not an element
                    return Err(PackError::MalformedInput { offset: pos });
                } else {
                    pos += 1;
                    level -= 1;
                    if level == depth {
                        return Ok(pos - start);
                    }
                    continue;
                }
            }
            BYTES | STRING => pos = scan_terminated(input, pos + 1)?,
            NESTED => {
                pos += 1;
                level += 1;
                continue;
            }
            LEGACY_NESTED => return Err(PackError::MalformedInput { offset: pos }),
            NEGINTSTART | POSINTEND => {
                let raw = match input.get(pos + 1) {
                    None => return Err(PackError::truncated(input.len())),
                    Some(&raw) => raw,
                };
                let n = usize::from(if code == NEGINTSTART { raw ^ 0xff } else { raw });
                pos += 2 + n;
            }
            code if code > NEGINTSTART && code < POSINTEND => {
                let n = (i32::from(code) - i32::from(INTZERO)).abs() as usize;
                pos += 1 + n;
            }
            FLOAT => pos += 5,
            DOUBLE => pos += 9,
            DECIMAL => pos += 17,
            FALSE | TRUE => pos += 1,
            UUID => pos += 17,
            UUID64 => pos += 9,
            VERSIONSTAMP => pos += 11,
            VERSIONSTAMP_USER => pos += 13,
            DIRECTORY | SYSTEM => pos += 1,
            _ => return Err(PackError::MalformedInput { offset: pos }),
        }
        if pos > input.len() {
            return Err(PackError::truncated(input.len()));
        }
        if level == depth {
            return Ok(pos - start);
        }
    }
}

/// Position just past the unescaped terminator of the escaped payload
/// starting at `from`.
fn scan_terminated(input: &[u8], from: usize) -> PackResult<usize> {
    let mut i = from;
    loop {
        match memchr(NIL, &input[i..]) {
            None => return Err(PackError::truncated(input.len())),
            Some(off) => {
                let nil = i + off;
                if input.get(nil + 1) == Some(&ESCAPE) {
                    i = nil + 2;
                } else {
                    return Ok(nil + 1);
                }
            }
        }
    }
}
