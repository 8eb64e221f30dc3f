// Copyright 2026 keypack developers, https://github.com/keypack-rs/keypack
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Tuple encoding/decoding errors

use thiserror::Error;

/// An error raised while packing or unpacking a tuple.
///
/// Every variant carries the byte offset (relative to the buffer handed to
/// the failing operation) at which the problem was detected, except for the
/// nesting variants which carry the offending depth instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PackError {
    /// A truncated element, a missing terminator, an unknown or legacy type
    /// code, or bytes left over after a parse that expected the whole input.
    #[error("malformed tuple encoding at offset {offset}")]
    MalformedInput {
        /// offset of the offending byte
        offset: usize,
    },
    /// The element at `offset` has no defined conversion into the requested
    /// type.
    #[error("element with type code {code:#04x} at offset {offset} cannot convert into the requested type")]
    UnsupportedCoercion {
        /// type code of the element that was found
        code: u8,
        /// offset of the element's type code
        offset: usize,
    },
    /// An integer element holds a value outside the requested type's range.
    #[error("integer at offset {offset} overflows the requested type")]
    NumericOverflow {
        /// offset of the element's type code
        offset: usize,
    },
    /// Decimal elements (type code `0x23`) are reserved but not implemented.
    #[error("decimal element at offset {offset} is not implemented")]
    Unimplemented {
        /// offset of the element's type code
        offset: usize,
    },
    /// A writer was finished, or a reader consumed an end-of-tuple marker,
    /// with open nested tuples unaccounted for.
    #[error("unbalanced tuple nesting at depth {depth}")]
    UnbalancedNesting {
        /// nesting depth at the point of failure
        depth: usize,
    },
    /// Tuples nest deeper than [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
    #[error("tuple nesting exceeds the supported depth of {max}")]
    DepthExceeded {
        /// the configured depth limit
        max: usize,
    },
}

impl PackError {
    /// The byte offset at which the error was detected, when the failure is
    /// tied to a position in the input or output buffer.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            PackError::MalformedInput { offset }
            | PackError::UnsupportedCoercion { offset, .. }
            | PackError::NumericOverflow { offset }
            | PackError::Unimplemented { offset } => Some(offset),
            PackError::UnbalancedNesting { .. } | PackError::DepthExceeded { .. } => None,
        }
    }

    pub(crate) fn truncated(offset: usize) -> Self {
        PackError::MalformedInput { offset }
    }
}

/// A result with [`PackError`] as the error type.
pub type PackResult<T> = std::result::Result<T, PackError>;
