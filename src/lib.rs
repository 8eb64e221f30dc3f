// Copyright 2026 keypack developers, https://github.com/keypack-rs/keypack
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Order-preserving tuple codec for lexicographically-ordered key/value
//! stores, wire-compatible with the FoundationDB tuple layer.
//!
//! A tuple of typed values packs into one contiguous byte string whose
//! byte-wise lexicographic order agrees with the element-wise order of the
//! values: integers by signed value, strings and byte strings by content,
//! floats by IEEE value (with `-0.0 < 0.0` and NaN above the infinities),
//! `Nil` below everything, nested tuples lexicographically. Unpacking
//! restores the original values, and the encoding is byte-for-byte identical
//! to what the other bindings of the format produce.
//!
//! The fast path is fully typed: any combination of the primitive types packs
//! through [`TuplePack`] and unpacks through [`TupleUnpack`] with no runtime
//! dispatch.
//!
//! ```rust
//! let key = keypack::pack(&("tenant", 42i64, Some("blue"))).unwrap();
//! let (tenant, id, tag): (String, i64, Option<String>) =
//!     keypack::unpack(&key).unwrap();
//! assert_eq!((tenant.as_str(), id, tag.as_deref()), ("tenant", 42, Some("blue")));
//! ```
//!
//! When element types are only known at runtime, a tuple is a
//! `Vec<`[`Element`]`>`:
//!
//! ```rust
//! use keypack::Element;
//!
//! let key = keypack::pack(&(7i64, "seven")).unwrap();
//! let elements: Vec<Element> = keypack::unpack(&key).unwrap();
//! assert_eq!(
//!     elements,
//!     vec![Element::Int(7), Element::String("seven".into())]
//! );
//! ```
//!
//! For picking single components out of wide keys without decoding the rest,
//! use [`unpack_first`], [`unpack_last`], [`unpack_single`] or a lazily
//! materialized [`LazyTuple`]; for walking raw element extents, use
//! [`TupleReader`].

#[macro_use]
extern crate static_assertions;

mod bytes;
mod element;
mod error;
mod lazy;
mod pack;
mod reader;
mod uuid64;
mod versionstamp;
mod writer;

pub use crate::bytes::Bytes;
pub use crate::element::Element;
pub use crate::error::{PackError, PackResult};
pub use crate::lazy::LazyTuple;
pub use crate::pack::{TuplePack, TupleUnpack};
pub use crate::reader::TupleReader;
pub use crate::uuid64::Uuid64;
pub use crate::versionstamp::Versionstamp;
pub use crate::writer::{TupleWriter, MAX_NESTING_DEPTH};

assert_impl_all!(PackError: Send, Sync);
assert_impl_all!(TupleWriter: Send);
assert_impl_all!(Element<'static>: Send, Sync);

/// Packs a tuple (or a single element) into a fresh buffer.
pub fn pack<T: TuplePack>(v: &T) -> PackResult<Vec<u8>> {
    let mut w = TupleWriter::new();
    v.pack_root(&mut w)?;
    w.finish()
}

/// Packs a tuple onto the end of `out`, e.g. after a keyspace prefix.
///
/// On error, `out` is left exactly as it was.
pub fn pack_into<T: TuplePack>(v: &T, out: &mut Vec<u8>) -> PackResult<()> {
    let start = out.len();
    let mut w = TupleWriter::from_vec(std::mem::replace(out, Vec::new()));
    let result = v.pack_root(&mut w).and_then(|_| {
        if w.depth() == 0 {
            Ok(())
        } else {
            Err(PackError::UnbalancedNesting { depth: w.depth() })
        }
    });
    let mut buf = w.into_vec();
    if result.is_err() {
        buf.truncate(start);
    }
    *out = buf;
    result
}

/// Unpacks a whole encoding into `T`, rejecting trailing bytes.
pub fn unpack<'de, T: TupleUnpack<'de>>(input: &'de [u8]) -> PackResult<T> {
    T::unpack_root(input)
}

/// Unpacks only the first element of an encoded tuple.
///
/// The remaining elements are skipped over, not decoded.
pub fn unpack_first<'de, T: TupleUnpack<'de>>(input: &'de [u8]) -> PackResult<T> {
    let mut reader = TupleReader::new(input);
    match reader.parse_next()? {
        None => Err(PackError::MalformedInput { offset: 0 }),
        Some(span) => pack::unpack_span(span),
    }
}

/// Unpacks only the last element of an encoded tuple.
///
/// The preceding elements are walked for their extents but never decoded.
pub fn unpack_last<'de, T: TupleUnpack<'de>>(input: &'de [u8]) -> PackResult<T> {
    let mut reader = TupleReader::new(input);
    let mut last = None;
    while let Some(span) = reader.parse_next()? {
        last = Some(span);
    }
    match last {
        None => Err(PackError::MalformedInput { offset: 0 }),
        Some(span) => pack::unpack_span(span),
    }
}

/// Unpacks an encoding that must hold exactly one element.
///
/// Fails with `MalformedInput` when the input is empty or holds more than
/// one element.
pub fn unpack_single<'de, T: TupleUnpack<'de>>(input: &'de [u8]) -> PackResult<T> {
    let mut reader = TupleReader::new(input);
    let span = match reader.parse_next()? {
        None => return Err(PackError::MalformedInput { offset: 0 }),
        Some(span) => span,
    };
    let next_offset = reader.position();
    if reader.parse_next()?.is_some() {
        return Err(PackError::MalformedInput {
            offset: next_offset,
        });
    }
    pack::unpack_span(span)
}

/// Tokenizes an encoding into a [`LazyTuple`] that materializes elements on
/// demand.
pub fn unpack_lazy<'de>(input: &'de [u8]) -> PackResult<LazyTuple<'de>> {
    LazyTuple::parse(input)
}
