use std::borrow::Cow;
use std::cmp::Ordering;

#[cfg(feature = "uuid")]
use uuid::Uuid;

use crate::bytes::Bytes;
use crate::uuid64::Uuid64;
use crate::versionstamp::Versionstamp;

/// Wire type codes
pub(crate) const NIL: u8 = 0x00;
pub(crate) const BYTES: u8 = 0x01;
pub(crate) const STRING: u8 = 0x02;
pub(crate) const LEGACY_NESTED: u8 = 0x03;
pub(crate) const NESTED: u8 = 0x05;
pub(crate) const NEGINTSTART: u8 = 0x0b;
pub(crate) const INTZERO: u8 = 0x14;
pub(crate) const POSINTEND: u8 = 0x1d;
pub(crate) const FLOAT: u8 = 0x20;
pub(crate) const DOUBLE: u8 = 0x21;
pub(crate) const DECIMAL: u8 = 0x23;
pub(crate) const FALSE: u8 = 0x26;
pub(crate) const TRUE: u8 = 0x27;
pub(crate) const UUID: u8 = 0x30;
pub(crate) const UUID64: u8 = 0x31;
pub(crate) const VERSIONSTAMP: u8 = 0x32;
pub(crate) const VERSIONSTAMP_USER: u8 = 0x33;
pub(crate) const DIRECTORY: u8 = 0xfe;
pub(crate) const SYSTEM: u8 = 0xff;

/// Escape byte following a NUL inside string/bytes payloads and nested Nils.
pub(crate) const ESCAPE: u8 = 0xff;

/// Whether `code` is a type code this codec assigns a meaning to.
///
/// The legacy nested code `0x03` is deliberately excluded: it is recognized
/// only to be rejected.
pub(crate) fn is_known_code(code: u8) -> bool {
    match code {
        NIL | BYTES | STRING | NESTED | FLOAT | DOUBLE | DECIMAL | FALSE | TRUE => true,
        UUID | UUID64 | VERSIONSTAMP | VERSIONSTAMP_USER | DIRECTORY | SYSTEM => true,
        NEGINTSTART..=POSINTEND => true,
        _ => false,
    }
}

/// A single runtime-typed tuple element.
///
/// This is the slow-path counterpart to the [`TuplePack`](crate::TuplePack) /
/// [`TupleUnpack`](crate::TupleUnpack) impls: when the element types of a key
/// are only known at runtime, a tuple is a `Vec<Element>` and dispatch is a
/// single match on the type code.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    /// Absent value, the unit of the format
    Nil,
    /// Byte string
    Bytes(Bytes<'a>),
    /// UTF-8 string
    String(Cow<'a, str>),
    /// Nested tuple
    Tuple(Vec<Element<'a>>),
    /// Signed integer with a magnitude of at most 8 bytes
    Int(i64),
    /// IEEE-754 binary32
    Float(f32),
    /// IEEE-754 binary64
    Double(f64),
    /// Boolean
    Bool(bool),
    /// RFC 4122 UUID
    #[cfg(feature = "uuid")]
    Uuid(Uuid),
    /// 64-bit identifier
    Uuid64(Uuid64),
    /// Commit versionstamp, with or without a user version
    Versionstamp(Versionstamp),
    /// Reserved application type code.
    ///
    /// Only the reserved codes `0xFE` (directory) and `0xFF` (system) with an
    /// empty payload have a self-delimited wire form: the decoder only ever
    /// produces these two, and the encoder rejects everything else (an
    /// unframed payload would desync the tokenizer).
    UserType {
        /// the leading type code
        code: u8,
        /// payload; must be empty to pack
        data: Bytes<'a>,
    },
}

impl<'a> Element<'a> {
    /// The type code this element packs under; different type groups compare
    /// by it.
    fn type_code(&self) -> u8 {
        match self {
            Element::Nil => NIL,
            Element::Bytes(_) => BYTES,
            Element::String(_) => STRING,
            Element::Tuple(_) => NESTED,
            Element::Int(_) => INTZERO,
            Element::Float(_) => FLOAT,
            Element::Double(_) => DOUBLE,
            Element::Bool(_) => FALSE,
            #[cfg(feature = "uuid")]
            Element::Uuid(_) => UUID,
            Element::Uuid64(_) => UUID64,
            Element::Versionstamp(v) => {
                if v.user_version().is_some() {
                    VERSIONSTAMP_USER
                } else {
                    VERSIONSTAMP
                }
            }
            Element::UserType { code, .. } => *code,
        }
    }

    /// Clones whatever still borrows from the source buffer, detaching the
    /// element from it.
    pub fn into_static(self) -> Element<'static> {
        match self {
            Element::Nil => Element::Nil,
            Element::Bytes(v) => Element::Bytes(v.into_static()),
            Element::String(v) => Element::String(Cow::Owned(v.into_owned())),
            Element::Tuple(v) => Element::Tuple(v.into_iter().map(Element::into_static).collect()),
            Element::Int(v) => Element::Int(v),
            Element::Float(v) => Element::Float(v),
            Element::Double(v) => Element::Double(v),
            Element::Bool(v) => Element::Bool(v),
            #[cfg(feature = "uuid")]
            Element::Uuid(v) => Element::Uuid(v),
            Element::Uuid64(v) => Element::Uuid64(v),
            Element::Versionstamp(v) => Element::Versionstamp(v),
            Element::UserType { code, data } => Element::UserType {
                code,
                data: data.into_static(),
            },
        }
    }
}

fn cmp_tuples(a: &[Element], b: &[Element]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b) {
        match x.partial_cmp(y)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    a.len().partial_cmp(&b.len())
}

/// Semantic ordering, agreeing with the byte order of the encodings.
///
/// Elements of different type groups compare by type code; within a group the
/// value decides. The only incomparable case is a NaN operand, mirroring the
/// float primitives.
impl PartialOrd for Element<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Element::Bytes(a), Element::Bytes(b)) => a.partial_cmp(b),
            (Element::String(a), Element::String(b)) => {
                a.as_bytes().partial_cmp(b.as_bytes())
            }
            (Element::Tuple(a), Element::Tuple(b)) => cmp_tuples(a, b),
            (Element::Int(a), Element::Int(b)) => a.partial_cmp(b),
            (Element::Float(a), Element::Float(b)) => a.partial_cmp(b),
            (Element::Double(a), Element::Double(b)) => a.partial_cmp(b),
            (Element::Bool(a), Element::Bool(b)) => a.partial_cmp(b),
            #[cfg(feature = "uuid")]
            (Element::Uuid(a), Element::Uuid(b)) => a.partial_cmp(b),
            (Element::Uuid64(a), Element::Uuid64(b)) => a.partial_cmp(b),
            (Element::Versionstamp(a), Element::Versionstamp(b)) => a.partial_cmp(b),
            (
                Element::UserType { code: a, data: x },
                Element::UserType { code: b, data: y },
            ) => (a, x).partial_cmp(&(b, y)),
            (a, b) => a.type_code().partial_cmp(&b.type_code()),
        }
    }
}
