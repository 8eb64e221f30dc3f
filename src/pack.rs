use std::borrow::Cow;
use std::convert::TryFrom;
use std::mem;

use memchr::memchr_iter;

use crate::bytes::Bytes;
use crate::element::{
    Element, BYTES, DECIMAL, DIRECTORY, DOUBLE, ESCAPE, FALSE, FLOAT, INTZERO, NEGINTSTART,
    NESTED, NIL, POSINTEND, STRING, SYSTEM, TRUE, UUID, UUID64, VERSIONSTAMP, VERSIONSTAMP_USER,
};
use crate::error::{PackError, PackResult};
use crate::reader::TupleReader;
use crate::uuid64::Uuid64;
use crate::versionstamp::Versionstamp;
use crate::writer::TupleWriter;

/// A type that can be packed into the tuple wire format.
pub trait TuplePack {
    /// Packs `self` in element position: tuple-like values wrap themselves
    /// in nesting markers so that they stay one self-delimited element of
    /// the enclosing tuple.
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()>;

    /// Packs `self` as a whole encoding: tuple-like values concatenate
    /// their elements without outer markers.
    fn pack_root(&self, w: &mut TupleWriter) -> PackResult<()> {
        self.pack(w)
    }

    /// Packs `self` into a fresh buffer.
    fn pack_to_vec(&self) -> PackResult<Vec<u8>> {
        let mut w = TupleWriter::new();
        self.pack_root(&mut w)?;
        w.finish()
    }
}

/// A type that can be unpacked from the tuple wire format.
///
/// The decode side is deliberately more forgiving than the encode side:
/// besides its own wire type, each target type accepts the cross-type
/// conversions other bindings of the format rely on (integer widening,
/// string-to-number parsing, Nil as the default value, and so on). Anything
/// else fails with `UnsupportedCoercion`.
pub trait TupleUnpack<'de>: Sized {
    /// Unpacks one element at the reader's cursor.
    fn unpack(reader: &mut TupleReader<'de>) -> PackResult<Self>;

    /// Unpacks `input` as a whole encoding, rejecting trailing bytes.
    fn unpack_root(input: &'de [u8]) -> PackResult<Self> {
        let mut reader = TupleReader::new(input);
        let this = Self::unpack(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(PackError::MalformedInput {
                offset: reader.position(),
            });
        }
        Ok(this)
    }
}

impl<'a, T> TuplePack for &'a T
where
    T: TuplePack,
{
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        T::pack(*self, w)
    }

    fn pack_root(&self, w: &mut TupleWriter) -> PackResult<()> {
        T::pack_root(*self, w)
    }
}

/// Unpacks a single element span produced by the tokenizer.
pub(crate) fn unpack_span<'de, T: TupleUnpack<'de>>(span: &'de [u8]) -> PackResult<T> {
    let mut reader = TupleReader::new(span);
    let this = T::unpack(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(PackError::MalformedInput {
            offset: reader.position(),
        });
    }
    Ok(this)
}

fn write_escaped(w: &mut TupleWriter, v: &[u8]) {
    let mut pos = 0;
    for idx in memchr_iter(NIL, v) {
        let next = idx + 1;
        w.write_bytes(&v[pos..next]);
        w.write_byte(ESCAPE);
        pos = next;
    }
    w.write_bytes(&v[pos..]);
    w.write_byte(NIL);
}

const MAX_SZ: usize = 8;

macro_rules! sign_bit {
    ($type:ident) => {
        (1 << (mem::size_of::<$type>() * 8 - 1))
    };
}

fn be_uint(bytes: &[u8]) -> u128 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u128::from(b))
}

/// Decodes any integer-coded element into an `i128`, which can hold every
/// value the 8-byte standard range and the 16-byte extended range encode.
fn parse_int<'de>(r: &mut TupleReader<'de>) -> PackResult<i128> {
    let offset = r.position();
    let found = r.parse_byte()?;
    if found == INTZERO {
        Ok(0)
    } else if found > INTZERO && found <= INTZERO + MAX_SZ as u8 {
        let n = usize::from(found - INTZERO);
        Ok(be_uint(r.parse_bytes(n)?) as i128)
    } else if found >= INTZERO - MAX_SZ as u8 && found < INTZERO {
        let n = usize::from(INTZERO - found);
        let raw = be_uint(r.parse_bytes(n)?) as i128;
        Ok(raw - ((1i128 << (8 * n)) - 1))
    } else if found == POSINTEND {
        let n = usize::from(r.parse_byte()?);
        if n > 16 {
            return Err(PackError::NumericOverflow { offset });
        }
        let raw = be_uint(r.parse_bytes(n)?);
        if raw > i128::max_value() as u128 {
            return Err(PackError::NumericOverflow { offset });
        }
        Ok(raw as i128)
    } else if found == NEGINTSTART {
        let n = usize::from(r.parse_byte()? ^ 0xff);
        if n > 16 {
            return Err(PackError::NumericOverflow { offset });
        }
        let raw = be_uint(r.parse_bytes(n)?);
        let mask = if n == 16 {
            u128::max_value()
        } else {
            (1u128 << (8 * n)) - 1
        };
        let magnitude = mask - raw;
        if magnitude > i128::max_value() as u128 + 1 {
            Err(PackError::NumericOverflow { offset })
        } else if magnitude == i128::max_value() as u128 + 1 {
            Ok(i128::min_value())
        } else {
            Ok(-(magnitude as i128))
        }
    } else {
        Err(r.mismatch_at(offset, found))
    }
}

/// Coercion-aware integer decode: integer elements verbatim, floats with a
/// narrowing cast, strings by parsing, Nil as zero.
fn unpack_integer<'de>(r: &mut TupleReader<'de>) -> PackResult<i128> {
    let offset = r.position();
    match r.peek_byte() {
        None => Err(PackError::truncated(offset)),
        Some(NEGINTSTART..=POSINTEND) => parse_int(r),
        Some(NIL) => {
            r.parse_nil()?;
            Ok(0)
        }
        Some(FLOAT) => Ok(parse_f32_element(r)? as i128),
        Some(DOUBLE) => Ok(parse_f64_element(r)? as i128),
        Some(STRING) => {
            r.expect(STRING)?;
            let text = r.parse_string()?;
            text.parse::<i128>()
                .map_err(|_| PackError::MalformedInput { offset })
        }
        Some(found) => Err(r.mismatch(found)),
    }
}

macro_rules! impl_ux {
    ($ux:ident) => {
        impl TuplePack for $ux {
            fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
                const SZ: usize = mem::size_of::<$ux>();
                let u = *self;
                let n = SZ - (u.leading_zeros() as usize) / 8;
                if n <= MAX_SZ {
                    w.write_byte(INTZERO + n as u8);
                } else {
                    w.write_byte(POSINTEND);
                    w.write_byte(n as u8);
                }
                w.write_bytes(&u.to_be_bytes()[SZ - n..]);
                Ok(())
            }
        }

        impl<'de> TupleUnpack<'de> for $ux {
            fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
                let offset = r.position();
                let v = unpack_integer(r)?;
                $ux::try_from(v).map_err(|_| PackError::NumericOverflow { offset })
            }
        }
    };
}

macro_rules! impl_ix {
    ($ix:ident, $ux:ident) => {
        impl TuplePack for $ix {
            fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
                const SZ: usize = mem::size_of::<$ix>();
                let i = *self;
                let u = i.wrapping_abs() as $ux;
                let n = SZ - (u.leading_zeros() as usize) / 8;
                if i >= 0 {
                    if n <= MAX_SZ {
                        w.write_byte(INTZERO + n as u8);
                    } else {
                        w.write_byte(POSINTEND);
                        w.write_byte(n as u8);
                    }
                    w.write_bytes(&u.to_be_bytes()[SZ - n..]);
                } else {
                    if n <= MAX_SZ {
                        w.write_byte(INTZERO - n as u8);
                    } else {
                        w.write_byte(NEGINTSTART);
                        w.write_byte(n as u8 ^ 0xff);
                    }
                    // two's complement minus one is the ones' complement of
                    // the magnitude, truncated to its n significant bytes
                    w.write_bytes(&i.wrapping_sub(1).to_be_bytes()[SZ - n..]);
                }
                Ok(())
            }
        }

        impl<'de> TupleUnpack<'de> for $ix {
            fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
                let offset = r.position();
                let v = unpack_integer(r)?;
                $ix::try_from(v).map_err(|_| PackError::NumericOverflow { offset })
            }
        }
    };
}

impl_ux!(u8);
impl_ux!(u16);
impl_ux!(u32);
impl_ux!(u64);
impl_ux!(u128);
impl_ux!(usize);

impl_ix!(i8, u8);
impl_ix!(i16, u16);
impl_ix!(i32, u32);
impl_ix!(i64, u64);
impl_ix!(i128, u128);
impl_ix!(isize, usize);

// Encoded NaNs are canonicalized so that equal keys stay byte-identical.
const CANONICAL_NAN_F32: u32 = 0x7fc0_0000;
const CANONICAL_NAN_F64: u64 = 0x7ff8_0000_0000_0000;

fn parse_f32_element<'de>(r: &mut TupleReader<'de>) -> PackResult<f32> {
    r.expect(FLOAT)?;
    let mut arr = [0u8; 4];
    arr.copy_from_slice(r.parse_bytes(4)?);
    let u = u32::from_be_bytes(arr);
    let u = if u & sign_bit!(u32) == 0 {
        u ^ u32::max_value()
    } else {
        u ^ sign_bit!(u32)
    };
    Ok(f32::from_bits(u))
}

fn parse_f64_element<'de>(r: &mut TupleReader<'de>) -> PackResult<f64> {
    r.expect(DOUBLE)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(r.parse_bytes(8)?);
    let u = u64::from_be_bytes(arr);
    let u = if u & sign_bit!(u64) == 0 {
        u ^ u64::max_value()
    } else {
        u ^ sign_bit!(u64)
    };
    Ok(f64::from_bits(u))
}

impl TuplePack for f32 {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        let bits = if self.is_nan() {
            CANONICAL_NAN_F32
        } else {
            self.to_bits()
        };
        let u = if bits & sign_bit!(u32) != 0 {
            bits ^ u32::max_value()
        } else {
            bits ^ sign_bit!(u32)
        };
        w.write_byte(FLOAT);
        w.write_bytes(&u.to_be_bytes());
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for f32 {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        let offset = r.position();
        match r.peek_byte() {
            None => Err(PackError::truncated(offset)),
            Some(FLOAT) => parse_f32_element(r),
            Some(DOUBLE) => Ok(parse_f64_element(r)? as f32),
            Some(NEGINTSTART..=POSINTEND) => Ok(parse_int(r)? as f32),
            Some(NIL) => {
                r.parse_nil()?;
                Ok(0.0)
            }
            Some(STRING) => {
                r.expect(STRING)?;
                let text = r.parse_string()?;
                text.parse::<f32>()
                    .map_err(|_| PackError::MalformedInput { offset })
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl TuplePack for f64 {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        let bits = if self.is_nan() {
            CANONICAL_NAN_F64
        } else {
            self.to_bits()
        };
        let u = if bits & sign_bit!(u64) != 0 {
            bits ^ u64::max_value()
        } else {
            bits ^ sign_bit!(u64)
        };
        w.write_byte(DOUBLE);
        w.write_bytes(&u.to_be_bytes());
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for f64 {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        let offset = r.position();
        match r.peek_byte() {
            None => Err(PackError::truncated(offset)),
            Some(DOUBLE) => parse_f64_element(r),
            Some(FLOAT) => Ok(f64::from(parse_f32_element(r)?)),
            Some(NEGINTSTART..=POSINTEND) => Ok(parse_int(r)? as f64),
            Some(NIL) => {
                r.parse_nil()?;
                Ok(0.0)
            }
            Some(STRING) => {
                r.expect(STRING)?;
                let text = r.parse_string()?;
                text.parse::<f64>()
                    .map_err(|_| PackError::MalformedInput { offset })
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl TuplePack for bool {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.write_byte(if *self { TRUE } else { FALSE });
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for bool {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        match r.peek_byte() {
            None => Err(PackError::truncated(r.position())),
            Some(FALSE) => {
                r.parse_byte()?;
                Ok(false)
            }
            Some(TRUE) => {
                r.parse_byte()?;
                Ok(true)
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok(false)
            }
            Some(NEGINTSTART..=POSINTEND) => Ok(parse_int(r)? != 0),
            Some(FLOAT) => Ok(parse_f32_element(r)? != 0.0),
            Some(DOUBLE) => Ok(parse_f64_element(r)? != 0.0),
            // non-empty payload is true, whatever it holds
            Some(BYTES) | Some(STRING) => {
                r.parse_byte()?;
                Ok(!r.parse_slice()?.is_empty())
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl TuplePack for () {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.begin_nested()?;
        w.end_nested()
    }

    fn pack_root(&self, _w: &mut TupleWriter) -> PackResult<()> {
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for () {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        r.enter_nested()?;
        r.leave_nested()
    }

    fn unpack_root(input: &'de [u8]) -> PackResult<Self> {
        if input.is_empty() {
            Ok(())
        } else {
            Err(PackError::MalformedInput { offset: 0 })
        }
    }
}

macro_rules! tuple_impls {
    ($(($($n:tt $name:ident $v:ident)+))+) => {
        $(
            impl<$($name),+> TuplePack for ($($name,)+)
            where
                $($name: TuplePack,)+
            {
                fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
                    w.begin_nested()?;
                    $(
                        self.$n.pack(w)?;
                    )*
                    w.end_nested()
                }

                fn pack_root(&self, w: &mut TupleWriter) -> PackResult<()> {
                    $(
                        self.$n.pack(w)?;
                    )*
                    Ok(())
                }
            }

            impl<'de, $($name),+> TupleUnpack<'de> for ($($name,)+)
            where
                $($name: TupleUnpack<'de>,)+
            {
                fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
                    r.enter_nested()?;
                    $(
                        let $v = $name::unpack(r)?;
                    )*
                    r.leave_nested()?;
                    Ok(($($v,)*))
                }

                fn unpack_root(input: &'de [u8]) -> PackResult<Self> {
                    let mut r = TupleReader::new(input);
                    $(
                        let $v = $name::unpack(&mut r)?;
                    )*
                    if r.remaining() != 0 {
                        return Err(PackError::MalformedInput { offset: r.position() });
                    }
                    Ok(($($v,)*))
                }
            }
        )+
    }
}

tuple_impls! {
    (0 T0 t0)
    (0 T0 t0 1 T1 t1)
    (0 T0 t0 1 T1 t1 2 T2 t2)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6 7 T7 t7)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6 7 T7 t7 8 T8 t8)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6 7 T7 t7 8 T8 t8 9 T9 t9)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6 7 T7 t7 8 T8 t8 9 T9 t9 10 T10 t10)
    (0 T0 t0 1 T1 t1 2 T2 t2 3 T3 t3 4 T4 t4 5 T5 t5 6 T6 t6 7 T7 t7 8 T8 t8 9 T9 t9 10 T10 t10 11 T11 t11)
}

impl<T> TuplePack for Option<T>
where
    T: TuplePack,
{
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        match self {
            None => {
                w.write_nil();
                Ok(())
            }
            Some(v) => v.pack(w),
        }
    }
}

impl<'de, T> TupleUnpack<'de> for Option<T>
where
    T: TupleUnpack<'de>,
{
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        if r.peek_byte() == Some(NIL) {
            r.parse_nil()?;
            Ok(None)
        } else {
            T::unpack(r).map(Some)
        }
    }
}

impl<'a> TuplePack for Bytes<'a> {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.write_byte(BYTES);
        write_escaped(w, self.as_ref());
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for Bytes<'de> {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        match r.peek_byte() {
            None => Err(PackError::truncated(r.position())),
            Some(BYTES) => {
                r.parse_byte()?;
                Ok(Bytes(r.parse_slice()?))
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok(Bytes::default())
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl<'a> TuplePack for &'a [u8] {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        Bytes::from(*self).pack(w)
    }
}

impl TuplePack for Vec<u8> {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        Bytes::from(self.as_slice()).pack(w)
    }
}

impl<'de> TupleUnpack<'de> for Vec<u8> {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        Bytes::unpack(r).map(Bytes::into_owned)
    }
}

impl<'a> TuplePack for &'a str {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.write_byte(STRING);
        write_escaped(w, self.as_bytes());
        Ok(())
    }
}

impl TuplePack for String {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        self.as_str().pack(w)
    }
}

impl<'a> TuplePack for Cow<'a, str> {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        self.as_ref().pack(w)
    }
}

impl<'de> TupleUnpack<'de> for Cow<'de, str> {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        match r.peek_byte() {
            None => Err(PackError::truncated(r.position())),
            // byte strings convert as long as they hold valid UTF-8
            Some(STRING) | Some(BYTES) => {
                r.parse_byte()?;
                r.parse_string()
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok(Cow::Borrowed(""))
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl<'de> TupleUnpack<'de> for String {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        Cow::<str>::unpack(r).map(Cow::into_owned)
    }
}

impl TuplePack for char {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        let mut buf = [0u8; 4];
        let s: &str = self.encode_utf8(&mut buf);
        s.pack(w)
    }
}

impl<'de> TupleUnpack<'de> for char {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        let offset = r.position();
        match r.peek_byte() {
            None => Err(PackError::truncated(offset)),
            Some(STRING) => {
                r.parse_byte()?;
                let text = r.parse_string()?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (None, _) => Ok('\0'),
                    (Some(c), None) => Ok(c),
                    _ => Err(PackError::MalformedInput { offset }),
                }
            }
            Some(BYTES) => {
                r.parse_byte()?;
                let payload = r.parse_slice()?;
                match *payload.as_ref() {
                    [] => Ok('\0'),
                    [b] => Ok(b as char),
                    _ => Err(PackError::MalformedInput { offset }),
                }
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok('\0')
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl TuplePack for Uuid64 {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.write_byte(UUID64);
        w.write_bytes(&self.to_bytes());
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for Uuid64 {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        match r.peek_byte() {
            None => Err(PackError::truncated(r.position())),
            Some(UUID64) => {
                r.parse_byte()?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(r.parse_bytes(8)?);
                Ok(Uuid64::from_bytes(arr))
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok(Uuid64::default())
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

impl TuplePack for Versionstamp {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        match self.user_version() {
            None => {
                w.write_byte(VERSIONSTAMP);
                w.write_bytes(self.transaction_version());
            }
            Some(user) => {
                w.write_byte(VERSIONSTAMP_USER);
                w.write_bytes(self.transaction_version());
                w.write_bytes(&user.to_be_bytes());
            }
        }
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for Versionstamp {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        match r.peek_byte() {
            None => Err(PackError::truncated(r.position())),
            Some(VERSIONSTAMP) => {
                r.parse_byte()?;
                let mut tr_version = [0u8; 10];
                tr_version.copy_from_slice(r.parse_bytes(10)?);
                Ok(Versionstamp::from_parts(tr_version, None))
            }
            Some(VERSIONSTAMP_USER) => {
                r.parse_byte()?;
                let mut tr_version = [0u8; 10];
                tr_version.copy_from_slice(r.parse_bytes(10)?);
                let mut user = [0u8; 2];
                user.copy_from_slice(r.parse_bytes(2)?);
                Ok(Versionstamp::from_parts(
                    tr_version,
                    Some(u16::from_be_bytes(user)),
                ))
            }
            Some(NIL) => {
                r.parse_nil()?;
                Ok(Versionstamp::from_parts([0; 10], None))
            }
            Some(found) => Err(r.mismatch(found)),
        }
    }
}

#[cfg(feature = "uuid")]
mod pack_uuid {
    use super::*;
    use uuid::Uuid;

    impl TuplePack for Uuid {
        fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
            w.write_byte(UUID);
            w.write_bytes(self.as_bytes());
            Ok(())
        }
    }

    impl<'de> TupleUnpack<'de> for Uuid {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            let offset = r.position();
            match r.peek_byte() {
                None => Err(PackError::truncated(offset)),
                // stored big-endian per RFC 4122, no byte swapping
                Some(UUID) => {
                    r.parse_byte()?;
                    let slice = r.parse_bytes(16)?;
                    Uuid::from_slice(slice).map_err(|_| PackError::MalformedInput { offset })
                }
                Some(STRING) => {
                    r.parse_byte()?;
                    let text = r.parse_string()?;
                    Uuid::parse_str(&text).map_err(|_| PackError::MalformedInput { offset })
                }
                Some(NIL) => {
                    r.parse_nil()?;
                    Ok(Uuid::nil())
                }
                Some(found) => Err(r.mismatch(found)),
            }
        }
    }
}

mod pack_net {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    fn unpack_v6<'de>(r: &mut TupleReader<'de>) -> PackResult<Ipv6Addr> {
        r.expect(UUID)?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(r.parse_bytes(16)?);
        Ok(Ipv6Addr::from(arr))
    }

    fn unpack_v4<'de>(r: &mut TupleReader<'de>) -> PackResult<Ipv4Addr> {
        let offset = r.position();
        let v = parse_int(r)?;
        u32::try_from(v)
            .map(Ipv4Addr::from)
            .map_err(|_| PackError::NumericOverflow { offset })
    }

    impl<'de> TupleUnpack<'de> for IpAddr {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            match r.peek_byte() {
                None => Err(PackError::truncated(r.position())),
                Some(UUID) => unpack_v6(r).map(IpAddr::V6),
                Some(NEGINTSTART..=POSINTEND) => unpack_v4(r).map(IpAddr::V4),
                Some(found) => Err(r.mismatch(found)),
            }
        }
    }

    impl<'de> TupleUnpack<'de> for Ipv4Addr {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            match r.peek_byte() {
                None => Err(PackError::truncated(r.position())),
                Some(NEGINTSTART..=POSINTEND) => unpack_v4(r),
                Some(found) => Err(r.mismatch(found)),
            }
        }
    }

    impl<'de> TupleUnpack<'de> for Ipv6Addr {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            match r.peek_byte() {
                None => Err(PackError::truncated(r.position())),
                Some(UUID) => unpack_v6(r),
                Some(found) => Err(r.mismatch(found)),
            }
        }
    }
}

#[cfg(feature = "chrono")]
mod pack_chrono {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    /// 100ns ticks between 0001-01-01T00:00:00Z and the Unix epoch.
    const TICKS_TO_UNIX_EPOCH: i128 = 621_355_968_000_000_000;
    const TICKS_PER_SECOND: i128 = 10_000_000;

    fn from_unix(secs: i128, nanos: u32, offset: usize) -> PackResult<DateTime<Utc>> {
        let secs = i64::try_from(secs).map_err(|_| PackError::NumericOverflow { offset })?;
        DateTime::from_timestamp(secs, nanos).ok_or(PackError::NumericOverflow { offset })
    }

    /// Integer elements are 100-nanosecond ticks since 0001-01-01.
    fn from_ticks(ticks: i128, offset: usize) -> PackResult<DateTime<Utc>> {
        let unix = ticks - TICKS_TO_UNIX_EPOCH;
        from_unix(
            unix.div_euclid(TICKS_PER_SECOND),
            (unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32,
            offset,
        )
    }

    /// Float elements are fractional days since the Unix epoch.
    fn from_unix_days(days: f64, offset: usize) -> PackResult<DateTime<Utc>> {
        if !days.is_finite() {
            return Err(PackError::NumericOverflow { offset });
        }
        let secs_f = days * 86_400.0;
        let secs = secs_f.floor();
        let nanos = (((secs_f - secs) * 1e9).round() as u32).min(999_999_999);
        from_unix(secs as i128, nanos, offset)
    }

    impl<'de> TupleUnpack<'de> for DateTime<Utc> {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            let offset = r.position();
            match r.peek_byte() {
                None => Err(PackError::truncated(offset)),
                Some(NEGINTSTART..=POSINTEND) => from_ticks(parse_int(r)?, offset),
                Some(FLOAT) => from_unix_days(f64::from(parse_f32_element(r)?), offset),
                Some(DOUBLE) => from_unix_days(parse_f64_element(r)?, offset),
                Some(NIL) => {
                    r.parse_nil()?;
                    from_ticks(0, offset)
                }
                Some(found) => Err(r.mismatch(found)),
            }
        }
    }

    impl<'de> TupleUnpack<'de> for Duration {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            let offset = r.position();
            let seconds = match r.peek_byte() {
                None => return Err(PackError::truncated(offset)),
                Some(FLOAT) => f64::from(parse_f32_element(r)?),
                Some(DOUBLE) => parse_f64_element(r)?,
                Some(NIL) => {
                    r.parse_nil()?;
                    0.0
                }
                Some(found) => return Err(r.mismatch(found)),
            };
            let nanos = seconds * 1e9;
            if !nanos.is_finite()
                || nanos >= i64::max_value() as f64
                || nanos <= i64::min_value() as f64
            {
                return Err(PackError::NumericOverflow { offset });
            }
            Ok(Duration::nanoseconds(nanos.round() as i64))
        }
    }
}

#[cfg(feature = "num-bigint")]
mod pack_bigint {
    use super::*;
    use num_bigint::{BigInt, BigUint, Sign};

    fn invert(bytes: &mut [u8]) {
        for byte in bytes.iter_mut() {
            *byte = !*byte;
        }
    }

    fn inverted(bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|byte| !*byte).collect()
    }

    impl TuplePack for BigInt {
        fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
            if self.sign() == Sign::NoSign {
                w.write_byte(INTZERO);
                return Ok(());
            }
            let (sign, mut bytes) = self.to_bytes_be();
            let n = bytes.len();
            // a single length byte caps the extended range at 255 bytes
            let len_byte =
                u8::try_from(n).map_err(|_| PackError::NumericOverflow { offset: w.len() })?;
            match sign {
                Sign::Minus => {
                    if n <= MAX_SZ {
                        w.write_byte(INTZERO - n as u8);
                    } else {
                        w.write_byte(NEGINTSTART);
                        w.write_byte(len_byte ^ 0xff);
                    }
                    invert(&mut bytes);
                    w.write_bytes(&bytes);
                }
                Sign::NoSign => unreachable!(),
                Sign::Plus => {
                    if n <= MAX_SZ {
                        w.write_byte(INTZERO + n as u8);
                    } else {
                        w.write_byte(POSINTEND);
                        w.write_byte(len_byte);
                    }
                    w.write_bytes(&bytes);
                }
            }
            Ok(())
        }
    }

    impl<'de> TupleUnpack<'de> for BigInt {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            let offset = r.position();
            let found = r.parse_byte()?;
            if INTZERO <= found && found <= INTZERO + MAX_SZ as u8 {
                let n = usize::from(found - INTZERO);
                Ok(Self::from_bytes_be(Sign::Plus, r.parse_bytes(n)?))
            } else if INTZERO - MAX_SZ as u8 <= found && found < INTZERO {
                let n = usize::from(INTZERO - found);
                Ok(Self::from_bytes_be(Sign::Minus, &inverted(r.parse_bytes(n)?)))
            } else if found == NEGINTSTART {
                let n = usize::from(r.parse_byte()? ^ 0xff);
                Ok(Self::from_bytes_be(Sign::Minus, &inverted(r.parse_bytes(n)?)))
            } else if found == POSINTEND {
                let n = usize::from(r.parse_byte()?);
                Ok(Self::from_bytes_be(Sign::Plus, r.parse_bytes(n)?))
            } else {
                Err(r.mismatch_at(offset, found))
            }
        }
    }

    impl TuplePack for BigUint {
        fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
            if self.bits() == 0 {
                w.write_byte(INTZERO);
                return Ok(());
            }
            let bytes = self.to_bytes_be();
            let n = bytes.len();
            if n <= MAX_SZ {
                w.write_byte(INTZERO + n as u8);
            } else {
                w.write_byte(POSINTEND);
                w.write_byte(
                    u8::try_from(n).map_err(|_| PackError::NumericOverflow { offset: w.len() })?,
                );
            }
            w.write_bytes(&bytes);
            Ok(())
        }
    }

    impl<'de> TupleUnpack<'de> for BigUint {
        fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
            let offset = r.position();
            let found = r.parse_byte()?;
            if INTZERO <= found && found <= INTZERO + MAX_SZ as u8 {
                let n = usize::from(found - INTZERO);
                Ok(Self::from_bytes_be(r.parse_bytes(n)?))
            } else if found == POSINTEND {
                let n = usize::from(r.parse_byte()?);
                Ok(Self::from_bytes_be(r.parse_bytes(n)?))
            } else {
                Err(r.mismatch_at(offset, found))
            }
        }
    }
}

impl<'a> TuplePack for Element<'a> {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        match self {
            Element::Nil => {
                w.write_nil();
                Ok(())
            }
            Element::Bytes(v) => v.pack(w),
            Element::String(v) => v.pack(w),
            Element::Tuple(v) => {
                w.begin_nested()?;
                for element in v {
                    element.pack(w)?;
                }
                w.end_nested()
            }
            Element::Int(v) => v.pack(w),
            Element::Float(v) => v.pack(w),
            Element::Double(v) => v.pack(w),
            Element::Bool(v) => v.pack(w),
            #[cfg(feature = "uuid")]
            Element::Uuid(v) => v.pack(w),
            Element::Uuid64(v) => v.pack(w),
            Element::Versionstamp(v) => v.pack(w),
            Element::UserType { code, data } => {
                // only the bare reserved codes have a self-delimited wire
                // form the tokenizer can walk past
                if (*code != DIRECTORY && *code != SYSTEM) || !data.is_empty() {
                    return Err(PackError::UnsupportedCoercion {
                        code: *code,
                        offset: w.len(),
                    });
                }
                w.write_byte(*code);
                Ok(())
            }
        }
    }

    fn pack_root(&self, w: &mut TupleWriter) -> PackResult<()> {
        match self {
            Element::Tuple(v) => {
                for element in v {
                    element.pack(w)?;
                }
                Ok(())
            }
            other => other.pack(w),
        }
    }
}

impl<'de> TupleUnpack<'de> for Element<'de> {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        let offset = r.position();
        let found = match r.peek_byte() {
            None => return Err(PackError::truncated(offset)),
            Some(found) => found,
        };
        match found {
            NIL => {
                r.parse_nil()?;
                Ok(Element::Nil)
            }
            BYTES => Bytes::unpack(r).map(Element::Bytes),
            STRING => Cow::<str>::unpack(r).map(Element::String),
            NESTED => {
                r.enter_nested()?;
                let mut items = Vec::new();
                while !r.at_tuple_end() {
                    items.push(Element::unpack(r)?);
                }
                r.leave_nested()?;
                Ok(Element::Tuple(items))
            }
            NEGINTSTART..=POSINTEND => {
                let v = parse_int(r)?;
                i64::try_from(v)
                    .map(Element::Int)
                    .map_err(|_| PackError::NumericOverflow { offset })
            }
            FLOAT => parse_f32_element(r).map(Element::Float),
            DOUBLE => parse_f64_element(r).map(Element::Double),
            FALSE => {
                r.parse_byte()?;
                Ok(Element::Bool(false))
            }
            TRUE => {
                r.parse_byte()?;
                Ok(Element::Bool(true))
            }
            #[cfg(feature = "uuid")]
            UUID => uuid::Uuid::unpack(r).map(Element::Uuid),
            #[cfg(not(feature = "uuid"))]
            UUID => Err(r.mismatch(found)),
            UUID64 => Uuid64::unpack(r).map(Element::Uuid64),
            VERSIONSTAMP | VERSIONSTAMP_USER => Versionstamp::unpack(r).map(Element::Versionstamp),
            DECIMAL => Err(PackError::Unimplemented { offset }),
            DIRECTORY | SYSTEM => {
                let code = r.parse_byte()?;
                Ok(Element::UserType {
                    code,
                    data: Bytes::default(),
                })
            }
            _ => Err(PackError::MalformedInput { offset }),
        }
    }

    fn unpack_root(input: &'de [u8]) -> PackResult<Self> {
        let mut r = TupleReader::new(input);
        if r.remaining() == 0 {
            return Ok(Element::Tuple(Vec::new()));
        }
        let first = Element::unpack(&mut r)?;
        if r.remaining() == 0 {
            return Ok(first);
        }
        let mut items = vec![first];
        while r.remaining() != 0 {
            items.push(Element::unpack(&mut r)?);
        }
        Ok(Element::Tuple(items))
    }
}

impl<'a> TuplePack for Vec<Element<'a>> {
    fn pack(&self, w: &mut TupleWriter) -> PackResult<()> {
        w.begin_nested()?;
        for element in self {
            element.pack(w)?;
        }
        w.end_nested()
    }

    fn pack_root(&self, w: &mut TupleWriter) -> PackResult<()> {
        for element in self {
            element.pack(w)?;
        }
        Ok(())
    }
}

impl<'de> TupleUnpack<'de> for Vec<Element<'de>> {
    fn unpack(r: &mut TupleReader<'de>) -> PackResult<Self> {
        r.enter_nested()?;
        let mut items = Vec::new();
        while !r.at_tuple_end() {
            items.push(Element::unpack(r)?);
        }
        r.leave_nested()?;
        Ok(items)
    }

    fn unpack_root(input: &'de [u8]) -> PackResult<Self> {
        let mut r = TupleReader::new(input);
        let mut items = Vec::new();
        while r.remaining() != 0 {
            items.push(Element::unpack(&mut r)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pack, unpack};
    use std::fmt;

    fn test_round_trip<'de, T>(val: T, buf: &'de [u8])
    where
        T: TuplePack + TupleUnpack<'de> + fmt::Debug + PartialEq,
    {
        assert_eq!(val, unpack::<T>(buf).unwrap());
        assert_eq!(buf, pack(&val).unwrap().as_slice());
    }

    #[test]
    fn test_element() {
        // Reference vectors generated with the Python binding:
        // [ord(v) for v in fdb.tuple.pack(tup)]

        // bool
        test_round_trip(false, &[FALSE]);
        test_round_trip(true, &[TRUE]);

        // int
        test_round_trip(0i64, &[INTZERO]);
        test_round_trip(1i64, &[0x15, 1]);
        test_round_trip(-1i64, &[0x13, 254]);
        test_round_trip(100i64, &[21, 100]);

        test_round_trip(10000i64, &[22, 39, 16]);
        test_round_trip(-100i64, &[19, 155]);
        test_round_trip(-10000i64, &[18, 216, 239]);
        test_round_trip(-1000000i64, &[17, 240, 189, 191]);

        // boundary condition
        test_round_trip(255i64, &[21, 255]);
        test_round_trip(256i64, &[22, 1, 0]);
        test_round_trip(-255i64, &[19, 0]);
        test_round_trip(-256i64, &[18, 254, 255]);

        // float
        test_round_trip(1.6f64, &[33, 191, 249, 153, 153, 153, 153, 153, 154]);

        // string
        test_round_trip(String::from("hello"), &[2, 104, 101, 108, 108, 111, 0]);

        // binary
        test_round_trip(b"hello".to_vec(), &[1, 104, 101, 108, 108, 111, 0]);
        test_round_trip(b"\x00".to_vec(), &[1, 0, 0xff, 0]);
    }

    #[test]
    fn test_large_neg() {
        test_round_trip(
            -8617230260136600747i64,
            &[0x0c, 0x88, 0x69, 0x72, 0xbc, 0x04, 0xcf, 0x9b, 0x54],
        );
    }

    #[test]
    fn test_boundary() {
        test_round_trip(i64::min_value() + 1, &[0x0c, 0x80, 0, 0, 0, 0, 0, 0, 0]);

        test_round_trip(
            i64::min_value(),
            &[0x0c, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        );

        test_round_trip(
            i64::max_value(),
            &[0x1c, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        );

        test_round_trip(
            i64::max_value() - 1,
            &[0x1c, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe],
        );
    }

    #[test]
    fn test_i64_out_of_bound() {
        // fdb.tuple.pack(((1<<63),))
        assert_eq!(
            unpack::<i64>(&[0x1c, 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap_err(),
            PackError::NumericOverflow { offset: 0 }
        );
        assert_eq!(
            unpack::<u64>(&[0x1c, 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            1u64 << 63
        );

        // fdb.tuple.pack((-(1<<63)-1,))
        assert_eq!(
            unpack::<i64>(&[0x0c, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]).unwrap_err(),
            PackError::NumericOverflow { offset: 0 }
        );
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        assert_eq!(
            unpack::<u32>(&[0x13, 254]).unwrap_err(),
            PackError::NumericOverflow { offset: 0 }
        );
    }

    #[test]
    fn test_narrow_widths() {
        test_round_trip(200u8, &[21, 200]);
        test_round_trip(-2i8, &[0x13, 253]);
        assert_eq!(
            unpack::<u8>(&[22, 1, 0]).unwrap_err(),
            PackError::NumericOverflow { offset: 0 }
        );
        assert_eq!(unpack::<u32>(&[22, 1, 0]).unwrap(), 256);
    }

    #[test]
    fn test_encode_recursive_tuple() {
        assert_eq!(
            &pack(&("one", ("two", 42i64))).unwrap(),
            &[2, 111, 110, 101, 0, 5, 2, 116, 119, 111, 0, 21, 42, 0]
        );
        assert_eq!(
            &pack(&("one", ("two", 42i64, ("three", 33i64)))).unwrap(),
            &[
                2, 111, 110, 101, 0, 5, 2, 116, 119, 111, 0, 21, 42, 5, 2, 116, 104, 114, 101,
                101, 0, 21, 33, 0, 0,
            ]
        );

        // from the Python binding:
        //  >>> [ord(x) for x in fdb.tuple.pack( (None, (None, None)) )]
        assert_eq!(
            &pack(&(None::<i64>, (None::<i64>, None::<i64>))).unwrap(),
            &[0, 5, 0, 255, 0, 255, 0]
        );
    }

    #[test]
    fn test_decode_recursive_tuple() {
        let two: (String, (String, i64)) =
            unpack(&[2, 111, 110, 101, 0, 5, 2, 116, 119, 111, 0, 21, 42, 0]).expect("failed two");
        assert_eq!(("one".to_string(), ("two".to_string(), 42)), two);

        let three: (String, (String, i64, (String, i64))) = unpack(&[
            2, 111, 110, 101, 0, 5, 2, 116, 119, 111, 0, 21, 42, 5, 2, 116, 104, 114, 101, 101, 0,
            21, 33, 0, 0,
        ])
        .expect("failed three");
        assert_eq!(
            (
                "one".to_string(),
                ("two".to_string(), 42, ("three".to_string(), 33))
            ),
            three
        );

        let options: (Option<i64>, (Option<i64>, Option<i64>)) =
            unpack(&[0, 5, 0, 255, 0, 255, 0]).expect("failed option");
        assert_eq!((None, (None, None)), options);
    }

    #[test]
    fn test_single_tuple_encode() {
        assert_eq!(pack(&(1i64,)).unwrap(), pack(&1i64).unwrap());

        // >>> [ord(x) for x in fdb.tuple.pack((1,(1,)))]
        assert_eq!(&pack(&(1i64, (1i64,))).unwrap(), &[21, 1, 5, 21, 1, 0]);

        // >>> [ord(x) for x in fdb.tuple.pack( (1,(1,(1,))) )]
        assert_eq!(
            &pack(&(1i64, (1i64, (1i64,)))).unwrap(),
            &[21, 1, 5, 21, 1, 5, 21, 1, 0, 0]
        );

        // >>> [ord(x) for x in fdb.tuple.pack( (1,(1,),(1,)) )]
        assert_eq!(
            &pack(&(1i64, (1i64,), (1i64,))).unwrap(),
            &[21, 1, 5, 21, 1, 0, 5, 21, 1, 0]
        );
    }

    #[test]
    fn test_single_tuple_decode() {
        assert_eq!(1i64, unpack(&[21, 1]).expect("1"));
        assert_eq!((1i64,), unpack(&[21, 1]).expect("(1,)"));

        assert_eq!(
            (1i64, (1i64,)),
            unpack(&[21, 1, 5, 21, 1, 0]).expect("(1, (1,))")
        );
        assert_eq!(
            (1i64, (1i64, (1i64,))),
            unpack(&[21, 1, 5, 21, 1, 5, 21, 1, 0, 0]).expect("(1, (1, (1,)))")
        );
        assert_eq!(
            (1i64, (1i64,), (1i64,)),
            unpack(&[21, 1, 5, 21, 1, 0, 5, 21, 1, 0]).expect("(1, (1,), (1,))")
        );
    }

    #[test]
    fn test_option() {
        assert_eq!(&pack(&Some(42i64)).unwrap(), &[21, 42]);
        assert_eq!(&pack(&None::<i64>).unwrap(), &[0]);

        assert_eq!(Some(42i64), unpack(&[21, 42]).expect("Some(42)"));
        assert_eq!(None::<i64>, unpack(&[0]).expect("None::<i64>"));

        assert!(unpack::<(i64, Option<i64>)>(&[0]).is_err());
        assert!(unpack::<(i64, Option<i64>)>(&[21, 42, 0]).is_ok());
        // one of the inner Nones is missing its escape byte
        assert!(unpack::<(i64, (Option<i64>, Option<i64>))>(&[21, 42, 5, 0, 255, 0, 0]).is_err());
    }

    #[test]
    fn test_malformed_int() {
        assert!(unpack::<Vec<Element>>(&[21, 0]).is_ok());
        assert!(unpack::<Vec<Element>>(&[22, 0]).is_err());
        assert!(unpack::<Vec<Element>>(&[22, 0, 0]).is_ok());

        assert!(unpack::<Vec<Element>>(&[19, 0]).is_ok());
        assert!(unpack::<Vec<Element>>(&[18, 0]).is_err());
        assert!(unpack::<Vec<Element>>(&[18, 0, 0]).is_ok());
    }

    #[test]
    fn test_decode_nested() {
        assert!(unpack::<Vec<Element>>(&[NESTED]).is_err());
        assert!(unpack::<Vec<Element>>(&[NESTED, NIL]).is_ok());
        assert!(unpack::<Vec<Element>>(&[NESTED, INTZERO]).is_err());
        assert!(unpack::<Vec<Element>>(&[NESTED, NIL, NESTED, NIL]).is_ok());
        assert!(unpack::<Vec<Element>>(&[NESTED, NESTED, NESTED, NIL, NIL, NIL]).is_ok());
    }

    #[test]
    fn test_element_round_trips() {
        let elements = vec![
            Element::Nil,
            Element::Bytes(Bytes::from(&b"\x00bin"[..])),
            Element::String(Cow::Borrowed("text")),
            Element::Tuple(vec![Element::Int(-42), Element::Nil]),
            Element::Int(42),
            Element::Float(3.14),
            Element::Double(-2.5),
            Element::Bool(true),
            Element::Uuid64(Uuid64::new(0xdead_beef)),
            Element::Versionstamp(Versionstamp::complete_with_user([3; 10], 9)),
        ];
        let encoded = pack(&elements).unwrap();
        let decoded: Vec<Element> = unpack(&encoded).unwrap();
        assert_eq!(elements, decoded);
    }

    #[test]
    fn test_nested_empty_and_escapes() {
        test_round_trip(
            Element::Tuple(vec![
                Element::Bytes(Bytes::from(&[0u8][..])),
                Element::Nil,
                Element::Tuple(vec![Element::Bytes(Bytes::from(&[0u8][..])), Element::Nil]),
            ]),
            &[5, 1, 0, 255, 0, 0, 255, 5, 1, 0, 255, 0, 0, 255, 0, 0],
        );

        test_round_trip(
            Element::Tuple(vec![
                Element::Bool(true),
                Element::Tuple(vec![Element::Bool(false)]),
            ]),
            &[NESTED, 39, NESTED, 38, NIL, NIL],
        );
    }

    #[test]
    fn test_canonical_nan() {
        let encoded = pack(&f64::from_bits(0xfff8_dead_beef_0000)).unwrap();
        assert_eq!(encoded, pack(&std::f64::NAN).unwrap());
        assert!(unpack::<f64>(&encoded).unwrap().is_nan());
    }

    #[test]
    fn test_versionstamp_codes() {
        let plain = Versionstamp::complete([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(
            pack(&plain).unwrap(),
            vec![0x32, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
        );
        let user = Versionstamp::complete_with_user([1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 0x0102);
        assert_eq!(
            pack(&user).unwrap(),
            vec![0x33, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 1, 2]
        );
        assert_eq!(unpack::<Versionstamp>(&pack(&plain).unwrap()).unwrap(), plain);
        assert_eq!(unpack::<Versionstamp>(&pack(&user).unwrap()).unwrap(), user);
    }

    #[test]
    fn test_decimal_unimplemented() {
        let mut data = vec![DECIMAL];
        data.extend_from_slice(&[0; 16]);
        assert_eq!(
            unpack::<Element>(&data).unwrap_err(),
            PackError::Unimplemented { offset: 0 }
        );
    }

    #[test]
    fn test_legacy_nested_rejected() {
        assert_eq!(
            unpack::<Element>(&[0x03, 0x15, 0x01, 0x00]).unwrap_err(),
            PackError::MalformedInput { offset: 0 }
        );
    }

    #[test]
    fn test_user_type_codes() {
        assert_eq!(pack(&Element::UserType { code: 0xfe, data: Bytes::default() }).unwrap(), vec![0xfe]);
        assert_eq!(
            unpack::<Element>(&[0xfe]).unwrap(),
            Element::UserType {
                code: 0xfe,
                data: Bytes::default()
            }
        );
        assert_eq!(
            unpack::<Element>(&[0xff]).unwrap(),
            Element::UserType {
                code: 0xff,
                data: Bytes::default()
            }
        );
    }

    #[test]
    fn test_user_type_rejects_undelimitable_forms() {
        // a payload after a reserved code would desync the tokenizer
        assert_eq!(
            pack(&Element::UserType {
                code: 0xfe,
                data: Bytes::from(&b"x"[..])
            })
            .unwrap_err(),
            PackError::UnsupportedCoercion {
                code: 0xfe,
                offset: 0
            }
        );
        // a code colliding with a real type code would be scanned as that type
        assert_eq!(
            pack(&Element::UserType {
                code: 0x01,
                data: Bytes::default()
            })
            .unwrap_err(),
            PackError::UnsupportedCoercion {
                code: 0x01,
                offset: 0
            }
        );
        // the rejection also applies in element position
        assert!(pack(&vec![
            Element::Int(1),
            Element::UserType {
                code: 0x42,
                data: Bytes::default()
            }
        ])
        .is_err());
    }

    #[cfg(feature = "uuid")]
    #[test]
    fn test_uuid() {
        let id = uuid::Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        let encoded = pack(&id).unwrap();
        assert_eq!(encoded[0], 0x30);
        // big-endian field order straight from RFC 4122, no swapping
        assert_eq!(
            &encoded[1..],
            &[
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff
            ]
        );
        assert_eq!(unpack::<uuid::Uuid>(&encoded).unwrap(), id);
    }

    #[cfg(feature = "num-bigint")]
    #[test]
    fn test_bigint() {
        use num_bigint::BigInt;
        use std::str::FromStr;

        let small = BigInt::from(-1000000i64);
        assert_eq!(pack(&small).unwrap(), pack(&-1000000i64).unwrap());

        let big = BigInt::from_str("123456789012345678901234567890").unwrap();
        let encoded = pack(&big).unwrap();
        assert_eq!(encoded[0], POSINTEND);
        assert_eq!(unpack::<BigInt>(&encoded).unwrap(), big);

        let negative = -big.clone();
        let encoded = pack(&negative).unwrap();
        assert_eq!(encoded[0], NEGINTSTART);
        assert_eq!(unpack::<BigInt>(&encoded).unwrap(), negative);
    }
}
