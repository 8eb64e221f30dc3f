use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

/// A byte-string tuple element.
///
/// Wraps a `Cow<[u8]>` so that unpacking borrows from the encoded buffer
/// whenever the payload contains no escaped NUL bytes, and only allocates
/// when un-escaping has to materialize the payload.
///
/// `Debug` and `Display` print printable ASCII verbatim and escape everything
/// else, which keeps keys readable in assertions and logs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes<'a>(pub Cow<'a, [u8]>);

impl Default for Bytes<'_> {
    fn default() -> Self {
        Bytes(Cow::Borrowed(&[]))
    }
}

impl<'a> Bytes<'a> {
    /// Extracts the owned payload, cloning if it is still borrowed.
    pub fn into_owned(self) -> Vec<u8> {
        self.0.into_owned()
    }

    /// Clones the payload if necessary to detach it from the source buffer.
    pub fn into_static(self) -> Bytes<'static> {
        Bytes(Cow::Owned(self.0.into_owned()))
    }
}

impl Deref for Bytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl AsRef<[u8]> for Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Bytes<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Bytes(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Bytes<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes(Cow::Owned(bytes))
    }
}

impl<'a> From<Cow<'a, [u8]>> for Bytes<'a> {
    fn from(bytes: Cow<'a, [u8]>) -> Self {
        Bytes(bytes)
    }
}

impl fmt::Debug for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "b\"")?;
        for &byte in self.iter() {
            match byte {
                b'"' => write!(f, "\\\"")?,
                b'\\' => write!(f, "\\\\")?,
                0x20..=0x7e => write!(f, "{}", byte as char)?,
                _ => write!(f, "\\x{:02x}", byte)?,
            }
        }
        write!(f, "\"")
    }
}

impl fmt::Display for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_escapes() {
        let bytes = Bytes::from(&b"key\x00\xff\"\\"[..]);
        assert_eq!(format!("{:?}", bytes), r#"b"key\x00\xff\"\\""#);
    }

    #[test]
    fn test_borrowed_until_owned() {
        let source = b"hello".to_vec();
        let bytes = Bytes::from(&source[..]);
        assert!(matches!(bytes.0, Cow::Borrowed(_)));
        assert_eq!(bytes.into_owned(), source);
    }
}
