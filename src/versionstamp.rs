use std::cmp::Ordering;
use std::fmt;

use crate::bytes::Bytes;

/// A commit versionstamp: 10 bytes of commit information (8-byte transaction
/// version plus 2-byte batch order, big-endian), optionally followed by a
/// client-chosen 2-byte user version.
///
/// Stamps without a user version pack under type code `0x32` (10-byte
/// payload), stamps with one under `0x33` (12-byte payload).
///
/// An *incomplete* stamp has all transaction-version bytes set to `0xFF`; the
/// store fills the real value in at commit time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Versionstamp {
    tr_version: [u8; 10],
    user_version: Option<u16>,
}

impl Versionstamp {
    /// A stamp whose transaction version the store has yet to assign.
    pub fn incomplete() -> Self {
        Versionstamp {
            tr_version: [0xff; 10],
            user_version: None,
        }
    }

    /// An incomplete stamp carrying a user version.
    pub fn incomplete_with_user(user_version: u16) -> Self {
        Versionstamp {
            tr_version: [0xff; 10],
            user_version: Some(user_version),
        }
    }

    /// A stamp with a resolved transaction version and no user version.
    pub fn complete(tr_version: [u8; 10]) -> Self {
        Versionstamp {
            tr_version,
            user_version: None,
        }
    }

    /// A stamp with a resolved transaction version and a user version.
    pub fn complete_with_user(tr_version: [u8; 10], user_version: u16) -> Self {
        Versionstamp {
            tr_version,
            user_version: Some(user_version),
        }
    }

    pub(crate) fn from_parts(tr_version: [u8; 10], user_version: Option<u16>) -> Self {
        Versionstamp {
            tr_version,
            user_version,
        }
    }

    /// The 10 commit-information bytes.
    pub fn transaction_version(&self) -> &[u8; 10] {
        &self.tr_version
    }

    /// The user version, when the stamp carries one.
    pub fn user_version(&self) -> Option<u16> {
        self.user_version
    }

    /// Whether the store has assigned the transaction version.
    pub fn is_complete(&self) -> bool {
        self.tr_version != [0xff; 10]
    }
}

// Stamps without a user version sort before stamps with one, matching the
// order of their type codes on the wire.
impl Ord for Versionstamp {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.user_version.is_some(), self.tr_version, self.user_version).cmp(&(
            other.user_version.is_some(),
            other.tr_version,
            other.user_version,
        ))
    }
}

impl PartialOrd for Versionstamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Versionstamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.user_version {
            None => write!(f, "Versionstamp({})", Bytes::from(&self.tr_version[..])),
            Some(user) => write!(
                f,
                "Versionstamp({}, user={})",
                Bytes::from(&self.tr_version[..]),
                user
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        assert!(!Versionstamp::incomplete().is_complete());
        assert!(!Versionstamp::incomplete_with_user(7).is_complete());
        assert!(Versionstamp::complete([1; 10]).is_complete());
        assert_eq!(Versionstamp::complete([1; 10]).user_version(), None);
        assert_eq!(
            Versionstamp::complete_with_user([1; 10], 7).user_version(),
            Some(7)
        );
    }

    #[test]
    fn test_order_matches_type_codes() {
        // any stamp without a user version sorts below any stamp with one
        let high_plain = Versionstamp::complete([9; 10]);
        let low_user = Versionstamp::complete_with_user([1; 10], 0);
        assert!(high_plain < low_user);

        let a = Versionstamp::complete_with_user([1; 10], 1);
        let b = Versionstamp::complete_with_user([1; 10], 2);
        assert!(a < b);
    }
}
