//! Carrier identities and operator patterns

use derive_more::Display;

use crate::error::{RatError, Result};

/// A carrier identity, or an operator pattern inside a rule
///
/// As a pattern, an `E` digit in the MCC or MNC matches any digit and an absent group
/// identifier matches any value.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{mcc}/{mnc}")]
pub struct CarrierIdentifier {
    mcc: String,
    mnc: String,
    gid1: Option<String>,
    gid2: Option<String>,
}

impl CarrierIdentifier {
    /// Create an identifier from its parts
    pub fn new(
        mcc: impl Into<String>,
        mnc: impl Into<String>,
        gid1: Option<String>,
        gid2: Option<String>,
    ) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
            gid1,
            gid2,
        }
    }

    /// Create an identifier from the three byte BCD MCC/MNC encoding
    ///
    /// The digits are nibble swapped: `21 63 54` is MCC `123` and MNC `456`. An `F` in
    /// the high nibble of the second byte marks a two digit MNC.
    pub fn from_mcc_mnc_bytes(
        mcc_mnc: &[u8],
        gid1: Option<String>,
        gid2: Option<String>,
    ) -> Result<Self> {
        let &[b0, b1, b2] = mcc_mnc else {
            return Err(RatError::malformed(format!(
                "MCC/MNC must be 3 bytes, got {}",
                mcc_mnc.len()
            )));
        };

        let mcc: String = [b0 & 0x0F, b0 >> 4, b1 & 0x0F].into_iter().map(digit).collect();
        let mut mnc: String = [b2 & 0x0F, b2 >> 4].into_iter().map(digit).collect();
        if b1 >> 4 != 0x0F {
            mnc.push(digit(b1 >> 4));
        }

        Ok(Self::new(mcc, mnc, gid1, gid2))
    }

    /// Mobile country code
    pub fn mcc(&self) -> &str {
        &self.mcc
    }

    /// Mobile network code
    pub fn mnc(&self) -> &str {
        &self.mnc
    }

    /// Group identifier level 1
    pub fn gid1(&self) -> Option<&str> {
        self.gid1.as_deref()
    }

    /// Group identifier level 2
    pub fn gid2(&self) -> Option<&str> {
        self.gid2.as_deref()
    }

    /// Whether `carrier` satisfies this identifier used as a pattern
    pub fn matches(&self, carrier: &Self) -> bool {
        match_digits(&self.mcc, &carrier.mcc)
            && match_digits(&self.mnc, &carrier.mnc)
            && gid_matches(self.gid1.as_deref(), carrier.gid1.as_deref())
            && gid_matches(self.gid2.as_deref(), carrier.gid2.as_deref())
    }
}

fn digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map_or('?', |c| c.to_ascii_uppercase())
}

fn gid_matches(pattern: Option<&str>, value: Option<&str>) -> bool {
    pattern.is_none_or(|pattern| Some(pattern) == value)
}

/// Match an MCC or MNC against a pattern
///
/// The pattern must be at least as long as the value. Characters are compared up to the
/// length of the value, `E` in the pattern matching anything; further pattern characters
/// are not looked at.
pub fn match_digits(pattern: &str, value: &str) -> bool {
    if pattern.len() < value.len() {
        return false;
    }
    pattern
        .bytes()
        .zip(value.bytes())
        .all(|(p, v)| p == b'E' || p == v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mcc_mnc_bytes() {
        let carrier =
            CarrierIdentifier::from_mcc_mnc_bytes(&[0x21, 0x63, 0x54], None, None).unwrap();
        assert_eq!(carrier.mcc(), "123");
        assert_eq!(carrier.mnc(), "456");

        let carrier =
            CarrierIdentifier::from_mcc_mnc_bytes(&[0x21, 0xF3, 0x54], Some("4".into()), None)
                .unwrap();
        assert_eq!(carrier.mnc(), "45");
        assert_eq!(carrier.gid1(), Some("4"));
        assert_eq!(carrier.to_string(), "123/45");

        let pattern =
            CarrierIdentifier::from_mcc_mnc_bytes(&[0xEE, 0xEE, 0xEE], None, None).unwrap();
        assert_eq!(pattern.mcc(), "EEE");
        assert_eq!(pattern.mnc(), "EEE");

        assert!(matches!(
            CarrierIdentifier::from_mcc_mnc_bytes(&[0x21, 0x63], None, None),
            Err(RatError::Malformed(_))
        ));
    }

    #[test]
    fn test_match_digits() {
        assert!(match_digits("12", "12"));
        assert!(match_digits("1E", "12"));
        assert!(match_digits("12E", "12"));
        assert!(match_digits("EEE", "12"));
        assert!(match_digits("120", "120"));
        assert!(match_digits("12E", "120"));
        assert!(match_digits("EEE", "120"));

        assert!(!match_digits("13", "12"));
        assert!(!match_digits("2E", "12"));
        assert!(!match_digits("123", "120"));
        assert!(!match_digits("1E", "120"));
        assert!(!match_digits("EE", "120"));
    }

    #[test]
    fn test_gid_wildcard() {
        let pattern = CarrierIdentifier::new("123", "45E", None, Some("4".into()));
        let carrier = CarrierIdentifier::new("123", "456", Some("9".into()), Some("4".into()));
        assert!(pattern.matches(&carrier));
        assert!(!pattern.matches(&CarrierIdentifier::new("123", "456", None, None)));
        assert!(!pattern.matches(&CarrierIdentifier::new("123", "456", None, Some("5".into()))));
    }
}
