//! Binary form of a table
//!
//! Big-endian throughout:
//!
//! ```text
//! u32 rule count
//! per rule:    u32 policy rules, u32 flags, u32 pattern count
//! per pattern: string mcc, string mnc, optional gid1, optional gid2
//! string:      u32 byte length, UTF-8 bytes
//! optional:    u8 presence (0 or 1), string when present
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::carrier::CarrierIdentifier;
use crate::error::{RatError, Result};
use crate::table::{RuleEntry, RulesAuthTable, RulesAuthTableBuilder};

impl RulesAuthTable {
    /// Serialize the table
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        put_len(&mut buf, self.rules().len());
        for rule in self.rules() {
            buf.put_u32(rule.policy_rules);
            buf.put_u32(rule.policy_rule_flags);
            put_len(&mut buf, rule.carrier_ids.len());
            for carrier in &rule.carrier_ids {
                put_string(&mut buf, carrier.mcc());
                put_string(&mut buf, carrier.mnc());
                put_optional(&mut buf, carrier.gid1());
                put_optional(&mut buf, carrier.gid2());
            }
        }
        buf.freeze()
    }

    /// Read a table written by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let count = get_u32(&mut buf, "rule count")?;

        let mut rules = Vec::new();
        for _ in 0..count {
            let policy_rules = get_u32(&mut buf, "policy rules")?;
            let policy_rule_flags = get_u32(&mut buf, "policy rule flags")?;
            let patterns = get_u32(&mut buf, "pattern count")?;

            let mut carrier_ids = Vec::new();
            for _ in 0..patterns {
                let mcc = get_string(&mut buf)?;
                let mnc = get_string(&mut buf)?;
                let gid1 = get_optional(&mut buf)?;
                let gid2 = get_optional(&mut buf)?;
                carrier_ids.push(CarrierIdentifier::new(mcc, mnc, gid1, gid2));
            }
            rules.push(RuleEntry {
                policy_rules,
                carrier_ids,
                policy_rule_flags,
            });
        }

        if buf.has_remaining() {
            return Err(RatError::malformed(format!(
                "{} trailing bytes",
                buf.remaining()
            )));
        }

        let mut builder = RulesAuthTableBuilder::new(rules.len());
        for rule in rules {
            builder.push(rule)?;
        }
        builder.build()
    }
}

fn put_len(buf: &mut BytesMut, len: usize) {
    buf.put_u32(u32::try_from(len).unwrap_or(u32::MAX));
}

fn put_string(buf: &mut BytesMut, value: &str) {
    put_len(buf, value.len());
    buf.put_slice(value.as_bytes());
}

fn put_optional(buf: &mut BytesMut, value: Option<&str>) {
    match value {
        Some(value) => {
            buf.put_u8(1);
            put_string(buf, value);
        }
        None => buf.put_u8(0),
    }
}

fn ensure(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.len() < needed {
        return Err(RatError::malformed(format!(
            "truncated {what}: need {needed} bytes, {} left",
            buf.len()
        )));
    }
    Ok(())
}

fn get_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32())
}

fn get_string(buf: &mut &[u8]) -> Result<String> {
    let len = get_u32(buf, "string length")? as usize;
    ensure(buf, len, "string")?;
    let value = buf.copy_to_bytes(len);
    String::from_utf8(value.to_vec()).map_err(|e| RatError::malformed(e.to_string()))
}

fn get_optional(buf: &mut &[u8]) -> Result<Option<String>> {
    ensure(buf, 1, "presence flag")?;
    match buf.get_u8() {
        0 => Ok(None),
        1 => get_string(buf).map(Some),
        flag => Err(RatError::malformed(format!("invalid presence flag {flag}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::sample_table;
    use hex_literal::hex;

    #[test]
    fn test_round_trip() {
        let rat = sample_table();
        assert_eq!(RulesAuthTable::from_bytes(&rat.to_bytes()).unwrap(), rat);

        let empty = RulesAuthTable::builder(0).build().unwrap();
        let bytes = empty.to_bytes();
        assert_eq!(bytes.as_ref(), hex!("00000000"));
        assert_eq!(RulesAuthTable::from_bytes(&bytes).unwrap(), empty);

        let no_patterns = RulesAuthTable::builder(1)
            .add(3, Vec::new(), 1)
            .unwrap()
            .build()
            .unwrap();
        let bytes = no_patterns.to_bytes();
        assert_eq!(bytes.as_ref(), hex!("00000001 00000003 00000001 00000000"));
        assert_eq!(RulesAuthTable::from_bytes(&bytes).unwrap(), no_patterns);
    }

    #[test]
    fn test_pattern_layout() {
        let rat = RulesAuthTable::builder(1)
            .add(
                1,
                vec![CarrierIdentifier::new("123", "45", Some("AB".into()), None)],
                0,
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            rat.to_bytes().as_ref(),
            hex!(
                "00000001"
                "00000001 00000000 00000001"
                "00000003 313233"
                "00000002 3435"
                "01 00000002 4142"
                "00"
            )
        );
    }

    #[test]
    fn test_malformed() {
        let bytes = sample_table().to_bytes();

        assert!(matches!(
            RulesAuthTable::from_bytes(&bytes[..bytes.len() - 1]),
            Err(RatError::Malformed(_))
        ));

        let mut trailing = bytes.to_vec();
        trailing.push(0);
        assert!(matches!(
            RulesAuthTable::from_bytes(&trailing),
            Err(RatError::Malformed(_))
        ));

        assert!(matches!(
            RulesAuthTable::from_bytes(&hex!(
                "00000001 00000001 00000000 00000001 00000000 00000000 02"
            )),
            Err(RatError::Malformed(_))
        ));
    }
}
