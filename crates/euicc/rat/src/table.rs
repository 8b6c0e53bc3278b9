//! The Rules Authorisation Table and its builder

use tracing::trace;

use crate::carrier::CarrierIdentifier;
use crate::error::{RatError, Result};

/// One table entry: the policy rules it authorises, for which operators, with which flags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleEntry {
    /// Bit set of authorised policy rules
    pub policy_rules: u32,
    /// Operators the entry applies to; empty applies to every operator
    pub carrier_ids: Vec<CarrierIdentifier>,
    /// Bit set of rule flags
    pub policy_rule_flags: u32,
}

impl RuleEntry {
    /// Whether the entry authorises any rule of `policy` for `carrier`
    pub fn applies_to(&self, policy: u32, carrier: &CarrierIdentifier) -> bool {
        self.policy_rules & policy != 0
            && (self.carrier_ids.is_empty()
                || self.carrier_ids.iter().any(|pattern| pattern.matches(carrier)))
    }
}

/// Ordered, fixed-length list of rules read from the eUICC
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RulesAuthTable {
    rules: Vec<RuleEntry>,
}

impl RulesAuthTable {
    /// Start a table of exactly `len` rules
    pub fn builder(len: usize) -> RulesAuthTableBuilder {
        RulesAuthTableBuilder::new(len)
    }

    /// Index of the first rule authorising any of `policy` for `carrier`
    pub fn find_index(&self, policy: u32, carrier: &CarrierIdentifier) -> Option<usize> {
        let index = self
            .rules
            .iter()
            .position(|rule| rule.applies_to(policy, carrier));
        trace!(policy, carrier = %carrier, ?index, "Looked up rules table");
        index
    }

    /// Whether the rule at `index` carries `flag`
    pub fn has_policy_rule_flag(&self, index: usize, flag: u32) -> Result<bool> {
        self.rules
            .get(index)
            .map(|rule| rule.policy_rule_flags & flag != 0)
            .ok_or(RatError::IndexOutOfBounds {
                index,
                len: self.rules.len(),
            })
    }

    /// Rules in table order
    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Collects exactly the declared number of rules
#[derive(Debug, Clone)]
pub struct RulesAuthTableBuilder {
    capacity: usize,
    rules: Vec<RuleEntry>,
}

impl RulesAuthTableBuilder {
    /// Create a builder for `len` rules
    pub fn new(len: usize) -> Self {
        Self {
            capacity: len,
            rules: Vec::with_capacity(len),
        }
    }

    /// Append a rule
    pub fn add(
        mut self,
        policy_rules: u32,
        carrier_ids: Vec<CarrierIdentifier>,
        policy_rule_flags: u32,
    ) -> Result<Self> {
        self.push(RuleEntry {
            policy_rules,
            carrier_ids,
            policy_rule_flags,
        })?;
        Ok(self)
    }

    pub(crate) fn push(&mut self, rule: RuleEntry) -> Result<()> {
        if self.rules.len() == self.capacity {
            return Err(RatError::TooManyRules {
                capacity: self.capacity,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Finish the table; every declared rule must have been added
    pub fn build(self) -> Result<RulesAuthTable> {
        if self.rules.len() < self.capacity {
            return Err(RatError::NotEnoughRules {
                expected: self.capacity,
                actual: self.rules.len(),
            });
        }
        Ok(RulesAuthTable { rules: self.rules })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::{policy_rule, policy_rule_flag};

    fn carrier(mcc_mnc: [u8; 3], gid1: Option<&str>, gid2: Option<&str>) -> CarrierIdentifier {
        CarrierIdentifier::from_mcc_mnc_bytes(
            &mcc_mnc,
            gid1.map(str::to_owned),
            gid2.map(str::to_owned),
        )
        .unwrap()
    }

    /// Four rules exercising specific, wildcard and group identifier patterns
    pub(crate) fn sample_table() -> RulesAuthTable {
        RulesAuthTable::builder(4)
            .add(
                policy_rule::DO_NOT_DELETE | policy_rule::DO_NOT_DISABLE,
                // 123/45 with gid1 4, matches neither operator below
                vec![carrier([0x21, 0xF3, 0x54], Some("4"), None)],
                policy_rule_flag::CONSENT_REQUIRED,
            )
            .unwrap()
            .add(
                policy_rule::DO_NOT_DELETE,
                vec![
                    carrier([0x21, 0xF3, 0x54], Some("4"), None),
                    carrier([0x21, 0x63, 0x54], None, Some("4")),
                ],
                policy_rule_flag::CONSENT_REQUIRED,
            )
            .unwrap()
            .add(
                policy_rule::DO_NOT_DISABLE,
                vec![
                    carrier([0x21, 0x63, 0x54], None, Some("5")),
                    carrier([0x21, 0x6E, 0x54], None, None),
                ],
                0,
            )
            .unwrap()
            .add(
                policy_rule::DO_NOT_DELETE | policy_rule::DO_NOT_DISABLE,
                vec![
                    carrier([0x21, 0x69, 0x54], Some("5"), None),
                    carrier([0x21, 0x6E, 0x54], Some("4"), None),
                    carrier([0x21, 0x6E, 0x54], None, Some("4")),
                ],
                policy_rule_flag::CONSENT_REQUIRED,
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_index() {
        let op_a = carrier([0x21, 0x63, 0x54], None, Some("4"));
        let op_b = carrier([0x21, 0x69, 0x54], Some("4"), None);
        let rat = sample_table();

        assert_eq!(rat.find_index(policy_rule::DO_NOT_DELETE, &op_a), Some(1));
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DELETE, &op_b), Some(3));
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DISABLE, &op_a), Some(2));
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DISABLE, &op_b), Some(2));
        assert_eq!(rat.find_index(policy_rule::DELETE_AFTER_DISABLING, &op_a), None);

        let consent = policy_rule_flag::CONSENT_REQUIRED;
        assert!(rat.has_policy_rule_flag(1, consent).unwrap());
        assert!(!rat.has_policy_rule_flag(2, consent).unwrap());
        assert!(rat.has_policy_rule_flag(3, consent).unwrap());
    }

    #[test]
    fn test_allow_all_with_consent() {
        let op_a = carrier([0x21, 0x63, 0x54], None, Some("4"));
        let op_b = carrier([0x78, 0xF4, 0x25], Some("4"), None);
        let rat = RulesAuthTable::builder(1)
            .add(
                policy_rule::DO_NOT_DELETE | policy_rule::DO_NOT_DISABLE,
                vec![carrier([0xEE, 0xEE, 0xEE], None, None)],
                policy_rule_flag::CONSENT_REQUIRED,
            )
            .unwrap()
            .build()
            .unwrap();

        for op in [&op_a, &op_b] {
            assert_eq!(rat.find_index(policy_rule::DO_NOT_DELETE, op), Some(0));
            assert_eq!(rat.find_index(policy_rule::DO_NOT_DISABLE, op), Some(0));
        }
    }

    #[test]
    fn test_empty_patterns_match_any_carrier() {
        let op = carrier([0x78, 0xF4, 0x25], Some("4"), None);
        let rat = RulesAuthTable::builder(2)
            .add(0, Vec::new(), 0)
            .unwrap()
            .add(policy_rule::DO_NOT_DELETE, Vec::new(), 0)
            .unwrap()
            .build()
            .unwrap();

        // The first rule authorises nothing, so the second wins
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DELETE, &op), Some(1));
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DISABLE, &op), None);
    }

    #[test]
    fn test_empty_table() {
        let op = carrier([0x21, 0x63, 0x54], None, Some("4"));
        let rat = RulesAuthTable::builder(0).build().unwrap();

        assert!(rat.is_empty());
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DELETE, &op), None);
        assert_eq!(rat.find_index(policy_rule::DO_NOT_DISABLE, &op), None);
    }

    #[test]
    fn test_builder_bounds() {
        assert_eq!(
            RulesAuthTable::builder(1).build().unwrap_err(),
            RatError::NotEnoughRules {
                expected: 1,
                actual: 0
            }
        );
        assert_eq!(
            RulesAuthTable::builder(0).add(0, Vec::new(), 0).unwrap_err(),
            RatError::TooManyRules { capacity: 0 }
        );

        let rat = RulesAuthTable::builder(1)
            .add(0, Vec::new(), 0)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            rat.has_policy_rule_flag(1, policy_rule_flag::CONSENT_REQUIRED),
            Err(RatError::IndexOutOfBounds { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(sample_table(), sample_table());

        let other = RulesAuthTable::builder(1)
            .add(policy_rule::DO_NOT_DELETE, Vec::new(), 0)
            .unwrap()
            .build()
            .unwrap();
        assert_ne!(sample_table(), other);
    }
}
