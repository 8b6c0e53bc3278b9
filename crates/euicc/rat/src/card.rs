//! Reading a table from the eUICC's GetRAT response

use euicc_asn1::Asn1Node;
use tracing::debug;

use crate::carrier::CarrierIdentifier;
use crate::constants::tags;
use crate::error::Result;
use crate::table::{RuleEntry, RulesAuthTable, RulesAuthTableBuilder};

impl RulesAuthTable {
    /// Build a table from a decoded GetRAT response (`BF43`)
    ///
    /// Every rule sequence below every `A0` child becomes one entry, in encoding order.
    pub fn from_asn1(response: &Asn1Node) -> Result<Self> {
        let mut rules = Vec::new();
        for wrapper in response.children_with_tag(tags::RULES)? {
            for rule in wrapper.children_with_tag(tags::RULE)? {
                rules.push(parse_rule(rule)?);
            }
        }
        debug!(rules = rules.len(), "Parsed rules authorisation table");

        let mut builder = RulesAuthTableBuilder::new(rules.len());
        for rule in rules {
            builder.push(rule)?;
        }
        builder.build()
    }
}

fn parse_rule(rule: &Asn1Node) -> Result<RuleEntry> {
    let policy_rules = rule.child(tags::POLICY_RULES)?.as_bits()? as u32;
    let policy_rule_flags = rule.child(tags::POLICY_RULE_FLAGS)?.as_bits()? as u32;

    let mut carrier_ids = Vec::new();
    for operator in rule.child(tags::OPERATORS)?.children_with_tag(tags::OPERATOR_ID)? {
        carrier_ids.push(parse_operator(operator)?);
    }

    Ok(RuleEntry {
        policy_rules,
        carrier_ids,
        policy_rule_flags,
    })
}

fn parse_operator(operator: &Asn1Node) -> Result<CarrierIdentifier> {
    let mcc_mnc = operator.child(tags::MCC_MNC)?.as_bytes()?;
    let gid = |tag: u32| -> Result<Option<String>> {
        if !operator.has_child(&[tag])? {
            return Ok(None);
        }
        let value = operator.child(tag)?.as_bytes()?;
        Ok(Some(hex::encode_upper(value)))
    };
    CarrierIdentifier::from_mcc_mnc_bytes(&mcc_mnc, gid(tags::GID1)?, gid(tags::GID2)?)
}
