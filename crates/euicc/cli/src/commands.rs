use clap::ValueEnum;
use colored::Colorize;
use euicc_apdu::{ApduTransport, Bytes, CardChannelService};
use euicc_asn1::{Asn1Decoder, Asn1Node};
use euicc_rat::{CarrierIdentifier, RulesAuthTable, policy_rule, policy_rule_flag};
use tracing::debug;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// AID of the ISD-R
pub(crate) const ISD_R_AID: &str = "A0000005591010FFFFFFFF8900000100";

/// GetEuiccData requesting the EID
const GET_EID: [u8; 6] = [0xBF, 0x3E, 0x03, 0x5C, 0x01, 0x5A];
/// GetRAT
const GET_RAT: [u8; 3] = [0xBF, 0x43, 0x00];

const TAG_EID: u32 = 0x5A;

/// Policy rule to evaluate against the table
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum PolicyRule {
    /// Profile may not be disabled
    DoNotDisable,
    /// Profile may not be deleted
    DoNotDelete,
    /// Profile is deleted after being disabled
    DeleteAfterDisabling,
}

impl PolicyRule {
    const fn bits(self) -> u32 {
        match self {
            Self::DoNotDisable => policy_rule::DO_NOT_DISABLE,
            Self::DoNotDelete => policy_rule::DO_NOT_DELETE,
            Self::DeleteAfterDisabling => policy_rule::DELETE_AFTER_DISABLING,
        }
    }
}

/// Carrier given on the command line
#[derive(Debug)]
pub(crate) struct CarrierQuery {
    pub(crate) mcc: String,
    pub(crate) mnc: String,
    pub(crate) gid1: Option<String>,
    pub(crate) gid2: Option<String>,
    pub(crate) policy: PolicyRule,
}

impl CarrierQuery {
    /// Carrier to look up; GIDs are compared in the upper-case hex the card data uses
    fn carrier(&self) -> CarrierIdentifier {
        CarrierIdentifier::new(
            self.mcc.as_str(),
            self.mnc.as_str(),
            self.gid1.as_deref().map(str::to_ascii_uppercase),
            self.gid2.as_deref().map(str::to_ascii_uppercase),
        )
    }
}

/// Send STORE DATA to `aid` and return the card's answer
async fn store_data<S: CardChannelService>(
    transport: &ApduTransport<S>,
    aid: &[u8],
    extended: bool,
    data: &[u8],
) -> Result<Bytes, Box<dyn std::error::Error>> {
    let response = transport
        .execute(
            aid,
            extended,
            |select, request| {
                debug!(select = %hex::encode_upper(select), "Channel opened");
                request.add_store_data(data)?;
                Ok(())
            },
            |_| true,
        )
        .await?;
    Ok(response.unwrap_or_default())
}

fn decode_single(data: Bytes) -> Result<Asn1Node, Box<dyn std::error::Error>> {
    let mut decoder = Asn1Decoder::new(data);
    Ok(decoder.next_node()?)
}

/// Read and print the EID
pub(crate) async fn eid_command<S: CardChannelService>(
    transport: &ApduTransport<S>,
    extended: bool,
) -> CommandResult {
    let isd_r = hex::decode(ISD_R_AID)?;
    let response = store_data(transport, &isd_r, extended, &GET_EID).await?;
    let eid = decode_single(response)?.child(TAG_EID)?.as_bytes()?;

    println!("EID: {}", hex::encode_upper(eid).bold());
    Ok(())
}

/// Read the rules authorisation table, print it and optionally evaluate a carrier
pub(crate) async fn rat_command<S: CardChannelService>(
    transport: &ApduTransport<S>,
    extended: bool,
    query: Option<CarrierQuery>,
) -> CommandResult {
    let isd_r = hex::decode(ISD_R_AID)?;
    let response = store_data(transport, &isd_r, extended, &GET_RAT).await?;
    let rat = RulesAuthTable::from_asn1(&decode_single(response)?)?;

    if rat.is_empty() {
        println!("Rules authorisation table is empty");
    }
    for (index, rule) in rat.rules().iter().enumerate() {
        let consent = rule.policy_rule_flags & policy_rule_flag::CONSENT_REQUIRED != 0;
        println!(
            "Rule {index}: policy rules {:#05b}, consent required: {consent}",
            rule.policy_rules
        );
        if rule.carrier_ids.is_empty() {
            println!("  any operator");
        }
        for carrier in &rule.carrier_ids {
            println!(
                "  {carrier} gid1={} gid2={}",
                carrier.gid1().unwrap_or("*"),
                carrier.gid2().unwrap_or("*")
            );
        }
    }

    if let Some(query) = query {
        let carrier = query.carrier();
        match rat.find_index(query.policy.bits(), &carrier) {
            Some(index) => {
                let consent =
                    rat.has_policy_rule_flag(index, policy_rule_flag::CONSENT_REQUIRED)?;
                println!(
                    "{} {:?} for {carrier} by rule {index} (consent required: {consent})",
                    "Allowed".green(),
                    query.policy
                );
            }
            None => println!("{} {:?} for {carrier}", "Not allowed".red(), query.policy),
        }
    }

    Ok(())
}

/// Send raw STORE DATA and print the response
pub(crate) async fn store_data_command<S: CardChannelService>(
    transport: &ApduTransport<S>,
    extended: bool,
    aid: &str,
    data: &str,
) -> CommandResult {
    let aid = hex::decode(aid)?;
    let data = hex::decode(data)?;
    let response = store_data(transport, &aid, extended, &data).await?;

    println!("{}", hex::encode_upper(response));
    Ok(())
}

/// Decode a hex TLV dump and print it as a tree
pub(crate) fn decode_command(data: &str) -> CommandResult {
    let mut decoder = Asn1Decoder::from_hex(data)?;
    while decoder.has_next_node() {
        print_node(&decoder.next_node()?, 0)?;
    }
    Ok(())
}

fn print_node(node: &Asn1Node, depth: usize) -> CommandResult {
    let indent = "  ".repeat(depth);
    if node.is_constructed() {
        println!("{indent}{}", node.head_hex().cyan());
        for child in node.children()? {
            print_node(child, depth + 1)?;
        }
    } else {
        println!(
            "{indent}{} {}",
            node.head_hex().cyan(),
            hex::encode_upper(node.as_bytes()?)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_gids_match_card_hex() {
        let rat = RulesAuthTable::builder(1)
            .add(
                policy_rule::DO_NOT_DELETE,
                vec![CarrierIdentifier::new("310", "410", Some("BAE1".into()), None)],
                0,
            )
            .unwrap()
            .build()
            .unwrap();
        let query = CarrierQuery {
            mcc: "310".into(),
            mnc: "410".into(),
            gid1: Some("bae1".into()),
            gid2: Some("0a".into()),
            policy: PolicyRule::DoNotDelete,
        };

        let carrier = query.carrier();
        assert_eq!(carrier.gid1(), Some("BAE1"));
        assert_eq!(carrier.gid2(), Some("0A"));
        assert_eq!(rat.find_index(query.policy.bits(), &carrier), Some(0));
    }
}
