//! Rules Authorisation Table for eUICC profile policy rules
//!
//! The Rules Authorisation Table (RAT) lists which carriers may install profiles carrying
//! which Profile Policy Rules, and whether the user has to consent first. This crate holds
//! the table, evaluates lookups against it and converts it from the card's GetRAT response
//! and to and from a compact binary form.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod carrier;
pub mod constants;
pub mod table;

mod card;
mod codec;
mod error;

pub use carrier::{CarrierIdentifier, match_digits};
pub use constants::{policy_rule, policy_rule_flag};
pub use error::{RatError, Result};
pub use table::{RuleEntry, RulesAuthTable, RulesAuthTableBuilder};

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{
        CarrierIdentifier, RatError, Result, RuleEntry, RulesAuthTable, RulesAuthTableBuilder,
        policy_rule, policy_rule_flag,
    };
}
