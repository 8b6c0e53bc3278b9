//! Policy rule bits and GetRAT response tags

/// Profile Policy Rules a table entry can authorise
pub mod policy_rule {
    /// Disabling the profile is not allowed
    pub const DO_NOT_DISABLE: u32 = 1;
    /// Deleting the profile is not allowed
    pub const DO_NOT_DELETE: u32 = 1 << 1;
    /// The profile is deleted once disabled
    pub const DELETE_AFTER_DISABLING: u32 = 1 << 2;
}

/// Flags attached to a table entry
pub mod policy_rule_flag {
    /// The user must consent before the rule is applied
    pub const CONSENT_REQUIRED: u32 = 1;
}

/// Tags of the GetRAT response
pub mod tags {
    /// GetRAT response
    pub const RAT_RESPONSE: u32 = 0xBF43;
    /// Wrapper around the rule sequences
    pub const RULES: u32 = 0xA0;
    /// One rule
    pub const RULE: u32 = 0x30;
    /// Policy rules bit string
    pub const POLICY_RULES: u32 = 0x80;
    /// Allowed operators
    pub const OPERATORS: u32 = 0xA1;
    /// One operator identifier
    pub const OPERATOR_ID: u32 = 0xB7;
    /// Policy rule flags bit string
    pub const POLICY_RULE_FLAGS: u32 = 0x82;
    /// BCD encoded MCC and MNC
    pub const MCC_MNC: u32 = 0x80;
    /// Group identifier level 1
    pub const GID1: u32 = 0x81;
    /// Group identifier level 2
    pub const GID2: u32 = 0x82;
}
