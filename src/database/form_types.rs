//! Form types

use chrono::DateTime;
use chrono::Utc;

use crate::aliases::Status;

/// Values to create an Alias
pub struct CreateAliasValues<'a> {
    /// Full email address
    pub address: &'a str,

    /// The rule forwarding the address
    pub rule_id: &'a str,

    /// Moment the alias expires
    pub expires_at: &'a DateTime<Utc>,
}

/// Values to change the status of an Alias
pub struct UpdateStatusValues<'a> {
    /// The new status
    pub status: Status,

    /// The rule ID to store alongside, empty when the rule is gone
    pub rule_id: &'a str,
}

/// Values to bring an Alias back to life
pub struct RecreateAliasValues<'a> {
    /// The freshly created rule
    pub rule_id: &'a str,

    /// New moment the alias expires
    pub expires_at: &'a DateTime<Utc>,
}
