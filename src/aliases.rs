//! Aliases

use core::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

/// Status of an alias
///
/// `Deleted` is terminal for everything but a recreate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Status {
    /// Forwarding, subject to expiration
    Active,

    /// Rule exists but is disabled
    Inactive,

    /// Soft-deleted, no live rule
    Deleted,
}

impl Status {
    /// Database/display representation
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporary email alias
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Alias {
    /// Alias ID
    pub id: i64,

    /// Full email address, `<random>@<domain>`
    #[sqlx(rename = "alias")]
    pub address: String,

    /// Identifier of the forwarding rule at the provider
    ///
    /// Empty when no live rule exists
    pub rule_id: String,

    /// Creation date
    pub created_at: DateTime<Utc>,

    /// Moment the alias becomes eligible for expiration
    pub expires_at: DateTime<Utc>,

    /// Current status
    pub status: Status,
}

impl Alias {
    /// Is the alias active?
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Is the alias soft-deleted?
    pub fn is_deleted(&self) -> bool {
        self.status == Status::Deleted
    }

    /// Is there a live rule at the provider?
    pub fn has_rule(&self) -> bool {
        !self.rule_id.is_empty()
    }
}
