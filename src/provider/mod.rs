//! Forwarding rules at the mail-routing provider
//!
//! Every alias is backed by one rule at the provider, forwarding the alias address to the
//! destination mailbox. The provider is treated as an opaque remote service: rules can be
//! created, enabled/disabled and deleted, nothing else.

use core::fmt;
use std::future::Future;

pub use cloudflare::Cloudflare;
pub use cloudflare::CloudflareConfig;

mod cloudflare;

/// Provider errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request did not complete (connect, timeout, unreadable body)
    Transport(String),

    /// The provider answered but did not report success
    ///
    /// Holds the first message reported by the provider, if any
    Api(Option<String>),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(error) => write!(f, "Transport error: {error}"),
            Error::Api(Some(message)) => f.write_str(message),
            Error::Api(None) => f.write_str("unknown provider error"),
        }
    }
}

/// Result type for all provider interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Provider with all supported rule operations
///
/// Each call is a single request, no retries
pub trait RuleProvider: Clone + Send + Sync + 'static {
    /// Create a rule forwarding `address`, returns the rule ID
    fn create_rule(
        &self,
        address: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Enable or disable an existing rule
    fn set_rule_enabled(
        &self,
        rule_id: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a rule
    ///
    /// Callers treat failures as best-effort: the rule is left behind at the provider
    fn delete_rule(&self, rule_id: &str) -> impl Future<Output = Result<()>> + Send;
}
