//! Alias lifecycle
//!
//! Every transition touches both the database and the provider. The order of the two decides
//! what happens when the provider fails:
//!
//! - generate, toggle, recreate: provider first, a failure aborts before anything is written
//! - delete, expire: the rule deletion is best-effort, the alias is marked deleted regardless
//!
//! ```text
//!            generate
//!               │
//!               ▼      toggle
//!  renew ──▶ active ◀──────────▶ inactive
//!               │                   │
//!        delete │ expire     delete │
//!               ▼                   ▼
//!            deleted ──recreate──▶ active
//! ```
//!
//! There is no per-alias locking: a transition racing with another one on the same alias
//! (a renew racing with the sweeper, for example) ends with whichever write lands last.

use core::fmt;

use chrono::TimeDelta;
use chrono::Utc;

use crate::aliases::Alias;
use crate::aliases::Status;
use crate::database;
use crate::database::CreateAliasValues;
use crate::database::Database;
use crate::database::RecreateAliasValues;
use crate::database::UpdateStatusValues;
use crate::generator::AddressGenerator;
use crate::provider;
use crate::provider::RuleProvider;

/// How long a new or recreated alias lives
const ALIAS_LIFETIME_SECONDS: i64 = 60 * 60;

/// How much a renew adds to the expiration
const RENEW_STEP_SECONDS: i64 = 60 * 60;

/// Lifecycle errors
#[derive(Debug)]
pub enum Error {
    /// The database failed
    Storage(database::Error),

    /// The provider refused or could not be reached
    Provider(provider::Error),

    /// No alias with this ID
    NotFound(i64),

    /// The alias is deleted and can not be toggled
    Deleted(i64),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Storage(error) => write!(f, "Storage error: {error}"),
            Error::Provider(error) => write!(f, "Cloudflare error: {error}"),
            Error::NotFound(_) => f.write_str("Alias not found"),
            Error::Deleted(_) => f.write_str("Alias is deleted"),
        }
    }
}

impl From<database::Error> for Error {
    fn from(error: database::Error) -> Self {
        Error::Storage(error)
    }
}

impl From<provider::Error> for Error {
    fn from(error: provider::Error) -> Self {
        Error::Provider(error)
    }
}

/// Result type for all lifecycle transitions
pub type Result<T> = core::result::Result<T, Error>;

/// Drives aliases through their states, keeping database and provider in step
#[derive(Clone, Debug)]
pub struct Lifecycle<P: RuleProvider> {
    /// Source of truth for aliases
    database: Database,

    /// Forwarding rules
    provider: P,

    /// Addresses for new aliases
    generator: AddressGenerator,

    /// Lifetime of a new or recreated alias
    lifetime: TimeDelta,

    /// Extension per renew
    renew_step: TimeDelta,
}

impl<P: RuleProvider> Lifecycle<P> {
    /// Create a lifecycle manager
    pub fn new(database: Database, provider: P, generator: AddressGenerator) -> Self {
        Self {
            database,
            provider,
            generator,
            lifetime: TimeDelta::seconds(ALIAS_LIFETIME_SECONDS),
            renew_step: TimeDelta::seconds(RENEW_STEP_SECONDS),
        }
    }

    /// The database this lifecycle writes to
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// All aliases, active first, newest first
    pub async fn list(&self) -> Result<Vec<Alias>> {
        Ok(self.database.find_all_aliases().await?)
    }

    /// Fetch a single alias
    pub async fn get(&self, id: i64) -> Result<Alias> {
        self.database
            .find_single_alias_by_id(id)
            .await?
            .ok_or(Error::NotFound(id))
    }

    /// Create a new alias with an enabled rule
    ///
    /// Nothing is stored when the provider fails
    pub async fn generate(&self) -> Result<Alias> {
        let address = self.generator.generate().await;

        let rule_id = self.provider.create_rule(&address, true).await?;

        let expires_at = Utc::now() + self.lifetime;

        let values = CreateAliasValues {
            address: &address,
            rule_id: &rule_id,
            expires_at: &expires_at,
        };

        let id = match self.database.create_alias(&values).await {
            Ok(id) => id,
            Err(err) => {
                self.delete_rule_best_effort(&address, &rule_id).await;

                return Err(err.into());
            }
        };

        tracing::info!("Generated alias {address} (#{id}), expires at {expires_at}");

        self.get(id).await
    }

    /// Flip an alias between active and inactive
    ///
    /// The rule is enabled/disabled first, the status is only written when that succeeds
    pub async fn toggle(&self, id: i64) -> Result<Alias> {
        let alias = self.get(id).await?;

        let (status, enabled) = match alias.status {
            Status::Active => (Status::Inactive, false),
            Status::Inactive => (Status::Active, true),
            Status::Deleted => return Err(Error::Deleted(id)),
        };

        self.provider
            .set_rule_enabled(&alias.rule_id, enabled)
            .await?;

        let values = UpdateStatusValues {
            status,
            rule_id: &alias.rule_id,
        };

        // deleted in the meantime, it stays deleted
        if !self
            .database
            .update_status_and_rule_unless_deleted(id, &values)
            .await?
        {
            tracing::warn!("Alias {} was deleted while toggling", alias.address);

            return Err(Error::Deleted(id));
        }

        tracing::info!("Toggled alias {} to {status}", alias.address);

        self.get(id).await
    }

    /// Soft-delete an alias
    ///
    /// Deleting the rule is best-effort, the alias is marked deleted either way
    pub async fn delete(&self, id: i64) -> Result<Alias> {
        let alias = self.get(id).await?;

        if alias.is_deleted() {
            tracing::debug!("Alias {} is already deleted", alias.address);

            return Ok(alias);
        }

        self.retire(&alias).await?;

        tracing::info!("Deleted alias {}", alias.address);

        self.get(id).await
    }

    /// Bring an alias back under its existing address with a new rule
    ///
    /// Works from any status, a previous rule is not deleted first
    pub async fn recreate(&self, id: i64) -> Result<Alias> {
        let alias = self.get(id).await?;

        let rule_id = self.provider.create_rule(&alias.address, true).await?;

        let expires_at = Utc::now() + self.lifetime;

        let values = RecreateAliasValues {
            rule_id: &rule_id,
            expires_at: &expires_at,
        };

        self.database.reset_for_recreate(id, &values).await?;

        tracing::info!(
            "Recreated alias {} with a new rule, expires at {expires_at}",
            alias.address
        );

        self.get(id).await
    }

    /// Extend the expiration of an active alias
    ///
    /// Returns `false` when the alias is not active, nothing changes then
    pub async fn renew(&self, id: i64) -> Result<bool> {
        let alias = self.get(id).await?;

        let renewed = self.database.extend_expiry(id, self.renew_step).await?;

        if renewed {
            tracing::info!("Renewed alias {}", alias.address);
        } else {
            tracing::debug!("Alias {} is {}, not renewed", alias.address, alias.status);
        }

        Ok(renewed)
    }

    /// Expire an alias picked up by the sweeper
    ///
    /// Same as a delete, without looking the alias up again
    pub async fn expire(&self, alias: &Alias) -> Result<()> {
        self.retire(alias).await?;

        tracing::info!("Expired alias {}", alias.address);

        Ok(())
    }

    /// Delete the rule (best-effort) and mark the alias deleted
    async fn retire(&self, alias: &Alias) -> Result<()> {
        if alias.has_rule() {
            self.delete_rule_best_effort(&alias.address, &alias.rule_id)
                .await;
        }

        let values = UpdateStatusValues {
            status: Status::Deleted,
            rule_id: "",
        };

        self.database
            .update_status_and_rule(alias.id, &values)
            .await?;

        Ok(())
    }

    /// Delete a rule, a failure only gets logged
    ///
    /// The rule stays behind at the provider, no alias refers to it anymore
    async fn delete_rule_best_effort(&self, address: &str, rule_id: &str) {
        if let Err(err) = self.provider.delete_rule(rule_id).await {
            tracing::warn!("Could not delete rule {rule_id} of {address}, leaving it: {err}");
        }
    }
}
