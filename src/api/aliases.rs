//! Aliases API endpoints
//!
//! Everything related to the alias lifecycle

use axum::Extension;
use axum::response::Redirect;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::aliases::Alias;
use crate::aliases::Status;
use crate::lifecycle::Lifecycle;
use crate::provider::RuleProvider;

use super::Error;
use super::QueryParameters;
use super::Success;

/// Where every lifecycle endpoint sends the browser back to
const LIST_PAGE: &str = "/";

/// Alias response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasResponse {
    /// Alias ID
    pub id: i64,

    /// Full email address
    pub address: String,

    /// Rule at the provider, empty when there is none
    pub rule_id: String,

    /// Current status
    pub status: Status,

    /// Creation date
    pub created_at: DateTime<Utc>,

    /// Moment the alias expires
    pub expires_at: DateTime<Utc>,
}

impl AliasResponse {
    /// Create a response from a [`Alias`](Alias)
    fn from_alias(alias: Alias) -> Self {
        Self {
            id: alias.id,
            address: alias.address,
            rule_id: alias.rule_id,
            status: alias.status,
            created_at: alias.created_at,
            expires_at: alias.expires_at,
        }
    }

    /// Create a response from multiple [`Alias`](Alias)es
    pub fn from_alias_multiple(aliases: Vec<Alias>) -> Vec<Self> {
        aliases.into_iter().map(Self::from_alias).collect()
    }
}

/// Query of every endpoint working on a single alias
#[derive(Debug, Deserialize)]
pub struct AliasQuery {
    /// Alias ID
    id: i64,
}

/// List all aliases
///
/// Request:
/// ```sh
/// curl -v http://localhost:8086/api/aliases
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": 1, "address": "abc12345@example.com", "status": "active" ... } ] }
/// ```
pub async fn list<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
) -> Result<Success<Vec<AliasResponse>>, Error> {
    let aliases = lifecycle.list().await?;

    Ok(Success::ok(AliasResponse::from_alias_multiple(aliases)))
}

/// Generate a new alias
///
/// Request:
/// ```sh
/// curl -v -XPOST http://localhost:8086/api/generate
/// ```
pub async fn generate<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
) -> Result<Redirect, Error> {
    lifecycle.generate().await?;

    Ok(Redirect::to(LIST_PAGE))
}

/// Flip an alias between active and inactive
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:8086/api/toggle?id=1'
/// ```
pub async fn toggle<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
    QueryParameters(query): QueryParameters<AliasQuery>,
) -> Result<Redirect, Error> {
    lifecycle.toggle(query.id).await?;

    Ok(Redirect::to(LIST_PAGE))
}

/// Soft-delete an alias
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:8086/api/delete?id=1'
/// ```
pub async fn delete<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
    QueryParameters(query): QueryParameters<AliasQuery>,
) -> Result<Redirect, Error> {
    lifecycle.delete(query.id).await?;

    Ok(Redirect::to(LIST_PAGE))
}

/// Revive an alias under its existing address
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:8086/api/recreate?id=1'
/// ```
pub async fn recreate<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
    QueryParameters(query): QueryParameters<AliasQuery>,
) -> Result<Redirect, Error> {
    lifecycle.recreate(query.id).await?;

    Ok(Redirect::to(LIST_PAGE))
}

/// Extend the expiration of an active alias by an hour
///
/// Not active? Nothing changes, still a redirect
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:8086/api/renew?id=1'
/// ```
pub async fn renew<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
    QueryParameters(query): QueryParameters<AliasQuery>,
) -> Result<Redirect, Error> {
    lifecycle.renew(query.id).await?;

    Ok(Redirect::to(LIST_PAGE))
}
