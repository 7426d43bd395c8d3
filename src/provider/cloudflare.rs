//! Cloudflare Email Routing
//!
//! - Create rule: POST `/zones/:zone_id/email/routing/rules`
//! - Update rule: PATCH `/zones/:zone_id/email/routing/rules/:rule_id`
//! - Delete rule: DELETE `/zones/:zone_id/email/routing/rules/:rule_id`
//!
//! Every response carries the same envelope (`success`, `result`, `errors`), it is read
//! regardless of the HTTP status code.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;

use super::Error;
use super::Result;
use super::RuleProvider;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Timeout for a single API request
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix for the name of every rule created
const RULE_NAME_PREFIX: &str = "TempMail-";

/// Settings to talk to Cloudflare
#[derive(Clone)]
pub struct CloudflareConfig {
    /// API token with Email Routing edit permissions
    pub api_token: String,

    /// Zone the email domain lives in
    pub zone_id: String,

    /// Mailbox every alias forwards to
    pub destination_email: String,
}

impl std::fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("destination_email", &self.destination_email)
            .finish()
    }
}

/// Cloudflare Email Routing client
#[derive(Clone, Debug)]
pub struct Cloudflare {
    /// Settings, the token never ends up in logs
    config: CloudflareConfig,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl Cloudflare {
    /// Create a new Cloudflare client
    ///
    /// # Errors
    ///
    /// Will return `Err` when the HTTP client can not be built
    pub fn new(config: CloudflareConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(transport_error)?;

        Ok(Self { config, client })
    }

    /// URL of the rules collection
    fn rules_url(&self) -> String {
        format!(
            "{CLOUDFLARE_API_BASE}/zones/{}/email/routing/rules",
            self.config.zone_id
        )
    }

    /// URL of a single rule
    fn rule_url(&self, rule_id: &str) -> String {
        format!("{}/{rule_id}", self.rules_url())
    }

    /// Do a single request and read the envelope
    async fn call<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Envelope>
    where
        B: Serialize + Sync,
    {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.config.api_token)
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        tracing::debug!("Cloudflare responded with {status}");

        Ok(Envelope::parse(&bytes))
    }
}

impl RuleProvider for Cloudflare {
    async fn create_rule(&self, address: &str, enabled: bool) -> Result<String> {
        let body = CreateRuleRequest::forward(address, &self.config.destination_email, enabled);

        let envelope = self
            .call(Method::POST, &self.rules_url(), Some(&body))
            .await?
            .into_result()?;

        envelope
            .result
            .map(|result| result.id)
            .filter(|id| !id.is_empty())
            .ok_or(Error::Api(None))
    }

    async fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> Result<()> {
        let body = UpdateRuleRequest { enabled };

        self.call(Method::PATCH, &self.rule_url(rule_id), Some(&body))
            .await?
            .into_result()
            .map(|_| ())
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        self.call::<()>(Method::DELETE, &self.rule_url(rule_id), None)
            .await?
            .into_result()
            .map(|_| ())
    }
}

/// Body to create a rule
#[derive(Debug, Serialize)]
struct CreateRuleRequest<'a> {
    matchers: [Matcher<'a>; 1],
    actions: [Action<'a>; 1],
    enabled: bool,
    name: String,
}

impl<'a> CreateRuleRequest<'a> {
    /// Rule forwarding mail sent to `address` into `destination`
    fn forward(address: &'a str, destination: &'a str, enabled: bool) -> Self {
        Self {
            matchers: [Matcher {
                kind: "literal",
                field: "to",
                value: address,
            }],
            actions: [Action {
                kind: "forward",
                value: [destination],
            }],
            enabled,
            name: format!("{RULE_NAME_PREFIX}{address}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct Matcher<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    field: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Action<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: [&'a str; 1],
}

/// Body to enable/disable a rule
#[derive(Debug, Serialize)]
struct UpdateRuleRequest {
    enabled: bool,
}

/// Response envelope of the Cloudflare API
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    result: Option<RuleResult>,

    #[serde(default)]
    errors: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct RuleResult {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
}

impl Envelope {
    /// Parse a response body, anything unreadable counts as a failed response
    fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// Turn an unsuccessful envelope into an error with the first reported message
    fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::Api(
                self.errors.into_iter().next().map(|error| error.message),
            ))
        }
    }
}

/// Convert `reqwest` to provider transport error
fn transport_error(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}
