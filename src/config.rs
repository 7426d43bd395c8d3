//! Configuration from the environment

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;

use crate::provider::CloudflareConfig;
use crate::utils::non_empty_var;
use crate::utils::var_or_else;

const DEFAULT_ADDRESS: &str = "0.0.0.0:8086";
const DEFAULT_DB_PATH: &str = "./data/emails.db";

/// Everything needed to start
#[derive(Debug)]
pub struct Config {
    /// Address to listen on
    pub address: SocketAddr,

    /// Location of the `SQLite` database file
    pub database_path: PathBuf,

    /// Domain of every generated alias
    pub email_domain: String,

    /// Cloudflare settings
    pub cloudflare: CloudflareConfig,
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// # Errors
    ///
    /// Will return `Err` if `ADDRESS` or `PORT` can not be parsed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|var_name: &str| std::env::var(var_name).ok())
    }

    /// Read the configuration from any variable source
    fn from_lookup<L>(lookup: &L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut address =
            var_or_else(lookup, "ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

        // optional override of just the port
        if let Some(port) = non_empty_var(lookup, "PORT") {
            address.set_port(port.parse::<u16>()?);
        }

        let database_path = PathBuf::from(var_or_else(lookup, "DB_PATH", || {
            String::from(DEFAULT_DB_PATH)
        }));

        let required = |var_name: &'static str| {
            non_empty_var(lookup, var_name).unwrap_or_else(|| {
                tracing::warn!("`{var_name}` is not set, Cloudflare calls will fail");
                String::new()
            })
        };

        let email_domain = required("CF_EMAIL_DOMAIN");

        let cloudflare = CloudflareConfig {
            api_token: required("CF_API_TOKEN"),
            zone_id: required("CF_ZONE_ID"),
            destination_email: required("CF_DESTINATION_EMAIL"),
        };

        Ok(Self {
            address,
            database_path,
            email_domain,
            cloudflare,
        })
    }
}
