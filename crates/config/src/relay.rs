use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::{Error, Result};

pub const DEFAULT_ROUTING_FILE: &str = "config.json";
pub const DEFAULT_LINK_CAPACITY: usize = 50_000;
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// Environment variable names.
pub mod vars {
    pub const BOT_TOKEN: &str = "BOT_TOKEN";
    pub const RELAY_BOT_TOKEN: &str = "RELAY_BOT_TOKEN";
    pub const ADMIN_TG_ID: &str = "ADMIN_TG_ID";
    pub const ROUTING_FILE: &str = "RELAY_ROUTING_FILE";
    pub const LINK_CAPACITY: &str = "RELAY_LINK_CAPACITY";
    pub const LINK_TTL_SECS: &str = "RELAY_LINK_TTL_SECS";
    pub const SESSION_TTL_SECS: &str = "RELAY_SESSION_TTL_SECS";
}

/// Everything the relay process needs to start.
#[derive(Clone)]
pub struct RelayConfig {
    /// Token of the bot the administrator talks to.
    pub admin_token: Secret<String>,
    /// Token of the bot that reads sources and writes destinations.
    /// `None` means the admin bot does both.
    pub relay_token: Option<Secret<String>>,
    /// Telegram user id allowed to edit routing.
    pub admin_id: i64,
    pub routing_file: PathBuf,
    pub link_capacity: usize,
    pub link_ttl: Duration,
    pub session_ttl: Duration,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("admin_token", &"[REDACTED]")
            .field(
                "relay_token",
                &self.relay_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("admin_id", &self.admin_id)
            .field("routing_file", &self.routing_file)
            .field("link_capacity", &self.link_capacity)
            .field("link_ttl", &self.link_ttl)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl RelayConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let admin_token = get(vars::BOT_TOKEN).ok_or(Error::Missing {
            var: vars::BOT_TOKEN,
        })?;
        let relay_token = get(vars::RELAY_BOT_TOKEN);
        let admin_id = parse_required(&get, vars::ADMIN_TG_ID)?;
        let routing_file = get(vars::ROUTING_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROUTING_FILE));
        let link_capacity: usize =
            parse_optional(&get, vars::LINK_CAPACITY)?.unwrap_or(DEFAULT_LINK_CAPACITY);
        if link_capacity == 0 {
            return Err(Error::invalid(vars::LINK_CAPACITY, "0", "must be positive"));
        }
        let link_ttl = parse_optional(&get, vars::LINK_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LINK_TTL);
        let session_ttl = parse_optional(&get, vars::SESSION_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);

        let config = Self {
            admin_token: Secret::new(admin_token.trim().to_string()),
            relay_token: relay_token.map(|t| Secret::new(t.trim().to_string())),
            admin_id,
            routing_file,
            link_capacity,
            link_ttl,
            session_ttl,
        };
        debug!(config = ?config, "loaded relay config");
        Ok(config)
    }

    /// Whether one bot serves both the admin and the relay identity.
    pub fn single_bot(&self) -> bool {
        self.relay_token
            .as_ref()
            .is_none_or(|t| t.expose_secret() == self.admin_token.expose_secret())
    }
}

fn parse_required<T>(get: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_optional(get, var)?.ok_or(Error::Missing { var })
}

fn parse_optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get(var)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::invalid(var, &raw, e))
        })
        .transpose()
}
