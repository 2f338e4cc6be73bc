// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Missing or
//! invalid values stop the process before it serves anything.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the users database | Required |
//! | `IDENTITY_PROVIDER` | `jwks` (production) or `local` (development) | `jwks` |
//! | `IDENTITY_PROJECT_ID` | Identity project the tokens are issued for | Required for `jwks` |
//! | `IDENTITY_JWKS_URL` | Override the JWKS endpoint | securetoken JWKS |
//! | `IDENTITY_ISSUER` | Override the expected `iss` claim | derived from project |
//! | `IDENTITY_AUDIENCE` | Override the expected `aud` claim | project id |
//! | `LOCAL_SIGNING_SECRET` | HS256 secret, at least 32 bytes | Required for `local` |
//! | `LOCAL_TOKEN_TTL_SECS` | Lifetime of locally issued tokens | `3600` |
//! | `REQUEST_TIMEOUT_SECS` | Deadline for each request | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::jwks_provider::JwksProviderConfig;
use crate::auth::local::MIN_SECRET_LEN;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory for the embedded users database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const IDENTITY_PROVIDER_ENV: &str = "IDENTITY_PROVIDER";
pub const IDENTITY_PROJECT_ID_ENV: &str = "IDENTITY_PROJECT_ID";
pub const IDENTITY_JWKS_URL_ENV: &str = "IDENTITY_JWKS_URL";
pub const IDENTITY_ISSUER_ENV: &str = "IDENTITY_ISSUER";
pub const IDENTITY_AUDIENCE_ENV: &str = "IDENTITY_AUDIENCE";
pub const LOCAL_SIGNING_SECRET_ENV: &str = "LOCAL_SIGNING_SECRET";
pub const LOCAL_TOKEN_TTL_ENV: &str = "LOCAL_TOKEN_TTL_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOCAL_TOKEN_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How credentials are verified.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityConfig {
    /// Signed ID tokens checked against a published key set.
    Jwks(JwksProviderConfig),
    /// Locally issued HS256 tokens (development).
    Local { secret: String, token_ttl: Duration },
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityConfig::Jwks(config) => f.debug_tuple("Jwks").field(config).finish(),
            IdentityConfig::Local { token_ttl, .. } => f
                .debug_struct("Local")
                .field("secret", &"<redacted>")
                .field("token_ttl", token_ttl)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the environment; anything but `json` is pretty.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub identity: IdentityConfig,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = parse(HOST_ENV, &host)?;
        let port = match get(PORT_ENV) {
            Some(value) => parse::<u16>(PORT_ENV, &value)?,
            None => DEFAULT_PORT,
        };

        let data_dir = get(DATA_DIR_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(DATA_DIR_ENV))?;

        let identity = match get(IDENTITY_PROVIDER_ENV).as_deref() {
            None | Some("jwks") => {
                let project_id =
                    get(IDENTITY_PROJECT_ID_ENV).ok_or(ConfigError::Missing(IDENTITY_PROJECT_ID_ENV))?;
                let mut provider = JwksProviderConfig::for_project(&project_id);
                if let Some(url) = get(IDENTITY_JWKS_URL_ENV) {
                    provider.jwks_url = url;
                }
                if let Some(issuer) = get(IDENTITY_ISSUER_ENV) {
                    provider.issuer = issuer;
                }
                if let Some(audience) = get(IDENTITY_AUDIENCE_ENV) {
                    provider.audience = audience;
                }
                IdentityConfig::Jwks(provider)
            }
            Some("local") => {
                let secret = get(LOCAL_SIGNING_SECRET_ENV)
                    .ok_or(ConfigError::Missing(LOCAL_SIGNING_SECRET_ENV))?;
                if secret.len() < MIN_SECRET_LEN {
                    return Err(ConfigError::Invalid {
                        var: LOCAL_SIGNING_SECRET_ENV,
                        value: "<redacted>".to_string(),
                        reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
                    });
                }
                let token_ttl = seconds(LOCAL_TOKEN_TTL_ENV, get(LOCAL_TOKEN_TTL_ENV))?
                    .unwrap_or(DEFAULT_LOCAL_TOKEN_TTL);
                IdentityConfig::Local { secret, token_ttl }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: IDENTITY_PROVIDER_ENV,
                    value: other.to_string(),
                    reason: "expected 'jwks' or 'local'".to_string(),
                })
            }
        };

        let request_timeout = seconds(REQUEST_TIMEOUT_ENV, get(REQUEST_TIMEOUT_ENV))?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            data_dir,
            identity,
            request_timeout,
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Positive number of seconds.
fn seconds(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse::<u64>(var, &value)? {
        0 => Err(ConfigError::Invalid {
            var,
            value,
            reason: "must be greater than zero".to_string(),
        }),
        secs => Ok(Some(Duration::from_secs(secs))),
    }
}
