//! Command-line interface parsing for parkpass
//!
//! This module handles parsing of CLI arguments using clap. Every resolver
//! option can also be set through the environment, which is how the service
//! is normally configured when deployed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::data::parkrun::{DEFAULT_PROFILE_URL, ID_PLACEHOLDER};
use crate::resolver::{ResolverSettings, DEFAULT_CHALLENGE_TITLE};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The profile URL has nowhere to put the athlete ID
    #[error("Invalid profile URL: '{0}' must contain {{id}}")]
    MissingPlaceholder(String),

    /// Names must be cached for at least an hour
    #[error("Invalid cache TTL: must be at least 1 hour")]
    InvalidTtl,
}

/// parkpass - parkrun athlete lookup for wallet passes
#[derive(Parser, Debug)]
#[command(name = "parkpass")]
#[command(about = "Looks up parkrun athlete names for wallet passes")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub resolver: ResolverArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (GET /api/athleteInfo?aid=A123)
    Serve {
        /// Address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Resolve a single athlete ID and print the JSON payload
    Lookup {
        /// Athlete ID, e.g. A208864
        aid: String,
    },
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ResolverArgs {
    /// Redis connection URL; names are cached on local disk when unset
    #[arg(long, env = "REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    /// Directory for the local disk cache
    #[arg(long, env = "PARKPASS_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Profile page URL template; `{id}` is replaced with the athlete number.
    /// Point this at a proxy endpoint to route lookups through it.
    #[arg(long, env = "PROXY_URL", default_value = DEFAULT_PROFILE_URL, global = true)]
    pub profile_url: String,

    /// API key sent to the proxy in the `x-api-key` header
    #[arg(long, env = "PROXY_KEY", hide_env_values = true, global = true)]
    pub proxy_key: Option<String>,

    /// Hours a resolved name stays cached
    #[arg(long, env = "CACHE_TTL_HOURS", default_value_t = 72, global = true)]
    pub cache_ttl_hours: u64,

    /// Page title of parkrun's human-verification interstitial
    #[arg(long, env = "CHALLENGE_TITLE", default_value = DEFAULT_CHALLENGE_TITLE, global = true)]
    pub challenge_title: String,

    /// Forward the caller's user agent, IP and cookies to parkrun
    #[arg(long, env = "FORWARD_CLIENT_HEADERS", global = true)]
    pub forward_client_headers: bool,
}

/// Where resolved names are cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// A Redis server
    Redis(String),
    /// JSON files on disk; `None` means the XDG cache directory
    Files(Option<PathBuf>),
}

/// Validated configuration for building the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Cache backend
    pub cache: CacheBackend,
    /// Profile page URL template containing `{id}`
    pub profile_url: String,
    /// Optional proxy API key
    pub proxy_key: Option<String>,
    /// Whether client headers are forwarded upstream
    pub forward_client_headers: bool,
    /// Resolver tunables
    pub settings: ResolverSettings,
}

impl ResolverConfig {
    /// Creates a ResolverConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ResolverConfig)` with the cache backend chosen
    /// * `Err(CliError)` if the profile URL or TTL is unusable
    pub fn from_args(args: &ResolverArgs) -> Result<Self, CliError> {
        if !args.profile_url.contains(ID_PLACEHOLDER) {
            return Err(CliError::MissingPlaceholder(args.profile_url.clone()));
        }

        if args.cache_ttl_hours == 0 {
            return Err(CliError::InvalidTtl);
        }

        let cache = match args.redis_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => CacheBackend::Redis(url.to_string()),
            _ => CacheBackend::Files(args.cache_dir.clone()),
        };

        let proxy_key = args.proxy_key.clone().filter(|key| !key.is_empty());

        Ok(ResolverConfig {
            cache,
            profile_url: args.profile_url.clone(),
            proxy_key,
            forward_client_headers: args.forward_client_headers,
            settings: ResolverSettings {
                cache_ttl: Duration::from_secs(args.cache_ttl_hours * 60 * 60),
                challenge_title: args.challenge_title.clone(),
            },
        })
    }
}
