use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";
pub const ARG_HASH_CONCURRENCY: &str = "hash-concurrency";

/// Session and credential options.
#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
    pub hash_concurrency: usize,
}

impl Options {
    /// Read the session options from validated matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .filter(|secret| !secret.trim().is_empty())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_JWT_SECRET}"))?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
            hash_concurrency: matches
                .get_one::<u32>(ARG_HASH_CONCURRENCY)
                .and_then(|permits| usize::try_from(*permits).ok())
                .unwrap_or(4),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens")
                .long_help(
                    "Secret used to sign session tokens. Changing it invalidates every issued session.",
                )
                .env("JOTTER_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token lifetime in seconds (at most one year)")
                .env("JOTTER_SESSION_TTL_SECONDS")
                .default_value("14400")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark the session cookie as Secure (HTTPS only)")
                .env("JOTTER_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_HASH_CONCURRENCY)
                .long(ARG_HASH_CONCURRENCY)
                .help("Maximum concurrent password hash operations")
                .env("JOTTER_HASH_CONCURRENCY")
                .default_value("4")
                .value_parser(clap::value_parser!(u32).range(1..=1024)),
        )
}
