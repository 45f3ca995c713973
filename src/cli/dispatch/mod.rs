//! Map parsed command-line arguments to an [`Action`].

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    // Fail early on a malformed DSN instead of at the first pool connection.
    Url::parse(&dsn).context("invalid JOTTER_DSN")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        secure_cookies: auth_opts.secure_cookies,
        hash_concurrency: auth_opts.hash_concurrency,
    }))
}
