use crate::{
    api::{self, handlers::auth::AuthConfig},
    cli::telemetry,
};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
    pub hash_concurrency: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing secret is unusable, the database is unreachable, or the
/// server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_secure_cookies(args.secure_cookies)
        .with_hash_concurrency(args.hash_concurrency);

    let result = api::new(args.port, &args.dsn, &args.jwt_secret, auth_config).await;

    telemetry::shutdown_tracer();

    result
}
