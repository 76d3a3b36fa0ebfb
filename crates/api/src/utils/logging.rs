//! Tracing setup and log helpers.

use chime_domain::ChimeError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` controls the filter; the default keeps chime crates at
/// `info` and everything else at `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,chime_api=info,chime_core=info,chime_infra=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Convert a `ChimeError` into a stable label suitable for metrics/logging.
#[inline]
pub fn error_label(error: &ChimeError) -> &'static str {
    match error {
        ChimeError::Database(_) => "database",
        ChimeError::Config(_) => "config",
        ChimeError::AuthExchange(_) => "auth_exchange",
        ChimeError::Credential(_) => "credential",
        ChimeError::CredentialExpired(_) => "credential_expired",
        ChimeError::TransientFetch(_) => "transient_fetch",
        ChimeError::NotFound(_) => "not_found",
        ChimeError::InvalidInput(_) => "invalid_input",
        ChimeError::Internal(_) => "internal",
    }
}
