//! Tracing subscriber setup.
//!
//! Log lines go to stdout, as JSON on Fly.io and as text elsewhere. WARN and
//! ERROR events are forwarded to Sentry, INFO and DEBUG become breadcrumbs.

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "galeria_storefront=info,tower_http=debug";

/// Map tracing levels to Sentry event types.
#[must_use]
pub fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// `RUST_LOG`, or [`DEFAULT_FILTER`] when unset or invalid.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Build the subscriber. `json` selects JSON lines over text.
///
/// Both formats are optional layers on one stack, so the Sentry layer is
/// typed against a single subscriber.
#[must_use]
pub fn subscriber(json: bool, filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_and_text_subscribers_accept_events() {
        for json in [true, false] {
            let subscriber = subscriber(json, EnvFilter::new("info"));
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(json, "subscriber ready");
                tracing::warn!(json, "warnings reach Sentry when it is configured");
            });
        }
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
