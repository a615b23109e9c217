//! Opt-in `tracing` setup for hosts embedding the tour engine.
//!
//! Engine events are emitted under the `tour_rs` target: step activation,
//! target re-resolution and teardown at `debug`, frame coalescing and skipped
//! recomputes at `trace`, degenerate viewports at `warn`. Hosts that already
//! install a subscriber only need a filter directive such as
//! `RUST_LOG=tour_rs=debug`.

/// Installs a compact fmt subscriber filtered from `RUST_LOG`, falling back to
/// `tour_rs=info`. Needs the `telemetry` feature.
///
/// Returns `false` when the feature is off or a global subscriber is
/// already set.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tour_rs=info")),
            )
            .with_target(true)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::init_default_tracing;

    #[cfg(not(feature = "telemetry"))]
    #[test]
    fn nothing_is_installed_without_the_feature() {
        assert!(!init_default_tracing());
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn second_installation_is_refused() {
        let _ = init_default_tracing();
        assert!(!init_default_tracing());
    }
}
