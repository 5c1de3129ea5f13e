// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GRIDLINE_LOG";

/// Filter directives for the subscriber. `GRIDLINE_LOG` wins over the
/// configured level and may carry per-target directives
/// (`gridline_app=debug,warn`).
pub fn build_env_filter(configured_level: &str) -> Result<EnvFilter> {
    let directives = match env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => configured_level.to_owned(),
    };
    EnvFilter::try_new(&directives)
        .map_err(|error| anyhow!("invalid log filter {directives:?}: {error}"))
}

/// Installs the global `fmt` subscriber writing to stderr so stdout stays
/// free for the rendered grid.
pub fn init_logging(configured_level: &str) -> Result<()> {
    let filter = build_env_filter(configured_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    tracing::trace!(level = configured_level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LOG_ENV, build_env_filter};
    use crate::test_support::env_lock;
    use anyhow::Result;

    #[test]
    fn configured_level_and_target_directives_parse() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        let filter = build_env_filter("gridline_app=debug,warn")?;
        assert!(filter.to_string().contains("gridline_app=debug"));
        Ok(())
    }

    #[test]
    fn garbage_level_is_rejected() {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        let error = build_env_filter("gridline_app=loud").expect_err("bad level should fail");
        assert!(error.to_string().contains("invalid log filter"));
    }

    #[test]
    fn env_directives_override_configured_level() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(LOG_ENV, "gridline_cli=trace");
        }
        let filter = build_env_filter("warn");
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        assert!(filter?.to_string().contains("gridline_cli=trace"));
        Ok(())
    }
}
