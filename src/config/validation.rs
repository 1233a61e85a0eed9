//! Configuration validation.

use crate::config::Config;
use std::collections::HashSet;

/// Validate the configuration.
///
/// Checks for:
/// - A known log level
/// - At least one stop signal, without duplicates
/// - Non-zero shutdown and hook timeouts
/// - Unique, non-empty hook names
/// - A program for every hook
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    // Validate signals
    let shutdown = &config.shutdown;
    if shutdown.signals.is_empty() {
        errors.push("at least one stop signal must be configured".to_string());
    }

    let mut signals = HashSet::new();
    for signal in &shutdown.signals {
        if !signals.insert(signal) {
            errors.push(format!("duplicate stop signal: {}", signal));
        }
    }

    if shutdown.timeout.is_some_and(|t| t.is_zero()) {
        errors.push("shutdown timeout must be greater than zero".to_string());
    }

    // Validate hooks
    let mut hook_names = HashSet::new();
    for hook in &config.hooks {
        if hook.name.is_empty() {
            errors.push("hook name cannot be empty".to_string());
        } else if !hook_names.insert(hook.name.as_str()) {
            errors.push(format!("duplicate hook name: {}", hook.name));
        }

        if hook.command.first().is_none_or(|program| program.is_empty()) {
            errors.push(format!("hook '{}' has no command", hook.name));
        }

        if hook.timeout.is_some_and(|t| t.is_zero()) {
            errors.push(format!(
                "hook '{}' has timeout 0 (must be greater than zero)",
                hook.name
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
