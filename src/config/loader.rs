//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::HarnessConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `startup.delay_ms` (e.g. "2s", "500ms").
pub const STARTUP_DELAY_VAR: &str = "STARTUP_DELAY";
/// Environment variable overriding `listener.bind_address`.
pub const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: HarnessConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut HarnessConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`.
///
/// An unparseable `STARTUP_DELAY` is logged and ignored so a typo never
/// blocks startup.
pub fn apply_overrides_from<F>(config: &mut HarnessConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(STARTUP_DELAY_VAR) {
        match parse_duration(&raw) {
            Some(delay) => {
                config.startup.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                tracing::debug!(delay = ?delay, "Startup delay taken from environment");
            }
            None => {
                tracing::error!(
                    value = %raw,
                    fallback_ms = config.startup.delay_ms,
                    "Invalid {}, keeping configured delay",
                    STARTUP_DELAY_VAR
                );
            }
        }
    }

    if let Some(addr) = lookup(BIND_ADDRESS_VAR) {
        if !addr.trim().is_empty() {
            config.listener.bind_address = addr.trim().to_string();
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration such as `"2s"`, `"1.5s"` or `"1m30s"`.
///
/// Accepts `"0"`, an optional leading `+`, and one or more decimal
/// components, each with a unit of `ns`, `us`, `µs`, `ms`, `s`, `m` or `h`.
/// Negative values are rejected. Sub-nanosecond precision is truncated.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let mut rest = raw.strip_prefix('+').unwrap_or(raw);
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (nanos, tail) = parse_component(rest)?;
        total = total.checked_add(nanos)?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(total % NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, subsec))
}

/// One `<number><unit>` component, in nanoseconds, plus the unparsed tail.
fn parse_component(input: &str) -> Option<(u128, &str)> {
    let (whole, rest) = split_digits(input);
    let (fraction, rest) = match rest.strip_prefix('.') {
        Some(after_point) => split_digits(after_point),
        None => ("", rest),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let unit_len = rest
        .find(|c: char| c.is_ascii_digit() || c == '.')
        .unwrap_or(rest.len());
    let (unit, rest) = rest.split_at(unit_len);
    let scale = unit_nanos(unit)?;

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    let mut place = scale;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(u128::from(digit - b'0') * place)?;
    }

    Some((nanos, rest))
}

fn split_digits(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    input.split_at(end)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}
