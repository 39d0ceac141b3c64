//! Duration strings such as `1h30m`, `90s` or `500ms`.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Deserializer};

/// Parse a sequence of decimal numbers, each followed by a unit
/// (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`).
pub fn parse(s: &str) -> Result<Duration> {
    let input = s.trim();
    if input.is_empty() {
        bail!("empty duration");
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = input;
    let mut nanos = 0f64;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 {
            bail!("invalid duration '{input}': expected a number at '{rest}'");
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| anyhow!("invalid duration '{input}': bad number '{}'", &rest[..number_end]))?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => bail!("invalid duration '{input}': missing unit"),
            unit => bail!("invalid duration '{input}': unknown unit '{unit}'"),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        bail!("invalid duration '{input}': out of range");
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Serde adapter for duration string fields.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
}
