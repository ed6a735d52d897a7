//! Configuration and CLI argument handling

use std::path::PathBuf;
use std::time::Duration;
use chrono::FixedOffset;
use clap::Parser;

use crate::timer::WorkingSchedule;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "batch-timer")]
#[command(about = "A state-managed HTTP server for batch countdowns that run only in working hours")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Institution UTC offset used for the working-hours window, e.g. +05:30
    #[arg(long, default_value = "+05:30", value_parser = parse_utc_offset, allow_hyphen_values = true)]
    pub utc_offset: FixedOffset,

    /// JSON file holding scope records; in-memory only when omitted
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,

    /// Seconds between snapshot refreshes of the live countdown display
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn schedule(&self) -> WorkingSchedule {
        WorkingSchedule::new(self.utc_offset)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, or `Z`
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(format!("offset '{}' must start with + or -", raw));
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("offset '{}' must look like +HH:MM", raw));
    }

    let hours: i32 = digits[..2].parse().map_err(|e| format!("bad hours in '{}': {}", raw, e))?;
    let minutes: i32 = digits[2..].parse().map_err(|e| format!("bad minutes in '{}': {}", raw, e))?;
    if minutes >= 60 {
        return Err(format!("offset '{}' has minutes out of range", raw));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset '{}' is out of range", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_offset_forms() {
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_utc_offset("-0800").unwrap().local_minus_utc(), -28_800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+5:30").is_err());
        assert!(parse_utc_offset("+05:75").is_err());
        assert!(parse_utc_offset("+30:00").is_err());
    }

    #[test]
    fn defaults_match_the_institution() {
        let config = Config::try_parse_from(["batch-timer"]).unwrap();
        assert_eq!(config.port, 20554);
        assert_eq!(config.schedule(), WorkingSchedule::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert!(config.data_file.is_none());
    }

    #[test]
    fn negative_offsets_are_accepted_on_the_command_line() {
        let config = Config::try_parse_from(["batch-timer", "--utc-offset", "-03:00"]).unwrap();
        assert_eq!(config.utc_offset.local_minus_utc(), -10_800);
    }
}
