//! Configuration
//!
//! Everything is read from the environment once at startup. Unset variables
//! fall back to defaults; set-but-unparsable values abort startup so a typo
//! never silently runs with a default.

use std::net::Ipv4Addr;
use std::time::Duration;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to a value that does not parse or is out of range.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// The offending value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Zone this server is authoritative for. Lowercase, trailing dot.
    pub zone: String,
    /// UDP/TCP listen port.
    pub port: u16,
    /// TTL for TXT answers. 0 disables downstream caching.
    pub ttl: u32,
    /// Host named in NS answers. Trailing dot.
    pub ns_hostname: String,
    /// Glue address for the NS host, if configured.
    pub ns_ip: Option<Ipv4Addr>,
    /// Generated session id length, within [4, 36].
    pub session_id_length: usize,
    /// Generated player token length, within [1, 36].
    pub token_length: usize,
    /// Sessions older than this are reaped. Anchored on creation time.
    pub session_max_age: Duration,
    /// Reaper tick period.
    pub cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone: "game.local.".to_string(),
            port: 53,
            ttl: 0,
            ns_hostname: "ns1.game.local.".to_string(),
            ns_ip: None,
            session_id_length: 8,
            token_length: 8,
            session_max_age: Duration::from_secs(120),
            cleanup_interval: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let zone = match lookup("DNS_ZONE") {
            Some(raw) => normalize_zone(&raw).ok_or(ConfigError::Invalid {
                var: "DNS_ZONE",
                value: raw,
                reason: "expected a non-empty domain name",
            })?,
            None => "game.local.".to_string(),
        };
        let port = parse_var(&lookup, "DNS_PORT", 53, "expected a port number", |s| {
            s.parse().ok()
        })?;
        let ttl = parse_var(&lookup, "DNS_TTL", 0, "expected a TTL in seconds", |s| {
            s.parse().ok()
        })?;

        let ns_hostname = match lookup("NS_HOSTNAME") {
            Some(raw) => normalize_zone(&raw).ok_or(ConfigError::Invalid {
                var: "NS_HOSTNAME",
                value: raw,
                reason: "expected a non-empty host name",
            })?,
            None => format!("ns1.{zone}"),
        };
        let ns_ip = match lookup("NS_IP") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "NS_IP",
                value: raw,
                reason: "expected an IPv4 address",
            })?),
            None => None,
        };

        let session_id_length = parse_var(
            &lookup,
            "SESSION_ID_LENGTH",
            8,
            "expected a length within 4-36",
            |s| s.parse().ok().filter(|n| (4..=36).contains(n)),
        )?;
        let token_length = parse_var(
            &lookup,
            "PLAYER_TOKEN_LENGTH",
            8,
            "expected a length within 1-36",
            |s| s.parse().ok().filter(|n| (1..=36).contains(n)),
        )?;
        let session_max_age = parse_var(
            &lookup,
            "SESSION_MAX_AGE",
            Duration::from_secs(120),
            "expected a duration such as 120s, 2m or 5000ms",
            parse_duration,
        )?;
        let cleanup_interval = parse_var(
            &lookup,
            "SESSION_CLEANUP_INTERVAL",
            Duration::from_secs(120),
            "expected a duration such as 120s, 2m or 5000ms",
            parse_duration,
        )?;

        Ok(Self {
            zone,
            port,
            ttl,
            ns_hostname,
            ns_ip,
            session_id_length,
            token_length,
            session_max_age,
            cleanup_interval,
        })
    }

    /// Listen address for both transports.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    reason: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => parse(raw.trim()).ok_or(ConfigError::Invalid {
            var,
            value: raw,
            reason,
        }),
    }
}

/// Lowercase and ensure exactly one trailing dot. `None` for empty input.
fn normalize_zone(raw: &str) -> Option<String> {
    let zone = raw.trim().trim_end_matches('.').to_lowercase();
    if zone.is_empty() {
        return None;
    }
    Some(format!("{zone}."))
}

/// `120s`, `2m`, `1h`, `5000ms`, or a bare integer meaning seconds.
fn parse_duration(raw: &str) -> Option<Duration> {
    if let Some(ms) = raw.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }
    if let Some(secs) = raw.strip_suffix('s') {
        return secs.parse().ok().map(Duration::from_secs);
    }
    if let Some(mins) = raw.strip_suffix('m') {
        return mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    if let Some(hours) = raw.strip_suffix('h') {
        return hours
            .parse::<u64>()
            .ok()
            .map(|h| Duration::from_secs(h * 3600));
    }
    raw.parse().ok().map(Duration::from_secs)
}
