//! Client configuration and URL parsing.
//!
//! Accepted URL forms:
//! - `redis://[user:pass@]host[:port][/db]`
//! - `rediss://[user:pass@]host[:port][/db]` (parsed, rejected at connect time)

use crate::error::{RedsetError, Result};

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const URL_ENV_VAR: &str = "REDIS_URL";

/// Connection settings for a standalone server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Optional ACL username (Redis 6+).
    pub username: Option<String>,
    pub password: Option<String>,
    /// Database index selected on every new connection.
    pub db: u16,
    /// Set by `rediss://`. No TLS transport is provided.
    pub tls: bool,
    /// Maximum number of connections checked out at once.
    pub pool_size: usize,
    pub connect_timeout_ms: u64,
    /// Per-reply read timeout in milliseconds; `0` disables it.
    pub read_timeout_ms: u64,
    /// Idle connections older than this are dropped instead of reused.
    pub idle_timeout_ms: u64,
    /// Upper bound on a connection's read buffer, in bytes.
    pub max_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            db: 0,
            tls: false,
            pool_size: 8,
            connect_timeout_ms: 5000,
            read_timeout_ms: 30_000,
            idle_timeout_ms: 300_000,
            max_buffer_size: crate::connection::tcp::DEFAULT_MAX_BUF_SIZE,
        }
    }
}

impl ClientConfig {
    /// Parse a `redis://` or `rediss://` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let mut config = Self::default();

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| RedsetError::Protocol(format!("invalid URL, missing ://: {url}")))?;

        match scheme {
            "redis" => {}
            "rediss" => config.tls = true,
            _ => {
                return Err(RedsetError::Protocol(format!(
                    "unsupported URL scheme: {scheme}"
                )));
            }
        }

        let (host_part, db_part) = split_path(rest);

        if let Some(db_str) = db_part {
            config.db = db_str
                .parse()
                .map_err(|_| RedsetError::Protocol(format!("invalid db number: {db_str}")))?;
        }

        let host_port = match host_part.rsplit_once('@') {
            Some((userinfo, hp)) => {
                parse_userinfo(&mut config, userinfo);
                hp
            }
            None => host_part,
        };

        let (host, port) = parse_host_port(host_port)?;
        config.host = host;
        config.port = port;
        Ok(config)
    }

    /// Build from `REDIS_URL`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(URL_ENV_VAR) {
            Ok(url) if !url.trim().is_empty() => Self::from_url(url.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// `host:port`, bracketing IPv6 literals so the string is connectable.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

// ── URL parsing helpers ────────────────────────────────────────────

/// Split `rest` into (before_path, Some(path)) or (rest, None).
fn split_path(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once('/') {
        Some((before, after)) if !after.is_empty() => (before, Some(after)),
        Some((before, _)) => (before, None),
        None => (rest, None),
    }
}

/// `user:pass`, `:pass`, or a bare password.
fn parse_userinfo(config: &mut ClientConfig, userinfo: &str) {
    let (user, pass) = userinfo.split_once(':').unwrap_or(("", userinfo));
    if !user.is_empty() {
        config.username = Some(user.to_string());
    }
    if !pass.is_empty() {
        config.password = Some(pass.to_string());
    }
}

/// `host[:port]` or `[ipv6]:port`. An empty host means localhost.
fn parse_host_port(s: &str) -> Result<(String, u16)> {
    let invalid_port = |p: &str| RedsetError::Protocol(format!("invalid port: {p}"));

    let (host, port) = if let Some(bracketed) = s.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| RedsetError::Protocol(format!("unclosed IPv6 bracket: {s}")))?;
        let port = match after.strip_prefix(':') {
            Some(p) => p.parse().map_err(|_| invalid_port(p))?,
            None => DEFAULT_PORT,
        };
        (host.to_string(), port)
    } else {
        match s.rsplit_once(':') {
            Some((h, p)) => match p.parse::<u16>() {
                Ok(port) => (h.to_string(), port),
                // Bare IPv6 without a port.
                Err(_) if h.contains(':') => (s.to_string(), DEFAULT_PORT),
                Err(_) => return Err(invalid_port(p)),
            },
            None => (s.to_string(), DEFAULT_PORT),
        }
    };

    if host.is_empty() {
        return Ok(("127.0.0.1".to_string(), port));
    }
    Ok((host, port))
}

// ── Tests ──────────────────────────────────────────────────────────
