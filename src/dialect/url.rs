use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::PrestoTxnError;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?:(?P<user>[^:@/]*)(?::(?P<password>[^@/]*))?@)?(?P<host>[^:/?#]+)(?::(?P<port>\d+))?(?:/(?P<database>[^?#]*))?(?:\?(?P<query>[^#]*))?$",
    )
    .expect("connect URL pattern is valid")
});

/// Parsed `scheme://[user[:password]@]host[:port][/database][?key=value&...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectUrl {
    pub scheme: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Everything after the first `/`, e.g. `catalog/schema`.
    pub database: Option<String>,
    pub query: IndexMap<String, String>,
}

impl ConnectUrl {
    /// Parse a connect URL. User and password are percent-decoded; query keys and values
    /// are form-decoded, so `+` there also means a space.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConfigError` if the URL does not match the expected shape,
    /// the port is out of range, or a component is not valid percent-encoding.
    pub fn parse(url: &str) -> Result<Self, PrestoTxnError> {
        let caps = URL_PATTERN
            .captures(url.trim())
            .ok_or_else(|| PrestoTxnError::ConfigError(format!("Could not parse URL '{url}'")))?;

        let port = caps
            .name("port")
            .map(|m| {
                m.as_str().parse::<u16>().map_err(|e| {
                    PrestoTxnError::ConfigError(format!("Invalid port '{}': {e}", m.as_str()))
                })
            })
            .transpose()?;

        let mut query = IndexMap::new();
        if let Some(raw) = caps.name("query") {
            for pair in raw.as_str().split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                query.insert(form_decode(key)?, form_decode(value)?);
            }
        }

        Ok(Self {
            scheme: caps["scheme"].to_ascii_lowercase(),
            username: caps
                .name("user")
                .map(|m| percent_decode(m.as_str()))
                .transpose()?
                .filter(|u| !u.is_empty()),
            password: caps
                .name("password")
                .map(|m| percent_decode(m.as_str()))
                .transpose()?,
            host: caps["host"].to_string(),
            port,
            database: caps
                .name("database")
                .map(|m| m.as_str().trim_end_matches('/').to_string())
                .filter(|d| !d.is_empty()),
            query,
        })
    }
}

fn percent_decode(input: &str) -> Result<String, PrestoTxnError> {
    decode(input, false)
}

fn form_decode(input: &str) -> Result<String, PrestoTxnError> {
    decode(input, true)
}

fn decode(input: &str, plus_as_space: bool) -> Result<String, PrestoTxnError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'%' => {
                let hex = bytes.get(idx + 1..idx + 3).ok_or_else(|| {
                    PrestoTxnError::ConfigError(format!("Truncated escape in '{input}'"))
                })?;
                let (Some(high), Some(low)) = (hex_value(hex[0]), hex_value(hex[1])) else {
                    return Err(PrestoTxnError::ConfigError(format!(
                        "Invalid escape '%{}' in '{input}'",
                        String::from_utf8_lossy(hex)
                    )));
                };
                out.push((high << 4) | low);
                idx += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                idx += 1;
            }
            b => {
                out.push(b);
                idx += 1;
            }
        }
    }
    String::from_utf8(out)
        .map_err(|e| PrestoTxnError::ConfigError(format!("Invalid UTF-8 in '{input}': {e}")))
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
