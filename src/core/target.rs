// src/core/target.rs

use std::net::IpAddr;
use std::str::FromStr;

use serde::Serialize;
use strum::Display;
use url::{Host, Url};

use crate::core::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

/// A normalized scan subject.
///
/// `host` is always a bare, lowercase name or IP literal: no scheme, no path, no
/// port and no trailing slash or dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    host: String,
    scheme: Scheme,
    base_url: String,
}

impl Target {
    /// Normalizes a bare domain or a full URL into a `Target`.
    ///
    /// Scheme precedence: an explicit `http://`/`https://` prefix is kept as-is;
    /// otherwise loopback and local names get `http`; everything else gets `https`.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyTarget);
        }

        let explicit = explicit_scheme(trimmed)?;
        let parsed = match explicit {
            Some(_) => Url::parse(trimmed),
            None => Url::parse(&format!("https://{}", trimmed.trim_start_matches('/'))),
        }
        .map_err(|_| InputError::InvalidTarget(trimmed.to_string()))?;

        let (host, authority) = match parsed.host() {
            Some(Host::Domain(domain)) => {
                let host = domain.trim_end_matches('.').to_ascii_lowercase();
                (host.clone(), host)
            }
            Some(Host::Ipv4(addr)) => (addr.to_string(), addr.to_string()),
            Some(Host::Ipv6(addr)) => (addr.to_string(), format!("[{addr}]")),
            None => return Err(InputError::InvalidTarget(trimmed.to_string())),
        };
        if host.is_empty() {
            return Err(InputError::InvalidTarget(trimmed.to_string()));
        }

        let scheme = explicit.unwrap_or(if is_local_name(&host) {
            Scheme::Http
        } else {
            Scheme::Https
        });

        Ok(Self {
            base_url: format!("{scheme}://{authority}"),
            host,
            scheme,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an absolute path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl FromStr for Target {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns the scheme the user typed, if any. A `://` that appears after a path
/// or query character is not a scheme separator.
fn explicit_scheme(raw: &str) -> Result<Option<Scheme>, InputError> {
    let Some((scheme, _)) = raw.split_once("://") else {
        return Ok(None);
    };
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return Ok(None);
    }
    match scheme.to_ascii_lowercase().as_str() {
        "http" => Ok(Some(Scheme::Http)),
        "https" => Ok(Some(Scheme::Https)),
        other => Err(InputError::UnsupportedScheme(other.to_string())),
    }
}

fn is_local_name(host: &str) -> bool {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback();
    }
    host == "localhost" || host.ends_with(".localhost") || host.ends_with(".local")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_defaults_to_https() {
        let target = Target::parse("example.com").unwrap();
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.scheme(), Scheme::Https);
        assert_eq!(target.base_url(), "https://example.com");
    }

    #[test]
    fn full_url_is_stripped_to_host() {
        let target = Target::parse("  https://Example.COM/some/path/?q=1 ").unwrap();
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.base_url(), "https://example.com");

        let target = Target::parse("example.com/").unwrap();
        assert_eq!(target.host(), "example.com");
    }

    #[test]
    fn explicit_scheme_wins_over_loopback_heuristic() {
        assert_eq!(Target::parse("http://example.com").unwrap().scheme(), Scheme::Http);
        assert_eq!(Target::parse("https://localhost").unwrap().scheme(), Scheme::Https);
        assert_eq!(Target::parse("HTTP://example.com").unwrap().scheme(), Scheme::Http);
    }

    #[test]
    fn loopback_names_default_to_http() {
        for raw in ["localhost", "api.localhost", "printer.local", "127.0.0.1:8080"] {
            let target = Target::parse(raw).unwrap();
            assert_eq!(target.scheme(), Scheme::Http, "{raw}");
        }
        let target = Target::parse("127.0.0.1:8080").unwrap();
        assert_eq!(target.host(), "127.0.0.1");
        assert_eq!(target.base_url(), "http://127.0.0.1");
    }

    #[test]
    fn ipv6_literal_keeps_brackets_only_in_url() {
        let target = Target::parse("[::1]").unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.base_url(), "http://[::1]");
    }

    #[test]
    fn trailing_dot_is_removed() {
        assert_eq!(Target::parse("example.com.").unwrap().host(), "example.com");
    }

    #[test]
    fn rejects_unusable_input() {
        assert_eq!(Target::parse("   "), Err(InputError::EmptyTarget));
        assert_eq!(
            Target::parse("ftp://example.com"),
            Err(InputError::UnsupportedScheme("ftp".to_string()))
        );
        assert!(matches!(Target::parse("http://"), Err(InputError::InvalidTarget(_))));
        assert!(matches!(Target::parse("exa mple.com"), Err(InputError::InvalidTarget(_))));
    }

    #[test]
    fn url_for_joins_paths() {
        let target = Target::parse("example.com").unwrap();
        assert_eq!(
            target.url_for("/.well-known/security.txt"),
            "https://example.com/.well-known/security.txt"
        );
    }
}
