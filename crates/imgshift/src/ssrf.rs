//! Egress checks for user-supplied watermark URLs.
//!
//! A URL is accepted when:
//! 1. the scheme is http or https and a host is present
//! 2. the host matches the allowlist, if one is configured
//! 3. neither the literal host nor any resolved address is private,
//!    loopback, link-local or otherwise internal (unless private
//!    addresses are explicitly allowed)
//!
//! The addresses checked here are handed back in [`CheckedUrl`] and the
//! fetcher connects only to them, so a second lookup that rebinds to an
//! internal address is never made.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use imgshift_core::FetchError;
use reqwest::Url;
use tracing::warn;

/// What the fetcher may reach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EgressPolicy {
    pub allow_private_ips: bool,
    /// Exact hosts or parent domains; `example.com` also admits `cdn.example.com`.
    pub allowed_hosts: Option<Vec<String>>,
}

/// A URL that passed the egress check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedUrl {
    pub url: Url,
    /// Resolved addresses the connection must use. Empty when the host is an
    /// IP literal or private addresses are allowed.
    pub addrs: Vec<SocketAddr>,
}

impl CheckedUrl {
    fn unpinned(url: Url) -> Self {
        Self {
            url,
            addrs: Vec::new(),
        }
    }
}

/// Parse `url` and check it against `policy`.
pub fn validate_url(url: &str, policy: &EgressPolicy) -> Result<CheckedUrl, FetchError> {
    let parsed =
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "scheme '{}' is not http or https",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl(format!("{} has no host", url)))?;
    // IPv6 literals come back bracketed
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();

    if let Some(allowed) = &policy.allowed_hosts {
        if !host_allowed(&host, allowed) {
            return Err(FetchError::Forbidden(format!(
                "host '{}' is not in the allowlist",
                host
            )));
        }
    }

    if policy.allow_private_ips {
        return Ok(CheckedUrl::unpinned(parsed));
    }

    if is_internal_hostname(&host) {
        return Err(FetchError::Forbidden(format!(
            "host '{}' is internal",
            host
        )));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(FetchError::Forbidden(format!("address {} is private", ip)));
        }
        return Ok(CheckedUrl::unpinned(parsed));
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs: Vec<SocketAddr> = (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|e| {
            warn!(host = %host, error = %e, "failed to resolve watermark host");
            FetchError::Transport(format!("could not resolve {}: {}", host, e))
        })?
        .collect();

    if addrs.is_empty() {
        return Err(FetchError::Transport(format!("{} has no addresses", host)));
    }
    if let Some(addr) = addrs.iter().find(|addr| is_private_ip(&addr.ip())) {
        return Err(FetchError::Forbidden(format!(
            "host '{}' resolves to private address {}",
            host,
            addr.ip()
        )));
    }

    Ok(CheckedUrl { url: parsed, addrs })
}

fn host_allowed(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| {
        let entry = entry.trim().trim_start_matches('.').to_ascii_lowercase();
        !entry.is_empty() && (host == entry || host.ends_with(&format!(".{}", entry)))
    })
}

fn is_internal_hostname(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

/// Check if an IP address is private/internal
///
/// Returns true for:
/// - IPv4 private ranges: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
/// - IPv4 loopback 127.0.0.0/8, link-local 169.254.0.0/16
/// - IPv4 shared address space 100.64.0.0/10
/// - IPv4 multicast 224.0.0.0/4, reserved 0.0.0.0/8 and 240.0.0.0/4
/// - IPv6 loopback, unspecified, link-local fe80::/10, unique local fc00::/7
/// - IPv4-mapped IPv6 addresses of any of the above
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let o = ipv4.octets();
            o[0] == 10
                || (o[0] == 172 && (16..=31).contains(&o[1]))
                || (o[0] == 192 && o[1] == 168)
                || o[0] == 127
                || (o[0] == 169 && o[1] == 254)
                || (o[0] == 100 && (64..=127).contains(&o[1]))
                || o[0] >= 224
                || o[0] == 0
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || (first & 0xffc0) == 0xfe80
                || (first & 0xfe00) == 0xfc00
                || (first & 0xff00) == 0xff00
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> EgressPolicy {
        EgressPolicy::default()
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        for url in ["file:///etc/passwd", "ftp://example.com/a.png", "gopher://x"] {
            assert!(
                matches!(validate_url(url, &strict()), Err(FetchError::InvalidUrl(_))),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            validate_url("not a url", &strict()),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_private_literals() {
        for url in [
            "http://127.0.0.1/a.png",
            "http://10.1.2.3/a.png",
            "http://172.20.0.1/a.png",
            "http://192.168.1.1/a.png",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/a.png",
            "http://[fd00::1]/a.png",
            "http://[::ffff:127.0.0.1]/a.png",
            "http://0.0.0.0/a.png",
        ] {
            assert!(
                matches!(validate_url(url, &strict()), Err(FetchError::Forbidden(_))),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_rejects_internal_names() {
        for url in [
            "http://localhost/a.png",
            "http://printer.local/a.png",
            "http://db.internal/x",
        ] {
            assert!(
                matches!(validate_url(url, &strict()), Err(FetchError::Forbidden(_))),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_accepts_public_literal() {
        let checked = validate_url("https://93.184.216.34/logo.png", &strict()).unwrap();
        assert_eq!(checked.url.host_str(), Some("93.184.216.34"));
        // Literals need no lookup, so there is nothing to pin
        assert!(checked.addrs.is_empty());
    }

    #[test]
    fn test_private_allowed_when_configured() {
        let policy = EgressPolicy {
            allow_private_ips: true,
            allowed_hosts: None,
        };
        assert!(validate_url("http://127.0.0.1:9000/w.png", &policy).is_ok());
    }

    #[test]
    fn test_allowlist() {
        let policy = EgressPolicy {
            allow_private_ips: true,
            allowed_hosts: Some(vec!["example.com".to_string()]),
        };
        assert!(validate_url("https://example.com/w.png", &policy).is_ok());
        let allowed = validate_url("https://cdn.example.com/w.png", &policy);
        assert!(allowed.is_ok());
        assert!(matches!(
            validate_url("https://badexample.com/w.png", &policy),
            Err(FetchError::Forbidden(_))
        ));
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"100.64.0.1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));
        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"2606:4700::1111".parse().unwrap()));
    }
}
