//! Hand-rolled URL parsing for the cloud bootstrap/secret/broker endpoints.
//!
//! Supports an explicit `scheme://` prefix or a bare authority combined
//! with a caller-supplied default scheme, bracketed IPv6 literals, and the
//! scheme-specific default port/path pairs used throughout the cloud
//! client.

use crate::error::{Error, Result};

const MAX_HOST_LEN: usize = 96;
const MAX_PATH_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "ws" => Ok(Self::Ws),
            "wss" => Ok(Self::Wss),
            other => Err(Error::protocol(format!("unsupported URL scheme '{other}'"))),
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Http | Self::Ws => 80,
            Self::Https | Self::Wss => 443,
        }
    }

    fn default_path(self) -> &'static str {
        match self {
            Self::Http | Self::Https => "/",
            Self::Ws | Self::Wss => "/mqtt",
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Self::Https | Self::Wss)
    }

    pub fn is_websocket(self) -> bool {
        matches!(self, Self::Ws | Self::Wss)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

pub fn parse(input: &str, default_scheme: Scheme) -> Result<Url> {
    let (scheme, rest) = match input.find("://") {
        Some(idx) => (Scheme::from_str(&input[..idx])?, &input[idx + 3..]),
        None => (default_scheme, input),
    };

    let (authority, raw_path) = split_authority_path(rest);

    let (host, port) = parse_authority(authority, scheme.default_port())?;
    if host.len() > MAX_HOST_LEN {
        return Err(Error::invalid_argument("host exceeds maximum length"));
    }

    let path = if raw_path.is_empty() {
        scheme.default_path().to_string()
    } else {
        raw_path.to_string()
    };
    if path.len() > MAX_PATH_LEN {
        return Err(Error::invalid_argument("path exceeds maximum length"));
    }

    Ok(Url {
        scheme,
        host,
        port,
        path,
    })
}

fn split_authority_path(rest: &str) -> (&str, &str) {
    if rest.starts_with('[') {
        if let Some(bracket_end) = rest.find(']') {
            if let Some(slash) = rest[bracket_end..].find('/') {
                return (&rest[..bracket_end + slash], &rest[bracket_end + slash..]);
            }
            return (rest, "");
        }
    }
    match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    }
}

fn parse_authority(authority: &str, default_port: u16) -> Result<(String, u16)> {
    if authority.is_empty() {
        return Err(Error::invalid_argument("empty host"));
    }

    if let Some(rest) = authority.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            return Err(Error::invalid_argument("unterminated IPv6 literal"));
        };
        let host = rest[..end].to_string();
        let after = &rest[end + 1..];
        let port = if let Some(p) = after.strip_prefix(':') {
            parse_port(p)?
        } else {
            default_port
        };
        return Ok((host, port));
    }

    match authority.rfind(':') {
        Some(idx) => {
            let host = authority[..idx].to_string();
            let port = parse_port(&authority[idx + 1..])?;
            Ok((host, port))
        }
        None => Ok((authority.to_string(), default_port)),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| Error::invalid_argument(format!("invalid port '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_scheme_and_default_path() {
        let u = parse("https://api.example.com", Scheme::Https).unwrap();
        assert_eq!(u.scheme, Scheme::Https);
        assert_eq!(u.host, "api.example.com");
        assert_eq!(u.port, 443);
        assert_eq!(u.path, "/");
    }

    #[test]
    fn bare_authority_uses_default_scheme() {
        let u = parse("broker.example.com:8883/mqtt", Scheme::Wss).unwrap();
        assert_eq!(u.scheme, Scheme::Wss);
        assert_eq!(u.host, "broker.example.com");
        assert_eq!(u.port, 8883);
        assert_eq!(u.path, "/mqtt");
    }

    #[test]
    fn ws_default_path_is_mqtt() {
        let u = parse("ws://broker.example.com", Scheme::Https).unwrap();
        assert_eq!(u.path, "/mqtt");
        assert_eq!(u.port, 80);
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let u = parse("https://[2001:db8::1]:8443/api/v1", Scheme::Https).unwrap();
        assert_eq!(u.host, "2001:db8::1");
        assert_eq!(u.port, 8443);
        assert_eq!(u.path, "/api/v1");
    }

    #[test]
    fn bracketed_ipv6_without_port_uses_default() {
        let u = parse("https://[::1]/path", Scheme::Https).unwrap();
        assert_eq!(u.host, "::1");
        assert_eq!(u.port, 443);
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(matches!(
            parse("ftp://example.com", Scheme::Https),
            Err(Error::ProtocolError(_))
        ));
    }

    #[test]
    fn rejects_oversized_host() {
        let long_host = "a".repeat(200);
        assert!(parse(&format!("https://{long_host}"), Scheme::Https).is_err());
    }

    #[test]
    fn explicit_path_with_no_scheme_prefix() {
        let u = parse("example.com/custom/path", Scheme::Http).unwrap();
        assert_eq!(u.scheme, Scheme::Http);
        assert_eq!(u.path, "/custom/path");
        assert_eq!(u.port, 80);
    }
}
