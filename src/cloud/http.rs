//! Minimal HTTP/1.1 POST client used for the bootstrap and secret calls.
//!
//! Requests are `POST <path> HTTP/1.1` with `Accept: application/json`,
//! `Connection: close`, `Content-Type: application/json`. Response bodies
//! are capped at 1024 bytes and parsed by the key-lookup scanner in
//! [`crate::cloud::json`], not a general JSON decoder.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::cloud::url::Url;
use crate::error::{Error, Result};

pub const MAX_RESPONSE_BODY: usize = 1024;

/// Abstraction over "do one POST and return (status, body)". Real network
/// I/O lives in [`TcpHttpClient`]; tests substitute a stub the same way
/// the Internal transport stands in for real hardware.
pub trait HttpClient {
    fn post_json(&mut self, url: &Url, body: &str, timeout_ms: u32) -> Result<(u16, String)>;
}

pub struct TcpHttpClient {
    tls_config: Arc<rustls::ClientConfig>,
}

impl TcpHttpClient {
    pub fn new() -> Result<Self> {
        let mut roots = rustls::RootCertStore::empty();
        for cert in rustls_native_certs::load_native_certs().certs {
            let _ = roots.add(cert);
        }
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self {
            tls_config: Arc::new(tls_config),
        })
    }

    fn request(&self, url: &Url, body: &str, timeout_ms: u32) -> Result<(u16, String)> {
        let addr = format!("{}:{}", url.host, url.port);
        let stream = TcpStream::connect(&addr)?;
        stream.set_read_timeout(Some(Duration::from_millis(u64::from(timeout_ms.max(1)))))?;
        stream.set_write_timeout(Some(Duration::from_millis(u64::from(timeout_ms.max(1)))))?;

        let request = format!(
            "POST {path} HTTP/1.1\r\nHost: {host}\r\nAccept: application/json\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {len}\r\n\r\n{body}",
            path = url.path,
            host = url.host,
            len = body.len(),
        );

        let raw_response = if url.scheme.is_tls() {
            let server_name = rustls_pki_types::ServerName::try_from(url.host.clone())
                .map_err(|_| Error::invalid_argument("invalid TLS server name"))?;
            let conn = rustls::ClientConnection::new(self.tls_config.clone(), server_name)
                .map_err(|e| Error::Io(e.to_string()))?;
            let mut tls = rustls::StreamOwned::new(conn, stream);
            tls.write_all(request.as_bytes())?;
            read_capped(&mut tls)?
        } else {
            let mut stream = stream;
            stream.write_all(request.as_bytes())?;
            read_capped(&mut stream)?
        };

        parse_http_response(&raw_response)
    }
}

impl HttpClient for TcpHttpClient {
    fn post_json(&mut self, url: &Url, body: &str, timeout_ms: u32) -> Result<(u16, String)> {
        self.request(url, body, timeout_ms)
    }
}

fn read_capped(r: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(2048);
    let mut chunk = [0u8; 512];
    loop {
        match r.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > 16 * 1024 {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buf)
}

fn parse_http_response(raw: &[u8]) -> Result<(u16, String)> {
    let text = String::from_utf8_lossy(raw);
    let mut parts = text.splitn(2, "\r\n\r\n");
    let head = parts.next().unwrap_or_default();
    let body = parts.next().unwrap_or_default();

    let status_line = head.lines().next().ok_or_else(|| Error::bad_message("empty response"))?;
    let mut tokens = status_line.split_whitespace();
    tokens.next(); // HTTP-version
    let status: u16 = tokens
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::bad_message("missing status code"))?;

    let truncated: String = body.chars().take(MAX_RESPONSE_BODY).collect();
    Ok((status, truncated))
}
