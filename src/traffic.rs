// Captured HTTP transactions and the interceptor seam the proxy layer calls into.

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;

/// One completed request/response pair handed over by the traffic layer.
/// Bodies are opaque bytes; the pipeline parses what it recognizes.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub url: String,
    pub status: u16,
    pub request_headers: HashMap<String, String>,
    pub response_headers: HashMap<String, String>,
    pub request_body: Bytes,
    pub response_body: Bytes,
}

impl HttpExchange {
    /// Hostname portion of the URL, without scheme or port.
    pub fn host(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, r)| r);
        let authority = rest.split(['/', '?']).next().unwrap_or(rest);
        authority.split(':').next().unwrap_or(authority)
    }

    /// Path portion of the URL, without the query string.
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, r)| r);
        match rest.find('/') {
            Some(i) => rest[i..].split('?').next().unwrap_or(""),
            None => "/",
        }
    }

    /// URL with the query string stripped. CDN locations carry volatile
    /// query parameters, so tracking matches on the base URL.
    pub fn base_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    pub fn request_header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.request_headers, name)
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.response_headers, name)
    }
}

fn header_lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Undo a gzip Content-Encoding. A body advertised as gzip but not
/// actually gzipped is returned as-is.
pub fn decode_body(body: &[u8], encoding: Option<&str>) -> Vec<u8> {
    if encoding.is_some_and(|e| e.eq_ignore_ascii_case("gzip")) {
        let mut decoder = GzDecoder::new(body);
        let mut out = Vec::new();
        if decoder.read_to_end(&mut out).is_ok() {
            return out;
        }
    }
    body.to_vec()
}

/// A traffic-processing stage. Implementations must never block on
/// network I/O — the proxy invokes them on its event callback path.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Observe a completed exchange. Errors are absorbed internally;
    /// one bad payload must not interrupt proxying of other traffic.
    fn on_response(&self, exchange: &HttpExchange);
}
