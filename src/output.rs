use std::fmt::Write as _;

use serde::{Serialize, Serializer};

use crate::map::FieldMap;
use crate::request::Request;
use crate::types::{HttpMethod, HttpVersion};

/// An owned, serializable copy of what a [`Request`] decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    pub method: Option<HttpMethod>,
    pub version: Option<HttpVersion>,
    /// Path without query.
    pub url: Option<String>,
    pub path_segments: Vec<String>,
    pub headers: FieldMap,
    pub arguments: FieldMap,
    pub cookies: FieldMap,
    #[serde(serialize_with = "serialize_body")]
    pub body: Option<Vec<u8>>,
}

/// Serialize body bytes as a UTF-8 string (lossy) for JSON output.
fn serialize_body<S: Serializer>(body: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    match body {
        None => s.serialize_none(),
        Some(bytes) => s.serialize_str(&String::from_utf8_lossy(bytes)),
    }
}

impl RequestSnapshot {
    /// Copy everything out of `request`. The request layer does not keep
    /// bodies, so callers that collected one pass it in.
    pub fn capture<D>(
        request: &Request<D>,
        version: Option<HttpVersion>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            method: request.method(),
            version,
            url: request.url().map(str::to_owned),
            path_segments: request.path_segments().to_vec(),
            headers: request.headers().clone(),
            arguments: request.arguments().clone(),
            cookies: request.cookies().clone(),
            body: body.filter(|b| !b.is_empty()),
        }
    }

    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| std::str::from_utf8(b).ok())
    }

    fn request_line(&self) -> String {
        let method = self.method.map_or("-", |m| m.as_str());
        let version = self.version.map_or("-", |v| v.as_str());
        format!("{method} {} {version}", self.url.as_deref().unwrap_or("-"))
    }
}

/// Serialize a [`RequestSnapshot`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(snapshot: &RequestSnapshot, pretty: bool) -> String {
    let json = if pretty {
        serde_json::to_string_pretty(snapshot)
    } else {
        serde_json::to_string(snapshot)
    };
    json.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render a [`RequestSnapshot`] in a human-readable debug format.
pub fn format_debug(snapshot: &RequestSnapshot) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Request ===\n");
    let _ = writeln!(out, "{}", snapshot.request_line());
    if !snapshot.path_segments.is_empty() {
        let _ = writeln!(out, "Segments: {:?}", snapshot.path_segments);
    }

    section(&mut out, "Headers", &snapshot.headers);
    section(&mut out, "Arguments", &snapshot.arguments);
    section(&mut out, "Cookies", &snapshot.cookies);

    match &snapshot.body {
        Some(body) => {
            let _ = writeln!(out, "\n--- Body ({} bytes) ---", body.len());
            match std::str::from_utf8(body) {
                Ok(s) => out.push_str(s),
                Err(_) => {
                    let _ = write!(out, "<binary data: {} bytes>", body.len());
                }
            }
            out.push('\n');
        }
        None => out.push_str("\n--- No Body ---\n"),
    }

    out.push_str("====================\n");
    out
}

fn section(out: &mut String, title: &str, map: &FieldMap) {
    if map.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n--- {title} ({}) ---", map.len());
    for (k, v) in map.iter() {
        let _ = writeln!(
            out,
            "  {}: {}",
            String::from_utf8_lossy(k),
            String::from_utf8_lossy(v)
        );
    }
}

/// Render only the request line and the folded headers (no body).
pub fn format_headers_only(snapshot: &RequestSnapshot) -> String {
    let mut out = String::with_capacity(64 + snapshot.headers.len() * 40);

    let _ = writeln!(out, "{}", snapshot.request_line());
    for (k, v) in snapshot.headers.iter() {
        let _ = writeln!(
            out,
            "{}: {}",
            String::from_utf8_lossy(k),
            String::from_utf8_lossy(v)
        );
    }

    out
}
