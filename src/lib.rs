//! # hpd-httpd
//!
//! The HTTP request layer of the HPD home-automation gateway: an
//! **incremental request state machine** that turns tokenizer events into
//! a decomposed request (method, path, query arguments, folded headers,
//! cookies) and a **response builder** for writing replies.
//!
//! Input arrives in arbitrarily small fragments. Nothing here assumes a
//! URL, header name or value shows up in one piece, and the results are
//! identical however the bytes were split.
//!
//! ## Quick start — one-shot parsing
//!
//! ```rust
//! use hpd_httpd::parse_request;
//!
//! let raw = b"GET /device/7?state=on HTTP/1.1\r\nHost: hpd\r\nCookie: sid=42\r\n\r\n";
//! let request = parse_request(raw).expect("valid request");
//! assert_eq!(request.url.as_deref(), Some("/device/7"));
//! assert_eq!(request.arguments.get_str("state"), Some("on"));
//! assert_eq!(request.cookies.get_str("sid"), Some("42"));
//! ```
//!
//! ## Quick start — callbacks on a connection
//!
//! ```rust
//! use hpd_httpd::{Flow, Handler, Request, Response, Session, Status};
//!
//! #[derive(Default)]
//! struct App {
//!     reply: Vec<u8>,
//! }
//!
//! impl Handler for App {
//!     type Data = ();
//!
//!     fn on_complete(&mut self, req: &mut Request) -> Flow {
//!         let status = match req.url() {
//!             Some("/ping") => Status::Ok,
//!             _ => Status::NotFound,
//!         };
//!         let mut res = Response::new(&mut self.reply, status).unwrap();
//!         res.send(b"pong").unwrap();
//!         Flow::Continue
//!     }
//! }
//!
//! let mut app = App::default();
//! let mut session = Session::new(None);
//! session.receive(&mut app, b"GET /pi").unwrap();
//! session.receive(&mut app, b"ng HTTP/1.1\r\n\r\n").unwrap();
//! assert!(app.reply.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod error;
mod header;
mod map;
mod output;
mod request;
mod response;
mod session;
mod status;
mod tokenizer;
mod types;
mod url;

// Re-export public API.
pub use error::{Error, ErrorKind, ParseError};
pub use header::{HeaderAccumulator, split_cookies, store_pair};
pub use map::FieldMap;
pub use output::{RequestSnapshot, format_debug, format_headers_only, format_json};
pub use request::{Event, Handler, Request, RequestMachine, RequestState};
pub use response::{Cookie, Response};
pub use session::Session;
pub use status::Status;
pub use tokenizer::{ParseStatus, ParserConfig, Tokenizer};
pub use types::{Flow, HttpMethod, HttpVersion};
pub use url::{UrlDecomposer, UrlVisitor};

/// Collects the body into the request's user data.
struct BodyCollector;

impl Handler for BodyCollector {
    type Data = Vec<u8>;

    fn on_body(&mut self, req: &mut Request<Vec<u8>>, fragment: &[u8]) -> Flow {
        match req.data_mut() {
            Some(body) => body.extend_from_slice(fragment),
            None => {
                req.set_data(fragment.to_vec());
            }
        }
        Flow::Continue
    }
}

/// Parse a **complete** HTTP request from a byte slice in one call.
///
/// This is a convenience wrapper around [`Session`]. For incremental /
/// streaming use-cases, create a `Session` or drive a [`RequestMachine`]
/// directly.
///
/// # Errors
///
/// Returns [`Error`] if the data is malformed or incomplete.
pub fn parse_request(data: &[u8]) -> Result<RequestSnapshot, Error> {
    parse_request_with_config(data, ParserConfig::default())
}

/// Parse a **complete** HTTP request using custom [`ParserConfig`] limits.
///
/// # Errors
///
/// Returns [`Error`] if the data is malformed, incomplete, or exceeds the
/// configured limits.
pub fn parse_request_with_config(
    data: &[u8],
    config: ParserConfig,
) -> Result<RequestSnapshot, Error> {
    let mut handler = BodyCollector;
    let mut session = Session::with_config(config, None);
    match session.receive(&mut handler, data)? {
        ParseStatus::Complete(_) => {}
        ParseStatus::Incomplete => {
            return Err(Error::State("incomplete request".into()));
        }
        ParseStatus::Stopped(code) => {
            return Err(Error::State(format!("request stopped with code {code}")));
        }
    }
    let version = session.tokenizer().version();
    let body = session.request_mut().take_data();
    let snapshot = RequestSnapshot::capture(session.request(), version, body);
    session.close(&mut handler);
    Ok(snapshot)
}
