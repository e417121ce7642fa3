use std::fmt;
use std::io::Write;

use log::{debug, trace};

use crate::error::Error;
use crate::status::Status;

const HTTP_VERSION: &str = "HTTP/1.1";
const CRLF: &str = "\r\n";

/// An outgoing HTTP response written to a transport `W`.
///
/// The status line and headers are buffered until the first call to
/// [`send`](Self::send), which flushes them exactly once. After that the
/// header block is immutable and every later `send` writes another body
/// fragment, so a body can be streamed for as long as the connection stays
/// open.
///
/// ```rust
/// use hpd_httpd::{Response, Status};
///
/// let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
/// res.add_header("Content-Type", "text/plain").unwrap();
/// res.send(b"hello").unwrap();
/// assert!(res.add_header("X-Late", "1").is_err());
///
/// let wire = String::from_utf8(res.into_inner()).unwrap();
/// assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(wire.ends_with("\r\n\r\nhello"));
/// ```
#[derive(Debug)]
pub struct Response<W: Write> {
    writer: W,
    status: Status,
    /// Status line and header lines; `None` once flushed.
    head: Option<String>,
}

impl<W: Write> Response<W> {
    /// Build the status line for `status`.
    ///
    /// Persistent connections are not supported, so every response carries
    /// `Connection: close`.
    pub fn new(writer: W, status: Status) -> Result<Self, Error> {
        let mut head = String::with_capacity(128);
        head.push_str(HTTP_VERSION);
        head.push(' ');
        head.push_str(&status.code().to_string());
        head.push(' ');
        head.push_str(status.reason());
        head.push_str(CRLF);

        let mut res = Self {
            writer,
            status,
            head: Some(head),
        };
        res.add_header("Connection", "close")?;
        Ok(res)
    }

    /// The status this response was created with.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns `true` once the status line and headers have been written.
    pub fn headers_sent(&self) -> bool {
        self.head.is_none()
    }

    /// Append a `name: value` header line.
    ///
    /// # Errors
    ///
    /// [`Error::State`] once the headers have been sent, and
    /// [`Error::Argument`] if `name` is empty or either part contains CR
    /// or LF.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let head = self.head_mut()?;
        if name.is_empty() || has_line_break(name) || has_line_break(value) {
            return Err(Error::argument(format!("invalid header line '{name}'")));
        }
        trace!("Add header {name}: {value}");
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str(CRLF);
        Ok(())
    }

    /// Append a `Set-Cookie` header built from `cookie`.
    pub fn add_cookie(&mut self, cookie: &Cookie<'_>) -> Result<(), Error> {
        if cookie.name.is_empty() {
            return Err(Error::argument("cookie without a name"));
        }
        let value = cookie.header_value();
        self.add_header("Set-Cookie", &value)
    }

    /// Send a body fragment, flushing the status line and headers first
    /// if they have not been sent yet. An empty fragment only flushes the
    /// header block.
    pub fn send(&mut self, body: &[u8]) -> Result<(), Error> {
        self.flush_head()?;
        if !body.is_empty() {
            trace!("Send body fragment of {} bytes", body.len());
            self.writer.write_all(body)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Formatted variant of [`send`](Self::send).
    ///
    /// ```rust
    /// use hpd_httpd::{Response, Status};
    ///
    /// let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
    /// res.send_fmt(format_args!("value={}", 42)).unwrap();
    /// assert!(res.into_inner().ends_with(b"value=42"));
    /// ```
    pub fn send_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        self.flush_head()?;
        self.writer.write_fmt(args)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Give back the transport.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn head_mut(&mut self) -> Result<&mut String, Error> {
        self.head
            .as_mut()
            .ok_or_else(|| Error::state("cannot add header, headers already sent"))
    }

    fn flush_head(&mut self) -> Result<(), Error> {
        if let Some(mut head) = self.head.take() {
            debug!("Sending response: {}", self.status);
            head.push_str(CRLF);
            self.writer.write_all(head.as_bytes())?;
        }
        Ok(())
    }
}

fn has_line_break(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}

/// Structured `Set-Cookie` fields (RFC 6265).
///
/// ```rust
/// use hpd_httpd::Cookie;
///
/// let c = Cookie::new("sid", "abc").path("/").http_only();
/// assert_eq!(c.header_value(), "sid=abc; Path=/; HttpOnly");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie<'a> {
    name: &'a str,
    value: &'a str,
    expires: Option<&'a str>,
    max_age: Option<&'a str>,
    domain: Option<&'a str>,
    path: Option<&'a str>,
    secure: bool,
    http_only: bool,
    extension: Option<&'a str>,
}

impl<'a> Cookie<'a> {
    /// A `name=value` cookie with no attributes.
    pub fn new(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            value,
            ..Self::default()
        }
    }

    /// `Expires`, an HTTP date.
    pub fn expires(mut self, expires: &'a str) -> Self {
        self.expires = Some(expires);
        self
    }

    /// `Max-Age` in seconds.
    pub fn max_age(mut self, max_age: &'a str) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// `Domain` attribute.
    pub fn domain(mut self, domain: &'a str) -> Self {
        self.domain = Some(domain);
        self
    }

    /// `Path` attribute.
    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    /// Add the `Secure` flag.
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Add the `HttpOnly` flag.
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Free-form attribute appended last, e.g. `SameSite=Strict`.
    pub fn extension(mut self, extension: &'a str) -> Self {
        self.extension = Some(extension);
        self
    }

    /// The value of the `Set-Cookie` header, attributes in RFC 6265 order.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        let attrs = [
            ("Expires", self.expires),
            ("Max-Age", self.max_age),
            ("Domain", self.domain),
            ("Path", self.path),
        ];
        for (attr, value) in attrs {
            if let Some(value) = value {
                out.push_str("; ");
                out.push_str(attr);
                out.push('=');
                out.push_str(value);
            }
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(ext) = self.extension {
            out.push_str("; ");
            out.push_str(ext);
        }
        out
    }
}
