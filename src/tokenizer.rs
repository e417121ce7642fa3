use log::{debug, trace, warn};

use crate::error::{Error, ParseError, try_extend};
use crate::request::Event;
use crate::types::{Flow, HttpMethod, HttpVersion};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits for the tokenizer.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length of the HTTP method token (default: 16).
    pub max_method_len: usize,
    /// Maximum length of the request URL (default: 8 192).
    pub max_url_len: usize,
    /// Maximum length of a single header field name (default: 256).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 8 192).
    pub max_header_value_len: usize,
    /// Maximum number of header fields (default: 128).
    pub max_headers_count: usize,
    /// Maximum body size (default: 10 MiB).
    pub max_body_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_method_len: 16,
            max_url_len: 8_192,
            max_header_name_len: 256,
            max_header_value_len: 8_192,
            max_headers_count: 128,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse status
// ---------------------------------------------------------------------------

/// Outcome of a [`Tokenizer::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The tokenizer has consumed a complete HTTP request.
    /// The contained value is the **total** number of bytes consumed so far
    /// (across all `feed` calls). Any bytes past this offset belong to the
    /// next request (HTTP pipelining).
    Complete(usize),
    /// More data is needed before the request is complete.
    Incomplete,
    /// The event sink stopped the request with the given code. Every later
    /// byte is swallowed.
    Stopped(u32),
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    // ---- Request line ----
    Start,
    Method,
    Url,
    Version,
    VersionLf,

    // ---- Header section ----
    HeaderStart,
    HeaderName,
    HeaderValueOws,
    HeaderValue,
    HeaderValueLf,

    // ---- Transition to body ----
    EndHeadersLf,

    // ---- Fixed-length body ----
    Body,

    // ---- Chunked transfer encoding ----
    ChunkSize,
    ChunkExt,
    ChunkSizeLf,
    ChunkData,
    ChunkDataCr,
    ChunkDataLf,

    // ---- Chunked trailers ----
    TrailerStart,
    TrailerField,
    TrailerFieldLf,
    TrailerEndLf,

    // ---- Done ----
    Complete,
    Stopped,
    Failed,
}

/// Hand `$event` to the sink; a `Stop` halts the tokenizer on the spot.
macro_rules! emit {
    ($self:ident, $sink:ident, $event:expr) => {
        if let Flow::Stop(code) = $sink($event)? {
            return Ok($self.halt(code));
        }
    };
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// An incremental, state-machine-based HTTP/1.1 request tokenizer.
///
/// Bytes go in through [`feed`](Self::feed); [`Event`]s come out through a
/// sink closure, in the order a
/// [`RequestMachine`](crate::RequestMachine) expects them. URL, header and
/// body fragments are slices of the fed data and never span two reads.
///
/// # Usage
///
/// ```rust
/// use hpd_httpd::{Flow, ParseStatus, Tokenizer};
///
/// let mut tokenizer = Tokenizer::new();
/// let mut names = Vec::new();
///
/// let status = tokenizer
///     .feed(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n", |event| {
///         names.push(event.name());
///         Ok(Flow::Continue)
///     })
///     .unwrap();
///
/// assert!(matches!(status, ParseStatus::Complete(_)));
/// assert_eq!(names.first(), Some(&"message-begin"));
/// assert_eq!(names.last(), Some(&"message-complete"));
/// ```
#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    config: ParserConfig,
    bytes_consumed: usize,
    stop_code: u32,

    // Accumulation buffers
    method_buf: Vec<u8>,
    version_buf: Vec<u8>,
    header_name_buf: Vec<u8>,
    header_value_buf: Vec<u8>,
    chunk_size_buf: Vec<u8>,
    /// Whitespace at the end of a read inside a header value. Emitted once
    /// more content follows, dropped at CR.
    pending_ows: Vec<u8>,
    value_emitted: bool,
    url_len: usize,
    headers_count: usize,

    // Parsed components
    method: Option<HttpMethod>,
    version: Option<HttpVersion>,

    // Body framing
    content_length: Option<usize>,
    chunked: bool,
    upgrade_header: bool,
    connection_upgrade: bool,
    body_received: usize,
    body_remaining: usize,
    chunk_remaining: usize,
}

impl Tokenizer {
    /// Create a new tokenizer with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a new tokenizer with custom limits.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            state: State::Start,
            config,
            bytes_consumed: 0,
            stop_code: 0,
            method_buf: Vec::with_capacity(8),
            version_buf: Vec::with_capacity(8),
            header_name_buf: Vec::with_capacity(32),
            header_value_buf: Vec::with_capacity(128),
            chunk_size_buf: Vec::with_capacity(16),
            pending_ows: Vec::new(),
            value_emitted: false,
            url_len: 0,
            headers_count: 0,
            method: None,
            version: None,
            content_length: None,
            chunked: false,
            upgrade_header: false,
            connection_upgrade: false,
            body_received: 0,
            body_remaining: 0,
            chunk_remaining: 0,
        }
    }

    /// Reset the tokenizer so it can read the next request on the same
    /// connection. Limits are kept.
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    /// The limits this tokenizer enforces.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Feed one transport read into the tokenizer.
    ///
    /// Every event is handed to `sink` as soon as it is recognised. Returns
    /// [`ParseStatus::Complete`] once a full request has been consumed,
    /// [`ParseStatus::Stopped`] once the sink has returned
    /// [`Flow::Stop`], or [`ParseStatus::Incomplete`] otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] on any protocol violation or limit breach, or
    /// whatever error the sink returns. The tokenizer is unusable after
    /// an error.
    pub fn feed<F>(&mut self, data: &[u8], mut sink: F) -> Result<ParseStatus, Error>
    where
        F: FnMut(Event<'_>) -> Result<Flow, Error>,
    {
        match self.state {
            State::Stopped => {
                self.bytes_consumed += data.len();
                return Ok(ParseStatus::Stopped(self.stop_code));
            }
            State::Failed => return Err(Error::state("tokenizer failed on an earlier read")),
            _ => {}
        }

        let result = self.run(data, &mut sink);
        if let Err(e) = &result {
            warn!("Tokenizer failed after {} bytes: {e}", self.bytes_consumed);
            self.state = State::Failed;
        }
        result
    }

    fn run<F>(&mut self, data: &[u8], sink: &mut F) -> Result<ParseStatus, Error>
    where
        F: FnMut(Event<'_>) -> Result<Flow, Error>,
    {
        let mut i = 0;
        // Start of the URL, header name or header value run in `data` that
        // has not been emitted yet.
        let mut mark: Option<usize> = None;
        // Start of the trailing whitespace inside that run (values only).
        let mut ows_from: Option<usize> = None;

        while i < data.len() {
            // Fast exit when already done (supports trailing data / pipelining).
            if self.state == State::Complete {
                return Ok(ParseStatus::Complete(self.bytes_consumed));
            }

            // ----- Bulk paths for body states -----
            match self.state {
                State::Body => {
                    let to_copy = (data.len() - i).min(self.body_remaining);
                    let chunk = &data[i..i + to_copy];
                    self.body_remaining -= to_copy;
                    self.bytes_consumed += to_copy;
                    i += to_copy;

                    if self.body_remaining == 0 {
                        self.state = State::Complete;
                    }
                    emit!(self, sink, Event::Body(chunk));
                    if self.state == State::Complete {
                        emit!(self, sink, Event::MessageComplete);
                    }
                    continue;
                }
                State::ChunkData => {
                    let to_copy = (data.len() - i).min(self.chunk_remaining);
                    let chunk = &data[i..i + to_copy];
                    self.chunk_remaining -= to_copy;
                    self.body_received += to_copy;
                    self.bytes_consumed += to_copy;
                    i += to_copy;

                    if self.chunk_remaining == 0 {
                        self.state = State::ChunkDataCr;
                    }
                    emit!(self, sink, Event::Body(chunk));
                    continue;
                }
                _ => {}
            }

            // ----- Byte-by-byte path -----
            let pos = i;
            let byte = data[pos];
            self.bytes_consumed += 1;
            i += 1;

            match self.state {
                // ===================== REQUEST LINE =====================
                State::Start => {
                    // Tolerate stray CRLF between pipelined requests.
                    if byte == b'\r' || byte == b'\n' {
                        continue;
                    }
                    if !is_tchar(byte) {
                        return Err(ParseError::UnexpectedByte {
                            expected: "token character in request method",
                            found: byte,
                        }
                        .into());
                    }
                    self.method_buf.push(byte);
                    self.state = State::Method;
                    trace!("Message begin");
                    emit!(self, sink, Event::MessageBegin);
                }

                State::Method => {
                    if byte == b' ' {
                        let method = HttpMethod::from_bytes(&self.method_buf);
                        if method == HttpMethod::Unknown {
                            debug!(
                                "Extension method {}",
                                String::from_utf8_lossy(&self.method_buf)
                            );
                        }
                        // CONNECT turns the connection into a tunnel.
                        if method == HttpMethod::CONNECT {
                            return Err(ParseError::UpgradeNotSupported.into());
                        }
                        self.method = Some(method);
                        self.state = State::Url;
                    } else if is_tchar(byte) {
                        if self.method_buf.len() >= self.config.max_method_len {
                            return Err(ParseError::InvalidMethod("method too long".into()).into());
                        }
                        self.method_buf.push(byte);
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "token character or SP in request method",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::Url => {
                    if byte == b' ' {
                        if self.url_len == 0 {
                            return Err(ParseError::InvalidUrl("empty URL".into()).into());
                        }
                        self.state = State::Version;
                        if let Some(start) = mark.take() {
                            emit!(self, sink, self.url_event(&data[start..pos])?);
                        }
                    } else if byte > b' ' && byte != 0x7F {
                        if self.url_len >= self.config.max_url_len {
                            return Err(ParseError::InvalidUrl("URL too long".into()).into());
                        }
                        self.url_len += 1;
                        mark.get_or_insert(pos);
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "visible character or SP in request URL",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::Version => {
                    if byte == b'\r' {
                        self.version = Some(HttpVersion::from_bytes(&self.version_buf)?);
                        self.state = State::VersionLf;
                    } else if byte >= b' ' && byte != 0x7F {
                        if self.version_buf.len() >= 16 {
                            return Err(
                                ParseError::InvalidVersion("version string too long".into()).into()
                            );
                        }
                        self.version_buf.push(byte);
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "version character or CR",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::VersionLf => {
                    expect_lf(byte, "LF after version CR")?;
                    self.state = State::HeaderStart;
                }

                // ===================== HEADERS =====================
                State::HeaderStart => {
                    if byte == b'\r' {
                        // End of header section.
                        self.state = State::EndHeadersLf;
                    } else if is_tchar(byte) {
                        if self.headers_count >= self.config.max_headers_count {
                            return Err(ParseError::TooManyHeaders.into());
                        }
                        self.headers_count += 1;
                        self.header_name_buf.clear();
                        self.header_name_buf.push(byte);
                        mark = Some(pos);
                        self.state = State::HeaderName;
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "header name character or CR",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::HeaderName => {
                    if byte == b':' {
                        self.header_value_buf.clear();
                        self.pending_ows.clear();
                        self.value_emitted = false;
                        self.state = State::HeaderValueOws;
                        if let Some(start) = mark.take() {
                            emit!(self, sink, Event::HeaderField(&data[start..pos]));
                        }
                    } else if is_tchar(byte) {
                        if self.header_name_buf.len() >= self.config.max_header_name_len {
                            return Err(ParseError::HeaderTooLarge.into());
                        }
                        self.header_name_buf.push(byte);
                        mark.get_or_insert(pos);
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "header name character or ':'",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::HeaderValueOws => {
                    if byte == b' ' || byte == b'\t' {
                        // Skip optional whitespace before the value.
                    } else if byte == b'\r' {
                        self.end_header_value()?;
                        self.value_emitted = true;
                        emit!(self, sink, Event::HeaderValue(&[]));
                    } else if is_field_content_byte(byte) {
                        self.header_value_buf.push(byte);
                        mark = Some(pos);
                        ows_from = None;
                        self.state = State::HeaderValue;
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "header value character, OWS, or CR",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::HeaderValue => {
                    if byte == b'\r' {
                        let run = mark.take().map(|start| (start, ows_from.take().unwrap_or(pos)));
                        self.pending_ows.clear();
                        self.end_header_value()?;
                        match run {
                            Some((start, end)) if start < end => {
                                self.value_emitted = true;
                                emit!(self, sink, Event::HeaderValue(&data[start..end]));
                            }
                            _ if !self.value_emitted => {
                                self.value_emitted = true;
                                emit!(self, sink, Event::HeaderValue(&[]));
                            }
                            _ => {}
                        }
                    } else if is_field_content_byte(byte) {
                        if self.header_value_buf.len() >= self.config.max_header_value_len {
                            return Err(ParseError::HeaderTooLarge.into());
                        }
                        self.header_value_buf.push(byte);
                        mark.get_or_insert(pos);
                        if byte == b' ' || byte == b'\t' {
                            ows_from.get_or_insert(pos);
                        } else {
                            ows_from = None;
                            if !self.pending_ows.is_empty() {
                                self.value_emitted = true;
                                emit!(self, sink, Event::HeaderValue(&self.pending_ows));
                                self.pending_ows.clear();
                            }
                        }
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "header value character or CR",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::HeaderValueLf => {
                    expect_lf(byte, "LF after header value CR")?;
                    self.state = State::HeaderStart;
                }

                // ===================== END OF HEADERS =====================
                State::EndHeadersLf => {
                    expect_lf(byte, "LF after end-of-headers CR")?;
                    self.determine_body_handling()?;
                    let bodiless = self.state == State::Complete;
                    emit!(self, sink, Event::HeadersComplete);
                    if bodiless {
                        emit!(self, sink, Event::MessageComplete);
                    }
                }

                // ===================== CHUNKED ENCODING =====================
                State::ChunkSize => {
                    if byte == b'\r' {
                        self.apply_chunk_size()?;
                        self.state = State::ChunkSizeLf;
                    } else if byte == b';' {
                        self.apply_chunk_size()?;
                        self.state = State::ChunkExt;
                    } else if byte.is_ascii_hexdigit() {
                        if self.chunk_size_buf.len() >= 16 {
                            return Err(ParseError::InvalidChunkSize("chunk size too long".into()).into());
                        }
                        self.chunk_size_buf.push(byte);
                    } else {
                        return Err(ParseError::UnexpectedByte {
                            expected: "hex digit, ';', or CR in chunk size",
                            found: byte,
                        }
                        .into());
                    }
                }

                State::ChunkExt => {
                    // RFC 9112 §7.1.1: ignore chunk extensions.
                    if byte == b'\r' {
                        self.state = State::ChunkSizeLf;
                    }
                }

                State::ChunkSizeLf => {
                    expect_lf(byte, "LF after chunk size CR")?;
                    if self.chunk_remaining == 0 {
                        // Last chunk, trailer section follows.
                        self.state = State::TrailerStart;
                    } else {
                        self.state = State::ChunkData;
                    }
                }

                // ChunkData is handled by the bulk path above.
                State::ChunkDataCr => {
                    if byte != b'\r' {
                        return Err(ParseError::UnexpectedByte {
                            expected: "CR after chunk data",
                            found: byte,
                        }
                        .into());
                    }
                    self.state = State::ChunkDataLf;
                }

                State::ChunkDataLf => {
                    expect_lf(byte, "LF after chunk data CR")?;
                    self.chunk_size_buf.clear();
                    self.state = State::ChunkSize;
                }

                // ===================== TRAILER SECTION =====================
                State::TrailerStart => {
                    if byte == b'\r' {
                        self.state = State::TrailerEndLf;
                    } else {
                        // Trailer fields are skipped.
                        self.state = State::TrailerField;
                    }
                }

                State::TrailerField => {
                    if byte == b'\r' {
                        self.state = State::TrailerFieldLf;
                    }
                }

                State::TrailerFieldLf => {
                    expect_lf(byte, "LF after trailer field CR")?;
                    self.state = State::TrailerStart;
                }

                State::TrailerEndLf => {
                    expect_lf(byte, "LF after trailer-section end CR")?;
                    self.state = State::Complete;
                    emit!(self, sink, Event::MessageComplete);
                }

                State::Body
                | State::ChunkData
                | State::Complete
                | State::Stopped
                | State::Failed => {
                    return Err(Error::state(format!(
                        "tokenizer reached byte path in state {:?}",
                        self.state
                    )));
                }
            }
        }

        // ----- Flush runs cut off by the end of this read -----
        match (self.state, mark) {
            (State::Url, Some(start)) => {
                emit!(self, sink, self.url_event(&data[start..])?);
            }
            (State::HeaderName, Some(start)) => {
                emit!(self, sink, Event::HeaderField(&data[start..]));
            }
            (State::HeaderValue, Some(start)) => {
                let end = ows_from.unwrap_or(data.len());
                try_extend(&mut self.pending_ows, &data[end..])?;
                if start < end {
                    self.value_emitted = true;
                    emit!(self, sink, Event::HeaderValue(&data[start..end]));
                }
            }
            _ => {}
        }

        if self.state == State::Complete {
            Ok(ParseStatus::Complete(self.bytes_consumed))
        } else {
            Ok(ParseStatus::Incomplete)
        }
    }

    // ----- helpers --------------------------------------------------------

    fn halt(&mut self, code: u32) -> ParseStatus {
        debug!("Event sink stopped the request (code {code})");
        self.state = State::Stopped;
        self.stop_code = code;
        ParseStatus::Stopped(code)
    }

    fn url_event<'a>(&self, fragment: &'a [u8]) -> Result<Event<'a>, Error> {
        let method = self
            .method
            .ok_or_else(|| Error::state("URL fragment before request method"))?;
        Ok(Event::Url { method, fragment })
    }

    /// Record what the just-finished header means for body framing.
    fn end_header_value(&mut self) -> Result<(), ParseError> {
        // Trim trailing OWS from the value.
        while self
            .header_value_buf
            .last()
            .is_some_and(|&b| b == b' ' || b == b'\t')
        {
            self.header_value_buf.pop();
        }
        self.state = State::HeaderValueLf;

        let name = &self.header_name_buf;
        let value = &self.header_value_buf;

        if name.eq_ignore_ascii_case(b"content-length") {
            let text = String::from_utf8_lossy(value);
            let length: usize = text
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidContentLength(text.trim().to_string()))?;
            // RFC 9112 §6.3: multiple differing Content-Length values are an error.
            if self.content_length.is_some_and(|cl| cl != length) {
                return Err(ParseError::InvalidContentLength(
                    "multiple differing Content-Length values".into(),
                ));
            }
            self.content_length = Some(length);
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            if contains_token(value, b"chunked") {
                self.chunked = true;
            }
        } else if name.eq_ignore_ascii_case(b"upgrade") {
            self.upgrade_header = true;
        } else if name.eq_ignore_ascii_case(b"connection") && contains_token(value, b"upgrade") {
            self.connection_upgrade = true;
        }
        Ok(())
    }

    /// Decide how to read the body once the header block has ended.
    fn determine_body_handling(&mut self) -> Result<(), ParseError> {
        if self.upgrade_header && self.connection_upgrade {
            return Err(ParseError::UpgradeNotSupported);
        }

        // Transfer-Encoding takes precedence over Content-Length (RFC 9112 §6.1).
        if self.chunked {
            self.chunk_size_buf.clear();
            self.state = State::ChunkSize;
            return Ok(());
        }

        match self.content_length {
            Some(length) if length > self.config.max_body_size => {
                return Err(ParseError::BodyTooLarge);
            }
            Some(length) if length > 0 => {
                self.body_remaining = length;
                self.state = State::Body;
            }
            // No body indication, or an empty one.
            _ => self.state = State::Complete,
        }
        Ok(())
    }

    /// Parse the hex chunk-size that was accumulated in `chunk_size_buf`.
    fn apply_chunk_size(&mut self) -> Result<(), ParseError> {
        if self.chunk_size_buf.is_empty() {
            return Err(ParseError::InvalidChunkSize("empty chunk size".into()));
        }

        let size_str = String::from_utf8_lossy(&self.chunk_size_buf);
        let size = usize::from_str_radix(&size_str, 16)
            .map_err(|_| ParseError::InvalidChunkSize(size_str.clone().into_owned()))?;

        if self.body_received.saturating_add(size) > self.config.max_body_size {
            return Err(ParseError::BodyTooLarge);
        }

        self.chunk_remaining = size;
        Ok(())
    }

    // ----- public query ---------------------------------------------------

    /// The request method, once the request line has been read.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    /// The protocol version, once the request line has been read.
    pub fn version(&self) -> Option<HttpVersion> {
        self.version
    }

    /// Returns `true` when a complete HTTP request has been consumed.
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Returns `true` once the event sink has stopped the request.
    pub fn is_stopped(&self) -> bool {
        self.state == State::Stopped
    }

    /// Total number of bytes consumed across all `feed` calls.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110 / RFC 9112)
// ---------------------------------------------------------------------------

fn expect_lf(byte: u8, expected: &'static str) -> Result<(), ParseError> {
    if byte == b'\n' {
        Ok(())
    } else {
        Err(ParseError::UnexpectedByte {
            expected,
            found: byte,
        })
    }
}

/// Case-insensitive search for a comma-separated list element.
fn contains_token(value: &[u8], token: &[u8]) -> bool {
    value
        .split(|&b| b == b',')
        .any(|item| item.trim_ascii().eq_ignore_ascii_case(token))
}

/// `tchar` – characters allowed in HTTP tokens (method, header names).
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Bytes permitted inside a header field value:
/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------
