//! Incremental URL decomposition.
//!
//! [`UrlDecomposer`] accepts a request target in arbitrary fragments and
//! reports its components to a [`UrlVisitor`] as soon as each one is known
//! to be complete. Every byte is classified exactly once: the decomposer
//! keeps all received bytes in one buffer and only scans the range it has
//! not seen yet.
//!
//! Supported shapes:
//!
//! ```text
//! /path/segments?key=value&key=value
//! protocol://host[:port][/path/segments[?key=value&...]]
//! ```

use log::{trace, warn};

use crate::error::{Error, try_extend};

/// Receives URL components from a [`UrlDecomposer`].
///
/// All methods default to doing nothing. Returning an error puts the
/// decomposer into its error state and aborts the current call.
pub trait UrlVisitor {
    fn on_protocol(&mut self, _protocol: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn on_host(&mut self, _host: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn on_port(&mut self, _port: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// One `/`-delimited path segment, without the slashes.
    fn on_path_segment(&mut self, _segment: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// The full path, from its leading `/` up to `?` or the end.
    fn on_path_complete(&mut self, _path: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// One query argument. A key without `=` has an empty value; a pair
    /// with an empty key is never reported.
    fn on_key_value(&mut self, _key: &[u8], _value: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// The whole URL, after every other component has been reported.
    fn on_complete(&mut self, _url: &[u8]) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Protocol,
    PostProtocolSlash1,
    PostProtocolSlash2,
    Host,
    PrePort,
    Port,
    PathSegment,
    QueryKey,
    QueryValue,
    Done,
    Error,
}

/// A component recorded as an offset into the decomposer's buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn at(start: usize) -> Self {
        Self { start, len: 0 }
    }

    /// Close the span just before `end`.
    fn close(&mut self, end: usize) {
        self.len = end - self.start;
    }

    fn of<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.start + self.len]
    }
}

/// Incremental URL parser. See the [module docs](self).
#[derive(Debug)]
pub struct UrlDecomposer {
    state: State,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already classified.
    scanned: usize,

    protocol: Option<Span>,
    host: Option<Span>,
    port: Option<Span>,
    path: Option<Span>,
    segment: Span,
    key: Span,
    value: Span,
}

impl UrlDecomposer {
    /// A decomposer waiting for the first URL byte.
    pub fn new() -> Self {
        Self {
            state: State::Start,
            buffer: Vec::with_capacity(256),
            scanned: 0,
            protocol: None,
            host: None,
            port: None,
            path: None,
            segment: Span::default(),
            key: Span::default(),
            value: Span::default(),
        }
    }

    /// Append a fragment and classify the bytes it adds.
    ///
    /// # Errors
    ///
    /// [`Error::Argument`] for a byte that is not legal in a URL or a
    /// malformed `protocol://` prefix, [`Error::State`] if the decomposer
    /// already completed or failed, and whatever the visitor returns.
    pub fn add_fragment<V: UrlVisitor + ?Sized>(
        &mut self,
        chunk: &[u8],
        visitor: &mut V,
    ) -> Result<(), Error> {
        match self.state {
            State::Done => return Err(Error::state("URL fragment after URL completed")),
            State::Error => return Err(Error::state("URL decomposer is in an error state")),
            _ => {}
        }
        try_extend(&mut self.buffer, chunk).inspect_err(|_| self.state = State::Error)?;

        while self.scanned < self.buffer.len() {
            let pos = self.scanned;
            let c = self.buffer[pos];
            if !is_url_byte(c) {
                warn!("Invalid character 0x{c:02X} in URL at offset {pos}");
                self.state = State::Error;
                return Err(Error::argument(format!("invalid character 0x{c:02X} in URL")));
            }
            self.step(pos, c, visitor)
                .inspect_err(|_| self.state = State::Error)?;
            self.scanned += 1;
        }
        Ok(())
    }

    /// Signal that no more URL bytes are coming.
    ///
    /// Reports whichever component is still open (the last path segment
    /// and the path, the last query pair, the host or the port) and then
    /// the whole URL.
    ///
    /// # Errors
    ///
    /// [`Error::Argument`] if the URL is empty or stops inside the
    /// `protocol://` prefix or right after the port colon, and
    /// [`Error::State`] if called twice or after an error.
    pub fn complete<V: UrlVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<(), Error> {
        self.finish(visitor)
            .inspect_err(|_| self.state = State::Error)?;
        self.state = State::Done;
        visitor.on_complete(&self.buffer[..self.scanned])
    }

    fn finish<V: UrlVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<(), Error> {
        let end = self.scanned;
        let buf = self.buffer.as_slice();
        match self.state {
            State::PathSegment => {
                self.segment.close(end);
                visitor.on_path_segment(self.segment.of(buf))?;
                let path = self.path.get_or_insert(Span::at(end));
                path.close(end);
                visitor.on_path_complete(path.of(buf))
            }
            State::QueryKey => {
                self.key.close(end);
                if self.key.len > 0 {
                    visitor.on_key_value(self.key.of(buf), &[])?;
                }
                Ok(())
            }
            State::QueryValue => {
                self.value.close(end);
                if self.key.len > 0 {
                    visitor.on_key_value(self.key.of(buf), self.value.of(buf))?;
                }
                Ok(())
            }
            State::Host => {
                let host = self.host.get_or_insert(Span::at(end));
                host.close(end);
                visitor.on_host(host.of(buf))
            }
            State::Port => {
                let port = self.port.get_or_insert(Span::at(end));
                port.close(end);
                visitor.on_port(port.of(buf))
            }
            State::Start => Err(Error::argument("empty URL")),
            State::Protocol
            | State::PostProtocolSlash1
            | State::PostProtocolSlash2
            | State::PrePort => Err(Error::argument("URL ends unexpectedly")),
            State::Done => Err(Error::state("URL already completed")),
            State::Error => Err(Error::state("URL decomposer is in an error state")),
        }
    }

    fn step<V: UrlVisitor + ?Sized>(
        &mut self,
        pos: usize,
        c: u8,
        visitor: &mut V,
    ) -> Result<(), Error> {
        let buf = self.buffer.as_slice();
        match self.state {
            State::Start => {
                if c == b'/' {
                    self.begin_path(pos);
                } else {
                    self.protocol = Some(Span::at(pos));
                    self.state = State::Protocol;
                }
            }
            State::Protocol => {
                if c == b':' {
                    if let Some(protocol) = self.protocol.as_mut() {
                        protocol.close(pos);
                        visitor.on_protocol(protocol.of(buf))?;
                    }
                    self.state = State::PostProtocolSlash1;
                }
            }
            State::PostProtocolSlash1 | State::PostProtocolSlash2 => {
                if c != b'/' {
                    return Err(Error::argument("expected '//' after URL protocol"));
                }
                if self.state == State::PostProtocolSlash1 {
                    self.state = State::PostProtocolSlash2;
                } else {
                    self.host = Some(Span::at(pos + 1));
                    self.state = State::Host;
                }
            }
            State::Host => {
                if c == b':' || c == b'/' {
                    if let Some(host) = self.host.as_mut() {
                        host.close(pos);
                        visitor.on_host(host.of(buf))?;
                    }
                    if c == b':' {
                        self.state = State::PrePort;
                    } else {
                        self.begin_path(pos);
                    }
                }
            }
            State::PrePort => {
                if c == b'/' {
                    return Err(Error::argument("empty port in URL"));
                }
                self.port = Some(Span::at(pos));
                self.state = State::Port;
            }
            State::Port => {
                if c == b'/' {
                    if let Some(port) = self.port.as_mut() {
                        port.close(pos);
                        visitor.on_port(port.of(buf))?;
                    }
                    self.begin_path(pos);
                }
            }
            State::PathSegment => {
                if c == b'/' || c == b'?' {
                    self.segment.close(pos);
                    visitor.on_path_segment(self.segment.of(buf))?;
                    self.segment = Span::at(pos + 1);
                }
                if c == b'?' {
                    if let Some(path) = self.path.as_mut() {
                        path.close(pos);
                        visitor.on_path_complete(path.of(buf))?;
                    }
                    self.key = Span::at(pos + 1);
                    self.state = State::QueryKey;
                }
            }
            State::QueryKey => match c {
                b'=' => {
                    self.key.close(pos);
                    self.value = Span::at(pos + 1);
                    self.state = State::QueryValue;
                }
                b'&' => {
                    self.key.close(pos);
                    if self.key.len > 0 {
                        visitor.on_key_value(self.key.of(buf), &[])?;
                    }
                    self.key = Span::at(pos + 1);
                }
                _ => {}
            },
            State::QueryValue => {
                if c == b'&' {
                    self.value.close(pos);
                    if self.key.len > 0 {
                        visitor.on_key_value(self.key.of(buf), self.value.of(buf))?;
                    }
                    self.key = Span::at(pos + 1);
                    self.state = State::QueryKey;
                }
            }
            State::Done | State::Error => {
                return Err(Error::state("URL decomposer cannot accept data"));
            }
        }
        Ok(())
    }

    fn begin_path(&mut self, pos: usize) {
        trace!("URL path starts at offset {pos}");
        self.path = Some(Span::at(pos));
        self.segment = Span::at(pos + 1);
        self.state = State::PathSegment;
    }

    /// Every URL byte received so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The path, once it is known to be complete.
    pub fn path(&self) -> Option<&[u8]> {
        if self.state == State::PathSegment {
            return None;
        }
        self.path.map(|s| s.of(&self.buffer))
    }

    /// Returns `true` once [`complete`](Self::complete) has succeeded.
    pub fn is_complete(&self) -> bool {
        self.state == State::Done
    }
}

impl Default for UrlDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes allowed unencoded in a URL: RFC 3986 unreserved and reserved
/// characters plus `%`.
#[inline]
fn is_url_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b':'
                | b'/'
                | b'?'
                | b'#'
                | b'['
                | b']'
                | b'@'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b'%'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[derive(Default, Debug)]
    struct Recorder {
        protocol: Option<String>,
        host: Option<String>,
        port: Option<String>,
        segments: Vec<String>,
        path: Option<String>,
        args: Vec<(String, String)>,
        url: Option<String>,
    }

    fn s(b: &[u8]) -> String {
        String::from_utf8_lossy(b).into_owned()
    }

    impl UrlVisitor for Recorder {
        fn on_protocol(&mut self, p: &[u8]) -> Result<(), Error> {
            self.protocol = Some(s(p));
            Ok(())
        }
        fn on_host(&mut self, h: &[u8]) -> Result<(), Error> {
            self.host = Some(s(h));
            Ok(())
        }
        fn on_port(&mut self, p: &[u8]) -> Result<(), Error> {
            self.port = Some(s(p));
            Ok(())
        }
        fn on_path_segment(&mut self, seg: &[u8]) -> Result<(), Error> {
            self.segments.push(s(seg));
            Ok(())
        }
        fn on_path_complete(&mut self, p: &[u8]) -> Result<(), Error> {
            self.path = Some(s(p));
            Ok(())
        }
        fn on_key_value(&mut self, k: &[u8], v: &[u8]) -> Result<(), Error> {
            self.args.push((s(k), s(v)));
            Ok(())
        }
        fn on_complete(&mut self, url: &[u8]) -> Result<(), Error> {
            self.url = Some(s(url));
            Ok(())
        }
    }

    fn decompose(fragments: &[&[u8]]) -> Result<Recorder, Error> {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        for f in fragments {
            up.add_fragment(f, &mut rec)?;
        }
        up.complete(&mut rec)?;
        Ok(rec)
    }

    #[test]
    fn origin_form_path_and_query() {
        let rec = decompose(&[b"/foo/bar?a=1&b=2"]).unwrap();
        assert_eq!(rec.path.as_deref(), Some("/foo/bar"));
        assert_eq!(rec.segments, vec!["foo", "bar"]);
        assert_eq!(
            rec.args,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(rec.url.as_deref(), Some("/foo/bar?a=1&b=2"));
    }

    #[test]
    fn last_segment_reported_on_complete() {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        up.add_fragment(b"/foo/bar", &mut rec).unwrap();
        assert_eq!(rec.segments, vec!["foo"]);
        assert!(rec.path.is_none());
        assert!(up.path().is_none());

        up.complete(&mut rec).unwrap();
        assert_eq!(up.as_bytes(), b"/foo/bar");
        assert_eq!(rec.segments, vec!["foo", "bar"]);
        assert_eq!(rec.path.as_deref(), Some("/foo/bar"));
        assert_eq!(up.path(), Some(b"/foo/bar".as_slice()));
        assert!(up.is_complete());
    }

    #[test]
    fn last_pair_reported_on_complete() {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        up.add_fragment(b"/x?k=v", &mut rec).unwrap();
        assert!(rec.args.is_empty());
        up.complete(&mut rec).unwrap();
        assert_eq!(rec.args, vec![("k".to_string(), "v".to_string())]);
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let url = b"http://gateway.local:8080/devices/lamp?id=7&on=1";
        let whole = decompose(&[url]).unwrap();
        let pieces: Vec<&[u8]> = url.chunks(1).collect();
        let split = decompose(&pieces).unwrap();

        assert_eq!(whole.protocol.as_deref(), Some("http"));
        assert_eq!(whole.host.as_deref(), Some("gateway.local"));
        assert_eq!(whole.port.as_deref(), Some("8080"));
        assert_eq!(whole.path.as_deref(), Some("/devices/lamp"));
        assert_eq!(whole.segments, vec!["devices", "lamp"]);

        assert_eq!(split.protocol, whole.protocol);
        assert_eq!(split.host, whole.host);
        assert_eq!(split.port, whole.port);
        assert_eq!(split.segments, whole.segments);
        assert_eq!(split.args, whole.args);
        assert_eq!(split.url, whole.url);
    }

    #[test]
    fn absolute_url_without_path() {
        let rec = decompose(&[b"http://", b"host"]).unwrap();
        assert_eq!(rec.host.as_deref(), Some("host"));
        assert!(rec.path.is_none());

        let rec = decompose(&[b"http://host:", b"80"]).unwrap();
        assert_eq!(rec.host.as_deref(), Some("host"));
        assert_eq!(rec.port.as_deref(), Some("80"));
    }

    #[test]
    fn root_path_has_one_empty_segment() {
        let rec = decompose(&[b"/"]).unwrap();
        assert_eq!(rec.path.as_deref(), Some("/"));
        assert_eq!(rec.segments, vec![""]);
    }

    #[test]
    fn value_keeps_extra_equals_and_key_without_value() {
        let rec = decompose(&[b"/q?expr=a=b&flag&x=1"]).unwrap();
        assert_eq!(
            rec.args,
            vec![
                ("expr".to_string(), "a=b".to_string()),
                ("flag".to_string(), "".to_string()),
                ("x".to_string(), "1".to_string()),
            ]
        );

        let rec = decompose(&[b"/q?"]).unwrap();
        assert!(rec.args.is_empty());
        assert_eq!(rec.path.as_deref(), Some("/q"));
    }

    #[test]
    fn pairs_with_empty_key_are_skipped() {
        let rec = decompose(&[b"/q?=1&&a"]).unwrap();
        assert_eq!(rec.args, vec![("a".to_string(), "".to_string())]);

        let rec = decompose(&[b"/q?a=1&=2"]).unwrap();
        assert_eq!(rec.args, vec![("a".to_string(), "1".to_string())]);

        let pieces: Vec<&[u8]> = b"/q?=x&k=v".chunks(1).collect();
        let rec = decompose(&pieces).unwrap();
        assert_eq!(rec.args, vec![("k".to_string(), "v".to_string())]);
    }

    #[test]
    fn illegal_byte_is_argument_error() {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        let err = up.add_fragment(b"/foo\x01", &mut rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        // The decomposer stays failed.
        let err = up.add_fragment(b"bar", &mut rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn illegal_byte_in_later_fragment() {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        up.add_fragment(b"/ok", &mut rec).unwrap();
        assert!(up.add_fragment(b" space", &mut rec).is_err());
    }

    #[test]
    fn truncated_urls_fail_on_complete() {
        for url in [&b""[..], b"http", b"http:", b"http:/", b"http://host:"] {
            let err = decompose(&[url]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Argument, "url {:?}", s(url));
        }
        assert!(decompose(&[b"http:x"]).is_err());
        assert!(decompose(&[b"http://host:/p"]).is_err());
    }

    #[test]
    fn complete_twice_is_state_error() {
        let mut up = UrlDecomposer::new();
        let mut rec = Recorder::default();
        up.add_fragment(b"/a", &mut rec).unwrap();
        up.complete(&mut rec).unwrap();
        assert_eq!(up.complete(&mut rec).unwrap_err().kind(), ErrorKind::State);
        assert_eq!(
            up.add_fragment(b"/b", &mut rec).unwrap_err().kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn visitor_error_stops_decomposer() {
        struct Refuse;
        impl UrlVisitor for Refuse {
            fn on_path_segment(&mut self, _: &[u8]) -> Result<(), Error> {
                Err(Error::argument("refused"))
            }
        }
        let mut up = UrlDecomposer::new();
        assert!(up.add_fragment(b"/a/b", &mut Refuse).is_err());
        assert!(up.complete(&mut Refuse).is_err());
    }

    #[test]
    fn url_byte_classification() {
        for &b in b"azAZ09-._~:/?#[]@!$&'()*+,;=%" {
            assert!(is_url_byte(b), "expected URL byte 0x{b:02X}");
        }
        for &b in b" \t\r\n\"<>\\^`{|}\x00\x7f" {
            assert!(!is_url_byte(b), "expected non-URL byte 0x{b:02X}");
        }
    }
}
