use std::net::SocketAddr;

use log::{debug, trace};

use crate::error::Error;
use crate::request::{Handler, Request, RequestMachine, RequestState};
use crate::tokenizer::{ParseStatus, ParserConfig, Tokenizer};

/// One connection's inbound side: a [`Tokenizer`] feeding a
/// [`RequestMachine`].
///
/// Each transport read goes to [`receive`](Self::receive). When a request
/// completes and more bytes follow in the same read, the finished request is
/// destroyed and a fresh one starts on the remaining bytes. The last request
/// stays inspectable until the next read arrives or the session is closed.
///
/// ```rust
/// use hpd_httpd::{Handler, ParseStatus, Session};
///
/// struct App;
/// impl Handler for App {
///     type Data = ();
/// }
///
/// let mut session = Session::new(None);
/// let status = session
///     .receive(&mut App, b"GET /lamp?on=1 HTTP/1.1\r\nHost: hpd\r\n\r\n")
///     .unwrap();
///
/// assert!(matches!(status, ParseStatus::Complete(_)));
/// assert_eq!(session.request().url(), Some("/lamp"));
/// assert_eq!(session.request().argument("on"), Some("1"));
/// session.close(&mut App);
/// ```
#[derive(Debug)]
pub struct Session<D = ()> {
    tokenizer: Tokenizer,
    machine: RequestMachine<D>,
    peer: Option<SocketAddr>,
    completed: usize,
}

impl<D> Session<D> {
    /// A session with default tokenizer limits.
    pub fn new(peer: Option<SocketAddr>) -> Self {
        Self::with_config(ParserConfig::default(), peer)
    }

    /// A session with custom tokenizer limits.
    pub fn with_config(config: ParserConfig, peer: Option<SocketAddr>) -> Self {
        Self {
            tokenizer: Tokenizer::with_config(config),
            machine: RequestMachine::with_peer(peer),
            peer,
            completed: 0,
        }
    }

    /// Feed one transport read.
    ///
    /// # Errors
    ///
    /// Tokenizer errors and request machine errors alike. The session
    /// cannot recover from either; the caller should answer and close.
    pub fn receive<H>(&mut self, handler: &mut H, data: &[u8]) -> Result<ParseStatus, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        let mut rest = data;
        loop {
            if self.tokenizer.is_complete() {
                if rest.is_empty() {
                    return Ok(ParseStatus::Complete(self.tokenizer.bytes_consumed()));
                }
                self.next_request(handler);
            }

            let before = self.tokenizer.bytes_consumed();
            let machine = &mut self.machine;
            let status = self
                .tokenizer
                .feed(rest, |event| machine.handle(handler, event))?;

            match status {
                ParseStatus::Complete(total) => {
                    self.completed += 1;
                    let used = total - before;
                    trace!("Request {} complete after {used} bytes", self.completed);
                    if used >= rest.len() {
                        return Ok(status);
                    }
                    rest = &rest[used..];
                }
                ParseStatus::Incomplete | ParseStatus::Stopped(_) => return Ok(status),
            }
        }
    }

    /// The current (or last completed) request.
    pub fn request(&self) -> &Request<D> {
        self.machine.request()
    }

    /// Mutable access to the current request.
    pub fn request_mut(&mut self) -> &mut Request<D> {
        self.machine.request_mut()
    }

    /// Lifecycle state of the current request.
    pub fn state(&self) -> RequestState {
        self.machine.state()
    }

    /// The byte tokenizer, e.g. for the protocol version.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Number of requests completed on this connection.
    pub fn requests_completed(&self) -> usize {
        self.completed
    }

    /// Tear the connection down, destroying the current request.
    pub fn close<H>(self, handler: &mut H)
    where
        H: Handler<Data = D> + ?Sized,
    {
        debug!("Closing session after {} requests", self.completed);
        self.machine.destroy(handler);
    }

    fn next_request<H>(&mut self, handler: &mut H)
    where
        H: Handler<Data = D> + ?Sized,
    {
        let done = std::mem::replace(&mut self.machine, RequestMachine::with_peer(self.peer));
        done.destroy(handler);
        self.tokenizer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Flow;

    #[derive(Default)]
    struct Counter {
        urls: Vec<String>,
        destroyed: usize,
    }

    impl Handler for Counter {
        type Data = ();

        fn on_url_complete(&mut self, req: &mut Request) -> Flow {
            self.urls.push(req.url().unwrap_or_default().to_string());
            Flow::Continue
        }

        fn on_destroy(&mut self, _: &mut Request) {
            self.destroyed += 1;
        }
    }

    #[test]
    fn pipelined_requests_each_get_a_machine() {
        let mut h = Counter::default();
        let mut s = Session::new(None);
        let status = s
            .receive(&mut h, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n")
            .unwrap();
        assert!(matches!(status, ParseStatus::Complete(_)));
        assert_eq!(h.urls, vec!["/a", "/b"]);
        assert_eq!(s.requests_completed(), 2);
        assert_eq!(h.destroyed, 1);
        assert_eq!(s.request().url(), Some("/b"));

        s.close(&mut h);
        assert_eq!(h.destroyed, 2);
    }

    #[test]
    fn next_read_starts_a_new_request() {
        let mut h = Counter::default();
        let mut s = Session::new(None);
        s.receive(&mut h, b"GET /one HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(s.state(), RequestState::Complete);
        s.receive(&mut h, b"GET /two HTTP/1.1\r\n").unwrap();
        assert_eq!(s.state(), RequestState::InUrl);
        s.receive(&mut h, b"\r\n").unwrap();
        assert_eq!(h.urls, vec!["/one", "/two"]);
    }

    #[test]
    fn empty_read_after_completion_changes_nothing() {
        let mut h = Counter::default();
        let mut s = Session::new(None);
        s.receive(&mut h, b"GET /a HTTP/1.1\r\n\r\n").unwrap();
        let status = s.receive(&mut h, b"").unwrap();
        assert!(matches!(status, ParseStatus::Complete(_)));
        assert_eq!(s.requests_completed(), 1);
        assert_eq!(h.destroyed, 0);
    }

    #[test]
    fn machine_error_surfaces_from_receive() {
        let mut h = Counter::default();
        let mut s = Session::new(None);
        let err = s
            .receive(&mut h, b"GET /bad\"quote HTTP/1.1\r\n\r\n")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Argument);
        assert_eq!(s.state(), RequestState::Error);
    }
}
