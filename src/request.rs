//! The per-request state machine.
//!
//! A [`RequestMachine`] receives [`Event`]s from the byte tokenizer, drives
//! its [`UrlDecomposer`] and [`HeaderAccumulator`], and invokes the owning
//! application's [`Handler`] callbacks in a fixed order:
//!
//! ```text
//! Start --begin--> Begun --url--> InUrl --url--> InUrl
//! InUrl --field--> InHeaderField        (url complete is synthesized first)
//! InUrl --headers complete--> HeadersComplete   (same)
//! InHeaderField <--field/value--> InHeaderValue
//! InHeaderValue --headers complete--> HeadersComplete
//! HeadersComplete --body--> InBody --body--> InBody
//! HeadersComplete | InBody --message complete--> Complete
//! ```
//!
//! `Stopped` and `Error` are reachable from every other state.

use std::net::SocketAddr;

use log::{debug, trace, warn};

use crate::error::Error;
use crate::header::{HeaderAccumulator, store_pair};
use crate::map::FieldMap;
use crate::types::{Flow, HttpMethod};
use crate::url::{UrlDecomposer, UrlVisitor};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One tokenizer event. Fragments carry no terminator and never line up
/// with logical boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    MessageBegin,
    /// A URL fragment, with the method the tokenizer read before it.
    Url {
        method: HttpMethod,
        fragment: &'a [u8],
    },
    HeaderField(&'a [u8]),
    HeaderValue(&'a [u8]),
    HeadersComplete,
    Body(&'a [u8]),
    MessageComplete,
}

impl Event<'_> {
    /// Short kebab-case name, used in logs and traces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageBegin => "message-begin",
            Self::Url { .. } => "url",
            Self::HeaderField(_) => "header-field",
            Self::HeaderValue(_) => "header-value",
            Self::HeadersComplete => "headers-complete",
            Self::Body(_) => "body",
            Self::MessageComplete => "message-complete",
        }
    }
}

/// Lifecycle state of a [`RequestMachine`], in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Start,
    Begun,
    InUrl,
    InHeaderField,
    InHeaderValue,
    HeadersComplete,
    InBody,
    Complete,
    /// A handler asked to stop. Further events are ignored.
    Stopped,
    /// An event arrived that the current state cannot accept, or a
    /// sub-parser rejected its input.
    Error,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Application callbacks for one request.
///
/// Data callbacks receive fragments exactly as the tokenizer produced them;
/// a header name may arrive as `Ho` and then `st`. Return
/// [`Flow::Stop`] from any callback to cancel parsing of the request. The
/// connection stays usable, so a response can still be sent.
///
/// Per-request state lives in [`Request::set_data`]; `on_destroy` is the
/// place to release it.
#[allow(unused_variables)]
pub trait Handler {
    /// Per-request user data type.
    type Data;

    fn on_begin(&mut self, req: &mut Request<Self::Data>) -> Flow {
        Flow::Continue
    }

    fn on_method(&mut self, req: &mut Request<Self::Data>, method: HttpMethod) -> Flow {
        Flow::Continue
    }

    fn on_url(&mut self, req: &mut Request<Self::Data>, fragment: &[u8]) -> Flow {
        Flow::Continue
    }

    /// The URL is fully decomposed: [`Request::url`] and the arguments are
    /// available from here on.
    fn on_url_complete(&mut self, req: &mut Request<Self::Data>) -> Flow {
        Flow::Continue
    }

    fn on_header_field(&mut self, req: &mut Request<Self::Data>, fragment: &[u8]) -> Flow {
        Flow::Continue
    }

    fn on_header_value(&mut self, req: &mut Request<Self::Data>, fragment: &[u8]) -> Flow {
        Flow::Continue
    }

    /// All headers and cookies are available from here on.
    fn on_headers_complete(&mut self, req: &mut Request<Self::Data>) -> Flow {
        Flow::Continue
    }

    fn on_body(&mut self, req: &mut Request<Self::Data>, fragment: &[u8]) -> Flow {
        Flow::Continue
    }

    fn on_complete(&mut self, req: &mut Request<Self::Data>) -> Flow {
        Flow::Continue
    }

    /// Called once when the request is torn down, whatever state it is in.
    fn on_destroy(&mut self, req: &mut Request<Self::Data>) {}
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything decoded from one inbound request so far.
#[derive(Debug)]
pub struct Request<D = ()> {
    method: Option<HttpMethod>,
    protocol: Option<String>,
    host: Option<String>,
    port: Option<String>,
    url: Option<String>,
    segments: Vec<String>,
    headers: FieldMap,
    arguments: FieldMap,
    cookies: FieldMap,
    data: Option<D>,
    keep_open: bool,
    peer: Option<SocketAddr>,
}

impl<D> Request<D> {
    fn new(peer: Option<SocketAddr>) -> Self {
        Self {
            method: None,
            protocol: None,
            host: None,
            port: None,
            url: None,
            segments: Vec::new(),
            headers: FieldMap::new(),
            arguments: FieldMap::new(),
            cookies: FieldMap::new(),
            data: None,
            keep_open: false,
            peer,
        }
    }

    /// The request method, known from the first URL fragment on.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    /// The decomposed path, without query. Set when the URL completes.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Scheme of an absolute-form target such as `http://host/path`.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Host of an absolute-form target.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Port of an absolute-form target, as written.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// The path segments, in order, as reported by the URL decomposer.
    pub fn path_segments(&self) -> &[String] {
        &self.segments
    }

    /// All headers, repeated names folded into one entry.
    pub fn headers(&self) -> &FieldMap {
        &self.headers
    }

    /// Header value by exact field name. Repeated headers are folded.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get_str(key)
    }

    /// All query arguments.
    pub fn arguments(&self) -> &FieldMap {
        &self.arguments
    }

    /// Query argument by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get_str(key)
    }

    /// All cookies split out of `Cookie` headers.
    pub fn cookies(&self) -> &FieldMap {
        &self.cookies
    }

    /// Cookie value by name.
    pub fn cookie(&self, key: &str) -> Option<&str> {
        self.cookies.get_str(key)
    }

    /// Remote address, if the transport supplied one.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Ask the transport not to apply its idle timeout to this connection.
    /// Needed by long-lived streaming responses.
    pub fn keep_open(&mut self) {
        debug!("Request asked to keep its connection open");
        self.keep_open = true;
    }

    /// Whether a handler called [`keep_open`](Self::keep_open).
    pub fn is_kept_open(&self) -> bool {
        self.keep_open
    }

    /// User data attached by a handler.
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// Mutable access to the attached user data.
    pub fn data_mut(&mut self) -> Option<&mut D> {
        self.data.as_mut()
    }

    /// Attach user data, returning whatever was attached before.
    pub fn set_data(&mut self, data: D) -> Option<D> {
        self.data.replace(data)
    }

    /// Detach the user data.
    pub fn take_data(&mut self) -> Option<D> {
        self.data.take()
    }
}

/// Routes URL components into the request's fields.
struct UrlSink<'a, D>(&'a mut Request<D>);

impl<D> UrlVisitor for UrlSink<'_, D> {
    fn on_protocol(&mut self, protocol: &[u8]) -> Result<(), Error> {
        self.0.protocol = Some(String::from_utf8_lossy(protocol).into_owned());
        Ok(())
    }

    fn on_host(&mut self, host: &[u8]) -> Result<(), Error> {
        self.0.host = Some(String::from_utf8_lossy(host).into_owned());
        Ok(())
    }

    fn on_port(&mut self, port: &[u8]) -> Result<(), Error> {
        self.0.port = Some(String::from_utf8_lossy(port).into_owned());
        Ok(())
    }

    fn on_path_segment(&mut self, segment: &[u8]) -> Result<(), Error> {
        self.0
            .segments
            .try_reserve(1)
            .map_err(|_| Error::Allocation)?;
        self.0
            .segments
            .push(String::from_utf8_lossy(segment).into_owned());
        Ok(())
    }

    fn on_path_complete(&mut self, path: &[u8]) -> Result<(), Error> {
        self.0.url = Some(String::from_utf8_lossy(path).into_owned());
        Ok(())
    }

    fn on_key_value(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.0.arguments.set(key, value)
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Drives one request through its lifecycle. See the [module docs](self).
///
/// ```rust
/// use hpd_httpd::{Event, Handler, HttpMethod, RequestMachine};
///
/// struct App;
/// impl Handler for App {
///     type Data = ();
/// }
///
/// let mut app = App;
/// let mut m = RequestMachine::new();
/// m.handle(&mut app, Event::MessageBegin).unwrap();
/// m.handle(&mut app, Event::Url { method: HttpMethod::GET, fragment: b"/dev" }).unwrap();
/// m.handle(&mut app, Event::Url { method: HttpMethod::GET, fragment: b"ices?id=1" }).unwrap();
/// m.handle(&mut app, Event::HeadersComplete).unwrap();
///
/// assert_eq!(m.request().url(), Some("/devices"));
/// assert_eq!(m.request().argument("id"), Some("1"));
/// ```
#[derive(Debug)]
pub struct RequestMachine<D = ()> {
    state: RequestState,
    stop_code: u32,
    request: Request<D>,
    url_parser: UrlDecomposer,
    header_parser: HeaderAccumulator,
}

impl<D> RequestMachine<D> {
    /// A machine for a request with no known peer.
    pub fn new() -> Self {
        Self::with_peer(None)
    }

    /// A machine for a request arriving from `peer`.
    pub fn with_peer(peer: Option<SocketAddr>) -> Self {
        Self {
            state: RequestState::Start,
            stop_code: 0,
            request: Request::new(peer),
            url_parser: UrlDecomposer::new(),
            header_parser: HeaderAccumulator::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// The request decoded so far.
    pub fn request(&self) -> &Request<D> {
        &self.request
    }

    /// Mutable access to the request, e.g. to take its user data.
    pub fn request_mut(&mut self) -> &mut Request<D> {
        &mut self.request
    }

    /// Returns `true` once the message is complete or parsing has ended.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            RequestState::Complete | RequestState::Stopped | RequestState::Error
        )
    }

    /// Process one tokenizer event.
    ///
    /// Returns the handler's [`Flow`]. After a handler has stopped the
    /// request, every further event is accepted without callbacks and
    /// returns the same `Flow::Stop` code.
    ///
    /// # Errors
    ///
    /// [`Error::State`] when the event cannot follow the current state,
    /// and any error from the URL decomposer or header accumulator. Both
    /// move the machine to [`RequestState::Error`], after which every
    /// event is rejected.
    pub fn handle<H>(&mut self, handler: &mut H, event: Event<'_>) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        match self.state {
            RequestState::Stopped => return Ok(Flow::Stop(self.stop_code)),
            RequestState::Error => {
                return Err(Error::state(format!(
                    "{} event on a failed request",
                    event.name()
                )));
            }
            _ => {}
        }

        let result = self.dispatch(handler, event);
        match &result {
            Ok(Flow::Stop(code)) => {
                debug!("Handler stopped request on {} (code {code})", event.name());
                self.stop_code = *code;
                self.state = RequestState::Stopped;
            }
            Ok(Flow::Continue) => {}
            Err(e) => {
                warn!("Request failed on {} in state {:?}: {e}", event.name(), self.state);
                self.state = RequestState::Error;
            }
        }
        result
    }

    /// Deliver [`Event::MessageBegin`].
    pub fn message_begin<H>(&mut self, handler: &mut H) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::MessageBegin)
    }

    /// Deliver one [`Event::Url`] fragment.
    pub fn url_fragment<H>(
        &mut self,
        handler: &mut H,
        method: HttpMethod,
        fragment: &[u8],
    ) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::Url { method, fragment })
    }

    /// Deliver one [`Event::HeaderField`] fragment.
    pub fn header_field<H>(&mut self, handler: &mut H, fragment: &[u8]) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::HeaderField(fragment))
    }

    /// Deliver one [`Event::HeaderValue`] fragment.
    pub fn header_value<H>(&mut self, handler: &mut H, fragment: &[u8]) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::HeaderValue(fragment))
    }

    /// Deliver [`Event::HeadersComplete`].
    pub fn headers_complete<H>(&mut self, handler: &mut H) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::HeadersComplete)
    }

    /// Deliver one [`Event::Body`] fragment.
    pub fn body<H>(&mut self, handler: &mut H, fragment: &[u8]) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::Body(fragment))
    }

    /// Deliver [`Event::MessageComplete`].
    pub fn message_complete<H>(&mut self, handler: &mut H) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.handle(handler, Event::MessageComplete)
    }

    /// Tear the request down, firing `on_destroy`.
    pub fn destroy<H>(mut self, handler: &mut H)
    where
        H: Handler<Data = D> + ?Sized,
    {
        trace!("Destroy request in state {:?}", self.state);
        handler.on_destroy(&mut self.request);
    }

    fn dispatch<H>(&mut self, handler: &mut H, event: Event<'_>) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        use RequestState as S;

        match (self.state, event) {
            (S::Start, Event::MessageBegin) => {
                self.enter(S::Begun);
                Ok(handler.on_begin(&mut self.request))
            }
            (S::Begun, Event::Url { method, fragment }) => {
                self.request.method = Some(method);
                self.enter(S::InUrl);
                if let stop @ Flow::Stop(_) = handler.on_method(&mut self.request, method) {
                    return Ok(stop);
                }
                self.add_url(handler, fragment)
            }
            (S::InUrl, Event::Url { fragment, .. }) => self.add_url(handler, fragment),
            (S::InUrl, Event::HeaderField(fragment)) => {
                if let stop @ Flow::Stop(_) = self.complete_url(handler)? {
                    return Ok(stop);
                }
                self.enter(S::InHeaderField);
                self.add_header_field(handler, fragment)
            }
            (S::InHeaderField | S::InHeaderValue, Event::HeaderField(fragment)) => {
                self.enter(S::InHeaderField);
                self.add_header_field(handler, fragment)
            }
            (S::InHeaderField | S::InHeaderValue, Event::HeaderValue(fragment)) => {
                self.enter(S::InHeaderValue);
                self.header_parser.value_fragment(fragment)?;
                Ok(handler.on_header_value(&mut self.request, fragment))
            }
            (S::InUrl, Event::HeadersComplete) => {
                if let stop @ Flow::Stop(_) = self.complete_url(handler)? {
                    return Ok(stop);
                }
                self.complete_headers(handler)
            }
            (S::InHeaderValue, Event::HeadersComplete) => self.complete_headers(handler),
            (S::HeadersComplete | S::InBody, Event::Body(fragment)) => {
                self.enter(S::InBody);
                Ok(handler.on_body(&mut self.request, fragment))
            }
            (S::HeadersComplete | S::InBody, Event::MessageComplete) => {
                self.enter(S::Complete);
                Ok(handler.on_complete(&mut self.request))
            }
            (state, event) => Err(Error::state(format!(
                "unexpected {} event in state {state:?}",
                event.name()
            ))),
        }
    }

    fn enter(&mut self, next: RequestState) {
        if self.state != next {
            trace!("Request state {:?} -> {next:?}", self.state);
            self.state = next;
        }
    }

    fn add_url<H>(&mut self, handler: &mut H, fragment: &[u8]) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.url_parser
            .add_fragment(fragment, &mut UrlSink(&mut self.request))?;
        Ok(handler.on_url(&mut self.request, fragment))
    }

    /// The tokenizer never says the URL ended; the first header field or
    /// the end of an empty header block implies it.
    fn complete_url<H>(&mut self, handler: &mut H) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        self.url_parser.complete(&mut UrlSink(&mut self.request))?;
        trace!(
            "URL complete: {}",
            String::from_utf8_lossy(self.url_parser.as_bytes())
        );
        Ok(handler.on_url_complete(&mut self.request))
    }

    fn add_header_field<H>(&mut self, handler: &mut H, fragment: &[u8]) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        let Request {
            headers, cookies, ..
        } = &mut self.request;
        self.header_parser
            .field_fragment(fragment, |field, value| {
                store_pair(headers, cookies, field, value)
            })?;
        Ok(handler.on_header_field(&mut self.request, fragment))
    }

    fn complete_headers<H>(&mut self, handler: &mut H) -> Result<Flow, Error>
    where
        H: Handler<Data = D> + ?Sized,
    {
        let Request {
            headers, cookies, ..
        } = &mut self.request;
        self.header_parser
            .complete(|field, value| store_pair(headers, cookies, field, value))?;
        self.enter(RequestState::HeadersComplete);
        Ok(handler.on_headers_complete(&mut self.request))
    }
}

impl<D> Default for RequestMachine<D> {
    fn default() -> Self {
        Self::new()
    }
}
