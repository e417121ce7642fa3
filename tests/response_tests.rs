use hpd_httpd::{Cookie, ErrorKind, Flow, Handler, Request, Response, Session, Status};

// =========================================================================
// Wire format
// =========================================================================

#[test]
fn minimal_response_wire_format() {
    let mut res = Response::new(Vec::new(), Status::NoContent).unwrap();
    res.send(&[]).unwrap();
    assert_eq!(
        res.into_inner(),
        b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn headers_keep_insertion_order() {
    let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
    res.add_header("Content-Type", "application/json").unwrap();
    res.add_header("Cache-Control", "no-cache").unwrap();
    res.send(b"{}").unwrap();

    let wire = String::from_utf8(res.into_inner()).unwrap();
    assert_eq!(
        wire,
        "HTTP/1.1 200 OK\r\n\
         Connection: close\r\n\
         Content-Type: application/json\r\n\
         Cache-Control: no-cache\r\n\
         \r\n\
         {}"
    );
}

#[test]
fn every_status_has_a_status_line() {
    for code in [100, 200, 206, 301, 306, 404, 414, 500, 505] {
        let status = Status::from_code(code).unwrap();
        let mut res = Response::new(Vec::new(), status).unwrap();
        res.send(&[]).unwrap();
        let wire = String::from_utf8(res.into_inner()).unwrap();
        assert!(
            wire.starts_with(&format!("HTTP/1.1 {code} {}\r\n", status.reason())),
            "bad status line for {code}: {wire:?}"
        );
    }
}

#[test]
fn unknown_status_code_is_rejected() {
    let err = Status::from_code(299).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

// =========================================================================
// Send semantics
// =========================================================================

#[test]
fn add_header_after_send_is_state_error() {
    let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
    res.send(b"first").unwrap();
    let err = res.add_header("X-Late", "1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    // The body can keep streaming.
    res.send(b" second").unwrap();
    assert!(res.into_inner().ends_with(b"\r\n\r\nfirst second"));
}

#[test]
fn cookie_header_uses_its_own_path() {
    let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
    res.add_cookie(&Cookie::new("sid", "1").domain("hpd.local").path("/api"))
        .unwrap();
    res.send(&[]).unwrap();
    let wire = String::from_utf8(res.into_inner()).unwrap();
    assert!(wire.contains("Set-Cookie: sid=1; Domain=hpd.local; Path=/api\r\n"));
}

#[test]
fn cookie_without_name_is_rejected() {
    let mut res = Response::new(Vec::new(), Status::Ok).unwrap();
    let err = res.add_cookie(&Cookie::new("", "v")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

// =========================================================================
// Answering from a handler
// =========================================================================

/// Streams an event feed on `/events`, 404s everything else.
#[derive(Default)]
struct Gateway {
    wire: Vec<u8>,
}

impl Handler for Gateway {
    type Data = ();

    fn on_headers_complete(&mut self, req: &mut Request) -> Flow {
        if req.url() == Some("/events") {
            req.keep_open();
        }
        Flow::Continue
    }

    fn on_complete(&mut self, req: &mut Request) -> Flow {
        let result = if req.is_kept_open() {
            Response::new(&mut self.wire, Status::Ok).and_then(|mut res| {
                res.add_header("Content-Type", "text/event-stream")?;
                for n in 1..=3 {
                    res.send_fmt(format_args!("data: {n}\n\n"))?;
                }
                Ok(())
            })
        } else {
            Response::new(&mut self.wire, Status::NotFound).and_then(|mut res| res.send(&[]))
        };
        match result {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Stop(500),
        }
    }
}

#[test]
fn handler_streams_response() {
    let mut app = Gateway::default();
    let mut session = Session::new(None);
    session
        .receive(&mut app, b"GET /events HTTP/1.1\r\nAccept: text/event-stream\r\n\r\n")
        .unwrap();
    assert!(session.request().is_kept_open());

    let wire = String::from_utf8(app.wire).unwrap();
    assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(wire.ends_with("\r\n\r\ndata: 1\n\ndata: 2\n\ndata: 3\n\n"));
}

#[test]
fn handler_answers_not_found() {
    let mut app = Gateway::default();
    let mut session = Session::new(None);
    session.receive(&mut app, b"GET /nope HTTP/1.1\r\n\r\n").unwrap();
    assert!(!session.request().is_kept_open());
    assert_eq!(
        app.wire,
        b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n"
    );
}
