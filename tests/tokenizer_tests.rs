use hpd_httpd::{
    Error, ErrorKind, Event, Flow, HttpMethod, HttpVersion, ParseError, ParseStatus,
    ParserConfig, Tokenizer, parse_request, parse_request_with_config,
};

/// Run `raw` through a fresh tokenizer in one read, counting events.
fn count_events(raw: &[u8]) -> (Result<ParseStatus, Error>, usize) {
    let mut tokenizer = Tokenizer::new();
    let mut events = 0;
    let status = tokenizer.feed(raw, |_| {
        events += 1;
        Ok(Flow::Continue)
    });
    (status, events)
}

fn parse_error(raw: &[u8]) -> ParseError {
    match parse_request(raw) {
        Err(Error::Parse(e)) => e,
        other => panic!("expected a parse error, got {other:?}"),
    }
}

fn limited(config: ParserConfig, raw: &[u8]) -> ParseError {
    match parse_request_with_config(raw, config) {
        Err(Error::Parse(e)) => e,
        other => panic!("expected a parse error, got {other:?}"),
    }
}

// =========================================================================
// Request line
// =========================================================================

#[test]
fn methods_and_versions() {
    let methods = [
        ("GET", HttpMethod::GET),
        ("PUT", HttpMethod::PUT),
        ("OPTIONS", HttpMethod::OPTIONS),
        ("DELETE", HttpMethod::DELETE),
        ("POST", HttpMethod::POST),
    ];
    for (name, expected) in methods {
        let raw = format!("{name} /dev HTTP/1.0\r\n\r\n");
        let snap = parse_request(raw.as_bytes()).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(snap.method, Some(expected), "method {name}");
        assert_eq!(snap.version, Some(HttpVersion::Http10));
    }
}

#[test]
fn extension_method_is_decoded_as_unknown() {
    let snap = parse_request(b"PROPFIND /share?depth=1 HTTP/1.1\r\nDepth: 1\r\n\r\n").unwrap();
    assert_eq!(snap.method, Some(HttpMethod::Unknown));
    assert_eq!(snap.url.as_deref(), Some("/share"));
    assert_eq!(snap.arguments.get_str("depth"), Some("1"));
    assert_eq!(snap.headers.get_str("Depth"), Some("1"));

    let mut tokenizer = Tokenizer::new();
    let mut seen = None;
    tokenizer
        .feed(b"BREW /pot HTTP/1.1\r\n\r\n", |event| {
            if let Event::Url { method, .. } = event {
                seen = Some(method);
            }
            Ok(Flow::Continue)
        })
        .unwrap();
    assert_eq!(seen, Some(HttpMethod::Unknown));
    assert_eq!(tokenizer.method(), Some(HttpMethod::Unknown));
}

#[test]
fn overlong_method_is_rejected() {
    let config = ParserConfig {
        max_method_len: 4,
        ..ParserConfig::default()
    };
    assert!(matches!(
        limited(config, b"PROPFIND /x HTTP/1.1\r\n\r\n"),
        ParseError::InvalidMethod(_)
    ));
}

#[test]
fn http2_version_is_rejected() {
    assert!(matches!(
        parse_error(b"GET / HTTP/2.0\r\n\r\n"),
        ParseError::InvalidVersion(_)
    ));
}

#[test]
fn bare_lf_is_rejected() {
    assert!(matches!(
        parse_error(b"GET / HTTP/1.1\nHost: h\n\n"),
        ParseError::UnexpectedByte { found: b'\n', .. }
    ));
}

#[test]
fn empty_url_is_rejected() {
    assert!(matches!(
        parse_error(b"PUT  HTTP/1.1\r\n\r\n"),
        ParseError::InvalidUrl(_)
    ));
}

#[test]
fn leading_blank_lines_are_skipped() {
    let snap = parse_request(b"\r\n\r\nGET /after-blank HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(snap.url.as_deref(), Some("/after-blank"));
}

// =========================================================================
// Event stream
// =========================================================================

#[test]
fn event_sequence_for_single_read() {
    let mut tokenizer = Tokenizer::new();
    let mut names = Vec::new();
    tokenizer
        .feed(
            b"POST /scene HTTP/1.1\r\nContent-Length: 2\r\n\r\nok",
            |event| {
                names.push(event.name());
                Ok(Flow::Continue)
            },
        )
        .unwrap();
    assert_eq!(
        names,
        vec![
            "message-begin",
            "url",
            "header-field",
            "header-value",
            "headers-complete",
            "body",
            "message-complete",
        ]
    );
}

#[test]
fn url_event_carries_method() {
    let mut tokenizer = Tokenizer::new();
    let mut seen = None;
    tokenizer
        .feed(b"DELETE /rule/4 HTTP/1.1\r\n\r\n", |event| {
            if let Event::Url { method, fragment } = event {
                seen = Some((method, fragment.to_vec()));
            }
            Ok(Flow::Continue)
        })
        .unwrap();
    assert_eq!(seen, Some((HttpMethod::DELETE, b"/rule/4".to_vec())));
}

#[test]
fn sink_error_fails_the_tokenizer() {
    let mut tokenizer = Tokenizer::new();
    let err = tokenizer
        .feed(b"GET / HTTP/1.1\r\n\r\n", |event| match event {
            Event::HeadersComplete => Err(Error::Allocation),
            _ => Ok(Flow::Continue),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Allocation);
    assert!(tokenizer.feed(b"", |_| Ok(Flow::Continue)).is_err());
}

#[test]
fn stop_reports_code_and_swallows_input() {
    let mut tokenizer = Tokenizer::new();
    let status = tokenizer
        .feed(b"GET /x HTTP/1.1\r\n", |event| {
            Ok(match event {
                Event::Url { .. } => Flow::Stop(4),
                _ => Flow::Continue,
            })
        })
        .unwrap();
    assert_eq!(status, ParseStatus::Stopped(4));
    let status = tokenizer.feed(b"\xff\xfe", |_| Ok(Flow::Continue)).unwrap();
    assert_eq!(status, ParseStatus::Stopped(4));
}

// =========================================================================
// Body framing
// =========================================================================

#[test]
fn no_framing_header_means_no_body() {
    let (status, events) = count_events(b"GET / HTTP/1.1\r\nHost: h\r\n\r\nleftover");
    let ParseStatus::Complete(n) = status.unwrap() else {
        panic!("request should complete");
    };
    assert_eq!(n, b"GET / HTTP/1.1\r\nHost: h\r\n\r\n".len());
    // begin, url, field, value, headers complete, message complete
    assert_eq!(events, 6);
}

#[test]
fn content_length_zero_has_no_body() {
    let snap = parse_request(b"POST /x HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();
    assert!(snap.body.is_none());
}

#[test]
fn identical_content_lengths_are_accepted() {
    let snap =
        parse_request(b"PUT /x HTTP/1.1\r\nContent-Length: 2\r\nContent-Length: 2\r\n\r\nhi")
            .unwrap();
    assert_eq!(snap.body_as_str(), Some("hi"));
    assert_eq!(snap.headers.get_str("Content-Length"), Some("2,2"));
}

#[test]
fn differing_content_lengths_are_rejected() {
    assert!(matches!(
        parse_error(b"PUT /x HTTP/1.1\r\nContent-Length: 2\r\nContent-Length: 4\r\n\r\nhi"),
        ParseError::InvalidContentLength(_)
    ));
}

#[test]
fn non_numeric_content_length_is_rejected() {
    assert!(matches!(
        parse_error(b"PUT /x HTTP/1.1\r\nContent-Length: -3\r\n\r\n"),
        ParseError::InvalidContentLength(v) if v == "-3"
    ));
}

#[test]
fn chunked_wins_over_content_length() {
    let snap = parse_request(
        b"POST /x HTTP/1.1\r\nContent-Length: 99\r\nTransfer-Encoding: chunked\r\n\r\n\
          A\r\n0123456789\r\n0\r\n\r\n",
    )
    .unwrap();
    assert_eq!(snap.body_as_str(), Some("0123456789"));
}

#[test]
fn bad_chunk_size_is_rejected() {
    assert!(matches!(
        parse_error(b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n"),
        ParseError::UnexpectedByte { found: b'z', .. }
    ));
}

#[test]
fn incomplete_body_is_not_a_request() {
    let err = parse_request(b"POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn connect_and_upgrade_are_rejected() {
    assert!(matches!(
        parse_error(b"CONNECT hpd.local:443 HTTP/1.1\r\n\r\n"),
        ParseError::UpgradeNotSupported
    ));
    assert!(matches!(
        parse_error(b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: keep-alive, Upgrade\r\n\r\n"),
        ParseError::UpgradeNotSupported
    ));
}

#[test]
fn upgrade_header_alone_is_ignored() {
    let snap = parse_request(b"GET / HTTP/1.1\r\nUpgrade: h2c\r\n\r\n").unwrap();
    assert_eq!(snap.headers.get_str("Upgrade"), Some("h2c"));
}

// =========================================================================
// Configuration limits
// =========================================================================

#[test]
fn limit_body_size() {
    let config = ParserConfig {
        max_body_size: 4,
        ..ParserConfig::default()
    };
    let err = limited(config.clone(), b"PUT /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
    assert_eq!(err, ParseError::BodyTooLarge);

    let err = limited(
        config,
        b"PUT /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
    );
    assert_eq!(err, ParseError::BodyTooLarge);
}

#[test]
fn limit_header_count() {
    let config = ParserConfig {
        max_headers_count: 1,
        ..ParserConfig::default()
    };
    let err = limited(config, b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n");
    assert_eq!(err, ParseError::TooManyHeaders);
}

#[test]
fn limit_url_length() {
    let config = ParserConfig {
        max_url_len: 4,
        ..ParserConfig::default()
    };
    let err = limited(config, b"GET /devices HTTP/1.1\r\n\r\n");
    assert!(matches!(err, ParseError::InvalidUrl(_)));
}

#[test]
fn limit_header_name_and_value() {
    let names = ParserConfig {
        max_header_name_len: 3,
        ..ParserConfig::default()
    };
    assert_eq!(
        limited(names, b"GET / HTTP/1.1\r\nAccept: x\r\n\r\n"),
        ParseError::HeaderTooLarge
    );

    let values = ParserConfig {
        max_header_value_len: 3,
        ..ParserConfig::default()
    };
    assert_eq!(
        limited(values, b"GET / HTTP/1.1\r\nA: four\r\n\r\n"),
        ParseError::HeaderTooLarge
    );
}

// =========================================================================
// Edge cases
// =========================================================================

#[test]
fn obs_text_in_header_value_is_kept() {
    let snap = parse_request(b"GET / HTTP/1.1\r\nX-Room: K\xc3\xbcche\r\n\r\n").unwrap();
    assert_eq!(snap.headers.get_str("X-Room"), Some("Küche"));
}

#[test]
fn large_body_in_small_reads() {
    let body = vec![b'x'; 40_000];
    let mut raw = format!("PUT /fw HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    raw.extend_from_slice(&body);

    let mut tokenizer = Tokenizer::new();
    let mut received = 0;
    let mut status = ParseStatus::Incomplete;
    for chunk in raw.chunks(1_000) {
        status = tokenizer
            .feed(chunk, |event| {
                if let Event::Body(b) = event {
                    received += b.len();
                }
                Ok(Flow::Continue)
            })
            .unwrap();
    }
    assert_eq!(received, body.len());
    assert_eq!(status, ParseStatus::Complete(raw.len()));
}
