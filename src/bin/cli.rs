use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser};
use log::{LevelFilter, info};

use hpd_httpd::{
    Flow, Handler, HttpMethod, ParseStatus, ParserConfig, Request, RequestSnapshot, Response,
    Session, Status, format_debug, format_headers_only, format_json,
};

/// hpd-httpd CLI — run a raw HTTP request through the gateway's request layer.
///
/// Reads a raw HTTP request from a file, --raw string, or stdin, feeds it
/// to the incremental request machine in fragments, and prints the
/// decomposed request in the chosen format.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP request as a single shell argument.
#[derive(ClapParser)]
#[command(name = "hpd-httpd-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP request.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP request string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Feed the input in reads of this many bytes (default: all at once).
    #[arg(long, value_name = "N")]
    fragment_size: Option<usize>,

    /// Answer the request with this status code and print the response bytes.
    #[arg(long, value_name = "CODE")]
    respond: Option<u16>,

    /// Maximum allowed body size in bytes.
    #[arg(long, default_value = "10485760")]
    max_body_size: usize,

    /// Maximum number of headers allowed.
    #[arg(long, default_value = "128")]
    max_headers: usize,

    /// Maximum request URL length.
    #[arg(long, default_value = "8192")]
    max_url_len: usize,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Request-line + headers only
    Headers,
    /// One line per lifecycle callback
    Events,
}

/// Records every callback as a line and collects the body.
#[derive(Default)]
struct Trace {
    lines: Vec<String>,
}

impl Trace {
    fn log(&mut self, line: String) -> Flow {
        self.lines.push(line);
        Flow::Continue
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Handler for Trace {
    type Data = Vec<u8>;

    fn on_begin(&mut self, _: &mut Request<Vec<u8>>) -> Flow {
        self.log("begin".into())
    }

    fn on_method(&mut self, _: &mut Request<Vec<u8>>, method: HttpMethod) -> Flow {
        self.log(format!("method {method}"))
    }

    fn on_url(&mut self, _: &mut Request<Vec<u8>>, fragment: &[u8]) -> Flow {
        self.log(format!("url {:?}", lossy(fragment)))
    }

    fn on_url_complete(&mut self, req: &mut Request<Vec<u8>>) -> Flow {
        let url = req.url().unwrap_or_default().to_owned();
        self.log(format!("url complete {url:?}"))
    }

    fn on_header_field(&mut self, _: &mut Request<Vec<u8>>, fragment: &[u8]) -> Flow {
        self.log(format!("header field {:?}", lossy(fragment)))
    }

    fn on_header_value(&mut self, _: &mut Request<Vec<u8>>, fragment: &[u8]) -> Flow {
        self.log(format!("header value {:?}", lossy(fragment)))
    }

    fn on_headers_complete(&mut self, req: &mut Request<Vec<u8>>) -> Flow {
        let count = req.headers().len();
        self.log(format!("headers complete ({count})"))
    }

    fn on_body(&mut self, req: &mut Request<Vec<u8>>, fragment: &[u8]) -> Flow {
        match req.data_mut() {
            Some(body) => body.extend_from_slice(fragment),
            None => {
                req.set_data(fragment.to_vec());
            }
        }
        self.log(format!("body {} bytes", fragment.len()))
    }

    fn on_complete(&mut self, _: &mut Request<Vec<u8>>) -> Flow {
        self.log("complete".into())
    }

    fn on_destroy(&mut self, _: &mut Request<Vec<u8>>) {
        self.lines.push("destroy".into());
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let status = match cli.respond.map(Status::from_code).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let config = ParserConfig {
        max_body_size: cli.max_body_size,
        max_headers_count: cli.max_headers,
        max_url_len: cli.max_url_len,
        ..ParserConfig::default()
    };

    let mut trace = Trace::default();
    let mut session = Session::with_config(config, None);
    let fragment_size = cli.fragment_size.unwrap_or(data.len()).max(1);

    let mut outcome = ParseStatus::Incomplete;
    for chunk in data.chunks(fragment_size) {
        outcome = match session.receive(&mut trace, chunk) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Parse error: {e}");
                process::exit(2);
            }
        };
    }
    info!("Fed {} bytes in reads of {fragment_size}: {outcome:?}", data.len());

    if outcome == ParseStatus::Incomplete {
        eprintln!("Parse error: incomplete request");
        process::exit(2);
    }

    let version = session.tokenizer().version();
    let body = session.request_mut().take_data();
    let snapshot = RequestSnapshot::capture(session.request(), version, body);

    let output = match cli.format {
        OutputFormat::Json => format_json(&snapshot, cli.pretty),
        OutputFormat::Debug => format_debug(&snapshot),
        OutputFormat::Headers => format_headers_only(&snapshot),
        OutputFormat::Events => String::new(),
    };
    print!("{output}");

    if let Some(status) = status {
        let mut wire = Vec::new();
        if let Err(e) = respond(&mut wire, status, &snapshot) {
            eprintln!("Response error: {e}");
            process::exit(3);
        }
        print!("{}", String::from_utf8_lossy(&wire));
    }

    session.close(&mut trace);
    if cli.format == OutputFormat::Events {
        for line in &trace.lines {
            println!("{line}");
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Echo the decomposed path back as a small plain-text body.
fn respond(
    wire: &mut Vec<u8>,
    status: Status,
    snapshot: &RequestSnapshot,
) -> Result<(), hpd_httpd::Error> {
    let mut res = Response::new(wire, status)?;
    res.add_header("Content-Type", "text/plain")?;
    res.send_fmt(format_args!(
        "{}\n",
        snapshot.url.as_deref().unwrap_or("")
    ))
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
