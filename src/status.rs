use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::Error;

macro_rules! statuses {
    ($($name:ident = $code:literal, $reason:literal;)*) => {
        /// Response status codes understood by the gateway, with their
        /// RFC 2616 reason phrases.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $($name,)*
        }

        impl Status {
            /// Numeric status code.
            pub fn code(self) -> u16 {
                match self {
                    $(Self::$name => $code,)*
                }
            }

            /// Reason phrase used in the status line.
            pub fn reason(self) -> &'static str {
                match self {
                    $(Self::$name => $reason,)*
                }
            }

            /// Look up a status by its numeric code.
            pub fn from_code(code: u16) -> Result<Self, Error> {
                match code {
                    $($code => Ok(Self::$name),)*
                    _ => Err(Error::Argument(format!("unknown status code {code}"))),
                }
            }
        }
    };
}

statuses! {
    Continue = 100, "Continue";
    SwitchingProtocols = 101, "Switching Protocols";
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritativeInformation = 203, "Non-Authoritative Information";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    SeeOther = 303, "See Other";
    NotModified = 304, "Not Modified";
    UseProxy = 305, "Use Proxy";
    Unused = 306, "(Unused)";
    TemporaryRedirect = 307, "Temporary Redirect";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    ProxyAuthenticationRequired = 407, "Proxy Authentication Required";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    RequestEntityTooLarge = 413, "Request Entity Too Large";
    RequestUriTooLong = 414, "Request-URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    RequestedRangeNotSatisfiable = 416, "Requested Range Not Satisfiable";
    ExpectationFailed = 417, "Expectation Failed";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    HttpVersionNotSupported = 505, "HTTP Version Not Supported";
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}
