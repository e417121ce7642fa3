use log::{trace, warn};

use crate::error::{Error, try_extend};
use crate::map::FieldMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Field,
    Value,
    Completed,
    Error,
}

/// Assembles header field/value fragments into complete pairs.
///
/// Fragments may split a name or value at any byte. A pair is only known
/// to be complete when the next field begins or the header block ends, so
/// both of those steps flush the buffered pair to the caller's `on_pair`
/// closure and then clear the buffers.
#[derive(Debug)]
pub struct HeaderAccumulator {
    state: State,
    field: Vec<u8>,
    value: Vec<u8>,
}

impl HeaderAccumulator {
    /// An empty accumulator waiting for the first field.
    pub fn new() -> Self {
        Self {
            state: State::Field,
            field: Vec::with_capacity(32),
            value: Vec::with_capacity(128),
        }
    }

    /// Append a fragment of a header name.
    ///
    /// If a value was being collected, the previous pair is flushed first.
    pub fn field_fragment<F>(&mut self, chunk: &[u8], on_pair: F) -> Result<(), Error>
    where
        F: FnOnce(&[u8], &[u8]) -> Result<(), Error>,
    {
        match self.state {
            State::Value => {
                self.flush(on_pair)?;
                self.state = State::Field;
            }
            State::Field => {}
            State::Completed => {
                self.state = State::Error;
                return Err(Error::state("received header field after headers completed"));
            }
            State::Error => return Err(Error::state("header accumulator is in an error state")),
        }
        self.append_field(chunk)
    }

    /// Append a fragment of a header value.
    pub fn value_fragment(&mut self, chunk: &[u8]) -> Result<(), Error> {
        match self.state {
            State::Field if self.field.is_empty() => {
                self.state = State::Error;
                Err(Error::state("received header value before any header field"))
            }
            State::Field | State::Value => {
                self.state = State::Value;
                try_extend(&mut self.value, chunk).inspect_err(|_| self.state = State::Error)
            }
            State::Completed => {
                self.state = State::Error;
                Err(Error::state("received header value after headers completed"))
            }
            State::Error => Err(Error::state("header accumulator is in an error state")),
        }
    }

    /// Signal the end of the header block, flushing the last pair.
    ///
    /// A block with no headers at all completes without calling `on_pair`.
    pub fn complete<F>(&mut self, on_pair: F) -> Result<(), Error>
    where
        F: FnOnce(&[u8], &[u8]) -> Result<(), Error>,
    {
        match self.state {
            State::Field if self.field.is_empty() => {
                self.state = State::Completed;
                Ok(())
            }
            State::Field => {
                self.state = State::Error;
                Err(Error::state("cannot complete headers: missing value for last field"))
            }
            State::Value => {
                self.flush(on_pair)?;
                self.state = State::Completed;
                Ok(())
            }
            State::Completed => {
                self.state = State::Error;
                Err(Error::state("headers are already completed"))
            }
            State::Error => Err(Error::state("header accumulator is in an error state")),
        }
    }

    /// Returns `true` once the header block has been completed.
    pub fn is_completed(&self) -> bool {
        self.state == State::Completed
    }

    fn append_field(&mut self, chunk: &[u8]) -> Result<(), Error> {
        try_extend(&mut self.field, chunk).inspect_err(|_| self.state = State::Error)
    }

    fn flush<F>(&mut self, on_pair: F) -> Result<(), Error>
    where
        F: FnOnce(&[u8], &[u8]) -> Result<(), Error>,
    {
        trace!(
            "Header pair complete: {}: {}",
            String::from_utf8_lossy(&self.field),
            String::from_utf8_lossy(&self.value)
        );
        if let Err(e) = on_pair(&self.field, &self.value) {
            self.state = State::Error;
            return Err(e);
        }
        self.field.clear();
        self.value.clear();
        Ok(())
    }
}

impl Default for HeaderAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Pair storage: folding and cookies
// ---------------------------------------------------------------------------

/// Store a completed header pair.
///
/// A repeated field name is combined with the existing value using `,`
/// (RFC 2616 §4.2). A `Cookie` header is additionally split into
/// `cookies`. The cookie value is validated before anything is stored, so a
/// malformed cookie leaves both maps untouched.
pub fn store_pair(
    headers: &mut FieldMap,
    cookies: &mut FieldMap,
    field: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    if is_cookie_field(field) {
        for (k, v) in split_cookies(value)? {
            cookies.set(k, v)?;
        }
    }

    match headers.get(field) {
        Some(existing) => {
            let mut combined = Vec::new();
            combined
                .try_reserve(existing.len() + 1 + value.len())
                .map_err(|_| Error::Allocation)?;
            combined.extend_from_slice(existing);
            combined.push(b',');
            combined.extend_from_slice(value);
            headers.set(field, &combined)
        }
        None => headers.set(field, value),
    }
}

/// Header names are case-insensitive, so `cookie` and `COOKIE` count too.
fn is_cookie_field(field: &[u8]) -> bool {
    field.eq_ignore_ascii_case(b"Cookie")
}

/// Split a `Cookie` header value on `; ` into name/value pairs.
///
/// Each segment is split on its first `=`. A segment without `=`, or with
/// an empty name or value, rejects the whole header.
pub fn split_cookies(value: &[u8]) -> Result<Vec<(&[u8], &[u8])>, Error> {
    let mut pairs = Vec::new();
    let mut key_start = 0;

    while key_start < value.len() {
        let rest = &value[key_start..];
        let Some(eq) = rest.iter().position(|&b| b == b'=') else {
            warn!("Cookie segment without '=': {}", String::from_utf8_lossy(rest));
            return Err(Error::argument("cookie segment without '='"));
        };
        let key = &rest[..eq];
        let after = &rest[eq + 1..];
        let val_len = after.iter().position(|&b| b == b';').unwrap_or(after.len());
        let val = &after[..val_len];

        if key.is_empty() || val.is_empty() {
            warn!("Cookie segment with empty name or value");
            return Err(Error::argument("cookie segment with empty name or value"));
        }
        pairs.push((key, val));

        // Skip the value, the ';' and the following space.
        key_start += eq + 1 + val_len + 2;
    }

    Ok(pairs)
}
