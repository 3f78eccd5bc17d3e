use memchr::memmem;

use crate::http::request::{Method, Request};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("invalid method token")]
    InvalidMethod,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length value")]
    InvalidContentLength,
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("request body of {0} bytes exceeds the limit")]
    BodyTooLarge(usize),
    #[error("request is not complete yet")]
    Incomplete,
}

/// Upper bounds applied while framing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Request line plus headers, including the blank terminator line.
    pub max_head_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_head_bytes: 8 * 1024,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Forward-only cursor over CRLF-terminated lines of a byte buffer.
struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the next line without its CRLF, or `None` if no full line
    /// has arrived yet. The cursor only moves on success.
    fn next_line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = memmem::find(rest, b"\r\n")?;
        self.pos += end + 2;
        Some(&rest[..end])
    }
}

/// Frames one request out of `buf`.
///
/// On success returns the request and the number of bytes it occupied;
/// anything after that belongs to the next request. `Incomplete` means the
/// caller must read more bytes and try again with the grown buffer.
pub fn parse_http_request(
    buf: &[u8],
    limits: &ParseLimits,
) -> Result<(Request, usize), ParseError> {
    let mut scanner = Scanner::new(buf);

    // Request line, tolerating stray CRLFs left between requests
    let request_line = loop {
        match scanner.next_line() {
            Some([]) => continue,
            Some(line) => break line,
            None => return Err(incomplete_head(buf, limits)),
        }
    };
    let (method, path, version) = parse_request_line(request_line)?;

    // Headers
    let mut headers = Vec::new();
    loop {
        let line = scanner
            .next_line()
            .ok_or_else(|| incomplete_head(buf, limits))?;

        if line.is_empty() {
            break;
        }

        headers.push(parse_header_line(line)?);
    }

    let head_len = scanner.pos;
    if head_len > limits.max_head_bytes {
        return Err(ParseError::HeadTooLarge(limits.max_head_bytes));
    }

    // Body
    let content_length = content_length(&headers)?;

    if content_length > limits.max_body_bytes {
        return Err(ParseError::BodyTooLarge(content_length));
    }

    let body_bytes = &buf[head_len..];
    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: body_bytes[..content_length].to_vec(),
    };

    Ok((request, head_len + content_length))
}

fn incomplete_head(buf: &[u8], limits: &ParseLimits) -> ParseError {
    if buf.len() > limits.max_head_bytes {
        ParseError::HeadTooLarge(limits.max_head_bytes)
    } else {
        ParseError::Incomplete
    }
}

fn parse_request_line(line: &[u8]) -> Result<(Method, &str, &str), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequest)?;

    let mut parts = line.split(' ');
    let method_str = parts.next().filter(|s| !s.is_empty());
    let path = parts.next().filter(|s| !s.is_empty());
    let version = parts.next().filter(|s| !s.is_empty());

    let (Some(method_str), Some(path), Some(version)) = (method_str, path, version) else {
        return Err(ParseError::InvalidRequest);
    };
    if parts.next().is_some() || !path.starts_with('/') {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_token(method_str).ok_or(ParseError::InvalidMethod)?;
    Ok((method, path, version))
}

fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let colon = memchr::memchr(b':', line).ok_or(ParseError::InvalidHeader)?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);

    if name.is_empty() || name.iter().any(|b| b.is_ascii_whitespace()) {
        return Err(ParseError::InvalidHeader);
    }

    let name = std::str::from_utf8(name).map_err(|_| ParseError::InvalidHeader)?;
    // Values may carry obs-text (e.g. Latin-1), decode leniently
    let value = String::from_utf8_lossy(value);

    Ok((name.to_string(), value.trim().to_string()))
}

/// Body length declared by the headers; repeated values must agree.
fn content_length(headers: &[(String, String)]) -> Result<usize, ParseError> {
    let mut declared = None;
    for (_, value) in headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
    {
        let len = parse_content_length(value)?;
        if declared.is_some_and(|prev| prev != len) {
            return Err(ParseError::InvalidContentLength);
        }
        declared = Some(len);
    }
    Ok(declared.unwrap_or(0))
}

fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength);
    }
    value.parse().map_err(|_| ParseError::InvalidContentLength)
}
