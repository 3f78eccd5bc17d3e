//! Content-coding negotiation for response bodies.
//!
//! Only codings the server can actually produce are advertised. Anything a
//! client offers outside that set is skipped, and when nothing matches the
//! body goes out untouched (identity).

use std::io::Write;

use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};

/// A content coding the server knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Gzip,
    /// HTTP "deflate" is a zlib stream, not raw deflate.
    Deflate,
}

/// Codings in the server's supported set.
pub const SUPPORTED_CODINGS: &[ContentCoding] = &[ContentCoding::Gzip, ContentCoding::Deflate];

impl ContentCoding {
    /// Value emitted in the `Content-Encoding` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        SUPPORTED_CODINGS
            .iter()
            .copied()
            .find(|coding| coding.as_str().eq_ignore_ascii_case(token))
    }

    pub fn encode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            ContentCoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input)?;
                encoder.finish()
            }
            ContentCoding::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input)?;
                encoder.finish()
            }
        }
    }
}

/// Outcome of negotiation: the coding applied, if any, and the bytes to send.
#[derive(Debug)]
pub struct Negotiated {
    pub encoding: Option<ContentCoding>,
    pub body: Vec<u8>,
}

/// Picks the first acceptable coding the client offers.
///
/// Entries are separated by commas. Parameters such as `;q=0.5` are ignored
/// except that `q=0` marks the coding as refused.
pub fn select_coding(accept_encoding: &str) -> Option<ContentCoding> {
    accept_encoding.split(',').find_map(|entry| {
        let mut params = entry.split(';');
        let token = params.next()?.trim();
        if params.any(is_zero_quality) {
            return None;
        }
        ContentCoding::from_token(token)
    })
}

fn is_zero_quality(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("q")
        && value
            .trim()
            .parse::<f32>()
            .map(|q| q <= 0.0)
            .unwrap_or(false)
}

/// Negotiates an encoding for `body` against an `Accept-Encoding` value.
///
/// Never fails: if compression errors out, the identity body is returned.
pub fn negotiate(accept_encoding: Option<&str>, body: &[u8]) -> Negotiated {
    let identity = || Negotiated {
        encoding: None,
        body: body.to_vec(),
    };

    let Some(coding) = accept_encoding.and_then(select_coding) else {
        return identity();
    };

    match coding.encode(body) {
        Ok(encoded) => Negotiated {
            encoding: Some(coding),
            body: encoded,
        },
        Err(e) => {
            tracing::warn!(coding = coding.as_str(), error = %e, "Compression failed, sending identity");
            identity()
        }
    }
}
