use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::Read;
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

const BROTLI_BUFFER_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Failed to decode {0} response body: {1}")]
    Corrupt(ContentEncoding, std::io::Error),
    #[error("Unsupported content encoding '{0}'")]
    Unsupported(String),
}

/// Content codings the upstream may apply to a response body.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    #[strum(serialize = "x-gzip")]
    XGzip,
    Deflate,
    /// Handled as zlib-wrapped DEFLATE.
    Compress,
    #[strum(serialize = "br")]
    Brotli,
}

impl ContentEncoding {
    /// Parses a `Content-Encoding` header value. A missing or empty header means identity.
    pub fn from_header(value: Option<&str>) -> Result<Self, EncodingError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Identity),
            Some(value) => Self::from_str(value).map_err(|_| EncodingError::Unsupported(value.to_owned())),
        }
    }

    /// Decodes a complete response body into memory.
    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>, EncodingError> {
        let mut decoded = Vec::with_capacity(body.len());
        let result = match self {
            Self::Identity => return Ok(body.to_vec()),
            Self::Gzip | Self::XGzip => GzDecoder::new(body).read_to_end(&mut decoded),
            Self::Deflate if has_zlib_header(body) => ZlibDecoder::new(body).read_to_end(&mut decoded),
            Self::Deflate => DeflateDecoder::new(body).read_to_end(&mut decoded),
            Self::Compress => ZlibDecoder::new(body).read_to_end(&mut decoded),
            Self::Brotli => brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE).read_to_end(&mut decoded),
        };
        result.map(|_| decoded).map_err(|err| EncodingError::Corrupt(self, err))
    }
}

/// Servers disagree on whether "deflate" means raw DEFLATE or the zlib wrapper, so
/// sniff for a zlib header (RFC 1950 §2.2).
fn has_zlib_header(body: &[u8]) -> bool {
    match body {
        [cmf, flg, ..] => cmf & 0x0F == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}
