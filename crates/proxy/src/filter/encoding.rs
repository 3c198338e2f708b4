use std::io::{self, Write};

use flate2::Compression;
use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use micro_proxy_http::protocol::Headers;

/// The `Content-Encoding` of a body the filter is able to look into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    /// `zlib`, and `deflate` which is zlib-wrapped on the wire.
    Zlib,
}

impl ContentEncoding {
    /// `None` when the body is encoded in a way the filter does not understand.
    pub fn from_headers(headers: &Headers) -> Option<Self> {
        let Some(value) = headers.get("Content-Encoding") else {
            return Some(Self::Identity);
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Some(Self::Identity),
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "zlib" | "deflate" => Some(Self::Zlib),
            _ => None,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Identity => Ok(bytes.to_vec()),
            Self::Gzip => {
                let mut decoder = GzDecoder::new(Vec::new());
                decoder.write_all(bytes)?;
                decoder.finish()
            }
            Self::Zlib => {
                let mut decoder = ZlibDecoder::new(Vec::new());
                decoder.write_all(bytes)?;
                decoder.finish()
            }
        }
    }

    pub fn encode(self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Identity => Ok(bytes.to_vec()),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()
            }
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(encoding: &str) -> Headers {
        Headers::from_iter([("Content-Encoding", encoding)])
    }

    #[test]
    fn recognize_encodings() {
        assert_eq!(ContentEncoding::from_headers(&Headers::new()), Some(ContentEncoding::Identity));
        assert_eq!(ContentEncoding::from_headers(&headers("identity")), Some(ContentEncoding::Identity));
        assert_eq!(ContentEncoding::from_headers(&headers("GZIP")), Some(ContentEncoding::Gzip));
        assert_eq!(ContentEncoding::from_headers(&headers("deflate")), Some(ContentEncoding::Zlib));
        assert_eq!(ContentEncoding::from_headers(&headers("zlib")), Some(ContentEncoding::Zlib));
        assert_eq!(ContentEncoding::from_headers(&headers("br")), None);
        assert_eq!(ContentEncoding::from_headers(&headers("gzip, br")), None);
    }

    #[test]
    fn compressed_bodies_come_back() {
        let page = "<html><body>".repeat(100);

        for encoding in [ContentEncoding::Gzip, ContentEncoding::Zlib, ContentEncoding::Identity] {
            let encoded = encoding.encode(page.as_bytes()).unwrap();
            assert_eq!(encoding.decode(&encoded).unwrap(), page.as_bytes(), "{encoding:?}");
        }
    }

    #[test]
    fn gzip_is_really_gzip() {
        let encoded = ContentEncoding::Gzip.encode(b"hello").unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn corrupt_input() {
        assert!(ContentEncoding::Gzip.decode(b"definitely not gzip").is_err());
        assert!(ContentEncoding::Zlib.decode(b"definitely not zlib").is_err());
    }
}
