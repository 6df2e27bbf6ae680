use crate::model::enums::MimeType;
use std::fmt::Display;
use url::Url;

const MARKER: &str = "/data/";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CacheKeyError {
    #[error("Origin is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Origin path has no '/data/' segment")]
    MissingMarker,
}

/// Object store key for a cached file: the origin path after its `/data/` segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_origin(origin: &str) -> Result<Self, CacheKeyError> {
        let url = Url::parse(origin)?;
        match url.path().split_once(MARKER) {
            Some((_, key)) if !key.is_empty() => Ok(Self(key.to_owned())),
            _ => Err(CacheKeyError::MissingMarker),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> MimeType {
        MimeType::from_path(&self.0)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derives_key() {
        let key = CacheKey::from_origin("https://static1.e621.net/data/a1/b2/a1b2c3.webm").unwrap();
        assert_eq!(key.as_str(), "a1/b2/a1b2c3.webm");
        assert_eq!(key.mime_type(), MimeType::Webm);

        let sample = CacheKey::from_origin("https://static1.e621.net/data/sample/a1/b2/a1b2c3.jpg?v=2").unwrap();
        assert_eq!(sample.as_str(), "sample/a1/b2/a1b2c3.jpg");
        assert_eq!(sample, CacheKey::from_origin("https://static1.e621.net/data/sample/a1/b2/a1b2c3.jpg").unwrap());
    }

    #[test]
    fn rejects_unmarked() {
        assert_eq!(
            CacheKey::from_origin("https://static1.e621.net/files/a1.png"),
            Err(CacheKeyError::MissingMarker)
        );
        assert_eq!(CacheKey::from_origin("https://static1.e621.net/data/"), Err(CacheKeyError::MissingMarker));
        assert!(matches!(CacheKey::from_origin("not a url"), Err(CacheKeyError::InvalidUrl(_))));
    }
}
