use crate::config::Config;
use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Debug;

type HmacSha256 = Hmac<Sha256>;

/// URL-safe base64 that emits padding but accepts input with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const SECRET_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("File id is not valid base64: {0}")]
    InvalidFileId(#[from] base64::DecodeError),
    #[error("File id is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Signs and verifies origin URLs embedded in proxy links.
///
/// The secret lives only in memory, so links issued before a restart stop verifying.
#[derive(Clone)]
pub struct LinkSigner {
    secret: [u8; SECRET_LENGTH],
}

impl LinkSigner {
    /// Creates a signer with a fresh secret from the operating system's CSPRNG.
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut secret = [0; SECRET_LENGTH];
        getrandom::getrandom(&mut secret)?;
        Ok(Self { secret })
    }

    #[cfg(test)]
    pub fn with_secret(secret: [u8; SECRET_LENGTH]) -> Self {
        Self { secret }
    }

    /// Computes the base64url-encoded HMAC-SHA256 of `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        URL_SAFE_LENIENT.encode(mac.finalize().into_bytes())
    }

    /// Checks `signature` against `payload` in constant time. Malformed signatures
    /// are simply invalid.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(signature) = URL_SAFE_LENIENT.decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(&signature).is_ok()
    }

    /// Builds the signed proxy link that stands in for `origin` in rewritten responses.
    pub fn proxy_link(&self, config: &Config, origin: &str) -> String {
        let file_id = encode_file_id(origin);
        let signature = self.sign(origin.as_bytes());
        config.proxy_url(&file_id, &signature)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC should take key of any size")
    }
}

impl Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSigner").finish_non_exhaustive()
    }
}

pub fn encode_file_id(origin: &str) -> String {
    URL_SAFE_LENIENT.encode(origin)
}

pub fn decode_file_id(file_id: &str) -> Result<String, LinkError> {
    let bytes = URL_SAFE_LENIENT.decode(file_id)?;
    String::from_utf8(bytes).map_err(LinkError::from)
}
