use base64::prelude::BASE64_STANDARD;
use base64::{DecodeError, Engine};
use std::str::Utf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub enum AuthenticationError {
    #[error("Invalid authentication type")]
    InvalidAuthType,
    InvalidEncoding(#[from] DecodeError),
    #[error("Authentication credentials are malformed")]
    MalformedCredentials,
    #[error("Missing authorization header")]
    MissingCredentials,
    #[error("Invalid proxy secret")]
    SecretMismatch,
    Utf8Conversion(#[from] Utf8Error),
}

/// Who a forwarded request is made for, and what credentials go upstream.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Client {
    /// Account name taken from Basic credentials, if any.
    pub username: Option<String>,
    /// Replacement `Authorization` header. `None` forwards the original unchanged.
    pub authorization: Option<String>,
}

/// Applies the proxy's credential gate to the request's `Authorization` header.
///
/// Without a `proxy_secret` every request passes and the Basic username, when
/// decodable, is only used to label the upstream request. With a secret, Basic
/// credentials must read `username:secret:password` and are rewritten to
/// `username:password` for the upstream.
pub fn authenticate(proxy_secret: Option<&str>, auth: Option<&str>) -> Result<Client, AuthenticationError> {
    match proxy_secret {
        Some(secret) => gated_authentication(secret, auth.ok_or(AuthenticationError::MissingCredentials)?),
        None => Ok(Client {
            username: auth.and_then(|auth| basic_username(auth).ok()),
            authorization: None,
        }),
    }
}

#[cfg(test)]
pub fn credentials_for(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    BASE64_STANDARD.encode(credentials)
}

/// `credentials` are sent base64 encoded, so this function decodes them to utf-8.
fn decode_basic(auth: &str) -> Result<String, AuthenticationError> {
    let (auth_type, credentials) = auth.split_once(' ').ok_or(AuthenticationError::MalformedCredentials)?;
    if auth_type != "Basic" {
        return Err(AuthenticationError::InvalidAuthType);
    }
    let decoded_credentials = BASE64_STANDARD.decode(credentials.trim())?;
    std::str::from_utf8(&decoded_credentials)
        .map(str::to_owned)
        .map_err(AuthenticationError::from)
}

fn basic_username(auth: &str) -> Result<String, AuthenticationError> {
    let credentials = decode_basic(auth)?;
    match credentials.split_once(':') {
        Some((username, _)) if !username.is_empty() => Ok(username.to_owned()),
        _ => Err(AuthenticationError::MalformedCredentials),
    }
}

fn gated_authentication(secret: &str, auth: &str) -> Result<Client, AuthenticationError> {
    let credentials = decode_basic(auth)?;
    let [username, supplied_secret, password] = split_three(&credentials)?;
    if supplied_secret != secret {
        return Err(AuthenticationError::SecretMismatch);
    }

    let upstream_credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
    Ok(Client {
        username: Some(username.to_owned()),
        authorization: Some(format!("Basic {upstream_credentials}")),
    })
}

fn split_three(credentials: &str) -> Result<[&str; 3], AuthenticationError> {
    let mut parts = credentials.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(secret), Some(password), None) => Ok([username, secret, password]),
        _ => Err(AuthenticationError::MalformedCredentials),
    }
}
