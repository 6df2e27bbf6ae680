use crate::api::ApiError;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use serde::Deserialize;

/// The two halves of a proxy link: `/proxy/{file_id}?sig={signature}`.
///
/// An absent or empty `sig` is not rejected here, so the file proxy can report it
/// as a missing signature rather than a malformed query.
pub struct ProxyLink {
    pub file_id: String,
    pub signature: Option<String>,
}

#[derive(Deserialize)]
struct SignatureParam {
    sig: Option<String>,
}

impl<S> FromRequestParts<S> for ProxyLink
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(file_id) = Path::<String>::from_request_parts(parts, state).await?;
        let Query(param) = Query::<SignatureParam>::from_request_parts(parts, state).await?;
        Ok(Self {
            file_id,
            signature: param.sig.filter(|sig| !sig.is_empty()),
        })
    }
}
