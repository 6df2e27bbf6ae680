pub trait ErrorKind {
    fn kind(&self) -> &'static str;
}

impl ErrorKind for diesel::result::DatabaseErrorKind {
    fn kind(&self) -> &'static str {
        match self {
            Self::CheckViolation => "CheckViolation",
            Self::ClosedConnection => "ClosedConnection",
            Self::ForeignKeyViolation => "ForeignKeyViolation",
            Self::NotNullViolation => "NotNullViolation",
            Self::ReadOnlyTransaction => "ReadOnlyTransaction",
            Self::SerializationFailure => "SerializationFailure",
            Self::UnableToSendCommand => "UnableToSendCommand",
            Self::UniqueViolation => "UniqueViolation",
            _ => "UnknownDatabaseError",
        }
    }
}

impl ErrorKind for diesel::result::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyInTransaction => "AlreadyInTransaction",
            Self::BrokenTransactionManager => "BrokenTransactionManager",
            Self::DatabaseError(err, _) => err.kind(),
            Self::DeserializationError(_) => "DeserializationError",
            Self::InvalidCString(_) => "InvalidCString",
            Self::NotFound => "NotFound",
            Self::NotInTransaction => "NotInTransaction",
            Self::QueryBuilderError(_) => "QueryBuilderError",
            Self::RollbackErrorOnCommit { rollback_error, .. } => rollback_error.kind(),
            Self::RollbackTransaction => "RollbackTransaction",
            Self::SerializationError(_) => "SerializationError",
            _ => "UnknownQueryError",
        }
    }
}

impl ErrorKind for base64::DecodeError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidByte(..) => "InvalidByte",
            Self::InvalidLastSymbol(..) => "InvalidLastSymbol",
            Self::InvalidLength(_) => "InvalidLength",
            Self::InvalidPadding => "InvalidPadding",
        }
    }
}

impl ErrorKind for crate::auth::header::AuthenticationError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAuthType => "InvalidAuthType",
            Self::InvalidEncoding(err) => err.kind(),
            Self::MalformedCredentials => "MalformedCredentials",
            Self::MissingCredentials => "MissingCredentials",
            Self::SecretMismatch => "SecretMismatch",
            Self::Utf8Conversion(_) => "Utf8ConversionError",
        }
    }
}

impl ErrorKind for crate::content::encoding::EncodingError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Corrupt(..) => "CorruptEncoding",
            Self::Unsupported(_) => "UnsupportedEncoding",
        }
    }
}

impl ErrorKind for crate::content::key::CacheKeyError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "InvalidOriginUrl",
            Self::MissingMarker => "MissingPathMarker",
        }
    }
}

impl ErrorKind for crate::content::link::LinkError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFileId(err) => err.kind(),
            Self::InvalidUtf8(_) => "Utf8ConversionError",
        }
    }
}

impl ErrorKind for crate::content::object::ObjectCacheError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Body(_) => "ObjectBodyError",
            Self::NotFound(_) => "ObjectNotFound",
            Self::Request(_) => "ObjectStoreRequestFailed",
            Self::Timeout(_) => "ObjectStoreTimeout",
        }
    }
}

impl ErrorKind for crate::store::StoreError {
    fn kind(&self) -> &'static str {
        match self {
            Self::FailedConnection(_) => "FailedConnection",
            Self::FailedQuery(err) => err.kind(),
            Self::Join(_) => "JoinError",
            Self::PostNotFound(_) => "PostNotFound",
            Self::Timeout(_) => "StoreTimeout",
        }
    }
}

impl ErrorKind for crate::api::ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Encoding(err) => err.kind(),
            Self::FailedAuthentication(err) => err.kind(),
            Self::InvalidCacheKey(err) => err.kind(),
            Self::InvalidFileId(err) => err.kind(),
            Self::InvalidHeader(_) => "InvalidHeader",
            Self::InvalidResponseFormat(_) => "InvalidResponseFormat",
            Self::InvalidSignature => "InvalidSignature",
            Self::JsonSerialization(_) => "JsonSerializationError",
            Self::MissingSignature => "MissingSignature",
            Self::ObjectCache(err) => err.kind(),
            Self::PathRejection(_) => "PathRejection",
            Self::QueryRejection(_) => "QueryRejection",
            Self::RateLimited => "RateLimited",
            Self::RequestBody(_) => "RequestBodyError",
            Self::Upstream(_) => "UpstreamError",
        }
    }
}
