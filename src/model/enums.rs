use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

/// Content rating of a post. Stored in the database as its single-letter code.
#[derive(
    Debug, Display, Copy, Clone, PartialEq, Eq, EnumString, IntoStaticStr, AsExpression, FromSqlRow, Serialize, Deserialize,
)]
#[diesel(sql_type = Text)]
pub enum Rating {
    #[serde(rename = "s")]
    #[strum(serialize = "s")]
    Safe,
    #[serde(rename = "q")]
    #[strum(serialize = "q")]
    Questionable,
    #[serde(rename = "e")]
    #[strum(serialize = "e")]
    Explicit,
}

impl ToSql<Text, Pg> for Rating {
    fn to_sql(&self, out: &mut Output<Pg>) -> serialize::Result {
        let value: &'static str = self.into();
        <str as ToSql<Text, Pg>>::to_sql(value, &mut out.reborrow())
    }
}

impl FromSql<Text, Pg> for Rating {
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let database_value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Rating::from_str(&database_value).map_err(Into::into)
    }
}

/// Media types served by the file proxy, keyed by file extension.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum MimeType {
    #[strum(serialize = "image/bmp")]
    Bmp,
    #[strum(serialize = "image/gif")]
    Gif,
    #[strum(serialize = "image/jpeg")]
    Jpeg,
    #[strum(serialize = "image/png")]
    Png,
    #[strum(serialize = "image/tiff")]
    Tiff,
    #[strum(serialize = "image/webp")]
    Webp,
    #[strum(serialize = "video/x-msvideo")]
    Avi,
    #[strum(serialize = "video/x-flv")]
    Flv,
    #[strum(serialize = "video/x-matroska")]
    Mkv,
    #[strum(serialize = "video/quicktime")]
    Mov,
    #[strum(serialize = "video/mp4")]
    Mp4,
    #[strum(serialize = "video/ogg")]
    Ogv,
    #[strum(serialize = "video/webm")]
    Webm,
    #[strum(serialize = "application/octet-stream")]
    OctetStream,
}

impl MimeType {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "bmp" => Self::Bmp,
            "gif" => Self::Gif,
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "avi" => Self::Avi,
            "flv" => Self::Flv,
            "mkv" => Self::Mkv,
            "mov" => Self::Mov,
            "mp4" => Self::Mp4,
            "ogv" => Self::Ogv,
            "webm" => Self::Webm,
            _ => Self::OctetStream,
        }
    }

    /// Determines the media type from the extension of the last segment of `path`.
    pub fn from_path(path: &str) -> Self {
        let filename = path.rsplit('/').next().unwrap_or(path);
        match filename.rsplit_once('.') {
            Some((_, extension)) => Self::from_extension(extension),
            None => Self::OctetStream,
        }
    }
}
