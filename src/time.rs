use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Timestamptz;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::time::Duration;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::serde::rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// IMF-fixdate, the preferred format for HTTP date headers (RFC 7231 §7.1.1.1).
const HTTP_DATE: &[FormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

// A wrapper for time::OffsetDateTime that serializes/deserializes according to RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Timestamptz)]
pub struct DateTime(#[serde(with = "rfc3339")] OffsetDateTime);

impl DateTime {
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    /// Formats as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn to_http_date(self) -> String {
        self.0
            .to_offset(UtcOffset::UTC)
            .format(HTTP_DATE)
            .unwrap_or_else(|_| String::from("Thu, 01 Jan 1970 00:00:00 GMT"))
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        let duration = time::Duration::try_from(duration).unwrap_or(time::Duration::MAX);
        Self(self.0.saturating_add(duration))
    }
}

impl Deref for DateTime {
    type Target = OffsetDateTime;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        DateTime(value)
    }
}

impl<DB: Backend> ToSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: ToSql<diesel::sql_types::Timestamptz, DB>,
{
    fn to_sql<'a>(&'a self, out: &mut Output<'a, '_, DB>) -> serialize::Result {
        self.0.to_sql(out)
    }
}

impl<DB: Backend> FromSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: FromSql<diesel::sql_types::Timestamptz, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        OffsetDateTime::from_sql(bytes).map(DateTime)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn http_date() {
        let date = DateTime::from(datetime!(1994-11-06 08:49:37 UTC));
        assert_eq!(date.to_http_date(), "Sun, 06 Nov 1994 08:49:37 GMT");

        let offset = DateTime::from(datetime!(1994-11-06 03:49:37 -5));
        assert_eq!(offset.to_http_date(), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn rfc3339_roundtrip() {
        let parsed: DateTime = serde_json::from_str("\"2024-03-01T12:30:00.250-05:00\"").unwrap();
        assert_eq!(*parsed, datetime!(2024-03-01 17:30:00.25 UTC));
    }

    #[test]
    fn add_hour() {
        let date = DateTime::from(datetime!(2024-12-31 23:30:00 UTC));
        let later = date.saturating_add(Duration::from_secs(3600));
        assert_eq!(*later, datetime!(2025-01-01 00:30:00 UTC));
    }
}
