// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::DateTime;
use chrono::Duration;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;

/// A UTC instant.
///
/// Stored in the database as fixed-width RFC 3339 text, so that string
/// comparison in SQL agrees with chronological order. Precision is truncated
/// to microseconds on construction so values survive a database round trip.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self(ts.trunc_subsecs(6))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    pub fn plus_days(self, days: u32) -> Self {
        Self(self.0 + Duration::days(i64::from(days)))
    }

    /// Midnight (UTC) of the day this timestamp falls on.
    pub fn start_of_day(self) -> Self {
        let midnight = self
            .0
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(self.0);
        Self(midnight)
    }

    pub fn to_db_string(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::new(value)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_db_string()))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        let ts =
            DateTime::parse_from_rfc3339(&string).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(Timestamp::new(ts.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_plus_days() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2025, 1, 30, 12, 0, 0).unwrap());
        let later = ts.plus_days(6);
        assert_eq!(
            later.into_inner(),
            Utc.with_ymd_and_hms(2025, 2, 5, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_day() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2025, 3, 4, 17, 45, 12).unwrap());
        assert_eq!(
            ts.start_of_day().into_inner(),
            Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_db_string_is_fixed_width() {
        let a = Timestamp::new(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
        let b = Timestamp::new(a.into_inner() + Duration::microseconds(1500));
        assert_eq!(a.to_db_string(), "2025-03-04T00:00:00.000000Z");
        assert_eq!(a.to_db_string().len(), b.to_db_string().len());
        assert!(a.to_db_string() < b.to_db_string());
    }

    #[test]
    fn test_truncates_to_microseconds() {
        let base = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
        let ts = Timestamp::new(base + Duration::nanoseconds(1_234_567));
        assert_eq!(ts.into_inner(), base + Duration::microseconds(1_234));
    }
}
