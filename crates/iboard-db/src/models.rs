//! Database row types. These map directly to SQLite rows and stay distinct
//! from the iboard-types wire models so the storage layer owns its format.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use iboard_types::Idea;

use crate::StoreError;

pub struct IdeaRow {
    pub id: String,
    pub text: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<IdeaRow> for Idea {
    type Error = StoreError;

    fn try_from(row: IdeaRow) -> Result<Self, Self::Error> {
        let id: Uuid = row
            .id
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", row.id, e)))?;

        Ok(Idea {
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            id,
            text: row.text,
            upvotes: row.upvotes,
            downvotes: row.downvotes,
        })
    }
}

/// Fixed-width RFC 3339 so that lexical order in SQLite matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now'),
            // which has no timezone. Parse as naive UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_timestamps_sort_lexically() {
        let early = "2024-01-01T00:00:09Z".parse::<DateTime<Utc>>().unwrap();
        let late = "2024-01-01T00:00:10.5Z".parse::<DateTime<Utc>>().unwrap();
        assert!(format_timestamp(early) < format_timestamp(late));
    }

    #[test]
    fn parses_sqlite_default_format() {
        let ts = parse_timestamp("2024-03-05 12:30:00").unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-05T12:30:00.000000Z");
    }

    #[test]
    fn bad_id_is_corrupt() {
        let row = IdeaRow {
            id: "not-a-uuid".into(),
            text: "x".into(),
            upvotes: 0,
            downvotes: 0,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        };
        assert!(matches!(Idea::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
