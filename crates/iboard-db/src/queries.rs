use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use iboard_types::{Idea, IdeaStats, VoteDirection};

use crate::models::{IdeaRow, format_timestamp, parse_timestamp};
use crate::{Database, StoreError, VoteStore};

const IDEA_COLUMNS: &str = "id, text, upvotes, downvotes, created_at, updated_at";

impl VoteStore for Database {
    fn insert(&self, text: &str) -> Result<Idea, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = format_timestamp(Utc::now());

        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO ideas (id, text, upvotes, downvotes, created_at, updated_at)
                     VALUES (?1, ?2, 0, 0, ?3, ?3)
                     RETURNING {IDEA_COLUMNS}"
                ),
                (&id, text, &now),
                map_idea_row,
            )?;
            Idea::try_from(row)
        })
    }

    fn increment(&self, id: Uuid, direction: VoteDirection) -> Result<Idea, StoreError> {
        let now = format_timestamp(Utc::now());

        self.with_conn(|conn| {
            let row = conn
                .query_row(increment_sql(direction), (id.to_string(), &now), map_idea_row)
                .optional()?
                .ok_or(StoreError::NotFound)?;

            debug!(
                "{} on {}: up={} down={}",
                direction.as_str(),
                id,
                row.upvotes,
                row.downvotes
            );
            Idea::try_from(row)
        })
    }

    fn fetch(&self, id: Uuid) -> Result<Idea, StoreError> {
        self.with_conn(|conn| query_idea(conn, id)?.ok_or(StoreError::NotFound))
    }

    fn fetch_all(&self) -> Result<Vec<Idea>, StoreError> {
        self.with_conn(query_all_ideas)
    }

    fn stats(&self) -> Result<IdeaStats, StoreError> {
        self.with_conn(query_stats)
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM ideas", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

/// One statement per counter. The column name never comes from input.
fn increment_sql(direction: VoteDirection) -> &'static str {
    match direction {
        VoteDirection::Up => {
            "UPDATE ideas
             SET upvotes = upvotes + 1, updated_at = MAX(updated_at, ?2)
             WHERE id = ?1
             RETURNING id, text, upvotes, downvotes, created_at, updated_at"
        }
        VoteDirection::Down => {
            "UPDATE ideas
             SET downvotes = downvotes + 1, updated_at = MAX(updated_at, ?2)
             WHERE id = ?1
             RETURNING id, text, upvotes, downvotes, created_at, updated_at"
        }
    }
}

fn map_idea_row(row: &Row<'_>) -> rusqlite::Result<IdeaRow> {
    Ok(IdeaRow {
        id: row.get(0)?,
        text: row.get(1)?,
        upvotes: row.get(2)?,
        downvotes: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn query_idea(conn: &Connection, id: Uuid) -> Result<Option<Idea>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?1"))?;

    let row = stmt
        .query_row([id.to_string()], map_idea_row)
        .optional()?;

    row.map(Idea::try_from).transpose()
}

fn query_all_ideas(conn: &Connection) -> Result<Vec<Idea>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {IDEA_COLUMNS} FROM ideas ORDER BY created_at DESC, rowid DESC"
    ))?;

    let rows = stmt
        .query_map([], map_idea_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(Idea::try_from).collect()
}

fn query_stats(conn: &Connection) -> Result<IdeaStats, StoreError> {
    let (total, up, down, latest): (i64, i64, i64, Option<String>) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(upvotes), 0), COALESCE(SUM(downvotes), 0), MAX(created_at)
         FROM ideas",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;

    let to_u64 = |v: i64| {
        u64::try_from(v).map_err(|_| StoreError::Corrupt(format!("negative aggregate {}", v)))
    };

    let total_upvotes = to_u64(up)?;
    let total_downvotes = to_u64(down)?;

    Ok(IdeaStats {
        total_ideas: to_u64(total)?,
        total_upvotes,
        total_downvotes,
        total_votes: total_upvotes + total_downvotes,
        net_score: up - down,
        latest_idea_at: latest.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_starts_with_zero_counters() {
        let db = db();
        let idea = db.insert("better coffee").unwrap();

        assert_eq!(idea.text, "better coffee");
        assert_eq!((idea.upvotes, idea.downvotes), (0, 0));
        assert_eq!(idea.created_at, idea.updated_at);
        assert_eq!(db.fetch(idea.id).unwrap(), idea);
    }

    #[test]
    fn increment_touches_only_the_selected_counter() {
        let db = db();
        let idea = db.insert("standing desks").unwrap();

        let after_up = db.increment(idea.id, VoteDirection::Up).unwrap();
        assert_eq!((after_up.upvotes, after_up.downvotes), (1, 0));

        let after_down = db.increment(idea.id, VoteDirection::Down).unwrap();
        assert_eq!((after_down.upvotes, after_down.downvotes), (1, 1));
        assert_eq!(after_down.score(), 0);
        assert!(after_down.updated_at >= after_down.created_at);
        assert_eq!(after_down.created_at, idea.created_at);
    }

    #[test]
    fn two_upvotes_give_score_two() {
        let db = db();
        let idea = db.insert("x").unwrap();

        db.increment(idea.id, VoteDirection::Up).unwrap();
        db.increment(idea.id, VoteDirection::Up).unwrap();

        assert_eq!(db.fetch(idea.id).unwrap().score(), 2);
    }

    #[test]
    fn increment_unknown_id_is_not_found() {
        let db = db();
        let res = db.increment(Uuid::new_v4(), VoteDirection::Up);
        assert!(matches!(res, Err(StoreError::NotFound)));
        assert!(db.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn fetch_unknown_id_is_not_found() {
        assert!(matches!(db().fetch(Uuid::new_v4()), Err(StoreError::NotFound)));
    }

    #[test]
    fn fetch_all_is_newest_first() {
        let db = db();
        let first = db.insert("first").unwrap();
        let second = db.insert("second").unwrap();
        let third = db.insert("third").unwrap();

        let ids: Vec<Uuid> = db.fetch_all().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test]
    fn stats_aggregate_all_rows() {
        let db = db();
        assert_eq!(db.stats().unwrap(), IdeaStats::default());

        let a = db.insert("a").unwrap();
        let b = db.insert("b").unwrap();
        db.increment(a.id, VoteDirection::Up).unwrap();
        db.increment(a.id, VoteDirection::Up).unwrap();
        db.increment(b.id, VoteDirection::Down).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_ideas, 2);
        assert_eq!(stats.total_upvotes, 2);
        assert_eq!(stats.total_downvotes, 1);
        assert_eq!(stats.total_votes, 3);
        assert_eq!(stats.net_score, 1);
        assert_eq!(stats.latest_idea_at, Some(b.created_at));
    }

    #[test]
    fn ping_succeeds_on_open_database() {
        db().ping().unwrap();
    }
}
