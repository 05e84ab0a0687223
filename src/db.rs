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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::config::DbConfig;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::scheduler::is_due;
use crate::types::card_state::CardState;
use crate::types::card_state::CardStateRecord;
use crate::types::catalog::FlashcardItem;
use crate::types::catalog::FlashcardSet;
use crate::types::catalog::User;
use crate::types::ids::ItemId;
use crate::types::ids::SetId;
use crate::types::ids::UserId;
use crate::types::review_event::ReviewEvent;
use crate::types::timestamp::Timestamp;

/// A handle to the SQLite database. Cloning is cheap; all clones share one
/// connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating schema in {database_path}");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Run `f` inside a transaction, committing if it succeeds.
    ///
    /// The transaction is `IMMEDIATE`: it takes the write lock before `f`
    /// reads anything, so read-modify-write sequences cannot interleave, even
    /// across processes sharing the database file.
    pub fn transact<T>(&self, f: impl FnOnce(&Transaction) -> Fallible<T>) -> Fallible<T> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn acquire(&self) -> Fallible<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ErrorReport::new("database connection lock poisoned"))
    }
}

pub fn insert_user(conn: &Connection, user: &User) -> Fallible<()> {
    let sql = "insert into users (user_id, email, display_name, created_at) values (?, ?, ?, ?);";
    conn.execute(
        sql,
        (user.id, &user.email, &user.display_name, user.created_at),
    )?;
    Ok(())
}

pub fn select_user(conn: &Connection, user_id: UserId) -> Fallible<Option<User>> {
    let sql = "select user_id, email, display_name, created_at from users where user_id = ?;";
    let user = conn
        .query_row(sql, [user_id], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;
    Ok(user)
}

pub fn email_exists(conn: &Connection, email: &str) -> Fallible<bool> {
    let sql = "select count(*) from users where email = ?;";
    let count: i64 = conn.query_row(sql, [email], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn insert_set(conn: &Connection, set: &FlashcardSet) -> Fallible<()> {
    let sql = "insert into flashcard_sets (set_id, author_user_id, title, description, created_at) values (?, ?, ?, ?, ?);";
    conn.execute(
        sql,
        (
            set.id,
            set.author_user_id,
            &set.title,
            &set.description,
            set.created_at,
        ),
    )?;
    Ok(())
}

pub fn select_set(conn: &Connection, set_id: SetId) -> Fallible<Option<FlashcardSet>> {
    let sql = "select set_id, author_user_id, title, description, created_at from flashcard_sets where set_id = ?;";
    let set = conn
        .query_row(sql, [set_id], |row| {
            Ok(FlashcardSet {
                id: row.get(0)?,
                author_user_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(set)
}

pub fn insert_item(conn: &Connection, item: &FlashcardItem) -> Fallible<()> {
    let sql = "insert into flashcard_items (item_id, set_id, created_by_user_id, front_text, back_text, extra, created_at) values (?, ?, ?, ?, ?, ?, ?);";
    conn.execute(
        sql,
        (
            item.id,
            item.set_id,
            item.created_by_user_id,
            &item.front_text,
            &item.back_text,
            &item.extra,
            item.created_at,
        ),
    )?;
    Ok(())
}

const ITEM_COLUMNS: &str =
    "item_id, set_id, created_by_user_id, front_text, back_text, extra, created_at";

fn item_from_row(row: &Row) -> rusqlite::Result<FlashcardItem> {
    Ok(FlashcardItem {
        id: row.get(0)?,
        set_id: row.get(1)?,
        created_by_user_id: row.get(2)?,
        front_text: row.get(3)?,
        back_text: row.get(4)?,
        extra: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn select_item(conn: &Connection, item_id: ItemId) -> Fallible<Option<FlashcardItem>> {
    let sql = format!("select {ITEM_COLUMNS} from flashcard_items where item_id = ?;");
    let item = conn.query_row(&sql, [item_id], item_from_row).optional()?;
    Ok(item)
}

/// The items of a set, oldest first.
pub fn select_items_in_set(conn: &Connection, set_id: SetId) -> Fallible<Vec<FlashcardItem>> {
    let sql = format!(
        "select {ITEM_COLUMNS} from flashcard_items where set_id = ? order by created_at, item_id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([set_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(item_from_row(row)?);
    }
    Ok(items)
}

const CARD_STATE_COLUMNS: &str = "user_id, set_id, item_id, ease_factor, interval_days, streak, lapses, suspended, due_at, last_reviewed_at";

fn card_state_from_row(row: &Row) -> rusqlite::Result<CardStateRecord> {
    Ok(CardStateRecord {
        user_id: row.get(0)?,
        set_id: row.get(1)?,
        item_id: row.get(2)?,
        state: CardState {
            ease_factor: row.get(3)?,
            interval_days: row.get(4)?,
            streak: row.get(5)?,
            lapses: row.get(6)?,
            suspended: row.get(7)?,
            due_at: row.get(8)?,
            last_reviewed_at: row.get(9)?,
        },
    })
}

pub fn select_card_state(
    conn: &Connection,
    user_id: UserId,
    item_id: ItemId,
) -> Fallible<Option<CardStateRecord>> {
    let sql =
        format!("select {CARD_STATE_COLUMNS} from card_states where user_id = ? and item_id = ?;");
    let record = conn
        .query_row(&sql, (user_id, item_id), card_state_from_row)
        .optional()?;
    Ok(record)
}

/// Insert a card state, or overwrite the existing state for the same user
/// and item.
pub fn upsert_card_state(conn: &Connection, record: &CardStateRecord) -> Fallible<()> {
    let sql = "insert into card_states (user_id, item_id, set_id, ease_factor, interval_days, streak, lapses, suspended, due_at, last_reviewed_at) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) on conflict (user_id, item_id) do update set ease_factor = excluded.ease_factor, interval_days = excluded.interval_days, streak = excluded.streak, lapses = excluded.lapses, suspended = excluded.suspended, due_at = excluded.due_at, last_reviewed_at = excluded.last_reviewed_at;";
    let state = &record.state;
    conn.execute(
        sql,
        (
            record.user_id,
            record.item_id,
            record.set_id,
            state.ease_factor,
            state.interval_days,
            state.streak,
            state.lapses,
            state.suspended,
            state.due_at,
            state.last_reviewed_at,
        ),
    )?;
    Ok(())
}

/// The user's existing card states for the items of a set.
pub fn select_card_states_in_set(
    conn: &Connection,
    user_id: UserId,
    set_id: SetId,
) -> Fallible<Vec<CardStateRecord>> {
    let sql =
        format!("select {CARD_STATE_COLUMNS} from card_states where user_id = ? and set_id = ?;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query((user_id, set_id))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(card_state_from_row(row)?);
    }
    Ok(records)
}

/// Up to `limit` of the user's due card states. Never-scheduled cards come
/// first, then the most overdue.
pub fn select_due_card_states(
    conn: &Connection,
    user_id: UserId,
    now: Timestamp,
    limit: usize,
) -> Fallible<Vec<CardStateRecord>> {
    let sql = format!(
        "select {CARD_STATE_COLUMNS} from card_states where user_id = ? and suspended = 0 order by due_at is not null, due_at, item_id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([user_id])?;
    let mut due = Vec::new();
    while due.len() < limit {
        let Some(row) = rows.next()? else {
            break;
        };
        let record = card_state_from_row(row)?;
        if !is_due(&record.state, now) {
            // Rows are in due order, so nothing after this is due either.
            break;
        }
        due.push(record);
    }
    Ok(due)
}

pub fn insert_review_event(conn: &Connection, event: &ReviewEvent) -> Fallible<()> {
    let sql = "insert into review_events (review_id, user_id, item_id, rating, reviewed_at, time_taken_ms, session_id, prev_interval, next_interval, algorithm_version) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?);";
    conn.execute(
        sql,
        (
            event.id,
            event.user_id,
            event.item_id,
            event.rating,
            event.reviewed_at,
            event.time_taken_ms,
            event.session_id,
            event.prev_interval,
            event.next_interval,
            event.algorithm_version,
        ),
    )?;
    Ok(())
}

/// The user's most recent review events, newest first.
pub fn select_review_events(
    conn: &Connection,
    user_id: UserId,
    limit: usize,
) -> Fallible<Vec<ReviewEvent>> {
    let sql = "select review_id, user_id, item_id, rating, reviewed_at, time_taken_ms, session_id, prev_interval, next_interval, algorithm_version from review_events where user_id = ? order by reviewed_at desc, review_id limit ?;";
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query((user_id, limit))?;
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(ReviewEvent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            item_id: row.get(2)?,
            rating: row.get(3)?,
            reviewed_at: row.get(4)?,
            time_taken_ms: row.get(5)?,
            session_id: row.get(6)?,
            prev_interval: row.get(7)?,
            next_interval: row.get(8)?,
            algorithm_version: row.get(9)?,
        });
    }
    Ok(events)
}

pub struct ReviewSummary {
    pub total: usize,
    pub since: usize,
    pub average_rating: Option<f64>,
}

/// Aggregate the user's review log: the total count, the count at or after
/// `since`, and the mean rating.
pub fn summarize_reviews(
    conn: &Connection,
    user_id: UserId,
    since: Timestamp,
) -> Fallible<ReviewSummary> {
    let sql = "select count(*), coalesce(sum(reviewed_at >= ?), 0), avg(rating) from review_events where user_id = ?;";
    let (total, recent, average_rating): (i64, i64, Option<f64>) =
        conn.query_row(sql, (since, user_id), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
    Ok(ReviewSummary {
        total: total as usize,
        since: recent as usize,
        average_rating,
    })
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["card_states"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use tempfile::tempdir;

    use super::*;
    use crate::types::ids::ReviewId;
    use crate::types::rating::Rating;

    fn ts(day: u32) -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2025, 5, day, 8, 0, 0).unwrap())
    }

    fn seed(db: &Database) -> Fallible<(User, FlashcardSet, Vec<FlashcardItem>)> {
        db.transact(|tx| {
            let user = User {
                id: UserId::generate(),
                email: "ada@example.com".to_string(),
                display_name: Some("Ada".to_string()),
                created_at: ts(1),
            };
            insert_user(tx, &user)?;
            let set = FlashcardSet {
                id: SetId::generate(),
                author_user_id: user.id,
                title: "Capitals".to_string(),
                description: None,
                created_at: ts(1),
            };
            insert_set(tx, &set)?;
            let mut items = Vec::new();
            for (front, back) in [("France", "Paris"), ("Peru", "Lima"), ("Chad", "N'Djamena")] {
                let item = FlashcardItem {
                    id: ItemId::generate(),
                    set_id: set.id,
                    created_by_user_id: user.id,
                    front_text: front.to_string(),
                    back_text: back.to_string(),
                    extra: None,
                    created_at: ts(1),
                };
                insert_item(tx, &item)?;
                items.push(item);
            }
            Ok((user, set, items))
        })
    }

    fn record(user: &User, item: &FlashcardItem, state: CardState) -> CardStateRecord {
        CardStateRecord {
            user_id: user.id,
            set_id: item.set_id,
            item_id: item.id,
            state,
        }
    }

    #[test]
    fn test_schema_is_created_once() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.db");
        let path = path.to_str().ok_or_else(|| ErrorReport::new("invalid path"))?;
        let db = Database::new(path)?;
        seed(&db)?;
        drop(db);
        // Reopening must not try to recreate the tables.
        let db = Database::new(path)?;
        let exists = db.transact(|tx| email_exists(tx, "ada@example.com"))?;
        assert!(exists);
        Ok(())
    }

    #[test]
    fn test_catalog_round_trip() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, set, items) = seed(&db)?;
        db.transact(|tx| {
            assert_eq!(select_user(tx, user.id)?, Some(user.clone()));
            assert_eq!(select_set(tx, set.id)?, Some(set.clone()));
            assert_eq!(select_item(tx, items[1].id)?, Some(items[1].clone()));
            assert_eq!(select_items_in_set(tx, set.id)?.len(), 3);
            assert_eq!(select_user(tx, UserId::generate())?, None);
            Ok(())
        })
    }

    #[test]
    fn test_upsert_card_state() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, _, items) = seed(&db)?;
        db.transact(|tx| {
            let initial = record(&user, &items[0], CardState::default());
            upsert_card_state(tx, &initial)?;
            assert_eq!(select_card_state(tx, user.id, items[0].id)?, Some(initial));

            let updated = record(
                &user,
                &items[0],
                CardState {
                    ease_factor: 2.6,
                    interval_days: 1,
                    streak: 1,
                    lapses: 0,
                    suspended: false,
                    due_at: Some(ts(2)),
                    last_reviewed_at: Some(ts(1)),
                },
            );
            upsert_card_state(tx, &updated)?;
            assert_eq!(select_card_state(tx, user.id, items[0].id)?, Some(updated));
            assert_eq!(select_card_state(tx, user.id, items[1].id)?, None);
            Ok(())
        })
    }

    #[test]
    fn test_due_card_states_order_and_limit() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, _, items) = seed(&db)?;
        db.transact(|tx| {
            let overdue = CardState {
                due_at: Some(ts(3)),
                ..CardState::default()
            };
            let future = CardState {
                due_at: Some(ts(20)),
                ..CardState::default()
            };
            upsert_card_state(tx, &record(&user, &items[0], overdue))?;
            upsert_card_state(tx, &record(&user, &items[1], future))?;
            upsert_card_state(tx, &record(&user, &items[2], CardState::default()))?;

            let due = select_due_card_states(tx, user.id, ts(10), 10)?;
            let due: Vec<ItemId> = due.iter().map(|r| r.item_id).collect();
            assert_eq!(due, vec![items[2].id, items[0].id]);

            let limited = select_due_card_states(tx, user.id, ts(10), 1)?;
            assert_eq!(limited.len(), 1);
            assert_eq!(limited[0].item_id, items[2].id);

            assert!(select_due_card_states(tx, user.id, ts(10), 0)?.is_empty());
            Ok(())
        })
    }

    #[test]
    fn test_suspended_states_are_never_due() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, _, items) = seed(&db)?;
        db.transact(|tx| {
            let suspended = CardState {
                suspended: true,
                ..CardState::default()
            };
            upsert_card_state(tx, &record(&user, &items[0], suspended))?;
            assert!(select_due_card_states(tx, user.id, ts(10), 10)?.is_empty());
            Ok(())
        })
    }

    #[test]
    fn test_review_log() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, _, items) = seed(&db)?;
        db.transact(|tx| {
            for (day, rating) in [(2, Rating::Good), (5, Rating::Again), (6, Rating::Easy)] {
                let event = ReviewEvent {
                    id: ReviewId::generate(),
                    user_id: user.id,
                    item_id: items[0].id,
                    rating,
                    reviewed_at: ts(day),
                    time_taken_ms: Some(1200),
                    session_id: None,
                    prev_interval: 0,
                    next_interval: 1,
                    algorithm_version: 1,
                };
                insert_review_event(tx, &event)?;
            }
            let events = select_review_events(tx, user.id, 2)?;
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].reviewed_at, ts(6));
            assert_eq!(events[0].rating, Rating::Easy);
            assert_eq!(events[1].reviewed_at, ts(5));

            let summary = summarize_reviews(tx, user.id, ts(5))?;
            assert_eq!(summary.total, 3);
            assert_eq!(summary.since, 2);
            let average = summary.average_rating.unwrap_or_default();
            assert!((average - 8.0 / 3.0).abs() < 1e-9);

            let empty = summarize_reviews(tx, UserId::generate(), ts(5))?;
            assert_eq!(empty.total, 0);
            assert_eq!(empty.since, 0);
            assert_eq!(empty.average_rating, None);
            Ok(())
        })
    }

    #[test]
    fn test_cascade_on_item_delete() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let (user, _, items) = seed(&db)?;
        db.transact(|tx| {
            upsert_card_state(tx, &record(&user, &items[0], CardState::default()))?;
            tx.execute("delete from flashcard_items where item_id = ?;", [items[0].id])?;
            assert_eq!(select_card_state(tx, user.id, items[0].id)?, None);
            Ok(())
        })
    }
}
