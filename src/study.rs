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

//! Study operations: the glue between the scheduler and the database.
//!
//! Each operation runs in a single database transaction, so reviews of the
//! same card are applied one at a time.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::Database;
use crate::db::insert_review_event;
use crate::db::select_card_state;
use crate::db::select_card_states_in_set;
use crate::db::select_due_card_states;
use crate::db::select_item;
use crate::db::select_items_in_set;
use crate::db::select_review_events;
use crate::db::select_set;
use crate::db::summarize_reviews;
use crate::db::upsert_card_state;
use crate::error::ErrorKind;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::scheduler::ALGORITHM_VERSION;
use crate::scheduler::reset;
use crate::scheduler::review;
use crate::types::card_state::CardState;
use crate::types::card_state::CardStateRecord;
use crate::types::catalog::FlashcardItem;
use crate::types::catalog::FlashcardSet;
use crate::types::ids::ItemId;
use crate::types::ids::ReviewId;
use crate::types::ids::SetId;
use crate::types::ids::UserId;
use crate::types::rating::Rating;
use crate::types::review_event::ReviewEvent;
use crate::types::review_event::ReviewMetadata;
use crate::types::timestamp::Timestamp;

/// How far ahead of the server clock a client-supplied review time may be.
const MAX_CLOCK_SKEW_MINUTES: i64 = 5;

/// Record a review of an item, reschedule the card, and return the log
/// entry.
///
/// If `reviewed_at` is `None`, the current time is used. A supplied time
/// must lie between the Unix epoch and a few minutes past the server clock.
pub fn submit_review(
    db: &Database,
    user_id: UserId,
    item_id: ItemId,
    rating: Rating,
    reviewed_at: Option<Timestamp>,
    metadata: ReviewMetadata,
) -> Fallible<ReviewEvent> {
    let now = match reviewed_at {
        Some(ts) => check_review_time(ts, Timestamp::now())?,
        None => Timestamp::now(),
    };
    db.transact(|tx| {
        let item = owned_item(tx, user_id, item_id)?;
        let current = load_or_create_state(tx, user_id, &item)?;
        let scheduled = review(&current.state, rating, now);
        log::debug!(
            "{} {} ease={:.2} interval={}d->{}d due={}",
            item_id,
            rating.as_str(),
            scheduled.state.ease_factor,
            scheduled.prev_interval,
            scheduled.next_interval,
            scheduled.due_at
        );
        upsert_card_state(
            tx,
            &CardStateRecord {
                state: scheduled.state,
                ..current
            },
        )?;
        let event = ReviewEvent {
            id: ReviewId::generate(),
            user_id,
            item_id,
            rating,
            reviewed_at: now,
            time_taken_ms: metadata.time_taken_ms,
            session_id: metadata.session_id,
            prev_interval: scheduled.prev_interval,
            next_interval: scheduled.next_interval,
            algorithm_version: ALGORITHM_VERSION,
        };
        insert_review_event(tx, &event)?;
        Ok(event)
    })
}

fn check_review_time(reviewed_at: Timestamp, clock: Timestamp) -> Fallible<Timestamp> {
    let latest = clock.into_inner() + Duration::minutes(MAX_CLOCK_SKEW_MINUTES);
    let ts = reviewed_at.into_inner();
    if ts < DateTime::<Utc>::UNIX_EPOCH || ts > latest {
        return Err(ErrorReport::with_kind(
            ErrorKind::BadRequest,
            format!("review time {reviewed_at} is out of range"),
        ));
    }
    Ok(reviewed_at)
}

/// Reset the user's progress on every card of a set they own. Returns the
/// number of card states that were reset.
pub fn reset_progress(db: &Database, user_id: UserId, set_id: SetId) -> Fallible<usize> {
    db.transact(|tx| {
        owned_set(tx, user_id, set_id)?;
        let records = select_card_states_in_set(tx, user_id, set_id)?;
        for record in &records {
            upsert_card_state(
                tx,
                &CardStateRecord {
                    state: reset(&record.state),
                    ..record.clone()
                },
            )?;
        }
        log::info!(
            "Reset {} card states in set {set_id} for user {user_id}",
            records.len()
        );
        Ok(records.len())
    })
}

/// Up to `limit` of the user's cards that are due at `now`.
pub fn due_cards(
    db: &Database,
    user_id: UserId,
    limit: usize,
    now: Timestamp,
) -> Fallible<Vec<CardStateRecord>> {
    db.transact(|tx| select_due_card_states(tx, user_id, now, limit))
}

/// The user's card state for every item in a set they own, creating the
/// states that do not exist yet.
pub fn set_card_states(
    db: &Database,
    user_id: UserId,
    set_id: SetId,
) -> Fallible<Vec<CardStateRecord>> {
    db.transact(|tx| {
        owned_set(tx, user_id, set_id)?;
        let items = select_items_in_set(tx, set_id)?;
        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            records.push(load_or_create_state(tx, user_id, item)?);
        }
        Ok(records)
    })
}

/// Suspend or unsuspend a card. Suspended cards are skipped by `due_cards`.
pub fn set_suspended(
    db: &Database,
    user_id: UserId,
    item_id: ItemId,
    suspended: bool,
) -> Fallible<CardStateRecord> {
    db.transact(|tx| {
        let item = owned_item(tx, user_id, item_id)?;
        let current = load_or_create_state(tx, user_id, &item)?;
        let updated = CardStateRecord {
            state: CardState {
                suspended,
                ..current.state
            },
            ..current
        };
        upsert_card_state(tx, &updated)?;
        Ok(updated)
    })
}

/// The user's most recent reviews, newest first.
pub fn review_history(db: &Database, user_id: UserId, limit: usize) -> Fallible<Vec<ReviewEvent>> {
    db.transact(|tx| select_review_events(tx, user_id, limit))
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub due_cards_count: usize,
    /// Reviews since midnight UTC.
    pub reviews_today: usize,
    pub total_reviews: usize,
    /// Mean rating over all reviews, or zero if there are none.
    pub average_rating: f64,
}

pub fn study_stats(db: &Database, user_id: UserId, now: Timestamp) -> Fallible<StudyStats> {
    db.transact(|tx| {
        let due_cards_count = select_due_card_states(tx, user_id, now, usize::MAX)?.len();
        let summary = summarize_reviews(tx, user_id, now.start_of_day())?;
        Ok(StudyStats {
            due_cards_count,
            reviews_today: summary.since,
            total_reviews: summary.total,
            average_rating: summary.average_rating.unwrap_or(0.0),
        })
    })
}

/// Look up a set, failing unless `user_id` is its author.
pub fn owned_set(conn: &Connection, user_id: UserId, set_id: SetId) -> Fallible<FlashcardSet> {
    let Some(set) = select_set(conn, set_id)? else {
        return Err(ErrorReport::not_found("Flashcard set not found"));
    };
    if set.author_user_id != user_id {
        return Err(ErrorReport::forbidden("Not enough permissions"));
    }
    Ok(set)
}

fn owned_item(conn: &Connection, user_id: UserId, item_id: ItemId) -> Fallible<FlashcardItem> {
    let Some(item) = select_item(conn, item_id)? else {
        return Err(ErrorReport::not_found("Flashcard item not found"));
    };
    owned_set(conn, user_id, item.set_id)?;
    Ok(item)
}

fn load_or_create_state(
    conn: &Connection,
    user_id: UserId,
    item: &FlashcardItem,
) -> Fallible<CardStateRecord> {
    if let Some(record) = select_card_state(conn, user_id, item.id)? {
        return Ok(record);
    }
    let record = CardStateRecord {
        user_id,
        set_id: item.set_id,
        item_id: item.id,
        state: CardState::default(),
    };
    upsert_card_state(conn, &record)?;
    Ok(record)
}
