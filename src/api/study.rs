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

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use serde::Deserialize;
use serde::Serialize;

use crate::api::extract::CurrentUser;
use crate::api::extract::JsonBody;
use crate::api::state::ServerState;
use crate::error::Fallible;
use crate::study::StudyStats;
use crate::study::due_cards;
use crate::study::reset_progress;
use crate::study::review_history;
use crate::study::set_card_states;
use crate::study::set_suspended;
use crate::study::study_stats;
use crate::study::submit_review;
use crate::types::card_state::CardStateRecord;
use crate::types::ids::ItemId;
use crate::types::ids::SessionId;
use crate::types::ids::SetId;
use crate::types::rating::Rating;
use crate::types::review_event::ReviewEvent;
use crate::types::review_event::ReviewMetadata;
use crate::types::timestamp::Timestamp;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

pub async fn due_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Fallible<Json<Vec<CardStateRecord>>> {
    let limit = state.config.due_limit(query.limit);
    let cards = due_cards(&state.db, user_id, limit, Timestamp::now())?;
    Ok(Json(cards))
}

pub async fn set_cards_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(set_id): Path<SetId>,
) -> Fallible<Json<Vec<CardStateRecord>>> {
    let cards = set_card_states(&state.db, user_id, set_id)?;
    Ok(Json(cards))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    item_id: ItemId,
    /// Validated into a `Rating` by the handler, so that an out-of-range
    /// value is reported as an invalid rating rather than a malformed body.
    rating: i64,
    reviewed_at: Option<Timestamp>,
    time_taken_ms: Option<u32>,
    session_id: Option<SessionId>,
}

pub async fn review_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(request): JsonBody<ReviewRequest>,
) -> Fallible<Json<ReviewEvent>> {
    let rating = Rating::try_from(request.rating)?;
    let metadata = ReviewMetadata {
        time_taken_ms: request.time_taken_ms,
        session_id: request.session_id,
    };
    let event = submit_review(
        &state.db,
        user_id,
        request.item_id,
        rating,
        request.reviewed_at,
        metadata,
    )?;
    Ok(Json(event))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    message: String,
    reset_count: usize,
}

pub async fn reset_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(set_id): Path<SetId>,
) -> Fallible<Json<ResetResponse>> {
    let reset_count = reset_progress(&state.db, user_id, set_id)?;
    Ok(Json(ResetResponse {
        message: "Set progress reset successfully".to_string(),
        reset_count,
    }))
}

#[derive(Deserialize)]
pub struct SuspendRequest {
    suspended: bool,
}

pub async fn suspend_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    JsonBody(request): JsonBody<SuspendRequest>,
) -> Fallible<Json<CardStateRecord>> {
    let record = set_suspended(&state.db, user_id, item_id, request.suspended)?;
    Ok(Json(record))
}

pub async fn stats_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> Fallible<Json<StudyStats>> {
    let stats = study_stats(&state.db, user_id, Timestamp::now())?;
    Ok(Json(stats))
}

pub async fn history_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Fallible<Json<Vec<ReviewEvent>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let events = review_history(&state.db, user_id, limit)?;
    Ok(Json(events))
}
