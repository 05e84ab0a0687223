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

use serde::Serialize;

use crate::types::ids::ItemId;
use crate::types::ids::ReviewId;
use crate::types::ids::SessionId;
use crate::types::ids::UserId;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// An entry in the append-only review log.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: ReviewId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: Rating,
    pub reviewed_at: Timestamp,
    /// How long the user took to answer, if the client measured it.
    pub time_taken_ms: Option<u32>,
    pub session_id: Option<SessionId>,
    /// The card's interval before the review.
    pub prev_interval: u32,
    /// The interval the scheduler assigned.
    pub next_interval: u32,
    pub algorithm_version: u32,
}

/// Client-supplied metadata attached to a review.
#[derive(Clone, Copy, Default, Debug)]
pub struct ReviewMetadata {
    pub time_taken_ms: Option<u32>,
    pub session_id: Option<SessionId>,
}
