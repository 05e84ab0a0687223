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

use crate::scheduler::INITIAL_EASE_FACTOR;
use crate::types::ids::ItemId;
use crate::types::ids::SetId;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

/// The memory-strength state of one card for one user.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    /// Multiplier applied to the interval on successful recall. Never below
    /// `MIN_EASE_FACTOR`.
    pub ease_factor: f64,
    /// Days until the next review. Zero if the card was never scheduled.
    pub interval_days: u32,
    /// Consecutive successful reviews since the last lapse.
    pub streak: u32,
    /// Failed reviews over the card's lifetime.
    pub lapses: u32,
    /// Suspended cards are never due.
    pub suspended: bool,
    /// When the card is next due. `None` means it is due now.
    pub due_at: Option<Timestamp>,
    pub last_reviewed_at: Option<Timestamp>,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            streak: 0,
            lapses: 0,
            suspended: false,
            due_at: None,
            last_reviewed_at: None,
        }
    }
}

/// A card state together with the keys it is stored under.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStateRecord {
    pub user_id: UserId,
    pub set_id: SetId,
    pub item_id: ItemId,
    #[serde(flatten)]
    pub state: CardState,
}
