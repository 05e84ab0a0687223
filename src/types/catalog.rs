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
use crate::types::ids::SetId;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    pub id: SetId,
    pub author_user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardItem {
    pub id: ItemId,
    pub set_id: SetId,
    pub created_by_user_id: UserId,
    pub front_text: String,
    pub back_text: String,
    /// Free-form notes shown with the answer.
    pub extra: Option<String>,
    pub created_at: Timestamp,
}
