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
use axum::extract::State;
use serde::Deserialize;

use crate::api::extract::CurrentUser;
use crate::api::extract::JsonBody;
use crate::api::state::ServerState;
use crate::catalog::add_item;
use crate::catalog::create_set;
use crate::catalog::create_user;
use crate::catalog::list_items;
use crate::error::Fallible;
use crate::types::catalog::FlashcardItem;
use crate::types::catalog::FlashcardSet;
use crate::types::catalog::User;
use crate::types::ids::SetId;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    email: String,
    display_name: Option<String>,
}

pub async fn create_user_handler(
    State(state): State<ServerState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Fallible<Json<User>> {
    let user = create_user(
        &state.db,
        &request.email,
        request.display_name.as_deref(),
    )?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct CreateSetRequest {
    title: String,
    description: Option<String>,
}

pub async fn create_set_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(request): JsonBody<CreateSetRequest>,
) -> Fallible<Json<FlashcardSet>> {
    let set = create_set(
        &state.db,
        user_id,
        &request.title,
        request.description.as_deref(),
    )?;
    Ok(Json(set))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    front_text: String,
    back_text: String,
    extra: Option<String>,
}

pub async fn create_item_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(set_id): Path<SetId>,
    JsonBody(request): JsonBody<CreateItemRequest>,
) -> Fallible<Json<FlashcardItem>> {
    let item = add_item(
        &state.db,
        user_id,
        set_id,
        &request.front_text,
        &request.back_text,
        request.extra.as_deref(),
    )?;
    Ok(Json(item))
}

pub async fn list_items_handler(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(set_id): Path<SetId>,
) -> Fallible<Json<Vec<FlashcardItem>>> {
    let items = list_items(&state.db, user_id, set_id)?;
    Ok(Json(items))
}
