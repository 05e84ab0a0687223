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

//! The minimal set of users, sets, and items the study operations need.

use crate::db::Database;
use crate::db::email_exists;
use crate::db::insert_item;
use crate::db::insert_set;
use crate::db::insert_user;
use crate::db::select_items_in_set;
use crate::db::select_user;
use crate::error::ErrorKind;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::study::owned_set;
use crate::types::catalog::FlashcardItem;
use crate::types::catalog::FlashcardSet;
use crate::types::catalog::User;
use crate::types::ids::ItemId;
use crate::types::ids::SetId;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

pub fn create_user(db: &Database, email: &str, display_name: Option<&str>) -> Fallible<User> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return bad_request(format!("invalid email address: {email:?}"));
    }
    db.transact(|tx| {
        if email_exists(tx, email)? {
            return bad_request("email address already registered");
        }
        let user = User {
            id: UserId::generate(),
            email: email.to_string(),
            display_name: display_name.map(|s| s.trim().to_string()),
            created_at: Timestamp::now(),
        };
        insert_user(tx, &user)?;
        log::info!("Created user {}", user.id);
        Ok(user)
    })
}

pub fn find_user(db: &Database, user_id: UserId) -> Fallible<Option<User>> {
    db.transact(|tx| select_user(tx, user_id))
}

pub fn create_set(
    db: &Database,
    author: UserId,
    title: &str,
    description: Option<&str>,
) -> Fallible<FlashcardSet> {
    let title = title.trim();
    if title.is_empty() {
        return bad_request("title must not be empty");
    }
    db.transact(|tx| {
        if select_user(tx, author)?.is_none() {
            return Err(ErrorReport::not_found("User not found"));
        }
        let set = FlashcardSet {
            id: SetId::generate(),
            author_user_id: author,
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: Timestamp::now(),
        };
        insert_set(tx, &set)?;
        Ok(set)
    })
}

pub fn add_item(
    db: &Database,
    user_id: UserId,
    set_id: SetId,
    front_text: &str,
    back_text: &str,
    extra: Option<&str>,
) -> Fallible<FlashcardItem> {
    if front_text.trim().is_empty() || back_text.trim().is_empty() {
        return bad_request("both sides of a card must have text");
    }
    db.transact(|tx| {
        owned_set(tx, user_id, set_id)?;
        let item = FlashcardItem {
            id: ItemId::generate(),
            set_id,
            created_by_user_id: user_id,
            front_text: front_text.trim().to_string(),
            back_text: back_text.trim().to_string(),
            extra: extra.map(str::to_string),
            created_at: Timestamp::now(),
        };
        insert_item(tx, &item)?;
        Ok(item)
    })
}

pub fn list_items(db: &Database, user_id: UserId, set_id: SetId) -> Fallible<Vec<FlashcardItem>> {
    db.transact(|tx| {
        owned_set(tx, user_id, set_id)?;
        select_items_in_set(tx, set_id)
    })
}

fn bad_request<T>(message: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport::with_kind(ErrorKind::BadRequest, message))
}
