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

use std::path::Path;

use crate::catalog::find_user;
use crate::db::Database;
use crate::error::Fallible;
use crate::error::fail;
use crate::study::StudyStats;
use crate::study::study_stats;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

pub fn print_study_stats(database: &str, user_id: UserId) -> Fallible<()> {
    let json = study_stats_json(database, user_id, Timestamp::now())?;
    println!("{json}");
    Ok(())
}

fn study_stats_json(database: &str, user_id: UserId, now: Timestamp) -> Fallible<String> {
    // Opening a missing path would silently create an empty database.
    if !Path::new(database).exists() {
        return fail("database does not exist.");
    }
    let db = Database::new(database)?;
    if find_user(&db, user_id)?.is_none() {
        return fail(format!("no user with ID {user_id}."));
    }
    let stats: StudyStats = study_stats(&db, user_id, now)?;
    Ok(serde_json::to_string_pretty(&stats)?)
}
