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

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;

/// Server configuration, read from a TOML file. Every key is optional.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The address to listen on.
    pub bind: String,
    /// Path to the SQLite database.
    pub database: String,
    /// How many due cards to return when the client does not say.
    pub default_due_limit: usize,
    /// Requests for more due cards than this are capped.
    pub max_due_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            database: "classcards.db".to_string(),
            default_due_limit: 20,
            max_due_limit: 1000,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            return fail(format!("config file {} does not exist.", path.display()));
        }
        let content = read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Fallible<()> {
        if self.default_due_limit == 0 || self.max_due_limit == 0 {
            return fail("due limits must be positive.");
        }
        if self.default_due_limit > self.max_due_limit {
            return fail("default_due_limit must not exceed max_due_limit.");
        }
        Ok(())
    }

    /// Resolve the number of due cards to return for a request.
    pub fn due_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_due_limit)
            .min(self.max_due_limit)
    }
}
