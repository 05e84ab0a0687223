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

use std::path::PathBuf;

use clap::Parser;

use crate::api::server::start_server;
use crate::cmd::stats::print_study_stats;
use crate::config::Config;
use crate::error::Fallible;
use crate::types::ids::UserId;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Start the HTTP server.
    Serve {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// The address to listen on. Overrides the config file.
        #[arg(long)]
        bind: Option<String>,
        /// Path to the SQLite database. Overrides the config file.
        #[arg(long)]
        database: Option<String>,
    },
    /// Print a user's study statistics as JSON.
    Stats {
        /// Path to the SQLite database.
        #[arg(long, default_value = "classcards.db")]
        database: String,
        /// The user's ID.
        #[arg(long)]
        user: UserId,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Serve {
            config,
            bind,
            database,
        } => {
            let mut config: Config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(database) = database {
                config.database = database;
            }
            start_server(config).await
        }
        Command::Stats { database, user } => print_study_stats(&database, user),
    }
}
