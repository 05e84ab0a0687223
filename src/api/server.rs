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

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;

use crate::api::catalog::create_item_handler;
use crate::api::catalog::create_set_handler;
use crate::api::catalog::create_user_handler;
use crate::api::catalog::list_items_handler;
use crate::api::response::Detail;
use crate::api::state::ServerState;
use crate::api::study::due_handler;
use crate::api::study::history_handler;
use crate::api::study::reset_handler;
use crate::api::study::review_handler;
use crate::api::study::set_cards_handler;
use crate::api::study::stats_handler;
use crate::api::study::suspend_handler;
use crate::config::Config;
use crate::db::Database;
use crate::error::Fallible;

pub async fn start_server(config: Config) -> Fallible<()> {
    log::debug!("Opening database {}", config.database);
    let db = Database::new(&config.database)?;
    let bind = config.bind.clone();
    let state = ServerState {
        db,
        config: Arc::new(config),
    };
    let app = router(state);

    log::info!("Starting server on {bind}");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped.");
    Ok(())
}

fn router(state: ServerState) -> Router {
    let app = Router::new();
    let app = app.route("/users", post(create_user_handler));
    let app = app.route("/flashcard-sets", post(create_set_handler));
    let app = app.route(
        "/flashcard-sets/{set_id}/items",
        get(list_items_handler).post(create_item_handler),
    );
    let app = app.route("/study/due", get(due_handler));
    let app = app.route("/study/sets/{set_id}/cards", get(set_cards_handler));
    let app = app.route("/study/sets/{set_id}/reset", post(reset_handler));
    let app = app.route("/study/review", post(review_handler));
    let app = app.route("/study/items/{item_id}/suspended", put(suspend_handler));
    let app = app.route("/study/stats", get(stats_handler));
    let app = app.route("/study/reviews", get(history_handler));
    let app = app.fallback(not_found_handler);
    app.with_state(state)
}

async fn not_found_handler() -> (StatusCode, Json<Detail>) {
    (StatusCode::NOT_FOUND, Detail::new("Not Found"))
}

async fn shutdown_signal() {
    match ctrl_c().await {
        Ok(()) => log::info!("Received interrupt, shutting down."),
        Err(e) => {
            // Without a signal handler, run until the process is killed.
            log::error!("failed to listen for interrupt: {e}");
            std::future::pending::<()>().await;
        }
    }
}
