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
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::http::request::Parts;

use crate::api::state::ServerState;
use crate::catalog::find_user;
use crate::error::ErrorKind;
use crate::error::ErrorReport;
use crate::types::ids::UserId;

/// Set by the authenticating gateway in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request.
pub struct CurrentUser(pub UserId);

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = ErrorReport;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Err(unauthenticated("missing user ID header"));
        };
        let user_id: UserId = value
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unauthenticated("malformed user ID header"))?;
        if find_user(&state.db, user_id)?.is_none() {
            return Err(unauthenticated("unknown user"));
        }
        Ok(CurrentUser(user_id))
    }
}

fn unauthenticated(message: &str) -> ErrorReport {
    ErrorReport::with_kind(ErrorKind::Unauthenticated, message)
}

/// A JSON request body. Unlike `Json`, a body that fails to parse is
/// reported with the same `{"detail": ...}` shape as every other error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ErrorReport;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ErrorReport::with_kind(
                ErrorKind::BadRequest,
                rejection.body_text(),
            )),
        }
    }
}
