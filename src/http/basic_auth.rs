/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::gluster::peer_client::API_USER;
use crate::http::error::CustomError;
use crate::http::shared::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const BASIC_SCHEME: &str = "basic ";

/// Splits a `Basic <base64(user:password)>` header value into its parts.
pub fn decode_credentials(header: &str) -> Option<(String, String)> {
    let header = header.trim();
    let scheme = header.get(..BASIC_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return None;
    }

    let decoded = STANDARD.decode(header[BASIC_SCHEME.len()..].trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_owned(), password.to_owned()))
}

/// Runs in constant time for candidates of the secret's length.
pub fn secret_matches(candidate: &str, expected: &str) -> bool {
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

pub async fn basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, CustomError> {
    let credentials = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(decode_credentials);

    match credentials {
        Some((user, password)) if user == API_USER && secret_matches(&password, &state.secret) => {
            Ok(next.run(request).await)
        }
        _ => {
            warn!("Rejected unauthenticated request to: {}", request.uri().path());
            Err(CustomError::Unauthorized)
        }
    }
}
