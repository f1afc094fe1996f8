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

use crate::error::PortalError;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum CustomError {
    #[error(transparent)]
    Error(#[from] PortalError),
    #[error("Unauthorized")]
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<String>>,
}

impl CustomError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CustomError::Error(PortalError::Validation(_)) => StatusCode::BAD_REQUEST,
            CustomError::Error(PortalError::Permission { .. }) => StatusCode::FORBIDDEN,
            CustomError::Error(PortalError::NotFound(_)) => StatusCode::NOT_FOUND,
            CustomError::Error(PortalError::Execution(_))
            | CustomError::Error(PortalError::Configuration(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CustomError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for CustomError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let CustomError::Unauthorized = self {
            return (status, [(WWW_AUTHENTICATE, "Basic")]).into_response();
        }
        if status.is_server_error() {
            error!("Request failed with status: {status}, error: {self}");
        }

        let (code, admins) = match &self {
            CustomError::Error(error @ PortalError::Permission { admins, .. }) => {
                (error.as_code(), Some(admins.clone()))
            }
            CustomError::Error(error) => (error.as_code(), None),
            CustomError::Unauthorized => ("unauthorized", None),
        };
        let body = ErrorResponse {
            code: code.to_owned(),
            message: self.to_string(),
            admins,
        };
        (status, Json(body)).into_response()
    }
}
