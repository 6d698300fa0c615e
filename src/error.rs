/*
 * Copyright (C) 2020 Oakes, Gregory <gregoryoakes@fastmail.com>
 * Author: Oakes, Gregory <gregory.oakes@fastmail.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::convert::Infallible;

use jsonwebtoken::errors::ErrorKind as JWTErrorKind;
use mobc_postgres::tokio_postgres::error::SqlState;
use serde::Serialize;
use warp::{http::StatusCode, reject, Rejection, Reply};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    DBPoolError(#[from] mobc::Error<mobc_postgres::tokio_postgres::Error>),
    #[error(transparent)]
    DBError(#[from] mobc_postgres::tokio_postgres::Error),
    #[error("{0}")]
    MalformedRequest(&'static str),
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized request")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    JWTError(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl reject::Reject for Error {}

impl From<Error> for Rejection {
    fn from(item: Error) -> Rejection {
        reject::custom(item)
    }
}

#[derive(Serialize)]
struct ErrorMessage {
    message: String,
}

pub async fn handle_rejects(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<Error>() {
        match e {
            Error::MalformedRequest(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            Error::Conflict => (StatusCode::CONFLICT, e.to_string()),
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, e.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, e.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            Error::JWTError(e) => match e.kind() {
                JWTErrorKind::InvalidToken
                | JWTErrorKind::InvalidSignature
                | JWTErrorKind::ExpiredSignature => {
                    (StatusCode::UNAUTHORIZED, "unauthorized request".to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                ),
            },
            Error::DBError(e) => {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    (StatusCode::CONFLICT, "Username already exists".to_string())
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        }
    } else if let Some(_) = err.find::<warp::reject::MethodNotAllowed>() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorMessage { message }),
        code,
    ))
}
