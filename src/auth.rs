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

use std::{
    iter,
    time::{SystemTime, UNIX_EPOCH},
};

use crypto::scrypt::{scrypt_check, scrypt_simple, ScryptParams};
use jsonwebtoken::{
    decode as jwt_decode, encode as jwt_encode, DecodingKey, EncodingKey, Header as JWTHeader,
    Validation,
};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{json, with_status, Json, WithStatus},
    Filter, Rejection, Reply,
};

use crate::{
    db, guard,
    user::{self, User},
    Error,
};

const TOKEN_LIFETIME_SECONDS: u64 = 604800;

const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

pub fn api(
    db_pool: db::Pool,
    jwt_key: EncodingKey,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let register = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db_pool.clone()))
        .and(guard::with_jwt_priv_key(jwt_key.clone()))
        .and_then(register);

    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db_pool))
        .and(guard::with_jwt_priv_key(jwt_key))
        .and_then(login);

    register.or(login)
}

/// The input data type of a register request.
#[derive(Serialize, Deserialize)]
pub struct Register {
    pub username: String,
    pub password: String,
}

/// The input data type of a login request.
#[derive(Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// The response type of both register and login.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResp {
    pub access_token: String,
    pub user: User,
}

/// The claims of a JWT bearer token. Verification is stateless; the
/// guard resolves `sub` to a live user afterwards.
#[derive(Debug, Serialize, Deserialize)]
pub struct BearerToken {
    pub sub: i32,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

impl BearerToken {
    pub fn issue(user: &User, key: &EncodingKey) -> Result<String, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs();
        let claims = BearerToken {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECONDS,
        };
        Ok(jwt_encode(&JWTHeader::default(), &claims, key)?)
    }

    pub fn verify_token(key: &DecodingKey, raw: &str) -> Result<BearerToken, Error> {
        let validation = Validation {
            leeway: 60,
            ..Default::default()
        };
        Ok(jwt_decode::<BearerToken>(raw, key, &validation)?.claims)
    }
}

async fn register(
    form: Register,
    pool: db::Pool,
    jwt_key: EncodingKey,
) -> Result<WithStatus<Json>, Rejection> {
    if form.username.trim().is_empty() {
        return Err(Rejection::from(Error::MalformedRequest(
            "username must not be empty",
        )));
    }
    if form.password.is_empty() {
        return Err(Rejection::from(Error::MalformedRequest(
            "password must not be empty",
        )));
    }

    let params = ScryptParams::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P);
    let password_hash = scrypt_simple(form.password.as_str(), &params).map_err(Error::IOError)?;

    if user::find_by_username(&pool, form.username.as_str())
        .await?
        .is_some()
    {
        return Err(Rejection::from(Error::Conflict));
    }

    let conn = db::get_db_conn(&pool).await?;
    // The first account in an empty table becomes the admin. The check
    // rides in the same statement as the insert; racing registrations
    // beyond that are left to the database.
    let row = conn
        .query_one(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES ($1, $2,
                CASE WHEN (SELECT COUNT(*) FROM users) = 0 THEN 'admin' ELSE 'user' END)
            RETURNING id, username, role
            "#,
            &[&form.username, &password_hash],
        )
        .await
        .map_err(Error::DBError)?;

    let user = User::from(&row);
    let token = BearerToken::issue(&user, &jwt_key)?;
    Ok(with_status(
        json(&AuthResp {
            access_token: token,
            user,
        }),
        StatusCode::CREATED,
    ))
}

async fn login(form: Login, pool: db::Pool, jwt_key: EncodingKey) -> Result<Json, Rejection> {
    let conn = db::get_db_conn(&pool).await?;
    // Unknown usernames and bad passwords take the same error path so the
    // response never reveals which check failed.
    let row = conn
        .query_opt(
            "SELECT id, username, role, password_hash FROM users WHERE username = $1",
            &[&form.username],
        )
        .await
        .map_err(Error::DBError)?
        .ok_or(Error::InvalidCredentials)?;

    let password_hash: String = row.get("password_hash");
    let verified = scrypt_check(form.password.as_str(), password_hash.as_str())
        .map_err(|_| Error::InvalidCredentials)?;
    if !verified {
        return Err(Rejection::from(Error::InvalidCredentials));
    }

    let user = User::from(&row);
    let token = BearerToken::issue(&user, &jwt_key)?;
    Ok(json(&AuthResp {
        access_token: token,
        user,
    }))
}

pub fn random_string(len: usize) -> String {
    let mut rng = thread_rng();
    iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .take(len)
        .collect::<String>()
}
