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

use jsonwebtoken::{DecodingKey, EncodingKey};
use warp::{Filter, Rejection};

use crate::{
    auth::BearerToken,
    db,
    user::{self, Role, User},
    Error,
};

pub fn with_db(
    db_pool: db::Pool,
) -> impl Filter<Extract = (db::Pool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_jwt_priv_key(
    priv_key: EncodingKey,
) -> impl Filter<Extract = (EncodingKey,), Error = Infallible> + Clone {
    warp::any().map(move || priv_key.clone())
}

/// Resolves the bearer token on the request to the live user record it
/// was issued for. A token whose subject no longer exists rejects as
/// unauthorized rather than panicking downstream.
pub fn authenticated(
    db_pool: db::Pool,
    pub_key: DecodingKey<'static>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_db(db_pool))
        .and_then(move |header: Option<String>, pool: db::Pool| {
            let k = pub_key.clone();
            async move {
                let header = header.ok_or(Error::Unauthorized)?;
                let raw = header.strip_prefix("Bearer ").ok_or(Error::Unauthorized)?;
                let tok = BearerToken::verify_token(&k, raw)?;
                user::find_by_id(&pool, tok.sub)
                    .await?
                    .ok_or_else(|| Rejection::from(Error::Unauthorized))
            }
        })
}

/// Same as `authenticated`, but only admits admin accounts.
pub fn admin(
    db_pool: db::Pool,
    pub_key: DecodingKey<'static>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    authenticated(db_pool, pub_key).and_then(|user: User| async move {
        if user.role == Role::Admin {
            Ok(user)
        } else {
            Err(Rejection::from(Error::Forbidden("Admin access required")))
        }
    })
}
