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

use std::{convert::Infallible, env, fs};

use jsonwebtoken::{DecodingKey, EncodingKey};
use warp::{Filter, Reply};

pub mod guard;

pub mod auth;
pub mod card;
pub mod seed;
pub mod user;

pub mod db;

mod error;
pub use error::{handle_rejects, Error};

pub const DEFAULT_DATABASE_URL: &'static str = "postgres://postgres@0.0.0.0:5432";

/// The source of the JWT signing material. `KeyPair` holds paths to PEM
/// encoded RSA keys.
pub enum JWTConfig {
    Secret(String),
    KeyPair(String, String),
}

pub async fn app(
    db_pool: db::Pool,
    jwt: Option<JWTConfig>,
) -> Result<impl Filter<Extract = impl Reply, Error = Infallible> + Clone, Error> {
    let jwt = jwt.or_else(|| match env::var("JWT_SECRET") {
        Ok(secret) => Some(JWTConfig::Secret(secret)),
        _ => match (env::var("JWT_PRIVATE_KEY"), env::var("JWT_PUBLIC_KEY")) {
            (Ok(private), Ok(public)) => Some(JWTConfig::KeyPair(private, public)),
            _ => None,
        },
    });

    let (jwt_priv, jwt_pub): (EncodingKey, DecodingKey<'static>) = match jwt {
        Some(JWTConfig::Secret(secret)) => (
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()).into_static(),
        ),
        Some(JWTConfig::KeyPair(private, public)) => (
            EncodingKey::from_rsa_pem(fs::read(private)?.as_ref())?,
            DecodingKey::from_rsa_pem(fs::read(public)?.as_ref())?.into_static(),
        ),
        None => {
            // Tokens signed with a generated secret do not survive a
            // restart.
            let secret = auth::random_string(32);
            (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()).into_static(),
            )
        }
    };

    let gui = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(include_str!("../web-gui/index.html")));

    let auth_api = auth::api(db_pool.clone(), jwt_priv);
    let card_api = card::api(db_pool.clone(), jwt_pub.clone());
    let admin_api = seed::api(db_pool, jwt_pub);

    let route = gui
        .or(auth_api)
        .or(card_api)
        .or(admin_api)
        .with(warp::filters::trace::request())
        .recover(error::handle_rejects);
    Ok(route)
}
