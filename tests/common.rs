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

#![allow(dead_code)]

use std::process::Command;

use jsonwebtoken::{DecodingKey, EncodingKey};

use hanviet::db;

pub fn secret() -> String {
    "test-secret".to_string()
}

pub fn jwt_encoder() -> EncodingKey {
    EncodingKey::from_secret(secret().as_bytes())
}

pub fn jwt_decoder() -> DecodingKey<'static> {
    DecodingKey::from_secret(secret().as_bytes()).into_static()
}

/// Boots a throwaway PostgreSQL instance via pg_tmp and returns a pool
/// bound to it. Every caller gets an isolated, empty database.
pub async fn db_pool() -> db::Pool {
    let out = Command::new("pg_tmp")
        .output()
        .expect("valid pg_tmp instance");
    let url = String::from_utf8_lossy(out.stdout.as_ref())
        .trim()
        .to_string();
    let pool = db::create_pool(url.as_str()).expect("valid database pool");
    db::init_db(&pool).await.expect("initialized database schema");
    pool
}
