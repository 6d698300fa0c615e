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

use mobc_postgres::tokio_postgres::row::Row;
use serde::{Deserialize, Serialize};

use crate::{db, Error};

/// The access level of an account. The first account ever registered
/// becomes the admin; everyone after that is a regular user.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The public projection of an account. The password hash never leaves
/// the database layer.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl<'a> From<&'a Row> for User {
    fn from(item: &'a Row) -> Self {
        let role: String = item.get("role");
        User {
            id: item.get("id"),
            username: item.get("username"),
            role: match role.as_str() {
                "admin" => Role::Admin,
                _ => Role::User,
            },
        }
    }
}

pub async fn find_by_id(pool: &db::Pool, id: i32) -> Result<Option<User>, Error> {
    let row = db::get_db_conn(pool)
        .await?
        .query_opt("SELECT id, username, role FROM users WHERE id = $1", &[&id])
        .await
        .map_err(Error::DBError)?;
    Ok(row.as_ref().map(User::from))
}

pub async fn find_by_username(pool: &db::Pool, username: &str) -> Result<Option<User>, Error> {
    let row = db::get_db_conn(pool)
        .await?
        .query_opt(
            "SELECT id, username, role FROM users WHERE username = $1",
            &[&username],
        )
        .await
        .map_err(Error::DBError)?;
    Ok(row.as_ref().map(User::from))
}
