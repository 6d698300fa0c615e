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

use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use mobc_postgres::tokio_postgres::row::Row;
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{json, with_status, Json, WithStatus},
    Filter, Rejection, Reply,
};

use crate::{
    db, guard,
    user::{Role, User},
    Error,
};

pub fn api(
    db_pool: db::Pool,
    jwt_key: DecodingKey<'static>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_cards = warp::get()
        .and(warp::path("cards"))
        .and(warp::path::end())
        .and(warp::query())
        .and(guard::with_db(db_pool.clone()))
        .and_then(list_cards);

    let read_card = warp::get()
        .and(warp::path("cards"))
        .and(warp::path::param())
        .and(warp::path::end())
        .and(guard::with_db(db_pool.clone()))
        .and_then(read_card);

    let create_card = warp::post()
        .and(warp::path("cards"))
        .and(warp::path::end())
        .and(guard::authenticated(db_pool.clone(), jwt_key.clone()))
        .and(warp::body::json())
        .and(guard::with_db(db_pool.clone()))
        .and_then(create_card);

    let update_card = warp::put()
        .and(warp::path("cards"))
        .and(warp::path::param())
        .and(warp::path::end())
        .and(guard::authenticated(db_pool.clone(), jwt_key.clone()))
        .and(warp::body::json())
        .and(guard::with_db(db_pool.clone()))
        .and_then(update_card);

    let delete_card = warp::delete()
        .and(warp::path("cards"))
        .and(warp::path::param())
        .and(warp::path::end())
        .and(guard::authenticated(db_pool.clone(), jwt_key))
        .and(guard::with_db(db_pool))
        .and_then(delete_card);

    list_cards
        .or(read_card)
        .or(create_card)
        .or(update_card)
        .or(delete_card)
}

/// A single vocabulary flashcard. Seeded reference cards carry
/// `is_system_card` and no author.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i32,
    pub chinese: String,
    pub pinyin: Option<String>,
    pub vietnamese: String,
    pub categories: Vec<String>,
    pub author_id: Option<i32>,
    pub is_system_card: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Row> for Card {
    fn from(item: &'a Row) -> Self {
        Card {
            id: item.get("id"),
            chinese: item.get("chinese"),
            pinyin: item.get("pinyin"),
            vietnamese: item.get("vietnamese"),
            categories: item.get("categories"),
            author_id: item.get("author_id"),
            is_system_card: item.get("is_system_card"),
            created_at: item.get("created_at"),
            updated_at: item.get("updated_at"),
        }
    }
}

/// The input data type of a card creation request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCard {
    pub chinese: String,
    pub pinyin: Option<String>,
    pub vietnamese: String,
    pub categories: Option<Vec<String>>,
}

/// The input data type of a card update request. Only supplied fields
/// change; `is_system_card` is not settable through this path.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateCard {
    pub chinese: Option<String>,
    pub pinyin: Option<String>,
    pub vietnamese: Option<String>,
    pub categories: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
pub struct CardQuery {
    category: Option<String>,
}

fn card_not_found(id: i32) -> Error {
    Error::NotFound(format!("Card with ID {} not found", id))
}

async fn list_cards(query: CardQuery, pool: db::Pool) -> Result<Json, Rejection> {
    let conn = db::get_db_conn(&pool).await?;
    Ok(json(
        &conn
            .query(
                r#"
                SELECT * FROM cards
                WHERE $1::TEXT IS NULL OR $1 = ANY(categories)
                ORDER BY id
                "#,
                &[&query.category],
            )
            .await
            .map_err(Error::DBError)?
            .iter()
            .map(Card::from)
            .collect::<Vec<Card>>(),
    ))
}

async fn read_card(id: i32, pool: db::Pool) -> Result<Json, Rejection> {
    let conn = db::get_db_conn(&pool).await?;
    let row = conn
        .query_opt("SELECT * FROM cards WHERE id = $1", &[&id])
        .await
        .map_err(Error::DBError)?
        .ok_or_else(|| card_not_found(id))?;
    Ok(json(&Card::from(&row)))
}

async fn create_card(
    user: User,
    form: CreateCard,
    pool: db::Pool,
) -> Result<WithStatus<Json>, Rejection> {
    if form.chinese.trim().is_empty() {
        return Err(Rejection::from(Error::MalformedRequest(
            "chinese must not be empty",
        )));
    }
    if form.vietnamese.trim().is_empty() {
        return Err(Rejection::from(Error::MalformedRequest(
            "vietnamese must not be empty",
        )));
    }

    let categories = form.categories.unwrap_or_default();
    let conn = db::get_db_conn(&pool).await?;
    let row = conn
        .query_one(
            r#"
            INSERT INTO cards (chinese, pinyin, vietnamese, categories, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
            &[
                &form.chinese,
                &form.pinyin,
                &form.vietnamese,
                &categories,
                &user.id,
            ],
        )
        .await
        .map_err(Error::DBError)?;
    Ok(with_status(json(&Card::from(&row)), StatusCode::CREATED))
}

/// Admins may touch any card; everyone else only their own.
async fn authorize_card_access(
    conn: &db::Conn,
    id: i32,
    user: &User,
    denied: &'static str,
) -> Result<(), Error> {
    let row = conn
        .query_opt("SELECT author_id FROM cards WHERE id = $1", &[&id])
        .await
        .map_err(Error::DBError)?
        .ok_or_else(|| card_not_found(id))?;
    let author_id: Option<i32> = row.get("author_id");
    if user.role != Role::Admin && author_id != Some(user.id) {
        return Err(Error::Forbidden(denied));
    }
    Ok(())
}

async fn update_card(
    id: i32,
    user: User,
    form: UpdateCard,
    pool: db::Pool,
) -> Result<Json, Rejection> {
    if let Some(chinese) = form.chinese.as_ref() {
        if chinese.trim().is_empty() {
            return Err(Rejection::from(Error::MalformedRequest(
                "chinese must not be empty",
            )));
        }
    }
    if let Some(vietnamese) = form.vietnamese.as_ref() {
        if vietnamese.trim().is_empty() {
            return Err(Rejection::from(Error::MalformedRequest(
                "vietnamese must not be empty",
            )));
        }
    }

    let conn = db::get_db_conn(&pool).await?;
    authorize_card_access(&conn, id, &user, "You can only update your own cards").await?;
    let row = conn
        .query_one(
            r#"
            UPDATE cards
            SET chinese = COALESCE($1, chinese),
                pinyin = COALESCE($2, pinyin),
                vietnamese = COALESCE($3, vietnamese),
                categories = COALESCE($4, categories),
                updated_at = now()
            WHERE id = $5
            RETURNING *
            "#,
            &[
                &form.chinese,
                &form.pinyin,
                &form.vietnamese,
                &form.categories,
                &id,
            ],
        )
        .await
        .map_err(Error::DBError)?;
    Ok(json(&Card::from(&row)))
}

async fn delete_card(id: i32, user: User, pool: db::Pool) -> Result<Json, Rejection> {
    let conn = db::get_db_conn(&pool).await?;
    authorize_card_access(&conn, id, &user, "You can only delete your own cards").await?;
    conn.execute("DELETE FROM cards WHERE id = $1", &[&id])
        .await
        .map_err(Error::DBError)?;
    Ok(json(&serde_json::json!({
        "message": "Card deleted successfully"
    })))
}
