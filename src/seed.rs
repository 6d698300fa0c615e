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

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use warp::{
    reply::{json, Json},
    Filter, Rejection, Reply,
};

use crate::{db, guard, user::User, Error};

/// One entry of the reference vocabulary installed by the seed routine.
pub struct SeedCard {
    pub chinese: &'static str,
    pub pinyin: &'static str,
    pub vietnamese: &'static str,
    pub categories: &'static [&'static str],
}

pub const SEED_CARDS: [SeedCard; 15] = [
    SeedCard {
        chinese: "你好",
        pinyin: "nǐ hǎo",
        vietnamese: "Xin chào",
        categories: &["Greetings"],
    },
    SeedCard {
        chinese: "谢谢",
        pinyin: "xiè xie",
        vietnamese: "Cảm ơn",
        categories: &["Greetings", "Common"],
    },
    SeedCard {
        chinese: "再见",
        pinyin: "zài jiàn",
        vietnamese: "Tạm biệt",
        categories: &["Greetings"],
    },
    SeedCard {
        chinese: "是的",
        pinyin: "shì de",
        vietnamese: "Đúng / Vâng",
        categories: &["Common"],
    },
    SeedCard {
        chinese: "不是",
        pinyin: "bù shì",
        vietnamese: "Không",
        categories: &["Common"],
    },
    SeedCard {
        chinese: "请",
        pinyin: "qǐng",
        vietnamese: "Xin / Làm ơn",
        categories: &["Common"],
    },
    SeedCard {
        chinese: "对不起",
        pinyin: "duì bu qǐ",
        vietnamese: "Xin lỗi",
        categories: &["Common"],
    },
    SeedCard {
        chinese: "水",
        pinyin: "shuǐ",
        vietnamese: "Nước",
        categories: &["Food & Drink"],
    },
    SeedCard {
        chinese: "饭",
        pinyin: "fàn",
        vietnamese: "Cơm",
        categories: &["Food & Drink"],
    },
    SeedCard {
        chinese: "茶",
        pinyin: "chá",
        vietnamese: "Trà",
        categories: &["Food & Drink"],
    },
    SeedCard {
        chinese: "一",
        pinyin: "yī",
        vietnamese: "Một",
        categories: &["Numbers"],
    },
    SeedCard {
        chinese: "二",
        pinyin: "èr",
        vietnamese: "Hai",
        categories: &["Numbers"],
    },
    SeedCard {
        chinese: "三",
        pinyin: "sān",
        vietnamese: "Ba",
        categories: &["Numbers"],
    },
    SeedCard {
        chinese: "四",
        pinyin: "sì",
        vietnamese: "Bốn",
        categories: &["Numbers"],
    },
    SeedCard {
        chinese: "五",
        pinyin: "wǔ",
        vietnamese: "Năm",
        categories: &["Numbers"],
    },
];

/// Installs the reference vocabulary. Idempotent: backfills missing
/// pinyin on existing system cards (matched by their chinese text),
/// inserts seed entries not yet present, and never duplicates a row or
/// overwrites a non-empty pinyin.
pub async fn seed_cards(pool: &db::Pool) -> Result<(), Error> {
    let conn = db::get_db_conn(pool).await?;
    let existing = conn
        .query(
            "SELECT id, chinese, pinyin FROM cards WHERE is_system_card",
            &[],
        )
        .await
        .map_err(Error::DBError)?;

    if !existing.is_empty() {
        tracing::info!(
            "found {} existing system cards, updating with pinyin",
            existing.len()
        );
        for row in existing.iter() {
            let id: i32 = row.get("id");
            let chinese: String = row.get("chinese");
            let pinyin: Option<String> = row.get("pinyin");
            if pinyin.map_or(true, |p| p.is_empty()) {
                if let Some(seed) = SEED_CARDS.iter().find(|s| s.chinese == chinese) {
                    conn.execute(
                        "UPDATE cards SET pinyin = $1, updated_at = now() WHERE id = $2",
                        &[&seed.pinyin, &id],
                    )
                    .await
                    .map_err(Error::DBError)?;
                }
            }
        }

        let mut added = 0;
        for seed in SEED_CARDS.iter() {
            let present = existing
                .iter()
                .any(|row| row.get::<_, String>("chinese") == seed.chinese);
            if !present {
                insert_seed_card(&conn, seed).await?;
                added += 1;
            }
        }
        if added > 0 {
            tracing::info!("added {} new system cards", added);
        }
        return Ok(());
    }

    for seed in SEED_CARDS.iter() {
        insert_seed_card(&conn, seed).await?;
    }
    tracing::info!("seeded {} cards", SEED_CARDS.len());
    Ok(())
}

async fn insert_seed_card(conn: &db::Conn, seed: &SeedCard) -> Result<(), Error> {
    conn.execute(
        r#"
        INSERT INTO cards (chinese, pinyin, vietnamese, categories, is_system_card)
        VALUES ($1, $2, $3, $4, TRUE)
        "#,
        &[
            &seed.chinese,
            &seed.pinyin,
            &seed.vietnamese,
            &seed.categories.to_vec(),
        ],
    )
    .await
    .map_err(Error::DBError)?;
    Ok(())
}

/// Startup variant: seeds only when no system cards exist at all, and
/// swallows every failure so the server still starts.
pub async fn auto_seed(pool: &db::Pool) {
    match count_system_cards(pool).await {
        Ok(0) => {
            tracing::info!("no system cards found, auto-seeding database");
            match seed_cards(pool).await {
                Ok(()) => tracing::info!("auto-seeding completed"),
                Err(e) => tracing::error!("auto-seed failed: {}", e),
            }
        }
        Ok(n) => tracing::info!("database already has {} system cards, skipping auto-seed", n),
        Err(e) => tracing::error!("auto-seed failed: {}", e),
    }
}

async fn count_system_cards(pool: &db::Pool) -> Result<i64, Error> {
    let row = db::get_db_conn(pool)
        .await?
        .query_one("SELECT COUNT(*) FROM cards WHERE is_system_card", &[])
        .await
        .map_err(Error::DBError)?;
    Ok(row.get(0))
}

/// The structured result of the admin seed endpoint. Failure is data
/// here, not an HTTP error, so the caller can branch on `success`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn api(
    db_pool: db::Pool,
    jwt_key: DecodingKey<'static>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::post()
        .and(warp::path("admin"))
        .and(warp::path("seed"))
        .and(warp::path::end())
        .and(guard::admin(db_pool.clone(), jwt_key))
        .and(guard::with_db(db_pool))
        .and_then(run_seed)
}

async fn run_seed(_admin: User, pool: db::Pool) -> Result<Json, Rejection> {
    let outcome = match seed_cards(&pool).await {
        Ok(()) => SeedOutcome {
            success: true,
            message: "Database seeded successfully".to_string(),
            error: None,
        },
        Err(e) => SeedOutcome {
            success: false,
            message: "Failed to seed database".to_string(),
            error: Some(e.to_string()),
        },
    };
    Ok(json(&outcome))
}
