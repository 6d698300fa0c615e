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

use warp::Filter;

use hanviet::{auth, card, db, handle_rejects, user::Role};

mod common;

#[tokio::test]
async fn auth_flow() {
    let pool = common::db_pool().await;
    let auth_api = auth::api(pool.clone(), common::jwt_encoder()).recover(handle_rejects);
    let card_api = card::api(pool.clone(), common::jwt_decoder()).recover(handle_rejects);

    // Register the very first user. An empty user table makes them the
    // admin.
    let res = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .header("Content-Type", "application/json")
        .json(&auth::Register {
            username: "alice".to_string(),
            password: "wonderland".to_string(),
        })
        .reply(&auth_api)
        .await;
    assert_eq!(res.status(), 201, "registration created new resource");
    let resp = serde_json::from_slice::<auth::AuthResp>(res.body())
        .expect("register responds with valid data");
    assert_eq!(
        resp.user.role,
        Role::Admin,
        "first registered account is the admin"
    );
    assert_eq!(resp.user.username, "alice");
    assert!(!resp.access_token.is_empty(), "register includes a token");

    // Every registration after the first yields a regular user.
    let res = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .header("Content-Type", "application/json")
        .json(&auth::Register {
            username: "bob".to_string(),
            password: "builder".to_string(),
        })
        .reply(&auth_api)
        .await;
    assert_eq!(res.status(), 201, "registration created new resource");
    let bob = serde_json::from_slice::<auth::AuthResp>(res.body())
        .expect("register responds with valid data");
    assert_eq!(
        bob.user.role,
        Role::User,
        "later registrations are regular users"
    );

    // Attempt to repeat the first registration. This request should fail.
    let res = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .header("Content-Type", "application/json")
        .json(&auth::Register {
            username: "alice".to_string(),
            password: "whatever".to_string(),
        })
        .reply(&auth_api)
        .await;
    assert_eq!(
        res.status(),
        409,
        "repeat registration responds with conflict"
    );
    let body = serde_json::from_slice::<serde_json::Value>(res.body())
        .expect("conflict responds with valid data");
    assert_eq!(body["message"], "Username already exists");

    // Login to the new user's account.
    let res = warp::test::request()
        .method("POST")
        .path("/auth/login")
        .header("Content-Type", "application/json")
        .json(&auth::Login {
            username: "alice".to_string(),
            password: "wonderland".to_string(),
        })
        .reply(&auth_api)
        .await;
    assert_eq!(res.status(), 200, "login is allowed for the new user");
    let resp = serde_json::from_slice::<auth::AuthResp>(res.body())
        .expect("login responds with valid data");
    assert_eq!(resp.user.role, Role::Admin);
    let token = resp.access_token;

    // A wrong password and an unknown username must be
    // indistinguishable to the caller.
    let wrong_password = warp::test::request()
        .method("POST")
        .path("/auth/login")
        .header("Content-Type", "application/json")
        .json(&auth::Login {
            username: "alice".to_string(),
            password: "not-wonderland".to_string(),
        })
        .reply(&auth_api)
        .await;
    let unknown_user = warp::test::request()
        .method("POST")
        .path("/auth/login")
        .header("Content-Type", "application/json")
        .json(&auth::Login {
            username: "mallory".to_string(),
            password: "not-wonderland".to_string(),
        })
        .reply(&auth_api)
        .await;
    assert_eq!(wrong_password.status(), 401, "wrong password is rejected");
    assert_eq!(unknown_user.status(), 401, "unknown username is rejected");
    assert_eq!(
        wrong_password.body(),
        unknown_user.body(),
        "both login failures produce the identical response"
    );

    // A protected operation without a token is unauthorized.
    let res = warp::test::request()
        .method("POST")
        .path("/cards")
        .header("Content-Type", "application/json")
        .json(&card::CreateCard {
            chinese: "猫".to_string(),
            pinyin: None,
            vietnamese: "Con mèo".to_string(),
            categories: None,
        })
        .reply(&card_api)
        .await;
    assert_eq!(res.status(), 401, "cannot create a card without a token");

    // A garbage token is unauthorized, not an internal error.
    let res = warp::test::request()
        .method("POST")
        .path("/cards")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer not-a-jwt")
        .json(&card::CreateCard {
            chinese: "猫".to_string(),
            pinyin: None,
            vietnamese: "Con mèo".to_string(),
            categories: None,
        })
        .reply(&card_api)
        .await;
    assert_eq!(res.status(), 401, "cannot create a card with a bad token");

    // With a fresh token the same operation succeeds.
    let res = warp::test::request()
        .method("POST")
        .path("/cards")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .json(&card::CreateCard {
            chinese: "猫".to_string(),
            pinyin: None,
            vietnamese: "Con mèo".to_string(),
            categories: None,
        })
        .reply(&card_api)
        .await;
    assert_eq!(res.status(), 201, "token holder can create a card");

    // A token whose subject has since been deleted no longer
    // authenticates.
    let conn = db::get_db_conn(&pool).await.expect("valid db connection");
    conn.execute("DELETE FROM users WHERE username = $1", &[&"bob"])
        .await
        .expect("deleted bob");
    let res = warp::test::request()
        .method("POST")
        .path("/cards")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", bob.access_token))
        .json(&card::CreateCard {
            chinese: "狗".to_string(),
            pinyin: None,
            vietnamese: "Con chó".to_string(),
            categories: None,
        })
        .reply(&card_api)
        .await;
    assert_eq!(
        res.status(),
        401,
        "token for a deleted user is rejected as unauthenticated"
    );
}
