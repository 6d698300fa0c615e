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

use std::{env, process};

use warp::Filter;

use hanviet::{app, db, seed, Error, DEFAULT_DATABASE_URL};

const DEFAULT_FRONTEND_URL: &'static str = "http://localhost:5173";
const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run().await {
        tracing::error!("server failed to start: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db_pool = db::create_pool(db_url.as_str())?;
    db::init_db(&db_pool).await?;

    if env::var("ENABLE_AUTO_SEED").map_or(false, |v| v == "true") {
        seed::auto_seed(&db_pool).await;
    }

    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string());
    let cors = warp::cors()
        .allow_origin(frontend_url.as_str())
        .allow_headers(vec!["authorization", "content-type"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let route = app(db_pool, None).await?.with(cors);
    tracing::info!("listening on port {}", port);
    warp::serve(route).run(([0, 0, 0, 0], port)).await;
    Ok(())
}
