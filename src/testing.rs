//! Fixtures shared by the unit tests: a throwaway database and a few principals.

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::{
    auth::{hash_password, new_id},
    db,
    models::{PhotographerProfile, StudioProfile},
    principals::{attach_photographer, attach_studio, create_principal, NewPrincipal, Principal},
    roles::{resolve_actor, Actor},
    state::AppState,
};

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// A file-backed SQLite database living in a temporary directory. File backed
/// rather than `:memory:` so every pooled connection sees the same data.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("booking.db").display());
        let pool = db::connect(&url, 10).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        Self { pool, _dir: dir }
    }

    pub fn state(&self) -> AppState {
        AppState {
            db: self.pool.clone(),
            horizon_days: crate::config::DEFAULT_HORIZON_DAYS,
        }
    }
}

/// A Monday, far enough out to stay in the future.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

async fn principal(pool: &SqlitePool, email: &str, is_admin: bool, password_hash: String) -> Principal {
    create_principal(
        pool,
        NewPrincipal {
            email: email.to_string(),
            phone_number: None,
            display_name: email.split('@').next().unwrap_or(email).to_string(),
            password_hash,
            is_admin,
        },
    )
    .await
    .unwrap()
}

/// No password login possible; fine for store level tests.
pub async fn client(pool: &SqlitePool, email: &str) -> Principal {
    principal(pool, email, false, "!".to_string()).await
}

pub async fn admin(pool: &SqlitePool, email: &str) -> Principal {
    principal(pool, email, true, "!".to_string()).await
}

pub async fn studio(pool: &SqlitePool, email: &str) -> (Principal, StudioProfile) {
    let user = client(pool, email).await;
    let profile = attach_studio(pool, &user.id, "Daylight Loft", Some("North-facing windows"))
        .await
        .unwrap();
    (user, profile)
}

pub async fn photographer(pool: &SqlitePool, email: &str) -> (Principal, PhotographerProfile) {
    let user = client(pool, email).await;
    let profile = attach_photographer(pool, &user.id, Some("Portraits and weddings"))
        .await
        .unwrap();
    (user, profile)
}

pub async fn client_with_password(pool: &SqlitePool, email: &str) -> Principal {
    principal(pool, email, false, hash_password(TEST_PASSWORD).unwrap()).await
}

pub async fn studio_with_password(pool: &SqlitePool, email: &str) -> (Principal, StudioProfile) {
    let user = client_with_password(pool, email).await;
    let profile = attach_studio(pool, &user.id, "Daylight Loft", None).await.unwrap();
    (user, profile)
}

pub async fn photographer_with_password(
    pool: &SqlitePool,
    email: &str,
) -> (Principal, PhotographerProfile) {
    let user = client_with_password(pool, email).await;
    let profile = attach_photographer(pool, &user.id, None).await.unwrap();
    (user, profile)
}

pub async fn actor_for(pool: &SqlitePool, principal: &Principal) -> Actor {
    resolve_actor(pool, principal.clone()).await.unwrap()
}

pub async fn leave_comment(pool: &SqlitePool, author: &str, destination: &str, rate: i64) {
    sqlx::query(
        r#"INSERT INTO comments (id, author_id, destination_id, rate, title, body, created_at)
           VALUES (?, ?, ?, ?, '', '', ?)"#,
    )
    .bind(new_id())
    .bind(author)
    .bind(destination)
    .bind(rate)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
}
