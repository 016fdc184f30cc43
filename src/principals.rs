//! Directory of principals and their executor profiles.
//!
//! Registration and profile editing live outside this service; this module only
//! offers the lookups the booking core needs plus the inserts used for seeding.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::{BookingError, BookingResult, ValidationKind},
    models::{PhotographerProfile, StudioProfile, UserRow, USER_COLUMNS},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub display_name: String,
    pub is_admin: bool,
}

impl From<UserRow> for Principal {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            display_name: row.display_name,
            is_admin: row.is_admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Studio,
    Photographer,
}

#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub phone_number: Option<String>,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

pub async fn lookup_principal(pool: &SqlitePool, id: &str) -> BookingResult<Principal> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Principal::from)
        .ok_or(BookingError::NotFound("principal"))
}

pub async fn find_active_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ? AND active = 1 LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn principal_has_profile(
    pool: &SqlitePool,
    principal: &Principal,
    kind: ProfileKind,
) -> Result<bool, sqlx::Error> {
    let found = match kind {
        ProfileKind::Studio => studio_for_user(pool, &principal.id).await?.is_some(),
        ProfileKind::Photographer => photographer_for_user(pool, &principal.id).await?.is_some(),
    };
    Ok(found)
}

pub async fn studio_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<StudioProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudioProfile>(
        "SELECT id, user_id, name, description FROM studios WHERE user_id = ? LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn photographer_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<PhotographerProfile>, sqlx::Error> {
    sqlx::query_as::<_, PhotographerProfile>(
        "SELECT id, user_id, description FROM photographers WHERE user_id = ? LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn studio_by_id(pool: &SqlitePool, id: &str) -> BookingResult<StudioProfile> {
    sqlx::query_as::<_, StudioProfile>(
        "SELECT id, user_id, name, description FROM studios WHERE id = ? LIMIT 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BookingError::NotFound("studio"))
}

pub async fn photographer_by_id(pool: &SqlitePool, id: &str) -> BookingResult<PhotographerProfile> {
    sqlx::query_as::<_, PhotographerProfile>(
        "SELECT id, user_id, description FROM photographers WHERE id = ? LIMIT 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BookingError::NotFound("photographer"))
}

pub async fn create_principal(
    pool: &SqlitePool,
    new: NewPrincipal,
) -> Result<Principal, sqlx::Error> {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, email, phone_number, display_name, password_hash, is_admin, active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(&new.email)
    .bind(&new.phone_number)
    .bind(&new.display_name)
    .bind(&new.password_hash)
    .bind(new.is_admin)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(Principal {
        id,
        email: new.email,
        phone_number: new.phone_number,
        display_name: new.display_name,
        is_admin: new.is_admin,
    })
}

/// Attaches a studio profile. Fails when the user already carries a photographer
/// profile; a second studio profile trips the unique `user_id` column.
pub async fn attach_studio(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    description: Option<&str>,
) -> BookingResult<StudioProfile> {
    let profile = StudioProfile {
        id: new_id(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
    };

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO studios (id, user_id, name, description) VALUES (?, ?, ?, ?)")
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(&profile.name)
        .bind(&profile.description)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            crate::error::translate_write_error(err, ValidationKind::ProfileConflict, "principal")
        })?;

    let other = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM photographers WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if other > 0 {
        return Err(BookingError::invalid(ValidationKind::ProfileConflict));
    }

    tx.commit().await?;
    Ok(profile)
}

pub async fn attach_photographer(
    pool: &SqlitePool,
    user_id: &str,
    description: Option<&str>,
) -> BookingResult<PhotographerProfile> {
    let profile = PhotographerProfile {
        id: new_id(),
        user_id: user_id.to_string(),
        description: description.map(str::to_string),
    };

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO photographers (id, user_id, description) VALUES (?, ?, ?)")
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(&profile.description)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            crate::error::translate_write_error(err, ValidationKind::ProfileConflict, "principal")
        })?;

    let other = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM studios WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if other > 0 {
        return Err(BookingError::invalid(ValidationKind::ProfileConflict));
    }

    tx.commit().await?;
    Ok(profile)
}
