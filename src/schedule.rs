//! Weekly recurring availability owned by executors.

use chrono::NaiveTime;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::{translate_write_error, BookingError, BookingResult, PermissionKind, ValidationKind},
    models::Schedule,
    principals::lookup_principal,
    roles::{resolve_role, Actor, Role},
};

const SCHEDULE_COLUMNS: &str = "id, executor_id, weekday, start_time, end_time";

/// Fields accepted when creating or editing a schedule. Absent fields keep the
/// stored value on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleInput {
    pub executor: Option<String>,
    pub weekday: Option<i64>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl ScheduleInput {
    /// Full replacement requires every field except the executor, which the
    /// caller's role may supply.
    pub fn require_complete(&self) -> BookingResult<()> {
        if self.weekday.is_none() {
            return Err(BookingError::required("weekday"));
        }
        if self.start_time.is_none() {
            return Err(BookingError::required("start_time"));
        }
        if self.end_time.is_none() {
            return Err(BookingError::required("end_time"));
        }
        Ok(())
    }
}

pub async fn list_schedules(
    pool: &SqlitePool,
    executor: Option<&str>,
) -> Result<Vec<Schedule>, sqlx::Error> {
    match executor {
        Some(executor) => {
            sqlx::query_as::<_, Schedule>(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE executor_id = ? ORDER BY weekday, start_time, id"
            ))
            .bind(executor)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Schedule>(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY executor_id, weekday, start_time, id"
            ))
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn get_schedule(pool: &SqlitePool, id: &str) -> BookingResult<Schedule> {
    sqlx::query_as::<_, Schedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ? LIMIT 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BookingError::NotFound("schedule"))
}

pub async fn create_schedule(
    pool: &SqlitePool,
    actor: &Actor,
    input: ScheduleInput,
) -> BookingResult<Schedule> {
    let executor = resolve_executor(pool, actor, input.executor.as_deref(), None).await?;
    let weekday = input.weekday.ok_or(BookingError::required("weekday"))?;
    let start_time = input.start_time.ok_or(BookingError::required("start_time"))?;
    let end_time = input.end_time.ok_or(BookingError::required("end_time"))?;

    let schedule = Schedule {
        id: new_id(),
        executor,
        weekday,
        start_time,
        end_time,
    };
    validate_shape(&schedule)?;
    ensure_unique(pool, &schedule).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"INSERT INTO schedules (id, executor_id, weekday, start_time, end_time)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&schedule.id)
    .bind(&schedule.executor)
    .bind(schedule.weekday)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .execute(&mut *tx)
    .await
    .map_err(|err| translate_write_error(err, ValidationKind::DuplicateSchedule, "principal"))?;
    tx.commit().await?;

    log::info!(
        "{} created schedule {} for {} (weekday {}, {}-{})",
        actor.principal.email,
        schedule.id,
        schedule.executor,
        schedule.weekday,
        schedule.start_time,
        schedule.end_time
    );
    Ok(schedule)
}

pub async fn update_schedule(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: ScheduleInput,
) -> BookingResult<Schedule> {
    let existing = get_schedule(pool, id).await?;
    let executor = resolve_executor(pool, actor, input.executor.as_deref(), Some(&existing)).await?;

    let schedule = Schedule {
        id: existing.id.clone(),
        executor,
        weekday: input.weekday.unwrap_or(existing.weekday),
        start_time: input.start_time.unwrap_or(existing.start_time),
        end_time: input.end_time.unwrap_or(existing.end_time),
    };
    validate_shape(&schedule)?;
    ensure_unique(pool, &schedule).await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"UPDATE schedules SET executor_id = ?, weekday = ?, start_time = ?, end_time = ?
           WHERE id = ?"#,
    )
    .bind(&schedule.executor)
    .bind(schedule.weekday)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(&schedule.id)
    .execute(&mut *tx)
    .await
    .map_err(|err| translate_write_error(err, ValidationKind::DuplicateSchedule, "principal"))?;

    if result.rows_affected() == 0 {
        return Err(BookingError::NotFound("schedule"));
    }

    // Bookings pin the executor and the weekday; moving either would orphan them.
    if schedule.executor != existing.executor || schedule.weekday != existing.weekday {
        let booked = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE schedule_id = ?")
            .bind(&schedule.id)
            .fetch_one(&mut *tx)
            .await?;
        if booked > 0 {
            return Err(BookingError::invalid(ValidationKind::ScheduleInUse));
        }
    }
    tx.commit().await?;

    log::info!("{} updated schedule {}", actor.principal.email, schedule.id);
    Ok(schedule)
}

/// Deletes a schedule together with every order booked on it.
pub async fn delete_schedule(pool: &SqlitePool, actor: &Actor, id: &str) -> BookingResult<()> {
    let existing = get_schedule(pool, id).await?;
    let owns = actor.role.is_executor() && existing.executor == actor.id();
    if !(actor.role.is_admin() || owns) {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "executor"));
    }

    let mut tx = pool.begin().await?;
    let cascaded = sqlx::query("DELETE FROM orders WHERE schedule_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(BookingError::NotFound("schedule"));
    }
    tx.commit().await?;

    log::info!(
        "{} deleted schedule {} and {} booking(s)",
        actor.principal.email,
        id,
        cascaded
    );
    Ok(())
}

/// Decides which executor a schedule belongs to. Executors always act for
/// themselves; administrators must name an executor; clients may not manage
/// schedules at all.
async fn resolve_executor(
    pool: &SqlitePool,
    actor: &Actor,
    requested: Option<&str>,
    existing: Option<&Schedule>,
) -> BookingResult<String> {
    match &actor.role {
        Role::StudioExecutor(_) | Role::PhotographerExecutor(_) => {
            let foreign_schedule = existing.is_some_and(|schedule| schedule.executor != actor.id());
            let foreign_request = requested.is_some_and(|executor| executor != actor.id());
            if foreign_schedule || foreign_request {
                return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "executor"));
            }
            Ok(actor.id().to_string())
        }
        Role::Administrator => {
            let executor = requested
                .or(existing.map(|schedule| schedule.executor.as_str()))
                .ok_or(BookingError::invalid(ValidationKind::MissingExecutor))?;
            let principal = lookup_principal(pool, executor).await?;
            if !resolve_role(pool, &principal).await?.is_executor() {
                return Err(BookingError::invalid(ValidationKind::InvalidExecutor));
            }
            Ok(principal.id)
        }
        Role::Client => Err(BookingError::forbidden(PermissionKind::NotAuthorized, "executor")),
    }
}

fn validate_shape(schedule: &Schedule) -> BookingResult<()> {
    if !(1..=7).contains(&schedule.weekday) {
        return Err(BookingError::invalid(ValidationKind::InvalidWeekday));
    }
    if schedule.start_time >= schedule.end_time {
        return Err(BookingError::invalid(ValidationKind::InvalidTimeRange));
    }
    Ok(())
}

async fn ensure_unique(pool: &SqlitePool, schedule: &Schedule) -> BookingResult<()> {
    let clashes = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM schedules
           WHERE executor_id = ? AND weekday = ? AND start_time = ? AND end_time = ? AND id != ?"#,
    )
    .bind(&schedule.executor)
    .bind(schedule.weekday)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(&schedule.id)
    .fetch_one(pool)
    .await?;

    if clashes > 0 {
        return Err(BookingError::invalid(ValidationKind::DuplicateSchedule));
    }
    Ok(())
}
