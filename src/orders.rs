//! Date-bound bookings of a schedule.
//!
//! The application checks below are a pre-flight pass. The unique index on
//! `orders(schedule_id, date)` is what actually guarantees a single booking per
//! slot and date, and every write re-reads the schedule inside its transaction.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::new_id,
    error::{translate_write_error, BookingError, BookingResult, PermissionKind, ValidationKind},
    models::{Order, Schedule},
    principals::{lookup_principal, principal_has_profile, ProfileKind},
    roles::{resolve_role, Actor},
    schedule::get_schedule,
    slots::iso_weekday,
};

const ORDER_COLUMNS: &str = "id, executor_id, client_id, schedule_id, date, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderInput {
    pub executor: Option<String>,
    pub client: Option<String>,
    pub schedule: Option<String>,
    pub date: Option<NaiveDate>,
}

impl OrderInput {
    pub fn require_complete(&self) -> BookingResult<()> {
        if self.executor.is_none() {
            return Err(BookingError::required("executor"));
        }
        if self.schedule.is_none() {
            return Err(BookingError::required("schedule"));
        }
        if self.date.is_none() {
            return Err(BookingError::required("date"));
        }
        Ok(())
    }
}

pub async fn get_order(pool: &SqlitePool, id: &str) -> BookingResult<Order> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? LIMIT 1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(BookingError::NotFound("order"))
}

/// Orders of one executor dated in `[from, until)`.
pub async fn list_orders(
    pool: &SqlitePool,
    executor: &str,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        r#"SELECT {ORDER_COLUMNS} FROM orders
           WHERE executor_id = ? AND date >= ? AND date < ?
           ORDER BY date, created_at"#
    ))
    .bind(executor)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await
}

/// Everything for administrators; otherwise the orders the actor placed or serves.
pub async fn list_orders_for(pool: &SqlitePool, actor: &Actor) -> Result<Vec<Order>, sqlx::Error> {
    if actor.role.is_admin() {
        return sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY date, created_at"
        ))
        .fetch_all(pool)
        .await;
    }

    sqlx::query_as::<_, Order>(&format!(
        r#"SELECT {ORDER_COLUMNS} FROM orders
           WHERE client_id = ? OR executor_id = ?
           ORDER BY date, created_at"#
    ))
    .bind(actor.id())
    .bind(actor.id())
    .fetch_all(pool)
    .await
}

pub fn visible_to(order: &Order, actor: &Actor) -> bool {
    actor.role.is_admin() || order.client == actor.id() || order.executor == actor.id()
}

pub async fn create_order(
    pool: &SqlitePool,
    actor: &Actor,
    input: OrderInput,
) -> BookingResult<Order> {
    ensure_may_book(actor)?;

    let client = input.client.unwrap_or_else(|| actor.id().to_string());
    if !actor.role.is_admin() && client != actor.id() {
        return Err(BookingError::forbidden(PermissionKind::ClientMismatch, "client"));
    }
    ensure_client_may_book(pool, actor, &client).await?;

    let now = Utc::now();
    let order = Order {
        id: new_id(),
        executor: input.executor.ok_or(BookingError::required("executor"))?,
        client,
        schedule: input.schedule.ok_or(BookingError::required("schedule"))?,
        date: input.date.ok_or(BookingError::required("date"))?,
        created_at: now,
        updated_at: now,
    };
    validate_booking(pool, &order).await?;
    ensure_slot_free(pool, &order).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"INSERT INTO orders (id, executor_id, client_id, schedule_id, date, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&order.id)
    .bind(&order.executor)
    .bind(&order.client)
    .bind(&order.schedule)
    .bind(order.date)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|err| translate_write_error(err, ValidationKind::SlotAlreadyBooked, "schedule"))?;
    recheck_schedule(&mut *tx, &order).await?;
    tx.commit().await?;

    log::info!(
        "{} booked schedule {} on {} for client {}",
        actor.principal.email,
        order.schedule,
        order.date,
        order.client
    );
    Ok(order)
}

pub async fn update_order(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: OrderInput,
) -> BookingResult<Order> {
    ensure_may_book(actor)?;
    let existing = get_order(pool, id).await?;

    // Clients always act as themselves; administrators keep the stored client
    // unless they name another one.
    let client = match input.client {
        Some(client) => client,
        None if actor.role.is_admin() => existing.client.clone(),
        None => actor.id().to_string(),
    };
    if !actor.role.is_admin() && client != existing.client {
        return Err(BookingError::forbidden(PermissionKind::ClientMismatch, "client"));
    }
    if client != existing.client {
        ensure_client_may_book(pool, actor, &client).await?;
    }

    let executor = input.executor.unwrap_or_else(|| existing.executor.clone());
    if !actor.role.is_admin() && executor != existing.executor {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "executor"));
    }

    let order = Order {
        id: existing.id.clone(),
        executor,
        client,
        schedule: input.schedule.unwrap_or_else(|| existing.schedule.clone()),
        date: input.date.unwrap_or(existing.date),
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    validate_booking(pool, &order).await?;
    ensure_slot_free(pool, &order).await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"UPDATE orders SET executor_id = ?, client_id = ?, schedule_id = ?, date = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&order.executor)
    .bind(&order.client)
    .bind(&order.schedule)
    .bind(order.date)
    .bind(order.updated_at)
    .bind(&order.id)
    .execute(&mut *tx)
    .await
    .map_err(|err| translate_write_error(err, ValidationKind::SlotAlreadyBooked, "schedule"))?;
    if result.rows_affected() == 0 {
        return Err(BookingError::NotFound("order"));
    }
    recheck_schedule(&mut *tx, &order).await?;
    tx.commit().await?;

    log::info!("{} updated order {}", actor.principal.email, order.id);
    Ok(order)
}

pub async fn delete_order(pool: &SqlitePool, actor: &Actor, id: &str) -> BookingResult<()> {
    let existing = get_order(pool, id).await?;
    if !(actor.role.is_admin() || existing.client == actor.id()) {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "client"));
    }

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(BookingError::NotFound("order"));
    }
    tx.commit().await?;

    log::info!("{} cancelled order {}", actor.principal.email, id);
    Ok(())
}

/// Studios sell time, they never buy it. Photographers may book like clients.
fn ensure_may_book(actor: &Actor) -> BookingResult<()> {
    if actor.role.is_studio() {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "client"));
    }
    Ok(())
}

async fn ensure_client_may_book(pool: &SqlitePool, actor: &Actor, client: &str) -> BookingResult<()> {
    if client == actor.id() {
        return Ok(());
    }
    let principal = lookup_principal(pool, client).await?;
    if principal_has_profile(pool, &principal, ProfileKind::Studio).await? {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "client"));
    }
    Ok(())
}

async fn validate_booking(pool: &SqlitePool, order: &Order) -> BookingResult<()> {
    let executor = lookup_principal(pool, &order.executor).await?;
    if !resolve_role(pool, &executor).await?.is_executor() {
        return Err(BookingError::invalid(ValidationKind::InvalidExecutor));
    }
    let schedule = get_schedule(pool, &order.schedule).await?;
    check_against_schedule(order, &schedule)
}

fn check_against_schedule(order: &Order, schedule: &Schedule) -> BookingResult<()> {
    if iso_weekday(order.date) != schedule.weekday {
        return Err(BookingError::invalid(ValidationKind::DateWeekdayMismatch));
    }
    if schedule.executor != order.executor {
        return Err(BookingError::invalid(ValidationKind::ExecutorScheduleMismatch));
    }
    Ok(())
}

async fn ensure_slot_free(pool: &SqlitePool, order: &Order) -> BookingResult<()> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE schedule_id = ? AND date = ? AND id != ?",
    )
    .bind(&order.schedule)
    .bind(order.date)
    .bind(&order.id)
    .fetch_one(pool)
    .await?;

    if taken > 0 {
        return Err(BookingError::invalid(ValidationKind::SlotAlreadyBooked));
    }
    Ok(())
}

/// Runs after the write, while the transaction holds the write lock, so a
/// schedule edited since the pre-flight pass cannot slip through.
async fn recheck_schedule(conn: &mut SqliteConnection, order: &Order) -> BookingResult<()> {
    let schedule = sqlx::query_as::<_, Schedule>(
        "SELECT id, executor_id, weekday, start_time, end_time FROM schedules WHERE id = ?",
    )
    .bind(&order.schedule)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(BookingError::NotFound("schedule"))?;
    check_against_schedule(order, &schedule)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use futures::future::join_all;

    use super::*;
    use crate::{
        schedule::{create_schedule, ScheduleInput},
        testing::{actor_for, admin, at, client, monday, photographer, studio, TestDb},
    };

    struct Fixture {
        db: TestDb,
        boss: Actor,
        anna: Actor,
        carl: Actor,
        schedule: Schedule,
    }

    /// Admin, photographer Anna with a Monday 09:00-10:00 slot, client Carl.
    async fn fixture() -> Fixture {
        let db = TestDb::new().await;
        let boss = admin(&db.pool, "admin@example.com").await;
        let (anna, _) = photographer(&db.pool, "anna@example.com").await;
        let carl = client(&db.pool, "carl@example.com").await;
        let boss = actor_for(&db.pool, &boss).await;
        let anna = actor_for(&db.pool, &anna).await;
        let carl = actor_for(&db.pool, &carl).await;

        let schedule = create_schedule(
            &db.pool,
            &boss,
            ScheduleInput {
                executor: Some(anna.id().to_string()),
                weekday: Some(1),
                start_time: Some(at(9, 0)),
                end_time: Some(at(10, 0)),
            },
        )
        .await
        .unwrap();

        Fixture {
            db,
            boss,
            anna,
            carl,
            schedule,
        }
    }

    fn booking(executor: &Actor, schedule: &Schedule, date: NaiveDate) -> OrderInput {
        OrderInput {
            executor: Some(executor.id().to_string()),
            client: None,
            schedule: Some(schedule.id.clone()),
            date: Some(date),
        }
    }

    #[actix_web::test]
    async fn booking_walkthrough() {
        let f = fixture().await;
        let dora = client(&f.db.pool, "dora@example.com").await;
        let dora = actor_for(&f.db.pool, &dora).await;

        let order = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        assert_eq!(order.client, f.carl.id());
        assert_eq!(order.executor, f.anna.id());

        let err = create_order(&f.db.pool, &dora, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::SlotAlreadyBooked));

        let tuesday = OrderInput {
            date: Some(monday() + Duration::days(1)),
            ..OrderInput::default()
        };
        let err = update_order(&f.db.pool, &f.carl, &order.id, tuesday).await.unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::DateWeekdayMismatch));
    }

    #[actix_web::test]
    async fn concurrent_bookings_of_one_slot_admit_exactly_one() {
        let f = fixture().await;
        let mut clients = Vec::new();
        for n in 0..8 {
            let principal = client(&f.db.pool, &format!("rush{n}@example.com")).await;
            clients.push(actor_for(&f.db.pool, &principal).await);
        }

        let attempts = clients.iter().map(|actor| {
            create_order(&f.db.pool, actor, booking(&f.anna, &f.schedule, monday()))
        });
        let results = join_all(attempts).await;

        let booked = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(booked, 1);
        for result in results.iter().filter(|result| result.is_err()) {
            let kind = result.as_ref().unwrap_err().validation_kind();
            assert_eq!(kind, Some(ValidationKind::SlotAlreadyBooked));
        }

        let stored = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&f.db.pool)
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[actix_web::test]
    async fn studios_cannot_book_but_photographers_can() {
        let f = fixture().await;
        let (loft, _) = studio(&f.db.pool, "loft@example.com").await;
        let loft = actor_for(&f.db.pool, &loft).await;
        let (ben, _) = photographer(&f.db.pool, "ben@example.com").await;
        let ben = actor_for(&f.db.pool, &ben).await;

        let err = create_order(&f.db.pool, &loft, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::NotAuthorized));

        let mut for_studio = booking(&f.anna, &f.schedule, monday());
        for_studio.client = Some(loft.id().to_string());
        let err = create_order(&f.db.pool, &f.boss, for_studio).await.unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::NotAuthorized));

        let order = create_order(&f.db.pool, &ben, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        assert_eq!(order.client, ben.id());
    }

    #[actix_web::test]
    async fn only_administrators_book_for_someone_else() {
        let f = fixture().await;
        let dora = client(&f.db.pool, "dora@example.com").await;

        let mut input = booking(&f.anna, &f.schedule, monday());
        input.client = Some(dora.id.clone());
        let err = create_order(&f.db.pool, &f.carl, input.clone()).await.unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::ClientMismatch));

        let order = create_order(&f.db.pool, &f.boss, input).await.unwrap();
        assert_eq!(order.client, dora.id);
    }

    #[actix_web::test]
    async fn executor_must_be_bookable_and_own_the_schedule() {
        let f = fixture().await;
        let (ben, _) = photographer(&f.db.pool, "ben@example.com").await;
        let ben = actor_for(&f.db.pool, &ben).await;

        let err = create_order(&f.db.pool, &f.carl, booking(&f.carl, &f.schedule, monday()))
            .await
            .unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::InvalidExecutor));

        let err = create_order(&f.db.pool, &f.carl, booking(&ben, &f.schedule, monday()))
            .await
            .unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::ExecutorScheduleMismatch));

        let mut missing = booking(&f.anna, &f.schedule, monday());
        missing.schedule = Some("no-such-schedule".into());
        let err = create_order(&f.db.pool, &f.carl, missing).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound("schedule")));

        let mut undated = booking(&f.anna, &f.schedule, monday());
        undated.date = None;
        let err = create_order(&f.db.pool, &f.carl, undated).await.unwrap_err();
        assert_eq!(err.to_string(), "date: This field is required.");
    }

    #[actix_web::test]
    async fn updates_skip_their_own_booking_in_the_overlap_check() {
        let f = fixture().await;
        let order = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();

        let next_week = OrderInput {
            date: Some(monday() + Duration::weeks(1)),
            ..OrderInput::default()
        };
        let moved = update_order(&f.db.pool, &f.carl, &order.id, next_week).await.unwrap();
        assert_eq!(moved.date, monday() + Duration::weeks(1));
        assert_eq!(moved.client, order.client);

        let same = OrderInput {
            date: Some(monday() + Duration::weeks(1)),
            ..OrderInput::default()
        };
        update_order(&f.db.pool, &f.carl, &order.id, same).await.unwrap();

        let back = OrderInput {
            date: Some(monday()),
            ..OrderInput::default()
        };
        let dora = client(&f.db.pool, "dora@example.com").await;
        let dora = actor_for(&f.db.pool, &dora).await;
        create_order(&f.db.pool, &dora, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        let err = update_order(&f.db.pool, &f.carl, &order.id, back).await.unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::SlotAlreadyBooked));
    }

    #[actix_web::test]
    async fn updates_compare_against_the_stored_client() {
        let f = fixture().await;
        let order = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        let dora = client(&f.db.pool, "dora@example.com").await;
        let dora = actor_for(&f.db.pool, &dora).await;

        let err = update_order(&f.db.pool, &dora, &order.id, OrderInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::ClientMismatch));

        let reassigned = OrderInput {
            client: Some(dora.id().to_string()),
            ..OrderInput::default()
        };
        let err = update_order(&f.db.pool, &f.carl, &order.id, reassigned.clone())
            .await
            .unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::ClientMismatch));

        let untouched = update_order(&f.db.pool, &f.boss, &order.id, OrderInput::default())
            .await
            .unwrap();
        assert_eq!(untouched.client, f.carl.id());
        let handed_over = update_order(&f.db.pool, &f.boss, &order.id, reassigned).await.unwrap();
        assert_eq!(handed_over.client, dora.id());
    }

    #[actix_web::test]
    async fn only_the_client_or_an_admin_cancels() {
        let f = fixture().await;
        let order = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();

        let err = delete_order(&f.db.pool, &f.anna, &order.id).await.unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::NotAuthorized));

        delete_order(&f.db.pool, &f.carl, &order.id).await.unwrap();
        let err = get_order(&f.db.pool, &order.id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound("order")));

        let rebooked = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        delete_order(&f.db.pool, &f.boss, &rebooked.id).await.unwrap();
    }

    #[actix_web::test]
    async fn listings_respect_ranges_and_parties() {
        let f = fixture().await;
        let first = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
        let later = monday() + Duration::weeks(3);
        create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, later))
            .await
            .unwrap();

        let window = list_orders(&f.db.pool, f.anna.id(), monday(), monday() + Duration::days(15))
            .await
            .unwrap();
        let ids: Vec<&str> = window.iter().map(|order| order.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str()]);

        let dora = client(&f.db.pool, "dora@example.com").await;
        let dora = actor_for(&f.db.pool, &dora).await;
        assert!(list_orders_for(&f.db.pool, &dora).await.unwrap().is_empty());
        assert_eq!(list_orders_for(&f.db.pool, &f.anna).await.unwrap().len(), 2);
        assert_eq!(list_orders_for(&f.db.pool, &f.boss).await.unwrap().len(), 2);
        assert!(visible_to(&first, &f.carl));
        assert!(!visible_to(&first, &dora));
    }

    #[actix_web::test]
    async fn only_administrators_move_an_order_to_another_executor() {
        let f = fixture().await;
        let (ben, _) = photographer(&f.db.pool, "ben@example.com").await;
        let ben = actor_for(&f.db.pool, &ben).await;
        let ben_monday = create_schedule(
            &f.db.pool,
            &f.boss,
            ScheduleInput {
                executor: Some(ben.id().to_string()),
                weekday: Some(1),
                start_time: Some(at(9, 0)),
                end_time: Some(at(10, 0)),
            },
        )
        .await
        .unwrap();
        let order = create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();

        let move_to_ben = OrderInput {
            executor: Some(ben.id().to_string()),
            schedule: Some(ben_monday.id.clone()),
            ..OrderInput::default()
        };
        let err = update_order(&f.db.pool, &f.carl, &order.id, move_to_ben.clone())
            .await
            .unwrap_err();
        assert_eq!(err.permission_kind(), Some(PermissionKind::NotAuthorized));
        assert_eq!(get_order(&f.db.pool, &order.id).await.unwrap().executor, f.anna.id());

        let moved = update_order(&f.db.pool, &f.boss, &order.id, move_to_ben).await.unwrap();
        assert_eq!(moved.executor, ben.id());
        assert_eq!(moved.schedule, ben_monday.id);
        assert_eq!(moved.client, f.carl.id());

        let dora = client(&f.db.pool, "dora@example.com").await;
        let dora = actor_for(&f.db.pool, &dora).await;
        create_order(&f.db.pool, &dora, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn index_violations_translate_to_domain_errors() {
        let f = fixture().await;
        create_order(&f.db.pool, &f.carl, booking(&f.anna, &f.schedule, monday()))
            .await
            .unwrap();

        let insert = |id: &'static str, schedule: String| {
            sqlx::query(
                r#"INSERT INTO orders (id, executor_id, client_id, schedule_id, date, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(id)
            .bind(f.anna.id().to_string())
            .bind(f.boss.id().to_string())
            .bind(schedule)
            .bind(monday())
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(&f.db.pool)
        };

        let err = insert("twin", f.schedule.id.clone()).await.unwrap_err();
        match translate_write_error(err, ValidationKind::SlotAlreadyBooked, "schedule") {
            BookingError::Validation { kind, field } => {
                assert_eq!(kind, ValidationKind::SlotAlreadyBooked);
                assert_eq!(field, "non_field_errors");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = insert("orphan", "deleted-meanwhile".to_string()).await.unwrap_err();
        assert!(matches!(
            translate_write_error(err, ValidationKind::SlotAlreadyBooked, "schedule"),
            BookingError::NotFound("schedule")
        ));
    }
}
