//! Projection of recurring schedules onto concrete bookable dates.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use sqlx::SqlitePool;

use crate::{
    models::{Order, Schedule},
    orders::list_orders,
    schedule::list_schedules,
};

/// Free schedule ids keyed by date, dates ascending.
pub type AvailableSlots = BTreeMap<NaiveDate, Vec<String>>;

/// Weekday numbered 1 (Monday) through 7 (Sunday), as stored on schedules.
pub fn iso_weekday(date: NaiveDate) -> i64 {
    match (i64::from(date.weekday().num_days_from_monday()) + 1) % 7 {
        0 => 7,
        weekday => weekday,
    }
}

/// Walks `horizon_days` days from `today` and lists, per date, the schedules
/// recurring on that weekday that nobody has booked yet. Dates without a free
/// slot are left out.
pub fn project(
    today: NaiveDate,
    horizon_days: u32,
    schedules: &[Schedule],
    orders: &[Order],
) -> AvailableSlots {
    let mut booked: HashMap<NaiveDate, HashSet<&str>> = HashMap::new();
    for order in orders {
        booked.entry(order.date).or_default().insert(order.schedule.as_str());
    }

    let mut available = AvailableSlots::new();
    for offset in 0..horizon_days {
        let current = today + Duration::days(i64::from(offset));
        let weekday = iso_weekday(current);
        let taken = booked.get(&current);

        let free: Vec<String> = schedules
            .iter()
            .filter(|schedule| schedule.weekday == weekday)
            .filter(|schedule| !taken.is_some_and(|ids| ids.contains(schedule.id.as_str())))
            .map(|schedule| schedule.id.clone())
            .collect();

        if !free.is_empty() {
            available.insert(current, free);
        }
    }
    available
}

pub async fn available_slots(
    pool: &SqlitePool,
    executor: &str,
    today: NaiveDate,
    horizon_days: u32,
) -> Result<AvailableSlots, sqlx::Error> {
    let schedules = list_schedules(pool, Some(executor)).await?;
    let until = today + Duration::days(i64::from(horizon_days));
    let orders = list_orders(pool, executor, today, until).await?;
    Ok(project(today, horizon_days, &schedules, &orders))
}
