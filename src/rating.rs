use sqlx::SqlitePool;

/// Mean comment rate for an executor, rounded to two decimals. `None` until
/// somebody has left a comment.
pub async fn average_rating(pool: &SqlitePool, executor: &str) -> Result<Option<f64>, sqlx::Error> {
    let average = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT AVG(CAST(rate AS REAL)) FROM comments WHERE destination_id = ?",
    )
    .bind(executor)
    .fetch_one(pool)
    .await?;

    Ok(average.map(|value| (value * 100.0).round() / 100.0))
}
