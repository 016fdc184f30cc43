use std::{fs, path::Path, str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    auth::hash_password,
    config::AppConfig,
    error::BookingResult,
    models::{USER_TYPE_PHOTOGRAPHER, USER_TYPE_STUDIO},
    principals::{
        attach_photographer, attach_studio, create_principal, find_active_by_email,
        principal_has_profile, NewPrincipal, Principal, ProfileKind,
    },
};

pub async fn connect(db_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool, config: &AppConfig) -> BookingResult<()> {
    seed_admin(pool, config).await?;
    seed_executors(pool, config).await
}

fn seed_hash(password: &str) -> Result<String, sqlx::Error> {
    hash_password(password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))
}

async fn seed_admin(pool: &SqlitePool, config: &AppConfig) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE is_admin = 1 LIMIT 1")
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.admin_password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = seed_hash(&config.admin_password)?;

    let admin = create_principal(
        pool,
        NewPrincipal {
            email: config.admin_email.clone(),
            phone_number: None,
            display_name: config.admin_display_name.clone(),
            password_hash,
            is_admin: true,
        },
    )
    .await?;

    log::info!("Seeded administrator {}", admin.email);
    Ok(())
}

/// Creates the configured studio and photographer accounts. Existing accounts
/// only get the missing profile attached; nothing is overwritten.
async fn seed_executors(pool: &SqlitePool, config: &AppConfig) -> BookingResult<()> {
    let wanted = [
        (config.seed_studio_email.as_deref(), ProfileKind::Studio),
        (config.seed_photographer_email.as_deref(), ProfileKind::Photographer),
    ];
    if wanted.iter().all(|(email, _)| email.is_none()) {
        return Ok(());
    }

    let Some(password) = config.seed_executor_password.as_deref() else {
        log::warn!("SEED_EXECUTOR_PASSWORD not set. Skipping executor seeding.");
        return Ok(());
    };

    for (email, kind) in wanted {
        let Some(email) = email else {
            continue;
        };

        let principal = match find_active_by_email(pool, email).await? {
            Some(row) => Principal::from(row),
            None => {
                let display_name = match kind {
                    ProfileKind::Studio => config.seed_studio_name.clone(),
                    ProfileKind::Photographer => email.split('@').next().unwrap_or(email).to_string(),
                };
                create_principal(
                    pool,
                    NewPrincipal {
                        email: email.to_string(),
                        phone_number: None,
                        display_name,
                        password_hash: seed_hash(password)?,
                        is_admin: false,
                    },
                )
                .await?
            }
        };

        if principal_has_profile(pool, &principal, kind).await? {
            continue;
        }
        let user_type = match kind {
            ProfileKind::Studio => {
                attach_studio(pool, &principal.id, &config.seed_studio_name, None).await?;
                USER_TYPE_STUDIO
            }
            ProfileKind::Photographer => {
                attach_photographer(pool, &principal.id, None).await?;
                USER_TYPE_PHOTOGRAPHER
            }
        };
        log::info!("Seeded {user_type} {email}");
    }
    Ok(())
}
