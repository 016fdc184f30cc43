use actix_web::{
    dev::ServiceRequest,
    error::{ErrorInternalServerError, ErrorUnauthorized},
    web, Error, HttpMessage,
};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{
    principals::{find_active_by_email, Principal},
    roles::{resolve_actor, Actor},
    state::AppState,
};

pub const AUTH_REALM: &str = "StudioBooking";

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn authenticate_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Option<Principal>, sqlx::Error> {
    let user = match find_active_by_email(&state.db, email).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    if !verify_password(password, &user.password_hash) {
        return Ok(None);
    }

    Ok(Some(Principal::from(user)))
}

async fn authenticate(req: &ServiceRequest, credentials: &BasicAuth) -> Result<Actor, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ErrorUnauthorized("Unauthorized"))?;
    let email = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    let principal = authenticate_credentials(state, email, password)
        .await
        .map_err(|err| {
            log::error!("Credential lookup failed: {err}");
            ErrorInternalServerError("Internal server error")
        })?
        .ok_or_else(|| ErrorUnauthorized("Unauthorized"))?;

    resolve_actor(&state.db, principal).await.map_err(|err| {
        log::error!("Role resolution failed: {err}");
        ErrorInternalServerError("Internal server error")
    })
}

/// Authenticates the caller and stores its resolved [`Actor`] in the request
/// extensions, so handlers never derive the role themselves.
pub async fn basic_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, &credentials).await {
        Ok(actor) => {
            log::debug!("Authenticated {} as {}", actor.principal.email, actor.role.label());
            req.extensions_mut().insert(actor);
            Ok(req)
        }
        Err(err) => Err((err, req)),
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
