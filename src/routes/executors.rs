//! Public executor profiles with their rating, schedules and free slots.
//!
//! Slot dates follow the server's local calendar; order timestamps stay UTC.

use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Local;
use serde::Serialize;

use crate::{
    auth::basic_validator,
    error::BookingError,
    models::{USER_TYPE_PHOTOGRAPHER, USER_TYPE_STUDIO},
    principals::{lookup_principal, photographer_by_id, studio_by_id},
    rating::average_rating,
    schedule::list_schedules,
    slots::{available_slots, AvailableSlots},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct ExecutorProfileView {
    id: String,
    base_user_id: String,
    user_type: &'static str,
    display_name: String,
    description: Option<String>,
    rate: Option<f64>,
    schedules: Vec<String>,
    available_slots: AvailableSlots,
}

struct ProfileParts {
    id: String,
    user_id: String,
    user_type: &'static str,
    name: Option<String>,
    description: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .wrap(HttpAuthentication::basic(basic_validator))
            .service(
                web::resource(["/studios/{id}", "/studios/{id}/"]).route(web::get().to(studio)),
            )
            .service(
                web::resource(["/photographers/{id}", "/photographers/{id}/"])
                    .route(web::get().to(photographer)),
            ),
    );
}

async fn studio(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let profile = studio_by_id(&state.db, &path).await?;
    let view = build_view(
        &state,
        ProfileParts {
            id: profile.id,
            user_id: profile.user_id,
            user_type: USER_TYPE_STUDIO,
            name: Some(profile.name),
            description: profile.description,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn photographer(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let profile = photographer_by_id(&state.db, &path).await?;
    let view = build_view(
        &state,
        ProfileParts {
            id: profile.id,
            user_id: profile.user_id,
            user_type: USER_TYPE_PHOTOGRAPHER,
            name: None,
            description: profile.description,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn build_view(state: &AppState, parts: ProfileParts) -> Result<ExecutorProfileView, BookingError> {
    let owner = lookup_principal(&state.db, &parts.user_id).await?;
    let today = Local::now().date_naive();

    let schedules = list_schedules(&state.db, Some(&owner.id))
        .await?
        .into_iter()
        .map(|schedule| schedule.id)
        .collect();

    Ok(ExecutorProfileView {
        id: parts.id,
        rate: average_rating(&state.db, &owner.id).await?,
        available_slots: available_slots(&state.db, &owner.id, today, state.horizon_days).await?,
        schedules,
        base_user_id: owner.id,
        user_type: parts.user_type,
        // Studios go by their business name.
        display_name: parts.name.unwrap_or(owner.display_name),
        description: parts.description,
    })
}
