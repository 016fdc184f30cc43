use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;

use crate::{
    auth::basic_validator,
    error::BookingError,
    roles::Actor,
    schedule::{
        create_schedule, delete_schedule, get_schedule, list_schedules, update_schedule,
        ScheduleInput,
    },
    state::AppState,
};

#[derive(Deserialize)]
struct ScheduleFilter {
    executor: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/schedule")
            .wrap(HttpAuthentication::basic(basic_validator))
            .service(
                web::resource(["", "/"])
                    .route(web::get().to(list))
                    .route(web::post().to(create)),
            )
            .service(
                web::resource(["/{id}", "/{id}/"])
                    .route(web::get().to(show))
                    .route(web::put().to(replace))
                    .route(web::patch().to(amend))
                    .route(web::delete().to(remove)),
            ),
    );
}

async fn list(
    state: web::Data<AppState>,
    filter: web::Query<ScheduleFilter>,
) -> Result<HttpResponse, BookingError> {
    let schedules = list_schedules(&state.db, filter.executor.as_deref()).await?;
    Ok(HttpResponse::Ok().json(schedules))
}

async fn show(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let schedule = get_schedule(&state.db, &path).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

async fn create(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    payload: web::Json<ScheduleInput>,
) -> Result<HttpResponse, BookingError> {
    let payload = payload.into_inner();
    payload.require_complete()?;
    let schedule = create_schedule(&state.db, &auth, payload).await?;
    Ok(HttpResponse::Created().json(schedule))
}

async fn replace(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
    payload: web::Json<ScheduleInput>,
) -> Result<HttpResponse, BookingError> {
    let payload = payload.into_inner();
    payload.require_complete()?;
    let schedule = update_schedule(&state.db, &auth, &path, payload).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

async fn amend(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
    payload: web::Json<ScheduleInput>,
) -> Result<HttpResponse, BookingError> {
    let schedule = update_schedule(&state.db, &auth, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

async fn remove(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    delete_schedule(&state.db, &auth, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
