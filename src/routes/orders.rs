use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::{
    auth::basic_validator,
    error::{BookingError, PermissionKind},
    orders::{
        create_order, delete_order, get_order, list_orders_for, update_order, visible_to,
        OrderInput,
    },
    roles::Actor,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/order")
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
    auth: web::ReqData<Actor>,
) -> Result<HttpResponse, BookingError> {
    let orders = list_orders_for(&state.db, &auth).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn show(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let order = get_order(&state.db, &path).await?;
    if !visible_to(&order, &auth) {
        return Err(BookingError::forbidden(PermissionKind::NotAuthorized, "client"));
    }
    Ok(HttpResponse::Ok().json(order))
}

async fn create(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    payload: web::Json<OrderInput>,
) -> Result<HttpResponse, BookingError> {
    let payload = payload.into_inner();
    payload.require_complete()?;
    let order = create_order(&state.db, &auth, payload).await?;
    Ok(HttpResponse::Created().json(order))
}

async fn replace(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
    payload: web::Json<OrderInput>,
) -> Result<HttpResponse, BookingError> {
    let payload = payload.into_inner();
    payload.require_complete()?;
    let order = update_order(&state.db, &auth, &path, payload).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn amend(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
    payload: web::Json<OrderInput>,
) -> Result<HttpResponse, BookingError> {
    let order = update_order(&state.db, &auth, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn remove(
    state: web::Data<AppState>,
    auth: web::ReqData<Actor>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    delete_order(&state.db, &auth, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
