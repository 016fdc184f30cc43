use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::{auth::basic_validator, roles::Actor};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(
            web::resource(["/users/me", "/users/me/"])
                .wrap(HttpAuthentication::basic(basic_validator))
                .route(web::get().to(me)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn me(auth: web::ReqData<Actor>) -> HttpResponse {
    HttpResponse::Ok().json(auth.summary())
}
