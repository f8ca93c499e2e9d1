use actix_web::{web, HttpResponse};
use log::error;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::middleware::auth::AuthMiddleware;
use crate::middleware::role_auth::RequireRole;
use crate::models::profile::Role;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod chat;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod tours;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn error_response(status: actix_web::http::StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: message.into(),
    })
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    error_response(actix_web::http::StatusCode::BAD_REQUEST, message)
}

pub fn not_found(what: &str) -> HttpResponse {
    error_response(actix_web::http::StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Logs the store error and answers 500 with a generic message.
pub fn store_error(action: &str, err: mongodb::error::Error) -> HttpResponse {
    error!("Failed to {}: {:?}", action, err);
    error_response(
        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {}", action),
    )
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, HttpResponse> {
    ObjectId::parse_str(raw).map_err(|_| bad_request(format!("Invalid {} ID format", what)))
}

/// All API routes. Callers register `Arc<mongodb::Client>`, `AppConfig` and
/// `GeminiService` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" })).service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(auth::signup))
                    .route("/signin", web::post().to(auth::signin))
                    .route("/admin/signin", web::post().to(auth::admin_signin))
                    .route("/signout", web::post().to(auth::signout))
                    .service(
                        web::scope("")
                            .wrap(AuthMiddleware)
                            .route("/session", web::get().to(auth::session))
                            .route("/profile", web::put().to(auth::update_profile)),
                    ),
            )
            .service(
                web::scope("/tours")
                    .route("", web::get().to(tours::list_tours))
                    .route("/{id}", web::get().to(tours::get_tour)),
            )
            .route("/contact", web::post().to(contact::submit_contact_message))
            .service(
                web::scope("/bookings")
                    .wrap(AuthMiddleware)
                    .route("", web::post().to(bookings::create_booking))
                    .route("", web::get().to(bookings::list_my_bookings))
                    .route("/{id}", web::get().to(bookings::get_my_booking))
                    .route("/{id}/cancel", web::put().to(bookings::cancel_my_booking)),
            )
            .service(
                web::scope("/chat")
                    .wrap(AuthMiddleware)
                    .route("/messages", web::post().to(chat::send_message))
                    .route("/chats", web::get().to(chat::list_chats))
                    .route("/chats/{id}", web::get().to(chat::get_chat))
                    .route("/chats/{id}", web::delete().to(chat::delete_chat)),
            )
            .service(
                // RequireRole reads the claims AuthMiddleware inserts, so Auth must be outermost.
                web::scope("/admin")
                    .wrap(RequireRole::new(Role::Admin))
                    .wrap(AuthMiddleware)
                    .configure(admin::config),
            ),
    );
}
