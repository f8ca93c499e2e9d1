use actix_web::{web, HttpResponse, Responder};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, timestamp_now, PROFILES};
use crate::models::profile::{Profile, ProfileView, RoleUpdate};
use crate::routes::{bookings, contact, dashboard, not_found, parse_object_id, store_error, tours};

/// Back-office routes; the enclosing scope applies authentication and the admin role check.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard::dashboard))
        .route("/reports", web::get().to(dashboard::report))
        .route("/reports/export", web::get().to(dashboard::export_report_csv))
        .route("/bookings", web::get().to(bookings::list_bookings))
        .route("/bookings/{id}/status", web::put().to(bookings::update_booking_status))
        .route("/bookings/{id}", web::delete().to(bookings::delete_booking))
        .route("/tours", web::post().to(tours::create_tour))
        .route("/tours/{id}", web::put().to(tours::update_tour))
        .route("/tours/{id}", web::delete().to(tours::delete_tour))
        .route("/tours/{id}/image", web::post().to(tours::upload_tour_image))
        .route("/users", web::get().to(list_profiles))
        .route("/users/{id}/role", web::put().to(update_profile_role))
        .route("/contact-messages", web::get().to(contact::list_contact_messages));
}

pub async fn list_profiles(data: web::Data<Arc<Client>>, config: web::Data<AppConfig>) -> impl Responder {
    let profiles = collection::<Profile>(&data, &config, PROFILES);
    match profiles.find(doc! {}).sort(doc! { "created_at": -1 }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Profile>>().await {
            Ok(rows) => HttpResponse::Ok()
                .json(rows.into_iter().map(ProfileView::from).collect::<Vec<_>>()),
            Err(err) => store_error("read profiles", err),
        },
        Err(err) => store_error("fetch profiles", err),
    }
}

/// Changes the stored role. Admin routes check the role carried in the JWT, so a
/// demoted admin keeps back-office access until their current token expires
/// (`JWT_TTL_HOURS`); the new role applies from their next sign-in.
pub async fn update_profile_role(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    input: web::Json<RoleUpdate>,
) -> impl Responder {
    let user_id = match parse_object_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let role = input.role;

    let profiles = collection::<Profile>(&data, &config, PROFILES);
    let update = doc! { "$set": { "role": role.as_str(), "updated_at": timestamp_now() } };
    match profiles
        .find_one_and_update(doc! { "_id": user_id }, update)
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(profile)) => {
            info!("User {} role set to {}", user_id, role.as_str());
            HttpResponse::Ok().json(ProfileView::from(profile))
        }
        Ok(None) => not_found("User"),
        Err(err) => store_error("update user role", err),
    }
}
