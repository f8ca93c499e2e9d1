use actix_web::{http::header, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, CONTACT_MESSAGES};
use crate::middleware::auth::decode_token;
use crate::models::contact::{ContactInput, ContactMessage, ContactView};
use crate::routes::{bad_request, store_error};
use crate::services::validation::validate_contact_input;

/// The route is public; a valid bearer token only links the message to its sender.
fn optional_user_id(req: &HttpRequest, config: &AppConfig) -> Option<ObjectId> {
    let raw = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    let claims = decode_token(&config.jwt_secret, token).ok()?;
    ObjectId::parse_str(&claims.user_id).ok()
}

pub async fn submit_contact_message(
    req: HttpRequest,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<ContactInput>,
) -> impl Responder {
    let input = input.into_inner();
    if let Err(err) = validate_contact_input(&input) {
        return bad_request(err.to_string());
    }

    let mut message = ContactMessage {
        id: None,
        user_id: optional_user_id(&req, &config),
        full_name: input.full_name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        subject: input.subject.trim().to_string(),
        message: input.message.trim().to_string(),
        created_at: Utc::now(),
    };

    let messages = collection::<ContactMessage>(&data, &config, CONTACT_MESSAGES);
    match messages.insert_one(&message).await {
        Ok(result) => {
            message.id = result.inserted_id.as_object_id();
            info!("Contact message received from {}", message.email);
            HttpResponse::Created().json(ContactView::from(message))
        }
        Err(err) => store_error("save contact message", err),
    }
}

pub async fn list_contact_messages(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let messages = collection::<ContactMessage>(&data, &config, CONTACT_MESSAGES);
    match messages.find(doc! {}).sort(doc! { "created_at": -1 }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<ContactMessage>>().await {
            Ok(rows) => HttpResponse::Ok()
                .json(rows.into_iter().map(ContactView::from).collect::<Vec<_>>()),
            Err(err) => store_error("read contact messages", err),
        },
        Err(err) => store_error("fetch contact messages", err),
    }
}
