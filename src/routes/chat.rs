use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::error;
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::chat::{ChatMessage, ChatReply, ChatSummary, ChatView, SendMessageInput};
use crate::routes::{bad_request, not_found, parse_object_id, store_error};
use crate::services::chat_service;
use crate::services::gemini_service::GeminiService;

/// One TourGuide AI turn: stores the user message and the assistant reply on the chat,
/// creating the chat when no id is given.
pub async fn send_message(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    gemini: web::Data<GeminiService>,
    user: AuthenticatedUser,
    input: web::Json<SendMessageInput>,
) -> impl Responder {
    let input = input.into_inner();
    let message = input.message.trim().to_string();
    if message.is_empty() {
        return bad_request("Message cannot be empty");
    }

    let mut chat = match input.chat_id.as_deref() {
        Some(raw) => {
            let chat_id = match parse_object_id(raw, "chat") {
                Ok(id) => id,
                Err(resp) => return resp,
            };
            match chat_service::find_chat(&data, &config, user.user_id, chat_id).await {
                Ok(Some(chat)) => chat,
                Ok(None) => return not_found("Chat"),
                Err(err) => return store_error("fetch chat", err),
            }
        }
        None => chat_service::new_chat(user.user_id, &message),
    };

    // History passed to the model excludes the message being answered.
    let history = chat.messages.clone();
    chat.messages.push(ChatMessage::user(message.as_str()));

    let reply =
        chat_service::reply(&gemini, &data, &config, user.user_id, &history, &message).await;
    chat.messages.push(reply.clone());
    chat.timestamp = Utc::now();

    if let Err(err) = chat_service::save_chat(&data, &config, &chat).await {
        return store_error("save chat", err);
    }
    let client = data.get_ref().clone();
    let settings = config.get_ref().clone();
    let user_id = user.user_id;
    tokio::spawn(async move {
        if let Err(err) = chat_service::trim_chats(&client, &settings, user_id).await {
            error!("Failed to trim chats for user {}: {:?}", user_id, err);
        }
    });

    HttpResponse::Ok().json(ChatReply {
        chat: ChatView::from(chat),
        reply,
    })
}

pub async fn list_chats(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    user: AuthenticatedUser,
) -> impl Responder {
    match chat_service::list_chats(&data, &config, user.user_id).await {
        Ok(chats) => HttpResponse::Ok()
            .json(chats.into_iter().map(ChatSummary::from).collect::<Vec<_>>()),
        Err(err) => store_error("fetch chats", err),
    }
}

pub async fn get_chat(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> impl Responder {
    let chat_id = match parse_object_id(&path.into_inner(), "chat") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match chat_service::find_chat(&data, &config, user.user_id, chat_id).await {
        Ok(Some(chat)) => HttpResponse::Ok().json(ChatView::from(chat)),
        Ok(None) => not_found("Chat"),
        Err(err) => store_error("fetch chat", err),
    }
}

pub async fn delete_chat(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> impl Responder {
    let chat_id = match parse_object_id(&path.into_inner(), "chat") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match chat_service::delete_chat(&data, &config, user.user_id, chat_id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Chat"),
        Err(err) => store_error("delete chat", err),
    }
}
