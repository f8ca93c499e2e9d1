use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use log::{error, info};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::mongo::{collection, CHATS, TOURS};
use crate::models::booking::BookingView;
use crate::models::chat::{Chat, ChatMessage};
use crate::models::tour::Tour;
use crate::services::booking_service::find_booking_views;
use crate::services::gemini_service::{build_prompt, ChatbotError, GeminiService, FALLBACK_REPLY};

pub const MAX_CHATS_PER_USER: usize = 50;
pub const CONTEXT_BOOKINGS: i64 = 10;
pub const CONTEXT_TOURS: i64 = 5;
const TITLE_CHARS: usize = 40;

/// Title for a new conversation, taken from its first message.
pub fn chat_title(first_message: &str) -> String {
    let text = first_message.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return "New conversation".to_string();
    }
    if text.chars().count() <= TITLE_CHARS {
        text
    } else {
        let cut: String = text.chars().take(TITLE_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

pub fn new_chat(user_id: ObjectId, first_message: &str) -> Chat {
    Chat {
        id: ObjectId::new(),
        user_id,
        title: chat_title(first_message),
        messages: Vec::new(),
        timestamp: Utc::now(),
    }
}

pub async fn find_chat(
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
    chat_id: ObjectId,
) -> Result<Option<Chat>, mongodb::error::Error> {
    collection::<Chat>(client, config, CHATS)
        .find_one(doc! { "_id": chat_id, "user_id": user_id })
        .await
}

pub async fn list_chats(
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
) -> Result<Vec<Chat>, mongodb::error::Error> {
    collection::<Chat>(client, config, CHATS)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "timestamp": -1 })
        .limit(MAX_CHATS_PER_USER as i64)
        .await?
        .try_collect()
        .await
}

/// Replaces the whole chat document, inserting it if new.
pub async fn save_chat(
    client: &Client,
    config: &AppConfig,
    chat: &Chat,
) -> Result<(), mongodb::error::Error> {
    collection::<Chat>(client, config, CHATS)
        .replace_one(doc! { "_id": chat.id, "user_id": chat.user_id }, chat)
        .upsert(true)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStamp {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub timestamp: DateTime<Utc>,
}

/// Ids of the chats beyond the `MAX_CHATS_PER_USER` most recent ones.
pub fn stale_chat_ids(mut stamps: Vec<ChatStamp>) -> Vec<ObjectId> {
    stamps.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    stamps
        .into_iter()
        .skip(MAX_CHATS_PER_USER)
        .map(|s| s.id)
        .collect()
}

/// Deletes all but the most recent `MAX_CHATS_PER_USER` chats of a user.
pub async fn trim_chats(
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
) -> Result<u64, mongodb::error::Error> {
    let chats = collection::<ChatStamp>(client, config, CHATS);

    let stamps: Vec<ChatStamp> = chats
        .find(doc! { "user_id": user_id })
        .projection(doc! { "_id": 1, "timestamp": 1 })
        .await?
        .try_collect()
        .await?;

    let ids = stale_chat_ids(stamps);
    if ids.is_empty() {
        return Ok(0);
    }

    let result = chats.delete_many(doc! { "_id": { "$in": ids } }).await?;
    info!("Trimmed {} old chats for user {}", result.deleted_count, user_id);
    Ok(result.deleted_count)
}

pub async fn delete_chat(
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
    chat_id: ObjectId,
) -> Result<bool, mongodb::error::Error> {
    let result = collection::<Chat>(client, config, CHATS)
        .delete_one(doc! { "_id": chat_id, "user_id": user_id })
        .await?;
    Ok(result.deleted_count > 0)
}

async fn load_context(
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
) -> Result<(Vec<BookingView>, Vec<Tour>), mongodb::error::Error> {
    let bookings =
        find_booking_views(client, config, doc! { "user_id": user_id }, Some(CONTEXT_BOOKINGS))
            .await?;

    let tours: Vec<Tour> = collection::<Tour>(client, config, TOURS)
        .find(doc! { "available": true })
        .sort(doc! { "rating": -1 })
        .limit(CONTEXT_TOURS)
        .await?
        .try_collect()
        .await?;

    Ok((bookings, tours))
}

async fn try_reply(
    gemini: &GeminiService,
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
    history: &[ChatMessage],
    message: &str,
) -> Result<String, ChatbotError> {
    let (bookings, tours) = load_context(client, config, user_id).await?;
    let prompt = build_prompt(message, history, &bookings, &tours);
    gemini.generate(prompt).await
}

/// Assistant reply for `message`. Any failure becomes the fallback reply.
pub async fn reply(
    gemini: &GeminiService,
    client: &Client,
    config: &AppConfig,
    user_id: ObjectId,
    history: &[ChatMessage],
    message: &str,
) -> ChatMessage {
    match try_reply(gemini, client, config, user_id, history, message).await {
        Ok(text) => ChatMessage::assistant(text),
        Err(err) => {
            error!("TourGuide AI reply failed for user {}: {}", user_id, err);
            ChatMessage::assistant(FALLBACK_REPLY)
        }
    }
}
