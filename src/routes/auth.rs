use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use chrono::Utc;
use log::{error, info, warn};
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, is_duplicate_key, timestamp_now, PROFILES};
use crate::middleware::auth::issue_token;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::profile::{
    Profile, ProfileUpdate, ProfileView, Role, SessionResponse, SignInInput, SignUpInput,
};
use crate::routes::{bad_request, error_response, not_found, store_error};
use crate::services::validation::{require_email, require_non_empty};

pub const MIN_PASSWORD_LEN: usize = 6;

fn session_for(config: &AppConfig, profile: Profile) -> HttpResponse {
    let user_id = match profile.id {
        Some(id) => id,
        None => {
            error!("Profile {} has no id", profile.email);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Token generation failed");
        }
    };

    match issue_token(config, &profile.email, user_id, profile.role) {
        Ok(token) => HttpResponse::Ok().json(SessionResponse {
            auth_token: Some(token),
            profile: Some(ProfileView::from(profile)),
        }),
        Err(err) => {
            error!("Token generation failed: {:?}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Token generation failed")
        }
    }
}

pub async fn signup(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<SignUpInput>,
) -> impl Responder {
    let input = input.into_inner();

    if let Err(err) = require_email(&input.email) {
        return bad_request(err.to_string());
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    let password = match bcrypt::hash(&input.password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Password hashing failed: {:?}", err);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create account");
        }
    };

    let now = Utc::now();
    let mut profile = Profile {
        id: None,
        email: input.email.trim().to_lowercase(),
        password,
        full_name: input.full_name,
        phone: input.phone,
        role: Role::User,
        last_signin: Some(now),
        failed_signins: Some(0),
        created_at: Some(now),
        updated_at: Some(now),
    };

    let profiles = collection::<Profile>(&data, &config, PROFILES);
    match profiles.insert_one(&profile).await {
        Ok(result) => {
            profile.id = result.inserted_id.as_object_id();
            info!("New account {}", profile.email);
            session_for(&config, profile)
        }
        Err(err) if is_duplicate_key(&err) => {
            error_response(StatusCode::CONFLICT, "User already exists")
        }
        Err(err) => store_error("create account", err),
    }
}

/// Password check shared by customer and admin sign-in. Records the outcome on the profile.
async fn authenticate(
    client: &Client,
    config: &AppConfig,
    input: SignInInput,
) -> Result<Profile, HttpResponse> {
    let profiles = collection::<Profile>(client, config, PROFILES);
    let email = input.email.trim().to_lowercase();

    let profile = match profiles.find_one(doc! { "email": email.as_str() }).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"));
        }
        Err(err) => return Err(store_error("process sign-in", err)),
    };

    if bcrypt::verify(&input.password, &profile.password).unwrap_or(false) {
        let update = doc! {
            "$set": { "last_signin": timestamp_now(), "failed_signins": 0 }
        };
        if let Err(err) = profiles.update_one(doc! { "email": email.as_str() }, update).await {
            warn!("Failed to record sign-in for {}: {:?}", email, err);
        }
        Ok(profile)
    } else {
        let failed_signins = profile.failed_signins.unwrap_or(0) + 1;
        let update = doc! { "$set": { "failed_signins": failed_signins } };
        if let Err(err) = profiles.update_one(doc! { "email": email.as_str() }, update).await {
            warn!("Failed to record failed sign-in for {}: {:?}", email, err);
        }
        Err(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"))
    }
}

pub async fn signin(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<SignInInput>,
) -> impl Responder {
    match authenticate(&data, &config, input.into_inner()).await {
        Ok(profile) => session_for(&config, profile),
        Err(resp) => resp,
    }
}

/// Back-office sign-in: same credentials check, then the account must hold the admin role.
pub async fn admin_signin(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<SignInInput>,
) -> impl Responder {
    match authenticate(&data, &config, input.into_inner()).await {
        Ok(profile) if profile.role == Role::Admin => session_for(&config, profile),
        Ok(profile) => {
            warn!("Non-admin {} tried to sign in to the back office", profile.email);
            error_response(StatusCode::FORBIDDEN, "Access denied: admin account required")
        }
        Err(resp) => resp,
    }
}

/// Tokens are stateless; signing out hands back an empty session for the client to keep.
pub async fn signout() -> impl Responder {
    HttpResponse::Ok().json(SessionResponse {
        auth_token: None,
        profile: None,
    })
}

pub async fn session(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let profiles = collection::<Profile>(&data, &config, PROFILES);
    match profiles.find_one(doc! { "_id": user.user_id }).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(ProfileView::from(profile)),
        Ok(None) => not_found("User"),
        Err(err) => store_error("fetch user", err),
    }
}

pub async fn update_profile(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<ProfileUpdate>,
) -> impl Responder {
    let input = input.into_inner();
    let mut set = doc! { "updated_at": timestamp_now() };

    if let Some(full_name) = input.full_name {
        if let Err(err) = require_non_empty("full_name", &full_name) {
            return bad_request(err.to_string());
        }
        set.insert("full_name", full_name.trim());
    }
    if let Some(phone) = input.phone {
        set.insert("phone", phone.trim());
    }

    let profiles = collection::<Profile>(&data, &config, PROFILES);
    match profiles
        .find_one_and_update(doc! { "_id": user.user_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(profile)) => HttpResponse::Ok().json(ProfileView::from(profile)),
        Ok(None) => not_found("User"),
        Err(err) => store_error("update profile", err),
    }
}
