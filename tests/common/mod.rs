#![allow(dead_code)]

use actix_web::{web, App};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use std::sync::Arc;
use std::time::Duration;

use tour_booking_api::config::AppConfig;
use tour_booking_api::middleware::auth::issue_token;
use tour_booking_api::models::profile::Role;
use tour_booking_api::routes;
use tour_booking_api::services::gemini_service::GeminiService;

/// App wired the same way as the server binary. The MongoDB client connects lazily,
/// so requests rejected before any store access run without a database.
pub struct TestApp {
    pub client: Arc<mongodb::Client>,
    pub config: AppConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = AppConfig::for_tests();
        let client = mongodb::Client::with_uri_str(&config.mongo_uri)
            .await
            .expect("valid test MongoDB URI");

        Self {
            client: Arc::new(client),
            config,
        }
    }

    /// App backed by a reachable MongoDB (`MONGODB_URI`, default localhost), or `None`
    /// when no server answers a ping within two seconds.
    pub async fn with_store() -> Option<Self> {
        let mut config = AppConfig::for_tests();
        if let Ok(uri) = std::env::var("MONGODB_URI") {
            config.mongo_uri = uri;
        }

        let mut options = ClientOptions::parse(&config.mongo_uri).await.ok()?;
        options.server_selection_timeout = Some(Duration::from_secs(2));
        let client = mongodb::Client::with_options(options).ok()?;
        if let Err(err) = client.database("admin").run_command(doc! { "ping": 1 }).await {
            eprintln!("Skipping store-backed test, MongoDB unavailable: {}", err);
            return None;
        }

        Some(Self {
            client: Arc::new(client),
            config,
        })
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let gemini = GeminiService::new(&self.config).expect("gemini client");

        App::new()
            .app_data(web::Data::new(self.client.clone()))
            .app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(gemini))
            .configure(routes::configure)
    }

    pub fn bearer(&self, role: Role) -> String {
        self.bearer_for(ObjectId::new(), role)
    }

    pub fn bearer_for(&self, user_id: ObjectId, role: Role) -> String {
        let token =
            issue_token(&self.config, &get_test_email(), user_id, role).expect("test token");
        format!("Bearer {}", token)
    }
}

pub fn get_test_email() -> String {
    "test@example.com".to_string()
}

pub fn get_test_password() -> String {
    "testpassword123".to_string()
}
