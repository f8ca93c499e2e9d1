use actix_web::{web, HttpResponse, Responder};
use log::error;
use mongodb::{bson::doc, Client};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::config::AppConfig;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details.into()),
        }
    }

    fn disabled(key: &str) -> Self {
        Self {
            status: "disabled".to_string(),
            details: Some(format!("{} not configured", key)),
        }
    }
}

/// Only the database decides the overall status; unconfigured integrations
/// degrade to fallbacks and are reported as `disabled`.
pub async fn health_check(
    client: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let mongo = check_mongodb(&client, &config).await;
    let status = if mongo.status == "ok" { "ok" } else { "degraded" };

    let mut services = HashMap::new();
    services.insert("mongodb".to_string(), mongo);
    services.insert(
        "gemini".to_string(),
        integration(config.gemini_api_key.is_some(), "GEMINI_API_KEY", "Gemini API key configured"),
    );
    services.insert(
        "sendgrid".to_string(),
        integration(
            config.sendgrid_api_key.is_some(),
            "SENDGRID_API_KEY",
            "SendGrid API key configured",
        ),
    );
    services.insert(
        "cloud_storage".to_string(),
        match &config.tour_image_bucket {
            Some(bucket) => ServiceStatus::ok(format!("Tour images stored in bucket '{}'", bucket)),
            None => ServiceStatus::disabled("TOUR_IMAGE_BUCKET"),
        },
    );

    HttpResponse::Ok().json(HealthStatus {
        status: status.to_string(),
        services,
        environment: env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn integration(configured: bool, key: &str, details: &str) -> ServiceStatus {
    if configured {
        ServiceStatus::ok(details)
    } else {
        ServiceStatus::disabled(key)
    }
}

async fn check_mongodb(client: &Client, config: &AppConfig) -> ServiceStatus {
    match client
        .database(&config.database)
        .run_command(doc! { "ping": 1 })
        .await
    {
        Ok(_) => ServiceStatus::ok("Connected successfully to MongoDB"),
        Err(e) => {
            error!("MongoDB health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to connect: {}", e)),
            }
        }
    }
}
