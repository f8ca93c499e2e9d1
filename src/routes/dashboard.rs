use actix_web::{http::header, web, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use log::error;
use mongodb::bson::doc;
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, BOOKINGS, PROFILES, TOURS};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::profile::Profile;
use crate::models::tour::Tour;
use crate::routes::{error_response, store_error};
use crate::services::booking_service::attach_titles;
use crate::services::export_service::{export_file_name, report_csv};
use crate::services::stats_service::{build_dashboard, build_report};

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub completed_only: Option<bool>,
}

async fn load_all<T>(client: &Client, config: &AppConfig, name: &str) -> Result<Vec<T>, mongodb::error::Error>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + Unpin,
{
    collection::<T>(client, config, name)
        .find(doc! {})
        .await?
        .try_collect()
        .await
}

pub async fn dashboard(data: web::Data<Arc<Client>>, config: web::Data<AppConfig>) -> impl Responder {
    let bookings = match load_all::<Booking>(&data, &config, BOOKINGS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch bookings", err),
    };
    let tours = match load_all::<Tour>(&data, &config, TOURS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch tours", err),
    };
    let profiles = match load_all::<Profile>(&data, &config, PROFILES).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch profiles", err),
    };

    HttpResponse::Ok().json(build_dashboard(Utc::now(), &bookings, &tours, &profiles))
}

pub async fn report(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    query: web::Query<ReportQuery>,
) -> impl Responder {
    let bookings = match load_all::<Booking>(&data, &config, BOOKINGS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch bookings", err),
    };
    let tours = match load_all::<Tour>(&data, &config, TOURS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch tours", err),
    };

    let completed_only = query.completed_only.unwrap_or(false);
    HttpResponse::Ok().json(build_report(Utc::now(), &bookings, &tours, completed_only))
}

/// Report summary plus every counted booking, as a CSV download.
pub async fn export_report_csv(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    query: web::Query<ReportQuery>,
) -> impl Responder {
    let bookings = match load_all::<Booking>(&data, &config, BOOKINGS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch bookings", err),
    };
    let tours = match load_all::<Tour>(&data, &config, TOURS).await {
        Ok(rows) => rows,
        Err(err) => return store_error("fetch tours", err),
    };

    let now = Utc::now();
    let completed_only = query.completed_only.unwrap_or(false);
    let report = build_report(now, &bookings, &tours, completed_only);

    let mut rows: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| !completed_only || b.status == BookingStatus::Completed)
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let views = match attach_titles(&data, &config, rows).await {
        Ok(views) => views,
        Err(err) => return store_error("fetch tours", err),
    };

    match report_csv(&report, &views) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    export_file_name("bookings-report", now.date_naive())
                ),
            ))
            .body(csv),
        Err(err) => {
            error!("Report export failed: {}", err);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to export report",
            )
        }
    }
}
