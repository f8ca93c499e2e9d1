use log::{info, warn};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Client,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::mongo::{collection, BOOKINGS, PROFILES, TOURS};
use crate::models::booking::Booking;
use crate::models::profile::Profile;
use crate::models::tour::Tour;

#[derive(Debug, Serialize, Deserialize)]
pub struct SendGridEmail {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendGridPersonalization {
    pub to: Vec<SendGridEmail>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendGridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendGridRequest {
    pub personalizations: Vec<SendGridPersonalization>,
    pub from: SendGridEmail,
    pub subject: String,
    pub content: Vec<SendGridContent>,
}

#[derive(Debug)]
pub enum EmailError {
    EnvironmentError(String),
    RequestError(String),
    ApiError(String),
    DatabaseError(String),
    NotFound(String),
    NoRecipient,
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::EnvironmentError(err) => write!(f, "Environment error: {}", err),
            EmailError::RequestError(err) => write!(f, "Request error: {}", err),
            EmailError::ApiError(err) => write!(f, "API error: {}", err),
            EmailError::DatabaseError(err) => write!(f, "Database error: {}", err),
            EmailError::NotFound(what) => write!(f, "{} not found", what),
            EmailError::NoRecipient => write!(f, "No recipient email for booking"),
        }
    }
}

impl std::error::Error for EmailError {}

impl From<mongodb::error::Error> for EmailError {
    fn from(err: mongodb::error::Error) -> Self {
        EmailError::DatabaseError(err.to_string())
    }
}

/// Booking contact email first, then the account email.
pub fn resolve_recipient(booking: &Booking, profile: Option<&Profile>) -> Option<String> {
    booking
        .contact_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .or_else(|| profile.map(|p| p.email.clone()))
}

pub fn cancellation_subject(tour_title: &str) -> String {
    format!("Your booking for {} has been cancelled", tour_title)
}

pub fn cancellation_html(booking: &Booking, tour_title: &str, customer_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Booking Cancelled</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #fdecea; padding: 20px; border-radius: 5px; text-align: center; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        td {{ padding: 8px; border-bottom: 1px solid #eee; }}
        .footer {{ margin-top: 30px; font-size: 14px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Booking Cancelled</h1>
        </div>
        <p>Hi {name},</p>
        <p>Your booking has been cancelled. Here are the details:</p>
        <table>
            <tr><td>Tour</td><td>{tour}</td></tr>
            <tr><td>Date</td><td>{date}</td></tr>
            <tr><td>Guests</td><td>{people}</td></tr>
            <tr><td>Total</td><td>${total:.2}</td></tr>
            <tr><td>Booking reference</td><td>{reference}</td></tr>
        </table>
        <p>If you did not request this cancellation or have any questions, just reply to this email.</p>
        <div class="footer">
            <p>Best regards,<br>The TourGuide Team</p>
        </div>
    </div>
</body>
</html>"#,
        name = escape_html(customer_name),
        tour = escape_html(tour_title),
        date = booking.booking_date,
        people = booking.number_of_people,
        total = booking.total_price,
        reference = booking.id.map(|id| id.to_hex()).unwrap_or_default(),
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct EmailService {
    api_key: String,
    from_email: String,
    url: String,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Result<Self, EmailError> {
        let api_key = config
            .sendgrid_api_key
            .clone()
            .ok_or_else(|| EmailError::EnvironmentError("SENDGRID_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| EmailError::RequestError(e.to_string()))?;

        Ok(Self {
            api_key,
            from_email: config.from_email.clone(),
            url: config.sendgrid_url.clone(),
            client,
        })
    }

    pub async fn send_html_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let request = SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridEmail {
                    email: to_email.to_string(),
                }],
            }],
            from: SendGridEmail {
                email: self.from_email.clone(),
            },
            subject: subject.to_string(),
            content: vec![SendGridContent {
                content_type: "text/html".to_string(),
                value: html_content.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::RequestError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(EmailError::ApiError(format!("Status: {}, Body: {}", status, body)))
        }
    }

    /// Looks up the booking, its tour and owner, and mails the cancellation notice.
    pub async fn send_cancellation_notice(
        &self,
        db_client: &Client,
        config: &AppConfig,
        booking_id: ObjectId,
    ) -> Result<String, EmailError> {
        let booking = collection::<Booking>(db_client, config, BOOKINGS)
            .find_one(doc! { "_id": booking_id })
            .await?
            .ok_or_else(|| EmailError::NotFound("Booking".to_string()))?;

        let tour = collection::<Tour>(db_client, config, TOURS)
            .find_one(doc! { "_id": booking.tour_id })
            .await?;
        let profile = collection::<Profile>(db_client, config, PROFILES)
            .find_one(doc! { "_id": booking.user_id })
            .await?;

        let recipient =
            resolve_recipient(&booking, profile.as_ref()).ok_or(EmailError::NoRecipient)?;
        let tour_title = tour.map(|t| t.title).unwrap_or_else(|| "your tour".to_string());
        let customer_name = profile
            .and_then(|p| p.full_name)
            .unwrap_or_else(|| "traveler".to_string());

        self.send_html_email(
            &recipient,
            &cancellation_subject(&tour_title),
            &cancellation_html(&booking, &tour_title, &customer_name),
        )
        .await?;

        info!("Sent cancellation notice for booking {} to {}", booking_id, recipient);
        Ok(recipient)
    }
}

/// Sends the cancellation notice in the background when email is configured.
/// The caller never waits on SendGrid; failures are only logged.
pub fn notify_cancellation(db_client: Arc<Client>, config: AppConfig, booking_id: ObjectId) {
    let service = match EmailService::new(&config) {
        Ok(service) => service,
        Err(err) => {
            warn!("Skipping cancellation email for {}: {}", booking_id, err);
            return;
        }
    };

    tokio::spawn(async move {
        if let Err(err) = service
            .send_cancellation_notice(&db_client, &config, booking_id)
            .await
        {
            warn!("Cancellation email for {} failed: {}", booking_id, err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::BookingStatus;
    use crate::models::profile::Role;
    use chrono::{NaiveDate, Utc};

    fn booking(contact_email: Option<&str>) -> Booking {
        Booking {
            id: Some(ObjectId::new()),
            user_id: ObjectId::new(),
            tour_id: ObjectId::new(),
            booking_date: NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            number_of_people: 3,
            total_price: 450.0,
            status: BookingStatus::Cancelled,
            special_requests: None,
            contact_phone: None,
            contact_email: contact_email.map(str::to_string),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn profile() -> Profile {
        Profile {
            id: Some(ObjectId::new()),
            email: "account@example.com".to_string(),
            password: "hash".to_string(),
            full_name: Some("Linh".to_string()),
            phone: None,
            role: Role::User,
            last_signin: None,
            failed_signins: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_recipient_prefers_contact_email() {
        let p = profile();
        assert_eq!(
            resolve_recipient(&booking(Some("contact@example.com")), Some(&p)).as_deref(),
            Some("contact@example.com")
        );
        assert_eq!(
            resolve_recipient(&booking(Some("  ")), Some(&p)).as_deref(),
            Some("account@example.com")
        );
        assert_eq!(resolve_recipient(&booking(None), None), None);
    }

    #[test]
    fn test_cancellation_html_has_details_and_escapes() {
        let b = booking(None);
        let html = cancellation_html(&b, "Cu Chi <Tunnels>", "Linh");
        assert!(html.contains("Cu Chi &lt;Tunnels&gt;"));
        assert!(html.contains("2026-12-24"));
        assert!(html.contains("$450.00"));
        assert!(html.contains(&b.id.unwrap().to_hex()));
        assert_eq!(
            cancellation_subject("Cu Chi Tunnels"),
            "Your booking for Cu Chi Tunnels has been cancelled"
        );
    }

    #[test]
    fn test_service_requires_api_key() {
        assert!(EmailService::new(&AppConfig::for_tests()).is_err());
    }

    #[actix_rt::test]
    async fn test_stalled_sendgrid_times_out() {
        // Accepts connections (via the backlog) but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = AppConfig::for_tests();
        config.sendgrid_api_key = Some("test-key".to_string());
        config.sendgrid_url = format!("http://{}/v3/mail/send", addr);
        config.http_timeout_secs = 1;

        let service = EmailService::new(&config).unwrap();
        let started = std::time::Instant::now();
        let result = service
            .send_html_email("guest@example.com", "Subject", "<p>Body</p>")
            .await;

        assert!(matches!(result, Err(EmailError::RequestError(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(listener);
    }
}
