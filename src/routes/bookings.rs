use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use chrono::Utc;
use log::info;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, timestamp_now, BOOKINGS, TOURS};
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::booking::{
    Booking, BookingInput, BookingQuery, BookingStatus, BookingView, StatusUpdate,
};
use crate::models::tour::Tour;
use crate::routes::tours::clamp_limit;
use crate::routes::{bad_request, error_response, not_found, parse_object_id, store_error};
use crate::services::booking_service::{attach_titles, find_booking_views};
use crate::services::email_service::notify_cancellation;
use crate::services::pricing_service::PricingService;
use crate::services::validation::validate_booking_input;

pub const DEFAULT_BOOKING_LIMIT: i64 = 100;
pub const MAX_BOOKING_LIMIT: i64 = 500;

async fn single_view(
    client: &Client,
    config: &AppConfig,
    booking: Booking,
) -> Result<BookingView, mongodb::error::Error> {
    let mut views = attach_titles(client, config, vec![booking]).await?;
    Ok(views.remove(0))
}

/// Checks the form, prices it against the stored tour and inserts a pending booking.
/// Any client-side total is ignored; the total is always unit price times headcount.
pub async fn create_booking(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<BookingInput>,
) -> impl Responder {
    let input = input.into_inner();

    let number_of_people = match validate_booking_input(&input, Utc::now().date_naive()) {
        Ok(n) => n,
        Err(err) => return bad_request(err.to_string()),
    };
    let contact_email = input
        .contact_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    let tour_id = match parse_object_id(&input.tour_id, "tour") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let tour = match collection::<Tour>(&data, &config, TOURS)
        .find_one(doc! { "_id": tour_id })
        .await
    {
        Ok(Some(tour)) => tour,
        Ok(None) => return not_found("Tour"),
        Err(err) => return store_error("fetch tour", err),
    };

    let total_price = match PricingService::quote(&tour, number_of_people) {
        Ok(total) => total,
        Err(err) => return bad_request(err.to_string()),
    };

    let now = Utc::now();
    let mut booking = Booking {
        id: None,
        user_id: user.user_id,
        tour_id,
        booking_date: input.booking_date,
        number_of_people,
        total_price,
        status: BookingStatus::Pending,
        special_requests: input.special_requests.filter(|s| !s.trim().is_empty()),
        contact_phone: input.contact_phone.filter(|s| !s.trim().is_empty()),
        contact_email,
        created_at: now,
        updated_at: Some(now),
    };

    match collection::<Booking>(&data, &config, BOOKINGS)
        .insert_one(&booking)
        .await
    {
        Ok(result) => {
            booking.id = result.inserted_id.as_object_id();
            info!(
                "Booking {:?} created by {} for tour {} ({} people)",
                booking.id, user.email, tour.title, number_of_people
            );
            HttpResponse::Created().json(BookingView::new(booking, Some(tour.title)))
        }
        Err(err) => store_error("create booking", err),
    }
}

pub async fn list_my_bookings(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    match find_booking_views(&data, &config, doc! { "user_id": user.user_id }, None).await {
        Ok(views) => HttpResponse::Ok().json(views),
        Err(err) => store_error("fetch bookings", err),
    }
}

pub async fn get_my_booking(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> impl Responder {
    let booking_id = match parse_object_id(&path.into_inner(), "booking") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let filter = doc! { "_id": booking_id, "user_id": user.user_id };
    match find_booking_views(&data, &config, filter, Some(1)).await {
        Ok(mut views) if !views.is_empty() => HttpResponse::Ok().json(views.remove(0)),
        Ok(_) => not_found("Booking"),
        Err(err) => store_error("fetch booking", err),
    }
}

/// Customers may only cancel bookings that are still pending or confirmed.
pub async fn cancel_my_booking(
    user: AuthenticatedUser,
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> impl Responder {
    let booking_id = match parse_object_id(&path.into_inner(), "booking") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let bookings = collection::<Booking>(&data, &config, BOOKINGS);
    let booking = match bookings
        .find_one(doc! { "_id": booking_id, "user_id": user.user_id })
        .await
    {
        Ok(Some(booking)) => booking,
        Ok(None) => return not_found("Booking"),
        Err(err) => return store_error("fetch booking", err),
    };

    if !booking.status.can_transition_to(BookingStatus::Cancelled) {
        return error_response(
            StatusCode::CONFLICT,
            format!("A {} booking cannot be cancelled", booking.status.as_str()),
        );
    }

    let update = status_update(BookingStatus::Cancelled);
    let updated = match bookings
        .find_one_and_update(doc! { "_id": booking_id, "user_id": user.user_id }, update)
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(booking)) => booking,
        Ok(None) => return not_found("Booking"),
        Err(err) => return store_error("cancel booking", err),
    };

    info!("Booking {} cancelled by {}", booking_id, user.email);
    notify_cancellation(data.get_ref().clone(), config.get_ref().clone(), booking_id);

    match single_view(&data, &config, updated).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(err) => store_error("fetch booking", err),
    }
}

fn status_update(status: BookingStatus) -> Document {
    doc! { "$set": { "status": status.as_str(), "updated_at": timestamp_now() } }
}

pub async fn list_bookings(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    query: web::Query<BookingQuery>,
) -> impl Responder {
    let mut filter = doc! {};
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    let limit = clamp_limit(query.limit, DEFAULT_BOOKING_LIMIT, MAX_BOOKING_LIMIT);

    match find_booking_views(&data, &config, filter, Some(limit)).await {
        Ok(views) => HttpResponse::Ok().json(views),
        Err(err) => store_error("fetch bookings", err),
    }
}

/// Back-office status change. Plain field overwrite: any of the four states, last write wins.
pub async fn update_booking_status(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    input: web::Json<StatusUpdate>,
) -> impl Responder {
    let booking_id = match parse_object_id(&path.into_inner(), "booking") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status = input.status;

    let bookings = collection::<Booking>(&data, &config, BOOKINGS);
    let previous = match bookings
        .find_one_and_update(doc! { "_id": booking_id }, status_update(status))
        .return_document(ReturnDocument::Before)
        .await
    {
        Ok(Some(booking)) => booking,
        Ok(None) => return not_found("Booking"),
        Err(err) => return store_error("update booking status", err),
    };

    info!(
        "Booking {} status {} -> {}",
        booking_id,
        previous.status.as_str(),
        status.as_str()
    );
    if status == BookingStatus::Cancelled && previous.status != BookingStatus::Cancelled {
        notify_cancellation(data.get_ref().clone(), config.get_ref().clone(), booking_id);
    }

    let updated = Booking {
        status,
        ..previous
    };
    match single_view(&data, &config, updated).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(err) => store_error("fetch booking", err),
    }
}

pub async fn delete_booking(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> impl Responder {
    let booking_id: ObjectId = match parse_object_id(&path.into_inner(), "booking") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match collection::<Booking>(&data, &config, BOOKINGS)
        .delete_one(doc! { "_id": booking_id })
        .await
    {
        Ok(result) if result.deleted_count == 0 => not_found("Booking"),
        Ok(_) => {
            info!("Deleted booking {}", booking_id);
            HttpResponse::NoContent().finish()
        }
        Err(err) => store_error("delete booking", err),
    }
}
