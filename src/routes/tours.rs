use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use futures::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mongo::{collection, timestamp_now, TOURS};
use crate::models::tour::{Tour, TourInput, TourQuery, TourView};
use crate::routes::{bad_request, error_response, not_found, parse_object_id, store_error};
use crate::services::image_service::{ImageData, ImageService, ImageUploadError};
use crate::services::validation::validate_tour_input;

pub const DEFAULT_TOUR_LIMIT: i64 = 50;
pub const MAX_TOUR_LIMIT: i64 = 200;

pub fn tour_filter(query: &TourQuery) -> Document {
    let mut filter = doc! {};
    if let Some(tour_type) = query.tour_type {
        filter.insert("type", tour_type.as_str());
    }
    if let Some(available) = query.available {
        filter.insert("available", available);
    }
    if let Some(location) = query.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        filter.insert(
            "location",
            doc! { "$regex": regex::escape(location), "$options": "i" },
        );
    }
    filter
}

pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.filter(|l| *l > 0).unwrap_or(default).min(max)
}

pub async fn list_tours(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    query: web::Query<TourQuery>,
) -> impl Responder {
    let tours = collection::<Tour>(&data, &config, TOURS);

    let cursor = tours
        .find(tour_filter(&query))
        .sort(doc! { "created_at": -1 })
        .limit(clamp_limit(query.limit, DEFAULT_TOUR_LIMIT, MAX_TOUR_LIMIT))
        .await;

    match cursor {
        Ok(cursor) => match cursor.try_collect::<Vec<Tour>>().await {
            Ok(rows) => {
                HttpResponse::Ok().json(rows.into_iter().map(TourView::from).collect::<Vec<_>>())
            }
            Err(err) => store_error("read tours", err),
        },
        Err(err) => store_error("fetch tours", err),
    }
}

pub async fn get_tour(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> impl Responder {
    let tour_id = match parse_object_id(&path.into_inner(), "tour") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let tours = collection::<Tour>(&data, &config, TOURS);
    match tours.find_one(doc! { "_id": tour_id }).await {
        Ok(Some(tour)) => HttpResponse::Ok().json(TourView::from(tour)),
        Ok(None) => not_found("Tour"),
        Err(err) => store_error("fetch tour", err),
    }
}

pub async fn create_tour(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    input: web::Json<TourInput>,
) -> impl Responder {
    let input = input.into_inner();
    if let Err(err) = validate_tour_input(&input) {
        return bad_request(err.to_string());
    }

    let mut tour = input.into_tour();
    let tours = collection::<Tour>(&data, &config, TOURS);
    match tours.insert_one(&tour).await {
        Ok(result) => {
            tour.id = result.inserted_id.as_object_id();
            info!("Created tour {:?} ({})", tour.id, tour.title);
            HttpResponse::Created().json(TourView::from(tour))
        }
        Err(err) => store_error("create tour", err),
    }
}

fn update_document(input: &TourInput) -> Document {
    let mut set = doc! {
        "title": input.title.trim(),
        "description": input.description.clone(),
        "price": input.price,
        "duration": input.duration.clone(),
        "location": input.location.trim(),
        "type": input.tour_type.as_str(),
        "max_capacity": i64::from(input.max_capacity),
        "updated_at": timestamp_now(),
    };
    if let Some(image_url) = &input.image_url {
        set.insert("image_url", image_url.clone());
    }
    if let Some(available) = input.available {
        set.insert("available", available);
    }
    if let Some(rating) = input.rating {
        set.insert("rating", rating);
    }
    doc! { "$set": set }
}

pub async fn update_tour(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    input: web::Json<TourInput>,
) -> impl Responder {
    let tour_id = match parse_object_id(&path.into_inner(), "tour") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = input.into_inner();
    if let Err(err) = validate_tour_input(&input) {
        return bad_request(err.to_string());
    }

    let tours = collection::<Tour>(&data, &config, TOURS);
    match tours
        .find_one_and_update(doc! { "_id": tour_id }, update_document(&input))
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(tour)) => HttpResponse::Ok().json(TourView::from(tour)),
        Ok(None) => not_found("Tour"),
        Err(err) => store_error("update tour", err),
    }
}

pub async fn delete_tour(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> impl Responder {
    let tour_id = match parse_object_id(&path.into_inner(), "tour") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let tours = collection::<Tour>(&data, &config, TOURS);
    match tours.delete_one(doc! { "_id": tour_id }).await {
        Ok(result) if result.deleted_count == 0 => not_found("Tour"),
        Ok(_) => {
            info!("Deleted tour {}", tour_id);
            HttpResponse::NoContent().finish()
        }
        Err(err) => store_error("delete tour", err),
    }
}

/// Uploads the image first; the tour's `image_url` is only written once the upload succeeded.
pub async fn upload_tour_image(
    data: web::Data<Arc<Client>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    input: web::Json<ImageData>,
) -> impl Responder {
    let tour_id = match parse_object_id(&path.into_inner(), "tour") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let service = match ImageService::new(&config).await {
        Ok(service) => service,
        Err(err) => {
            error!("Image storage unavailable: {}", err);
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "Image storage is not configured");
        }
    };

    let tours = collection::<Tour>(&data, &config, TOURS);
    match tours.find_one(doc! { "_id": tour_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Tour"),
        Err(err) => return store_error("fetch tour", err),
    }

    let url = match service.upload_tour_image(&input, &tour_id.to_hex()).await {
        Ok(url) => url,
        Err(err @ ImageUploadError::GcsError(_)) => {
            error!("Tour image upload failed: {}", err);
            return error_response(StatusCode::BAD_GATEWAY, "Failed to upload image");
        }
        Err(err) => return bad_request(err.to_string()),
    };

    let update = doc! { "$set": { "image_url": url.clone(), "updated_at": timestamp_now() } };
    match tours
        .find_one_and_update(doc! { "_id": tour_id }, update)
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(tour)) => HttpResponse::Ok().json(TourView::from(tour)),
        Ok(None) => not_found("Tour"),
        Err(err) => store_error("save tour image", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tour::TourType;

    #[test]
    fn test_tour_filter_fields() {
        let query = TourQuery {
            tour_type: Some(TourType::Combo),
            available: Some(true),
            location: Some(" Da Lat ".to_string()),
            limit: None,
        };
        let filter = tour_filter(&query);
        assert_eq!(filter.get_str("type").unwrap(), "combo");
        assert!(filter.get_bool("available").unwrap());
        let location = filter.get_document("location").unwrap();
        assert_eq!(location.get_str("$regex").unwrap(), "Da Lat");
        assert_eq!(location.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_empty_query_has_empty_filter() {
        let query = TourQuery {
            tour_type: None,
            available: None,
            location: Some("  ".to_string()),
            limit: None,
        };
        assert!(tour_filter(&query).is_empty());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 200), 50);
        assert_eq!(clamp_limit(Some(0), 50, 200), 50);
        assert_eq!(clamp_limit(Some(10), 50, 200), 10);
        assert_eq!(clamp_limit(Some(1000), 50, 200), 200);
    }
}
