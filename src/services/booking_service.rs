use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Client,
};
use std::collections::HashMap;

use crate::config::AppConfig;
use crate::db::mongo::{collection, BOOKINGS, TOURS};
use crate::models::booking::{Booking, BookingView};
use crate::models::tour::Tour;

/// Bookings matching `filter`, newest first, joined with their tour titles.
pub async fn find_booking_views(
    client: &Client,
    config: &AppConfig,
    filter: Document,
    limit: Option<i64>,
) -> Result<Vec<BookingView>, mongodb::error::Error> {
    let bookings = collection::<Booking>(client, config, BOOKINGS);

    let mut find = bookings.find(filter).sort(doc! { "created_at": -1 });
    if let Some(limit) = limit.filter(|l| *l > 0) {
        find = find.limit(limit);
    }
    let rows: Vec<Booking> = find.await?.try_collect().await?;

    attach_titles(client, config, rows).await
}

pub async fn attach_titles(
    client: &Client,
    config: &AppConfig,
    rows: Vec<Booking>,
) -> Result<Vec<BookingView>, mongodb::error::Error> {
    let mut tour_ids: Vec<ObjectId> = rows.iter().map(|b| b.tour_id).collect();
    tour_ids.sort();
    tour_ids.dedup();

    let titles: HashMap<ObjectId, String> = if tour_ids.is_empty() {
        HashMap::new()
    } else {
        let tours = collection::<Tour>(client, config, TOURS);
        let found: Vec<Tour> = tours
            .find(doc! { "_id": { "$in": tour_ids } })
            .await?
            .try_collect()
            .await?;
        found
            .into_iter()
            .filter_map(|t| t.id.map(|id| (id, t.title)))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|b| {
            let title = titles.get(&b.tour_id).cloned();
            BookingView::new(b, title)
        })
        .collect())
}
