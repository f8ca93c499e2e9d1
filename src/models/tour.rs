use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TourType {
    Regular,
    Combo,
}

impl TourType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourType::Regular => "regular",
            TourType::Combo => "combo",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tour {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub tour_type: TourType,
    pub image_url: Option<String>,
    pub max_capacity: u32,
    pub available: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of tour create/update requests. Price and capacity are checked by
/// `validation::validate_tour_input` before any write.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TourInput {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub tour_type: TourType,
    pub image_url: Option<String>,
    pub max_capacity: u32,
    pub available: Option<bool>,
    pub rating: Option<f64>,
}

impl TourInput {
    pub fn into_tour(self) -> Tour {
        let now = Utc::now();
        Tour {
            id: None,
            title: self.title.trim().to_string(),
            description: self.description,
            price: self.price,
            duration: self.duration,
            location: self.location.trim().to_string(),
            tour_type: self.tour_type,
            image_url: self.image_url,
            max_capacity: self.max_capacity,
            available: self.available.unwrap_or(true),
            rating: self.rating.unwrap_or(0.0),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TourQuery {
    #[serde(rename = "type")]
    pub tour_type: Option<TourType>,
    pub available: Option<bool>,
    pub location: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TourView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub tour_type: TourType,
    pub image_url: Option<String>,
    pub max_capacity: u32,
    pub available: bool,
    pub rating: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Tour> for TourView {
    fn from(tour: Tour) -> Self {
        Self {
            id: tour.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: tour.title,
            description: tour.description,
            price: tour.price,
            duration: tour.duration,
            location: tour.location,
            tour_type: tour.tour_type,
            image_url: tour.image_url,
            max_capacity: tour.max_capacity,
            available: tour.available,
            rating: tour.rating,
            created_at: tour.created_at,
        }
    }
}
