//! Court domain entity

use chrono::{DateTime, Utc};

/// A bookable court. Read-only for the booking core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Court {
    pub id: i32,
    pub name: String,
    pub sport: String,
    pub indoor: bool,
    pub surface: String,
    pub images: Vec<CourtImage>,
    pub created_at: DateTime<Utc>,
}

/// Display-only picture of a court
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourtImage {
    pub id: i32,
    pub url: String,
}

/// Court to be created by catalog seeding
#[derive(Debug, Clone)]
pub struct NewCourt {
    pub name: String,
    pub sport: String,
    pub indoor: bool,
    pub surface: String,
    pub image_urls: Vec<String>,
}
