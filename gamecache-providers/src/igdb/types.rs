//! IGDB API response types

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub image_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvolvedCompany {
    pub company: Named,
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
}

/// A game record. IGDB omits fields that have no value, so everything but
/// the id is optional or defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub slug: Option<String>,
    /// Unix seconds.
    pub first_release_date: Option<i64>,
    pub cover: Option<ImageRef>,
    /// 0-100.
    pub total_rating: Option<f32>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub platforms: Vec<Named>,
    pub summary: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub involved_companies: Vec<InvolvedCompany>,
    /// Critic score, 0-100.
    pub aggregated_rating: Option<f32>,
    #[serde(default)]
    pub collections: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameVideo {
    pub id: u64,
    pub name: Option<String>,
    /// YouTube video id.
    pub video_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Screenshot {
    pub id: u64,
    pub image_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A page of results with the paging it was requested with. IGDB returns
/// bare arrays, so the adapter wraps them before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResults<T> {
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}
