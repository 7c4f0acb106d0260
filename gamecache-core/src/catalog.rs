//! Normalized catalog shapes stored as cache payloads.
//!
//! Provider adapters translate RAWG and IGDB responses into these types; the
//! cache itself only sees them as JSON.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entities::{Enriched, OverlayTarget};
use crate::enums::Provider;
use crate::identity::ResourceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub provider: Provider,
    pub id: u64,
    pub name: String,
    pub slug: Option<String>,
    pub released: Option<NaiveDate>,
    pub cover_url: Option<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl OverlayTarget for GameSummary {
    fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.provider, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetail {
    #[serde(flatten)]
    pub summary: GameSummary,
    pub description: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    pub metacritic: Option<u32>,
}

impl OverlayTarget for GameDetail {
    fn resource_id(&self) -> ResourceId {
        self.summary.resource_id()
    }
}

/// One page of games: search results, trending, or a series listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePage<T = GameSummary> {
    pub count: u64,
    pub page: u32,
    pub next_page: Option<u32>,
    pub results: Vec<T>,
}

impl<T> GamePage<T> {
    /// Replace the results, keeping paging metadata.
    pub fn with_results<U>(self, results: Vec<U>) -> GamePage<U> {
        GamePage {
            count: self.count,
            page: self.page,
            next_page: self.next_page,
            results,
        }
    }
}

/// A page whose results carry viewer overlay fields.
pub type EnrichedGamePage = GamePage<Enriched<GameSummary>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: u64,
    pub name: String,
    pub preview_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoList {
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub id: u64,
    pub image_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotList {
    pub results: Vec<Screenshot>,
}

/// Aggregate statistics over one user's game library.
///
/// `total_games` is the library size the provider reports. The breakdowns
/// and average cover the `sampled_games` actually retrieved, which is fewer
/// for very large libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub user: String,
    pub total_games: u64,
    pub sampled_games: u64,
    pub by_genre: BTreeMap<String, u64>,
    pub by_platform: BTreeMap<String, u64>,
    pub average_rating: Option<f32>,
}

impl ProfileStats {
    /// Aggregate a library listing of `games` out of `reported_total`.
    pub fn from_library(user: &str, reported_total: u64, games: &[GameSummary]) -> Self {
        let mut by_genre = BTreeMap::new();
        let mut by_platform = BTreeMap::new();
        let mut rating_sum = 0.0f32;
        let mut rated = 0u32;

        for game in games {
            for genre in &game.genres {
                *by_genre.entry(genre.clone()).or_insert(0) += 1;
            }
            for platform in &game.platforms {
                *by_platform.entry(platform.clone()).or_insert(0) += 1;
            }
            if let Some(rating) = game.rating.filter(|r| *r > 0.0) {
                rating_sum += rating;
                rated += 1;
            }
        }

        Self {
            user: user.to_string(),
            total_games: reported_total.max(games.len() as u64),
            sampled_games: games.len() as u64,
            by_genre,
            by_platform,
            average_rating: (rated > 0).then(|| rating_sum / rated as f32),
        }
    }
}
