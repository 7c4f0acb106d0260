//! RAWG API response types

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformEntry {
    pub platform: Named,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub id: u64,
    pub name: String,
    pub slug: Option<String>,
    /// `YYYY-MM-DD`; RAWG sometimes sends partial or empty dates.
    pub released: Option<String>,
    pub background_image: Option<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub genres: Vec<Named>,
    /// Null for some unreleased titles.
    pub platforms: Option<Vec<PlatformEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub game: Game,
    pub description_raw: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub developers: Vec<Named>,
    #[serde(default)]
    pub publishers: Vec<Named>,
    pub metacritic: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub name: String,
    pub preview: Option<String>,
    #[serde(default)]
    pub data: MovieData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieData {
    #[serde(rename = "480")]
    pub low: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Screenshot {
    pub id: u64,
    pub image: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Library listing wrapped with the user it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct UserLibrary {
    pub user: String,
    pub library: ListResponse<Game>,
}
