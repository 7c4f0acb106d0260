//! RAWG adapter: endpoint selection and normalization.

use async_trait::async_trait;
use chrono::NaiveDate;
use gamecache_core::catalog;
use gamecache_core::{Provider, ProviderError, RequestParams, ResourceKind};
use gamecache_storage::ProviderAdapter;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::client::RawgClient;
use super::types::{Game, GameDetail, ListResponse, Movie, Screenshot, UserLibrary};
use crate::request::{page_request, required_str, required_u64};

/// Largest page RAWG serves; used when pulling a user's library.
const LIBRARY_PAGE_SIZE: u32 = 40;

/// Library pages pulled per profile-stats fetch. Larger libraries are
/// aggregated over the first `LIBRARY_PAGE_SIZE * MAX_LIBRARY_PAGES` games.
const MAX_LIBRARY_PAGES: u32 = 10;

/// RAWG implementation of [`ProviderAdapter`].
#[derive(Debug)]
pub struct RawgAdapter {
    client: RawgClient,
}

impl RawgAdapter {
    pub fn new(client: RawgClient) -> Self {
        Self { client }
    }

    /// Walk a user's library page by page, returning one merged listing
    /// whose `count` is what RAWG reports for the whole library.
    async fn fetch_library(&self, user: &str) -> Result<Value, ProviderError> {
        let mut count = 0u64;
        let mut results = Vec::new();

        for page in 1..=MAX_LIBRARY_PAGES {
            let raw = self
                .client
                .get(
                    &["users", user, "games"],
                    &[
                        ("page", page.to_string()),
                        ("page_size", LIBRARY_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let chunk: ListResponse<Value> = parse(raw)?;
            count = count.max(chunk.count);
            let last = chunk.next.is_none() || chunk.results.is_empty();
            results.extend(chunk.results);
            if last {
                break;
            }
        }

        if (results.len() as u64) < count {
            tracing::debug!(user, fetched = results.len(), count, "Library truncated for profile stats");
        }
        Ok(json!({ "count": count, "next": null, "previous": null, "results": results }))
    }
}

#[async_trait]
impl ProviderAdapter for RawgAdapter {
    fn provider(&self) -> Provider {
        Provider::Rawg
    }

    async fn fetch_raw(&self, kind: ResourceKind, params: &RequestParams) -> Result<Value, ProviderError> {
        let provider = Provider::Rawg;
        match kind {
            ResourceKind::Detail => {
                let id = required_u64(provider, params, "id")?;
                self.client.get(&["games", id.to_string().as_str()], &[]).await
            }
            ResourceKind::Search => {
                let query = required_str(provider, params, "q")?;
                let page = page_request(provider, params)?;
                self.client
                    .get(
                        &["games"],
                        &[
                            ("search", query.to_string()),
                            ("page", page.page.to_string()),
                            ("page_size", page.page_size.to_string()),
                        ],
                    )
                    .await
            }
            ResourceKind::Trending => {
                let page = page_request(provider, params)?;
                self.client
                    .get(
                        &["games", "lists", "main"],
                        &[
                            ("discover", "true".to_string()),
                            ("ordering", "-relevance".to_string()),
                            ("page", page.page.to_string()),
                            ("page_size", page.page_size.to_string()),
                        ],
                    )
                    .await
            }
            ResourceKind::Series => {
                let id = required_u64(provider, params, "id")?;
                let page = page_request(provider, params)?;
                self.client
                    .get(
                        &["games", id.to_string().as_str(), "game-series"],
                        &[
                            ("page", page.page.to_string()),
                            ("page_size", page.page_size.to_string()),
                        ],
                    )
                    .await
            }
            ResourceKind::Videos => {
                let id = required_u64(provider, params, "id")?;
                self.client.get(&["games", id.to_string().as_str(), "movies"], &[]).await
            }
            ResourceKind::Screenshots => {
                let id = required_u64(provider, params, "id")?;
                let page = page_request(provider, params)?;
                self.client
                    .get(
                        &["games", id.to_string().as_str(), "screenshots"],
                        &[
                            ("page", page.page.to_string()),
                            ("page_size", page.page_size.to_string()),
                        ],
                    )
                    .await
            }
            ResourceKind::ProfileStats => {
                let user = required_str(provider, params, "user")?;
                let library = self.fetch_library(user).await?;
                Ok(json!({ "user": user, "library": library }))
            }
        }
    }

    fn normalize(&self, kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
        normalize(kind, raw)
    }
}

/// Translate a raw RAWG payload into its catalog shape.
pub fn normalize(kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
    match kind {
        ResourceKind::Detail => {
            let detail: GameDetail = parse(raw)?;
            to_value(detail_of(detail))
        }
        ResourceKind::Search | ResourceKind::Trending | ResourceKind::Series => {
            let list: ListResponse<Game> = parse(raw)?;
            to_value(page_of(list))
        }
        ResourceKind::Videos => {
            let list: ListResponse<Movie> = parse(raw)?;
            to_value(catalog::VideoList {
                results: list
                    .results
                    .into_iter()
                    .map(|m| catalog::Video {
                        id: m.id,
                        name: m.name,
                        preview_url: m.preview,
                        video_url: m.data.max.or(m.data.low),
                    })
                    .collect(),
            })
        }
        ResourceKind::Screenshots => {
            let list: ListResponse<Screenshot> = parse(raw)?;
            to_value(catalog::ScreenshotList {
                results: list
                    .results
                    .into_iter()
                    .map(|s| catalog::Screenshot {
                        id: s.id,
                        image_url: s.image,
                        width: s.width,
                        height: s.height,
                    })
                    .collect(),
            })
        }
        ResourceKind::ProfileStats => {
            let library: UserLibrary = parse(raw)?;
            let count = library.library.count;
            let games: Vec<catalog::GameSummary> = library.library.results.into_iter().map(summary_of).collect();
            to_value(catalog::ProfileStats::from_library(&library.user, count, &games))
        }
    }
}

fn summary_of(game: Game) -> catalog::GameSummary {
    catalog::GameSummary {
        provider: Provider::Rawg,
        id: game.id,
        name: game.name,
        slug: game.slug,
        released: game
            .released
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        cover_url: game.background_image,
        rating: game.rating,
        genres: game.genres.into_iter().map(|g| g.name).collect(),
        platforms: game
            .platforms
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.platform.name)
            .collect(),
    }
}

fn detail_of(detail: GameDetail) -> catalog::GameDetail {
    catalog::GameDetail {
        summary: summary_of(detail.game),
        description: detail.description_raw.filter(|d| !d.trim().is_empty()),
        website: detail.website.filter(|w| !w.trim().is_empty()),
        developers: detail.developers.into_iter().map(|d| d.name).collect(),
        publishers: detail.publishers.into_iter().map(|p| p.name).collect(),
        metacritic: detail.metacritic,
    }
}

fn page_of(list: ListResponse<Game>) -> catalog::GamePage {
    let next_page = list.next.as_deref().and_then(page_param);
    let page = match (next_page, list.previous.as_deref()) {
        (Some(next), _) => next.saturating_sub(1).max(1),
        // The first page's URL carries no page parameter.
        (None, Some(previous)) => page_param(previous).map(|p| p + 1).unwrap_or(2),
        (None, None) => 1,
    };

    catalog::GamePage {
        count: list.count,
        page,
        next_page,
        results: list.results.into_iter().map(summary_of).collect(),
    }
}

fn page_param(url: &str) -> Option<u32> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(name, _)| name == "page")
        .and_then(|(_, value)| value.parse().ok())
}

fn parse<T: DeserializeOwned>(raw: Value) -> Result<T, ProviderError> {
    serde_json::from_value(raw).map_err(|e| ProviderError::InvalidResponse {
        provider: Provider::Rawg,
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProviderError> {
    serde_json::to_value(value).map_err(|e| ProviderError::InvalidResponse {
        provider: Provider::Rawg,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_json(id: u64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "slug": name.to_lowercase().replace(' ', "-"),
            "released": "2011-04-18",
            "background_image": format!("https://media.rawg.io/{}.jpg", id),
            "rating": 4.6,
            "genres": [{"id": 4, "name": "Puzzle"}],
            "platforms": [{"platform": {"id": 4, "name": "PC"}}]
        })
    }

    #[test]
    fn test_detail_normalization() {
        let mut raw = game_json(4200, "Portal 2");
        raw["description_raw"] = json!("Sequel to Portal.");
        raw["website"] = json!("");
        raw["developers"] = json!([{"name": "Valve Software"}]);
        raw["publishers"] = json!([{"name": "Valve"}]);
        raw["metacritic"] = json!(95);

        let value = normalize(ResourceKind::Detail, raw).expect("normalize");
        let detail: catalog::GameDetail = serde_json::from_value(value).expect("detail shape");

        assert_eq!(detail.summary.id, 4200);
        assert_eq!(detail.summary.provider, Provider::Rawg);
        assert_eq!(detail.summary.released, NaiveDate::from_ymd_opt(2011, 4, 18));
        assert_eq!(detail.summary.platforms, vec!["PC".to_string()]);
        assert_eq!(detail.description.as_deref(), Some("Sequel to Portal."));
        assert_eq!(detail.website, None);
        assert_eq!(detail.developers, vec!["Valve Software".to_string()]);
        assert_eq!(detail.metacritic, Some(95));
    }

    #[test]
    fn test_list_paging_from_urls() {
        let raw = json!({
            "count": 812,
            "next": "https://api.rawg.io/api/games?key=k&page=3&search=portal",
            "previous": "https://api.rawg.io/api/games?key=k&search=portal",
            "results": [game_json(1, "Portal"), game_json(2, "Portal 2")]
        });
        let page: catalog::GamePage =
            serde_json::from_value(normalize(ResourceKind::Search, raw).expect("normalize")).expect("page");
        assert_eq!(page.count, 812);
        assert_eq!(page.page, 2);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.results.len(), 2);
    }

    #[test]
    fn test_last_page() {
        let raw = json!({
            "count": 41,
            "next": null,
            "previous": "https://api.rawg.io/api/games/lists/main?page=2",
            "results": [game_json(9, "Hades")]
        });
        let page: catalog::GamePage =
            serde_json::from_value(normalize(ResourceKind::Trending, raw).expect("normalize")).expect("page");
        assert_eq!(page.page, 3);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_tolerates_bad_dates_and_null_platforms() {
        let mut raw = game_json(5, "Unreleased");
        raw["released"] = json!("TBA");
        raw["platforms"] = Value::Null;
        let page: catalog::GamePage = serde_json::from_value(
            normalize(ResourceKind::Series, json!({"count": 1, "next": null, "previous": null, "results": [raw]}))
                .expect("normalize"),
        )
        .expect("page");
        assert_eq!(page.page, 1);
        assert_eq!(page.results[0].released, None);
        assert!(page.results[0].platforms.is_empty());
    }

    #[test]
    fn test_videos_prefer_max_quality() {
        let raw = json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 16,
                "name": "Launch trailer",
                "preview": "https://media.rawg.io/preview.jpg",
                "data": {"480": "https://steam/480.mp4", "max": "https://steam/max.mp4"}
            }]
        });
        let videos: catalog::VideoList =
            serde_json::from_value(normalize(ResourceKind::Videos, raw).expect("normalize")).expect("videos");
        assert_eq!(videos.results[0].video_url.as_deref(), Some("https://steam/max.mp4"));
    }

    #[test]
    fn test_screenshots() {
        let raw = json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 7, "image": "https://media.rawg.io/s.jpg", "width": 1920, "height": 1080}]
        });
        let shots: catalog::ScreenshotList =
            serde_json::from_value(normalize(ResourceKind::Screenshots, raw).expect("normalize")).expect("shots");
        assert_eq!(shots.results[0].width, Some(1920));
    }

    #[test]
    fn test_profile_stats_aggregate_library() {
        let raw = json!({
            "user": "ada",
            "library": {
                "count": 2,
                "next": null,
                "previous": null,
                "results": [game_json(1, "Portal"), game_json(2, "Portal 2")]
            }
        });
        let stats: catalog::ProfileStats =
            serde_json::from_value(normalize(ResourceKind::ProfileStats, raw).expect("normalize")).expect("stats");
        assert_eq!(stats.user, "ada");
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.sampled_games, 2);
        assert_eq!(stats.by_genre.get("Puzzle"), Some(&2));
    }

    #[test]
    fn test_profile_stats_total_comes_from_library_count() {
        let raw = json!({
            "user": "ada",
            "library": {
                "count": 300,
                "next": null,
                "previous": null,
                "results": [game_json(1, "Portal"), game_json(2, "Portal 2")]
            }
        });
        let stats: catalog::ProfileStats =
            serde_json::from_value(normalize(ResourceKind::ProfileStats, raw).expect("normalize")).expect("stats");
        assert_eq!(stats.total_games, 300);
        assert_eq!(stats.sampled_games, 2);
        assert_eq!(stats.by_platform.get("PC"), Some(&2));
    }

    #[test]
    fn test_malformed_payload_is_invalid_response() {
        let err = normalize(ResourceKind::Detail, json!({"name": "no id"})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { provider: Provider::Rawg, .. }));
    }
}
