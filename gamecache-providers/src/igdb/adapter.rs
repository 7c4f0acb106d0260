//! IGDB adapter: query construction and normalization.

use async_trait::async_trait;
use chrono::DateTime;
use gamecache_core::catalog;
use gamecache_core::{Provider, ProviderError, RequestParams, ResourceKind};
use gamecache_storage::ProviderAdapter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::client::IgdbClient;
use super::query::{Query, DETAIL_FIELDS, SUMMARY_FIELDS};
use super::types::{Game, GameVideo, PagedResults, Screenshot};
use crate::request::{page_request, required_str, required_u64, PageRequest};

const IMAGE_BASE: &str = "https://images.igdb.com/igdb/image/upload";

/// IGDB implementation of [`ProviderAdapter`].
#[derive(Debug)]
pub struct IgdbAdapter {
    client: IgdbClient,
}

impl IgdbAdapter {
    pub fn new(client: IgdbClient) -> Self {
        Self { client }
    }

    async fn games_page(&self, query: Query, page: PageRequest) -> Result<Value, ProviderError> {
        let results = self.client.query("games", query.page(page).build()).await?;
        Ok(paged(page, results))
    }

    /// Collections the game belongs to; empty when it has none.
    async fn collections_of(&self, id: u64) -> Result<Vec<u64>, ProviderError> {
        let raw = self
            .client
            .query(
                "games",
                Query::fields("collections").filter(format!("id = {}", id)).limit(1).build(),
            )
            .await?;
        let games: Vec<Game> = parse(raw)?;
        Ok(games.into_iter().next().map(|g| g.collections).unwrap_or_default())
    }
}

fn paged(page: PageRequest, results: Value) -> Value {
    json!({ "page": page.page, "pageSize": page.page_size, "results": results })
}

#[async_trait]
impl ProviderAdapter for IgdbAdapter {
    fn provider(&self) -> Provider {
        Provider::Igdb
    }

    async fn fetch_raw(&self, kind: ResourceKind, params: &RequestParams) -> Result<Value, ProviderError> {
        let provider = Provider::Igdb;
        match kind {
            ResourceKind::Detail => {
                let id = required_u64(provider, params, "id")?;
                let body = Query::fields(DETAIL_FIELDS).filter(format!("id = {}", id)).limit(1).build();
                self.client.query("games", body).await
            }
            ResourceKind::Search => {
                let text = required_str(provider, params, "q")?;
                let page = page_request(provider, params)?;
                self.games_page(Query::fields(SUMMARY_FIELDS).search(text), page).await
            }
            ResourceKind::Trending => {
                let page = page_request(provider, params)?;
                let query = Query::fields(SUMMARY_FIELDS)
                    .filter("hypes != null")
                    .sort("hypes desc");
                self.games_page(query, page).await
            }
            ResourceKind::Series => {
                let id = required_u64(provider, params, "id")?;
                let page = page_request(provider, params)?;
                let collections = self.collections_of(id).await?;
                if collections.is_empty() {
                    return Ok(paged(page, json!([])));
                }
                let ids: Vec<String> = collections.iter().map(u64::to_string).collect();
                let query = Query::fields(SUMMARY_FIELDS)
                    .filter(format!("collections = ({})", ids.join(",")))
                    .sort("first_release_date asc");
                self.games_page(query, page).await
            }
            ResourceKind::Videos => {
                let id = required_u64(provider, params, "id")?;
                let body = Query::fields("name,video_id")
                    .filter(format!("game = {}", id))
                    .limit(50)
                    .build();
                self.client.query("game_videos", body).await
            }
            ResourceKind::Screenshots => {
                let id = required_u64(provider, params, "id")?;
                let page = page_request(provider, params)?;
                let body = Query::fields("image_id,width,height")
                    .filter(format!("game = {}", id))
                    .page(page)
                    .build();
                self.client.query("screenshots", body).await
            }
            ResourceKind::ProfileStats => Err(ProviderError::UnsupportedResource { provider, kind }),
        }
    }

    fn normalize(&self, kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
        normalize(kind, raw)
    }
}

/// Translate a raw IGDB payload into its catalog shape.
pub fn normalize(kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
    match kind {
        ResourceKind::Detail => {
            let games: Vec<Game> = parse(raw)?;
            let game = games.into_iter().next().ok_or_else(|| ProviderError::RequestFailed {
                provider: Provider::Igdb,
                status: 404,
                message: "game not found".to_string(),
            })?;
            to_value(detail_of(game))
        }
        ResourceKind::Search | ResourceKind::Trending | ResourceKind::Series => {
            let paged: PagedResults<Game> = parse(raw)?;
            to_value(page_of(paged))
        }
        ResourceKind::Videos => {
            let videos: Vec<GameVideo> = parse(raw)?;
            to_value(catalog::VideoList {
                results: videos
                    .into_iter()
                    .map(|v| catalog::Video {
                        id: v.id,
                        name: v.name.unwrap_or_default(),
                        preview_url: Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", v.video_id)),
                        video_url: Some(format!("https://www.youtube.com/watch?v={}", v.video_id)),
                    })
                    .collect(),
            })
        }
        ResourceKind::Screenshots => {
            let shots: Vec<Screenshot> = parse(raw)?;
            to_value(catalog::ScreenshotList {
                results: shots
                    .into_iter()
                    .map(|s| catalog::Screenshot {
                        id: s.id,
                        image_url: image_url("t_screenshot_big", &s.image_id),
                        width: s.width,
                        height: s.height,
                    })
                    .collect(),
            })
        }
        ResourceKind::ProfileStats => Err(ProviderError::UnsupportedResource {
            provider: Provider::Igdb,
            kind,
        }),
    }
}

fn image_url(size: &str, image_id: &str) -> String {
    format!("{}/{}/{}.jpg", IMAGE_BASE, size, image_id)
}

fn summary_of(game: Game) -> catalog::GameSummary {
    catalog::GameSummary {
        provider: Provider::Igdb,
        id: game.id,
        name: game.name,
        slug: game.slug,
        released: game
            .first_release_date
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive()),
        cover_url: game.cover.map(|c| image_url("t_cover_big", &c.image_id)),
        // 0-100 onto the 0-5 scale RAWG uses.
        rating: game.total_rating.map(|r| r / 20.0),
        genres: game.genres.into_iter().map(|g| g.name).collect(),
        platforms: game.platforms.into_iter().map(|p| p.name).collect(),
    }
}

fn detail_of(mut game: Game) -> catalog::GameDetail {
    let companies = std::mem::take(&mut game.involved_companies);
    let description = game.summary.take();
    let website = game.url.take();
    let metacritic = game.aggregated_rating.map(|r| r.round() as u32);

    let developers = companies
        .iter()
        .filter(|c| c.developer)
        .map(|c| c.company.name.clone())
        .collect();
    let publishers = companies
        .iter()
        .filter(|c| c.publisher)
        .map(|c| c.company.name.clone())
        .collect();

    catalog::GameDetail {
        summary: summary_of(game),
        description,
        website,
        developers,
        publishers,
        metacritic,
    }
}

fn page_of(paged: PagedResults<Game>) -> catalog::GamePage {
    let returned = paged.results.len() as u64;
    let full = returned == u64::from(paged.page_size);
    let offset = u64::from(paged.page.saturating_sub(1)) * u64::from(paged.page_size);

    catalog::GamePage {
        // IGDB does not report totals; this is a lower bound.
        count: offset + returned,
        page: paged.page,
        next_page: full.then(|| paged.page + 1),
        results: paged.results.into_iter().map(summary_of).collect(),
    }
}

fn parse<T: DeserializeOwned>(raw: Value) -> Result<T, ProviderError> {
    serde_json::from_value(raw).map_err(|e| ProviderError::InvalidResponse {
        provider: Provider::Igdb,
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProviderError> {
    serde_json::to_value(value).map_err(|e| ProviderError::InvalidResponse {
        provider: Provider::Igdb,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn game_json(id: u64) -> Value {
        json!({
            "id": id,
            "name": "The Witcher 3: Wild Hunt",
            "slug": "the-witcher-3-wild-hunt",
            "first_release_date": 1431993600,
            "cover": {"id": 1, "image_id": "co1wyy"},
            "total_rating": 93.0,
            "genres": [{"id": 12, "name": "Role-playing (RPG)"}],
            "platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}]
        })
    }

    #[test]
    fn test_detail_normalization() {
        let mut raw = game_json(1942);
        raw["summary"] = json!("Geralt hunts monsters.");
        raw["aggregated_rating"] = json!(92.4);
        raw["involved_companies"] = json!([
            {"company": {"name": "CD Projekt RED"}, "developer": true, "publisher": false},
            {"company": {"name": "Bandai Namco"}, "developer": false, "publisher": true}
        ]);

        let detail: catalog::GameDetail =
            serde_json::from_value(normalize(ResourceKind::Detail, json!([raw])).expect("normalize"))
                .expect("detail");

        assert_eq!(detail.summary.provider, Provider::Igdb);
        assert_eq!(detail.summary.released, NaiveDate::from_ymd_opt(2015, 5, 19));
        assert_eq!(
            detail.summary.cover_url.as_deref(),
            Some("https://images.igdb.com/igdb/image/upload/t_cover_big/co1wyy.jpg")
        );
        assert_eq!(detail.summary.rating, Some(4.65));
        assert_eq!(detail.developers, vec!["CD Projekt RED".to_string()]);
        assert_eq!(detail.publishers, vec!["Bandai Namco".to_string()]);
        assert_eq!(detail.metacritic, Some(92));
    }

    #[test]
    fn test_missing_detail_is_not_found() {
        let err = normalize(ResourceKind::Detail, json!([])).unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed { status: 404, .. }));
    }

    #[test]
    fn test_full_page_has_next() {
        let raw = json!({"page": 2, "pageSize": 2, "results": [game_json(1), game_json(2)]});
        let page: catalog::GamePage =
            serde_json::from_value(normalize(ResourceKind::Search, raw).expect("normalize")).expect("page");
        assert_eq!(page.page, 2);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.count, 4);
    }

    #[test]
    fn test_short_page_is_last() {
        let raw = json!({"page": 1, "pageSize": 20, "results": [game_json(1)]});
        let page: catalog::GamePage =
            serde_json::from_value(normalize(ResourceKind::Trending, raw).expect("normalize")).expect("page");
        assert_eq!(page.next_page, None);
        assert_eq!(page.count, 1);
    }

    #[test]
    fn test_sparse_records() {
        let raw = json!({"page": 1, "pageSize": 20, "results": [{"id": 77}]});
        let page: catalog::GamePage =
            serde_json::from_value(normalize(ResourceKind::Series, raw).expect("normalize")).expect("page");
        assert_eq!(page.results[0].id, 77);
        assert!(page.results[0].genres.is_empty());
        assert_eq!(page.results[0].cover_url, None);
    }

    #[test]
    fn test_videos_link_youtube() {
        let raw = json!([{"id": 5, "name": "Trailer", "video_id": "c0i88t0Kacs"}]);
        let videos: catalog::VideoList =
            serde_json::from_value(normalize(ResourceKind::Videos, raw).expect("normalize")).expect("videos");
        assert_eq!(
            videos.results[0].video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=c0i88t0Kacs")
        );
    }

    #[test]
    fn test_screenshots() {
        let raw = json!([{"id": 3, "image_id": "sc6lsz", "width": 1920, "height": 1080}]);
        let shots: catalog::ScreenshotList =
            serde_json::from_value(normalize(ResourceKind::Screenshots, raw).expect("normalize")).expect("shots");
        assert_eq!(
            shots.results[0].image_url,
            "https://images.igdb.com/igdb/image/upload/t_screenshot_big/sc6lsz.jpg"
        );
    }

    #[test]
    fn test_profile_stats_unsupported() {
        assert!(matches!(
            normalize(ResourceKind::ProfileStats, json!([])),
            Err(ProviderError::UnsupportedResource { provider: Provider::Igdb, .. })
        ));
    }
}
