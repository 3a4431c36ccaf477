//! Typed place service endpoints
//!
//! Thin wrappers over the request pipeline with statically typed decode
//! targets, one per call site the app uses. Everything here rides the
//! full pipeline: token attach, refresh-on-401, classification.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::Result;

/// A gazetteer entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A place saved to the caller's favorites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub place_id: i64,
}

/// Acknowledgement for a removed favorite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedFavorite {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteRequest {
    place_id: i64,
}

impl ApiClient {
    /// Search places by free-text query.
    pub async fn search_places(&self, query: &str, limit: u32) -> Result<Vec<Place>> {
        let limit = limit.to_string();
        self.get_json("/places", &[("query", query), ("limit", limit.as_str())])
            .await
    }

    /// Fetch a single place by id.
    pub async fn fetch_place(&self, id: i64) -> Result<Place> {
        self.get_json(&format!("/places/{id}"), &[]).await
    }

    /// Save a place to the caller's favorites.
    pub async fn add_favorite(&self, place_id: i64) -> Result<Favorite> {
        self.post_json(
            "/favorites",
            &[],
            &FavoriteRequest { place_id },
            HeaderMap::new(),
        )
        .await
    }

    /// Remove a favorite by its favorite id.
    pub async fn remove_favorite(&self, favorite_id: i64) -> Result<DeletedFavorite> {
        self.delete_json(&format!("/favorites/{favorite_id}"), &[])
            .await
    }
}
