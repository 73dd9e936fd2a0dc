//! HTTP client for the durable store
//!
//! The persistence service owns users, ratings, and race history; this
//! client implements the `RatingStore` port against its internal HTTP
//! API. Transport faults and 5xx responses map to retryable errors,
//! 4xx responses to permanent rejections.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use types::errors::StoreError;
use types::history::RaceHistoryRecord;
use types::ids::PlayerId;
use types::ports::{MatchRecord, RatingStore};
use types::rating::Rating;

pub struct HttpRatingStore {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RatingResponse {
    rating: Option<Rating>,
}

impl HttpRatingStore {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }

    fn classify(res: &reqwest::Response) -> Result<(), StoreError> {
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else if status.is_server_error() {
            Err(StoreError::Unavailable {
                message: format!("store returned {status}"),
            })
        } else {
            Err(StoreError::Rejected {
                message: format!("store returned {status}"),
            })
        }
    }

    fn transport(e: reqwest::Error) -> StoreError {
        StoreError::Unavailable {
            message: format!("store unreachable: {e}"),
        }
    }
}

#[async_trait]
impl RatingStore for HttpRatingStore {
    async fn get_rating(&self, player: PlayerId) -> Result<Option<Rating>, StoreError> {
        let res = self
            .http_client
            .get(format!("{}/internal/players/{}/rating", self.base_url, player))
            .send()
            .await
            .map_err(Self::transport)?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::classify(&res)?;
        let body: RatingResponse = res.json().await.map_err(Self::transport)?;
        Ok(body.rating)
    }

    async fn apply_rating_delta(&self, player: PlayerId, delta: i32) -> Result<(), StoreError> {
        let res = self
            .http_client
            .post(format!("{}/internal/players/{}/rating-delta", self.base_url, player))
            .json(&serde_json::json!({ "delta": delta }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::classify(&res)
    }

    async fn append_race_history(&self, record: &RaceHistoryRecord) -> Result<(), StoreError> {
        let res = self
            .http_client
            .post(format!("{}/internal/race-history", self.base_url))
            .json(record)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::classify(&res)
    }

    async fn create_match_record(&self, record: &MatchRecord) -> Result<(), StoreError> {
        let res = self
            .http_client
            .post(format!("{}/internal/matches", self.base_url))
            .json(record)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::classify(&res)
    }
}
