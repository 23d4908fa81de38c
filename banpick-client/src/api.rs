// REST client for the backend lobby/draft endpoints.
//
// These are the request paths the room flow depends on, plus the PATCH
// fallbacks used when a realtime send fails. Errors are descriptive and
// surfaced immediately to the caller, which renders them as retry-capable
// failures.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::protocol::{
    CreateRoomResponse, GameSnapshot, JoinResponse, RoomSettings, StatusResponse,
    TeamAssignment,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("join response carried no user id")]
    MissingUserId,

    #[error("room {code} returned no settings")]
    MissingSettings { code: String },
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The underlying HTTP client, shared with the champion-metadata fetch.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// `GET /game/{code}`: the authoritative room snapshot. A snapshot
    /// without settings is malformed and rejected here.
    pub async fn game(&self, code: &str) -> Result<GameSnapshot, ApiError> {
        let url = self.url(&format!("/game/{code}"));
        let snapshot: GameSnapshot = self.get_json(&url).await?;
        if snapshot.settings.is_none() {
            return Err(ApiError::MissingSettings {
                code: code.to_string(),
            });
        }
        Ok(snapshot)
    }

    /// `GET /game/{code}/status`: current lobby membership.
    pub async fn status(&self, code: &str) -> Result<StatusResponse, ApiError> {
        let url = self.url(&format!("/game/{code}/status"));
        self.get_json(&url).await
    }

    /// `POST /game/{code}/join`: join the lobby and resolve the assigned
    /// user id. A response without one is fatal to the join.
    pub async fn join(&self, code: &str, nickname: &str) -> Result<String, ApiError> {
        let url = self.url(&format!("/game/{code}/join"));
        let body = serde_json::json!({ "nickname": nickname });
        let response: JoinResponse = self.post_json(&url, &body).await?;
        response.user_id().ok_or(ApiError::MissingUserId)
    }

    /// `PATCH /game/{code}/user/{id}/team`: seat-change fallback for when
    /// the realtime send fails.
    pub async fn update_team(
        &self,
        code: &str,
        user_id: &str,
        assignment: &TeamAssignment,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/game/{code}/user/{user_id}/team"));
        self.patch(&url, assignment).await
    }

    /// `PATCH /game/{code}/user/{id}/ready`: ready-toggle fallback.
    pub async fn update_ready(
        &self,
        code: &str,
        user_id: &str,
        is_ready: bool,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/game/{code}/user/{user_id}/ready"));
        let body = serde_json::json!({ "isReady": is_ready });
        self.patch(&url, &body).await
    }

    /// `POST /create-room`: create a room with the given settings and return
    /// its code.
    pub async fn create_room(&self, settings: &RoomSettings) -> Result<String, ApiError> {
        let url = self.url("/create-room");
        let response: CreateRoomResponse = self.post_json(&url, settings).await?;
        Ok(response.room_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn patch(&self, url: &str, body: &impl Serialize) -> Result<(), ApiError> {
        debug!(%url, "PATCH");
        let response = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        response.json().await.map_err(|source| ApiError::Http {
            url: url.to_string(),
            source,
        })
    }
}
