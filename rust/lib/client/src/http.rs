//! reqwest implementation of [`BoardApi`] and [`AuthApi`].

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::api::{AuthApi, BoardApi};
use crate::error::ApiError;
use crate::model::{
    Board, BoardId, BoardPatch, ExportRow, Floor, FloorId, FloorPatch, LoginResponse, NewBoard,
};
use crate::token::TokenSource;

// ── Response envelopes ──────────────────────────────────────────────
//
// Some endpoints answer with the bare record, others wrap it as
// `{"board": ...}` next to a status message. Both decode to the record.

#[derive(Deserialize)]
#[serde(untagged)]
enum BoardBody {
    Wrapped { board: Board },
    Bare(Board),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FloorBody {
    Wrapped { floor: Floor },
    Bare(Floor),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Items { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Items { items } => items,
            ListBody::Bare(items) => items,
        }
    }
}

fn checked_board(body: BoardBody) -> Result<Board, ApiError> {
    let board = match body {
        BoardBody::Wrapped { board } => board,
        BoardBody::Bare(board) => board,
    };
    board.validate().map_err(ApiError::Decode)?;
    Ok(board)
}

fn checked_floor(body: FloorBody) -> Result<Floor, ApiError> {
    let floor = match body {
        FloorBody::Wrapped { floor } => floor,
        FloorBody::Bare(floor) => floor,
    };
    floor.validate().map_err(ApiError::Decode)?;
    Ok(floor)
}

// ── HttpBoardApi ────────────────────────────────────────────────────

/// Board/floor client for the WattSense REST API.
///
/// Routes live under `{base_url}/api`. Every board and floor route is
/// protected and carries `Authorization: Bearer <token>`.
pub struct HttpBoardApi {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpBoardApi {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    /// Same as [`HttpBoardApi::new`] with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Attach the bearer token, or fail before anything is sent.
    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Err(ApiError::Auth("no credential held; log in first".into())),
        }
    }

    /// Send and map non-2xx statuses to `ApiError`.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!("request failed with {}: {}", status, body);
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(resp)
    }

    async fn decode<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    async fn protected<R: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<R, ApiError> {
        let builder = self.authed(builder).await?;
        let resp = self.send(builder).await?;
        Self::decode(resp).await
    }

    async fn protected_unit(&self, builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let builder = self.authed(builder).await?;
        self.send(builder).await?;
        Ok(())
    }

    async fn login_with(&self, path: &str, body: serde_json::Value) -> Result<LoginResponse, ApiError> {
        let resp = self.send(self.http.post(self.url(path)).json(&body)).await?;
        let login: LoginResponse = Self::decode(resp).await?;
        if login.token.is_empty() {
            return Err(ApiError::Decode("login response carries an empty token".into()));
        }
        Ok(login)
    }
}

#[async_trait::async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        debug!("GET /api/boards");
        let body: ListBody<Board> = self.protected(self.http.get(self.url("/boards"))).await?;
        let boards = body.into_vec();
        for board in &boards {
            board.validate().map_err(ApiError::Decode)?;
        }
        Ok(boards)
    }

    async fn list_floors(&self) -> Result<Vec<Floor>, ApiError> {
        debug!("GET /api/floors");
        let body: ListBody<Floor> = self.protected(self.http.get(self.url("/floors"))).await?;
        let floors = body.into_vec();
        for floor in &floors {
            floor.validate().map_err(ApiError::Decode)?;
        }
        Ok(floors)
    }

    async fn create_board(&self, input: &NewBoard) -> Result<Board, ApiError> {
        debug!("POST /api/boards/register");
        let req = self.http.post(self.url("/boards/register")).json(input);
        checked_board(self.protected(req).await?)
    }

    async fn update_board(&self, id: BoardId, patch: &BoardPatch) -> Result<Board, ApiError> {
        debug!("PATCH /api/boards/{}", id);
        let req = self.http.patch(self.url(&format!("/boards/{}", id))).json(patch);
        checked_board(self.protected(req).await?)
    }

    async fn delete_board(&self, id: BoardId) -> Result<(), ApiError> {
        debug!("DELETE /api/boards/{}", id);
        self.protected_unit(self.http.delete(self.url(&format!("/boards/{}", id))))
            .await
    }

    async fn claim_board(&self, board_uid: &str, serial_number: &str) -> Result<Board, ApiError> {
        debug!("POST /api/boards/claim");
        let req = self.http.post(self.url("/boards/claim")).json(&serde_json::json!({
            "board_uid": board_uid,
            "serial_number": serial_number,
        }));
        checked_board(self.protected(req).await?)
    }

    async fn export_user_data(&self, email: &str) -> Result<Vec<ExportRow>, ApiError> {
        let mut url = reqwest::Url::parse(&self.url("/boards/export/user-data"))
            .map_err(|e| ApiError::Network(format!("bad base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network("base url cannot carry a path".into()))?
            .push(email);
        debug!("GET {}", url.path());
        self.protected(self.http.get(url)).await
    }

    async fn create_floor(&self, name: &str) -> Result<Floor, ApiError> {
        debug!("POST /api/floors");
        let req = self
            .http
            .post(self.url("/floors"))
            .json(&serde_json::json!({ "name": name }));
        checked_floor(self.protected(req).await?)
    }

    async fn update_floor(&self, id: FloorId, patch: &FloorPatch) -> Result<Floor, ApiError> {
        debug!("PATCH /api/floors/{}", id);
        let req = self.http.patch(self.url(&format!("/floors/{}", id))).json(patch);
        checked_floor(self.protected(req).await?)
    }

    async fn delete_floor(&self, id: FloorId) -> Result<(), ApiError> {
        debug!("DELETE /api/floors/{}", id);
        self.protected_unit(self.http.delete(self.url(&format!("/floors/{}", id))))
            .await
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpBoardApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!("POST /api/auth/login");
        self.login_with(
            "/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn login_google(&self, id_token: &str) -> Result<LoginResponse, ApiError> {
        debug!("POST /api/auth/google");
        self.login_with("/auth/google", serde_json::json!({ "token": id_token }))
            .await
    }
}
