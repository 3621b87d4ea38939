//! WattSense board/floor data client.
//!
//! Wraps the remote REST API behind the [`BoardApi`] and [`AuthApi`] traits.
//! Authentication is pluggable through [`TokenSource`]; protected calls fail
//! with [`ApiError::Auth`] before any request is sent when no credential is
//! available.
//!
//! # Usage
//!
//! ```ignore
//! use wattsense_client::{BoardApi, HttpBoardApi, StaticToken};
//!
//! let api = HttpBoardApi::new("https://api.wattsense.in", Arc::new(StaticToken::new(jwt)));
//! let boards = api.list_boards().await?;
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod model;
pub mod token;

pub use api::{AuthApi, BoardApi};
pub use error::{error_code, ApiError, Surface};
pub use http::HttpBoardApi;
pub use memory::{MemoryBackend, Op};
pub use model::{
    Board, BoardId, BoardPatch, ExportRow, Floor, FloorId, FloorPatch, LoginResponse, NewBoard,
    Role, SessionUser,
};
pub use token::{NoAuth, StaticToken, TokenSource};
