use crate::error::ApiError;
use crate::model::{
    Board, BoardId, BoardPatch, ExportRow, Floor, FloorId, FloorPatch, LoginResponse, NewBoard,
};

/// Remote board/floor operations.
///
/// Every method is one request. Implementations never retry and never
/// cache; callers decide when to re-list.
#[async_trait::async_trait]
pub trait BoardApi: Send + Sync + 'static {
    async fn list_boards(&self) -> Result<Vec<Board>, ApiError>;

    async fn list_floors(&self) -> Result<Vec<Floor>, ApiError>;

    /// Register one board. The server assigns id, uid and serial.
    async fn create_board(&self, input: &NewBoard) -> Result<Board, ApiError>;

    async fn update_board(&self, id: BoardId, patch: &BoardPatch) -> Result<Board, ApiError>;

    /// Delete a board. A missing id is `NotFound`, not success.
    async fn delete_board(&self, id: BoardId) -> Result<(), ApiError>;

    /// Attach an existing physical board to the calling user.
    async fn claim_board(&self, board_uid: &str, serial_number: &str)
        -> Result<Board, ApiError>;

    /// Tabular data for one user, for download.
    async fn export_user_data(&self, email: &str) -> Result<Vec<ExportRow>, ApiError>;

    async fn create_floor(&self, name: &str) -> Result<Floor, ApiError>;

    async fn update_floor(&self, id: FloorId, patch: &FloorPatch) -> Result<Floor, ApiError>;

    async fn delete_floor(&self, id: FloorId) -> Result<(), ApiError>;
}

/// Credential exchange. These calls are unauthenticated.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync + 'static {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Exchange a Google ID token for an API session.
    async fn login_google(&self, id_token: &str) -> Result<LoginResponse, ApiError>;
}
