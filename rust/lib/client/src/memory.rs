//! In-memory backend with failure injection.
//!
//! Behaves like the remote API (server-assigned ids, uid and serial,
//! `NotFound` on unknown ids, `Validation` on bad input) so store logic can
//! be exercised without a network. Failures and latency can be queued per
//! operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::api::{AuthApi, BoardApi};
use crate::error::ApiError;
use crate::model::{
    Board, BoardId, BoardPatch, ExportRow, Floor, FloorId, FloorPatch, LoginResponse, NewBoard,
    Role, SessionUser,
};

/// Operation selector for injected failures and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListBoards,
    ListFloors,
    CreateBoard,
    UpdateBoard,
    DeleteBoard,
    ClaimBoard,
    Export,
    CreateFloor,
    UpdateFloor,
    DeleteFloor,
    Login,
}

#[derive(Default)]
struct State {
    boards: Vec<Board>,
    floors: Vec<Floor>,
    next_board_id: i64,
    next_floor_id: i64,
    /// email -> (password, role)
    accounts: HashMap<String, (String, Role)>,
    /// Identity the "server" attributes claims to; set by a successful login.
    acting_user: Option<SessionUser>,
    /// `None` entries let a call through.
    failures: HashMap<Op, VecDeque<Option<ApiError>>>,
    delays: HashMap<Op, VecDeque<Duration>>,
    calls: HashMap<Op, usize>,
}

impl State {
    /// Count the call and pop the next injected failure and delay.
    fn enter(&mut self, op: Op) -> (Option<ApiError>, Option<Duration>) {
        *self.calls.entry(op).or_default() += 1;
        let failure = self
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .flatten();
        let delay = self.delays.get_mut(&op).and_then(VecDeque::pop_front);
        (failure, delay)
    }

    fn floor_exists(&self, id: FloorId) -> bool {
        self.floors.iter().any(|f| f.id == id)
    }
}

/// Board/floor "server" living in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

fn generate_board_uid() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("BRD-{}", raw[..8].to_uppercase())
}

fn generate_serial() -> String {
    rand::thread_rng()
        .gen_range(100_000_000u32..1_000_000_000)
        .to_string()
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if !email.is_empty() && !email.contains('@') {
        return Err(ApiError::invalid_field("email", "invalid email"));
    }
    Ok(())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding and inspection ──

    pub fn add_account(&self, email: &str, password: &str, role: Role) {
        let mut st = self.state.lock().unwrap();
        st.accounts
            .insert(email.to_string(), (password.to_string(), role));
    }

    /// Insert a floor directly, bypassing failure injection.
    pub fn seed_floor(&self, name: &str) -> Floor {
        let mut st = self.state.lock().unwrap();
        st.next_floor_id += 1;
        let floor = Floor {
            id: FloorId(st.next_floor_id),
            name: name.to_string(),
            remarks: None,
        };
        st.floors.push(floor.clone());
        floor
    }

    /// Insert a board directly, bypassing failure injection.
    pub fn seed_board(&self, email: Option<&str>, floor_id: Option<FloorId>, enabled: bool) -> Board {
        let mut st = self.state.lock().unwrap();
        st.next_board_id += 1;
        let board = Board {
            id: BoardId(st.next_board_id),
            board_uid: generate_board_uid(),
            serial_number: generate_serial(),
            email: email.map(str::to_string),
            enabled,
            floor_id,
        };
        st.boards.push(board.clone());
        board
    }

    pub fn boards(&self) -> Vec<Board> {
        self.state.lock().unwrap().boards.clone()
    }

    pub fn floors(&self) -> Vec<Floor> {
        self.state.lock().unwrap().floors.clone()
    }

    /// Number of times `op` was called, including injected failures.
    pub fn calls(&self, op: Op) -> usize {
        self.state.lock().unwrap().calls.get(&op).copied().unwrap_or(0)
    }

    // ── Injection ──

    /// Make the next call of `op` fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, op: Op, err: ApiError) {
        let mut st = self.state.lock().unwrap();
        st.failures.entry(op).or_default().push_back(Some(err));
    }

    /// Let the next `n` calls of `op` through before any failure queued
    /// after this.
    pub fn pass_next(&self, op: Op, n: usize) {
        let mut st = self.state.lock().unwrap();
        let queue = st.failures.entry(op).or_default();
        queue.extend(std::iter::repeat(None).take(n));
    }

    /// Delay the response of the next call of `op`. The response content is
    /// taken when the call starts, before the delay.
    pub fn delay_next(&self, op: Op, delay: Duration) {
        let mut st = self.state.lock().unwrap();
        st.delays.entry(op).or_default().push_back(delay);
    }

    /// Run `f` against the state unless a failure is queued for `op`, then
    /// apply any queued delay.
    async fn call<R>(
        &self,
        op: Op,
        f: impl FnOnce(&mut State) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let (result, delay) = {
            let mut st = self.state.lock().unwrap();
            let (failure, delay) = st.enter(op);
            let result = match failure {
                Some(err) => Err(err),
                None => f(&mut st),
            };
            (result, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        debug!("memory backend {:?}: ok={}", op, result.is_ok());
        result
    }
}

#[async_trait::async_trait]
impl BoardApi for MemoryBackend {
    async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        self.call(Op::ListBoards, |st| Ok(st.boards.clone())).await
    }

    async fn list_floors(&self) -> Result<Vec<Floor>, ApiError> {
        self.call(Op::ListFloors, |st| Ok(st.floors.clone())).await
    }

    async fn create_board(&self, input: &NewBoard) -> Result<Board, ApiError> {
        self.call(Op::CreateBoard, |st| {
            check_email(&input.email)?;
            if let Some(floor_id) = input.floor_id {
                if !st.floor_exists(floor_id) {
                    return Err(ApiError::invalid_field("floor_id", "unknown floor"));
                }
            }
            st.next_board_id += 1;
            let board = Board {
                id: BoardId(st.next_board_id),
                board_uid: generate_board_uid(),
                serial_number: generate_serial(),
                email: Some(input.email.clone()).filter(|e| !e.is_empty()),
                enabled: true,
                floor_id: input.floor_id,
            };
            st.boards.push(board.clone());
            Ok(board)
        })
        .await
    }

    async fn update_board(&self, id: BoardId, patch: &BoardPatch) -> Result<Board, ApiError> {
        self.call(Op::UpdateBoard, |st| {
            if let Some(Some(ref email)) = patch.email {
                check_email(email)?;
            }
            if let Some(Some(floor_id)) = patch.floor_id {
                if !st.floor_exists(floor_id) {
                    return Err(ApiError::invalid_field("floor_id", "unknown floor"));
                }
            }
            let board = st
                .boards
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("board {} not found", id)))?;
            patch.apply(board);
            Ok(board.clone())
        })
        .await
    }

    async fn delete_board(&self, id: BoardId) -> Result<(), ApiError> {
        self.call(Op::DeleteBoard, |st| {
            let before = st.boards.len();
            st.boards.retain(|b| b.id != id);
            if st.boards.len() == before {
                return Err(ApiError::NotFound(format!("board {} not found", id)));
            }
            Ok(())
        })
        .await
    }

    async fn claim_board(&self, board_uid: &str, serial_number: &str) -> Result<Board, ApiError> {
        self.call(Op::ClaimBoard, |st| {
            let user = st
                .acting_user
                .clone()
                .ok_or_else(|| ApiError::Auth("not logged in".into()))?;
            let board = st
                .boards
                .iter_mut()
                .find(|b| b.board_uid == board_uid && b.serial_number == serial_number)
                .ok_or_else(|| ApiError::NotFound("no board with that uid and serial".into()))?;
            match board.email() {
                Some(owner) if owner != user.email => {
                    return Err(ApiError::Validation {
                        field: None,
                        message: "board already claimed".into(),
                    });
                }
                _ => {}
            }
            board.email = Some(user.email);
            Ok(board.clone())
        })
        .await
    }

    async fn export_user_data(&self, email: &str) -> Result<Vec<ExportRow>, ApiError> {
        self.call(Op::Export, |st| {
            let rows = st
                .boards
                .iter()
                .filter(|b| b.email() == Some(email))
                .map(|b| {
                    let floor = b
                        .floor_id
                        .and_then(|id| st.floors.iter().find(|f| f.id == id))
                        .map(|f| f.name.clone());
                    let mut row = ExportRow::new();
                    row.insert("board_uid".into(), b.board_uid.clone().into());
                    row.insert("serial_number".into(), b.serial_number.clone().into());
                    row.insert("floor".into(), floor.into());
                    row.insert("enabled".into(), b.enabled.into());
                    row
                })
                .collect();
            Ok(rows)
        })
        .await
    }

    async fn create_floor(&self, name: &str) -> Result<Floor, ApiError> {
        self.call(Op::CreateFloor, |st| {
            if name.trim().is_empty() {
                return Err(ApiError::invalid_field("name", "floor name is required"));
            }
            st.next_floor_id += 1;
            let floor = Floor {
                id: FloorId(st.next_floor_id),
                name: name.to_string(),
                remarks: None,
            };
            st.floors.push(floor.clone());
            Ok(floor)
        })
        .await
    }

    async fn update_floor(&self, id: FloorId, patch: &FloorPatch) -> Result<Floor, ApiError> {
        self.call(Op::UpdateFloor, |st| {
            if let Some(ref name) = patch.name {
                if name.trim().is_empty() {
                    return Err(ApiError::invalid_field("name", "floor name is required"));
                }
            }
            let floor = st
                .floors
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("floor {} not found", id)))?;
            patch.apply(floor);
            Ok(floor.clone())
        })
        .await
    }

    /// Boards on the floor keep their `floor_id`.
    async fn delete_floor(&self, id: FloorId) -> Result<(), ApiError> {
        self.call(Op::DeleteFloor, |st| {
            let before = st.floors.len();
            st.floors.retain(|f| f.id != id);
            if st.floors.len() == before {
                return Err(ApiError::NotFound(format!("floor {} not found", id)));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait::async_trait]
impl AuthApi for MemoryBackend {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.call(Op::Login, |st| {
            let role = match st.accounts.get(email) {
                Some((expected, role)) if expected == password => *role,
                _ => return Err(ApiError::Auth("Invalid credentials".into())),
            };
            let user = SessionUser {
                email: email.to_string(),
                role,
            };
            st.acting_user = Some(user.clone());
            Ok(LoginResponse {
                token: format!("mem-{}", uuid::Uuid::new_v4().simple()),
                user,
            })
        })
        .await
    }

    /// Google accounts are keyed by the ID token itself.
    async fn login_google(&self, id_token: &str) -> Result<LoginResponse, ApiError> {
        self.call(Op::Login, |st| {
            let role = match st.accounts.get(id_token) {
                Some((_, role)) => *role,
                None => return Err(ApiError::Auth("unknown Google account".into())),
            };
            let user = SessionUser {
                email: id_token.to_string(),
                role,
            };
            st.acting_user = Some(user.clone());
            Ok(LoginResponse {
                token: format!("mem-{}", uuid::Uuid::new_v4().simple()),
                user,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_identifiers_have_expected_shape() {
        let backend = MemoryBackend::new();
        let board = backend.create_board(&NewBoard::default()).await.unwrap();
        assert!(board.board_uid.starts_with("BRD-"));
        assert_eq!(board.board_uid.len(), 12);
        assert_eq!(board.serial_number.len(), 9);
        assert!(board.enabled);
        assert_eq!(board.email, None);
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(Op::ListBoards, ApiError::Network("down".into()));

        assert!(backend.list_boards().await.is_err());
        assert!(backend.list_boards().await.is_ok());
        assert_eq!(backend.calls(Op::ListBoards), 2);
    }

    #[tokio::test]
    async fn unknown_floor_is_rejected() {
        let backend = MemoryBackend::new();
        let err = backend
            .create_board(&NewBoard::on_floor(FloorId(99)))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::invalid_field("floor_id", "unknown floor"));
    }

    #[tokio::test]
    async fn claim_requires_login_and_matching_serial() {
        let backend = MemoryBackend::new();
        backend.add_account("user@wattsense.io", "pw", Role::User);
        let board = backend.seed_board(None, None, true);

        let err = backend
            .claim_board(&board.board_uid, &board.serial_number)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));

        backend.login("user@wattsense.io", "pw").await.unwrap();
        let err = backend.claim_board(&board.board_uid, "000000000").await.unwrap_err();
        assert!(err.is_not_found());

        let claimed = backend
            .claim_board(&board.board_uid, &board.serial_number)
            .await
            .unwrap();
        assert_eq!(claimed.email.as_deref(), Some("user@wattsense.io"));
    }

    #[tokio::test]
    async fn deleting_floor_leaves_boards_dangling() {
        let backend = MemoryBackend::new();
        let floor = backend.seed_floor("Floor A");
        backend.seed_board(None, Some(floor.id), true);

        backend.delete_floor(floor.id).await.unwrap();
        assert!(backend.floors().is_empty());
        assert_eq!(backend.boards()[0].floor_id, Some(floor.id));
    }
}
