//! Batch editing of one floor's boards.
//!
//! A draft is a local, editable copy of the boards on a floor plus any
//! number of placeholder rows that do not exist server-side yet. Nothing is
//! sent until [`FloorDraft::save`], except deleting a saved row.

use std::fmt;

use tracing::{debug, info, warn};
use wattsense_client::{ApiError, Board, BoardId, BoardPatch, FloorId, NewBoard};

use crate::derive::{self, BULK_ADD_MAX, BULK_ADD_MIN};
use crate::error::BoardsError;
use crate::store::BoardStore;

/// Row identity inside a draft.
///
/// Only `Saved` carries a server id, so a placeholder can never reach an
/// update or delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftKey {
    Saved(BoardId),
    Transient(u64),
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftKey::Saved(id) => write!(f, "{}", id),
            DraftKey::Transient(n) => write!(f, "temp-{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRow {
    pub key: DraftKey,
    /// Server-assigned; `None` until the row is saved.
    pub board_uid: Option<String>,
    pub serial_number: Option<String>,
    pub email: String,
    pub enabled: bool,
    /// Values last seen on the server, for change detection.
    saved: Option<(String, bool)>,
}

impl DraftRow {
    fn from_board(board: &Board) -> Self {
        let email = board.email().unwrap_or_default().to_string();
        Self {
            key: DraftKey::Saved(board.id),
            board_uid: Some(board.board_uid.clone()),
            serial_number: Some(board.serial_number.clone()),
            saved: Some((email.clone(), board.enabled)),
            email,
            enabled: board.enabled,
        }
    }

    fn placeholder(n: u64) -> Self {
        Self {
            key: DraftKey::Transient(n),
            board_uid: None,
            serial_number: None,
            email: String::new(),
            enabled: true,
            saved: None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.key, DraftKey::Transient(_))
    }

    /// True for placeholders and for saved rows edited since load.
    pub fn is_dirty(&self) -> bool {
        match &self.saved {
            None => true,
            Some((email, enabled)) => *email != self.email || *enabled != self.enabled,
        }
    }
}

/// Outcome of a successful [`FloorDraft::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub created: usize,
    pub updated: usize,
}

pub struct FloorDraft {
    floor_id: FloorId,
    rows: Vec<DraftRow>,
    next_temp: u64,
}

impl FloorDraft {
    /// Start a draft from the floor's boards in the store's current
    /// authoritative snapshot.
    pub fn load(store: &BoardStore, floor_id: FloorId) -> Self {
        let rows = derive::boards_on_floor(&store.authoritative_boards(), floor_id)
            .iter()
            .map(DraftRow::from_board)
            .collect();
        Self {
            floor_id,
            rows,
            next_temp: 1,
        }
    }

    pub fn floor_id(&self) -> FloorId {
        self.floor_id
    }

    pub fn rows(&self) -> &[DraftRow] {
        &self.rows
    }

    pub fn is_dirty(&self) -> bool {
        self.rows.iter().any(DraftRow::is_dirty)
    }

    /// Append `count` placeholder rows, enabled and without email.
    pub fn add_placeholders(&mut self, count: usize) -> Result<Vec<DraftKey>, BoardsError> {
        let value = i64::try_from(count).unwrap_or(i64::MAX);
        if !derive::validate_count(value, BULK_ADD_MIN, BULK_ADD_MAX) {
            return Err(BoardsError::InvalidCount {
                value,
                min: BULK_ADD_MIN,
                max: BULK_ADD_MAX,
            });
        }
        let keys = (0..count)
            .map(|_| {
                let row = DraftRow::placeholder(self.next_temp);
                self.next_temp += 1;
                let key = row.key;
                self.rows.push(row);
                key
            })
            .collect();
        Ok(keys)
    }

    fn row_mut(&mut self, key: DraftKey) -> Result<&mut DraftRow, BoardsError> {
        self.rows
            .iter_mut()
            .find(|r| r.key == key)
            .ok_or_else(|| BoardsError::UnknownDraftRow(key.to_string()))
    }

    /// Edit a row's email. Not validated until save; see
    /// [`FloorDraft::invalid_rows`] for inline marking.
    pub fn set_email(&mut self, key: DraftKey, email: impl Into<String>) -> Result<(), BoardsError> {
        self.row_mut(key)?.email = email.into().trim().to_string();
        Ok(())
    }

    pub fn set_enabled(&mut self, key: DraftKey, enabled: bool) -> Result<(), BoardsError> {
        self.row_mut(key)?.enabled = enabled;
        Ok(())
    }

    /// Rows whose email would be rejected on save.
    pub fn invalid_rows(&self) -> Vec<DraftKey> {
        self.rows
            .iter()
            .filter(|r| !derive::validate_email(&r.email))
            .map(|r| r.key)
            .collect()
    }

    /// Drop a row. A placeholder just disappears; a saved row is deleted
    /// server-side first and stays in the draft if that fails.
    pub async fn discard(&mut self, store: &BoardStore, key: DraftKey) -> Result<(), BoardsError> {
        self.row_mut(key)?;
        if let DraftKey::Saved(id) = key {
            store.remove(id).await?;
        }
        self.rows.retain(|r| r.key != key);
        debug!("draft row {} discarded", key);
        Ok(())
    }

    /// Create every placeholder and update every edited saved row, in row
    /// order, then reload the store.
    ///
    /// Stops at the first failure. Rows handled before it are committed and
    /// become clean saved rows, so saving again only retries the rest.
    pub async fn save(&mut self, store: &BoardStore) -> Result<SaveReport, BoardsError> {
        if let Some(row) = self.rows.iter().find(|r| !derive::validate_email(&r.email)) {
            return Err(BoardsError::InvalidEmail(row.email.clone()));
        }

        let pending: Vec<usize> = (0..self.rows.len())
            .filter(|&i| self.rows[i].is_dirty())
            .collect();
        if pending.is_empty() {
            return Ok(SaveReport::default());
        }

        let mut report = SaveReport::default();
        let mut failure: Option<ApiError> = None;
        {
            let _guard = store.begin_board_mutation();
            for &i in &pending {
                if let Err(e) = self.commit_row(store, i, &mut report).await {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Err(e) = store.refresh_boards().await {
            warn!("reload after saving floor {} failed: {}", self.floor_id, e);
        }

        match failure {
            None => {
                info!(
                    "floor {} saved: {} created, {} updated",
                    self.floor_id, report.created, report.updated
                );
                Ok(report)
            }
            Some(source) => Err(BoardsError::BatchAborted {
                succeeded: report.created + report.updated,
                requested: pending.len(),
                source,
            }),
        }
    }

    /// Send one row and record it in `report` as soon as the server has it.
    ///
    /// A placeholder that is created but whose follow-up patch fails becomes a
    /// saved row that is still dirty, so a retry only re-sends the patch.
    async fn commit_row(
        &mut self,
        store: &BoardStore,
        index: usize,
        report: &mut SaveReport,
    ) -> Result<(), ApiError> {
        let row = &self.rows[index];
        let email = if row.email.is_empty() {
            None
        } else {
            Some(row.email.clone())
        };
        match row.key {
            DraftKey::Transient(_) => {
                let wanted = row.enabled;
                let input = NewBoard {
                    email: row.email.clone(),
                    floor_id: Some(self.floor_id),
                    group_name: None,
                };
                let board = store.api().create_board(&input).await?;
                let mut created = DraftRow::from_board(&board);
                created.enabled = wanted;
                self.rows[index] = created;
                report.created += 1;
                // Placeholders default to enabled; the create call does not
                // carry the flag.
                if board.enabled != wanted {
                    let board = store
                        .api()
                        .update_board(board.id, &BoardPatch::enabled(wanted))
                        .await?;
                    self.rows[index] = DraftRow::from_board(&board);
                }
                Ok(())
            }
            DraftKey::Saved(id) => {
                let patch = BoardPatch {
                    email: Some(email),
                    enabled: Some(row.enabled),
                    floor_id: None,
                };
                let board = store.api().update_board(id, &patch).await?;
                self.rows[index] = DraftRow::from_board(&board);
                report.updated += 1;
                Ok(())
            }
        }
    }
}
