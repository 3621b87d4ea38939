//! Optimistic enabled/disabled toggles.
//!
//! A toggle shows its target value immediately through the store's overlay,
//! then sends the update. Success reloads the snapshot and drops the
//! overlay; failure drops the overlay, which restores the pre-toggle value.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wattsense_client::{BoardId, BoardPatch};

use crate::error::BoardsError;
use crate::event::StoreEvent;
use crate::store::BoardStore;

/// Per-board toggle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePhase {
    Idle,
    /// Optimistic value visible, request in flight.
    Pending,
    /// Server accepted the change. Reported once, then the board is `Idle`.
    Committed,
    /// Server rejected the change and the previous value is visible again.
    RolledBack,
}

pub struct ToggleController {
    store: Arc<BoardStore>,
}

impl ToggleController {
    pub fn new(store: Arc<BoardStore>) -> Self {
        Self { store }
    }

    /// `Pending` while a toggle for `id` is in flight, `Idle` otherwise.
    pub fn phase(&self, id: BoardId) -> TogglePhase {
        if self.store.has_overlay(id) {
            TogglePhase::Pending
        } else {
            TogglePhase::Idle
        }
    }

    /// Flip the displayed enabled flag. Returns the new value.
    pub async fn flip(&self, id: BoardId) -> Result<bool, BoardsError> {
        let current = self
            .store
            .visible_enabled(id)
            .ok_or(BoardsError::UnknownBoard(id))?;
        self.toggle(id, !current).await?;
        Ok(!current)
    }

    /// Show `enabled` for `id` right away and send the update.
    ///
    /// When two toggles for one board overlap, the later one owns the
    /// display. The earlier one's outcome no longer changes what is shown.
    pub async fn toggle(&self, id: BoardId, enabled: bool) -> Result<(), BoardsError> {
        let previous = self
            .store
            .visible_enabled(id)
            .ok_or(BoardsError::UnknownBoard(id))?;

        let _guard = self.store.begin_board_mutation();
        let ticket = self.store.push_overlay(id, enabled);
        debug!("board {} shown as enabled={} (was {})", id, enabled, previous);
        self.store.notify(StoreEvent::BoardsChanged);
        self.store.notify(StoreEvent::Toggle {
            id,
            phase: TogglePhase::Pending,
        });

        match self
            .store
            .api()
            .update_board(id, &BoardPatch::enabled(enabled))
            .await
        {
            Ok(_) => {
                if let Err(e) = self.store.refresh_boards().await {
                    warn!("board {} toggle committed but reload failed: {}", id, e);
                }
                self.store.release_overlay(id, ticket);
                info!("board {} enabled={}", id, enabled);
                self.store.notify(StoreEvent::BoardsChanged);
                self.store.notify(StoreEvent::Toggle {
                    id,
                    phase: TogglePhase::Committed,
                });
                Ok(())
            }
            Err(e) => {
                let restored = self.store.release_overlay(id, ticket);
                warn!(
                    "board {} toggle rolled back to enabled={}: {}",
                    id, previous, e
                );
                if restored {
                    self.store.notify(StoreEvent::BoardsChanged);
                }
                self.store.notify(StoreEvent::Toggle {
                    id,
                    phase: TogglePhase::RolledBack,
                });
                if e.is_not_found() {
                    if let Err(reload) = self.store.refresh_boards().await {
                        warn!(
                            "reload after rolled-back toggle of board {} failed: {}",
                            id, reload
                        );
                    }
                }
                Err(e.into())
            }
        }
    }
}
