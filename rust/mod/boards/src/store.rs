//! Board/floor state store.
//!
//! The store holds one snapshot per collection and replaces it wholesale on
//! every successful refresh. Writes go through the data client; once a
//! write resolves (success, or `NotFound` which means the snapshot is
//! stale) the affected collection is reloaded from the server. The snapshot
//! is never patched locally, apart from the optimistic overlay kept for
//! in-flight toggles.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use wattsense_client::{
    ApiError, Board, BoardApi, BoardId, BoardPatch, ExportRow, Floor, FloorId, FloorPatch,
    NewBoard,
};

use crate::derive::{self, BULK_ADD_MAX, BULK_ADD_MIN};
use crate::error::BoardsError;
use crate::event::{StoreEvent, Subscribers, SubscriptionId};

/// Load phase of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing requested yet.
    Uninitialized,
    /// A refresh is in flight. The previous snapshot, if any, is still served.
    Loading,
    /// At least one refresh resolved. A failed first refresh also lands
    /// here, with an empty snapshot and the error flag set.
    Ready,
}

/// What happens to a floor's boards when the floor is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FloorDeletePolicy {
    /// Delete only the floor. Its boards keep the dangling reference and
    /// show up as unassigned.
    #[default]
    Orphan,
    /// Delete the floor's boards first, then the floor.
    Cascade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Boards,
    Floors,
}

struct Collection<T> {
    items: Arc<Vec<T>>,
    phase: Phase,
    in_flight: usize,
    mutating: usize,
    error: Option<ApiError>,
}

impl<T> Collection<T> {
    fn new() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            phase: Phase::Uninitialized,
            in_flight: 0,
            mutating: 0,
            error: None,
        }
    }

    fn begin_refresh(&mut self) {
        self.in_flight += 1;
        self.phase = Phase::Loading;
    }

    /// The most recently resolved refresh wins, whatever order the requests
    /// were issued in.
    fn finish_refresh(&mut self, result: Result<Vec<T>, ApiError>) -> Result<Arc<Vec<T>>, ApiError> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.phase = Phase::Ready;
        }
        match result {
            Ok(items) => {
                self.items = Arc::new(items);
                self.error = None;
                Ok(self.items.clone())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }
}

/// Pending optimistic value for one board.
#[derive(Debug, Clone, Copy)]
struct Overlay {
    ticket: u64,
    enabled: bool,
}

struct Inner {
    boards: Collection<Board>,
    floors: Collection<Floor>,
    overlay: HashMap<BoardId, Overlay>,
}

impl Inner {
    fn new() -> Self {
        Self {
            boards: Collection::new(),
            floors: Collection::new(),
            overlay: HashMap::new(),
        }
    }

    fn mutating_mut(&mut self, target: Target) -> &mut usize {
        match target {
            Target::Boards => &mut self.boards.mutating,
            Target::Floors => &mut self.floors.mutating,
        }
    }
}

/// Counts one in-flight write for as long as it is alive.
pub(crate) struct MutationGuard<'a> {
    store: &'a BoardStore,
    target: Target,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.store.inner.write().unwrap();
        let counter = inner.mutating_mut(self.target);
        *counter = counter.saturating_sub(1);
    }
}

/// Single owner of the board and floor snapshots.
///
/// - Reads hand out `Arc` snapshots and never block on the network.
/// - `refresh*` replaces a snapshot from the server.
/// - Mutations call the data client, then reload.
/// - `subscribe` registers a change handler called after every state change.
pub struct BoardStore {
    api: Arc<dyn BoardApi>,
    inner: RwLock<Inner>,
    subscribers: Subscribers,
    next_ticket: AtomicU64,
}

impl BoardStore {
    pub fn new(api: Arc<dyn BoardApi>) -> Self {
        Self {
            api,
            inner: RwLock::new(Inner::new()),
            subscribers: Subscribers::new(),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub(crate) fn api(&self) -> &dyn BoardApi {
        self.api.as_ref()
    }

    // ── Reads ──

    /// Boards as they should be displayed: the authoritative snapshot with
    /// pending optimistic toggles applied.
    pub fn boards(&self) -> Arc<Vec<Board>> {
        let inner = self.inner.read().unwrap();
        if inner.overlay.is_empty() {
            return inner.boards.items.clone();
        }
        let visible = inner
            .boards
            .items
            .iter()
            .cloned()
            .map(|mut board| {
                if let Some(pending) = inner.overlay.get(&board.id) {
                    board.enabled = pending.enabled;
                }
                board
            })
            .collect();
        Arc::new(visible)
    }

    /// Boards exactly as last returned by the server.
    pub fn authoritative_boards(&self) -> Arc<Vec<Board>> {
        self.inner.read().unwrap().boards.items.clone()
    }

    /// One board from the visible view.
    pub fn board(&self, id: BoardId) -> Option<Board> {
        self.boards().iter().find(|b| b.id == id).cloned()
    }

    pub fn floors(&self) -> Arc<Vec<Floor>> {
        self.inner.read().unwrap().floors.items.clone()
    }

    pub fn floor(&self, id: FloorId) -> Option<Floor> {
        self.floors().iter().find(|f| f.id == id).cloned()
    }

    /// Visible boards grouped by floor name.
    pub fn groups(&self) -> BTreeMap<String, Vec<Board>> {
        derive::group_by_floor(&self.boards(), &self.floors())
    }

    pub fn board_phase(&self) -> Phase {
        self.inner.read().unwrap().boards.phase
    }

    pub fn floor_phase(&self) -> Phase {
        self.inner.read().unwrap().floors.phase
    }

    pub fn is_loading(&self) -> bool {
        let inner = self.inner.read().unwrap();
        inner.boards.phase == Phase::Loading || inner.floors.phase == Phase::Loading
    }

    /// True while any write, including an optimistic toggle, is in flight.
    pub fn is_mutating(&self) -> bool {
        let inner = self.inner.read().unwrap();
        inner.boards.mutating > 0 || inner.floors.mutating > 0
    }

    pub fn board_error(&self) -> Option<ApiError> {
        self.inner.read().unwrap().boards.error.clone()
    }

    pub fn floor_error(&self) -> Option<ApiError> {
        self.inner.read().unwrap().floors.error.clone()
    }

    /// Error flag of the last failed refresh, boards first. Cleared by the
    /// next successful refresh of the same collection.
    pub fn error(&self) -> Option<ApiError> {
        let inner = self.inner.read().unwrap();
        inner
            .boards
            .error
            .clone()
            .or_else(|| inner.floors.error.clone())
    }

    // ── Subscriptions ──

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn clear_subscribers(&self) {
        self.subscribers.clear();
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        self.subscribers.notify(&event);
    }

    /// Drop both snapshots and every pending overlay, back to
    /// `Uninitialized`.
    pub fn reset(&self) {
        *self.inner.write().unwrap() = Inner::new();
        self.notify(StoreEvent::BoardsChanged);
        self.notify(StoreEvent::FloorsChanged);
    }

    // ── Refresh ──

    /// Reload boards and floors concurrently. Returns the first error, boards
    /// first; both collections are attempted either way.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let (boards, floors) = tokio::join!(self.refresh_boards(), self.refresh_floors());
        boards?;
        floors?;
        Ok(())
    }

    pub async fn refresh_boards(&self) -> Result<Arc<Vec<Board>>, ApiError> {
        self.inner.write().unwrap().boards.begin_refresh();
        self.notify(StoreEvent::BoardsChanged);

        let result = self.api.list_boards().await;

        let outcome = self.inner.write().unwrap().boards.finish_refresh(result);
        match &outcome {
            Ok(items) => debug!("boards refreshed: {} items", items.len()),
            Err(e) => warn!("board refresh failed: {}", e),
        }
        self.notify(StoreEvent::BoardsChanged);
        outcome
    }

    pub async fn refresh_floors(&self) -> Result<Arc<Vec<Floor>>, ApiError> {
        self.inner.write().unwrap().floors.begin_refresh();
        self.notify(StoreEvent::FloorsChanged);

        let result = self.api.list_floors().await;

        let outcome = self.inner.write().unwrap().floors.finish_refresh(result);
        match &outcome {
            Ok(items) => debug!("floors refreshed: {} items", items.len()),
            Err(e) => warn!("floor refresh failed: {}", e),
        }
        self.notify(StoreEvent::FloorsChanged);
        outcome
    }

    /// Reload after a write. The write itself already resolved, so a failed
    /// reload only leaves the error flag set.
    async fn settle(&self, target: Target) {
        let result = match target {
            Target::Boards => self.refresh_boards().await.map(|_| ()),
            Target::Floors => self.refresh_floors().await.map(|_| ()),
        };
        if let Err(e) = result {
            warn!("reload after {:?} write failed: {}", target, e);
        }
    }

    async fn settle_all(&self) {
        if let Err(e) = self.refresh().await {
            warn!("reload after write failed: {}", e);
        }
    }

    // ── Writes ──

    fn begin_mutation(&self, target: Target) -> MutationGuard<'_> {
        *self.inner.write().unwrap().mutating_mut(target) += 1;
        MutationGuard {
            store: self,
            target,
        }
    }

    pub(crate) fn begin_board_mutation(&self) -> MutationGuard<'_> {
        self.begin_mutation(Target::Boards)
    }

    /// Run one write, then reload `target` if the write succeeded or hit a
    /// missing entity.
    async fn write<R, F>(&self, target: Target, request: F) -> Result<R, ApiError>
    where
        F: Future<Output = Result<R, ApiError>>,
    {
        let _guard = self.begin_mutation(target);
        let result = request.await;
        match &result {
            Ok(_) => self.settle(target).await,
            Err(e) if e.is_not_found() => {
                info!("{:?} write hit a missing entity, reloading", target);
                self.settle(target).await;
            }
            Err(_) => {}
        }
        result
    }

    /// Register one board.
    pub async fn add(&self, input: NewBoard) -> Result<Board, BoardsError> {
        check_email(&input.email)?;
        let board = self
            .write(Target::Boards, self.api.create_board(&input))
            .await?;
        info!("board {} registered ({})", board.id, board.board_uid);
        Ok(board)
    }

    /// Register `count` identical boards, one request each, in order.
    ///
    /// Stops at the first failure. Boards created before it stay created and
    /// are counted in [`BoardsError::BatchAborted`].
    pub async fn add_many(&self, count: usize, input: NewBoard) -> Result<Vec<Board>, BoardsError> {
        let value = i64::try_from(count).unwrap_or(i64::MAX);
        if !derive::validate_count(value, BULK_ADD_MIN, BULK_ADD_MAX) {
            return Err(BoardsError::InvalidCount {
                value,
                min: BULK_ADD_MIN,
                max: BULK_ADD_MAX,
            });
        }
        check_email(&input.email)?;

        let _guard = self.begin_mutation(Target::Boards);
        let mut created = Vec::with_capacity(count);
        let mut failure = None;
        for _ in 0..count {
            match self.api.create_board(&input).await {
                Ok(board) => created.push(board),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.settle(Target::Boards).await;

        match failure {
            None => {
                info!("registered {} boards", created.len());
                Ok(created)
            }
            Some(source) => {
                warn!(
                    "bulk add stopped after {} of {}: {}",
                    created.len(),
                    count,
                    source
                );
                Err(BoardsError::BatchAborted {
                    succeeded: created.len(),
                    requested: count,
                    source,
                })
            }
        }
    }

    pub async fn update(&self, id: BoardId, patch: BoardPatch) -> Result<Board, BoardsError> {
        if let Some(Some(email)) = &patch.email {
            check_email(email)?;
        }
        let board = self
            .write(Target::Boards, self.api.update_board(id, &patch))
            .await?;
        debug!("board {} updated", id);
        Ok(board)
    }

    /// Delete a board. Deleting an id the server no longer knows is
    /// `NotFound`, not success.
    pub async fn remove(&self, id: BoardId) -> Result<(), BoardsError> {
        self.write(Target::Boards, self.api.delete_board(id))
            .await?;
        info!("board {} deleted", id);
        Ok(())
    }

    /// Attach an existing physical board to the logged-in user.
    pub async fn claim(&self, board_uid: &str, serial_number: &str) -> Result<Board, BoardsError> {
        let board = self
            .write(
                Target::Boards,
                self.api.claim_board(board_uid.trim(), serial_number.trim()),
            )
            .await?;
        info!("board {} claimed", board.board_uid);
        Ok(board)
    }

    /// Fetch one user's export rows. Does not touch the snapshots.
    pub async fn export_user_data(&self, email: &str) -> Result<Vec<ExportRow>, BoardsError> {
        if email.is_empty() {
            return Err(BoardsError::InvalidEmail(String::new()));
        }
        check_email(email)?;
        Ok(self.api.export_user_data(email).await?)
    }

    pub async fn add_floor(&self, name: &str) -> Result<Floor, BoardsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardsError::EmptyFloorName);
        }
        let floor = self
            .write(Target::Floors, self.api.create_floor(name))
            .await?;
        info!("floor {} created ({})", floor.id, floor.name);
        Ok(floor)
    }

    pub async fn update_floor(&self, id: FloorId, patch: FloorPatch) -> Result<Floor, BoardsError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(BoardsError::EmptyFloorName);
        }
        let floor = self
            .write(Target::Floors, self.api.update_floor(id, &patch))
            .await?;
        debug!("floor {} updated", id);
        Ok(floor)
    }

    /// Delete a floor. Both collections are reloaded afterwards since the
    /// board grouping depends on the floor list.
    pub async fn remove_floor(&self, id: FloorId, policy: FloorDeletePolicy) -> Result<(), BoardsError> {
        let _guard = self.begin_mutation(Target::Floors);

        if policy == FloorDeletePolicy::Cascade {
            let _boards_guard = self.begin_mutation(Target::Boards);
            let current = self.refresh_boards().await?;
            let doomed: Vec<BoardId> = derive::boards_on_floor(&current, id)
                .iter()
                .map(|b| b.id)
                .collect();
            for (done, board_id) in doomed.iter().enumerate() {
                if let Err(source) = self.api.delete_board(*board_id).await {
                    warn!(
                        "cascade delete of floor {} stopped after {} of {} boards: {}",
                        id,
                        done,
                        doomed.len(),
                        source
                    );
                    self.settle_all().await;
                    return Err(BoardsError::BatchAborted {
                        succeeded: done,
                        requested: doomed.len(),
                        source,
                    });
                }
            }
            debug!("cascade removed {} boards from floor {}", doomed.len(), id);
        }

        let result = self.api.delete_floor(id).await;
        match &result {
            Ok(()) => {
                info!("floor {} deleted", id);
                self.settle_all().await;
            }
            Err(e) if e.is_not_found() => {
                info!("floor {} was already gone", id);
                self.settle_all().await;
            }
            Err(_) => {}
        }
        result.map_err(BoardsError::from)
    }

    // ── Optimistic overlay ──

    /// Enabled flag as currently displayed.
    pub(crate) fn visible_enabled(&self, id: BoardId) -> Option<bool> {
        let inner = self.inner.read().unwrap();
        if let Some(pending) = inner.overlay.get(&id) {
            return Some(pending.enabled);
        }
        inner
            .boards
            .items
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.enabled)
    }

    /// Show `enabled` for `id` until the returned ticket is released. A newer
    /// overlay for the same board replaces an older one.
    pub(crate) fn push_overlay(&self, id: BoardId, enabled: bool) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.inner
            .write()
            .unwrap()
            .overlay
            .insert(id, Overlay { ticket, enabled });
        ticket
    }

    /// Remove the overlay for `id` if it still belongs to `ticket`. Returns
    /// `false` when a newer toggle has taken over.
    pub(crate) fn release_overlay(&self, id: BoardId, ticket: u64) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.overlay.get(&id) {
            Some(pending) if pending.ticket == ticket => {
                inner.overlay.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn has_overlay(&self, id: BoardId) -> bool {
        self.inner.read().unwrap().overlay.contains_key(&id)
    }
}

fn check_email(email: &str) -> Result<(), BoardsError> {
    if derive::validate_email(email) {
        Ok(())
    } else {
        Err(BoardsError::InvalidEmail(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use wattsense_client::{MemoryBackend, Op};

    fn setup() -> (Arc<MemoryBackend>, BoardStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = BoardStore::new(backend.clone());
        (backend, store)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    #[tokio::test]
    async fn starts_uninitialized_and_empty() {
        let (_, store) = setup();
        assert_eq!(store.board_phase(), Phase::Uninitialized);
        assert_eq!(store.floor_phase(), Phase::Uninitialized);
        assert!(store.boards().is_empty());
        assert!(!store.is_loading());
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn refresh_loads_both_collections() {
        let (backend, store) = setup();
        let floor = backend.seed_floor("Floor A");
        backend.seed_board(None, Some(floor.id), true);
        backend.seed_board(Some("a@example.com"), None, false);

        store.refresh().await.unwrap();

        assert_eq!(store.board_phase(), Phase::Ready);
        assert_eq!(store.floor_phase(), Phase::Ready);
        assert_eq!(store.boards().len(), 2);
        assert_eq!(store.floors().len(), 1);
        let groups = store.groups();
        assert_eq!(groups["Floor A"].len(), 1);
        assert_eq!(groups[derive::UNASSIGNED].len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let (backend, store) = setup();
        backend.seed_board(None, None, true);
        store.refresh_boards().await.unwrap();

        backend.seed_board(None, None, true);
        backend.fail_next(Op::ListBoards, ApiError::Network("offline".into()));
        let err = store.refresh_boards().await.unwrap_err();

        assert_eq!(err, ApiError::Network("offline".into()));
        assert_eq!(store.boards().len(), 1);
        assert_eq!(store.board_phase(), Phase::Ready);
        assert_eq!(store.board_error(), Some(err));

        store.refresh_boards().await.unwrap();
        assert_eq!(store.boards().len(), 2);
        assert!(store.board_error().is_none());
    }

    #[tokio::test]
    async fn failed_first_refresh_is_ready_and_empty() {
        let (backend, store) = setup();
        backend.seed_floor("Lobby");
        backend.fail_next(
            Op::ListFloors,
            ApiError::Server {
                status: 500,
                message: "boom".into(),
            },
        );

        assert!(store.refresh().await.is_err());
        assert_eq!(store.floor_phase(), Phase::Ready);
        assert!(store.floors().is_empty());
        assert!(store.floor_error().is_some());
        assert!(store.board_error().is_none());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn last_resolved_refresh_wins() {
        let (backend, store) = setup();
        backend.seed_board(None, None, true);
        backend.delay_next(Op::ListBoards, Duration::from_millis(150));

        let slow = store.refresh_boards();
        let fast = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            backend.seed_board(None, None, true);
            store.refresh_boards().await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        // The slow request captured one board; the fast one saw two. The slow
        // response resolved last, so its content is what remains.
        assert_eq!(fast.unwrap().len(), 2);
        assert_eq!(slow.unwrap().len(), 1);
        assert_eq!(store.boards().len(), 1);
        assert_eq!(store.board_phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn phase_is_loading_while_request_is_in_flight() {
        let (backend, store) = setup();
        let store = Arc::new(store);
        backend.delay_next(Op::ListBoards, Duration::from_millis(100));

        let bg = store.clone();
        let task = tokio::spawn(async move { bg.refresh_boards().await.map(|b| b.len()) });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.board_phase(), Phase::Loading);
        assert!(store.is_loading());

        task.await.unwrap().unwrap();
        assert_eq!(store.board_phase(), Phase::Ready);
    }

    // ========================================================================
    // Board writes
    // ========================================================================

    #[tokio::test]
    async fn add_reloads_snapshot() {
        let (backend, store) = setup();
        let board = store.add(NewBoard::default()).await.unwrap();

        assert!(board.board_uid.starts_with("BRD-"));
        assert_eq!(store.boards().as_slice(), backend.boards().as_slice());
        assert_eq!(backend.calls(Op::ListBoards), 1);
        assert!(!store.is_mutating());
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_any_request() {
        let (backend, store) = setup();
        let input = NewBoard {
            email: "not-an-email".into(),
            ..Default::default()
        };
        let err = store.add(input).await.unwrap_err();

        assert!(matches!(err, BoardsError::InvalidEmail(_)));
        assert_eq!(backend.calls(Op::CreateBoard), 0);
    }

    #[tokio::test]
    async fn add_many_creates_count_boards_on_floor() {
        let (backend, store) = setup();
        let floor = backend.seed_floor("Floor C");
        let input = NewBoard {
            email: String::new(),
            floor_id: Some(floor.id),
            group_name: Some("Floor C Sensors".into()),
        };

        let created = store.add_many(5, input).await.unwrap();

        assert_eq!(created.len(), 5);
        assert_eq!(backend.calls(Op::CreateBoard), 5);
        assert_eq!(derive::boards_on_floor(&store.boards(), floor.id).len(), 5);
        let mut uids: Vec<&str> = created.iter().map(|b| b.board_uid.as_str()).collect();
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), 5);
    }

    #[tokio::test]
    async fn add_many_rejects_out_of_range_count() {
        let (backend, store) = setup();
        for count in [0, 101] {
            let err = store
                .add_many(count, NewBoard::default())
                .await
                .unwrap_err();
            assert!(matches!(err, BoardsError::InvalidCount { min: 1, max: 100, .. }));
        }
        assert_eq!(backend.calls(Op::CreateBoard), 0);
    }

    #[tokio::test]
    async fn add_many_stops_at_first_failure() {
        let (backend, store) = setup();
        backend.pass_next(Op::CreateBoard, 3);
        backend.fail_next(Op::CreateBoard, ApiError::Network("reset".into()));

        let err = store.add_many(10, NewBoard::default()).await.unwrap_err();
        match err {
            BoardsError::BatchAborted {
                succeeded,
                requested,
                source,
            } => {
                assert_eq!(succeeded, 3);
                assert_eq!(requested, 10);
                assert_eq!(source, ApiError::Network("reset".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.calls(Op::CreateBoard), 4);
        assert_eq!(store.boards().len(), 3);
        assert!(!store.is_mutating());
    }

    #[tokio::test]
    async fn update_applies_patch_after_reload() {
        let (backend, store) = setup();
        let board = backend.seed_board(None, None, true);
        store.refresh().await.unwrap();

        store
            .update(board.id, BoardPatch::email(Some("owner@example.com".into())))
            .await
            .unwrap();

        let current = store.board(board.id).unwrap();
        assert_eq!(current.email(), Some("owner@example.com"));
        assert_eq!(current.board_uid, board.board_uid);
    }

    #[tokio::test]
    async fn removing_twice_is_not_found_and_reloads() {
        let (backend, store) = setup();
        let board = backend.seed_board(None, None, true);
        store.refresh().await.unwrap();

        store.remove(board.id).await.unwrap();
        assert!(store.boards().is_empty());
        let reloads = backend.calls(Op::ListBoards);

        let err = store.remove(board.id).await.unwrap_err();
        assert!(err.api_error().is_some_and(ApiError::is_not_found));
        assert_eq!(backend.calls(Op::ListBoards), reloads + 1);
    }

    #[tokio::test]
    async fn stale_update_drops_missing_board() {
        let (backend, store) = setup();
        let board = backend.seed_board(None, None, true);
        store.refresh().await.unwrap();

        // Someone else deletes it server-side.
        backend.delete_board(board.id).await.unwrap();

        let err = store
            .update(board.id, BoardPatch::enabled(false))
            .await
            .unwrap_err();
        assert!(err.api_error().is_some_and(ApiError::is_not_found));
        assert!(store.board(board.id).is_none());
    }

    #[tokio::test]
    async fn other_write_errors_do_not_reload() {
        let (backend, store) = setup();
        let board = backend.seed_board(None, None, true);
        store.refresh().await.unwrap();
        let reloads = backend.calls(Op::ListBoards);

        backend.fail_next(Op::UpdateBoard, ApiError::Auth("expired".into()));
        let err = store
            .update(board.id, BoardPatch::enabled(false))
            .await
            .unwrap_err();
        assert_eq!(err.surface(), wattsense_client::Surface::Relogin);
        assert_eq!(backend.calls(Op::ListBoards), reloads);
    }

    #[tokio::test]
    async fn claim_after_login_assigns_owner() {
        let (backend, store) = setup();
        backend.add_account("user@example.com", "pw", wattsense_client::Role::User);
        wattsense_client::AuthApi::login(backend.as_ref(), "user@example.com", "pw")
            .await
            .unwrap();
        let board = backend.seed_board(None, None, false);

        let claimed = store
            .claim(&board.board_uid, &format!(" {} ", board.serial_number))
            .await
            .unwrap();
        assert_eq!(claimed.email(), Some("user@example.com"));
        assert_eq!(
            derive::owned_enabled(&store.boards(), "user@example.com").len(),
            usize::from(claimed.enabled)
        );
    }

    #[tokio::test]
    async fn export_requires_an_email() {
        let (backend, store) = setup();
        backend.seed_board(Some("a@example.com"), None, true);
        assert!(matches!(
            store.export_user_data("").await,
            Err(BoardsError::InvalidEmail(_))
        ));
        let rows = store.export_user_data("a@example.com").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    // ========================================================================
    // Floor writes
    // ========================================================================

    #[tokio::test]
    async fn add_and_rename_floor() {
        let (_, store) = setup();
        assert!(matches!(
            store.add_floor("  ").await,
            Err(BoardsError::EmptyFloorName)
        ));

        let floor = store.add_floor(" Mezzanine ").await.unwrap();
        assert_eq!(floor.name, "Mezzanine");
        assert_eq!(store.floors().len(), 1);

        let patch = FloorPatch {
            name: Some("Upper Mezzanine".into()),
            ..Default::default()
        };
        store.update_floor(floor.id, patch).await.unwrap();
        assert_eq!(store.floor(floor.id).unwrap().name, "Upper Mezzanine");
    }

    #[tokio::test]
    async fn orphan_delete_leaves_boards_unassigned() {
        let (backend, store) = setup();
        let floor = backend.seed_floor("Floor B");
        backend.seed_board(None, Some(floor.id), true);
        backend.seed_board(None, Some(floor.id), true);
        store.refresh().await.unwrap();

        store
            .remove_floor(floor.id, FloorDeletePolicy::Orphan)
            .await
            .unwrap();

        assert!(store.floors().is_empty());
        assert_eq!(store.boards().len(), 2);
        assert_eq!(store.groups()[derive::UNASSIGNED].len(), 2);
    }

    #[tokio::test]
    async fn cascade_delete_removes_floor_boards() {
        let (backend, store) = setup();
        let doomed = backend.seed_floor("Floor B");
        let kept = backend.seed_floor("Floor C");
        backend.seed_board(None, Some(doomed.id), true);
        backend.seed_board(None, Some(doomed.id), true);
        backend.seed_board(None, Some(kept.id), true);
        store.refresh().await.unwrap();

        store
            .remove_floor(doomed.id, FloorDeletePolicy::Cascade)
            .await
            .unwrap();

        assert_eq!(store.floors().len(), 1);
        assert_eq!(store.boards().len(), 1);
        assert_eq!(backend.calls(Op::DeleteBoard), 2);
    }

    #[tokio::test]
    async fn cascade_failure_keeps_floor() {
        let (backend, store) = setup();
        let floor = backend.seed_floor("Floor B");
        backend.seed_board(None, Some(floor.id), true);
        backend.seed_board(None, Some(floor.id), true);
        store.refresh().await.unwrap();

        backend.fail_next(
            Op::DeleteBoard,
            ApiError::Server {
                status: 503,
                message: "unavailable".into(),
            },
        );
        let err = store
            .remove_floor(floor.id, FloorDeletePolicy::Cascade)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BoardsError::BatchAborted {
                succeeded: 0,
                requested: 2,
                ..
            }
        ));
        assert_eq!(backend.calls(Op::DeleteFloor), 0);
        assert_eq!(store.floors().len(), 1);
        assert_eq!(store.boards().len(), 2);
    }

    #[tokio::test]
    async fn deleting_missing_floor_is_not_found() {
        let (_, store) = setup();
        let err = store
            .remove_floor(FloorId(404), FloorDeletePolicy::Orphan)
            .await
            .unwrap_err();
        assert!(err.api_error().is_some_and(ApiError::is_not_found));
        assert_eq!(store.floor_phase(), Phase::Ready);
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    #[tokio::test]
    async fn subscribers_see_refresh_events() {
        let (backend, store) = setup();
        backend.seed_board(None, None, true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = seen.clone();
        let id = store.subscribe(move |event| seen_c.lock().unwrap().push(event.clone()));

        store.refresh_boards().await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StoreEvent::BoardsChanged, StoreEvent::BoardsChanged]
        );

        assert!(store.unsubscribe(id));
        store.refresh_boards().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_returns_to_uninitialized() {
        let (backend, store) = setup();
        backend.seed_board(None, None, true);
        store.refresh().await.unwrap();

        store.reset();
        assert_eq!(store.board_phase(), Phase::Uninitialized);
        assert!(store.boards().is_empty());
    }
}
