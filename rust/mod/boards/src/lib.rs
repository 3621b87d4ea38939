//! WattSense board/floor state management.
//!
//! - [`derive`]: pure projections over a snapshot (grouping, search,
//!   pagination, field validation).
//! - [`store::BoardStore`]: owns the board and floor snapshots and routes
//!   every mutation through the data client, followed by a full reload.
//! - [`optimistic::ToggleController`]: enabled/disabled toggles shown
//!   before the server confirms, rolled back on failure.
//! - [`draft::FloorDraft`]: batch editing of one floor's boards, including
//!   unsaved placeholder rows.
//! - [`session::SessionManager`]: login state cached in local storage.
//! - [`dashboard::Dashboard`]: wires the pieces together with an explicit
//!   `init` / `dispose` lifecycle.

pub mod dashboard;
pub mod derive;
pub mod draft;
pub mod error;
pub mod event;
pub mod optimistic;
pub mod session;
pub mod store;

pub use dashboard::{Dashboard, DashboardConfig};
pub use draft::{DraftKey, DraftRow, FloorDraft, SaveReport};
pub use error::BoardsError;
pub use event::{StoreEvent, SubscriptionId};
pub use optimistic::{ToggleController, TogglePhase};
pub use session::{Session, SessionManager};
pub use store::{BoardStore, FloorDeletePolicy, Phase};
