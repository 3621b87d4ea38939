use thiserror::Error;
use wattsense_client::{ApiError, BoardId, Surface};
use wattsense_kv::KVError;

/// Errors returned by store, controller, draft and session operations.
#[derive(Error, Debug)]
pub enum BoardsError {
    /// The data client failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Rejected locally before any request was sent.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("count {value} is outside {min}..={max}")]
    InvalidCount { value: i64, min: i64, max: i64 },

    #[error("floor name is required")]
    EmptyFloorName,

    /// A batch stopped at its first failure. The first `succeeded` items are
    /// committed server-side.
    #[error("{succeeded} of {requested} completed before failure: {source}")]
    BatchAborted {
        succeeded: usize,
        requested: usize,
        #[source]
        source: ApiError,
    },

    #[error("board {0} is not in the current snapshot")]
    UnknownBoard(BoardId),

    #[error("no draft row {0}")]
    UnknownDraftRow(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("session storage: {0}")]
    Storage(#[from] KVError),
}

impl BoardsError {
    /// The underlying client error, if there is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            BoardsError::Api(e) => Some(e),
            BoardsError::BatchAborted { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn surface(&self) -> Surface {
        match self {
            BoardsError::Api(e) => e.surface(),
            BoardsError::InvalidEmail(_) => Surface::Inline {
                field: "email".into(),
            },
            BoardsError::InvalidCount { .. } => Surface::Inline {
                field: "count".into(),
            },
            BoardsError::EmptyFloorName => Surface::Inline {
                field: "name".into(),
            },
            BoardsError::BatchAborted { source, .. } => match source.surface() {
                Surface::Relogin => Surface::Relogin,
                _ => Surface::Message,
            },
            BoardsError::UnknownBoard(_) | BoardsError::UnknownDraftRow(_) => Surface::Message,
            BoardsError::NotLoggedIn => Surface::Relogin,
            BoardsError::Storage(_) => Surface::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_message_reports_progress() {
        let err = BoardsError::BatchAborted {
            succeeded: 3,
            requested: 10,
            source: ApiError::Network("connection reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "3 of 10 completed before failure: network: connection reset"
        );
        assert_eq!(err.surface(), Surface::Message);
        assert!(err.api_error().is_some());
    }

    #[test]
    fn expired_session_inside_batch_still_asks_for_login() {
        let err = BoardsError::BatchAborted {
            succeeded: 0,
            requested: 2,
            source: ApiError::Auth("expired".into()),
        };
        assert_eq!(err.surface(), Surface::Relogin);
    }

    #[test]
    fn local_validation_is_inline() {
        assert_eq!(
            BoardsError::InvalidEmail("x".into()).surface(),
            Surface::Inline {
                field: "email".into()
            }
        );
        assert!(BoardsError::EmptyFloorName.api_error().is_none());
    }
}
