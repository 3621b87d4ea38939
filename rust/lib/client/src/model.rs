use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned board id. Only boards that exist server-side have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub i64);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned floor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorId(pub i64);

impl fmt::Display for FloorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered energy-monitoring device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,

    /// Board UID (e.g. `BRD-3F9A12C0`). Immutable after registration.
    pub board_uid: String,

    /// Printed serial number. Immutable after registration.
    pub serial_number: String,

    /// Owner / assignee contact.
    #[serde(default)]
    pub email: Option<String>,

    pub enabled: bool,

    #[serde(default)]
    pub floor_id: Option<FloorId>,
}

impl Board {
    /// Check the fields the server must always fill in.
    pub fn validate(&self) -> Result<(), String> {
        if self.board_uid.trim().is_empty() {
            return Err(format!("board {} has an empty board_uid", self.id));
        }
        if self.serial_number.trim().is_empty() {
            return Err(format!("board {} has an empty serial_number", self.id));
        }
        Ok(())
    }

    /// Email with the empty string folded into `None`.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// A named location boards are assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Floor {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("floor {} has an empty name", self.id));
        }
        Ok(())
    }
}

/// Registration input. The server assigns id, uid and serial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewBoard {
    /// Sent as `""` when unset, which the API reads as "no email".
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<FloorId>,
    /// Free-text group / remarks label from the bulk-add dialog.
    #[serde(rename = "groupName", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

impl NewBoard {
    pub fn on_floor(floor_id: FloorId) -> Self {
        Self {
            floor_id: Some(floor_id),
            ..Default::default()
        }
    }
}

/// Partial board update. `None` leaves a field untouched; `Some(None)`
/// clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<Option<FloorId>>,
}

impl BoardPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn email(email: Option<String>) -> Self {
        Self {
            email: Some(email),
            ..Default::default()
        }
    }

    pub fn floor(floor_id: Option<FloorId>) -> Self {
        Self {
            floor_id: Some(floor_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.enabled.is_none() && self.floor_id.is_none()
    }

    /// Apply the patch to a local copy.
    pub fn apply(&self, board: &mut Board) {
        if let Some(ref email) = self.email {
            board.email = email.clone();
        }
        if let Some(enabled) = self.enabled {
            board.enabled = enabled;
        }
        if let Some(floor_id) = self.floor_id {
            board.floor_id = floor_id;
        }
    }
}

/// Partial floor update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FloorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<Option<String>>,
}

impl FloorPatch {
    pub fn apply(&self, floor: &mut Floor) {
        if let Some(ref name) = self.name {
            floor.name = name.clone();
        }
        if let Some(ref remarks) = self.remarks {
            floor.remarks = remarks.clone();
        }
    }
}

/// User role as reported by the login endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub role: Role,
}

/// Body returned by `/api/auth/login` and `/api/auth/google`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

/// One row of the per-user export. Column set is server-defined.
pub type ExportRow = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_decodes_with_null_fields() {
        let json = r#"{"id":2,"board_uid":"BRD-1","serial_number":"123456789","email":null,"enabled":false,"floor_id":null}"#;
        let board: Board = serde_json::from_str(json).unwrap();
        assert_eq!(board.id, BoardId(2));
        assert_eq!(board.email, None);
        assert_eq!(board.floor_id, None);
        assert!(board.validate().is_ok());
    }

    #[test]
    fn board_missing_required_field_fails() {
        let json = r#"{"id":2,"serial_number":"123456789","enabled":false}"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }

    #[test]
    fn empty_uid_is_invalid() {
        let board = Board {
            id: BoardId(1),
            board_uid: " ".into(),
            serial_number: "1".into(),
            email: None,
            enabled: true,
            floor_id: None,
        };
        assert!(board.validate().is_err());
    }

    #[test]
    fn empty_email_reads_as_none() {
        let board = Board {
            id: BoardId(1),
            board_uid: "BRD-1".into(),
            serial_number: "1".into(),
            email: Some(String::new()),
            enabled: true,
            floor_id: None,
        };
        assert_eq!(board.email(), None);
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let json = serde_json::to_value(BoardPatch::enabled(false)).unwrap();
        assert_eq!(json, serde_json::json!({"enabled": false}));

        let json = serde_json::to_value(BoardPatch::floor(None)).unwrap();
        assert_eq!(json, serde_json::json!({"floor_id": null}));
    }

    #[test]
    fn new_board_wire_format() {
        let input = NewBoard {
            email: String::new(),
            floor_id: Some(FloorId(10)),
            group_name: Some("Floor C Sensors".into()),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "", "floor_id": 10, "groupName": "Floor C Sensors"})
        );
    }

    #[test]
    fn role_parses_lowercase() {
        let user: SessionUser =
            serde_json::from_str(r#"{"email":"a@b.co","role":"admin"}"#).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }
}
