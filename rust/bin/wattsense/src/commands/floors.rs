//! Floor commands: list, add, rename, delete, edit.

use std::path::Path;

use anyhow::Result;
use wattsense_boards::{DraftKey, FloorDeletePolicy, FloorDraft};
use wattsense_client::{BoardId, FloorId, FloorPatch};

use super::{confirm, explain, open, print_floor_table, print_json, require_login, Output};

pub async fn list(output: Output, client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let store = dash.store();
    store.refresh().await.map_err(|e| explain(e.into()))?;

    let floors = store.floors();
    match output {
        Output::Json => print_json(floors.as_slice())?,
        Output::Table => print_floor_table(&floors, &store.boards()),
    }
    dash.dispose();
    Ok(())
}

pub async fn add(name: &str, client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let floor = dash.store().add_floor(name).await.map_err(explain)?;
    println!("Floor {} created ({}).", floor.id, floor.name);
    dash.dispose();
    Ok(())
}

pub async fn rename(
    id: i64,
    name: &str,
    remarks: Option<String>,
    client_config_path: &Path,
) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let patch = FloorPatch {
        name: Some(name.to_string()),
        remarks: remarks.map(|r| Some(r).filter(|r| !r.is_empty())),
    };
    let floor = dash
        .store()
        .update_floor(FloorId(id), patch)
        .await
        .map_err(explain)?;
    println!("Floor {} is now \"{}\".", floor.id, floor.name);
    dash.dispose();
    Ok(())
}

pub async fn delete(id: i64, cascade: bool, yes: bool, client_config_path: &Path) -> Result<()> {
    let prompt = if cascade {
        format!("Delete floor {} and every board on it?", id)
    } else {
        format!("Delete floor {}? Its boards become unassigned.", id)
    };
    if !confirm(yes, &prompt)? {
        println!("Cancelled.");
        return Ok(());
    }
    let policy = if cascade {
        FloorDeletePolicy::Cascade
    } else {
        FloorDeletePolicy::Orphan
    };
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    dash.store()
        .remove_floor(FloorId(id), policy)
        .await
        .map_err(explain)?;
    println!("Floor {} deleted.", id);
    dash.dispose();
    Ok(())
}

#[derive(Debug, Default)]
pub struct EditOptions {
    /// Placeholder rows to append.
    pub add: Option<usize>,
    /// Email for the new rows.
    pub email: Option<String>,
    /// `BOARD_ID=EMAIL` assignments for existing rows.
    pub set_email: Vec<String>,
    pub enable: Vec<i64>,
    pub disable: Vec<i64>,
    /// Board ids to delete.
    pub remove: Vec<i64>,
}

fn parse_assignment(raw: &str) -> Result<(BoardId, String)> {
    let (id, email) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected BOARD_ID=EMAIL, got {:?}", raw))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid board id {:?}", id))?;
    Ok((BoardId(id), email.trim().to_string()))
}

/// Batch-edit one floor's boards and save them in one go.
pub async fn edit(id: i64, opts: EditOptions, client_config_path: &Path) -> Result<()> {
    let assignments = opts
        .set_email
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let store = dash.store();
    store.refresh().await.map_err(|e| explain(e.into()))?;
    let floor_id = FloorId(id);
    if store.floor(floor_id).is_none() {
        anyhow::bail!("No floor with id {}.", id);
    }

    let mut draft = FloorDraft::load(store, floor_id);
    for board_id in &opts.remove {
        draft
            .discard(store, DraftKey::Saved(BoardId(*board_id)))
            .await
            .map_err(explain)?;
    }
    for (board_id, email) in assignments {
        draft
            .set_email(DraftKey::Saved(board_id), email)
            .map_err(explain)?;
    }
    for board_id in &opts.enable {
        draft
            .set_enabled(DraftKey::Saved(BoardId(*board_id)), true)
            .map_err(explain)?;
    }
    for board_id in &opts.disable {
        draft
            .set_enabled(DraftKey::Saved(BoardId(*board_id)), false)
            .map_err(explain)?;
    }
    if let Some(count) = opts.add {
        let keys = draft.add_placeholders(count).map_err(explain)?;
        if let Some(email) = &opts.email {
            for key in keys {
                draft.set_email(key, email.as_str()).map_err(explain)?;
            }
        }
    }

    let invalid = draft.invalid_rows();
    if !invalid.is_empty() {
        let keys: Vec<String> = invalid.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid email on row(s): {}", keys.join(", "));
    }

    let report = draft.save(store).await.map_err(explain)?;
    println!(
        "Floor {} saved: {} created, {} updated, {} removed.",
        id,
        report.created,
        report.updated,
        opts.remove.len()
    );
    dash.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_parsing() {
        let (id, email) = parse_assignment("12= bob@example.com").unwrap();
        assert_eq!(id, BoardId(12));
        assert_eq!(email, "bob@example.com");

        let (_, email) = parse_assignment("3=").unwrap();
        assert!(email.is_empty());

        assert!(parse_assignment("bob@example.com").is_err());
        assert!(parse_assignment("x=bob@example.com").is_err());
    }
}
