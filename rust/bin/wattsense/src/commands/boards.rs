//! Board commands: list, add, set, toggle, delete, claim.

use std::path::Path;

use anyhow::Result;
use wattsense_boards::derive;
use wattsense_client::{BoardId, BoardPatch, FloorId, NewBoard};

use super::{confirm, explain, open, print_board_table, print_json, require_login, Output};

#[derive(Debug, Default)]
pub struct ListOptions {
    pub search: Option<String>,
    pub page: usize,
    pub grouped: bool,
    /// Only the logged-in user's enabled boards.
    pub mine: bool,
}

pub async fn list(opts: ListOptions, output: Output, client_config_path: &Path) -> Result<()> {
    let (config, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let store = dash.store();
    store.refresh().await.map_err(|e| explain(e.into()))?;

    let floors = store.floors();
    let mut boards = store.boards().to_vec();
    if opts.mine {
        let email = dash.session().current().map(|s| s.email).unwrap_or_default();
        boards = derive::owned_enabled(&boards, &email);
    }
    if let Some(query) = &opts.search {
        boards = derive::filter_by_search(&boards, &floors, query);
    }

    if opts.grouped {
        let groups = derive::group_by_floor(&boards, &floors);
        match output {
            Output::Json => print_json(&groups)?,
            Output::Table => {
                for (name, members) in &groups {
                    println!("== {} ({}) ==", name, members.len());
                    print_board_table(members, &floors);
                    println!();
                }
            }
        }
        dash.dispose();
        return Ok(());
    }

    let pages = derive::page_count(boards.len(), config.page_size);
    let page = derive::paginate(&boards, config.page_size, opts.page.saturating_sub(1));
    match output {
        Output::Json => print_json(page)?,
        Output::Table => {
            print_board_table(page, &floors);
            if pages > 1 {
                println!(
                    "-- page {} of {} ({} boards) --",
                    opts.page.clamp(1, pages),
                    pages,
                    boards.len()
                );
            }
        }
    }
    dash.dispose();
    Ok(())
}

#[derive(Debug, Default)]
pub struct AddOptions {
    pub count: String,
    pub email: Option<String>,
    pub floor: Option<i64>,
    pub group: Option<String>,
}

pub async fn add(opts: AddOptions, output: Output, client_config_path: &Path) -> Result<()> {
    let count = derive::parse_count(&opts.count, derive::BULK_ADD_MIN, derive::BULK_ADD_MAX)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "count: expected a whole number from {} to {}",
                derive::BULK_ADD_MIN,
                derive::BULK_ADD_MAX
            )
        })?;
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;

    let input = NewBoard {
        email: opts.email.unwrap_or_default().trim().to_string(),
        floor_id: opts.floor.map(FloorId),
        group_name: opts.group,
    };
    let created = if count == 1 {
        vec![dash.store().add(input).await.map_err(explain)?]
    } else {
        dash.store().add_many(count, input).await.map_err(explain)?
    };

    match output {
        Output::Json => print_json(&created)?,
        Output::Table => {
            print_board_table(&created, &dash.store().floors());
            println!("Registered {} board(s).", created.len());
        }
    }
    dash.dispose();
    Ok(())
}

#[derive(Debug, Default)]
pub struct SetOptions {
    pub email: Option<String>,
    pub clear_email: bool,
    pub floor: Option<i64>,
    pub unassign: bool,
}

impl SetOptions {
    fn patch(self) -> BoardPatch {
        let email = if self.clear_email {
            Some(None)
        } else {
            self.email.map(|e| Some(e.trim().to_string()))
        };
        let floor_id = if self.unassign {
            Some(None)
        } else {
            self.floor.map(|f| Some(FloorId(f)))
        };
        BoardPatch {
            email,
            enabled: None,
            floor_id,
        }
    }
}

pub async fn set(id: i64, opts: SetOptions, output: Output, client_config_path: &Path) -> Result<()> {
    let patch = opts.patch();
    if patch.is_empty() {
        anyhow::bail!("Nothing to change. Pass --email, --clear-email, --floor or --unassign.");
    }
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;

    let board = dash
        .store()
        .update(BoardId(id), patch)
        .await
        .map_err(explain)?;
    match output {
        Output::Json => print_json(&board)?,
        Output::Table => print_board_table(&[board], &dash.store().floors()),
    }
    dash.dispose();
    Ok(())
}

/// Flip the enabled flag, or set it when `enabled` is given.
pub async fn toggle(id: i64, enabled: Option<bool>, client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let store = dash.store();
    store.refresh_boards().await.map_err(|e| explain(e.into()))?;

    let id = BoardId(id);
    let now = match enabled {
        Some(value) => {
            dash.toggles().toggle(id, value).await.map_err(explain)?;
            value
        }
        None => dash.toggles().flip(id).await.map_err(explain)?,
    };
    println!(
        "Board {} {}.",
        id,
        if now { "enabled" } else { "disabled" }
    );
    dash.dispose();
    Ok(())
}

pub async fn delete(id: i64, yes: bool, client_config_path: &Path) -> Result<()> {
    if !confirm(yes, &format!("Delete board {}?", id))? {
        println!("Cancelled.");
        return Ok(());
    }
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    dash.store()
        .remove(BoardId(id))
        .await
        .map_err(explain)?;
    println!("Board {} deleted.", id);
    dash.dispose();
    Ok(())
}

pub async fn claim(
    board_uid: &str,
    serial_number: &str,
    output: Output,
    client_config_path: &Path,
) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let board = dash
        .store()
        .claim(board_uid, serial_number)
        .await
        .map_err(explain)?;
    match output {
        Output::Json => print_json(&board)?,
        Output::Table => println!("Claimed {} (board {}).", board.board_uid, board.id),
    }
    dash.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_options_build_patch() {
        let patch = SetOptions {
            email: Some(" a@example.com ".into()),
            unassign: true,
            ..Default::default()
        }
        .patch();
        assert_eq!(patch.email, Some(Some("a@example.com".into())));
        assert_eq!(patch.floor_id, Some(None));
        assert_eq!(patch.enabled, None);

        let patch = SetOptions {
            clear_email: true,
            floor: Some(3),
            ..Default::default()
        }
        .patch();
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.floor_id, Some(Some(FloorId(3))));

        assert!(SetOptions::default().patch().is_empty());
    }
}
