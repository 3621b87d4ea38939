pub mod boards;
pub mod export;
pub mod floors;
pub mod login;
pub mod settings;

use std::path::Path;

use anyhow::Result;
use wattsense_boards::{BoardsError, Dashboard};
use wattsense_client::{Board, Floor, Surface};

use crate::config::ClientConfig;

/// Output format selected with `-o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Output {
    Table,
    Json,
}

/// Load the config and build a dashboard from it.
pub fn open(client_config_path: &Path) -> Result<(ClientConfig, Dashboard)> {
    let config = ClientConfig::load(client_config_path)?;
    let dash = Dashboard::init(&config.dashboard())?;
    Ok((config, dash))
}

/// Fail early with a login hint instead of sending an unauthenticated request.
pub fn require_login(dash: &Dashboard) -> Result<()> {
    dash.session().require().map_err(explain)?;
    Ok(())
}

/// Turn a library error into a message for the terminal.
pub fn explain(err: BoardsError) -> anyhow::Error {
    match err.surface() {
        Surface::Relogin => anyhow::anyhow!("{}. Run `wattsense login` again.", err),
        Surface::Inline { field } => anyhow::anyhow!("{}: {}", field, err),
        Surface::Notice => anyhow::anyhow!("{} (showing nothing new; try again later)", err),
        Surface::Message | Surface::Generic => anyhow::Error::new(err),
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_board_table(boards: &[Board], floors: &[Floor]) {
    println!(
        "{:<6} {:<14} {:<10} {:<8} {:<28} FLOOR",
        "ID", "UID", "SERIAL", "ENABLED", "EMAIL"
    );
    for b in boards {
        println!(
            "{:<6} {:<14} {:<10} {:<8} {:<28} {}",
            b.id,
            b.board_uid,
            b.serial_number,
            if b.enabled { "yes" } else { "no" },
            b.email().unwrap_or("-"),
            wattsense_boards::derive::floor_label(b, floors),
        );
    }
}

pub fn print_floor_table(floors: &[Floor], boards: &[Board]) {
    println!("{:<6} {:<24} {:<7} REMARKS", "ID", "NAME", "BOARDS");
    for f in floors {
        println!(
            "{:<6} {:<24} {:<7} {}",
            f.id,
            f.name,
            wattsense_boards::derive::boards_on_floor(boards, f.id).len(),
            f.remarks.as_deref().unwrap_or(""),
        );
    }
}

/// Ask before a destructive action unless `yes` was given.
pub fn confirm(yes: bool, prompt: &str) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    eprint!("{} [y/N]: ", prompt);
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().eq_ignore_ascii_case("y"))
}
