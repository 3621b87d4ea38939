//! `wattsense`: the WattSense dashboard CLI.
//!
//! Logs in, lists and edits boards and floors, and exports user data
//! against a WattSense API server.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::Output;

/// WattSense CLI tool.
#[derive(Parser, Debug)]
#[command(name = "wattsense", about = "WattSense board management client")]
struct Cli {
    /// Path to client config file (default: ~/.wattsense/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value = "table")]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Login and cache the session.
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Password (prefer the interactive prompt).
        #[arg(long)]
        password: Option<String>,
        /// Log in with a Google ID token instead.
        #[arg(long, conflicts_with_all = ["email", "password"])]
        google_token: Option<String>,
    },

    /// Forget the cached session.
    Logout,

    /// Show who is logged in.
    Whoami,

    /// Board operations.
    Boards {
        #[command(subcommand)]
        action: BoardsAction,
    },

    /// Floor operations.
    Floors {
        #[command(subcommand)]
        action: FloorsAction,
    },

    /// Export one user's data as JSON.
    Export {
        email: String,
        /// Write to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// View or edit the client config.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum BoardsAction {
    /// List boards.
    List {
        /// Case-insensitive search over id, uid, serial, email and floor.
        #[arg(long)]
        search: Option<String>,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Group by floor instead of paginating.
        #[arg(long)]
        grouped: bool,
        /// Only my enabled boards.
        #[arg(long)]
        mine: bool,
    },
    /// Register one or more boards.
    Add {
        /// How many boards to register (1-100).
        #[arg(long, default_value = "1")]
        count: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        floor: Option<i64>,
        /// Group / remarks label.
        #[arg(long)]
        group: Option<String>,
    },
    /// Change a board's email or floor.
    Set {
        id: i64,
        #[arg(long, conflicts_with = "clear_email")]
        email: Option<String>,
        #[arg(long)]
        clear_email: bool,
        #[arg(long, conflicts_with = "unassign")]
        floor: Option<i64>,
        #[arg(long)]
        unassign: bool,
    },
    /// Flip a board's enabled flag.
    Toggle {
        id: i64,
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    /// Delete a board.
    Delete {
        id: i64,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Attach a physical board to your account.
    Claim { board_uid: String, serial_number: String },
}

#[derive(Subcommand, Debug)]
enum FloorsAction {
    /// List floors with board counts.
    List,
    /// Create a floor.
    Add { name: String },
    /// Rename a floor.
    Rename {
        id: i64,
        name: String,
        /// New remarks; empty clears them.
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Delete a floor.
    Delete {
        id: i64,
        /// Also delete every board on the floor.
        #[arg(long)]
        cascade: bool,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Batch-edit a floor's boards.
    Edit {
        id: i64,
        /// Add this many new boards (1-100).
        #[arg(long)]
        add: Option<usize>,
        /// Email for the added boards.
        #[arg(long, requires = "add")]
        email: Option<String>,
        /// BOARD_ID=EMAIL, repeatable.
        #[arg(long)]
        set_email: Vec<String>,
        #[arg(long)]
        enable: Vec<i64>,
        #[arg(long)]
        disable: Vec<i64>,
        /// Board id to delete, repeatable.
        #[arg(long)]
        remove: Vec<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective config.
    Show,
    /// Set the API server URL.
    SetUrl { url: String },
    /// Set rows per page for `boards list`.
    SetPageSize { size: usize },
    /// Set the request timeout in seconds; 0 or nothing clears it.
    SetTimeout { secs: Option<u64> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(config::ClientConfig::default_path);
    let output = cli.output;

    match cli.command {
        Commands::Login {
            email,
            password,
            google_token,
        } => {
            if let Some(token) = google_token {
                commands::login::login("", "", Some(token.as_str()), &config_path).await?;
                return Ok(());
            }
            let email = match email {
                Some(e) => e,
                None => {
                    eprint!("Email: ");
                    let mut s = String::new();
                    std::io::stdin().read_line(&mut s)?;
                    s.trim().to_string()
                }
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            commands::login::login(&email, &password, None, &config_path).await?;
        }

        Commands::Logout => {
            commands::login::logout(&config_path)?;
        }

        Commands::Whoami => {
            commands::login::whoami(output, &config_path)?;
        }

        Commands::Boards { action } => match action {
            BoardsAction::List {
                search,
                page,
                grouped,
                mine,
            } => {
                let opts = commands::boards::ListOptions {
                    search,
                    page,
                    grouped,
                    mine,
                };
                commands::boards::list(opts, output, &config_path).await?;
            }
            BoardsAction::Add {
                count,
                email,
                floor,
                group,
            } => {
                let opts = commands::boards::AddOptions {
                    count,
                    email,
                    floor,
                    group,
                };
                commands::boards::add(opts, output, &config_path).await?;
            }
            BoardsAction::Set {
                id,
                email,
                clear_email,
                floor,
                unassign,
            } => {
                let opts = commands::boards::SetOptions {
                    email,
                    clear_email,
                    floor,
                    unassign,
                };
                commands::boards::set(id, opts, output, &config_path).await?;
            }
            BoardsAction::Toggle { id, on, off } => {
                let enabled = match (on, off) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                commands::boards::toggle(id, enabled, &config_path).await?;
            }
            BoardsAction::Delete { id, yes } => {
                commands::boards::delete(id, yes, &config_path).await?;
            }
            BoardsAction::Claim {
                board_uid,
                serial_number,
            } => {
                commands::boards::claim(&board_uid, &serial_number, output, &config_path).await?;
            }
        },

        Commands::Floors { action } => match action {
            FloorsAction::List => {
                commands::floors::list(output, &config_path).await?;
            }
            FloorsAction::Add { name } => {
                commands::floors::add(&name, &config_path).await?;
            }
            FloorsAction::Rename { id, name, remarks } => {
                commands::floors::rename(id, &name, remarks, &config_path).await?;
            }
            FloorsAction::Delete { id, cascade, yes } => {
                commands::floors::delete(id, cascade, yes, &config_path).await?;
            }
            FloorsAction::Edit {
                id,
                add,
                email,
                set_email,
                enable,
                disable,
                remove,
            } => {
                let opts = commands::floors::EditOptions {
                    add,
                    email,
                    set_email,
                    enable,
                    disable,
                    remove,
                };
                commands::floors::edit(id, opts, &config_path).await?;
            }
        },

        Commands::Export { email, out } => {
            commands::export::export(&email, out.as_deref(), &config_path).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::settings::show(&config_path)?,
            ConfigAction::SetUrl { url } => commands::settings::set_url(&url, &config_path)?,
            ConfigAction::SetPageSize { size } => {
                commands::settings::set_page_size(size, &config_path)?
            }
            ConfigAction::SetTimeout { secs } => {
                commands::settings::set_timeout(secs, &config_path)?
            }
        },

        Commands::Version => {
            println!("wattsense cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
