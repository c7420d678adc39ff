//! # OTR - R&D Order Tracking CLI
//!
//! A command-line tool for tracking R&D orders through a fixed manufacturing
//! pipeline, with deadline alerts, risk flagging, and a dashboard TUI.
//!
//! ## Key Features
//!
//! - **Pipeline Tracking**: Orders move through an eight-stage lifecycle
//!   (Requirements → ... → Shipping); progress is derived from stage position
//! - **Deadline Rules**: Calendar-day overdue detection, due-today and
//!   due-soon bands for tasks and orders
//! - **Risk Flagging**: Orders near their estimated completion with low
//!   progress are flagged before they slip
//! - **Notification Center**: A recomputed-on-demand, priority-ordered alert
//!   feed over all orders and tasks
//! - **Multiple Interfaces**: Full CLI for automation + dashboard TUI
//! - **Local File Storage**: A single JSON database file with CSV export
//!
//! ## Quick Start
//!
//! ```bash
//! # Create an order and walk it down the pipeline
//! otr project add "Camera mast" --order-number RD-2024-117 --due 2024-09-01
//! otr project advance RD-2024-117
//!
//! # Add a task against it
//! otr add "Fit check" --project RD-2024-117 --assign "Ana Kovar" --due "in 3d"
//!
//! # What needs attention?
//! otr notifications
//! otr risks
//!
//! # Or watch it live
//! otr ui
//! ```
//!
//! Data is stored locally in `~/.otr/orders.json`. We recommend you source
//! control this folder via `git init` and back it up periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod deadline;
pub mod fields;
pub mod notify;
pub mod project;
pub mod risk;
pub mod stage;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    let cli = Cli::parse();

    // Completions don't need a database at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let otr_dir = PathBuf::from(home).join(".otr");
        if let Err(e) = std::fs::create_dir_all(&otr_dir) {
            eprintln!("Failed to create data directory {}: {}", otr_dir.display(), e);
            std::process::exit(1);
        }
        otr_dir.join("orders.json")
    });

    if let Commands::Ui = cli.command {
        cmd_ui(&db_path);
        return;
    }

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Ui => unreachable!("UI command handled above"),
        Commands::Completions { .. } => unreachable!("Completions handled above"),

        Commands::Project { action } => cmd_project(&mut db, &db_path, action),

        Commands::User { action } => cmd_user(&mut db, &db_path, action),

        Commands::Add { name, project, assign, due, priority, status } =>
            cmd_add(&mut db, &db_path, name, project, assign, due, priority, status),

        Commands::List { all, status, project, due, sort, limit } =>
            cmd_list(&db, all, status, project, due, sort, limit),

        Commands::View { id } => cmd_view(&db, id),

        Commands::Update {
            id, name, project, due, status, priority, assign, unassign,
            clear_due, clear_project,
        } => cmd_update(&mut db, &db_path, id, name, project, due, status, priority,
                        assign, unassign, clear_due, clear_project),

        Commands::Complete { id } => cmd_complete(&mut db, &db_path, id),

        Commands::Reopen { id } => cmd_reopen(&mut db, &db_path, id),

        Commands::Delete { id } => cmd_delete(&mut db, &db_path, id),

        Commands::Notifications { limit } => cmd_notifications(&db, limit),

        Commands::Risks => cmd_risks(&db),

        Commands::Export { output, at_risk } => cmd_export(&db, output, at_risk),
    }
}
