//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands, from order and task CRUD to the derived notification and
//! risk reports and the dashboard TUI.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};

use crate::db::*;
use crate::fields::*;
use crate::notify;
use crate::project::Project;
use crate::risk::{self, RiskLevel};
use crate::stage::Stage;
use crate::task::{Task, User};
use crate::tui::run::run_dashboard_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the dashboard interface.
    Ui,

    /// Manage orders.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage the user directory.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Add a new task.
    Add {
        /// Short name for the task.
        name: String,
        /// Order ID, name, or order number to attach the task to.
        #[arg(long)]
        project: Option<String>,
        /// Assignee user ID or name. May be repeated.
        #[arg(long = "assign")]
        assign: Vec<String>,
        /// End date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Status: pending | in_progress | completed | cancelled.
        #[arg(long, value_enum, default_value_t = TaskStatus::Pending)]
        status: TaskStatus,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed and cancelled tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        /// Filter by order (ID, name, or order number).
        #[arg(long)]
        project: Option<String>,
        /// Due filter: today | this-week | overdue | none.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or name.
    View {
        /// Task ID or name to view.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or name to update.
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Order ID, name, or order number.
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Add an assignee (user ID or name). May be repeated.
        #[arg(long = "assign")]
        assign: Vec<String>,
        /// Remove an assignee (user ID or name). May be repeated.
        #[arg(long = "unassign")]
        unassign: Vec<String>,
        /// Clear end date.
        #[arg(long)]
        clear_due: bool,
        /// Detach from its order.
        #[arg(long)]
        clear_project: bool,
    },

    /// Mark a task completed.
    Complete {
        /// Task ID or name to complete.
        id: String,
    },

    /// Reopen a task (status pending).
    Reopen {
        /// Task ID or name to reopen.
        id: String,
    },

    /// Delete a task by ID or name.
    Delete {
        /// Task ID or name to delete.
        id: String,
    },

    /// Print the current deadline and risk notifications.
    Notifications {
        /// Limit number of notifications printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List orders currently at risk.
    Risks,

    /// Export orders to CSV format.
    Export {
        /// Output file path (default: orders.csv).
        #[arg(long, short)]
        output: Option<String>,
        /// Export only at-risk orders.
        #[arg(long)]
        at_risk: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a new order.
    Add {
        /// Order name.
        name: String,
        /// Order number (e.g. RD-2024-117).
        #[arg(long)]
        order_number: Option<String>,
        /// Estimated completion: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Initial pipeline stage.
        #[arg(long, value_enum)]
        stage: Option<Stage>,
    },
    /// List orders with derived progress and risk.
    List {
        /// Show only at-risk orders.
        #[arg(long)]
        at_risk: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = ProjectSortKey::Due)]
        sort: ProjectSortKey,
    },
    /// Advance an order to the next pipeline stage.
    Advance {
        /// Order ID, name, or order number.
        id: String,
    },
    /// Update fields on an order.
    Update {
        /// Order ID, name, or order number.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        order_number: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Set the pipeline stage directly (no timeline entry).
        #[arg(long, value_enum)]
        stage: Option<Stage>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Risk score from the external scoring system (0-100).
        #[arg(long)]
        risk_score: Option<f64>,
        /// Clear estimated completion.
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete an order.
    Delete {
        /// Order ID, name, or order number.
        id: String,
        /// Also delete the order's tasks instead of detaching them.
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Add a user to the directory.
    Add {
        /// Display name.
        name: String,
    },
    /// List users.
    List,
}

/// Launch the dashboard terminal user interface.
pub fn cmd_ui(db_path: &Path) {
    if let Err(e) = run_dashboard_tui(db_path) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

fn resolve_or_exit<F>(f: F) -> u64
where
    F: FnOnce() -> Result<u64, String>,
{
    match f() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
}

fn parse_due_or_exit(input: &str, today: NaiveDate) -> NaiveDate {
    match parse_due_input(input, today) {
        Some(d) => d,
        None => {
            eprintln!("Unrecognised date '{}'. Use YYYY-MM-DD, today, tomorrow, or in Nd.", input);
            std::process::exit(1);
        }
    }
}

/// Add a new task to the database.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    name: String,
    project: Option<String>,
    assign: Vec<String>,
    due: Option<String>,
    priority: Priority,
    status: TaskStatus,
) {
    let today = Local::now().date_naive();
    let now_utc = Utc::now().timestamp();
    let id = db.next_task_id();

    let project_id = project.map(|p| resolve_or_exit(|| resolve_project_identifier(&p, db)));
    let assigned_to: Vec<u64> = assign
        .iter()
        .map(|a| resolve_or_exit(|| resolve_user_identifier(a, db)))
        .collect();
    let end_date = due.map(|d| parse_due_or_exit(&d, today));

    db.tasks.push(Task {
        id,
        name,
        project_id,
        assigned_to,
        end_date,
        priority,
        status,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
    });
    save_or_exit(db, db_path);
    println!("Added task {}", id);
}

/// List tasks with optional filtering and sorting.
pub fn cmd_list(
    db: &Database,
    all: bool,
    status: Option<TaskStatus>,
    project: Option<String>,
    due: Option<DueFilter>,
    sort: SortKey,
    limit: Option<usize>,
) {
    let now = Local::now().naive_local();
    let today = now.date();
    let project_id = project.map(|p| resolve_or_exit(|| resolve_project_identifier(&p, db)));

    let mut filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if !all && t.status.is_terminal() {
                return false;
            }
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if let Some(pid) = project_id {
                if t.project_id != Some(pid) {
                    return false;
                }
            }
            if let Some(df) = due {
                match df {
                    DueFilter::Today => {
                        if t.end_date != Some(today) {
                            return false;
                        }
                    }
                    DueFilter::ThisWeek => match t.end_date {
                        Some(d) => {
                            let delta = (d - today).num_days();
                            if !(0..=6).contains(&delta) {
                                return false;
                            }
                        }
                        None => return false,
                    },
                    DueFilter::Overdue => match t.end_date {
                        Some(d) => {
                            if !crate::deadline::is_overdue(d, now) {
                                return false;
                            }
                        }
                        None => return false,
                    },
                    DueFilter::None => {
                        if t.end_date.is_some() {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .collect();

    match sort {
        SortKey::Due => filtered.sort_by_key(|t| (t.end_date.unwrap_or(NaiveDate::MAX), t.id)),
        // High priority first; id keeps the sort stable across runs.
        SortKey::Priority => filtered.sort_by_key(|t| (std::cmp::Reverse(t.priority), t.id)),
        SortKey::Id => filtered.sort_by_key(|t| t.id),
    }

    if let Some(n) = limit {
        filtered.truncate(n);
    }

    print_task_table(&filtered, db, now);
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String) {
    let task_id = resolve_or_exit(|| resolve_task_identifier(&id, db));
    let Some(task) = db.get_task(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let now = Local::now().naive_local();
    let today = now.date();

    let order = task
        .project_id
        .and_then(|pid| db.get_project(pid))
        .map(|p| format!("{} (#{})", p.project_name, p.id))
        .unwrap_or_else(|| "-".into());
    let assignees = task
        .assigned_to
        .iter()
        .filter_map(|uid| db.get_user(*uid))
        .map(|u| u.name.clone())
        .collect::<Vec<_>>()
        .join(", ");

    println!("ID:           {}", task.id);
    println!("Name:         {}", task.name);
    println!("Status:       {}", format_status(task.status));
    println!("Priority:     {}", format_priority(task.priority));
    println!("Order:        {}", order);
    println!(
        "End date:     {}",
        match task.end_date {
            Some(d) => format!(
                "{d} ({}, {})",
                format_due_relative(Some(d), today),
                crate::deadline::classify(Some(d), now).as_str()
            ),
            None => "-".into(),
        }
    );
    println!(
        "Assignees:    {}",
        if assignees.is_empty() { "-".into() } else { assignees }
    );
    println!(
        "Created UTC:  {}",
        Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339()
    );
    println!(
        "Updated UTC:  {}",
        Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339()
    );
}

/// Update an existing task's fields.
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    name: Option<String>,
    project: Option<String>,
    due: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<Priority>,
    assign: Vec<String>,
    unassign: Vec<String>,
    clear_due: bool,
    clear_project: bool,
) {
    let task_id = resolve_or_exit(|| resolve_task_identifier(&id, db));
    let today = Local::now().date_naive();

    let project_id = project.map(|p| resolve_or_exit(|| resolve_project_identifier(&p, db)));
    let add_ids: Vec<u64> = assign
        .iter()
        .map(|a| resolve_or_exit(|| resolve_user_identifier(a, db)))
        .collect();
    let rm_ids: Vec<u64> = unassign
        .iter()
        .map(|a| resolve_or_exit(|| resolve_user_identifier(a, db)))
        .collect();
    let end_date = due.map(|d| parse_due_or_exit(&d, today));

    let Some(task) = db.get_task_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };

    if let Some(n) = name {
        task.name = n;
    }
    if let Some(pid) = project_id {
        task.project_id = Some(pid);
    }
    if clear_project {
        task.project_id = None;
    }
    if let Some(d) = end_date {
        task.end_date = Some(d);
    }
    if clear_due {
        task.end_date = None;
    }
    if let Some(s) = status {
        task.status = s;
    }
    if let Some(p) = priority {
        task.priority = p;
    }
    for uid in add_ids {
        if !task.assigned_to.contains(&uid) {
            task.assigned_to.push(uid);
        }
    }
    task.assigned_to.retain(|uid| !rm_ids.contains(uid));
    task.updated_at_utc = Utc::now().timestamp();

    save_or_exit(db, db_path);
    println!("Updated task {}", task_id);
}

/// Mark a task completed.
pub fn cmd_complete(db: &mut Database, db_path: &Path, id: String) {
    set_task_status(db, db_path, id, TaskStatus::Completed, "Completed");
}

/// Reopen a task.
pub fn cmd_reopen(db: &mut Database, db_path: &Path, id: String) {
    set_task_status(db, db_path, id, TaskStatus::Pending, "Reopened");
}

fn set_task_status(db: &mut Database, db_path: &Path, id: String, status: TaskStatus, verb: &str) {
    let task_id = resolve_or_exit(|| resolve_task_identifier(&id, db));
    let Some(task) = db.get_task_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    task.status = status;
    task.updated_at_utc = Utc::now().timestamp();
    save_or_exit(db, db_path);
    println!("{} task {}", verb, task_id);
}

/// Delete a task.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String) {
    let task_id = resolve_or_exit(|| resolve_task_identifier(&id, db));
    db.tasks.retain(|t| t.id != task_id);
    save_or_exit(db, db_path);
    println!("Deleted task {}", task_id);
}

/// Handle the `project` subcommands.
pub fn cmd_project(db: &mut Database, db_path: &Path, action: ProjectAction) {
    match action {
        ProjectAction::Add {
            name,
            order_number,
            due,
            priority,
            stage,
        } => {
            let today = Local::now().date_naive();
            let now_utc = Utc::now().timestamp();
            let id = db.next_project_id();
            let estimated_completion = due.map(|d| parse_due_or_exit(&d, today));
            db.projects.push(Project {
                id,
                project_name: name,
                order_number,
                current_stage: stage,
                estimated_completion,
                priority,
                risk_score: None,
                timeline: Vec::new(),
                created_at_utc: now_utc,
                updated_at_utc: now_utc,
            });
            save_or_exit(db, db_path);
            println!("Added order {}", id);
        }
        ProjectAction::List { at_risk, sort } => {
            let now = Local::now().naive_local();
            let mut filtered: Vec<&Project> = db
                .projects
                .iter()
                .filter(|p| !at_risk || risk::is_at_risk(p, now))
                .collect();
            match sort {
                ProjectSortKey::Due => filtered
                    .sort_by_key(|p| (p.estimated_completion.unwrap_or(NaiveDate::MAX), p.id)),
                ProjectSortKey::Progress => {
                    filtered.sort_by(|a, b| {
                        a.progress()
                            .partial_cmp(&b.progress())
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.id.cmp(&b.id))
                    });
                }
                ProjectSortKey::Risk => {
                    // Highest score first; unscored orders sink to the bottom.
                    filtered.sort_by(|a, b| {
                        b.risk_score
                            .unwrap_or(-1.0)
                            .partial_cmp(&a.risk_score.unwrap_or(-1.0))
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.id.cmp(&b.id))
                    });
                }
                ProjectSortKey::Id => filtered.sort_by_key(|p| p.id),
            }
            print_project_table(&filtered, now);
        }
        ProjectAction::Advance { id } => {
            let project_id = resolve_or_exit(|| resolve_project_identifier(&id, db));
            let today = Local::now().date_naive();
            let Some(project) = db.get_project_mut(project_id) else {
                eprintln!("Order {} not found.", project_id);
                std::process::exit(1);
            };
            match project.advance(today) {
                Some(stage) => {
                    project.updated_at_utc = Utc::now().timestamp();
                    let progress = project.progress();
                    save_or_exit(db, db_path);
                    println!(
                        "Order {} advanced to {} ({}%)",
                        project_id,
                        format_stage(Some(stage)),
                        progress.round()
                    );
                }
                None => {
                    eprintln!("Order {} is already at the end of the pipeline.", project_id);
                    std::process::exit(1);
                }
            }
        }
        ProjectAction::Update {
            id,
            name,
            order_number,
            due,
            stage,
            priority,
            risk_score,
            clear_due,
        } => {
            let project_id = resolve_or_exit(|| resolve_project_identifier(&id, db));
            let today = Local::now().date_naive();
            let estimated_completion = due.map(|d| parse_due_or_exit(&d, today));
            let Some(project) = db.get_project_mut(project_id) else {
                eprintln!("Order {} not found.", project_id);
                std::process::exit(1);
            };
            if let Some(n) = name {
                project.project_name = n;
            }
            if let Some(o) = order_number {
                project.order_number = Some(o);
            }
            if let Some(d) = estimated_completion {
                project.estimated_completion = Some(d);
            }
            if clear_due {
                project.estimated_completion = None;
            }
            if let Some(s) = stage {
                project.current_stage = Some(s);
            }
            if let Some(p) = priority {
                project.priority = p;
            }
            if let Some(r) = risk_score {
                project.risk_score = Some(r);
            }
            project.updated_at_utc = Utc::now().timestamp();
            save_or_exit(db, db_path);
            println!("Updated order {}", project_id);
        }
        ProjectAction::Delete { id, cascade } => {
            let project_id = resolve_or_exit(|| resolve_project_identifier(&id, db));
            db.projects.retain(|p| p.id != project_id);
            if cascade {
                db.tasks.retain(|t| t.project_id != Some(project_id));
            } else {
                for t in db.tasks.iter_mut() {
                    if t.project_id == Some(project_id) {
                        t.project_id = None;
                    }
                }
            }
            save_or_exit(db, db_path);
            println!("Deleted order {}", project_id);
        }
    }
}

/// Handle the `user` subcommands.
pub fn cmd_user(db: &mut Database, db_path: &Path, action: UserAction) {
    match action {
        UserAction::Add { name } => {
            let id = db.next_user_id();
            db.users.push(User { id, name });
            save_or_exit(db, db_path);
            println!("Added user {}", id);
        }
        UserAction::List => {
            println!("{:<5} {}", "ID", "Name");
            for u in &db.users {
                println!("{:<5} {}", u.id, u.name);
            }
        }
    }
}

/// Print the current deadline and risk notifications.
pub fn cmd_notifications(db: &Database, limit: Option<usize>) {
    let now = Local::now().naive_local();
    let mut notifications = notify::aggregate(&db.projects, &db.tasks, &db.users, now);
    let total = notifications.len();
    if let Some(n) = limit {
        notifications.truncate(n);
    }

    if notifications.is_empty() {
        println!("No notifications.");
        return;
    }
    for n in &notifications {
        let who = if n.assigned_to.is_empty() {
            String::new()
        } else {
            format!(" [{}]", n.assigned_to)
        };
        println!(
            "{:<6} {:<7} {:<12} {}: {}{}",
            format_notification_type(n.kind),
            format_priority(n.priority),
            n.date.to_string(),
            n.title,
            n.message,
            who,
        );
    }
    if notifications.len() < total {
        println!("... and {} more", total - notifications.len());
    }
}

/// List orders currently at risk.
pub fn cmd_risks(db: &Database) {
    let now = Local::now().naive_local();
    let at_risk: Vec<&Project> = db
        .projects
        .iter()
        .filter(|p| risk::is_at_risk(p, now))
        .collect();
    if at_risk.is_empty() {
        println!("No orders at risk.");
        return;
    }
    print_project_table(&at_risk, now);
}

/// Export orders to CSV with derived progress and risk columns.
pub fn cmd_export(db: &Database, output: Option<String>, at_risk: bool) {
    let output_path = output.unwrap_or_else(|| "orders.csv".to_string());
    let now = Local::now().naive_local();

    let projects: Vec<&Project> = db
        .projects
        .iter()
        .filter(|p| !at_risk || risk::is_at_risk(p, now))
        .collect();

    let escape_csv = |s: &str| {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    };

    let mut csv_content = String::new();
    csv_content.push_str(
        "ID,OrderNumber,Name,Stage,Progress,EstimatedCompletion,DaysRemaining,AtRisk,RiskScore,RiskLevel,Priority,CreatedUTC,UpdatedUTC\n",
    );

    for p in &projects {
        let due = p
            .estimated_completion
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        let days = p
            .estimated_completion
            .map(|d| crate::deadline::days_until_due(d, now).to_string())
            .unwrap_or_else(|| "-".into());
        let score = p
            .risk_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        let level = p
            .risk_score
            .map(|s| RiskLevel::from_score(s).as_str())
            .unwrap_or("-");
        let created = Utc.timestamp_opt(p.created_at_utc, 0).single().unwrap().to_rfc3339();
        let updated = Utc.timestamp_opt(p.updated_at_utc, 0).single().unwrap().to_rfc3339();

        csv_content.push_str(&format!(
            "{},{},{},{},{}%,{},{},{},{},{},{},{},{}\n",
            p.id,
            escape_csv(p.order_number.as_deref().unwrap_or("-")),
            escape_csv(&p.project_name),
            format_stage(p.current_stage),
            p.progress().round(),
            due,
            days,
            if risk::is_at_risk(p, now) { "yes" } else { "no" },
            score,
            level,
            format_priority(p.priority),
            created,
            updated,
        ));
    }

    match std::fs::write(&output_path, csv_content) {
        Ok(_) => println!("Exported {} orders to {}", projects.len(), output_path),
        Err(e) => {
            eprintln!("Failed to write {}: {}", output_path, e);
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
