//! Database operations and utility functions for order tracking.
//!
//! This module provides the `Database` struct holding the order, task, and
//! user collections, along with date parsing, formatting, validation, and
//! table printing helpers used by the CLI commands.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::deadline;
use crate::fields::*;
use crate::project::Project;
use crate::risk::{self, RiskLevel};
use crate::stage::Stage;
use crate::task::{Task, User};

/// In-memory database for orders, tasks, and the user directory.
///
/// Every collection defaults independently, so a partial or hand-edited file
/// degrades to empty collections rather than failing the whole load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if the
    /// file doesn't exist or can't be read.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available order ID.
    pub fn next_project_id(&self) -> u64 {
        self.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available task ID.
    pub fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available user ID.
    pub fn next_user_id(&self) -> u64 {
        self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// Get an order by ID.
    pub fn get_project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Get a mutable reference to an order by ID.
    pub fn get_project_mut(&mut self, id: u64) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// Resolve an order identifier (either ID or name) to an order ID.
/// Returns an error if the name has multiple matches and suggests using ID.
pub fn resolve_project_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return if db.get_project(id).is_some() {
            Ok(id)
        } else {
            Err(format!("Order with ID {} not found", id))
        };
    }

    let matches: Vec<&Project> = db
        .projects
        .iter()
        .filter(|p| {
            p.project_name.eq_ignore_ascii_case(identifier)
                || p.order_number.as_deref() == Some(identifier)
        })
        .collect();

    match matches.len() {
        0 => Err(format!("No order found matching '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("Multiple orders found matching '{}':\n", identifier);
            for p in matches {
                msg.push_str(&format!(
                    "  ID {}: {} ({})\n",
                    p.id,
                    p.project_name,
                    p.order_number.as_deref().unwrap_or("-")
                ));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

/// Resolve a task identifier (either ID or name) to a task ID.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return if db.get_task(id).is_some() {
            Ok(id)
        } else {
            Err(format!("Task with ID {} not found", id))
        };
    }

    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| t.name.eq_ignore_ascii_case(identifier))
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("Multiple tasks found with name '{}':\n", identifier);
            for t in matches {
                msg.push_str(&format!("  ID {}: {}\n", t.id, t.name));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

/// Resolve a user identifier (either ID or name) to a user ID.
pub fn resolve_user_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return if db.get_user(id).is_some() {
            Ok(id)
        } else {
            Err(format!("User with ID {} not found", id))
        };
    }

    let matches: Vec<&User> = db
        .users
        .iter()
        .filter(|u| u.name.eq_ignore_ascii_case(identifier))
        .collect();

    match matches.len() {
        0 => Err(format!("No user found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => Err(format!(
            "Multiple users found with name '{}'. Please use the specific ID instead.",
            identifier
        )),
    }
}

/// Parse due date input for the CLI.
///
/// Supports:
/// - "today", "tomorrow"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    deadline::parse_deadline(&s)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Format a pipeline stage for display.
pub fn format_stage(s: Option<Stage>) -> &'static str {
    match s {
        Some(Stage::Requirements) => "Requirements",
        Some(Stage::StructuralDesign) => "Structural Design",
        Some(Stage::DetailDesign) => "Detail Design",
        Some(Stage::Procurement) => "Procurement",
        Some(Stage::Manufacturing) => "Manufacturing",
        Some(Stage::Assembly) => "Assembly",
        Some(Stage::Testing) => "Testing",
        Some(Stage::Shipping) => "Shipping",
        None => "-",
    }
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

/// Format a task status for display.
pub fn format_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Pending => "Pending",
        TaskStatus::InProgress => "InProgress",
        TaskStatus::Completed => "Completed",
        TaskStatus::Cancelled => "Cancelled",
    }
}

/// Format a notification severity for display.
pub fn format_notification_type(t: NotificationType) -> &'static str {
    match t {
        NotificationType::Error => "ERROR",
        NotificationType::Warning => "WARN",
        NotificationType::Info => "INFO",
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print orders in a formatted table with derived progress and risk columns.
pub fn print_project_table(projects: &[&Project], now: NaiveDateTime) {
    println!(
        "{:<5} {:<12} {:<18} {:<9} {:<12} {:<8} {:<10} {}",
        "ID", "Order#", "Stage", "Progress", "Due", "At-risk", "Risk", "Name"
    );
    let today = now.date();
    for p in projects {
        let at_risk = if risk::is_at_risk(p, now) { "yes" } else { "-" };
        let level = p
            .risk_score
            .map(|s| RiskLevel::from_score(s).as_str())
            .unwrap_or("-");
        println!(
            "{:<5} {:<12} {:<18} {:<9} {:<12} {:<8} {:<10} {}",
            p.id,
            truncate(p.order_number.as_deref().unwrap_or("-"), 12),
            format_stage(p.current_stage),
            format!("{}%", p.progress().round()),
            format_due_relative(p.estimated_completion, today),
            at_risk,
            level,
            p.project_name,
        );
    }
}

/// Print tasks in a formatted table with resolved order names.
pub fn print_task_table(tasks: &[&Task], db: &Database, now: NaiveDateTime) {
    println!(
        "{:<5} {:<11} {:<8} {:<12} {:<10} {:<16} {}",
        "ID", "Status", "Pri", "End", "Band", "Order", "Name"
    );
    let today = now.date();
    for t in tasks {
        let band = if t.end_date.is_some() {
            deadline::classify(t.end_date, now).as_str()
        } else {
            "-"
        };
        let order = t
            .project_id
            .and_then(|id| db.get_project(id))
            .map(|p| p.project_name.as_str())
            .unwrap_or("-");
        println!(
            "{:<5} {:<11} {:<8} {:<12} {:<10} {:<16} {}",
            t.id,
            format_status(t.status),
            format_priority(t.priority),
            format_due_relative(t.end_date, today),
            band,
            truncate(order, 16),
            t.name,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use crate::task::Task;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_due_input_forms() {
        let today = day(2024, 3, 10);
        assert_eq!(parse_due_input("today", today), Some(today));
        assert_eq!(parse_due_input("tomorrow", today), Some(day(2024, 3, 11)));
        assert_eq!(parse_due_input("in 3d", today), Some(day(2024, 3, 13)));
        assert_eq!(parse_due_input("in 2w", today), Some(day(2024, 3, 24)));
        assert_eq!(parse_due_input("2024-04-01", today), Some(day(2024, 4, 1)));
        assert_eq!(parse_due_input("whenever", today), None);
    }

    #[test]
    fn format_due_relative_bands() {
        let today = day(2024, 3, 10);
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(Some(day(2024, 3, 11)), today), "tomorrow");
        assert_eq!(format_due_relative(Some(day(2024, 3, 14)), today), "in 4d");
        assert_eq!(format_due_relative(Some(day(2024, 3, 8)), today), "2d late");
    }

    #[test]
    fn ids_allocate_from_max() {
        let mut db = Database::default();
        assert_eq!(db.next_task_id(), 1);
        db.tasks.push(Task {
            id: 41,
            name: "t".into(),
            project_id: None,
            assigned_to: Vec::new(),
            end_date: None,
            priority: Priority::Low,
            status: TaskStatus::Pending,
            created_at_utc: 0,
            updated_at_utc: 0,
        });
        assert_eq!(db.next_task_id(), 42);
    }

    #[test]
    fn missing_collections_default_empty() {
        let db: Database = serde_json::from_str(r#"{"tasks": []}"#).unwrap();
        assert!(db.projects.is_empty());
        assert!(db.users.is_empty());
    }

    #[test]
    fn resolve_task_by_name_is_case_insensitive() {
        let mut db = Database::default();
        db.tasks.push(Task {
            id: 3,
            name: "Fit Check".into(),
            project_id: None,
            assigned_to: Vec::new(),
            end_date: None,
            priority: Priority::Low,
            status: TaskStatus::Pending,
            created_at_utc: 0,
            updated_at_utc: 0,
        });
        assert_eq!(resolve_task_identifier("fit check", &db), Ok(3));
        assert_eq!(resolve_task_identifier("3", &db), Ok(3));
        assert!(resolve_task_identifier("missing", &db).is_err());
    }
}
