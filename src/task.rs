//! Task and user records.
//!
//! Tasks are work items optionally linked to an order and assigned to users
//! by id. A task with no end date never participates in deadline rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::deadline;
use crate::fields::{Priority, TaskStatus};

/// A work item with deadline and assignment metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub assigned_to: Vec<u64>,
    #[serde(default, deserialize_with = "deadline::lenient_date")]
    pub end_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// An assignable person, referenced from `Task::assigned_to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}
