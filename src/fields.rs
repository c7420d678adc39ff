//! Enumerations and field types shared across orders, tasks, and notifications.
//!
//! This module defines the structured value types used to categorise records:
//! priorities, task statuses, notification severities, and the sort/filter
//! options accepted by the list commands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification shared by orders, tasks, and notifications.
///
/// Variants are declared lowest-first so that `Ord` ranks `High` above
/// `Medium` above `Low`, which the notification sort relies on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task has reached a closed state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Severity of a derived notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Error,
    Warning,
    Info,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Due,
    Priority,
    Id,
}

/// Filtering options for tasks based on end dates.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
    None,
}

/// Sorting options for the project list.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProjectSortKey {
    Due,
    Progress,
    Risk,
    Id,
}
