//! Deadline and risk notification aggregation.
//!
//! Each aggregation pass scans every task and order against a single `now`
//! and produces a fresh, ordered set of notifications. Nothing is persisted
//! or mutated in place: callers replace their previous snapshot wholesale.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::deadline;
use crate::fields::{NotificationType, Priority};
use crate::project::Project;
use crate::task::{Task, User};

/// A derived, ephemeral alert about a deadline or risk condition.
///
/// The `id` is deterministic (rule kind + source entity id) so consumers can
/// de-duplicate across refreshes.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub project_id: Option<u64>,
    pub task_id: Option<u64>,
    /// Comma-joined resolved assignee names. Ids with no matching user are
    /// dropped rather than shown raw.
    pub assigned_to: String,
    /// The triggering deadline.
    pub date: NaiveDate,
    pub priority: Priority,
}

/// Scan all tasks and orders and produce the ordered notification set.
///
/// Tasks without an end date and orders without an estimated completion are
/// skipped. Dangling user or project references degrade the display fields
/// but never drop a notification. The result is sorted by priority
/// descending, then deadline ascending.
pub fn aggregate(
    projects: &[Project],
    tasks: &[Task],
    users: &[User],
    now: NaiveDateTime,
) -> Vec<Notification> {
    let names: HashMap<u64, &str> = users.iter().map(|u| (u.id, u.name.as_str())).collect();

    let mut out = Vec::new();

    for task in tasks {
        let Some(due) = task.end_date else {
            continue;
        };
        let assigned = task
            .assigned_to
            .iter()
            .filter_map(|id| names.get(id).copied())
            .collect::<Vec<_>>()
            .join(", ");
        let days = deadline::days_until_due(due, now);

        if deadline::is_overdue(due, now) {
            out.push(Notification {
                id: format!("task-{}-overdue", task.id),
                kind: NotificationType::Error,
                title: "Task overdue".into(),
                message: format!("'{}' is {} days overdue", task.name, days.abs()),
                project_id: task.project_id,
                task_id: Some(task.id),
                assigned_to: assigned,
                date: due,
                priority: Priority::High,
            });
        } else if days == 0 {
            out.push(Notification {
                id: format!("task-{}-due-today", task.id),
                kind: NotificationType::Warning,
                title: "Task due today".into(),
                message: format!("'{}' is due today", task.name),
                project_id: task.project_id,
                task_id: Some(task.id),
                assigned_to: assigned,
                date: due,
                priority: Priority::High,
            });
        } else if (1..=3).contains(&days) {
            out.push(Notification {
                id: format!("task-{}-due-soon", task.id),
                kind: NotificationType::Warning,
                title: "Task due soon".into(),
                message: format!("'{}' is due in {} days", task.name, days),
                project_id: task.project_id,
                task_id: Some(task.id),
                assigned_to: assigned,
                date: due,
                priority: Priority::Medium,
            });
        }
    }

    for project in projects {
        let Some(due) = project.estimated_completion else {
            continue;
        };
        let progress = project.progress();
        let days = deadline::days_until_due(due, now);

        // The two rules test different predicates and may both fire for the
        // same order in one pass.
        if days <= 7 && progress < 80.0 {
            out.push(Notification {
                id: format!("project-{}-delay-risk", project.id),
                kind: NotificationType::Warning,
                title: "Delay risk".into(),
                message: format!(
                    "'{}' may miss its estimated completion at {}% progress",
                    project.project_name,
                    progress.round()
                ),
                project_id: Some(project.id),
                task_id: None,
                assigned_to: String::new(),
                date: due,
                priority: Priority::High,
            });
        }
        if deadline::is_overdue(due, now) && progress < 100.0 {
            out.push(Notification {
                id: format!("project-{}-overdue", project.id),
                kind: NotificationType::Error,
                title: "Project overdue".into(),
                message: format!(
                    "'{}' is past its estimated completion at {}% progress",
                    project.project_name,
                    progress.round()
                ),
                project_id: Some(project.id),
                task_id: None,
                assigned_to: String::new(),
                date: due,
                priority: Priority::High,
            });
        }
    }

    // Stable: equal-priority, equal-date entries keep scan order.
    out.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.date.cmp(&b.date)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TaskStatus;
    use crate::stage::Stage;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn task(id: u64, name: &str, end: Option<NaiveDate>, assigned: Vec<u64>) -> Task {
        Task {
            id,
            name: name.into(),
            project_id: None,
            assigned_to: assigned,
            end_date: end,
            priority: Priority::Medium,
            status: TaskStatus::InProgress,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn order(id: u64, name: &str, stage: Option<Stage>, due: Option<NaiveDate>) -> Project {
        Project {
            id,
            project_name: name.into(),
            order_number: None,
            current_stage: stage,
            estimated_completion: due,
            priority: Priority::Medium,
            risk_score: None,
            timeline: Vec::new(),
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn overdue_task_reports_days_late() {
        let tasks = [task(1, "X", NaiveDate::from_ymd_opt(2024, 1, 1), vec![])];
        let out = aggregate(&[], &tasks, &[], now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "task-1-overdue");
        assert_eq!(out[0].kind, NotificationType::Error);
        assert_eq!(out[0].priority, Priority::High);
        assert!(out[0].message.contains('4'), "message: {}", out[0].message);
    }

    #[test]
    fn due_today_becomes_overdue_the_next_day() {
        let due = now().date();
        let tasks = [task(1, "Fit check", Some(due), vec![])];

        let today = aggregate(&[], &tasks, &[], now());
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].id, "task-1-due-today");
        assert_eq!(today[0].kind, NotificationType::Warning);
        assert_eq!(today[0].priority, Priority::High);

        let tomorrow = aggregate(&[], &tasks, &[], now() + Duration::days(1));
        assert_eq!(tomorrow.len(), 1);
        assert_eq!(tomorrow[0].id, "task-1-overdue");
        assert_eq!(tomorrow[0].kind, NotificationType::Error);
    }

    #[test]
    fn due_soon_is_medium_priority_with_day_count() {
        let due = now().date() + Duration::days(3);
        let tasks = [task(4, "Weld frame", Some(due), vec![])];
        let out = aggregate(&[], &tasks, &[], now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "task-4-due-soon");
        assert_eq!(out[0].priority, Priority::Medium);
        assert!(out[0].message.contains("3 days"));
    }

    #[test]
    fn far_future_and_dateless_tasks_are_silent() {
        let tasks = [
            task(1, "No date", None, vec![]),
            task(2, "Far out", Some(now().date() + Duration::days(4)), vec![]),
        ];
        assert!(aggregate(&[], &tasks, &[], now()).is_empty());
    }

    #[test]
    fn assignees_resolve_and_dangling_ids_drop() {
        let users = [user(1, "Ana Kovar"), user(2, "Ben Odum")];
        let due = now().date();
        let tasks = [task(9, "Inspect", Some(due), vec![1, 99, 2])];
        let out = aggregate(&[], &tasks, &users, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].assigned_to, "Ana Kovar, Ben Odum");
    }

    #[test]
    fn at_risk_project_reports_rounded_progress() {
        let due = now().date() + Duration::days(5);
        let projects = [order(3, "Camera mast", Some(Stage::Requirements), Some(due))];
        let out = aggregate(&projects, &[], &[], now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "project-3-delay-risk");
        assert_eq!(out[0].kind, NotificationType::Warning);
        assert_eq!(out[0].priority, Priority::High);
        assert!(out[0].message.contains("13%"), "message: {}", out[0].message);
    }

    #[test]
    fn completed_project_with_comfortable_deadline_is_silent() {
        let due = now().date() + Duration::days(30);
        let projects = [order(3, "Camera mast", Some(Stage::Shipping), Some(due))];
        assert!(aggregate(&projects, &[], &[], now()).is_empty());
    }

    #[test]
    fn overdue_project_fires_both_rules() {
        let due = now().date() - Duration::days(2);
        let projects = [order(5, "Hull section", Some(Stage::Procurement), Some(due))];
        let out = aggregate(&projects, &[], &[], now());
        let ids: Vec<&str> = out.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"project-5-delay-risk"));
        assert!(ids.contains(&"project-5-overdue"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn dateless_project_is_silent_regardless_of_progress() {
        let projects = [order(6, "Backlog item", None, None)];
        assert!(aggregate(&projects, &[], &[], now()).is_empty());
    }

    #[test]
    fn output_is_ordered_by_priority_then_date() {
        let d = |off: i64| now().date() + Duration::days(off);
        let tasks = [
            task(1, "soon-late", Some(d(3)), vec![]),
            task(2, "soon-early", Some(d(1)), vec![]),
            task(3, "overdue", Some(d(-2)), vec![]),
            task(4, "today", Some(d(0)), vec![]),
        ];
        let out = aggregate(&[], &tasks, &[], now());
        assert_eq!(out.len(), 4);
        for pair in out.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].date <= pair[1].date);
            }
        }
        // High-priority group first (overdue then today by date), then medium.
        assert_eq!(out[0].id, "task-3-overdue");
        assert_eq!(out[1].id, "task-4-due-today");
        assert_eq!(out[3].priority, Priority::Medium);
    }
}
