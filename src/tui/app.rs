//! Dashboard interface: order board and notification center.
//!
//! The dashboard owns the current notification snapshot. A refresh reloads
//! the database, reads the clock once, and recomputes the whole snapshot;
//! nothing is updated incrementally.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame, Terminal,
};

use crate::db::{
    format_due_relative, format_notification_type, format_priority, format_stage, Database,
};
use crate::fields::NotificationType;
use crate::notify::{self, Notification};
use crate::risk::{self, RiskLevel};
use crate::stage::Stage;
use crate::tui::colors::{DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD};
use crate::tui::utils::centered_rect;

/// Which pane currently has focus.
#[derive(Clone, Copy, PartialEq)]
enum View {
    Projects,
    Notifications,
}

/// Main dashboard application state.
pub struct DashboardApp {
    db: Database,
    db_path: PathBuf,
    now: NaiveDateTime,
    notifications: Vec<Notification>,
    view: View,
    project_state: TableState,
    notification_state: ListState,
    show_detail: bool,
    status_message: String,
    should_exit: bool,
}

impl DashboardApp {
    /// Create a new dashboard, loading the database and computing the first
    /// snapshot.
    pub fn new(db_path: &Path) -> Self {
        let mut app = DashboardApp {
            db: Database::default(),
            db_path: db_path.to_path_buf(),
            now: Local::now().naive_local(),
            notifications: Vec::new(),
            view: View::Projects,
            project_state: TableState::default(),
            notification_state: ListState::default(),
            show_detail: false,
            status_message: String::new(),
            should_exit: false,
        };
        app.refresh();
        app
    }

    /// Reload the database and replace the notification snapshot wholesale.
    fn refresh(&mut self) {
        self.db = Database::load(&self.db_path);
        self.now = Local::now().naive_local();
        self.notifications =
            notify::aggregate(&self.db.projects, &self.db.tasks, &self.db.users, self.now);

        // Keep selections in range after the reload.
        let plen = self.db.projects.len();
        match self.project_state.selected() {
            Some(i) if i >= plen && plen > 0 => self.project_state.select(Some(plen - 1)),
            None if plen > 0 => self.project_state.select(Some(0)),
            _ => {}
        }
        let nlen = self.notifications.len();
        match self.notification_state.selected() {
            Some(i) if i >= nlen && nlen > 0 => self.notification_state.select(Some(nlen - 1)),
            None if nlen > 0 => self.notification_state.select(Some(0)),
            _ => {}
        }
    }

    fn selected_len(&self) -> usize {
        match self.view {
            View::Projects => self.db.projects.len(),
            View::Notifications => self.notifications.len(),
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.selected_len();
        if len == 0 {
            return;
        }
        let state = match self.view {
            View::Projects => self.project_state.selected(),
            View::Notifications => self.notification_state.selected(),
        };
        let current = state.unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, len as i64 - 1) as usize;
        match self.view {
            View::Projects => self.project_state.select(Some(next)),
            View::Notifications => self.notification_state.select(Some(next)),
        }
    }

    /// Handle keyboard input. Polling doubles as the idle tick.
    fn handle_input(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                self.status_message.clear();
                match key.code {
                    KeyCode::Char('q') => {
                        if self.show_detail {
                            self.show_detail = false;
                        } else {
                            self.should_exit = true;
                        }
                    }
                    KeyCode::Esc => {
                        if self.show_detail {
                            self.show_detail = false;
                        } else {
                            self.should_exit = true;
                        }
                    }
                    KeyCode::Tab => {
                        self.show_detail = false;
                        self.view = match self.view {
                            View::Projects => View::Notifications,
                            View::Notifications => View::Projects,
                        };
                    }
                    KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
                    KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
                    KeyCode::Enter => {
                        if self.view == View::Projects && self.project_state.selected().is_some() {
                            self.show_detail = true;
                        }
                    }
                    KeyCode::Char('r') => {
                        self.refresh();
                        self.status_message = "Refreshed".into();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.view {
            View::Projects => self.render_projects(f, chunks[1]),
            View::Notifications => self.render_notifications(f, chunks[1]),
        }
        self.render_status_bar(f, chunks[2]);

        if self.show_detail {
            self.render_detail_popup(f, f.area());
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        // Display badge caps at 9+; the snapshot itself is never truncated.
        let count = self.notifications.len();
        let badge = if count > 9 {
            "9+".to_string()
        } else {
            count.to_string()
        };
        let title = Line::from(vec![
            Span::styled(
                " OTR Dashboard ",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "— {} orders, {} tasks — alerts: ",
                self.db.projects.len(),
                self.db.tasks.len()
            )),
            Span::styled(
                badge,
                Style::default()
                    .fg(if count == 0 { Color::White } else { GOLD })
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        let header = Paragraph::new(title)
            .block(Block::default().borders(Borders::ALL).style(Style::default().bg(DARK_PURPLE)))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_projects(&mut self, f: &mut Frame, area: Rect) {
        let header_cells = ["ID", "Order#", "Stage", "Progress", "Due", "Risk", "Name"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells)
            .style(Style::default().bg(DARK_GREEN).fg(Color::White))
            .height(1);

        let today = self.now.date();
        let rows: Vec<Row> = self
            .db
            .projects
            .iter()
            .map(|p| {
                let at_risk = risk::is_at_risk(p, self.now);
                let level = p
                    .risk_score
                    .map(|s| RiskLevel::from_score(s).as_str())
                    .unwrap_or("-");
                let style = if at_risk {
                    Style::default().fg(DARK_RED).add_modifier(Modifier::BOLD)
                } else if p.current_stage == Some(Stage::Shipping) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                };
                Row::new(vec![
                    Cell::from(p.id.to_string()),
                    Cell::from(p.order_number.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(format_stage(p.current_stage)),
                    Cell::from(format!("{}%", p.progress().round())),
                    Cell::from(format_due_relative(p.estimated_completion, today)),
                    Cell::from(level),
                    Cell::from(p.project_name.clone()),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(4),  // ID
            Constraint::Length(12), // Order#
            Constraint::Length(18), // Stage
            Constraint::Length(9),  // Progress
            Constraint::Length(10), // Due
            Constraint::Length(11), // Risk
            Constraint::Min(20),    // Name
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Orders ({}) - Tab: notifications, Enter: detail",
                self.db.projects.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.project_state);
    }

    fn render_notifications(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .notifications
            .iter()
            .map(|n| {
                let severity_color = match n.kind {
                    NotificationType::Error => DARK_RED,
                    NotificationType::Warning => GOLD,
                    NotificationType::Info => Color::White,
                };
                let who = if n.assigned_to.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", n.assigned_to)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<6}", format_notification_type(n.kind)),
                        Style::default().fg(severity_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("{:<7} ", format_priority(n.priority))),
                    Span::raw(format!("{}  ", n.date)),
                    Span::styled(
                        format!("{}: ", n.title),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("{}{}", n.message, who)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Notifications ({}) - Tab: orders, r: refresh",
                self.notifications.len()
            )))
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        if self.notifications.is_empty() {
            let empty = Paragraph::new("No notifications. Everything is on track.")
                .block(Block::default().borders(Borders::ALL).title("Notifications"))
                .alignment(Alignment::Center);
            f.render_widget(empty, area);
        } else {
            f.render_stateful_widget(list, area, &mut self.notification_state);
        }
    }

    fn render_detail_popup(&self, f: &mut Frame, area: Rect) {
        let Some(project) = self
            .project_state
            .selected()
            .and_then(|i| self.db.projects.get(i))
        else {
            return;
        };

        let area = centered_rect(60, 60, area);
        f.render_widget(Clear, area);

        let today = self.now.date();
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Order:    ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "{} ({})",
                    project.project_name,
                    project.order_number.as_deref().unwrap_or("-")
                )),
            ]),
            Line::from(vec![
                Span::styled("Stage:    ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "{} ({}%)",
                    format_stage(project.current_stage),
                    project.progress().round()
                )),
            ]),
            Line::from(vec![
                Span::styled("Due:      ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_due_relative(project.estimated_completion, today)),
            ]),
            Line::from(vec![
                Span::styled("Priority: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_priority(project.priority)),
            ]),
            Line::from(vec![
                Span::styled("At risk:  ", Style::default().add_modifier(Modifier::BOLD)),
                if risk::is_at_risk(project, self.now) {
                    Span::styled("yes", Style::default().fg(DARK_RED))
                } else {
                    Span::raw("no")
                },
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Timeline:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        if project.timeline.is_empty() {
            lines.push(Line::from("  -"));
        }
        for event in &project.timeline {
            lines.push(Line::from(format!(
                "  {}  {}",
                event.entered,
                format_stage(Some(event.stage))
            )));
        }

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Order detail - Esc to close"),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(popup, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let help = if self.status_message.is_empty() {
            "q: quit | Tab: switch view | ↑/↓: select | Enter: detail | r: refresh".to_string()
        } else {
            self.status_message.clone()
        };
        let status = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
        f.render_widget(status, area);
    }

    /// Main event loop for the dashboard application.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            self.handle_input()?;

            if self.should_exit {
                break;
            }
        }
        Ok(())
    }
}
