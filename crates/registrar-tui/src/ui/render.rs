use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use registrar_core::routes::Route;

use crate::app::{App, AppState, Focus, LoginFocus, Page};

use super::pages;
use super::styles;

/// Width of the navigation menu column.
const MENU_WIDTH: u16 = 28;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Menu + page
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(MENU_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    render_menu(frame, app, body[0]);
    pages::render(frame, app, body[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::Editing => render_editor_overlay(frame, app),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Registrar";
    let who = app
        .current_user()
        .map(|u| format!("{} ({})", u.user_id, u.role.display_name()))
        .unwrap_or_else(|| "Signed out".to_string());
    let help_hint = format!("{}   [?] Help", who);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + help_hint.chars().count() + 2),
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Menu && app.state != AppState::LoggingIn;
    let mut lines = Vec::new();
    let mut index = 0;

    for section in &app.menu {
        lines.push(Line::from(Span::styled(
            format!(" {}", section.title),
            styles::highlight_style(),
        )));
        for item in &section.items {
            let current = item.route == app.route || is_detail_of(&app.route, &item.route);
            let style = if focused && index == app.menu_selection {
                styles::selected_style()
            } else {
                styles::menu_item_style(current)
            };
            lines.push(Line::from(Span::styled(format!("   {}", item.label), style)));
            index += 1;
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(" Menu ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// A record page counts as its list for menu highlighting.
fn is_detail_of(route: &Route, list: &Route) -> bool {
    match (route, list) {
        (Route::Detail { role, kind, .. }, Route::Entities { role: r, kind: k }) => role == r && kind == k,
        _ => false,
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match (&app.page, app.focus) {
        (Page::List(_), Focus::Content) if app.can_manage() => {
            "[n]ew [e]dit [d]elete [/]search [[/]] page | [q]uit"
        }
        (Page::List(_), Focus::Content) if app.route == Route::MyOfferedCourses => {
            "[r]egister [/]search [[/]] page | [q]uit"
        }
        (Page::List(_), Focus::Content) => "[/]search [[/]] page | [q]uit",
        (_, Focus::Menu) => "[↑/↓] move [Enter] open [Tab] page | [u]pdate [L]ogout [q]uit",
        _ => "[Esc] back | [u]pdate [q]uit",
    };
    let right_text = format!(" {} ", shortcuts);

    let (left_text, left_style) = match app.notifier.current(Instant::now()) {
        Some(note) => (format!(" {} ", note.message), styles::notification_style(note.level)),
        None => {
            let updated = app
                .registrar
                .cache()
                .last_updated()
                .map(|at| format!(" Updated {} ", at.with_timezone(&chrono::Local).format("%H:%M:%S")))
                .unwrap_or_default();
            (updated, styles::muted_style())
        }
    };

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 24, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Registrar", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("Tab", "Switch focus (menu ↔ page)"),
        help_line("↑/↓", "Move in menu or table"),
        help_line("Enter", "Open page / record"),
        help_line("Esc", "Go back"),
        help_line("[ / ]", "Previous / next page"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("/", "Search"),
        help_line("n / e / d", "New, edit, delete record"),
        help_line("r", "Register for an offered course"),
        help_line("u", "Update from the server"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Forms", styles::highlight_style())),
        help_line("Tab/↑/↓", "Next / previous field"),
        help_line("←/→", "Choose an option"),
        help_line("Enter", "Save"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn login_field(label: &'static str, value: String, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("    "),
        Span::styled(label, styles::muted_style()),
        Span::styled(format!("{:<18}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn login_button(label: &'static str, focused: bool) -> Line<'static> {
    if focused {
        Line::from(vec![
            Span::raw("    ["),
            Span::styled(format!(" ▶ {} ◀ ", label), styles::selected_style()),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("    ["),
            Span::styled(format!("   {}   ", label), styles::list_item_style()),
            Span::raw("]"),
        ])
    }
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Registrar sign in", styles::title_style())),
        Line::from(""),
        login_field(
            "User ID:  [",
            app.login_user_id.clone(),
            app.login_focus == LoginFocus::UserId,
        ),
        login_field(
            "Password: [",
            "*".repeat(app.login_password.chars().count().min(18)),
            app.login_focus == LoginFocus::Password,
        ),
        Line::from(""),
        login_button("Login", app.login_focus == LoginFocus::Button),
        login_button("Forgot password", app.login_focus == LoginFocus::Forgot),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_editor_overlay(frame: &mut Frame, app: &App) {
    let Some(editor) = &app.editor else {
        return;
    };
    let height = pages::form_height(&editor.form) + 2;
    let area = centered_rect_fixed(72, height, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", editor.title()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    pages::render_form(frame, &editor.form, true, inner);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let label = app.delete_label.as_deref().unwrap_or("this record");
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   Delete \"{}\"?", label), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
