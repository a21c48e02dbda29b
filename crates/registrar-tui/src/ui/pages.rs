//! Page bodies: entity tables, record details, dashboard counters and forms.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use serde_json::Value;

use registrar_core::forms::{FieldKind, Form};
use registrar_core::utils::truncate;
use registrar_core::views::{cell, columns_for, flatten_fields, Dashboard, DetailView, ListView};

use crate::app::{App, AppState, Focus, Page};
use crate::ui::styles;

/// Widest value shown in a detail pane before truncation.
const MAX_DETAIL_VALUE: usize = 80;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Content;
    let title = format!(" {} ", app.route.title());

    match &app.page {
        Page::Blank => {
            let block = panel(&title, focused);
            frame.render_widget(Paragraph::new("").block(block), area);
        }
        Page::List(list) => render_list(frame, app, list, area),
        Page::Detail(detail) => render_detail(frame, detail, &title, focused, area),
        Page::Dashboard(dashboard) => render_dashboard(frame, dashboard, &title, focused, area),
        Page::Profile(profile) => {
            let lines = field_lines(profile);
            frame.render_widget(Paragraph::new(lines).block(panel(&title, focused)), area);
        }
        Page::Account(form) => {
            let block = panel(&title, focused);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            render_form(frame, form, focused, inner);
        }
    }
}

fn panel(title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused))
}

// ============================================================================
// Entity table
// ============================================================================

fn render_list(frame: &mut Frame, app: &App, list: &ListView, area: Rect) {
    let focused = app.focus == Focus::Content;
    let searching = app.state == AppState::Searching;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    // Search line
    let search_line = if searching || !list.search().is_empty() {
        let cursor = if searching { "▌" } else { "" };
        Line::from(vec![
            Span::styled(" Search: ", styles::muted_style()),
            Span::styled(format!("{}{}", list.search(), cursor), styles::search_style()),
        ])
    } else {
        Line::from(Span::styled(" [/] search", styles::muted_style()))
    };
    frame.render_widget(Paragraph::new(search_line), chunks[0]);

    let columns = columns_for(list.kind());
    let header = Row::new(columns.iter().map(|c| Cell::from(c.header)))
        .style(styles::title_style())
        .height(1);

    let rows: Vec<Row> = list
        .raw_rows()
        .iter()
        .map(|record| {
            Row::new(columns.iter().map(|c| Cell::from(cell(record, c))))
                .style(styles::list_item_style())
        })
        .collect();

    let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Fill(c.width)).collect();

    let total = list.meta().map(|m| m.total).unwrap_or(rows.len() as u64);
    let mut title = format!(
        " {} ({}) page {}/{} ",
        app.route.title(),
        total,
        list.page(),
        list.total_pages().max(1)
    );
    if list.is_loading() {
        title.push_str("· loading ");
    }

    let block = panel(&title, focused);

    if let Some(error) = list.error() {
        let message = Paragraph::new(Span::styled(format!(" {}", error.user_message()), styles::error_style()))
            .block(block);
        frame.render_widget(message, chunks[1]);
        return;
    }

    if rows.is_empty() && !list.is_loading() {
        let empty = Paragraph::new(Span::styled(" No records", styles::muted_style())).block(block);
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(list.selected()));

    frame.render_stateful_widget(table, chunks[1], &mut state);
}

// ============================================================================
// Record detail
// ============================================================================

fn render_detail(frame: &mut Frame, detail: &DetailView, title: &str, focused: bool, area: Rect) {
    let block = panel(title, focused);

    let lines = match (detail.raw(), detail.error()) {
        (Some(record), _) => field_lines(record),
        (None, Some(error)) => vec![Line::from(Span::styled(
            format!(" {}", error.user_message()),
            styles::error_style(),
        ))],
        (None, None) => vec![Line::from(Span::styled(" Loading...", styles::muted_style()))],
    };

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn field_lines(record: &Value) -> Vec<Line<'static>> {
    let fields = flatten_fields(record);
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0).min(32);
    fields
        .into_iter()
        .map(|(name, value)| {
            Line::from(vec![
                Span::styled(format!(" {:<width$}  ", name, width = width), styles::muted_style()),
                Span::styled(truncate(&value, MAX_DETAIL_VALUE), styles::list_item_style()),
            ])
        })
        .collect()
}

// ============================================================================
// Dashboard
// ============================================================================

fn render_dashboard(frame: &mut Frame, dashboard: &Dashboard, title: &str, focused: bool, area: Rect) {
    let mut lines = vec![Line::from("")];
    for value in dashboard.values() {
        let total = match &value.total {
            Ok(total) => Span::styled(format!("{:>8}", total), styles::highlight_style()),
            Err(_) => Span::styled(format!("{:>8}", "-"), styles::error_style()),
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            total,
            Span::raw("  "),
            Span::styled(value.counter.label, styles::list_item_style()),
        ]));
    }
    if dashboard.values().is_empty() {
        lines.push(Line::from(Span::styled(
            "  Pick a page from the menu",
            styles::muted_style(),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(panel(title, focused)), area);
}

// ============================================================================
// Forms
// ============================================================================

/// Number of lines `render_form` needs for `form`.
pub fn form_height(form: &Form) -> u16 {
    let errors = form.fields().iter().filter(|f| form.error(&f.name).is_some()).count();
    (form.fields().len() + errors) as u16 + 3
}

/// Draw each field as `Label: [value]`, with its inline error under it.
pub fn render_form(frame: &mut Frame, form: &Form, focused: bool, area: Rect) {
    let label_width = form
        .fields()
        .iter()
        .map(|f| f.label.chars().count() + 1)
        .max()
        .unwrap_or(0);

    let mut lines = vec![Line::from("")];
    for (i, field) in form.fields().iter().enumerate() {
        let has_focus = focused && i == form.focus();
        let raw = form.value(&field.name);

        let shown = match &field.kind {
            FieldKind::Password => "*".repeat(raw.chars().count()),
            FieldKind::Select(options) => {
                let label = options
                    .iter()
                    .find(|o| o.value == raw)
                    .map(|o| o.label.as_str())
                    .unwrap_or(raw);
                format!("< {} >", label)
            }
            _ => raw.to_string(),
        };
        let cursor = if has_focus && !matches!(field.kind, FieldKind::Select(_)) {
            "▌"
        } else {
            ""
        };
        let marker = if field.is_required() { "*" } else { " " };
        let value_style = if has_focus {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!(" {:>width$}{}: [", field.label, marker, width = label_width),
                styles::muted_style(),
            ),
            Span::styled(format!("{}{}", shown, cursor), value_style),
            Span::styled("]", styles::muted_style()),
        ]));

        if let Some(error) = form.error(&field.name) {
            lines.push(Line::from(Span::styled(
                format!(" {:>width$}  {}", "", error, width = label_width),
                styles::error_style(),
            )));
        }
    }

    lines.push(Line::from(""));
    let hint = if form.is_submitting() {
        Span::styled(" Saving...", styles::muted_style())
    } else {
        Span::styled(" [Enter] save  [Tab] next field  [←/→] choose  [Esc] cancel", styles::muted_style())
    };
    lines.push(Line::from(hint));

    frame.render_widget(Paragraph::new(lines), area);
}
