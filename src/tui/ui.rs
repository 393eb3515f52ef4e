use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, AppMode, SettingsField};
use crate::core::{ImageAsset, BATCH_SIZE};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Main | AppMode::Input(_) => draw_main(frame, app),
        AppMode::Settings => draw_settings(frame, app),
    }
}

/// Draw main view with inputs and the current batch
fn draw_main(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title/input
            Constraint::Length(5),  // Images
            Constraint::Min(6),     // Results
            Constraint::Length(3),  // Downloads
            Constraint::Length(3),  // Status bar
            Constraint::Length(2),  // Help line
        ])
        .split(frame.area());

    // Title or input
    match app.mode {
        AppMode::Input(_) => draw_input(frame, app, chunks[0]),
        _ => draw_title(frame, chunks[0]),
    }

    draw_images(frame, app, chunks[1]);
    draw_results(frame, app, chunks[2]);
    draw_downloads(frame, app, chunks[3]);
    draw_status(frame, app, chunks[4]);
    draw_help(frame, app, chunks[5]);
}

fn draw_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(vec![Line::from(vec![
        Span::styled("💡 ", Style::default()),
        Span::styled(
            "Lighting Studio",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " - Lighting simulation for architectural visualization",
            Style::default().fg(Color::Gray),
        ),
    ])])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(title, area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let AppMode::Input(field) = app.mode else {
        return;
    };

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(field.title()),
        );
    frame.render_widget(input, area);

    // Show cursor
    frame.set_cursor_position((
        area.x + app.cursor_pos as u16 + 1,
        area.y + 1,
    ));
}

fn asset_line<'a>(label: &'a str, asset: Option<&ImageAsset>, extra: Option<String>) -> Line<'a> {
    let mut spans = vec![Span::styled(format!("{:<11}", label), Style::default().fg(Color::Gray))];
    match asset {
        Some(asset) => {
            spans.push(Span::styled(asset.label(), Style::default().fg(Color::White)));
            if let Some(extra) = extra {
                spans.push(Span::styled(format!("  ({})", extra), Style::default().fg(Color::Cyan)));
            }
        }
        None => spans.push(Span::styled("(not set)", Style::default().fg(Color::DarkGray))),
    }
    Line::from(spans)
}

fn draw_images(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let base = session.base_image();

    let action = if session.is_loading() {
        Span::styled("Generating...", Style::default().fg(Color::Yellow))
    } else if session.can_generate() {
        Span::styled(
            "[g] Generate variations",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "[g] Generate variations (load both images first)",
            Style::default().fg(Color::DarkGray),
        )
    };

    let lines = vec![
        asset_line("Base:", base.map(|b| &b.asset), session.aspect_ratio()),
        asset_line("Reference:", session.reference_image(), None),
        Line::from(action),
    ];

    let images = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Images"));
    frame.render_widget(images, area);
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;

    let items: Vec<ListItem> = if session.is_loading() && session.results().is_empty() {
        (1..=BATCH_SIZE)
            .map(|i| {
                ListItem::new(Line::from(Span::styled(
                    format!("[{}] generating...", i),
                    Style::default().fg(Color::Yellow),
                )))
            })
            .collect()
    } else {
        session
            .results()
            .iter()
            .enumerate()
            .map(|(i, image)| {
                let mut spans = vec![
                    Span::styled(
                        format!("[{}] {:<38}", i + 1, image.id),
                        if i == app.selected {
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::White)
                        },
                    ),
                    Span::raw(" "),
                    Span::styled(format!("{:<10}", image.mime_type()), Style::default().fg(Color::Gray)),
                ];
                if session.is_revariating(i) {
                    spans.push(Span::styled(" re-variating...", Style::default().fg(Color::Yellow)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Variations ({})", session.results().len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(list, area);
}

fn draw_downloads(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled("Prefix: ", Style::default().fg(Color::Gray)),
        Span::styled(app.session.prefix(), Style::default().fg(Color::White)),
        Span::styled("   Next: ", Style::default().fg(Color::Gray)),
        Span::styled(app.session.next_filename(), Style::default().fg(Color::Cyan)),
        Span::styled("   Dir: ", Style::default().fg(Color::Gray)),
        Span::styled(app.config.output.directory.as_str(), Style::default().fg(Color::White)),
    ]);

    let downloads = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title("Downloads"));
    frame.render_widget(downloads, area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let busy;
    let (message, style) = if let Some(err) = &app.error_message {
        (err.as_str(), Style::default().fg(Color::Red))
    } else if let Some(status) = &app.status_message {
        (status.as_str(), Style::default().fg(Color::Green))
    } else if let Some(err) = session.error() {
        (err, Style::default().fg(Color::Red))
    } else if session.is_loading() {
        ("Generating variations...", Style::default().fg(Color::Yellow))
    } else if let Some(index) = session.revariating_index() {
        busy = format!("Re-variating image {}...", index + 1);
        (busy.as_str(), Style::default().fg(Color::Yellow))
    } else {
        ("Ready", Style::default().fg(Color::Gray))
    };

    let status = Paragraph::new(message)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.mode {
        AppMode::Input(_) => "Enter: Apply | Esc: Cancel",
        AppMode::Main => {
            "b: Base | l: Reference | x: Clear ref | g: Generate | v: Re-variate | d: Download | p: Prefix | s: Settings | q: Quit"
        }
        AppMode::Settings => "",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

/// Draw settings screen
fn draw_settings(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(10),    // Settings list
            Constraint::Length(3),  // Status
            Constraint::Length(2),  // Help
        ])
        .split(area);

    // Header
    let header = Paragraph::new("Settings")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    // Settings list
    let fields = SettingsField::all();
    let items: Vec<ListItem> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let is_selected = i == app.settings_selected;
            let value = if app.settings_editing && is_selected {
                format!("{}▏", app.settings_edit_buffer)
            } else {
                app.get_settings_value(field)
            };

            let has_options = app.get_settings_options(field).is_some();
            let hint = if has_options { " [Enter to cycle]" } else { "" };

            let content = Line::from(vec![
                Span::styled(
                    format!("{:<20}", field.label()),
                    if is_selected {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    },
                ),
                Span::styled(
                    format!("{}{}", value, hint),
                    if is_selected && app.settings_editing {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Gray)
                    },
                ),
            ]);

            ListItem::new(content)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_widget(list, chunks[1]);

    // Status
    draw_status(frame, app, chunks[2]);

    // Help
    let help_text = if app.settings_editing {
        "Enter: Save | Esc: Cancel"
    } else {
        "↑↓: Navigate | Enter/Space: Edit/Cycle | Esc/q: Back"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}
