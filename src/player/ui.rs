use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use stemdeck::session::{LoadState, PlayerStatus, TrackSnapshot};
use stemdeck::stems::STEM_COUNT;

use super::app::App;

const VOLUME_BAR_WIDTH: usize = 10;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),                     // Title
            Constraint::Length(2),                     // Status line
            Constraint::Length(STEM_COUNT as u16 + 2), // Stem rows
            Constraint::Length(3),                     // Master progress
            Constraint::Min(1),                        // Message
            Constraint::Length(3),                     // Controls
        ])
        .split(f.area());

    let title = match &app.title {
        Some(name) => format!("🎚 stemdeck · {name}"),
        None => "🎚 stemdeck".to_string(),
    };
    let title = Paragraph::new(title)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    draw_status(f, chunks[1], app);
    draw_stems(f, chunks[2], app);
    draw_progress_bar(f, chunks[3], app);

    if let Some(message) = &app.message {
        let message = Paragraph::new(message.as_str()).style(Style::default().fg(Color::Gray));
        f.render_widget(message, chunks[4]);
    }

    draw_controls(f, chunks[5], app);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let state = app.player.state();

    let line = if let Some(banner) = app.failure_banner() {
        Line::from(vec![
            Span::styled(
                "✗ ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(banner, Style::default().fg(Color::Red)),
            Span::styled("  [r] reload", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        match &state.status {
            PlayerStatus::Idle => Line::from(Span::styled(
                "No stems loaded",
                Style::default().fg(Color::DarkGray),
            )),
            PlayerStatus::Submitting => Line::from(Span::styled(
                "Separating stems, this can take a few minutes...",
                Style::default().fg(Color::Magenta),
            )),
            PlayerStatus::AwaitingStems => Line::from(vec![
                Span::styled("Loading stems ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{}/{STEM_COUNT}", state.ready_count),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]),
            PlayerStatus::Ready if state.playing => Line::from(Span::styled(
                "▶ Playing",
                Style::default().fg(Color::Green),
            )),
            PlayerStatus::Ready => Line::from(Span::styled(
                "⏸ Paused",
                Style::default().fg(Color::Yellow),
            )),
            // Covered by the banner above.
            PlayerStatus::Failed { .. } => Line::default(),
        }
    };

    let status = Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(status, area);
}

fn draw_stems(f: &mut Frame, area: Rect, app: &App) {
    let tracks = app.player.tracks();
    let lines: Vec<Line> = if tracks.is_empty() {
        vec![Line::from(Span::styled(
            "Waiting for a stem set",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        tracks
            .iter()
            .map(|track| stem_line(track, track.stem == app.selected))
            .collect()
    };

    let block = Block::default().borders(Borders::ALL).title(" Stems ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn stem_line(track: &TrackSnapshot, selected: bool) -> Line<'static> {
    let marker = if selected { "▸ " } else { "  " };
    let label_style = if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let (state, state_color) = match track.load_state {
        LoadState::Unloaded => ("idle", Color::DarkGray),
        LoadState::Loading => ("loading", Color::Yellow),
        LoadState::Ready => ("ready", Color::Green),
        LoadState::Failed => ("failed", Color::Red),
    };

    let mut spans = vec![
        Span::raw(marker),
        Span::styled(format!("{:<15}", track.stem.label()), label_style),
        Span::styled(format!("{state:<8}"), Style::default().fg(state_color)),
        Span::styled(
            volume_bar(track.volume),
            Style::default().fg(if track.muted {
                Color::DarkGray
            } else {
                Color::Cyan
            }),
        ),
        Span::raw(format!(" {:>3}%", (track.volume * 100.0).round() as u16)),
    ];

    if track.muted {
        spans.push(Span::styled(" muted", Style::default().fg(Color::Magenta)));
    }
    if track.interactive {
        spans.push(Span::styled(" ◆", Style::default().fg(Color::Blue)));
    }
    if let Some(error) = &track.error {
        spans.push(Span::styled(
            format!("  {error}"),
            Style::default().fg(Color::Red),
        ));
    }

    Line::from(spans)
}

fn volume_bar(volume: f32) -> String {
    let filled = ((volume.clamp(0.0, 1.0) * VOLUME_BAR_WIDTH as f32).round()) as usize;
    format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(VOLUME_BAR_WIDTH - filled)
    )
}

fn format_time(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn draw_progress_bar(f: &mut Frame, area: Rect, app: &App) {
    let progress = app.player.master_progress();
    let duration = app
        .player
        .tracks()
        .into_iter()
        .find(|t| t.interactive)
        .and_then(|t| t.duration_secs);

    let time_info = match duration {
        Some(total) => format!("{} / {}", format_time(total * progress), format_time(total)),
        None => "00:00 / 00:00".to_string(),
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(17)])
        .split(area);

    let percent = (progress * 100.0).round().clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Original "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(percent)
        .label(format!("{percent}%"));
    f.render_widget(gauge, chunks[0]);

    let time_widget = Paragraph::new(time_info)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(time_widget, chunks[1]);
}

fn draw_controls(f: &mut Frame, area: Rect, app: &App) {
    let playing = app.is_playing();
    let row1 = vec![
        Span::styled(
            "[space]",
            Style::default().fg(if playing { Color::Yellow } else { Color::Green }),
        ),
        Span::raw(if playing { " pause  " } else { " play  " }),
        Span::styled("[←→]", Style::default().fg(Color::Magenta)),
        Span::raw(" seek  "),
        Span::styled("[0-9]", Style::default().fg(Color::Magenta)),
        Span::raw(" jump  "),
        Span::styled("[r]", Style::default().fg(Color::Blue)),
        Span::raw(" reload  "),
        Span::styled("[q]", Style::default().fg(Color::Red)),
        Span::raw(" quit"),
    ];
    let row2 = vec![
        Span::styled("[↑↓]", Style::default().fg(Color::Cyan)),
        Span::raw(" select  "),
        Span::styled("[+/-]", Style::default().fg(Color::Cyan)),
        Span::raw(" volume  "),
        Span::styled("[m]", Style::default().fg(Color::Cyan)),
        Span::raw(" mute"),
    ];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(Block::default().borders(Borders::TOP), area);
    f.render_widget(
        Paragraph::new(Line::from(row1)).alignment(Alignment::Center),
        rows[1],
    );
    f.render_widget(
        Paragraph::new(Line::from(row2)).alignment(Alignment::Center),
        rows[2],
    );
}
