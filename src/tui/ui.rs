use crate::core::records::format_count;
use crate::tui::app::{App, AppState, Control, Focus, Notice, Task};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.state {
        AppState::Setup => draw_setup(f, app),
        AppState::Dashboard => draw_dashboard(f, app),
        AppState::Working(task) => draw_working(f, app, task),
        AppState::Detail => draw_detail(f, app),
        AppState::Strategy => draw_strategy(f, app),
    }
}

fn title_bar(f: &mut Frame, area: Rect, text: &str) {
    let title = Paragraph::new(text.to_string())
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn help_bar(f: &mut Frame, area: Rect, text: &str) {
    let help = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}

fn notice_bar(f: &mut Frame, area: Rect, notice: Option<&Notice>) {
    let line = match notice {
        Some(Notice::Warning(text)) => Line::from(Span::styled(
            format!("⚠ {text}"),
            Style::default().fg(Color::LightYellow),
        )),
        Some(Notice::Info(text)) => Line::from(Span::styled(
            text.as_str(),
            Style::default().fg(Color::Green),
        )),
        None => Line::default(),
    };
    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(paragraph, area);
}

fn draw_setup(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // YouTube key
            Constraint::Length(3), // AI key
            Constraint::Min(3),    // Info
            Constraint::Length(3), // Status
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    title_bar(f, chunks[0], "TrendPro: YouTube trend dashboard");
    app.youtube_key_input.render(f, chunks[1]);
    app.ai_key_input.render(f, chunks[2]);

    let validate = if app.config.dashboard.validate_key {
        "The YouTube key is checked with one request before the dashboard opens."
    } else {
        "The YouTube key is used as entered."
    };
    let info = Paragraph::new(vec![
        Line::from(format!("AI provider: {}", app.config.ai.provider)),
        Line::from(validate),
        Line::from("Keys stay in memory for this session only."),
    ])
    .style(Style::default().fg(Color::Gray))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(info, chunks[3]);

    notice_bar(f, chunks[4], app.notice.as_ref());
    help_bar(f, chunks[5], "[Tab] Next field  [Enter] Continue  [Esc] Quit");
}

fn draw_dashboard(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(1)])
        .split(f.area());

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(Control::ALL.len() as u16 + 2),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(chunks[0]);

    let sidebar_focused = app.focus == Focus::Sidebar;
    let items: Vec<ListItem> = Control::ALL
        .iter()
        .map(|&control| {
            let selected = sidebar_focused && control == app.control;
            let marker = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let value = match control {
                Control::Run => format!("[ {} ]", app.control_value(control)),
                _ => format!("{:<10} {}", control.label(), app.control_value(control)),
            };
            ListItem::new(Line::from(Span::styled(format!("{marker}{value}"), style)))
        })
        .collect();

    let border = if sidebar_focused { Color::Yellow } else { Color::Gray };
    let controls = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title("Controls"),
    );
    f.render_widget(controls, left[0]);

    app.keyword.render(f, left[1]);

    let ai = if app.ai_key.is_some() {
        format!("AI: {} (press a)", app.config.ai.provider)
    } else {
        "AI: no key (press k)".to_string()
    };
    let session = Paragraph::new(vec![
        Line::from(format!("Viral at {:.1}x views/subs", app.config.dashboard.viral_threshold)),
        Line::from(ai),
    ])
    .style(Style::default().fg(Color::Gray))
    .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(session, left[2]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(1), // Column header
            Constraint::Min(1),    // Rows
            Constraint::Length(3), // Status
            Constraint::Length(3), // Help
        ])
        .split(chunks[1]);

    let heading = match &app.last_params {
        Some(params) => format!("{} · {}", params.mode.label(), params.topic()),
        None => "No data yet".to_string(),
    };
    title_bar(f, right[0], &heading);

    let header = Paragraph::new(app.video_list.header())
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(header, right[1]);

    let list_title = if app.focus == Focus::Results { "Videos (focused)" } else { "Videos" };
    app.video_list.render(f, right[2], list_title);

    notice_bar(f, right[3], app.notice.as_ref());
    help_bar(
        f,
        right[4],
        "[Tab] Focus  [↑↓] Move  [←→] Change  [Enter] Run/Open  [a] AI  [k] Keys  [q] Quit",
    );
}

fn draw_working(f: &mut Frame, app: &App, task: Task) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(1),    // Progress area
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let title = match task {
        Task::ValidateKey => "Checking key...",
        Task::Fetch => "Fetching videos...",
        Task::Consult => "Consulting AI...",
    };
    title_bar(f, chunks[0], title);
    app.progress.render(f, chunks[1], "Working");
    help_bar(f, chunks[2], "[Esc] Cancel");
}

fn draw_detail(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    let Some(video) = &app.detail else {
        return;
    };
    title_bar(f, chunks[0], &video.title);

    let label = |name: &str| Span::styled(format!("{name:<13}"), Style::default().fg(Color::Cyan));
    let ratio = video
        .virality_ratio()
        .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}x"));
    let viral = if video.is_viral(app.config.dashboard.viral_threshold) {
        " 🔥 viral"
    } else {
        ""
    };
    let tags = if video.tags.is_empty() {
        "-".to_string()
    } else {
        video.tags.join(", ")
    };

    let lines = vec![
        Line::from(vec![label("Channel"), Span::raw(video.channel.clone())]),
        Line::from(vec![label("Published"), Span::raw(video.publish_date.clone())]),
        Line::from(vec![label("Views"), Span::raw(format_count(video.views))]),
        Line::from(vec![label("Likes"), Span::raw(format_count(video.likes))]),
        Line::from(vec![label("Comments"), Span::raw(format_count(video.comments))]),
        Line::from(vec![label("Subscribers"), Span::raw(format_count(video.subscribers))]),
        Line::from(vec![label("Engagement"), Span::raw(format!("{:.2}%", video.engagement_percent))]),
        Line::from(vec![label("Duration"), Span::raw(format!("{:.2} min", video.duration_minutes))]),
        Line::from(vec![label("Virality"), Span::raw(format!("{ratio}{viral}"))]),
        Line::default(),
        Line::from(vec![label("Video ID"), Span::raw(video.id.clone())]),
        Line::from(vec![label("URL"), Span::raw(video.url.clone())]),
        Line::from(vec![label("Thumbnail"), Span::raw(video.thumbnail_url.clone())]),
        Line::from(vec![label("Tags"), Span::raw(tags)]),
    ];

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(body, chunks[1]);

    help_bar(f, chunks[2], "[Esc] Back  [q] Quit");
}

fn draw_strategy(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    app.viewer.render(f, chunks[0]);
    help_bar(f, chunks[1], "[↑↓] Scroll  [PgUp/PgDn] Page  [Home/End] Top/Bottom  [Esc] Back");
}
