use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Activity indicator for requests whose length is unknown: a spinner that
/// advances on every tick plus a short log.
pub struct ProgressBar {
    pub message: String,
    pub logs: Vec<String>,
    pub max_logs: usize,
    frame: usize,
}

impl ProgressBar {
    pub fn new() -> Self {
        Self {
            message: String::new(),
            logs: Vec::new(),
            max_logs: 10,
            frame: 0,
        }
    }

    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % SPINNER.len();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn add_log(&mut self, log: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push(format!("[{timestamp}] {}", log.as_ref()));

        if self.logs.len() > self.max_logs {
            self.logs.remove(0);
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, title: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(area);

        let status = Paragraph::new(Line::from(vec![
            Span::styled(SPINNER[self.frame], Style::default().fg(Color::Green)),
            Span::raw(" "),
            Span::styled(&self.message, Style::default().fg(Color::Yellow)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(status, chunks[0]);

        let log_lines: Vec<Line> = self
            .logs
            .iter()
            .map(|log| Line::from(Span::raw(log)))
            .collect();

        let logs_paragraph =
            Paragraph::new(log_lines).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(logs_paragraph, chunks[1]);
    }

    pub fn reset(&mut self) {
        self.frame = 0;
        self.message.clear();
        self.logs.clear();
    }
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_the_latest_entries() {
        let mut progress = ProgressBar::new();
        for i in 0..12 {
            progress.add_log(format!("step {i}"));
        }
        assert_eq!(progress.logs.len(), 10);
        assert!(progress.logs[0].ends_with("step 2"));
        assert!(progress.logs[9].ends_with("step 11"));
    }

    #[test]
    fn spinner_wraps() {
        let mut progress = ProgressBar::new();
        for _ in 0..SPINNER.len() {
            progress.tick();
        }
        assert_eq!(progress.frame, 0);
    }
}
