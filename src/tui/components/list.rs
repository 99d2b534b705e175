use crate::core::records::{VideoRecord, format_count};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const VIRAL_MARK: &str = "🔥";

/// Table of video records with keyboard and wheel navigation.
pub struct VideoList {
    pub items: Vec<VideoRecord>,
    pub state: ListState,
    pub show_interactions: bool,
    pub viral_threshold: f64,
    viewport_size: usize,
}

impl VideoList {
    pub fn new(show_interactions: bool, viral_threshold: f64) -> Self {
        Self {
            items: Vec::new(),
            state: ListState::default(),
            show_interactions,
            viral_threshold,
            viewport_size: 0,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => self.previous(),
            KeyCode::Down => self.next(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.select(0),
            KeyCode::End => self.select(self.items.len().saturating_sub(1)),
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                let current = self.state.selected().unwrap_or(0);
                self.select(current.saturating_sub(1));
                true
            }
            MouseEventKind::ScrollDown => {
                let current = self.state.selected().unwrap_or(0);
                self.select(current + 1);
                true
            }
            _ => false,
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        };
        self.select(i);
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.select(i);
    }

    fn page_down(&mut self) {
        let current = self.state.selected().unwrap_or(0);
        self.select(current + self.viewport_size.max(1));
    }

    fn page_up(&mut self) {
        let current = self.state.selected().unwrap_or(0);
        self.select(current.saturating_sub(self.viewport_size.max(1)));
    }

    /// Select `index`, clamped to the last row.
    fn select(&mut self, index: usize) {
        if self.items.is_empty() {
            return;
        }
        self.state.select(Some(index.min(self.items.len() - 1)));
        self.adjust_offset();
    }

    pub fn get_selected(&self) -> Option<&VideoRecord> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// Replace the rows and jump back to the first one.
    pub fn update_items(&mut self, new_items: Vec<VideoRecord>) {
        self.items = new_items;
        *self.state.offset_mut() = 0;
        self.state
            .select(if self.items.is_empty() { None } else { Some(0) });
    }

    pub fn header(&self) -> String {
        let mut header = format!(
            "   {}  {}  {:>13}  {:>11}  {:>7}  {:>7}  {:<10}",
            fit_width("Title", 40),
            fit_width("Channel", 18),
            "Views",
            "Subscribers",
            "Eng %",
            "Min",
            "Published"
        );
        if self.show_interactions {
            header.push_str(&format!("  {:>10}  {:>9}", "Likes", "Comments"));
        }
        header
    }

    pub fn row(&self, video: &VideoRecord) -> Line<'static> {
        let viral = video.is_viral(self.viral_threshold);
        let mark = if viral { VIRAL_MARK } else { "  " };

        let mut text = format!(
            " {}  {}  {:>13}  {:>11}  {:>7.2}  {:>7.2}  {:<10}",
            fit_width(&video.title, 40),
            fit_width(&video.channel, 18),
            format_count(video.views),
            format_count(video.subscribers),
            video.engagement_percent,
            video.duration_minutes,
            video.publish_date,
        );
        if self.show_interactions {
            text.push_str(&format!(
                "  {:>10}  {:>9}",
                format_count(video.likes),
                format_count(video.comments)
            ));
        }

        let style = if viral {
            Style::default().fg(Color::LightRed)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(vec![Span::raw(mark), Span::styled(text, style)])
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str) {
        self.viewport_size = area.height.saturating_sub(2).max(1) as usize;
        self.adjust_offset();

        let items: Vec<ListItem> = self.items.iter().map(|v| ListItem::new(self.row(v))).collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        f.render_stateful_widget(list, area, &mut self.state);
    }

    fn adjust_offset(&mut self) {
        if self.items.is_empty() {
            *self.state.offset_mut() = 0;
            return;
        }

        let viewport = self.viewport_size.max(1);
        let selected = self.state.selected().unwrap_or(0).min(self.items.len() - 1);
        self.state.select(Some(selected));

        let max_offset = self.items.len().saturating_sub(viewport);
        let offset = self.state.offset().min(max_offset);
        *self.state.offset_mut() = offset;

        if selected < offset {
            *self.state.offset_mut() = selected;
        } else if selected >= offset + viewport {
            *self.state.offset_mut() = selected + 1 - viewport;
        }
    }
}

/// Truncate or pad `text` to exactly `width` terminal columns, ending cut
/// text with an ellipsis.
pub fn fit_width(text: &str, width: usize) -> String {
    let text_width = UnicodeWidthStr::width(text);
    if text_width <= width {
        return format!("{text}{}", " ".repeat(width - text_width));
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::samples::record;
    use crossterm::event::KeyModifiers;

    fn list_of(n: usize) -> VideoList {
        let mut list = VideoList::new(true, 5.0);
        list.update_items((0..n).map(|i| record(&format!("v{i}"), 10, 1.0)).collect());
        list
    }

    #[test]
    fn fit_width_counts_columns_not_bytes() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdef", 4), "abc…");
        assert_eq!(fit_width("日本語テキスト", 7), "日本語…");
        assert_eq!(UnicodeWidthStr::width(fit_width("日本語テキスト", 8).as_str()), 8);
    }

    #[test]
    fn navigation_wraps_and_clamps() {
        let mut list = list_of(3);
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert_eq!(list.state.selected(), Some(0));
        list.handle_key(key(KeyCode::Up));
        assert_eq!(list.state.selected(), Some(2));
        list.handle_key(key(KeyCode::Down));
        assert_eq!(list.state.selected(), Some(0));
        list.handle_key(key(KeyCode::PageDown));
        assert_eq!(list.state.selected(), Some(1));
        list.handle_key(key(KeyCode::End));
        assert_eq!(list.get_selected().map(|v| v.id.as_str()), Some("v2"));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let mut list = list_of(0);
        list.next();
        assert!(list.get_selected().is_none());
    }

    #[test]
    fn viral_rows_are_marked() {
        let list = list_of(0);
        let mut hot = record("hot", 600, 2.0);
        hot.subscribers = 100;
        let mut calm = record("calm", 100, 2.0);
        calm.subscribers = 100;

        assert_eq!(list.row(&hot).spans[0].content, VIRAL_MARK);
        assert_eq!(list.row(&calm).spans[0].content, "  ");
    }

    #[test]
    fn interaction_columns_follow_the_flag() {
        let mut list = list_of(0);
        assert!(list.header().contains("Likes"));
        list.show_interactions = false;
        assert!(!list.header().contains("Likes"));
    }
}
