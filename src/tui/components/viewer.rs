use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    Text,
    /// A paragraph made only of bold text.
    Strong,
    Item,
    Code,
    Table,
    Rule,
    Blank,
}

/// One logical line of rendered markdown, before wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MdLine {
    pub kind: LineKind,
    pub indent: usize,
    pub text: String,
}

impl LineKind {
    fn style(self) -> Style {
        match self {
            LineKind::Heading => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            LineKind::Strong => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            LineKind::Item => Style::default().fg(Color::Green),
            LineKind::Code => Style::default().fg(Color::Magenta),
            LineKind::Table => Style::default().fg(Color::Cyan),
            LineKind::Rule => Style::default().fg(Color::DarkGray),
            LineKind::Text | LineKind::Blank => Style::default(),
        }
    }
}

#[derive(Default)]
struct MdBuilder {
    lines: Vec<MdLine>,
    current: String,
    kind: Option<LineKind>,
    indent: usize,
    lists: Vec<Option<u64>>,
    strong_depth: usize,
    plain_text_seen: bool,
    in_code: bool,
    table_cells: usize,
}

impl MdBuilder {
    fn flush(&mut self) {
        let kind = self.kind.take().unwrap_or(LineKind::Text);
        let text = std::mem::take(&mut self.current);
        let kind = match kind {
            LineKind::Text if !self.plain_text_seen => LineKind::Strong,
            other => other,
        };
        self.plain_text_seen = false;

        if !text.trim().is_empty() {
            self.lines.push(MdLine {
                kind,
                indent: self.indent,
                text: text.trim_end().to_string(),
            });
        }
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.kind != LineKind::Blank) {
            self.lines.push(MdLine {
                kind: LineKind::Blank,
                indent: 0,
                text: String::new(),
            });
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_code {
            for line in text.lines() {
                self.lines.push(MdLine {
                    kind: LineKind::Code,
                    indent: self.indent + 2,
                    text: line.to_string(),
                });
            }
            return;
        }
        if self.strong_depth == 0 && !text.trim().is_empty() {
            self.plain_text_seen = true;
        }
        self.current.push_str(text);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                self.flush();
                self.kind = Some(LineKind::Heading);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.kind = Some(LineKind::Heading);
                self.flush();
                self.blank();
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                self.indent = self.lists.len().saturating_sub(1) * 2;
                if self.lists.is_empty() {
                    self.indent = 0;
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                self.indent = self.lists.len().saturating_sub(1) * 2;
                self.kind = Some(LineKind::Item);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.current.push_str(&marker);
            }
            Event::End(TagEnd::Item) => {
                if self.kind.is_some() {
                    self.flush();
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code = false;
                self.blank();
            }
            Event::Start(Tag::Table(_)) => self.flush(),
            Event::Start(Tag::TableCell) => {
                if self.table_cells > 0 {
                    self.current.push_str(" │ ");
                }
                self.table_cells += 1;
            }
            Event::End(TagEnd::TableHead | TagEnd::TableRow) => {
                self.kind = Some(LineKind::Table);
                self.flush();
                self.table_cells = 0;
            }
            Event::End(TagEnd::Table) => self.blank(),
            Event::Start(Tag::Strong) => self.strong_depth += 1,
            Event::End(TagEnd::Strong) => self.strong_depth = self.strong_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::SoftBreak => self.current.push(' '),
            Event::HardBreak => {
                let kind = self.kind;
                self.flush();
                self.kind = kind;
            }
            Event::Rule => {
                self.flush();
                self.lines.push(MdLine {
                    kind: LineKind::Rule,
                    indent: 0,
                    text: String::new(),
                });
            }
            _ => {}
        }
    }
}

/// Flatten markdown into styled logical lines.
pub fn markdown_lines(source: &str) -> Vec<MdLine> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = MdBuilder::default();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.flush();

    while builder.lines.last().is_some_and(|l| l.kind == LineKind::Blank) {
        builder.lines.pop();
    }
    builder.lines
}

/// Wrap logical lines to `width` columns.
pub fn wrap_lines(lines: &[MdLine], width: usize) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for line in lines {
        let style = line.kind.style();
        let indent = " ".repeat(line.indent);
        let avail = width.saturating_sub(line.indent).max(1);

        match line.kind {
            LineKind::Blank => out.push(Line::default()),
            LineKind::Rule => out.push(Line::from(Span::styled("─".repeat(width.max(1)), style))),
            _ => {
                let continuation = if line.kind == LineKind::Item { "  " } else { "" };
                let options = textwrap::Options::new(avail).subsequent_indent(continuation);
                for piece in textwrap::wrap(&line.text, options) {
                    out.push(Line::from(Span::styled(format!("{indent}{piece}"), style)));
                }
            }
        }
    }
    out
}

/// Scrollable markdown pane.
pub struct Viewer {
    pub title: String,
    pub scroll: usize,
    blocks: Vec<MdLine>,
    wrapped: Vec<Line<'static>>,
    wrap_width: usize,
    page: usize,
}

impl Viewer {
    pub fn new(title: impl Into<String>, content: &str) -> Self {
        Self {
            title: title.into(),
            scroll: 0,
            blocks: markdown_lines(content),
            wrapped: Vec::new(),
            wrap_width: 0,
            page: 1,
        }
    }

    pub fn set_content(&mut self, title: impl Into<String>, content: &str) {
        self.title = title.into();
        self.blocks = markdown_lines(content);
        self.wrap_width = 0;
        self.scroll = 0;
    }

    fn layout(&mut self, width: usize, height: usize) {
        if width != self.wrap_width {
            self.wrapped = wrap_lines(&self.blocks, width);
            self.wrap_width = width;
        }
        self.page = height.max(1);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn max_scroll(&self) -> usize {
        self.wrapped.len().saturating_sub(self.page)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = (self.scroll + 1).min(self.max_scroll())
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(self.page),
            KeyCode::PageDown => self.scroll = (self.scroll + self.page).min(self.max_scroll()),
            KeyCode::Home => self.scroll = 0,
            KeyCode::End => self.scroll = self.max_scroll(),
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(3),
            MouseEventKind::ScrollDown => self.scroll = (self.scroll + 3).min(self.max_scroll()),
            _ => return false,
        }
        true
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        self.layout(inner_width, inner_height);

        let total = self.wrapped.len();
        let scroll_info = if total > self.page {
            format!(
                " (lines {}-{} of {total})",
                self.scroll + 1,
                (self.scroll + self.page).min(total)
            )
        } else {
            String::new()
        };

        let visible: Vec<Line> = self
            .wrapped
            .iter()
            .skip(self.scroll)
            .take(self.page)
            .cloned()
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{}{scroll_info}", self.title));

        f.render_widget(Paragraph::new(visible).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn kinds(lines: &[MdLine]) -> Vec<LineKind> {
        lines.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn strategy_answer_renders_as_blocks() {
        let md = "**AI Model: models/gemini-pro**\n\n## Titles\n\n1. First idea\n2. Second *idea*\n\nPlain text with **bold** inside.\n";
        let lines = markdown_lines(md);

        assert_eq!(
            kinds(&lines),
            vec![
                LineKind::Strong,
                LineKind::Blank,
                LineKind::Heading,
                LineKind::Blank,
                LineKind::Item,
                LineKind::Item,
                LineKind::Blank,
                LineKind::Text,
            ]
        );
        assert_eq!(lines[0].text, "AI Model: models/gemini-pro");
        assert_eq!(lines[4].text, "1. First idea");
        assert_eq!(lines[5].text, "2. Second idea");
        assert_eq!(lines[7].text, "Plain text with bold inside.");
    }

    #[test]
    fn nested_bullets_are_indented() {
        let lines = markdown_lines("- top\n  - inner\n- next\n");
        let shape: Vec<(usize, &str)> = lines.iter().map(|l| (l.indent, l.text.as_str())).collect();
        assert_eq!(shape, vec![(0, "• top"), (2, "• inner"), (0, "• next")]);
    }

    #[test]
    fn code_and_tables_keep_their_rows() {
        let lines = markdown_lines("```\nlet a = 1;\nlet b = 2;\n```\n\n| A | B |\n|---|---|\n| 1 | 2 |\n");
        let code: Vec<&str> = lines
            .iter()
            .filter(|l| l.kind == LineKind::Code)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(code, vec!["let a = 1;", "let b = 2;"]);

        let rows: Vec<&str> = lines
            .iter()
            .filter(|l| l.kind == LineKind::Table)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(rows, vec!["A │ B", "1 │ 2"]);
    }

    #[test]
    fn long_lines_wrap_to_width() {
        let lines = markdown_lines("one two three four five six");
        let wrapped = wrap_lines(&lines, 10);
        let text: Vec<String> = wrapped.iter().map(|l| l.to_string()).collect();
        assert_eq!(text, vec!["one two", "three four", "five six"]);
    }

    #[test]
    fn scrolling_is_clamped_to_content() {
        let content: String = (0..30).map(|i| format!("line {i}\n\n")).collect();
        let mut viewer = Viewer::new("AI", &content);
        viewer.layout(40, 10);

        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        viewer.handle_key(key(KeyCode::End));
        let last = viewer.scroll;
        assert_eq!(last, viewer.wrapped.len() - 10);

        viewer.handle_key(key(KeyCode::Down));
        assert_eq!(viewer.scroll, last);

        viewer.handle_key(key(KeyCode::Home));
        viewer.handle_key(key(KeyCode::Up));
        assert_eq!(viewer.scroll, 0);
    }
}
