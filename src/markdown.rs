//! Markdown to terminal lines, for assistant replies.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

const CODE_FG: Color = Color::Rgb(166, 227, 161);
const LINK_FG: Color = Color::Rgb(137, 180, 250);
const QUOTE_FG: Color = Color::Rgb(166, 173, 200);

enum Block {
    Text {
        prefix: String,
        segments: Vec<(String, Style)>,
    },
    Code(Vec<String>),
    Rule,
}

#[derive(Default)]
struct Writer {
    blocks: Vec<Block>,
    segments: Vec<(String, Style)>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    item_marker: Option<String>,
    quote_depth: usize,
    code: Option<Vec<String>>,
    link: Option<String>,
}

impl Writer {
    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.extend(text.lines().map(str::to_string));
            return;
        }
        let style = self.style();
        self.segments.push((text.to_string(), style));
    }

    fn flush(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        let indent = "  ".repeat(self.lists.len().saturating_sub(1));
        let quote = "│ ".repeat(self.quote_depth);
        let prefix = match self.item_marker.take() {
            Some(marker) => format!("{quote}{indent}{marker}"),
            None if !self.lists.is_empty() => format!("{quote}{indent}  "),
            None => quote,
        };
        let segments = std::mem::take(&mut self.segments);
        self.blocks.push(Block::Text { prefix, segments });
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.flush(),
            Tag::Heading { level, .. } => {
                self.flush();
                self.push_style(heading_style(level));
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Style::default().fg(QUOTE_FG).add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let mut lines = Vec::new();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        lines.push(format!("[{}]", lang));
                    }
                }
                self.code = Some(lines);
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(Style::default().fg(LINK_FG).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.styles.pop();
            }
            TagEnd::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
            }
            TagEnd::CodeBlock => {
                if let Some(lines) = self.code.take() {
                    self.blocks.push(Block::Code(lines));
                }
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    let style = self.style().fg(QUOTE_FG);
                    self.segments.push((format!(" ({url})"), style));
                }
            }
            _ => {}
        }
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 | HeadingLevel::H2 => base.fg(LINK_FG),
        _ => base,
    }
}

pub fn render(input: &str, width: u16) -> Vec<Line<'static>> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);

    let mut writer = Writer::default();
    for event in Parser::new_ext(input, opts) {
        match event {
            Event::Start(tag) => writer.start(tag),
            Event::End(tag) => writer.end(tag),
            Event::Text(text) => writer.text(&text),
            Event::Code(code) => {
                let style = writer.style().fg(CODE_FG);
                writer.segments.push((code.to_string(), style));
            }
            Event::SoftBreak => writer.text(" "),
            Event::HardBreak => writer.flush(),
            Event::Rule => {
                writer.flush();
                writer.blocks.push(Block::Rule);
            }
            Event::TaskListMarker(done) => writer.text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }
    writer.flush();

    let width = width.max(8) as usize;
    let mut lines = Vec::new();
    for (i, block) in writer.blocks.into_iter().enumerate() {
        match block {
            Block::Text { prefix, segments } => {
                let starts_item = prefix.ends_with("• ") || prefix.ends_with(". ");
                if i > 0 && !starts_item && prefix.trim().is_empty() {
                    lines.push(Line::default());
                }
                lines.extend(wrap_segments(&prefix, &segments, width));
            }
            Block::Code(code) => {
                for line in code {
                    lines.push(Line::from(Span::styled(
                        format!("  {line}"),
                        Style::default().fg(CODE_FG),
                    )));
                }
            }
            Block::Rule => lines.push(Line::from("─".repeat(width.min(20)))),
        }
    }
    lines
}

/// Greedy word wrap over styled segments. Continuation lines are indented
/// to the prefix width.
fn wrap_segments(prefix: &str, segments: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    let indent = " ".repeat(prefix.width());
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = vec![Span::raw(prefix.to_string())];
    let mut used = prefix.width();
    let mut line_has_words = false;

    for (text, style) in segments {
        for (n, word) in text.split(' ').enumerate() {
            let needs_space = n > 0 || text.starts_with(' ');
            let word_width = word.width();
            if word.is_empty() {
                continue;
            }
            let space = usize::from(needs_space && line_has_words);
            if line_has_words && used + space + word_width > width {
                lines.push(Line::from(std::mem::take(&mut current)));
                current.push(Span::raw(indent.clone()));
                used = indent.width();
                line_has_words = false;
            }
            if needs_space && line_has_words {
                current.push(Span::styled(" ", *style));
                used += 1;
            }
            current.push(Span::styled(word.to_string(), *style));
            used += word_width;
            line_has_words = true;
        }
    }
    if line_has_words {
        lines.push(Line::from(current));
    }
    lines
}

/// Plain text of rendered lines, for tests and clipboard use.
pub fn plain(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_separated() {
        let lines = render("one\n\ntwo", 40);
        assert_eq!(plain(&lines), "one\n\ntwo");
    }

    #[test]
    fn bullets_get_markers() {
        let lines = render("- a\n- b", 40);
        assert_eq!(plain(&lines), "• a\n• b");
    }

    #[test]
    fn ordered_lists_count() {
        let lines = render("1. a\n2. b", 40);
        assert_eq!(plain(&lines), "1. a\n2. b");
    }

    #[test]
    fn strong_text_is_bold() {
        let lines = render("a **b** c", 40);
        let bold = lines[0]
            .spans
            .iter()
            .find(|span| span.content.as_ref() == "b")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn long_text_wraps_under_width() {
        let text = "palavra ".repeat(20);
        let lines = render(&text, 20);
        assert!(lines.len() > 1);
        for line in &lines {
            let width: usize = line.spans.iter().map(|s| s.content.width()).sum();
            assert!(width <= 20, "line too wide: {width}");
        }
    }

    #[test]
    fn code_blocks_keep_lines() {
        let lines = render("```rust\nfn main() {}\n```", 40);
        assert_eq!(plain(&lines), "  [rust]\n  fn main() {}");
    }

    #[test]
    fn links_show_target() {
        let lines = render("[docs](https://a.example)", 60);
        assert_eq!(plain(&lines), "docs (https://a.example)");
    }
}
