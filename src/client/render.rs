use pulldown_cmark::{ CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd };

use crate::models::chat::{ ChatMessage, Role };

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const STRIKE: &str = "\x1b[9m";
const CODE: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Turns transcript messages into terminal text. Assistant replies are read
/// as markdown; everything else is printed verbatim.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    ansi: bool,
}

impl Renderer {
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }

    pub fn render_message(&self, message: &ChatMessage) -> String {
        match message.role {
            Role::Assistant => self.render_markdown(&message.content),
            Role::User | Role::System => message.content.clone(),
        }
    }

    pub fn render_markdown(&self, input: &str) -> String {
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
        let mut writer = Writer::new(self.ansi);
        for event in Parser::new_ext(input, options) {
            writer.event(event);
        }
        writer.finish()
    }
}

struct Writer {
    ansi: bool,
    out: String,
    line: String,
    quote_depth: usize,
    // One entry per open list; `Some(n)` is the next ordinal of an ordered list.
    lists: Vec<Option<u64>>,
    marker: Option<String>,
    marker_pad: usize,
    bold: bool,
    italic: bool,
    strike: bool,
    link: Option<String>,
    code: Option<String>,
    // Cells already written on the current table row; `None` outside tables.
    table_cells: Option<usize>,
}

impl Writer {
    fn new(ansi: bool) -> Self {
        Self {
            ansi,
            out: String::new(),
            line: String::new(),
            quote_depth: 0,
            lists: Vec::new(),
            marker: None,
            marker_pad: 0,
            bold: false,
            italic: false,
            strike: false,
            link: None,
            code: None,
            table_cells: None,
        }
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                match self.code.as_mut() {
                    Some(buf) => buf.push_str(&text),
                    None => self.line.push_str(&text),
                }
            }
            Event::Code(code) => {
                if self.ansi {
                    self.line.push_str(CODE);
                    self.line.push_str(&code);
                    self.restyle();
                } else {
                    self.line.push('`');
                    self.line.push_str(&code);
                    self.line.push('`');
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let mut pieces = html.split('\n');
                if let Some(first) = pieces.next() {
                    self.line.push_str(first);
                }
                for piece in pieces {
                    self.flush_line();
                    self.line.push_str(piece);
                }
            }
            Event::SoftBreak => self.line.push(' '),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.line.push_str(&"─".repeat(24));
                self.flush_line();
                self.blank();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.line.push_str(&"#".repeat(heading_depth(level)));
                self.line.push(' ');
                self.bold = true;
                self.restyle();
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        *n += 1;
                        format!("{}. ", *n - 1)
                    }
                    _ => "• ".to_string(),
                };
                self.marker_pad = marker.chars().count();
                self.marker = Some(marker);
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.trim().is_empty() {
                        let label = format!("[{}]", lang.trim());
                        if self.ansi {
                            self.line.push_str(DIM);
                            self.line.push_str(&label);
                            self.line.push_str(RESET);
                        } else {
                            self.line.push_str(&label);
                        }
                        self.flush_line();
                    }
                }
                self.code = Some(String::new());
            }
            Tag::Strong => {
                self.bold = true;
                self.restyle();
            }
            Tag::Emphasis => {
                self.italic = true;
                self.restyle();
            }
            Tag::Strikethrough => {
                self.strike = true;
                self.restyle();
            }
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.to_string()),
            Tag::Table(_) | Tag::TableHead | Tag::TableRow => {
                self.flush_line();
                self.table_cells = Some(0);
            }
            Tag::TableCell => {
                if let Some(n) = self.table_cells.as_mut() {
                    if *n > 0 {
                        self.line.push_str(" | ");
                    }
                    *n += 1;
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.bold = false;
                self.restyle();
                self.flush_line();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 && self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.marker_pad = 0;
                    self.blank();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::CodeBlock => {
                let code = self.code.take().unwrap_or_default();
                for code_line in code.trim_end_matches('\n').lines() {
                    self.line.push_str("    ");
                    if self.ansi {
                        self.line.push_str(CODE);
                        self.line.push_str(code_line);
                        self.line.push_str(RESET);
                    } else {
                        self.line.push_str(code_line);
                    }
                    self.flush_line();
                }
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Strong => {
                self.bold = false;
                self.restyle();
            }
            TagEnd::Emphasis => {
                self.italic = false;
                self.restyle();
            }
            TagEnd::Strikethrough => {
                self.strike = false;
                self.restyle();
            }
            TagEnd::Link => {
                if let Some(url) = self.link.take() {
                    self.line.push_str(&format!(" <{}>", url));
                }
            }
            TagEnd::HtmlBlock => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::TableHead => {
                let width = visible_width(&self.line);
                self.flush_line();
                self.line.push_str(&"─".repeat(width));
                self.flush_line();
            }
            TagEnd::TableRow => self.flush_line(),
            TagEnd::Table => {
                self.flush_line();
                self.table_cells = None;
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            _ => {}
        }
    }

    // Resets, then re-applies the styles still active.
    fn restyle(&mut self) {
        if !self.ansi {
            return;
        }
        self.line.push_str(RESET);
        if self.bold {
            self.line.push_str(BOLD);
        }
        if self.italic {
            self.line.push_str(ITALIC);
        }
        if self.strike {
            self.line.push_str(STRIKE);
        }
    }

    fn prefix(&mut self) -> String {
        let mut prefix = "│ ".repeat(self.quote_depth);
        if !self.lists.is_empty() {
            prefix.push_str(&"  ".repeat(self.lists.len() - 1));
            match self.marker.take() {
                Some(marker) => prefix.push_str(&marker),
                None => prefix.push_str(&" ".repeat(self.marker_pad)),
            }
        }
        prefix
    }

    fn flush_line(&mut self) {
        if self.line.is_empty() || (self.ansi && self.line == RESET) {
            self.line.clear();
            return;
        }
        let prefix = self.prefix();
        self.out.push_str(&prefix);
        self.out.push_str(&self.line);
        if self.ansi && (self.bold || self.italic || self.strike) {
            self.out.push_str(RESET);
        }
        self.out.push('\n');
        self.line.clear();
        if self.ansi {
            self.restyle();
            if self.line == RESET {
                self.line.clear();
            }
        }
    }

    fn blank(&mut self) {
        if self.out.is_empty() || self.out.ends_with("\n\n") {
            return;
        }
        self.out.push('\n');
    }

    fn finish(mut self) -> String {
        self.flush_line();
        self.out.trim_end().to_string()
    }
}

// Character count with ANSI escape sequences skipped.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in text.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (false, _) => width += 1,
            (true, 'm') => in_escape = false,
            (true, _) => {}
        }
    }
    width
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
