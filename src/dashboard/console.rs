//! The shared console every run writes to.

/// Text shown before anything has been logged, and after a clear.
pub const CONSOLE_PLACEHOLDER: &str = "Console ready. Run a proof to see its output here.";

#[derive(Debug, Clone)]
pub struct ConsoleSink {
    content: String,
    // Lines scrolled up from the bottom; 0 follows the newest line.
    scroll_offset: usize,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            content: CONSOLE_PLACEHOLDER.to_string(),
            scroll_offset: 0,
        }
    }
}

impl ConsoleSink {
    pub fn append(&mut self, line: &str) {
        if self.is_placeholder() {
            self.content.clear();
        }
        self.content.push_str(line);
        self.content.push('\n');
        self.scroll_offset = 0;
    }

    pub fn clear(&mut self) {
        self.content = CONSOLE_PLACEHOLDER.to_string();
        self.scroll_offset = 0;
    }

    pub fn is_placeholder(&self) -> bool {
        self.content == CONSOLE_PLACEHOLDER
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn scroll_up(&mut self, by: usize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + by).min(max);
    }

    pub fn scroll_down(&mut self, by: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(by);
    }
}
