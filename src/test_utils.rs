pub mod test_helpers {
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    use crate::cell_buffer::CellBuffer;
    use crate::document::{DocumentError, DocumentSource, ManifestItem};
    use crate::inputs::InputEvent;
    use crate::inputs::event_source::{Event, KeyCode, KeyModifiers, MouseEventKind, SimulatedEventSource};
    use crate::layout::{Layout, LayoutError};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events
                .push(SimulatedEventSource::key_event(code, KeyModifiers::empty()));
            self
        }

        /// Scroll down n rows (press 'j' n times)
        pub fn scroll_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Scroll up n rows (press 'k' n times)
        pub fn scroll_up(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        /// Page forward (press 'f')
        pub fn page_forward(self) -> Self {
            self.press_char('f')
        }

        /// Page back (press 'b')
        pub fn page_back(self) -> Self {
            self.press_char('b')
        }

        pub fn wheel_down(mut self) -> Self {
            self.events
                .push(SimulatedEventSource::wheel(MouseEventKind::ScrollDown));
            self
        }

        pub fn wheel_up(mut self) -> Self {
            self.events
                .push(SimulatedEventSource::wheel(MouseEventKind::ScrollUp));
            self
        }

        pub fn resize(mut self, width: u16, height: u16) -> Self {
            self.events.push(Event::Resize(width, height));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }

        /// The same script as navigation events, for feeding a channel
        /// directly.
        pub fn into_input_events(self) -> Vec<InputEvent> {
            self.events
                .into_iter()
                .filter_map(crate::inputs::unifier::terminal_event)
                .collect()
        }
    }

    /// Chapters held in memory. `path` only decides where the mark file goes.
    pub struct MemoryDocument {
        chapters: Vec<String>,
        failing: HashSet<usize>,
        manifest: Vec<ManifestItem>,
        path: PathBuf,
        pub opened: Vec<usize>,
    }

    impl MemoryDocument {
        pub fn new(path: &Path, chapters: Vec<String>) -> Self {
            Self {
                chapters,
                failing: HashSet::new(),
                manifest: Vec::new(),
                path: path.to_path_buf(),
                opened: Vec::new(),
            }
        }

        /// Chapter `index` fails to open.
        pub fn failing_on(mut self, index: usize) -> Self {
            self.failing.insert(index);
            self
        }
    }

    impl DocumentSource for MemoryDocument {
        fn chapter_count(&self) -> usize {
            self.chapters.len()
        }

        fn open_chapter(&mut self, index: usize) -> Result<Vec<u8>, DocumentError> {
            self.opened.push(index);
            if self.failing.contains(&index) {
                return Err(DocumentError::Io {
                    item: format!("chapter{index}.xhtml"),
                });
            }
            self.chapters
                .get(index)
                .map(|chapter| chapter.clone().into_bytes())
                .ok_or(DocumentError::NotFound(index))
        }

        fn manifest(&self) -> &[ManifestItem] {
            &self.manifest
        }

        fn title(&self) -> Option<&str> {
            Some("memory")
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    /// One buffer row per line of markup, no wrapping.
    #[derive(Debug, Default, Clone)]
    pub struct LinesLayout;

    impl Layout for LinesLayout {
        fn layout(&self, markup: &[u8], _manifest: &[ManifestItem]) -> Result<CellBuffer, LayoutError> {
            let text = std::str::from_utf8(markup)
                .map_err(|e| LayoutError::MalformedMarkup(e.to_string()))?;
            let lines: Vec<&str> = text.lines().collect();
            Ok(CellBuffer::from_lines(&lines))
        }
    }

    /// Chapter text with `rows` lines reading `<tag> 00`, `<tag> 01`, ...
    pub fn numbered_chapter(tag: &str, rows: usize) -> String {
        (0..rows)
            .map(|i| format!("{tag} {i:02}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }
}
