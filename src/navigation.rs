use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use flume::Receiver;
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::Backend;

use crate::bookmark::{Bookmark, MarkStore};
use crate::document::DocumentSource;
use crate::error::ReaderError;
use crate::inputs::InputEvent;
use crate::layout::Layout;
use crate::pager::Pager;

/// Everything a key can ask the reader to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Top,
    Bottom,
    /// Page down, moving to the next chapter at the bottom.
    Forward,
    /// Page up, moving to the end of the previous chapter at the top.
    Back,
    NextChapter,
    PrevChapter,
    Exit,
}

/// Key bindings. Terminal and global-hook keys share this table.
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Exit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Exit,
        KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
        KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
        KeyCode::Char('h') | KeyCode::Left => Action::ScrollLeft,
        KeyCode::Char('l') | KeyCode::Right => Action::ScrollRight,
        KeyCode::Char('g') => Action::Top,
        KeyCode::Char('G') => Action::Bottom,
        KeyCode::Char('f') => Action::Forward,
        KeyCode::Char('b') => Action::Back,
        KeyCode::Char('F') => Action::NextChapter,
        KeyCode::Char('B') => Action::PrevChapter,
        _ => return None,
    };
    Some(action)
}

/// Reading session: current chapter, the pager showing it and the mark file
/// that follows every move.
pub struct App<D, L> {
    doc: D,
    layout: L,
    pager: Pager,
    chapter: usize,
    marks: MarkStore,
    running: bool,
}

impl<D: DocumentSource, L: Layout> App<D, L> {
    pub fn new(doc: D, layout: L, pager: Pager) -> Self {
        let marks = MarkStore::for_document(doc.path());
        Self::with_mark_store(doc, layout, pager, marks)
    }

    pub fn with_mark_store(doc: D, layout: L, pager: Pager, marks: MarkStore) -> Self {
        info!(
            "Creating reader for {:?} ({} chapters), marks at {}",
            doc.title().unwrap_or("untitled"),
            doc.chapter_count(),
            marks.path().display()
        );
        Self {
            doc,
            layout,
            pager,
            chapter: 0,
            marks,
            running: true,
        }
    }

    pub fn chapter(&self) -> usize {
        self.chapter
    }

    pub fn chapter_count(&self) -> usize {
        self.doc.chapter_count()
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn marks(&self) -> &MarkStore {
        &self.marks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Loads the first chapter, then jumps to the saved position if any.
    pub fn start(&mut self) -> Result<(), ReaderError> {
        self.load(0)?;
        self.restore("")
    }

    /// Replaces the pager contents with chapter `index`. The chapter index
    /// only changes once the new chapter is fully laid out.
    fn load(&mut self, index: usize) -> Result<(), ReaderError> {
        let markup = self
            .doc
            .open_chapter(index)
            .map_err(|source| ReaderError::ChapterLoad { index, source })?;
        let buffer = self
            .layout
            .layout(&markup, self.doc.manifest())
            .map_err(|source| ReaderError::MalformedChapter { index, source })?;
        debug!(
            "chapter {index}: {}x{} cells",
            buffer.width(),
            buffer.height()
        );
        self.pager.set_doc(buffer);
        self.chapter = index;
        Ok(())
    }

    fn is_last_chapter(&self) -> bool {
        self.chapter + 1 >= self.doc.chapter_count()
    }

    pub fn forward(&mut self) -> Result<(), ReaderError> {
        if self.pager.page_down() || self.is_last_chapter() {
            return Ok(());
        }
        self.next_chapter()
    }

    pub fn back(&mut self) -> Result<(), ReaderError> {
        if self.pager.page_up() || self.chapter == 0 {
            return Ok(());
        }
        self.prev_chapter()?;
        self.pager.to_bottom();
        Ok(())
    }

    pub fn next_chapter(&mut self) -> Result<(), ReaderError> {
        if self.is_last_chapter() {
            return Ok(());
        }
        self.load(self.chapter + 1)?;
        self.pager.to_top();
        Ok(())
    }

    pub fn prev_chapter(&mut self) -> Result<(), ReaderError> {
        if self.chapter == 0 {
            return Ok(());
        }
        self.load(self.chapter - 1)?;
        self.pager.to_top();
        Ok(())
    }

    pub fn exit(&mut self) {
        self.running = false;
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), ReaderError> {
        debug!("action {action:?} at chapter {}", self.chapter);
        match action {
            Action::ScrollUp => self.pager.scroll_up(),
            Action::ScrollDown => self.pager.scroll_down(),
            Action::ScrollLeft => self.pager.scroll_left(),
            Action::ScrollRight => self.pager.scroll_right(),
            Action::Top => self.pager.to_top(),
            Action::Bottom => self.pager.to_bottom(),
            Action::Forward => self.forward()?,
            Action::Back => self.back()?,
            Action::NextChapter => self.next_chapter()?,
            Action::PrevChapter => self.prev_chapter()?,
            Action::Exit => self.exit(),
        }
        Ok(())
    }

    /// Jumps to mark `name`, or to the last position when `name` is empty or
    /// unknown. A missing or unreadable mark file leaves the position alone.
    pub fn restore(&mut self, name: &str) -> Result<(), ReaderError> {
        let Some(mark) = self.marks.restore(name) else {
            return Ok(());
        };
        let last = self.doc.chapter_count().saturating_sub(1);
        let chapter = mark.chapter.min(last);
        if chapter != mark.chapter {
            warn!(
                "mark points at chapter {} of {}, using {chapter}",
                mark.chapter,
                self.doc.chapter_count()
            );
        }
        if chapter != self.chapter {
            self.load(chapter)?;
        }
        self.pager.set_scroll_y(mark.scroll_y);
        Ok(())
    }

    /// Saves the current position, and under `name` when it is not empty.
    pub fn record(&mut self, name: &str) {
        let position = Bookmark {
            chapter: self.chapter,
            scroll_y: self.pager.scroll_y(),
        };
        self.marks.record(name, position);
    }

    fn wheel(&mut self, delta: i32) {
        for _ in 0..delta.unsigned_abs() {
            if delta > 0 {
                self.pager.scroll_down();
            } else {
                self.pager.scroll_up();
            }
        }
    }

    pub fn handle_event<B: Backend>(
        &mut self,
        event: InputEvent,
        terminal: &mut Terminal<B>,
    ) -> Result<(), ReaderError> {
        match event {
            InputEvent::Key(key) => {
                if let Some(action) = action_for(&key) {
                    self.dispatch(action)?;
                    self.record("");
                }
            }
            InputEvent::Wheel(delta) => {
                self.wheel(delta);
                self.record("");
            }
            InputEvent::Resize(width, height) => self.pager.set_viewport(width, height),
            InputEvent::Record(name) => self.record(&name),
            InputEvent::Restore(name) => {
                self.restore(&name)?;
                self.record("");
            }
            InputEvent::Notice(message) => self.pager.draw_msg(terminal, &message)?,
            InputEvent::SourceFailed(detail) => return Err(ReaderError::InputSource { detail }),
        }
        Ok(())
    }

    /// Draw, wait for input, act, persist; until exit is requested or every
    /// producer is gone.
    pub fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &Receiver<InputEvent>,
    ) -> Result<(), ReaderError> {
        while self.running {
            self.pager.draw(terminal)?;
            let Ok(event) = events.recv() else {
                info!("all input sources closed");
                break;
            };
            self.handle_event(event, terminal)?;
        }
        info!(
            "leaving at chapter {} scroll_y {}",
            self.chapter,
            self.pager.scroll_y()
        );
        Ok(())
    }
}
