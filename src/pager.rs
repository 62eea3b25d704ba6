//! Viewport over a chapter's [`CellBuffer`].
//!
//! The pager owns the scroll offsets and knows how big the terminal was the
//! last time it drew. Scroll bounds are always derived from that size, so a
//! resize between two draws is picked up on the next draw or scroll call.
//!
//! `scroll_x` is zero or negative: `-scroll_x` columns of the buffer are
//! hidden on the left. `scroll_y` is the first buffer row shown at the top.

use std::thread;
use std::time::Duration;

use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

use crate::cell_buffer::CellBuffer;
use crate::error::ReaderError;

#[derive(Debug, Default)]
pub struct Pager {
    scroll_x: i32,
    scroll_y: usize,
    doc: CellBuffer,
    view_width: usize,
    view_height: usize,
    /// Skip rows whose visible part is empty.
    compact: bool,
    message_pause: Duration,
}

impl Pager {
    pub fn new(compact: bool, message_pause: Duration) -> Self {
        Self {
            compact,
            message_pause,
            ..Self::default()
        }
    }

    /// Replaces the active buffer. Offsets are kept so a saved position can be
    /// applied after loading.
    pub fn set_doc(&mut self, doc: CellBuffer) {
        self.doc = doc;
    }

    pub fn doc(&self) -> &CellBuffer {
        &self.doc
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.view_width = width as usize;
        self.view_height = height as usize;
    }

    pub fn viewport(&self) -> (usize, usize) {
        (self.view_width, self.view_height)
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn scroll_x(&self) -> i32 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> usize {
        self.scroll_y
    }

    /// Stores `y` as is; it is clamped on the next draw or scroll call.
    pub fn set_scroll_y(&mut self, y: usize) {
        self.scroll_y = y;
    }

    /// Width and height of the underlying buffer.
    pub fn size(&self) -> (usize, usize) {
        (self.doc.width(), self.doc.height())
    }

    pub fn max_scroll_x(&self) -> i32 {
        let max = self.doc.width().saturating_sub(self.view_width);
        i32::try_from(max).unwrap_or(i32::MAX)
    }

    pub fn max_scroll_y(&self) -> usize {
        self.doc.height().saturating_sub(self.view_height)
    }

    /// Number of whole viewport pages in the buffer.
    pub fn pages(&self) -> usize {
        self.doc.height() / self.page_height()
    }

    fn page_height(&self) -> usize {
        self.view_height.max(1)
    }

    fn clamp(&mut self) {
        self.scroll_y = self.scroll_y.min(self.max_scroll_y());
        self.scroll_x = self.scroll_x.clamp(-self.max_scroll_x(), 0);
    }

    pub fn scroll_down(&mut self) {
        self.clamp();
        if self.scroll_y < self.max_scroll_y() {
            self.scroll_y += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.clamp();
        self.scroll_y = self.scroll_y.saturating_sub(1);
    }

    pub fn scroll_left(&mut self) {
        self.clamp();
        if self.scroll_x < 0 {
            self.scroll_x += 1;
        }
    }

    pub fn scroll_right(&mut self) {
        self.clamp();
        if self.scroll_x > -self.max_scroll_x() {
            self.scroll_x -= 1;
        }
    }

    /// Moves down one viewport height. Returns false when already at the
    /// bottom, which callers use to move on to the next chapter.
    pub fn page_down(&mut self) -> bool {
        self.clamp();
        let max = self.max_scroll_y();
        if self.scroll_y < max {
            self.scroll_y = (self.scroll_y + self.page_height()).min(max);
            return true;
        }
        false
    }

    /// Moves up one viewport height. A partial page at the top of the buffer
    /// snaps to zero and still counts as movement.
    pub fn page_up(&mut self) -> bool {
        self.clamp();
        let height = self.page_height();
        if self.scroll_y > height {
            self.scroll_y -= height;
            true
        } else if self.scroll_y > 0 {
            self.scroll_y = 0;
            true
        } else {
            false
        }
    }

    pub fn to_top(&mut self) {
        self.scroll_x = 0;
        self.scroll_y = 0;
    }

    /// Jumps to the last full page boundary.
    pub fn to_bottom(&mut self) {
        self.scroll_x = 0;
        self.scroll_y = self.pages() * self.page_height();
    }

    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), ReaderError> {
        terminal
            .draw(|frame| {
                let area = frame.area();
                self.render(frame.buffer_mut(), area);
            })
            .map_err(ReaderError::render)?;
        Ok(())
    }

    /// Shows `msg` on the top row for a moment, then redraws the page.
    pub fn draw_msg<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        msg: &str,
    ) -> Result<(), ReaderError> {
        terminal
            .draw(|frame| {
                let area = frame.area();
                self.render(frame.buffer_mut(), area);
                let status = Rect::new(area.x, area.y, area.width, area.height.min(1));
                for x in status.left()..status.right() {
                    if let Some(cell) = frame.buffer_mut().cell_mut((x, status.y)) {
                        cell.reset();
                    }
                }
                frame
                    .buffer_mut()
                    .set_stringn(status.x, status.y, msg, status.width as usize, Style::default());
            })
            .map_err(ReaderError::render)?;
        if !self.message_pause.is_zero() {
            thread::sleep(self.message_pause);
        }
        self.draw(terminal)
    }

    /// Paints the visible window of the buffer into `buf`.
    pub fn render(&mut self, buf: &mut Buffer, area: Rect) {
        self.set_viewport(area.width, area.height);
        self.clamp();

        let doc_width = self.doc.width();
        let center_offset = self.view_width.saturating_sub(doc_width) / 2;
        let first_col = (-self.scroll_x) as usize;
        let last_col = (first_col + self.view_width).min(doc_width);

        let mut screen_y = 0;
        let mut row = self.scroll_y;
        while screen_y < self.view_height && row < self.doc.height() {
            let y = row;
            row += 1;
            if self.compact && self.doc.is_row_blank(y, first_col..last_col) {
                continue;
            }
            for (offset, cell) in self.doc.row(y)[first_col..last_col].iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let x = area.x as usize + center_offset + offset;
                let target = (x as u16, area.y + screen_y as u16);
                if let Some(out) = buf.cell_mut(target) {
                    out.set_char(cell.ch)
                        .set_fg(cell.fg)
                        .set_bg(cell.bg)
                        .set_style(Style::default().add_modifier(cell.modifier));
                }
            }
            screen_y += 1;
        }
    }
}
