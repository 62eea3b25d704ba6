use ratatui::style::{Color, Modifier};
use std::ops::Range;

/// Character stored in cells that have nothing drawn in them.
pub const EMPTY_CHAR: char = '\0';

/// A single styled character of a laid out chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub modifier: Modifier,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        ch: EMPTY_CHAR,
        fg: Color::Reset,
        bg: Color::Reset,
        modifier: Modifier::empty(),
    };

    pub fn plain(ch: char) -> Self {
        Self { ch, ..Self::EMPTY }
    }

    pub fn styled(ch: char, modifier: Modifier) -> Self {
        Self {
            ch,
            modifier,
            ..Self::EMPTY
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ch == EMPTY_CHAR
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Row-major grid of cells for one chapter.
///
/// `cells.len()` is always a multiple of `width`. Buffers are produced once
/// per chapter by the layout engine and replaced wholesale on chapter change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    width: usize,
    cells: Vec<Cell>,
}

impl Default for CellBuffer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CellBuffer {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            cells: Vec::new(),
        }
    }

    /// Builds a buffer from raw cells, padding the last row with empty cells.
    pub fn from_cells(width: usize, mut cells: Vec<Cell>) -> Self {
        let width = width.max(1);
        let remainder = cells.len() % width;
        if remainder != 0 {
            cells.resize(cells.len() + width - remainder, Cell::EMPTY);
        }
        Self { width, cells }
    }

    /// Plain text rows, one per line. The width is the widest line.
    pub fn from_lines(lines: &[&str]) -> Self {
        let width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(1);
        let mut buffer = Self::new(width);
        for line in lines {
            buffer.push_row(line.chars().map(Cell::plain).collect());
        }
        buffer
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.cells.len() / self.width
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Appends a row, truncating or padding it to the buffer width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.width, Cell::EMPTY);
        self.cells.extend(row);
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        let start = y * self.width;
        if start >= self.cells.len() {
            return &[];
        }
        &self.cells[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.width {
            return None;
        }
        self.cells.get(y * self.width + x)
    }

    /// True when every cell of row `y` inside `columns` is empty.
    pub fn is_row_blank(&self, y: usize, columns: Range<usize>) -> bool {
        let row = self.row(y);
        let end = columns.end.min(row.len());
        let start = columns.start.min(end);
        row[start..end].iter().all(Cell::is_empty)
    }
}
