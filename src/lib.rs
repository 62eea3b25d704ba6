pub mod bookmark;
pub mod cell_buffer;
pub mod document;
pub mod error;
pub mod inputs;
pub mod layout;
pub mod navigation;
pub mod pager;
pub mod panic_handler;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bookmark::{Bookmark, MarkStore};
pub use cell_buffer::{Cell, CellBuffer};
pub use document::{DocumentSource, EpubDocument};
pub use error::ReaderError;
pub use layout::{HtmlLayout, Layout};
pub use navigation::{Action, App};
pub use pager::Pager;
