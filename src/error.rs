use crate::document::DocumentError;
use crate::layout::LayoutError;

/// Errors that end a reading session.
///
/// Bookmark persistence failures never show up here; they are logged and the
/// session keeps going.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("terminal init: {0}")]
    TerminalInit(#[source] std::io::Error),

    #[error("chapter {index}: {source}")]
    ChapterLoad {
        index: usize,
        #[source]
        source: DocumentError,
    },

    #[error("chapter {index}: {source}")]
    MalformedChapter {
        index: usize,
        #[source]
        source: LayoutError,
    },

    #[error("render: {detail}")]
    Render { detail: String },

    #[error("input source: {detail}")]
    InputSource { detail: String },
}

impl ReaderError {
    pub fn render(detail: impl ToString) -> Self {
        Self::Render {
            detail: detail.to_string(),
        }
    }
}
