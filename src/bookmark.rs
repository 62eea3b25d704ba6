use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub chapter: usize,
    pub scroll_y: usize,
}

/// On-disk layout of a mark file: the last reading position plus named marks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkFile {
    pub chapter: usize,
    pub scroll_y: usize,
    #[serde(default, deserialize_with = "marks_or_empty")]
    pub marks: BTreeMap<String, Bookmark>,
}

fn marks_or_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Bookmark>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl MarkFile {
    pub fn position(&self) -> Bookmark {
        Bookmark {
            chapter: self.chapter,
            scroll_y: self.scroll_y,
        }
    }
}

/// Hidden sidecar next to the document: `book.epub` -> `.book.epub.mark`.
pub fn mark_file_path(document: &Path) -> PathBuf {
    let file_name = document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    let dir = document.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!(".{file_name}.mark"))
}

/// Best-effort persistence of reading positions for one document.
///
/// Nothing here returns an error: a mark file that cannot be read or written
/// is logged and reading carries on from the in-memory state.
#[derive(Debug)]
pub struct MarkStore {
    path: PathBuf,
    mark: MarkFile,
}

impl MarkStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            mark: MarkFile::default(),
        }
    }

    pub fn for_document(document: &Path) -> Self {
        Self::new(mark_file_path(document))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> &MarkFile {
        &self.mark
    }

    /// Reloads the mark file and returns the position to jump to: the named
    /// mark when it exists, the last position otherwise.
    pub fn restore(&mut self, name: &str) -> Option<Bookmark> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to open mark file {}: {e}", self.path.display());
                return None;
            }
        };
        match serde_json::from_str::<MarkFile>(&content) {
            Ok(mark) => self.mark = mark,
            Err(e) => {
                log::error!("Failed to decode mark file {}: {e}", self.path.display());
                return None;
            }
        }

        let position = match self.mark.marks.get(name) {
            Some(named) if !name.is_empty() => *named,
            _ => self.mark.position(),
        };
        log::info!(
            "restore mark {name:?}: chapter={} scroll_y={}",
            position.chapter,
            position.scroll_y
        );
        Some(position)
    }

    /// Stores `position` as the last position, and under `name` when given,
    /// then rewrites the whole file.
    pub fn record(&mut self, name: &str, position: Bookmark) {
        self.mark.chapter = position.chapter;
        self.mark.scroll_y = position.scroll_y;
        if !name.is_empty() {
            self.mark.marks.insert(name.to_string(), position);
        }
        log::debug!(
            "record {}: chapter={} scroll_y={} mark={name:?}",
            self.path.display(),
            position.chapter,
            position.scroll_y
        );

        let content = match serde_json::to_string_pretty(&self.mark) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to encode mark file: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, content) {
            log::warn!("Failed to write mark file {}: {e}", self.path.display());
        }
    }
}
