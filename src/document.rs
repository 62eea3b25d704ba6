use epub::doc::EpubDoc;
use log::{error, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("no chapter at index {0}")]
    NotFound(usize),

    #[error("cannot read {item}")]
    Io { item: String },

    #[error("cannot open {path}: {detail}")]
    Open { path: String, detail: String },
}

/// A file packaged with the document, as listed in its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub mime: String,
}

/// Where chapters come from. The reader only ever asks for whole chapters.
pub trait DocumentSource {
    fn chapter_count(&self) -> usize;

    fn open_chapter(&mut self, index: usize) -> Result<Vec<u8>, DocumentError>;

    fn manifest(&self) -> &[ManifestItem];

    fn title(&self) -> Option<&str>;

    fn path(&self) -> &Path;
}

/// EPUB package read through the `epub` crate, chapters in spine order.
pub struct EpubDocument {
    doc: EpubDoc<BufReader<File>>,
    path: PathBuf,
    title: Option<String>,
    manifest: Vec<ManifestItem>,
}

impl EpubDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        info!("Attempting to load EPUB file: {}", path.display());
        let doc = EpubDoc::new(path).map_err(|e| {
            error!("Failed to create EpubDoc for {}: {e}", path.display());
            DocumentError::Open {
                path: path.display().to_string(),
                detail: e.to_string(),
            }
        })?;

        let title = doc.mdata("title").map(|item| item.value.clone());
        for field in ["title", "creator", "contributor", "language", "identifier"] {
            if let Some(item) = doc.mdata(field) {
                info!("EPUB {field}: {value}", value = item.value);
            }
        }

        let mut manifest: Vec<ManifestItem> = doc
            .resources
            .iter()
            .map(|(id, resource)| ManifestItem {
                id: id.clone(),
                href: resource.path.to_string_lossy().into_owned(),
                mime: resource.mime.clone(),
            })
            .collect();
        manifest.sort_by(|a, b| a.href.cmp(&b.href));
        info!(
            "EPUB spine: {} chapters, {} manifest items",
            doc.spine.len(),
            manifest.len()
        );

        Ok(Self {
            doc,
            path: path.to_path_buf(),
            title,
            manifest,
        })
    }
}

impl DocumentSource for EpubDocument {
    fn chapter_count(&self) -> usize {
        self.doc.spine.len()
    }

    fn open_chapter(&mut self, index: usize) -> Result<Vec<u8>, DocumentError> {
        let idref = self
            .doc
            .spine
            .get(index)
            .map(|item| item.idref.clone())
            .ok_or(DocumentError::NotFound(index))?;
        let (content, mime) = self
            .doc
            .get_resource(&idref)
            .ok_or_else(|| DocumentError::Io { item: idref.clone() })?;
        log::debug!("chapter {index} ({idref}): {} bytes of {mime}", content.len());
        Ok(content)
    }

    fn manifest(&self) -> &[ManifestItem] {
        &self.manifest
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
