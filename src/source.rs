//! Image picker capability.
//!
//! Camera, gallery and drag-and-drop all reduce to "give me one image or
//! nothing". Front-ends implement `ImageSource`; the workflow only sees
//! `ImageSelection`s.

use crate::error::SourceError;
use crate::validate::ImageSelection;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Extensions treated as candidate images when scanning a directory.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// `Ok(None)` means the user cancelled or nothing new is available.
    async fn pick(&self) -> Result<Option<ImageSelection>, SourceError>;
}

/// A single file given up front (CLI argument, dropped file).
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ImageSource for FileSource {
    async fn pick(&self) -> Result<Option<ImageSelection>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::NoImage(self.path.display().to_string()));
        }
        ImageSelection::from_path(&self.path).map(Some)
    }
}

/// Newest image in a capture directory that hasn't been picked yet.
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    seen: Mutex<HashSet<(PathBuf, Option<SystemTime>)>>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl ImageSource for DirectorySource {
    async fn pick(&self) -> Result<Option<ImageSelection>, SourceError> {
        let candidates = list_images(&self.dir)?;
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        let newest = candidates
            .into_iter()
            .filter(|key| !seen.contains(key))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        match newest {
            Some(key) => {
                let selection = ImageSelection::from_path(&key.0)?;
                log::info!("[SOURCE] Picked {}", key.0.display());
                seen.insert(key);
                Ok(Some(selection))
            }
            None => Ok(None),
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<(PathBuf, Option<SystemTime>)>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::NoImage(dir.display().to_string()));
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image || !path.is_file() {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).ok();
        out.push((path, modified));
    }
    Ok(out)
}
