//! On-disk drawing storage.
//!
//! Drawings live as JSON files in the user data directory; the special
//! `persistent` drawing is the auto-restored page. Writes go through a
//! temporary file plus rename under an advisory lock, so a crash never
//! leaves a half-written drawing behind. A missing or unreadable file is
//! "no data", never a fatal error.

use super::codec;
use crate::draw::element::Element;
use anyhow::{Context as _, Result, bail};
use chrono::Local;
use fs2::FileExt;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name of the auto-saved, auto-restored drawing.
pub const PERSISTENT_NAME: &str = "persistent";

/// A named drawing found in the store.
#[derive(Debug, Clone)]
pub struct DrawingFileInfo {
    pub name: String,
    pub modified: SystemTime,
    pub path: PathBuf,
}

/// File-system backed drawing store.
pub struct DrawingStore {
    data_dir: PathBuf,
    export_dir: PathBuf,
}

impl DrawingStore {
    pub fn new(data_dir: PathBuf, export_dir: PathBuf) -> Self {
        Self {
            data_dir,
            export_dir,
        }
    }

    /// Store rooted at the user's data directory, exporting to the pictures
    /// directory.
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .context("no user data directory")?
            .join("inkboard");
        let export_dir = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .context("no export directory")?;
        Ok(Self::new(data_dir, export_dir))
    }

    pub fn drawing_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join("drawings.lock")
    }

    /// Writes serialized drawing contents under `name`, atomically.
    pub fn save(&self, name: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("failed to create drawing directory {}", self.data_dir.display())
        })?;

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        FileExt::lock_exclusive(&lock_file)
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;

        let result = self.save_inner(name, contents);

        if let Err(err) = FileExt::unlock(&lock_file) {
            warn!("failed to unlock {}: {err}", lock_path.display());
        }
        result
    }

    fn save_inner(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let target = self.drawing_path(name);
        let tmp_path = temp_path(&target);
        {
            let mut tmp_file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)
                .with_context(|| {
                    format!("failed to open temporary drawing file {}", tmp_path.display())
                })?;
            tmp_file
                .write_all(contents.as_bytes())
                .context("failed to write drawing contents")?;
            tmp_file
                .sync_all()
                .context("failed to sync temporary drawing file")?;
        }
        fs::rename(&tmp_path, &target).with_context(|| {
            format!(
                "failed to move temporary drawing file {} -> {}",
                tmp_path.display(),
                target.display()
            )
        })?;

        info!("drawing saved to {} ({} bytes)", target.display(), contents.len());
        Ok(target)
    }

    /// Coalesced write of the persistent drawing: skipped when the page is
    /// empty and nothing was ever stored, or when the serialization matches
    /// what is already on disk. Returns whether a write happened.
    pub fn save_persistent(&self, contents: &str) -> Result<bool> {
        let path = self.drawing_path(PERSISTENT_NAME);
        let existing = fs::read_to_string(&path).ok();

        if existing.is_none() && is_empty_document(contents) {
            debug!("skipping persistent save: nothing stored and nothing to store");
            return Ok(false);
        }
        if existing.as_deref() == Some(contents) {
            debug!("skipping persistent save: contents unchanged");
            return Ok(false);
        }

        self.save(PERSISTENT_NAME, contents)?;
        Ok(true)
    }

    /// Loads a drawing by name. Missing, unreadable or malformed files are
    /// treated as "no data" and logged, never raised.
    pub fn load(&self, name: &str) -> Result<Option<Vec<Element>>> {
        let path = self.drawing_path(name);
        if !path.exists() {
            debug!("no drawing file at {}", path.display());
            return Ok(None);
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        FileExt::lock_shared(&lock_file)
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;

        let result = load_inner(&path);

        if let Err(err) = FileExt::unlock(&lock_file) {
            warn!("failed to unlock {}: {err}", lock_path.display());
        }
        result
    }

    pub fn load_persistent(&self) -> Result<Option<Vec<Element>>> {
        self.load(PERSISTENT_NAME)
    }

    /// Named drawings in the store, newest first. The persistent drawing is
    /// not listed. Enumeration problems yield an empty list.
    pub fn list(&self) -> Vec<DrawingFileInfo> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut drawings = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if name == PERSISTENT_NAME {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            drawings.push(DrawingFileInfo {
                name: name.to_string(),
                modified,
                path,
            });
        }

        drawings.sort_by(|a, b| b.modified.cmp(&a.modified));
        drawings
    }

    /// Removes a named drawing. Returns whether a file was actually deleted.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.drawing_path(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("failed to delete drawing {}", path.display()))?;
        Ok(true)
    }

    /// Writes exported SVG markup under a timestamped name in the export
    /// directory, refusing to overwrite.
    pub fn export_svg(&self, markup: &str) -> Result<PathBuf> {
        let filename = format!("Drawing {}.svg", Local::now().format("%F %X"));
        let path = self.export_dir.join(filename);
        if path.exists() {
            bail!("export target {} already exists", path.display());
        }
        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!("failed to create export directory {}", self.export_dir.display())
        })?;
        fs::write(&path, markup)
            .with_context(|| format!("failed to write SVG export {}", path.display()))?;
        info!("drawing exported to {}", path.display());
        Ok(path)
    }
}

fn load_inner(path: &Path) -> Result<Option<Vec<Element>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("unreadable drawing file {}: {err}", path.display());
            return Ok(None);
        }
    };
    match codec::deserialize_elements(&contents) {
        Ok(elements) => Ok(Some(elements)),
        Err(err) => {
            warn!("ignoring malformed drawing file {}: {err}", path.display());
            Ok(None)
        }
    }
}

fn is_empty_document(contents: &str) -> bool {
    serde_json::from_str::<Vec<serde_json::Value>>(contents)
        .map(|records| records.is_empty())
        .unwrap_or(false)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut candidate = target.with_extension("json.tmp");
    let mut counter = 0u32;
    while candidate.exists() {
        counter += 1;
        candidate = target.with_extension(format!("json.tmp{counter}"));
    }
    candidate
}
