use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Tag identifying the shape of data exchanged between stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// Preprocessed per-night images paired with their product files.
    ImageCollection,
    /// Nightly coadds (and, once extraction ran, their source catalogs).
    CoaddedSet,
    /// Subimages centered on the follow-up target.
    SubimageSet,
    /// Target light curve extracted from the difference images.
    LightCurve,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageCollection => write!(f, "image collection"),
            Self::CoaddedSet => write!(f, "coadded set"),
            Self::SubimageSet => write!(f, "subimage set"),
            Self::LightCurve => write!(f, "light curve"),
        }
    }
}

/// Value handed from one stage to the next: a kind tag plus the discovered
/// image and product paths. Stages never rescan each other's directories;
/// whatever a stage found is carried here explicitly.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub kind: DataKind,
    pub images: Vec<PathBuf>,
    pub prods: Vec<PathBuf>,
}

impl Artifact {
    pub fn empty(kind: DataKind) -> Self {
        Self {
            kind,
            images: Vec::new(),
            prods: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.prods.is_empty()
    }

    /// Discover an artifact under a stage output directory laid out with
    /// the conventional `image/` and `prod/` subdirectories. A missing
    /// subdirectory yields an empty list; postcondition checks are the
    /// caller's responsibility.
    pub fn discover(kind: DataKind, dir: &Path) -> Result<Self> {
        Ok(Self {
            kind,
            images: list_files_sorted(&dir.join("image"))?,
            prods: list_files_sorted(&dir.join("prod"))?,
        })
    }
}

/// List the files in a directory, sorted by file name. A missing directory
/// is treated as empty.
pub fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// File name (lossy UTF-8) of a path, empty when absent.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem (lossy UTF-8) of a path, empty when absent.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
