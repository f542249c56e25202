use std::path::{PathBuf, StripPrefixError};

use derive_more::{Display, Error, From};
use walkdir::WalkDir;

/// Errors that may occur while walking the build directory.
#[derive(Debug, Display, From, Error)]
pub(crate) enum WalkError {
    /// [`walkdir`]-crate specific error.
    #[display(fmt = "unable to read build directory: {}", _0)]
    WalkDir(walkdir::Error),

    /// Unable to strip the build root prefix from a path.
    StripPrefix(StripPrefixError),
}

/// A regular file discovered under the build root.
#[derive(Debug)]
pub(crate) struct AssetFile {
    /// Path used to read the file contents.
    pub path: PathBuf,

    /// Path relative to the build root.
    pub relative: PathBuf,
}

/// Build output directory that can be walked any number of times.
pub(crate) struct AssetTree {
    /// Build root.
    root: PathBuf,
}

impl AssetTree {
    /// Create a new tree rooted at `root`.
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lazily iterate over every regular file under the build root, depth-first.
    ///
    /// Each call starts a fresh walk, and nothing beyond the current directory
    /// handles is held in memory. Entries within a directory are visited in file
    /// name order, so repeated walks over an unchanged tree yield the same sequence.
    /// Symbolic links are followed and yielded under their own path, while link
    /// loops are reported as errors. Directories are not yielded themselves.
    pub(crate) fn files(&self) -> impl Iterator<Item = Result<AssetFile, WalkError>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(
                    entry
                        .path()
                        .strip_prefix(&self.root)
                        .map(|relative| AssetFile {
                            path: entry.path().to_path_buf(),
                            relative: relative.to_path_buf(),
                        })
                        .map_err(WalkError::from),
                ),
                Ok(_) => None,
                Err(error) => Some(Err(error.into())),
            })
    }
}
