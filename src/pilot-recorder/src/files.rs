//! Output file naming.
//!
//! Recorded tests never replace an existing file. Candidates are tried in
//! order (`name.ext`, `name_1.ext`, `name_2.ext`, ...) and each is created
//! with `create_new`, so a file that appears between the check and the write
//! is skipped rather than overwritten.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};

/// A newly created file.
#[derive(Debug)]
pub struct NewFile {
    /// Where the file was created.
    pub path: PathBuf,
    /// The open, empty file.
    pub file: File,
}

/// The `counter`-th candidate for `path`. Zero is `path` itself.
pub fn candidate(path: impl AsRef<Path>, counter: u64) -> PathBuf {
    let path = path.as_ref();
    if counter == 0 {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_{counter}{extension}"))
}

/// Returns the first candidate for `path` where nothing exists yet.
pub fn unique_file(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    (0..)
        .map(|counter| candidate(path, counter))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Creates the first free candidate for `path`, together with one sibling
/// per entry of `companions` (same name, that extension).
///
/// A candidate is only taken when the main file and every sibling can be
/// created; otherwise the files created for it are removed again and the
/// next counter is tried. Returns the main file first.
pub async fn create_unique(
    path: impl AsRef<Path>,
    companions: &[&str],
) -> io::Result<(NewFile, Vec<NewFile>)> {
    let path = path.as_ref();
    let mut counter: u64 = 0;
    loop {
        let main = candidate(path, counter);
        counter += 1;

        let mut paths = vec![main.clone()];
        paths.extend(companions.iter().map(|ext| main.with_extension(ext)));
        if paths.iter().any(|p| p.exists()) {
            continue;
        }

        let mut created: Vec<NewFile> = Vec::with_capacity(paths.len());
        let mut taken = false;
        for path in paths {
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => created.push(NewFile { path, file }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "Output name taken, trying next");
                    taken = true;
                    break;
                }
                Err(e) => {
                    release(created).await;
                    return Err(e);
                }
            }
        }

        if taken {
            release(created).await;
            continue;
        }

        let mut created = created.into_iter();
        if let Some(main) = created.next() {
            return Ok((main, created.collect()));
        }
    }
}

/// Removes files created for a candidate that could not be taken whole.
async fn release(created: Vec<NewFile>) {
    for NewFile { path, file } in created {
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}
