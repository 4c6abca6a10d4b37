// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temp-file staging for a single LPD connection (§4.6): owner-only
// read/write permissions, an RAII guard that unlinks on every exit path
// (including a panic), and the 100-data-file-per-connection cap.

use std::path::{Path, PathBuf};

use pressline_core::{PresslineError, Result};

/// Maximum data files accepted per connection (§7 resource-error bucket).
pub const MAX_DATA_FILES: usize = 100;

/// Owner-only permission bits (`0600`) for staged temp files (§4.6).
#[cfg(unix)]
fn set_owner_only(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// One staged data file: its on-disk path, the name the client referred to
/// it by (`dfA001host`), and an RAII guard removing it on drop.
pub struct StagedFile {
    pub data_file_name: String,
    path: PathBuf,
}

impl StagedFile {
    /// Create an empty temp file in `dir`, named to avoid collisions with
    /// sibling connections, set to owner-only permissions.
    pub fn create(dir: &Path, data_file_name: &str) -> Result<Self> {
        let path = dir.join(format!("pressline-lpd-{}-{}", std::process::id(), sanitize(data_file_name)));
        std::fs::write(&path, []).map_err(PresslineError::Io)?;
        set_owner_only(&path).map_err(PresslineError::Io)?;
        Ok(Self { data_file_name: data_file_name.to_string(), path })
    }

    pub fn write_all(&self, bytes: &[u8]) -> Result<()> {
        std::fs::write(&self.path, bytes).map_err(PresslineError::Io)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(PresslineError::Io)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

/// The set of data files staged so far on one connection; enforces the
/// per-connection cap.
#[derive(Default)]
pub struct StagingArea {
    files: Vec<StagedFile>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn stage(&mut self, dir: &Path, data_file_name: &str, bytes: &[u8]) -> Result<()> {
        if self.files.len() >= MAX_DATA_FILES {
            return Err(PresslineError::TooManyDataFiles { limit: MAX_DATA_FILES as u32 });
        }
        let file = StagedFile::create(dir, data_file_name)?;
        file.write_all(bytes)?;
        self.files.push(file);
        Ok(())
    }

    pub fn find(&self, data_file_name: &str) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.data_file_name == data_file_name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_files_are_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let file = StagedFile::create(dir.path(), "dfA001host").unwrap();
            path = file.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn staging_area_rejects_past_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut area = StagingArea::new();
        for i in 0..MAX_DATA_FILES {
            area.stage(dir.path(), &format!("df{i}"), b"x").unwrap();
        }
        let err = area.stage(dir.path(), "one-too-many", b"x").unwrap_err();
        assert!(matches!(err, PresslineError::TooManyDataFiles { limit } if limit == MAX_DATA_FILES as u32));
    }

    #[test]
    fn find_retrieves_a_staged_file_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut area = StagingArea::new();
        area.stage(dir.path(), "dfA001host", b"hello").unwrap();
        let found = area.find("dfA001host").unwrap();
        assert_eq!(found.read().unwrap(), b"hello");
    }
}
