use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List regular files directly inside `directory` whose extension matches
/// `extension` (case-insensitive, no leading dot), sorted by file name.
///
/// A directory that does not exist or cannot be read yields an empty list.
pub fn discover_images(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        tracing::warn!(
            directory = %directory.display(),
            "Source directory not found, nothing to ingest"
        );
        return Ok(Vec::new());
    }

    // Unreadable counts the same as absent: nothing to ingest.
    if let Err(e) = std::fs::read_dir(directory) {
        tracing::warn!(
            directory = %directory.display(),
            error = %e,
            "Source directory unreadable, nothing to ingest"
        );
        return Ok(Vec::new());
    }

    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut images = Vec::new();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if let Some(ext) = path.extension() {
            if ext.to_string_lossy().to_lowercase() == wanted {
                images.push(path.to_path_buf());
            }
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_discover_images() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("2.jpg")).unwrap();
        File::create(dir.path().join("1.JPG")).unwrap();
        File::create(dir.path().join("3.png")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        // Not descended into
        fs::create_dir(dir.path().join("subdir")).unwrap();
        File::create(dir.path().join("subdir/4.jpg")).unwrap();

        let images = discover_images(dir.path(), "jpg").unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["1.JPG", "2.jpg"]);
    }

    #[test]
    fn test_leading_dot_in_extension() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("10.jpg")).unwrap();

        assert_eq!(discover_images(dir.path(), ".jpg").unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_empty() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        File::create(locked.join("1.jpg")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions; nothing to check then.
        if fs::read_dir(&locked).is_err() {
            let images = discover_images(&locked, "jpg").unwrap();
            assert!(images.is_empty());
        }

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let images = discover_images(&dir.path().join("nope"), "jpg").unwrap();
        assert!(images.is_empty());
    }
}
