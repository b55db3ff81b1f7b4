use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::util::time;

/// A titled sequence of pages (activity texts or base64 images)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub pages: Vec<String>,
}

impl Story {
    pub fn new(title: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            title: title.into(),
            pages,
        }
    }
}

/// Name of a stored story record, e.g. `story_1700000000000.json`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoryHandle(String);

impl StoryHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stories and saved images under a directory, one JSON file per story
#[derive(Debug, Clone)]
pub struct StoryArchive {
    dir: PathBuf,
    images_dir: PathBuf,
}

impl StoryArchive {
    pub fn new(dir: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            images_dir: images_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the story under a fresh timestamped name
    pub fn save(&self, story: &Story) -> StorageResult<StoryHandle> {
        fs::create_dir_all(&self.dir)?;
        let path = unused_path(&self.dir, "story", "json");
        fs::write(&path, serde_json::to_string(story)?)?;

        let handle = StoryHandle(file_name(&path));
        log::info!("Saved story '{}' as {}", story.title, handle);
        Ok(handle)
    }

    /// Every stored story, oldest first
    pub fn list(&self) -> StorageResult<Vec<StoryHandle>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut handles: Vec<StoryHandle> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("story_") && name.ends_with(".json"))
            .map(StoryHandle)
            .collect();
        handles.sort();
        Ok(handles)
    }

    pub fn load(&self, handle: &StoryHandle) -> StorageResult<Story> {
        let path = self.dir.join(handle.name());
        if !path.exists() {
            return Err(StorageError::MissingStory(handle.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn delete(&self, handle: &StoryHandle) -> StorageResult<()> {
        let path = self.dir.join(handle.name());
        if !path.exists() {
            return Err(StorageError::MissingStory(handle.to_string()));
        }
        fs::remove_file(path)?;
        log::info!("Deleted story {}", handle);
        Ok(())
    }

    /// Writes raw image bytes as `activity_img_<millis>.png` and returns the path
    pub fn save_image(&self, bytes: &[u8]) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.images_dir)?;
        let path = unused_path(&self.images_dir, "activity_img", "png");
        fs::write(&path, bytes)?;
        log::info!("Saved generated image to {}", path.display());
        Ok(path)
    }
}

/// `<prefix>_<millis>.<ext>`, bumping the timestamp until the name is free
fn unused_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    let mut stamp = time::timestamp_millis();
    loop {
        let path = dir.join(format!("{prefix}_{stamp}.{ext}"));
        if !path.exists() {
            return path;
        }
        stamp += 1;
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(dir: &Path) -> StoryArchive {
        StoryArchive::new(dir.join("stories"), dir.join("images"))
    }

    #[test]
    fn test_list_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(archive(dir.path()).list().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(dir.path());
        let story = Story::new("Mi dragón", vec!["Página uno".to_owned(), "Página dos".to_owned()]);

        let handle = archive.save(&story).unwrap();
        assert!(handle.name().starts_with("story_"));
        assert_eq!(archive.load(&handle).unwrap(), story);

        archive.delete(&handle).unwrap();
        assert!(archive.list().unwrap().is_empty());
        assert!(matches!(archive.load(&handle), Err(StorageError::MissingStory(_))));
    }

    #[test]
    fn test_rapid_saves_get_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(dir.path());
        let story = Story::new("Uno", vec![]);
        let first = archive.save(&story).unwrap();
        let second = archive.save(&story).unwrap();
        assert_ne!(first, second);
        assert_eq!(archive.list().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_record_schema() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(dir.path());
        let handle = archive.save(&Story::new("T", vec!["p".to_owned()])).unwrap();
        let raw = fs::read_to_string(archive.dir().join(handle.name())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "title": "T", "pages": ["p"] }));
    }

    #[test]
    fn test_save_image_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive(dir.path()).save_image(b"\x89PNG").unwrap();
        assert!(file_name(&path).starts_with("activity_img_"));
        assert_eq!(fs::read(path).unwrap(), b"\x89PNG");
    }
}
