//! Project handle and settings document.

use crate::acquisition::has_allowed_extension;
use crate::error::{PrateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the per-project settings document.
pub const SETTINGS_FILE: &str = "project_settings.json";

/// Per-project metadata, mirroring `project_settings.json`.
///
/// The settings file is the single source of truth for project metadata;
/// `number_files` and `needs_processing` are kept in step with the actual
/// directory contents by the mutation methods on [`Project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub description: String,
    pub needs_processing: bool,
    pub number_files: usize,
    pub model: String,
    pub path: String,
    pub created_at: String,
}

impl ProjectSettings {
    /// Settings for a freshly created project.
    pub fn new(name: &str, description: &str, model: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            needs_processing: false,
            number_files: 0,
            model: model.to_string(),
            path: path.to_string_lossy().into_owned(),
            created_at: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// An opened project: its directory paths plus loaded settings.
///
/// Settings writes go through this handle (single writer); everything else
/// reads the directories directly.
#[derive(Debug, Clone)]
pub struct Project {
    path: PathBuf,
    settings: ProjectSettings,
}

impl Project {
    /// Open a project directory, loading its settings file.
    pub fn open(path: &Path) -> Result<Self> {
        let settings_path = path.join(SETTINGS_FILE);
        if !settings_path.is_file() {
            return Err(PrateError::Config(format!(
                "Missing {} in {}",
                SETTINGS_FILE,
                path.display()
            )));
        }
        let settings = ProjectSettings::load_from(&settings_path)?;
        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn audios_dir(&self) -> PathBuf {
        self.path.join("audios")
    }

    pub fn texts_dir(&self) -> PathBuf {
        self.path.join("texts")
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.path.join("databases")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path.join(SETTINGS_FILE)
    }

    /// Path of the persisted vector index.
    pub fn index_path(&self) -> PathBuf {
        self.databases_dir().join("index.db")
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Persist the current settings.
    pub fn save_settings(&self) -> Result<()> {
        self.settings.save_to(&self.settings_path())
    }

    /// Audio files in `audios/` whose extension is in the allowed set.
    /// Order is not guaranteed.
    pub fn audio_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.audios_dir())? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && has_allowed_extension(&path) {
                files.push(path);
            }
        }
        debug!("Project '{}': {} audio files", self.name(), files.len());
        Ok(files)
    }

    /// Transcript files in `texts/`. Order is not guaranteed.
    pub fn transcript_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.texts_dir())? {
            let entry = entry?;
            let path = entry.path();
            let is_txt = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("txt"))
                .unwrap_or(false);
            if path.is_file() && is_txt {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Record that audio assets were added or removed: refresh the file
    /// count from disk and flag the project for reprocessing.
    pub fn mark_assets_changed(&mut self) -> Result<()> {
        self.settings.number_files = self.audio_files()?.len();
        self.settings.needs_processing = true;
        self.save_settings()
    }

    /// Clear the reprocessing flag after a successful index rebuild.
    pub fn clear_needs_processing(&mut self) -> Result<()> {
        self.settings.needs_processing = false;
        self.save_settings()
    }

    /// Delete an audio asset and its paired transcript by base name.
    pub fn remove_asset(&mut self, base_name: &str) -> Result<()> {
        let mut removed = false;
        for audio in self.audio_files()? {
            let stem = audio.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem == base_name {
                std::fs::remove_file(&audio)?;
                info!("Removed {}", audio.display());
                removed = true;
            }
        }

        if !removed {
            return Err(PrateError::InvalidInput(format!(
                "No audio asset named '{}' in project '{}'",
                base_name,
                self.name()
            )));
        }

        let transcript = self.texts_dir().join(format!("{}.txt", base_name));
        if transcript.is_file() {
            std::fs::remove_file(&transcript)?;
            info!("Removed {}", transcript.display());
        }

        self.mark_assets_changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AppStorage;

    fn project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let storage = AppStorage::new(dir.path());
        storage.init().unwrap();
        let project = storage.create_project("demo", "test project", "medium").unwrap();
        (dir, project)
    }

    #[test]
    fn test_settings_round_trip() {
        let (_dir, project) = project();
        let loaded = ProjectSettings::load_from(&project.settings_path()).unwrap();
        assert_eq!(&loaded, project.settings());
        assert_eq!(loaded.created_at.len(), 10); // YYYY-MM-DD
    }

    #[test]
    fn test_audio_files_filters_extensions() {
        let (_dir, project) = project();
        std::fs::write(project.audios_dir().join("talk.mp3"), b"x").unwrap();
        std::fs::write(project.audios_dir().join("video.mp4"), b"x").unwrap();
        std::fs::write(project.audios_dir().join("notes.pdf"), b"x").unwrap();

        let mut names: Vec<String> = project
            .audio_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["talk.mp3".to_string(), "video.mp4".to_string()]);
    }

    #[test]
    fn test_mark_assets_changed_counts_files() {
        let (_dir, mut project) = project();
        std::fs::write(project.audios_dir().join("a.mp3"), b"x").unwrap();
        std::fs::write(project.audios_dir().join("b.wav"), b"x").unwrap();

        project.mark_assets_changed().unwrap();
        assert_eq!(project.settings().number_files, 2);
        assert!(project.settings().needs_processing);

        // the change survives a reload
        let reloaded = Project::open(project.path()).unwrap();
        assert_eq!(reloaded.settings().number_files, 2);
        assert!(reloaded.settings().needs_processing);
    }

    #[test]
    fn test_remove_asset_deletes_pair() {
        let (_dir, mut project) = project();
        std::fs::write(project.audios_dir().join("talk.mp3"), b"x").unwrap();
        std::fs::write(project.texts_dir().join("talk.txt"), "transcript").unwrap();
        project.mark_assets_changed().unwrap();

        project.remove_asset("talk").unwrap();
        assert!(!project.audios_dir().join("talk.mp3").exists());
        assert!(!project.texts_dir().join("talk.txt").exists());
        assert_eq!(project.settings().number_files, 0);
    }

    #[test]
    fn test_remove_missing_asset_errors() {
        let (_dir, mut project) = project();
        assert!(project.remove_asset("ghost").is_err());
    }
}
