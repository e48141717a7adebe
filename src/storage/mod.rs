//! On-disk storage layout for Prate.
//!
//! One fixed layout per installation:
//!
//! ```text
//! <root>/
//!   app_config.json
//!   models/                    shared transcription model cache
//!   projects/<name>/           one directory per project
//! ```
//!
//! All project directories are named with [`sanitize_name`] applied first,
//! so a user-supplied title never reaches the filesystem unfiltered.

mod project;

pub use project::{Project, ProjectSettings, SETTINGS_FILE};

use crate::error::{PrateError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Maximum accepted project name length, as typed by the user.
pub const MAX_NAME_LEN: usize = 50;

/// Maximum accepted project description length.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Replace every filesystem-unsafe character with an underscore.
///
/// Anything outside `[A-Za-z0-9._-]` is unsafe; that covers path
/// separators, quoting characters and whitespace. The result is stable
/// under repeated application.
pub fn sanitize_name(raw: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));
    unsafe_chars.replace_all(raw, "_").into_owned()
}

/// Handle to the per-installation storage root.
#[derive(Debug, Clone)]
pub struct AppStorage {
    root: PathBuf,
}

impl AppStorage {
    /// Create a handle rooted at the given directory. Call [`init`] before
    /// relying on the layout existing.
    ///
    /// [`init`]: AppStorage::init
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default storage root, `~/.prate`.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prate")
    }

    /// Ensure the three fixed root folders exist. Idempotent; only missing
    /// folders are created.
    pub fn init(&self) -> Result<()> {
        for dir in [&self.root, &self.models_dir(), &self.projects_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                info!("Created {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared cache directory for transcription model weights.
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Directory holding one subdirectory per project.
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Path of the installation-wide configuration document.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("app_config.json")
    }

    /// True iff a directory with exactly this sanitized name exists under
    /// the projects root.
    pub fn project_exists(&self, sanitized_name: &str) -> bool {
        self.projects_dir().join(sanitized_name).is_dir()
    }

    /// Create a project directory tree and its settings file.
    ///
    /// The raw name is sanitized here; creation fails if the sanitized name
    /// is empty, either field exceeds its bound, or the directory already
    /// exists. A collision leaves the existing project untouched.
    pub fn create_project(&self, raw_name: &str, description: &str, model: &str) -> Result<Project> {
        if raw_name.chars().count() > MAX_NAME_LEN {
            return Err(PrateError::InvalidName(format!(
                "name exceeds {} characters",
                MAX_NAME_LEN
            )));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(PrateError::InvalidInput(format!(
                "description exceeds {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        let name = sanitize_name(raw_name);
        if name.is_empty() {
            return Err(PrateError::InvalidName(
                "name is empty after removing unsafe characters".to_string(),
            ));
        }

        let path = self.projects_dir().join(&name);
        if path.exists() {
            return Err(PrateError::ProjectExists(name));
        }

        // create_dir (not create_dir_all) so a concurrent creation of the
        // same name fails here rather than clobbering the settings file.
        std::fs::create_dir_all(self.projects_dir())?;
        std::fs::create_dir(&path)?;
        std::fs::create_dir(path.join("audios"))?;
        std::fs::create_dir(path.join("texts"))?;
        std::fs::create_dir(path.join("databases"))?;

        let settings = ProjectSettings::new(&name, description, model, &path);
        settings.save_to(&path.join(SETTINGS_FILE))?;

        info!("Created project '{}' at {}", name, path.display());
        Project::open(&path)
    }

    /// Open an existing project by name. The name is sanitized first, so
    /// raw user input resolves to the same project it was created as.
    pub fn open_project(&self, name: &str) -> Result<Project> {
        let name = sanitize_name(name);
        let path = self.projects_dir().join(&name);
        if !path.is_dir() {
            return Err(PrateError::ProjectNotFound(name));
        }
        Project::open(&path)
    }

    /// Remove a project directory tree, recursively.
    pub fn delete_project(&self, name: &str) -> Result<()> {
        let name = sanitize_name(name);
        let path = self.projects_dir().join(&name);
        if !path.is_dir() {
            return Err(PrateError::ProjectNotFound(name));
        }
        std::fs::remove_dir_all(&path)?;
        info!("Deleted project '{}'", name);
        Ok(())
    }

    /// Names of all project directories. Order is not guaranteed.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let projects_dir = self.projects_dir();
        if !projects_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&projects_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        debug!("Found {} projects", names.len());
        Ok(names)
    }
}
