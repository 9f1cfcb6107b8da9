use merge_engine::{FilePair, Strategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of the `.tmplmerge.json` settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub merge: MergeSettings,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Pairs merged at once when no prompt is involved.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            interactive: false,
            force: false,
            dry_run: false,
            jobs: default_jobs(),
        }
    }
}

/// One template file and where it lands in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Mapping {
    pub fn to_pair(&self) -> FilePair {
        FilePair::new(&self.source, &self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            filter: default_log_filter(),
        }
    }
}

fn default_jobs() -> usize {
    4
}
fn default_log_dir() -> PathBuf {
    PathBuf::from(".tmplmerge/logs")
}
fn default_log_filter() -> String {
    "info".into()
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn pairs(&self) -> Vec<FilePair> {
        self.mappings.iter().map(Mapping::to_pair).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_gets_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"merge": {"strategy": "USE_TARGET"}}"#).unwrap();
        assert_eq!(settings.merge.strategy, Strategy::UseTarget);
        assert_eq!(settings.merge.jobs, 4);
        assert!(!settings.merge.interactive);
        assert!(settings.mappings.is_empty());
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.merge.strategy, Strategy::Merge);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/.tmplmerge.json");
        let mut settings = Settings::default();
        settings.merge.dry_run = true;
        settings.mappings.push(Mapping {
            source: "templates/.env".into(),
            target: ".env".into(),
        });
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(loaded.merge.dry_run);
        assert_eq!(loaded.pairs(), vec![FilePair::new("templates/.env", ".env")]);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".tmplmerge.json");
        std::fs::write(&path, "{\"merge\": {\"strategy\": \"SOMETIMES\"}}").unwrap();
        assert!(Settings::load_or_default(&path).is_err());
    }
}
