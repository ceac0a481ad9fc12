//! Application configuration, persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Credentials;

/// Placeholder username written to fresh config files.
pub const USERNAME_PLACEHOLDER: &str = "USERNAME";
/// Placeholder password written to fresh config files.
pub const PASSWORD_PLACEHOLDER: &str = "PASSWORD";

/// `[credentials]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: USERNAME_PLACEHOLDER.to_string(),
            password: PASSWORD_PLACEHOLDER.to_string(),
        }
    }
}

impl CredentialsConfig {
    /// False while either field is empty or still the placeholder.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty()
            && !self.password.is_empty()
            && self.username != USERNAME_PLACEHOLDER
            && self.password != PASSWORD_PLACEHOLDER
    }

    #[must_use]
    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory downloaded tracks are written to.
    pub dir: PathBuf,
    /// Whether to re-download tracks whose file already exists.
    pub overwrite: bool,
    /// Whether to remove `.part` files when a download fails.
    pub cleanup_on_error: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            overwrite: false,
            cleanup_on_error: true,
        }
    }
}

impl DownloadConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the catalog HTTP service, without trailing slash.
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

/// `[messages]` section: user-facing strings, overridable for translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub done: String,
    pub invalid_link: String,
    pub nothing_selected: String,
    pub login_failed: String,
    pub paste_link: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            done: "Download complete".to_string(),
            invalid_link: "That is not a valid track, album or playlist link".to_string(),
            nothing_selected: "Nothing selected to download".to_string(),
            login_failed: "Login failed. A premium account is required to download".to_string(),
            paste_link: "Paste a track, album or playlist link".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub credentials: CredentialsConfig,
    pub download: DownloadConfig,
    pub remote: RemoteConfig,
    pub messages: Messages,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `{config_dir}/tracklist-dl/config.toml`, falling back to the working
    /// directory when the platform has no config dir.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tracklist-dl")
            .join("config.toml")
    }

    /// Loads a configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads `path`, writing a default file there first if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        log::info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    /// Saves the configuration atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(&tmp_path, toml_str)?;

        // The file holds a plaintext password.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn download_config_builder_pattern() {
        let config = DownloadConfig::new()
            .with_dir("/music")
            .with_overwrite(true)
            .with_cleanup_on_error(false);

        assert_eq!(config.dir, PathBuf::from("/music"));
        assert!(config.overwrite);
        assert!(!config.cleanup_on_error);
    }

    #[test]
    fn placeholders_are_not_configured() {
        let creds = CredentialsConfig::default();
        assert!(!creds.is_configured());

        let creds = CredentialsConfig {
            username: "listener".to_string(),
            password: PASSWORD_PLACEHOLDER.to_string(),
        };
        assert!(!creds.is_configured());

        let creds = CredentialsConfig {
            username: "listener".to_string(),
            password: "s3cret".to_string(),
        };
        assert!(creds.is_configured());
        assert_eq!(creds.to_credentials().username, "listener");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [download]
            dir = "/srv/music"

            [messages]
            done = "Fertig"
            "#,
        )
        .unwrap();

        assert_eq!(config.download.dir, PathBuf::from("/srv/music"));
        assert!(config.download.cleanup_on_error);
        assert_eq!(config.messages.done, "Fertig");
        assert_eq!(config.messages.paste_link, Messages::default().paste_link);
        assert_eq!(config.credentials.username, USERNAME_PLACEHOLDER);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::new();
        config.remote.base_url = "https://catalog.example".to_string();
        config.download = config.download.with_overwrite(true);
        config.save(&path).unwrap();

        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_or_create_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let created = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(created, AppConfig::default());
        assert!(path.exists());

        std::fs::write(&path, "[credentials]\nusername = \"me\"\n").unwrap();
        let loaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded.credentials.username, "me");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[download\ndir = 3").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::load(&dir.path().join("nope.toml")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn default_path_is_namespaced() {
        let path = AppConfig::default_path();
        assert!(path.ends_with("tracklist-dl/config.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        AppConfig::default().save(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
