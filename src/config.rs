use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::constants::PROVIDER_SECTION;
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct CredentialsDoc {
    mastodon: Option<CredentialsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsSection {
    client_key: Option<String>,
    client_secret: Option<String>,
    instance: Option<String>,
}

/// Application credentials, validated at load time so downstream code never
/// sees optional fields.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_key: String,
    pub client_secret: String,
    pub instance: String,
}

impl AppCredentials {
    /// Reads and validates the credentials document. A missing file behaves
    /// like an empty one and is reported as the missing provider section.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let doc: CredentialsDoc = toml::from_str(&raw)?;
        let section = doc
            .mastodon
            .ok_or(ConfigError::MissingSection(PROVIDER_SECTION))?;

        Ok(Self {
            client_key: section
                .client_key
                .ok_or(ConfigError::MissingKey("client_key"))?,
            client_secret: section
                .client_secret
                .ok_or(ConfigError::MissingKey("client_secret"))?,
            instance: section.instance.ok_or(ConfigError::MissingKey("instance"))?,
        })
    }
}

impl fmt::Display for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"client_key\":\"{}\",\"client_secret\":\"[REDACTED]\",\"instance\":\"{}\"}}",
            self.client_key, self.instance
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    mastodon: Option<SessionSection>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SessionSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// The mutable session document together with its backing location. All
/// reads and writes go through this handle; `save` rewrites the whole file.
#[derive(Debug)]
pub struct SessionStore {
    doc: SessionDoc,
    path: PathBuf,
}

impl SessionStore {
    /// Loads the session document. A missing file yields an empty store
    /// (first run).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let doc = match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => SessionDoc::default(),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(Self {
            doc,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the provider section if absent; returns whether it was
    /// created, so callers know to persist.
    pub fn ensure_section(&mut self) -> bool {
        if self.doc.mastodon.is_none() {
            self.doc.mastodon = Some(SessionSection::default());
            true
        } else {
            false
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.doc
            .mastodon
            .as_ref()
            .and_then(|section| section.access_token.as_deref())
    }

    pub fn set_access_token(&mut self, token: String) {
        self.doc
            .mastodon
            .get_or_insert_with(SessionSection::default)
            .access_token = Some(token);
    }

    /// Whole-file overwrite of the backing document.
    pub fn save(&self) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(&self.doc)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl fmt::Display for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self
            .access_token()
            .map_or("null".to_string(), |_| "\"[REDACTED]\"".to_string());
        write!(
            f,
            "{{\"path\":\"{}\",\"access_token\":{}}}",
            self.path.display(),
            token
        )
    }
}



#[cfg(test)]
mod tests_display {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_credentials_display_redacts_secret() {
        let creds = AppCredentials {
            client_key: "key123".to_string(),
            client_secret: "secret456".to_string(),
            instance: "https://example.social".to_string(),
        };

        let expected = json!({
            "client_key": "key123",
            "client_secret": "[REDACTED]",
            "instance": "https://example.social"
        });

        assert_json_eq!(
            serde_json::from_str::<serde_json::Value>(&creds.to_string()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_store_display_redacts_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut store = SessionStore::load(&path).unwrap();

        let rendered: serde_json::Value =
            serde_json::from_str(&store.to_string()).unwrap();
        assert_eq!(rendered["access_token"], serde_json::Value::Null);

        store.set_access_token("tok".to_string());
        let rendered: serde_json::Value =
            serde_json::from_str(&store.to_string()).unwrap();
        assert_eq!(rendered["access_token"], "[REDACTED]");
    }
}
