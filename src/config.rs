use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const READONLY_SCOPE_URL: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const READWRITE_SCOPE_URL: &str = "https://www.googleapis.com/auth/spreadsheets";

/// OAuth permission level requested for the spreadsheet service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl Scope {
    /// The Google OAuth scope URL this permission level maps to.
    pub fn url(self) -> &'static str {
        match self {
            Scope::ReadOnly => READONLY_SCOPE_URL,
            Scope::ReadWrite => READWRITE_SCOPE_URL,
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "readonly" => Ok(Scope::ReadOnly),
            "readwrite" => Ok(Scope::ReadWrite),
            other => Err(Error::InvalidConfiguration(format!(
                "Unknown scope '{}'",
                other
            ))),
        }
    }
}

/// Configuration for one spreadsheet application identity.
///
/// Paths are resolved relative to `root_dir`: the client secret defaults to
/// `<root>/config/client_secret.json` and the credentials cache lives at
/// `<root>/config/credentials/<application_name>.json`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    root_dir: PathBuf,
    application_name: String,
    scope: Scope,
    client_secret_path: PathBuf,
}

impl ClientConfig {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        application_name: impl Into<String>,
        scope: Scope,
    ) -> Self {
        let root_dir = root_dir.into();
        let client_secret_path = root_dir.join("config").join("client_secret.json");

        Self {
            root_dir,
            application_name: application_name.into(),
            scope,
            client_secret_path,
        }
    }

    /// Override the default `<root>/config/client_secret.json` location.
    pub fn with_client_secret_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_secret_path = path.into();
        self
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn client_secret_path(&self) -> &Path {
        &self.client_secret_path
    }

    /// Credentials cache path derived from the application name.
    pub fn credentials_path(&self) -> PathBuf {
        self.root_dir
            .join("config")
            .join("credentials")
            .join(format!("{}.json", self.application_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_known_values() {
        assert_eq!("readonly".parse::<Scope>().unwrap(), Scope::ReadOnly);
        assert_eq!("readwrite".parse::<Scope>().unwrap(), Scope::ReadWrite);
    }

    #[test]
    fn unknown_scopes_are_rejected() {
        for scope in ["", "read", "READONLY", "read-write", "drive"] {
            let err = scope.parse::<Scope>().unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfiguration(_)),
                "scope {:?} should be rejected",
                scope
            );
        }
    }

    #[test]
    fn scope_urls_match_the_permission_level() {
        assert_eq!(
            Scope::ReadOnly.url(),
            "https://www.googleapis.com/auth/spreadsheets.readonly"
        );
        assert_eq!(
            Scope::ReadWrite.url(),
            "https://www.googleapis.com/auth/spreadsheets"
        );
    }

    #[test]
    fn default_paths_are_derived_from_the_root() {
        let config = ClientConfig::new("/srv/app", "tracker", Scope::ReadOnly);

        assert_eq!(
            config.client_secret_path(),
            Path::new("/srv/app/config/client_secret.json")
        );
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/srv/app/config/credentials/tracker.json")
        );
    }

    #[test]
    fn client_secret_path_can_be_overridden() {
        let config = ClientConfig::new("/srv/app", "tracker", Scope::ReadOnly)
            .with_client_secret_path("/etc/secrets/google.json");

        assert_eq!(
            config.client_secret_path(),
            Path::new("/etc/secrets/google.json")
        );
    }
}
