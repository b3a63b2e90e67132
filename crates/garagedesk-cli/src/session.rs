// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use garagedesk_api::AuthSession;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bearer token persisted in a single file.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuthSession for FileSession {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw.trim().to_owned()).filter(|token| !token.is_empty()),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "cannot read token file");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            bail!("token must not be empty -- use `garagedesk token clear` to sign out");
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create token directory {}", parent.display()))?;
        }
        fs::write(&self.path, format!("{token}\n"))
            .with_context(|| format!("write token file {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "token stored");
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "token removed");
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("remove token file {}", self.path.display())),
        }
    }

    fn notify_expired(&self) {
        warn!(path = %self.path.display(), "session expired");
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FileSession;
    use anyhow::Result;
    use garagedesk_api::AuthSession;

    #[test]
    fn token_round_trips_through_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let session = FileSession::new(temp.path().join("nested").join("token"));
        assert_eq!(session.token(), None);

        session.set_token("  abc.def  ")?;
        assert_eq!(session.token().as_deref(), Some("abc.def"));

        session.clear_token()?;
        assert_eq!(session.token(), None);
        session.clear_token()?;
        Ok(())
    }

    #[test]
    fn empty_token_is_rejected() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let session = FileSession::new(temp.path().join("token"));
        let error = session.set_token("   ").expect_err("blank token should fail");
        assert!(error.to_string().contains("token clear"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir()?;
        let session = FileSession::new(temp.path().join("token"));
        session.set_token("secret")?;
        let mode = std::fs::metadata(session.path())?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn expiry_notice_does_not_touch_the_token_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let session = FileSession::new(temp.path().join("token"));
        session.set_token("abc")?;
        session.notify_expired();
        assert_eq!(session.token().as_deref(), Some("abc"));
        Ok(())
    }
}
