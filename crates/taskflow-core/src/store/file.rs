//! JSON credential file.
//!
//! Stores the session in `<home>/credentials.json` with restricted
//! permissions (0600). Tokens are never logged.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use taskflow_types::Session;
use tokio::sync::Mutex;

use super::{CredentialRecord, CredentialStore};
use crate::config::paths;
use crate::error::StorageError;

/// File-backed store that survives restarts.
///
/// Every write goes to a sibling temp file that is then renamed over the
/// original, so readers see either the old or the new document.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `$TASKFLOW_HOME/credentials.json`.
    pub fn at_default_path() -> Self {
        Self::new(paths::credentials_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<CredentialRecord, StorageError> {
        let path = self.path.clone();
        run_blocking(&self.path, move || read_record(&path)).await
    }

    async fn modify<R, F>(&self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut CredentialRecord) -> (R, bool) + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        run_blocking(&self.path, move || {
            let mut record = read_record(&path)?;
            let (result, changed) = f(&mut record);
            if changed {
                write_record(&path, &record)?;
            }
            Ok(result)
        })
        .await
    }
}

impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.session)
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let session = session.clone();
        self.modify(move |record| {
            record.session = Some(session);
            ((), true)
        })
        .await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.modify(|record| {
            let had_session = record.session.take().is_some();
            ((), had_session)
        })
        .await
    }

    async fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<bool, StorageError> {
        let access_token = access_token.to_string();
        let refresh_token = refresh_token.map(str::to_string);
        self.modify(move |record| {
            let updated = record.update_tokens(&access_token, refresh_token.as_deref());
            (updated, updated)
        })
        .await
    }

    async fn pending_signup_email(&self) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.pending_signup_email)
    }

    async fn set_pending_signup_email(&self, email: Option<&str>) -> Result<(), StorageError> {
        let email = email.map(str::to_string);
        self.modify(move |record| {
            let changed = record.pending_signup_email != email;
            record.pending_signup_email = email;
            ((), changed)
        })
        .await
    }
}

async fn run_blocking<T, F>(path: &Path, f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            message: format!("storage task failed: {e}"),
        })?
}

/// Missing file is an empty record; an unparsable one is treated the same.
fn read_record(path: &Path) -> Result<CredentialRecord, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CredentialRecord::default()),
        Err(e) => return Err(StorageError::io(path, &e)),
    };

    match serde_json::from_str(&contents) {
        Ok(record) => Ok(record),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable credentials file"
            );
            Ok(CredentialRecord::default())
        }
    }
}

fn write_record(path: &Path, record: &CredentialRecord) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, &e))?;
    }

    let contents = serde_json::to_string_pretty(record)
        .map_err(|e| StorageError::Serialize(e.to_string()))?;

    let tmp_path = path.with_extension("json.tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&tmp_path)
        .map_err(|e| StorageError::io(&tmp_path, &e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| StorageError::io(&tmp_path, &e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::io(path, &e)
    })
}

#[cfg(test)]
mod tests {
    use taskflow_types::User;
    use tempfile::tempdir;

    use super::*;

    fn session() -> Session {
        Session::new(
            User {
                id: "u1".into(),
                email: "a@b.com".into(),
                display_name: "Ada".into(),
            },
            "tok1",
            "ref1",
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(store.access_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load_survives_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileCredentialStore::new(&path).save(&session()).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(session()));
        assert_eq!(reopened.refresh_token().await.unwrap().as_deref(), Some("ref1"));
    }

    #[tokio::test]
    async fn test_clear_removes_session_but_keeps_pending_email() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&session()).await.unwrap();
        store.set_pending_signup_email(Some("new@b.com")).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(
            store.pending_signup_email().await.unwrap().as_deref(),
            Some("new@b.com")
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().await.unwrap(), None);

        // A later save replaces the corrupt document.
        store.save(&session()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_update_tokens_requires_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);

        assert!(!store.update_tokens("tok2", None).await.unwrap());
        assert!(!path.exists());

        store.save(&session()).await.unwrap();
        assert!(store.update_tokens("tok2", Some("ref2")).await.unwrap());
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok2");
        assert_eq!(loaded.refresh_token, "ref2");
    }

    #[tokio::test]
    async fn test_unwritable_location_reports_storage_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let store = FileCredentialStore::new(blocker.join("credentials.json"));
        let err = store.save(&session()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        FileCredentialStore::new(&path).save(&session()).await.unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
