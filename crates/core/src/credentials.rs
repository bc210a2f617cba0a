//! Local clinician credential store.
//!
//! Credentials live in a single YAML file under the data directory. Passwords are stored as
//! PBKDF2-HMAC-SHA256 digests with a per-user random salt; the iteration count is recorded
//! with each entry so it can be raised later without invalidating existing accounts.

use crate::config::CoreConfig;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use perisentez_types::Username;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use subtle::ConstantTimeEq;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredUser {
    username: Username,
    salt: String,
    iterations: u32,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl StoredUser {
    fn matches(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (hex::decode(&self.salt), hex::decode(&self.password_hash))
        else {
            tracing::warn!(username = %self.username, "stored credential is not valid hex");
            return false;
        };
        let actual = derive(password, &salt, self.iterations);
        actual[..].ct_eq(&expected[..]).into()
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    iterations: u32,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::at_path(cfg.users_file(), DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn at_path(path: PathBuf, iterations: u32) -> Self {
        Self {
            path,
            iterations: iterations.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a new clinician.
    ///
    /// # Errors
    ///
    /// - `PasswordMismatch` if `password` and `confirm` differ,
    /// - `Text`/`InvalidInput` for a malformed username or an empty password,
    /// - `UsernameTaken` if the username already exists,
    /// - storage errors if the store cannot be read or written.
    pub fn register(&self, username: &str, password: &str, confirm: &str) -> CoreResult<Username> {
        if password != confirm {
            return Err(CoreError::PasswordMismatch);
        }
        let username = Username::parse(username)?;
        if password.is_empty() {
            return Err(CoreError::InvalidInput("password cannot be empty".into()));
        }

        let _guard = self.write_lock.lock().map_err(|_| CoreError::LockPoisoned)?;
        let mut users = self.load()?;
        if users.iter().any(|u| u.username == username) {
            return Err(CoreError::UsernameTaken);
        }

        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = derive(password, &salt, self.iterations);

        users.push(StoredUser {
            username: username.clone(),
            salt: hex::encode(salt),
            iterations: self.iterations,
            password_hash: hex::encode(hash),
            created_at: Utc::now(),
        });
        self.persist(&users)?;

        tracing::info!(username = %username, "registered clinician");
        Ok(username)
    }

    /// Checks a login attempt. Unknown users and wrong passwords are indistinguishable.
    pub fn verify(&self, username: &str, password: &str) -> CoreResult<Username> {
        let username = Username::parse(username).map_err(|_| CoreError::InvalidCredentials)?;
        let users = self.load()?;

        match users.iter().find(|u| u.username == username) {
            Some(user) if user.matches(password) => Ok(username),
            _ => {
                tracing::warn!(username = %username, "rejected login");
                Err(CoreError::InvalidCredentials)
            }
        }
    }

    fn load(&self) -> CoreResult<Vec<StoredUser>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(CoreError::FileRead)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_yaml::from_str(&raw).map_err(CoreError::YamlDeserialization)
    }

    fn persist(&self, users: &[StoredUser]) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }
        let yaml = serde_yaml::to_string(users).map_err(CoreError::YamlSerialization)?;
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(CoreError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(CoreError::FileWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> CredentialStore {
        CredentialStore::at_path(dir.path().join("users.yaml"), 10)
    }

    #[test]
    fn register_then_verify_succeeds() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let username = store
            .register("dr.sema", "gizli", "gizli")
            .expect("register should succeed");
        assert_eq!(username.as_str(), "dr.sema");

        let verified = store.verify("dr.sema", "gizli").expect("login should succeed");
        assert_eq!(verified, username);
    }

    #[test]
    fn verify_rejects_wrong_password_and_unknown_user() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.register("dr.sema", "gizli", "gizli").unwrap();

        assert!(matches!(
            store.verify("dr.sema", "yanlis"),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.verify("dr.ali", "gizli"),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.verify("../x", "gizli"),
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn register_rejects_mismatch_duplicates_and_bad_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        assert!(matches!(
            store.register("dr.sema", "a", "b"),
            Err(CoreError::PasswordMismatch)
        ));
        store.register("dr.sema", "a", "a").unwrap();
        assert!(matches!(
            store.register("dr.sema", "c", "c"),
            Err(CoreError::UsernameTaken)
        ));
        assert!(matches!(
            store.register("dr sema", "a", "a"),
            Err(CoreError::Text(_))
        ));
        assert!(matches!(
            store.register("dr.ali", "", ""),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn passwords_are_salted_and_not_stored_in_clear() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.register("dr.a", "ortak-sifre", "ortak-sifre").unwrap();
        store.register("dr.b", "ortak-sifre", "ortak-sifre").unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("ortak-sifre"));

        let users: Vec<StoredUser> = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(users.len(), 2);
        assert_ne!(users[0].salt, users[1].salt);
        assert_ne!(users[0].password_hash, users[1].password_hash);
    }

    #[test]
    fn store_survives_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        test_store(&temp_dir).register("dr.sema", "gizli", "gizli").unwrap();

        let reopened = test_store(&temp_dir);
        assert!(reopened.verify("dr.sema", "gizli").is_ok());
    }
}
