//! 凭据存储
//! 访问令牌与刷新令牌以两个独立键持久化；两者必须同时存在，否则视为未登录

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::models::Tokens;

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Durable string key-value store used to persist credentials.
///
/// Implementations must be safe to share between concurrently running
/// requests; each call is expected to be short and non-blocking in practice.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Credential-pair view over a [`CredentialStore`]
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn CredentialStore>,
    // 串行化写入，使条件写入（检查 + 写）对同一后端的其他写入是原子的
    write_lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| StorageError::Poisoned)
    }

    /// 读取凭据对；任一缺失或为空都返回 `None`
    pub fn load(&self) -> Result<Option<Tokens>, StorageError> {
        let access = self.backend.get(ACCESS_TOKEN_KEY)?.filter(|v| !v.is_empty());
        let refresh = self.backend.get(REFRESH_TOKEN_KEY)?.filter(|v| !v.is_empty());

        Ok(match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Some(Tokens {
                access_token,
                refresh_token,
            }),
            _ => None,
        })
    }

    pub fn save(&self, tokens: &Tokens) -> Result<(), StorageError> {
        let _guard = self.lock_writes()?;
        self.write_pair(tokens)
    }

    /// Removes both entries, including a partial leftover of either one.
    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock_writes()?;
        self.remove_pair()
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.map(|tokens| tokens.access_token))
    }

    /// Replaces the access token only while `expected_refresh` is still the
    /// stored refresh token.
    ///
    /// Returns `false` without writing when the session was cleared or
    /// replaced by another login in the meantime.
    pub fn replace_access_token_if(
        &self,
        expected_refresh: &str,
        access_token: &str,
    ) -> Result<bool, StorageError> {
        let _guard = self.lock_writes()?;
        match self.load()? {
            Some(current) if current.refresh_token == expected_refresh => {
                self.write_pair(&Tokens {
                    access_token: access_token.to_string(),
                    refresh_token: current.refresh_token,
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Clears the stored pair only while `expected_refresh` is still the
    /// stored refresh token.
    pub fn clear_if(&self, expected_refresh: &str) -> Result<bool, StorageError> {
        let _guard = self.lock_writes()?;
        match self.load()? {
            Some(current) if current.refresh_token == expected_refresh => {
                self.remove_pair()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn write_pair(&self, tokens: &Tokens) -> Result<(), StorageError> {
        self.backend.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.backend.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        Ok(())
    }

    fn remove_pair(&self) -> Result<(), StorageError> {
        let access = self.backend.remove(ACCESS_TOKEN_KEY);
        let refresh = self.backend.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
