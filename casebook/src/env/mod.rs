//! Scoped environment variable overrides for tests.
//!
//! Each mutation acquires a global re-entrant mutex for the duration of the
//! set/remove operation and returns an RAII guard that restores the previous
//! state when dropped or [reset](EnvVarGuard::reset), removing the variable
//! if it was previously absent.
//!
//! - Stacked guards for the same key restore in LIFO order.
//! - Mutations of different keys may interleave between guard creation and
//!   drop. Tests that touch the same key must not run concurrently; use
//!   [`lock`] or [`EnvScope`] to hold the mutex across several operations.
//!
//! [`set_env`] and [`set_envs`] validate keys first and treat an invalid key
//! as a setup error of the owning [`TestCase`].
//!
//! # Examples
//!
//! ```
//! use casebook::{TestCase, env};
//!
//! let case = TestCase::new("env");
//! let guard = env::set_env(&case, "CASEBOOK_DOC_MODE", "strict");
//! assert_eq!(std::env::var("CASEBOOK_DOC_MODE").as_deref(), Ok("strict"));
//! guard.reset();
//! assert!(std::env::var_os("CASEBOOK_DOC_MODE").is_none());
//! ```

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::case::TestCase;
use crate::error::{HarnessError, Result};

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// Wrapper around `std::env::set_var`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_set_var(key: &str, value: &OsStr) {
    unsafe { env::set_var(key, value) };
}

/// Wrapper around `std::env::remove_var`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_remove_var(key: &str) {
    unsafe { env::remove_var(key) };
}

/// Checks that `key` can name an environment variable on every platform.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidEnvKey`] for an empty key or one
/// containing `=` or a NUL byte.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return Err(HarnessError::InvalidEnvKey {
            key: key.to_owned(),
        });
    }
    Ok(())
}

fn mutate_env_var<K, F>(key: K, mutator: F) -> EnvVarGuard
where
    K: Into<String>,
    F: FnOnce(&str),
{
    let guard = ENV_MUTEX.lock();
    mutate_env_var_locked(key.into(), mutator, &guard)
}

fn mutate_env_var_locked<F>(
    key: String,
    mutator: F,
    _guard: &ReentrantMutexGuard<'static, ()>,
) -> EnvVarGuard
where
    F: FnOnce(&str),
{
    let original = env::var_os(&key);
    mutator(&key);
    tracing::debug!(%key, had_original = original.is_some(), "environment variable overridden");
    EnvVarGuard { key, original }
}

/// RAII guard restoring an environment variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl EnvVarGuard {
    /// Name of the overridden variable.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value the variable had before the override, if any.
    #[must_use]
    pub fn original(&self) -> Option<&OsStr> {
        self.original.as_deref()
    }

    /// Restores the prior value now instead of at the end of the scope.
    pub fn reset(self) {
        drop(self);
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _guard = ENV_MUTEX.lock();
        if let Some(val) = self.original.take() {
            // SAFETY: We hold `ENV_MUTEX` during restoration.
            unsafe { env_set_var(&self.key, &val) };
        } else {
            // SAFETY: We hold `ENV_MUTEX` during restoration.
            unsafe { env_remove_var(&self.key) };
        }
        tracing::debug!(key = %self.key, "environment variable restored");
    }
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

/// RAII guard that serialises environment access for its lifetime.
///
/// ```
/// use casebook::env;
///
/// let lock = env::lock();
/// let _guard = lock.set_var("CASEBOOK_DOC_LOCKED", "1");
/// ```
#[must_use = "dropping releases the environment lock"]
pub struct EnvVarLock {
    guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarLock {
    /// Sets an environment variable while holding the global lock.
    pub fn set_var<K, V>(&self, key: K, value: V) -> EnvVarGuard
    where
        K: Into<String>,
        V: AsRef<OsStr>,
    {
        mutate_env_var_locked(
            key.into(),
            // SAFETY: `self.guard` holds `ENV_MUTEX`.
            |k| unsafe { env_set_var(k, value.as_ref()) },
            &self.guard,
        )
    }

    /// Removes an environment variable while holding the global lock.
    pub fn remove_var<K>(&self, key: K) -> EnvVarGuard
    where
        K: Into<String>,
    {
        // SAFETY: `self.guard` holds `ENV_MUTEX`.
        mutate_env_var_locked(key.into(), |k| unsafe { env_remove_var(k) }, &self.guard)
    }
}

impl fmt::Debug for EnvVarLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarLock").finish_non_exhaustive()
    }
}

/// Holds the environment lock while retaining a set of guards.
///
/// Guards are restored, in reverse order, before the lock is released.
#[must_use = "dropping releases the environment lock and restores guards"]
pub struct EnvScope {
    _lock: EnvVarLock,
    guards: Vec<EnvVarGuard>,
}

impl EnvScope {
    /// Creates a scope that holds the global lock and retains `guards`.
    pub fn new(guards: Vec<EnvVarGuard>) -> Self {
        Self {
            _lock: lock(),
            guards,
        }
    }

    /// Creates a scope from guards built while the lock is held.
    ///
    /// Builders should use the lock's own `set_var`/`remove_var`.
    pub fn new_with<F>(builder: F) -> Self
    where
        F: FnOnce(&EnvVarLock) -> Vec<EnvVarGuard>,
    {
        let lock = lock();
        let guards = builder(&lock);
        Self {
            _lock: lock,
            guards,
        }
    }

    /// Keys overridden by this scope, in creation order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.guards.iter().map(EnvVarGuard::key).collect()
    }

    /// Restores every variable now.
    pub fn reset(self) {
        drop(self);
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        // Restore while the lock is still held; the last override goes first.
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl fmt::Debug for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvScope")
            .field("guards", &self.guards)
            .finish_non_exhaustive()
    }
}

/// Sets an environment variable and returns a guard restoring its prior value.
///
/// Panics, as `std::env::set_var` does, when `key` is invalid; see
/// [`set_env`] for a checked variant.
///
/// ```
/// use casebook::env;
///
/// let _g = env::set_var("CASEBOOK_DOC_FOO", "bar");
/// assert_eq!(std::env::var("CASEBOOK_DOC_FOO").as_deref(), Ok("bar"));
/// ```
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    // SAFETY: `mutate_env_var` holds `ENV_MUTEX` while the closure runs.
    mutate_env_var(key, |k| unsafe { env_set_var(k, value.as_ref()) })
}

/// Removes an environment variable and returns a guard restoring its prior
/// value.
pub fn remove_var<K>(key: K) -> EnvVarGuard
where
    K: Into<String>,
{
    // SAFETY: `mutate_env_var` holds `ENV_MUTEX` while the closure runs.
    mutate_env_var(key, |k| unsafe { env_remove_var(k) })
}

/// Sets `key` to `value` after validating the key.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidEnvKey`] when `key` is invalid; the
/// environment is left untouched.
pub fn try_set_var<K, V>(key: K, value: V) -> Result<EnvVarGuard>
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    let name = key.into();
    validate_key(&name)?;
    Ok(set_var(name, value))
}

/// Overrides `key` for the rest of the test, failing setup on an invalid
/// key.
///
/// # Panics
///
/// Panics at the caller's location when `key` is empty or contains `=` or
/// a NUL byte.
#[track_caller]
pub fn set_env<K, V>(case: &TestCase, key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    match try_set_var(key, value) {
        Ok(guard) => guard,
        Err(err) => panic!("setup error in test '{}': {err}", case.name()),
    }
}

/// Overrides several variables under one lock, failing setup on an invalid
/// key before any variable is touched.
///
/// # Panics
///
/// Panics at the caller's location when any key is invalid.
#[track_caller]
pub fn set_envs<I, K, V>(case: &TestCase, pairs: I) -> EnvScope
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<OsStr>,
{
    let overrides: Vec<(String, V)> = pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect();
    if let Some(err) = overrides.iter().find_map(|(key, _)| validate_key(key).err()) {
        panic!("setup error in test '{}': {err}", case.name());
    }
    EnvScope::new_with(|lock| {
        overrides
            .into_iter()
            .map(|(key, value)| lock.set_var(key, value))
            .collect()
    })
}

/// Acquires the global environment lock for the lifetime of the guard.
pub fn lock() -> EnvVarLock {
    EnvVarLock {
        guard: ENV_MUTEX.lock(),
    }
}

/// Creates a scope that holds the global lock and retains `guards`.
pub fn scope(guards: Vec<EnvVarGuard>) -> EnvScope {
    EnvScope::new(guards)
}

/// Creates a scope from guards built while the lock is held.
pub fn scope_with<F>(builder: F) -> EnvScope
where
    F: FnOnce(&EnvVarLock) -> Vec<EnvVarGuard>,
{
    EnvScope::new_with(builder)
}

/// Runs `f` while holding the global environment lock.
pub fn with_lock<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock();
    f()
}

#[cfg(test)]
mod tests;
