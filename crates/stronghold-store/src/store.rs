//! The avatar store: durable token → avatar mapping.
//!
//! Each avatar lives in its own directory under the store root, named by
//! its token:
//!
//! ```text
//! <root>/
//! ├── 3fk0...q9/avatar.json
//! └── a81z...0c/avatar.json
//! ```
//!
//! # Concurrency
//!
//! The store is shared between connection tasks behind an `Arc`, so all
//! state is internally synchronized:
//!
//! - ids come from an `AtomicI64`, so two creates never share one
//! - the in-memory index maps every known token to that token's record
//!   lock; `exists` never touches the disk
//! - every read and write of a record holds the record lock. A lock taken
//!   after waiting is only used if the index still maps the token to it,
//!   so a `delete` can't strand a writer on a lock nobody else sees
//! - writes and deletes run as one blocking job that owns the record lock.
//!   A job whose caller timed out keeps the lock until it finishes, so a
//!   later write can't interleave with it
//! - each write goes to its own scratch file that is renamed over the
//!   record, so a reader sees the old record or the new one, never a mix
//! - a token added to the index by a write stays there only if the write
//!   commits. A failed, cancelled or abandoned write takes it out again

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use stronghold_avatar::{token, Avatar, Token, TokenGenerator, TokenSource, Village};
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::record::{self, RECORD_FILE, RECORD_TMP_PREFIX};
use crate::{StoreConfig, StoreError};

/// Lock guarding one token's record.
type RecordLock = Arc<Mutex<()>>;

/// Token → record lock, for every token with a record or a write in flight.
type Index = Arc<Mutex<HashMap<Token, RecordLock>>>;

/// Sequence number for scratch file names.
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Persists avatars keyed by token.
pub struct AvatarStore {
    config: StoreConfig,

    /// Home layout every new avatar starts from.
    template: Village,

    /// Shield granted at creation, converted once from the config.
    new_shield: TimeDelta,

    tokens: Box<dyn TokenSource>,

    /// Next id handed out by `create` when the caller doesn't pick one.
    ///
    /// Starts at 1 on every open; it isn't recovered from the records on
    /// disk.
    next_id: AtomicI64,

    index: Index,
}

impl AvatarStore {
    /// Opens the store at `config.root`, creating the directory if needed.
    ///
    /// The root is scanned once to build the index. Only sub-directories
    /// named by a valid token and holding a record are indexed.
    ///
    /// # Errors
    /// - [`StoreError::Config`] if the new-avatar defaults are unusable
    /// - [`StoreError::StorageUnavailable`] if the root can't be created
    ///   or listed
    pub async fn open(
        config: StoreConfig,
        template: Village,
    ) -> Result<Self, StoreError> {
        if config.new_avatar.level < stronghold_avatar::MIN_LEVEL {
            return Err(StoreError::Config(format!(
                "new avatar level {} is below the minimum",
                config.new_avatar.level
            )));
        }
        let new_shield = TimeDelta::from_std(config.new_avatar.shield)
            .map_err(|_| {
                StoreError::Config("new avatar shield is too long".into())
            })?;

        let index = with_timeout(config.io_timeout, "open", scan_root(&config.root))
            .await?;
        tracing::info!(
            root = %config.root.display(),
            avatars = index.len(),
            "avatar store opened"
        );

        Ok(Self {
            config,
            template,
            new_shield,
            tokens: Box::new(TokenGenerator),
            next_id: AtomicI64::new(1),
            index: Arc::new(Mutex::new(index)),
        })
    }

    /// Replaces the source `create` draws fresh tokens from.
    pub fn with_token_source(mut self, source: impl TokenSource) -> Self {
        self.tokens = Box::new(source);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates, persists and returns a new avatar.
    ///
    /// With `token: None` a fresh token is drawn until one is found that
    /// isn't in use. With `id: None` the next id from the store's counter
    /// is used.
    ///
    /// The avatar starts at the configured level with the configured
    /// currency, the starting-village layout and a shield running from
    /// now.
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if `token` isn't a valid token; nothing
    ///   is written
    /// - [`StoreError::AlreadyExists`] if `token` is already in use
    /// - [`StoreError::StorageUnavailable`] if the record can't be written
    ///   or the write times out. A failed write releases the token; a
    ///   timed-out one releases it only if it goes on to fail.
    pub async fn create(
        &self,
        token: Option<&str>,
        id: Option<i64>,
    ) -> Result<Avatar, StoreError> {
        let requested = token.map(Token::parse).transpose()?;

        let guard = {
            let mut index = self.index.lock().await;
            let token = match requested {
                Some(token) => {
                    if index.contains_key(&token) {
                        return Err(StoreError::AlreadyExists(token.into_inner()));
                    }
                    token
                }
                None => {
                    let mut attempts = 1u32;
                    let mut token = self.tokens.next_token();
                    while index.contains_key(&token) {
                        attempts += 1;
                        token = self.tokens.next_token();
                    }
                    if attempts > 1 {
                        tracing::debug!(attempts, "token collision while creating avatar");
                    }
                    token
                }
            };
            // Lock the record before publishing it in the index so a
            // concurrent load waits for the first write instead of
            // finding no file.
            self.reserve(&mut index, token).await
        };

        let token = guard.token().clone();
        let id = id.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::Relaxed));
        let avatar = self.new_avatar(token.clone(), id, Utc::now())?;

        if let Err(e) = self.write_record(&avatar, guard).await {
            tracing::warn!(%token, error = %e, "create failed");
            return Err(e);
        }

        tracing::info!(%token, id, "avatar created");
        Ok(avatar)
    }

    /// Loads the avatar stored under `token`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if there is no record for `token`,
    ///   including when `token` isn't a valid token at all
    /// - [`StoreError::CorruptRecord`] if the record can't be parsed
    /// - [`StoreError::StorageUnavailable`] on I/O failure or timeout
    pub async fn load(&self, token: &str) -> Result<Avatar, StoreError> {
        let Ok(token) = Token::parse(token) else {
            return Err(StoreError::NotFound(token.to_owned()));
        };
        let Some((_guard, _)) = self.lock_indexed(&token).await else {
            return Err(StoreError::NotFound(token.into_inner()));
        };

        let path = self.record_path(&token);
        let bytes = match with_timeout(self.config.io_timeout, "load", fs::read(&path)).await {
            Ok(bytes) => bytes,
            Err(StoreError::StorageUnavailable { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                // Removed behind our back.
                return Err(StoreError::NotFound(token.into_inner()));
            }
            Err(e) => return Err(e),
        };

        match record::decode(&token, &bytes) {
            Ok(avatar) => {
                tracing::debug!(%token, id = avatar.id(), "avatar loaded");
                Ok(avatar)
            }
            Err(e) => {
                tracing::warn!(%token, error = %e, "corrupt avatar record");
                Err(e)
            }
        }
    }

    /// Writes the full state of `avatar` to the record named by its token,
    /// replacing any earlier record.
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if the avatar has no token
    /// - [`StoreError::StorageUnavailable`] on I/O failure or timeout; the
    ///   previous record, if any, is left intact
    pub async fn save(&self, avatar: &Avatar) -> Result<(), StoreError> {
        let token = avatar.require_token()?;
        let guard = self.lock_for_write(token).await;
        self.write_record(avatar, guard).await?;
        tracing::info!(%token, id = avatar.id(), "avatar saved");
        Ok(())
    }

    /// Returns `true` if a record exists for `token`.
    pub async fn exists(&self, token: &str) -> bool {
        self.index.lock().await.contains_key(token)
    }

    /// Removes the record for `token`. Returns `false` if there was none.
    ///
    /// # Errors
    /// Returns [`StoreError::StorageUnavailable`] if the record directory
    /// can't be removed; the index entry is kept in that case.
    pub async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let Ok(token) = Token::parse(token) else {
            return Ok(false);
        };
        let Some((guard, lock)) = self.lock_indexed(&token).await else {
            return Ok(false);
        };

        let dir = self.record_dir(&token);
        let index = Arc::clone(&self.index);
        let removed = token.clone();
        run_blocking(self.config.io_timeout, "delete", move || {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            unindex(&mut index.blocking_lock(), &removed, &lock);
            drop(guard);
            Ok(())
        })
        .await?;

        tracing::info!(%token, "avatar deleted");
        Ok(true)
    }

    /// Number of avatars in the index.
    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    // -- internals --

    fn new_avatar(
        &self,
        token: Token,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Avatar, StoreError> {
        let defaults = &self.config.new_avatar;
        // Millisecond precision, the finest the login message can carry.
        let now = now.trunc_subsecs(3);

        let mut avatar = Avatar::with_id(id);
        avatar.assign_token(token);
        avatar.set_level(defaults.level)?;
        avatar.name = defaults.name.clone();
        avatar.gems = defaults.gems;
        avatar.free_gems = defaults.free_gems;
        avatar.home = self.template.clone();
        avatar.shield_end_time = now
            .checked_add_signed(self.new_shield)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        avatar.date_joined = now;
        avatar.date_last_played = now;
        Ok(avatar)
    }

    /// Publishes `token` in `index` under a fresh lock and takes that lock.
    ///
    /// The returned guard removes the entry again unless its write commits.
    async fn reserve(
        &self,
        index: &mut HashMap<Token, RecordLock>,
        token: Token,
    ) -> WriteGuard {
        let lock = RecordLock::default();
        // Nobody else has this lock yet, so this never waits.
        let guard = Arc::clone(&lock).lock_owned().await;
        index.insert(token.clone(), Arc::clone(&lock));
        WriteGuard {
            reservation: Some(Reservation::new(&self.index, token.clone(), lock)),
            token,
            _lock: guard,
        }
    }

    /// Takes the record lock of an indexed token.
    ///
    /// Returns `None` if the token isn't indexed. If the token's entry was
    /// removed or replaced while we waited, the lock we got is stale and we
    /// look again.
    async fn lock_indexed(
        &self,
        token: &Token,
    ) -> Option<(OwnedMutexGuard<()>, RecordLock)> {
        loop {
            let lock = self.index.lock().await.get(token).cloned()?;
            let guard = Arc::clone(&lock).lock_owned().await;
            let current = self
                .index
                .lock()
                .await
                .get(token)
                .is_some_and(|l| Arc::ptr_eq(l, &lock));
            if current {
                return Some((guard, lock));
            }
        }
    }

    /// Takes the record lock of `token` for a write, indexing the token if
    /// it isn't yet.
    async fn lock_for_write(&self, token: &Token) -> WriteGuard {
        loop {
            let mut index = self.index.lock().await;
            let Some(lock) = index.get(token).cloned() else {
                return self.reserve(&mut index, token.clone()).await;
            };
            drop(index);

            let guard = Arc::clone(&lock).lock_owned().await;
            let mut index = self.index.lock().await;
            match index.get(token) {
                Some(current) if Arc::ptr_eq(current, &lock) => {
                    return WriteGuard {
                        reservation: None,
                        token: token.clone(),
                        _lock: guard,
                    };
                }
                // Replaced while we waited; wait on the new lock instead.
                Some(_) => continue,
                // Deleted while we waited. Put our lock back so anyone
                // else queued on it stays serialized with us.
                None => {
                    index.insert(token.clone(), Arc::clone(&lock));
                    return WriteGuard {
                        reservation: Some(Reservation::new(&self.index, token.clone(), lock)),
                        token: token.clone(),
                        _lock: guard,
                    };
                }
            }
        }
    }

    fn record_dir(&self, token: &Token) -> PathBuf {
        self.config.root.join(token.as_str())
    }

    fn record_path(&self, token: &Token) -> PathBuf {
        self.record_dir(token).join(RECORD_FILE)
    }

    /// Writes `avatar`'s record while holding `guard`.
    ///
    /// The write runs to completion on the blocking pool even if this
    /// future times out or is dropped, and it keeps the record lock until
    /// then. The guard's reservation, if any, is committed only once the
    /// record is in place.
    async fn write_record(
        &self,
        avatar: &Avatar,
        guard: WriteGuard,
    ) -> Result<(), StoreError> {
        let bytes = record::encode(avatar)?;
        let dir = self.record_dir(guard.token());
        run_blocking(self.config.io_timeout, "save", move || {
            write_atomically(&dir, &bytes)?;
            guard.commit();
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for AvatarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarStore")
            .field("root", &self.config.root)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Reads a template village from a JSON file.
///
/// # Errors
/// Returns [`StoreError::Template`] if the file can't be read or isn't
/// valid JSON.
pub async fn load_template(path: impl AsRef<Path>) -> Result<Village, StoreError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Template(format!("{}: {e}", path.display())))?;
    Village::from_json(&text)
        .map_err(|e| StoreError::Template(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Write guards
// ---------------------------------------------------------------------------

/// Write access to one token's record.
struct WriteGuard {
    // Declared before the lock so an uncommitted entry leaves the index
    // before the next waiter gets the lock.
    reservation: Option<Reservation>,
    token: Token,
    _lock: OwnedMutexGuard<()>,
}

impl WriteGuard {
    fn token(&self) -> &Token {
        &self.token
    }

    /// Keeps the index entry this write added, if any.
    fn commit(mut self) {
        if let Some(mut reservation) = self.reservation.take() {
            reservation.token = None;
        }
    }
}

/// An index entry added for a write that hasn't committed yet.
///
/// Dropping it uncommitted removes the entry, provided it still points at
/// the same lock. Like the session drop guard, it falls back to a spawned
/// task when the index lock is busy.
struct Reservation {
    index: Index,
    token: Option<Token>,
    lock: RecordLock,
}

impl Reservation {
    fn new(index: &Index, token: Token, lock: RecordLock) -> Self {
        Self {
            index: Arc::clone(index),
            token: Some(token),
            lock,
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        if let Ok(mut index) = self.index.try_lock() {
            unindex(&mut index, &token, &self.lock);
            tracing::debug!(%token, "uncommitted token released");
            return;
        }
        let index = Arc::clone(&self.index);
        let lock = Arc::clone(&self.lock);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    unindex(&mut *index.lock().await, &token, &lock);
                    tracing::debug!(%token, "uncommitted token released");
                });
            }
            Err(_) => {
                tracing::warn!(%token, "no runtime to release uncommitted token");
            }
        }
    }
}

/// Removes `token` from `index` if it still maps to `lock`.
fn unindex(index: &mut HashMap<Token, RecordLock>, token: &Token, lock: &RecordLock) {
    if index.get(token).is_some_and(|l| Arc::ptr_eq(l, lock)) {
        index.remove(token);
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Runs a filesystem future with a deadline. Both an I/O error and the
/// deadline passing become [`StoreError::StorageUnavailable`].
async fn with_timeout<T>(
    timeout: std::time::Duration,
    op: &'static str,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StoreError::unavailable(op, e)),
        Err(_) => Err(StoreError::unavailable(
            op,
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no response within {timeout:?}"),
            ),
        )),
    }
}

/// Runs `work` on the blocking pool and waits for it up to `timeout`.
///
/// On timeout the work is not cancelled; it finishes in the background.
async fn run_blocking<T: Send + 'static>(
    timeout: std::time::Duration,
    op: &'static str,
    work: impl FnOnce() -> io::Result<T> + Send + 'static,
) -> Result<T, StoreError> {
    let task = tokio::task::spawn_blocking(work);
    with_timeout(timeout, op, async move {
        task.await.unwrap_or_else(|e| Err(io::Error::other(e)))
    })
    .await
}

/// Writes `bytes` to a fresh scratch file in `dir`, flushes it to disk,
/// then renames it over the record. The scratch file is removed if any
/// step fails.
fn write_atomically(dir: &Path, bytes: &[u8]) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let (tmp, mut file) = create_scratch(dir)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    let result = written.and_then(|()| std::fs::rename(&tmp, dir.join(RECORD_FILE)));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Creates a scratch file no other write is using.
fn create_scratch(dir: &Path) -> io::Result<(PathBuf, std::fs::File)> {
    loop {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let candidate = dir.join(format!("{RECORD_TMP_PREFIX}{}-{seq}", std::process::id()));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Builds the index from the sub-directories of `root` that hold a record.
async fn scan_root(root: &Path) -> io::Result<HashMap<Token, RecordLock>> {
    fs::create_dir_all(root).await?;
    let mut index = HashMap::new();
    let mut entries = fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str().filter(|n| token::is_valid(n)) else {
            tracing::warn!(entry = ?name, "skipping non-token entry in avatar root");
            continue;
        };
        if !fs::try_exists(entry.path().join(RECORD_FILE)).await? {
            tracing::warn!(entry = name, "skipping avatar directory without a record");
            continue;
        }
        // `is_valid` already passed, so `parse` can't fail here.
        if let Ok(token) = Token::parse(name) {
            index.insert(token, RecordLock::default());
        }
    }
    tracing::debug!(root = %root.display(), count = index.len(), "scanned avatar root");
    Ok(index)
}
