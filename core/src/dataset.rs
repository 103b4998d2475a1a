//! Dataset Version Controller.
//!
//! The server-side dataset can be replaced (upload) or reset (clear). Every
//! successful mutation bumps a process-wide [`DatasetVersion`]; views whose
//! data derives from the dataset hold a [`VersionedView`] that turns version
//! changes into exactly one refetch and refuses results computed against a
//! version that is no longer current.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Transport};

type Listener = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct VersionInner {
    value: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// Monotonic identity of the active server-side dataset. Clones share state.
#[derive(Clone, Default)]
pub struct DatasetVersion {
    inner: Arc<VersionInner>,
}

impl DatasetVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.inner.value.load(Ordering::SeqCst)
    }

    /// Advance the version and notify subscribers with the new value.
    pub fn bump(&self) -> u64 {
        let next = self.inner.value.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Dataset version -> {}", next);
        // Snapshot so listeners may subscribe or bump without re-entering the lock.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener(next);
        }
        next
    }

    /// Run `listener` after every bump, once the new value is observable.
    pub fn subscribe(&self, listener: impl Fn(u64) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(listener));
    }
}

impl fmt::Debug for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetVersion")
            .field("current", &self.current())
            .finish()
    }
}

/// `{ "message": .. }` on success; the service reports processing failures
/// as `{ "error": .. }` with a 2xx status.
#[derive(Debug, Deserialize)]
struct MutationReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Upload and clear, the only operations that change the active dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetController {
    version: DatasetVersion,
    /// Set by a confirmed upload, reset by a confirmed clear.
    uploaded: Arc<AtomicBool>,
}

impl DatasetController {
    pub fn new(version: DatasetVersion) -> Self {
        Self {
            version,
            uploaded: Arc::default(),
        }
    }

    pub fn version(&self) -> &DatasetVersion {
        &self.version
    }

    /// Whether the server is on its default dataset, as far as this client
    /// has seen. Starts out true.
    pub fn using_default(&self) -> bool {
        !self.uploaded.load(Ordering::SeqCst)
    }

    /// Replace the server-side dataset with `bytes` (a CSV with a `weather`
    /// column). Returns the server's confirmation message.
    pub async fn upload<T: Transport>(
        &self,
        gateway: &Gateway<T>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        info!("Uploading dataset {} ({} bytes)", file_name, bytes.len());
        let request = ApiRequest::post("/upload").file("file", file_name, bytes);
        self.mutate(gateway, request, "CSV file uploaded", true).await
    }

    /// Reset the server-side dataset to its default.
    pub async fn clear<T: Transport>(&self, gateway: &Gateway<T>) -> Result<String, ClientError> {
        info!("Clearing uploaded dataset");
        self.mutate(gateway, ApiRequest::post("/clear"), "Dataset reset to default", false)
            .await
    }

    async fn mutate<T: Transport>(
        &self,
        gateway: &Gateway<T>,
        request: ApiRequest,
        fallback_message: &str,
        uploaded: bool,
    ) -> Result<String, ClientError> {
        let reply: MutationReply = gateway.fetch_json(request).await?;
        if let Some(error) = reply.error {
            warn!("Dataset change rejected: {}", error);
            return Err(ClientError::Rejected(error));
        }
        // Before the bump, so listeners observe the new source.
        self.uploaded.store(uploaded, Ordering::SeqCst);
        let version = self.version.bump();
        info!("Dataset changed, now at version {}", version);
        Ok(reply
            .message
            .unwrap_or_else(|| fallback_message.to_string()))
    }
}

/// Handle for one fetch issued by a dependent view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    version: u64,
    seq: u64,
}

impl FetchTicket {
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    /// The result was computed against an outdated version (or a newer fetch
    /// already landed) and was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
struct Committed<T> {
    value: T,
    version: u64,
    seq: u64,
}

/// Displayed data of one dependent view, tagged with the dataset version it
/// was fetched at.
#[derive(Debug, Clone)]
pub struct VersionedView<T> {
    committed: Option<Committed<T>>,
    requested: Option<u64>,
    next_seq: u64,
}

impl<T> Default for VersionedView<T> {
    fn default() -> Self {
        Self {
            committed: None,
            requested: None,
            next_seq: 0,
        }
    }
}

impl<T> VersionedView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ticket if `current` has not been requested yet, else `None`.
    /// Calling this on every version notification yields one fetch per change.
    pub fn refetch_needed(&mut self, current: u64) -> Option<FetchTicket> {
        if self.requested == Some(current) {
            None
        } else {
            Some(self.begin(current))
        }
    }

    /// Unconditionally start a fetch at `current` (user-requested refresh).
    pub fn begin(&mut self, current: u64) -> FetchTicket {
        self.requested = Some(current);
        self.next_seq += 1;
        FetchTicket {
            version: current,
            seq: self.next_seq,
        }
    }

    /// Apply `value` if `ticket` still matches the current version and no
    /// newer fetch has already been committed.
    pub fn commit(&mut self, ticket: FetchTicket, value: T, current: u64) -> Commit {
        if ticket.version != current {
            debug!(
                "Discarding result for version {} (current {})",
                ticket.version, current
            );
            return Commit::Discarded;
        }
        if let Some(existing) = &self.committed {
            if existing.seq > ticket.seq {
                debug!("Discarding superseded result #{}", ticket.seq);
                return Commit::Discarded;
            }
        }
        self.committed = Some(Committed {
            value,
            version: ticket.version,
            seq: ticket.seq,
        });
        Commit::Applied
    }

    /// Last committed value, which may belong to an older version; check
    /// [`VersionedView::is_current`] before treating it as valid.
    pub fn value(&self) -> Option<&T> {
        self.committed.as_ref().map(|c| &c.value)
    }

    pub fn committed_version(&self) -> Option<u64> {
        self.committed.as_ref().map(|c| c.version)
    }

    pub fn is_current(&self, current: u64) -> bool {
        self.committed_version() == Some(current)
    }

    /// Whether the outcome of `ticket` (success or failure) may still be
    /// shown: it was issued at `current` and no fetch was started after it.
    pub fn is_latest(&self, ticket: FetchTicket, current: u64) -> bool {
        ticket.version == current && ticket.seq == self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_bump_is_monotonic_and_shared_across_clones() {
        let version = DatasetVersion::new();
        let other = version.clone();
        assert_eq!(version.current(), 0);
        assert_eq!(other.bump(), 1);
        assert_eq!(version.bump(), 2);
        assert_eq!(other.current(), 2);
    }

    #[test]
    fn test_subscribers_see_new_value() {
        let version = DatasetVersion::new();
        let seen = Arc::new(AtomicU64::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let seen = seen.clone();
            let calls = calls.clone();
            let observed = version.clone();
            version.subscribe(move |v| {
                assert_eq!(observed.current(), v);
                seen.store(v, Ordering::SeqCst);
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        version.bump();
        version.bump();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_one_refetch_per_version_change() {
        let mut view: VersionedView<&str> = VersionedView::new();
        assert!(view.refetch_needed(0).is_some());
        assert!(view.refetch_needed(0).is_none());
        assert!(view.refetch_needed(0).is_none());

        assert!(view.refetch_needed(1).is_some());
        assert!(view.refetch_needed(1).is_none());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut view = VersionedView::new();
        let old = view.refetch_needed(0).unwrap();
        // Dataset replaced while the first fetch is in flight.
        let new = view.refetch_needed(1).unwrap();

        assert_eq!(view.commit(new, "v1 data", 1), Commit::Applied);
        assert_eq!(view.commit(old, "v0 data", 1), Commit::Discarded);
        assert_eq!(view.value(), Some(&"v1 data"));
        assert!(view.is_current(1));
    }

    #[test]
    fn test_late_result_from_old_version_discarded_even_if_first() {
        let mut view = VersionedView::new();
        let old = view.refetch_needed(0).unwrap();
        let _new = view.refetch_needed(1).unwrap();

        assert_eq!(view.commit(old, "v0 data", 1), Commit::Discarded);
        assert_eq!(view.value(), None);
    }

    #[test]
    fn test_newer_fetch_at_same_version_wins() {
        let mut view = VersionedView::new();
        let first = view.begin(3);
        let second = view.begin(3);

        assert_eq!(view.commit(second, "second", 3), Commit::Applied);
        assert_eq!(view.commit(first, "first", 3), Commit::Discarded);
        assert_eq!(view.value(), Some(&"second"));
    }

    #[test]
    fn test_listener_may_subscribe_and_bump_during_notification() {
        let version = DatasetVersion::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let inner = version.clone();
            let calls = calls.clone();
            version.subscribe(move |v| {
                calls.fetch_add(1, Ordering::SeqCst);
                if v == 1 {
                    inner.subscribe(|_| {});
                    inner.bump();
                }
            });
        }

        assert_eq!(version.bump(), 1);
        assert_eq!(version.current(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_of_superseded_ticket_is_not_latest() {
        let mut view: VersionedView<&str> = VersionedView::new();
        let old = view.refetch_needed(0).unwrap();
        let new = view.refetch_needed(1).unwrap();
        assert_eq!(view.commit(new, "v1 data", 1), Commit::Applied);

        // The v0 fetch fails late; its error belongs to a superseded request.
        assert!(!view.is_latest(old, 1));
        assert!(view.is_latest(new, 1));
        // A bump makes even the newest ticket stale.
        assert!(!view.is_latest(new, 2));
    }

    #[test]
    fn test_failure_is_not_latest_once_a_retry_started() {
        let mut view: VersionedView<&str> = VersionedView::new();
        let first = view.begin(4);
        let retry = view.begin(4);
        assert!(!view.is_latest(first, 4));
        assert!(view.is_latest(retry, 4));
    }

    #[test]
    fn test_value_goes_stale_after_bump() {
        let mut view = VersionedView::new();
        let t = view.refetch_needed(0).unwrap();
        view.commit(t, 42, 0);
        assert!(view.is_current(0));
        assert!(!view.is_current(1));
        assert_eq!(view.value(), Some(&42));
    }
}
