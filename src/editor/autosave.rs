//! Per-draft autosave sessions.
//!
//! Every edit re-arms two timers. The local timer is a plain debounce. The
//! remote timer is throttled by [`AutosavePolicy::remote_fire_at`] and retried
//! with backoff on transient failures. Timers are tasks owned by the session;
//! cancelling one never interrupts a save that has already started.

use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::domain::drafts::{Draft, DraftEdit};
use crate::util::lock::mutex_lock;

use super::drafts::{DraftStore, DraftStoreError};
use super::remote::{RemoteSaveError, RemoteSaved, RemoteSaver};
use super::schedule::AutosavePolicy;
use super::status::SaveStatus;

const SOURCE: &str = "quire::editor::autosave";

/// Banner shown once automatic retries have been exhausted.
pub const SYNC_FAILED_MESSAGE: &str = "Draft sync failed. Will try again.";

/// Builds [`AutosaveSession`]s that share one store, one remote and one policy.
#[derive(Clone)]
pub struct AutosaveCoordinator {
    store: Arc<dyn DraftStore>,
    remote: Arc<dyn RemoteSaver>,
    policy: AutosavePolicy,
}

impl AutosaveCoordinator {
    pub fn new(store: Arc<dyn DraftStore>, remote: Arc<dyn RemoteSaver>) -> Self {
        Self {
            store,
            remote,
            policy: AutosavePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AutosavePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn DraftStore> {
        &self.store
    }

    /// Start editing `draft`. Must be called inside a tokio runtime.
    pub fn open(&self, draft: Draft) -> AutosaveSession {
        let dirty = !draft.is_synced();
        let (status, _) = watch::channel(SaveStatus {
            dirty,
            ..SaveStatus::default()
        });
        AutosaveSession {
            inner: Arc::new(Inner {
                store: self.store.clone(),
                remote: self.remote.clone(),
                policy: self.policy,
                state: Mutex::new(SessionState {
                    draft,
                    edit_seq: if dirty { 1 } else { 0 },
                    remote_saved_seq: 0,
                    unsynced_since: None,
                    last_remote_attempt: None,
                    remote_in_flight: false,
                    consecutive_failures: 0,
                    local_timer: Timer::default(),
                    remote_timer: Timer::default(),
                    orphaned_keys: Vec::new(),
                }),
                local_gate: AsyncMutex::new(()),
                remote_gate: AsyncMutex::new(()),
                status,
            }),
        }
    }

    /// Reopen a draft persisted by an earlier session.
    pub async fn resume(&self, id: &str) -> Result<Option<AutosaveSession>, DraftStoreError> {
        Ok(self.store.load(id).await?.map(|draft| self.open(draft)))
    }
}

/// Handle to one draft being edited. Dropping it cancels pending timers.
pub struct AutosaveSession {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn DraftStore>,
    remote: Arc<dyn RemoteSaver>,
    policy: AutosavePolicy,
    state: Mutex<SessionState>,
    local_gate: AsyncMutex<()>,
    remote_gate: AsyncMutex<()>,
    status: watch::Sender<SaveStatus>,
}

struct SessionState {
    draft: Draft,
    edit_seq: u64,
    remote_saved_seq: u64,
    /// First edit the server has not seen yet.
    unsynced_since: Option<Instant>,
    last_remote_attempt: Option<Instant>,
    /// Edits made while this is set are picked up when the attempt finishes.
    remote_in_flight: bool,
    consecutive_failures: u32,
    local_timer: Timer,
    remote_timer: Timer,
    /// Keys a failed rekey left behind; removed after the next local save.
    orphaned_keys: Vec<String>,
}

impl SessionState {
    fn remote_is_current(&self) -> bool {
        self.draft.is_synced() && self.remote_saved_seq >= self.edit_seq
    }
}

/// A pending timer. Bumping `generation` invalidates a task that already woke up.
#[derive(Default)]
struct Timer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl Timer {
    fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    /// Claim the timer for a firing task; `false` if it was replaced meanwhile.
    fn claim(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.handle = None;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Forced,
}

struct Attempt {
    draft: Draft,
    seq: u64,
    started: Instant,
}

impl AutosaveSession {
    /// Record an edit and re-arm both timers.
    pub fn on_edit(&self, edit: DraftEdit) {
        let inner = &self.inner;
        let mut state = inner.lock();
        state.draft.apply(edit);
        state.edit_seq += 1;

        let now = Instant::now();
        let unsynced_since = *state.unsynced_since.get_or_insert(now);
        inner.arm_local(&mut state, now + inner.policy.local_delay);
        if !state.remote_in_flight {
            let fire_at = inner
                .policy
                .remote_fire_at(now, unsynced_since, state.last_remote_attempt);
            inner.arm_remote(&mut state, fire_at);
        }

        inner.status.send_modify(|status| status.dirty = true);
    }

    /// Cancel the local timer and write the draft now.
    pub async fn force_local_save(&self) -> Result<Draft, DraftStoreError> {
        self.inner.lock().local_timer.cancel();
        self.inner.save_local().await
    }

    /// Cancel the remote timer and save to the server now, waiting for any
    /// save already in flight first. Failures are reported, not retried.
    pub async fn force_remote_save(&self) -> Result<RemoteSaved, RemoteSaveError> {
        self.inner.lock().remote_timer.cancel();
        let _gate = self.inner.remote_gate.lock().await;
        // The save we waited on may have scheduled a retry.
        self.inner.lock().remote_timer.cancel();
        let attempt = self.inner.start_attempt();
        self.inner.run_remote(attempt, Trigger::Forced).await
    }

    /// Cancel pending timers. A save already in flight still completes.
    pub fn cancel_pending(&self) {
        let mut state = self.inner.lock();
        state.local_timer.cancel();
        state.remote_timer.cancel();
    }

    /// Stop the session and remove the draft from local storage.
    pub async fn discard(self) -> Result<(), DraftStoreError> {
        self.cancel_pending();
        let _gate = self.inner.local_gate.lock().await;
        let (id, orphans) = {
            let mut state = self.inner.lock();
            (
                state.draft.id.clone(),
                std::mem::take(&mut state.orphaned_keys),
            )
        };
        for key in orphans {
            self.inner.store.delete(&key).await?;
        }
        self.inner.store.delete(&id).await?;
        info!(target = SOURCE, draft_id = %id, "draft discarded");
        Ok(())
    }

    pub fn id(&self) -> String {
        self.inner.lock().draft.id.clone()
    }

    pub fn draft(&self) -> Draft {
        self.inner.lock().draft.clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    pub fn has_pending_timers(&self) -> bool {
        let state = self.inner.lock();
        state.local_timer.is_pending() || state.remote_timer.is_pending()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        mutex_lock(&self.state, SOURCE, "state")
    }

    fn arm_local(self: &Arc<Self>, state: &mut SessionState, at: Instant) {
        state.local_timer.cancel();
        let generation = state.local_timer.generation;
        let session = Arc::downgrade(self);
        state.local_timer.handle = Some(tokio::spawn(async move {
            sleep_until(at).await;
            if let Some(inner) = session.upgrade() {
                inner.fire_local(generation).await;
            }
        }));
    }

    fn arm_remote(self: &Arc<Self>, state: &mut SessionState, at: Instant) {
        state.remote_timer.cancel();
        let generation = state.remote_timer.generation;
        let session = Arc::downgrade(self);
        state.remote_timer.handle = Some(tokio::spawn(async move {
            sleep_until(at).await;
            if let Some(inner) = session.upgrade() {
                inner.fire_remote(generation).await;
            }
        }));
    }

    async fn fire_local(self: Arc<Self>, generation: u64) {
        if !self.lock().local_timer.claim(generation) {
            return;
        }
        // Failures are already reflected in the status.
        let _ = self.save_local().await;
    }

    async fn fire_remote(self: Arc<Self>, generation: u64) {
        if !self.lock().remote_timer.claim(generation) {
            return;
        }
        let _gate = self.remote_gate.lock().await;
        {
            let mut state = self.lock();
            if state.remote_timer.generation != generation {
                debug!(target = SOURCE, "remote timer superseded while waiting; skipping");
                return;
            }
            if state.remote_is_current() {
                debug!(target = SOURCE, "remote copy already current; skipping");
                return;
            }
            let now = Instant::now();
            if let Some(earliest) = state
                .last_remote_attempt
                .map(|last| last + self.policy.remote_interval)
                .filter(|earliest| *earliest > now)
            {
                self.arm_remote(&mut state, earliest);
                return;
            }
        }
        let attempt = self.start_attempt();
        let _ = self.run_remote(attempt, Trigger::Timer).await;
    }

    async fn save_local(&self) -> Result<Draft, DraftStoreError> {
        let _gate = self.local_gate.lock().await;
        let snapshot = self.lock().draft.clone();

        let stored = match self.store.save(&snapshot).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    draft_id = %snapshot.id,
                    error = %err,
                    "local draft save failed; edit kept in memory"
                );
                let message = err.to_string();
                self.status
                    .send_modify(|status| status.local_error = Some(message));
                return Err(err);
            }
        };

        let orphans = {
            let mut state = self.lock();
            if state.draft.id == stored.id {
                state.draft.updated_at = stored.updated_at;
            }
            std::mem::take(&mut state.orphaned_keys)
        };
        let mut leftover = Vec::new();
        for key in orphans.into_iter().filter(|key| *key != stored.id) {
            if let Err(err) = self.store.delete(&key).await {
                warn!(target = SOURCE, key = %key, error = %err, "failed to remove stale draft key");
                leftover.push(key);
            }
        }
        if !leftover.is_empty() {
            self.lock().orphaned_keys.extend(leftover);
        }

        self.status.send_modify(|status| {
            status.last_local_save = Some(stored.updated_at);
            status.local_error = None;
        });
        debug!(target = SOURCE, draft_id = %stored.id, "draft saved locally");
        Ok(stored)
    }

    fn start_attempt(&self) -> Attempt {
        let started = Instant::now();
        let attempt = {
            let mut state = self.lock();
            state.last_remote_attempt = Some(started);
            state.remote_in_flight = true;
            Attempt {
                draft: state.draft.clone(),
                seq: state.edit_seq,
                started,
            }
        };
        self.status.send_modify(|status| status.saving = true);
        attempt
    }

    async fn run_remote(
        self: &Arc<Self>,
        attempt: Attempt,
        trigger: Trigger,
    ) -> Result<RemoteSaved, RemoteSaveError> {
        match self.remote.save(&attempt.draft).await {
            Ok(saved) => {
                self.finish_success(&attempt, &saved).await;
                Ok(saved)
            }
            Err(err) => {
                self.finish_failure(&attempt, &err, trigger);
                Err(err)
            }
        }
    }

    /// Arm the remote timer for edits that arrived during `attempt`.
    fn rearm_after_flight(self: &Arc<Self>, state: &mut SessionState, attempt: &Attempt) {
        if state.edit_seq <= attempt.seq || state.remote_timer.is_pending() {
            return;
        }
        let now = Instant::now();
        let unsynced_since = *state.unsynced_since.get_or_insert(attempt.started);
        let fire_at = self
            .policy
            .remote_fire_at(now, unsynced_since, state.last_remote_attempt);
        self.arm_remote(state, fire_at);
    }

    async fn finish_success(self: &Arc<Self>, attempt: &Attempt, saved: &RemoteSaved) {
        let rekey = {
            let mut state = self.lock();
            state.remote_in_flight = false;
            let previous_id = state.draft.id.clone();
            let adopted = state.draft.remote_id.as_deref() != Some(saved.remote_id.as_str());
            if adopted {
                state.draft.adopt_remote_id(saved.remote_id.clone());
            }
            if let Some(slug) = saved.slug.as_ref() {
                state.draft.article_slug = Some(slug.clone());
            }
            state.remote_saved_seq = state.remote_saved_seq.max(attempt.seq);
            state.consecutive_failures = 0;
            let dirty = state.remote_saved_seq < state.edit_seq;
            state.unsynced_since = dirty.then_some(attempt.started);
            self.rearm_after_flight(&mut state, attempt);

            self.status.send_modify(|status| {
                status.saving = false;
                status.dirty = dirty;
                status.sync_issue = None;
                status.consecutive_failures = 0;
                status.last_remote_save = Some(OffsetDateTime::now_utc());
            });
            (adopted && previous_id != state.draft.id).then(|| (previous_id, state.draft.clone()))
        };

        if let Some((previous_id, draft)) = rekey {
            self.rekey_local(&previous_id, &draft).await;
        }
    }

    async fn rekey_local(&self, previous_id: &str, draft: &Draft) {
        let _gate = self.local_gate.lock().await;
        match self.store.rekey(previous_id, draft).await {
            Ok(stored) => {
                info!(
                    target = SOURCE,
                    from = previous_id,
                    to = %stored.id,
                    "draft rekeyed to server id"
                );
                self.status
                    .send_modify(|status| status.last_local_save = Some(stored.updated_at));
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    from = previous_id,
                    to = %draft.id,
                    error = %err,
                    "failed to rekey local draft"
                );
                self.lock().orphaned_keys.push(previous_id.to_string());
                let message = err.to_string();
                self.status
                    .send_modify(|status| status.local_error = Some(message));
            }
        }
    }

    fn finish_failure(self: &Arc<Self>, attempt: &Attempt, err: &RemoteSaveError, trigger: Trigger) {
        let mut state = self.lock();
        state.remote_in_flight = false;

        if !err.is_retryable() {
            let message = err.to_string();
            self.status.send_modify(|status| {
                status.saving = false;
                status.sync_issue = Some(message);
            });
            return;
        }

        state.consecutive_failures += 1;
        let failures = state.consecutive_failures;
        let gave_up = failures >= self.policy.max_failures;
        self.status.send_modify(|status| {
            status.saving = false;
            status.consecutive_failures = failures;
            if gave_up {
                status.sync_issue = Some(SYNC_FAILED_MESSAGE.to_string());
            }
        });

        if trigger == Trigger::Forced || state.remote_timer.is_pending() {
            self.rearm_after_flight(&mut state, attempt);
            return;
        }
        match self
            .policy
            .retry_at(Instant::now(), failures, attempt.started)
        {
            Some(at) => {
                debug!(target = SOURCE, failures, "remote save retry scheduled");
                self.arm_remote(&mut state, at);
            }
            None => warn!(
                target = SOURCE,
                draft_id = %state.draft.id,
                failures,
                "remote save retries exhausted; waiting for the next edit"
            ),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.local_timer.cancel();
        state.remote_timer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::sleep;

    use super::*;
    use crate::domain::drafts::NEW_DRAFT_ID;
    use crate::editor::drafts::MemoryDraftStore;
    use crate::editor::remote::AUTH_REJECTED_MESSAGE;

    enum Step {
        Fail(u16),
        Reject,
    }

    #[derive(Default)]
    struct ScriptedRemote {
        script: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<(Instant, Draft)>>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedRemote {
        fn with_script(steps: Vec<Step>) -> Self {
            Self {
                script: Mutex::new(steps.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(Instant, Draft)> {
            self.calls.lock().expect("calls").clone()
        }
    }

    #[async_trait]
    impl RemoteSaver for ScriptedRemote {
        async fn save(&self, draft: &Draft) -> Result<RemoteSaved, RemoteSaveError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            self.calls
                .lock()
                .expect("calls")
                .push((Instant::now(), draft.clone()));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let step = self.script.lock().expect("script").pop_front();
            match step {
                Some(Step::Fail(status)) => Err(RemoteSaveError::Server {
                    status,
                    message: "boom".to_string(),
                }),
                Some(Step::Reject) => Err(RemoteSaveError::AuthRejected),
                None => Ok(RemoteSaved {
                    remote_id: draft.remote_id.clone().unwrap_or_else(|| "42".to_string()),
                    updated_at: OffsetDateTime::now_utc(),
                    created: draft.remote_id.is_none(),
                    slug: None,
                }),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DraftStore for BrokenStore {
        async fn save(&self, _draft: &Draft) -> Result<Draft, DraftStoreError> {
            Err(DraftStoreError::Io {
                path: PathBuf::from("/drafts"),
                source: io::Error::other("disk full"),
            })
        }

        async fn load(&self, _id: &str) -> Result<Option<Draft>, DraftStoreError> {
            Ok(None)
        }

        async fn delete(&self, _id: &str) -> Result<(), DraftStoreError> {
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<Draft>, DraftStoreError> {
            Ok(Vec::new())
        }
    }

    fn edit(content: &str) -> DraftEdit {
        DraftEdit {
            title: "Title".to_string(),
            content: content.to_string(),
            section_id: None,
        }
    }

    fn coordinator(
        store: Arc<dyn DraftStore>,
        remote: Arc<ScriptedRemote>,
    ) -> AutosaveCoordinator {
        AutosaveCoordinator::new(store, remote)
    }

    #[tokio::test(start_paused = true)]
    async fn local_save_is_debounced_to_the_last_edit() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(store.clone(), remote).open(Draft::new_local());

        session.on_edit(edit("a"));
        sleep(Duration::from_secs(1)).await;
        session.on_edit(edit("ab"));
        sleep(Duration::from_secs(1)).await;
        session.on_edit(edit("abc"));

        sleep(Duration::from_millis(2_900)).await;
        assert!(store.load(NEW_DRAFT_ID).await.expect("load").is_none());

        sleep(Duration::from_millis(200)).await;
        let saved = store.load(NEW_DRAFT_ID).await.expect("load").expect("saved");
        assert_eq!(saved.content, "abc");
        assert!(session.status().last_local_save.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_editing_is_throttled_and_capped() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        let start = Instant::now();
        for n in 0..40 {
            session.on_edit(edit(&format!("v{n}")));
            sleep(Duration::from_secs(1)).await;
        }
        sleep(Duration::from_secs(30)).await;

        let calls = remote.calls();
        assert!(calls.len() >= 3, "expected several saves, got {}", calls.len());
        let first = calls[0].0 - start;
        assert!(
            first >= Duration::from_secs(10) && first <= Duration::from_millis(15_010),
            "first save after {first:?}"
        );
        for pair in calls.windows(2) {
            assert!(
                pair[1].0 - pair[0].0 >= Duration::from_secs(10),
                "remote saves closer than the base interval"
            );
        }
        let (_, last) = calls.last().expect("at least one call");
        assert_eq!(last.content, "v39");
        assert!(!session.status().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn new_draft_is_rekeyed_after_first_remote_save() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(store.clone(), remote).open(Draft::new_local());

        session.on_edit(edit("body"));
        sleep(Duration::from_secs(20)).await;

        assert_eq!(store.ids(), vec!["42".to_string()]);
        let stored = store.load("42").await.expect("load").expect("present");
        assert_eq!(stored.content, "body");
        assert_eq!(stored.remote_id.as_deref(), Some("42"));
        assert_eq!(session.id(), "42");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_after_three_failures_until_next_edit() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::with_script(vec![
            Step::Fail(500),
            Step::Fail(502),
            Step::Fail(503),
        ]));
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        session.on_edit(edit("draft"));
        sleep(Duration::from_secs(120)).await;

        assert_eq!(remote.calls().len(), 3);
        let status = session.status();
        assert_eq!(status.sync_issue.as_deref(), Some(SYNC_FAILED_MESSAGE));
        assert_eq!(status.consecutive_failures, 3);
        assert!(status.dirty);
        assert!(!session.has_pending_timers());

        session.on_edit(edit("draft again"));
        sleep(Duration::from_secs(30)).await;
        assert_eq!(remote.calls().len(), 4);
        let status = session.status();
        assert!(status.sync_issue.is_none());
        assert!(!status.dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_failure_banner_survives_continuous_editing() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::with_script(
            (0..100).map(|_| Step::Fail(503)).collect(),
        ));
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        for n in 0..40 {
            session.on_edit(edit(&format!("v{n}")));
            sleep(Duration::from_secs(4)).await;
        }

        let status = session.status();
        assert_eq!(status.sync_issue.as_deref(), Some(SYNC_FAILED_MESSAGE));
        assert!(status.consecutive_failures >= 3);
        // Edits after the budget is spent still get one attempt each.
        assert!(remote.calls().len() > 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_credentials_are_not_retried() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::with_script(vec![Step::Reject]));
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        session.on_edit(edit("draft"));
        sleep(Duration::from_secs(90)).await;

        assert_eq!(remote.calls().len(), 1);
        assert_eq!(
            session.status().sync_issue.as_deref(),
            Some(AUTH_REJECTED_MESSAGE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn forced_remote_save_replaces_the_pending_timer() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(store.clone(), remote.clone()).open(Draft::new_local());

        let start = Instant::now();
        session.on_edit(edit("now"));
        let saved = session.force_remote_save().await.expect("forced save");
        assert_eq!(saved.remote_id, "42");

        sleep(Duration::from_secs(60)).await;
        let calls = remote.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, start);
        assert_eq!(store.ids(), vec!["42".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn local_failures_keep_the_edit_in_memory() {
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(Arc::new(BrokenStore), remote).open(Draft::new_local());

        session.on_edit(edit("precious"));
        sleep(Duration::from_secs(4)).await;

        let status = session.status();
        assert!(
            status
                .local_error
                .as_deref()
                .is_some_and(|message| message.contains("disk full"))
        );
        assert_eq!(session.draft().content, "precious");
        assert!(session.force_local_save().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_remote_save_is_in_flight() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote {
            delay: Duration::from_secs(25),
            ..ScriptedRemote::default()
        });
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        for n in 0..60 {
            session.on_edit(edit(&format!("v{n}")));
            sleep(Duration::from_secs(1)).await;
        }
        let forced = session.force_remote_save().await;
        assert!(forced.is_ok());
        sleep(Duration::from_secs(120)).await;

        assert!(remote.calls().len() >= 2);
        assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_save_drops_a_retry_scheduled_while_it_waited() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote {
            script: Mutex::new(vec![Step::Fail(503)].into()),
            delay: Duration::from_secs(5),
            ..ScriptedRemote::default()
        });
        let session = coordinator(store, remote.clone()).open(Draft::new_local());

        session.on_edit(edit("first"));
        let (forced, ()) = tokio::join!(
            async {
                sleep(Duration::from_secs(12)).await;
                session.force_remote_save().await
            },
            async {
                sleep(Duration::from_secs(17)).await;
                session.on_edit(edit("during forced save"));
            }
        );
        assert!(forced.is_ok());
        sleep(Duration::from_secs(60)).await;

        let calls = remote.calls();
        assert_eq!(calls.len(), 3);
        let interval = AutosavePolicy::default().remote_interval;
        assert!(calls[2].0 - calls[1].0 >= interval);
        assert_eq!(calls[2].1.content, "during forced save");
        assert!(!session.status().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn discard_removes_the_draft_and_stops_timers() {
        let store = Arc::new(MemoryDraftStore::new());
        let remote = Arc::new(ScriptedRemote::default());
        let session = coordinator(store.clone(), remote.clone()).open(Draft::new_local());

        session.on_edit(edit("temporary"));
        session.force_local_save().await.expect("local save");
        assert_eq!(store.ids(), vec![NEW_DRAFT_ID.to_string()]);

        session.discard().await.expect("discard");
        sleep(Duration::from_secs(60)).await;
        assert!(store.ids().is_empty());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_reopens_a_stored_draft() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut stored = Draft::with_local_id("local-1");
        stored.content = "from disk".to_string();
        store.save(&stored).await.expect("save");

        let coordinator = coordinator(store, Arc::new(ScriptedRemote::default()));
        let session = coordinator
            .resume("local-1")
            .await
            .expect("resume")
            .expect("present");
        assert_eq!(session.draft().content, "from disk");
        assert!(session.status().dirty);
        assert!(coordinator.resume("missing").await.expect("resume").is_none());
    }
}
