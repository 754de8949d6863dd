//! Prompt engine: keeps the prompt decision current and runs the user's
//! answer through subscription and settings sync.
//!
//! Inputs (record, permission status, session) are observed explicitly;
//! every change recomputes the decision and publishes it on a watch
//! channel. Async results that were overtaken by a newer input of the same
//! kind are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::core::policy::{PromptBlocker, PromptDecision, PromptPolicy, PromptResponse};
use crate::core::record::{PermissionPromptRecord, PermissionStatus};
use crate::error::FailOpen;
use crate::platform::PushPlatform;
use crate::storage::{KeyValueStore, PermissionStateStore};
use crate::subscription::SubscriptionManager;
use crate::sync::{BackendSyncClient, SettingsTransport, SyncLedger};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of accepting the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    pub granted: bool,
    pub subscribed: bool,
    pub synced: bool,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Unsupported,
    NoSubscription,
    NoSession,
    /// The server already has the current endpoint.
    UpToDate,
    Resent,
    Failed,
}

/// Result of opting out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableOutcome {
    pub unsubscribed: bool,
    pub synced: bool,
}

#[derive(Debug, Clone, Default)]
struct EngineInputs {
    record: PermissionPromptRecord,
    status: PermissionStatus,
    user_id: Option<String>,
    answered_this_session: bool,
}

/// Orchestrates the permission prompt for one application start.
pub struct PromptEngine<S, P, T>
where
    S: KeyValueStore,
    P: PushPlatform,
    T: SettingsTransport,
{
    policy: PromptPolicy,
    store: PermissionStateStore<S>,
    ledger: SyncLedger<S>,
    subscriptions: SubscriptionManager<P>,
    sync: BackendSyncClient<T>,
    clock: Clock,
    inputs: Mutex<EngineInputs>,
    status_generation: AtomicU64,
    session_generation: AtomicU64,
    decisions: watch::Sender<PromptDecision>,
}

impl<S, P, T> PromptEngine<S, P, T>
where
    S: KeyValueStore,
    P: PushPlatform,
    T: SettingsTransport,
{
    pub fn new(
        policy: PromptPolicy,
        store: PermissionStateStore<S>,
        ledger: SyncLedger<S>,
        subscriptions: SubscriptionManager<P>,
        sync: BackendSyncClient<T>,
    ) -> Self {
        let (decisions, _) = watch::channel(PromptDecision::default());
        Self {
            policy,
            store,
            ledger,
            subscriptions,
            sync,
            clock: Arc::new(Utc::now),
            inputs: Mutex::new(EngineInputs::default()),
            status_generation: AtomicU64::new(0),
            session_generation: AtomicU64::new(0),
            decisions,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Load the record (counting this start) and the platform permission.
    pub async fn start(&self) -> PromptDecision {
        let record = self.store.read().await;
        self.observe_record(record);
        self.refresh_permission().await;
        tracing::debug!(decision = ?self.decision(), "prompt engine started");
        self.decision()
    }

    /// Record a login, logout or user switch.
    pub fn observe_session(&self, user_id: Option<String>) {
        self.session_generation.fetch_add(1, Ordering::SeqCst);
        self.inputs().user_id = user_id;
        self.recompute();
    }

    /// Record a permission status pushed by the platform.
    pub fn observe_permission(&self, status: PermissionStatus) {
        self.status_generation.fetch_add(1, Ordering::SeqCst);
        self.apply_status(status);
    }

    /// Replace the in-memory record, e.g. after an external reset.
    pub fn observe_record(&self, record: PermissionPromptRecord) {
        self.inputs().record = record;
        self.recompute();
    }

    /// Re-read the permission status from the platform.
    ///
    /// A result overtaken by a newer status observation is discarded.
    pub async fn refresh_permission(&self) -> PermissionStatus {
        let ticket = self.status_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let status = self.subscriptions.permission().await;

        if self.status_generation.load(Ordering::SeqCst) == ticket {
            self.apply_status(status);
        } else {
            tracing::debug!(status = %status, "discarding stale permission status");
        }
        self.inputs().status
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    pub fn decision(&self) -> PromptDecision {
        *self.decisions.borrow()
    }

    /// Subscribe to decision changes.
    pub fn watch(&self) -> watch::Receiver<PromptDecision> {
        self.decisions.subscribe()
    }

    pub fn record(&self) -> PermissionPromptRecord {
        self.inputs().record.clone()
    }

    pub fn status(&self) -> PermissionStatus {
        self.inputs().status
    }

    // =========================================================================
    // User responses
    // =========================================================================

    /// The user accepted the prompt.
    ///
    /// The prompt is stamped and hidden for the rest of the session whatever
    /// happens next. A failed subscribe or sync is logged and left for the
    /// next cycle.
    pub async fn accept(&self) -> AcceptOutcome {
        self.answer(PromptResponse::Accept).await;
        let session = self.session_generation.load(Ordering::SeqCst);

        let granted = self.subscriptions.initialize().await;
        self.refresh_permission().await;
        if !granted {
            tracing::info!("permission not granted");
            return AcceptOutcome::default();
        }

        let Some(subscription) = self.subscriptions.subscribe().await else {
            return AcceptOutcome {
                granted,
                ..AcceptOutcome::default()
            };
        };
        let mut outcome = AcceptOutcome {
            granted,
            subscribed: true,
            synced: false,
        };

        let Some(user_id) = self.user_id() else {
            tracing::info!("no active session, deferring settings sync");
            return outcome;
        };

        let synced = self.sync.send(&subscription, &user_id).await;
        if self.session_generation.load(Ordering::SeqCst) != session {
            tracing::debug!("session changed during sync, discarding result");
            return outcome;
        }

        if synced {
            self.ledger
                .confirm(&subscription.endpoint, &user_id, self.now())
                .await
                .fail_open_default("recording confirmed endpoint");
        }
        outcome.synced = synced;
        outcome
    }

    /// The user dismissed the prompt, for now or for good.
    pub async fn dismiss(&self, permanent: bool) {
        let response = if permanent {
            PromptResponse::DismissPermanently
        } else {
            PromptResponse::Dismiss
        };
        self.answer(response).await;
    }

    /// Re-send the current subscription if the server has not confirmed it
    /// for the signed-in user.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        if !self.subscriptions.is_supported() {
            return ReconcileOutcome::Unsupported;
        }
        let Some(subscription) = self.subscriptions.get_subscription().await else {
            return ReconcileOutcome::NoSubscription;
        };
        let Some(user_id) = self.user_id() else {
            return ReconcileOutcome::NoSession;
        };
        if !self.ledger.needs_sync(&subscription.endpoint, &user_id).await {
            return ReconcileOutcome::UpToDate;
        }

        tracing::info!(endpoint = %subscription.endpoint, "re-sending unconfirmed subscription");
        if !self.sync.send(&subscription, &user_id).await {
            return ReconcileOutcome::Failed;
        }
        self.ledger
            .confirm(&subscription.endpoint, &user_id, self.now())
            .await
            .fail_open_default("recording confirmed endpoint");
        ReconcileOutcome::Resent
    }

    /// Opt out: drop the local subscription and tell the server.
    pub async fn disable_push(&self) -> DisableOutcome {
        let unsubscribed = self.subscriptions.unsubscribe().await;
        self.ledger
            .clear()
            .await
            .fail_open_default("clearing sync ledger");

        let synced = match self.user_id() {
            Some(user_id) => self.sync.send_disabled(&user_id).await,
            None => false,
        };
        self.refresh_permission().await;
        DisableOutcome {
            unsubscribed,
            synced,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Stamp the record for `response`, persist it and hide the prompt.
    async fn answer(&self, response: PromptResponse) {
        let now = self.now();
        let record = {
            let mut inputs = self.inputs();
            response.apply(&mut inputs.record, now);
            inputs.answered_this_session = true;
            inputs.record.clone()
        };
        self.recompute();

        tracing::info!(
            response = ?response,
            prompt_count = record.prompt_count,
            "prompt answered"
        );
        self.store
            .write(&record)
            .await
            .fail_open_default("persisting prompt record");
    }

    fn apply_status(&self, status: PermissionStatus) {
        self.inputs().status = status;
        self.recompute();
    }

    fn recompute(&self) {
        let now = self.now();
        let decision = {
            let inputs = self.inputs();
            if inputs.answered_this_session {
                PromptDecision::blocked(PromptBlocker::AnsweredThisSession)
            } else {
                self.policy.evaluate(
                    &inputs.record,
                    inputs.status,
                    inputs.user_id.is_some(),
                    now,
                )
            }
        };
        self.decisions.send_if_modified(|current| {
            let changed = *current != decision;
            *current = decision;
            changed
        });
    }

    fn user_id(&self) -> Option<String> {
        self.inputs().user_id.clone()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn inputs(&self) -> MutexGuard<'_, EngineInputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::platform::MemoryPushPlatform;
    use crate::storage::{MemoryKeyValueStore, PROMPT_RECORD_KEY};
    use crate::subscription::{PushSubscriptionRecord, SubscribeOptions};
    use crate::sync::{
        MemorySettingsTransport, SettingsUpdate, SettingsUpdateResponse, SyncState,
        TransportMode,
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    const KEY: &str = "BAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8gISIjJCUmJygpKissLS4vMDEyMzQ1Njc4OTo7PD0-P0A";

    type TestEngine = PromptEngine<
        Arc<MemoryKeyValueStore>,
        Arc<MemoryPushPlatform>,
        Arc<MemorySettingsTransport>,
    >;

    struct Harness {
        backing: Arc<MemoryKeyValueStore>,
        platform: Arc<MemoryPushPlatform>,
        transport: Arc<MemorySettingsTransport>,
    }

    impl Harness {
        fn new(platform: MemoryPushPlatform) -> Self {
            Self {
                backing: Arc::new(MemoryKeyValueStore::new()),
                platform: Arc::new(platform),
                transport: Arc::new(MemorySettingsTransport::new()),
            }
        }

        fn engine(&self) -> TestEngine {
            PromptEngine::new(
                PromptPolicy::default(),
                PermissionStateStore::new(Arc::clone(&self.backing)),
                SyncLedger::new(Arc::clone(&self.backing)),
                SubscriptionManager::new(Arc::clone(&self.platform), Some(KEY.to_string())),
                BackendSyncClient::new(Arc::clone(&self.transport)),
            )
        }

        async fn seed(&self, record: &PermissionPromptRecord) {
            self.backing
                .set(PROMPT_RECORD_KEY, &serde_json::to_string(record).unwrap())
                .await
                .unwrap();
        }
    }

    /// Parks the next call once armed, until the test releases it.
    #[derive(Default)]
    struct Gate {
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        async fn pass(&self) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }

        /// Wait for a parked call, run `f`, then let the call finish.
        async fn interleave(&self, f: impl FnOnce()) {
            self.entered.notified().await;
            f();
            self.release.notify_one();
        }
    }

    /// Platform whose permission read can be held mid-flight.
    #[derive(Default)]
    struct GatedPlatform {
        inner: MemoryPushPlatform,
        gate: Gate,
    }

    #[async_trait]
    impl PushPlatform for GatedPlatform {
        fn supports_worker(&self) -> bool {
            self.inner.supports_worker()
        }

        fn supports_push(&self) -> bool {
            self.inner.supports_push()
        }

        async fn permission(&self) -> PermissionStatus {
            self.gate.pass().await;
            self.inner.permission().await
        }

        async fn has_active_worker(&self) -> bool {
            self.inner.has_active_worker().await
        }

        async fn register_worker(&self) -> Result<()> {
            self.inner.register_worker().await
        }

        async fn worker_ready(&self) -> Result<()> {
            self.inner.worker_ready().await
        }

        async fn request_permission(&self) -> Result<PermissionStatus> {
            self.inner.request_permission().await
        }

        async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionRecord> {
            self.inner.subscribe(options).await
        }

        async fn get_subscription(&self) -> Result<Option<PushSubscriptionRecord>> {
            self.inner.get_subscription().await
        }

        async fn unsubscribe(&self) -> Result<bool> {
            self.inner.unsubscribe().await
        }
    }

    /// Settings transport whose request can be held mid-flight.
    #[derive(Default)]
    struct GatedTransport {
        inner: MemorySettingsTransport,
        gate: Gate,
    }

    #[async_trait]
    impl SettingsTransport for GatedTransport {
        async fn update_settings(
            &self,
            user_id: &str,
            update: &SettingsUpdate,
        ) -> Result<SettingsUpdateResponse> {
            self.gate.pass().await;
            self.inner.update_settings(user_id, update).await
        }
    }

    fn seen(sessions: u32) -> PermissionPromptRecord {
        PermissionPromptRecord {
            session_count: sessions,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_second_start_with_session_prompts() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();

        engine.start().await;
        assert!(!engine.decision().should_prompt);

        engine.observe_session(Some("user-1".to_string()));
        assert!(engine.decision().should_prompt);
    }

    #[tokio::test]
    async fn test_first_start_never_prompts() {
        let h = Harness::new(MemoryPushPlatform::new());
        let engine = h.engine();
        engine.observe_session(Some("user-1".to_string()));

        let decision = engine.start().await;

        assert_eq!(
            decision.blocker,
            Some(PromptBlocker::TooFewSessions { seen: 1, required: 2 })
        );
    }

    #[tokio::test]
    async fn test_accept_subscribes_and_syncs() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        let outcome = engine.accept().await;

        assert_eq!(
            outcome,
            AcceptOutcome {
                granted: true,
                subscribed: true,
                synced: true
            }
        );
        assert_eq!(engine.status(), PermissionStatus::Granted);
        assert!(!engine.decision().should_prompt);
        assert_eq!(engine.record().prompt_count, 1);

        let (user, update) = h.transport.last_request().unwrap();
        assert_eq!(user, "user-1");
        assert_eq!(update.push_subscription_endpoint, "https://push.example.test/send/1");
        assert_eq!(
            engine.ledger.load().await.confirmed_endpoint.as_deref(),
            Some("https://push.example.test/send/1")
        );
    }

    #[tokio::test]
    async fn test_accept_stamps_even_when_sync_fails() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.transport.set_mode(TransportMode::Unreachable);
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        let outcome = engine.accept().await;

        assert!(outcome.granted && outcome.subscribed && !outcome.synced);
        let stored = PermissionStateStore::new(Arc::clone(&h.backing)).peek().await.unwrap();
        assert_eq!(stored.prompt_count, 1);
        assert!(stored.last_prompt_timestamp.is_some());
        assert!(h.platform.current_subscription().is_some());
        assert_eq!(engine.ledger.load().await.confirmed_endpoint, None);
    }

    #[tokio::test]
    async fn test_accept_denied_stops_before_subscribe() {
        let h = Harness::new(MemoryPushPlatform::new().answering(PermissionStatus::Denied));
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        let outcome = engine.accept().await;

        assert_eq!(outcome, AcceptOutcome::default());
        assert!(h.platform.last_subscribe_options().is_none());
        assert!(h.transport.requests().is_empty());
        assert_eq!(
            engine.decision().blocker,
            Some(PromptBlocker::AnsweredThisSession)
        );
    }

    #[tokio::test]
    async fn test_dismiss_hides_prompt_and_persists() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        engine.dismiss(false).await;

        assert!(!engine.decision().should_prompt);
        let stored = PermissionStateStore::new(Arc::clone(&h.backing)).peek().await.unwrap();
        assert_eq!(stored.prompt_count, 1);
        assert!(!stored.permanently_dismissed);
    }

    #[tokio::test]
    async fn test_soft_dismiss_eligible_again_after_interval() {
        let h = Harness::new(MemoryPushPlatform::new());
        let earlier = Utc::now() - Duration::days(2);
        let mut record = seen(3);
        record.record_prompt(earlier, false);
        h.seed(&record).await;
        let engine = h.engine();

        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        assert!(engine.decision().should_prompt);
    }

    #[tokio::test]
    async fn test_watch_sees_session_change() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        let mut rx = engine.watch();

        engine.observe_session(Some("user-1".to_string()));

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().should_prompt);

        engine.observe_session(None);
        assert_eq!(rx.borrow_and_update().blocker, Some(PromptBlocker::NoActiveSession));
    }

    #[tokio::test]
    async fn test_observed_permission_blocks() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        engine.observe_permission(PermissionStatus::Denied);

        assert_eq!(
            engine.decision().blocker,
            Some(PromptBlocker::PermissionDecided {
                status: PermissionStatus::Denied
            })
        );
    }

    #[tokio::test]
    async fn test_unsupported_platform_reports_unsupported() {
        let h = Harness::new(MemoryPushPlatform::unsupported());
        h.seed(&seen(5)).await;
        let engine = h.engine();

        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        assert_eq!(engine.status(), PermissionStatus::Unsupported);
        assert!(!engine.decision().should_prompt);
        assert_eq!(engine.reconcile().await, ReconcileOutcome::Unsupported);
    }

    #[tokio::test]
    async fn test_reconcile_resends_rotated_endpoint_once() {
        let h = Harness::new(
            MemoryPushPlatform::new()
                .with_permission(PermissionStatus::Granted)
                .with_subscription(MemoryPushPlatform::issued_subscription(9)),
        );
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        assert_eq!(engine.reconcile().await, ReconcileOutcome::Resent);
        assert_eq!(engine.reconcile().await, ReconcileOutcome::UpToDate);
        assert_eq!(h.transport.requests().len(), 1);

        h.platform
            .set_subscription(Some(MemoryPushPlatform::issued_subscription(10)));
        assert_eq!(engine.reconcile().await, ReconcileOutcome::Resent);
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_without_session_or_subscription() {
        let h = Harness::new(MemoryPushPlatform::new());
        let engine = h.engine();
        engine.start().await;

        assert_eq!(engine.reconcile().await, ReconcileOutcome::NoSubscription);

        h.platform
            .set_subscription(Some(MemoryPushPlatform::issued_subscription(1)));
        assert_eq!(engine.reconcile().await, ReconcileOutcome::NoSession);
    }

    #[tokio::test]
    async fn test_reconcile_failure_leaves_ledger_empty() {
        let h = Harness::new(
            MemoryPushPlatform::new()
                .with_permission(PermissionStatus::Granted)
                .with_subscription(MemoryPushPlatform::issued_subscription(1)),
        );
        h.transport.set_mode(TransportMode::Rejecting("bad".to_string()));
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        assert_eq!(engine.reconcile().await, ReconcileOutcome::Failed);
        assert_eq!(engine.ledger.load().await.confirmed_endpoint, None);
    }

    #[tokio::test]
    async fn test_reconcile_resends_after_user_switch() {
        let h = Harness::new(
            MemoryPushPlatform::new()
                .with_permission(PermissionStatus::Granted)
                .with_subscription(MemoryPushPlatform::issued_subscription(1)),
        );
        let engine = h.engine();
        engine.start().await;

        engine.observe_session(Some("user-a".to_string()));
        assert_eq!(engine.reconcile().await, ReconcileOutcome::Resent);

        engine.observe_session(Some("user-b".to_string()));
        assert_eq!(engine.reconcile().await, ReconcileOutcome::Resent);
        assert_eq!(engine.reconcile().await, ReconcileOutcome::UpToDate);

        let users: Vec<String> = h.transport.requests().into_iter().map(|(u, _)| u).collect();
        assert_eq!(users, vec!["user-a".to_string(), "user-b".to_string()]);
        assert_eq!(
            engine.ledger.load().await.confirmed_user_id.as_deref(),
            Some("user-b")
        );
    }

    #[tokio::test]
    async fn test_permission_refresh_overtaken_by_observation() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        let platform = Arc::new(GatedPlatform::default());
        let engine = PromptEngine::new(
            PromptPolicy::default(),
            PermissionStateStore::new(Arc::clone(&backing)),
            SyncLedger::new(Arc::clone(&backing)),
            SubscriptionManager::new(Arc::clone(&platform), Some(KEY.to_string())),
            BackendSyncClient::new(MemorySettingsTransport::new()),
        );
        engine.start().await;
        assert_eq!(engine.status(), PermissionStatus::Default);

        platform.gate.arm();
        let (refreshed, ()) = tokio::join!(
            engine.refresh_permission(),
            platform
                .gate
                .interleave(|| engine.observe_permission(PermissionStatus::Denied)),
        );

        assert_eq!(refreshed, PermissionStatus::Denied);
        assert_eq!(engine.status(), PermissionStatus::Denied);
        assert_eq!(
            engine.decision().blocker,
            Some(PromptBlocker::PermissionDecided {
                status: PermissionStatus::Denied
            })
        );
    }

    #[tokio::test]
    async fn test_sync_result_dropped_after_session_change() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        let transport = Arc::new(GatedTransport::default());
        let engine = PromptEngine::new(
            PromptPolicy::default(),
            PermissionStateStore::new(Arc::clone(&backing)),
            SyncLedger::new(Arc::clone(&backing)),
            SubscriptionManager::new(MemoryPushPlatform::new(), Some(KEY.to_string())),
            BackendSyncClient::new(Arc::clone(&transport)),
        );
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        transport.gate.arm();
        let (outcome, ()) = tokio::join!(
            engine.accept(),
            transport
                .gate
                .interleave(|| engine.observe_session(Some("user-2".to_string()))),
        );

        assert!(outcome.subscribed && !outcome.synced);
        assert_eq!(engine.ledger.load().await, SyncState::default());

        assert_eq!(engine.reconcile().await, ReconcileOutcome::Resent);
        let users: Vec<String> = transport
            .inner
            .requests()
            .into_iter()
            .map(|(u, _)| u)
            .collect();
        assert_eq!(users, vec!["user-1".to_string(), "user-2".to_string()]);
    }

    #[tokio::test]
    async fn test_disable_push_unsubscribes_and_clears_ledger() {
        let h = Harness::new(MemoryPushPlatform::new());
        h.seed(&seen(1)).await;
        let engine = h.engine();
        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));
        engine.accept().await;

        let outcome = engine.disable_push().await;

        assert_eq!(
            outcome,
            DisableOutcome {
                unsubscribed: true,
                synced: true
            }
        );
        assert!(h.platform.current_subscription().is_none());
        assert_eq!(engine.ledger.load().await.confirmed_endpoint, None);
        let (_, update) = h.transport.last_request().unwrap();
        assert!(!update.enable_browser_push_notifications);
    }

    #[tokio::test]
    async fn test_fixed_clock_drives_cooldown() {
        let h = Harness::new(MemoryPushPlatform::new());
        let now = Utc::now();
        let mut record = seen(4);
        record.record_prompt(now - Duration::hours(47), false);
        h.seed(&record).await;
        let engine = h.engine().with_clock(Arc::new(move || now));

        engine.start().await;
        engine.observe_session(Some("user-1".to_string()));

        assert_eq!(
            engine.decision().blocker,
            Some(PromptBlocker::CoolingDown {
                days_since: 1,
                required: 2
            })
        );
    }
}
