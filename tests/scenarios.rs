//! End-to-end scenarios across the prompt engine and the background worker.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;

use pushgate::config::WorkerConfig;
use pushgate::platform::HostAction;
use pushgate::worker::{DisplayedNotification, NotificationData, WindowClient};
use pushgate::{
    BackendSyncClient, BackgroundDeliveryHandler, EventOutcome, FileKeyValueStore,
    MemoryPushPlatform, MemorySettingsTransport, PermissionStateStore, PermissionStatus,
    PromptBlocker, PromptEngine, PromptPolicy, RecordingWorkerHost, SubscriptionManager,
    SyncLedger, WorkerEvent,
};

const VAPID_KEY: &str =
    "BAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8gISIjJCUmJygpKissLS4vMDEyMzQ1Njc4OTo7PD0-P0A";

type Engine = PromptEngine<FileKeyValueStore, Arc<MemoryPushPlatform>, Arc<MemorySettingsTransport>>;

/// One installation: durable storage plus the platform and server fakes.
struct Installation {
    dir: TempDir,
    platform: Arc<MemoryPushPlatform>,
    transport: Arc<MemorySettingsTransport>,
}

impl Installation {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            platform: Arc::new(MemoryPushPlatform::new()),
            transport: Arc::new(MemorySettingsTransport::new()),
        }
    }

    fn store(&self) -> FileKeyValueStore {
        FileKeyValueStore::with_dir(self.dir.path()).unwrap()
    }

    /// Simulate a cold start: fresh engine over the same storage.
    async fn launch(&self, user_id: Option<&str>) -> Engine {
        let engine = PromptEngine::new(
            PromptPolicy::default(),
            PermissionStateStore::new(self.store()),
            SyncLedger::new(self.store()),
            SubscriptionManager::new(Arc::clone(&self.platform), Some(VAPID_KEY.to_string())),
            BackendSyncClient::new(Arc::clone(&self.transport)),
        );
        engine.start().await;
        engine.observe_session(user_id.map(str::to_string));
        engine
    }
}

fn worker(host: &Arc<RecordingWorkerHost>) -> BackgroundDeliveryHandler<Arc<RecordingWorkerHost>> {
    BackgroundDeliveryHandler::new(Arc::clone(host), WorkerConfig::default())
}

fn click(url: &str, action: Option<&str>) -> WorkerEvent {
    WorkerEvent::NotificationClick {
        notification: DisplayedNotification {
            id: "notification-1".to_string(),
            data: Some(NotificationData {
                url: Some(url.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        action: action.map(str::to_string),
    }
}

#[tokio::test]
async fn scenario_a_first_launch_does_not_prompt() {
    let install = Installation::new();

    let engine = install.launch(Some("user-1")).await;

    assert_eq!(engine.record().session_count, 1);
    assert!(!engine.decision().should_prompt);
}

#[tokio::test]
async fn scenario_b_second_launch_prompts() {
    let install = Installation::new();
    install.launch(Some("user-1")).await;

    let engine = install.launch(Some("user-1")).await;

    assert_eq!(engine.record().session_count, 2);
    assert_eq!(engine.status(), PermissionStatus::Default);
    assert!(engine.decision().should_prompt);
}

#[tokio::test]
async fn scenario_c_accept_subscribes_syncs_and_stamps() {
    let install = Installation::new();
    install.launch(Some("user-1")).await;
    let engine = install.launch(Some("user-1")).await;
    let before = Utc::now();

    let outcome = engine.accept().await;

    assert!(outcome.granted && outcome.subscribed && outcome.synced);

    let subscription = install.platform.current_subscription().unwrap();
    let (user_id, update) = install.transport.last_request().unwrap();
    assert_eq!(user_id, "user-1");
    assert!(update.enable_browser_push_notifications);
    assert_eq!(update.push_subscription_endpoint, subscription.endpoint);
    let keys: serde_json::Value = serde_json::from_str(&update.push_subscription_keys).unwrap();
    assert_eq!(keys["p256dh"], subscription.keys.to_encoded().p256dh);

    let stored = PermissionStateStore::new(install.store()).peek().await.unwrap();
    assert_eq!(stored.prompt_count, 1);
    let stamped = stored.last_prompt_timestamp.unwrap();
    assert!(stamped >= before - Duration::seconds(1));
    assert!(!engine.decision().should_prompt);

    // The next launch sees a granted permission and stays quiet.
    let next = install.launch(Some("user-1")).await;
    assert_eq!(
        next.decision().blocker,
        Some(PromptBlocker::PermissionDecided {
            status: PermissionStatus::Granted
        })
    );
}

#[tokio::test]
async fn scenario_d_same_tag_realerts() {
    let host = Arc::new(RecordingWorkerHost::new());
    let handler = worker(&host);
    let payload = json!({"title": "Verse", "body": "Psalm 23", "tag": "daylybread-notification"});

    handler
        .dispatch(WorkerEvent::Push {
            data: Some(payload.clone()),
        })
        .await;
    let outcome = handler
        .dispatch(WorkerEvent::Push {
            data: Some(payload),
        })
        .await;

    assert!(matches!(outcome, EventOutcome::Displayed { .. }));
    assert_eq!(host.tray().len(), 1);
    let alerts: Vec<(bool, bool)> = host
        .actions()
        .iter()
        .filter_map(|a| match a {
            HostAction::Shown {
                renotify, alerted, ..
            } => Some((*renotify, *alerted)),
            _ => None,
        })
        .collect();
    assert_eq!(alerts, vec![(true, true), (true, true)]);
}

#[tokio::test]
async fn scenario_e_dismiss_action_only_closes() {
    let host = Arc::new(
        RecordingWorkerHost::new()
            .with_clients(vec![WindowClient::new("w1", "https://app.example/verses")]),
    );

    let outcome = worker(&host).dispatch(click("/verses", Some("dismiss"))).await;

    assert_eq!(outcome, EventOutcome::Dismissed);
    assert_eq!(
        host.actions(),
        vec![HostAction::Closed {
            id: "notification-1".to_string()
        }]
    );
}

#[tokio::test]
async fn scenario_f_click_focuses_open_window() {
    let host = Arc::new(RecordingWorkerHost::new().with_clients(vec![
        WindowClient::new("w1", "https://app.example/mood"),
        WindowClient::new("w2", "https://app.example/verses/today"),
    ]));

    let outcome = worker(&host).dispatch(click("/verses/today", None)).await;

    assert!(matches!(outcome, EventOutcome::Focused { ref client_id, .. } if client_id == "w2"));
    let actions = host.actions();
    assert!(actions.contains(&HostAction::Focused {
        client_id: "w2".to_string()
    }));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, HostAction::Opened { .. })));
}

#[tokio::test]
async fn failed_sync_is_reconciled_on_next_launch() {
    let install = Installation::new();
    install.launch(Some("user-1")).await;
    let engine = install.launch(Some("user-1")).await;
    install
        .transport
        .set_mode(pushgate::sync::TransportMode::Unreachable);

    let outcome = engine.accept().await;
    assert!(outcome.subscribed && !outcome.synced);

    install
        .transport
        .set_mode(pushgate::sync::TransportMode::Accepting);
    let next = install.launch(Some("user-1")).await;

    assert_eq!(next.reconcile().await, pushgate::ReconcileOutcome::Resent);
    assert_eq!(next.reconcile().await, pushgate::ReconcileOutcome::UpToDate);
}
