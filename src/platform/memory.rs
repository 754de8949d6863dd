//! In-memory push platform for testing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::record::PermissionStatus;
use crate::error::{PushError, Result};
use crate::platform::PushPlatform;
use crate::subscription::{PushSubscriptionRecord, SubscribeOptions};

#[derive(Debug)]
struct PlatformState {
    permission: PermissionStatus,
    /// What the user picks when asked.
    answer: PermissionStatus,
    active_worker: bool,
    registrations: u32,
    permission_requests: u32,
    subscription: Option<PushSubscriptionRecord>,
    last_subscribe_options: Option<SubscribeOptions>,
    issued_endpoints: u32,
    fail_register: bool,
    fail_subscribe: bool,
}

impl Default for PlatformState {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Default,
            answer: PermissionStatus::Granted,
            active_worker: false,
            registrations: 0,
            permission_requests: 0,
            subscription: None,
            last_subscribe_options: None,
            issued_endpoints: 0,
            fail_register: false,
            fail_subscribe: false,
        }
    }
}

/// Scriptable push platform.
///
/// Starts fully capable, with permission `default` and a user who grants
/// when asked. Issued subscriptions get deterministic endpoints.
#[derive(Debug)]
pub struct MemoryPushPlatform {
    supports_worker: bool,
    supports_push: bool,
    state: Mutex<PlatformState>,
}

impl Default for MemoryPushPlatform {
    fn default() -> Self {
        Self {
            supports_worker: true,
            supports_push: true,
            state: Mutex::new(PlatformState::default()),
        }
    }
}

impl MemoryPushPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform with neither workers nor push.
    pub fn unsupported() -> Self {
        Self {
            supports_worker: false,
            supports_push: false,
            ..Self::default()
        }
    }

    pub fn without_push(mut self) -> Self {
        self.supports_push = false;
        self
    }

    pub fn with_permission(mut self, status: PermissionStatus) -> Self {
        self.state_mut().permission = status;
        self
    }

    /// Set how the user answers the permission request.
    pub fn answering(mut self, status: PermissionStatus) -> Self {
        self.state_mut().answer = status;
        self
    }

    pub fn with_active_worker(mut self) -> Self {
        self.state_mut().active_worker = true;
        self
    }

    pub fn with_subscription(mut self, subscription: PushSubscriptionRecord) -> Self {
        self.state_mut().subscription = Some(subscription);
        self
    }

    pub fn failing_register(mut self) -> Self {
        self.state_mut().fail_register = true;
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.state_mut().fail_subscribe = true;
        self
    }

    /// Change the permission as if the user edited site settings.
    pub fn set_permission(&self, status: PermissionStatus) {
        self.state().permission = status;
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.state().fail_subscribe = fail;
    }

    /// Replace the subscription as if the push service rotated it.
    pub fn set_subscription(&self, subscription: Option<PushSubscriptionRecord>) {
        self.state().subscription = subscription;
    }

    /// Number of worker registrations performed.
    pub fn registrations(&self) -> u32 {
        self.state().registrations
    }

    /// Number of times the user was asked for permission.
    pub fn permission_requests(&self) -> u32 {
        self.state().permission_requests
    }

    pub fn last_subscribe_options(&self) -> Option<SubscribeOptions> {
        self.state().last_subscribe_options.clone()
    }

    pub fn current_subscription(&self) -> Option<PushSubscriptionRecord> {
        self.state().subscription.clone()
    }

    /// Deterministic subscription for the `n`th issue.
    pub fn issued_subscription(n: u32) -> PushSubscriptionRecord {
        let byte = (n % 256) as u8;
        let p256dh = std::iter::once(0x04).chain(std::iter::repeat_n(byte, 64));
        PushSubscriptionRecord::new(
            format!("https://push.example.test/send/{}", n),
            p256dh.collect(),
            vec![byte; 16],
        )
    }

    fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut PlatformState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PushPlatform for MemoryPushPlatform {
    fn supports_worker(&self) -> bool {
        self.supports_worker
    }

    fn supports_push(&self) -> bool {
        self.supports_push
    }

    async fn permission(&self) -> PermissionStatus {
        if !self.supports_push {
            return PermissionStatus::Unsupported;
        }
        self.state().permission
    }

    async fn has_active_worker(&self) -> bool {
        self.state().active_worker
    }

    async fn register_worker(&self) -> Result<()> {
        if !self.supports_worker {
            return Err(PushError::unsupported("service worker"));
        }
        let mut state = self.state();
        if state.fail_register {
            return Err(PushError::platform("worker registration failed"));
        }
        state.registrations += 1;
        state.active_worker = true;
        Ok(())
    }

    async fn worker_ready(&self) -> Result<()> {
        if self.state().active_worker {
            Ok(())
        } else {
            Err(PushError::platform("no active worker"))
        }
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        if !self.supports_push {
            return Err(PushError::unsupported("notifications"));
        }
        let mut state = self.state();
        state.permission_requests += 1;
        // Only an undecided permission can change through a request.
        if state.permission == PermissionStatus::Default {
            state.permission = state.answer;
        }
        Ok(state.permission)
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionRecord> {
        if !self.supports_push {
            return Err(PushError::unsupported("push manager"));
        }
        let mut state = self.state();
        state.last_subscribe_options = Some(options.clone());
        if state.fail_subscribe {
            return Err(PushError::platform("push service unreachable"));
        }
        if !state.permission.is_granted() {
            return Err(PushError::platform("permission not granted"));
        }
        if let Some(existing) = &state.subscription {
            return Ok(existing.clone());
        }
        state.issued_endpoints += 1;
        let subscription = Self::issued_subscription(state.issued_endpoints);
        state.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscriptionRecord>> {
        if !self.supports_push {
            return Err(PushError::unsupported("push manager"));
        }
        Ok(self.state().subscription.clone())
    }

    async fn unsubscribe(&self) -> Result<bool> {
        if !self.supports_push {
            return Err(PushError::unsupported("push manager"));
        }
        Ok(self.state().subscription.take().is_some())
    }
}
