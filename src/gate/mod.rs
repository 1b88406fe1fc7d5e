//! Session redirect gate.
//!
//! Decides on mount, and again on every auth-state change, whether the user must
//! be moved off the current route. The mount-time check and the event listener
//! run as independent tasks with no ordering between them; both apply idempotent
//! replace-navigations, so a duplicate redirect to the same target is harmless.

pub mod policy;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{sync::oneshot, task::JoinHandle};

use crate::{
    models::{AuthEvent, GateAction},
    navigation::{NavigateOptions, NavigatorState},
    paths::is_public,
    session::SessionProviderState,
};

/// SessionGate
///
/// Cheap to clone; clones share the mounted guard and the loading flag.
#[derive(Clone)]
pub struct SessionGate {
    provider: SessionProviderState,
    navigator: NavigatorState,
    mounted: Arc<AtomicBool>,
    is_loading: Arc<AtomicBool>,
}

impl SessionGate {
    /// Public routes never show the loading state.
    pub fn new(provider: SessionProviderState, navigator: NavigatorState) -> Self {
        let is_loading = !is_public(&navigator.current_path());
        Self {
            provider,
            navigator,
            mounted: Arc::new(AtomicBool::new(true)),
            is_loading: Arc::new(AtomicBool::new(is_loading)),
        }
    }

    /// mount
    ///
    /// Subscribes to auth events and starts the initial session check. The
    /// subscription is torn down when the returned handle is unmounted or dropped.
    pub fn mount(provider: SessionProviderState, navigator: NavigatorState) -> GateHandle {
        let gate = Self::new(provider, navigator);

        let mut subscription = gate.provider.on_auth_state_change();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let listener_gate = gate.clone();
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = subscription.next() => match event {
                        Some(event) => {
                            listener_gate.handle_event(event).await;
                        }
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        });

        let check_gate = gate.clone();
        let initial_check = tokio::spawn(async move { check_gate.run_initial_check().await });

        GateHandle {
            gate,
            shutdown: Some(shutdown_tx),
            listener: Some(listener),
            initial_check: Some(initial_check),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// run_initial_check
    ///
    /// Fetches the session once and applies the initial policy. A provider error
    /// leaves the user where they are. Results arriving after unmount are discarded.
    pub async fn run_initial_check(&self) -> GateAction {
        let path = self.navigator.current_path();
        let outcome = self.provider.get_session().await;

        if !self.is_mounted() {
            tracing::debug!(path = %path, "gate unmounted before session check settled");
            return GateAction::Stay;
        }

        let action = match outcome {
            Ok(session) => policy::initial_action(&path, &session),
            Err(e) => {
                tracing::warn!(error = %e, path = %path, "session check failed, leaving user on route");
                GateAction::Stay
            }
        };

        self.is_loading.store(false, Ordering::SeqCst);
        self.apply(&action).await;
        action
    }

    /// handle_event
    ///
    /// Applies the event policy against the path current at delivery time.
    pub async fn handle_event(&self, event: AuthEvent) -> GateAction {
        if !self.is_mounted() {
            return GateAction::Stay;
        }

        let path = self.navigator.current_path();
        let action = policy::event_action(&path, &event);
        tracing::debug!(kind = ?event.kind, path = %path, ?action, "auth event");
        self.apply(&action).await;
        action
    }

    async fn apply(&self, action: &GateAction) {
        match action {
            GateAction::Stay => {}
            GateAction::Navigate { to } => {
                tracing::info!(to = %to, "session gate redirect");
                self.navigator.navigate(to, NavigateOptions::replace());
            }
            GateAction::SignOut => {
                tracing::info!("role not allowed on this surface, signing out");
                if let Err(e) = self.provider.sign_out().await {
                    tracing::warn!(error = %e, "forced sign-out failed");
                }
            }
        }
    }

    fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}

/// GateHandle
///
/// Owns the tasks started by `SessionGate::mount`. Dropping the handle unmounts.
pub struct GateHandle {
    gate: SessionGate,
    shutdown: Option<oneshot::Sender<()>>,
    listener: Option<JoinHandle<()>>,
    initial_check: Option<JoinHandle<GateAction>>,
}

impl GateHandle {
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_loading()
    }

    /// Waits for the mount-time check. Returns `None` if it was already awaited
    /// or the task did not complete.
    pub async fn initial_check(&mut self) -> Option<GateAction> {
        self.initial_check.take()?.await.ok()
    }

    /// unmount
    ///
    /// Clears the mounted guard and closes the auth subscription. An in-flight
    /// session check keeps running but its result is ignored.
    pub async fn unmount(mut self) {
        self.stop();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }

    fn stop(&mut self) {
        self.gate.unmount();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
