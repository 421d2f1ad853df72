//! Named commands invoked by the host application, e.g. from a ribbon button.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use batch_proxy::{open_session, ErrorPolicy, Host, SessionError, SessionOptions};
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::actions;
use crate::error::{AddInError, Result};

/// How prominently a notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Informational,
    Progress,
    Error,
}

/// A message the add-in leaves for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub icon: Option<String>,
    pub persistent: bool,
}

/// Notifications by key. Posting under an existing key replaces it.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    inner: Arc<Mutex<BTreeMap<String, Notification>>>,
}

impl Notifications {
    pub fn replace(&self, key: &str, notification: Notification) {
        tracing::info!(key, message = %notification.message, "notification");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), notification);
    }

    pub fn get(&self, key: &str) -> Option<Notification> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// Passed to a command handler. The handler must call
/// [`completed`](Self::completed) or [`failed`](Self::failed) when it is
/// done.
#[derive(Debug)]
pub struct ActionEvent {
    name: String,
    policy: ErrorPolicy,
    done: Option<oneshot::Sender<std::result::Result<(), SessionError>>>,
    notifications: Notifications,
}

impl ActionEvent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// What the handler's sessions should do with failures.
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Tell the host the command has finished.
    pub fn completed(mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Ok(()));
        }
    }

    /// Tell the host the command has finished with an error that the
    /// policy did not swallow.
    pub fn failed(mut self, error: SessionError) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Err(error));
        }
    }
}

/// A command handler.
pub type CommandHandler =
    Box<dyn for<'a> Fn(&'a mut dyn Host, ActionEvent) -> BoxFuture<'a, ()> + Send + Sync>;

/// Commands by name.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, CommandHandler>,
    notifications: Notifications,
    policy: ErrorPolicy,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the add-in's own commands: `action` and
    /// `toggleProtection`.
    pub fn with_default_commands() -> Self {
        let mut registry = Self::new();
        registry.associate("action", |_host, event| {
            Box::pin(async move {
                event.notifications().replace(
                    "action",
                    Notification {
                        kind: NotificationKind::Informational,
                        message: "Performed action.".to_string(),
                        icon: Some("Icon.80x80".to_string()),
                        persistent: true,
                    },
                );
                event.completed();
            })
        });
        registry.associate("toggleProtection", |host, event| {
            Box::pin(async move {
                let options =
                    SessionOptions::labeled(event.name().to_string()).with_policy(event.policy());
                let outcome = open_session(host, &options, |ctx| {
                    Box::pin(actions::toggle_protection(ctx))
                })
                .await;
                match outcome {
                    Ok(_) => event.completed(),
                    Err(e) => event.failed(e),
                }
            })
        });
        registry
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn associate<F>(&mut self, name: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut dyn Host, ActionEvent) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Policy handed to handlers through [`ActionEvent::policy`].
    pub fn set_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Run the command `name` and wait for it to signal completion.
    pub async fn invoke(&self, name: &str, host: &mut dyn Host) -> Result<()> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| AddInError::UnknownCommand(name.to_string()))?;

        let (done, completed) = oneshot::channel();
        let event = ActionEvent {
            name: name.to_string(),
            policy: self.policy,
            done: Some(done),
            notifications: self.notifications.clone(),
        };
        tracing::debug!(command = name, "invoking command");
        handler(host, event).await;

        completed
            .await
            .map_err(|_| AddInError::NotCompleted(name.to_string()))?
            .map_err(AddInError::Session)
    }
}

#[cfg(test)]
mod tests {
    use batch_proxy::{HostFuture, HostInfo, LoadResult, Operation, SessionId, TransportError};

    use super::*;

    /// A host that is never reachable.
    struct NoHost;

    impl Host for NoHost {
        fn handshake(&mut self) -> HostFuture<'_, HostInfo> {
            Box::pin(async { Err(TransportError::Disconnected.into()) })
        }

        fn open_session(&mut self) -> HostFuture<'_, SessionId> {
            Box::pin(async { Err(TransportError::Disconnected.into()) })
        }

        fn execute(&mut self, _session: SessionId, _ops: Vec<Operation>) -> HostFuture<'_, Vec<LoadResult>> {
            Box::pin(async { Err(TransportError::Disconnected.into()) })
        }

        fn release_session(&mut self, _session: SessionId) -> HostFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_completion_is_signaled_even_when_the_session_fails() {
        let registry = ActionRegistry::with_default_commands();
        let mut host = NoHost;
        registry.invoke("toggleProtection", &mut host).await.unwrap();
    }

    #[tokio::test]
    async fn test_propagate_policy_reports_command_failure() {
        let mut registry = ActionRegistry::with_default_commands();
        registry.set_policy(ErrorPolicy::Propagate);
        let err = registry.invoke("toggleProtection", &mut NoHost).await.unwrap_err();
        match err {
            AddInError::Session(SessionError::Host(e)) => assert!(e.is_transport()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_action_posts_notification() {
        let registry = ActionRegistry::with_default_commands();
        registry.invoke("action", &mut NoHost).await.unwrap();
        let note = registry.notifications().get("action").unwrap();
        assert_eq!(note.message, "Performed action.");
        assert_eq!(note.kind, NotificationKind::Informational);
        assert!(note.persistent);
    }

    #[tokio::test]
    async fn test_forgotten_completion_is_reported() {
        let mut registry = ActionRegistry::new();
        registry.associate("sloppy", |_host, _event| Box::pin(async {}));
        let err = registry.invoke("sloppy", &mut NoHost).await.unwrap_err();
        assert!(matches!(err, AddInError::NotCompleted(name) if name == "sloppy"));

        let err = registry.invoke("missing", &mut NoHost).await.unwrap_err();
        assert!(matches!(err, AddInError::UnknownCommand(_)));
    }
}
