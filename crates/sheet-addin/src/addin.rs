//! The add-in: readiness, task pane actions and commands over one host.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use batch_proxy::{open_session, ErrorPolicy, Host, HostInfo, HostType, SessionOptions};

use crate::actions;
use crate::error::{AddInError, Result};
use crate::readiness::ReadinessGate;
use crate::registry::{ActionRegistry, Notifications};

/// The task pane's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateTable,
    FilterTable,
    SortTable,
    CreateChart,
    FreezeHeader,
    ToggleProtection,
}

impl Action {
    /// Every action, in the order a walkthrough runs them.
    pub const ALL: [Action; 6] = [
        Action::CreateTable,
        Action::FilterTable,
        Action::SortTable,
        Action::CreateChart,
        Action::FreezeHeader,
        Action::ToggleProtection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateTable => "create-table",
            Action::FilterTable => "filter-table",
            Action::SortTable => "sort-table",
            Action::CreateChart => "create-chart",
            Action::FreezeHeader => "freeze-header",
            Action::ToggleProtection => "toggle-protection",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

/// Run `action`, logging and discarding its error.
pub async fn try_catch<T, E, F>(action: F) -> Option<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    match action.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "action failed");
            None
        }
    }
}

/// The add-in bound to one host.
pub struct AddIn<H> {
    host: H,
    gate: ReadinessGate,
    policy: ErrorPolicy,
    commands: ActionRegistry,
}

impl<H: Host> AddIn<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            gate: ReadinessGate::new(),
            policy: ErrorPolicy::default(),
            commands: ActionRegistry::with_default_commands(),
        }
    }

    /// What sessions do with failures.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self.commands.set_policy(policy);
        self
    }

    /// Handshake with the host and open the readiness gate if it is a
    /// spreadsheet application.
    pub async fn initialize(&mut self) -> Result<&HostInfo> {
        if self.gate.is_ready() {
            return Ok(self.gate.ensure_ready()?);
        }
        let info = self.host.handshake().await.map_err(AddInError::Handshake)?;
        if info.host != HostType::Excel {
            tracing::warn!(host = ?info.host, "not a spreadsheet host, staying uninitialized");
            return Err(AddInError::UnsupportedHost(info.host));
        }
        tracing::info!(version = %info.version, "host ready");
        self.gate.mark_ready(info);
        Ok(self.gate.ensure_ready()?)
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Run one action in its own session.
    ///
    /// Fails with [`NotReadyError`](crate::NotReadyError) before
    /// [`initialize`](Self::initialize). Session failures follow the
    /// configured [`ErrorPolicy`]: `Ok(false)` when swallowed.
    pub async fn run(&mut self, action: Action) -> Result<bool> {
        self.gate.ensure_ready()?;
        let options = SessionOptions::labeled(action.name()).with_policy(self.policy);
        let outcome = open_session(&mut self.host, &options, |ctx| {
            Box::pin(async move {
                match action {
                    Action::CreateTable => actions::create_table(ctx).await,
                    Action::FilterTable => actions::filter_table(ctx).await,
                    Action::SortTable => actions::sort_table(ctx).await,
                    Action::CreateChart => actions::create_chart(ctx).await,
                    Action::FreezeHeader => actions::freeze_header(ctx).await,
                    Action::ToggleProtection => actions::toggle_protection(ctx).await.map(|_| ()),
                }
            })
        })
        .await?;
        Ok(outcome.is_some())
    }

    /// A task pane button press: run `action` and log anything that goes
    /// wrong, including not being ready yet.
    pub async fn click(&mut self, action: Action) -> bool {
        try_catch(self.run(action)).await.unwrap_or(false)
    }

    /// Invoke a registered command, e.g. `toggleProtection`.
    pub async fn execute_command(&mut self, name: &str) -> Result<()> {
        self.gate.ensure_ready()?;
        self.commands.invoke(name, &mut self.host).await
    }

    pub fn commands_mut(&mut self) -> &mut ActionRegistry {
        &mut self.commands
    }

    pub fn notifications(&self) -> &Notifications {
        self.commands.notifications()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}
