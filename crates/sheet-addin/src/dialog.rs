//! A dialog that reports back to the page that opened it.

use tokio::sync::mpsc;

use crate::error::{AddInError, Result};

/// What the opener observes from its dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    /// The dialog sent a message.
    Message(String),
    /// The dialog is gone; no more messages will arrive.
    Closed,
}

/// Open a dialog. The child half goes to the dialog, the parent half stays
/// with the opener.
pub fn open_dialog() -> (DialogParent, DialogChild) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DialogParent { rx }, DialogChild { tx })
}

/// The opener's end.
#[derive(Debug)]
pub struct DialogParent {
    rx: mpsc::UnboundedReceiver<String>,
}

impl DialogParent {
    /// The next event from the dialog.
    pub async fn next_event(&mut self) -> DialogEvent {
        match self.rx.recv().await {
            Some(message) => DialogEvent::Message(message),
            None => DialogEvent::Closed,
        }
    }

    /// Wait for the first message, failing if the dialog closes first.
    pub async fn first_message(&mut self) -> Result<String> {
        match self.next_event().await {
            DialogEvent::Message(message) => Ok(message),
            DialogEvent::Closed => Err(AddInError::DialogClosed),
        }
    }
}

/// The dialog's end. Dropping it closes the dialog.
#[derive(Debug)]
pub struct DialogChild {
    tx: mpsc::UnboundedSender<String>,
}

impl DialogChild {
    /// Pass `message` to the opener.
    pub fn message_parent(&self, message: impl Into<String>) -> Result<()> {
        self.tx
            .send(message.into())
            .map_err(|_| AddInError::DialogClosed)
    }

    /// The OK button: send the entered name and close.
    pub fn submit_name(self, name: &str) -> Result<()> {
        tracing::debug!(name, "dialog submitting name");
        self.message_parent(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_message_then_closed() {
        let (mut parent, child) = open_dialog();
        tokio::spawn(async move { child.submit_name("Ada Lovelace") });

        assert_eq!(parent.next_event().await, DialogEvent::Message("Ada Lovelace".into()));
        assert_eq!(parent.next_event().await, DialogEvent::Closed);
    }

    #[tokio::test]
    async fn test_closed_without_message() {
        let (mut parent, child) = open_dialog();
        drop(child);
        assert!(matches!(parent.first_message().await, Err(AddInError::DialogClosed)));
    }

    #[test]
    fn test_parent_gone() {
        let (parent, child) = open_dialog();
        drop(parent);
        assert!(child.message_parent("hello").is_err());
    }
}
