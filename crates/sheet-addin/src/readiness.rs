//! The one-way readiness gate between handshake and first action.

use std::sync::OnceLock;

use batch_proxy::HostInfo;

use crate::error::NotReadyError;

/// Uninitialized until the host handshake succeeds, then ready for the rest
/// of the process. There is no way back.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    info: OnceLock<HostInfo>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Later calls keep the first host info and return false.
    pub fn mark_ready(&self, info: HostInfo) -> bool {
        self.info.set(info).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.info.get().is_some()
    }

    /// The handshake result, or [`NotReadyError`] before it.
    pub fn ensure_ready(&self) -> Result<&HostInfo, NotReadyError> {
        self.info.get().ok_or(NotReadyError)
    }
}

#[cfg(test)]
mod tests {
    use batch_proxy::HostType;

    use super::*;

    fn excel() -> HostInfo {
        HostInfo {
            host: HostType::Excel,
            version: "16.0".into(),
        }
    }

    #[test]
    fn test_gate_opens_once() {
        let gate = ReadinessGate::new();
        assert_eq!(gate.ensure_ready(), Err(NotReadyError));
        assert!(gate.mark_ready(excel()));
        assert!(!gate.mark_ready(HostInfo {
            host: HostType::Word,
            version: "x".into(),
        }));
        assert_eq!(gate.ensure_ready().map(|i| i.host), Ok(HostType::Excel));
    }
}
