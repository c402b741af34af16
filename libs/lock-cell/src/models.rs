use std::fmt;

use tokio::sync::OwnedMutexGuard;

use shared_models::clinic::SlotKey;

/// What a lock protects. Each scope maps to one lock key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// Intake check-and-insert for one patient.
    Intake(String),
    /// "At most one active reservation" check for one patient.
    Reservation(String),
    /// "At most one open reorder" check for one patient.
    Reorder(String),
    /// Capacity check-and-insert for one slot.
    Slot(SlotKey),
}

impl LockScope {
    pub fn key(&self) -> String {
        match self {
            LockScope::Intake(patient_id) => format!("lock:intake:{}", patient_id),
            LockScope::Reservation(patient_id) => format!("lock:reservation:{}", patient_id),
            LockScope::Reorder(patient_id) => format!("lock:reorder:{}", patient_id),
            LockScope::Slot(slot) => format!("lock:slot:{}", slot),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let empty = match self {
            LockScope::Intake(id) | LockScope::Reservation(id) | LockScope::Reorder(id) => id.trim().is_empty(),
            LockScope::Slot(slot) => slot.doctor_id.trim().is_empty(),
        };
        if empty {
            return Err(format!("empty identifier for {:?}", self));
        }
        Ok(())
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Proof of ownership handed back by a backend and returned on release.
pub struct HeldLock {
    pub key: String,
    pub token: String,
    local_guard: Option<OwnedMutexGuard<()>>,
}

impl HeldLock {
    pub fn remote(key: String, token: String) -> Self {
        Self {
            key,
            token,
            local_guard: None,
        }
    }

    pub fn local(key: String, token: String, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            key,
            token,
            local_guard: Some(guard),
        }
    }

    pub(crate) fn take_local_guard(&mut self) -> Option<OwnedMutexGuard<()>> {
        self.local_guard.take()
    }
}

impl fmt::Debug for HeldLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldLock")
            .field("key", &self.key)
            .field("local", &self.local_guard.is_some())
            .finish()
    }
}
