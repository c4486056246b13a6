//! Capture state with thread-safe transitions.
//!
//! A recognizer-backed adapter runs at most one capture at a time:
//! - Idle -> Listening (capture started)
//! - Listening -> Idle (transcript, error, timeout, or stop)
//!
//! A stopped capture counts as Idle immediately, even while its recognizer
//! task is still winding down, so a new capture may start right away.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::capture::CaptureHandle;
use crate::error::VoiceError;

/// Operational state of a voice capture adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No capture in progress. Ready to start.
    Idle,
    /// Listening for a single utterance.
    Listening,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Listening => write!(f, "Listening"),
        }
    }
}

impl CaptureState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        matches!(
            (self, target),
            (CaptureState::Idle, CaptureState::Listening)
                | (CaptureState::Listening, CaptureState::Idle)
        )
    }
}

/// The single capture slot of an adapter. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct CaptureSlot {
    active: Arc<Mutex<Option<CaptureHandle>>>,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded value stays consistent across a panic, so recover it.
    fn lock(&self) -> MutexGuard<'_, Option<CaptureHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_of(active: &Option<CaptureHandle>) -> CaptureState {
        match active {
            Some(handle) if !handle.is_stopped() => CaptureState::Listening,
            _ => CaptureState::Idle,
        }
    }

    pub fn current(&self) -> CaptureState {
        Self::state_of(&self.lock())
    }

    /// Occupy the slot with `handle`.
    ///
    /// Fails with `AlreadyListening` while another live capture holds it.
    pub fn claim(&self, handle: &CaptureHandle) -> Result<(), VoiceError> {
        let mut active = self.lock();
        let state = Self::state_of(&active);
        if !state.can_transition_to(&CaptureState::Listening) {
            return Err(VoiceError::AlreadyListening);
        }
        tracing::debug!(capture_id = %handle.id(), "Capture state: {} -> {}", state, CaptureState::Listening);
        *active = Some(handle.clone());
        Ok(())
    }

    /// Free the slot if it is still held by capture `id`.
    pub fn release(&self, id: Uuid) {
        let mut active = self.lock();
        if active.as_ref().map(CaptureHandle::id) == Some(id) {
            tracing::debug!(capture_id = %id, "Capture state: {} -> {}", Self::state_of(&active), CaptureState::Idle);
            *active = None;
        }
    }
}
