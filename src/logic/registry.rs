use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BindResult, BindingError};
use crate::model::BindingSlot;

/// Identity of a handler, as used to key binding metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId(Arc<str>);

impl HandlerId {
    pub fn new(id: &str) -> Self {
        HandlerId(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        HandlerId::new(id)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binding metadata for every handler, keyed by handler identity.
///
/// Filled in while routes and handlers are declared, then sealed before the
/// first request is served. Slots are correlated with route parameters purely
/// by position; the registry never sees argument names.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    entries: RwLock<HashMap<HandlerId, Arc<[BindingSlot]>>>,
    sealed: AtomicBool,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the slots of a handler.
    ///
    /// Registering the same slots twice is a no-op; registering different
    /// slots for a handler that is already known is an error.
    pub fn register(
        &self,
        handler: impl Into<HandlerId>,
        slots: impl IntoIterator<Item = BindingSlot>,
    ) -> BindResult<()> {
        let handler = handler.into();
        if self.is_sealed() {
            return Err(BindingError::RegistrySealed {
                handler: handler.to_string(),
            });
        }

        let mut slots: Vec<BindingSlot> = slots.into_iter().collect();
        slots.sort_by_key(|slot| slot.position);
        if slots
            .iter()
            .enumerate()
            .any(|(index, slot)| slot.position != index)
        {
            return Err(BindingError::InvalidSlotPositions {
                handler: handler.to_string(),
                count: slots.len(),
            });
        }

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&handler) {
            if existing.as_ref() == slots.as_slice() {
                return Ok(());
            }
            return Err(BindingError::ConflictingRegistration {
                handler: handler.to_string(),
            });
        }

        log::info!(
            "Registered binding metadata for {} ({} slot(s): {:?})",
            handler,
            slots.len(),
            slots.iter().map(|slot| &slot.kind).collect::<Vec<_>>()
        );
        entries.insert(handler, slots.into());
        Ok(())
    }

    pub fn lookup(&self, handler: &HandlerId) -> Option<Arc<[BindingSlot]>> {
        self.entries.read().get(handler).cloned()
    }

    /// Refuse further registrations
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
