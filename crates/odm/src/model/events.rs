//! Model lifecycle events.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Model;

/// Lifecycle events fired on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    /// The definition is about to be booted.
    Booting,
    /// The definition finished booting.
    Booted,
    /// A model was hydrated from a search hit.
    Retrieved,
    /// A model is about to be saved. Can halt.
    Saving,
    /// A new model is about to be inserted. Can halt.
    Creating,
    /// A new model was inserted.
    Created,
    /// An existing model is about to be updated. Can halt.
    Updating,
    /// An existing model was updated.
    Updated,
    /// A model was saved.
    Saved,
    /// A model is about to be deleted. Can halt.
    Deleting,
    /// A model was deleted.
    Deleted,
    /// A model was replicated; fired on the copy.
    Replicating,
}

impl ModelEvent {
    /// Returns true if a listener can abort the operation this event precedes.
    pub fn is_halting(&self) -> bool {
        matches!(
            self,
            ModelEvent::Saving | ModelEvent::Creating | ModelEvent::Updating | ModelEvent::Deleting
        )
    }

    /// Returns the event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelEvent::Booting => "booting",
            ModelEvent::Booted => "booted",
            ModelEvent::Retrieved => "retrieved",
            ModelEvent::Saving => "saving",
            ModelEvent::Creating => "creating",
            ModelEvent::Created => "created",
            ModelEvent::Updating => "updating",
            ModelEvent::Updated => "updated",
            ModelEvent::Saved => "saved",
            ModelEvent::Deleting => "deleting",
            ModelEvent::Deleted => "deleted",
            ModelEvent::Replicating => "replicating",
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOutcome {
    /// Carry on.
    #[default]
    Continue,
    /// Abort the operation. Only honoured for halting events.
    Halt,
}

/// A lifecycle listener.
pub type Listener = Arc<dyn Fn(&mut Model) -> EventOutcome + Send + Sync>;

/// Listeners of one model definition.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<ModelEvent, Vec<Listener>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher without listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn listen<F>(&self, event: ModelEvent, listener: F)
    where
        F: Fn(&mut Model) -> EventOutcome + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Returns true if `event` has listeners.
    pub fn has_listeners(&self, event: ModelEvent) -> bool {
        self.listeners
            .read()
            .get(&event)
            .is_some_and(|listeners| !listeners.is_empty())
    }

    /// Removes every listener of `event`.
    pub fn forget(&self, event: ModelEvent) {
        self.listeners.write().remove(&event);
    }

    /// Fires `event` in registration order.
    ///
    /// For halting events the first [`EventOutcome::Halt`] stops dispatch and
    /// is returned; other events always run every listener.
    pub fn dispatch(&self, event: ModelEvent, model: &mut Model) -> EventOutcome {
        let listeners = match self.listeners.read().get(&event) {
            Some(listeners) => listeners.clone(),
            None => return EventOutcome::Continue,
        };

        for listener in listeners {
            if listener(model) == EventOutcome::Halt && event.is_halting() {
                return EventOutcome::Halt;
            }
        }
        EventOutcome::Continue
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut map = f.debug_map();
        for (event, registered) in listeners.iter() {
            map.entry(&event.as_str(), &registered.len());
        }
        map.finish()
    }
}
