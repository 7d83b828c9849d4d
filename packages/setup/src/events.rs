//! Publish-once events shared between the steps of a setup run.
//!
//! Each [`EventName`] owns one cell that starts empty and is filled exactly
//! once. Waiters that arrive after the value was published get it
//! immediately, so a step can never miss an event because the other step
//! happened to be faster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geojson::FeatureCollection;
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::watch;

use crate::SetupError;

/// Events exchanged during a setup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
pub enum EventName {
    /// The project's admin boundaries are available.
    #[strum(serialize = "admin-bounds:data")]
    AdminBoundsData,
    /// The road network was stored; carries whether it is editable.
    #[strum(serialize = "road-network:active-editing")]
    RoadNetworkActiveEditing,
}

/// An event together with its payload.
#[derive(Debug, Clone)]
pub enum SetupEvent {
    /// Admin boundary feature collection of the project.
    AdminBoundsData(Arc<FeatureCollection>),
    /// Whether the scenario's road network may be edited interactively.
    RoadNetworkActiveEditing(bool),
}

impl SetupEvent {
    /// Name this event is published under.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::AdminBoundsData(_) => EventName::AdminBoundsData,
            Self::RoadNetworkActiveEditing(_) => EventName::RoadNetworkActiveEditing,
        }
    }
}

type Cell = watch::Sender<Option<SetupEvent>>;

/// Request-scoped table of publish-once event cells.
///
/// Create one per run and share it (by reference or `Arc`) with every step
/// of that run.
#[derive(Debug, Default)]
pub struct EventCoordinator {
    cells: Mutex<HashMap<EventName, Cell>>,
}

impl EventCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cells(&self) -> MutexGuard<'_, HashMap<EventName, Cell>> {
        // The map is only touched in short non-panicking sections.
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `event`, waking every current and future waiter.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::EventAlreadyEmitted`] if an event with the
    /// same name was already published in this run.
    pub fn emit(&self, event: SetupEvent) -> Result<(), SetupError> {
        let name = event.name();
        let mut cells = self.cells();
        let cell = cells
            .entry(name)
            .or_insert_with(|| watch::channel(None).0);

        let mut already_emitted = false;
        cell.send_if_modified(|slot| {
            if slot.is_some() {
                already_emitted = true;
                false
            } else {
                *slot = Some(event);
                true
            }
        });

        if already_emitted {
            return Err(SetupError::EventAlreadyEmitted { name });
        }

        log::debug!("Emitted {name}");
        Ok(())
    }

    /// Waits until `name` has been published and returns its payload.
    ///
    /// There is no timeout; the caller bounds the wait.
    pub async fn wait_for(&self, name: EventName) -> SetupEvent {
        let mut rx = {
            let mut cells = self.cells();
            cells
                .entry(name)
                .or_insert_with(|| watch::channel(None).0)
                .subscribe()
        };

        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(event) = current {
                return event;
            }
            // The sender lives in `self`, which outlives this borrow.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Returns the payload of `name` if it was already published.
    #[must_use]
    pub fn get(&self, name: EventName) -> Option<SetupEvent> {
        self.cells()
            .get(&name)
            .and_then(|cell| cell.borrow().clone())
    }

    /// Waits for the project's admin boundaries.
    pub async fn wait_for_admin_bounds(&self) -> Arc<FeatureCollection> {
        match self.wait_for(EventName::AdminBoundsData).await {
            SetupEvent::AdminBoundsData(fc) => fc,
            SetupEvent::RoadNetworkActiveEditing(_) => {
                unreachable!("cells are keyed by the payload's own name")
            }
        }
    }

    /// Returns the published active-editing flag, if any.
    #[must_use]
    pub fn active_editing(&self) -> Option<bool> {
        match self.get(EventName::RoadNetworkActiveEditing) {
            Some(SetupEvent::RoadNetworkActiveEditing(allow)) => Some(allow),
            _ => None,
        }
    }
}
