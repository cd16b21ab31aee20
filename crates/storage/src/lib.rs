use std::sync::Arc;

use shared::{
    command::ListFilter,
    domain::{Appointment, AppointmentId, FieldUpdate, NewAppointment},
};
use thiserror::Error;
use tracing::{error, info, warn};

mod durable;

pub use durable::{DurableStore, JsonFileStore, MemoryStore, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Appointment with ID {0} not found.")]
    NotFound(AppointmentId),
    #[error("No appointment IDs left.")]
    IdsExhausted,
}

/// The server's appointment collection. Owned by the single task that
/// processes datagrams, so every operation runs to completion before the
/// next one starts.
///
/// Mutations are written through to the durable store before they return.
/// A failed save is logged and the in-memory change is kept.
pub struct AppointmentStore {
    appointments: Vec<Appointment>,
    next_id: u64,
    durable: Arc<dyn DurableStore>,
}

impl AppointmentStore {
    /// Loads prior state. An unreadable source starts the store empty
    /// instead of failing startup.
    pub async fn open(durable: Arc<dyn DurableStore>) -> Self {
        let loaded = durable
            .load()
            .await
            .and_then(|snapshot| snapshot.normalized().map_err(anyhow::Error::from));
        let snapshot = match loaded {
            Ok(snapshot) => {
                info!(
                    count = snapshot.appointments.len(),
                    next_id = snapshot.next_id,
                    "loaded appointments"
                );
                snapshot
            }
            Err(error) => {
                warn!(%error, "could not load appointments; starting with an empty store");
                Snapshot::default()
            }
        };

        Self {
            appointments: snapshot.appointments,
            next_id: snapshot.next_id,
            durable,
        }
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn next_id(&self) -> AppointmentId {
        AppointmentId(self.next_id)
    }

    pub fn get(&self, id: AppointmentId) -> Option<&Appointment> {
        self.appointments.iter().find(|appointment| appointment.id == id)
    }

    pub fn contains(&self, id: AppointmentId) -> bool {
        self.get(id).is_some()
    }

    pub async fn add(&mut self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let following = self
            .next_id
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted)?;
        let appointment = new.with_id(AppointmentId(self.next_id));
        self.next_id = following;
        self.appointments.push(appointment.clone());
        info!(id = %appointment.id, title = %appointment.title, "appointment added");
        self.persist().await;
        Ok(appointment)
    }

    /// Insertion order is preserved.
    pub fn list(&self, filter: &ListFilter) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect()
    }

    pub async fn update(
        &mut self,
        id: AppointmentId,
        update: FieldUpdate,
    ) -> Result<Appointment, StoreError> {
        let appointment = self
            .appointments
            .iter_mut()
            .find(|appointment| appointment.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let field = update.field();
        appointment.apply(update);
        let updated = appointment.clone();
        info!(%id, %field, "appointment updated");
        self.persist().await;
        Ok(updated)
    }

    pub async fn delete(&mut self, id: AppointmentId) -> Result<Appointment, StoreError> {
        let index = self
            .appointments
            .iter()
            .position(|appointment| appointment.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = self.appointments.remove(index);
        info!(%id, "appointment deleted");
        self.persist().await;
        Ok(removed)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            appointments: self.appointments.clone(),
        }
    }

    async fn persist(&self) {
        match self.durable.save(&self.snapshot()).await {
            Ok(()) => info!(count = self.appointments.len(), "appointments saved"),
            Err(error) => error!(%error, "could not save appointments; in-memory state kept"),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
