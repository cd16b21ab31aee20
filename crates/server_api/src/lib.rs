use shared::{
    command::{parse_command, Command, ListFilter},
    domain::{AppointmentField, AppointmentId, FieldUpdate, NewAppointment},
    protocol::{Payload, Response},
};
use storage::{AppointmentStore, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("Appointment with ID {0} not found.")]
    NotFound(AppointmentId),
    #[error("No appointment IDs left.")]
    IdsExhausted,
    #[error("Invalid field '{0}'. Updatable fields: date, time, duration, title, description.")]
    InvalidField(String),
    #[error("Invalid value for {field}: {reason}.")]
    InvalidValue {
        field: AppointmentField,
        reason: &'static str,
    },
}

impl From<StoreError> for ExecError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => ExecError::NotFound(id),
            StoreError::IdsExhausted => ExecError::IdsExhausted,
        }
    }
}

impl From<ExecError> for Response {
    fn from(value: ExecError) -> Self {
        Response::error(value.to_string())
    }
}

/// Parses and executes one request line. Grammar failures become ERROR
/// replies here, so `execute` only ever sees well-formed commands.
pub async fn handle_line(store: &mut AppointmentStore, line: &str) -> Response {
    match parse_command(line) {
        Ok(command) => execute(store, command).await,
        Err(error) => {
            debug!(%error, "rejected command line");
            Response::error(error.to_string())
        }
    }
}

pub async fn execute(store: &mut AppointmentStore, command: Command) -> Response {
    debug!(verb = %command.verb(), "executing command");
    let result = match command {
        Command::Add(new) => add_appointment(store, new).await,
        Command::List(filter) => Ok(list_appointments(store, &filter)),
        Command::Update { id, field, value } => update_appointment(store, id, &field, value).await,
        Command::Delete { id } => delete_appointment(store, id).await,
    };
    result.unwrap_or_else(Response::from)
}

pub async fn add_appointment(
    store: &mut AppointmentStore,
    new: NewAppointment,
) -> Result<Response, ExecError> {
    let appointment = store.add(new).await?;
    Ok(Response::success(
        Payload::One(appointment),
        "Appointment added successfully.",
    ))
}

pub fn list_appointments(store: &AppointmentStore, filter: &ListFilter) -> Response {
    let results = store.list(filter);
    if results.is_empty() {
        return Response::success(
            Payload::Many(results),
            "No appointments found for the specified criteria.",
        );
    }
    let message = format!("{} appointment(s) found.", results.len());
    Response::success(Payload::Many(results), message)
}

/// The id is looked up before the field is validated, so a missing id wins
/// over a bad field name.
pub async fn update_appointment(
    store: &mut AppointmentStore,
    id: AppointmentId,
    field: &str,
    value: String,
) -> Result<Response, ExecError> {
    if !store.contains(id) {
        return Err(ExecError::NotFound(id));
    }
    let field: AppointmentField = field
        .parse()
        .map_err(|_| ExecError::InvalidField(field.to_string()))?;
    let update = field_update(field, value)?;

    let appointment = store.update(id, update).await?;
    Ok(Response::success(
        Payload::One(appointment),
        format!("Appointment {id} updated successfully."),
    ))
}

pub async fn delete_appointment(
    store: &mut AppointmentStore,
    id: AppointmentId,
) -> Result<Response, ExecError> {
    let removed = store.delete(id).await?;
    Ok(Response::success(
        Payload::One(removed),
        format!("Appointment {id} deleted successfully."),
    ))
}

/// Applies the same rules the ADD grammar enforces on each field.
pub fn field_update(field: AppointmentField, value: String) -> Result<FieldUpdate, ExecError> {
    let invalid = |reason| ExecError::InvalidValue { field, reason };
    match field {
        AppointmentField::Duration => shared::command::parse_duration(&value)
            .map(FieldUpdate::Duration)
            .map_err(|_| invalid("expected a whole number of minutes")),
        AppointmentField::Date | AppointmentField::Time
            if value.is_empty() || value.contains(char::is_whitespace) =>
        {
            Err(invalid("expected a single token without spaces"))
        }
        AppointmentField::Date => Ok(FieldUpdate::Date(value)),
        AppointmentField::Time => Ok(FieldUpdate::Time(value)),
        AppointmentField::Title if value.is_empty() => Err(invalid("title cannot be empty")),
        AppointmentField::Title => Ok(FieldUpdate::Title(value)),
        AppointmentField::Description => Ok(FieldUpdate::Description(value)),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
