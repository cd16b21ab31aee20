use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(AppointmentId);

/// One scheduled entry. `date` and `time` are kept as the tokens the client
/// sent; only the LIST filter interprets `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub date: String,
    pub time: String,
    pub duration: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Appointment {
    pub fn calendar_date(&self) -> Option<CalendarDate> {
        CalendarDate::parse(&self.date)
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Date(value) => self.date = value,
            FieldUpdate::Time(value) => self.time = value,
            FieldUpdate::Duration(value) => self.duration = value,
            FieldUpdate::Title(value) => self.title = value,
            FieldUpdate::Description(value) => self.description = value,
        }
    }
}

/// Fields of an appointment before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub date: String,
    pub time: String,
    pub duration: u32,
    pub title: String,
    pub description: String,
}

impl NewAppointment {
    pub fn with_id(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            date: self.date,
            time: self.time,
            duration: self.duration,
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentField {
    Date,
    Time,
    Duration,
    Title,
    Description,
}

impl AppointmentField {
    pub const ALL: [AppointmentField; 5] = [
        AppointmentField::Date,
        AppointmentField::Time,
        AppointmentField::Duration,
        AppointmentField::Title,
        AppointmentField::Description,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentField::Date => "date",
            AppointmentField::Time => "time",
            AppointmentField::Duration => "duration",
            AppointmentField::Title => "title",
            AppointmentField::Description => "description",
        }
    }
}

impl fmt::Display for AppointmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl FromStr for AppointmentField {
    type Err = UnknownField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| UnknownField(raw.to_string()))
    }
}

/// A validated replacement value for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Date(String),
    Time(String),
    Duration(u32),
    Title(String),
    Description(String),
}

impl FieldUpdate {
    pub fn field(&self) -> AppointmentField {
        match self {
            FieldUpdate::Date(_) => AppointmentField::Date,
            FieldUpdate::Time(_) => AppointmentField::Time,
            FieldUpdate::Duration(_) => AppointmentField::Duration,
            FieldUpdate::Title(_) => AppointmentField::Title,
            FieldUpdate::Description(_) => AppointmentField::Description,
        }
    }
}

/// Structural (year, month, day) form of a date token, so `2025-09-26`,
/// `2025/9/26` and `26/09/2025` all compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.trim().split(['-', '/', '.']).collect();
        let [first, second, third] = parts.as_slice() else {
            return None;
        };
        if !parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
            return None;
        }

        let (year, month, day) = if first.len() == 4 {
            (*first, *second, *third)
        } else if third.len() == 4 {
            (*third, *second, *first)
        } else {
            return None;
        };

        let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
        Some(Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
