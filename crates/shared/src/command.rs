//! Line grammar shared by the client (local validation before sending) and
//! the server (authoritative parse of every datagram).
//!
//! ```text
//! ADD <date> <time> <duration> "<title>" ["<description>"]
//! LIST [<date> | ALL]
//! UPDATE <id> <field> "<new_value>"
//! DELETE <id>
//! ```
//!
//! The verb is case-insensitive. Bare tokens are runs of non-whitespace,
//! quoted tokens run to the next `"` and must be followed by whitespace or
//! the end of the line.

use std::{fmt, str::FromStr};

use crate::{
    domain::{Appointment, AppointmentId, CalendarDate, NewAppointment},
    error::CommandError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Add,
    List,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Add, Verb::List, Verb::Update, Verb::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Add => "ADD",
            Verb::List => "LIST",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Verb::Add => r#"ADD <date> <time> <duration> "<title>" "[description]""#,
            Verb::List => "LIST, LIST <date>, or LIST ALL",
            Verb::Update => r#"UPDATE <id> <field> "<new_value>""#,
            Verb::Delete => "DELETE <id>",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which appointments a LIST selects. A filter token that is not a valid
/// date is kept rather than rejected; it simply matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    All,
    On(CalendarDate),
    Malformed(String),
}

impl ListFilter {
    fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("ALL") {
            return ListFilter::All;
        }
        match CalendarDate::parse(token) {
            Some(date) => ListFilter::On(date),
            None => ListFilter::Malformed(token.to_string()),
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::On(date) => appointment.calendar_date() == Some(*date),
            ListFilter::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(NewAppointment),
    List(ListFilter),
    /// `field` is checked by the executor so that an unknown field name is
    /// reported as a validation error rather than a format error.
    Update {
        id: AppointmentId,
        field: String,
        value: String,
    },
    Delete {
        id: AppointmentId,
    },
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Add(_) => Verb::Add,
            Command::List(_) => Verb::List,
            Command::Update { .. } => Verb::Update,
            Command::Delete { .. } => Verb::Delete,
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_command(line)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Add(new) => {
                write!(
                    f,
                    "ADD {} {} {} \"{}\"",
                    new.date, new.time, new.duration, new.title
                )?;
                if !new.description.is_empty() {
                    write!(f, " \"{}\"", new.description)?;
                }
                Ok(())
            }
            Command::List(ListFilter::All) => f.write_str("LIST ALL"),
            Command::List(ListFilter::On(date)) => write!(f, "LIST {date}"),
            Command::List(ListFilter::Malformed(token)) => write!(f, "LIST {token}"),
            Command::Update { id, field, value } => {
                write!(f, "UPDATE {id} {field} \"{value}\"")
            }
            Command::Delete { id } => write!(f, "DELETE {id}"),
        }
    }
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    let (verb_token, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    let verb = Verb::parse(verb_token).ok_or_else(|| CommandError::UnknownCommand {
        verb: verb_token.to_string(),
    })?;
    let tokens = tokenize(rest).ok_or(CommandError::invalid_format(verb))?;

    match verb {
        Verb::Add => parse_add(&tokens),
        Verb::List => parse_list(&tokens),
        Verb::Update => parse_update(&tokens),
        Verb::Delete => parse_delete(&tokens),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
}

/// Returns `None` for an unterminated quote or a quote glued to the next token.
fn tokenize(input: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"')?;
            tokens.push(Token::Quoted(&quoted[..end]));
            rest = &quoted[end + 1..];
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Word(&rest[..end]));
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }

    Some(tokens)
}

fn parse_add(tokens: &[Token<'_>]) -> Result<Command, CommandError> {
    let (date, time, duration, title, description) = match tokens {
        [Token::Word(date), Token::Word(time), Token::Word(duration), Token::Quoted(title)] => {
            (*date, *time, *duration, *title, "")
        }
        [Token::Word(date), Token::Word(time), Token::Word(duration), Token::Quoted(title), Token::Quoted(description)] => {
            (*date, *time, *duration, *title, *description)
        }
        _ => return Err(CommandError::invalid_format(Verb::Add)),
    };
    if title.is_empty() {
        return Err(CommandError::invalid_format(Verb::Add));
    }

    Ok(Command::Add(NewAppointment {
        date: date.to_string(),
        time: time.to_string(),
        duration: parse_duration(duration)?,
        title: title.to_string(),
        description: description.to_string(),
    }))
}

fn parse_list(tokens: &[Token<'_>]) -> Result<Command, CommandError> {
    match tokens {
        [] => Ok(Command::List(ListFilter::All)),
        [Token::Word(filter)] => Ok(Command::List(ListFilter::from_token(filter))),
        _ => Err(CommandError::invalid_format(Verb::List)),
    }
}

fn parse_update(tokens: &[Token<'_>]) -> Result<Command, CommandError> {
    let [Token::Word(id), Token::Word(field), Token::Quoted(value)] = tokens else {
        return Err(CommandError::invalid_format(Verb::Update));
    };
    let id = parse_id(id).ok_or(CommandError::invalid_format(Verb::Update))?;

    Ok(Command::Update {
        id,
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn parse_delete(tokens: &[Token<'_>]) -> Result<Command, CommandError> {
    let [Token::Word(id)] = tokens else {
        return Err(CommandError::invalid_format(Verb::Delete));
    };
    let id = parse_id(id).ok_or(CommandError::invalid_format(Verb::Delete))?;
    Ok(Command::Delete { id })
}

fn parse_id(token: &str) -> Option<AppointmentId> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().map(AppointmentId)
}

/// Durations are whole, non-negative minutes. Anything else is rejected
/// instead of being stored as a placeholder value.
pub fn parse_duration(token: &str) -> Result<u32, CommandError> {
    let invalid = || CommandError::InvalidDuration {
        value: token.to_string(),
    };
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse().map_err(|_| invalid())
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
