use std::{
    io::Write,
    net::SocketAddr,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use client_core::{ClientError, SchedulerClient};
use shared::{
    command::Verb,
    domain::Appointment,
    protocol::{Payload, Response, Status, DEFAULT_SERVER_ADDR},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Interactive client for the appointment scheduler")]
struct Args {
    #[arg(long, default_value_t = DEFAULT_SERVER_ADDR)]
    server: SocketAddr,
    /// How long to wait for each reply before giving up on it.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut client = SchedulerClient::bind(args.server)
        .await?
        .with_reply_timeout(Duration::from_millis(args.timeout_ms));
    debug!(local = ?client.local_addr(), "client socket bound");
    println!(
        "Scheduler client ready; sending to {} (reply timeout {} ms).",
        client.server_addr(),
        client.reply_timeout().as_millis()
    );
    println!("Type HELP for the command formats, EXIT to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let first = input.split_whitespace().next().unwrap_or_default();
        if first.eq_ignore_ascii_case("EXIT") || first.eq_ignore_ascii_case("QUIT") {
            break;
        }
        if first.eq_ignore_ascii_case("HELP") {
            for verb in Verb::ALL {
                println!("  {}", verb.usage());
            }
            continue;
        }

        match client.send_command(input).await {
            Ok(response) => print!("{}", render(&response)),
            Err(error @ (ClientError::Receive(_) | ClientError::Bind(_))) => {
                return Err(error.into());
            }
            Err(ClientError::MalformedReply { raw }) => println!("{raw}"),
            Err(error) => {
                debug!(?error, "exchange failed");
                eprintln!("error: {error}");
            }
        }
    }

    println!("Session terminated.");
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "\n> ")?;
    stdout.flush()
}

fn render(response: &Response) -> String {
    let mut out = String::new();
    let label = match response.status {
        Status::Success => "SUCCESS",
        Status::Error => "ERROR",
    };
    out.push_str(&format!("{label}: {}\n", response.message));

    match &response.data {
        Payload::Empty => {}
        Payload::One(appointment) => out.push_str(&row(appointment)),
        Payload::Many(appointments) => {
            for appointment in appointments {
                out.push_str(&row(appointment));
            }
        }
    }
    out
}

fn row(appointment: &Appointment) -> String {
    let mut line = format!(
        "{:>4}  {:<10}  {:<5}  {:>4} min  {}",
        appointment.id, appointment.date, appointment.time, appointment.duration, appointment.title
    );
    if !appointment.description.is_empty() {
        line.push_str(&format!(" ({})", appointment.description));
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use shared::domain::AppointmentId;

    use super::*;

    #[test]
    fn renders_each_record_on_its_own_row() {
        let appointment = Appointment {
            id: AppointmentId(7),
            date: "2025-09-26".into(),
            time: "10:00".into(),
            duration: 60,
            title: "Meeting".into(),
            description: "Room 4".into(),
        };
        let response = Response::success(
            Payload::Many(vec![appointment.clone(), appointment]),
            "2 appointment(s) found.",
        );

        let text = render(&response);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SUCCESS: 2 appointment(s) found.");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "   7  2025-09-26  10:00    60 min  Meeting (Room 4)");
    }

    #[test]
    fn errors_render_message_only() {
        let text = render(&Response::error("Appointment with ID 9 not found."));
        assert_eq!(text, "ERROR: Appointment with ID 9 not found.\n");
    }
}
