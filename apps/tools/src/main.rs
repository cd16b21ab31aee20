use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{ClientError, SchedulerClient};
use futures::future::join_all;
use shared::{
    domain::AppointmentId,
    protocol::{Payload, Response, DEFAULT_SERVER_ADDR},
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_SERVER_ADDR)]
    server: SocketAddr,
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs ADD, LIST, UPDATE, DELETE, LIST for each simulated user, all
    /// users at once.
    Exercise {
        #[arg(long, default_value_t = 10)]
        users: usize,
        #[arg(long, value_enum, default_value_t = Expectation::Success)]
        expect: Expectation,
        #[arg(long, default_value = "2024-12-01")]
        date: String,
        /// Pause between a user's consecutive commands.
        #[arg(long, default_value_t = 200)]
        pause_ms: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    /// Every user finishes the whole script.
    Success,
    /// Every user hits a reply timeout (server down or crashing).
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UserOutcome {
    Completed,
    TimedOut { step: &'static str },
    Failed { step: &'static str, reason: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);

    match cli.command {
        Command::Exercise {
            users,
            expect,
            date,
            pause_ms,
        } => {
            let pause = Duration::from_millis(pause_ms);
            let runs = (1..=users).map(|user| run_user(user, cli.server, timeout, &date, pause));
            let outcomes = join_all(runs).await;

            for (user, outcome) in (1..=users).zip(&outcomes) {
                match outcome {
                    UserOutcome::Completed => info!(user, "completed all steps"),
                    UserOutcome::TimedOut { step } => info!(user, step, "timed out"),
                    UserOutcome::Failed { step, reason } => warn!(user, step, %reason, "failed"),
                }
            }
            let completed = outcomes.iter().filter(|o| **o == UserOutcome::Completed).count();
            let timed_out = outcomes
                .iter()
                .filter(|o| matches!(o, UserOutcome::TimedOut { .. }))
                .count();
            info!(users, completed, timed_out, ?expect, "exercise finished");

            if !meets_expectation(expect, &outcomes) {
                bail!("expected every user to reach {expect:?}; {completed} completed, {timed_out} timed out");
            }
        }
    }

    Ok(())
}

async fn run_user(
    user: usize,
    server: SocketAddr,
    timeout: Duration,
    date: &str,
    pause: Duration,
) -> UserOutcome {
    match script(user, server, timeout, date, pause).await {
        Ok(()) => UserOutcome::Completed,
        Err(outcome) => outcome,
    }
}

async fn script(
    user: usize,
    server: SocketAddr,
    timeout: Duration,
    date: &str,
    pause: Duration,
) -> Result<(), UserOutcome> {
    let mut client = SchedulerClient::bind(server)
        .await
        .map_err(|error| failed("bind", error.to_string()))?
        .with_reply_timeout(timeout);

    let added = step(
        &mut client,
        "add",
        &format!(
            r#"ADD {date} 10:{:02} 60 "User{user} meeting" "Exercise run""#,
            user % 60
        ),
    )
    .await?;
    let id = single_id(&added).ok_or_else(|| failed("add", "reply carried no appointment"))?;
    tokio::time::sleep(pause).await;

    step(&mut client, "list", &format!("LIST {date}")).await?;
    tokio::time::sleep(pause).await;

    step(
        &mut client,
        "update",
        &format!(r#"UPDATE {id} title "User{user} meeting (moved)""#),
    )
    .await?;
    tokio::time::sleep(pause).await;

    step(&mut client, "delete", &format!("DELETE {id}")).await?;
    tokio::time::sleep(pause).await;

    step(&mut client, "list", &format!("LIST {date}")).await?;
    Ok(())
}

async fn step(
    client: &mut SchedulerClient,
    name: &'static str,
    line: &str,
) -> Result<Response, UserOutcome> {
    match client.send_command(line).await {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(failed(name, response.message)),
        Err(ClientError::TimedOut { .. }) => Err(UserOutcome::TimedOut { step: name }),
        Err(error) => Err(failed(name, error.to_string())),
    }
}

fn failed(step: &'static str, reason: impl Into<String>) -> UserOutcome {
    UserOutcome::Failed {
        step,
        reason: reason.into(),
    }
}

fn single_id(response: &Response) -> Option<AppointmentId> {
    match &response.data {
        Payload::One(appointment) => Some(appointment.id),
        _ => None,
    }
}

fn meets_expectation(expect: Expectation, outcomes: &[UserOutcome]) -> bool {
    outcomes.iter().all(|outcome| match expect {
        Expectation::Success => *outcome == UserOutcome::Completed,
        Expectation::Timeout => matches!(outcome, UserOutcome::TimedOut { .. }),
    })
}
