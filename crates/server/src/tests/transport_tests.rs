use std::{sync::Arc, time::Duration};

use client_core::SchedulerClient;
use shared::{
    domain::{Appointment, AppointmentId},
    protocol::{Payload, Status},
};
use storage::{MemoryStore, Snapshot};
use tokio::{net::UdpSocket, task::JoinHandle};

use super::*;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

async fn start(
    durable: Arc<MemoryStore>,
    crash_after: Option<u64>,
) -> (SocketAddr, JoinHandle<Result<()>>) {
    let store = AppointmentStore::open(durable).await;
    let server = UdpServer::bind("127.0.0.1:0".parse().expect("addr"), store)
        .await
        .expect("bind")
        .with_crash_after(crash_after);
    let addr = server.local_addr().expect("local addr");
    (addr, tokio::spawn(server.serve()))
}

async fn client(addr: SocketAddr) -> SchedulerClient {
    SchedulerClient::bind(addr)
        .await
        .expect("client")
        .with_reply_timeout(REPLY_TIMEOUT)
}

#[tokio::test]
async fn add_round_trip_assigns_first_id() {
    let durable = Arc::new(MemoryStore::new());
    let (addr, _server) = start(durable.clone(), None).await;
    let mut client = client(addr).await;

    let response = client
        .send_command(r#"ADD 2025-09-26 10:00 60 "Meeting""#)
        .await
        .expect("reply");

    assert_eq!(response.status, Status::Success);
    let Payload::One(appointment) = response.data else {
        panic!("expected a single appointment");
    };
    assert_eq!(appointment.id, AppointmentId(1));
    assert_eq!(appointment.duration, 60);
    assert_eq!(appointment.description, "");
    assert_eq!(durable.snapshot().appointments, vec![appointment]);
}

#[tokio::test]
async fn update_against_empty_store_names_the_id() {
    let (addr, _server) = start(Arc::new(MemoryStore::new()), None).await;
    let mut client = client(addr).await;

    let response = client
        .send_command(r#"UPDATE 999 title "X""#)
        .await
        .expect("reply");
    assert_eq!(response.status, Status::Error);
    assert!(response.message.contains("999"), "{}", response.message);
}

#[tokio::test]
async fn remote_grammar_rejects_unchecked_lines() {
    let durable = Arc::new(MemoryStore::new());
    let (addr, _server) = start(durable.clone(), None).await;
    let mut client = client(addr).await;

    let response = client.send_unchecked("DELETE abc").await.expect("reply");
    assert_eq!(response.status, Status::Error);
    assert_eq!(response.message, "Invalid DELETE command format. Use: DELETE <id>");

    let response = client.send_unchecked("PURGE").await.expect("reply");
    assert_eq!(response.message, "Unknown command: PURGE");
    assert_eq!(durable.save_count(), 0);
}

#[tokio::test]
async fn blank_datagrams_get_no_reply() {
    let (addr, _server) = start(Arc::new(MemoryStore::new()), None).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    let mut buf = vec![0u8; 4096];

    socket.send_to(b"  \r\n", addr).await.expect("blank");
    socket.send_to(b"LIST", addr).await.expect("list");

    let (len, from) = tokio::time::timeout(REPLY_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("reply in time")
        .expect("recv");
    assert_eq!(from, addr);
    let response = Response::decode(&buf[..len]).expect("decode");
    assert_eq!(response.message, "No appointments found for the specified criteria.");

    let extra = tokio::time::timeout(Duration::from_millis(150), socket.recv_from(&mut buf)).await;
    assert!(extra.is_err(), "blank datagram must not be answered");
}

#[tokio::test]
async fn replies_go_back_to_each_sender() {
    let (addr, _server) = start(Arc::new(MemoryStore::new()), None).await;
    let mut alice = client(addr).await;
    let mut bob = client(addr).await;

    let first = alice
        .send_command(r#"ADD 2025-09-26 09:00 30 "Alice""#)
        .await
        .expect("alice");
    let second = bob
        .send_command(r#"ADD 2025-09-26 11:00 30 "Bob""#)
        .await
        .expect("bob");

    let title = |response: Response| match response.data {
        Payload::One(appointment) => appointment.title,
        other => panic!("unexpected payload {other:?}"),
    };
    assert_eq!(title(first), "Alice");
    assert_eq!(title(second), "Bob");

    let listed = alice.send_command("LIST 2025-09-26").await.expect("list");
    assert_eq!(listed.message, "2 appointment(s) found.");
}

#[tokio::test]
async fn crash_after_stops_answering() {
    let (addr, server) = start(Arc::new(MemoryStore::new()), Some(2)).await;
    let mut client = SchedulerClient::bind(addr)
        .await
        .expect("client")
        .with_reply_timeout(Duration::from_millis(300));

    client.send_command("LIST").await.expect("first is answered");
    let err = client.send_command("LIST").await.expect_err("second is dropped");
    assert!(err.is_timeout());

    let finished = tokio::time::timeout(REPLY_TIMEOUT, server)
        .await
        .expect("server task ends")
        .expect("join");
    assert!(finished.is_ok());
}

#[tokio::test]
async fn oversized_list_is_replaced_by_an_error() {
    let appointments: Vec<Appointment> = (1..=200)
        .map(|id| Appointment {
            id: AppointmentId(id),
            date: "2025-09-26".into(),
            time: "10:00".into(),
            duration: 30,
            title: "x".repeat(400),
            description: String::new(),
        })
        .collect();
    let durable = Arc::new(MemoryStore::with_snapshot(
        Snapshot::try_from(appointments).expect("ids in range"),
    ));
    let (addr, _server) = start(durable, None).await;
    let mut client = client(addr).await;

    let response = client.send_command("LIST").await.expect("reply");
    assert_eq!(response.status, Status::Error);
    assert!(response.message.starts_with("Reply too large"));
}

#[tokio::test]
async fn dispatch_counts_only_non_blank_commands() {
    let store = AppointmentStore::open(Arc::new(MemoryStore::new())).await;
    let mut server = UdpServer::bind("127.0.0.1:0".parse().expect("addr"), store)
        .await
        .expect("bind")
        .with_crash_after(Some(1));
    let peer: SocketAddr = "127.0.0.1:9".parse().expect("peer");

    assert_eq!(server.dispatch(b"   ", peer).await, Dispatch::Ignore);
    assert_eq!(server.dispatch(b"LIST", peer).await, Dispatch::Crash);
}
