//! End-to-end client/server behaviour over the loopback transport.

use netsession::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn server_on(transport: &Arc<LoopbackTransport>, port: u16) -> Server<LoopbackTransport> {
    Server::builder(Arc::clone(transport))
        .port(port)
        .poll_interval(Duration::from_millis(1))
        .build()
}

fn client_on(transport: &Arc<LoopbackTransport>) -> Client<LoopbackTransport> {
    Client::builder(Arc::clone(transport))
        .poll_interval(Duration::from_millis(1))
        .build()
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

#[test]
fn test_connect_and_send_scenario() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, DEFAULT_PORT);

    let joined = Arc::new(Mutex::new(Vec::<ClientInfo>::new()));
    let received = Arc::new(Mutex::new(Vec::<(ClientInfo, Vec<u8>)>::new()));
    {
        let joined = Arc::clone(&joined);
        server.set_on_client_connected(move |client| joined.lock().unwrap().push(client.clone()));
        let received = Arc::clone(&received);
        server.set_on_data_received(move |client, buffer| {
            received
                .lock()
                .unwrap()
                .push((client.clone(), buffer.to_vec()));
        });
    }
    server.start();

    let mut client = client_on(&transport);
    let (connects, connects_seen) = counter();
    client.set_on_connected(move || {
        connects.fetch_add(1, Ordering::SeqCst);
    });
    client.connect("127.0.0.1:27020");

    assert!(wait_until(|| client.status() == ConnectionStatus::Connected));
    assert!(wait_until(|| joined.lock().unwrap().len() == 1));
    assert!(wait_until(|| connects_seen.load(Ordering::SeqCst) == 1));
    let registered = joined.lock().unwrap()[0].clone();
    assert!(!registered.description.is_empty());

    assert_eq!(
        client.send(Buffer::from(&[1u8, 2, 3, 4]), SendReliability::Reliable),
        ResultCode::Ok
    );
    assert!(wait_until(|| received.lock().unwrap().len() == 1));
    let (sender, bytes) = received.lock().unwrap()[0].clone();
    assert_eq!(sender, registered);
    assert_eq!(bytes, vec![1, 2, 3, 4]);

    client.disconnect();
    server.stop();
    assert_eq!(joined.lock().unwrap().len(), 1);
    assert_eq!(connects_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_two_clients_registered() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27030);
    server.start();

    let mut first = client_on(&transport);
    let mut second = client_on(&transport);
    first.connect("127.0.0.1:27030");
    second.connect("127.0.0.1:27030");

    assert!(wait_until(|| server.client_count() == 2));
    let clients = server.connected_clients();
    assert_eq!(clients.len(), 2);
    for (handle, info) in &clients {
        assert_eq!(*handle, info.connection);
    }
}

#[test]
fn test_broadcast_excludes_sender() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27031);
    server.start();

    let mut alice = client_on(&transport);
    let mut bob = client_on(&transport);
    let (alice_hits, alice_seen) = counter();
    let (bob_hits, bob_seen) = counter();
    alice.set_on_data_received(move |_| {
        alice_hits.fetch_add(1, Ordering::SeqCst);
    });
    bob.set_on_data_received(move |buffer| {
        assert_eq!(buffer.as_slice(), b"news");
        bob_hits.fetch_add(1, Ordering::SeqCst);
    });

    alice.connect("127.0.0.1:27031");
    assert!(wait_until(|| server.client_count() == 1));
    let alice_info = server
        .connected_clients()
        .into_values()
        .next()
        .expect("alice registered");

    bob.connect("127.0.0.1:27031");
    assert!(wait_until(|| server.client_count() == 2));
    assert!(wait_until(|| bob.status() == ConnectionStatus::Connected));

    let delivered = server.broadcast(
        Buffer::from("news"),
        Some(&alice_info),
        SendReliability::Reliable,
    );

    assert_eq!(delivered, 1);
    assert!(wait_until(|| bob_seen.load(Ordering::SeqCst) == 1));
    assert_eq!(transport.messages_sent_on(alice_info.connection), 0);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(alice_seen.load(Ordering::SeqCst), 0);
    assert_eq!(bob_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_broadcast_without_exclusion_reaches_everyone() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27032);
    server.start();

    let mut clients: Vec<_> = (0..3).map(|_| client_on(&transport)).collect();
    let (hits, seen) = counter();
    for client in &mut clients {
        let hits = Arc::clone(&hits);
        client.set_on_data_received(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        client.connect("127.0.0.1:27032");
    }
    assert!(wait_until(|| server.client_count() == 3));
    assert!(wait_until(|| clients
        .iter()
        .all(|client| client.status() == ConnectionStatus::Connected)));

    assert_eq!(
        server.broadcast(Buffer::from("all"), None, SendReliability::Unreliable),
        3
    );
    assert!(wait_until(|| seen.load(Ordering::SeqCst) == 3));
}

#[test]
fn test_unparsable_address() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut client = client_on(&transport);

    client.connect("not-an-address");

    assert!(wait_until(|| !client.is_running()));
    assert_eq!(client.status(), ConnectionStatus::FailedToConnect);
    assert!(client.debug_message().contains("not-an-address"));
}

#[test]
fn test_no_server_fails_to_connect() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut client = client_on(&transport);
    let (disconnects, disconnects_seen) = counter();
    client.set_on_disconnected(move || {
        disconnects.fetch_add(1, Ordering::SeqCst);
    });

    client.connect("127.0.0.1:27033");

    assert!(wait_until(|| !client.is_running()));
    assert_eq!(client.status(), ConnectionStatus::FailedToConnect);
    assert!(wait_until(|| disconnects_seen.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_stop_blocks_until_thread_exits() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27034);
    let mut client = client_on(&transport);

    server.start();
    client.connect("127.0.0.1:27034");
    assert!(wait_until(|| client.status() == ConnectionStatus::Connected));

    client.disconnect();
    assert!(!client.is_running());
    assert_eq!(client.status(), ConnectionStatus::Disconnected);

    server.stop();
    assert!(!server.is_running());
    assert_eq!(server.client_count(), 0);
    assert_eq!(transport.listener_count(), 0);
    assert_eq!(transport.connection_count(), 0);
}

#[test]
fn test_start_and_connect_are_idempotent() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27035);
    let mut client = client_on(&transport);

    server.start();
    server.start();
    assert!(wait_until(|| transport.listener_count() == 1));

    client.connect("127.0.0.1:27035");
    client.connect("127.0.0.1:27035");
    assert!(wait_until(|| server.client_count() == 1));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(server.client_count(), 1);
    assert_eq!(transport.listener_count(), 1);
}

#[test]
fn test_server_shutdown_disconnects_client() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27036);
    let mut client = client_on(&transport);
    let (server_side, server_side_seen) = counter();
    server.set_on_client_disconnected(move |_| {
        server_side.fetch_add(1, Ordering::SeqCst);
    });
    let (client_side, client_side_seen) = counter();
    client.set_on_disconnected(move || {
        client_side.fetch_add(1, Ordering::SeqCst);
    });

    server.start();
    client.connect("127.0.0.1:27036");
    assert!(wait_until(|| client.status() == ConnectionStatus::Connected));

    server.stop();

    assert!(wait_until(|| !client.is_running()));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(client.debug_message(), SHUTDOWN_REASON);
    assert!(wait_until(|| client_side_seen.load(Ordering::SeqCst) == 1));
    assert_eq!(server_side_seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_client_disconnect_fires_server_callback_once() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27037);
    let left = Arc::new(Mutex::new(Vec::<ClientInfo>::new()));
    {
        let left = Arc::clone(&left);
        server.set_on_client_disconnected(move |client| left.lock().unwrap().push(client.clone()));
    }
    server.start();

    let mut client = client_on(&transport);
    client.connect("127.0.0.1:27037");
    assert!(wait_until(|| server.client_count() == 1));
    let registered = server
        .connected_clients()
        .into_values()
        .next()
        .expect("client registered");

    client.disconnect();

    assert!(wait_until(|| server.client_count() == 0));
    assert!(wait_until(|| left.lock().unwrap().len() == 1));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(*left.lock().unwrap(), vec![registered]);
}

#[test]
fn test_severed_connection_is_lost() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27038);
    let mut client = client_on(&transport);
    let (server_side, server_side_seen) = counter();
    server.set_on_client_disconnected(move |_| {
        server_side.fetch_add(1, Ordering::SeqCst);
    });

    server.start();
    client.connect("127.0.0.1:27038");
    assert!(wait_until(|| server.client_count() == 1));
    let registered = server
        .connected_clients()
        .into_values()
        .next()
        .expect("client registered");

    assert!(transport.sever(registered.connection, "timed out"));

    assert!(wait_until(|| client.status() == ConnectionStatus::Disconnected));
    assert_eq!(client.debug_message(), "timed out");
    assert!(wait_until(|| server.client_count() == 0));
    assert_eq!(server_side_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rejected_accept_fails_client() {
    let transport = Arc::new(LoopbackTransport::new());
    transport.set_faults(LoopbackFaults {
        reject_accept: true,
        ..Default::default()
    });
    let mut server = server_on(&transport, 27039);
    let mut client = client_on(&transport);

    server.start();
    client.connect("127.0.0.1:27039");

    assert!(wait_until(|| client.status() == ConnectionStatus::FailedToConnect));
    assert!(server.is_running());
    assert_eq!(server.client_count(), 0);
}

#[test]
fn test_poll_group_failure_stops_server() {
    let transport = Arc::new(LoopbackTransport::new());
    transport.set_faults(LoopbackFaults {
        fail_poll_group_create: true,
        ..Default::default()
    });
    let mut server = server_on(&transport, 27040);

    server.start();

    assert!(wait_until(|| !server.is_running()));
    assert!(!server.debug_message().is_empty());
    assert_eq!(transport.listener_count(), 0);
}

#[test]
fn test_init_failure_reported_on_both_sides() {
    let transport = Arc::new(LoopbackTransport::new());
    transport.set_faults(LoopbackFaults {
        init_failure: Some("no network".to_string()),
        ..Default::default()
    });
    let mut server = server_on(&transport, 27041);
    let mut client = client_on(&transport);

    server.start();
    client.connect("127.0.0.1:27041");

    assert!(wait_until(|| !server.is_running() && !client.is_running()));
    assert!(server.debug_message().contains("no network"));
    assert_eq!(client.status(), ConnectionStatus::FailedToConnect);
    assert!(client.debug_message().contains("no network"));
}

#[test]
fn test_servers_coexist_on_one_transport() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut north = server_on(&transport, 27042);
    let mut south = server_on(&transport, 27043);
    north.start();
    south.start();

    let mut to_north = client_on(&transport);
    let mut to_south = client_on(&transport);
    to_north.connect("127.0.0.1:27042");
    to_south.connect("127.0.0.1:27043");

    assert!(wait_until(|| north.client_count() == 1 && south.client_count() == 1));
    assert!(wait_until(|| to_north.status() == ConnectionStatus::Connected
        && to_south.status() == ConnectionStatus::Connected));

    north.stop();
    assert!(wait_until(|| to_north.status() == ConnectionStatus::Disconnected));
    assert_eq!(to_south.status(), ConnectionStatus::Connected);
    assert_eq!(south.client_count(), 1);
}

#[test]
fn test_reply_from_inside_callback() {
    let transport = Arc::new(LoopbackTransport::new());
    let mut server = server_on(&transport, 27044);
    let echo = server.handle();
    server.set_on_data_received(move |client, buffer| {
        echo.send_to(client, buffer, SendReliability::Reliable);
    });
    server.start();

    let mut client = client_on(&transport);
    let replies = Arc::new(Mutex::new(Vec::new()));
    {
        let replies = Arc::clone(&replies);
        client.set_on_data_received(move |buffer| replies.lock().unwrap().push(buffer.to_vec()));
    }
    client.connect("127.0.0.1:27044");
    assert!(wait_until(|| client.status() == ConnectionStatus::Connected));

    let sender = client.handle();
    thread::spawn(move || sender.send(Buffer::from("echo me"), SendReliability::Reliable))
        .join()
        .unwrap();

    assert!(wait_until(|| replies.lock().unwrap().len() == 1));
    assert_eq!(replies.lock().unwrap()[0], b"echo me".to_vec());
}
