//! Chat relay over the in-process loopback transport.
//!
//! A server relays every message to all other clients. Two clients connect,
//! each says hello, and everything is shut down again.
//!
//! Run with: `RUST_LOG=info cargo run --example loopback_chat`

use netsession::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(what: &str, mut condition: impl FnMut() -> bool) -> Result<(), String> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(5));
    }
    Err(format!("timed out waiting for {what}"))
}

fn chat_client(
    transport: &Arc<LoopbackTransport>,
    name: &'static str,
) -> Client<LoopbackTransport> {
    let client = Client::builder(Arc::clone(transport))
        .thread_name(format!("chat-{name}"))
        .build();
    client.set_on_connected(move || tracing::info!("[{}] connected", name));
    client.set_on_disconnected(move || tracing::info!("[{}] disconnected", name));
    client.set_on_data_received(move |buffer| {
        tracing::info!("[{}] received: {}", name, String::from_utf8_lossy(&buffer));
    });
    client
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = Arc::new(LoopbackTransport::new());

    let mut server = Server::new(Arc::clone(&transport));
    let relay = server.handle();
    server.set_on_client_connected(|client| tracing::info!("[server] {} joined", client));
    server.set_on_client_disconnected(|client| tracing::info!("[server] {} left", client));
    server.set_on_data_received(move |client, buffer| {
        let text = format!("{} says {}", client, String::from_utf8_lossy(&buffer));
        let delivered = relay.broadcast(
            Buffer::from(text.as_str()),
            Some(client),
            SendReliability::Reliable,
        );
        tracing::info!("[server] relayed to {} client(s)", delivered);
    });
    server.start();
    println!("Chat server listening on port {}", server.port());

    let mut alice = chat_client(&transport, "alice");
    let mut bob = chat_client(&transport, "bob");
    alice.connect("127.0.0.1:27020");
    bob.connect("127.0.0.1:27020");

    wait_for("both clients", || {
        alice.status() == ConnectionStatus::Connected && bob.status() == ConnectionStatus::Connected
    })?;
    wait_for("server registry", || server.client_count() == 2)?;

    alice.send(Buffer::from("hello from alice"), SendReliability::Reliable);
    bob.send(Buffer::from("hello from bob"), SendReliability::Reliable);
    thread::sleep(Duration::from_millis(100));

    bob.disconnect();
    wait_for("bob to leave", || server.client_count() == 1)?;

    server.stop();
    wait_for("alice to notice", || !alice.is_running())?;
    println!("alice: {} ({})", alice.status(), alice.debug_message());

    Ok(())
}
