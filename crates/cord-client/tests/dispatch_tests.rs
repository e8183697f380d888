//! Dispatch pipeline tests: dispatcher semantics in isolation plus an
//! end-to-end run over an in-memory gateway connection.

use cord_client::dispatcher::{Dispatcher, HandlerMode};
use cord_client::{Cache, Client, ClientContext, DispatchError, Event, MiddlewareRegistry};
use cord_common::config::ClientConfig;
use cord_core::Snowflake;
use cord_gateway::{ChannelConnector, ChannelTransport, Envelope, Opcode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn message_envelope(seq: u64, content: &str) -> Envelope {
    Envelope::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": "3",
            "channel_id": "2",
            "author": {"id": "5", "username": "zip"},
            "content": content,
        }),
    )
}

fn new_dispatcher() -> (Dispatcher, mpsc::Receiver<DispatchError>) {
    let context = ClientContext::new(Arc::new(Cache::new()));
    Dispatcher::new(MiddlewareRegistry::standard(), context)
}

#[tokio::test]
async fn test_once_only_fires_exactly_once() {
    let (dispatcher, _errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);
    // Keep the channel open after the one-shot registration (and its tx
    // clone) is dropped, so an idle rx.recv() pends instead of closing.
    let _keep_alive = tx.clone();

    dispatcher.register("on_message", HandlerMode::OnceOnly, move |_event| {
        let tx = tx.clone();
        async move {
            tx.send(()).await.ok();
            Ok(())
        }
    });

    dispatcher.handle(&message_envelope(1, "first"));
    dispatcher.handle(&message_envelope(2, "second"));

    rx.recv().await.unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err(),
        "one-shot handler fired twice"
    );
    assert_eq!(dispatcher.handler_count("on_message"), 0);
}

#[tokio::test]
async fn test_same_event_envelopes_dispatch_in_order() {
    let (dispatcher, _errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);

    dispatcher.register("on_message", HandlerMode::Persistent, move |event| {
        let tx = tx.clone();
        async move {
            if let Event::MessageCreate(message) = event {
                // A slow first message must not let the second overtake it
                if message.content == "first" {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                tx.send(message.content.clone()).await.ok();
            }
            Ok(())
        }
    });

    dispatcher.handle(&message_envelope(1, "first"));
    dispatcher.handle(&message_envelope(2, "second"));

    assert_eq!(rx.recv().await.unwrap(), "first");
    assert_eq!(rx.recv().await.unwrap(), "second");
}

#[tokio::test]
async fn test_panicking_handler_does_not_skip_siblings() {
    let (dispatcher, mut errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);

    // Panics in the closure body, before the async block is returned
    #[allow(unreachable_code)]
    dispatcher.register("on_message", HandlerMode::Persistent, |_event| {
        panic!("kaboom");
        async { Ok(()) }
    });
    dispatcher.register("on_message", HandlerMode::Persistent, move |_event| {
        let tx = tx.clone();
        async move {
            tx.send(()).await.ok();
            Ok(())
        }
    });

    dispatcher.handle(&message_envelope(1, "hi"));

    rx.recv().await.unwrap();
    assert!(matches!(
        errors.recv().await.unwrap(),
        DispatchError::HandlerPanic { .. }
    ));
}

#[tokio::test]
async fn test_unregistered_event_is_a_noop() {
    let (dispatcher, mut errors) = new_dispatcher();

    // No middleware entry for this wire event
    dispatcher.handle(&Envelope::dispatch("TYPING_START", 1, json!({})));
    // Middleware exists but no handlers are registered
    dispatcher.handle(&message_envelope(2, "hi"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(errors.try_recv().is_err());
}

#[tokio::test]
async fn test_failing_handler_is_isolated() {
    let (dispatcher, mut errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);

    dispatcher.register("on_message", HandlerMode::Persistent, |_event| async {
        Err(anyhow::anyhow!("boom"))
    });
    dispatcher.register("on_message", HandlerMode::Persistent, move |_event| {
        let tx = tx.clone();
        async move {
            tx.send(()).await.ok();
            Ok(())
        }
    });

    dispatcher.handle(&message_envelope(1, "hi"));

    // The second handler still runs and the failure surfaces on the
    // error channel.
    rx.recv().await.unwrap();
    match errors.recv().await.unwrap() {
        DispatchError::Handler { event, message } => {
            assert_eq!(event, "on_message");
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_middleware_failure_poisons_only_its_envelope() {
    let (dispatcher, mut errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);

    dispatcher.register("on_message", HandlerMode::Persistent, move |event| {
        let tx = tx.clone();
        async move {
            if let Event::MessageCreate(message) = event {
                tx.send(message.content.clone()).await.ok();
            }
            Ok(())
        }
    });

    // Payload missing required fields
    dispatcher.handle(&Envelope::dispatch("MESSAGE_CREATE", 1, json!({"id": true})));
    dispatcher.handle(&message_envelope(2, "still alive"));

    assert!(matches!(
        errors.recv().await.unwrap(),
        DispatchError::Middleware { .. }
    ));
    assert_eq!(rx.recv().await.unwrap(), "still alive");
}

#[tokio::test]
async fn test_registration_handle_removes_handler() {
    let (dispatcher, _errors) = new_dispatcher();
    let handle = dispatcher.register("on_message", HandlerMode::Persistent, |_event| async {
        Ok(())
    });

    assert_eq!(dispatcher.handler_count("on_message"), 1);
    assert!(handle.remove());
    assert_eq!(dispatcher.handler_count("on_message"), 0);
    assert!(!handle.remove());
}

#[tokio::test]
async fn test_closed_dispatcher_drops_new_events() {
    let (dispatcher, _errors) = new_dispatcher();
    let (tx, mut rx) = mpsc::channel(4);

    dispatcher.register("on_message", HandlerMode::Persistent, move |_event| {
        let tx = tx.clone();
        async move {
            tx.send(()).await.ok();
            Ok(())
        }
    });

    dispatcher.close();
    dispatcher.handle(&message_envelope(1, "hi"));

    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_role_update_end_to_end() {
    let connector = Arc::new(ChannelConnector::new());
    let (transport, mut peer) = ChannelTransport::pair(32);
    connector.expect_connection(transport).await;

    let config = ClientConfig::new("token-1").with_gateway_url("wss://gateway.test");
    let mut client = Client::builder(config)
        .connector(connector)
        .build()
        .unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    client.on("on_guild_role_update", move |event| {
        let tx = tx.clone();
        async move {
            tx.send(event).await.ok();
            Ok(())
        }
    });

    client.start();

    // Server side: hello, consume the identify, then bring the session up
    peer.send(
        Envelope::decode(br#"{"op": 10, "d": {"heartbeat_interval": 45000}}"#).unwrap(),
    )
    .await;
    loop {
        let frame = peer.recv().await.unwrap();
        if frame.op == Opcode::Identify {
            break;
        }
    }
    peer.send(Envelope::dispatch(
        "READY",
        1,
        json!({
            "v": 9,
            "session_id": "abc",
            "user": {"id": "100", "username": "bot"},
            "guilds": [],
        }),
    ))
    .await;
    peer.send(Envelope::dispatch(
        "GUILD_CREATE",
        2,
        json!({
            "id": "1",
            "name": "guild",
            "roles": [{"id": "9", "name": "old"}],
        }),
    ))
    .await;
    peer.send(Envelope::dispatch(
        "GUILD_ROLE_UPDATE",
        3,
        json!({"guild_id": "1", "role": {"id": "9", "name": "new"}}),
    ))
    .await;

    // Typed event delivered with the updated role
    let event = rx.recv().await.unwrap();
    match event {
        Event::GuildRoleUpdate(update) => {
            assert_eq!(update.guild_id, Snowflake::new(1));
            assert_eq!(update.role.name, "new");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Cache side effect applied
    let guild = client.guild(Snowflake::new(1)).unwrap();
    assert_eq!(guild.role(Snowflake::new(9)).unwrap().name, "new");
    assert_eq!(client.current_user().unwrap().username, "bot");

    client.close();
    client.wait().await.unwrap();
}
