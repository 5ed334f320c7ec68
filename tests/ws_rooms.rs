//! Room broadcast tests: joins, fan-out, reconciliation and teardown

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use common::{fast_config, session_with_participants, FaultyStore, TestServer};
use menu_rooms::Config;
use tokio_tungstenite::tungstenite;

fn rejected_status(err: tungstenite::Error) -> u16 {
    match err {
        tungstenite::Error::Http(response) => response.status().as_u16(),
        other => panic!("expected HTTP rejection, got {}", other),
    }
}

#[tokio::test]
async fn two_participants_share_one_menu() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    let mut b = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;
    b.expect_menu(&[]).await;

    a.send("add:Pizza").await;
    a.expect_menu(&["Pizza"]).await;
    b.expect_menu(&["Pizza"]).await;

    b.send("add:Sushi").await;
    a.expect_menu(&["Pizza", "Sushi"]).await;
    b.expect_menu(&["Pizza", "Sushi"]).await;

    b.send("remove:Pizza").await;
    a.expect_menu(&["Sushi"]).await;
    b.expect_menu(&["Sushi"]).await;

    let stored = server.stored(&id).await.unwrap();
    assert_eq!(stored.menu, vec!["Sushi"]);
    assert_eq!(stored.participants.len(), 2);
}

#[tokio::test]
async fn joining_records_participant_and_extends_expiry() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;
    let before = server.stored(&id).await.unwrap();

    let mut a = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;

    let after = server.stored(&id).await.unwrap();
    assert_eq!(after.participants.len(), 1);
    assert!(after.participants[0].starts_with("127.0.0.1:"));
    assert_eq!(after.expires_at, before.expires_at + chrono::Duration::minutes(10));
}

#[tokio::test]
async fn late_joiner_receives_current_menu() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    a.send("add:Ramen").await;
    a.expect_menu(&["Ramen"]).await;

    let mut b = server.connect(&id).await.unwrap();
    b.expect_menu(&["Ramen"]).await;
}

#[tokio::test]
async fn unknown_session_is_rejected_with_404() {
    let server = TestServer::start(fast_config()).await;
    let err = server.connect("no-such-session").await.err().unwrap();
    assert_eq!(rejected_status(err), StatusCode::NOT_FOUND.as_u16());
}

#[tokio::test]
async fn session_past_its_ttl_cannot_be_joined() {
    let config = Config {
        session_ttl_secs: 1,
        ..fast_config()
    };
    let server = TestServer::start(config).await;
    let id = server.create_session().await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let err = server.connect(&id).await.err().unwrap();
    assert_eq!(rejected_status(err), StatusCode::NOT_FOUND.as_u16());
}

#[tokio::test]
async fn lingering_key_past_expires_at_cannot_be_joined() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;
    let session = session_with_participants(0, Utc::now() - chrono::Duration::seconds(1));
    server.put_session(&id, &session).await;

    let err = server.connect(&id).await.err().unwrap();
    assert_eq!(rejected_status(err), StatusCode::NOT_FOUND.as_u16());
}

#[tokio::test]
async fn full_room_is_rejected_with_403() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;
    let session = session_with_participants(10, Utc::now() + chrono::Duration::minutes(5));
    server.put_session(&id, &session).await;

    let err = server.connect(&id).await.err().unwrap();
    assert_eq!(rejected_status(err), StatusCode::FORBIDDEN.as_u16());
    assert_eq!(server.state.engine.stats().await.connections, 0);
}

#[tokio::test]
async fn invalid_commands_do_not_end_the_connection() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;
    let mut a = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;

    a.send("bogus").await;
    a.send("order:Pizza").await;
    a.send("remove:Nothing").await;
    a.send("ADD:Tea").await;
    a.expect_menu(&["Tea"]).await;

    assert_eq!(server.stored(&id).await.unwrap().menu, vec!["Tea"]);
}

#[tokio::test]
async fn lost_publish_is_repaired_by_reconciliation() {
    let store = Arc::new(FaultyStore::new());
    let server = TestServer::start_with_store(fast_config(), store.clone()).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    let mut b = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;
    b.expect_menu(&[]).await;

    store.drop_publishes.store(true, Ordering::SeqCst);
    a.send("add:Curry").await;

    // One reconcile interval is 200ms; allow a few
    b.expect_menu(&["Curry"]).await;
    a.expect_menu(&["Curry"]).await;
}

#[tokio::test]
async fn store_outage_during_reconciliation_is_survived() {
    let store = Arc::new(FaultyStore::new());
    let server = TestServer::start_with_store(fast_config(), store.clone()).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;

    store.fail_reads.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(700)).await;
    store.fail_reads.store(false, Ordering::SeqCst);

    a.send("add:Soup").await;
    a.expect_menu(&["Soup"]).await;
    assert_eq!(server.state.engine.stats().await.connections, 1);
}

#[tokio::test]
async fn deleted_session_closes_local_connections() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;
    let mut a = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;

    server.state.sessions.delete(&id).await.unwrap();

    assert_eq!(a.expect_close().await, "session expired");
    server.wait_for_connections(0).await;
}

#[tokio::test]
async fn session_survives_until_last_connection_leaves() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    let mut b = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;
    b.expect_menu(&[]).await;
    b.send("add:Salad").await;
    a.expect_menu(&["Salad"]).await;

    a.close().await;
    server.wait_for_connections(1).await;
    assert_eq!(server.stored(&id).await.unwrap().menu, vec!["Salad"]);

    b.send("add:Bread").await;
    b.expect_menu(&["Salad", "Bread"]).await;

    b.close().await;
    server.wait_for_connections(0).await;
    for _ in 0..50 {
        if server.stored(&id).await.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session should be deleted after the last connection left");
}

#[tokio::test]
async fn keep_session_when_deletion_is_disabled() {
    let config = Config {
        delete_when_empty: false,
        ..fast_config()
    };
    let server = TestServer::start(config).await;
    let id = server.create_session().await;

    let mut a = server.connect(&id).await.unwrap();
    a.expect_menu(&[]).await;
    a.close().await;
    server.wait_for_connections(0).await;

    assert!(server.stored(&id).await.is_some());
}

#[tokio::test]
async fn concurrent_adds_from_many_connections_are_all_kept() {
    let server = TestServer::start(fast_config()).await;
    let id = server.create_session().await;

    let mut clients = Vec::new();
    for _ in 0..5 {
        let mut c = server.connect(&id).await.unwrap();
        c.expect_menu(&[]).await;
        clients.push(c);
    }

    let sends = clients.iter_mut().enumerate().map(|(i, c)| async move {
        c.send(&format!("add:item{}", i)).await;
    });
    futures_util::future::join_all(sends).await;

    for _ in 0..100 {
        if server.stored(&id).await.unwrap().menu.len() == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let mut menu = server.stored(&id).await.unwrap().menu;
    menu.sort();
    assert_eq!(menu, vec!["item0", "item1", "item2", "item3", "item4"]);
}

#[tokio::test]
async fn rooms_are_isolated() {
    let server = TestServer::start(fast_config()).await;
    let first = server.create_session().await;
    let second = server.create_session().await;

    let mut a = server.connect(&first).await.unwrap();
    let mut b = server.connect(&second).await.unwrap();
    a.expect_menu(&[]).await;
    b.expect_menu(&[]).await;

    a.send("add:Pizza").await;
    a.expect_menu(&["Pizza"]).await;

    // b only ever sees its own, still empty, menu
    let deadline = tokio::time::Instant::now() + Duration::from_millis(600);
    while tokio::time::Instant::now() < deadline {
        let remaining = deadline - tokio::time::Instant::now();
        match b.recv_menu(remaining).await {
            Some(menu) => assert!(menu.is_empty()),
            None => break,
        }
    }
    assert!(server.stored(&second).await.unwrap().menu.is_empty());
}
