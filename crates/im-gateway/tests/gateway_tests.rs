//! Dispatcher-level integration tests
//!
//! Drive the command handlers through `handlers::dispatch` with in-memory
//! presence/peer fakes, exactly as the reader task would.

mod common;

use common::{drain, TestContext, NODE_ADDR};
use im_core::{PresenceRecord, SessionKey};
use im_gateway::protocol::{ResponseFrame, StatusCode};
use serde_json::{json, Value};

#[tokio::test]
async fn ping_returns_pong() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx.request(&conn, "1", "ping", Value::Null).await;

    assert_eq!(response.code, StatusCode::Ok);
    assert_eq!(response.seq, "1");
    assert_eq!(response.cmd, "ping");
    assert_eq!(response.data, Some(json!("pong")));
}

#[tokio::test]
async fn unknown_command_is_reported_not_fatal() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx.request(&conn, "1", "subscribe", Value::Null).await;
    assert_eq!(response.code, StatusCode::CommandNotFound);
    assert_eq!(response.seq, "1");
    assert_eq!(response.cmd, "subscribe");

    // The connection keeps working
    let response = ctx.request(&conn, "2", "ping", Value::Null).await;
    assert_eq!(response.code, StatusCode::Ok);
}

#[tokio::test]
async fn unparseable_frame_yields_parameter_illegal() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = im_gateway::handlers::dispatch(&ctx.state, &conn, "{definitely not json").await;
    assert_eq!(response.code, StatusCode::ParameterIllegal);
}

#[tokio::test]
async fn login_succeeds_and_publishes_presence() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx.login(&conn, "appA", "u1").await;

    assert_eq!(response.code, StatusCode::Ok);
    let data = response.data.unwrap();
    assert_eq!(data["userID"], "u1");
    assert_eq!(data["appID"], "appA");

    assert!(conn.is_authenticated());
    assert!(conn.login_at() > 0);

    // Presence record points at this node and this client
    let key = SessionKey::new("appA", "u1");
    let record = ctx.presence.get(&key).expect("presence record written");
    assert_eq!(record.node_address, NODE_ADDR);
    assert_eq!(record.client_address, conn.addr());

    // Local delivery lookup now resolves
    let found = ctx.state.registry().lookup(key).await.unwrap();
    assert_eq!(found.id(), conn.id());
}

#[tokio::test]
async fn login_without_token_is_unauthorized() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx.request(&conn, "1", "login", json!({})).await;
    assert_eq!(response.code, StatusCode::Unauthorized);
    assert!(!conn.is_authenticated());
}

#[tokio::test]
async fn login_with_garbage_token_is_unauthorized() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx
        .request(&conn, "1", "login", json!({"serviceToken": "nope.nope.nope"}))
        .await;
    assert_eq!(response.code, StatusCode::Unauthorized);
}

#[tokio::test]
async fn login_with_empty_user_id_claim_is_rejected() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let token = ctx.jwt.issue_token("", "appA").unwrap();
    let response = ctx
        .request(&conn, "1", "login", json!({"serviceToken": token}))
        .await;

    assert_eq!(response.code, StatusCode::UnauthorizedUserId);
    assert!(!conn.is_authenticated());
}

#[tokio::test]
async fn second_login_on_same_connection_is_rejected() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    assert_eq!(ctx.login(&conn, "appA", "u1").await.code, StatusCode::Ok);

    // Any identity, same socket: operation failure, identity unchanged
    let response = ctx.login(&conn, "appA", "u9").await;
    assert_eq!(response.code, StatusCode::OperationFailure);

    let identity = conn.identity().unwrap();
    assert_eq!(identity.user_id, "u1");
}

#[tokio::test]
async fn malformed_login_payload_keeps_connection_usable() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    // serviceToken must be a string
    let response = ctx
        .request(&conn, "1", "login", json!({"serviceToken": 12345}))
        .await;
    assert_eq!(response.code, StatusCode::ParameterIllegal);
    assert!(!conn.is_authenticated());

    // Same socket, valid login afterwards
    let response = ctx.login(&conn, "appA", "u1").await;
    assert_eq!(response.code, StatusCode::Ok);
}

#[tokio::test]
async fn presence_write_failure_surfaces_as_server_error() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    ctx.presence.set_failing(true);
    let response = ctx.login(&conn, "appA", "u1").await;

    assert_eq!(response.code, StatusCode::ServerError);
    // The local login already happened and is not rolled back
    assert!(conn.is_authenticated());
}

#[tokio::test]
async fn heartbeat_requires_login() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx.request(&conn, "1", "heartbeat", json!({})).await;
    assert_eq!(response.code, StatusCode::NotLoggedIn);
}

#[tokio::test]
async fn heartbeat_refreshes_presence() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    // Age the stored record so the refresh is observable
    let key = SessionKey::new("appA", "u1");
    let mut record = ctx.presence.get(&key).unwrap();
    let original_login_at = record.login_at;
    record.last_heartbeat_at = 1;
    ctx.presence.insert(record);

    let response = ctx
        .request(&conn, "2", "heartbeat", json!({"userID": "u1"}))
        .await;
    assert_eq!(response.code, StatusCode::Ok);

    let refreshed = ctx.presence.get(&key).unwrap();
    assert!(refreshed.last_heartbeat_at > 1);
    assert_eq!(refreshed.login_at, original_login_at);
}

#[tokio::test]
async fn heartbeat_with_missing_presence_is_implicit_logout() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    // Simulate TTL lapse / external removal
    ctx.presence.remove(&SessionKey::new("appA", "u1"));

    let response = ctx.request(&conn, "2", "heartbeat", json!({})).await;
    assert_eq!(response.code, StatusCode::NotLoggedIn);
}

#[tokio::test]
async fn send_message_requires_login() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;

    let response = ctx
        .request(
            &conn,
            "1",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "hi"}),
        )
        .await;
    assert_eq!(response.code, StatusCode::NotLoggedIn);
}

#[tokio::test]
async fn send_message_validates_fields() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    for data in [
        json!({"messageType": "text", "content": "hi"}),
        json!({"toUserID": "u2", "content": "hi"}),
        json!({"toUserID": "u2", "messageType": "text"}),
        json!({"toUserID": "u2", "messageType": "video", "content": "hi"}),
        json!({"toUserID": "u2", "messageType": "audio", "content": "QUJD", "audioFormat": "mp3"}),
    ] {
        let response = ctx.request(&conn, "1", "send-message", data).await;
        assert_eq!(response.code, StatusCode::ParameterIllegal);
    }
}

#[tokio::test]
async fn routing_miss_returns_not_online_with_zero_forwards() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    let response = ctx
        .request(
            &conn,
            "2",
            "send-message",
            json!({"toUserID": "ghost", "messageType": "text", "content": "hi"}),
        )
        .await;

    assert_eq!(response.code, StatusCode::NotOnline);
    assert_eq!(ctx.peer.push_count(), 0);
}

#[tokio::test]
async fn send_message_delivers_locally() {
    let ctx = TestContext::new();
    let (sender, _sender_rx) = ctx.connect().await;
    let (recipient, mut recipient_rx) = ctx.connect().await;

    ctx.login(&sender, "appA", "u1").await;
    ctx.login(&recipient, "appA", "u2").await;
    // Flush the registry loop, then discard enter notices
    ctx.state.registry().counts().await;
    drain(&mut recipient_rx);

    let response = ctx
        .request(
            &sender,
            "2",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "hi"}),
        )
        .await;

    assert_eq!(response.code, StatusCode::Ok);
    let receipt = response.data.unwrap();
    assert_eq!(receipt["messageID"], "2");
    assert_eq!(receipt["toUserID"], "u2");
    assert_eq!(receipt["messageType"], "text");
    assert_eq!(receipt["status"], "sent");

    let frames = drain(&mut recipient_rx);
    assert_eq!(frames.len(), 1, "exactly one forwarded frame");
    let forwarded = &frames[0];
    assert_eq!(forwarded.cmd, "msg");
    assert_eq!(forwarded.seq, "2", "correlation id survives the hop");
    let body = forwarded.data.as_ref().unwrap();
    assert_eq!(body["from"], "u1");
    assert_eq!(body["msg"], "hi");
    assert_eq!(body["type"], "text");

    assert_eq!(ctx.peer.push_count(), 0, "local delivery never touches peers");
}

#[tokio::test]
async fn stale_local_presence_record_is_not_online() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    // A record claiming this node owns u2, with no live local socket
    ctx.presence.insert(PresenceRecord::new(
        NODE_ADDR,
        "203.0.113.9:1234",
        "appA",
        "u2",
        100,
    ));

    let response = ctx
        .request(
            &conn,
            "2",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "hi"}),
        )
        .await;

    assert_eq!(response.code, StatusCode::NotOnline);
    assert_eq!(ctx.peer.push_count(), 0);
}

#[tokio::test]
async fn remote_recipient_is_pushed_to_owning_node() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    ctx.presence.insert(PresenceRecord::new(
        "10.9.9.9:8020",
        "203.0.113.9:1234",
        "appA",
        "u2",
        100,
    ));

    let response = ctx
        .request(
            &conn,
            "7",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "over there"}),
        )
        .await;

    assert_eq!(response.code, StatusCode::Ok);
    let pushes = ctx.peer.pushes.lock();
    assert_eq!(pushes.len(), 1);
    let (node, key, frame) = &pushes[0];
    assert_eq!(node, "10.9.9.9:8020");
    assert_eq!(key.cache_key(), "appA:u2");

    let forwarded = ResponseFrame::from_json(frame).unwrap();
    assert_eq!(forwarded.seq, "7");
    assert_eq!(forwarded.cmd, "msg");
    assert_eq!(forwarded.data.as_ref().unwrap()["from"], "u1");
}

#[tokio::test]
async fn remote_push_not_delivered_is_not_online() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;
    ctx.presence.insert(PresenceRecord::new(
        "10.9.9.9:8020",
        "203.0.113.9:1234",
        "appA",
        "u2",
        100,
    ));

    ctx.peer.set_delivered(false);
    let response = ctx
        .request(
            &conn,
            "2",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "hi"}),
        )
        .await;
    assert_eq!(response.code, StatusCode::NotOnline);

    ctx.peer.set_failing(true);
    let response = ctx
        .request(
            &conn,
            "3",
            "send-message",
            json!({"toUserID": "u2", "messageType": "text", "content": "hi"}),
        )
        .await;
    assert_eq!(response.code, StatusCode::ServerError);
}

#[tokio::test]
async fn send_audio_validates_and_delivers() {
    let ctx = TestContext::new();
    let (sender, _sender_rx) = ctx.connect().await;
    let (recipient, mut recipient_rx) = ctx.connect().await;
    ctx.login(&sender, "appA", "u1").await;
    ctx.login(&recipient, "appA", "u2").await;
    ctx.state.registry().counts().await;
    drain(&mut recipient_rx);

    // Missing audio data
    let response = ctx
        .request(&sender, "1", "send-audio", json!({"toUserID": "u2"}))
        .await;
    assert_eq!(response.code, StatusCode::ParameterIllegal);

    // Unsupported codec
    let response = ctx
        .request(
            &sender,
            "2",
            "send-audio",
            json!({"toUserID": "u2", "audioData": "QUJD", "audioFormat": "wav"}),
        )
        .await;
    assert_eq!(response.code, StatusCode::ParameterIllegal);

    // Codec defaults to pcm_16k
    let response = ctx
        .request(
            &sender,
            "3",
            "send-audio",
            json!({"toUserID": "u2", "audioData": "QUJD", "duration": 1200}),
        )
        .await;
    assert_eq!(response.code, StatusCode::Ok);
    let receipt = response.data.unwrap();
    assert_eq!(receipt["messageType"], "audio");
    assert_eq!(receipt["audioFormat"], "pcm_16k");
    assert_eq!(receipt["duration"], 1200);

    let frames = drain(&mut recipient_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].cmd, "audio");
    assert_eq!(frames[0].data.as_ref().unwrap()["type"], "audio");
    assert_eq!(frames[0].data.as_ref().unwrap()["msg"], "QUJD");
}

#[tokio::test]
async fn sweep_evicts_idle_connection_end_to_end() {
    let ctx = TestContext::new();
    let (conn, _rx) = ctx.connect().await;
    ctx.login(&conn, "appA", "u1").await;

    let last = conn.last_heartbeat_at();
    ctx.state.registry().sweep(last + 31, 30).await;

    assert!(conn.is_closed());
    assert!(ctx
        .state
        .registry()
        .lookup(SessionKey::new("appA", "u1"))
        .await
        .is_none());
}
