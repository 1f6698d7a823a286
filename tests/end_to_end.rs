#![cfg(feature = "ssr")]

mod common;

use axum::{extract::Query, routing::get, Json, Router};
use common::{spawn_server, test_app, text, RecordingSink, ScriptedCompletion, Step};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use supportchat::client::{
    ChatClient, ChatSession, ClientError, KeyValueStore, MemoryStore, WeatherClient, HISTORY_KEY,
};
use supportchat::types::{ConversationTurn, FeedbackKind, RatingRequest, Role};

#[tokio::test]
async fn test_session_streams_reply_over_http() {
    let completion = ScriptedCompletion::new(vec![
        text("Grü"),
        text("ße! "),
        text(""),
        text("Crabs: 🦀"),
        Step::Fragment(None),
        text(" welcome."),
    ])
    .with_delay(Duration::from_millis(5));
    let base = spawn_server(test_app(completion.clone(), Arc::new(RecordingSink::default()))).await;

    let store = MemoryStore::new();
    let mut session = ChatSession::open(store.clone());
    let updates = Arc::new(Mutex::new(Vec::new()));
    let seen = updates.clone();
    session.subscribe(move |turn, _| seen.lock().unwrap().push(turn.content.clone()));

    let client = ChatClient::new(base);
    let reply = session.send_message(&client, "hello").await.unwrap();

    let expected = "Grüße! Crabs: 🦀 welcome.";
    assert_eq!(reply.as_deref(), Some(expected));
    assert_eq!(
        session.turns(),
        &[ConversationTurn::user("hello"), ConversationTurn::assistant(expected)]
    );

    // one refresh per chunk, each a prefix of the final reply
    let updates = updates.lock().unwrap();
    assert!(!updates.is_empty());
    assert!(updates.iter().all(|partial| expected.starts_with(partial.as_str())));
    assert_eq!(updates.last().map(String::as_str), Some(expected));

    // the placeholder is never sent upstream
    let sent = &completion.requests()[0];
    assert_eq!(sent.last(), Some(&ConversationTurn::user("hello")));

    let saved: Vec<ConversationTurn> =
        serde_json::from_str(&store.get(HISTORY_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(saved, session.turns());
}

#[tokio::test]
async fn test_upstream_abort_after_two_of_five_fragments() {
    let completion = ScriptedCompletion::new(vec![
        text("first "),
        text("second"),
        Step::Fail("upstream connection reset".into()),
        text(" fourth"),
        text(" fifth"),
    ])
    .with_delay(Duration::from_millis(20));
    let base = spawn_server(test_app(completion, Arc::new(RecordingSink::default()))).await;

    let mut session = ChatSession::open(MemoryStore::new());
    let client = ChatClient::new(base);
    let reply = session.send_message(&client, "hi").await.unwrap();

    assert_eq!(reply.as_deref(), Some("first second"));
    assert_eq!(
        session.turns().last(),
        Some(&ConversationTurn::assistant("first second"))
    );
}

#[tokio::test]
async fn test_rejected_request_is_not_read_as_reply() {
    let base = spawn_server(test_app(
        ScriptedCompletion::rejecting("quota exceeded"),
        Arc::new(RecordingSink::default()),
    ))
    .await;

    let store = MemoryStore::new();
    let mut session = ChatSession::open(store.clone());
    let client = ChatClient::new(base);
    let err = session.send_message(&client, "hi").await.unwrap_err();

    match err {
        ClientError::Rejected { status, error } => {
            assert_eq!(status, 502);
            assert_eq!(error, "upstream_failure");
        }
        other => panic!("unexpected error: {other}"),
    }
    // the placeholder stays, empty, and is persisted
    assert_eq!(session.turns().last(), Some(&ConversationTurn::placeholder()));
    assert!(store.get(HISTORY_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let sink = Arc::new(RecordingSink::default());
    let base = spawn_server(test_app(
        ScriptedCompletion::new(vec![text("Try logging out and in again.")]),
        sink.clone(),
    ))
    .await;

    let mut session = ChatSession::open(MemoryStore::new());
    let client = ChatClient::new(base);

    assert!(!session.submit_feedback(&client, FeedbackKind::Positive).await.unwrap());

    session.send_message(&client, "I can't log in").await.unwrap();
    assert!(session.submit_feedback(&client, FeedbackKind::Positive).await.unwrap());

    assert_eq!(
        session.turns().last(),
        Some(&ConversationTurn::assistant("Thanks for your feedback!"))
    );
    let reactions = sink.reactions.lock().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].message, "Try logging out and in again.");
}

#[tokio::test]
async fn test_rating_rejection_surfaces_code() {
    let base = spawn_server(test_app(
        ScriptedCompletion::default(),
        Arc::new(RecordingSink::default()),
    ))
    .await;
    let client = ChatClient::new(base);

    let err = client.send_rating(&RatingRequest::default()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rejected { status: 400, ref error } if error == "missing_rating"
    ));

    let ack = client
        .send_rating(&RatingRequest {
            rating: Some(4),
            comments: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(ack.status, "success");
}

#[tokio::test]
async fn test_weather_report_is_posted_as_assistant_turn() {
    let mock = Router::new()
        .route(
            "/json/",
            get(|| async {
                Json(json!({
                    "city": "Austin",
                    "country_name": "United States",
                    "latitude": 30.27,
                    "longitude": -97.74,
                }))
            }),
        )
        .route(
            "/weather",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("appid").map(String::as_str), Some("weather-key"));
                assert_eq!(params.get("units").map(String::as_str), Some("metric"));
                Json(json!({
                    "main": {"temp": 31.2},
                    "weather": [{"description": "scattered clouds"}],
                }))
            }),
        );
    let base = spawn_server(mock).await;

    let weather = WeatherClient::new("weather-key")
        .with_endpoints(format!("{base}/json/"), format!("{base}/weather"));
    let mut session = ChatSession::open(MemoryStore::new());
    session.append_weather(&weather).await.unwrap();

    let last = session.turns().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(
        last.content,
        "The current weather in Austin, United States is 31.2°C with scattered clouds."
    );
}
