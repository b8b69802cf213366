//! Chat relay behavior against a recording adapter double.

mod common;

use common::{echo_content, relay_with, stored, FakeUpstream};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use translate_backend::api::models::{ChatEvent, ChatMessage, ChatRequest};
use translate_backend::core::{
    AppError, CredentialStore, Credentials, ErrorKind, UpstreamError, DEFAULT_BASE_URL,
};
use translate_backend::services::{RelayOutcome, RelayStream};

fn single_shot(messages: Vec<ChatMessage>) -> ChatRequest {
    let mut request = ChatRequest::new(messages);
    request.stream = false;
    request
}

async fn collect(mut stream: RelayStream) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.events.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_single_shot_failure_has_no_partial_body() {
    let upstream = Arc::new(FakeUpstream::failing(UpstreamError::new(
        ErrorKind::Auth,
        "upstream returned HTTP 401: Incorrect API key",
    )));
    let relay = relay_with(stored("sk-bad", "http://upstream.test/v1"), upstream);

    match relay.chat(single_shot(vec![ChatMessage::user("hi")])).await {
        Err(AppError::Upstream(e)) => {
            assert_eq!(e.kind, ErrorKind::Auth);
            assert!(e.detail.contains("Incorrect API key"));
        }
        Ok(_) => panic!("failure must not produce a reply"),
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_stored_credentials_are_used_without_override() {
    let upstream = Arc::new(FakeUpstream::default());
    let relay = relay_with(stored("sk-stored", "http://upstream.test/v1/"), upstream.clone());

    let outcome = relay
        .chat(single_shot(vec![ChatMessage::user("Translate 'hello'")]))
        .await
        .unwrap();

    let calls = upstream.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].credentials.api_key, "sk-stored");
    assert_eq!(calls[0].credentials.base_url, "http://upstream.test/v1");
    assert_eq!(calls[0].model, "gpt-3.5-turbo");
    assert_eq!(calls[0].messages, vec![ChatMessage::user("Translate 'hello'")]);

    let RelayOutcome::Reply(reply) = outcome else {
        panic!("expected a single reply");
    };
    assert_eq!(reply.content, "sk-stored|http://upstream.test/v1");
}

#[tokio::test]
async fn test_override_does_not_modify_store() {
    let store = stored("sk-stored", "http://stored.test/v1");
    let upstream = Arc::new(FakeUpstream::default());
    let relay = relay_with(store.clone(), upstream.clone());

    let mut request = single_shot(vec![ChatMessage::user("hi")]);
    request.api_key = Some("sk-request".to_string());
    request.base_url = Some("http://request.test/v1".to_string());
    relay.chat(request).await.unwrap();

    let calls = upstream.recorded_calls();
    assert_eq!(calls[0].credentials.api_key, "sk-request");
    assert_eq!(calls[0].credentials.base_url, "http://request.test/v1");

    let after = store.get().unwrap();
    assert_eq!(after.api_key, "sk-stored");
    assert_eq!(after.base_url, "http://stored.test/v1");
}

#[tokio::test]
async fn test_override_works_without_stored_credentials() {
    let store = Arc::new(CredentialStore::new());
    let upstream = Arc::new(FakeUpstream::default());
    let relay = relay_with(store.clone(), upstream.clone());

    let mut request = single_shot(vec![ChatMessage::user("hi")]);
    request.api_key = Some("sk-request".to_string());
    relay.chat(request).await.unwrap();

    assert_eq!(upstream.recorded_calls()[0].credentials.base_url, DEFAULT_BASE_URL);
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_missing_credentials_fails_before_dispatch() {
    let upstream = Arc::new(FakeUpstream::default());
    let relay = relay_with(Arc::new(CredentialStore::new()), upstream.clone());

    let streaming = ChatRequest::new(vec![ChatMessage::user("hi")]);
    assert!(matches!(
        relay.chat(streaming).await,
        Err(AppError::MissingCredentials)
    ));
    assert!(matches!(
        relay.chat(single_shot(vec![])).await,
        Err(AppError::MissingCredentials)
    ));
    assert!(upstream.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_list_models_before_configuration_is_missing_credentials() {
    let upstream = Arc::new(FakeUpstream::with_models(&["gpt-4"]));
    let relay = relay_with(Arc::new(CredentialStore::new()), upstream.clone());

    let err = relay.list_models().await.unwrap_err();
    assert!(matches!(err, AppError::MissingCredentials));
    assert_eq!(err.kind(), Some(ErrorKind::MissingCredentials));
    assert!(upstream.listed_with.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_models_uses_stored_credentials() {
    let upstream = Arc::new(FakeUpstream::with_models(&["gpt-4", "gpt-3.5-turbo"]));
    let relay = relay_with(stored("sk-stored", "http://upstream.test/v1"), upstream.clone());

    let models = relay.list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-4", "gpt-3.5-turbo"]);
    assert_eq!(
        upstream.listed_with.lock().unwrap()[0],
        Credentials::new("sk-stored", Some("http://upstream.test/v1"))
    );
}

#[tokio::test]
async fn test_empty_messages_are_forwarded() {
    let upstream = Arc::new(FakeUpstream::default());
    let relay = relay_with(stored("sk", "http://upstream.test/v1"), upstream.clone());

    relay.chat(single_shot(vec![])).await.unwrap();
    assert!(upstream.recorded_calls()[0].messages.is_empty());
}

#[tokio::test]
async fn test_stream_forwards_deltas_then_done() {
    let upstream = Arc::new(FakeUpstream::streaming(vec![
        ChatEvent::Delta("Bon".into()),
        ChatEvent::Delta("jour".into()),
        ChatEvent::Done,
    ]));
    let relay = relay_with(stored("sk", "http://upstream.test/v1"), upstream);

    let RelayOutcome::Stream(stream) = relay
        .chat(ChatRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap()
    else {
        panic!("expected a stream");
    };

    assert_eq!(
        collect(stream).await,
        vec![
            ChatEvent::Delta("Bon".into()),
            ChatEvent::Delta("jour".into()),
            ChatEvent::Done
        ]
    );
}

#[tokio::test]
async fn test_stream_stops_after_first_terminal_event() {
    let upstream = Arc::new(FakeUpstream::streaming(vec![
        ChatEvent::Delta("a".into()),
        ChatEvent::Error(UpstreamError::new(ErrorKind::RateLimit, "slow down")),
        ChatEvent::Delta("b".into()),
        ChatEvent::Done,
    ]));
    let relay = relay_with(stored("sk", "http://upstream.test/v1"), upstream);

    let RelayOutcome::Stream(stream) = relay
        .chat(ChatRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap()
    else {
        panic!("expected a stream");
    };

    let events = collect(stream).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ChatEvent::Delta("a".into()));
    assert!(matches!(&events[1], ChatEvent::Error(e) if e.kind == ErrorKind::RateLimit));
}

#[tokio::test]
async fn test_stream_open_failure_is_in_stream_error() {
    let upstream = Arc::new(FakeUpstream::failing(UpstreamError::new(
        ErrorKind::Auth,
        "upstream returned HTTP 401",
    )));
    let relay = relay_with(stored("sk", "http://upstream.test/v1"), upstream);

    let RelayOutcome::Stream(stream) = relay
        .chat(ChatRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap()
    else {
        panic!("expected a stream");
    };

    let events = collect(stream).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ChatEvent::Error(e) if e.kind == ErrorKind::Auth));
}

#[tokio::test]
async fn test_store_update_after_dispatch_does_not_affect_call() {
    let store = stored("sk-old", "http://old.test/v1");
    let upstream = Arc::new(FakeUpstream::streaming(vec![ChatEvent::Done]));
    let relay = relay_with(store.clone(), upstream.clone());

    let RelayOutcome::Stream(stream) = relay
        .chat(ChatRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap()
    else {
        panic!("expected a stream");
    };
    store.set(Credentials::new("sk-new", Some("http://new.test/v1")));
    collect(stream).await;

    let calls = upstream.recorded_calls();
    assert_eq!(calls[0].credentials.api_key, "sk-old");
    assert_eq!(calls[0].credentials.base_url, "http://old.test/v1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overrides_never_cross_contaminate() {
    let upstream = Arc::new(FakeUpstream {
        reply_delay: Some(std::time::Duration::from_millis(5)),
        ..Default::default()
    });
    let relay = relay_with(stored("sk-stored", "http://stored.test/v1"), upstream);

    let tasks = (0..32).map(|i| {
        let relay = relay.clone();
        tokio::spawn(async move {
            let mut request = single_shot(vec![ChatMessage::user(format!("message {}", i))]);
            // Every other request relies on the stored credentials
            if i % 2 == 0 {
                request.api_key = Some(format!("sk-{}", i));
                request.base_url = Some(format!("http://tenant-{}.test/v1", i));
            }
            let expected = match &request.api_key {
                Some(key) => Credentials::new(key.clone(), request.base_url.as_deref()),
                None => Credentials::new("sk-stored", Some("http://stored.test/v1")),
            };
            match relay.chat(request).await.unwrap() {
                RelayOutcome::Reply(reply) => (reply.content, echo_content(&expected)),
                RelayOutcome::Stream(_) => panic!("expected a single reply"),
            }
        })
    });

    for task in futures::future::join_all(tasks).await {
        let (got, expected) = task.unwrap();
        assert_eq!(got, expected);
    }
}
