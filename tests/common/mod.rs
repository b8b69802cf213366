//! Shared test doubles for the relay and router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use translate_backend::api::models::{ChatEvent, ChatReply};
use translate_backend::core::{init_metrics, AppConfig, CredentialStore, Credentials, UpstreamError};
use translate_backend::services::{ChatCall, ChatEventStream, ChatUpstream};
use translate_backend::{AppState, ChatRelay};

/// Adapter double that records every call it receives.
///
/// Non-streaming replies echo the credentials they were called with, so tests
/// can tell which api_key and base_url reached the upstream.
#[derive(Default)]
pub struct FakeUpstream {
    pub calls: Mutex<Vec<ChatCall>>,
    pub listed_with: Mutex<Vec<Credentials>>,
    pub events: Vec<ChatEvent>,
    pub failure: Option<UpstreamError>,
    pub models: Vec<String>,
    pub reply_delay: Option<Duration>,
}

impl FakeUpstream {
    pub fn streaming(events: Vec<ChatEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn with_models(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Reply content the fake produces for a call.
pub fn echo_content(credentials: &Credentials) -> String {
    format!("{}|{}", credentials.api_key, credentials.base_url)
}

#[async_trait]
impl ChatUpstream for FakeUpstream {
    async fn complete(&self, call: &ChatCall) -> Result<ChatReply, UpstreamError> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(ChatReply::assistant(echo_content(&call.credentials))),
        }
    }

    fn stream(&self, call: ChatCall) -> ChatEventStream {
        self.calls.lock().unwrap().push(call);
        if let Some(e) = &self.failure {
            return Box::pin(stream::iter(vec![ChatEvent::Error(e.clone())]));
        }
        Box::pin(stream::iter(self.events.clone()))
    }

    async fn list_models(&self, credentials: &Credentials) -> Result<Vec<String>, UpstreamError> {
        self.listed_with.lock().unwrap().push(credentials.clone());
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(self.models.clone()),
        }
    }
}

pub fn relay_with(store: Arc<CredentialStore>, upstream: Arc<FakeUpstream>) -> ChatRelay {
    init_metrics();
    ChatRelay::new(store, upstream, 8)
}

pub fn state_with(store: Arc<CredentialStore>, upstream: Arc<dyn ChatUpstream>) -> Arc<AppState> {
    init_metrics();
    Arc::new(AppState::new(
        AppConfig::default(),
        ChatRelay::new(store, upstream, 8),
    ))
}

pub fn stored(api_key: &str, base_url: &str) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::with_credentials(Credentials::new(
        api_key,
        Some(base_url),
    )))
}
