//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mount_server::bridge::{DataChangeCallback, EventCallback, LogCallback};
use mount_server::config::{SchemeConfig, ServerConfig};
use mount_server::ServerRuntime;

/// A notification received by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    StartError(String, String),
    Shutdown(String),
    Exit(i32),
}

/// Event sink that records every notification.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn shutdowns(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, HostEvent::Shutdown(k) if k == kind))
            .count()
    }

    pub fn start_errors(&self, kind: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::StartError(k, error) if k == kind => Some(error),
                _ => None,
            })
            .collect()
    }
}

impl EventCallback for RecordingEvents {
    fn on_start_error(&self, kind: &str, error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::StartError(kind.to_string(), error.to_string()));
    }

    fn on_shutdown(&self, kind: &str) {
        self.events.lock().unwrap().push(HostEvent::Shutdown(kind.to_string()));
    }

    fn on_process_exit(&self, code: i32) {
        self.events.lock().unwrap().push(HostEvent::Exit(code));
    }
}

/// Data-change sink that records model names.
#[derive(Default)]
pub struct RecordingChanges {
    models: Mutex<Vec<String>>,
}

impl RecordingChanges {
    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

impl DataChangeCallback for RecordingChanges {
    fn on_change(&self, model: &str) {
        self.models.lock().unwrap().push(model.to_string());
    }
}

/// Log sink that records `(level, message)` pairs.
#[derive(Default)]
pub struct RecordingLog {
    records: Mutex<Vec<(i16, String)>>,
}

impl RecordingLog {
    pub fn records(&self) -> Vec<(i16, String)> {
        self.records.lock().unwrap().clone()
    }
}

impl LogCallback for RecordingLog {
    fn on_log(&self, level: i16, _time: i64, message: &str) {
        self.records.lock().unwrap().push((level, message.to_string()));
    }
}

/// Plain HTTP on `127.0.0.1:port`, everything else disabled.
pub fn http_scheme(port: u16) -> SchemeConfig {
    SchemeConfig {
        address: "127.0.0.1".into(),
        http_port: i32::from(port),
        ..SchemeConfig::disabled()
    }
}

pub fn config(scheme: SchemeConfig) -> ServerConfig {
    ServerConfig {
        scheme,
        ..ServerConfig::default()
    }
}

/// A default runtime reporting to a fresh [`RecordingEvents`].
pub fn runtime(scheme: SchemeConfig) -> (ServerRuntime, Arc<RecordingEvents>) {
    let events = Arc::new(RecordingEvents::default());
    let runtime = ServerRuntime::builder(config(scheme))
        .events(events.clone())
        .build();
    (runtime, events)
}

/// Poll `condition` every 20ms until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Client without connection pooling, so idle keep-alive connections do
/// not hold listeners open.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// GET `url` and return the body, or `None` if the request failed.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Option<String> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.text().await.ok()
}

/// Retry GET `/ping` until the listener answers.
pub async fn wait_for_ping(client: &reqwest::Client, port: u16) -> bool {
    let url = format!("http://127.0.0.1:{port}/ping");
    for _ in 0..100 {
        if get_text(client, &url).await.as_deref() == Some("pong") {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
