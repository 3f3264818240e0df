//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use veracity_client::{
    ApiClient, ApiConfig, ApiError, ApiTransport, HttpResponse, MODEL_STATUS_PATH, VideoFile,
};

/// Canned backend verdict.
#[allow(dead_code)]
pub const TRUTH_RESULT_JSON: &str = r#"{
    "prediction":"Truth",
    "confidence":88.2,
    "features":{"facialExpressions":72.5,"voiceAnalysis":64.0,"microGestures":81.3}
}"#;

/// Canned model status served by a real model.
#[allow(dead_code)]
pub const MODEL_STATUS_JSON: &str = r#"{
    "model_loaded":true,
    "last_trained":"2024-03-09T14:02:11.482913",
    "accuracy":67.29,
    "version":"cnn-lstm-v2"
}"#;

type Reply = Result<HttpResponse, ApiError>;

/// Transport replaying queued replies per endpoint.
///
/// Empty queues answer like an unreachable server.
#[derive(Default)]
pub struct ScriptedTransport {
    probes: Mutex<VecDeque<Reply>>,
    statuses: Mutex<VecDeque<Reply>>,
    uploads: Mutex<VecDeque<Reply>>,
    probe_delay: Duration,
    upload_delay: Duration,
    probe_calls: AtomicUsize,
    status_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    upload_fields: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn push_probe(&self, reply: Reply) {
        self.probes.lock().expect("probe lock").push_back(reply);
    }

    pub fn push_status(&self, reply: Reply) {
        self.statuses.lock().expect("status lock").push_back(reply);
    }

    pub fn push_upload(&self, reply: Reply) {
        self.uploads.lock().expect("upload lock").push_back(reply);
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// `(field, file name)` of every upload received.
    pub fn upload_fields(&self) -> Vec<(String, String)> {
        self.upload_fields.lock().expect("field lock").clone()
    }
}

fn refused() -> Reply {
    Err(ApiError::Network("connection refused".to_string()))
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        if url.path() == MODEL_STATUS_PATH {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.statuses.lock().expect("status lock").pop_front();
            return reply.unwrap_or_else(refused);
        }

        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        let reply = self.probes.lock().expect("probe lock").pop_front();
        reply.unwrap_or_else(refused)
    }

    async fn post_file(
        &self,
        _url: &Url,
        field: &str,
        file: &VideoFile,
    ) -> Result<HttpResponse, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_fields
            .lock()
            .expect("field lock")
            .push((field.to_string(), file.name.clone()));
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        let reply = self.uploads.lock().expect("upload lock").pop_front();
        reply.unwrap_or_else(refused)
    }
}

/// Builds a reply with the given status and body.
#[allow(dead_code)]
pub fn reply(status: u16, body: &str) -> Reply {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

/// Builds a client over `transport`.
#[allow(dead_code)]
pub fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
    let config = ApiConfig::new("http://api.example.test").expect("test url is valid");
    ApiClient::new(config, transport)
}

/// The `clip.mp4` fixture.
#[allow(dead_code)]
pub fn clip() -> VideoFile {
    VideoFile::new("clip.mp4", "video/mp4", vec![7; 4096])
}
