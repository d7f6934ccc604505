//! In-memory service doubles for tests
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! downstream crates' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    CodeLookup, CompletionService, FileProcessor, ImageService, Notifier, ObjectStore,
    ServiceProxy, Services,
};
use crate::error::ExternalError;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns `https://images.test/<n>.png`, or fails when told to
#[derive(Debug, Default)]
pub struct FakeImages {
    calls: AtomicUsize,
    fail: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }
}

#[async_trait]
impl ImageService for FakeImages {
    async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
        _size: &str,
    ) -> Result<Vec<String>, ExternalError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        locked(&self.prompts).push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::Status {
                service: "OpenAI".to_string(),
                status: 500,
                body: "image backend down".to_string(),
            });
        }
        Ok((0..count)
            .map(|i| format!("https://images.test/{}-{}.png", n, i))
            .collect())
    }
}

/// Echoes `<model>/<max_tokens>: <prompt>`, optionally after a delay
#[derive(Debug, Default)]
pub struct FakeCompletions {
    delay_ms: AtomicU64,
}

impl FakeCompletions {
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionService for FakeCompletions {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ExternalError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(format!("{}/{}: {}", model, max_tokens, prompt))
    }
}

/// Every address is an EOA unless registered as a contract
#[derive(Debug, Default)]
pub struct FakeCodeLookup {
    calls: AtomicUsize,
    contracts: Mutex<HashMap<String, String>>,
}

impl FakeCodeLookup {
    pub fn add_contract(&self, address: &str, code: &str) {
        locked(&self.contracts).insert(address.to_lowercase(), code.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeLookup for FakeCodeLookup {
    async fn code_at(&self, address: &str) -> Result<String, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(locked(&self.contracts)
            .get(&address.to_lowercase())
            .cloned()
            .unwrap_or_else(|| "0x".to_string()))
    }
}

/// Records calls and echoes them back
#[derive(Debug, Default)]
pub struct FakeProxy {
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeProxy {
    pub fn calls(&self) -> Vec<(String, Value)> {
        locked(&self.calls).clone()
    }
}

#[async_trait]
impl ServiceProxy for FakeProxy {
    async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Value, ExternalError> {
        let params: serde_json::Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let params = Value::Object(params);
        locked(&self.calls).push((endpoint.to_string(), params.clone()));
        Ok(json!({ "endpoint": endpoint, "params": params }))
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ExternalError> {
        locked(&self.calls).push((endpoint.to_string(), body.clone()));
        Ok(json!({ "endpoint": endpoint, "body": body }))
    }
}

/// Accepts uploads and serves `processed:<filename>` downloads
#[derive(Debug, Default)]
pub struct FakeFiles {
    uploads: Mutex<Vec<(String, usize)>>,
}

impl FakeFiles {
    pub fn uploads(&self) -> Vec<(String, usize)> {
        locked(&self.uploads).clone()
    }
}

#[async_trait]
impl FileProcessor for FakeFiles {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Value, ExternalError> {
        locked(&self.uploads).push((filename.to_string(), content.len()));
        Ok(json!({ "filename": filename, "size": content.len(), "status": "processed" }))
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ExternalError> {
        Ok(format!("processed:{}", filename).into_bytes())
    }
}

/// Records sent emails
#[derive(Debug, Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    /// `(to, subject)` pairs
    pub fn sent(&self) -> Vec<(String, String)> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), ExternalError> {
        locked(&self.sent).push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

/// Records stored objects
#[derive(Debug, Default)]
pub struct FakeObjectStore {
    objects: Mutex<Vec<(String, usize)>>,
}

impl FakeObjectStore {
    /// `(path, size)` pairs
    pub fn objects(&self) -> Vec<(String, usize)> {
        locked(&self.objects).clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(
        &self,
        path: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ExternalError> {
        locked(&self.objects).push((path.to_string(), content.len()));
        Ok(path.to_string())
    }
}

/// One fake per service, kept around so tests can inspect them
#[derive(Clone, Default)]
pub struct FakeServices {
    pub images: Arc<FakeImages>,
    pub completions: Arc<FakeCompletions>,
    pub code_lookup: Arc<FakeCodeLookup>,
    pub analytics: Arc<FakeProxy>,
    pub quantum: Arc<FakeProxy>,
    pub files: Arc<FakeFiles>,
    pub notifier: Arc<FakeNotifier>,
    pub objects: Arc<FakeObjectStore>,
}

impl FakeServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> Services {
        Services {
            images: self.images.clone(),
            completions: self.completions.clone(),
            code_lookup: self.code_lookup.clone(),
            analytics: self.analytics.clone(),
            quantum: self.quantum.clone(),
            files: self.files.clone(),
            notifier: self.notifier.clone(),
            objects: self.objects.clone(),
        }
    }
}
