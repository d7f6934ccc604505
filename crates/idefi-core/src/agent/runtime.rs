//! Agent runtime
//!
//! Every registered agent runs as one tokio task draining an `mpsc` mailbox.
//! Messages are handled one at a time, so concurrent sends to the same agent
//! are serialized. The task stops when its `AgentHandle` is shut down or
//! dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{AgentManifest, AgentRecord, AgentState, AgentStatus, Tier};
use crate::error::{AgentError, ExternalError};
use crate::integrations::{CompletionService, ServiceProxy, Services};

/// External services an agent may call while handling a message
#[derive(Clone)]
pub struct AgentContext {
    pub completions: Arc<dyn CompletionService>,
    pub analytics: Arc<dyn ServiceProxy>,
    pub quantum: Arc<dyn ServiceProxy>,
}

impl From<&Services> for AgentContext {
    fn from(services: &Services) -> Self {
        Self {
            completions: services.completions.clone(),
            analytics: services.analytics.clone(),
            quantum: services.quantum.clone(),
        }
    }
}

/// How an agent handles task payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Acknowledge `data`
    Simple,
    /// Acknowledge `data` as heavier processing
    Standard,
    /// Call the analytics API with `endpoint` + `data`
    Advanced,
    /// Call the quantum API with `endpoint` + `data`
    Quantum,
}

impl TaskKind {
    /// The closed tier → behaviour mapping
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free | Tier::Beta => TaskKind::Simple,
            Tier::Standard => TaskKind::Standard,
            Tier::Smart => TaskKind::Advanced,
            Tier::Quantum => TaskKind::Quantum,
        }
    }
}

/// Per-agent settings resolved from the tier and manifest
#[derive(Debug, Clone)]
struct Behavior {
    kind: TaskKind,
    model: String,
    max_tokens: u32,
}

/// A message for an agent
#[derive(Debug, Clone)]
pub enum AgentMessage {
    /// Task payload; the reply is whatever the agent answers
    Task(Value),
    /// Replace the agent's custom endpoints
    SetEndpoints(BTreeMap<String, String>),
}

struct Envelope {
    message: AgentMessage,
    reply: oneshot::Sender<Value>,
}

/// Cloneable sending side of an agent
#[derive(Clone, Debug)]
pub struct AgentMailbox {
    name: String,
    sender: mpsc::Sender<Envelope>,
    status: watch::Receiver<AgentStatus>,
}

impl AgentMailbox {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status snapshot (does not message the agent)
    pub fn status(&self) -> AgentStatus {
        self.status.borrow().clone()
    }

    /// Send a message and wait for the agent's reply
    pub async fn request(&self, message: AgentMessage) -> Result<Value, AgentError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope { message, reply })
            .await
            .map_err(|_| AgentError::Unavailable(self.name.clone()))?;
        response
            .await
            .map_err(|_| AgentError::Unavailable(self.name.clone()))
    }

    /// Send a task payload
    pub async fn send(&self, payload: Value) -> Result<Value, AgentError> {
        self.request(AgentMessage::Task(payload)).await
    }

    /// Assign custom endpoints
    pub async fn set_endpoints(
        &self,
        endpoints: BTreeMap<String, String>,
    ) -> Result<Value, AgentError> {
        self.request(AgentMessage::SetEndpoints(endpoints)).await
    }
}

/// Owning handle of a running agent
pub struct AgentHandle {
    record: AgentRecord,
    mailbox: AgentMailbox,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("tier", &self.record.tier)
            .field("name", &self.record.name)
            .finish()
    }
}

impl AgentHandle {
    /// Start the agent's task
    pub fn spawn(
        record: AgentRecord,
        manifest: &AgentManifest,
        context: AgentContext,
        mailbox_capacity: usize,
    ) -> Self {
        let behavior = Behavior {
            kind: TaskKind::for_tier(record.tier),
            model: manifest.completion.model.clone(),
            max_tokens: manifest.max_tokens(),
        };
        let (sender, inbox) = mpsc::channel(mailbox_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(AgentStatus::new(&record));
        let (stop, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run(inbox, stop_rx, status_tx, behavior, context));
        tracing::info!(tier = %record.tier, name = %record.name, "agent started");

        Self {
            mailbox: AgentMailbox {
                name: record.name.clone(),
                sender,
                status: status_rx,
            },
            record,
            stop: Some(stop),
            task,
        }
    }

    pub fn record(&self) -> &AgentRecord {
        &self.record
    }

    pub fn tier(&self) -> Tier {
        self.record.tier
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn mailbox(&self) -> AgentMailbox {
        self.mailbox.clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.mailbox.status()
    }

    /// Stop the task after the message in progress and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(name = %self.record.name, "agent task ended abnormally: {}", e);
        }
        tracing::info!(tier = %self.record.tier, name = %self.record.name, "agent stopped");
    }
}

async fn run(
    mut inbox: mpsc::Receiver<Envelope>,
    mut stop: oneshot::Receiver<()>,
    status: watch::Sender<AgentStatus>,
    behavior: Behavior,
    context: AgentContext,
) {
    loop {
        let envelope = tokio::select! {
            _ = &mut stop => break,
            envelope = inbox.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let Envelope { message, reply } = envelope;
        let answer = match message {
            AgentMessage::SetEndpoints(endpoints) => {
                let count = endpoints.len();
                status.send_modify(|s| s.custom_endpoints = endpoints.clone());
                json!({
                    "message": format!("Endpoints successfully assigned to {}", status.borrow().name),
                    "endpoints": endpoints,
                    "count": count
                })
            }
            AgentMessage::Task(payload) => {
                let label = task_label(&payload);
                status.send_modify(|s| s.begin(&label));
                let answer = match handle_task(&payload, &behavior, &context, &status).await {
                    Ok(value) => value,
                    Err(message) => json!({ "error": message }),
                };
                status.send_modify(|s| s.finish());
                answer
            }
        };

        // The requester may have gone away; the work is done either way.
        let _ = reply.send(answer);
    }

    status.send_modify(|s| s.state = AgentState::Stopped);
}

fn task_label(payload: &Value) -> String {
    if payload.get("prompt").is_some() {
        return "interact_with_openai".to_string();
    }
    payload
        .get("task")
        .and_then(Value::as_str)
        .unwrap_or("perform_task")
        .to_string()
}

/// Handle one task payload
///
/// `Err` carries a message the agent answers with as `{"error": ...}`.
async fn handle_task(
    payload: &Value,
    behavior: &Behavior,
    context: &AgentContext,
    status: &watch::Sender<AgentStatus>,
) -> Result<Value, String> {
    if !payload.is_object() {
        return Err("payload must be a JSON object".to_string());
    }

    if let Some(prompt) = payload.get("prompt") {
        let prompt = prompt.as_str().ok_or("`prompt` must be a string")?;
        let text = context
            .completions
            .complete(&behavior.model, prompt, behavior.max_tokens)
            .await
            .map_err(external)?;
        return Ok(json!({ "response": text }));
    }

    match payload.get("task").and_then(Value::as_str) {
        Some("sync_wallet") => {
            let wallet = required_str(payload, "wallet_address")?;
            status.send_modify(|s| s.add_wallets([wallet]));
            Ok(json!({ "message": format!("Wallet {} synced", wallet) }))
        }
        Some("process_wallet_addresses") => {
            let addresses: Vec<String> = required(payload, "data")?
                .as_array()
                .ok_or("`data` must be a list of addresses")?
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            let count = addresses.len();
            status.send_modify(|s| s.add_wallets(addresses));
            Ok(json!({
                "message": format!("Processed {} wallet addresses", count),
                "count": count
            }))
        }
        _ => perform_task(payload, behavior, context).await,
    }
}

async fn perform_task(
    payload: &Value,
    behavior: &Behavior,
    context: &AgentContext,
) -> Result<Value, String> {
    match behavior.kind {
        TaskKind::Simple => {
            let data = required(payload, "data")?;
            Ok(json!({
                "message": format!("Performed a simple task with data: {}", display(data))
            }))
        }
        TaskKind::Standard => {
            let data = required(payload, "data")?;
            Ok(json!({
                "message": format!("Performed a standard task with data: {}", display(data))
            }))
        }
        TaskKind::Advanced => {
            let endpoint = required_str(payload, "endpoint")?;
            let data = required(payload, "data")?;
            let result = context
                .analytics
                .get(endpoint, &query_params(data))
                .await
                .map_err(external)?;
            Ok(json!({
                "message": format!("Advanced task call to {}", endpoint),
                "result": result
            }))
        }
        TaskKind::Quantum => {
            let endpoint = required_str(payload, "endpoint")?;
            let data = required(payload, "data")?;
            let result = context
                .quantum
                .post(endpoint, data)
                .await
                .map_err(external)?;
            Ok(json!({
                "message": format!("Quantum task call to {}", endpoint),
                "result": result
            }))
        }
    }
}

fn required<'a>(payload: &'a Value, key: &str) -> Result<&'a Value, String> {
    payload
        .get(key)
        .ok_or_else(|| format!("missing field `{}`", key))
}

fn required_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, String> {
    required(payload, key)?
        .as_str()
        .ok_or_else(|| format!("`{}` must be a string", key))
}

fn external(err: ExternalError) -> String {
    err.to_string()
}

/// Strings print bare, everything else as JSON
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten task data into query parameters
pub(crate) fn query_params(data: &Value) -> Vec<(String, String)> {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), display(v)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![("data".to_string(), display(other))],
    }
}
