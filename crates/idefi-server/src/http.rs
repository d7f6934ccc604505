//! HTTP endpoint handlers

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use idefi_core::error::ValidationError;
use idefi_core::wallet::{is_csv_filename, parse_address_csv, sanitize_filename};
use idefi_core::{AgentHandle, AgentMailbox, Role, Tier};

use crate::{ApiError, AppState};

type ApiResult<T> = Result<T, ApiError>;

/// Trimmed value of a required field
fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::MissingField(field.to_string()))
}

/// Trimmed value of an optional field, empty meaning absent
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_tier(value: Option<String>) -> Result<Tier, ValidationError> {
    required(value, "agent_type")?.parse()
}

fn parse_role(value: Option<String>) -> Result<Option<Role>, ValidationError> {
    optional(value).map(|role| role.parse()).transpose()
}

/// Mailbox of the named agent, in `agent_type` if given, else in the first
/// tier that has one by that name
async fn resolve_agent(
    state: &AppState,
    agent_type: Option<String>,
    agent_name: &str,
) -> ApiResult<(Tier, AgentMailbox)> {
    let tier = optional(agent_type)
        .map(|t| t.parse::<Tier>())
        .transpose()?;
    let registry = state.registry.read().await;
    let found = match tier {
        Some(tier) => registry.lookup(tier, agent_name).map(|mailbox| (tier, mailbox)),
        None => registry.find_by_name(agent_name),
    };
    Ok(found?)
}

/// Request to create an agent
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub agent_name: Option<String>,
    pub agent_type: Option<String>,
    pub agent_role: Option<String>,
    pub wallet_address: Option<String>,
    pub user_email: Option<String>,
}

/// Create an agent, generate its image and start it
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let tier = parse_tier(request.agent_type)?;
    let role = parse_role(request.agent_role)?;
    if tier.requires_role() && role.is_none() {
        return Err(ValidationError::MissingRole(tier).into());
    }
    let wallet_address = required(request.wallet_address, "wallet_address")?;

    state.eoa.validate(&wallet_address).await?;

    let created = state.factory.create(tier, role).await?;
    let record = match optional(request.agent_name) {
        Some(name) => created.record.renamed(name),
        None => created.record,
    };

    let handle = AgentHandle::spawn(
        record.clone(),
        &created.manifest,
        state.agent_context(),
        state.config.agents.mailbox_capacity,
    );
    let displaced = state.registry.write().await.register(handle);
    if let Some(previous) = displaced {
        // The old agent may be mid-task; let it finish off the request path.
        tokio::spawn(previous.shutdown());
    }

    if let Some(email) = optional(request.user_email) {
        let kind = role.map(|r| r.name()).unwrap_or(tier.name());
        let subject = format!("Your {} Agent '{}' has been created!", kind, record.name);
        let body = format!(
            "<p>Your {} agent has been successfully created. It is now ready for task \
             assignment and operations.</p><p>Wallet Address: {}</p>",
            kind, wallet_address
        );
        if let Err(e) = state.services.notifier.send_email(&email, &subject, &body).await {
            tracing::warn!(name = %record.name, "Failed to send creation email: {}", e);
        }
    }

    let file_path = record.source_path.display().to_string();
    tracing::info!(%tier, name = %record.name, "Agent created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("New {} agent created: {} -> {}", tier, record.name, file_path),
            "agent_id": record.id,
            "agent_name": record.name,
            "agent_type": tier,
            "agent_role": record.role,
            "file_path": file_path,
            "image_url": record.image_url,
            "nft_image": record.image_url,
        })),
    ))
}

/// Request to assign tasks to an agent
#[derive(Debug, Deserialize)]
pub struct AssignTasksRequest {
    pub agent_type: Option<String>,
    pub agent_name: Option<String>,
    pub tasks: Option<Value>,
}

/// Send a task payload to an agent and return its reply
pub async fn assign_tasks(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignTasksRequest>,
) -> ApiResult<Json<Value>> {
    let tier = parse_tier(request.agent_type)?;
    let name = required(request.agent_name, "agent_name")?;
    let tasks = request
        .tasks
        .ok_or_else(|| ValidationError::MissingField("tasks".to_string()))?;

    let mailbox = state.registry.read().await.lookup(tier, &name)?;
    tracing::debug!(%tier, %name, "Dispatching task");
    let result = mailbox.send(tasks).await?;

    Ok(Json(json!({
        "message": format!("Tasks assigned to {}", name),
        "result": result
    })))
}

/// Status filter
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub agent_type: Option<String>,
    pub agent_name: Option<String>,
}

/// Status of one agent, one tier, or every agent
pub async fn get_agent_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    if let Some(name) = optional(query.agent_name) {
        let (_, mailbox) = resolve_agent(&state, query.agent_type, &name).await?;
        return Ok(Json(json!({ "status": mailbox.status() })));
    }

    let tier = optional(query.agent_type)
        .map(|t| t.parse::<Tier>())
        .transpose()?;
    let mut all = state.registry.read().await.status_all();
    if let Some(tier) = tier {
        all.retain(|t, _| *t == tier);
    }

    Ok(Json(json!(all)))
}

/// Send uploaded wallet data to an agent
///
/// Multipart fields: `agent_name`, optional `agent_type`, optional `task`
/// (default `process_wallet_addresses`) and an optional `file`. Addresses are
/// read from the first column of a `.csv` file.
pub async fn sync_data(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut agent_name = None;
    let mut agent_type = None;
    let mut task = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                file = Some((filename, bytes.to_vec()));
            }
            "agent_name" => agent_name = Some(field.text().await.map_err(invalid_multipart)?),
            "agent_type" => agent_type = Some(field.text().await.map_err(invalid_multipart)?),
            "task" => task = Some(field.text().await.map_err(invalid_multipart)?),
            _ => {}
        }
    }

    let name = required(agent_name, "agent_name")?;
    let (_, mailbox) = resolve_agent(&state, agent_type, &name).await?;

    let mut addresses = Vec::new();
    if let Some((filename, content)) = file {
        let saved = save_upload(&state, &filename, &content).await?;
        tracing::debug!(path = %saved.display(), "Saved uploaded file");
        if is_csv_filename(&filename) {
            addresses = parse_address_csv(&content)?;
        }
    }

    let task = optional(task).unwrap_or_else(|| "process_wallet_addresses".to_string());
    let result = mailbox
        .send(json!({ "task": task, "data": addresses }))
        .await?;

    Ok(Json(json!({
        "message": format!("Data synced to agent {}", name),
        "addresses": addresses,
        "result": result
    })))
}

/// Request to sync a wallet with an agent
#[derive(Debug, Deserialize)]
pub struct SyncWalletRequest {
    pub agent_name: Option<String>,
    pub agent_type: Option<String>,
    pub wallet_address: Option<String>,
}

/// Validate a wallet and hand it to an agent
pub async fn sync_wallet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncWalletRequest>,
) -> ApiResult<Json<Value>> {
    let name = required(request.agent_name, "agent_name")?;
    let address = required(request.wallet_address, "wallet_address")?;

    state.eoa.validate(&address).await?;

    let (_, mailbox) = resolve_agent(&state, request.agent_type, &name).await?;
    let result = mailbox
        .send(json!({ "task": "sync_wallet", "wallet_address": address }))
        .await?;

    Ok(Json(json!({
        "message": format!("Wallet {} synced with agent {}", address, name),
        "result": result
    })))
}

/// Request for a security check
#[derive(Debug, Deserialize)]
pub struct SecurityCheckRequest {
    pub agent_name: Option<String>,
    pub address: Option<String>,
}

/// Run the analytics `checkaddress` check on behalf of a Smart agent
pub async fn security_check(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SecurityCheckRequest>,
) -> ApiResult<Json<Value>> {
    let name = required(request.agent_name, "agent_name")?;
    let address = required(request.address, "address")?;

    state.eoa.validate(&address).await?;

    {
        let registry = state.registry.read().await;
        if let Err(not_found) = registry.lookup(Tier::Smart, &name) {
            return Err(match registry.find_by_name(&name) {
                Ok((tier, _)) => ValidationError::WrongTier {
                    name,
                    tier,
                    required: Tier::Smart,
                }
                .into(),
                Err(_) => not_found.into(),
            });
        }
    }

    let result = state
        .services
        .analytics
        .get("checkaddress", &[("address".to_string(), address)])
        .await?;

    Ok(Json(json!({
        "message": format!("Security check performed by {}", name),
        "result": result
    })))
}

/// Request to assign custom endpoints
#[derive(Debug, Deserialize)]
pub struct AssignEndpointsRequest {
    pub agent_type: Option<String>,
    pub agent_name: Option<String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Replace an agent's custom endpoints
pub async fn assign_endpoints(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignEndpointsRequest>,
) -> ApiResult<Json<Value>> {
    let name = required(request.agent_name, "agent_name")?;
    if request.endpoints.is_empty() {
        return Err(ValidationError::MissingField("endpoints".to_string()).into());
    }

    let (_, mailbox) = resolve_agent(&state, request.agent_type, &name).await?;
    let result = mailbox.set_endpoints(request.endpoints).await?;
    Ok(Json(result))
}

/// Creation counters
pub async fn get_tracking(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.tracking.snapshot().await))
}

/// GET proxy to the analytics API; `endpoint` selects the upstream path and
/// every other query parameter is forwarded
pub async fn proxy_analytics_get(
    State(state): State<Arc<AppState>>,
    Query(mut params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let endpoint = required(params.remove("endpoint"), "endpoint")?;
    let mut params: Vec<(String, String)> = params.into_iter().collect();
    params.sort();
    let result = state.services.analytics.get(&endpoint, &params).await?;
    Ok(Json(result))
}

/// POST proxy to the analytics API; the body's `endpoint` selects the
/// upstream path and the remaining fields are forwarded
pub async fn proxy_analytics_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let Value::Object(mut body) = body else {
        return Err(ValidationError::InvalidPayload("body must be a JSON object".to_string()).into());
    };
    let endpoint = required(
        body.remove("endpoint")
            .and_then(|v| v.as_str().map(str::to_string)),
        "endpoint",
    )?;
    let result = state
        .services
        .analytics
        .post(&endpoint, &Value::Object(body))
        .await?;
    Ok(Json(result))
}

/// POST proxy to the quantum API
pub async fn proxy_quantum(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let result = state.services.quantum.post(&endpoint, &body).await?;
    Ok(Json(result))
}

/// Upload a file to the processing API, mirroring the file and the result to
/// object storage
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(invalid_multipart)?;
        upload = Some((filename, content_type, bytes.to_vec()));
        break;
    }

    let (filename, content_type, content) =
        upload.ok_or_else(|| ValidationError::MissingField("file".to_string()))?;
    let filename = sanitize_filename(&filename)
        .ok_or_else(|| ValidationError::InvalidPayload("invalid file name".to_string()))?;

    save_upload(&state, &filename, &content).await?;
    let result = state
        .services
        .files
        .upload(&filename, content.clone())
        .await?;

    let mut stored = Vec::new();
    let objects = &state.services.objects;
    match objects
        .put(&format!("uploads/{}", filename), content, &content_type)
        .await
    {
        Ok(path) => stored.push(path),
        Err(e) => tracing::warn!(%filename, "Failed to store upload: {}", e),
    }
    match objects
        .put(
            &format!("results/{}.json", filename),
            result.to_string().into_bytes(),
            "application/json",
        )
        .await
    {
        Ok(path) => stored.push(path),
        Err(e) => tracing::warn!(%filename, "Failed to store processing result: {}", e),
    }

    Ok(Json(json!({
        "message": format!("File {} processed", filename),
        "result": result,
        "stored": stored
    })))
}

/// Download a processed file, mirroring it to object storage
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let filename = sanitize_filename(&filename)
        .ok_or_else(|| ValidationError::InvalidPayload("invalid file name".to_string()))?;
    let content = state.services.files.download(&filename).await?;

    if let Err(e) = state
        .services
        .objects
        .put(
            &format!("downloads/{}", filename),
            content.clone(),
            "application/octet-stream",
        )
        .await
    {
        tracing::warn!(%filename, "Failed to store download: {}", e);
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    )
        .into_response())
}

fn invalid_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ValidationError::InvalidPayload(err.to_string()).into()
}

/// Save an upload under a unique name in the upload directory
async fn save_upload(state: &AppState, filename: &str, content: &[u8]) -> ApiResult<PathBuf> {
    let safe = sanitize_filename(filename).unwrap_or_else(|| "upload".to_string());
    let dir = &state.config.server.upload_dir;
    let path = dir.join(format!("{}-{}", Uuid::new_v4(), safe));
    let write = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, content).await
    };
    write
        .await
        .map_err(|e| ApiError::Upload(format!("{}: {}", safe, e)))?;
    Ok(path)
}
