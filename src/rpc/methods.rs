//! JSON-RPC method dispatch table (C8). Grounded in the teacher's
//! `StdioServer::handle_message`/`handle_tools_call` match-on-method-name
//! pattern; the USC-specific tool set and resource URIs replace the
//! teacher's task/agent/memory tool set.

use serde_json::{json, Value};
use tracing::warn;

use crate::domain::error::{AgentError, RpcError, TopologyError};
use crate::domain::ids::{AgentId, ProposalId, SessionId, TaskId};
use crate::domain::models::agent::{Agent, AgentKind, CapabilityLimits, Capabilities};
use crate::domain::models::consensus::{ProposalExtra, Vote};
use crate::domain::models::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::domain::models::session::ClientInfo;
use crate::domain::models::task::{Task, TaskPriority};
use crate::domain::models::topology::TopologyRole;
use crate::domain::ports::SamplingRequest;
use crate::rpc::Coordinator;

const PROTOCOL_VERSION_MAJOR: u32 = 2024;
const PROTOCOL_VERSION_MINOR: u32 = 11;
const PROTOCOL_VERSION_PATCH: u32 = 5;
const MAX_COMPLETION_VALUES: usize = 10;

/// Dispatches one parsed request to its handler and returns the envelope
/// to write back to the transport. `session_id` is `None` only for the
/// very first `initialize` call on a transport that has not yet minted one.
pub async fn dispatch(
    coordinator: &Coordinator,
    session_id: Option<SessionId>,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return fail(request.id, RpcError::VersionMismatch.into());
    }

    let id = request.id.clone();
    let params = request.params.unwrap_or(Value::Null);

    if request.method != "initialize" {
        match session_id {
            Some(sid) => {
                if let Err(err) = coordinator.sessions.touch(sid).await {
                    return fail(id, err.into());
                }
                if let Err(err) = coordinator.rate_limiter.check(sid, &request.method).await {
                    return fail(id, err.into());
                }
            }
            None => return fail(id, RpcError::InvalidParams("session not initialized".to_string()).into()),
        }
    }

    let result = match request.method.as_str() {
        "initialize" => handle_initialize(coordinator, &params).await,
        "ping" => handle_ping(),
        "tools/list" => Ok(tools_list()),
        "tools/call" => handle_tools_call(coordinator, session_id, &params).await,
        "resources/list" => Ok(resources_list()),
        "resources/read" => handle_resources_read(coordinator, &params).await,
        "resources/subscribe" => handle_resources_subscribe(coordinator, session_id, &params).await,
        "resources/unsubscribe" => handle_resources_unsubscribe(coordinator, session_id, &params).await,
        "prompts/list" => Ok(prompts_list()),
        "prompts/get" => handle_prompts_get(&params),
        "tasks/status" => handle_tasks_status(coordinator, &params).await,
        "tasks/cancel" => handle_tasks_cancel(coordinator, &params).await,
        "completion/complete" => Ok(handle_completion_complete(&params)),
        "logging/setLevel" => handle_logging_set_level(coordinator, &params),
        "sampling/createMessage" => handle_sampling_create_message(coordinator, &params).await,
        other => Err(RpcError::MethodNotFound(other.to_string())),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => fail(id, err.into()),
    }
}

fn fail(id: Option<Value>, error: RpcError) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        id,
        JsonRpcError {
            code: error.code(),
            message: error.to_string(),
            data: error.slug().map(|slug| json!({"kind": slug})),
        },
    )
}

fn invalid_params(field: &str) -> RpcError {
    RpcError::InvalidParams(format!("missing or malformed field: {field}"))
}

// ---------------------------------------------------------------------
// initialize / ping
// ---------------------------------------------------------------------

async fn handle_initialize(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    let client_info = params.get("clientInfo").map(|ci| ClientInfo {
        name: ci.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
        version: ci.get("version").and_then(Value::as_str).unwrap_or_default().to_string(),
    });

    let (session_id, _receiver) = coordinator
        .sessions
        .create(client_info)
        .await
        .map_err(RpcError::from)?;

    Ok(json!({
        "protocolVersion": {
            "major": PROTOCOL_VERSION_MAJOR,
            "minor": PROTOCOL_VERSION_MINOR,
            "patch": PROTOCOL_VERSION_PATCH,
        },
        "capabilities": {
            "tools": {},
            "resources": { "subscribe": true },
            "prompts": {},
            "sampling": { "available": coordinator.llm_provider.is_some() },
        },
        "serverInfo": {
            "name": "usc",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "sessionId": session_id.to_string(),
    }))
}

fn handle_ping() -> Result<Value, RpcError> {
    Ok(json!({
        "pong": true,
        "timestamp": crate::domain::ids::LogicalClock::now_wall(),
    }))
}

// ---------------------------------------------------------------------
// tools/list, tools/call
// ---------------------------------------------------------------------

fn tools_list() -> Value {
    json!({
        "tools": [
            {
                "name": "agent_register",
                "description": "Register a new agent with the swarm coordinator, declaring its kind and capability proficiencies.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "kind": { "type": "string", "enum": ["queen", "coordinator", "worker", "peer", "specialist"] },
                        "skills": { "type": "object", "additionalProperties": { "type": "number" } },
                        "max_concurrent_tasks": { "type": "integer" }
                    },
                    "required": ["name"]
                }
            },
            {
                "name": "agent_list",
                "description": "List registered agents, optionally filtered by capability.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "capability": { "type": "string" }
                    }
                }
            },
            {
                "name": "agent_heartbeat",
                "description": "Record a liveness heartbeat for an agent.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "agent_id": { "type": "string" } },
                    "required": ["agent_id"]
                }
            },
            {
                "name": "task_submit",
                "description": "Submit a task into the scheduler's dependency graph.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string" },
                        "name": { "type": "string" },
                        "priority": { "type": "string", "enum": ["low", "normal", "high", "critical"] },
                        "dependencies": { "type": "array", "items": { "type": "string" } },
                        "timeout_ms": { "type": "integer" },
                        "input": {}
                    },
                    "required": ["kind", "name"]
                }
            },
            {
                "name": "topology_join",
                "description": "Join an agent into the swarm topology, receiving its assigned role.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "agent_id": { "type": "string" },
                        "requested_role": { "type": "string", "enum": ["queen", "coordinator", "worker", "peer"] }
                    },
                    "required": ["agent_id"]
                }
            },
            {
                "name": "topology_leave",
                "description": "Remove an agent from the swarm topology, triggering automatic leader re-election if it held the leader role.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "agent_id": { "type": "string" }
                    },
                    "required": ["agent_id"]
                }
            },
            {
                "name": "topology_find_path",
                "description": "Finds the shortest path between two agents in the current topology graph.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "src": { "type": "string" },
                        "dst": { "type": "string" }
                    },
                    "required": ["src", "dst"]
                }
            },
            {
                "name": "consensus_propose",
                "description": "Propose a value to the configured consensus protocol.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "proposer": { "type": "string" },
                        "value": {}
                    },
                    "required": ["proposer", "value"]
                }
            },
            {
                "name": "consensus_vote",
                "description": "Cast a vote on an in-flight consensus proposal.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "proposal_id": { "type": "string" },
                        "voter": { "type": "string" },
                        "approve": { "type": "boolean" },
                        "confidence": { "type": "number" }
                    },
                    "required": ["proposal_id", "voter", "approve"]
                }
            }
        ]
    })
}

async fn handle_tools_call(coordinator: &Coordinator, session_id: Option<SessionId>, params: &Value) -> Result<Value, RpcError> {
    let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("name"))?;
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let outcome: Result<Value, RpcError> = match name {
        "agent_register" => tool_agent_register(coordinator, &arguments).await,
        "agent_list" => tool_agent_list(coordinator, &arguments).await.map_err(RpcError::from),
        "agent_heartbeat" => tool_agent_heartbeat(coordinator, &arguments).await.map_err(RpcError::from),
        "task_submit" => tool_task_submit(coordinator, &arguments).await,
        "topology_join" => tool_topology_join(coordinator, &arguments).await.map_err(RpcError::from),
        "topology_leave" => tool_topology_leave(coordinator, &arguments).await.map_err(RpcError::from),
        "topology_find_path" => tool_topology_find_path(coordinator, &arguments).await,
        "consensus_propose" => tool_consensus_propose(coordinator, &arguments).await,
        "consensus_vote" => tool_consensus_vote(coordinator, &arguments).await,
        other => return Err(RpcError::MethodNotFound(format!("unknown tool: {other}"))),
    };

    let _ = session_id;
    match outcome {
        Ok(content) => Ok(json!({ "content": [{ "type": "text", "text": content.to_string() }] })),
        Err(err) => Ok(json!({
            "content": [{ "type": "text", "text": err.to_string() }],
            "isError": true,
        })),
    }
}

async fn tool_agent_register(coordinator: &Coordinator, args: &Value) -> Result<Value, RpcError> {
    let name = args.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("name"))?.to_string();
    let kind = args
        .get("kind")
        .and_then(Value::as_str)
        .map(parse_agent_kind)
        .unwrap_or(AgentKind::Worker);

    let mut capabilities = Capabilities::default();
    if let Some(skills) = args.get("skills").and_then(Value::as_object) {
        for (skill, proficiency) in skills {
            capabilities.skills.insert(skill.clone(), proficiency.as_f64().unwrap_or(0.0));
        }
    }
    if let Some(max) = args.get("max_concurrent_tasks").and_then(Value::as_u64) {
        capabilities.limits = CapabilityLimits {
            max_concurrent_tasks: max as u32,
            ..CapabilityLimits::default()
        };
    }

    let agent = Agent::new(name, kind, capabilities);
    let agent_id = coordinator.agents.register(agent).await.map_err(RpcError::from)?;
    coordinator
        .events
        .publish(
            crate::services::EventSeverity::Info,
            crate::services::EventCategory::Agent,
            crate::services::EventPayload::AgentRegistered { agent_id },
        );
    Ok(json!({ "agent_id": agent_id.to_string() }))
}

async fn tool_agent_list(coordinator: &Coordinator, args: &Value) -> Result<Value, AgentError> {
    let mut filter = crate::services::AgentFilter::default();
    filter.capability = args.get("capability").and_then(Value::as_str).map(str::to_string);
    let agents = coordinator.agents.list(&filter).await;
    Ok(json!({
        "agents": agents.iter().map(|a| json!({
            "agent_id": a.agent_id.to_string(),
            "name": a.name,
            "kind": a.kind.as_str(),
            "status": a.status.as_str(),
        })).collect::<Vec<_>>()
    }))
}

async fn tool_agent_heartbeat(coordinator: &Coordinator, args: &Value) -> Result<Value, AgentError> {
    let agent_id = parse_agent_id(args).map_err(|_| AgentError::NotFound(AgentId::new()))?;
    coordinator.agents.heartbeat(agent_id).await?;
    Ok(json!({ "success": true }))
}

async fn tool_task_submit(coordinator: &Coordinator, args: &Value) -> Result<Value, RpcError> {
    let kind = args.get("kind").and_then(Value::as_str).ok_or_else(|| invalid_params("kind"))?.to_string();
    let name = args.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("name"))?.to_string();
    let priority = args
        .get("priority")
        .and_then(Value::as_str)
        .map(parse_priority)
        .unwrap_or(TaskPriority::Normal);

    let mut task = Task::new(kind, name, priority);
    task.timeout_ms = args.get("timeout_ms").and_then(Value::as_u64);
    task.input = args.get("input").cloned().unwrap_or(Value::Null);
    task.dependencies = args
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(|d| d.as_str().and_then(|s| s.parse::<TaskId>().ok()))
                .collect()
        })
        .unwrap_or_default();

    let task_id = coordinator.scheduler.submit(task).await.map_err(RpcError::from)?;
    coordinator.events.publish(
        crate::services::EventSeverity::Info,
        crate::services::EventCategory::Task,
        crate::services::EventPayload::TaskSubmitted { task_id },
    );
    Ok(json!({ "task_id": task_id.to_string() }))
}

async fn tool_topology_join(coordinator: &Coordinator, args: &Value) -> Result<Value, TopologyError> {
    let agent_id = parse_agent_id(args).map_err(|_| TopologyError::NodeNotFound(AgentId::new()))?;
    let requested_role = args.get("requested_role").and_then(Value::as_str).map(parse_topology_role);
    let role = coordinator.topology.join(agent_id, requested_role).await?;
    coordinator.events.publish(
        crate::services::EventSeverity::Info,
        crate::services::EventCategory::Topology,
        crate::services::EventPayload::TopologyNodeJoined {
            agent_id,
            role: format!("{role:?}"),
        },
    );
    Ok(json!({ "role": format!("{role:?}") }))
}

async fn tool_topology_leave(coordinator: &Coordinator, args: &Value) -> Result<Value, TopologyError> {
    let agent_id = parse_agent_id(args).map_err(|_| TopologyError::NodeNotFound(AgentId::new()))?;
    let new_leader = coordinator.topology.leave(agent_id).await?;
    coordinator.events.publish(
        crate::services::EventSeverity::Info,
        crate::services::EventCategory::Topology,
        crate::services::EventPayload::TopologyNodeLeft { agent_id },
    );
    if let Some(new_leader) = new_leader {
        coordinator.events.publish(
            crate::services::EventSeverity::Info,
            crate::services::EventCategory::Topology,
            crate::services::EventPayload::TopologyLeaderChanged { agent_id: new_leader },
        );
    }
    Ok(json!({ "new_leader": new_leader.map(|id| id.to_string()) }))
}

async fn tool_topology_find_path(coordinator: &Coordinator, args: &Value) -> Result<Value, RpcError> {
    let src: AgentId = args
        .get("src")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("src"))?;
    let dst: AgentId = args
        .get("dst")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("dst"))?;
    let path = coordinator.topology.find_optimal_path(src, dst).await;
    Ok(json!({ "path": path.iter().map(ToString::to_string).collect::<Vec<_>>() }))
}

async fn tool_consensus_propose(coordinator: &Coordinator, args: &Value) -> Result<Value, RpcError> {
    let proposer = parse_agent_id(args).map_err(|_| invalid_params("proposer"))?;
    let value = args.get("value").cloned().ok_or_else(|| invalid_params("value"))?;
    let term = coordinator.consensus_term().await;
    let extra = coordinator.consensus_extra(proposer, &value).await;
    let proposal_id = coordinator.consensus.propose(proposer, term, value, extra).await;
    coordinator.events.publish(
        crate::services::EventSeverity::Info,
        crate::services::EventCategory::Consensus,
        crate::services::EventPayload::ConsensusProposed { proposal_id },
    );
    Ok(json!({ "proposal_id": proposal_id.to_string() }))
}

async fn tool_consensus_vote(coordinator: &Coordinator, args: &Value) -> Result<Value, RpcError> {
    let proposal_id: ProposalId = args
        .get("proposal_id")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("proposal_id"))?;
    let voter = parse_agent_id(args).map_err(|_| invalid_params("voter"))?;
    let approve = args.get("approve").and_then(Value::as_bool).ok_or_else(|| invalid_params("approve"))?;
    let confidence = args.get("confidence").and_then(Value::as_f64).unwrap_or(1.0);

    let cluster_size = coordinator.agents.get_metrics().await.active;
    coordinator.consensus.set_cluster_size(cluster_size.max(1)).await;

    let vote = Vote {
        voter,
        approve,
        confidence,
    };
    let status = coordinator.consensus.vote(proposal_id, vote).await.map_err(RpcError::from)?;
    if matches!(status, crate::domain::models::consensus::ProposalStatus::Committed) {
        coordinator.events.publish(
            crate::services::EventSeverity::Info,
            crate::services::EventCategory::Consensus,
            crate::services::EventPayload::ConsensusCommitted { proposal_id },
        );
    }
    Ok(json!({ "status": format!("{status:?}") }))
}

fn parse_agent_id(args: &Value) -> Result<AgentId, ()> {
    args.get("agent_id")
        .or_else(|| args.get("proposer"))
        .or_else(|| args.get("voter"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or(())
}

fn parse_agent_kind(value: &str) -> AgentKind {
    match value {
        "queen" => AgentKind::Queen,
        "coordinator" => AgentKind::Coordinator,
        "peer" => AgentKind::Peer,
        "specialist" => AgentKind::Specialist,
        _ => AgentKind::Worker,
    }
}

fn parse_priority(value: &str) -> TaskPriority {
    match value {
        "low" => TaskPriority::Low,
        "high" => TaskPriority::High,
        "critical" => TaskPriority::Critical,
        _ => TaskPriority::Normal,
    }
}

fn parse_topology_role(value: &str) -> TopologyRole {
    match value {
        "queen" => TopologyRole::Queen,
        "coordinator" => TopologyRole::Coordinator,
        "peer" => TopologyRole::Peer,
        _ => TopologyRole::Worker,
    }
}

// ---------------------------------------------------------------------
// resources/*
// ---------------------------------------------------------------------

const METRICS_URI: &str = "usc://metrics/snapshot";
const AGENTS_URI: &str = "usc://agents/list";

fn resources_list() -> Value {
    json!({
        "resources": [
            { "uri": METRICS_URI, "name": "Coordinator metrics snapshot", "mimeType": "application/json" },
            { "uri": AGENTS_URI, "name": "Registered agents", "mimeType": "application/json" },
        ]
    })
}

async fn handle_resources_read(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| invalid_params("uri"))?;
    let text = match uri {
        METRICS_URI => {
            let snapshot = crate::services::snapshot(
                &coordinator.agents,
                &coordinator.scheduler,
                &coordinator.topology,
                &coordinator.pool,
                &coordinator.rate_limiter,
            )
            .await;
            serde_json::to_string(&snapshot).map_err(|e| RpcError::Internal(e.to_string()))?
        }
        AGENTS_URI => {
            let agents = coordinator.agents.list(&crate::services::AgentFilter::default()).await;
            serde_json::to_string(&agents).map_err(|e| RpcError::Internal(e.to_string()))?
        }
        other => return Err(RpcError::InvalidParams(format!("unknown resource uri: {other}"))),
    };
    Ok(json!({ "contents": [{ "uri": uri, "mimeType": "application/json", "text": text }] }))
}

async fn handle_resources_subscribe(coordinator: &Coordinator, session_id: Option<SessionId>, params: &Value) -> Result<Value, RpcError> {
    let session_id = session_id.ok_or(RpcError::Internal("no active session".to_string()))?;
    let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| invalid_params("uri"))?;
    coordinator.sessions.subscribe(session_id, uri).await.map_err(RpcError::from)?;
    Ok(json!({ "subscriptionId": crate::domain::ids::SubscriptionId::new().to_string() }))
}

async fn handle_resources_unsubscribe(coordinator: &Coordinator, session_id: Option<SessionId>, params: &Value) -> Result<Value, RpcError> {
    let session_id = session_id.ok_or(RpcError::Internal("no active session".to_string()))?;
    let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| invalid_params("uri"))?;
    coordinator.sessions.unsubscribe(session_id, uri).await.map_err(RpcError::from)?;
    Ok(json!({ "success": true }))
}

// ---------------------------------------------------------------------
// prompts/*
// ---------------------------------------------------------------------

fn prompts_list() -> Value {
    json!({
        "prompts": [
            {
                "name": "swarm_status_report",
                "description": "Summarizes current agent, task, and topology state for a human operator.",
                "arguments": [
                    { "name": "audience", "description": "Who the report is for", "required": false }
                ]
            }
        ]
    })
}

fn handle_prompts_get(params: &Value) -> Result<Value, RpcError> {
    let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("name"))?;
    if name != "swarm_status_report" {
        return Err(RpcError::InvalidParams(format!("unknown prompt: {name}")));
    }
    let audience = params
        .get("arguments")
        .and_then(|a| a.get("audience"))
        .and_then(Value::as_str)
        .unwrap_or("operator");
    Ok(json!({
        "description": "Swarm status report prompt",
        "messages": [
            {
                "role": "user",
                "content": {
                    "type": "text",
                    "text": format!("Summarize the current swarm state for a {audience}."),
                }
            }
        ]
    }))
}

// ---------------------------------------------------------------------
// tasks/*
// ---------------------------------------------------------------------

async fn handle_tasks_status(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    if let Some(task_id) = params.get("taskId").and_then(Value::as_str) {
        let task_id: TaskId = task_id.parse().map_err(|_| invalid_params("taskId"))?;
        let task = coordinator.scheduler.get(task_id).await.map_err(RpcError::from)?;
        return Ok(task_status_value(&task));
    }
    Err(RpcError::InvalidParams(
        "tasks/status without taskId is not supported by this coordinator build".to_string(),
    ))
}

fn task_status_value(task: &Task) -> Value {
    json!({
        "taskId": task.task_id.to_string(),
        "status": format!("{:?}", task.status).to_lowercase(),
        "assignedTo": task.assigned_to.map(|a| a.to_string()),
        "retries": task.retries,
    })
}

async fn handle_tasks_cancel(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    let task_id: TaskId = params
        .get("taskId")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("taskId"))?;
    coordinator.scheduler.cancel(task_id).await.map_err(RpcError::from)?;
    coordinator.events.publish(
        crate::services::EventSeverity::Info,
        crate::services::EventCategory::Task,
        crate::services::EventPayload::TaskCancelled { task_id },
    );
    Ok(json!({ "success": true }))
}

// ---------------------------------------------------------------------
// completion/complete
// ---------------------------------------------------------------------

fn handle_completion_complete(params: &Value) -> Value {
    let prefix = params
        .get("argument")
        .and_then(|a| a.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("");

    let candidates = ["agent_register", "agent_list", "agent_heartbeat", "task_submit", "topology_join", "consensus_propose", "consensus_vote"];
    let mut values: Vec<&str> = candidates.into_iter().filter(|c| c.starts_with(prefix)).collect();
    let has_more = values.len() > MAX_COMPLETION_VALUES;
    values.truncate(MAX_COMPLETION_VALUES);

    json!({
        "completion": {
            "values": values,
            "total": values.len(),
            "hasMore": has_more,
        }
    })
}

// ---------------------------------------------------------------------
// logging/setLevel
// ---------------------------------------------------------------------

fn handle_logging_set_level(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    let level = params.get("level").and_then(Value::as_str).ok_or_else(|| invalid_params("level"))?;
    if !matches!(level, "debug" | "info" | "warn" | "error") {
        return Err(RpcError::InvalidParams(format!("unsupported level: {level}")));
    }
    if let Err(err) = coordinator.set_log_level(level) {
        warn!(error = %err, "failed to reload log level");
        return Err(RpcError::Internal(err));
    }
    Ok(json!({ "success": true }))
}

// ---------------------------------------------------------------------
// sampling/createMessage
// ---------------------------------------------------------------------

async fn handle_sampling_create_message(coordinator: &Coordinator, params: &Value) -> Result<Value, RpcError> {
    let provider = coordinator
        .llm_provider
        .as_ref()
        .ok_or_else(crate::domain::error::sampling_unavailable_error)?;

    let messages = params
        .get("messages")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| invalid_params("messages"))?;
    let max_tokens = params.get("maxTokens").and_then(Value::as_u64).map(|v| v as u32);

    let response = provider
        .create_message(SamplingRequest { messages, max_tokens })
        .await?;

    Ok(json!({
        "content": response.content,
        "model": response.model,
    }))
}
