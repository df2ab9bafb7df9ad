//! MCP tool definitions and handlers.
//!
//! Each tool is defined as a JSON schema (returned by [`tool_definitions`])
//! and handled by an async function dispatched from [`handle_tool_call`].
//!
//! ## Tool categories
//!
//! **Read tools** decode a snapshot:
//! - `device_list`, `device_get`, `sensor_list`, `group_status`
//!
//! **Switch tools** send one command each:
//! - `{relay,pca,pwm,group}_{on,off,toggle}`
//! - `pca_set`, `pwm_set`
//!
//! **Escape hatch**:
//! - `command_send` — raw `key=value&...` string

use serde_json::{json, Value};

use crate::adapter::{Adapter, Detail};
use crate::command::{normalize_percent, Action};
use crate::error::Error;
use crate::snapshot::DeviceKind;

/// Returns every tool definition, in catalog order.
pub fn tool_definitions() -> Vec<Value> {
    let mut tools = vec![
        json!({
            "name": "device_list",
            "description": "List relays, PCA outputs, PWM outputs and groups with their on/off state and level. Group state is not reported here; use group_status.\n\ndetail='brief' (default) polls the cheap status endpoint, where descriptions may be placeholders like 'Relay 7'. detail='full' reads the expensive endpoint with real descriptions. detail='merged' reads both. Avoid 'full' and 'merged' in tight loops.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "detail": detail_schema(),
                    "type": {
                        "type": "string",
                        "description": "Only list devices of this type.",
                        "enum": ["relay", "pca", "pwm", "group"]
                    }
                },
                "additionalProperties": false
            }
        }),
        json!({
            "name": "device_get",
            "description": "Get one device by id. The type follows from the id: relay 1-100, PWM 101-113, group 500-550, PCA 2001-2128.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "Device id."
                    },
                    "detail": detail_schema()
                },
                "required": ["id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "sensor_list",
            "description": "Read all sensors: temperature (°C), humidity (%), energy (kWh), power (kW), voltage (V), current (A). Each reading includes the raw controller value (hundredths).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "detail": detail_schema()
                },
                "additionalProperties": false
            }
        }),
        json!({
            "name": "group_status",
            "description": "Resolve a group's members against the current full snapshot and report each member's state, whether the group is all on, all off or mixed, and what a toggle would do. Reads the expensive full status endpoint.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "Group id (500-550)."
                    }
                },
                "required": ["id"],
                "additionalProperties": false
            }
        }),
    ];

    for kind in DeviceKind::ALL {
        for action in Action::ALL {
            tools.push(switch_tool_definition(kind, action));
        }
        if matches!(kind, DeviceKind::Pca | DeviceKind::Pwm) {
            tools.push(level_tool_definition(kind));
        }
    }

    tools.push(json!({
        "name": "command_send",
        "description": "Send a raw command string to the controller, e.g. 'r_ON=16&PCA_OFF=2001'. All pairs go out in one request, in the given order. Prefer the typed tools; use this only for commands they don't cover.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "One or more key=value pairs joined by '&'."
                }
            },
            "required": ["command"],
            "additionalProperties": false
        }
    }));

    tools
}

fn detail_schema() -> Value {
    json!({
        "type": "string",
        "description": "Snapshot to read: 'brief' (default), 'full', or 'merged'.",
        "enum": ["brief", "full", "merged"]
    })
}

fn switch_tool_name(kind: DeviceKind, action: Action) -> String {
    format!("{}_{}", kind.as_str(), action.as_str())
}

fn switch_tool_definition(kind: DeviceKind, action: Action) -> Value {
    let range = kind.id_range();
    let verb = match action {
        Action::On => "Turn on",
        Action::Off => "Turn off",
        Action::Toggle => "Toggle",
    };
    let description = match (kind, action) {
        (DeviceKind::Group, Action::Toggle) => format!(
            "{verb} a group of outputs. When members are in mixed states, the controller drives all of them ON if the group's pull-up flag is set, otherwise OFF."
        ),
        (DeviceKind::Group, _) => format!("{verb} a group of outputs."),
        _ => format!("{verb} a {} output.", kind.label()),
    };
    json!({
        "name": switch_tool_name(kind, action),
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": {
                "id": {
                    "type": "integer",
                    "description": format!("{} id ({}-{}).", kind.label(), range.start(), range.end())
                }
            },
            "required": ["id"],
            "additionalProperties": false
        }
    })
}

fn level_tool_definition(kind: DeviceKind) -> Value {
    let range = kind.id_range();
    json!({
        "name": format!("{}_set", kind.as_str()),
        "description": format!(
            "Set the level of a {} output in percent. Values outside 0-100 are clamped and fractions rounded.",
            kind.label()
        ),
        "inputSchema": {
            "type": "object",
            "properties": {
                "id": {
                    "type": "integer",
                    "description": format!("{} id ({}-{}).", kind.label(), range.start(), range.end())
                },
                "percent": {
                    "type": "number",
                    "description": "Target level, 0-100."
                }
            },
            "required": ["id", "percent"],
            "additionalProperties": false
        }
    })
}

/// Result of an MCP tool call, ready to be serialized into a JSON-RPC response.
pub struct ToolResult {
    /// MCP content blocks (a single `{"type":"text","text":"..."}` entry).
    pub content: Vec<Value>,
    /// Whether the tool call failed (maps to `isError` in the MCP response).
    pub is_error: bool,
}

impl ToolResult {
    fn success(text: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": text })],
            is_error: false,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": message })],
            is_error: true,
        }
    }

    fn from_error(err: &Error) -> Self {
        tracing::warn!(error = %err, "tool call failed");
        let mut message = err.to_string();
        if err.is_unauthorized() {
            message.push_str(" (check the configured username and password)");
        }
        Self::error(message)
    }

    /// The text of the first content block.
    pub fn text(&self) -> &str {
        self.content
            .first()
            .and_then(|c| c["text"].as_str())
            .unwrap_or_default()
    }
}

/// Handle a tool call and return MCP content.
pub async fn handle_tool_call(name: &str, args: &Value, adapter: &Adapter) -> ToolResult {
    tracing::debug!(tool = name, "tool call");
    match name {
        "device_list" => handle_device_list(args, adapter).await,
        "device_get" => handle_device_get(args, adapter).await,
        "sensor_list" => handle_sensor_list(args, adapter).await,
        "group_status" => handle_group_status(args, adapter).await,
        "pca_set" => handle_set_level(DeviceKind::Pca, args, adapter).await,
        "pwm_set" => handle_set_level(DeviceKind::Pwm, args, adapter).await,
        "command_send" => handle_command_send(args, adapter).await,
        _ => match parse_switch_tool(name) {
            Some((kind, action)) => handle_switch(kind, action, args, adapter).await,
            None => ToolResult::error(format!("Unknown tool: {}", name)),
        },
    }
}

/// `relay_on` → `(Relay, On)`, etc.
fn parse_switch_tool(name: &str) -> Option<(DeviceKind, Action)> {
    let (kind, action) = name.split_once('_')?;
    let kind = DeviceKind::parse(kind)?;
    let action = Action::ALL.into_iter().find(|a| a.as_str() == action)?;
    Some((kind, action))
}

fn get_id(args: &Value) -> Result<u32, String> {
    let value = args
        .get("id")
        .ok_or_else(|| "Missing required parameter: id".to_string())?;
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    id.and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| format!("Invalid id: {value} (expected a non-negative integer)"))
}

fn get_percent(args: &Value) -> Result<f64, String> {
    let value = args
        .get("percent")
        .ok_or_else(|| "Missing required parameter: percent".to_string())?;
    let percent = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    percent.ok_or_else(|| format!("Invalid percent: {value} (expected a number)"))
}

fn get_detail(args: &Value) -> Result<Detail, String> {
    match args.get("detail").and_then(Value::as_str) {
        None => Ok(Detail::default()),
        Some(s) => Detail::parse(s)
            .ok_or_else(|| format!("Invalid detail '{s}' (expected brief, full or merged)")),
    }
}

async fn handle_device_list(args: &Value, adapter: &Adapter) -> ToolResult {
    let detail = match get_detail(args) {
        Ok(d) => d,
        Err(e) => return ToolResult::error(e),
    };
    let kind = match args.get("type").and_then(Value::as_str) {
        None => None,
        Some(s) => match DeviceKind::parse(s) {
            Some(k) => Some(k),
            None => {
                return ToolResult::error(format!(
                    "Invalid type '{s}' (expected relay, pca, pwm or group)"
                ))
            }
        },
    };

    match adapter.list_devices(detail, kind).await {
        Ok(devices) if devices.is_empty() => ToolResult::success("No devices found.".into()),
        Ok(devices) => {
            let mut lines = vec![format!("{} device(s):", devices.len())];
            lines.extend(devices.iter().map(ToString::to_string));
            ToolResult::success(lines.join("\n"))
        }
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_device_get(args: &Value, adapter: &Adapter) -> ToolResult {
    let id = match get_id(args) {
        Ok(id) => id,
        Err(e) => return ToolResult::error(e),
    };
    let detail = match get_detail(args) {
        Ok(d) => d,
        Err(e) => return ToolResult::error(e),
    };
    if DeviceKind::from_id(id).is_none() {
        return ToolResult::error(format!("Id {id} is outside every device range"));
    }

    match adapter.device(id, detail).await {
        Ok(Some(device)) => ToolResult::success(device.to_string()),
        Ok(None) => ToolResult::error(format!("Device {id} not found in the snapshot")),
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_sensor_list(args: &Value, adapter: &Adapter) -> ToolResult {
    let detail = match get_detail(args) {
        Ok(d) => d,
        Err(e) => return ToolResult::error(e),
    };

    match adapter.list_sensors(detail).await {
        Ok(readings) if readings.is_empty() => ToolResult::success("No sensors found.".into()),
        Ok(readings) => {
            let mut lines = vec![format!("{} sensor(s):", readings.len())];
            lines.extend(readings.iter().map(ToString::to_string));
            ToolResult::success(lines.join("\n"))
        }
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_group_status(args: &Value, adapter: &Adapter) -> ToolResult {
    let id = match get_id(args) {
        Ok(id) => id,
        Err(e) => return ToolResult::error(e),
    };
    if DeviceKind::from_id(id) != Some(DeviceKind::Group) {
        return ToolResult::error(format!("Id {id} is not a group id (500-550)"));
    }

    match adapter.group_status(id).await {
        Ok(Some(status)) => ToolResult::success(status.to_string()),
        Ok(None) => ToolResult::error(format!("Group {id} not found in the snapshot")),
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_switch(
    kind: DeviceKind,
    action: Action,
    args: &Value,
    adapter: &Adapter,
) -> ToolResult {
    let id = match get_id(args) {
        Ok(id) => id,
        Err(e) => return ToolResult::error(e),
    };

    match adapter.switch(kind, id, action).await {
        Ok(batch) => {
            let verb = match action {
                Action::On => "turned on",
                Action::Off => "turned off",
                Action::Toggle => "toggled",
            };
            let mut text = format!("{} {id}: {verb} (sent {batch})", kind.label());
            if kind == DeviceKind::Group && action == Action::Toggle {
                text.push_str(
                    ". If members were mixed, the controller resolves the toggle using the group's pull-up flag.",
                );
            }
            ToolResult::success(text)
        }
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_set_level(kind: DeviceKind, args: &Value, adapter: &Adapter) -> ToolResult {
    let id = match get_id(args) {
        Ok(id) => id,
        Err(e) => return ToolResult::error(e),
    };
    let percent = match get_percent(args) {
        Ok(p) => p,
        Err(e) => return ToolResult::error(e),
    };

    match adapter.set_level(kind, id, percent).await {
        Ok(batch) => ToolResult::success(format!(
            "{} {id}: level set to {}% (sent {batch})",
            kind.label(),
            normalize_percent(percent)
        )),
        Err(e) => ToolResult::from_error(&e),
    }
}

async fn handle_command_send(args: &Value, adapter: &Adapter) -> ToolResult {
    let command = match args.get("command").and_then(Value::as_str) {
        Some(c) => c,
        None => return ToolResult::error("Missing required parameter: command".into()),
    };

    match adapter.send_raw(command).await {
        Ok(batch) => ToolResult::success(format!("Sent {batch}")),
        Err(e) => ToolResult::from_error(&e),
    }
}
