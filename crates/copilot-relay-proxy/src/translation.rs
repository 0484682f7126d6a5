//! Anthropic <-> Copilot (OpenAI `chat/completions`) translation.
//!
//! - Anthropic `/v1/messages` request -> `chat/completions` request body
//! - `chat/completions` response -> Anthropic `/v1/messages` response

use serde_json::{json, Map, Value};

use crate::error::TranslationError;
use crate::types::{
    ContentBlock, MessagesRequest, MessagesResponse, Role, ToolChoice, Usage,
};

/// Convert an Anthropic Messages request into a `chat/completions` payload.
pub fn to_chat_completion(req: &MessagesRequest) -> Result<Value, TranslationError> {
    let mut out_messages: Vec<Value> = Vec::new();

    if let Some(system) = &req.system {
        let system_text = system.to_plaintext();
        if !system_text.is_empty() {
            out_messages.push(json!({"role": "system", "content": system_text}));
        }
    }

    for msg in &req.messages {
        let role = msg.role.as_str();

        let mut parts: Vec<Value> = Vec::new();
        let mut text = String::new();
        let mut tool_calls: Vec<Value> = Vec::new();

        for block in msg.content.as_blocks() {
            match block {
                ContentBlock::Text { text: t } => {
                    if parts.is_empty() {
                        text.push_str(&t);
                    } else {
                        parts.push(json!({"type": "text", "text": t}));
                    }
                }
                ContentBlock::Image { source } => {
                    // Switch to multi-part content.
                    if parts.is_empty() && !text.is_empty() {
                        parts.push(json!({"type": "text", "text": std::mem::take(&mut text)}));
                    }
                    let url = format!("data:{};base64,{}", source.media_type, source.data);
                    parts.push(json!({"type": "image_url", "image_url": {"url": url}}));
                }
                ContentBlock::ToolUse { id, name, input } => {
                    let arguments = serde_json::to_string(&input).map_err(|e| {
                        TranslationError::new(format!("tool_use input for {}: {}", name, e))
                    })?;
                    tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }));
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => {
                    // Tool results must directly follow the assistant turn that
                    // issued the call, so flush preceding user content first.
                    if let Some(pending) = take_content(&mut parts, &mut text) {
                        out_messages.push(json!({"role": role, "content": pending}));
                    }
                    out_messages.push(json!({
                        "role": "tool",
                        "tool_call_id": tool_use_id,
                        "content": content.to_plaintext(),
                    }));
                }
                ContentBlock::Thinking { .. } => {}
            }
        }

        let mut msg_obj = Map::new();
        msg_obj.insert("role".to_string(), json!(role));
        if let Some(content) = take_content(&mut parts, &mut text) {
            msg_obj.insert("content".to_string(), content);
        }
        if !tool_calls.is_empty() {
            msg_obj.insert("tool_calls".to_string(), Value::Array(tool_calls));
        }

        // Skip empty messages unless they carry tool calls.
        if msg_obj.len() > 1 {
            out_messages.push(Value::Object(msg_obj));
        }
    }

    let mut out = json!({
        "model": req.model,
        "messages": out_messages,
        "max_tokens": req.max_tokens,
    });

    if req.is_stream() {
        out["stream"] = json!(true);
        out["stream_options"] = json!({"include_usage": true});
    }
    if let Some(t) = req.temperature {
        out["temperature"] = json!(t);
    }
    if let Some(tp) = req.top_p {
        out["top_p"] = json!(tp);
    }
    if let Some(stop) = &req.stop_sequences {
        out["stop"] = json!(stop);
    }
    if let Some(user_id) = req
        .metadata
        .as_ref()
        .and_then(|m| m.get("user_id"))
        .and_then(|v| v.as_str())
    {
        out["user"] = json!(user_id);
    }

    if let Some(tools) = &req.tools {
        let mapped: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect();
        out["tools"] = Value::Array(mapped);
    }

    if let Some(choice) = &req.tool_choice {
        out["tool_choice"] = match choice {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::Any => json!("required"),
            ToolChoice::None => json!("none"),
            ToolChoice::Tool { name } => json!({
                "type": "function",
                "function": {"name": name}
            }),
        };
    }

    Ok(out)
}

fn take_content(parts: &mut Vec<Value>, text: &mut String) -> Option<Value> {
    if !parts.is_empty() {
        Some(Value::Array(std::mem::take(parts)))
    } else if !text.is_empty() {
        Some(Value::String(std::mem::take(text)))
    } else {
        None
    }
}

/// Convert a `chat/completions` response into an Anthropic Messages response.
///
/// Copilot may split text and tool calls across several choices; all of them
/// are merged into one content list.
pub fn from_chat_completion(
    resp: Value,
    requested_model: &str,
) -> Result<MessagesResponse, TranslationError> {
    let id = resp
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("msg_unknown")
        .to_string();

    let model = resp
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or(requested_model)
        .to_string();

    let choices = resp
        .get("choices")
        .and_then(|v| v.as_array())
        .filter(|arr| !arr.is_empty())
        .ok_or_else(|| TranslationError::new("missing choices[0]"))?;

    let mut content: Vec<ContentBlock> = Vec::new();
    let mut finish_reason: Option<String> = None;

    for choice in choices {
        let msg = choice
            .get("message")
            .ok_or_else(|| TranslationError::new("missing choices[].message"))?;

        if let Some(text) = msg.get("content").and_then(|c| c.as_str()) {
            if !text.is_empty() {
                content.push(ContentBlock::Text {
                    text: text.to_string(),
                });
            }
        }

        for call in msg
            .get("tool_calls")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
        {
            content.push(tool_call_to_block(call)?);
        }

        if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
            // A tool_calls finish on any choice wins over a plain stop.
            if finish_reason.as_deref() != Some("tool_calls") {
                finish_reason = Some(reason.to_string());
            }
        }
    }

    Ok(MessagesResponse {
        id,
        kind: "message".to_string(),
        role: Role::Assistant,
        content,
        model,
        stop_reason: finish_reason.as_deref().map(map_finish_reason),
        stop_sequence: None,
        usage: usage_from(resp.get("usage")),
    })
}

fn tool_call_to_block(call: &Value) -> Result<ContentBlock, TranslationError> {
    let id = call
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("toolcall_unknown")
        .to_string();
    let func = call
        .get("function")
        .ok_or_else(|| TranslationError::new("tool_calls[].function missing"))?;
    let name = func
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let args = func
        .get("arguments")
        .and_then(|v| v.as_str())
        .unwrap_or("{}");
    let input: Value = serde_json::from_str(args).unwrap_or_else(|_| json!({"raw": args}));

    Ok(ContentBlock::ToolUse { id, name, input })
}

/// Read OpenAI-style usage, tolerating missing fields.
pub(crate) fn usage_from(usage: Option<&Value>) -> Usage {
    let Some(u) = usage.and_then(|u| u.as_object()) else {
        return Usage::default();
    };
    let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    Usage {
        input_tokens: field("prompt_tokens"),
        output_tokens: field("completion_tokens"),
    }
}

pub(crate) fn map_finish_reason(reason: &str) -> String {
    match reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" | "function_call" => "tool_use",
        "content_filter" => "refusal",
        other => other,
    }
    .to_string()
}
