//! Streaming conversion (SSE).
//!
//! Copilot streams `chat/completions` as `data: {json}` frames ending with
//! `data: [DONE]`. Anthropic clients expect `message_start`,
//! `content_block_*`, `message_delta` and `message_stop` events instead.

use async_stream::try_stream;
use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::translation::{map_finish_reason, usage_from};
use crate::types::Usage;
use crate::upstream::{ByteStream, UpstreamError};

/// Translate an upstream `chat/completions` SSE body into Anthropic SSE frames.
pub fn translate_stream(
    upstream: ByteStream,
    model: String,
) -> impl Stream<Item = Result<Bytes, UpstreamError>> + Send + 'static {
    try_stream! {
        let mut events = upstream.eventsource();

        let mut started = false;
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        // Anthropic block indexes are allocated in order of appearance.
        let mut next_block = 0usize;
        let mut text_block: Option<usize> = None;
        // Upstream tool-call index -> Anthropic block index.
        let mut tool_blocks: BTreeMap<u64, usize> = BTreeMap::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(stream_error)?;
            let data = event.data.as_str();
            if data.trim() == "[DONE]" {
                break;
            }

            let v: Value = serde_json::from_str(data).map_err(|e| {
                UpstreamError::Decode(format!("invalid SSE payload {}: {}", data, e))
            })?;

            if v.get("usage").map_or(false, |u| u.is_object()) {
                usage = usage_from(v.get("usage"));
            }

            if !started {
                started = true;
                let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("msg_unknown");
                yield sse_event("message_start", &json!({
                    "type": "message_start",
                    "message": {
                        "id": id,
                        "type": "message",
                        "role": "assistant",
                        "model": model,
                        "content": [],
                        "stop_reason": null,
                        "stop_sequence": null,
                        "usage": {"input_tokens": usage.input_tokens, "output_tokens": 0}
                    }
                }));
            }

            let Some(choice) = v.get("choices").and_then(|c| c.as_array()).and_then(|c| c.first()) else {
                continue;
            };

            if let Some(reason) = choice.get("finish_reason").and_then(|x| x.as_str()) {
                finish_reason = Some(reason.to_string());
            }

            let delta = choice.get("delta");

            if let Some(text) = delta.and_then(|d| d.get("content")).and_then(|c| c.as_str()) {
                if !text.is_empty() {
                    let index = match text_block {
                        Some(index) => index,
                        None => {
                            let index = next_block;
                            next_block += 1;
                            text_block = Some(index);
                            yield sse_event("content_block_start", &json!({
                                "type": "content_block_start",
                                "index": index,
                                "content_block": {"type": "text", "text": ""}
                            }));
                            index
                        }
                    };
                    yield sse_event("content_block_delta", &json!({
                        "type": "content_block_delta",
                        "index": index,
                        "delta": {"type": "text_delta", "text": text}
                    }));
                }
            }

            let tool_calls = delta
                .and_then(|d| d.get("tool_calls"))
                .and_then(|tc| tc.as_array())
                .cloned()
                .unwrap_or_default();

            for call in tool_calls {
                let upstream_index = call.get("index").and_then(|x| x.as_u64()).unwrap_or(0);
                let func = call.get("function");

                let index = match tool_blocks.get(&upstream_index) {
                    Some(index) => *index,
                    None => {
                        // The text block, if any, is finished once a tool call starts.
                        if let Some(text_index) = text_block.take() {
                            yield sse_event("content_block_stop", &json!({
                                "type": "content_block_stop",
                                "index": text_index
                            }));
                        }

                        let index = next_block;
                        next_block += 1;
                        tool_blocks.insert(upstream_index, index);

                        let id = call.get("id").and_then(|x| x.as_str()).unwrap_or("toolcall_unknown");
                        let name = func.and_then(|f| f.get("name")).and_then(|x| x.as_str()).unwrap_or("unknown");
                        yield sse_event("content_block_start", &json!({
                            "type": "content_block_start",
                            "index": index,
                            "content_block": {"type": "tool_use", "id": id, "name": name, "input": {}}
                        }));
                        index
                    }
                };

                let args = func.and_then(|f| f.get("arguments")).and_then(|x| x.as_str()).unwrap_or("");
                if !args.is_empty() {
                    yield sse_event("content_block_delta", &json!({
                        "type": "content_block_delta",
                        "index": index,
                        "delta": {"type": "input_json_delta", "partial_json": args}
                    }));
                }
            }
        }

        if !started {
            Err::<(), _>(UpstreamError::Decode(
                "upstream stream ended before any event".to_string(),
            ))?;
        }

        let mut open: Vec<usize> = text_block.into_iter().chain(tool_blocks.into_values()).collect();
        open.sort_unstable();
        for index in open {
            yield sse_event("content_block_stop", &json!({"type": "content_block_stop", "index": index}));
        }

        yield sse_event("message_delta", &json!({
            "type": "message_delta",
            "delta": {
                "stop_reason": finish_reason.as_deref().map(map_finish_reason),
                "stop_sequence": null
            },
            "usage": {"input_tokens": usage.input_tokens, "output_tokens": usage.output_tokens}
        }));
        yield sse_event("message_stop", &json!({"type": "message_stop"}));
    }
}

fn sse_event(event: &str, data: &Value) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", event, data))
}

fn stream_error(err: EventStreamError<UpstreamError>) -> UpstreamError {
    match err {
        EventStreamError::Transport(e) => e,
        other => UpstreamError::Decode(other.to_string()),
    }
}
