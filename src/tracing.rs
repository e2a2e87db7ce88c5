//! Run-level trace spans
//!
//! Each run carries a [`TracingContext`] that collects spans for agent turns,
//! model generations, tool executions, and handoffs. Span collection can be
//! switched off per run; the RAII builders then become no-ops while regular
//! `tracing` log events still fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::usage::Usage;

/// Unique identifier for a trace (one end-to-end run)
pub type TraceId = String;

/// Unique identifier for a span
pub type SpanId = String;

pub fn gen_trace_id() -> TraceId {
    Uuid::new_v4().to_string()
}

pub fn gen_span_id() -> SpanId {
    Uuid::new_v4().to_string()
}

/// The kinds of work a span can represent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpanType {
    /// One agent turn
    Agent {
        agent_name: String,
        instructions: String,
    },
    /// One model call
    Generation {
        model: String,
        prompt_tokens: usize,
        completion_tokens: usize,
    },
    /// One tool execution
    Tool {
        tool_name: String,
        arguments: serde_json::Value,
    },
    /// A delegation from one agent to another
    Handoff {
        from_agent: String,
        to_agent: String,
        reason: Option<String>,
    },
}

/// A single span in a trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub trace_id: TraceId,
    /// Parent span, if this span is nested
    pub parent_id: Option<SpanId>,
    pub span_type: SpanType,
    pub start_time: DateTime<Utc>,
    /// `None` while the span is in progress
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Span {
    pub fn new(trace_id: TraceId, parent_id: Option<SpanId>, span_type: SpanType) -> Self {
        Self {
            id: gen_span_id(),
            trace_id,
            parent_id,
            span_type,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn complete(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.complete();
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

/// Collects spans for one run
pub struct TracingContext {
    trace_id: TraceId,
    enabled: bool,
    current_span_id: Option<SpanId>,
    spans: Vec<Span>,
}

impl TracingContext {
    pub fn new() -> Self {
        let trace_id = gen_trace_id();
        info!(trace_id = %trace_id, "Starting new trace");

        Self {
            trace_id,
            enabled: true,
            current_span_id: None,
            spans: Vec::new(),
        }
    }

    /// A context that keeps its trace id but records no spans.
    pub fn disabled() -> Self {
        Self {
            trace_id: gen_trace_id(),
            enabled: false,
            current_span_id: None,
            spans: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts a span as a child of the current active span.
    ///
    /// Returns an empty id when span collection is disabled.
    pub fn start_span(&mut self, span_type: SpanType) -> SpanId {
        if !self.enabled {
            return SpanId::new();
        }

        let span = Span::new(
            self.trace_id.clone(),
            self.current_span_id.clone(),
            span_type.clone(),
        );
        let span_id = span.id.clone();

        match &span_type {
            SpanType::Agent { agent_name, .. } => {
                info!(span_id = %span_id, agent = %agent_name, "Starting agent span");
            }
            SpanType::Tool { tool_name, .. } => {
                debug!(span_id = %span_id, tool = %tool_name, "Starting tool span");
            }
            SpanType::Generation { model, .. } => {
                debug!(span_id = %span_id, model = %model, "Starting generation span");
            }
            SpanType::Handoff {
                from_agent,
                to_agent,
                ..
            } => {
                info!(span_id = %span_id, from = %from_agent, to = %to_agent, "Starting handoff span");
            }
        }

        self.spans.push(span);
        self.current_span_id = Some(span_id.clone());
        span_id
    }

    pub fn end_span(&mut self, span_id: &str) {
        if !self.enabled || span_id.is_empty() {
            return;
        }
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            span.complete();

            if let Some(duration) = span.duration_ms() {
                debug!(span_id = %span_id, duration_ms = duration, "Span completed");
            }

            if self.current_span_id.as_deref() == Some(span_id) {
                self.current_span_id = span.parent_id.clone();
            }
        }
    }

    pub fn record_error(&mut self, span_id: &str, error: String) {
        if !self.enabled || span_id.is_empty() {
            return;
        }
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            tracing::error!(span_id = %span_id, error = %error, "Span failed");
            span.fail(error);
        }
    }

    /// Records an already-finished handoff as a zero-duration span.
    pub fn record_handoff(&mut self, from: &str, to: &str, reason: Option<String>) {
        let id = self.start_span(SpanType::Handoff {
            from_agent: from.to_string(),
            to_agent: to.to_string(),
            reason,
        });
        self.end_span(&id);
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

impl Default for TracingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII builder for agent-turn spans
pub struct AgentSpan {
    context: Arc<Mutex<TracingContext>>,
    span_id: SpanId,
}

impl AgentSpan {
    pub fn new(
        context: Arc<Mutex<TracingContext>>,
        agent_name: String,
        instructions: String,
    ) -> Self {
        let span_id = {
            let mut ctx = context.lock().unwrap();
            ctx.start_span(SpanType::Agent {
                agent_name,
                instructions,
            })
        };

        Self { context, span_id }
    }

    pub fn complete(self) {
        let mut ctx = self.context.lock().unwrap();
        ctx.end_span(&self.span_id);
    }
}

/// RAII builder for tool-execution spans
pub struct ToolSpan {
    context: Arc<Mutex<TracingContext>>,
    span_id: SpanId,
}

impl ToolSpan {
    pub fn new(
        context: Arc<Mutex<TracingContext>>,
        tool_name: String,
        arguments: serde_json::Value,
    ) -> Self {
        let span_id = {
            let mut ctx = context.lock().unwrap();
            ctx.start_span(SpanType::Tool {
                tool_name: tool_name.clone(),
                arguments,
            })
        };

        debug!(tool = %tool_name, "Executing tool");

        Self { context, span_id }
    }

    pub fn success(self) {
        let mut ctx = self.context.lock().unwrap();
        ctx.end_span(&self.span_id);
    }

    pub fn error(self, error: String) {
        let mut ctx = self.context.lock().unwrap();
        ctx.record_error(&self.span_id, error);
    }
}

/// RAII builder for model-generation spans
pub struct GenerationSpan {
    context: Arc<Mutex<TracingContext>>,
    span_id: SpanId,
}

impl GenerationSpan {
    pub fn new(context: Arc<Mutex<TracingContext>>, model: String) -> Self {
        let span_id = {
            let mut ctx = context.lock().unwrap();
            ctx.start_span(SpanType::Generation {
                model: model.clone(),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        };

        Self { context, span_id }
    }

    /// Completes the span, filling in token usage.
    pub fn complete_with_usage(self, usage: Usage) {
        let mut ctx = self.context.lock().unwrap();

        if let Some(span) = ctx.spans.iter_mut().find(|s| s.id == self.span_id) {
            if let SpanType::Generation {
                prompt_tokens,
                completion_tokens,
                ..
            } = &mut span.span_type
            {
                *prompt_tokens = usage.prompt_tokens;
                *completion_tokens = usage.completion_tokens;
            }
        }

        ctx.end_span(&self.span_id);
    }

    pub fn error(self, error: String) {
        let mut ctx = self.context.lock().unwrap();
        ctx.record_error(&self.span_id, error);
    }
}
