//! Result of a completed run

use crate::items::{HandoffItem, RunItem, ToolOutputItem};
use crate::tracing::TraceId;
use crate::usage::UsageStats;

/// Everything a finished run produced.
///
/// A `RunResult` exists only for successful runs; failures propagate as
/// errors instead. The `items` field is the ordered trace of every step
/// taken: messages, tool calls, tool outputs, and handoff markers.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The final natural-language answer
    pub final_output: String,

    /// Ordered trace of steps taken during the run
    pub items: Vec<RunItem>,

    /// Name of the agent that produced the final answer
    pub final_agent: String,

    /// Token usage aggregated across the run
    pub usage: UsageStats,

    /// Trace identifier for this run
    pub trace_id: TraceId,
}

impl RunResult {
    pub fn new(
        final_output: String,
        items: Vec<RunItem>,
        final_agent: String,
        usage: UsageStats,
        trace_id: TraceId,
    ) -> Self {
        Self {
            final_output,
            items,
            final_agent,
            usage,
            trace_id,
        }
    }

    /// The ordered trace of steps.
    pub fn trace(&self) -> &[RunItem] {
        &self.items
    }

    /// Handoff markers in the trace, in order.
    pub fn handoffs(&self) -> Vec<&HandoffItem> {
        self.items
            .iter()
            .filter_map(|item| match item {
                RunItem::Handoff(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Tool outputs in the trace, in order.
    pub fn tool_outputs(&self) -> Vec<&ToolOutputItem> {
        self.items
            .iter()
            .filter_map(|item| match item {
                RunItem::ToolOutput(o) => Some(o),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{MessageItem, Role};
    use chrono::Utc;

    #[test]
    fn test_trace_accessors() {
        let items = vec![
            RunItem::Message(MessageItem::now(Role::Assistant, "routing")),
            RunItem::Handoff(HandoffItem {
                id: "h1".to_string(),
                from_agent: "Triage".to_string(),
                to_agent: "Spanish".to_string(),
                reason: None,
                created_at: Utc::now(),
            }),
            RunItem::ToolOutput(ToolOutputItem::success(
                "call_1",
                serde_json::json!("sunny"),
            )),
        ];

        let result = RunResult::new(
            "¡Estoy bien, gracias!".to_string(),
            items,
            "Spanish".to_string(),
            UsageStats::new(),
            "trace-1".to_string(),
        );

        assert_eq!(result.trace().len(), 3);
        assert_eq!(result.handoffs().len(), 1);
        assert_eq!(result.handoffs()[0].to_agent, "Spanish");
        assert_eq!(result.tool_outputs().len(), 1);
        assert_eq!(result.final_agent, "Spanish");
    }
}
