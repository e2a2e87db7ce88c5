//! Token usage accounting across a run
//!
//! [`Usage`] records a single model call; [`UsageStats`] aggregates an entire
//! run with breakdowns by model and by agent. The cost table is a rough
//! estimate and should be kept in sync with current provider pricing.

use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Token usage for a single model call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the input prompt
    pub prompt_tokens: usize,

    /// Tokens in the generated completion
    pub completion_tokens: usize,

    /// Prompt + completion
    pub total_tokens: usize,

    /// Number of API requests, typically 1 per `Usage` instance
    pub request_count: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            request_count: 1,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_usage(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.request_count += other.request_count;
    }

    /// Rough cost estimate in dollars, per 1K tokens.
    pub fn estimate_cost(&self, model: &str) -> f64 {
        let (prompt_price, completion_price) = match model {
            "gpt-4o" => (0.0025, 0.01),
            "gpt-4o-mini" => (0.00015, 0.0006),
            "o3-mini" => (0.0011, 0.0044),
            "gpt-4" | "gpt-4-0613" => (0.03, 0.06),
            "gpt-3.5-turbo" | "gpt-3.5-turbo-0613" => (0.0015, 0.002),
            _ => (0.002, 0.002),
        };

        let prompt_cost = (self.prompt_tokens as f64 / 1000.0) * prompt_price;
        let completion_cost = (self.completion_tokens as f64 / 1000.0) * completion_price;

        prompt_cost + completion_cost
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            request_count: self.request_count + other.request_count,
        }
    }
}

/// Aggregated usage across an entire run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total usage across all models and agents
    pub total: Usage,

    /// Usage broken down by model name
    pub by_model: std::collections::HashMap<String, Usage>,

    /// Usage broken down by agent name
    pub by_agent: std::collections::HashMap<String, Usage>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one model call, updating the total and both breakdowns.
    pub fn record(&mut self, model: &str, agent: &str, usage: Usage) {
        self.total.add_usage(&usage);

        self.by_model
            .entry(model.to_string())
            .and_modify(|u| u.add_usage(&usage))
            .or_insert(usage.clone());

        self.by_agent
            .entry(agent.to_string())
            .and_modify(|u| u.add_usage(&usage))
            .or_insert(usage);
    }

    /// Total estimated cost across all models.
    pub fn total_cost(&self) -> f64 {
        self.by_model
            .iter()
            .map(|(model, usage)| usage.estimate_cost(model))
            .sum()
    }

    /// Human-readable summary report.
    pub fn summary(&self) -> String {
        let mut report = format!(
            "Usage Summary:\n\
             Total Tokens: {}\n\
             Total Requests: {}\n\
             Estimated Cost: ${:.4}\n",
            self.total.total_tokens,
            self.total.request_count,
            self.total_cost()
        );

        if !self.by_model.is_empty() {
            report.push_str("\nBy Model:\n");
            for (model, usage) in &self.by_model {
                report.push_str(&format!(
                    "  {}: {} tokens, ${:.4}\n",
                    model,
                    usage.total_tokens,
                    usage.estimate_cost(model)
                ));
            }
        }

        if !self.by_agent.is_empty() {
            report.push_str("\nBy Agent:\n");
            for (agent, usage) in &self.by_agent {
                report.push_str(&format!(
                    "  {}: {} tokens, {} requests\n",
                    agent, usage.total_tokens, usage.request_count
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_creation() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.total_tokens, 150);
        assert_eq!(usage.request_count, 1);
    }

    #[test]
    fn test_usage_add() {
        let mut usage1 = Usage::new(100, 50);
        usage1.add_usage(&Usage::new(200, 100));

        assert_eq!(usage1.prompt_tokens, 300);
        assert_eq!(usage1.total_tokens, 450);
        assert_eq!(usage1.request_count, 2);

        let combined = Usage::new(100, 50) + Usage::new(200, 100);
        assert_eq!(combined.total_tokens, 450);
    }

    #[test]
    fn test_cost_estimation() {
        let usage = Usage::new(1000, 500);

        let gpt4o_cost = usage.estimate_cost("gpt-4o");
        assert!((gpt4o_cost - 0.0075).abs() < 1e-9);

        let gpt35_cost = usage.estimate_cost("gpt-3.5-turbo");
        assert!((gpt35_cost - 0.0025).abs() < 1e-9);
    }

    #[test]
    fn test_usage_stats() {
        let mut stats = UsageStats::new();

        stats.record("gpt-4o", "Triage", Usage::new(100, 50));
        stats.record("gpt-4o", "Spanish", Usage::new(200, 100));
        stats.record("o3-mini", "Triage", Usage::new(300, 150));

        assert_eq!(stats.total.total_tokens, 900);
        assert_eq!(stats.total.request_count, 3);
        assert_eq!(stats.by_model.len(), 2);
        assert_eq!(stats.by_agent.len(), 2);
        assert_eq!(stats.by_agent.get("Triage").unwrap().total_tokens, 600);
    }

    #[test]
    fn test_usage_stats_summary() {
        let mut stats = UsageStats::new();
        stats.record("gpt-4o", "Weather", Usage::new(1000, 500));

        let summary = stats.summary();
        assert!(summary.contains("Total Tokens: 1500"));
        assert!(summary.contains("By Model:"));
        assert!(summary.contains("gpt-4o"));
        assert!(summary.contains("Weather"));
    }

    #[test]
    fn test_empty_usage() {
        let usage = Usage::empty();
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(usage.request_count, 0);
    }
}
