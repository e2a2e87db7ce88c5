//! Demonstration entry point
//!
//! Runs three short sequences against the live API and prints each final
//! output:
//!
//! 1. a default-configuration assistant, via the blocking variant;
//! 2. language triage with handoffs to Spanish and English agents on
//!    different model bindings;
//! 3. a weather agent with a function tool on an explicitly-built client.
//!
//! ```bash
//! export OPENAI_API_KEY="your-api-key"
//! cargo run --bin demo
//! ```

use std::sync::Arc;

use agent_relay::{
    tool::FunctionTool, Agent, ClientConfig, Handoff, Result, RunConfig, Runner,
};
use tracing_subscriber::EnvFilter;

fn run_agent_default_config() -> Result<()> {
    let agent = Agent::simple("Assistant", "You are a helpful assistant.");

    let result = Runner::run_sync(agent, "Write a haiku about the ocean.", RunConfig::default())?;
    println!("{}", result.final_output);
    Ok(())
}

async fn run_multi_agent_models(config: &ClientConfig) -> Result<()> {
    let spanish_agent = Agent::simple("Spanish agent", "You only speak Spanish.")
        .with_model("o3-mini");

    let english_agent = Agent::simple("English agent", "You only speak English")
        .with_client_model(config.build_client()?, "gpt-4o");

    let triage_agent = Agent::simple(
        "Triage agent",
        "Handoff to the appropriate agent based on the language of the request.",
    )
    .with_model("gpt-3.5-turbo")
    .with_handoffs(vec![
        Handoff::new(spanish_agent, "Handles Spanish-language requests"),
        Handoff::new(english_agent, "Handles English-language requests"),
    ]);

    let run_config = RunConfig::default()
        .with_client(config.build_client()?)
        .with_tracing(false);

    let result = Runner::run(triage_agent, "Hola, ¿cómo estás?", run_config).await?;
    println!("{}", result.final_output);
    Ok(())
}

async fn run_other_client_as_agent(config: &ClientConfig) -> Result<()> {
    let get_weather = Arc::new(FunctionTool::new(
        "get_weather".to_string(),
        "Gets the current weather for a city.".to_string(),
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City to look up"}
            },
            "required": ["city"]
        }),
        |args| {
            let city = args.get("city").and_then(|v| v.as_str()).unwrap_or("unknown");
            tracing::debug!(city = %city, "Getting weather");
            Ok(serde_json::json!(format!(
                "The weather in {} is 75 degrees and sunny.",
                city
            )))
        },
    ));

    let agent = Agent::simple("Weather agent", "You only respond in haikus.")
        .with_client_model(config.build_client()?, "gpt-3.5-turbo")
        .with_tool(get_weather);

    let result = Runner::run(
        agent,
        "What's the weather in Tokyo??",
        RunConfig::default().with_tracing(false),
    )
    .await?;
    println!("{}", result.final_output);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env()?;

    println!("Default example:");
    run_agent_default_config()?;

    let runtime = tokio::runtime::Runtime::new()?;

    println!("\nMulti-agent example:");
    runtime.block_on(run_multi_agent_models(&config))?;

    println!("\nOther client example:");
    runtime.block_on(run_other_client_as_agent(&config))?;

    Ok(())
}
