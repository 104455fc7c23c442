use expense_agent_router::{
    agent::AgentRuntime,
    audit::InMemoryExecutionLog,
    config::AgentConfig,
    events::TracingEventSink,
    models::{ExecutionContext, RouterInput},
    reasoning::ReasoningClient,
    router::RouterAgent,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Expense agent router starting");

    // Create components
    let config = AgentConfig::from_env();
    let reasoning = Arc::new(ReasoningClient::new(
        config.gemini_api_key.clone(),
        config.retry.clone(),
    ));
    let runtime = AgentRuntime::new(
        reasoning,
        Arc::new(InMemoryExecutionLog::new()),
        Arc::new(TracingEventSink),
    );
    let router = RouterAgent::new(&config);

    // Route the message given on the command line, or a sample one
    let message = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let message = if message.is_empty() {
        "I spent ₹450 on groceries at BigBasket yesterday".to_string()
    } else {
        message
    };

    let ctx = ExecutionContext::new(Uuid::new_v4(), Uuid::new_v4());
    let input = RouterInput::from_text(message);

    info!(
        request_id = ?ctx.request_id,
        message = %input.text_content(),
        "Routing request"
    );

    match runtime.run(&router, &ctx, input).await {
        Ok(decision) => {
            println!("\n=== ROUTING DECISION ===");
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Routing failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
