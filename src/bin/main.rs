use financial_research_agent::{ResearchAgent, ResearchConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ResearchConfig::from_env()?;
    let agent = ResearchAgent::from_config(&config)?;

    info!("Financial research agent ready");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let answer = agent.run(&args.join(" ")).await;
        println!("{}", answer);
        return Ok(());
    }

    println!("Ask a financial question (type 'exit' to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") {
            break;
        }

        let answer = agent.run(query).await;
        println!("\n{}\n", answer);
    }

    info!("Goodbye");
    Ok(())
}
