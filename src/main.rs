use log::{error, info};
use std::io::Read;
use std::process;

use forge_insight::{
    config::Config, executor::HttpTransport, InsightError, QueryHandler, QueryRequest,
};

fn read_request(path: Option<String>) -> Result<QueryRequest, InsightError> {
    let json = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut json = String::new();
            std::io::stdin().read_to_string(&mut json)?;
            json
        }
    };
    Ok(serde_json::from_str(&json)?)
}

async fn run() -> Result<(), InsightError> {
    let config = Config::new().map_err(|e| {
        error!("Failed to initialize config: {}", e);
        e
    })?;

    let transport = HttpTransport::new(config.api_timeout())?;
    let handler = QueryHandler::from_config(&config, transport)?;
    info!("Using subgraph {}", config.subgraph);

    let request = read_request(std::env::args().nth(1))?;
    let outcome = handler.handle(request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("Query failed: {}", e);
        process::exit(1);
    }
}
