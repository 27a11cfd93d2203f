//! Forecast API Server Binary
//!
//! Run with: `cargo run --bin forecast-server`

use demand_forecast::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server(); RUST_LOG controls the level:
    //   RUST_LOG=debug cargo run --bin forecast-server

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse::<u16>()
        .unwrap_or(8000);
    let forecast_path =
        std::env::var("FORECAST_PATH").unwrap_or_else(|_| "reports/forecast.csv".to_string());

    let config = ServerConfig::new(host, port, forecast_path);

    println!("Starting Forecast API Server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Forecast file: {}", config.forecast_path);
    println!();
    println!(
        "Server will be available at: http://{}:{}",
        config.host, config.port
    );
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                                   - Health check");
    println!("  GET  /forecast?store_id=&item_id=&limit=       - Forecast rows of one series");
    println!();

    run_server(config).await?;

    Ok(())
}
