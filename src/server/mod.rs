//! REST API serving the latest forecast artifact

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::{ForecastPoint, ForecastResponse};
pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 8000)
    pub port: u16,
    /// Forecast artifact to serve
    pub forecast_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            forecast_path: "reports/forecast.csv".to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(host: impl Into<String>, port: u16, forecast_path: impl Into<String>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            forecast_path: forecast_path.into(),
        }
    }
}

/// Runs the API server
///
/// The artifact does not need to exist at startup; `/forecast` answers 404
/// until it does.
///
/// # Example
/// ```rust,no_run
/// use demand_forecast::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_server(ServerConfig::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let state = Arc::new(AppState::new(&config.forecast_path));
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(forecast_path = %config.forecast_path, "Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
