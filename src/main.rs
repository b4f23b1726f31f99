use tokio::net::TcpListener;
use tracing::{error, info};

use user_service::build_app;
use user_service::infrastructure::config::Config;
use user_service::infrastructure::logger::Logger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Logger::init(&config.logging);

    info!("Starting ProxySQL CRUD service...");

    let app = build_app(&config).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        e
    })?;

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    info!("🚀 Server running on http://{}", addr);
    info!("   GET    /                   - Service info");
    info!("   GET    /health             - Backend reachability");
    info!("   GET    /users              - List users (?skip=0&limit=10)");
    info!("   POST   /users              - Create user");
    info!("   GET    /users/:id          - Get user by ID");
    info!("   PUT    /users/:id          - Update user");
    info!("   DELETE /users/:id          - Delete user");
    info!("   GET    /users/search/:q    - Search users by name or email");
    info!("   POST   /users/sample       - Create sample users");
    info!("   GET    /proxysql/stats     - Backend routing information");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
