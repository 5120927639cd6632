use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_engine::{AppState, config::EngineConfig, create_router, service::MockTripService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trip_engine=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(
        "trip service: in-process mock, latency {:?}, user {}",
        config.mock_latency,
        config.user_id
    );

    let addr = config.bind_addr;
    let service = MockTripService::shared(config.mock_latency);
    let app = create_router(AppState::new(config, service));

    tracing::info!("starting trip engine on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
