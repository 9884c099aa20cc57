use ephemera_api::setup;
use ephemera_api::telemetry;
use ephemera_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_telemetry(config.log_format())?;

    // Initialize the application (storage, orchestrator, routes)
    let (_state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
