use checkout_service::{config::Config, Application};
use service_core::observability::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info,checkout_service=debug");

    let config = Config::from_env()?;
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
