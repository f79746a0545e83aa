use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::background_service::SweepRunner;
use crate::config;
use crate::infrastructure::service_provider::ServiceProvider;

pub fn run() {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_run());
}

pub async fn async_run() {
    let config = match config::build_config() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build config".red(), e);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let service_provider = match ServiceProvider::build(&config).await {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build service provider".red(), e);
        }
    };
    let runner = SweepRunner::new(
        config.sweep.interval_secs,
        config.sweep.batch_size,
        service_provider.sweep_service.clone(),
    );
    info!("Upload broker started.");
    tokio::select! {
        _ = runner.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping services (ctrl-c handling).");
            std::process::exit(0);
        }
    }
}
