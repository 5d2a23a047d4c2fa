//! Feedback Insights - customer feedback enhancement CLI

use feedback_insights::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install Rustls crypto provider for HTTPS support
    // This is required for Rustls 0.23+
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        anyhow::bail!("Failed to install Rustls crypto provider");
    }

    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .with_writer(std::io::stderr)
        .init();

    // Run CLI
    cli::run().await
}
