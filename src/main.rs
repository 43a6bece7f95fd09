use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean JSON envelope.
    let filter = EnvFilter::try_from_env("FLEETSTORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    fleetstore::run()?;
    Ok(())
}
