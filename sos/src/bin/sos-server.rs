use anyhow::Result;
use sos::proxy::ProxyContextBuilder;
use tracing::info;

fn main() -> Result<()> {
    let context = ProxyContextBuilder::from_cli()?.try_build_and_start()?;
    context.log_configuration();

    let result = context.wait_for_termination();
    info!("shutting down sos-server");
    context.shutdown()?;
    result
}
