use anyhow::Result;
use sos::node::NodeContextBuilder;
use tracing::info;

fn main() -> Result<()> {
    let context = NodeContextBuilder::from_cli()?.try_build_and_start()?;
    context.log_configuration();

    let result = context.wait_for_termination();
    info!("shutting down blob-server");
    context.shutdown()?;
    result
}
