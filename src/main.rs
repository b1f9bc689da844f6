/*!
 * sharemeter - binary entry point
 */

use std::sync::Arc;

use sharemeter::{logging, server, AppState, MeterConfig, Poller, SizeCollector, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = MeterConfig::load()?;
    tracing::info!(
        "sharemeter v{} starting (appliance: {}, share: {})",
        VERSION,
        config.appliance_url,
        config.share_path
    );

    let state = AppState::new(config);
    let collector = Arc::new(SizeCollector::new(state.clone())?);

    // Background trigger: first measurement fires immediately, then on the
    // configured interval
    let poller = Poller::new(state.clone(), collector);
    tokio::spawn(poller.run());

    server::run_server(state).await
}
