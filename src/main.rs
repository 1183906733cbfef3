use gantry::{app::AppCell, config::AppConfig, discovery::EchoRegistrar, telemetry};
use std::sync::Arc;

static APP: AppCell = AppCell::new();

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    may::config().set_stack_size(config.stack_size);
    telemetry::init(config.mode);

    let app = APP.bootstrap(config, &EchoRegistrar)?;

    // Hot reload of handler files is a development concern only.
    let mode = app.config().mode;
    if !mode.is_production() && !mode.is_test() {
        app.watch_handlers(Arc::new(EchoRegistrar))?;
    }

    if app.join().is_err() {
        anyhow::bail!("server exited abnormally");
    }
    Ok(())
}
