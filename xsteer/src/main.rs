mod capabilities;
mod cli;
mod config;
mod control;
mod datapath;
mod error;
mod runtime;

use tokio::signal;
use tracing::{Level, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{Layer, format::FmtSpan},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

use crate::{datapath::Datapath, runtime::Runtime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Runtime { cli, config } = Runtime::new()?;
    init_tracing(cli.log_level);

    capabilities::check_required_capabilities()?;

    let mut datapath = Datapath::load(&config)?;
    let table = datapath.redirect_table(&config.pin_path)?;

    info!(
        event.name = "xsteer.ready",
        network.interface.name = %config.interface,
        pin.path = %config.pin_path.display(),
        bound_queues = table.len(),
        "redirect point ready, bindings are managed through the pinned map"
    );

    signal::ctrl_c().await?;
    info!(
        event.name = "xsteer.shutdown",
        bound_queues = table.len(),
        "ctrl-c received, shutting down"
    );

    drop(table);
    datapath.shutdown()?;

    Ok(())
}

fn init_tracing(log_level: Level) {
    let mut fmt_layer = Layer::new()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(std::env::var("NO_COLOR").is_err());

    match log_level {
        Level::DEBUG => fmt_layer = fmt_layer.with_file(true).with_line_number(true),
        Level::TRACE => {
            fmt_layer = fmt_layer
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
        }
        _ => {}
    }

    let filter = EnvFilter::new(format!("warn,xsteer={log_level}"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
