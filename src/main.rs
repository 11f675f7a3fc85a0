//! NephroCheck: CKD risk screening
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nephrocheck::adapters::sanitize::SanitizingMakeWriter;
use nephrocheck::config::AppConfig;
use nephrocheck::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Writing logs to the terminal corrupts the TUI (alternate screen), so an
    // interactive session logs to a file unless told otherwise.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        let file = config.open_log_file()?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    tracing::info!("Starting NephroCheck...");

    // Refuse to start without a verified model.
    let mut app = App::new(&config)?;
    app.run()?;

    tracing::info!("NephroCheck shutdown complete.");
    Ok(())
}
