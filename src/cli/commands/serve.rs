//! Server command.

use console::style;

use crate::config::Settings;

/// Start the local API server.
pub async fn cmd_serve(
    settings: &Settings,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server_host.clone());
    let port = port.unwrap_or(settings.server_port);

    println!(
        "{} Serving {} on http://{}:{} (OCR via {})",
        style("→").cyan(),
        settings.data_dir.display(),
        host,
        port,
        settings.api_base
    );
    crate::server::serve(settings, &host, port).await
}
