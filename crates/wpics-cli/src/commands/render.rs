//! Render command: fetches the feed once and writes the calendar.
//!
//! Nothing is published and the snapshot is left alone.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::info;
use wpics_server::{Pipeline, ServerConfig, mailbox};
use wpics_source::{HttpFetcher, RemoteFetcher};

use crate::error::CliResult;

/// Renders the feed to `output`, or stdout when none is given.
pub async fn run(config: &ServerConfig, output: Option<&Path>) -> CliResult<()> {
    config.validate()?;
    let fetcher: Arc<dyn RemoteFetcher> = Arc::new(HttpFetcher::new()?);
    render_with(config, fetcher, output).await
}

/// Renders the feed with the given fetcher.
pub async fn render_with(
    config: &ServerConfig,
    fetcher: Arc<dyn RemoteFetcher>,
    output: Option<&Path>,
) -> CliResult<()> {
    let (sender, _feed) = mailbox();
    let pipeline = Pipeline::new(config, fetcher, sender);
    let document = pipeline.render().await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, document.as_bytes()).await?;
            info!(
                path = %path.display(),
                bytes = document.as_bytes().len(),
                fingerprint = %document.fingerprint(),
                "Calendar written"
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(document.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
