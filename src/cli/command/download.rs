use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;
use watershed::{
    config::PrecipConfig,
    download::download_all,
    earthdata::{search, Credentials},
    progress::create_spinner,
};

pub async fn download(config: &PrecipConfig) -> Result<String> {
    let paths = fetch_granules(config).await?;

    Ok(format!(
        "{} granules in {}",
        paths.len(),
        config.data_dir.display()
    ))
}

/// Searches the catalogue and fills the data directory.
///
/// Returns the local path of every granule found, cached or downloaded.
pub async fn fetch_granules(config: &PrecipConfig) -> Result<Vec<PathBuf>> {
    let credentials = Credentials::from_env(&config.token_env)
        .with_context(|| format!("reading the Earthdata token from ${}", config.token_env))?;
    let client = Client::new();

    let spinner = create_spinner(format!("Searching {} granules...", config.short_name));
    let granules = search(&client, &config.search_url, &config.query())
        .await
        .context("granule search failed")?;
    spinner.finish_with_message(format!("Found {} granules", granules.len()));
    info!(count = granules.len(), "granules matched {}", config.query().temporal());

    let outcomes = download_all(&client, &credentials, &granules, &config.data_dir)
        .await
        .with_context(|| format!("downloading into {}", config.data_dir.display()))?;

    Ok(outcomes.iter().map(|o| o.path().to_path_buf()).collect())
}
