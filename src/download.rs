//! Downloads granules into a local cache directory.
//!
//! A granule already present (non-empty, same file name) is reused. Downloads
//! are streamed into a `.part` file and renamed once complete.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    earthdata::{Credentials, GranuleRef},
    error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    Cached(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Downloaded(p) | DownloadOutcome::Cached(p) => p,
        }
    }
}

/// Returns the cached copy of `file_name` in `dir`, if a usable one exists.
pub fn cached_path(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let path = dir.join(file_name);
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
        _ => None,
    }
}

/// Downloads one granule unless it is already cached.
pub async fn download_granule(
    client: &Client,
    credentials: &Credentials,
    granule: &GranuleRef,
    dir: &Path,
    progress_bar: &ProgressBar,
) -> Result<DownloadOutcome> {
    let file_name = granule.file_name();
    if let Some(path) = cached_path(dir, file_name) {
        debug!("reusing cached {}", file_name);
        return Ok(DownloadOutcome::Cached(path));
    }

    let response = client
        .get(&granule.url)
        .bearer_auth(credentials.token())
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Authentication(format!(
            "Earthdata rejected the token for {} (HTTP {})",
            granule.url,
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(Error::Download {
            url: granule.url.clone(),
            status: status.as_u16(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        progress_bar.set_position(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
    }
    progress_bar.set_message(file_name.to_string());

    let path = dir.join(file_name);
    let partial = dir.join(format!("{}.part", file_name));
    let mut file = File::create(&partial)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    file.flush()?;
    drop(file);

    fs::rename(&partial, &path)?;
    info!(bytes = downloaded, "downloaded {}", file_name);

    Ok(DownloadOutcome::Downloaded(path))
}

/// Downloads every granule in order, one at a time.
pub async fn download_all(
    client: &Client,
    credentials: &Credentials,
    granules: &[GranuleRef],
    dir: &Path,
) -> Result<Vec<DownloadOutcome>> {
    fs::create_dir_all(dir)?;

    let overall = crate::progress::create_progress_bar(
        granules.len() as u64,
        "Downloading granules...".to_string(),
    );
    let current = ProgressBar::hidden();
    let mut outcomes = Vec::with_capacity(granules.len());

    for granule in granules {
        let outcome = download_granule(client, credentials, granule, dir, &current).await?;
        outcomes.push(outcome);
        overall.inc(1);
    }

    let cached = outcomes
        .iter()
        .filter(|o| matches!(o, DownloadOutcome::Cached(_)))
        .count();
    overall.finish_with_message(format!(
        "Granules ready ({} downloaded, {} cached)",
        outcomes.len() - cached,
        cached
    ));

    Ok(outcomes)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn granule(name: &str) -> GranuleRef {
        GranuleRef {
            title: name.to_string(),
            url: format!("https://example.invalid/data/{}", name),
        }
    }

    #[test]
    fn should_find_cached_granule() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.HDF5"), b"data").unwrap();

        assert_eq!(
            cached_path(dir.path(), "a.HDF5"),
            Some(dir.path().join("a.HDF5"))
        );
        assert_eq!(cached_path(dir.path(), "b.HDF5"), None);
    }

    #[test]
    fn should_ignore_empty_cached_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.HDF5"), b"").unwrap();

        assert_eq!(cached_path(dir.path(), "a.HDF5"), None);
    }

    #[tokio::test]
    async fn should_reuse_cache_without_network() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.HDF5"), b"data").unwrap();

        let client = Client::new();
        let credentials = Credentials::new("token").unwrap();
        let outcome = download_granule(
            &client,
            &credentials,
            &granule("a.HDF5"),
            dir.path(),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, DownloadOutcome::Cached(dir.path().join("a.HDF5")));
    }
}
