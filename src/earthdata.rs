//! NASA Earthdata granule search.
//!
//! Granules are found through the CMR granule search API and downloaded
//! with an Earthdata Login bearer token.

use std::env;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const CMR_GRANULE_SEARCH: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";

/// Earthdata Login bearer token.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(Error::Authentication("empty Earthdata token".to_string()));
        }

        Ok(Credentials { token })
    }

    /// Reads the token from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let token = env::var(var).map_err(|_| {
            Error::Authentication(format!(
                "environment variable `{}` with an Earthdata Login token is not set",
                var
            ))
        })?;

        Credentials::new(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// A collection and an inclusive date range.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleQuery {
    pub short_name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub page_size: usize,
}

impl GranuleQuery {
    pub fn temporal(&self) -> String {
        format!(
            "{}T00:00:00Z,{}T23:59:59Z",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    fn params(&self, page: usize) -> Vec<(&'static str, String)> {
        vec![
            ("short_name", self.short_name.clone()),
            ("temporal", self.temporal()),
            ("page_size", self.page_size.to_string()),
            ("page_num", page.to_string()),
            ("sort_key", "start_date".to_string()),
        ]
    }
}

/// Reference to one remote granule.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleRef {
    pub title: String,
    pub url: String,
}

impl GranuleRef {
    /// Local file name: the last path segment of the data URL.
    pub fn file_name(&self) -> &str {
        self.url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.title)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    #[serde(default)]
    rel: String,
    #[serde(default)]
    inherited: bool,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub granules: Vec<GranuleRef>,
    /// Entries on the page, including those without a data link.
    pub entries: usize,
}

/// Parses one page of a CMR `granules.json` response.
///
/// Entries without a data link are skipped but still counted.
pub fn parse_feed(body: &str) -> Result<FeedPage> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let entries = response.feed.entry.len();

    let granules = response
        .feed
        .entry
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .into_iter()
                .find(|l| !l.inherited && l.rel.ends_with("/data#") && l.href.starts_with("http"))?;
            Some(GranuleRef {
                title: entry.title,
                url: link.href,
            })
        })
        .collect();

    Ok(FeedPage { granules, entries })
}

/// Queries every page of results for `query`.
///
/// Paging stops at the first page holding fewer entries than `page_size`.
pub async fn search(client: &Client, search_url: &str, query: &GranuleQuery) -> Result<Vec<GranuleRef>> {
    let mut granules = Vec::new();
    let mut page = 1;

    loop {
        let response = client
            .get(search_url)
            .query(&query.params(page))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let feed = parse_feed(&body)?;
        debug!(page, entries = feed.entries, granules = feed.granules.len(), "CMR page received");

        granules.extend(feed.granules);
        if feed.entries < query.page_size {
            break;
        }
        page += 1;
    }

    info!(
        short_name = %query.short_name,
        temporal = %query.temporal(),
        "{} granules found",
        granules.len()
    );

    Ok(granules)
}

// -- Tests -------------------------------------------------------------------
