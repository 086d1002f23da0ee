//! ChemRxiv public items API: JSON pages with `limit`/`skip` paging.
//!
//! Items come newest published first; the walk cuts on `statusDate`. Each
//! item links its own asset, so records carry a ready [`ArtifactKey`].

use serde::Deserialize;

use super::{parse_timestamp, FeedSource, Page, Record};
use crate::artifact::ArtifactKey;
use crate::error::{ParseError, TransferError, WalkError};
use crate::http::{self, Timeouts};

pub const SORT_PUBLISHED_DESC: &str = "PUBLISHED_DATE_DESC";

/// Parameters of one items request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChemrxivQuery {
    pub sort: String,
    pub limit: usize,
    pub skip: usize,
}

impl ChemrxivQuery {
    pub fn newest_first(limit: usize, skip: usize) -> Self {
        Self {
            sort: SORT_PUBLISHED_DESC.to_string(),
            limit,
            skip,
        }
    }

    pub fn to_url(&self, api_url: &str) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(
            api_url,
            &[
                ("sort", self.sort.clone()),
                ("limit", self.limit.to_string()),
                ("skip", self.skip.to_string()),
            ],
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsPage {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    item_hits: Vec<ItemHit>,
}

#[derive(Debug, Deserialize)]
struct ItemHit {
    item: Item,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: String,
    #[serde(default)]
    title: String,
    status_date: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    asset: Option<Asset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Asset {
    file_name: String,
    original: AssetOriginal,
}

#[derive(Debug, Deserialize)]
struct AssetOriginal {
    url: String,
}

/// Decode one items page.
///
/// `statusDate` is required and must be RFC 3339; an item without a usable
/// asset fails the page, as an arXiv id without a key does.
pub fn parse_items(json: &[u8]) -> Result<Page, ParseError> {
    let page: ItemsPage = serde_json::from_slice(json)?;
    let records = page
        .item_hits
        .into_iter()
        .map(|hit| item_record(hit.item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        records,
        total_results: page.total_count,
    })
}

fn item_record(item: Item) -> Result<Record, ParseError> {
    let raw_status = item.status_date.ok_or(ParseError::MissingField("statusDate"))?;
    let updated = parse_timestamp(&raw_status).map_err(|source| ParseError::Timestamp {
        id: item.id.clone(),
        value: raw_status.clone(),
        source,
    })?;
    let published = item
        .published_date
        .as_deref()
        .and_then(|raw| parse_timestamp(raw).ok());
    let asset = item
        .asset
        .ok_or_else(|| ParseError::Identifier(item.id.clone()))?;
    let artifact = ArtifactKey::from_asset(&item.id, &asset.original.url, &asset.file_name)?;

    Ok(Record {
        id: item.id,
        updated,
        published,
        title: item.title.split_whitespace().collect::<Vec<_>>().join(" "),
        artifact: Some(artifact),
    })
}

/// Items API client plus JSON decoder.
#[derive(Debug, Clone)]
pub struct ChemrxivFeed {
    api_url: String,
}

impl ChemrxivFeed {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    fn fetch(&self, query: &ChemrxivQuery) -> Result<Vec<u8>, TransferError> {
        let url = query.to_url(&self.api_url)?;
        tracing::debug!(url = %url, "items query");
        Ok(http::get(url.as_str(), &[], Timeouts::FEED)?.body)
    }
}

impl FeedSource for ChemrxivFeed {
    fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, WalkError> {
        let raw = self
            .fetch(&ChemrxivQuery::newest_first(page_size, offset))
            .map_err(|source| WalkError::Fetch { offset, source })?;
        parse_items(&raw).map_err(|source| WalkError::Parse { offset, source })
    }
}
