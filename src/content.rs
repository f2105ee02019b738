//! Content block sources and the eligibility filter applied to them

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, SidequestError};
use crate::models::{ContentBlock, RequestContext};

/// Source of the full current set of content blocks.
///
/// Stores do no filtering; eligibility is decided by [`filter_blocks`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_content_blocks(&self) -> Result<Vec<ContentBlock>>;
}

/// In-memory store, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticContentStore {
    blocks: Vec<ContentBlock>,
}

impl StaticContentStore {
    #[must_use]
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }
}

#[async_trait]
impl ContentStore for StaticContentStore {
    async fn get_content_blocks(&self) -> Result<Vec<ContentBlock>> {
        Ok(self.blocks.clone())
    }
}

/// Reads a JSON array of blocks exported from the content spreadsheet.
/// The file is re-read on every call so edits show up without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileContentStore {
    path: PathBuf,
}

impl JsonFileContentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContentStore for JsonFileContentStore {
    async fn get_content_blocks(&self) -> Result<Vec<ContentBlock>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let blocks: Vec<ContentBlock> = serde_json::from_str(&raw).map_err(|e| {
            SidequestError::content_store(format!(
                "Failed to parse content blocks from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!(
            "Loaded {} content blocks from {}",
            blocks.len(),
            self.path.display()
        );
        Ok(blocks)
    }
}

/// Whether a block can be used for a content-block quest under `request`
#[must_use]
pub fn is_eligible(block: &ContentBlock, request: &RequestContext) -> bool {
    // Location-bound blocks belong to pure-location generation
    if block.requires_location {
        return false;
    }

    if !request.difficulty.within_one_of(block.difficulty) {
        return false;
    }

    if !block.transportation.satisfied_by(request.transportation) {
        return false;
    }

    if !block.theme_tags.is_empty() {
        if let Some(allowed) = request.theme.allowed_tags() {
            let matches_theme = block
                .theme_tags
                .iter()
                .any(|tag| allowed.contains(&tag.as_str()));
            if !matches_theme {
                return false;
            }
        }
    }

    if block.minutes > request.timeframe.ceiling_minutes() {
        return false;
    }

    match request.explicit_time_of_day() {
        Some(time_of_day) => block.time_of_day.permits(time_of_day),
        None => true,
    }
}

/// Blocks that survive [`is_eligible`], in store order
#[must_use]
pub fn filter_blocks(blocks: Vec<ContentBlock>, request: &RequestContext) -> Vec<ContentBlock> {
    let total = blocks.len();
    let eligible: Vec<ContentBlock> = blocks
        .into_iter()
        .filter(|block| is_eligible(block, request))
        .collect();

    debug!("{} of {} content blocks eligible", eligible.len(), total);
    eligible
}
