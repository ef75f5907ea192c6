//! Review feed pagination.
//!
//! [`FeedPaginator`] owns the accumulated review list for one
//! (region, category) filter tuple and sequences page fetches for it. The
//! caller dispatches the [`PageRequest`] it hands out and feeds the outcome
//! back via [`apply_page`](FeedPaginator::apply_page) /
//! [`apply_failure`](FeedPaginator::apply_failure). At most one request is
//! ever outstanding; responses carry the epoch captured at dispatch and are
//! discarded if the paginator has moved on since.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{AppError, DEFAULT_PAGE_SIZE, MAX_FEED_ITEMS, MAX_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    All,
    Korean,
    Chinese,
    Japanese,
    Western,
    Snack,
    Meat,
    Seafood,
    Cafe,
    Bar,
}

impl Category {
    pub const ALL_CATEGORIES: [Self; 10] = [
        Self::All,
        Self::Korean,
        Self::Chinese,
        Self::Japanese,
        Self::Western,
        Self::Snack,
        Self::Meat,
        Self::Seafood,
        Self::Cafe,
        Self::Bar,
    ];

    /// The wire value the backend indexes on, also used as the display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "전체",
            Self::Korean => "한식",
            Self::Chinese => "중식",
            Self::Japanese => "일식",
            Self::Western => "양식",
            Self::Snack => "분식",
            Self::Meat => "고기",
            Self::Seafood => "회/해물",
            Self::Cafe => "카페",
            Self::Bar => "술집",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL_CATEGORIES.into_iter().find(|c| c.as_str() == s)
    }

    #[must_use]
    pub const fn is_all(self) -> bool {
        matches!(self, Self::All)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl ReviewId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One review as it appears in the feed. The authoritative copy lives
/// server-side; this is display data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: ReviewId,
    pub restaurant_name: String,
    pub region: String,
    #[serde(default)]
    pub district: Option<String>,
    pub category: Category,
    pub content: String,
    pub rating: f32,
    pub author_nickname: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<ReviewSummary>,
    pub page_index: u32,
    pub is_last: bool,
}

/// The filter tuple controlling which page sequence is active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedFilter {
    pub region: String,
    pub category: Category,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            region: crate::regions::REGION_ALL.to_string(),
            category: Category::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: u32,
    pub max_items: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_items: MAX_FEED_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    Idle,
    Loading,
    Loaded,
    Exhausted,
    Error,
}

impl FeedPhase {
    #[must_use]
    pub const fn can_load_more(self) -> bool {
        matches!(self, Self::Idle | Self::Loaded | Self::Error)
    }
}

/// A dispatched fetch, tagged with the epoch current at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub request_id: String,
    pub epoch: u64,
    pub page: u32,
    pub page_size: u32,
    pub filter: FeedFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Response merged; `appended` items were new after dedup.
    Applied { appended: usize },
    /// Failure recorded; accumulated items untouched, retry permitted.
    Failed,
    /// Response belonged to a superseded epoch and was discarded.
    Stale,
}

/// Paginates one review feed. See the module docs for the protocol.
#[derive(Debug, Clone)]
pub struct FeedPaginator {
    filter: FeedFilter,
    config: FeedConfig,
    epoch: u64,
    next_page: u32,
    items: Vec<ReviewSummary>,
    seen: HashSet<ReviewId>,
    has_more: bool,
    in_flight: bool,
    last_error: Option<AppError>,
}

impl Default for FeedPaginator {
    fn default() -> Self {
        Self::new(FeedFilter::default(), FeedConfig::default())
    }
}

impl FeedPaginator {
    #[must_use]
    pub fn new(filter: FeedFilter, config: FeedConfig) -> Self {
        Self {
            filter,
            config,
            epoch: 0,
            next_page: 0,
            items: Vec::new(),
            seen: HashSet::new(),
            has_more: true,
            in_flight: false,
            last_error: None,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    #[must_use]
    pub fn items(&self) -> &[ReviewSummary] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.next_page
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        if self.in_flight {
            FeedPhase::Loading
        } else if self.last_error.is_some() {
            FeedPhase::Error
        } else if !self.has_more {
            FeedPhase::Exhausted
        } else if self.next_page == 0 {
            FeedPhase::Idle
        } else {
            FeedPhase::Loaded
        }
    }

    /// Switches to a new filter tuple. Accumulated items are discarded and
    /// the epoch is bumped so any in-flight response for the old tuple will
    /// be dropped on arrival. Returns false when the tuple is unchanged.
    pub fn set_filter(&mut self, filter: FeedFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        tracing::debug!(region = %filter.region, category = %filter.category, "feed filter changed");
        self.filter = filter;
        self.reset();
        true
    }

    /// Restarts the current tuple from page zero (pull-to-refresh).
    pub fn refresh(&mut self) {
        tracing::debug!(region = %self.filter.region, "feed refresh");
        self.reset();
    }

    /// Requests the next page, or `None` while a fetch is in flight or the
    /// feed is exhausted. This is the in-flight guard: the visibility sensor
    /// may fire any number of times, only one dispatch comes out.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.in_flight || !self.has_more {
            return None;
        }
        self.in_flight = true;
        self.last_error = None;

        let request = PageRequest {
            request_id: Uuid::new_v4().to_string(),
            epoch: self.epoch,
            page: self.next_page,
            page_size: self.config.page_size.min(MAX_PAGE_SIZE),
            filter: self.filter.clone(),
        };
        tracing::debug!(
            request_id = %request.request_id,
            page = request.page,
            region = %request.filter.region,
            "feed page dispatched"
        );
        Some(request)
    }

    /// Merges a successful page. Items already present (by id) are skipped.
    pub fn apply_page(&mut self, epoch: u64, page: FeedPage) -> ApplyOutcome {
        if epoch != self.epoch {
            tracing::debug!(stale = epoch, current = self.epoch, "discarding superseded page");
            return ApplyOutcome::Stale;
        }

        if page.page_index != self.next_page {
            tracing::warn!(
                got = page.page_index,
                expected = self.next_page,
                "server page index out of step"
            );
        }

        self.in_flight = false;
        self.last_error = None;

        let mut appended = 0;
        for item in page.items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
                appended += 1;
            }
        }

        self.next_page += 1;
        self.has_more = !page.is_last && self.items.len() < self.config.max_items;

        ApplyOutcome::Applied { appended }
    }

    /// Records a failed fetch. Earlier pages stay visible and `has_more`
    /// stays true, so the same load-more trigger retries.
    pub fn apply_failure(&mut self, epoch: u64, error: AppError) -> ApplyOutcome {
        if epoch != self.epoch {
            tracing::debug!(stale = epoch, current = self.epoch, "discarding superseded failure");
            return ApplyOutcome::Stale;
        }
        tracing::warn!(page = self.next_page, error = %error, "feed page failed");
        self.in_flight = false;
        self.last_error = Some(error);
        ApplyOutcome::Failed
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.next_page = 0;
        self.items.clear();
        self.seen.clear();
        self.has_more = true;
        self.in_flight = false;
        self.last_error = None;
    }
}
