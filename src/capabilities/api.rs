use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FeedPage, PageRequest};
use crate::regions::RegionTable;
use crate::{AppError, FEED_FETCH_TIMEOUT, REGION_TABLE_TIMEOUT};

pub const REVIEWS_PATH: &str = "/api/v1/reviews";
pub const REGION_TABLE_PATH: &str = "/api/v1/regions";

/// The request/response boundary with the backend. The shell owns the
/// transport; the core only describes what to fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiOperation {
    FetchReviews {
        /// Absent means no region filter (the "all" sentinel).
        region: Option<String>,
        /// Absent means no category filter.
        category: Option<String>,
        page: u32,
        page_size: u32,
    },
    FetchRegionTable,
}

impl ApiOperation {
    #[must_use]
    pub fn from_page_request(request: &PageRequest) -> Self {
        let filter = &request.filter;
        Self::FetchReviews {
            region: (filter.region != crate::regions::REGION_ALL)
                .then(|| filter.region.clone()),
            category: (!filter.category.is_all()).then(|| filter.category.as_str().to_string()),
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Path + percent-encoded query for the shell's HTTP client.
    #[must_use]
    pub fn request_path(&self) -> String {
        match self {
            Self::FetchReviews {
                region,
                category,
                page,
                page_size,
            } => {
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                if let Some(region) = region {
                    query.append_pair("region", region);
                }
                if let Some(category) = category {
                    query.append_pair("category", category);
                }
                query.append_pair("page", &page.to_string());
                query.append_pair("size", &page_size.to_string());
                format!("{REVIEWS_PATH}?{}", query.finish())
            }
            Self::FetchRegionTable => REGION_TABLE_PATH.to_string(),
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match self {
            Self::FetchReviews { .. } => FEED_FETCH_TIMEOUT,
            Self::FetchRegionTable => REGION_TABLE_TIMEOUT,
        }
    }
}

impl Operation for ApiOperation {
    type Output = ApiResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ApiOutput {
    Reviews(FeedPage),
    RegionTable(RegionTable),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error {status}")]
    Status {
        status: u16,
        #[serde(default)]
        body: Option<Vec<u8>>,
    },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl ApiError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => {
                matches!(status, 408 | 429 | 500..=599)
            }
            Self::InvalidResponse { .. } => false,
        }
    }

    #[must_use]
    pub fn to_app_error(&self) -> AppError {
        match self {
            Self::Network { message } => {
                AppError::new(crate::ErrorKind::Network, "Network error").with_internal(message)
            }
            Self::Timeout { timeout_ms } => {
                AppError::new(crate::ErrorKind::Timeout, "Request timed out")
                    .with_context("timeout_ms", timeout_ms.to_string())
            }
            Self::Status { status, body } => AppError::from_http_status(*status, body.as_deref()),
            Self::InvalidResponse { reason } => {
                AppError::new(crate::ErrorKind::Deserialization, "Malformed server response")
                    .with_internal(reason)
            }
        }
    }
}

impl From<&ApiError> for AppError {
    fn from(e: &ApiError) -> Self {
        e.to_app_error()
    }
}

pub type ApiResult = Result<ApiOutput, ApiError>;

pub struct Api<Ev> {
    context: CapabilityContext<ApiOperation, Ev>,
}

impl<Ev> Capability<Ev> for Api<Ev> {
    type Operation = ApiOperation;
    type MappedSelf<MappedEv> = Api<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Api::new(self.context.map_event(f))
    }
}

impl<Ev> Api<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<ApiOperation, Ev>) -> Self {
        Self { context }
    }

    /// Fetches one feed page described by `request`.
    pub fn fetch_reviews<F>(&self, request: &PageRequest, make_event: F)
    where
        F: FnOnce(Result<FeedPage, ApiError>) -> Ev + Send + 'static,
    {
        let operation = ApiOperation::from_page_request(request);
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = match context.request_from_shell(operation).await {
                Ok(ApiOutput::Reviews(page)) => Ok(page),
                Ok(ApiOutput::RegionTable(_)) => Err(ApiError::InvalidResponse {
                    reason: "expected a review page".into(),
                }),
                Err(e) => Err(e),
            };
            context.update_app(make_event(result));
        });
    }

    /// Fetches the region table. Issued once per session.
    pub fn fetch_region_table<F>(&self, make_event: F)
    where
        F: FnOnce(Result<RegionTable, ApiError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = match context.request_from_shell(ApiOperation::FetchRegionTable).await {
                Ok(ApiOutput::RegionTable(table)) => Ok(table),
                Ok(ApiOutput::Reviews(_)) => Err(ApiError::InvalidResponse {
                    reason: "expected a region table".into(),
                }),
                Err(e) => Err(e),
            };
            context.update_app(make_event(result));
        });
    }
}
