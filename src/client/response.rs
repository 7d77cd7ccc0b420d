//! Result of one ESI page fetch.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ETAG, EXPIRES, LAST_MODIFIED};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::request::EsiRequest;
use crate::error::EsiError;

pub const PAGES_HEADER: &str = "x-pages";

/// An HTTP error the caller must inspect rather than a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub status: u16,
    pub body: String,
}

/// How the payload on an [`EsiResponse`] should be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Payload is current.
    Fresh,
    /// The validator matched (304); reuse the previously cached payload.
    NotModified,
    /// Tolerated 401 or a 403; payload is empty.
    Failed(ResponseError),
}

/// Paging and cache metadata read from response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageMeta {
    pub total_pages: u32,
    pub etag: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl PageMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            total_pages: text(PAGES_HEADER)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(1)
                .max(1),
            etag: text(ETAG.as_str()).map(|v| v.trim().to_string()),
            expires: text(EXPIRES.as_str()).and_then(parse_http_date),
            last_modified: text(LAST_MODIFIED.as_str()).and_then(parse_http_date),
        }
    }
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One page of an ESI resource, or several pages merged by fetch-all mode.
#[derive(Debug, Clone, PartialEq)]
pub struct EsiResponse {
    pub(crate) path: String,
    pub(crate) page: u32,
    pub(crate) total_pages: u32,
    pub(crate) etag: Option<String>,
    pub(crate) expires: Option<DateTime<Utc>>,
    pub(crate) last_modified: Option<DateTime<Utc>>,
    pub(crate) data: Vec<Value>,
    pub(crate) next_page: Option<EsiRequest>,
    pub(crate) outcome: ResponseOutcome,
}

impl EsiResponse {
    pub(crate) fn new(
        request: &EsiRequest,
        path: String,
        meta: PageMeta,
        data: Vec<Value>,
        outcome: ResponseOutcome,
    ) -> Self {
        let page = request.page.unwrap_or(1);
        let total_pages = match outcome {
            ResponseOutcome::NotModified => 1,
            _ => meta.total_pages,
        };
        let next_page = match (&outcome, request.page) {
            (ResponseOutcome::Fresh, Some(current)) if current < total_pages => {
                Some(request.for_page(current + 1))
            }
            _ => None,
        };
        Self {
            path,
            page,
            total_pages,
            etag: meta.etag,
            expires: meta.expires,
            last_modified: meta.last_modified,
            data,
            next_page,
            outcome,
        }
    }

    /// Rendered request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// 1 when unpaginated, not modified, or merged by fetch-all mode.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Validator to send with the next poll, exactly as the server sent it.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Payload items in page order. Always empty unless the outcome is `Fresh`.
    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn into_data(self) -> Vec<Value> {
        self.data
    }

    pub fn next_page(&self) -> Option<&EsiRequest> {
        self.next_page.as_ref()
    }

    pub fn outcome(&self) -> &ResponseOutcome {
        &self.outcome
    }

    pub fn is_not_modified(&self) -> bool {
        self.outcome == ResponseOutcome::NotModified
    }

    /// The in-band error, if any. Check this before trusting the payload.
    pub fn error(&self) -> Option<&ResponseError> {
        match &self.outcome {
            ResponseOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Decode every payload item as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, EsiError> {
        self.data
            .iter()
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| self.decode_error(e))
    }

    /// Decode a single-object payload. `None` when the payload is empty.
    pub fn decode_single<T: DeserializeOwned>(&self) -> Result<Option<T>, EsiError> {
        self.data
            .first()
            .map(|item| serde_json::from_value(item.clone()))
            .transpose()
            .map_err(|e| self.decode_error(e))
    }

    /// Turn an in-band error into [`EsiError::Rejected`]; other outcomes pass through.
    pub fn error_for_outcome(self) -> Result<Self, EsiError> {
        match &self.outcome {
            ResponseOutcome::Failed(error) => Err(EsiError::Rejected {
                path: self.path.clone(),
                status: error.status,
                body: error.body.clone(),
            }),
            _ => Ok(self),
        }
    }

    fn decode_error(&self, e: serde_json::Error) -> EsiError {
        EsiError::ResponseDecode {
            path: self.path.clone(),
            body: Value::Array(self.data.clone()).to_string(),
            message: e.to_string(),
        }
    }
}

/// A JSON array becomes its items; any other value is a single item.
pub(crate) fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
