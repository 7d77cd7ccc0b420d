//! ESI REST client: bearer auth, pagination, conditional fetches, retry.
//!
//! Endpoint bindings live in [`endpoints`]; everything goes through the
//! shared engine in [`EsiClient::fetch_page`].

pub mod endpoints;
pub mod request;
pub mod response;

use std::sync::Arc;

use futures::Stream;
use reqwest::header::{ACCEPT, IF_NONE_MATCH};
use tokio_util::sync::CancellationToken;

pub use request::{EsiRequest, FetchOptions};
pub use response::{EsiResponse, ResponseError, ResponseOutcome};

use crate::auth::ManagedToken;
use crate::config::EsiConfig;
use crate::error::{EsiError, Result};
use crate::util::retry::{RetryFailure, RetryPolicy};
use response::{into_items, PageMeta};

/// What one attempt produced, before payload decoding.
enum Reply {
    Body { meta: PageMeta, body: String },
    NotModified { meta: PageMeta },
    Rejected { meta: PageMeta, error: ResponseError },
}

/// Client for the ESI read API.
///
/// Takes the token it signs with explicitly; `None` limits it to public
/// endpoints.
///
/// # Example
/// ```no_run
/// use esi_auth::client::{EsiClient, FetchOptions};
/// use esi_auth::config::EsiConfig;
///
/// # async fn example() -> esi_auth::error::Result<()> {
/// let config = EsiConfig::from_env()?;
/// let client = EsiClient::new(&config, None)?;
/// let names = client.resolve_names(&[2112625428], &FetchOptions::default()).await?;
/// for name in names.decode::<esi_auth::types::ResolvedName>()? {
///     println!("{} is a {}", name.name, name.category);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EsiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<Arc<ManagedToken>>,
    retry: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl EsiClient {
    pub fn new(config: &EsiConfig, token: Option<Arc<ManagedToken>>) -> Result<Self> {
        Ok(Self::with_http_client(config, config.http_client()?, token))
    }

    /// Use an existing HTTP client (its timeouts apply instead of the config's).
    pub fn with_http_client(
        config: &EsiConfig,
        http: reqwest::Client,
        token: Option<Arc<ManagedToken>>,
    ) -> Self {
        Self {
            http,
            base_url: config.esi_base_url.trim_end_matches('/').to_string(),
            token,
            retry: config.retry.clone(),
            cancel: None,
        }
    }

    /// Abort retry loops (including in-flight attempts and backoff sleeps) when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn token(&self) -> Option<&Arc<ManagedToken>> {
        self.token.as_ref()
    }

    /// Run `request` as given, or follow every page when `options.all` is set.
    pub async fn fetch(&self, request: EsiRequest, options: &FetchOptions) -> Result<EsiResponse> {
        let request = request.with_options(options);
        if options.all {
            self.fetch_all(&request).await
        } else {
            self.fetch_page(&request).await
        }
    }

    /// Fetch exactly one page. Also resumes a continuation from
    /// [`EsiResponse::next_page`].
    pub async fn fetch_page(&self, request: &EsiRequest) -> Result<EsiResponse> {
        let path = request.render_path()?;
        let url = format!("{}{}", self.base_url, path);

        let reply = self
            .retry
            .execute(self.cancel.as_ref(), |attempt| {
                tracing::debug!(
                    method = %request.method,
                    path = %path,
                    page = ?request.page,
                    attempt,
                    "ESI request"
                );
                self.attempt(request, &url, &path)
            })
            .await
            .map_err(|failure| match failure {
                RetryFailure::Fatal(err) => err,
                RetryFailure::Exhausted { attempts, last } => EsiError::Request {
                    path: path.clone(),
                    attempts,
                    reason: last.to_string(),
                },
                RetryFailure::Cancelled { attempts } => EsiError::Request {
                    path: path.clone(),
                    attempts,
                    reason: "cancelled".to_string(),
                },
            })?;

        match reply {
            Reply::Body { meta, body } => {
                let data = if body.trim().is_empty() {
                    Vec::new()
                } else {
                    let value = serde_json::from_str(&body).map_err(|e| {
                        EsiError::ResponseDecode {
                            path: path.clone(),
                            message: e.to_string(),
                            body,
                        }
                    })?;
                    into_items(value)
                };
                Ok(EsiResponse::new(request, path, meta, data, ResponseOutcome::Fresh))
            }
            Reply::NotModified { meta } => Ok(EsiResponse::new(
                request,
                path,
                meta,
                Vec::new(),
                ResponseOutcome::NotModified,
            )),
            Reply::Rejected { meta, error } => {
                tracing::debug!(path = %path, status = error.status, "ESI returned in-band error");
                Ok(EsiResponse::new(
                    request,
                    path,
                    meta,
                    Vec::new(),
                    ResponseOutcome::Failed(error),
                ))
            }
        }
    }

    /// Follow every continuation and concatenate payloads in page order.
    ///
    /// The page count comes from the first page only. A later page that
    /// returns an in-band error stops the walk; the merged response then
    /// carries that error alongside the pages fetched so far.
    pub async fn fetch_all(&self, request: &EsiRequest) -> Result<EsiResponse> {
        let mut merged = self.fetch_page(request).await?;
        let Some(base) = merged.next_page.take() else {
            merged.total_pages = 1;
            return Ok(merged);
        };

        let first_page = base.page.unwrap_or(1);
        let total_pages = merged.total_pages;
        for page in first_page..=total_pages {
            let next = self.fetch_page(&base.for_page(page)).await?;
            if let ResponseOutcome::Failed(error) = next.outcome {
                tracing::debug!(page, total_pages, "Stopping fetch-all on in-band error");
                merged.outcome = ResponseOutcome::Failed(error);
                break;
            }
            merged.data.extend(next.data);
        }

        merged.total_pages = 1;
        Ok(merged)
    }

    /// Yield each page as it arrives; the streaming form of [`fetch_all`](Self::fetch_all).
    pub fn pages(&self, request: EsiRequest) -> impl Stream<Item = Result<EsiResponse>> + '_ {
        async_stream::try_stream! {
            let first = self.fetch_page(&request).await?;
            let total_pages = first.total_pages();
            let base = first.next_page().cloned();
            yield first;

            if let Some(base) = base {
                for page in base.page.unwrap_or(1)..=total_pages {
                    let next = self.fetch_page(&base.for_page(page)).await?;
                    let stop = next.error().is_some();
                    yield next;
                    if stop {
                        break;
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: &EsiRequest, url: &str, path: &str) -> Result<Reply> {
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");

        let query = request.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(etag) = request.if_none_match() {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if !request.public {
            let token = self.token.as_ref().ok_or_else(|| {
                EsiError::Configuration(format!("{path} needs a token but the client has none"))
            })?;
            builder = builder.bearer_auth(token.access().await?);
        }

        let transport = |source| EsiError::Transport {
            path: path.to_string(),
            source,
        };

        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let meta = PageMeta::from_headers(resp.headers());

        match status {
            200..=299 => {
                let body = resp.text().await.map_err(transport)?;
                Ok(Reply::Body { meta, body })
            }
            304 => Ok(Reply::NotModified { meta }),
            401 if !request.tolerate_unauthorized => Err(EsiError::Unauthorized {
                path: path.to_string(),
            }),
            401 | 403 => {
                let body = resp.text().await.unwrap_or_default();
                Ok(Reply::Rejected {
                    meta,
                    error: ResponseError { status, body },
                })
            }
            _ => Err(EsiError::Status {
                path: path.to_string(),
                status,
            }),
        }
    }
}

impl std::fmt::Debug for EsiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}
