//! Request descriptors for the ESI fetch engine.

use reqwest::Method;
use serde_json::Value;

use crate::error::EsiError;

/// One ESI call: method, templated path, parameters, and per-call policy.
///
/// Paths use `{name}` placeholders filled from [`param`](Self::param).
/// A continuation returned on [`EsiResponse::next_page`](super::EsiResponse::next_page)
/// is itself an `EsiRequest`.
#[derive(Debug, Clone, PartialEq)]
pub struct EsiRequest {
    pub method: Method,
    pub path: String,
    pub path_params: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    /// `None` for single-page endpoints; paginated requests start at 1.
    pub page: Option<u32>,
    /// Conditional validator, stored without quotes.
    pub etag: Option<String>,
    /// Return a 401 as an in-band error instead of failing the call.
    pub tolerate_unauthorized: bool,
    /// Send without a bearer credential.
    pub public: bool,
    pub body: Option<Value>,
}

impl EsiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: Vec::new(),
            query: Vec::new(),
            page: None,
            etag: None,
            tolerate_unauthorized: false,
            public: false,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.push((name.into(), value.to_string()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Mark as paginated, starting at page 1 unless a page is already set.
    pub fn paginated(mut self) -> Self {
        self.page.get_or_insert(1);
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Apply per-call options. Setting `page` makes the request paginated.
    pub fn with_options(mut self, options: &FetchOptions) -> Self {
        if let Some(etag) = &options.etag {
            self.etag = Some(etag.trim().to_string());
        }
        if let Some(page) = options.page {
            self.page = Some(page.max(1));
        }
        self.tolerate_unauthorized = options.tolerate_unauthorized;
        self
    }

    /// `If-None-Match` value. Entity tags pass through as given; a bare value gets quoted.
    pub(crate) fn if_none_match(&self) -> Option<String> {
        self.etag.as_deref().map(|etag| {
            if etag.starts_with('"') || etag.starts_with("W/") {
                etag.to_string()
            } else {
                format!("\"{etag}\"")
            }
        })
    }

    /// The same request for `page`. Continuations never carry the validator.
    pub fn for_page(&self, page: u32) -> Self {
        let mut next = self.clone();
        next.page = Some(page);
        next.etag = None;
        next
    }

    /// Fill `{name}` placeholders. A placeholder without a value is an error.
    pub fn render_path(&self) -> Result<String, EsiError> {
        let mut rendered = String::with_capacity(self.path.len());
        let mut rest = self.path.as_str();

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| {
                EsiError::InvalidRequest(format!("unterminated placeholder in {}", self.path))
            })?;
            let name = &after[..end];
            let value = self
                .path_params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
                .ok_or_else(|| {
                    EsiError::InvalidRequest(format!("no value for {{{name}}} in {}", self.path))
                })?;
            rendered.push_str(value);
            rest = &after[end + 1..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    /// Query pairs as sent, including `page` for paginated requests.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.query.clone();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        pairs
    }
}

/// Per-call options accepted by every endpoint binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Validator from a previous response; a match yields `NotModified`.
    pub etag: Option<String>,
    /// Follow every continuation and return one concatenated response.
    pub all: bool,
    pub tolerate_unauthorized: bool,
    /// Start at this page instead of 1.
    pub page: Option<u32>,
}

impl FetchOptions {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn tolerating_unauthorized(mut self) -> Self {
        self.tolerate_unauthorized = true;
        self
    }

    pub fn starting_at(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}
