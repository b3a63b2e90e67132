// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use garagedesk_app::{
    EntityId, EntityKind, FetchError, FormValues, Page, PageQuery, PageSource, page_count,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Where the bearer token lives and who hears about it expiring.
pub trait AuthSession: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
    /// Called after the server rejected the token with 401.
    fn notify_expired(&self);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    token: Mutex<Option<String>>,
    expirations: AtomicUsize,
}

impl MemorySession {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: Mutex::new(token.map(str::to_owned)),
            expirations: AtomicUsize::new(0),
        }
    }

    pub fn expirations(&self) -> usize {
        self.expirations.load(Ordering::SeqCst)
    }
}

impl AuthSession for MemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn notify_expired(&self) {
        self.expirations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Blocking client for the back-office REST API.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
    session: Arc<dyn AuthSession>,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<dyn AuthSession>) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if base_url.cannot_be_a_base() {
            bail!("api.base_url {trimmed:?} cannot carry a path");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> &Arc<dyn AuthSession> {
        &self.session
    }

    /// Fetches one page of `kind`, normalised to the common [`Page`] shape.
    pub fn fetch_page(&self, kind: EntityKind, query: &PageQuery) -> Result<Page<Value>> {
        let mut url = self.endpoint(kind, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.to_string());
            pairs.append_pair("limit", &query.limit.to_string());
            let search = query.search.trim();
            if !search.is_empty() {
                pairs.append_pair("search", search);
            }
        }
        debug!(collection = kind.collection(), page = query.page, "fetching page");

        let response = self.send(self.http.get(url))?;
        let body: Value = response
            .json()
            .with_context(|| format!("decode {} page", kind.collection()))?;
        normalize_page(kind, body, query)
    }

    pub fn create(&self, kind: EntityKind, record: &Value) -> Result<Value> {
        let url = self.endpoint(kind, None)?;
        let response = self.send(self.http.post(url).json(record))?;
        decode_record(kind, response)
    }

    pub fn update(&self, kind: EntityKind, id: &EntityId, record: &Value) -> Result<Value> {
        let url = self.endpoint(kind, Some(id))?;
        let response = self.send(self.http.put(url).json(record))?;
        decode_record(kind, response)
    }

    /// Creates the record, or updates it when the values carry an `_id`/`id`.
    pub fn save(&self, kind: EntityKind, values: &FormValues) -> Result<Value> {
        let mut record = values.as_map().clone();
        let id = ["_id", "id"]
            .into_iter()
            .find_map(|key| match record.remove(key) {
                Some(Value::String(id)) if !id.trim().is_empty() => Some(EntityId::new(id)),
                _ => None,
            });
        let record = Value::Object(record);
        match id {
            Some(id) => self.update(kind, &id, &record),
            None => self.create(kind, &record),
        }
    }

    /// Ids are pushed as a single percent-encoded segment, so `/`, `?` or
    /// `#` inside an id never leave the collection.
    fn endpoint(&self, kind: EntityKind, id: Option<&EntityId>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| anyhow!("api.base_url {} cannot carry a path", self.base_url()))?;
            segments.pop_if_empty().push(kind.collection());
            if let Some(id) = id {
                let raw = id.as_str();
                if raw.trim().is_empty() || raw == "." || raw == ".." {
                    bail!("invalid {} id {raw:?}", kind.collection());
                }
                segments.push(raw);
            }
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("server rejected the session token");
            if let Err(error) = self.session.clear_token() {
                warn!(error = %format!("{error:#}"), "failed to clear expired token");
            }
            self.session.notify_expired();
            bail!("session expired -- run `garagedesk token set <TOKEN>`");
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            debug!(status = status.as_u16(), "request failed");
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

/// [`PageSource`] over one REST collection, decoding rows into `T`.
pub struct EntitySource<T> {
    client: Client,
    kind: EntityKind,
    rows: PhantomData<fn() -> T>,
}

impl<T> EntitySource<T> {
    pub fn new(client: Client, kind: EntityKind) -> Self {
        Self {
            client,
            kind,
            rows: PhantomData,
        }
    }
}

impl<T> PageSource<T> for EntitySource<T>
where
    T: DeserializeOwned,
{
    fn fetch_page(&self, query: &PageQuery) -> Result<Page<T>, FetchError> {
        let page = self
            .client
            .fetch_page(self.kind, query)?
            .try_map(serde_json::from_value)
            .with_context(|| format!("decode {} rows", self.kind.collection()))?;
        Ok(page)
    }
}

/// Maps the response shapes the endpoints use onto [`Page`]. The list may
/// sit under the collection's own field, `data` or `items` (or be the whole
/// body); pagination may be top-level or nested under `pagination`.
pub fn normalize_page(kind: EntityKind, body: Value, query: &PageQuery) -> Result<Page<Value>> {
    let (items, meta) = match body {
        Value::Array(items) => (items, Map::new()),
        Value::Object(mut object) => {
            let items = [kind.list_field(), "data", "items"]
                .into_iter()
                .find_map(|field| match object.remove(field) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| {
                    anyhow!(
                        "{} response has no {:?}, \"data\" or \"items\" list",
                        kind.collection(),
                        kind.list_field()
                    )
                })?;
            let meta = match object.remove("pagination") {
                Some(Value::Object(pagination)) => pagination,
                _ => object,
            };
            (items, meta)
        }
        other => bail!(
            "{} response is not a list or object: {other}",
            kind.collection()
        ),
    };

    let limit = meta_number(&meta, &["limit", "perPage", "pageSize"]).unwrap_or(query.limit);
    let page = meta_number(&meta, &["page", "currentPage"]).unwrap_or(query.page);
    let total = meta_number(&meta, &["total", "totalItems", "count"])
        .unwrap_or_else(|| page.saturating_sub(1) * limit + items.len());
    let pages = meta_number(&meta, &["pages", "totalPages"])
        .unwrap_or_else(|| page_count(total, limit));

    Ok(Page {
        items,
        page,
        pages,
        total,
        limit,
    }
    .normalized())
}

fn meta_number(meta: &Map<String, Value>, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|key| match meta.get(*key)? {
        Value::Number(number) => number.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn decode_record(kind: EntityKind, response: Response) -> Result<Value> {
    let text = response
        .text()
        .with_context(|| format!("read {} response", kind.collection()))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let body: Value = serde_json::from_str(&text)
        .with_context(|| format!("decode {} response", kind.collection()))?;
    // Single-record responses are wrapped the same inconsistent ways lists are.
    Ok(match body {
        Value::Object(mut object) if object.get("data").is_some_and(Value::is_object) => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    })
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check api.base_url in the config ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.into_message()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Body { message: String },
}

impl ErrorEnvelope {
    fn into_message(self) -> Option<String> {
        let detail = self.error.map(|detail| match detail {
            ErrorDetail::Text(text) => text,
            ErrorDetail::Body { message } => message,
        });
        self.message
            .into_iter()
            .chain(detail)
            .find(|message| !message.trim().is_empty())
    }
}
