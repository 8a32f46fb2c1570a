use std::sync::Mutex;
use std::time::Duration;

use log::{debug, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::cache::LookupCache;
use crate::error::ResolveError;
use crate::resolve::{BibliographicResolver, DoiResolver};
use crate::types::{CreativeWork, Person};

const WORKS_URL: &str = "https://api.crossref.org/works";
const TIMEOUT: Duration = Duration::from_secs(20);

/// Characters a DOI may carry into the `works/{doi}` path unescaped.
const DOI_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b':');

/// CrossRef REST API client used for both DOI and free-text lookups.
pub struct CrossRef {
    agent: ureq::Agent,
    mailto: Option<String>,
    cache: Option<Mutex<LookupCache>>,
}

#[derive(Deserialize)]
struct WorkResponse {
    message: CrossRefWork,
}

#[derive(Deserialize)]
struct SearchResponse {
    message: SearchMessage,
}

#[derive(Deserialize)]
struct SearchMessage {
    #[serde(default)]
    items: Vec<CrossRefWork>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CrossRefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossRefAuthor>,
    issued: Option<CrossRefDate>,
    #[serde(default)]
    container_title: Vec<String>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
}

#[derive(Deserialize)]
struct CrossRefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct CrossRefDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossRef {
    pub fn new(mailto: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .build()
            .into();
        Self { agent, mailto, cache: None }
    }

    pub fn with_cache(mut self, cache: LookupCache) -> Self {
        self.cache = Some(Mutex::new(cache));
        self
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ResolveError> {
        let mut req = self.agent.get(url);
        for (k, v) in query {
            req = req.query(*k, *v);
        }
        if let Some(mailto) = &self.mailto {
            req = req.query("mailto", mailto);
        }
        let resp = match req.call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(404)) => return Err(ResolveError::NotFound),
            Err(ureq::Error::StatusCode(429)) => {
                return Err(ResolveError::Transport("rate limited".to_string()));
            }
            Err(e) => return Err(ResolveError::Transport(e.to_string())),
        };
        resp.into_body()
            .read_to_string()
            .map_err(|e| ResolveError::Transport(e.to_string()))
    }

    /// Serve from cache, else fetch and record the outcome. Transient
    /// failures are not cached.
    fn cached_or_fetch(
        &self,
        key: &str,
        fetch: impl FnOnce() -> Result<Option<CreativeWork>, ResolveError>,
    ) -> Result<Option<CreativeWork>, ResolveError> {
        if let Some(cache) = &self.cache
            && let Ok(cache) = cache.lock()
            && let Ok(Some(cached)) = cache.get(key)
        {
            debug!("Lookup cache hit: {key}");
            return Ok(cached);
        }
        let outcome = fetch();
        let record = match &outcome {
            Ok(found) => Some(found.as_ref()),
            Err(ResolveError::NotFound) => Some(None),
            Err(_) => None,
        };
        if let (Some(record), Some(cache)) = (record, &self.cache)
            && let Ok(cache) = cache.lock()
            && let Err(e) = cache.put(key, record)
        {
            warn!("Could not write lookup cache: {e}");
        }
        outcome
    }
}

impl DoiResolver for CrossRef {
    fn resolve_doi(&self, doi: &str) -> Result<CreativeWork, ResolveError> {
        let key = format!("doi:{}", doi.to_lowercase());
        let found = self.cached_or_fetch(&key, || {
            let body = self.get(&work_url(doi), &[])?;
            deserialize_work(&body).map(Some)
        })?;
        found.ok_or(ResolveError::NotFound)
    }
}

impl BibliographicResolver for CrossRef {
    fn resolve_query(&self, text: &str) -> Result<Option<CreativeWork>, ResolveError> {
        let key = format!("q:{}", text.to_lowercase());
        self.cached_or_fetch(&key, || {
            let body = self.get(
                WORKS_URL,
                &[("query.bibliographic", text), ("rows", "1")],
            )?;
            deserialize_search(&body)
        })
    }
}

fn work_url(doi: &str) -> String {
    format!("{WORKS_URL}/{}", utf8_percent_encode(doi, DOI_PATH))
}

fn deserialize_work(body: &str) -> Result<CreativeWork, ResolveError> {
    serde_json::from_str::<WorkResponse>(body)
        .map(|r| r.message.into())
        .map_err(|e| ResolveError::Transport(format!("bad CrossRef response: {e}")))
}

fn deserialize_search(body: &str) -> Result<Option<CreativeWork>, ResolveError> {
    let data = serde_json::from_str::<SearchResponse>(body)
        .map_err(|e| ResolveError::Transport(format!("bad CrossRef response: {e}")))?;
    Ok(data.message.items.into_iter().next().map(Into::into))
}

impl From<CrossRefWork> for CreativeWork {
    fn from(w: CrossRefWork) -> Self {
        CreativeWork {
            title: w.title.into_iter().next(),
            authors: w.author.into_iter().filter_map(author_to_person).collect(),
            date_published: w.issued.and_then(format_date),
            doi: w.doi,
            url: w.url,
            is_part_of: w.container_title.into_iter().next(),
            volume: w.volume,
            issue: w.issue,
            pagination: w.page,
            publisher: w.publisher,
            work_type: w.work_type,
            ..Default::default()
        }
    }
}

fn author_to_person(a: CrossRefAuthor) -> Option<Person> {
    let family = a.family.or(a.name)?;
    Some(Person {
        given_names: a
            .given
            .map(|g| g.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        family_names: vec![family],
        affiliations: Vec::new(),
    })
}

/// `[[2020, 3, 9]]` -> "2020-03-09", `[[2020]]` -> "2020".
fn format_date(date: CrossRefDate) -> Option<String> {
    let parts: Vec<i64> = date
        .date_parts
        .into_iter()
        .next()?
        .into_iter()
        .map_while(|p| p)
        .collect();
    match parts.as_slice() {
        [] => None,
        [y] => Some(format!("{y:04}")),
        [y, m] => Some(format!("{y:04}-{m:02}")),
        [y, m, d, ..] => Some(format!("{y:04}-{m:02}-{d:02}")),
    }
}
