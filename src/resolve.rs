use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{ResolveError, Result};
use crate::markers::find_doi;
use crate::person::NameParser;
use crate::types::{CreativeWork, Person, Reference};

/// Parses a free-text author name. A Person without family names means
/// "not a name".
pub trait PersonResolver: Send + Sync {
    fn resolve_person(&self, text: &str) -> Person;
}

/// Fetches bibliographic metadata for a DOI.
pub trait DoiResolver: Send + Sync {
    fn resolve_doi(&self, doi: &str) -> std::result::Result<CreativeWork, ResolveError>;
}

/// Best-effort structured search from a free-text citation.
pub trait BibliographicResolver: Send + Sync {
    fn resolve_query(&self, text: &str)
        -> std::result::Result<Option<CreativeWork>, ResolveError>;
}

/// The external collaborators the reshaper depends on.
#[derive(Clone)]
pub struct Resolvers {
    pub person: Arc<dyn PersonResolver>,
    pub doi: Arc<dyn DoiResolver>,
    pub bibliographic: Arc<dyn BibliographicResolver>,
}

impl Resolvers {
    pub fn new(
        person: Arc<dyn PersonResolver>,
        doi: Arc<dyn DoiResolver>,
        bibliographic: Arc<dyn BibliographicResolver>,
    ) -> Self {
        Self { person, doi, bibliographic }
    }

    /// Name parsing only; every bibliography entry stays raw text.
    pub fn offline() -> Self {
        Self::new(Arc::new(NameParser), Arc::new(Offline), Arc::new(Offline))
    }

    /// One backend answering both DOI and free-text lookups.
    pub fn with_backend<B>(backend: Arc<B>) -> Self
    where
        B: DoiResolver + BibliographicResolver + 'static,
    {
        Self::new(Arc::new(NameParser), backend.clone(), backend)
    }
}

/// Resolver that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl DoiResolver for Offline {
    fn resolve_doi(&self, _doi: &str) -> std::result::Result<CreativeWork, ResolveError> {
        Err(ResolveError::NotFound)
    }
}

impl BibliographicResolver for Offline {
    fn resolve_query(&self, _text: &str) -> std::result::Result<Option<CreativeWork>, ResolveError> {
        Ok(None)
    }
}

/// Resolve one bibliography entry: DOI lookup, then free-text query, then
/// the raw text. Only `ResolveError::Fatal` escapes.
pub fn resolve_reference(
    text: &str,
    resolvers: &Resolvers,
) -> std::result::Result<Reference, ResolveError> {
    if let Some(doi) = find_doi(text) {
        match resolvers.doi.resolve_doi(&doi) {
            Ok(mut work) => {
                work.doi.get_or_insert(doi);
                return Ok(Reference::Work(work));
            }
            Err(e) if e.is_recoverable() => {
                debug!("DOI {doi} not resolved ({e}), trying bibliographic query");
            }
            Err(e) => return Err(e),
        }
    }
    query_or_text(text, resolvers)
}

fn query_or_text(
    text: &str,
    resolvers: &Resolvers,
) -> std::result::Result<Reference, ResolveError> {
    match resolvers.bibliographic.resolve_query(text) {
        Ok(Some(work)) => Ok(Reference::Work(work)),
        Ok(None) => {
            warn!("No bibliographic match, keeping raw reference: {}", preview(text));
            Ok(Reference::Text(text.to_string()))
        }
        Err(e) if e.is_recoverable() => {
            warn!("Bibliographic query failed ({e}), keeping raw reference: {}", preview(text));
            Ok(Reference::Text(text.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Resolve entries in order, at most `batch_size` lookups in flight.
/// Each batch settles completely before the next starts; a fatal error in
/// a batch is returned once that batch has settled.
pub fn resolve_references(
    texts: &[String],
    resolvers: &Resolvers,
    batch_size: usize,
) -> Result<Vec<Reference>> {
    let batch_size = batch_size.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(batch_size)
        .build()
        .map_err(|e| ResolveError::Fatal(format!("lookup pool: {e}")))?;

    let mut refs = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        let outcomes: Vec<_> = pool.install(|| {
            batch
                .par_iter()
                .map(|text| resolve_reference(text, resolvers))
                .collect()
        });
        for outcome in outcomes {
            refs.push(outcome?);
        }
        info!("Resolved references: {}/{}", refs.len(), texts.len());
    }
    Ok(refs)
}

/// Give every structured reference lacking an id the id `ref{N}`, where N
/// is its 1-based position in the bibliography. Ids already in the list are
/// never reused; a taken `ref{N}` moves on to the next free N.
pub fn assign_reference_ids(refs: &mut [Reference]) {
    let mut taken: HashSet<String> = refs
        .iter()
        .filter_map(|r| r.id().map(str::to_string))
        .collect();
    for (i, r) in refs.iter_mut().enumerate() {
        if let Reference::Work(work) = r
            && work.id.is_none()
        {
            let mut n = i + 1;
            while taken.contains(&format!("ref{n}")) {
                n += 1;
            }
            let id = format!("ref{n}");
            taken.insert(id.clone());
            work.id = Some(id);
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(60).collect()
}
