//! Reshape flat, loosely structured scholarly documents (as produced by
//! word-processor decoders) into semantically structured ones: title,
//! authors with affiliations, abstract, keywords, captioned tables and
//! figures, code blocks and a resolved bibliography.

pub mod cache;
pub mod caption;
pub mod cite;
pub mod config;
pub mod crossref;
pub mod error;
pub mod markers;
pub mod person;
pub mod predicates;
pub mod reshape;
pub mod resolve;
pub mod text;
pub mod types;

pub use cache::LookupCache;
pub use caption::separate_label_caption;
pub use cite::reshape_citations;
pub use config::ReshapeOptions;
pub use crossref::CrossRef;
pub use error::{Error, ResolveError, Result};
pub use reshape::{Reshaper, reshape};
pub use resolve::{BibliographicResolver, DoiResolver, PersonResolver, Resolvers};
pub use text::text_content;
pub use types::Document;
