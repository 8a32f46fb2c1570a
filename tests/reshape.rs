use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use docshape::types::{
    Block, Cite, CreativeWork, Heading, Inline, Mark, Media, Organization, Paragraph, Reference,
    Table,
};
use docshape::{
    BibliographicResolver, DoiResolver, Document, Error, ReshapeOptions, ResolveError, Reshaper,
    Resolvers,
};

fn para(text: &str) -> Block {
    Block::Paragraph(Paragraph::new(vec![Inline::text(text)]))
}

fn heading(depth: u8, text: &str) -> Block {
    Block::Heading(Heading::new(depth, vec![Inline::text(text)]))
}

fn strong(text: &str) -> Inline {
    Inline::Strong(Mark::new(vec![Inline::text(text)]))
}

fn sup(text: &str) -> Inline {
    Inline::Superscript(Mark::new(vec![Inline::text(text)]))
}

fn image(url: &str) -> Block {
    Block::Paragraph(Paragraph::new(vec![Inline::Image(Media {
        content_url: url.to_string(),
        caption: None,
    })]))
}

fn titled(title: &str) -> CreativeWork {
    CreativeWork { title: Some(title.to_string()), ..Default::default() }
}

/// Answers DOI `10.1000/one` and queries mentioning "Paper two".
struct Catalogue;

impl DoiResolver for Catalogue {
    fn resolve_doi(&self, doi: &str) -> Result<CreativeWork, ResolveError> {
        match doi {
            "10.1000/one" => Ok(titled("Paper one")),
            _ => Err(ResolveError::NotFound),
        }
    }
}

impl BibliographicResolver for Catalogue {
    fn resolve_query(&self, text: &str) -> Result<Option<CreativeWork>, ResolveError> {
        if text.contains("boom") {
            return Err(ResolveError::Fatal("resolver misconfigured".into()));
        }
        if text.contains("times out") {
            return Err(ResolveError::Transport("timed out".into()));
        }
        Ok(text.contains("Paper two").then(|| titled("Paper two")))
    }
}

/// Records the highest number of concurrent queries.
#[derive(Default)]
struct Tracker {
    current: AtomicUsize,
    max: AtomicUsize,
    calls: AtomicUsize,
}

impl DoiResolver for Tracker {
    fn resolve_doi(&self, _doi: &str) -> Result<CreativeWork, ResolveError> {
        Err(ResolveError::NotFound)
    }
}

impl BibliographicResolver for Tracker {
    fn resolve_query(&self, text: &str) -> Result<Option<CreativeWork>, ResolveError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(titled(text)))
    }
}

fn paper() -> Document {
    Document {
        content: Some(vec![
            heading(1, "A Study of Things"),
            Block::Paragraph(Paragraph::new(vec![
                Inline::text("Jane Doe"),
                sup("1"),
                Inline::text(", John Smith"),
                sup("1,2"),
            ])),
            Block::Paragraph(Paragraph::new(vec![sup("1"), Inline::text("University of Somewhere")])),
            Block::Paragraph(Paragraph::new(vec![sup("2"), Inline::text("Institute of Things.")])),
            heading(2, "Abstract"),
            para("We study things."),
            Block::Paragraph(Paragraph::new(vec![strong("Keywords:"), Inline::text(" things, study")])),
            Block::Paragraph(Paragraph::new(vec![strong("Introduction")])),
            para("Prior work [1] shows this."),
            para("Table 1: Results by group"),
            Block::Table(Table::default()),
            image("plot.png"),
            para("Figure 1. A plot"),
            heading(2, "References"),
            para("1. Doe J. Paper one. doi:10.1000/one"),
            para("2. Smith J. Paper two. 2001."),
            para("3. Unknown stuff"),
        ]),
        ..Default::default()
    }
}

fn catalogue() -> Resolvers {
    Resolvers::with_backend(Arc::new(Catalogue))
}

#[test]
fn reshapes_a_complete_paper() {
    let doc = Reshaper::new(catalogue(), ReshapeOptions::default())
        .reshape(paper())
        .unwrap();

    assert_eq!(doc.title, Some(vec![Inline::text("A Study of Things")]));

    let authors = doc.authors.unwrap();
    assert_eq!(authors.len(), 2);
    assert_eq!(authors[0].given_names, vec!["Jane"]);
    assert_eq!(authors[0].family_names, vec!["Doe"]);
    assert_eq!(
        authors[0].affiliations,
        vec![Organization { name: "University of Somewhere".into() }]
    );
    assert_eq!(authors[1].family_names, vec!["Smith"]);
    assert_eq!(
        authors[1].affiliations,
        vec![
            Organization { name: "University of Somewhere".into() },
            Organization { name: "Institute of Things".into() },
        ]
    );

    assert_eq!(doc.description, Some(vec![para("We study things.")]));
    assert_eq!(doc.keywords, Some(vec!["things".to_string(), "study".to_string()]));

    let content = doc.content.unwrap();
    assert_eq!(content.len(), 4, "{content:#?}");
    assert_eq!(content[0], heading(1, "Introduction"));
    assert_eq!(content[1], para("Prior work [1] shows this."));
    let Block::Table(table) = &content[2] else { panic!("expected table") };
    assert_eq!(table.label.as_deref(), Some("Table 1"));
    assert_eq!(table.caption, Some(vec![para("Results by group")]));
    let Block::Figure(figure) = &content[3] else { panic!("expected figure") };
    assert_eq!(figure.label.as_deref(), Some("Figure 1"));
    assert_eq!(figure.caption, Some(vec![para("A plot")]));

    let refs = doc.references.unwrap();
    assert_eq!(refs.len(), 3);
    let Reference::Work(first) = &refs[0] else { panic!("expected a record") };
    assert_eq!(first.id.as_deref(), Some("ref1"));
    assert_eq!(first.title.as_deref(), Some("Paper one"));
    assert_eq!(first.doi.as_deref(), Some("10.1000/one"));
    assert_eq!(refs[1].id(), Some("ref2"));
    assert_eq!(refs[2], Reference::Text("Unknown stuff".into()));
}

#[test]
fn citation_post_pass_links_markers() {
    let options = ReshapeOptions { reshape_citations: true, ..Default::default() };
    let doc = Reshaper::new(catalogue(), options).reshape(paper()).unwrap();
    let content = doc.content.unwrap();
    let Block::Paragraph(body) = &content[1] else { panic!("expected paragraph") };
    assert_eq!(
        body.content,
        vec![
            Inline::text("Prior work "),
            Inline::Cite(Cite::new("ref1")),
            Inline::text(" shows this."),
        ]
    );
}

#[test]
fn second_pass_is_a_no_op() {
    let reshaper = Reshaper::new(catalogue(), ReshapeOptions::default());
    let once = reshaper.reshape(paper()).unwrap();
    let twice = reshaper.reshape(once.clone()).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn existing_fields_are_kept() {
    let doc = Document {
        title: Some(vec![Inline::text("Given")]),
        keywords: Some(vec!["kept".into()]),
        content: Some(vec![heading(1, "Not a title"), para("Keywords: x, y")]),
        ..Default::default()
    };
    let out = Reshaper::new(Resolvers::offline(), ReshapeOptions::default())
        .reshape(doc)
        .unwrap();
    assert_eq!(out.title, Some(vec![Inline::text("Given")]));
    assert_eq!(out.keywords, Some(vec!["kept".to_string()]));
    assert_eq!(out.content.unwrap().len(), 2);
}

#[test]
fn lookup_failures_keep_raw_text() {
    let doc = Document {
        content: Some(vec![
            para("Intro"),
            heading(1, "Bibliography"),
            para("[1] Slow J. Paper that times out. 2003."),
            para("[2] Smith J. Paper two."),
        ]),
        ..Default::default()
    };
    let out = Reshaper::new(catalogue(), ReshapeOptions::default()).reshape(doc).unwrap();
    let refs = out.references.unwrap();
    assert_eq!(refs[0], Reference::Text("Slow J. Paper that times out. 2003.".into()));
    let Reference::Work(work) = &refs[1] else { panic!("expected a record") };
    assert_eq!(work.id.as_deref(), Some("ref2"));
    assert_eq!(out.content, Some(vec![para("Intro")]));
}

#[test]
fn fatal_resolver_errors_abort() {
    let doc = Document {
        content: Some(vec![
            para("Intro"),
            heading(2, "References"),
            para("Fine entry"),
            para("Entry that goes boom"),
        ]),
        ..Default::default()
    };
    let err = Reshaper::new(catalogue(), ReshapeOptions::default())
        .reshape(doc)
        .unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::Fatal(_))), "{err:?}");
}

#[test]
fn lookups_are_bounded_per_batch() {
    let entries: Vec<Block> = (1..=25).map(|i| para(&format!("{i}. Entry number {i}"))).collect();
    let mut content = vec![para("Intro"), heading(1, "References")];
    content.extend(entries);
    let doc = Document { content: Some(content), ..Default::default() };

    let tracker = Arc::new(Tracker::default());
    let resolvers = Resolvers::with_backend(tracker.clone());
    let out = Reshaper::new(resolvers, ReshapeOptions::default()).reshape(doc.clone()).unwrap();

    assert_eq!(tracker.calls.load(Ordering::SeqCst), 25);
    let max = tracker.max.load(Ordering::SeqCst);
    assert!(max <= 10, "{max} lookups in flight");
    assert!(max > 1, "lookups ran sequentially");

    let refs = out.references.unwrap();
    let titles: Vec<_> = refs
        .iter()
        .map(|r| match r {
            Reference::Work(w) => w.title.clone().unwrap_or_default(),
            Reference::Text(s) => s.clone(),
        })
        .collect();
    let expected: Vec<_> = (1..=25).map(|i| format!("Entry number {i}")).collect();
    assert_eq!(titles, expected);
    assert_eq!(refs[24].id(), Some("ref25"));

    let tracker = Arc::new(Tracker::default());
    let options = ReshapeOptions { max_concurrent_lookups: 3, ..Default::default() };
    Reshaper::new(Resolvers::with_backend(tracker.clone()), options)
        .reshape(doc)
        .unwrap();
    assert!(tracker.max.load(Ordering::SeqCst) <= 3);
}

#[test]
fn reshapes_decoder_json() {
    let doc: Document = serde_json::from_str(
        r#"{
            "content": [
                {"type": "Paragraph", "content": ["On Reshaping"], "meta": {"style": "Title"}},
                {"type": "Paragraph", "content": ["keywords: json; decoding"]},
                {"type": "Paragraph", "content": ["let x = 1;"], "meta": {"style": "Code"}},
                {"type": "Paragraph", "content": ["let y = 2;"], "meta": {"style": "Code"}}
            ]
        }"#,
    )
    .unwrap();
    let out = Reshaper::new(Resolvers::offline(), ReshapeOptions::default())
        .reshape(doc)
        .unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "title": ["On Reshaping"],
            "keywords": ["json", "decoding"],
            "content": [{"type": "CodeBlock", "text": "let x = 1;\nlet y = 2;"}]
        })
    );
}
