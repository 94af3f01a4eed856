//! BASE (Bielefeld Academic Search Engine) provider.
//!
//! Runs an SRU `searchRetrieve` for the DOI and reads Dublin Core records.
//! Access to the API is whitelisted by IP address, so the provider is
//! disabled by default.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::fields::year_from_str;
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct BaseSource {
    ctx: SourceContext,
}

impl BaseSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for BaseSource {
    fn id(&self) -> &str {
        "base"
    }

    fn name(&self) -> &str {
        "BASE"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let query = format!("doi={}", doi);
        let request = self.ctx.client.get(&self.ctx.base_url).query(&[
            ("operation", "searchRetrieve"),
            ("query", query.as_str()),
            ("maximumRecords", "1"),
            ("recordSchema", "dc"),
        ]);
        let body = self.ctx.get_text(request, "BASE").await?;

        let record = parse_dublin_core(&body)?;
        if record.is_empty() {
            return Ok(None);
        }

        let pdf_url = record
            .identifiers
            .iter()
            .find(|id| id.to_lowercase().ends_with(".pdf"))
            .cloned();
        let metadata = PaperMetadata::default()
            .title(record.title)
            .journal(record.publisher)
            .year(record.date.as_deref().and_then(year_from_str))
            .authors(record.creators.into_iter().map(Author::new).collect());

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("repository"),
        ))
    }
}

/// The Dublin Core fields of the first record
#[derive(Debug, Default)]
struct DublinCore {
    title: Option<String>,
    creators: Vec<String>,
    publisher: Option<String>,
    date: Option<String>,
    identifiers: Vec<String>,
}

impl DublinCore {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.creators.is_empty() && self.identifiers.is_empty()
    }

    fn push(&mut self, tag: &[u8], text: String) {
        match tag {
            b"title" => {
                self.title.get_or_insert(text);
            }
            b"creator" => self.creators.push(text),
            b"publisher" => {
                self.publisher.get_or_insert(text);
            }
            b"date" => {
                self.date.get_or_insert(text);
            }
            b"identifier" => self.identifiers.push(text),
            _ => {}
        }
    }
}

fn parse_dublin_core(xml: &str) -> Result<DublinCore, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut record = DublinCore::default();
    let mut current: Option<Vec<u8>> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                if let Some(tag) = current.as_deref() {
                    let text = e
                        .unescape()
                        .map_err(|e| SourceError::Parse(format!("BASE XML: {}", e)))?
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        record.push(tag, text);
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }

    Ok(record)
}
