//! Decode an Atom feed page into records.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{Page, Record};
use crate::error::ParseError;

/// Parse one page of the query API's Atom response.
///
/// Records keep document order. An entry without `<id>` or `<updated>`, or
/// with an `<updated>` that is not RFC 3339, fails the whole page. So does an
/// error entry (`<id>http://arxiv.org/api/errors#...</id>`), which the API
/// returns with status 200 for a query it rejects.
pub fn parse_feed(xml: &[u8]) -> Result<Page, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut total_results = None;
    let mut buf = Vec::new();

    let mut current_entry: Option<EntryBuilder> = None;
    let mut current_element = String::new();
    let mut saw_feed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "feed" => saw_feed = true,
                    "entry" => current_entry = Some(EntryBuilder::default()),
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(builder) = current_entry.take() {
                        records.push(builder.build()?);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| ParseError::Xml(err.to_string()))?
                    .to_string();
                match current_entry.as_mut() {
                    Some(entry) => entry.push_text(&current_element, &text),
                    None if current_element == "totalResults" => {
                        total_results = text.trim().parse::<u64>().ok();
                    }
                    None => {}
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(entry) = current_entry.as_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    entry.push_text(&current_element, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(ParseError::Xml("no <feed> element".to_string()));
    }

    Ok(Page {
        records,
        total_results,
    })
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|t| t.with_timezone(&Utc))
}

#[derive(Default)]
struct EntryBuilder {
    id: Option<String>,
    updated: Option<String>,
    published: Option<String>,
    title: String,
    summary: String,
}

impl EntryBuilder {
    fn push_text(&mut self, element: &str, text: &str) {
        match element {
            "id" => self.id = Some(text.trim().to_string()),
            "updated" => self.updated = Some(text.trim().to_string()),
            "published" => self.published = Some(text.trim().to_string()),
            "title" => append_text(&mut self.title, text),
            "summary" => append_text(&mut self.summary, text),
            _ => {}
        }
    }

    fn build(self) -> Result<Record, ParseError> {
        let id = self.id.ok_or(ParseError::MissingField("id"))?;
        if is_api_error(&id) {
            return Err(ParseError::Api {
                id,
                message: normalize_whitespace(&self.summary),
            });
        }
        let raw_updated = self.updated.ok_or(ParseError::MissingField("updated"))?;
        let updated = parse_timestamp(&raw_updated).map_err(|source| ParseError::Timestamp {
            id: id.clone(),
            value: raw_updated.clone(),
            source,
        })?;
        let published = match self.published {
            Some(raw) => match parse_timestamp(&raw) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::debug!(%id, value = %raw, "ignoring unparseable <published>: {}", e);
                    None
                }
            },
            None => None,
        };
        Ok(Record {
            id,
            updated,
            published,
            title: normalize_whitespace(&self.title),
            artifact: None,
        })
    }
}

fn append_text(field: &mut String, text: &str) {
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(text);
}

/// Error entries live under `/api/errors`, e.g. `http://arxiv.org/api/errors#incorrect_id_format`.
fn is_api_error(id: &str) -> bool {
    url::Url::parse(id)
        .map(|u| u.path().trim_end_matches('/') == "/api/errors")
        .unwrap_or(false)
}

/// Titles come wrapped over several lines; collapse runs of whitespace.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
