// src/feeds/payload.rs
//! Typed decoding of the payload shapes upstreams and proxies hand back.
//!
//! XML documents are sniffed by their root element (`rss`, `feed`, `rdf:RDF`)
//! and walked with the pull reader; entry fields are matched by local name. Proxy JSON is decoded against
//! the schema the calling strategy declares; there is no field probing beyond
//! [`RawPayload::detect`], which is only used when the shape is unknown.

use chrono::DateTime;
use once_cell::sync::OnceCell;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;

use crate::feeds::error::FeedError;

/// Shape a strategy expects its response body to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{status, message?, items: [...]}` as returned by rss2json-style proxies.
    Rss2Json,
    /// `{items: [...]}` from serverless RSS-to-JSON functions.
    ItemsArray,
    /// `{contents: "<rss ..."}` from relays that wrap the raw document.
    WrappedXml,
    /// The body is the feed document itself.
    RawXml,
}

const JSON_SHAPES: [PayloadShape; 3] = [
    PayloadShape::Rss2Json,
    PayloadShape::ItemsArray,
    PayloadShape::WrappedXml,
];

/// A decoded but not yet normalized payload.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Xml(String),
    Rss2Json(Rss2JsonResponse),
    Items(ItemsResponse),
}

/// Loosely typed entry shared by every shape, before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub author: Option<String>,
}

impl RawEntry {
    fn is_empty(&self) -> bool {
        blank(&self.title) && blank(&self.link) && blank(&self.id)
    }
}

fn blank(v: &Option<String>) -> bool {
    v.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

impl RawPayload {
    /// Decode `body` against a declared shape.
    pub fn decode(shape: PayloadShape, body: &str) -> Result<Self, FeedError> {
        match shape {
            PayloadShape::RawXml => Ok(RawPayload::Xml(body.to_string())),
            _ => {
                let value: Value = serde_json::from_str(body)?;
                Self::from_json(shape, value)
            }
        }
    }

    /// Best-effort detection for bodies of unknown origin.
    pub fn detect(body: &str) -> Result<Self, FeedError> {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            return Ok(RawPayload::Xml(trimmed.to_string()));
        }
        let value: Value = serde_json::from_str(trimmed)?;
        if let Value::String(s) = value {
            return Ok(RawPayload::Xml(s));
        }
        for shape in JSON_SHAPES {
            if let Ok(p) = Self::from_json(shape, value.clone()) {
                return Ok(p);
            }
        }
        Err(FeedError::Parse("unrecognised payload shape".into()))
    }

    fn from_json(shape: PayloadShape, value: Value) -> Result<Self, FeedError> {
        Ok(match shape {
            PayloadShape::Rss2Json => RawPayload::Rss2Json(serde_json::from_value(value)?),
            PayloadShape::ItemsArray => RawPayload::Items(serde_json::from_value(value)?),
            PayloadShape::WrappedXml => {
                let w: WrappedXml = serde_json::from_value(value)?;
                RawPayload::Xml(w.contents)
            }
            PayloadShape::RawXml => match value {
                Value::String(s) => RawPayload::Xml(s),
                _ => return Err(FeedError::Parse("expected raw xml document".into())),
            },
        })
    }

    /// Extract raw entries in payload order. Entries carrying no title, link
    /// or id are dropped.
    pub fn entries(&self) -> Result<Vec<RawEntry>, FeedError> {
        let entries = match self {
            RawPayload::Xml(xml) => parse_xml(xml)?,
            RawPayload::Rss2Json(r) => {
                if !r.status.eq_ignore_ascii_case("ok") {
                    let msg = r.message.clone().unwrap_or_else(|| "rss2json error".into());
                    return Err(FeedError::Parse(msg));
                }
                r.items.iter().map(JsonItem::to_entry).collect()
            }
            RawPayload::Items(r) => r.items.iter().map(JsonItem::to_entry).collect(),
        };
        Ok(entries.into_iter().filter(|e| !e.is_empty()).collect())
    }
}

// ------------------------------------------------------------
// JSON proxy shapes
// ------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Rss2JsonResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items: Vec<JsonItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemsResponse {
    pub items: Vec<JsonItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct WrappedXml {
    contents: String,
}

/// Item as emitted by JSON proxies. Field types vary between services, so
/// values are kept loose and flattened to text on extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonItem {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    link: Option<Value>,
    #[serde(default)]
    url: Option<Value>,
    #[serde(default)]
    guid: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<Value>,
    #[serde(default, rename = "isoDate")]
    iso_date: Option<Value>,
    #[serde(default)]
    published: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
}

impl JsonItem {
    fn to_entry(&self) -> RawEntry {
        RawEntry {
            title: json_text(&self.title),
            link: json_text(&self.link).or_else(|| json_text(&self.url)),
            id: json_text(&self.guid),
            description: json_text(&self.description).or_else(|| json_text(&self.content)),
            published: json_text(&self.pub_date)
                .or_else(|| json_text(&self.iso_date))
                .or_else(|| json_date(&self.published)),
            author: json_text(&self.author),
        }
    }
}

fn json_text(v: &Option<Value>) -> Option<String> {
    let s = match v.as_ref()? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("#text"))
            .and_then(Value::as_str)?
            .to_string(),
        _ => return None,
    };
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Serverless proxies report `published` as epoch milliseconds.
fn json_date(v: &Option<Value>) -> Option<String> {
    match v.as_ref()? {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|d| d.to_rfc3339()),
        other => json_text(&Some(other.clone())),
    }
}

// ------------------------------------------------------------
// XML documents
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlKind {
    Rss,
    Rdf,
    Atom,
}

/// One direct child of an `<item>`/`<entry>`, matched by local name so
/// `dc:creator` and `creator` are the same field.
#[derive(Debug, Default)]
struct Child {
    name: String,
    text: String,
    /// Text of a nested `<name>`, as in Atom `<author><name>`.
    nested_name: String,
    in_name: bool,
    href: Option<String>,
    rel: Option<String>,
}

impl Child {
    fn open(e: &BytesStart<'_>) -> Result<Self, FeedError> {
        let mut c = Child {
            name: local_name(e),
            ..Default::default()
        };
        for attr in e.attributes() {
            let attr = attr.map_err(xml_err)?;
            let value = attr.unescape_value().map_err(xml_err)?.into_owned();
            match attr.key.local_name().as_ref() {
                b"href" => c.href = Some(value),
                b"rel" => c.rel = Some(value),
                _ => {}
            }
        }
        Ok(c)
    }

    fn push(&mut self, s: &str) {
        if self.in_name {
            self.nested_name.push_str(s);
        } else {
            self.text.push_str(s);
        }
    }

    /// Author-like children prefer the nested `<name>` text.
    fn value(&self) -> &str {
        if self.nested_name.trim().is_empty() {
            &self.text
        } else {
            &self.nested_name
        }
    }
}

/// Children of one entry in document order. Repeated elements are kept;
/// readers pick the first non-blank one.
#[derive(Debug, Default)]
struct Children(Vec<Child>);

impl Children {
    fn first(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.value())
            .find(|v| !v.trim().is_empty())
            .map(str::to_string)
    }

    fn all(&self, name: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.value().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    fn into_rss_entry(self) -> RawEntry {
        let guid = self.first("guid");
        RawEntry {
            title: self.first("title"),
            link: self.first("link").or_else(|| guid.clone()),
            id: guid,
            description: self.first("description").or_else(|| self.first("encoded")),
            published: self.first("pubDate").or_else(|| self.first("date")),
            author: self.first("author").or_else(|| self.first("creator")),
        }
    }

    fn into_atom_entry(self) -> RawEntry {
        let id = self.first("id");
        let links: Vec<&Child> = self
            .0
            .iter()
            .filter(|c| c.name == "link")
            .filter(|c| c.href.as_deref().is_some_and(|h| !h.trim().is_empty()))
            .collect();
        let href = links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| links.first())
            .and_then(|l| l.href.clone());
        let authors = self.all("author");
        RawEntry {
            title: self.first("title"),
            link: href.or_else(|| id.clone()),
            id,
            description: self.first("summary").or_else(|| self.first("content")),
            published: self.first("updated").or_else(|| self.first("published")),
            author: (!authors.is_empty()).then(|| authors.join(", ")),
        }
    }
}

struct OpenEntry {
    depth: usize,
    children: Children,
    child: Option<Child>,
}

/// Walk the document once, collecting the direct children of every
/// `<item>` (RSS, RDF) or `<entry>` (Atom). Markup nested inside a child
/// contributes its text only.
fn parse_xml(xml: &str) -> Result<Vec<RawEntry>, FeedError> {
    let clean = scrub_html_entities_for_xml(xml);
    let kind = sniff_root(&clean)?;
    let entry_tag = match kind {
        XmlKind::Atom => "entry",
        XmlKind::Rss | XmlKind::Rdf => "item",
    };

    let mut reader = Reader::from_str(&clean);
    let mut depth = 0usize;
    let mut saw_channel = false;
    let mut open: Option<OpenEntry> = None;
    let mut out = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                depth += 1;
                let name = local_name(&e);
                if open.is_none() {
                    if name == entry_tag {
                        open = Some(OpenEntry {
                            depth,
                            children: Children::default(),
                            child: None,
                        });
                    } else {
                        saw_channel |= name == "channel";
                    }
                } else if let Some(o) = open.as_mut() {
                    match o.child.as_mut() {
                        None if depth == o.depth + 1 => o.child = Some(Child::open(&e)?),
                        Some(c) if name == "name" => c.in_name = true,
                        _ => {}
                    }
                }
            }
            Event::Empty(e) => match open.as_mut() {
                None => saw_channel |= local_name(&e) == "channel",
                Some(o) if o.child.is_none() && depth == o.depth => {
                    o.children.0.push(Child::open(&e)?)
                }
                Some(_) => {}
            },
            Event::Text(t) => {
                if let Some(c) = open.as_mut().and_then(|o| o.child.as_mut()) {
                    c.push(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(t) => {
                if let Some(c) = open.as_mut().and_then(|o| o.child.as_mut()) {
                    c.push(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => {
                let closes_entry = open.as_ref().is_some_and(|o| depth == o.depth);
                if closes_entry {
                    if let Some(done) = open.take() {
                        out.push(match kind {
                            XmlKind::Atom => done.children.into_atom_entry(),
                            XmlKind::Rss | XmlKind::Rdf => done.children.into_rss_entry(),
                        });
                    }
                } else if let Some(o) = open.as_mut() {
                    if depth == o.depth + 1 {
                        if let Some(c) = o.child.take() {
                            o.children.0.push(c);
                        }
                    } else if let Some(c) = o.child.as_mut() {
                        if e.local_name().as_ref() == b"name" {
                            c.in_name = false;
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if kind == XmlKind::Rss && !saw_channel {
        return Err(FeedError::Parse("rss document without <channel>".into()));
    }
    Ok(out)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn xml_err(e: impl std::fmt::Display) -> FeedError {
    FeedError::Parse(format!("xml: {e}"))
}

fn sniff_root(xml: &str) -> Result<XmlKind, FeedError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = local_name(&e).to_ascii_lowercase();
                return match name.as_str() {
                    "rss" => Ok(XmlKind::Rss),
                    "rdf" => Ok(XmlKind::Rdf),
                    "feed" => Ok(XmlKind::Atom),
                    other => Err(FeedError::Parse(format!("unrecognised root <{other}>"))),
                };
            }
            Ok(Event::Eof) => return Err(FeedError::Parse("empty xml document".into())),
            Err(e) => return Err(xml_err(e)),
            Ok(_) => continue,
        }
    }
}

/// HTML named entities are not valid XML; feeds use them anyway. Known ones
/// are decoded, unknown ones escaped so they survive as literal text.
fn scrub_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));
    re.replace_all(s, |caps: &Captures<'_>| {
        let whole = &caps[0];
        match &caps[1] {
            "amp" | "lt" | "gt" | "quot" | "apos" => whole.to_string(),
            name => {
                let decoded = html_escape::decode_html_entities(whole);
                if decoded == whole {
                    format!("&amp;{name};")
                } else {
                    decoded.into_owned()
                }
            }
        }
    })
}
