use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grouping tag used by the site to place a card.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Kind {
    #[default]
    Solo,
    Other(String),
}

impl Kind {
    pub fn as_str(&self) -> &str {
        match self {
            Kind::Solo => "solo",
            Kind::Other(s) => s,
        }
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        match s.as_str() { "solo" => Kind::Solo, _ => Kind::Other(s) }
    }
}

impl From<Kind> for String {
    fn from(k: Kind) -> Self {
        match k { Kind::Solo => "solo".to_string(), Kind::Other(s) => s }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Embed,
    Image,
    Other(String),
}

impl From<String> for MediaType {
    fn from(s: String) -> Self {
        match s.as_str() { "embed" => MediaType::Embed, "image" => MediaType::Image, _ => MediaType::Other(s) }
    }
}

impl From<MediaType> for String {
    fn from(m: MediaType) -> Self {
        match m {
            MediaType::Embed => "embed".to_string(),
            MediaType::Image => "image".to_string(),
            MediaType::Other(s) => s,
        }
    }
}

/// What the detail view shows: a player iframe or a plain image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub mediatype: MediaType,
    pub src: String,
}

impl Media {
    pub fn embed(src: impl Into<String>) -> Self { Self { mediatype: MediaType::Embed, src: src.into() } }
    pub fn image(src: impl Into<String>) -> Self { Self { mediatype: MediaType::Image, src: src.into() } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

/// One entry of the persisted catalog.
///
/// Fields this crate does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub title: String,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default)]
    pub thumb: String,
    pub media: Media,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One element of the catalog file.
///
/// Elements read back from disk stay `Kept`: they are written out exactly as
/// found, whether or not they decode as a full [`ProjectCard`]. Only `title`,
/// `kind` and `desc` are ever read from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Card(ProjectCard),
    Kept(Value),
}

impl<'de> Deserialize<'de> for CatalogEntry {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Value::deserialize(d).map(CatalogEntry::Kept)
    }
}

impl From<ProjectCard> for CatalogEntry {
    fn from(card: ProjectCard) -> Self { CatalogEntry::Card(card) }
}

impl CatalogEntry {
    fn field(&self, name: &str) -> Option<&str> {
        match self {
            CatalogEntry::Card(_) => None,
            CatalogEntry::Kept(v) => v.get(name).and_then(Value::as_str),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogEntry::Card(c) => &c.title,
            kept => kept.field("title").unwrap_or_default(),
        }
    }

    pub fn desc(&self) -> &str {
        match self {
            CatalogEntry::Card(c) => &c.desc,
            kept => kept.field("desc").unwrap_or_default(),
        }
    }

    /// Missing kind reads as `solo`, like a decoded card.
    pub fn kind(&self) -> &str {
        match self {
            CatalogEntry::Card(c) => c.kind.as_str(),
            kept => kept.field("kind").unwrap_or("solo"),
        }
    }

    /// The entry as a card, if it has the full card shape.
    pub fn to_card(&self) -> Option<ProjectCard> {
        match self {
            CatalogEntry::Card(c) => Some(c.clone()),
            CatalogEntry::Kept(v) => serde_json::from_value(v.clone()).ok(),
        }
    }
}
