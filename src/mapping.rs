use std::fmt::Display;

use crate::discover::Candidate;
use crate::types::{Kind, Link, Media, ProjectCard};

/// Metadata returned by a platform's embed lookup for one permalink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail_url: Option<String>,
    pub embed_src: Option<String>,
}

/// Outcome of the per-item lookup. A degraded item is still emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Enriched(EmbedMeta),
    Degraded { reason: String },
}

impl Enrichment {
    pub fn from_result<E: Display>(res: Result<EmbedMeta, E>) -> Self {
        match res {
            Ok(meta) => Enrichment::Enriched(meta),
            Err(e) => Enrichment::Degraded { reason: format!("{e:#}") },
        }
    }
}

/// Per-platform constants stamped onto every card.
#[derive(Debug, Clone, Copy)]
pub struct CardTemplate<'a> {
    pub provenance: &'a str,
    pub link_label: &'a str,
    pub placeholder: &'a str,
    /// Fixed title suffixes the platform appends (matched case-insensitively).
    pub title_suffixes: &'a [&'a str],
}

/// Build a card from a discovered item. Missing fields fall back to the
/// listing's own title and artwork, then to the permalink slug and the
/// placeholder thumbnail.
pub fn card_from(item: &Candidate, enrichment: Enrichment, fallback_embed: String, tpl: &CardTemplate<'_>) -> ProjectCard {
    let listed_title = || {
        item.title
            .as_deref()
            .map(|t| clean_title(t, None, tpl.title_suffixes))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_permalink(&item.permalink))
    };
    let listed_thumb = || item.image.clone().unwrap_or_else(|| tpl.placeholder.to_string());
    let (title, thumb, media_src) = match enrichment {
        Enrichment::Enriched(meta) => {
            let title = meta
                .title
                .as_deref()
                .map(|t| clean_title(t, meta.author.as_deref(), tpl.title_suffixes))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(listed_title);
            let thumb = non_blank(meta.thumbnail_url).unwrap_or_else(listed_thumb);
            let src = non_blank(meta.embed_src).unwrap_or(fallback_embed);
            (title, thumb, src)
        }
        Enrichment::Degraded { .. } => (listed_title(), listed_thumb(), fallback_embed),
    };
    ProjectCard {
        title,
        kind: Kind::Solo,
        thumb,
        media: Media::embed(media_src),
        desc: tpl.provenance.to_string(),
        links: vec![Link { label: tpl.link_label.to_string(), href: item.permalink.clone() }],
        extra: Default::default(),
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Human-readable title from the last path segment: `my-remix` -> `My remix`.
pub fn title_from_permalink(permalink: &str) -> String {
    let path = permalink.split(['?', '#']).next().unwrap_or_default();
    let slug = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let spaced = slug.replace(['-', '_'], " ");
    let words: Vec<&str> = spaced.split_whitespace().collect();
    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trim and strip platform suffixes such as `" by <artist>"`.
pub fn clean_title(raw: &str, author: Option<&str>, suffixes: &[&str]) -> String {
    let mut title = raw.trim().to_string();
    for suffix in suffixes {
        title = strip_suffix_ci(&title, suffix).trim_end().to_string();
    }
    if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
        for sep in [", by ", " by ", " | ", " - "] {
            let suffix = format!("{sep}{author}");
            let stripped = strip_suffix_ci(&title, &suffix).trim_end();
            if stripped.len() != title.len() && !stripped.is_empty() {
                title = stripped.to_string();
                break;
            }
        }
    }
    title
}

fn strip_suffix_ci<'s>(s: &'s str, suffix: &str) -> &'s str {
    if suffix.is_empty() || s.len() < suffix.len() { return s; }
    let at = s.len() - suffix.len();
    if s.is_char_boundary(at) && s[at..].eq_ignore_ascii_case(suffix) { &s[..at] } else { s }
}
