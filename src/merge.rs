use std::collections::HashSet;

use tracing::{debug, warn};

use crate::types::{CatalogEntry, ProjectCard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMode {
    #[default]
    Title,
    KindAndTitle,
}

/// Lowercased, trimmed title with internal whitespace runs collapsed.
pub fn norm_title(t: &str) -> String {
    let t = t.trim().to_lowercase();
    let mut o = String::with_capacity(t.len());
    let mut s = false;
    for c in t.chars() {
        if c.is_whitespace() {
            if !s { o.push(' '); s = true; }
        } else {
            o.push(c); s = false;
        }
    }
    o
}

fn key(kind: &str, title: &str, mode: KeyMode) -> String {
    match mode {
        KeyMode::Title => norm_title(title),
        KeyMode::KindAndTitle => format!("{kind}|{}", norm_title(title)),
    }
}

pub fn dedupe_key(card: &ProjectCard, mode: KeyMode) -> String {
    key(card.kind.as_str(), &card.title, mode)
}

pub fn entry_key(entry: &CatalogEntry, mode: KeyMode) -> String {
    key(entry.kind(), entry.title(), mode)
}

/// Keep the first card per key, in input order.
pub fn dedupe(cards: Vec<ProjectCard>, mode: KeyMode) -> Vec<ProjectCard> {
    let mut seen = HashSet::new();
    cards.into_iter().filter(|c| seen.insert(dedupe_key(c, mode))).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
    pub entries: Vec<CatalogEntry>,
    /// Fresh cards kept.
    pub fresh: usize,
    /// Persisted entries carried over unchanged.
    pub carried: usize,
    /// Persisted entries dropped because their source was refreshed.
    pub replaced: usize,
}

/// Fresh cards first, then persisted entries whose key is not taken yet.
/// Persisted entries whose `desc` names a refreshed source are dropped
/// outright, so a source's stale entries never survive its own refresh.
/// Persisted entries without a title have no key and are always carried.
pub fn merge(fresh: Vec<ProjectCard>, existing: Vec<CatalogEntry>, refreshed: &[String], mode: KeyMode) -> Merged {
    let mut seen = HashSet::new();
    let mut out = Merged::default();

    for card in fresh {
        if norm_title(&card.title).is_empty() {
            warn!("dropping fresh item without a title: {:?}", card.links.first().map(|l| &l.href));
            continue;
        }
        if seen.insert(dedupe_key(&card, mode)) {
            out.entries.push(card.into());
            out.fresh += 1;
        }
    }

    for entry in existing {
        if refreshed.iter().any(|p| p == entry.desc()) {
            debug!(title = entry.title(), "superseded by refreshed source");
            out.replaced += 1;
            continue;
        }
        let carry = norm_title(entry.title()).is_empty() || seen.insert(entry_key(&entry, mode));
        if carry {
            out.entries.push(entry);
            out.carried += 1;
        }
    }
    out
}
