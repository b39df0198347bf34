pub mod bandcamp;
pub mod soundcloud;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::discover::{discover, Profile};
use crate::fetch::Fetch;
use crate::mapping::{card_from, CardTemplate, EmbedMeta, Enrichment};
use crate::merge::{dedupe, KeyMode};
use crate::types::ProjectCard;

pub use bandcamp::Bandcamp;
pub use soundcloud::SoundCloud;

/// One platform contributing cards to the catalog.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    /// `desc` stamped on this source's cards; identifies them on later runs.
    fn provenance(&self) -> &str;
    /// Recent items, newest first, already normalized and deduplicated.
    async fn scrape(&self) -> Result<Vec<ProjectCard>>;
}

/// Platform-specific pieces plugged into the shared scrape routine.
#[async_trait]
pub(crate) trait Platform: Send + Sync {
    fn fetcher(&self) -> &dyn Fetch;
    fn profile(&self) -> &Profile;
    fn template(&self) -> CardTemplate<'_>;
    fn fallback_embed(&self, permalink: &str) -> String;
    async fn lookup(&self, permalink: &str) -> Result<EmbedMeta>;
}

/// discover -> enrich each permalink in order -> normalize -> dedupe.
pub(crate) async fn scrape_platform<P: Platform>(p: &P, cap: usize, mode: KeyMode) -> Result<Vec<ProjectCard>> {
    let found = discover(p.fetcher(), p.profile(), cap).await?;
    let mut cards = Vec::with_capacity(found.items.len());
    let mut degraded = 0usize;
    for item in &found.items {
        let link = &item.permalink;
        let enrichment = Enrichment::from_result(p.lookup(link).await);
        if let Enrichment::Degraded { reason } = &enrichment {
            debug!(permalink = %link, "lookup failed, degrading: {reason}");
            degraded += 1;
        }
        cards.push(card_from(item, enrichment, p.fallback_embed(link), &p.template()));
    }
    let cards = dedupe(cards, mode);
    info!(profile = %p.profile().landing_url(), strategy = ?found.strategy, items = cards.len(), degraded, "scraped");
    Ok(cards)
}

/// Build every source enabled in `cfg`, in a stable order.
pub fn from_config(cfg: &SyncConfig) -> Result<Vec<Box<dyn Source>>> {
    let mut out: Vec<Box<dyn Source>> = Vec::new();
    if let Some(sc) = &cfg.soundcloud {
        out.push(Box::new(SoundCloud::new(cfg, &sc.handle)?));
    }
    if let Some(bc) = &cfg.bandcamp {
        out.push(Box::new(Bandcamp::new(cfg, &bc.handle)?));
    }
    Ok(out)
}

pub(crate) fn key_mode(cfg: &SyncConfig) -> KeyMode {
    if cfg.key_includes_kind { KeyMode::KindAndTitle } else { KeyMode::Title }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandcampConfig;

    #[test]
    fn sources_follow_config() {
        let mut cfg = SyncConfig::default();
        let names: Vec<String> = from_config(&cfg).unwrap().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["soundcloud"]);

        cfg.bandcamp = Some(BandcampConfig { handle: "thirty3".into() });
        cfg.soundcloud = None;
        let sources = from_config(&cfg).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "bandcamp");
        assert_eq!(sources[0].provenance(), "From Bandcamp.");
    }
}
