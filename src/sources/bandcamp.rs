use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::SyncConfig;
use crate::discover::{open_graph, PageMeta, Profile};
use crate::fetch::{Fetch, Fetcher};
use crate::mapping::{CardTemplate, EmbedMeta};
use crate::merge::KeyMode;
use crate::sources::{key_mode, scrape_platform, Platform, Source};
use crate::types::ProjectCard;

pub const PROVENANCE: &str = "From Bandcamp.";

/// Bandcamp has no public oEmbed endpoint; each item page's OpenGraph tags
/// carry the same fields.
pub struct Bandcamp {
    fetcher: Box<dyn Fetch>,
    profile: Profile,
    placeholder: String,
    cap: usize,
    mode: KeyMode,
}

impl Bandcamp {
    pub fn new(cfg: &SyncConfig, handle: &str) -> Result<Self> {
        Ok(Self::with_fetcher(cfg, handle, Box::new(Fetcher::new(cfg)?)))
    }

    pub fn with_fetcher(cfg: &SyncConfig, handle: &str, fetcher: Box<dyn Fetch>) -> Self {
        Self {
            fetcher,
            profile: Profile::Bandcamp { handle: handle.to_string() },
            placeholder: cfg.placeholder_thumb.clone(),
            cap: cfg.item_cap,
            mode: key_mode(cfg),
        }
    }
}

fn embed_meta(meta: PageMeta) -> Result<EmbedMeta> {
    if meta.title.is_none() && meta.video.is_none() {
        bail!("item page has no OpenGraph metadata");
    }
    Ok(EmbedMeta { title: meta.title, author: meta.site_name, thumbnail_url: meta.image, embed_src: meta.video })
}

#[async_trait]
impl Platform for Bandcamp {
    fn fetcher(&self) -> &dyn Fetch { self.fetcher.as_ref() }
    fn profile(&self) -> &Profile { &self.profile }

    fn template(&self) -> CardTemplate<'_> {
        CardTemplate {
            provenance: PROVENANCE,
            link_label: "Listen (Bandcamp)",
            placeholder: &self.placeholder,
            title_suffixes: &[],
        }
    }

    // Player URLs need the numeric album/track id, which only the page has.
    fn fallback_embed(&self, permalink: &str) -> String { permalink.to_string() }

    async fn lookup(&self, permalink: &str) -> Result<EmbedMeta> {
        let html = self.fetcher.fetch_text(permalink).await?;
        embed_meta(open_graph(&html))
    }
}

#[async_trait]
impl Source for Bandcamp {
    fn name(&self) -> &str { "bandcamp" }
    fn provenance(&self) -> &str { PROVENANCE }

    async fn scrape(&self) -> Result<Vec<ProjectCard>> {
        scrape_platform(self, self.cap, self.mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::Candidate;
    use crate::fetch::canned::Canned;
    use crate::mapping::{card_from, Enrichment};

    #[test]
    fn page_without_og_tags_is_an_enrichment_failure() {
        assert!(embed_meta(PageMeta::default()).is_err());
    }

    #[test]
    fn og_fields_become_a_card() {
        let cfg = SyncConfig::default();
        let bc = Bandcamp::new(&cfg, "thirty3").unwrap();
        let page = r#"<html><head>
            <meta property="og:title" content="First EP, by thirty3">
            <meta property="og:site_name" content="thirty3">
            <meta property="og:image" content="https://f4.bcbits.com/img/a1_5.jpg">
            <meta property="og:video" content="https://bandcamp.com/EmbeddedPlayer/v=2/album=99/">
            </head></html>"#;
        let link = "https://thirty3.bandcamp.com/album/first-ep";
        let meta = Enrichment::from_result(embed_meta(open_graph(page)));
        let card = card_from(&Candidate::bare(link), meta, bc.fallback_embed(link), &bc.template());
        assert_eq!(card.title, "First EP");
        assert_eq!(card.thumb, "https://f4.bcbits.com/img/a1_5.jpg");
        assert_eq!(card.media.src, "https://bandcamp.com/EmbeddedPlayer/v=2/album=99/");
        assert_eq!(card.desc, PROVENANCE);
        assert_eq!(card.links[0].label, "Listen (Bandcamp)");
    }

    #[tokio::test]
    async fn scrapes_music_page_and_item_pages() {
        let music = r#"<html><body>
            <ol id="music-grid">
              <li><a href="/album/first-ep"><p class="title">First EP</p></a></li>
              <li><a href="/track/single?from=grid"><p class="title">Single</p></a></li>
              <li><a href="https://other.bandcamp.com/album/split">Split</a></li>
            </ol>
            <a href="/merch">Merch</a>
        </body></html>"#;
        let ep = r#"<html><head>
            <meta property="og:title" content="First EP, by thirty3">
            <meta property="og:site_name" content="thirty3">
            <meta property="og:image" content="https://f4.bcbits.com/img/a1_5.jpg">
            <meta property="og:video" content="https://bandcamp.com/EmbeddedPlayer/v=2/album=99/">
            </head></html>"#;
        let web = Canned::default()
            .page("https://thirty3.bandcamp.com/", "<html><body>redirecting</body></html>")
            .page("https://thirty3.bandcamp.com/music", music)
            .page("https://thirty3.bandcamp.com/album/first-ep", ep);
        let bc = Bandcamp::with_fetcher(&SyncConfig::default(), "thirty3", Box::new(web));
        let cards = bc.scrape().await.unwrap();
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First EP", "Single"]);
        assert_eq!(cards[0].media.src, "https://bandcamp.com/EmbeddedPlayer/v=2/album=99/");
        assert_eq!(cards[1].media.src, "https://thirty3.bandcamp.com/track/single");
        assert_eq!(cards[1].thumb, "image00015.jpeg");
    }
}
