use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::discover::{iframe_src, Profile};
use crate::fetch::{decode_json, Fetch, Fetcher};
use crate::mapping::{CardTemplate, EmbedMeta};
use crate::merge::KeyMode;
use crate::sources::{key_mode, scrape_platform, Platform, Source};
use crate::types::ProjectCard;

pub const PROVENANCE: &str = "From SoundCloud.";
const OEMBED_URL: &str = "https://soundcloud.com/oembed";
const PLAYER_URL: &str = "https://w.soundcloud.com/player/";
const TITLE_SUFFIXES: &[&str] = &[" | Free Listening on SoundCloud", " | SoundCloud"];

#[derive(Debug, Deserialize)]
struct OEmbed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

pub struct SoundCloud {
    fetcher: Box<dyn Fetch>,
    profile: Profile,
    placeholder: String,
    cap: usize,
    mode: KeyMode,
}

impl SoundCloud {
    pub fn new(cfg: &SyncConfig, handle: &str) -> Result<Self> {
        Ok(Self::with_fetcher(cfg, handle, Box::new(Fetcher::new(cfg)?)))
    }

    pub fn with_fetcher(cfg: &SyncConfig, handle: &str, fetcher: Box<dyn Fetch>) -> Self {
        Self {
            fetcher,
            profile: Profile::SoundCloud { handle: handle.to_string() },
            placeholder: cfg.placeholder_thumb.clone(),
            cap: cfg.item_cap,
            mode: key_mode(cfg),
        }
    }
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

pub fn oembed_url(permalink: &str) -> String {
    format!("{OEMBED_URL}?format=json&url={}", encode(permalink))
}

/// Player URL built from the permalink alone.
pub fn player_url(permalink: &str) -> String {
    format!("{PLAYER_URL}?url={}&visual=true", encode(permalink))
}

#[async_trait]
impl Platform for SoundCloud {
    fn fetcher(&self) -> &dyn Fetch { self.fetcher.as_ref() }
    fn profile(&self) -> &Profile { &self.profile }

    fn template(&self) -> CardTemplate<'_> {
        CardTemplate {
            provenance: PROVENANCE,
            link_label: "Listen (SoundCloud)",
            placeholder: &self.placeholder,
            title_suffixes: TITLE_SUFFIXES,
        }
    }

    fn fallback_embed(&self, permalink: &str) -> String { player_url(permalink) }

    async fn lookup(&self, permalink: &str) -> Result<EmbedMeta> {
        let url = oembed_url(permalink);
        let o: OEmbed = decode_json(&url, &self.fetcher.fetch_text(&url).await?)?;
        Ok(EmbedMeta {
            title: o.title,
            author: o.author_name,
            thumbnail_url: o.thumbnail_url,
            embed_src: o.html.as_deref().and_then(iframe_src),
        })
    }
}

#[async_trait]
impl Source for SoundCloud {
    fn name(&self) -> &str { "soundcloud" }
    fn provenance(&self) -> &str { PROVENANCE }

    async fn scrape(&self) -> Result<Vec<ProjectCard>> {
        scrape_platform(self, self.cap, self.mode).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetch::canned::Canned;

    #[test]
    fn player_url_encodes_permalink() {
        assert_eq!(
            player_url("https://soundcloud.com/thirty_3/my-remix"),
            "https://w.soundcloud.com/player/?url=https%3A%2F%2Fsoundcloud.com%2Fthirty_3%2Fmy-remix&visual=true"
        );
    }

    #[test]
    fn oembed_url_is_keyed_by_permalink() {
        assert_eq!(
            oembed_url("https://soundcloud.com/thirty_3/a"),
            "https://soundcloud.com/oembed?format=json&url=https%3A%2F%2Fsoundcloud.com%2Fthirty_3%2Fa"
        );
    }

    #[test]
    fn oembed_payload_tolerates_missing_fields() {
        let o: OEmbed = serde_json::from_str(r#"{"version":1.0,"title":"A by b"}"#).unwrap();
        assert_eq!(o.title.as_deref(), Some("A by b"));
        assert!(o.html.is_none());
    }

    const FEED: &str = r#"<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
        <item><title>Night Drive</title><link>https://soundcloud.com/thirty_3/night-drive</link>
          <itunes:image href="https://i1.sndcdn.com/nd.jpg"/></item>
        <item><title>Tides</title><link>https://soundcloud.com/thirty_3/tides</link>
          <itunes:image href="https://i1.sndcdn.com/tides.jpg"/></item>
        <item><title>NIGHT  drive</title><link>https://soundcloud.com/thirty_3/night-drive-1</link></item>
        </channel></rss>"#;

    fn source(web: Arc<Canned>) -> SoundCloud {
        SoundCloud::with_fetcher(&SyncConfig::default(), "thirty_3", Box::new(web))
    }

    #[tokio::test]
    async fn feed_items_are_enriched_or_degraded_in_order() {
        let night = "https://soundcloud.com/thirty_3/night-drive";
        let oembed = r#"{"title":"Night Drive by thirty_3","author_name":"thirty_3",
            "thumbnail_url":"https://i1.sndcdn.com/artworks-nd-t500x500.jpg",
            "html":"<iframe width=\"100%\" src=\"https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Ftracks%2F7\"></iframe>"}"#;
        let web = Arc::new(
            Canned::default()
                .status("https://soundcloud.com/thirty_3", 403)
                .page("https://soundcloud.com/thirty_3/sounds.rss", FEED)
                .page(&oembed_url(night), oembed)
                .status(&oembed_url("https://soundcloud.com/thirty_3/tides"), 429),
        );
        let cards = source(web.clone()).scrape().await.unwrap();

        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Night Drive", "Tides"]);
        assert_eq!(cards[0].thumb, "https://i1.sndcdn.com/artworks-nd-t500x500.jpg");
        assert_eq!(cards[0].media.src, "https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Ftracks%2F7");
        assert_eq!(cards[1].thumb, "https://i1.sndcdn.com/tides.jpg");
        assert_eq!(cards[1].media.src, player_url("https://soundcloud.com/thirty_3/tides"));
        assert!(cards.iter().all(|c| c.desc == PROVENANCE));

        // Every discovered item gets exactly one lookup, in feed order.
        let lookups: Vec<String> = web.hits().into_iter().filter(|u| u.starts_with(OEMBED_URL)).collect();
        assert_eq!(lookups.len(), 3);
        assert_eq!(lookups[0], oembed_url(night));
    }

    #[tokio::test]
    async fn empty_profile_is_an_error_not_an_empty_refresh() {
        let page = r#"<html><body><div id="app"></div></body></html>"#;
        let web = Arc::new(
            Canned::default()
                .page("https://soundcloud.com/thirty_3", page)
                .page("https://soundcloud.com/thirty_3/tracks", page),
        );
        assert!(source(web).scrape().await.is_err());
    }
}
