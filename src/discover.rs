//! Permalink discovery for a source profile.
//!
//! Two strategies are tried in order: a syndication feed, then a scrape of the
//! profile's listing pages. Both only ever yield canonical permalinks inside
//! the profile's own namespace.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::Fetch;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[href]").expect("static selector"));
static NOSCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("noscript").expect("static selector"));
static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[content]").expect("static selector"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe[src]").expect("static selector"));

/// Second path segments on a SoundCloud profile that are not tracks.
const SOUNDCLOUD_NON_CONTENT: &[&str] = &[
    "likes", "reposts", "popular-tracks", "sets", "tracks", "albums", "playlists",
    "followers", "following", "comments", "spotlight", "toptracks", "sounds.rss", "stations",
];

const SOUNDCLOUD_FEED_MARKER: &str = "feeds.soundcloud.com/users/soundcloud:users:";

/// Which account a source scrapes, and therefore which URLs count as its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    SoundCloud { handle: String },
    Bandcamp { handle: String },
}

impl Profile {
    /// Page fetched first; also where a feed reference is looked for.
    pub fn landing_url(&self) -> String {
        match self {
            Profile::SoundCloud { handle } => format!("https://soundcloud.com/{handle}"),
            Profile::Bandcamp { handle } => format!("https://{handle}.bandcamp.com/"),
        }
    }

    /// Extra pages scanned when no feed is usable.
    pub fn listing_urls(&self) -> Vec<String> {
        match self {
            Profile::SoundCloud { handle } => vec![format!("https://soundcloud.com/{handle}/tracks")],
            Profile::Bandcamp { handle } => vec![format!("https://{handle}.bandcamp.com/music")],
        }
    }

    /// Feed URL derivable from the handle alone, tried when the landing page
    /// references none or cannot be fetched.
    pub fn known_feed(&self) -> Option<String> {
        match self {
            Profile::SoundCloud { handle } => Some(format!("https://soundcloud.com/{handle}/sounds.rss")),
            Profile::Bandcamp { .. } => None,
        }
    }

    /// Resolve `href` against `base` and return its canonical form if it is
    /// a content permalink owned by this profile.
    pub fn canonicalize(&self, href: &str, base: &Url) -> Option<String> {
        let url = base.join(href.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") { return None; }
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").or_else(|| host.strip_prefix("m.")).unwrap_or(&host);
        let segs: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        if segs.len() != 2 { return None; }
        match self {
            Profile::SoundCloud { handle } => {
                if host != "soundcloud.com" || !segs[0].eq_ignore_ascii_case(handle) { return None; }
                let slug = segs[1];
                if SOUNDCLOUD_NON_CONTENT.iter().any(|x| slug.eq_ignore_ascii_case(x)) { return None; }
                Some(format!("https://soundcloud.com/{}/{}", handle.to_ascii_lowercase(), slug))
            }
            Profile::Bandcamp { handle } => {
                if host != format!("{handle}.bandcamp.com") { return None; }
                if segs[0] != "album" && segs[0] != "track" { return None; }
                Some(format!("https://{host}/{}/{}", segs[0], segs[1]))
            }
        }
    }

    /// Feed URL embedded in page text (inline scripts, hydration JSON).
    fn embedded_feed(&self, text: &str) -> Option<String> {
        match self {
            Profile::SoundCloud { .. } => {
                let text: Cow<str> = if text.contains("\\/") { Cow::Owned(text.replace("\\/", "/")) } else { Cow::Borrowed(text) };
                text.match_indices(SOUNDCLOUD_FEED_MARKER).find_map(|(at, _)| {
                    let rest = &text[at + SOUNDCLOUD_FEED_MARKER.len()..];
                    let id_len = rest.bytes().take_while(u8::is_ascii_digit).count();
                    (id_len > 0 && rest[id_len..].starts_with("/sounds.rss"))
                        .then(|| format!("https://{SOUNDCLOUD_FEED_MARKER}{}/sounds.rss", &rest[..id_len]))
                })
            }
            Profile::Bandcamp { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Feed,
    PageScrape,
}

/// A permalink plus whatever the listing already said about it. Feed items
/// carry a title and artwork; scraped anchors carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub permalink: String,
    pub title: Option<String>,
    pub image: Option<String>,
}

impl Candidate {
    pub fn bare(permalink: impl Into<String>) -> Self {
        Self { permalink: permalink.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub strategy: Strategy,
    pub items: Vec<Candidate>,
}

/// Ordered, deduplicated, capped candidate accumulator.
struct Candidates<'a> {
    profile: &'a Profile,
    cap: usize,
    seen: HashSet<String>,
    out: Vec<Candidate>,
}

impl<'a> Candidates<'a> {
    fn new(profile: &'a Profile, cap: usize) -> Self {
        Self { profile, cap, seen: HashSet::new(), out: Vec::new() }
    }

    fn full(&self) -> bool { self.out.len() >= self.cap }

    fn push(&mut self, href: &str, base: &Url, title: Option<&str>, image: Option<&str>) {
        if self.full() { return; }
        let Some(permalink) = self.profile.canonicalize(href, base) else { return };
        if !self.seen.insert(permalink.clone()) { return; }
        let hint = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        self.out.push(Candidate { permalink, title: hint(title), image: hint(image) });
    }

    fn extend_hrefs(&mut self, hrefs: &[String], base: &Url) {
        for href in hrefs {
            self.push(href, base, None, None);
        }
    }
}

/// Feed first (referenced from the landing page, else derived from the
/// handle), then a scrape of the landing and listing pages. A source that
/// yields no permalinks by either route is an error, never an empty result.
pub async fn discover(fetcher: &dyn Fetch, profile: &Profile, cap: usize) -> Result<Discovery> {
    let landing = profile.landing_url();
    let base = Url::parse(&landing).with_context(|| format!("invalid profile URL: {landing}"))?;
    let landing_html = match fetcher.fetch_text(&landing).await {
        Ok(html) => Some(html),
        Err(e) => {
            warn!(profile = %landing, "profile page unreachable: {e}");
            None
        }
    };

    let mut feeds: Vec<String> = landing_html.as_deref().and_then(|h| locate_feed(h, &base, profile)).into_iter().collect();
    if let Some(known) = profile.known_feed().filter(|k| !feeds.contains(k)) {
        feeds.push(known);
    }
    for feed_url in &feeds {
        match feed_candidates(fetcher, feed_url, profile, cap).await {
            Ok(items) if !items.is_empty() => {
                info!(feed = %feed_url, count = items.len(), "discovered items via feed");
                return Ok(Discovery { strategy: Strategy::Feed, items });
            }
            Ok(_) => debug!(feed = %feed_url, "feed has no items in profile namespace"),
            Err(e) => warn!(feed = %feed_url, "feed unusable: {e:#}"),
        }
    }

    let mut acc = Candidates::new(profile, cap);
    if let Some(html) = &landing_html {
        acc.extend_hrefs(&page_hrefs(html), &base);
    }
    for url in profile.listing_urls() {
        if acc.full() { break; }
        let Ok(page_base) = Url::parse(&url) else { continue };
        match fetcher.fetch_text(&url).await {
            Ok(page) => acc.extend_hrefs(&page_hrefs(&page), &page_base),
            Err(e) => warn!("listing page skipped: {e}"),
        }
    }
    if acc.out.is_empty() {
        return Err(anyhow!("no permalinks discovered for {landing} (tried {} feed(s) and page scrape)", feeds.len()));
    }
    info!(profile = %landing, count = acc.out.len(), "discovered items via page scrape");
    Ok(Discovery { strategy: Strategy::PageScrape, items: acc.out })
}

async fn feed_candidates(fetcher: &dyn Fetch, feed_url: &str, profile: &Profile, cap: usize) -> Result<Vec<Candidate>> {
    let xml = fetcher.fetch_text(feed_url).await?;
    let entries = parse_feed(&xml).with_context(|| format!("malformed feed: {feed_url}"))?;
    let base = Url::parse(feed_url)?;
    Ok(candidates_from_feed(&entries, profile, &base, cap))
}

/// In-namespace candidates from feed entries, in feed order, keeping each
/// entry's title and artwork.
pub fn candidates_from_feed(entries: &[FeedEntry], profile: &Profile, base: &Url, cap: usize) -> Vec<Candidate> {
    let mut acc = Candidates::new(profile, cap);
    for e in entries {
        acc.push(&e.link, base, Some(e.title.as_str()), e.image.as_deref());
    }
    acc.out
}

/// Canonical in-namespace permalinks found in a profile/listing page.
pub fn permalinks_from_page(html: &str, profile: &Profile, base: &Url, cap: usize) -> Vec<String> {
    let mut acc = Candidates::new(profile, cap);
    acc.extend_hrefs(&page_hrefs(html), base);
    acc.out.into_iter().map(|c| c.permalink).collect()
}

/// Feed reference from a `<link rel="alternate">` tag, else one embedded in
/// the page text.
pub fn locate_feed(html: &str, base: &Url, profile: &Profile) -> Option<String> {
    let doc = Html::parse_document(html);
    let linked = doc.select(&LINK).find_map(|el| {
        let rel = el.value().attr("rel").unwrap_or_default().to_ascii_lowercase();
        let ty = el.value().attr("type").unwrap_or_default().to_ascii_lowercase();
        if !rel.split_whitespace().any(|r| r == "alternate") || !(ty.contains("rss") || ty.contains("atom")) {
            return None;
        }
        base.join(el.value().attr("href")?).ok().map(String::from)
    });
    linked.or_else(|| profile.embedded_feed(html))
}

/// Every anchor href in the page, including anchors inside `<noscript>`
/// blocks (which the HTML parser keeps as raw text).
pub fn page_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut hrefs: Vec<String> = doc
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href").map(str::to_string))
        .collect();
    for block in doc.select(&NOSCRIPT) {
        let inner: String = block.text().collect();
        if !inner.contains("href") { continue; }
        let frag = Html::parse_fragment(&inner);
        hrefs.extend(frag.select(&ANCHOR).filter_map(|a| a.value().attr("href").map(str::to_string)));
    }
    hrefs
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Item artwork: `itunes:image`, `media:thumbnail` or an image enclosure.
    pub image: Option<String>,
}

/// Parse RSS `<item>` or Atom `<entry>` elements, in document order.
/// Entries without a link are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if matches!(name.as_str(), "item" | "entry") {
                    current = Some(FeedEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    read_attributes(entry, &e)?;
                }
                field = name;
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    read_attributes(entry, &e)?;
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                fill_field(current.as_mut(), &field, &text);
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                fill_field(current.as_mut(), &field, &String::from_utf8_lossy(&raw));
            }
            Event::End(e) => {
                if matches!(e.local_name().as_ref(), b"item" | b"entry") {
                    if let Some(entry) = current.take().filter(|x| !x.link.is_empty()) {
                        entries.push(entry);
                    }
                }
                field.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

/// Links and artwork that feeds carry as attributes rather than text.
fn read_attributes(entry: &mut FeedEntry, e: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
    let attr = |name: &str| -> Result<Option<String>, quick_xml::Error> {
        match e.try_get_attribute(name)? {
            Some(a) => Ok(Some(a.unescape_value()?.trim().to_string()).filter(|v| !v.is_empty())),
            None => Ok(None),
        }
    };
    match e.local_name().as_ref() {
        b"link" => {
            let rel = attr("rel")?.unwrap_or_else(|| "alternate".into());
            if rel == "alternate" && entry.link.is_empty() {
                if let Some(href) = attr("href")? { entry.link = href; }
            }
        }
        b"image" if entry.image.is_none() => entry.image = attr("href")?,
        b"thumbnail" if entry.image.is_none() => entry.image = attr("url")?,
        b"enclosure" if entry.image.is_none() => {
            let is_image = attr("type")?.is_some_and(|t| t.starts_with("image/"));
            if is_image { entry.image = attr("url")?; }
        }
        _ => {}
    }
    Ok(())
}

fn fill_field(entry: Option<&mut FeedEntry>, field: &str, text: &str) {
    let Some(entry) = entry else { return };
    let text = text.trim();
    match field {
        "title" if entry.title.is_empty() => entry.title = text.to_string(),
        "link" if entry.link.is_empty() => entry.link = text.to_string(),
        _ => {}
    }
}

/// OpenGraph fields of an item page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
}

pub fn open_graph(html: &str) -> PageMeta {
    let doc = Html::parse_document(html);
    let mut meta = PageMeta::default();
    for el in doc.select(&META) {
        let key = el.value().attr("property").or_else(|| el.value().attr("name")).unwrap_or_default();
        let Some(content) = el.value().attr("content").map(str::trim).filter(|c| !c.is_empty()) else { continue };
        let slot = match key {
            "og:title" => &mut meta.title,
            "og:site_name" => &mut meta.site_name,
            "og:image" => &mut meta.image,
            "og:video" | "og:video:secure_url" => &mut meta.video,
            _ => continue,
        };
        if slot.is_none() { *slot = Some(content.to_string()); }
    }
    meta
}

/// `src` of the first `<iframe>` in an embed snippet.
pub fn iframe_src(markup: &str) -> Option<String> {
    let frag = Html::parse_fragment(markup);
    frag.select(&IFRAME)
        .filter_map(|f| f.value().attr("src"))
        .map(str::trim)
        .find(|s| s.starts_with("http"))
        .map(str::to_string)
}
