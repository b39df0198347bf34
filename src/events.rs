use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A gig listed on the site. Read-only from this crate's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEntry {
    pub title: String,
    /// ISO `YYYY-MM-DD`; absent or blank means "date to be announced".
    pub date: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub subtitle: Option<String>,
    pub link: String,
}

impl EventEntry {
    fn day(&self) -> Option<&str> {
        self.date.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// Venue, city and country, skipping blanks.
    pub fn location(&self) -> String {
        [&self.venue, &self.city, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref().map(str::trim).filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join(" — ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBoard {
    /// Today or later, soonest first; undated entries last.
    pub upcoming: Vec<EventEntry>,
    /// Before today, most recent first.
    pub past: Vec<EventEntry>,
}

pub fn partition(entries: Vec<EventEntry>, today: NaiveDate) -> EventBoard {
    let today = today.format("%Y-%m-%d").to_string();
    let mut board = EventBoard::default();
    for mut e in entries {
        e.date = e.day().map(str::to_string);
        let is_past = matches!(e.day(), Some(d) if d < today.as_str());
        if is_past { board.past.push(e) } else { board.upcoming.push(e) }
    }
    board.upcoming.sort_by(|a, b| match (a.day(), b.day()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    board.past.sort_by(|a, b| b.day().cmp(&a.day()));
    board
}

/// Badge text such as `01 Jan 2023`; `None` for unparseable dates.
pub fn badge_date(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok().map(|d| d.format("%d %b %Y").to_string())
}

pub async fn load_events(path: &Path) -> Result<Vec<EventEntry>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read events: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid events file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(date: &str) -> EventEntry {
        EventEntry { title: format!("gig {date}"), date: Some(date.into()), link: "https://ra.co/x".into(), ..Default::default() }
    }

    fn dates(list: &[EventEntry]) -> Vec<&str> {
        list.iter().map(|e| e.date.as_deref().unwrap_or("")).collect()
    }

    #[test]
    fn splits_upcoming_and_past() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let board = partition(vec![ev("2023-01-01"), ev("2099-01-01"), ev("")], today);
        assert_eq!(dates(&board.upcoming), vec!["2099-01-01", ""]);
        assert_eq!(dates(&board.past), vec!["2023-01-01"]);
    }

    #[test]
    fn ordering_within_lists() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entries = vec![
            ev(" 2025-06-01 "),
            ev("2024-12-31"),
            EventEntry { date: None, ..ev("") },
            ev("2025-07-15"),
            ev("2022-03-03"),
            ev("2025-06-20"),
        ];
        let board = partition(entries, today);
        assert_eq!(dates(&board.upcoming), vec!["2025-06-01", "2025-06-20", "2025-07-15", ""]);
        assert_eq!(dates(&board.past), vec!["2024-12-31", "2022-03-03"]);
        assert_eq!(board.upcoming[3].date, None);
    }

    #[test]
    fn badge_and_location_formatting() {
        assert_eq!(badge_date("2023-01-01").as_deref(), Some("01 Jan 2023"));
        assert_eq!(badge_date("soon"), None);
        let e = EventEntry { venue: Some("Club".into()), city: Some(" ".into()), country: Some("SE".into()), ..Default::default() };
        assert_eq!(e.location(), "Club — SE");
    }

    #[tokio::test]
    async fn loads_sparse_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.json");
        std::fs::write(&path, r#"[{"title":"A","link":"https://x"},{"title":"B","date":"2030-01-01","city":"Oslo"}]"#).unwrap();
        let list = load_events(&path).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].city.as_deref(), Some("Oslo"));
        assert_eq!(list[0].date, None);
    }
}
