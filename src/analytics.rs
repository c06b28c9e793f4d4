//! Append-only view/click tracking with dashboard aggregations.
//!
//! The store follows an explicit Uninitialized → Hydrated lifecycle: events
//! tracked before `hydrate()` are dropped so a freshly constructed (empty)
//! store can never flush over a saved log.

use crate::catalog::CatalogStore;
use crate::storage::{JsonStore, ANALYTICS_KEY};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub poster_id: String,
    pub timestamp: DateTime<Utc>,
    /// Where the view happened (gallery, detail page, search, ...).
    pub source: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub poster_id: String,
    pub timestamp: DateTime<Utc>,
    /// What was clicked (add_to_cart, buy_now, ...).
    pub action: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AnalyticsLog {
    views: Vec<ViewEvent>,
    clicks: Vec<ClickEvent>,
}

/// One row of the top-posters dashboard table.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterEngagement {
    pub poster_id: String,
    pub poster_title: String,
    pub views: u64,
    pub clicks: u64,
    pub total: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub views: u64,
    pub clicks: u64,
}

/// Per-day counts for the engagement chart, oldest day first.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyEngagement {
    pub date: NaiveDate,
    pub views: u64,
    pub clicks: u64,
}

pub struct AnalyticsStore {
    log: AnalyticsLog,
    hydrated: bool,
    storage: JsonStore,
}

impl AnalyticsStore {
    /// Starts unhydrated; tracking calls are dropped until `hydrate()`.
    pub fn new(storage: JsonStore) -> Self {
        Self {
            log: AnalyticsLog::default(),
            hydrated: false,
            storage,
        }
    }

    /// One-time load of the persisted log.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }
        self.log = self.storage.get(ANALYTICS_KEY).unwrap_or_default();
        self.hydrated = true;
    }

    fn persist(&self) {
        self.storage.put(ANALYTICS_KEY, &self.log);
    }

    pub fn track_view(&mut self, poster_id: impl Into<String>, source: impl Into<String>) {
        if !self.hydrated {
            tracing::debug!("dropping view event tracked before hydration");
            return;
        }
        self.log.views.push(ViewEvent {
            poster_id: poster_id.into(),
            timestamp: Utc::now(),
            source: source.into(),
        });
        self.persist();
    }

    pub fn track_click(&mut self, poster_id: impl Into<String>, action: impl Into<String>) {
        if !self.hydrated {
            tracing::debug!("dropping click event tracked before hydration");
            return;
        }
        self.log.clicks.push(ClickEvent {
            poster_id: poster_id.into(),
            timestamp: Utc::now(),
            action: action.into(),
        });
        self.persist();
    }

    pub fn views(&self) -> &[ViewEvent] {
        &self.log.views
    }

    pub fn clicks(&self) -> &[ClickEvent] {
        &self.log.clicks
    }

    pub fn total_views(&self) -> u64 {
        self.log.views.len() as u64
    }

    pub fn total_clicks(&self) -> u64 {
        self.log.clicks.len() as u64
    }

    /// Number of distinct posters that have been viewed at least once.
    pub fn unique_views(&self) -> u64 {
        self.log
            .views
            .iter()
            .map(|v| v.poster_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64
    }

    /// Views and clicks grouped per poster, sorted by combined count
    /// descending, top `n`. Titles resolve through the catalog; posters
    /// that have since been deleted show as "Unknown Poster".
    pub fn top_posters(&self, n: usize, catalog: &CatalogStore) -> Vec<PosterEngagement> {
        let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
        for v in &self.log.views {
            counts.entry(v.poster_id.as_str()).or_default().0 += 1;
        }
        for c in &self.log.clicks {
            counts.entry(c.poster_id.as_str()).or_default().1 += 1;
        }
        let mut rows: Vec<PosterEngagement> = counts
            .into_iter()
            .map(|(poster_id, (views, clicks))| PosterEngagement {
                poster_id: poster_id.to_string(),
                poster_title: catalog
                    .get(poster_id)
                    .map(|p| p.title.clone())
                    .unwrap_or_else(|| "Unknown Poster".to_string()),
                views,
                clicks,
                total: views + clicks,
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        rows.truncate(n);
        rows
    }

    /// Per-category totals in catalog insertion order: each poster's counts
    /// land in the bucket of its current category.
    pub fn category_stats(&self, catalog: &CatalogStore) -> Vec<CategoryStats> {
        let mut per_poster: HashMap<&str, (u64, u64)> = HashMap::new();
        for v in &self.log.views {
            per_poster.entry(v.poster_id.as_str()).or_default().0 += 1;
        }
        for c in &self.log.clicks {
            per_poster.entry(c.poster_id.as_str()).or_default().1 += 1;
        }
        let mut stats: Vec<CategoryStats> = Vec::new();
        for poster in catalog.posters() {
            let (views, clicks) = per_poster.get(poster.id.as_str()).copied().unwrap_or((0, 0));
            match stats.iter_mut().find(|s| s.category == poster.category) {
                Some(bucket) => {
                    bucket.views += views;
                    bucket.clicks += clicks;
                }
                None => stats.push(CategoryStats {
                    category: poster.category.clone(),
                    views,
                    clicks,
                }),
            }
        }
        stats
    }

    /// Daily view/click counts for the last `days` calendar days, oldest to
    /// newest, with empty days zero-filled.
    pub fn views_over_time(&self, days: u64) -> Vec<DailyEngagement> {
        let today = Utc::now().date_naive();
        (0..days)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| DailyEngagement {
                date,
                views: self
                    .log
                    .views
                    .iter()
                    .filter(|v| v.timestamp.date_naive() == date)
                    .count() as u64,
                clicks: self
                    .log
                    .clicks
                    .iter()
                    .filter(|c| c.timestamp.date_naive() == date)
                    .count() as u64,
            })
            .collect()
    }

    /// Reset both logs and erase the persisted copy.
    pub fn clear(&mut self) {
        self.log = AnalyticsLog::default();
        self.storage.remove(ANALYTICS_KEY);
    }
}
