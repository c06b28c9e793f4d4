//! Poster catalog store.
//!
//! The in-memory collection is seeded from a hardcoded reference list and
//! reconciled against the persisted snapshot at startup. The seed is
//! authoritative for price, image, category and featured flags, so pricing
//! changes ship with the code even when a stale snapshot is on disk;
//! admin-created posters without a seed counterpart survive reconciliation.

use crate::pricing::SPLIT_POSTERS_CATEGORY;
use crate::storage::{JsonStore, CATALOG_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    pub id: String,
    pub title: String,
    pub category: String,
    /// A4 price in whole rupees.
    pub price: i64,
    /// A3 price in whole rupees.
    pub price_a3: i64,
    pub description: String,
    pub image_url: String,
    pub slug: String,
    #[serde(default)]
    pub featured: bool,
}

/// Payload for an admin-created poster. Prices fall back to the category
/// defaults when omitted.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoster {
    pub title: String,
    pub category: String,
    pub price: Option<i64>,
    pub price_a3: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update; only present fields are merged. A title change
/// regenerates the slug.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub price_a3: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
}

/// Derive a URL slug from a title: lowercase, strip non-word characters,
/// whitespace to hyphens, consecutive hyphens collapsed.
pub fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
            cleaned.push(c);
        }
    }
    let mut slug = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c.is_whitespace() || c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else {
            slug.push(c);
        }
    }
    slug
}

/// Turn a hyphenated category slug back into its display name:
/// `"split-posters"` → `"Split Posters"`. Inputs without hyphens pass
/// through with only the first letter capitalized.
pub fn normalize_category_slug(slug: &str) -> String {
    slug.split('-')
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default catalog-record prices (A4, A3) for a category.
pub fn category_default_prices(category: &str) -> (i64, i64) {
    if category == SPLIT_POSTERS_CATEGORY {
        (399, 299)
    } else {
        (99, 149)
    }
}

/// Merge the seed list with a persisted snapshot.
///
/// Per-field authority: for ids present in both, the seed wins on `price`,
/// `price_a3`, `image_url`, `category` and `featured`; everything else
/// (admin edits to title, description, slug) comes from the snapshot.
/// Snapshot-only records are kept when they carry a real image, with prices
/// forced to the category defaults; the rest are dropped.
pub fn reconcile(seed: Vec<Poster>, persisted: Vec<Poster>) -> Vec<Poster> {
    let mut stored: HashMap<String, Poster> =
        persisted.iter().map(|p| (p.id.clone(), p.clone())).collect();
    let mut out = Vec::with_capacity(seed.len());
    for s in seed {
        match stored.remove(&s.id) {
            Some(p) => out.push(Poster {
                price: s.price,
                price_a3: s.price_a3,
                image_url: s.image_url,
                category: s.category,
                featured: s.featured,
                ..p
            }),
            None => out.push(s),
        }
    }
    for p in persisted {
        let Some(mut extra) = stored.remove(&p.id) else {
            continue;
        };
        if extra.image_url.is_empty() || extra.image_url == PLACEHOLDER_IMAGE {
            continue;
        }
        let (price, price_a3) = category_default_prices(&extra.category);
        extra.price = price;
        extra.price_a3 = price_a3;
        out.push(extra);
    }
    out
}

pub struct CatalogStore {
    posters: Vec<Poster>,
    storage: JsonStore,
}

impl CatalogStore {
    /// Hydrate from storage, reconcile against the seed list and persist
    /// the result immediately.
    pub fn load(storage: JsonStore) -> Self {
        let persisted: Vec<Poster> = storage.get(CATALOG_KEY).unwrap_or_default();
        let posters = reconcile(seed_posters(), persisted);
        let store = Self { posters, storage };
        store.persist();
        store
    }

    fn persist(&self) {
        self.storage.put(CATALOG_KEY, &self.posters);
    }

    pub fn posters(&self) -> &[Poster] {
        &self.posters
    }

    pub fn add(&mut self, new: NewPoster) -> Poster {
        let (default_price, default_price_a3) = category_default_prices(&new.category);
        let poster = Poster {
            id: Uuid::now_v7().to_string(),
            slug: slugify(&new.title),
            title: new.title,
            category: new.category,
            price: new.price.unwrap_or(default_price),
            price_a3: new.price_a3.unwrap_or(default_price_a3),
            description: new.description,
            image_url: new.image_url,
            featured: new.featured,
        };
        self.posters.push(poster.clone());
        self.persist();
        poster
    }

    /// Merge a partial update into the matching record. Returns `None`
    /// (leaving the catalog untouched) when the id is unknown.
    pub fn update(&mut self, id: &str, patch: PosterPatch) -> Option<Poster> {
        let poster = self.posters.iter_mut().find(|p| p.id == id)?;
        if let Some(title) = patch.title {
            if title != poster.title {
                poster.slug = slugify(&title);
                poster.title = title;
            }
        }
        if let Some(category) = patch.category {
            poster.category = category;
        }
        if let Some(price) = patch.price {
            poster.price = price;
        }
        if let Some(price_a3) = patch.price_a3 {
            poster.price_a3 = price_a3;
        }
        if let Some(description) = patch.description {
            poster.description = description;
        }
        if let Some(image_url) = patch.image_url {
            poster.image_url = image_url;
        }
        if let Some(featured) = patch.featured {
            poster.featured = featured;
        }
        let updated = poster.clone();
        self.persist();
        Some(updated)
    }

    /// Remove by id; unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.posters.len();
        self.posters.retain(|p| p.id != id);
        let removed = self.posters.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Poster> {
        self.posters.iter().find(|p| p.id == id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<&Poster> {
        self.posters.iter().find(|p| p.slug == slug)
    }

    /// Case-insensitive exact category match; accepts either the hyphenated
    /// slug or the literal display name.
    pub fn by_category(&self, slug_or_name: &str) -> Vec<&Poster> {
        let name = normalize_category_slug(slug_or_name);
        self.posters
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(&name))
            .collect()
    }

    pub fn featured(&self) -> Vec<&Poster> {
        self.posters.iter().filter(|p| p.featured).collect()
    }
}

fn seed(id: &str, title: &str, category: &str, description: &str, featured: bool) -> Poster {
    let (price, price_a3) = category_default_prices(category);
    let slug = slugify(title);
    Poster {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        price,
        price_a3,
        description: description.to_string(),
        image_url: format!("/images/posters/{slug}.jpg"),
        slug,
        featured,
    }
}

fn seed_collage(id: &str, title: &str, description: &str, featured: bool) -> Poster {
    let mut poster = seed(id, title, "Collage", description, featured);
    poster.price = 699;
    poster.price_a3 = 999;
    poster
}

/// Hardcoded reference catalog. Authoritative for price, image, category
/// and featured status on every startup.
pub fn seed_posters() -> Vec<Poster> {
    vec![
        seed("1", "Nissan GTR R35", "Cars", "Godzilla in matte grey, low and wide.", true),
        seed("2", "Porsche 911 GT3 RS", "Cars", "Track-bred flat-six, painted mid-corner.", false),
        seed("3", "Interstellar", "Movies", "The Endurance against Gargantua's glow.", true),
        seed("4", "Fight Club", "Movies", "Soap-bar minimalism on a grunge wash.", false),
        seed("5", "Ford Mustang Shelby GT500", "Cars", "Heritage stripes over venom green.", false),
        seed("6", "Attack on Titan Final Season", "Anime", "The rumbling on a charcoal skyline.", true),
        seed("7", "One Piece Gear 5 Luffy", "Anime", "The warrior of liberation, mid-laugh.", false),
        seed("8", "Jujutsu Kaisen Gojo", "Anime", "Six eyes behind the blindfold.", false),
        seed("9", "Neon Samurai Split", "Split Posters", "Three-panel ronin under neon rain.", true),
        seed("10", "Midnight Tokyo Drift Split", "Split Posters", "Two-panel kanjozoku run at 2 AM.", false),
        seed_collage(
            "11",
            "Straw Hat Pirates Wanted Posters Collage",
            "Every bounty from East Blue to Egghead in one frame.",
            true,
        ),
        seed_collage("12", "F1 Legends Collage", "Nine championship liveries, one grid.", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CatalogStore {
        let dir = tempfile::tempdir().unwrap();
        CatalogStore::load(JsonStore::new(dir.path()))
    }

    #[test]
    fn test_slugify_pins_transform() {
        assert_eq!(slugify("Nissan GTR R35"), "nissan-gtr-r35");
        assert_eq!(slugify("Gojo: Six Eyes!"), "gojo-six-eyes");
        assert_eq!(slugify("a  -  b"), "a-b");
        assert_eq!(slugify("Straw Hat Pirates Wanted Posters Collage"), "straw-hat-pirates-wanted-posters-collage");
    }

    #[test]
    fn test_normalize_category_slug() {
        assert_eq!(normalize_category_slug("split-posters"), "Split Posters");
        assert_eq!(normalize_category_slug("cars"), "Cars");
        assert_eq!(normalize_category_slug("Split Posters"), "Split Posters");
    }

    #[test]
    fn test_seed_wins_on_core_fields() {
        let mut persisted = seed_posters();
        persisted[0].price = 50;
        persisted[0].category = "Movies".to_string();
        persisted[0].description = "admin edited".to_string();
        let out = reconcile(seed_posters(), persisted);
        assert_eq!(out[0].price, 99);
        assert_eq!(out[0].category, "Cars");
        // Non-authoritative fields survive from the snapshot.
        assert_eq!(out[0].description, "admin edited");
    }

    #[test]
    fn test_admin_extra_kept_with_default_prices() {
        let mut extra = seed("99", "Custom Drop", "Cars", "", false);
        extra.price = 12345;
        extra.image_url = "/uploads/custom.jpg".to_string();
        let out = reconcile(seed_posters(), vec![extra]);
        let kept = out.iter().find(|p| p.id == "99").unwrap();
        assert_eq!(kept.price, 99);
        assert_eq!(kept.price_a3, 149);
    }

    #[test]
    fn test_placeholder_extra_dropped() {
        let mut extra = seed("99", "Ghost", "Cars", "", false);
        extra.image_url = PLACEHOLDER_IMAGE.to_string();
        let out = reconcile(seed_posters(), vec![extra]);
        assert!(out.iter().all(|p| p.id != "99"));
    }

    #[test]
    fn test_add_applies_category_defaults() {
        let mut catalog = store();
        let poster = catalog.add(NewPoster {
            title: "Panel Run Split".to_string(),
            category: "Split Posters".to_string(),
            price: None,
            price_a3: None,
            description: String::new(),
            image_url: "/uploads/panel-run.jpg".to_string(),
            featured: false,
        });
        assert_eq!(poster.price, 399);
        assert_eq!(poster.price_a3, 299);
        assert_eq!(poster.slug, "panel-run-split");
    }

    #[test]
    fn test_update_title_regenerates_slug() {
        let mut catalog = store();
        let patch = PosterPatch {
            title: Some("Nissan Skyline R34".to_string()),
            ..PosterPatch::default()
        };
        let updated = catalog.update("1", patch).unwrap();
        assert_eq!(updated.slug, "nissan-skyline-r34");
        assert_eq!(catalog.get("1").unwrap().slug, "nissan-skyline-r34");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut catalog = store();
        let before = catalog.posters().len();
        assert!(catalog.update("nope", PosterPatch::default()).is_none());
        assert_eq!(catalog.posters().len(), before);
    }

    #[test]
    fn test_category_lookup_slug_and_literal_agree() {
        let catalog = store();
        let by_slug: Vec<_> = catalog.by_category("split-posters").iter().map(|p| p.id.clone()).collect();
        let by_name: Vec<_> = catalog.by_category("Split Posters").iter().map(|p| p.id.clone()).collect();
        assert_eq!(by_slug, by_name);
        assert!(!by_slug.is_empty());
    }

    #[test]
    fn test_delete_then_reload_restores_seed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStore::new(dir.path());
        let mut catalog = CatalogStore::load(storage.clone());
        catalog.delete("1");
        assert!(catalog.get("1").is_none());
        // Seed entries come back on the next hydration.
        let catalog = CatalogStore::load(storage);
        assert!(catalog.get("1").is_some());
    }

    #[test]
    fn test_featured_matches_seed_flags() {
        let catalog = store();
        let featured: Vec<_> = catalog.featured().iter().map(|p| p.id.clone()).collect();
        assert_eq!(featured, vec!["1", "3", "6", "9", "11"]);
    }
}
