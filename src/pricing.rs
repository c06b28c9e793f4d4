//! Size-dependent price resolution.
//!
//! The same resolver backs the catalog price display, the add-to-cart
//! handler and the poster detail route, so all three quote identical
//! numbers for a given `(category, title, size)` triple.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SPLIT_POSTERS_CATEGORY: &str = "Split Posters";
pub const COLLAGE_CATEGORY: &str = "Collage";

/// Title that is always priced at the Collage tier, whatever its category.
/// Overlaps with the substring rule below; kept as its own guard because the
/// cart path applies it last.
pub const COLLAGE_TITLE_OVERRIDE: &str = "Straw Hat Pirates Wanted Posters Collage";

/// Supported physical print sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PosterSize {
    #[default]
    A4,
    A3,
}

impl fmt::Display for PosterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A4 => write!(f, "A4"),
            Self::A3 => write!(f, "A3"),
        }
    }
}

/// Resolve the display/cart price in whole rupees.
pub fn resolve_price(category: &str, title: &str, size: PosterSize) -> i64 {
    if title == COLLAGE_TITLE_OVERRIDE {
        return match size {
            PosterSize::A4 => 699,
            PosterSize::A3 => 999,
        };
    }
    if category == SPLIT_POSTERS_CATEGORY {
        match size {
            PosterSize::A4 => 299,
            PosterSize::A3 => 399,
        }
    } else if category == COLLAGE_CATEGORY || title.contains("Collage") {
        match size {
            PosterSize::A4 => 699,
            PosterSize::A3 => 999,
        }
    } else {
        match size {
            PosterSize::A4 => 99,
            PosterSize::A3 => 149,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_poster_tier() {
        assert_eq!(resolve_price(SPLIT_POSTERS_CATEGORY, "Neon Samurai Split", PosterSize::A4), 299);
        assert_eq!(resolve_price(SPLIT_POSTERS_CATEGORY, "Neon Samurai Split", PosterSize::A3), 399);
    }

    #[test]
    fn test_default_tier() {
        assert_eq!(resolve_price("Cars", "Nissan GTR R35", PosterSize::A4), 99);
        assert_eq!(resolve_price("Cars", "Nissan GTR R35", PosterSize::A3), 149);
        assert_eq!(resolve_price("Movies", "Interstellar", PosterSize::A4), 99);
    }

    #[test]
    fn test_collage_category_and_title_substring() {
        assert_eq!(resolve_price(COLLAGE_CATEGORY, "F1 Legends Collage", PosterSize::A4), 699);
        assert_eq!(resolve_price("Anime", "Shinobi Collage", PosterSize::A3), 999);
    }

    #[test]
    fn test_literal_title_override_wins_over_category() {
        // Both the override and the category rule must land on the same numbers.
        assert_eq!(resolve_price("Anime", COLLAGE_TITLE_OVERRIDE, PosterSize::A4), 699);
        assert_eq!(resolve_price("Anime", COLLAGE_TITLE_OVERRIDE, PosterSize::A3), 999);
        assert_eq!(resolve_price(COLLAGE_CATEGORY, COLLAGE_TITLE_OVERRIDE, PosterSize::A4), 699);
        assert_eq!(resolve_price(COLLAGE_CATEGORY, COLLAGE_TITLE_OVERRIDE, PosterSize::A3), 999);
    }
}
