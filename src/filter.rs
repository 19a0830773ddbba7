use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::Collection;

/// Substrings that mark a collection as part of the ecosystem. Plain
/// substring matching, so short keywords such as "mon" also hit unrelated
/// names ("Pokemon", "Diamond Hands").
pub const ECOSYSTEM_KEYWORDS: &[&str] = &[
    "monad",
    "mon",
    "monks",
    "portals",
    "crystals",
    "mechs",
    "spirits",
    "genesis",
    "monadlabs",
    "monadchain",
    "monadnft",
    "monadverse",
    "monadeco",
];

/// Keyword/query predicate over a collection's name, symbol and
/// description, all compared lower-cased. Blank keywords are ignored, so
/// an empty keyword set matches nothing.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    query: Option<String>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S], query: Option<&str>) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            query: query
                .map(|q| q.trim().to_lowercase())
                .filter(|q| !q.is_empty()),
        }
    }

    pub fn matches(&self, collection: &Collection) -> bool {
        let fields = [
            collection.name.to_lowercase(),
            collection.symbol.to_lowercase(),
            collection.description.to_lowercase(),
        ];
        let has_keyword = self
            .keywords
            .iter()
            .any(|k| fields.iter().any(|f| f.contains(k.as_str())));
        let matches_query = self
            .query
            .as_deref()
            .map_or(true, |q| fields.iter().any(|f| f.contains(q)));
        has_keyword && matches_query
    }
}

/// Keeps collections with at least one keyword and, when `query` is
/// non-blank, the query too. Order is preserved.
pub fn filter_collections<S: AsRef<str>>(
    collections: &[Collection],
    keywords: &[S],
    query: Option<&str>,
) -> Vec<Collection> {
    let matcher = KeywordMatcher::new(keywords, query);
    collections
        .iter()
        .filter(|c| matcher.matches(c))
        .cloned()
        .collect()
}

/// Supply range a collection falls in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeBucket {
    #[default]
    Any,
    /// Fewer than 1,000 items.
    Small,
    /// 1,000 to 10,000 items inclusive.
    Medium,
    /// More than 10,000 items.
    Large,
}

impl SizeBucket {
    pub fn contains(self, total_supply: u64) -> bool {
        match self {
            Self::Any => true,
            Self::Small => total_supply < 1_000,
            Self::Medium => (1_000..=10_000).contains(&total_supply),
            Self::Large => total_supply > 10_000,
        }
    }
}

impl FromStr for SizeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(Self::Any),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(format!("unknown size bucket: {other}")),
        }
    }
}

/// Narrowing applied to an already fetched page. Unset bounds pass
/// everything; all set criteria must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionFilters {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_volume_24h: Option<Decimal>,
    pub size: SizeBucket,
    pub verified_only: bool,
}

impl CollectionFilters {
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    pub fn matches(&self, collection: &Collection) -> bool {
        let price = collection.floor_price;
        self.min_price.map_or(true, |min| price >= min)
            && self.max_price.map_or(true, |max| price <= max)
            && self
                .min_volume_24h
                .map_or(true, |min| collection.volume_24h >= min)
            && self.size.contains(collection.total_supply)
            && (!self.verified_only || collection.verified)
    }

    pub fn apply(&self, collections: &[Collection]) -> Vec<Collection> {
        collections
            .iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect()
    }
}
