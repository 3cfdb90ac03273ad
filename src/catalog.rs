use std::collections::BTreeMap;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Category tabs shown on the home screen (plus the implicit "All").
pub const CATEGORIES: &[&str] = &["Electronics", "Laptops", "Home", "Fashion", "Sports", "Beauty"];

/// Suggested searches shown on the home screen hero.
pub const POPULAR_SEARCHES: &[&str] =
    &["iPhone 15", "PlayStation 5", "Air Fryer", "Running Shoes", "OLED TV"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Condition {
    New,
    Refurbished,
    Used,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::Refurbished => "Refurbished",
            Condition::Used => "Used",
        }
    }
}

/// One store's listing for a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOffer {
    pub store_name: String,
    pub store_logo: String,
    pub price: f64,
    pub currency: String,
    pub buy_url: String,
    pub condition: Condition,
    pub shipping: String,
}

/// A single point on the price history chart.
#[derive(Debug, Clone, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
}

/// A catalog entry with its offers, price history, and specifications.
///
/// `specs` is a `BTreeMap` so the key order is stable wherever the
/// specification table is rendered or serialized into an AI prompt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub rating: f64,
    pub review_count: u64,
    pub offers: Vec<StoreOffer>,
    pub price_history: Vec<PricePoint>,
    pub specs: BTreeMap<String, String>,
}

impl Product {
    /// The lowest-priced offer, if any offers exist.
    pub fn best_offer(&self) -> Option<&StoreOffer> {
        self.offers.iter().min_by(|a, b| a.price.total_cmp(&b.price))
    }

    /// (min, max) price across all offers.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let first = self.offers.first()?.price;
        let (mut min, mut max) = (first, first);
        for offer in &self.offers {
            min = min.min(offer.price);
            max = max.max(offer.price);
        }
        Some((min, max))
    }

    /// Offers sorted cheapest first, for the comparison table.
    pub fn offers_by_price(&self) -> Vec<&StoreOffer> {
        let mut offers: Vec<&StoreOffer> = self.offers.iter().collect();
        offers.sort_by(|a, b| a.price.total_cmp(&b.price));
        offers
    }
}

const PRODUCTS_JSON: &str = include_str!("../data/products.json");

/// In-memory product catalog backed by the bundled data file.
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn load_builtin() -> Result<Self> {
        let products: Vec<Product> =
            serde_json::from_str(PRODUCTS_JSON).context("Failed to parse bundled product data")?;
        Ok(Self { products })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}
