//! Catalog search filters.

use crate::catalog::{Category, Product};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Sort options for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOption {
    /// Backend's own ordering.
    #[default]
    Relevance,
    /// Sort by price, low to high.
    PriceAsc,
    /// Sort by price, high to low.
    PriceDesc,
    /// Sort by title A-Z.
    TitleAsc,
    /// Sort by title Z-A.
    TitleDesc,
}

impl SortOption {
    /// Query-string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Relevance => "relevance",
            SortOption::PriceAsc => "price_asc",
            SortOption::PriceDesc => "price_desc",
            SortOption::TitleAsc => "title_asc",
            SortOption::TitleDesc => "title_desc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortOption::Relevance => "Relevance",
            SortOption::PriceAsc => "Price: Low to High",
            SortOption::PriceDesc => "Price: High to Low",
            SortOption::TitleAsc => "Title: A-Z",
            SortOption::TitleDesc => "Title: Z-A",
        }
    }

    /// Parse a query-string value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relevance" => Some(SortOption::Relevance),
            "price_asc" => Some(SortOption::PriceAsc),
            "price_desc" => Some(SortOption::PriceDesc),
            "title_asc" => Some(SortOption::TitleAsc),
            "title_desc" => Some(SortOption::TitleDesc),
            _ => None,
        }
    }
}

/// Filters for a catalog listing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Free-text search in the title.
    pub text: Option<String>,
    /// Restrict to one category.
    pub category: Option<Category>,
    /// Minimum unit price (inclusive).
    pub min_price: Option<Money>,
    /// Maximum unit price (inclusive).
    pub max_price: Option<Money>,
    /// Only products with stock.
    pub in_stock_only: bool,
    /// Ordering.
    pub sort: SortOption,
}

impl ProductFilter {
    /// Create an empty filter (everything, backend order).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text query. Blank text is ignored.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.text = Some(trimmed.to_string());
        }
        self
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to a price range.
    pub fn with_price_range(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Only return products with stock.
    pub fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Set sort option.
    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    /// Build query-string pairs for a listing request.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(text) = &self.text {
            pairs.push(("q".to_string(), text.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category".to_string(), category.as_str().to_string()));
        }
        if let Some(min) = &self.min_price {
            pairs.push(("minPrice".to_string(), min.display_amount()));
        }
        if let Some(max) = &self.max_price {
            pairs.push(("maxPrice".to_string(), max.display_amount()));
        }
        if self.in_stock_only {
            pairs.push(("inStock".to_string(), "true".to_string()));
        }
        if self.sort != SortOption::Relevance {
            pairs.push(("sort".to_string(), self.sort.as_str().to_string()));
        }
        pairs
    }

    /// Check whether a product passes the filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(text) = &self.text {
            if !product.title.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }
        if let Some(min) = &self.min_price {
            if product.price.amount_cents < min.amount_cents {
                return false;
            }
        }
        if let Some(max) = &self.max_price {
            if product.price.amount_cents > max.amount_cents {
                return false;
            }
        }
        !(self.in_stock_only && !product.is_in_stock())
    }

    /// Apply the sort option to a listing in place.
    pub fn sort_products(&self, products: &mut [Product]) {
        match self.sort {
            SortOption::Relevance => {}
            SortOption::PriceAsc => products.sort_by_key(|p| p.price.amount_cents),
            SortOption::PriceDesc => {
                products.sort_by_key(|p| std::cmp::Reverse(p.price.amount_cents))
            }
            SortOption::TitleAsc => products.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOption::TitleDesc => products.sort_by(|a, b| b.title.cmp(&a.title)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProductId;
    use crate::money::Currency;

    fn product(id: &str, title: &str, cents: i64, category: &str, stock: u32) -> Product {
        Product::new(
            ProductId::new(id),
            title,
            Money::new(cents, Currency::USD),
            Category::new(category),
        )
        .with_stock(stock)
    }

    #[test]
    fn test_query_pairs() {
        let filter = ProductFilter::new()
            .with_text("  lamp ")
            .with_category("Home")
            .with_price_range(
                Some(Money::new(1000, Currency::USD)),
                Some(Money::new(5000, Currency::USD)),
            )
            .in_stock_only()
            .with_sort(SortOption::PriceAsc);

        let pairs = filter.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "lamp".to_string()),
                ("category".to_string(), "home".to_string()),
                ("minPrice".to_string(), "10.00".to_string()),
                ("maxPrice".to_string(), "50.00".to_string()),
                ("inStock".to_string(), "true".to_string()),
                ("sort".to_string(), "price_asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let filter = ProductFilter::new().with_text("   ");
        assert!(filter.text.is_none());
        assert!(filter.to_query_pairs().is_empty());
    }

    #[test]
    fn test_matches() {
        let filter = ProductFilter::new().with_text("LAMP").in_stock_only();
        assert!(filter.matches(&product("a", "Desk lamp", 2500, "home", 1)));
        assert!(!filter.matches(&product("b", "Desk lamp", 2500, "home", 0)));
        assert!(!filter.matches(&product("c", "Chair", 2500, "home", 4)));
    }

    #[test]
    fn test_sort_products() {
        let mut products = vec![
            product("a", "B", 300, "x", 1),
            product("b", "A", 100, "x", 1),
            product("c", "C", 200, "x", 1),
        ];
        ProductFilter::new()
            .with_sort(SortOption::PriceAsc)
            .sort_products(&mut products);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }
}
