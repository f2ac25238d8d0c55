//! Catalog module.
//!
//! Read-only product data the cart prices against. The catalog itself is
//! owned by the backend; these are client-side snapshots.

mod category;
mod filter;
mod index;
mod product;

pub use category::Category;
pub use filter::{ProductFilter, SortOption};
pub use index::ProductIndex;
pub use product::{Product, ProductLookup};
