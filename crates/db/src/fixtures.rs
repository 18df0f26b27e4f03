use crate::repositories::{ProductRepository, RepositoryError};
use shelf_core::domain::product::Product;

/// Canonical demo catalog loaded by `shelf seed`.
const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct { name: "Widget", price: 9.99, description: "basic widget for everyday use" },
    DemoProduct {
        name: "Widget Pro",
        price: 24.5,
        description: "reinforced widget with extended warranty",
    },
    DemoProduct { name: "Gadget", price: 14.0, description: "compact gadget, batteries included" },
    DemoProduct { name: "Gizmo", price: 3.75, description: "spare gizmo for widget repairs" },
];

struct DemoProduct {
    name: &'static str,
    price: f64,
    description: &'static str,
}

/// Deterministic demo data. Loading is keyed on product name, so running it twice
/// leaves the catalog unchanged.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn names() -> impl Iterator<Item = &'static str> {
        DEMO_PRODUCTS.iter().map(|product| product.name)
    }

    pub async fn load(repository: &dyn ProductRepository) -> Result<SeedResult, RepositoryError> {
        let mut result = SeedResult::default();

        for demo in DEMO_PRODUCTS {
            if repository.find_by_name(demo.name).await?.is_some() {
                result.skipped.push(demo.name);
                continue;
            }

            repository.save(Product::new(demo.name, demo.price, demo.description)).await?;
            result.inserted.push(demo.name);
        }

        Ok(result)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}
