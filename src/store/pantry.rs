use super::PantryStore;
use crate::messages::{PantryItem, PantrySnapshot, PantryUpdate};
use crate::{AlfredoError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPantry {
    items: Arc<RwLock<Vec<PantryItem>>>,
}

impl InMemoryPantry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<PantryItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub fn get(&self, name: &str) -> Option<PantryItem> {
        self.items
            .read()
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .cloned()
    }
}

fn check_quantity(quantity: f64) -> Result<()> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(())
    } else {
        Err(AlfredoError::PersistenceError(format!(
            "invalid pantry quantity {}",
            quantity
        )))
    }
}

#[async_trait]
impl PantryStore for InMemoryPantry {
    async fn snapshot(&self) -> Result<PantrySnapshot> {
        Ok(PantrySnapshot::new(self.items.read().clone()))
    }

    async fn consume(&self, ingredient: &str, quantity: f64) -> Result<PantryUpdate> {
        check_quantity(quantity)?;
        let needle = ingredient.trim().to_lowercase();
        let mut items = self.items.write();

        let Some(item) = items.iter_mut().find(|i| i.name.to_lowercase() == needle) else {
            return Ok(PantryUpdate::NotFound);
        };

        item.quantity = (item.quantity - quantity).max(0.0);
        debug!("Pantry '{}' now {} {}", item.name, item.quantity, item.unit);
        Ok(PantryUpdate::Decremented {
            remaining: item.quantity,
            low_stock: item.is_low_stock(),
        })
    }

    async fn add_item(&self, item: PantryItem) -> Result<()> {
        check_quantity(item.quantity)?;
        if item.name.trim().is_empty() {
            return Err(AlfredoError::PersistenceError(
                "pantry item needs a name".to_string(),
            ));
        }

        let mut items = self.items.write();
        match items.iter_mut().find(|i| i.name.eq_ignore_ascii_case(&item.name)) {
            Some(existing) => existing.quantity += item.quantity,
            None => items.push(item),
        }
        Ok(())
    }
}
