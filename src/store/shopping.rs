use super::ShoppingList;
use crate::messages::{GroceryItem, GroceryList};
use crate::Result;
use async_trait::async_trait;
use chrono::{Local, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryShoppingList {
    lists: Arc<RwLock<Vec<GroceryList>>>,
}

impl InMemoryShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> Vec<GroceryList> {
        self.lists.read().clone()
    }

    /// Mark the open list done so the next addition starts a fresh one
    pub fn complete_active(&self) -> bool {
        let mut lists = self.lists.write();
        match lists.iter_mut().find(|l| !l.is_completed) {
            Some(list) => {
                list.is_completed = true;
                true
            }
            None => false,
        }
    }
}

fn new_list_name() -> String {
    format!("Shopping List - {}", Local::now().format("%Y-%m-%d"))
}

#[async_trait]
impl ShoppingList for InMemoryShoppingList {
    async fn add_items(&self, names: &[String]) -> Result<GroceryList> {
        let mut lists = self.lists.write();

        let index = match lists.iter().position(|l| !l.is_completed) {
            Some(index) => index,
            None => {
                let list = GroceryList {
                    id: Uuid::new_v4(),
                    name: new_list_name(),
                    items: Vec::new(),
                    is_completed: false,
                    created_at: Utc::now(),
                };
                info!("Created grocery list '{}'", list.name);
                lists.push(list);
                lists.len() - 1
            }
        };

        let list = &mut lists[index];
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let already_listed = list
                .items
                .iter()
                .any(|i| !i.is_completed && i.name.eq_ignore_ascii_case(name));
            if already_listed {
                continue;
            }
            list.items.push(GroceryItem {
                id: Uuid::new_v4(),
                name: name.to_string(),
                quantity: 1.0,
                unit: "piece".to_string(),
                is_completed: false,
            });
        }

        Ok(list.clone())
    }

    async fn active_list(&self) -> Result<Option<GroceryList>> {
        Ok(self.lists.read().iter().find(|l| !l.is_completed).cloned())
    }
}
