use super::types::{ClassifiedCommand, CommandStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Append-only log of classified commands.
///
/// Entries are resolved in place by id; they are never reordered or removed
/// except by `clear`.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    commands: Arc<RwLock<Vec<ClassifiedCommand>>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, command: ClassifiedCommand) {
        self.commands.write().push(command);
    }

    /// Attach a response to a pending command. Returns false for unknown ids.
    pub fn resolve(&self, id: Uuid, response: impl Into<String>, status: CommandStatus) -> bool {
        let mut commands = self.commands.write();
        match commands.iter_mut().find(|c| c.id == id) {
            Some(command) => {
                command.processed = true;
                command.response = Some(response.into());
                command.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<ClassifiedCommand> {
        self.commands.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn get_all(&self) -> Vec<ClassifiedCommand> {
        self.commands.read().clone()
    }

    pub fn last(&self) -> Option<ClassifiedCommand> {
        self.commands.read().last().cloned()
    }

    pub fn clear(&self) {
        self.commands.write().clear();
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}
