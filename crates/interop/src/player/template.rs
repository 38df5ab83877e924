use std::sync::Arc;

use super::class::PlayerClass;
use super::{Player, PlayerId};

pub type TemplatePlayerRef = Arc<PlayerTemplate>;

#[derive(Debug)]
pub struct PlayerTemplate {
    name: String,
    class: Arc<PlayerClass>,
    type_string: String,
}

impl PlayerTemplate {
    pub fn new(name: &str, class: Arc<PlayerClass>, type_string: &str) -> TemplatePlayerRef {
        Arc::new(Self {
            name: name.to_string(),
            class,
            type_string: type_string.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Arc<PlayerClass> {
        &self.class
    }

    pub fn factory_name(&self) -> &str {
        self.class.name()
    }

    pub fn type_string(&self) -> &str {
        &self.type_string
    }

    pub fn instantiate(&self, id: PlayerId) -> Player {
        Player::new(id, Arc::clone(&self.class), &self.type_string)
    }

    /// The player is of this template's class (or derived) and its type
    /// string starts with ours.
    pub fn matches(&self, player: &Player) -> bool {
        player.is_factory_name(self.class.name())
            && player.type_string().starts_with(&self.type_string)
    }
}
