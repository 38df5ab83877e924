mod input;
mod output;

use std::sync::Arc;

use crate::entity_type::EntityTypeCode;
use crate::error::ConfigError;
use crate::nib::Nib;
use crate::player::{Player, TemplatePlayerRef};

pub use input::NtmInputTree;
pub use output::NtmOutputTree;

pub type NtmRef = Arc<Ntm>;

#[derive(Debug)]
pub struct Ntm {
    entity_type: EntityTypeCode,
    template: TemplatePlayerRef,
}

impl Ntm {
    pub fn new(entity_type: EntityTypeCode, template: TemplatePlayerRef) -> Result<NtmRef, ConfigError> {
        entity_type.validate_pattern()?;
        Ok(Arc::new(Self {
            entity_type,
            template,
        }))
    }

    pub fn entity_type(&self) -> &EntityTypeCode {
        &self.entity_type
    }

    pub fn template(&self) -> &TemplatePlayerRef {
        &self.template
    }

    pub fn copy_entity_type(&self, target: Option<&mut Nib>) -> bool {
        match target {
            Some(nib) => {
                nib.set_entity_type(self.entity_type);
                true
            }
            None => false,
        }
    }

    pub fn matches_player(&self, player: &Player) -> bool {
        self.template.matches(player)
    }
}
