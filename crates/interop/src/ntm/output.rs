use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::player::{Player, PlayerClass};

use super::NtmRef;

#[derive(Debug)]
struct NtmOutputNode {
    class: Arc<PlayerClass>,
    // Sorted most specific type string first.
    ntms: Vec<NtmRef>,
    children: Vec<NtmOutputNode>,
}

impl NtmOutputNode {
    fn new(class: Arc<PlayerClass>) -> Self {
        Self {
            class,
            ntms: Vec::new(),
            children: Vec::new(),
        }
    }

    fn find(&self, player: &Player) -> Option<&NtmRef> {
        if !player.is_factory_name(self.class.name()) {
            return None;
        }

        for child in &self.children {
            if let Some(found) = child.find(player) {
                return Some(found);
            }
        }

        self.ntms
            .iter()
            .find(|ntm| player.type_string().starts_with(ntm.template().type_string()))
    }

    /// Returns `Ok(false)` when the template's class is not ours or derived from ours.
    fn add(&mut self, ntm: NtmRef) -> Result<bool, ConfigError> {
        let class = Arc::clone(ntm.template().class());

        if *class == *self.class {
            self.insert_sorted(ntm)?;
            return Ok(true);
        }

        if !class.is_kind_of(self.class.name()) {
            return Ok(false);
        }

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|child| class.is_kind_of(child.class.name()))
        {
            return child.add(ntm);
        }

        let mut node = NtmOutputNode::new(class);
        let (adopted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|child| child.class.is_kind_of(node.class.name()));
        self.children = kept;
        node.children = adopted;
        node.insert_sorted(ntm)?;
        self.children.push(node);

        Ok(true)
    }

    fn insert_sorted(&mut self, ntm: NtmRef) -> Result<(), ConfigError> {
        let type_string = ntm.template().type_string();

        if self
            .ntms
            .iter()
            .any(|existing| existing.template().type_string() == type_string)
        {
            log::warn!(
                "output mapping for class {} type '{}' already defined, keeping the first",
                self.class.name(),
                type_string
            );
            return Err(ConfigError::DuplicateOutputMapping {
                class: self.class.name().to_string(),
                type_string: type_string.to_string(),
            });
        }

        let pos = self.ntms.partition_point(|existing| {
            specificity(existing.template().type_string(), type_string) == Ordering::Less
        });
        self.ntms.insert(pos, ntm);
        Ok(())
    }

    fn count(&self) -> usize {
        self.ntms.len() + self.children.iter().map(Self::count).sum::<usize>()
    }
}

// Longer type strings first; equal lengths in lexical order.
fn specificity(a: &str, b: &str) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

#[derive(Debug)]
pub struct NtmOutputTree {
    root: NtmOutputNode,
}

impl NtmOutputTree {
    pub fn new(base: Arc<PlayerClass>) -> Self {
        Self {
            root: NtmOutputNode::new(base),
        }
    }

    pub fn insert(&mut self, ntm: NtmRef) -> Result<(), ConfigError> {
        let class = ntm.template().factory_name().to_string();
        if self.root.add(ntm)? {
            Ok(())
        } else {
            Err(ConfigError::NotAPlayerClass { class })
        }
    }

    /// Most derived class first, then longest matching type-string prefix.
    pub fn find_by_player(&self, player: &Player) -> Option<&NtmRef> {
        self.root.find(player)
    }

    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
