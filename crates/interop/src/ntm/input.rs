use std::collections::BTreeMap;

use crate::entity_type::{match_code, EntityTypeCode, MatchQuality};
use crate::error::ConfigError;

use super::NtmRef;

#[derive(Debug, Default)]
struct NtmInputNode {
    // Mapping whose remaining fields are all wildcards.
    catch_all: Option<NtmRef>,
    children: BTreeMap<u16, NtmInputNode>,
}

#[derive(Debug, Default)]
pub struct NtmInputTree {
    root: NtmInputNode,
    len: usize,
}

impl NtmInputTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ntm: NtmRef) -> Result<(), ConfigError> {
        let code = *ntm.entity_type();
        code.validate_pattern()?;

        let fields = code.fields();
        let mut node = &mut self.root;
        for value in &fields[..code.specified_len()] {
            node = node.children.entry(*value).or_default();
        }

        if node.catch_all.is_some() {
            log::warn!("input mapping for {} already defined, keeping the first", code);
            return Err(ConfigError::DuplicateInputMapping(code));
        }

        node.catch_all = Some(ntm);
        self.len += 1;
        Ok(())
    }

    /// Descends field by field; the deepest catch-all on the path wins.
    pub fn find_by_entity_type_code(&self, code: &EntityTypeCode) -> Option<&NtmRef> {
        let mut best = self.root.catch_all.as_ref();
        let mut node = &self.root;

        for value in code.fields() {
            let Some(child) = node.children.get(&value) else {
                break;
            };
            if child.catch_all.is_some() {
                best = child.catch_all.as_ref();
            }
            node = child;
        }

        best
    }

    pub fn find_with_quality(&self, code: &EntityTypeCode) -> Option<(&NtmRef, MatchQuality)> {
        let ntm = self.find_by_entity_type_code(code)?;
        let quality = match_code(code, ntm.entity_type())?;
        Some((ntm, quality))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ntm::Ntm;
    use crate::player::{ClassRegistry, PlayerTemplate};

    fn ntm(code: EntityTypeCode, type_string: &str) -> NtmRef {
        let registry = ClassRegistry::with_builtin();
        let template = PlayerTemplate::new(
            type_string,
            Arc::clone(registry.get("Aircraft").unwrap()),
            type_string,
        );
        Ntm::new(code, template).unwrap()
    }

    fn type_of(found: Option<&NtmRef>) -> Option<&str> {
        found.map(|n| n.template().type_string())
    }

    #[test]
    fn wildcard_entry_matches_inbound_code() {
        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 0, 0, 0, 0, 0), "air"))
            .unwrap();

        let found = tree.find_by_entity_type_code(&EntityTypeCode::new(1, 2, 225, 4, 0, 0, 0));
        assert_eq!(type_of(found), Some("air"));
    }

    #[test]
    fn most_specific_entry_wins() {
        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 0, 0, 0, 0, 0), "air"))
            .unwrap();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 225, 1, 0, 0, 0), "fighter"))
            .unwrap();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 225, 1, 3, 0, 0), "F-16"))
            .unwrap();

        let f16 = EntityTypeCode::new(1, 2, 225, 1, 3, 0, 0);
        assert_eq!(type_of(tree.find_by_entity_type_code(&f16)), Some("F-16"));

        let f15 = EntityTypeCode::new(1, 2, 225, 1, 5, 0, 0);
        assert_eq!(type_of(tree.find_by_entity_type_code(&f15)), Some("fighter"));
    }

    #[test]
    fn falls_back_past_branch_without_catch_all() {
        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 0, 0, 0, 0, 0), "air"))
            .unwrap();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 225, 1, 3, 2, 0), "F-16C"))
            .unwrap();

        // Descends 1.2.225.1.3 (no catch-alls below 1.2) and then misses on specific.
        let f16a = EntityTypeCode::new(1, 2, 225, 1, 3, 1, 0);
        assert_eq!(type_of(tree.find_by_entity_type_code(&f16a)), Some("air"));
    }

    #[test]
    fn no_match_and_empty_tree() {
        let empty = NtmInputTree::new();
        assert!(empty.is_empty());
        assert!(empty
            .find_by_entity_type_code(&EntityTypeCode::new(1, 2, 225, 0, 0, 0, 0))
            .is_none());

        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::new(1, 1, 0, 0, 0, 0, 0), "land"))
            .unwrap();
        assert!(tree
            .find_by_entity_type_code(&EntityTypeCode::new(1, 2, 225, 0, 0, 0, 0))
            .is_none());
    }

    #[test]
    fn quality_reports_explicit_fields() {
        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::new(1, 2, 225, 0, 0, 0, 0), "us-air"))
            .unwrap();

        let (found, quality) = tree
            .find_with_quality(&EntityTypeCode::new(1, 2, 225, 1, 3, 0, 0))
            .unwrap();
        assert_eq!(found.template().type_string(), "us-air");
        assert_eq!(quality.matched, 3);
        assert_eq!(quality.wildcards, 4);
    }

    #[test]
    fn root_catch_all_matches_everything() {
        let mut tree = NtmInputTree::new();
        tree.insert(ntm(EntityTypeCode::default(), "generic")).unwrap();

        let found = tree.find_by_entity_type_code(&EntityTypeCode::new(3, 1, 225, 0, 0, 0, 0));
        assert_eq!(type_of(found), Some("generic"));
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut tree = NtmInputTree::new();
        let code = EntityTypeCode::new(1, 2, 225, 0, 0, 0, 0);
        tree.insert(ntm(code, "first")).unwrap();

        let err = tree.insert(ntm(code, "second")).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateInputMapping(code));
        assert_eq!(tree.len(), 1);
        assert_eq!(type_of(tree.find_by_entity_type_code(&code)), Some("first"));
    }
}
