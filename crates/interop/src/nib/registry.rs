use crate::error::RegistryError;
use crate::player::PlayerId;

use super::{IoType, Nib, NibState};

#[derive(Debug)]
pub struct NibRegistry {
    inputs: Vec<Nib>,
    outputs: Vec<Nib>,
    capacity: usize,
}

impl NibRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self, io: IoType) -> usize {
        self.list(io).len()
    }

    pub fn is_empty(&self, io: IoType) -> bool {
        self.list(io).is_empty()
    }

    pub fn is_full(&self, io: IoType) -> bool {
        self.list(io).len() >= self.capacity
    }

    pub fn nibs(&self, io: IoType) -> &[Nib] {
        self.list(io)
    }

    pub fn nibs_mut(&mut self, io: IoType) -> &mut [Nib] {
        self.list_mut(io)
    }

    pub fn find_nib(&self, player_id: u32, federate: &str, io: IoType) -> Option<&Nib> {
        let list = self.list(io);
        Self::search(list, player_id, federate)
            .ok()
            .map(|idx| &list[idx])
    }

    pub fn find_nib_mut(&mut self, player_id: u32, federate: &str, io: IoType) -> Option<&mut Nib> {
        let idx = Self::search(self.list(io), player_id, federate).ok()?;
        Some(&mut self.list_mut(io)[idx])
    }

    pub fn find_nib_by_player(&self, player: PlayerId, io: IoType) -> Option<&Nib> {
        self.list(io).iter().find(|nib| nib.player() == player)
    }

    pub fn insert(&mut self, nib: Nib) -> Result<&mut Nib, RegistryError> {
        let io = nib.io_type();
        let capacity = self.capacity;
        let list = self.list_mut(io);

        let idx = match Self::search(list, nib.key().player_id, &nib.key().federate) {
            Ok(_) => {
                return Err(RegistryError::DuplicateKey {
                    player_id: nib.key().player_id,
                    federate: nib.key().federate.clone(),
                    io,
                });
            }
            Err(idx) => idx,
        };

        if list.len() >= capacity {
            return Err(RegistryError::ListFull { capacity, io });
        }

        list.insert(idx, nib);
        Ok(&mut list[idx])
    }

    pub fn remove(&mut self, player_id: u32, federate: &str, io: IoType) -> Option<Nib> {
        let list = self.list_mut(io);
        let idx = Self::search(list, player_id, federate).ok()?;
        let mut nib = list.remove(idx);
        nib.retire();
        Some(nib)
    }

    /// Retires input nibs that went stale on an earlier sweep, then marks
    /// nibs that have now reached their max age as stale.
    pub fn sweep_stale(&mut self, now: f64) -> Vec<Nib> {
        let (mut retired, mut kept): (Vec<Nib>, Vec<Nib>) = std::mem::take(&mut self.inputs)
            .into_iter()
            .partition(|nib| nib.state() == NibState::Stale);

        for nib in &mut kept {
            if nib.check_age(now) {
                log::debug!(
                    "input nib {}:{} stale after {:.1}s",
                    nib.key().federate,
                    nib.key().player_id,
                    nib.age(now)
                );
            }
        }
        self.inputs = kept;

        for nib in &mut retired {
            nib.retire();
        }
        retired
    }

    pub fn clear(&mut self) -> Vec<Nib> {
        let mut all: Vec<Nib> = self.inputs.drain(..).chain(self.outputs.drain(..)).collect();
        for nib in &mut all {
            nib.retire();
        }
        all
    }

    fn search(list: &[Nib], player_id: u32, federate: &str) -> Result<usize, usize> {
        list.binary_search_by(|nib| nib.key().cmp_parts(player_id, federate))
    }

    fn list(&self, io: IoType) -> &Vec<Nib> {
        match io {
            IoType::Input => &self.inputs,
            IoType::Output => &self.outputs,
        }
    }

    fn list_mut(&mut self, io: IoType) -> &mut Vec<Nib> {
        match io {
            IoType::Input => &mut self.inputs,
            IoType::Output => &mut self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::DrLimits;
    use crate::nib::{DeadReckoningModel, KinematicState, NibKey};

    fn nib(io: IoType, id: u32, federate: &str) -> Nib {
        Nib::new(io, NibKey::new(id, federate), id).with_limits(DrLimits {
            max_age: 5.0,
            ..DrLimits::default()
        })
    }

    fn live_input(id: u32, federate: &str, time: f64) -> Nib {
        let mut nib = nib(IoType::Input, id, federate);
        nib.apply_update(&KinematicState::default(), DeadReckoningModel::Fpw, time);
        nib
    }

    #[test]
    fn find_by_key_and_player() {
        let mut registry = NibRegistry::new(16);
        registry.insert(nib(IoType::Input, 5, "alpha")).unwrap();
        registry.insert(nib(IoType::Input, 2, "beta")).unwrap();
        registry.insert(nib(IoType::Output, 5, "alpha")).unwrap();

        assert!(registry.find_nib(5, "alpha", IoType::Input).is_some());
        assert!(registry.find_nib(5, "beta", IoType::Input).is_none());
        assert!(registry.find_nib(2, "beta", IoType::Output).is_none());
        assert_eq!(
            registry.find_nib_by_player(2, IoType::Input).unwrap().key(),
            &NibKey::new(2, "beta")
        );
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut registry = NibRegistry::new(16);
        registry.insert(nib(IoType::Input, 1, "alpha")).unwrap();

        let err = registry.insert(nib(IoType::Input, 1, "alpha")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateKey {
                player_id: 1,
                federate: "alpha".to_string(),
                io: IoType::Input
            }
        );
        assert_eq!(registry.len(IoType::Input), 1);

        // Same key in the other direction is a different nib.
        assert!(registry.insert(nib(IoType::Output, 1, "alpha")).is_ok());
    }

    #[test]
    fn insert_beyond_capacity_fails() {
        let mut registry = NibRegistry::new(2);
        registry.insert(nib(IoType::Input, 1, "a")).unwrap();
        registry.insert(nib(IoType::Input, 2, "a")).unwrap();

        let err = registry.insert(nib(IoType::Input, 3, "a")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::ListFull {
                capacity: 2,
                io: IoType::Input
            }
        );
        assert!(registry.is_full(IoType::Input));
        assert!(!registry.is_full(IoType::Output));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = NibRegistry::new(4);
        registry.insert(nib(IoType::Output, 1, "a")).unwrap();

        let removed = registry.remove(1, "a", IoType::Output).unwrap();
        assert_eq!(removed.state(), NibState::Retired);
        assert!(registry.remove(1, "a", IoType::Output).is_none());
        assert!(registry.is_empty(IoType::Output));
    }

    #[test]
    fn sweep_retires_exactly_once() {
        let mut registry = NibRegistry::new(4);
        registry.insert(live_input(1, "a", 0.0)).unwrap();
        registry.insert(live_input(2, "a", 8.0)).unwrap();

        // First sweep past max age only marks the nib stale.
        assert!(registry.sweep_stale(10.0).is_empty());
        assert_eq!(
            registry.find_nib(1, "a", IoType::Input).unwrap().state(),
            NibState::Stale
        );

        let retired = registry.sweep_stale(10.1);
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].key(), &NibKey::new(1, "a"));
        assert_eq!(retired[0].state(), NibState::Retired);

        assert!(registry.sweep_stale(10.2).is_empty());
        assert!(registry.sweep_stale(10.3).is_empty());
        assert_eq!(registry.len(IoType::Input), 1);
        assert!(registry.find_nib(2, "a", IoType::Input).unwrap().is_active());
    }

    #[test]
    fn sweep_ignores_output_list() {
        let mut registry = NibRegistry::new(4);
        let mut out = nib(IoType::Output, 1, "a");
        out.record_sent(&KinematicState::default(), DeadReckoningModel::Fpw, 0.0);
        registry.insert(out).unwrap();

        registry.sweep_stale(100.0);
        assert!(registry.sweep_stale(200.0).is_empty());
        assert_eq!(registry.len(IoType::Output), 1);
    }

    proptest! {
        #[test]
        fn keys_stay_sorted_and_unique(entries in prop::collection::vec((0u32..20, 0usize..3), 0..60)) {
            let federates = ["alpha", "beta", "gamma"];
            let mut registry = NibRegistry::new(1000);
            let mut expected = std::collections::BTreeSet::new();

            for (id, fed) in entries {
                let inserted = registry.insert(nib(IoType::Input, id, federates[fed])).is_ok();
                prop_assert_eq!(inserted, expected.insert((id, federates[fed])));
            }

            let keys: Vec<(u32, &str)> = registry
                .nibs(IoType::Input)
                .iter()
                .map(|n| (n.key().player_id, n.key().federate.as_str()))
                .collect();
            let want: Vec<(u32, &str)> = expected.into_iter().collect();
            prop_assert_eq!(keys, want);
        }
    }
}
