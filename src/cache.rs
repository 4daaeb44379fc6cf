use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::market_value::{SquadPlayer, TeamEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeReason {
    /// Every query variant was answered and none matched.
    ConfirmedAbsent,
    /// At least one remote call failed; the absence is unconfirmed.
    RemoteError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Resolved(TeamEntity),
    Negative(NegativeReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Option<TeamEntity>),
    Miss,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    teams: RwLock<HashMap<(String, String), CacheEntry>>,
    squads: RwLock<HashMap<(u64, String), Vec<SquadPlayer>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &str, domain: &str) -> CacheLookup {
        let teams = read(&self.teams);
        match teams.get(&(key.to_string(), domain.to_string())) {
            Some(CacheEntry::Resolved(team)) => CacheLookup::Hit(Some(team.clone())),
            Some(CacheEntry::Negative(NegativeReason::ConfirmedAbsent)) => CacheLookup::Hit(None),
            Some(CacheEntry::Negative(NegativeReason::RemoteError)) | None => CacheLookup::Miss,
        }
    }

    pub fn entry(&self, key: &str, domain: &str) -> Option<CacheEntry> {
        read(&self.teams)
            .get(&(key.to_string(), domain.to_string()))
            .cloned()
    }

    pub fn insert(&self, key: &str, domain: &str, entry: CacheEntry) {
        let mut teams = write(&self.teams);
        let slot = (key.to_string(), domain.to_string());
        // A concurrent task may already have resolved this key; keep the better answer.
        if let (Some(CacheEntry::Resolved(_)), CacheEntry::Negative(_)) = (teams.get(&slot), &entry) {
            return;
        }
        teams.insert(slot, entry);
    }

    pub fn squad(&self, team_id: u64, domain: &str) -> Option<Vec<SquadPlayer>> {
        read(&self.squads)
            .get(&(team_id, domain.to_string()))
            .cloned()
    }

    pub fn insert_squad(&self, team_id: u64, domain: &str, squad: Vec<SquadPlayer>) {
        write(&self.squads).insert((team_id, domain.to_string()), squad);
    }

    pub fn len(&self) -> usize {
        read(&self.teams).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        write(&self.teams).clear();
        write(&self.squads).clear();
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{CacheEntry, CacheLookup, NegativeReason, ResolutionCache};
    use crate::market_value::TeamEntity;

    fn team(id: u64) -> TeamEntity {
        TeamEntity {
            id,
            name: "FC Porto".to_string(),
            country: None,
        }
    }

    #[test]
    fn confirmed_absence_is_a_hit() {
        let cache = ResolutionCache::new();
        cache.insert("x", "de", CacheEntry::Negative(NegativeReason::ConfirmedAbsent));
        assert_eq!(cache.lookup("x", "de"), CacheLookup::Hit(None));
    }

    #[test]
    fn remote_error_is_a_miss() {
        let cache = ResolutionCache::new();
        cache.insert("x", "de", CacheEntry::Negative(NegativeReason::RemoteError));
        assert_eq!(cache.lookup("x", "de"), CacheLookup::Miss);
        assert_eq!(
            cache.entry("x", "de"),
            Some(CacheEntry::Negative(NegativeReason::RemoteError))
        );
    }

    #[test]
    fn domain_is_part_of_the_key() {
        let cache = ResolutionCache::new();
        cache.insert("porto", "de", CacheEntry::Resolved(team(720)));
        assert_eq!(cache.lookup("porto", "de"), CacheLookup::Hit(Some(team(720))));
        assert_eq!(cache.lookup("porto", "com"), CacheLookup::Miss);
    }

    #[test]
    fn negative_does_not_overwrite_resolved() {
        let cache = ResolutionCache::new();
        cache.insert("porto", "de", CacheEntry::Resolved(team(720)));
        cache.insert("porto", "de", CacheEntry::Negative(NegativeReason::RemoteError));
        assert_eq!(cache.lookup("porto", "de"), CacheLookup::Hit(Some(team(720))));
    }
}
