use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::{AccountRepo, GearRepo, LocationRepo, Subtree};
use crate::models::account::{Account, AccountCredentials};
use crate::models::gear::{Gear, GearFilter, GearPatch, NewGear};
use crate::models::location::{Location, LocationFilter, LocationPatch, NewLocation};
use crate::models::patch::Patch;
use crate::models::types::{AccountId, GearId, LocationId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Ephemeral store with the same integrity rules as the PostgreSQL schema.
/// All tables sit behind one lock, so a multi-row write is observed either
/// completely or not at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, AccountCredentials>,
    locations: BTreeMap<LocationId, Location>,
    /// Stored without the location snapshot
    gear: BTreeMap<GearId, Gear>,
    next_account: i64,
    next_location: i64,
    next_gear: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn require_location(&self, id: Option<LocationId>, column: &str) -> DbResult<()> {
        match id {
            Some(id) if !self.locations.contains_key(&id) => Err(DbError::ForeignKey(column.to_string())),
            _ => Ok(()),
        }
    }

    /// True when walking up the parent chain from `candidate` reaches `id`.
    fn is_below(&self, candidate: LocationId, id: LocationId) -> bool {
        let mut seen = HashSet::new();
        let mut cur = Some(candidate);
        while let Some(c) = cur {
            if c == id {
                return true;
            }
            if !seen.insert(c) {
                return false;
            }
            cur = self.locations.get(&c).and_then(|l| l.parent_id);
        }
        false
    }

    fn with_snapshot(&self, gear: &Gear) -> Gear {
        let mut g = gear.clone();
        g.location = g.location_id.and_then(|id| self.locations.get(&id).cloned());
        g
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn insert_account(&self, username: &str, password_hash: &str) -> DbResult<Account> {
        let mut t = self.tables.write();
        if t.accounts.values().any(|c| c.account.username == username) {
            return Err(DbError::UniqueViolation("users_username_key".into()));
        }

        let id = AccountId(Tables::next_id(&mut t.next_account));
        let account = Account {
            id,
            username: username.to_string(),
        };
        t.accounts.insert(
            id,
            AccountCredentials {
                account: account.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(account)
    }

    async fn get_credentials(&self, username: &str) -> DbResult<Option<AccountCredentials>> {
        let t = self.tables.read();
        Ok(t.accounts.values().find(|c| c.account.username == username).cloned())
    }

    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>> {
        let t = self.tables.read();
        Ok(t.accounts.get(&account_id).map(|c| c.account.clone()))
    }

    async fn count_username(&self, username: &str) -> DbResult<i64> {
        let t = self.tables.read();
        Ok(t.accounts.values().filter(|c| c.account.username == username).count() as i64)
    }
}

#[async_trait]
impl LocationRepo for MemoryStore {
    async fn insert(&self, new: &NewLocation) -> DbResult<Location> {
        let mut t = self.tables.write();
        t.require_location(new.parent_id, "locations_parent_id_fkey")?;

        let id = LocationId(Tables::next_id(&mut t.next_location));
        let location = Location {
            id,
            name: new.name.clone(),
            kind: new.kind.clone(),
            parent_id: new.parent_id,
        };
        t.locations.insert(id, location.clone());
        Ok(location)
    }

    async fn get(&self, id: LocationId) -> DbResult<Option<Location>> {
        Ok(self.tables.read().locations.get(&id).cloned())
    }

    async fn list(&self, filter: &LocationFilter) -> DbResult<Vec<Location>> {
        let t = self.tables.read();
        Ok(t.locations.values().filter(|l| filter.matches(l)).cloned().collect())
    }

    async fn update(&self, id: LocationId, patch: LocationPatch) -> DbResult<Option<Location>> {
        let mut t = self.tables.write();
        let Some(current) = t.locations.get(&id).cloned() else {
            return Ok(None);
        };

        if let Patch::Set(Some(parent_id)) = patch.parent_id {
            t.require_location(Some(parent_id), "locations_parent_id_fkey")?;
            if parent_id == id {
                return Err(DbError::Check("locations_not_own_parent".into()));
            }
            if t.is_below(parent_id, id) {
                return Err(DbError::Cycle { id, parent_id });
            }
        }

        let mut updated = current;
        patch.apply(&mut updated);
        t.locations.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: LocationId) -> DbResult<bool> {
        let mut t = self.tables.write();
        if t.locations.remove(&id).is_none() {
            return Ok(false);
        }

        for loc in t.locations.values_mut() {
            if loc.parent_id == Some(id) {
                loc.parent_id = None;
            }
        }
        for g in t.gear.values_mut() {
            if g.location_id == Some(id) {
                g.location_id = None;
            }
        }
        Ok(true)
    }

    async fn subtree(&self, id: LocationId) -> DbResult<Option<Subtree>> {
        let t = self.tables.read();
        let Some(root) = t.locations.get(&id) else {
            return Ok(None);
        };

        // breadth first, so parents always precede their children
        let mut locations = vec![root.clone()];
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(cur) = queue.pop_front() {
            for child in t.locations.values().filter(|l| l.parent_id == Some(cur)) {
                if seen.insert(child.id) {
                    locations.push(child.clone());
                    queue.push_back(child.id);
                }
            }
        }

        let gear = t
            .gear
            .values()
            .filter(|g| g.location_id.is_some_and(|l| seen.contains(&l)))
            .map(|g| t.with_snapshot(g))
            .collect();

        Ok(Some(Subtree { locations, gear }))
    }
}

#[async_trait]
impl GearRepo for MemoryStore {
    async fn insert(&self, new: &NewGear) -> DbResult<Gear> {
        let mut t = self.tables.write();
        t.require_location(new.location_id, "gear_location_id_fkey")?;

        let id = GearId(Tables::next_id(&mut t.next_gear));
        let gear = Gear {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            weight: new.weight,
            cost: new.cost,
            value: new.value,
            legality: new.legality.clone(),
            category: new.category.clone(),
            location_id: new.location_id,
            location: None,
        };
        t.gear.insert(id, gear.clone());
        Ok(t.with_snapshot(&gear))
    }

    async fn get(&self, id: GearId) -> DbResult<Option<Gear>> {
        let t = self.tables.read();
        Ok(t.gear.get(&id).map(|g| t.with_snapshot(g)))
    }

    async fn list(&self, filter: &GearFilter) -> DbResult<Vec<Gear>> {
        let t = self.tables.read();
        Ok(t.gear
            .values()
            .filter(|g| filter.matches(g))
            .map(|g| t.with_snapshot(g))
            .collect())
    }

    async fn in_location(&self, location_id: LocationId) -> DbResult<Option<Vec<Gear>>> {
        let t = self.tables.read();
        if !t.locations.contains_key(&location_id) {
            return Ok(None);
        }
        Ok(Some(
            t.gear
                .values()
                .filter(|g| g.location_id == Some(location_id))
                .map(|g| t.with_snapshot(g))
                .collect(),
        ))
    }

    async fn update(&self, id: GearId, patch: GearPatch) -> DbResult<Option<Gear>> {
        let mut t = self.tables.write();
        let Some(current) = t.gear.get(&id).cloned() else {
            return Ok(None);
        };
        if let Patch::Set(location_id) = patch.location_id {
            t.require_location(location_id, "gear_location_id_fkey")?;
        }

        let mut updated = current;
        patch.apply(&mut updated);
        t.gear.insert(id, updated.clone());
        Ok(Some(t.with_snapshot(&updated)))
    }

    async fn delete(&self, id: GearId) -> DbResult<bool> {
        Ok(self.tables.write().gear.remove(&id).is_some())
    }
}
