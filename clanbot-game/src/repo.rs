//! Generic entity storage shared by every world table.
//!
//! One [`Repository`] capability replaces a per-entity CRUD manager; the
//! entity-specific rules live in [`crate::admin`] as separate policy functions.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Row identifier, unique within one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything stored in a [`Repository`].
pub trait Entity: Clone {
    /// Human-readable table name used in error messages.
    const KIND: &'static str;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn name(&self) -> &str;

    /// Key that must be unique within the repository. Defaults to the name.
    fn unique_key(&self) -> String {
        self.name().to_string()
    }
}

/// Normalize a user-supplied name the way rows are stored: first letter upper
/// case, the rest lower case.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// The ways a caller may point at an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    ByName(String),
    ById(EntityId),
    Resolved(T),
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }
}

impl<T> From<EntityId> for Lookup<T> {
    fn from(id: EntityId) -> Self {
        Self::ById(id)
    }
}

impl<T> From<&str> for Lookup<T> {
    fn from(name: &str) -> Self {
        Self::ByName(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("{kind} `{key}` not found")]
    NotFound { kind: &'static str, key: String },
    #[error("{kind} `{key}` already exists")]
    Duplicate { kind: &'static str, key: String },
    #[error("{kind} id {id} is used by more than one row")]
    DuplicateId { kind: &'static str, id: EntityId },
}

impl RepoError {
    fn not_found<T: Entity>(key: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: T::KIND,
            key: key.to_string(),
        }
    }
}

/// Storage capability parameterized over the entity type.
pub trait Repository<T: Entity> {
    fn get(&self, id: EntityId) -> Option<&T>;
    fn get_mut(&mut self, id: EntityId) -> Option<&mut T>;
    fn find_by_name(&self, name: &str) -> Option<&T>;

    /// Insert a new row, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Duplicate`] when the unique key is already taken.
    fn insert(&mut self, row: T) -> Result<EntityId, RepoError>;

    /// Replace an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] for unknown ids and
    /// [`RepoError::Duplicate`] when the new unique key collides.
    fn update(&mut self, row: T) -> Result<(), RepoError>;

    /// Remove a row by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] for unknown ids.
    fn remove(&mut self, id: EntityId) -> Result<T, RepoError>;

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    /// Resolve any [`Lookup`] into an owned row.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when the name or id does not resolve.
    fn resolve(&self, lookup: Lookup<T>) -> Result<T, RepoError> {
        match lookup {
            Lookup::Resolved(row) => Ok(row),
            Lookup::ById(id) => self.get(id).cloned().ok_or_else(|| RepoError::not_found::<T>(id)),
            Lookup::ByName(name) => self
                .find_by_name(&name)
                .cloned()
                .ok_or_else(|| RepoError::not_found::<T>(normalize_name(&name))),
        }
    }

    /// Resolve a lookup into an id without cloning the row.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when the name or id does not resolve.
    fn resolve_id(&self, lookup: &Lookup<T>) -> Result<EntityId, RepoError> {
        match lookup {
            Lookup::Resolved(row) => Ok(row.id()),
            Lookup::ById(id) => self
                .get(*id)
                .map(Entity::id)
                .ok_or_else(|| RepoError::not_found::<T>(id)),
            Lookup::ByName(name) => self
                .find_by_name(name)
                .map(Entity::id)
                .ok_or_else(|| RepoError::not_found::<T>(normalize_name(name))),
        }
    }
}

/// In-memory repository, serialized as a plain list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<T>",
    into = "Vec<T>",
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct MemoryRepository<T: Entity> {
    rows: BTreeMap<EntityId, T>,
    next_id: u32,
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> MemoryRepository<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.keys().copied().collect()
    }

    fn key_taken(&self, key: &str, except: Option<EntityId>) -> bool {
        self.rows
            .values()
            .any(|row| Some(row.id()) != except && row.unique_key() == key)
    }
}

/// Rebuild a repository from a stored row list. Rows that carry an id keep it;
/// rows without one (id 0) get fresh ids after the highest stored id.
impl<T: Entity> TryFrom<Vec<T>> for MemoryRepository<T> {
    type Error = RepoError;

    fn try_from(rows: Vec<T>) -> Result<Self, Self::Error> {
        let mut repo = Self::default();
        let mut unnumbered = Vec::new();
        for row in rows {
            let id = row.id();
            if id == EntityId(0) {
                unnumbered.push(row);
                continue;
            }
            if repo.rows.contains_key(&id) {
                return Err(RepoError::DuplicateId { kind: T::KIND, id });
            }
            let key = row.unique_key();
            if repo.key_taken(&key, None) {
                return Err(RepoError::Duplicate { kind: T::KIND, key });
            }
            repo.next_id = repo.next_id.max(id.0.saturating_add(1));
            repo.rows.insert(id, row);
        }
        for row in unnumbered {
            repo.insert(row)?;
        }
        Ok(repo)
    }
}

impl<T: Entity> From<MemoryRepository<T>> for Vec<T> {
    fn from(repo: MemoryRepository<T>) -> Self {
        repo.rows.into_values().collect()
    }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
    fn get(&self, id: EntityId) -> Option<&T> {
        self.rows.get(&id)
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    fn find_by_name(&self, name: &str) -> Option<&T> {
        let wanted = normalize_name(name);
        self.rows
            .values()
            .find(|row| normalize_name(row.name()) == wanted)
    }

    fn insert(&mut self, mut row: T) -> Result<EntityId, RepoError> {
        let key = row.unique_key();
        if self.key_taken(&key, None) {
            return Err(RepoError::Duplicate { kind: T::KIND, key });
        }
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        row.set_id(id);
        self.rows.insert(id, row);
        Ok(id)
    }

    fn update(&mut self, row: T) -> Result<(), RepoError> {
        let id = row.id();
        if !self.rows.contains_key(&id) {
            return Err(RepoError::not_found::<T>(id));
        }
        let key = row.unique_key();
        if self.key_taken(&key, Some(id)) {
            return Err(RepoError::Duplicate { kind: T::KIND, key });
        }
        self.rows.insert(id, row);
        Ok(())
    }

    fn remove(&mut self, id: EntityId) -> Result<T, RepoError> {
        self.rows
            .remove(&id)
            .ok_or_else(|| RepoError::not_found::<T>(id))
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.rows.values())
    }
}
