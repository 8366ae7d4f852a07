/// Ordered collection of migration units
///
/// Declaration order does not matter: the catalog parses every identifier,
/// rejects duplicates and sorts ascending, so execution order is always the
/// identifier order.

use crate::error::{MigrationError, Result};
use crate::migration::id::MigrationId;
use crate::migration::unit::MigrationUnit;
use std::collections::HashSet;

pub struct CatalogEntry {
    pub id: MigrationId,
    pub unit: Box<dyn MigrationUnit>,
}

pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(units: Vec<Box<dyn MigrationUnit>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(units.len());

        for unit in units {
            let id = MigrationId::parse(unit.id())?;
            if !seen.insert(id.clone()) {
                return Err(MigrationError::DuplicateMigration(id));
            }
            entries.push(CatalogEntry { id, unit });
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<MigrationId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|e| &e.id)).finish()
    }
}
