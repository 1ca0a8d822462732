// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset list filtering.

use serde::{Deserialize, Serialize};

/// Algorand Standard Asset id; `0` is ALGO itself.
pub type AssetId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: Option<String>,
    pub unit_name: Option<String>,
}

impl Asset {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            name: None,
            unit_name: None,
        }
    }
}

/// Predicate deciding whether an asset stays in a list.
pub trait AssetFilter {
    fn keeps(&self, asset: &Asset) -> bool;

    fn apply<'a>(&self, assets: &'a [Asset]) -> Vec<&'a Asset> {
        assets.iter().filter(|asset| self.keeps(asset)).collect()
    }
}

/// Drops every asset whose id appears in the excluded list.
#[derive(Debug, Clone, Default)]
pub struct AssetExcludeFilter {
    excluded: Vec<Asset>,
}

impl AssetExcludeFilter {
    pub fn new(excluded: Vec<Asset>) -> Self {
        Self { excluded }
    }
}

impl AssetFilter for AssetExcludeFilter {
    fn keeps(&self, asset: &Asset) -> bool {
        !self.excluded.iter().any(|excluded| excluded.id == asset.id)
    }
}
