use std::collections::HashSet;

use crate::error::{Error, Result};

/// Keeps positive ids, first occurrence wins.
pub fn normalize_ids(ids: &[i64]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter_map(|&id| i32::try_from(id).ok())
        .filter(|&id| id > 0 && seen.insert(id))
        .collect()
}

/// Path and body ids must be positive integers.
pub fn require_id(id: i32, what: &str) -> Result<i32> {
    if id > 0 {
        Ok(id)
    } else {
        Err(Error::BadRequest(format!("Invalid {} id", what)))
    }
}
