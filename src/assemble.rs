//! Merge round results into the final ordered override contents.
use crate::chain::ChainState;
use crate::error::{EngineError, Result};
use crate::model::StoreConfig;
use crate::values::OverrideEntry;

/// Walk entries in aggregator order and collect their contents.
///
/// Exactly one result map holds each fetched key. A key found nowhere is
/// skipped when its entry is optional; for a required entry the chain should
/// already have failed, so it is reported as corruption.
pub fn assemble(entries: &[OverrideEntry], state: &ChainState) -> Result<Vec<String>> {
    let mut merged = Vec::new();
    for entry in entries {
        if let StoreConfig::Inline(inline) = &entry.store {
            merged.push(inline.content.clone());
            continue;
        }
        let mut holders = state
            .all_results()
            .into_iter()
            .filter_map(|(slot, results)| results.get(&entry.key).map(|found| (slot, found)));
        let Some((_, contents)) = holders.next() else {
            if entry.required_if_missing {
                return Err(EngineError::corruption(format!(
                    "required entry [{}] has no fetched contents",
                    entry.key
                )));
            }
            continue;
        };
        if let Some((slot, _)) = holders.next() {
            return Err(EngineError::corruption(format!(
                "entry [{}] was filled by more than one round (also {slot:?})",
                entry.key
            )));
        }
        merged.extend(contents.iter().cloned());
    }
    Ok(merged)
}
