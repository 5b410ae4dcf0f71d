use std::collections::BTreeSet;

use stow_pack::Pack;
use stow_types::PackId;

use crate::set::BlobSet;

/// Packs holding at least one handle in `used`.
///
/// Each pack is scanned until its first used entry, so the cost is bounded
/// by the total number of entries.
pub fn live_packs(used: &BlobSet, packs: &[Pack]) -> BTreeSet<PackId> {
    packs
        .iter()
        .filter(|pack| pack.handles().any(|h| used.contains(h)))
        .map(|pack| pack.id)
        .collect()
}
