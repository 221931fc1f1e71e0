//! Primary/secondary differential colours.
//!
//! A secondary sample is stored as the k-mers its primary's approximate set
//! does not already report. A false positive in the primary's filter drops a
//! genuinely novel k-mer from the diff; that loss is the price of the space
//! saving.

use crate::error::Result;
use crate::store::MembershipStore;

/// K-mers of `kmers` not reported present under `primary`, in input order.
pub fn diff_against_primary(
    store: &dyn MembershipStore,
    primary: u64,
    kmers: &[u64],
) -> Result<Vec<u64>> {
    let present = store.may_contain_batch(primary, kmers)?;
    Ok(kmers
        .iter()
        .zip(present)
        .filter(|(_, present)| !present)
        .map(|(&kmer, _)| kmer)
        .collect())
}
