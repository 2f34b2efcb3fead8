use std::collections::BTreeSet;

use log::info;

use crate::data::model::{Table, PROTEIN_ID};
use crate::error::Result;

/// Protein keep-set and the diagnostic count of unmatched ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinSelection {
    pub proteins: BTreeSet<String>,
    /// Owning-protein ids of selected sites with no row in the protein
    /// dataset. Expected, not an error.
    pub unmatched: usize,
}

/// Intersect the owning proteins of the selected sites with the proteins
/// present in the protein dataset's wide sheet.
pub fn select_proteins(wide: &Table, site_proteins: &BTreeSet<String>) -> Result<ProteinSelection> {
    let prot_idx = wide.column(PROTEIN_ID)?;
    let present: BTreeSet<String> = wide
        .rows
        .iter()
        .filter_map(|r| Table::cell(r, prot_idx).as_key())
        .collect();

    let proteins: BTreeSet<String> = site_proteins.intersection(&present).cloned().collect();
    let unmatched = site_proteins.len() - proteins.len();
    info!("Phospho proteins found in protein data: {}", proteins.len());
    info!("Phospho proteins NOT in protein data: {unmatched}");

    Ok(ProteinSelection {
        proteins,
        unmatched,
    })
}
