//! Coverage-aware phosphosite selection.
//!
//! Sites are read from the long `diff_exp_analysis` sheet (one row per
//! site × contrast), validated against the wide `diff_exp_analysis_wide`
//! sheet, split into complete and partial coverage strata, and sampled from
//! each stratum with a caller-supplied generator.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::model::{parse_flag, CellValue, Table, PROTEIN_ID};
use crate::error::Result;

/// Minimum SequenceWindow length for a site to be usable.
pub const MIN_SEQUENCE_WINDOW: usize = 7;

/// Wide-sheet attributes of a site that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMeta {
    pub mod_aa: String,
    pub protein_id: Option<String>,
}

/// Sites grouped by contrast coverage.
#[derive(Debug, Clone, Default)]
pub struct CoverageStrata {
    /// Valid sites with a non-null FDR in every kept contrast.
    pub complete: Vec<String>,
    /// Per kept contrast (in kept order), valid sites present in that
    /// contrast but not in all of them.
    pub partial: Vec<(String, Vec<String>)>,
    /// Validity map built from the wide sheet.
    pub meta: HashMap<String, SiteMeta>,
}

impl CoverageStrata {
    /// Partial candidates for `contrast`, if it is a kept contrast.
    pub fn partial_for(&self, contrast: &str) -> Option<&[String]> {
        self.partial
            .iter()
            .find(|(c, _)| c == contrast)
            .map(|(_, sites)| sites.as_slice())
    }

    /// Sum of partial candidates over contrasts (a site may count more than once).
    pub fn partial_total(&self) -> usize {
        self.partial.iter().map(|(_, s)| s.len()).sum()
    }
}

/// Result of site selection.
#[derive(Debug, Clone, Default)]
pub struct SiteSelection {
    pub sites: BTreeSet<String>,
    pub complete: BTreeSet<String>,
    pub partial: BTreeSet<String>,
    /// Distinct owning-protein ids of the selected sites.
    pub proteins: BTreeSet<String>,
    /// Selected sites per modification residue.
    pub mod_aa_counts: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Per-site set of kept contrasts with a non-null FDR, in first-appearance order.
pub fn contrast_coverage(
    long: &Table,
    keep_contrasts: &[String],
) -> Result<Vec<(String, BTreeSet<String>)>> {
    let [site_idx, contrast_idx, fdr_idx] = long.columns(["site", "contrast", "FDR"])?;
    let kept: HashSet<&str> = keep_contrasts.iter().map(String::as_str).collect();

    let mut order: Vec<(String, BTreeSet<String>)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for row in &long.rows {
        let contrast = match Table::cell(row, contrast_idx).as_key() {
            Some(c) if kept.contains(c.as_str()) => c,
            _ => continue,
        };
        let Some(site) = Table::cell(row, site_idx).as_key() else {
            continue;
        };
        let i = *slot.entry(site.clone()).or_insert_with(|| {
            order.push((site, BTreeSet::new()));
            order.len() - 1
        });
        if !Table::cell(row, fdr_idx).is_null() {
            order[i].1.insert(contrast);
        }
    }
    Ok(order)
}

/// Validity map over the wide sheet: not decoy, not contaminant, and a
/// SequenceWindow of at least [`MIN_SEQUENCE_WINDOW`] characters.
pub fn valid_sites(wide: &Table) -> Result<HashMap<String, SiteMeta>> {
    let [site_idx, rev_idx, con_idx, sw_idx, mod_idx, prot_idx] =
        wide.columns(["site", "REV", "CON", "SequenceWindow", "modAA", PROTEIN_ID])?;

    let mut meta = HashMap::new();
    for row in &wide.rows {
        let Some(site) = Table::cell(row, site_idx).as_key() else {
            continue;
        };
        if parse_flag(Table::cell(row, rev_idx), &wide.name, "REV")? {
            continue;
        }
        if parse_flag(Table::cell(row, con_idx), &wide.name, "CON")? {
            continue;
        }
        if !sequence_window_ok(Table::cell(row, sw_idx)) {
            continue;
        }
        meta.insert(
            site,
            SiteMeta {
                mod_aa: Table::cell(row, mod_idx).as_key().unwrap_or_default(),
                protein_id: Table::cell(row, prot_idx).as_key(),
            },
        );
    }
    Ok(meta)
}

fn sequence_window_ok(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => false,
        CellValue::String(s) if s.is_empty() || s == "None" => false,
        other => other.to_string().chars().count() >= MIN_SEQUENCE_WINDOW,
    }
}

/// Build complete/partial strata from the long and wide sheets.
pub fn coverage_strata(
    long: &Table,
    wide: &Table,
    keep_contrasts: &[String],
) -> Result<CoverageStrata> {
    let coverage = contrast_coverage(long, keep_contrasts)?;
    let meta = valid_sites(wide)?;

    let mut complete = Vec::new();
    let mut partial: Vec<(String, Vec<String>)> =
        keep_contrasts.iter().map(|c| (c.clone(), Vec::new())).collect();

    for (site, contrasts) in coverage {
        if !meta.contains_key(&site) {
            continue;
        }
        if contrasts.len() == keep_contrasts.len() {
            complete.push(site);
        } else {
            for (c, sites) in partial.iter_mut() {
                if contrasts.contains(c) {
                    sites.push(site.clone());
                }
            }
        }
    }

    Ok(CoverageStrata {
        complete,
        partial,
        meta,
    })
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Draw the site sample from precomputed strata.
///
/// `min(n, |complete|)` complete sites are drawn first. Then, with
/// `n_partial = min(n / 5, total partial candidates)`, each kept contrast in
/// order contributes up to `max(1, n_partial / |C|)` not-yet-selected
/// partial sites. Leftover quota is not redistributed, and a shortfall of
/// complete sites is not backfilled from the partial strata.
pub fn sample_sites<R: Rng + ?Sized>(
    strata: &CoverageStrata,
    n: usize,
    rng: &mut R,
) -> SiteSelection {
    let n_complete = n.min(strata.complete.len());
    let complete: BTreeSet<String> = strata
        .complete
        .choose_multiple(rng, n_complete)
        .cloned()
        .collect();
    let mut sites = complete.clone();

    let mut partial = BTreeSet::new();
    if !strata.partial.is_empty() {
        let n_partial = (n / 5).min(strata.partial_total());
        let per_contrast = (n_partial / strata.partial.len()).max(1);
        for (_, candidates) in &strata.partial {
            let available: Vec<&String> =
                candidates.iter().filter(|s| !sites.contains(*s)).collect();
            let n_pick = per_contrast.min(available.len());
            if n_pick == 0 {
                continue;
            }
            for site in available.choose_multiple(rng, n_pick) {
                partial.insert((*site).clone());
                sites.insert((*site).clone());
            }
        }
    }

    let mut proteins = BTreeSet::new();
    let mut mod_aa_counts = BTreeMap::new();
    for site in &sites {
        if let Some(meta) = strata.meta.get(site) {
            if let Some(p) = &meta.protein_id {
                proteins.insert(p.clone());
            }
            *mod_aa_counts.entry(meta.mod_aa.clone()).or_insert(0) += 1;
        }
    }

    SiteSelection {
        sites,
        complete,
        partial,
        proteins,
        mod_aa_counts,
    }
}

/// Select phosphosites from the long and wide sheets of the phospho workbook.
pub fn select_sites<R: Rng + ?Sized>(
    long: &Table,
    wide: &Table,
    n: usize,
    keep_contrasts: &[String],
    rng: &mut R,
) -> Result<SiteSelection> {
    let strata = coverage_strata(long, wide, keep_contrasts)?;
    let per_contrast: Vec<String> = strata
        .partial
        .iter()
        .map(|(c, s)| format!("{c}: {}", s.len()))
        .collect();
    info!(
        "Valid sites: {} complete (all {} contrasts), partial: {{{}}}",
        strata.complete.len(),
        keep_contrasts.len(),
        per_contrast.join(", ")
    );

    let selection = sample_sites(&strata, n, rng);
    info!(
        "Selected {} phosphosites from {} proteins",
        selection.sites.len(),
        selection.proteins.len()
    );
    info!(
        "  {} complete + {} partial",
        selection.complete.len(),
        selection.partial.len()
    );
    info!("  modAA distribution: {:?}", selection.mod_aa_counts);
    Ok(selection)
}
