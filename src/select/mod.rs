/// Selection layer: which sites and proteins survive the subset.
///
/// ```text
///   diff_exp_analysis + diff_exp_analysis_wide  (phospho workbook)
///        │
///        ▼
///   ┌──────────┐
///   │  sites    │  coverage strata → seeded sample → keep-sites
///   └──────────┘
///        │ owning protein ids
///        ▼
///   ┌──────────┐
///   │ proteins  │  ∩ protein workbook ids → keep-proteins
///   └──────────┘
/// ```

pub mod proteins;
pub mod sample;
pub mod sites;

pub use proteins::{select_proteins, ProteinSelection};
pub use sample::stratified_sample;
pub use sites::{select_sites, SiteSelection};
