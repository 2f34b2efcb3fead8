//! End-to-end subsetting run over a paired phospho/protein source tree.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SubsetConfig;
use crate::data::annotation::{filter_annotation, AnnotationReport};
use crate::data::columnar::{filter_parquet, RowCounts};
use crate::data::filter::{filter_workbook, LONG_SHEET, WIDE_SHEET};
use crate::data::model::DatasetKind;
use crate::data::workbook::{read_workbook, write_workbook};
use crate::error::{Result, SubsetError};
use crate::select::{select_proteins, select_sites, ProteinSelection, SiteSelection};

/// What one dataset's outputs contain after a run.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub kind: DatasetKind,
    pub columnar: RowCounts,
    pub annotation: AnnotationReport,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sites: SiteSelection,
    pub proteins: ProteinSelection,
    pub datasets: Vec<DatasetReport>,
    /// Every file written, relative to the output root, with its size in bytes.
    pub files: Vec<(PathBuf, u64)>,
}

impl RunReport {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|(_, s)| s).sum()
    }
}

/// Run selection, then filter and write both datasets into `cfg.out_dir`.
///
/// Any existing output tree is removed first. Source files are read in full
/// and closed before the corresponding output is written.
pub fn run_subset(cfg: &SubsetConfig) -> Result<RunReport> {
    info!("Source: {}", cfg.src_dir.display());
    info!("Output: {}", cfg.out_dir.display());
    check_sources(cfg)?;

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let phospho_book = cfg.phospho.workbook_path(&cfg.src_dir);
    let protein_book = cfg.protein.workbook_path(&cfg.src_dir);

    // Step 1: select phosphosites from the long + wide sheets
    info!("--- Selecting phosphosites ---");
    let sites = {
        let wb = read_workbook(&phospho_book)?;
        select_sites(
            wb.require(LONG_SHEET)?,
            wb.require(WIDE_SHEET)?,
            cfg.n_phospho,
            &cfg.keep_contrasts,
            &mut rng,
        )?
    };

    // Step 2: proteins referenced by those sites and present in the protein data
    info!("--- Selecting proteins ---");
    let proteins = {
        let wb = read_workbook(&protein_book)?;
        select_proteins(wb.require(WIDE_SHEET)?, &sites.proteins)?
    };

    recreate_output(cfg)?;

    // Steps 3-4: workbooks
    for (kind, keep) in [
        (DatasetKind::Phospho, &sites.sites),
        (DatasetKind::Protein, &proteins.proteins),
    ] {
        info!("--- Filtering {kind} xlsx ---");
        let layout = cfg.layout(kind);
        let wb = read_workbook(&layout.workbook_path(&cfg.src_dir))?;
        let filtered = filter_workbook(&wb, kind, keep, &cfg.keep_contrasts)?;
        drop(wb);
        let dest = layout.workbook_path(&cfg.out_dir);
        write_workbook(&filtered, &dest)?;
        info!("  Wrote {}", dest.display());
        for sheet in &filtered.sheets {
            info!("    {}: {} rows", sheet.name, sheet.len());
        }
    }

    // Step 5: columnar tables, same keep-sets as the workbooks
    info!("--- Filtering parquet files ---");
    let phospho_rows = filter_columnar(cfg, DatasetKind::Phospho, &sites.sites)?;
    let protein_rows = filter_columnar(cfg, DatasetKind::Protein, &proteins.proteins)?;

    // Step 6: auxiliary metadata, verbatim
    info!("--- Copying metadata files ---");
    for kind in [DatasetKind::Phospho, DatasetKind::Protein] {
        let layout = cfg.layout(kind);
        if let (Some(src), Some(dest)) = (
            layout.metadata_path(&cfg.src_dir),
            layout.metadata_path(&cfg.out_dir),
        ) {
            fs::copy(&src, &dest)?;
            info!("  Copied {} for {kind}", dest.display());
        }
    }

    // Step 7: annotation tables
    info!("--- Filtering annotation TSV ---");
    let mut datasets = Vec::new();
    for (kind, columnar) in [
        (DatasetKind::Phospho, phospho_rows),
        (DatasetKind::Protein, protein_rows),
    ] {
        let layout = cfg.layout(kind);
        let annotation = filter_annotation(
            &layout.annotation_path(&cfg.src_dir),
            &layout.annotation_path(&cfg.out_dir),
            &cfg.keep_contrasts,
        )?;
        datasets.push(DatasetReport {
            kind,
            columnar,
            annotation,
        });
    }

    let files = output_files(&cfg.out_dir)?;
    info!("--- Output sizes ---");
    for (path, size) in &files {
        info!("  {}: {:.1} KB", path.display(), *size as f64 / 1024.0);
    }
    let report = RunReport {
        sites,
        proteins,
        datasets,
        files,
    };
    info!(
        "  TOTAL: {:.1} MB",
        report.total_bytes() as f64 / 1024.0 / 1024.0
    );
    info!("Done!");
    Ok(report)
}

/// Fail before touching any output if the source tree is incomplete.
fn check_sources(cfg: &SubsetConfig) -> Result<()> {
    cfg.validate()?;
    if !cfg.src_dir.is_dir() {
        return Err(SubsetError::MissingSource(cfg.src_dir.clone()));
    }
    for kind in [DatasetKind::Phospho, DatasetKind::Protein] {
        for file in cfg.layout(kind).required_files(&cfg.src_dir) {
            if !file.is_file() {
                return Err(SubsetError::MissingFile(file));
            }
        }
    }
    Ok(())
}

fn recreate_output(cfg: &SubsetConfig) -> Result<()> {
    if cfg.out_dir.exists() {
        fs::remove_dir_all(&cfg.out_dir)?;
    }
    for kind in [DatasetKind::Phospho, DatasetKind::Protein] {
        let layout = cfg.layout(kind);
        fs::create_dir_all(layout.results_dir(&cfg.out_dir))?;
        fs::create_dir_all(layout.inputs_dir(&cfg.out_dir))?;
    }
    Ok(())
}

fn filter_columnar(
    cfg: &SubsetConfig,
    kind: DatasetKind,
    keep: &BTreeSet<String>,
) -> Result<RowCounts> {
    let layout = cfg.layout(kind);
    filter_parquet(
        &layout.columnar_path(&cfg.src_dir),
        &layout.columnar_path(&cfg.out_dir),
        kind.key_column(),
        keep,
    )
}

/// All files under `root`, sorted, with sizes.
fn output_files(root: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let meta = entry.metadata()?;
            if meta.is_dir() {
                pending.push(path);
            } else if meta.is_file() {
                let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                files.push((rel, meta.len()));
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetLayout;

    fn layout(tag: &str) -> DatasetLayout {
        DatasetLayout {
            dea: format!("DEA_{tag}"),
            results: format!("Results_{tag}"),
            inputs: format!("Inputs_{tag}"),
            workbook: format!("DE_{tag}.xlsx"),
            annotation: "annot.tsv".into(),
            columnar: "lfqdata_normalized.parquet".into(),
            metadata: Some("lfqdata.yaml".into()),
        }
    }

    fn config(src: &Path, out: &Path) -> SubsetConfig {
        SubsetConfig {
            seed: 1,
            src_dir: src.to_path_buf(),
            out_dir: out.to_path_buf(),
            phospho: layout("phospho"),
            protein: layout("protein"),
            keep_contrasts: vec!["X".into()],
            n_phospho: 10,
        }
    }

    #[test]
    fn missing_source_dir_fails_before_output_is_touched() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("keep.txt"), "x").unwrap();

        let cfg = config(&dir.path().join("nope"), &out);
        let err = run_subset(&cfg).unwrap_err();
        assert!(matches!(err, SubsetError::MissingSource(_)));
        assert!(out.join("keep.txt").exists());
    }

    #[test]
    fn repeated_contrast_fails_before_output_is_touched() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut cfg = config(dir.path(), &out);
        cfg.keep_contrasts = vec!["X".into(), "X".into()];
        let err = run_subset(&cfg).unwrap_err();
        assert!(matches!(err, SubsetError::DuplicateContrast(ref c) if c == "X"));
        assert!(!out.exists());
    }

    #[test]
    fn missing_required_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let cfg = config(&src, &dir.path().join("out"));
        match run_subset(&cfg) {
            Err(SubsetError::MissingFile(p)) => assert!(p.ends_with("DE_phospho.xlsx")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn output_files_are_listed_relative_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/x.txt"), "12345").unwrap();
        fs::write(dir.path().join("a.txt"), "1").unwrap();
        let files = output_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![(PathBuf::from("a.txt"), 1), (PathBuf::from("b/c/x.txt"), 5)]
        );
    }
}
