//! Integration tests for a full subsetting run over a synthetic source tree.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use ptm_subset::config::{DatasetLayout, SubsetConfig};
use ptm_subset::data::columnar::distinct_keys;
use ptm_subset::data::filter::{Summary, LONG_SHEET, SUMMARY_SHEET, WIDE_SHEET};
use ptm_subset::data::model::{parse_flag, DatasetKind, Table, PROTEIN_ID};
use ptm_subset::data::workbook::read_workbook;
use ptm_subset::pipeline::run_subset;
use ptm_subset::synthetic::{protein_ids, write_source_tree, SyntheticParams};
use tempfile::TempDir;

const KEPT: [&str; 2] = ["KO_vs_WT", "KO_vs_WT_at_Early"];

fn layout(tag: &str) -> DatasetLayout {
    DatasetLayout {
        dea: format!("DEA_20260209_WU{tag}_vsn"),
        results: format!("Results_WU_{tag}"),
        inputs: format!("Inputs_WU_{tag}"),
        workbook: format!("DE_WU{tag}.xlsx"),
        annotation: "dataset_with_contrasts.tsv".into(),
        columnar: "lfqdata_normalized.parquet".into(),
        metadata: Some("lfqdata.yaml".into()),
    }
}

/// Source tree plus a config pointing at it.
fn fixture(out_name: &str) -> (TempDir, SubsetConfig) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SubsetConfig {
        seed: 42,
        src_dir: dir.path().join("source"),
        out_dir: dir.path().join(out_name),
        phospho: layout("phospho_STY"),
        protein: layout("total_proteome"),
        keep_contrasts: KEPT.iter().map(|s| s.to_string()).collect(),
        n_phospho: 40,
    };
    let params = SyntheticParams {
        n_sites: 240,
        n_proteins: 70,
        ..SyntheticParams::default()
    };
    write_source_tree(&cfg, &params).unwrap();
    (dir, cfg)
}

fn keys_of(table: &Table, column: &str) -> BTreeSet<String> {
    let idx = table.column(column).unwrap();
    table
        .rows
        .iter()
        .filter_map(|r| Table::cell(r, idx).as_key())
        .collect()
}

fn read_tree(root: &Path) -> HashMap<String, Vec<u8>> {
    let mut out = HashMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().display().to_string();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    out
}

#[test]
fn same_seed_gives_identical_output() {
    let (_dir, cfg) = fixture("out_a");
    let mut other = cfg.clone();
    other.out_dir = cfg.out_dir.with_file_name("out_b");

    let a = run_subset(&cfg).unwrap();
    let b = run_subset(&other).unwrap();
    assert_eq!(a.sites.sites, b.sites.sites);
    assert_eq!(a.proteins.proteins, b.proteins.proteins);

    let tree_a = read_tree(&cfg.out_dir);
    let tree_b = read_tree(&other.out_dir);
    assert_eq!(tree_a.len(), 8);
    assert_eq!(
        tree_a.keys().collect::<BTreeSet<_>>(),
        tree_b.keys().collect::<BTreeSet<_>>()
    );
    for (name, bytes) in &tree_a {
        assert!(tree_b[name] == *bytes, "{name} differs between runs");
    }
}

#[test]
fn every_format_agrees_on_membership() {
    let (_dir, cfg) = fixture("out");
    let report = run_subset(&cfg).unwrap();

    for (kind, keep) in [
        (DatasetKind::Phospho, &report.sites.sites),
        (DatasetKind::Protein, &report.proteins.proteins),
    ] {
        let layout = cfg.layout(kind);
        let wb = read_workbook(&layout.workbook_path(&cfg.out_dir)).unwrap();
        let wide = wb.require(WIDE_SHEET).unwrap();
        let wide_keys = keys_of(wide, kind.key_column());
        let parquet_keys = distinct_keys(&layout.columnar_path(&cfg.out_dir), kind.key_column())
            .unwrap();
        assert_eq!(&wide_keys, keep, "{kind} wide sheet");
        assert_eq!(wide_keys, parquet_keys, "{kind} parquet");

        let long = wb.require(LONG_SHEET).unwrap();
        let [k, c] = long.columns([kind.key_column(), "contrast"]).unwrap();
        for row in &long.rows {
            assert!(Table::cell(row, k).key_in(keep));
            let contrast = Table::cell(row, c).as_key().unwrap();
            assert!(KEPT.contains(&contrast.as_str()));
        }

        let contrasts = wb.require("contrasts").unwrap();
        assert_eq!(contrasts.len(), KEPT.len());

        let summary = wb.require(SUMMARY_SHEET).unwrap();
        let expected = Summary::from_wide(wide).unwrap().to_table();
        assert_eq!(summary.rows[0][0].as_key(), expected.rows[0][0].as_key());
        assert_eq!(summary.rows[0][3].as_key(), expected.rows[0][3].as_key());
        assert_eq!(
            summary.rows[0][0].as_key(),
            Some(wide.len().to_string())
        );

        assert!(wb.sheet("notes").is_some());
        assert!(layout.metadata_path(&cfg.out_dir).unwrap().is_file());
    }
}

#[test]
fn selected_sites_are_valid_and_correctly_classified() {
    let (_dir, cfg) = fixture("out");
    let report = run_subset(&cfg).unwrap();
    let sel = &report.sites;

    assert!(sel.complete.len() <= cfg.n_phospho);
    assert_eq!(sel.complete.len() + sel.partial.len(), sel.sites.len());
    // One site at most per contrast above the n/5 quota.
    assert!(sel.partial.len() <= (cfg.n_phospho / 5).max(1) + KEPT.len());

    let out = read_workbook(&cfg.phospho.workbook_path(&cfg.out_dir)).unwrap();
    let wide = out.require(WIDE_SHEET).unwrap();
    let [site, rev, con, sw] = wide.columns(["site", "REV", "CON", "SequenceWindow"]).unwrap();
    for row in &wide.rows {
        assert!(!parse_flag(Table::cell(row, rev), WIDE_SHEET, "REV").unwrap());
        assert!(!parse_flag(Table::cell(row, con), WIDE_SHEET, "CON").unwrap());
        let window = Table::cell(row, sw).as_key().unwrap();
        assert!(window.len() >= 7, "{:?}", Table::cell(row, site));
    }

    // Coverage is judged against the source long sheet.
    let src = read_workbook(&cfg.phospho.workbook_path(&cfg.src_dir)).unwrap();
    let long = src.require(LONG_SHEET).unwrap();
    let [s, c, f] = long.columns(["site", "contrast", "FDR"]).unwrap();
    let mut covered: HashMap<String, BTreeSet<String>> = HashMap::new();
    for row in &long.rows {
        let contrast = Table::cell(row, c).as_key().unwrap();
        if KEPT.contains(&contrast.as_str()) && !Table::cell(row, f).is_null() {
            covered
                .entry(Table::cell(row, s).as_key().unwrap())
                .or_default()
                .insert(contrast);
        }
    }
    for site in &sel.complete {
        assert_eq!(covered[site].len(), KEPT.len(), "{site}");
    }
    for site in &sel.partial {
        let n = covered.get(site).map_or(0, |c| c.len());
        assert!(n >= 1 && n < KEPT.len(), "{site}");
    }
}

#[test]
fn protein_keep_set_is_limited_to_protein_dataset() {
    let (_dir, cfg) = fixture("out");
    let report = run_subset(&cfg).unwrap();
    let all_proteins = protein_ids(&cfg).unwrap();

    assert!(report.proteins.proteins.is_subset(&all_proteins));
    assert!(report.proteins.proteins.is_subset(&report.sites.proteins));
    assert_eq!(
        report.proteins.unmatched,
        report.sites.proteins.difference(&all_proteins).count()
    );

    // Sites whose protein is missing from the protein dataset stay selected.
    let out = read_workbook(&cfg.phospho.workbook_path(&cfg.out_dir)).unwrap();
    let wide = out.require(WIDE_SHEET).unwrap();
    let site_proteins = keys_of(wide, PROTEIN_ID);
    let orphaned: BTreeSet<&String> = site_proteins.difference(&all_proteins).collect();
    assert_eq!(orphaned.len(), report.proteins.unmatched);
}

#[test]
fn annotation_tables_keep_their_rows() {
    let (_dir, cfg) = fixture("out");
    let report = run_subset(&cfg).unwrap();

    let phospho_src = fs::read_to_string(cfg.phospho.annotation_path(&cfg.src_dir)).unwrap();
    let phospho_out = fs::read_to_string(cfg.phospho.annotation_path(&cfg.out_dir)).unwrap();
    assert_eq!(phospho_src.lines().count(), phospho_out.lines().count());
    assert!(!phospho_out.contains("KO_vs_WT_at_Late"));
    assert!(phospho_out.contains("\tKO_vs_WT\t"));
    assert_eq!(report.datasets[0].annotation.nulled, 1);

    let protein_src = fs::read(cfg.protein.annotation_path(&cfg.src_dir)).unwrap();
    let protein_out = fs::read(cfg.protein.annotation_path(&cfg.out_dir)).unwrap();
    assert_eq!(protein_src, protein_out);
}

#[test]
fn rerun_replaces_previous_output() {
    let (_dir, cfg) = fixture("out");
    run_subset(&cfg).unwrap();
    let stale = cfg.out_dir.join("stale.txt");
    fs::write(&stale, "old").unwrap();

    run_subset(&cfg).unwrap();
    assert!(!stale.exists());
    assert!(cfg.phospho.workbook_path(&cfg.out_dir).is_file());
}

#[test]
fn empty_contrast_list_yields_empty_but_well_formed_output() {
    let (_dir, mut cfg) = fixture("out");
    cfg.keep_contrasts.clear();
    let report = run_subset(&cfg).unwrap();
    assert!(report.sites.sites.is_empty());
    assert!(report.proteins.proteins.is_empty());

    let out = read_workbook(&cfg.phospho.workbook_path(&cfg.out_dir)).unwrap();
    assert!(out.require(WIDE_SHEET).unwrap().is_empty());
    let summary = out.require(SUMMARY_SHEET).unwrap();
    assert_eq!(summary.rows[0][0].as_key(), Some("0".to_string()));
    assert_eq!(report.datasets[0].columnar.after, 0);

    // Group/Control annotation is untouched even with nothing kept.
    let protein_src = fs::read(cfg.protein.annotation_path(&cfg.src_dir)).unwrap();
    let protein_out = fs::read(cfg.protein.annotation_path(&cfg.out_dir)).unwrap();
    assert_eq!(protein_src, protein_out);
}
