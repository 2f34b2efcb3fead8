//! Synthetic source trees shaped like real paired phospho/protein DEA output.
//!
//! Used by the `generate_sample` binary and by the integration tests.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{DatasetLayout, SubsetConfig};
use crate::data::filter::{Summary, CONTRASTS_SHEET, LONG_SHEET, SUMMARY_SHEET, WIDE_SHEET};
use crate::data::model::{CellValue, DatasetKind, Table, Workbook, PROTEIN_ID};
use crate::data::workbook::write_workbook;
use crate::error::Result;

/// Shape of the generated data.
#[derive(Debug, Clone)]
pub struct SyntheticParams {
    pub seed: u64,
    pub n_sites: usize,
    pub n_proteins: usize,
    /// Contrasts present in the data; the config's kept contrasts should be
    /// a subset of these.
    pub contrasts: Vec<String>,
    pub n_samples: usize,
    /// Share of sites measured in only some contrasts.
    pub partial_rate: f64,
    /// Share of sites flagged decoy, contaminant or with a short window.
    pub invalid_rate: f64,
    /// Share of proteins that also appear in the protein dataset.
    pub protein_coverage: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            seed: 7,
            n_sites: 200,
            n_proteins: 60,
            contrasts: vec![
                "KO_vs_WT".to_string(),
                "KO_vs_WT_at_Early".to_string(),
                "KO_vs_WT_at_Late".to_string(),
            ],
            n_samples: 6,
            partial_rate: 0.25,
            invalid_rate: 0.1,
            protein_coverage: 0.8,
        }
    }
}

/// One generated entity (site or protein).
struct Entity {
    key: String,
    protein: String,
    mod_aa: &'static str,
    window: String,
    rev: bool,
    con: bool,
    /// Contrasts with a non-null FDR.
    present: Vec<bool>,
}

/// Write a complete source tree under `cfg.src_dir` following `cfg`'s layout.
///
/// The phospho annotation table uses the `ContrastName`/`Contrast` layout
/// and the protein one the `Group`/`Control` layout.
pub fn write_source_tree(cfg: &SubsetConfig, params: &SyntheticParams) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let n_contrasts = params.contrasts.len();

    let proteins: Vec<String> = (0..params.n_proteins.max(1))
        .map(|i| format!("sp|Q{i:05}|PROT{i}_HUMAN"))
        .collect();

    let mut sites = Vec::with_capacity(params.n_sites);
    for i in 0..params.n_sites {
        let protein = proteins[i % proteins.len()].clone();
        let mod_aa = match rng.gen_range(0..10) {
            0..=6 => "S",
            7..=8 => "T",
            _ => "Y",
        };
        let pos = 10 + i;
        let mut window = random_window(&mut rng, 15);
        let (mut rev, mut con) = (false, false);
        if rng.gen_bool(params.invalid_rate.clamp(0.0, 1.0)) {
            match i % 3 {
                0 => rev = true,
                1 => con = true,
                _ => window.truncate(5),
            }
        }
        let present = coverage(&mut rng, n_contrasts, params.partial_rate);
        sites.push(Entity {
            key: format!("{protein}~{mod_aa}{pos}"),
            protein,
            mod_aa,
            window,
            rev,
            con,
            present,
        });
    }

    let protein_entities: Vec<Entity> = proteins
        .iter()
        .enumerate()
        .filter(|_| rng.gen_bool(params.protein_coverage.clamp(0.0, 1.0)))
        .map(|(i, p)| Entity {
            key: p.clone(),
            protein: p.clone(),
            mod_aa: "",
            window: String::new(),
            rev: false,
            con: i % 17 == 16,
            present: vec![true; n_contrasts],
        })
        .collect();

    let samples: Vec<String> = (0..params.n_samples).map(|i| format!("sample_{i}")).collect();

    for (kind, entities) in [
        (DatasetKind::Phospho, &sites),
        (DatasetKind::Protein, &protein_entities),
    ] {
        let layout = cfg.layout(kind);
        let root = &cfg.src_dir;
        fs::create_dir_all(layout.results_dir(root))?;
        fs::create_dir_all(layout.inputs_dir(root))?;

        let wb = build_workbook(kind, entities, &params.contrasts, &samples, &mut rng);
        write_workbook(&wb, &layout.workbook_path(root))?;
        write_columnar(kind, entities, &samples, &layout.columnar_path(root), &mut rng)?;
        if let Some(meta) = layout.metadata_path(root) {
            fs::write(meta, metadata_yaml(kind, layout))?;
        }
        let annotation = match kind {
            DatasetKind::Phospho => explicit_annotation(&params.contrasts, &samples),
            DatasetKind::Protein => group_control_annotation(&samples),
        };
        fs::write(layout.annotation_path(root), annotation)?;
    }
    Ok(())
}

fn random_window<R: Rng>(rng: &mut R, len: usize) -> String {
    const AA: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";
    (0..len)
        .map(|_| AA[rng.gen_range(0..AA.len())] as char)
        .collect()
}

/// Which contrasts a site is measured in. A small share of sites has no
/// measurement at all.
fn coverage<R: Rng>(rng: &mut R, n: usize, partial_rate: f64) -> Vec<bool> {
    if n > 1 && rng.gen_bool(partial_rate.clamp(0.0, 1.0)) {
        let missing = rng.gen_range(0..n);
        let mut present = vec![true; n];
        present[missing] = false;
        if n > 2 && rng.gen_bool(0.3) {
            present[(missing + 1) % n] = false;
        }
        present
    } else if rng.gen_bool(0.03) {
        vec![false; n]
    } else {
        vec![true; n]
    }
}

fn build_workbook<R: Rng>(
    kind: DatasetKind,
    entities: &[Entity],
    contrasts: &[String],
    samples: &[String],
    rng: &mut R,
) -> Workbook {
    let key = kind.key_column();

    let annotation = Table::new(
        "annotation",
        vec!["raw.file".into(), "Name".into(), "Group".into()],
        samples
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let group = if i % 2 == 0 { "KO" } else { "WT" };
                vec![s(&format!("{n}.raw")), s(n), s(group)]
            })
            .collect(),
    );

    let contrasts_sheet = Table::new(
        CONTRASTS_SHEET,
        vec!["contrast_name".into(), "contrast".into()],
        contrasts
            .iter()
            .map(|c| vec![s(c), s(&format!("G_{c} - G_ref"))])
            .collect(),
    );

    let mut long_rows = Vec::new();
    for e in entities {
        for (ci, c) in contrasts.iter().enumerate() {
            let fdr = if e.present[ci] {
                CellValue::Float(rng.gen_range(0.0..1.0))
            } else {
                CellValue::Null
            };
            let mut row = vec![s(&e.key)];
            if kind == DatasetKind::Phospho {
                row.push(s(&e.protein));
            }
            row.extend([s(c), CellValue::Float(rng.gen_range(-3.0..3.0)), fdr]);
            long_rows.push(row);
        }
    }
    let mut long_header = vec![key.to_string()];
    if kind == DatasetKind::Phospho {
        long_header.push(PROTEIN_ID.into());
    }
    long_header.extend(["contrast", "diff", "FDR"].map(String::from));
    let long = Table::new(LONG_SHEET, long_header, long_rows);

    let mut wide_header = vec![key.to_string()];
    if kind == DatasetKind::Phospho {
        wide_header.extend([PROTEIN_ID, "modAA", "SequenceWindow"].map(String::from));
    }
    wide_header.extend(["REV", "CON"].map(String::from));
    wide_header.extend(contrasts.iter().map(|c| format!("FDR.{c}")));
    let wide_rows = entities
        .iter()
        .map(|e| {
            let mut row = vec![s(&e.key)];
            if kind == DatasetKind::Phospho {
                row.extend([s(&e.protein), s(e.mod_aa), s(&e.window)]);
            }
            // Flags use both encodings seen in real exports.
            row.push(if e.rev { s("TRUE") } else { CellValue::Bool(false) });
            row.push(CellValue::Bool(e.con));
            row.extend(e.present.iter().map(|p| {
                if *p {
                    CellValue::Float(rng.gen_range(0.0..1.0))
                } else {
                    CellValue::Null
                }
            }));
            row
        })
        .collect();
    let wide = Table::new(WIDE_SHEET, wide_header, wide_rows);

    let mut abundance_header = vec![key.to_string()];
    abundance_header.extend(samples.iter().cloned());
    let abundances = Table::new(
        "normalized_abundances",
        abundance_header,
        entities
            .iter()
            .map(|e| {
                let mut row = vec![s(&e.key)];
                row.extend(samples.iter().map(|_| CellValue::Float(rng.gen_range(10.0..30.0))));
                row
            })
            .collect(),
    );

    let formula = Table::new(
        "formula",
        vec!["formula".into()],
        vec![vec![s("~ Group")]],
    );
    // Deliberately stale; the filter must recompute it.
    let summary = Table::new(
        SUMMARY_SHEET,
        Summary::HEADER.map(String::from).to_vec(),
        vec![vec![
            CellValue::Integer(123_456),
            CellValue::Float(1.5),
            CellValue::Float(0.5),
            CellValue::Integer(120_000),
        ]],
    );
    let notes = Table::new(
        "notes",
        vec!["note".into()],
        vec![vec![s("generated")]],
    );

    Workbook {
        sheets: vec![
            annotation,
            contrasts_sheet,
            long,
            wide,
            abundances,
            formula,
            summary,
            notes,
        ],
    }
}

fn s(v: &str) -> CellValue {
    CellValue::String(v.to_string())
}

fn write_columnar<R: Rng>(
    kind: DatasetKind,
    entities: &[Entity],
    samples: &[String],
    path: &Path,
    rng: &mut R,
) -> Result<()> {
    let mut keys = Vec::new();
    let mut sample_col = Vec::new();
    let mut values = Vec::new();
    for e in entities {
        for sample in samples {
            keys.push(e.key.clone());
            sample_col.push(sample.clone());
            values.push(rng.gen_range(10.0..30.0));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new(kind.key_column(), DataType::Utf8, false),
        Field::new("sampleName", DataType::Utf8, false),
        Field::new("abundance", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(keys)),
            Arc::new(StringArray::from(sample_col)),
            Arc::new(Float64Array::from(values)),
        ],
    )?;
    let file = fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn metadata_yaml(kind: DatasetKind, layout: &DatasetLayout) -> String {
    format!(
        "config:\n  table:\n    hierarchy:\n      {}: ~\n  source: {}\n",
        kind.key_column(),
        layout.workbook
    )
}

fn explicit_annotation(contrasts: &[String], samples: &[String]) -> String {
    let mut out = String::from("raw.file\tName\tGroup\tContrastName\tContrast\n");
    for (i, sample) in samples.iter().enumerate() {
        let (name, contrast) = match contrasts.get(i) {
            Some(c) => (c.clone(), format!("G_{c} - G_ref")),
            None => (String::new(), String::new()),
        };
        let group = if i % 2 == 0 { "KO" } else { "WT" };
        out.push_str(&format!("{sample}.raw\t{sample}\t{group}\t{name}\t{contrast}\n"));
    }
    out
}

fn group_control_annotation(samples: &[String]) -> String {
    let mut out = String::from("raw.file\tName\tGroup\tControl\n");
    for (i, sample) in samples.iter().enumerate() {
        let (group, control) = if i % 2 == 0 { ("KO", "T") } else { ("WT", "C") };
        out.push_str(&format!("{sample}.raw\t{sample}\t{group}\t{control}\n"));
    }
    out
}

/// Protein ids present in a generated protein dataset.
pub fn protein_ids(cfg: &SubsetConfig) -> Result<BTreeSet<String>> {
    let layout = cfg.layout(DatasetKind::Protein);
    crate::data::columnar::distinct_keys(&layout.columnar_path(&cfg.src_dir), PROTEIN_ID)
}
