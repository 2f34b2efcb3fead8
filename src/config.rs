use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::model::DatasetKind;
use crate::error::{Result, SubsetError};

/// Folder and file names of one dataset inside a source/output tree.
///
/// Paths are `<root>/<dea>/<results>/<workbook|columnar|metadata>` and
/// `<root>/<dea>/<inputs>/<annotation>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetLayout {
    /// DEA folder name.
    pub dea: String,
    pub results: String,
    pub inputs: String,
    pub workbook: String,
    pub annotation: String,
    #[serde(default = "default_columnar")]
    pub columnar: String,
    /// Auxiliary file copied verbatim; `null` disables the copy.
    #[serde(default = "default_metadata")]
    pub metadata: Option<String>,
}

fn default_columnar() -> String {
    "lfqdata_normalized.parquet".to_string()
}

fn default_metadata() -> Option<String> {
    Some("lfqdata.yaml".to_string())
}

impl DatasetLayout {
    pub fn results_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dea).join(&self.results)
    }

    pub fn inputs_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dea).join(&self.inputs)
    }

    pub fn workbook_path(&self, root: &Path) -> PathBuf {
        self.results_dir(root).join(&self.workbook)
    }

    pub fn columnar_path(&self, root: &Path) -> PathBuf {
        self.results_dir(root).join(&self.columnar)
    }

    pub fn metadata_path(&self, root: &Path) -> Option<PathBuf> {
        self.metadata.as_ref().map(|m| self.results_dir(root).join(m))
    }

    pub fn annotation_path(&self, root: &Path) -> PathBuf {
        self.inputs_dir(root).join(&self.annotation)
    }

    /// Every source file the pipeline reads for this dataset.
    pub fn required_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = vec![
            self.workbook_path(root),
            self.columnar_path(root),
            self.annotation_path(root),
        ];
        files.extend(self.metadata_path(root));
        files
    }
}

/// One subsetting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetConfig {
    pub seed: u64,
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
    pub phospho: DatasetLayout,
    pub protein: DatasetLayout,
    /// Contrasts retained in both datasets, in iteration order.
    pub keep_contrasts: Vec<String>,
    /// Target number of complete-coverage phosphosites.
    pub n_phospho: usize,
}

impl SubsetConfig {
    /// Load a JSON configuration. Relative `src_dir`/`out_dir` are resolved
    /// against the directory holding the file.
    pub fn from_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut cfg: SubsetConfig = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            cfg.src_dir = resolve(base, &cfg.src_dir);
            cfg.out_dir = resolve(base, &cfg.out_dir);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Kept contrasts must be distinct; a repeated name would make every
    /// site look partial.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for c in &self.keep_contrasts {
            if !seen.insert(c.as_str()) {
                return Err(SubsetError::DuplicateContrast(c.clone()));
            }
        }
        Ok(())
    }

    pub fn layout(&self, kind: DatasetKind) -> &DatasetLayout {
        match kind {
            DatasetKind::Phospho => &self.phospho,
            DatasetKind::Protein => &self.protein,
        }
    }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
