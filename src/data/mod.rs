/// Data layer: core types, the three on-disk formats, and keep-set filtering.
///
/// Architecture:
/// ```text
///  .xlsx            .parquet            .tsv
///    │                 │                  │
///    ▼                 ▼                  ▼
///  ┌──────────┐   ┌──────────┐   ┌────────────┐
///  │ workbook  │   │ columnar  │   │ annotation  │
///  └──────────┘   └──────────┘   └────────────┘
///    │  Workbook { Table.. }
///    ▼
///  ┌──────────┐
///  │  filter   │  sheet roles → filtered Workbook + recomputed summary
///  └──────────┘
/// ```

pub mod annotation;
pub mod columnar;
pub mod filter;
pub mod model;
pub mod workbook;
