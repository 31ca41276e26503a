/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .xls / .ods / .json / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse every sheet → Workbook
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  column descriptors → Capabilities
///   └──────────┘
///        │
///        ├────────────────────┐
///        ▼                    ▼
///   ┌──────────┐      ┌───────────────┐
///   │  filter   │      │ relationships │  five fixed slices
///   └──────────┘      └───────────────┘
///        │                    │
///        ▼                    ▼
///   ┌──────────────────────────────┐
///   │  analysis / text              │  counts, pivots, TF-IDF
///   └──────────────────────────────┘
/// ```

pub mod analysis;
pub mod filter;
pub mod loader;
pub mod model;
pub mod relationships;
pub mod schema;
pub mod text;
