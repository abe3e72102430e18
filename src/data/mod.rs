/// Data layer: core types, loading, schema resolution, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  detect variant → SchemaMapping (role → column)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterState → Predicate (AND of clauses)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐     ┌──────────┐     ┌──────────┐
///   │ aggregate  │     │ ranking   │ ──▶ │  export   │
///   └───────────┘     └──────────┘     └──────────┘
///   KPIs, groups,     top-N, full       CSV writer
///   bins, r           extract
/// ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod ranking;
pub mod schema;
