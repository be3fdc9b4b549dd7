//! Purpose: CDX capture-index lookup behind one `load(query)` contract.
//! Exports: `api` (sources, query, lines, config, errors) and `core` (range search, text files).
//! Role: Library backing the `cdx-source` binary and embedding replay/search services.
//! Invariants: Record lines are opaque text; nothing here parses CDX fields.
//! Invariants: Every source is synchronous and holds no per-query state.
pub mod api;
pub mod core;
