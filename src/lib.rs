//! Purpose: Library crate behind the `rowshape` CLI: reshape relational cursor rows.
//! Exports: `api` (row adapter, projections, cursors, encoders, errors).
//! Role: Turns a forward-only result cursor into value rows, row maps, or JSON records.
//! Invariants: `api` is the only public path; `core` stays internal.
//! Invariants: Nothing here opens connections or runs queries; cursors arrive ready.
pub mod api;
pub(crate) mod core;
mod delimited;
