//! End-to-end tests for the journal viewer live under `tests/`.
//!
//! They write journal exports to disk, open them through `jv-journal`,
//! drive `jv-view` directly and through its worker handle, and check what
//! `jv-cli` prints.
