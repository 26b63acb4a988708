//! `sdp-codegen`: the code-generation engine (spec §2, §4.5).
//!
//! Consumes a validated `sdp_core::Schema` and a target-language
//! selector and produces a `file_path -> source_text` map. One module
//! per target (`go`, `cpp`, `rust`, `swift`) plus a shared `naming`
//! helper and the `driver` that orchestrates loading, validating, and
//! writing files to disk (spec §6 "Generator driver interface").
//!
//! This crate has no runtime encode/decode of its own — per spec §2
//! ("no runtime library is linked"), the wire format is realized only
//! by the source text each target module emits.

pub mod cpp;
pub mod driver;
pub mod go;
pub mod naming;
pub mod rust;
pub mod swift;

pub use driver::{emit, generate, GenError, Target, UnknownTarget};
