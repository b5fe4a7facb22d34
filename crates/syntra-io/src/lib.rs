//! Input and output formats for the syntra toolchain.
//!
//! This crate contains the external data formats of the synthesis pipeline:
//! - [`xml`]: reader and writer for timed automata in the UPPAAL XML subset,
//! - [`mtl_parser`]: the textual MTL specification format,
//! - [`dot`]: Graphviz export for timed automata and search trees.
//!
//! Parsers are built with [pest](https://pest.rs/); parse errors are
//! reported through `anyhow` with context attached.

pub mod dot;
pub mod mtl_parser;
pub mod xml;

pub use dot::{search_tree_to_dot, ta_to_dot};
pub use mtl_parser::parse_mtl;
pub use xml::{ta_from_xml, ta_to_xml};
