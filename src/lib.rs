//! Avro schema, protocol and IDL compiler targeting Java.
//!
//! Stages, each depending only on those before it:
//!
//! 1. [`input`]: read and classify input files by notation.
//! 2. [`idl`]: normalize IDL files into canonical protocol documents.
//! 3. [`parse`] + [`resolve`]: build one type graph across all documents.
//! 4. [`codegen`]: emit Java sources from the graph and a [`config::GenerationConfig`].
//! 5. [`gate`]: skip the whole run when nothing it depends on changed.
//!
//! [`pipeline::compile`] runs them in order.
pub mod canonical;
pub mod codegen;
pub mod config;
pub mod error;
pub mod gate;
pub mod idl;
pub mod input;
pub mod ir;
pub mod parse;
pub mod path_de;
pub mod pipeline;
pub mod resolve;

pub use error::{CompileError, ErrorKind, Result};
pub use pipeline::{compile, Compilation, CompileRequest, Status};
