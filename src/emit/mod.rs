// ==============================================================================
// Emitter: Bindings to Source Text
// ==============================================================================
//
// The emitter serializes what the binding builder decided. It chooses no
// types, names, or opcodes of its own, so a new target language only needs a
// new `Emitter` implementation.

pub mod code_writer;
pub mod go;

pub use go::GoEmitter;

use crate::binding::{Binding, Role};
use crate::error::ScanError;

/// Facts about the whole generated file, rendered once before any binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader<'a> {
    pub package: &'a str,
    pub role: Role,
    pub protocol: &'a str,
    /// Name of the schema document, as shown to the reader of the output.
    pub source: &'a str,
    /// Whether any binding guards handler lists with a mutex.
    pub needs_sync: bool,
    /// Import path of the base runtime package, when it is not this package.
    pub base_import: Option<&'a str>,
}

pub trait Emitter {
    /// Append the file header to `out`.
    fn emit_header(&self, out: &mut String, header: &FileHeader<'_>) -> Result<(), ScanError>;

    /// Append every fragment of one interface to `out`.
    fn emit_binding(&self, out: &mut String, binding: &Binding) -> Result<(), ScanError>;
}
