//! Wayland protocol scanner: read a protocol XML document and emit Go bindings
//! for either side of the connection.
//!
//! The pipeline runs strictly forward:
//!
//! 1. [`reader`] decodes the XML into the [`model`].
//! 2. [`symbols`] registers every interface under its Go type name.
//! 3. [`binding`] builds, per interface, the role-specific methods, event
//!    dispatch and constants, using [`wire`] to type each argument.
//! 4. [`emit`] renders the bindings as Go source.
//!
//! [`Scanner`] wires these together behind a reusable builder.
//!
//! # Generating bindings
//!
//! ```no_run
//! use wl_scanner::{Role, Scanner};
//!
//! let output = Scanner::new()
//!     .role(Role::Client)
//!     .generate("protocols/wayland.xml")?;
//! for warning in &output.warnings {
//!     eprintln!("{warning:?}");
//! }
//! std::fs::write("wl/client.go", output.code)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Error handling
//!
//! All fallible [`Scanner`] methods return [`miette::Result`]. The underlying
//! [`ScanError`] can be recovered with `downcast_ref` to inspect its
//! [`ErrorKind`]. No output is produced by a failed run.

pub mod binding;
pub mod emit;
pub mod error;
pub mod model;
pub mod naming;
pub mod reader;
pub mod symbols;
pub mod wire;

pub(crate) mod compiler;
pub(crate) mod suggest;

pub use binding::Role;
pub use compiler::{DEFAULT_BASE_IMPORT, ScanOutput, Scanner};
pub use error::{ErrorKind, ScanError, Warning};
