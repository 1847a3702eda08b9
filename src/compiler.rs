// ==============================================================================
// Library API: The `Scanner` Builder
// ==============================================================================
//
// `Scanner` follows the non-consuming `&mut self` builder pattern, so one
// configured scanner can generate many files. Every generation run builds its
// own symbol table and bindings from scratch; only configuration and the
// warnings of the most recent run live on the builder.
//
// A run has two phases. Registration walks every interface of the document
// into the symbol table. Only then are bindings built and emitted, since an
// argument may reference an interface declared further down. Output is
// rendered into a `String` that is handed out only when the whole run
// succeeded.

use std::fs;
use std::path::Path;

use miette::Context;

use crate::binding::{Binding, Role, build_binding};
use crate::emit::{Emitter, FileHeader, GoEmitter};
use crate::error::{ScanError, Warning};
use crate::model::Protocol;
use crate::naming::NameRules;
use crate::reader::parse_protocol;
use crate::symbols::{BASE_PACKAGE, BASE_PREFIX, register_protocol};

/// Import path of the base runtime package used by extension protocols.
pub const DEFAULT_BASE_IMPORT: &str = "github.com/malcolmstill/wl";

/// Builder for generating Go bindings from a Wayland protocol document.
///
/// # Examples
///
/// ```no_run
/// use wl_scanner::{Role, Scanner};
///
/// let output = Scanner::new()
///     .role(Role::Server)
///     .package("xdg")
///     .generate("protocols/xdg-shell.xml")?;
/// std::fs::write("xdg/server.go", output.code)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Scanner {
    role: Role,
    package: String,
    unstable: String,
    strip_prefix: Option<String>,
    base_import: String,
    /// Warnings of the most recent run, kept even when it failed.
    accumulated_warnings: Vec<miette::Report>,
}

/// Result of a successful generation run.
pub struct ScanOutput {
    /// The complete Go source file.
    pub code: String,
    /// Non-fatal findings, each a [`miette::Report`] with `Severity::Warning`.
    pub warnings: Vec<miette::Report>,
}

impl std::fmt::Debug for ScanOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOutput")
            .field("code", &format_args!("[{} bytes]", self.code.len()))
            .field(
                "warnings",
                &format_args!("[{} warnings]", self.warnings.len()),
            )
            .finish()
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Client role, package `wl`, no unstable suffix.
    pub fn new() -> Self {
        Scanner {
            role: Role::Client,
            package: BASE_PACKAGE.to_string(),
            unstable: String::new(),
            strip_prefix: None,
            base_import: DEFAULT_BASE_IMPORT.to_string(),
            accumulated_warnings: Vec::new(),
        }
    }

    pub fn role(&mut self, role: Role) -> &mut Self {
        self.role = role;
        self
    }

    /// Go package name of the generated file. Anything other than `wl` is an
    /// extension package that imports the base runtime.
    pub fn package(&mut self, package: impl Into<String>) -> &mut Self {
        self.package = package.into();
        self
    }

    /// Unstable version token (`v6` strips `_v6` from interface names). An
    /// empty token disables stripping.
    pub fn unstable_suffix(&mut self, token: impl Into<String>) -> &mut Self {
        self.unstable = token.into();
        self
    }

    /// Override the interface-name prefix stripped before deriving type
    /// names. Defaults to `wl_` for the base package and `<package>_`
    /// otherwise.
    pub fn strip_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.strip_prefix = Some(prefix.into());
        self
    }

    /// Import path of the base runtime package.
    pub fn base_import(&mut self, path: impl Into<String>) -> &mut Self {
        self.base_import = path.into();
        self
    }

    /// Drain warnings from the most recent `generate*` call. After a failed
    /// call this is the only way to get at them.
    pub fn drain_warnings(&mut self) -> Vec<miette::Report> {
        std::mem::take(&mut self.accumulated_warnings)
    }

    /// Generate bindings for a protocol file. The path as given is recorded
    /// in the header.
    pub fn generate(&mut self, path: impl AsRef<Path>) -> miette::Result<ScanOutput> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|e| miette::miette!("{e}"))
            .with_context(|| format!("read {}", path.display()))?;
        self.generate_str_named(&source, &path.display().to_string())
    }

    /// Generate bindings for XML text, named `<input>` in diagnostics.
    pub fn generate_str(&mut self, xml: &str) -> miette::Result<ScanOutput> {
        self.generate_str_named(xml, "<input>")
    }

    /// Generate bindings for XML text with a custom source name.
    pub fn generate_str_named(&mut self, xml: &str, name: &str) -> miette::Result<ScanOutput> {
        self.accumulated_warnings.clear();
        let protocol = parse_protocol(xml).map_err(|e| e.with_source(name, xml))?;
        Ok(self
            .generate_impl(&protocol, name)
            .map_err(|e| e.with_source(name, xml))?)
    }

    /// Generate bindings for an already decoded protocol. Errors carry no
    /// source text.
    pub fn generate_protocol(
        &mut self,
        protocol: &Protocol,
        source_name: &str,
    ) -> miette::Result<ScanOutput> {
        Ok(self.generate_impl(protocol, source_name)?)
    }

    fn name_rules(&self) -> NameRules {
        let prefix = match &self.strip_prefix {
            Some(prefix) => prefix.clone(),
            None if self.package == BASE_PACKAGE => BASE_PREFIX.to_string(),
            None => format!("{}_", self.package),
        };
        NameRules::new(prefix, &self.unstable)
    }

    fn generate_impl(
        &mut self,
        protocol: &Protocol,
        source_name: &str,
    ) -> Result<ScanOutput, ScanError> {
        self.accumulated_warnings.clear();
        if self.package.is_empty() {
            return Err(ScanError::template("the package name must not be empty"));
        }

        let symbols = register_protocol(protocol, self.name_rules(), &self.package);
        let runtime = if self.package == BASE_PACKAGE {
            String::new()
        } else {
            format!("{BASE_PACKAGE}.")
        };

        let mut warnings: Vec<Warning> = Vec::new();
        let mut bindings: Vec<Binding> = Vec::with_capacity(protocol.interfaces.len());
        for interface in &protocol.interfaces {
            match build_binding(interface, self.role, &symbols, &runtime, &mut warnings) {
                Ok(binding) => bindings.push(binding),
                Err(e) => {
                    self.accumulated_warnings = into_reports(warnings);
                    return Err(e);
                }
            }
        }

        let header = FileHeader {
            package: &self.package,
            role: self.role,
            protocol: &protocol.name,
            source: source_name,
            needs_sync: bindings.iter().any(Binding::has_inbound),
            base_import: (self.package != BASE_PACKAGE).then_some(self.base_import.as_str()),
        };
        let code = match render(&GoEmitter, &header, &bindings) {
            Ok(code) => code,
            Err(e) => {
                self.accumulated_warnings = into_reports(warnings);
                return Err(e);
            }
        };

        Ok(ScanOutput {
            code,
            warnings: into_reports(warnings),
        })
    }
}

fn into_reports(warnings: Vec<Warning>) -> Vec<miette::Report> {
    warnings.into_iter().map(miette::Report::new).collect()
}

/// Render a whole file into a fresh buffer.
fn render<E: Emitter>(
    emitter: &E,
    header: &FileHeader<'_>,
    bindings: &[Binding],
) -> Result<String, ScanError> {
    let mut out = String::new();
    emitter.emit_header(&mut out, header)?;
    for binding in bindings {
        emitter.emit_binding(&mut out, binding)?;
    }
    Ok(out)
}

// ==============================================================================
// Unit Tests
// ==============================================================================
