// ==============================================================================
// Symbol Registry: Wire Interface Names to Target Identifiers
// ==============================================================================
//
// Arguments may reference interfaces declared anywhere in the document, before
// or after the interface that uses them. The registry is therefore filled in a
// dedicated registration pass over every interface, and only then are
// arguments resolved against it. A reference that does not resolve is fatal.
//
// Names are keyed by their canonical form (unstable suffix removed), so
// `xdg_surface_v6` and `xdg_surface` share one entry when the suffix token is
// `v6`.

use indexmap::{IndexMap, IndexSet};

use crate::error::{ErrorKind, ScanError};
use crate::model::Protocol;
use crate::naming::{NameRules, camel_case};
use crate::suggest::{levenshtein, max_edit_distance};

/// Package name of the base protocol bindings.
pub const BASE_PACKAGE: &str = "wl";

/// Prefix of every interface in the base protocol.
pub const BASE_PREFIX: &str = "wl_";

/// Interfaces of the core protocol that extension protocols may reference
/// without declaring them.
pub const INHERITED_INTERFACES: &[&str] = &[
    "wl_display",
    "wl_registry",
    "wl_callback",
    "wl_compositor",
    "wl_shm_pool",
    "wl_shm",
    "wl_buffer",
    "wl_data_offer",
    "wl_data_source",
    "wl_data_device",
    "wl_data_device_manager",
    "wl_shell",
    "wl_shell_surface",
    "wl_surface",
    "wl_seat",
    "wl_pointer",
    "wl_keyboard",
    "wl_touch",
    "wl_output",
    "wl_region",
    "wl_subcompositor",
    "wl_subsurface",
];

/// A resolved target identifier, optionally living in another package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Package that defines the identifier, `None` for the package being
    /// generated.
    pub package: Option<String>,
    pub ident: String,
}

impl Symbol {
    /// `wl.` for a symbol from the base package, empty for local symbols.
    pub fn qualifier(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{pkg}."),
            None => String::new(),
        }
    }

    /// The identifier as written from inside the generated package.
    pub fn qualified(&self) -> String {
        format!("{}{}", self.qualifier(), self.ident)
    }
}

/// How an argument's `enum` attribute resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumLookup {
    /// Declared in this document.
    Declared,
    /// Belongs to an inherited base-protocol interface, which this document
    /// cannot see.
    Inherited,
    Unknown,
}

/// Registry of interface symbols for one generation run.
pub struct SymbolTable {
    rules: NameRules,
    /// Symbols indexed by canonical wire name, in registration order.
    symbols: IndexMap<String, Symbol>,
    /// Canonical names registered from the inherited allow-list.
    inherited: IndexSet<String>,
    /// `interface.enum` keys for every enum declared in the document.
    enums: IndexSet<String>,
}

impl SymbolTable {
    pub fn new(rules: NameRules) -> Self {
        SymbolTable {
            rules,
            symbols: IndexMap::new(),
            inherited: IndexSet::new(),
            enums: IndexSet::new(),
        }
    }

    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    /// Register a document interface and return its symbol.
    ///
    /// Registration is idempotent: the identifier is a pure function of the
    /// wire name and the rules. A document interface replaces an inherited
    /// entry of the same name.
    pub fn register(&mut self, wire_name: &str) -> &Symbol {
        let key = self.rules.canonical(wire_name).to_string();
        let symbol = Symbol {
            package: None,
            ident: self.rules.ident(wire_name),
        };
        self.inherited.shift_remove(&key);
        let (index, _) = self.symbols.insert_full(key, symbol);
        &self.symbols[index]
    }

    /// Register the base-protocol allow-list, qualified with `base_package`.
    /// Names already registered by the document are left alone.
    pub fn register_inherited(&mut self, base_package: &str) {
        for &wire_name in INHERITED_INTERFACES {
            if self.symbols.contains_key(wire_name) {
                continue;
            }
            let ident = camel_case(wire_name.strip_prefix(BASE_PREFIX).unwrap_or(wire_name));
            self.symbols.insert(
                wire_name.to_string(),
                Symbol {
                    package: Some(base_package.to_string()),
                    ident,
                },
            );
            self.inherited.insert(wire_name.to_string());
        }
    }

    /// Record an enum declared by `interface`.
    pub fn register_enum(&mut self, interface: &str, enum_name: &str) {
        let key = format!("{}.{enum_name}", self.rules.canonical(interface));
        self.enums.insert(key);
    }

    /// Look up a registered interface.
    pub fn lookup(&self, wire_name: &str) -> Option<&Symbol> {
        self.symbols.get(self.rules.canonical(wire_name))
    }

    /// Look up a registered interface, failing with `UnresolvedSymbol`.
    pub fn resolve(&self, wire_name: &str) -> Result<&Symbol, ScanError> {
        self.lookup(wire_name).ok_or_else(|| {
            ScanError::new(
                ErrorKind::UnresolvedSymbol,
                format!("unresolved interface `{wire_name}`"),
            )
            .with_help(self.suggest(wire_name))
        })
    }

    /// Resolve an argument's `enum` attribute as seen from `owner`.
    pub fn lookup_enum(&self, owner: &str, enum_ref: &str) -> EnumLookup {
        let (interface, name) = match enum_ref.split_once('.') {
            Some((interface, name)) => (self.rules.canonical(interface), name),
            None => (self.rules.canonical(owner), enum_ref),
        };
        if self.enums.contains(&format!("{interface}.{name}")) {
            EnumLookup::Declared
        } else if self.inherited.contains(interface) {
            EnumLookup::Inherited
        } else {
            EnumLookup::Unknown
        }
    }

    /// All registered canonical wire names, in registration order.
    pub fn wire_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Suggest a registered name close to an unresolved one.
    pub fn suggest(&self, wire_name: &str) -> Option<String> {
        let wanted = self.rules.canonical(wire_name);
        let mut best: Option<(&str, usize)> = None;
        for known in self.wire_names() {
            let dist = levenshtein(wanted, known);
            if dist > max_edit_distance(wanted.len().min(known.len())) {
                continue;
            }
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((known, dist));
            }
        }
        best.map(|(name, _)| format!("did you mean `{name}`?"))
    }
}

/// Registration pass: build the symbol table for a whole document before any
/// argument is resolved.
///
/// When the generated package is not the base package, the inherited
/// allow-list is registered first, qualified with the base package name, so
/// extension protocols can reference core interfaces.
pub fn register_protocol(protocol: &Protocol, rules: NameRules, package: &str) -> SymbolTable {
    let mut table = SymbolTable::new(rules);
    table.symbols.reserve(protocol.interfaces.len());
    if package != BASE_PACKAGE {
        table.register_inherited(BASE_PACKAGE);
    }
    for interface in &protocol.interfaces {
        table.register(&interface.name);
        for e in &interface.enums {
            table.register_enum(&interface.name, &e.name);
        }
    }
    table
}
