// ==============================================================================
// Identifier Derivation
// ==============================================================================
//
// Wire names are lower snake case (`wl_shm_pool`, `set_fullscreen`). Target
// identifiers are built by capitalizing each underscore-separated segment and
// concatenating (`ShmPool`, `SetFullscreen`). Segments keep the rest of their
// characters untouched, so `flipped_90` becomes `Flipped90`.

/// Go keywords that cannot be used as parameter or local variable names.
const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Receiver and locals of generated method bodies.
const GENERATED_LOCALS: &[&str] = &["p", "ret", "event", "ev", "h"];

/// Capitalize the first character of `segment`.
fn title(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `set_fullscreen` -> `SetFullscreen`.
pub fn camel_case(name: &str) -> String {
    name.split('_').map(title).collect()
}

/// `set_fullscreen` -> `setFullscreen`. Used for unexported field names.
pub fn lower_camel_case(name: &str) -> String {
    let mut segments = name.split('_');
    let mut out = segments.next().unwrap_or_default().to_string();
    for segment in segments {
        out.push_str(&title(segment));
    }
    out
}

/// Turn a wire argument name into a usable Go parameter name.
///
/// `interface` is a Go keyword and also the name the generic bind pattern
/// uses for its interface-name string, so it becomes `iface`. Every other
/// keyword, and every name a generated body already uses for its receiver or
/// a local, gets a trailing underscore.
pub fn go_param_name(name: &str) -> String {
    if name == "interface" {
        return "iface".to_string();
    }
    if GO_KEYWORDS.contains(&name) || GENERATED_LOCALS.contains(&name) {
        return format!("{name}_");
    }
    name.to_string()
}

/// Rules for turning a wire interface name into a target identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRules {
    /// Package-local prefix stripped before derivation (e.g. `wl_`).
    pub prefix: String,
    /// Unstable suffix stripped before derivation, including its leading
    /// underscore (e.g. `_v6`). Empty means no stripping.
    pub unstable_suffix: String,
}

impl NameRules {
    /// Build rules from a prefix and a bare suffix token (`v6`, not `_v6`).
    pub fn new(prefix: impl Into<String>, unstable_token: &str) -> Self {
        let unstable_suffix = if unstable_token.is_empty() {
            String::new()
        } else {
            format!("_{unstable_token}")
        };
        NameRules {
            prefix: prefix.into(),
            unstable_suffix,
        }
    }

    /// Remove the unstable suffix from a wire name, if configured and present.
    /// This is the key under which the name is registered and resolved.
    pub fn canonical<'a>(&self, wire_name: &'a str) -> &'a str {
        if self.unstable_suffix.is_empty() {
            return wire_name;
        }
        wire_name
            .strip_suffix(self.unstable_suffix.as_str())
            .unwrap_or(wire_name)
    }

    /// Derive the target identifier: strip suffix, strip prefix, camel case.
    pub fn ident(&self, wire_name: &str) -> String {
        let name = self.canonical(wire_name);
        let name = name.strip_prefix(self.prefix.as_str()).unwrap_or(name);
        camel_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_capitalizes_each_segment() {
        assert_eq!(camel_case("shm_pool"), "ShmPool");
        assert_eq!(camel_case("set_fullscreen"), "SetFullscreen");
        assert_eq!(camel_case("flipped_90"), "Flipped90");
        assert_eq!(camel_case("90"), "90");
    }

    #[test]
    fn lower_camel_case_keeps_first_segment() {
        assert_eq!(lower_camel_case("enter"), "enter");
        assert_eq!(
            lower_camel_case("preferred_buffer_scale"),
            "preferredBufferScale"
        );
    }

    #[test]
    fn keywords_are_renamed() {
        assert_eq!(go_param_name("interface"), "iface");
        assert_eq!(go_param_name("type"), "type_");
        assert_eq!(go_param_name("serial"), "serial");
    }

    #[test]
    fn generated_locals_are_renamed() {
        for name in ["p", "ret", "event", "ev", "h"] {
            assert_eq!(go_param_name(name), format!("{name}_"));
        }
        assert_eq!(go_param_name("events"), "events");
    }

    #[test]
    fn prefix_is_stripped() {
        let rules = NameRules::new("wl_", "");
        assert_eq!(rules.ident("wl_surface"), "Surface");
        assert_eq!(rules.ident("wl_shm_pool"), "ShmPool");
        // Names without the prefix are kept whole.
        assert_eq!(rules.ident("xdg_surface"), "XdgSurface");
    }

    #[test]
    fn unstable_suffix_is_stripped_before_prefix() {
        let rules = NameRules::new("zxdg_", "v6");
        assert_eq!(rules.canonical("zxdg_surface_v6"), "zxdg_surface");
        assert_eq!(rules.ident("zxdg_surface_v6"), rules.ident("zxdg_surface"));
        assert_eq!(rules.ident("zxdg_surface_v6"), "Surface");
    }

    #[test]
    fn suffix_must_match_a_whole_segment() {
        let rules = NameRules::new("xdg_", "v6");
        // `_v6` is stripped, a bare `v6` tail without the underscore is not.
        assert_eq!(rules.canonical("xdg_popupv6"), "xdg_popupv6");
        assert_eq!(rules.canonical("xdg_popup_v6"), "xdg_popup");
    }

    #[test]
    fn empty_token_disables_suffix_stripping() {
        let rules = NameRules::new("wl_", "");
        assert_eq!(rules.canonical("xdg_surface_v6"), "xdg_surface_v6");
    }
}
