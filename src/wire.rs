// ==============================================================================
// Wire-Type Mapper
// ==============================================================================
//
// Six of the protocol's argument tags are plain values with a fixed target
// type and a fixed codec read. The table below is closed and total: a tag
// outside it is a fatal `UnknownWireType`.
//
// `object` and `new_id` arguments map to references to another interface's
// binding, resolved through the symbol table. How such an argument is read
// depends on the role (who owns new object identifiers) and on nullability.
// A `new_id` without a declared interface is the generic "bind by name and
// version" pattern and carries no static type at all.

use crate::binding::Role;
use crate::error::{ErrorKind, ScanError};
use crate::model::{Arg, ArgType};
use crate::symbols::{Symbol, SymbolTable};

/// Plain value types with a one-to-one codec operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    Uint,
    /// UTF-8 string.
    String,
    /// File descriptor, passed out of band.
    Fd,
    /// 24.8 fixed-point number, exposed as a float.
    Fixed,
    /// Variable-length array of 32-bit integers.
    Array,
}

/// Target type of a method parameter or an event payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Scalar(Scalar),
    /// Reference to the binding type of a resolved interface.
    Object(Symbol),
    /// Object of no statically known interface.
    AnyObject,
    /// A caller-supplied object identifier.
    ObjectId,
}

/// How an inbound argument is read off a decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOp {
    Scalar(Scalar),
    /// Downcast the decoded object; absence is a failure.
    RequiredObject(Symbol),
    /// Branch on the decoded object and downcast only when present.
    OptionalObject(Symbol),
    /// Instantiate the target with the identifier read off the wire.
    NewObject(Symbol),
    /// Keep the decoded object untyped.
    AnyObject,
}

/// How an outbound argument is marshaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An ordinary parameter sent as-is.
    Param(TargetType),
    /// A fresh object of a known interface, created by the call.
    NewObject(Symbol),
    /// A fresh object of a caller-chosen interface: the call takes the
    /// interface name, a version, and an untyped object instead.
    GenericNewId,
}

/// Where an argument sits, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct ArgSite<'a> {
    pub interface: &'a str,
    pub message: &'a str,
    pub arg: &'a Arg,
}

impl ArgSite<'_> {
    fn describe(&self) -> String {
        format!(
            "argument `{}` of `{}.{}`",
            self.arg.name, self.interface, self.message
        )
    }
}

/// The closed scalar table. Returns `None` for `object` and `new_id` (which
/// are not scalars) and for unknown tags.
pub fn scalar(ty: &ArgType) -> Option<Scalar> {
    match ty {
        ArgType::Int => Some(Scalar::Int),
        ArgType::Uint => Some(Scalar::Uint),
        ArgType::String => Some(Scalar::String),
        ArgType::Fd => Some(Scalar::Fd),
        ArgType::Fixed => Some(Scalar::Fixed),
        ArgType::Array => Some(Scalar::Array),
        ArgType::Object | ArgType::NewId | ArgType::Unknown(_) => None,
    }
}

fn unknown_wire_type(site: &ArgSite<'_>, tag: &str) -> ScanError {
    ScanError::new(
        ErrorKind::UnknownWireType,
        format!("{} has unknown wire type `{tag}`", site.describe()),
    )
    .with_span(site.arg.span)
    .with_label("unknown type tag")
    .with_help(Some(
        "expected one of: int, uint, fixed, string, object, new_id, array, fd".to_string(),
    ))
}

/// Resolve the interface an `object`/`new_id` argument refers to, if any.
fn referenced(site: &ArgSite<'_>, symbols: &SymbolTable) -> Result<Option<Symbol>, ScanError> {
    let Some(name) = site.arg.interface.as_deref() else {
        return Ok(None);
    };
    match symbols.resolve(name) {
        Ok(symbol) => Ok(Some(symbol.clone())),
        Err(e) => Err(ScanError {
            message: format!(
                "{} references unresolved interface `{name}`",
                site.describe()
            ),
            span: site.arg.span,
            label: Some("referenced here".to_string()),
            ..e
        }),
    }
}

/// Map an argument of an outbound (callable) message.
pub fn map_outbound(site: &ArgSite<'_>, symbols: &SymbolTable) -> Result<Outbound, ScanError> {
    if let Some(s) = scalar(&site.arg.ty) {
        return Ok(Outbound::Param(TargetType::Scalar(s)));
    }
    match &site.arg.ty {
        ArgType::Object => Ok(Outbound::Param(match referenced(site, symbols)? {
            Some(symbol) => TargetType::Object(symbol),
            None => TargetType::AnyObject,
        })),
        ArgType::NewId => Ok(match referenced(site, symbols)? {
            Some(symbol) => Outbound::NewObject(symbol),
            None => Outbound::GenericNewId,
        }),
        other => Err(unknown_wire_type(site, other.as_tag())),
    }
}

/// How an inbound argument lands in the event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A single payload field.
    Field(TargetType, DecodeOp),
    /// A fresh object of a sender-chosen interface: the payload carries the
    /// interface name, a version, and the untyped object, in wire order.
    GenericNewId,
}

/// Map an argument of an inbound (dispatched) message to its payload field
/// type and decode operation.
pub fn map_inbound(
    site: &ArgSite<'_>,
    role: Role,
    symbols: &SymbolTable,
) -> Result<Inbound, ScanError> {
    if let Some(s) = scalar(&site.arg.ty) {
        return Ok(Inbound::Field(TargetType::Scalar(s), DecodeOp::Scalar(s)));
    }
    let symbol = match &site.arg.ty {
        ArgType::Object | ArgType::NewId => referenced(site, symbols)?,
        other => return Err(unknown_wire_type(site, other.as_tag())),
    };
    let Some(symbol) = symbol else {
        return Ok(match site.arg.ty {
            ArgType::NewId => Inbound::GenericNewId,
            _ => Inbound::Field(TargetType::AnyObject, DecodeOp::AnyObject),
        });
    };
    let op = match (&site.arg.ty, role) {
        // The server owns nothing yet: the client picked the id.
        (ArgType::NewId, Role::Server) => DecodeOp::NewObject(symbol.clone()),
        // The client's runtime created the proxy while decoding.
        (ArgType::NewId, Role::Client) => DecodeOp::RequiredObject(symbol.clone()),
        _ if site.arg.allow_null => DecodeOp::OptionalObject(symbol.clone()),
        _ => DecodeOp::RequiredObject(symbol.clone()),
    };
    Ok(Inbound::Field(TargetType::Object(symbol), op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Interface, Protocol};
    use crate::naming::NameRules;
    use crate::symbols::register_protocol;

    fn symbols() -> SymbolTable {
        let protocol = Protocol {
            name: "wayland".to_string(),
            copyright: None,
            description: None,
            interfaces: vec![
                Interface::new("wl_surface", 6),
                Interface::new("wl_output", 4),
            ],
        };
        register_protocol(&protocol, NameRules::new("wl_", ""), "wl")
    }

    fn site(arg: &Arg) -> ArgSite<'_> {
        ArgSite {
            interface: "wl_surface",
            message: "enter",
            arg,
        }
    }

    #[test]
    fn scalar_table_is_total_over_value_tags() {
        let table = [
            (ArgType::Int, Scalar::Int),
            (ArgType::Uint, Scalar::Uint),
            (ArgType::String, Scalar::String),
            (ArgType::Fd, Scalar::Fd),
            (ArgType::Fixed, Scalar::Fixed),
            (ArgType::Array, Scalar::Array),
        ];
        for (tag, expected) in table {
            assert_eq!(scalar(&tag), Some(expected), "tag {}", tag.as_tag());
        }
        assert_eq!(scalar(&ArgType::Object), None);
        assert_eq!(scalar(&ArgType::NewId), None);
    }

    #[test]
    fn unknown_tag_is_fatal_in_both_directions() {
        let arg = Arg::new("x", ArgType::from_tag("double"));
        let err = map_outbound(&site(&arg), &symbols()).expect_err("unknown tag");
        assert_eq!(err.kind, ErrorKind::UnknownWireType);
        assert_eq!(
            err.message,
            "argument `x` of `wl_surface.enter` has unknown wire type `double`"
        );
        let err = map_inbound(&site(&arg), Role::Client, &symbols()).expect_err("unknown tag");
        assert_eq!(err.kind, ErrorKind::UnknownWireType);
    }

    #[test]
    fn nullable_object_decodes_optionally() {
        let table = symbols();
        let output = table.resolve("wl_output").expect("registered").clone();

        let required = Arg::new("output", ArgType::Object).with_interface("wl_output");
        let mapped = map_inbound(&site(&required), Role::Client, &table).expect("maps");
        assert_eq!(
            mapped,
            Inbound::Field(
                TargetType::Object(output.clone()),
                DecodeOp::RequiredObject(output.clone()),
            )
        );

        let optional = required.clone().nullable();
        let mapped = map_inbound(&site(&optional), Role::Client, &table).expect("maps");
        assert_eq!(
            mapped,
            Inbound::Field(
                TargetType::Object(output.clone()),
                DecodeOp::OptionalObject(output),
            )
        );
    }

    #[test]
    fn inbound_new_id_depends_on_role() {
        let table = symbols();
        let surface = table.resolve("wl_surface").expect("registered").clone();
        let arg = Arg::new("id", ArgType::NewId).with_interface("wl_surface");

        let ty = TargetType::Object(surface.clone());

        let mapped = map_inbound(&site(&arg), Role::Server, &table).expect("maps");
        assert_eq!(
            mapped,
            Inbound::Field(ty.clone(), DecodeOp::NewObject(surface.clone()))
        );
        let mapped = map_inbound(&site(&arg), Role::Client, &table).expect("maps");
        assert_eq!(
            mapped,
            Inbound::Field(ty, DecodeOp::RequiredObject(surface))
        );
    }

    #[test]
    fn generic_new_id_needs_no_symbol() {
        let arg = Arg::new("id", ArgType::NewId);
        let mapped = map_outbound(&site(&arg), &symbols()).expect("maps without a symbol");
        assert_eq!(mapped, Outbound::GenericNewId);
        let mapped = map_inbound(&site(&arg), Role::Server, &symbols()).expect("maps");
        assert_eq!(mapped, Inbound::GenericNewId);
    }

    #[test]
    fn untyped_object_stays_a_single_field() {
        let arg = Arg::new("target", ArgType::Object);
        let mapped = map_inbound(&site(&arg), Role::Client, &symbols()).expect("maps");
        assert_eq!(
            mapped,
            Inbound::Field(TargetType::AnyObject, DecodeOp::AnyObject)
        );
    }

    #[test]
    fn unresolved_reference_names_the_argument() {
        let arg = Arg::new("output", ArgType::Object).with_interface("wl_ouput");
        let err = map_outbound(&site(&arg), &symbols()).expect_err("unresolved");
        assert_eq!(err.kind, ErrorKind::UnresolvedSymbol);
        assert_eq!(
            err.message,
            "argument `output` of `wl_surface.enter` references unresolved interface `wl_ouput`"
        );
        assert_eq!(err.help.as_deref(), Some("did you mean `wl_output`?"));
    }

    #[test]
    fn enum_typed_args_stay_plain_integers() {
        let mut arg = Arg::new("transform", ArgType::Int);
        arg.enum_ = Some("wl_output.transform".to_string());
        let mapped = map_outbound(&site(&arg), &symbols()).expect("maps");
        assert_eq!(mapped, Outbound::Param(TargetType::Scalar(Scalar::Int)));
    }
}
