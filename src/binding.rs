// ==============================================================================
// Binding Builder
// ==============================================================================
//
// Turns one schema interface into the role-specific structure the emitter
// serializes. The role decides which message list is outbound (callable
// methods) and which is inbound (dispatched to handlers), and who allocates
// identifiers for new objects. Both roles go through the same code path.
//
// Opcodes are declaration indices within the owning list. They are assigned
// here once and never recomputed downstream.

use std::fmt;
use std::str::FromStr;

use crate::error::{ScanError, Warning};
use crate::model::{Description, Interface, Message};
use crate::naming::{camel_case, go_param_name, lower_camel_case};
use crate::symbols::{EnumLookup, Symbol, SymbolTable};
use crate::wire::{self, ArgSite, DecodeOp, Inbound, Outbound, TargetType};

/// Which side of the connection the generated code implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Client,
    Server,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }

    /// Messages this role sends: requests for a client, events for a server.
    pub fn outbound(self, interface: &Interface) -> &[Message] {
        match self {
            Role::Client => &interface.requests,
            Role::Server => &interface.events,
        }
    }

    /// Messages this role receives and dispatches.
    pub fn inbound(self, interface: &Interface) -> &[Message] {
        match self {
            Role::Client => &interface.events,
            Role::Server => &interface.requests,
        }
    }

    fn constructor(self) -> Constructor {
        match self {
            Role::Client => Constructor::ContextAssigned,
            Role::Server => Constructor::ExplicitId,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "server" => Ok(Role::Server),
            other => Err(format!("unknown side `{other}`, expected `client` or `server`")),
        }
    }
}

/// How a new object of some interface gets its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constructor {
    /// The local context allocates the identifier on registration.
    ContextAssigned,
    /// The caller passes an identifier chosen by the peer.
    ExplicitId,
}

/// Everything the emitter needs to render one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub wire_name: String,
    pub ident: String,
    /// Qualifier for runtime types (`wl.` outside the base package).
    pub runtime: String,
    pub constructor: Constructor,
    pub requests: Vec<RequestBinding>,
    pub events: Vec<EventBinding>,
    pub enums: Vec<EnumBinding>,
}

impl Binding {
    pub fn has_inbound(&self) -> bool {
        !self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TargetType,
}

/// One argument handed to `SendRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendArg {
    /// A parameter, passed through by name.
    Param(String),
    /// The object the method just created.
    NewObject,
}

/// The object an outbound method creates and returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    pub symbol: Symbol,
    pub constructor: Constructor,
    /// Parameter carrying the caller-supplied identifier.
    pub id_param: String,
}

/// An outbound message, rendered as a callable method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBinding {
    pub method: String,
    pub opcode: usize,
    pub params: Vec<Param>,
    pub send_args: Vec<SendArg>,
    /// When set, the method returns the new object alongside the error.
    pub new_object: Option<NewObject>,
    pub summary: Option<String>,
    pub doc: Vec<String>,
    pub destructor: bool,
}

/// An inbound message, rendered as a payload type, a handler interface and a
/// dispatch case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub name: String,
    pub opcode: usize,
    pub payload: String,
    pub handler: String,
    pub handler_method: String,
    pub handlers_field: String,
    pub args: Vec<EventArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventArg {
    pub field: String,
    pub ty: TargetType,
    pub decode: DecodeOp,
    /// Local variable holding a nullable object before the downcast.
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumBinding {
    pub name: String,
    pub bitfield: bool,
    pub constants: Vec<EnumConstant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    /// Literal value text as written in the document.
    pub value: String,
}

/// Build the binding for `interface` under `role`.
///
/// `symbols` must already hold every interface of the document. Enum
/// references that cannot be resolved are reported through `warnings` and do
/// not stop the build.
pub fn build_binding(
    interface: &Interface,
    role: Role,
    symbols: &SymbolTable,
    runtime: &str,
    warnings: &mut Vec<Warning>,
) -> Result<Binding, ScanError> {
    let ident = symbols.resolve(&interface.name)?.ident.clone();

    let requests = role
        .outbound(interface)
        .iter()
        .enumerate()
        .map(|(opcode, message)| build_request(interface, message, opcode, role, symbols))
        .collect::<Result<Vec<_>, _>>()?;

    let events = role
        .inbound(interface)
        .iter()
        .enumerate()
        .map(|(opcode, message)| build_event(interface, &ident, message, opcode, role, symbols))
        .collect::<Result<Vec<_>, _>>()?;

    for message in interface.requests.iter().chain(&interface.events) {
        check_enum_refs(interface, message, symbols, warnings);
    }

    let enums = interface
        .enums
        .iter()
        .map(|e| {
            let name = format!("{ident}{}", camel_case(&e.name));
            EnumBinding {
                constants: e
                    .entries
                    .iter()
                    .map(|entry| EnumConstant {
                        name: format!("{name}{}", camel_case(&entry.name)),
                        value: entry.value.clone(),
                    })
                    .collect(),
                name,
                bitfield: e.bitfield,
            }
        })
        .collect();

    Ok(Binding {
        wire_name: interface.name.clone(),
        ident,
        runtime: runtime.to_string(),
        constructor: role.constructor(),
        requests,
        events,
        enums,
    })
}

fn build_request(
    interface: &Interface,
    message: &Message,
    opcode: usize,
    role: Role,
    symbols: &SymbolTable,
) -> Result<RequestBinding, ScanError> {
    let mut params = Vec::new();
    let mut send_args = Vec::new();
    let mut new_object: Option<NewObject> = None;

    for arg in &message.args {
        let site = ArgSite {
            interface: &interface.name,
            message: &message.name,
            arg,
        };
        let name = go_param_name(&arg.name);
        match wire::map_outbound(&site, symbols)? {
            Outbound::Param(ty) => {
                send_args.push(SendArg::Param(name.clone()));
                params.push(Param { name, ty });
            }
            Outbound::NewObject(symbol) => {
                if new_object.is_some() {
                    return Err(ScanError::template(format!(
                        "`{}.{}` creates more than one typed object; \
                         argument `{}` would need a second return value",
                        interface.name, message.name, arg.name
                    ))
                    .with_span(arg.span)
                    .with_label("second typed new_id"));
                }
                send_args.push(SendArg::NewObject);
                new_object = Some(NewObject {
                    symbol,
                    constructor: role.constructor(),
                    id_param: name,
                });
            }
            Outbound::GenericNewId => {
                for (param, ty) in [
                    ("iface", TargetType::Scalar(wire::Scalar::String)),
                    ("version", TargetType::Scalar(wire::Scalar::Uint)),
                    (name.as_str(), TargetType::AnyObject),
                ] {
                    send_args.push(SendArg::Param(param.to_string()));
                    params.push(Param {
                        name: param.to_string(),
                        ty,
                    });
                }
            }
        }
    }

    // The identifier of the new object goes last, after the other arguments.
    if let Some(obj) = &new_object {
        params.push(Param {
            name: obj.id_param.clone(),
            ty: TargetType::ObjectId,
        });
    }

    let (summary, doc) = doc_lines(message.description.as_ref());
    Ok(RequestBinding {
        method: camel_case(&message.name),
        opcode,
        params,
        send_args,
        new_object,
        summary,
        doc,
        destructor: message.is_destructor(),
    })
}

fn build_event(
    interface: &Interface,
    ident: &str,
    message: &Message,
    opcode: usize,
    role: Role,
    symbols: &SymbolTable,
) -> Result<EventBinding, ScanError> {
    let name = camel_case(&message.name);
    let args: Vec<EventArg> = message
        .args
        .iter()
        .map(|arg| {
            let site = ArgSite {
                interface: &interface.name,
                message: &message.name,
                arg,
            };
            Ok(match wire::map_inbound(&site, role, symbols)? {
                Inbound::Field(ty, decode) => vec![event_arg(camel_case(&arg.name), ty, decode)],
                Inbound::GenericNewId => {
                    let string = wire::Scalar::String;
                    let uint = wire::Scalar::Uint;
                    vec![
                        event_arg(
                            "Interface".to_string(),
                            TargetType::Scalar(string),
                            DecodeOp::Scalar(string),
                        ),
                        event_arg(
                            "Version".to_string(),
                            TargetType::Scalar(uint),
                            DecodeOp::Scalar(uint),
                        ),
                        event_arg(
                            camel_case(&arg.name),
                            TargetType::AnyObject,
                            DecodeOp::AnyObject,
                        ),
                    ]
                }
            })
        })
        .collect::<Result<Vec<_>, ScanError>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(EventBinding {
        payload: format!("{ident}{name}Event"),
        handler: format!("{ident}{name}Handler"),
        handler_method: format!("Handle{ident}{name}"),
        handlers_field: format!("{}Handlers", lower_camel_case(&message.name)),
        name,
        opcode,
        args,
    })
}

fn event_arg(field: String, ty: TargetType, decode: DecodeOp) -> EventArg {
    EventArg {
        local: go_param_name(&field.to_lowercase()),
        field,
        ty,
        decode,
    }
}

/// Split a description into its summary and trimmed body lines. Leading and
/// trailing blank lines are dropped; blank lines inside the body are kept.
fn doc_lines(description: Option<&Description>) -> (Option<String>, Vec<String>) {
    let Some(description) = description else {
        return (None, Vec::new());
    };
    let summary = description
        .summary
        .as_deref()
        .map(|s| s.trim().trim_end_matches('.').to_string())
        .filter(|s| !s.is_empty());
    let lines: Vec<String> = description
        .body
        .lines()
        .map(|line| line.trim().to_string())
        .collect();
    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    let doc = match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].to_vec(),
        _ => Vec::new(),
    };
    (summary, doc)
}

fn check_enum_refs(
    interface: &Interface,
    message: &Message,
    symbols: &SymbolTable,
    warnings: &mut Vec<Warning>,
) {
    for arg in &message.args {
        let Some(enum_ref) = arg.enum_.as_deref() else {
            continue;
        };
        if symbols.lookup_enum(&interface.name, enum_ref) == EnumLookup::Unknown {
            warnings.push(Warning {
                message: format!(
                    "argument `{}` of `{}.{}` references unknown enum `{enum_ref}`",
                    arg.name, interface.name, message.name
                ),
                help: Some("the argument is generated as a plain integer".to_string()),
            });
        }
    }
}
