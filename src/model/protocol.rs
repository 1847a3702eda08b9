use miette::SourceSpan;

/// A parsed protocol document (one `<protocol>` element).
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub name: String,
    pub copyright: Option<String>,
    pub description: Option<Description>,
    pub interfaces: Vec<Interface>,
}

/// A `<description>` element: a one-line summary plus free-form body text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    pub summary: Option<String>,
    pub body: String,
}

/// A protocol interface.
///
/// Requests and events are kept in declaration order; the index of a message
/// within its list is its wire opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub version: u32,
    pub description: Option<Description>,
    pub requests: Vec<Message>,
    pub events: Vec<Message>,
    pub enums: Vec<Enum>,
}

/// The only message `type` the protocol dialect defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Destructor,
}

/// A request or an event. Which one it is follows from the list that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub ty: Option<MessageType>,
    pub since: Option<u32>,
    pub description: Option<Description>,
    pub args: Vec<Arg>,
}

/// The wire type tag of an argument.
///
/// Tags outside the protocol's closed set are kept verbatim in `Unknown` so
/// that the wire-type mapper, not the reader, decides they are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Int,
    Uint,
    Fixed,
    String,
    Object,
    NewId,
    Array,
    Fd,
    Unknown(String),
}

impl ArgType {
    /// Map an XML `type` attribute to its tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "int" => ArgType::Int,
            "uint" => ArgType::Uint,
            "fixed" => ArgType::Fixed,
            "string" => ArgType::String,
            "object" => ArgType::Object,
            "new_id" => ArgType::NewId,
            "array" => ArgType::Array,
            "fd" => ArgType::Fd,
            other => ArgType::Unknown(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            ArgType::Int => "int",
            ArgType::Uint => "uint",
            ArgType::Fixed => "fixed",
            ArgType::String => "string",
            ArgType::Object => "object",
            ArgType::NewId => "new_id",
            ArgType::Array => "array",
            ArgType::Fd => "fd",
            ArgType::Unknown(tag) => tag,
        }
    }
}

/// A message argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub ty: ArgType,
    /// Referenced interface for `object` and `new_id` arguments.
    pub interface: Option<String>,
    /// Enum name, either `name` (same interface) or `interface.name`.
    pub enum_: Option<String>,
    pub allow_null: bool,
    pub summary: Option<String>,
    /// Byte range of the `<arg>` tag in the source document, when the model
    /// was produced by the reader.
    pub span: Option<SourceSpan>,
}

impl Arg {
    /// Convenience constructor for arguments built in code rather than read
    /// from XML.
    pub fn new(name: &str, ty: ArgType) -> Self {
        Arg {
            name: name.to_string(),
            ty,
            interface: None,
            enum_: None,
            allow_null: false,
            summary: None,
            span: None,
        }
    }

    #[must_use]
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = Some(interface.to_string());
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }
}

/// An `<enum>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub bitfield: bool,
    pub since: Option<u32>,
    pub description: Option<Description>,
    pub entries: Vec<Entry>,
}

/// An `<entry>` of an enum. `value` is the literal text from the document
/// (decimal or `0x` hex), already checked to fit an unsigned 32-bit integer.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub value: String,
    pub summary: Option<String>,
    pub since: Option<u32>,
}

impl Interface {
    /// Convenience constructor for an interface with no messages or enums.
    pub fn new(name: &str, version: u32) -> Self {
        Interface {
            name: name.to_string(),
            version,
            description: None,
            requests: Vec::new(),
            events: Vec::new(),
            enums: Vec::new(),
        }
    }
}

impl Message {
    pub fn new(name: &str, args: Vec<Arg>) -> Self {
        Message {
            name: name.to_string(),
            ty: None,
            since: None,
            description: None,
            args,
        }
    }

    pub fn is_destructor(&self) -> bool {
        self.ty == Some(MessageType::Destructor)
    }
}
