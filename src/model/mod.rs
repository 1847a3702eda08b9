pub mod protocol;

pub use protocol::{
    Arg, ArgType, Description, Entry, Enum, Interface, Message, MessageType, Protocol,
};
