// ==============================================================================
// Go Emitter
// ==============================================================================
//
// Renders bindings against the `wl` runtime package: `BaseProxy`, `Context`,
// `Event`, `Proxy`. Inside the base package those names are used bare; in an
// extension package they carry the binding's runtime qualifier (`wl.`).
//
// Output is laid out the way `gofmt` would print it, except for column
// alignment of struct fields, so `--no-fmt` output is still readable.

use std::fmt::{self, Write as _};

use super::code_writer::CodeWriter;
use super::{Emitter, FileHeader};
use crate::binding::{Binding, Constructor, EventArg, EventBinding, RequestBinding, SendArg};
use crate::error::ScanError;
use crate::wire::{DecodeOp, Scalar, TargetType};

type Writer<'a> = CodeWriter<&'a mut String>;

#[derive(Debug, Clone, Copy, Default)]
pub struct GoEmitter;

impl Emitter for GoEmitter {
    fn emit_header(&self, out: &mut String, header: &FileHeader<'_>) -> Result<(), ScanError> {
        let mut w = CodeWriter::new(out, "\t");
        write_header(&mut w, header)
            .map_err(|_| ScanError::template("failed to render the file header"))
    }

    fn emit_binding(&self, out: &mut String, binding: &Binding) -> Result<(), ScanError> {
        check_identifiers(binding)?;
        let mut w = CodeWriter::new(out, "\t");
        write_binding(&mut w, binding).map_err(|_| {
            ScanError::template(format!("failed to render interface `{}`", binding.wire_name))
        })
    }
}

// ==============================================================================
// Validation
// ==============================================================================

fn empty_identifier(binding: &Binding, what: &str) -> ScanError {
    ScanError::template(format!(
        "{what} of interface `{}` has an empty identifier",
        binding.wire_name
    ))
    .with_help(Some(
        "names must keep at least one character after prefix and suffix stripping".to_string(),
    ))
}

/// Reject bindings that would render into invalid Go declarations.
fn check_identifiers(binding: &Binding) -> Result<(), ScanError> {
    if binding.ident.is_empty() {
        return Err(empty_identifier(binding, "the type name"));
    }
    for req in &binding.requests {
        if req.method.is_empty() {
            return Err(empty_identifier(binding, &format!("request {}", req.opcode)));
        }
        if req.params.iter().any(|p| p.name.is_empty()) {
            return Err(empty_identifier(
                binding,
                &format!("a parameter of `{}`", req.method),
            ));
        }
    }
    for ev in &binding.events {
        if ev.name.is_empty() {
            return Err(empty_identifier(binding, &format!("event {}", ev.opcode)));
        }
        if ev.args.iter().any(|a| a.field.is_empty()) {
            return Err(empty_identifier(binding, &format!("a field of `{}`", ev.payload)));
        }
    }
    Ok(())
}

// ==============================================================================
// Types and Decode Expressions
// ==============================================================================

fn scalar_type(s: Scalar) -> &'static str {
    match s {
        Scalar::Int => "int32",
        Scalar::Uint => "uint32",
        Scalar::String => "string",
        Scalar::Fd => "uintptr",
        Scalar::Fixed => "float32",
        Scalar::Array => "[]int32",
    }
}

fn go_type(ty: &TargetType, runtime: &str) -> String {
    match ty {
        TargetType::Scalar(s) => scalar_type(*s).to_string(),
        TargetType::Object(symbol) => format!("*{}", symbol.qualified()),
        TargetType::AnyObject => format!("{runtime}Proxy"),
        TargetType::ObjectId => "int".to_string(),
    }
}

fn scalar_decode(s: Scalar) -> &'static str {
    match s {
        Scalar::Int => "event.Int32()",
        Scalar::Uint => "event.Uint32()",
        Scalar::String => "event.String()",
        Scalar::Fd => "p.Context().NextFD()",
        Scalar::Fixed => "event.Float32()",
        Scalar::Array => "event.Array()",
    }
}

// ==============================================================================
// Rendering
// ==============================================================================

fn write_header(w: &mut Writer<'_>, header: &FileHeader<'_>) -> fmt::Result {
    writeln!(
        w,
        "// Package {} acts as a {} for the {} wayland protocol.",
        header.package, header.role, header.protocol
    )?;
    w.blank_line()?;
    w.comment("generated by wl-scanner")?;
    writeln!(w, "// from: {}", header.source)?;
    writeln!(w, "package {}", header.package)?;

    if !header.needs_sync && header.base_import.is_none() {
        return Ok(());
    }
    w.blank_line()?;
    w.writeln("import (")?;
    {
        let _indent = w.indent();
        if header.needs_sync {
            w.writeln("\"sync\"")?;
        }
        if let Some(path) = header.base_import {
            if header.needs_sync {
                w.blank_line()?;
            }
            writeln!(w, "\"{path}\"")?;
        }
    }
    w.writeln(")")
}

fn write_binding(w: &mut Writer<'_>, b: &Binding) -> fmt::Result {
    write_type(w, b)?;
    write_constructor(w, b)?;
    for ev in &b.events {
        write_event_types(w, b, ev)?;
        write_handler_registration(w, b, ev)?;
    }
    for req in &b.requests {
        write_request(w, b, req)?;
    }
    if b.has_inbound() {
        write_dispatch(w, b)?;
    }
    for e in &b.enums {
        w.blank_line()?;
        if e.bitfield {
            writeln!(
                w,
                "// {} is a bitfield: its values can be combined with |.",
                e.name
            )?;
        }
        w.writeln("const (")?;
        {
            let _indent = w.indent();
            for c in &e.constants {
                writeln!(w, "{} = {}", c.name, c.value)?;
            }
        }
        w.writeln(")")?;
    }
    Ok(())
}

fn write_type(w: &mut Writer<'_>, b: &Binding) -> fmt::Result {
    w.blank_line()?;
    w.block(&format!("type {} struct", b.ident), |w| {
        writeln!(w, "{}BaseProxy", b.runtime)?;
        if b.has_inbound() {
            w.writeln("mu sync.RWMutex")?;
        }
        for ev in &b.events {
            writeln!(w, "{} []{}", ev.handlers_field, ev.handler)?;
        }
        Ok(())
    })
}

fn write_constructor(w: &mut Writer<'_>, b: &Binding) -> fmt::Result {
    let (params, register) = match b.constructor {
        Constructor::ContextAssigned => ("", "ctx.Register(ret)"),
        Constructor::ExplicitId => (", id int", "ctx.RegisterId(ret, id)"),
    };
    w.blank_line()?;
    let header = format!(
        "func New{ident}(ctx *{rt}Context{params}) *{ident}",
        ident = b.ident,
        rt = b.runtime
    );
    w.block(&header, |w| {
        writeln!(w, "ret := new({})", b.ident)?;
        w.writeln(register)?;
        w.writeln("return ret")
    })
}

fn write_event_types(w: &mut Writer<'_>, b: &Binding, ev: &EventBinding) -> fmt::Result {
    w.blank_line()?;
    w.block(&format!("type {} struct", ev.payload), |w| {
        for arg in &ev.args {
            writeln!(w, "{} {}", arg.field, go_type(&arg.ty, &b.runtime))?;
        }
        Ok(())
    })?;
    w.blank_line()?;
    w.block(&format!("type {} interface", ev.handler), |w| {
        writeln!(w, "{}({})", ev.handler_method, ev.payload)
    })
}

fn write_handler_registration(w: &mut Writer<'_>, b: &Binding, ev: &EventBinding) -> fmt::Result {
    let field = &ev.handlers_field;
    w.blank_line()?;
    let add = format!(
        "func (p *{}) Add{}Handler(h {})",
        b.ident, ev.name, ev.handler
    );
    w.block(&add, |w| {
        w.block("if h != nil", |w| {
            w.writeln("p.mu.Lock()")?;
            writeln!(w, "p.{field} = append(p.{field}, h)")?;
            w.writeln("p.mu.Unlock()")
        })
    })?;

    w.blank_line()?;
    let remove = format!(
        "func (p *{}) Remove{}Handler(h {})",
        b.ident, ev.name, ev.handler
    );
    w.block(&remove, |w| {
        w.writeln("p.mu.Lock()")?;
        w.writeln("defer p.mu.Unlock()")?;
        w.blank_line()?;
        w.block(&format!("for i, e := range p.{field}"), |w| {
            w.block("if e == h", |w| {
                writeln!(w, "p.{field} = append(p.{field}[:i], p.{field}[i+1:]...)")?;
                w.writeln("break")
            })
        })
    })
}

fn write_request(w: &mut Writer<'_>, b: &Binding, req: &RequestBinding) -> fmt::Result {
    w.blank_line()?;
    if let Some(summary) = &req.summary {
        writeln!(w, "// {} will {summary}.", req.method)?;
        if !req.doc.is_empty() {
            w.writeln("//")?;
        }
    }
    if !req.doc.is_empty() {
        w.comment(&req.doc.join("\n"))?;
    }
    if req.destructor {
        if req.summary.is_some() || !req.doc.is_empty() {
            w.writeln("//")?;
        }
        writeln!(
            w,
            "// {} destroys the object; it must not be used afterwards.",
            req.method
        )?;
    }

    write!(w, "func (p *{}) {}(", b.ident, req.method)?;
    w.write_separated(&req.params, ", ", |w, p| {
        write!(w, "{} {}", p.name, go_type(&p.ty, &b.runtime))
    })?;
    match &req.new_object {
        Some(obj) => write!(w, ") (*{}, error)", obj.symbol.qualified())?,
        None => w.write(") error")?,
    }

    let send = |w: &mut Writer<'_>| -> fmt::Result {
        write!(w, "p.Context().SendRequest(p, {}", req.opcode)?;
        for arg in &req.send_args {
            match arg {
                SendArg::Param(name) => write!(w, ", {name}")?,
                SendArg::NewObject => write!(w, ", {}Proxy(ret)", b.runtime)?,
            }
        }
        w.write(")")
    };

    w.block("", |w| {
        match &req.new_object {
            Some(obj) => {
                let q = obj.symbol.qualifier();
                let ident = &obj.symbol.ident;
                let id = &obj.id_param;
                match obj.constructor {
                    Constructor::ContextAssigned => {
                        writeln!(w, "ret := new({q}{ident})")?;
                        writeln!(w, "p.Context().RegisterId(ret, {id})")?;
                    }
                    Constructor::ExplicitId => {
                        writeln!(w, "ret := {q}New{ident}(p.Context(), {id})")?;
                    }
                }
                w.write("return ret, ")?;
            }
            None => w.write("return ")?,
        }
        send(w)?;
        w.blank_line()
    })
}

fn write_decode(w: &mut Writer<'_>, arg: &EventArg) -> fmt::Result {
    let field = &arg.field;
    match &arg.decode {
        DecodeOp::Scalar(s) => writeln!(w, "ev.{field} = {}", scalar_decode(*s)),
        DecodeOp::RequiredObject(symbol) => writeln!(
            w,
            "ev.{field} = event.Proxy(p.Context()).(*{})",
            symbol.qualified()
        ),
        DecodeOp::OptionalObject(symbol) => {
            let local = &arg.local;
            writeln!(w, "{local} := event.Proxy(p.Context())")?;
            w.block(&format!("if {local} != nil"), |w| {
                writeln!(w, "ev.{field} = {local}.(*{})", symbol.qualified())
            })
        }
        DecodeOp::NewObject(symbol) => writeln!(
            w,
            "ev.{field} = {}New{}(p.Context(), int(event.Uint32()))",
            symbol.qualifier(),
            symbol.ident
        ),
        DecodeOp::AnyObject => writeln!(w, "ev.{field} = event.Proxy(p.Context())"),
    }
}

fn write_dispatch(w: &mut Writer<'_>, b: &Binding) -> fmt::Result {
    w.blank_line()?;
    let header = format!("func (p *{}) Dispatch(event *{}Event)", b.ident, b.runtime);
    w.block(&header, |w| {
        w.writeln("switch event.Opcode {")?;
        for ev in &b.events {
            writeln!(w, "case {}:", ev.opcode)?;
            let _indent = w.indent();
            w.block(&format!("if len(p.{}) > 0", ev.handlers_field), |w| {
                writeln!(w, "ev := {}{{}}", ev.payload)?;
                for arg in &ev.args {
                    write_decode(w, arg)?;
                }
                w.writeln("p.mu.RLock()")?;
                w.block(&format!("for _, h := range p.{}", ev.handlers_field), |w| {
                    writeln!(w, "h.{}(ev)", ev.handler_method)
                })?;
                w.writeln("p.mu.RUnlock()")
            })?;
        }
        w.writeln("}")
    })
}
