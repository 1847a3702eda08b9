// ==============================================================================
// Schema Reader: Wayland Protocol XML to the Schema Model
// ==============================================================================
//
// A streaming pull parser over `quick_xml::Reader`, one `parse_*` function per
// element. Each function is entered right after its start tag was read and
// returns once the matching end tag is consumed. Unknown child elements are
// skipped whole, so vendor extensions do not derail the surrounding element.
//
// Byte offsets are tracked for `<arg>` start tags and for XML syntax errors.
// They become miette spans once the compiler attaches the source text.

use miette::SourceSpan;
use quick_xml::Reader;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesStart, Event};

use crate::error::ScanError;
use crate::model::{
    Arg, ArgType, Description, Entry, Enum, Interface, Message, MessageType, Protocol,
};

// ==========================================================================
// Public API
// ==========================================================================

/// Decode a protocol document into the schema model.
///
/// The first `<protocol>` element is decoded; a document without one is an
/// error. Errors carry spans but no source; the caller attaches it.
pub fn parse_protocol(xml: &str) -> Result<Protocol, ScanError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    loop {
        let (start, empty) = match read_event(&mut reader)? {
            Event::Start(s) => (s, false),
            Event::Empty(s) => (s, true),
            Event::Eof => break,
            _ => continue,
        };
        match start.local_name().as_ref() {
            b"protocol" => {
                let span = tag_span(&reader, &start, empty);
                return parse_protocol_element(&mut reader, start.attributes(), empty, span);
            }
            _ => skip(&mut reader, &start, empty)?,
        }
    }
    Err(ScanError::schema_decode("no `<protocol>` element found"))
}

// ==========================================================================
// Event Plumbing
// ==========================================================================

fn read_event<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, ScanError> {
    reader.read_event().map_err(|e| {
        let pos = reader.error_position() as usize;
        ScanError::schema_decode(format!("malformed XML: {e}"))
            .with_span(Some(SourceSpan::from((pos, 0))))
            .with_label("here")
    })
}

/// Span of the start tag that was just read.
fn tag_span(reader: &Reader<&[u8]>, start: &BytesStart<'_>, empty: bool) -> SourceSpan {
    let end = reader.buffer_position() as usize;
    // `<` + content + (`/`) + `>`
    let len = start.len() + 2 + usize::from(empty);
    SourceSpan::from((end.saturating_sub(len), len.min(end)))
}

/// Skip over an element the dialect does not define, children included.
fn skip(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, empty: bool) -> Result<(), ScanError> {
    if empty {
        return Ok(());
    }
    reader.read_to_end(start.name()).map_err(|e| {
        ScanError::schema_decode(format!("malformed XML: {e}"))
            .with_span(Some(SourceSpan::from((reader.error_position() as usize, 0))))
    })?;
    Ok(())
}

/// Collect the attributes of a tag as `(name, unescaped value)` pairs.
fn attrs(attributes: Attributes<'_>, span: SourceSpan) -> Result<Vec<(String, String)>, ScanError> {
    let mut out = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(|e| {
            ScanError::schema_decode(format!("malformed attribute: {e}")).with_span(Some(span))
        })?;
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| {
                ScanError::schema_decode(format!("invalid value for attribute `{name}`: {e}"))
                    .with_span(Some(span))
            })?
            .into_owned();
        out.push((name, value));
    }
    Ok(out)
}

fn missing(element: &str, attribute: &str, span: SourceSpan) -> ScanError {
    ScanError::schema_decode(format!(
        "`<{element}>` is missing the required `{attribute}` attribute"
    ))
    .with_span(Some(span))
    .with_label(format!("no `{attribute}` here"))
}

fn truncated(element: &str) -> ScanError {
    ScanError::schema_decode(format!("unexpected end of document inside `<{element}>`"))
}

fn invalid(what: &str, value: &str, expected: &str, span: SourceSpan) -> ScanError {
    ScanError::schema_decode(format!("invalid {what} `{value}`: expected {expected}"))
        .with_span(Some(span))
}

fn parse_u32(value: &str, what: &str, span: SourceSpan) -> Result<u32, ScanError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(what, value, "an unsigned integer", span))
}

fn parse_bool(value: &str, what: &str, span: SourceSpan) -> Result<bool, ScanError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(what, value, "`true` or `false`", span))
}

/// Entry values are decimal or `0x`-prefixed hexadecimal, and fit in 32 bits.
fn check_entry_value(value: &str, span: SourceSpan) -> Result<(), ScanError> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => v.parse::<u32>(),
    };
    match parsed {
        Ok(_) => Ok(()),
        Err(_) => Err(invalid(
            "entry value",
            value,
            "a decimal or 0x-prefixed integer",
            span,
        )),
    }
}

/// Resolve a general entity reference (the text between `&` and `;`).
fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let code = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Read character data up to the end tag of the current element. Text,
/// CDATA sections and entity references are concatenated; nested markup is
/// ignored.
fn read_text(reader: &mut Reader<&[u8]>, element: &str) -> Result<String, ScanError> {
    let mut body = String::new();
    let mut depth = 0usize;
    loop {
        let before = reader.buffer_position() as usize;
        match read_event(reader)? {
            Event::Text(t) => body.push_str(&String::from_utf8_lossy(&t)),
            Event::CData(t) => body.push_str(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) => {
                let name = String::from_utf8_lossy(&r).into_owned();
                let c = resolve_entity(&name).ok_or_else(|| {
                    ScanError::schema_decode(format!("unknown entity `&{name};` in `<{element}>`"))
                        .with_span(Some(SourceSpan::from((before, name.len() + 2))))
                })?;
                body.push(c);
            }
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(truncated(element)),
            _ => continue,
        }
    }
    Ok(body)
}

// ==========================================================================
// Elements
// ==========================================================================

fn parse_protocol_element(
    reader: &mut Reader<&[u8]>,
    attributes: Attributes<'_>,
    empty: bool,
    span: SourceSpan,
) -> Result<Protocol, ScanError> {
    let mut name = None;
    for (n, value) in attrs(attributes, span)? {
        if n == "name" {
            name = Some(value);
        }
    }
    let name = name.ok_or_else(|| missing("protocol", "name", span))?;

    let mut copyright = None;
    let mut description = None;
    let mut interfaces = Vec::new();
    if !empty {
        loop {
            let (start, empty) = match read_event(reader)? {
                Event::Start(s) => (s, false),
                Event::Empty(s) => (s, true),
                Event::End(_) => break,
                Event::Eof => return Err(truncated("protocol")),
                _ => continue,
            };
            let span = tag_span(reader, &start, empty);
            match start.local_name().as_ref() {
                b"copyright" if !empty => copyright = Some(read_text(reader, "copyright")?),
                b"description" => {
                    description = Some(parse_description(reader, start.attributes(), empty, span)?)
                }
                b"interface" => {
                    interfaces.push(parse_interface(reader, start.attributes(), empty, span)?)
                }
                _ => skip(reader, &start, empty)?,
            }
        }
    }
    Ok(Protocol {
        name,
        copyright,
        description,
        interfaces,
    })
}

fn parse_description(
    reader: &mut Reader<&[u8]>,
    attributes: Attributes<'_>,
    empty: bool,
    span: SourceSpan,
) -> Result<Description, ScanError> {
    let mut summary = None;
    for (n, value) in attrs(attributes, span)? {
        if n == "summary" {
            summary = Some(value);
        }
    }
    let body = if empty {
        String::new()
    } else {
        read_text(reader, "description")?
    };
    Ok(Description { summary, body })
}

fn parse_interface(
    reader: &mut Reader<&[u8]>,
    attributes: Attributes<'_>,
    empty: bool,
    span: SourceSpan,
) -> Result<Interface, ScanError> {
    let mut name = None;
    let mut version = None;
    for (n, value) in attrs(attributes, span)? {
        match n.as_str() {
            "name" => name = Some(value),
            "version" => version = Some(parse_u32(&value, "interface version", span)?),
            _ => continue,
        }
    }
    let name = name.ok_or_else(|| missing("interface", "name", span))?;
    let version = version.ok_or_else(|| missing("interface", "version", span))?;

    let mut iface = Interface::new(&name, version);
    if !empty {
        loop {
            let (start, empty) = match read_event(reader)? {
                Event::Start(s) => (s, false),
                Event::Empty(s) => (s, true),
                Event::End(_) => break,
                Event::Eof => return Err(truncated("interface")),
                _ => continue,
            };
            let span = tag_span(reader, &start, empty);
            match start.local_name().as_ref() {
                b"description" => {
                    iface.description =
                        Some(parse_description(reader, start.attributes(), empty, span)?)
                }
                b"request" => iface
                    .requests
                    .push(parse_message(reader, "request", start.attributes(), empty, span)?),
                b"event" => iface
                    .events
                    .push(parse_message(reader, "event", start.attributes(), empty, span)?),
                b"enum" => iface
                    .enums
                    .push(parse_enum(reader, start.attributes(), empty, span, &name)?),
                _ => skip(reader, &start, empty)?,
            }
        }
    }
    Ok(iface)
}

fn parse_message(
    reader: &mut Reader<&[u8]>,
    element: &str,
    attributes: Attributes<'_>,
    empty: bool,
    span: SourceSpan,
) -> Result<Message, ScanError> {
    let mut name = None;
    let mut ty = None;
    let mut since = None;
    for (n, value) in attrs(attributes, span)? {
        match n.as_str() {
            "name" => name = Some(value),
            "type" => match value.as_str() {
                "destructor" => ty = Some(MessageType::Destructor),
                _ => return Err(invalid("message type", &value, "`destructor`", span)),
            },
            "since" => since = Some(parse_u32(&value, "`since` version", span)?),
            _ => continue,
        }
    }
    let name = name.ok_or_else(|| missing(element, "name", span))?;

    let mut message = Message::new(&name, Vec::new());
    message.ty = ty;
    message.since = since;
    if !empty {
        loop {
            let (start, empty) = match read_event(reader)? {
                Event::Start(s) => (s, false),
                Event::Empty(s) => (s, true),
                Event::End(_) => break,
                Event::Eof => return Err(truncated(element)),
                _ => continue,
            };
            let span = tag_span(reader, &start, empty);
            match start.local_name().as_ref() {
                b"description" => {
                    message.description =
                        Some(parse_description(reader, start.attributes(), empty, span)?)
                }
                b"arg" => {
                    let arg = parse_arg(start.attributes(), span)?;
                    skip(reader, &start, empty)?;
                    message.args.push(arg);
                }
                _ => skip(reader, &start, empty)?,
            }
        }
    }
    Ok(message)
}

fn parse_arg(attributes: Attributes<'_>, span: SourceSpan) -> Result<Arg, ScanError> {
    let mut name = None;
    let mut ty = None;
    let mut interface = None;
    let mut enum_ = None;
    let mut allow_null = false;
    let mut summary = None;
    for (n, value) in attrs(attributes, span)? {
        match n.as_str() {
            "name" => name = Some(value),
            "type" => ty = Some(ArgType::from_tag(&value)),
            "interface" => interface = Some(value),
            "enum" => enum_ = Some(value),
            "allow-null" => allow_null = parse_bool(&value, "`allow-null` value", span)?,
            "summary" => summary = Some(value),
            _ => continue,
        }
    }
    Ok(Arg {
        name: name.ok_or_else(|| missing("arg", "name", span))?,
        ty: ty.ok_or_else(|| missing("arg", "type", span))?,
        interface,
        enum_,
        allow_null,
        summary,
        span: Some(span),
    })
}

fn parse_enum(
    reader: &mut Reader<&[u8]>,
    attributes: Attributes<'_>,
    empty: bool,
    span: SourceSpan,
    interface: &str,
) -> Result<Enum, ScanError> {
    let mut name = None;
    let mut bitfield = false;
    let mut since = None;
    for (n, value) in attrs(attributes, span)? {
        match n.as_str() {
            "name" => name = Some(value),
            "bitfield" => bitfield = parse_bool(&value, "`bitfield` value", span)?,
            "since" => since = Some(parse_u32(&value, "`since` version", span)?),
            _ => continue,
        }
    }
    let name = name.ok_or_else(|| missing("enum", "name", span))?;

    let mut description = None;
    let mut entries = Vec::new();
    if !empty {
        loop {
            let (start, empty) = match read_event(reader)? {
                Event::Start(s) => (s, false),
                Event::Empty(s) => (s, true),
                Event::End(_) => break,
                Event::Eof => return Err(truncated("enum")),
                _ => continue,
            };
            let span = tag_span(reader, &start, empty);
            match start.local_name().as_ref() {
                b"description" => {
                    description = Some(parse_description(reader, start.attributes(), empty, span)?)
                }
                b"entry" => {
                    let entry = parse_entry(start.attributes(), span).map_err(|e| ScanError {
                        message: format!("{} (in enum `{interface}.{name}`)", e.message),
                        ..e
                    })?;
                    skip(reader, &start, empty)?;
                    entries.push(entry);
                }
                _ => skip(reader, &start, empty)?,
            }
        }
    }
    Ok(Enum {
        name,
        bitfield,
        since,
        description,
        entries,
    })
}

fn parse_entry(attributes: Attributes<'_>, span: SourceSpan) -> Result<Entry, ScanError> {
    let mut name = None;
    let mut value = None;
    let mut summary = None;
    let mut since = None;
    for (n, v) in attrs(attributes, span)? {
        match n.as_str() {
            "name" => name = Some(v),
            "value" => value = Some(v),
            "summary" => summary = Some(v),
            "since" => since = Some(parse_u32(&v, "`since` version", span)?),
            _ => continue,
        }
    }
    let name = name.ok_or_else(|| missing("entry", "name", span))?;
    let value = value.ok_or_else(|| missing("entry", "value", span))?;
    check_entry_value(&value, span)?;
    Ok(Entry {
        name,
        value,
        summary,
        since,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    const SURFACE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<protocol name="wayland">
  <copyright>Copyright &#169; 2008 Kristian</copyright>
  <interface name="wl_surface" version="6">
    <description summary="an onscreen surface">
      A surface is a rectangular area &amp; more.
    </description>
    <request name="destroy" type="destructor"/>
    <request name="attach">
      <arg name="buffer" type="object" interface="wl_buffer" allow-null="true"/>
      <arg name="x" type="int"/>
      <arg name="y" type="int"/>
    </request>
    <event name="enter">
      <arg name="output" type="object" interface="wl_output" summary="output entered"/>
    </event>
    <enum name="error" since="2">
      <entry name="invalid_scale" value="0" summary="buffer scale value is invalid"/>
      <entry name="invalid_size" value="0x2"/>
    </enum>
  </interface>
</protocol>
"#;

    #[test]
    fn decodes_a_full_interface() {
        let p = parse_protocol(SURFACE).expect("parses");
        assert_eq!(p.name, "wayland");
        assert_eq!(
            p.copyright.as_deref(),
            Some("Copyright \u{a9} 2008 Kristian")
        );
        assert_eq!(p.interfaces.len(), 1);

        let iface = &p.interfaces[0];
        assert_eq!(iface.name, "wl_surface");
        assert_eq!(iface.version, 6);
        let desc = iface.description.as_ref().expect("described");
        assert_eq!(desc.summary.as_deref(), Some("an onscreen surface"));
        assert_eq!(desc.body.trim(), "A surface is a rectangular area & more.");

        let names: Vec<_> = iface.requests.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["destroy", "attach"]);
        assert!(iface.requests[0].is_destructor());

        let buffer = &iface.requests[1].args[0];
        assert_eq!(buffer.ty, ArgType::Object);
        assert_eq!(buffer.interface.as_deref(), Some("wl_buffer"));
        assert!(buffer.allow_null);
        assert_eq!(iface.requests[1].args[1].ty, ArgType::Int);

        let output = &iface.events[0].args[0];
        assert_eq!(output.summary.as_deref(), Some("output entered"));
        assert!(!output.allow_null);

        let e = &iface.enums[0];
        assert_eq!(e.since, Some(2));
        assert_eq!(e.entries[1].value, "0x2");
    }

    #[test]
    fn arg_span_points_at_its_tag() {
        let p = parse_protocol(SURFACE).expect("parses");
        let span = p.interfaces[0].requests[1].args[0].span.expect("has a span");
        let text = &SURFACE[span.offset()..span.offset() + span.len()];
        assert_eq!(
            text,
            r#"<arg name="buffer" type="object" interface="wl_buffer" allow-null="true"/>"#
        );
    }

    #[test]
    fn unknown_arg_type_is_kept_for_the_mapper() {
        let xml = r#"<protocol name="p"><interface name="a" version="1">
            <request name="r"><arg name="x" type="double"/></request>
        </interface></protocol>"#;
        let p = parse_protocol(xml).expect("parses");
        assert_eq!(
            p.interfaces[0].requests[0].args[0].ty,
            ArgType::Unknown("double".to_string())
        );
    }

    #[test]
    fn cdata_in_descriptions_is_kept() {
        let xml = r#"<protocol name="p">
            <description summary="s"><![CDATA[a <b> c]]></description>
        </protocol>"#;
        let p = parse_protocol(xml).expect("parses");
        assert_eq!(p.description.expect("described").body, "a <b> c");
    }

    #[test]
    fn unknown_children_are_skipped() {
        let xml = r#"<protocol name="p"><interface name="a" version="1">
            <vendor><request name="hidden"/></vendor>
            <request name="visible"/>
        </interface></protocol>"#;
        let p = parse_protocol(xml).expect("parses");
        let names: Vec<_> = p.interfaces[0]
            .requests
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["visible"]);
    }

    #[test]
    fn missing_protocol_element() {
        let err = parse_protocol("<root/>").expect_err("no protocol");
        assert_eq!(err.kind, ErrorKind::SchemaDecode);
        assert_eq!(err.message, "no `<protocol>` element found");
    }

    #[test]
    fn missing_interface_version() {
        let xml = r#"<protocol name="p"><interface name="a"/></protocol>"#;
        let err = parse_protocol(xml).expect_err("no version");
        assert_eq!(err.kind, ErrorKind::SchemaDecode);
        assert_eq!(
            err.message,
            "`<interface>` is missing the required `version` attribute"
        );
        assert!(err.span.is_some());
    }

    #[test]
    fn invalid_attribute_values() {
        let bad_type = r#"<protocol name="p"><interface name="a" version="1">
            <request name="r" type="constructor"/></interface></protocol>"#;
        let err = parse_protocol(bad_type).expect_err("bad type");
        assert_eq!(
            err.message,
            "invalid message type `constructor`: expected `destructor`"
        );

        let bad_null = r#"<protocol name="p"><interface name="a" version="1">
            <request name="r"><arg name="x" type="object" allow-null="yes"/></request>
            </interface></protocol>"#;
        let err = parse_protocol(bad_null).expect_err("bad bool");
        assert_eq!(
            err.message,
            "invalid `allow-null` value `yes`: expected `true` or `false`"
        );

        let bad_value = r#"<protocol name="p"><interface name="a" version="1">
            <enum name="e"><entry name="x" value="0xZZ"/></enum></interface></protocol>"#;
        let err = parse_protocol(bad_value).expect_err("bad value");
        assert_eq!(
            err.message,
            "invalid entry value `0xZZ`: expected a decimal or 0x-prefixed integer (in enum `a.e`)"
        );

        let too_wide = r#"<protocol name="p"><interface name="a" version="1">
            <enum name="e"><entry name="x" value="0x100000000"/></enum></interface></protocol>"#;
        let err = parse_protocol(too_wide).expect_err("value out of range");
        assert!(err.message.contains("`0x100000000`"), "{}", err.message);
    }

    #[test]
    fn malformed_xml_reports_a_position() {
        let xml = r#"<protocol name="p"><interface name="a" version="1"></protocol>"#;
        let err = parse_protocol(xml).expect_err("bad");
        assert_eq!(err.kind, ErrorKind::SchemaDecode);
        assert!(err.message.starts_with("malformed XML"), "{}", err.message);
        assert!(err.span.is_some());
    }

    #[test]
    fn entities() {
        assert_eq!(resolve_entity("lt"), Some('<'));
        assert_eq!(resolve_entity("#x41"), Some('A'));
        assert_eq!(resolve_entity("#65"), Some('A'));
        assert_eq!(resolve_entity("nbsp"), None);
    }
}
