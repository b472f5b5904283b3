//! XML form of a flat problem mapping.
//!
//! Layout follows RFC 7807 appendix A: a `<problem>` root in the
//! `urn:ietf:rfc:7807` namespace, one child per member, arrays as repeated
//! `<i>` elements and objects as nested elements. Scalars travel as text, so
//! decoding yields strings for every leaf. Containers whose shape the children
//! alone cannot tell (empty arrays, empty objects, objects keyed only by `i`)
//! carry `kind="array"` or `kind="object"`.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

use crate::error::CodecError;

pub const PROBLEM_NAMESPACE: &str = "urn:ietf:rfc:7807";
const ROOT: &str = "problem";
const ITEM: &str = "i";
const KIND: &str = "kind";
const KIND_ARRAY: &str = "array";
const KIND_OBJECT: &str = "object";

pub fn encode(fields: &Map<String, Value>) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(
        BytesStart::new(ROOT).with_attributes([("xmlns", PROBLEM_NAMESPACE)]),
    ))?;
    for (key, value) in fields {
        write_element(&mut writer, key, value)?;
    }
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    Ok(writer.into_inner())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), CodecError> {
    if !is_element_name(name) {
        return Err(CodecError::InvalidElementName(name.to_owned()));
    }
    match value {
        Value::Null => writer.write_event(Event::Empty(BytesStart::new(name)))?,
        Value::String(text) => write_text(writer, name, text)?,
        Value::Bool(_) | Value::Number(_) => write_text(writer, name, &value.to_string())?,
        Value::Array(items) => {
            if items.is_empty() {
                let start = BytesStart::new(name).with_attributes([(KIND, KIND_ARRAY)]);
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for item in items {
                write_element(writer, ITEM, item)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Value::Object(members) => {
            let mut start = BytesStart::new(name);
            if members.keys().all(|key| key == ITEM) {
                start.push_attribute((KIND, KIND_OBJECT));
            }
            if members.is_empty() {
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }
            writer.write_event(Event::Start(start))?;
            for (key, member) in members {
                write_element(writer, key, member)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

/// A letter or `_` followed by letters, digits, `-`, `_` or `.`.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_') && chars.all(is_name_char)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), CodecError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Container shape declared through the `kind` attribute.
#[derive(Clone, Copy)]
enum Kind {
    Array,
    Object,
}

/// An element still being read.
struct Node {
    name: String,
    kind: Option<Kind>,
    text: String,
    children: Vec<(String, Value)>,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let local = start.local_name();
        let name = std::str::from_utf8(local.as_ref())?.to_owned();
        let kind = match start.try_get_attribute(KIND).map_err(quick_xml::Error::from)? {
            Some(attr) if attr.value.as_ref() == KIND_ARRAY.as_bytes() => Some(Kind::Array),
            Some(attr) if attr.value.as_ref() == KIND_OBJECT.as_bytes() => Some(Kind::Object),
            _ => None,
        };
        Ok(Self {
            name,
            kind,
            text: String::new(),
            children: Vec::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let kind = self.kind.or_else(|| {
            if self.children.is_empty() {
                None
            } else if self.children.iter().all(|(name, _)| name == ITEM) {
                Some(Kind::Array)
            } else {
                Some(Kind::Object)
            }
        });
        let value = match kind {
            Some(Kind::Array) => Value::Array(self.children.into_iter().map(|(_, v)| v).collect()),
            Some(Kind::Object) => Value::Object(self.children.into_iter().collect()),
            None => Value::String(self.text),
        };
        (self.name, value)
    }
}

pub fn decode(data: &[u8]) -> Result<Map<String, Value>, CodecError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Node::open(&start)?),
            Event::Empty(start) => {
                let node = Node::open(&start)?;
                match stack.last_mut() {
                    Some(parent) if node.kind.is_some() => parent.children.push(node.into_value()),
                    Some(parent) => parent.children.push((node.name, Value::Null)),
                    None => root = Some(Value::Object(Map::new())),
                }
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(std::str::from_utf8(&data)?);
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    return Err(CodecError::MissingRoot);
                };
                let (name, value) = node.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, value)),
                    None => root = Some(value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(CodecError::UnclosedElement(open.name));
    }
    match root {
        Some(Value::Object(fields)) => Ok(fields),
        // `<problem/>` and `<problem></problem>` carry no members.
        Some(Value::String(text)) if text.is_empty() => Ok(Map::new()),
        Some(_) => Err(CodecError::NotAnObject),
        None => Err(CodecError::MissingRoot),
    }
}
