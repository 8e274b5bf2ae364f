// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use prost_reflect::{Cardinality, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// Nesting beyond this depth is left as an empty object in templates.
const MAX_TEMPLATE_DEPTH: usize = 8;

/// Proto source rendering of a message, including its nested types.
pub fn message_text(desc: &MessageDescriptor) -> String {
    let mut out = String::new();
    write_message(&mut out, desc, 0);
    out.truncate(out.trim_end().len());
    out
}

fn write_message(out: &mut String, desc: &MessageDescriptor, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}message {} {{", desc.name());
    for field in desc.fields() {
        let _ = writeln!(
            out,
            "{pad}  {}{} = {};",
            field_type(&field),
            field.name(),
            field.number()
        );
    }
    for child in desc.child_messages().filter(|child| !child.is_map_entry()) {
        write_message(out, &child, depth + 1);
    }
    for child in desc.child_enums() {
        write_enum(out, &child, depth + 1);
    }
    let _ = writeln!(out, "{pad}}}");
}

fn write_enum(out: &mut String, desc: &EnumDescriptor, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}enum {} {{", desc.name());
    for value in desc.values() {
        let _ = writeln!(out, "{pad}  {} = {};", value.name(), value.number());
    }
    let _ = writeln!(out, "{pad}}}");
}

/// Declared type of a field with its label, e.g. `repeated string `.
fn field_type(field: &FieldDescriptor) -> String {
    if field.is_map()
        && let Kind::Message(entry) = field.kind()
    {
        return format!(
            "map<{}, {}> ",
            kind_name(&entry.map_entry_key_field().kind()),
            kind_name(&entry.map_entry_value_field().kind())
        );
    }
    let label = if field.is_list() {
        "repeated "
    } else if field.cardinality() == Cardinality::Required {
        "required "
    } else if field.field_descriptor_proto().proto3_optional() {
        "optional "
    } else {
        ""
    };
    format!("{label}{} ", kind_name(&field.kind()))
}

fn kind_name(kind: &Kind) -> String {
    let name = match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(message) => return format!(".{}", message.full_name()),
        Kind::Enum(enumeration) => return format!(".{}", enumeration.full_name()),
    };
    name.to_owned()
}

/// Pretty JSON request template with every field present.
///
/// Nested messages are filled in, lists get one element and maps one entry. Recursive types stop
/// at the first repeat.
pub fn message_template(desc: &MessageDescriptor) -> String {
    let value = template_value(desc, &mut Vec::new());
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_owned())
}

fn template_value(desc: &MessageDescriptor, path: &mut Vec<String>) -> Value {
    if let Some(value) = well_known_template(desc.full_name()) {
        return value;
    }
    let name = desc.full_name().to_owned();
    if path.len() >= MAX_TEMPLATE_DEPTH || path.contains(&name) {
        return Value::Object(Map::new());
    }

    path.push(name);
    let mut object = Map::new();
    for field in desc.fields() {
        object.insert(field.json_name().to_owned(), field_template(&field, path));
    }
    path.pop();
    Value::Object(object)
}

fn field_template(field: &FieldDescriptor, path: &mut Vec<String>) -> Value {
    if field.is_map()
        && let Kind::Message(entry) = field.kind()
    {
        let key = map_key_template(&entry.map_entry_key_field().kind());
        let value = scalar_template(&entry.map_entry_value_field().kind(), path);
        let mut object = Map::new();
        object.insert(key, value);
        return Value::Object(object);
    }
    let value = scalar_template(&field.kind(), path);
    if field.is_list() {
        Value::Array(vec![value])
    } else {
        value
    }
}

fn scalar_template(kind: &Kind, path: &mut Vec<String>) -> Value {
    match kind {
        Kind::Double | Kind::Float => Value::from(0.0),
        Kind::Int32
        | Kind::Uint32
        | Kind::Sint32
        | Kind::Fixed32
        | Kind::Sfixed32 => Value::from(0),
        Kind::Int64
        | Kind::Uint64
        | Kind::Sint64
        | Kind::Fixed64
        | Kind::Sfixed64 => Value::from("0"),
        Kind::Bool => Value::Bool(false),
        Kind::String | Kind::Bytes => Value::from(""),
        Kind::Enum(enumeration) => Value::from(enumeration.default_value().name()),
        Kind::Message(message) => template_value(message, path),
    }
}

fn map_key_template(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "false".to_owned(),
        Kind::String => String::new(),
        _ => "0".to_owned(),
    }
}

fn well_known_template(full_name: &str) -> Option<Value> {
    let value = match full_name {
        "google.protobuf.Timestamp" => Value::from("1970-01-01T00:00:00Z"),
        "google.protobuf.Duration" => Value::from("0s"),
        "google.protobuf.FieldMask" => Value::from(""),
        "google.protobuf.Struct" | "google.protobuf.Empty" | "google.protobuf.Any" => {
            Value::Object(Map::new())
        }
        "google.protobuf.Value" => Value::Null,
        "google.protobuf.ListValue" => Value::Array(Vec::new()),
        "google.protobuf.DoubleValue" | "google.protobuf.FloatValue" => Value::from(0.0),
        "google.protobuf.Int32Value" | "google.protobuf.UInt32Value" => Value::from(0),
        "google.protobuf.Int64Value" | "google.protobuf.UInt64Value" => Value::from("0"),
        "google.protobuf.BoolValue" => Value::Bool(false),
        "google.protobuf.StringValue" | "google.protobuf.BytesValue" => Value::from(""),
        _ => return None,
    };
    Some(value)
}
