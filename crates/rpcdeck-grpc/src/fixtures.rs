// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions,
};

fn field(
    name: &str,
    json_name: &str,
    number: i32,
    label: Label,
    kind: Type,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        json_name: Some(json_name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(kind as i32),
        ..FieldDescriptorProto::default()
    }
}

fn message_field(
    name: &str,
    json_name: &str,
    number: i32,
    label: Label,
    type_name: &str,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, json_name, number, label, Type::Message)
    }
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".to_owned()),
        package: Some("google.protobuf".to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type: vec![DescriptorProto {
            name: Some("Timestamp".to_owned()),
            field: vec![
                field("seconds", "seconds", 1, Label::Optional, Type::Int64),
                field("nanos", "nanos", 2, Label::Optional, Type::Int32),
            ],
            ..DescriptorProto::default()
        }],
        ..FileDescriptorProto::default()
    }
}

fn request_file() -> FileDescriptorProto {
    let color = EnumDescriptorProto {
        name: Some("Color".to_owned()),
        value: ["RED", "BLUE"]
            .into_iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                ..EnumValueDescriptorProto::default()
            })
            .collect(),
        ..EnumDescriptorProto::default()
    };
    let items_entry = DescriptorProto {
        name: Some("ItemsEntry".to_owned()),
        field: vec![
            field("key", "key", 1, Label::Optional, Type::String),
            message_field("value", "value", 2, Label::Optional, ".pkg.Item"),
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..MessageOptions::default()
        }),
        ..DescriptorProto::default()
    };
    let request = DescriptorProto {
        name: Some("Req".to_owned()),
        field: vec![
            field("name", "name", 1, Label::Optional, Type::String),
            field("ids", "ids", 2, Label::Repeated, Type::Int64),
            message_field("items", "items", 3, Label::Repeated, ".pkg.Req.ItemsEntry"),
            message_field("item", "item", 4, Label::Optional, ".pkg.Item"),
            FieldDescriptorProto {
                type_name: Some(".pkg.Req.Color".to_owned()),
                ..field("color", "color", 5, Label::Optional, Type::Enum)
            },
            message_field("parent", "parent", 6, Label::Optional, ".pkg.Req"),
            message_field(
                "created_at",
                "createdAt",
                7,
                Label::Optional,
                ".google.protobuf.Timestamp",
            ),
        ],
        nested_type: vec![items_entry],
        enum_type: vec![color],
        ..DescriptorProto::default()
    };
    let item = DescriptorProto {
        name: Some("Item".to_owned()),
        field: vec![field("ok", "ok", 1, Label::Optional, Type::Bool)],
        ..DescriptorProto::default()
    };

    FileDescriptorProto {
        name: Some("pkg/req.proto".to_owned()),
        package: Some("pkg".to_owned()),
        dependency: vec!["google/protobuf/timestamp.proto".to_owned()],
        syntax: Some("proto3".to_owned()),
        message_type: vec![request, item],
        ..FileDescriptorProto::default()
    }
}

pub(crate) fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![timestamp_file(), request_file()],
    })
    .expect("fixture descriptors are valid")
}

pub(crate) fn request_descriptor() -> MessageDescriptor {
    pool()
        .get_message_by_name("pkg.Req")
        .expect("fixture defines pkg.Req")
}
