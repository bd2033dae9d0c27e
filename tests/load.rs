//! Compile-and-load tests against real protoc.
//!
//! Every test returns early when protoc is not installed.

mod common;

use std::fs;

use common::proto;
use protoload::{DynamicMessage, Value};

#[test]
fn test_compile_writes_descriptor_set() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("simple.pb");

    compiler.compile(&output, [proto("simple.proto")]).unwrap();
    let set = protoload::descriptor::decode_file_descriptor_set_from(fs::File::open(&output).unwrap())
        .unwrap();
    assert_eq!(set.file_names().collect::<Vec<_>>(), ["simple.proto"]);
    assert_eq!(set.file[0].package(), "simple");
    // Compiling alone activates nothing.
    assert!(!registry.contains_file("simple.proto"));
}

#[test]
fn test_compile_and_load_simple() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    let report = compiler
        .compile_and_load([proto("simple.proto")])
        .expect("simple.proto should load");
    assert_eq!(report.files, vec!["simple.proto"]);
    assert!(report.contains("simple.Person.PhoneNumber"));
    assert!(report.contains("simple.Person.PhoneType"));

    let mut person = registry.new_message("simple.Person").unwrap();
    person.set("name", "Ada").unwrap();
    person.set("id", 7i32).unwrap();
    person.push("tags", "admin").unwrap();
    assert_eq!(person.get("name").unwrap().and_then(Value::as_str), Some("Ada"));
    assert_eq!(person.get("id").unwrap().and_then(Value::as_i32), Some(7));
    assert_eq!(
        person.get_or_default("email").unwrap(),
        Value::String("nobody@example.com".into())
    );
    assert!(person.set("id", "seven").is_err());

    let mut phone = registry.new_message("simple.Person.PhoneNumber").unwrap();
    assert_eq!(phone.get_or_default("type").unwrap(), Value::Enum(1));
    phone.set("number", "555-0100").unwrap();
    phone.set_enum_by_name("type", "WORK").unwrap();
    person.push("phones", phone).unwrap();

    let phones = person.get("phones").unwrap().and_then(Value::as_list).unwrap();
    assert_eq!(phones.len(), 1);
    let phone = phones[0].as_message().unwrap();
    assert_eq!(phone.get("type").unwrap(), Some(&Value::Enum(2)));
}

#[test]
fn test_load_nested_dependencies() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    let report = compiler
        .compile_and_load([
            proto("simple.proto"),
            proto("nested/child.proto"),
            proto("depends.proto"),
        ])
        .unwrap();
    for file in ["simple.proto", "nested/child.proto", "depends.proto"] {
        assert!(report.files.iter().any(|f| f == file), "{} not loaded", file);
    }

    let mut child = registry.new_message("nested.Child").unwrap();
    child.set("age", 4u32).unwrap();
    child.set("foo", registry.new_message("simple.Foo").unwrap()).unwrap();

    let mut depends = registry.new_message("depends.Depends").unwrap();
    depends.set("child", child).unwrap();
    assert!(depends.set("foo", registry.new_message("simple.Bar").unwrap()).is_err());

    let child = depends.get("child").unwrap().and_then(Value::as_message).unwrap();
    assert_eq!(child.get("age").unwrap(), Some(&Value::U32(4)));
}

#[test]
fn test_dependency_chain_in_one_set() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    let set = compiler
        .compile_to_set([proto("chain/a.proto"), proto("chain/b.proto"), proto("chain/c.proto")])
        .unwrap();
    let names: Vec<&str> = set.file_names().collect();
    assert_eq!(names, ["chain/a.proto", "chain/b.proto", "chain/c.proto"]);

    // Imports come along with the file that needs them.
    let report = compiler.compile_and_load([proto("chain/c.proto")]).unwrap();
    assert_eq!(report.files.len(), 3);

    let mut a = registry.new_message("chain.A").unwrap();
    a.set("name", "first").unwrap();
    let mut b = registry.new_message("chain.B").unwrap();
    b.set("a", a).unwrap();
    let mut c = registry.new_message("chain.C").unwrap();
    c.push("history", b.clone()).unwrap();
    c.set("b", b).unwrap();
    assert!(c.has("b").unwrap());
}

#[test]
fn test_dependency_from_earlier_load() {
    let Some((mut compiler, registry)) = common::compiler() else {
        return;
    };
    compiler.include_imports(false);

    compiler.compile_and_load([proto("chain/a.proto")]).unwrap();
    let report = compiler.compile_and_load([proto("chain/b.proto")]).unwrap();
    assert_eq!(report.files, vec!["chain/b.proto"]);

    let mut b = registry.new_message("chain.B").unwrap();
    b.set("a", registry.new_message("chain.A").unwrap()).unwrap();
}

#[test]
fn test_package_with_underscores() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    compiler
        .compile_and_load([proto("under_score_package.proto")])
        .unwrap();
    let mut under = registry.new_message("under_score.UnderTest").unwrap();
    under.set("value", "ok").unwrap();
}

#[test]
fn test_featureful_schema() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    compiler
        .compile_and_load([proto("simple.proto"), proto("featureful.proto")])
        .unwrap();

    let tree_type = registry.message("featureful.Tree").unwrap();
    assert_eq!(tree_type.oneofs, vec!["payload".to_string()]);

    let mut tree = DynamicMessage::new(tree_type);
    tree.set("label", "root").unwrap();
    tree.set("status", 1i32).unwrap();
    assert_eq!(tree.which_oneof("payload"), Some("status"));
    tree.set("text", "hello").unwrap();
    assert_eq!(tree.which_oneof("payload"), Some("text"));
    assert!(!tree.has("status").unwrap());

    let mut child = registry.new_message("featureful.Tree").unwrap();
    child.set("weight", 3u32).unwrap();
    tree.push("children", child).unwrap();
    assert!(!tree.has("weight").unwrap());
    assert_eq!(tree.get_or_default("weight").unwrap(), Value::U32(0));

    let entry_type = registry.message("featureful.Tree.CountersEntry").unwrap();
    assert!(entry_type.is_map_entry);
    let mut entry = DynamicMessage::new(entry_type);
    entry.set("key", "hits").unwrap();
    entry.set("value", 10i64).unwrap();
    tree.push("counters", entry).unwrap();

    tree.set("delta", -4i64).unwrap();
    tree.set("checksum", 9u32).unwrap();
    tree.set("score", 0.5f64).unwrap();
    tree.set("blob", vec![0u8, 1, 2]).unwrap();
    assert!(tree.set("checksum", 9i32).is_err());
    assert_eq!(tree.which_oneof("payload"), Some("blob"));
}

#[test]
fn test_compile_and_load_string() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    let report = compiler
        .compile_and_load_string(
            r#"
            syntax = "proto3";
            package inline;
            import "simple.proto";

            message Wrapper {
              simple.Foo foo = 1;
              repeated int32 values = 2;
            }
            "#,
        )
        .unwrap();
    assert!(report.files.iter().any(|f| f == protoload::STRING_SCHEMA_NAME));
    assert!(report.contains("simple.Foo"));

    let mut wrapper = registry.new_message("inline.Wrapper").unwrap();
    wrapper.set("values", Value::list([1i32, 2, 3])).unwrap();
    wrapper.set("foo", registry.new_message("simple.Foo").unwrap()).unwrap();
}

#[test]
fn test_generate_sources() {
    let Some((compiler, _registry)) = common::compiler() else {
        return;
    };
    let out_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let written = compiler
        .generate_sources([proto("simple.proto"), proto("featureful.proto")], out_dir.path())
        .unwrap();
    assert_eq!(written.len(), 3);

    let simple = fs::read_to_string(out_dir.path().join("simple.rs")).unwrap();
    assert!(simple.contains("pub struct Person"), "Should contain Person struct");
    assert!(simple.contains("pub mod person"), "Should nest Person's types");
    assert!(simple.contains("pub struct PhoneNumber"));
    assert!(simple.contains("pub enum PhoneType"));
    assert!(simple.contains("pub const FULL_NAME"));

    let featureful = fs::read_to_string(out_dir.path().join("featureful.rs")).unwrap();
    assert!(featureful.contains("Box<super::featureful::Tree>"), "Recursive field should be boxed");
    assert!(featureful.contains("HashMap<::std::string::String, i64>"));
    assert!(featureful.contains("pub enum Payload"));

    let root = fs::read_to_string(out_dir.path().join("mod.rs")).unwrap();
    assert_eq!(root, "pub mod featureful;\npub mod simple;\n");
}

#[test]
fn test_group_fields() {
    let Some((compiler, registry)) = common::compiler() else {
        return;
    };

    compiler.compile_and_load([proto("group.proto")]).unwrap();
    let mut result = registry.new_message("group.Search.Result").unwrap();
    result.set("title", "Example").unwrap();
    let mut search = registry.new_message("group.Search").unwrap();
    search.push("result", result).unwrap();
    search.set_enum_by_name("version", "_1").unwrap();
    assert_eq!(search.get("version").unwrap().and_then(Value::as_enum), Some(1));
}
