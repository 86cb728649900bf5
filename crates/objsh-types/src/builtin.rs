//! Descriptors for the built-in value types.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::descriptor::{InterfaceDescriptor, TypeDescriptor};
use crate::error::{ShellError, ShellResult};
use crate::member::{argument, instance, MemberTemplate};
use crate::value::Value;

pub const OBJECT: &str = "objsh.Object";
pub const VALUE_TYPE: &str = "objsh.ValueType";
pub const BOOLEAN: &str = "objsh.Boolean";
pub const INT64: &str = "objsh.Int64";
pub const DOUBLE: &str = "objsh.Double";
pub const STRING: &str = "objsh.String";
pub const ARRAY: &str = "objsh.Array";
pub const TYPE: &str = "objsh.Type";

macro_rules! cached {
    ($(#[$meta:meta])* $vis:vis fn $name:ident() -> $ty:ty $body:block) => {
        $(#[$meta])*
        $vis fn $name() -> Arc<$ty> {
            static CELL: OnceLock<Arc<$ty>> = OnceLock::new();
            CELL.get_or_init(|| Arc::new($body)).clone()
        }
    };
}

fn this_str<'a>(this: Option<&'a Value>, member: &str) -> ShellResult<&'a str> {
    instance(this, member)?
        .as_str()
        .ok_or_else(|| ShellError::member(member, "instance is not a string"))
}

fn this_array<'a>(this: Option<&'a Value>, member: &str) -> ShellResult<&'a [Value]> {
    instance(this, member)?
        .as_array()
        .ok_or_else(|| ShellError::member(member, "instance is not an array"))
}

fn this_type<'a>(this: Option<&'a Value>, member: &str) -> ShellResult<&'a Arc<TypeDescriptor>> {
    match instance(this, member)? {
        Value::Type(t) => Ok(t),
        _ => Err(ShellError::member(member, "instance is not a type")),
    }
}

fn str_arg(args: &[Value], index: usize, member: &str) -> ShellResult<String> {
    Ok(argument(args, index, member)?.to_string())
}

fn int_arg(args: &[Value], index: usize, member: &str) -> ShellResult<i64> {
    argument(args, index, member)?
        .as_int()
        .ok_or_else(|| ShellError::member(member, format!("argument {index} is not an integer")))
}

fn char_index(s: &str, index: i64, member: &str) -> ShellResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i <= s.chars().count())
        .ok_or_else(|| ShellError::member(member, format!("index {index} is out of range")))
}

/// `CompareTo` for types whose ordering comes from [`Value::compare`].
fn compare_to(definition: &str) -> MemberTemplate {
    MemberTemplate::method("CompareTo", |this, args| {
        let this = instance(this, "CompareTo")?;
        let other = argument(args, 0, "CompareTo")?;
        this.compare(other)
            .map(|o| Value::Int(o as i64))
            .ok_or_else(|| ShellError::member("CompareTo", format!("cannot compare with {other:?}")))
    })
    .definition(definition)
}

fn parse_failure(member: &str, text: &str, target: &str) -> ShellError {
    ShellError::member(member, format!("{text:?} is not a valid {target}"))
}

cached! {
    /// Root of every lineage.
    pub fn object_type() -> TypeDescriptor {
        TypeDescriptor::builder(OBJECT)
            .method(
                MemberTemplate::method("ToString", |this, _| {
                    Ok(Value::String(instance(this, "ToString")?.to_string()))
                })
                .definition("string ToString()"),
            )
            .method(
                MemberTemplate::method("Equals", |this, args| {
                    let this = instance(this, "Equals")?;
                    Ok(Value::Bool(this == argument(args, 0, "Equals")?))
                })
                .definition("bool Equals(object obj)"),
            )
            .method(
                MemberTemplate::method("GetHashCode", |this, _| {
                    let mut hasher = DefaultHasher::new();
                    instance(this, "GetHashCode")?.hash(&mut hasher);
                    Ok(Value::Int(hasher.finish() as i64))
                })
                .definition("int GetHashCode()"),
            )
            .method(
                MemberTemplate::method("GetType", |this, _| {
                    Ok(instance(this, "GetType")?.type_descriptor().into())
                })
                .definition("type GetType()"),
            )
            .build()
    }
}

cached! {
    pub fn value_type() -> TypeDescriptor {
        TypeDescriptor::builder(VALUE_TYPE).build()
    }
}

cached! {
    pub fn boolean_type() -> TypeDescriptor {
        TypeDescriptor::builder(BOOLEAN)
            .base(value_type())
            .method(compare_to("int CompareTo(bool value)"))
            .static_field(MemberTemplate::field("TrueString").constant(Value::from("True")))
            .static_field(MemberTemplate::field("FalseString").constant(Value::from("False")))
            .static_method(
                MemberTemplate::method("Parse", |_, args| {
                    let text = str_arg(args, 0, "Parse")?;
                    match text.trim().to_ascii_lowercase().as_str() {
                        "true" => Ok(Value::Bool(true)),
                        "false" => Ok(Value::Bool(false)),
                        _ => Err(parse_failure("Parse", &text, "Boolean")),
                    }
                })
                .definition("static bool Parse(string value)"),
            )
            .build()
    }
}

cached! {
    pub fn int64_type() -> TypeDescriptor {
        TypeDescriptor::builder(INT64)
            .base(value_type())
            .method(compare_to("int CompareTo(long value)"))
            .static_field(MemberTemplate::field("MaxValue").constant(Value::Int(i64::MAX)))
            .static_field(MemberTemplate::field("MinValue").constant(Value::Int(i64::MIN)))
            .static_method(
                MemberTemplate::method("Parse", |_, args| {
                    let text = str_arg(args, 0, "Parse")?;
                    text.trim()
                        .parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| parse_failure("Parse", &text, "Int64"))
                })
                .definition("static long Parse(string s)"),
            )
            .build()
    }
}

cached! {
    pub fn double_type() -> TypeDescriptor {
        TypeDescriptor::builder(DOUBLE)
            .base(value_type())
            .method(compare_to("int CompareTo(double value)"))
            .static_field(MemberTemplate::field("MaxValue").constant(Value::Float(f64::MAX)))
            .static_field(MemberTemplate::field("MinValue").constant(Value::Float(f64::MIN)))
            .static_field(MemberTemplate::field("Epsilon").constant(Value::Float(f64::from_bits(1))))
            .static_method(
                MemberTemplate::method("Parse", |_, args| {
                    let text = str_arg(args, 0, "Parse")?;
                    text.trim()
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| parse_failure("Parse", &text, "Double"))
                })
                .definition("static double Parse(string s)"),
            )
            .static_method(
                MemberTemplate::method("IsNaN", |_, args| {
                    let v = argument(args, 0, "IsNaN")?;
                    Ok(Value::Bool(v.as_float().is_some_and(f64::is_nan)))
                })
                .definition("static bool IsNaN(double d)"),
            )
            .build()
    }
}

fn string_method<F>(name: &'static str, definition: &str, f: F) -> MemberTemplate
where
    F: Fn(&str, &[Value]) -> ShellResult<Value> + Send + Sync + 'static,
{
    MemberTemplate::method(name, move |this, args| f(this_str(this, name)?, args))
        .definition(definition)
}

cached! {
    pub fn string_type() -> TypeDescriptor {
        TypeDescriptor::builder(STRING)
            .property(
                MemberTemplate::property("Length")
                    .get(|this| Ok(Value::from(this_str(this, "Length")?.chars().count())))
                    .definition("int Length {get;}"),
            )
            .method(string_method("ToUpper", "string ToUpper()", |s, _| Ok(s.to_uppercase().into())))
            .method(string_method("ToLower", "string ToLower()", |s, _| Ok(s.to_lowercase().into())))
            .method(string_method("Trim", "string Trim()", |s, _| Ok(s.trim().into())))
            .method(string_method("Contains", "bool Contains(string value)", |s, args| {
                Ok(Value::Bool(s.contains(str_arg(args, 0, "Contains")?.as_str())))
            }))
            .method(string_method("StartsWith", "bool StartsWith(string value)", |s, args| {
                Ok(Value::Bool(s.starts_with(str_arg(args, 0, "StartsWith")?.as_str())))
            }))
            .method(string_method("EndsWith", "bool EndsWith(string value)", |s, args| {
                Ok(Value::Bool(s.ends_with(str_arg(args, 0, "EndsWith")?.as_str())))
            }))
            .method(string_method(
                "Substring",
                "string Substring(int startIndex, int length)",
                |s, args| {
                    let start = char_index(s, int_arg(args, 0, "Substring")?, "Substring")?;
                    let rest: String = s.chars().skip(start).collect();
                    if args.len() < 2 {
                        return Ok(rest.into());
                    }
                    let len = char_index(&rest, int_arg(args, 1, "Substring")?, "Substring")?;
                    Ok(rest.chars().take(len).collect::<String>().into())
                },
            ))
            .method(string_method("Split", "string[] Split(string separator)", |s, args| {
                let parts: Vec<Value> = match args.first() {
                    Some(sep) => {
                        let sep = sep.to_string();
                        if sep.is_empty() {
                            vec![Value::from(s)]
                        } else {
                            s.split(sep.as_str()).map(Value::from).collect()
                        }
                    }
                    None => s.split_whitespace().map(Value::from).collect(),
                };
                Ok(Value::Array(parts))
            }))
            .method(string_method(
                "Replace",
                "string Replace(string oldValue, string newValue)",
                |s, args| {
                    let old = str_arg(args, 0, "Replace")?;
                    let new = str_arg(args, 1, "Replace")?;
                    if old.is_empty() {
                        return Err(ShellError::member("Replace", "oldValue cannot be empty"));
                    }
                    Ok(s.replace(&old, &new).into())
                },
            ))
            .method(string_method("IndexOf", "int IndexOf(string value)", |s, args| {
                let needle = str_arg(args, 0, "IndexOf")?;
                let index = s
                    .find(needle.as_str())
                    .map(|byte| s[..byte].chars().count() as i64)
                    .unwrap_or(-1);
                Ok(Value::Int(index))
            }))
            .static_field(MemberTemplate::field("Empty").constant(Value::from("")))
            .static_method(
                MemberTemplate::method("IsNullOrEmpty", |_, args| {
                    let empty = match args.first().map(Value::unwrapped) {
                        None | Some(Value::Null) => true,
                        Some(Value::String(s)) => s.is_empty(),
                        Some(_) => false,
                    };
                    Ok(Value::Bool(empty))
                })
                .definition("static bool IsNullOrEmpty(string value)"),
            )
            .static_method(
                MemberTemplate::method("Join", |_, args| {
                    let sep = str_arg(args, 0, "Join")?;
                    let parts: Vec<String> = match args.get(1).map(Value::unwrapped) {
                        Some(Value::Array(items)) => items.iter().map(Value::to_string).collect(),
                        _ => args[1..].iter().map(Value::to_string).collect(),
                    };
                    Ok(parts.join(&sep).into())
                })
                .definition("static string Join(string separator, object[] values)"),
            )
            .static_method(
                MemberTemplate::method("Concat", |_, args| {
                    Ok(args.iter().map(Value::to_string).collect::<String>().into())
                })
                .definition("static string Concat(object[] args)"),
            )
            .build()
    }
}

cached! {
    fn enumerable_interface() -> InterfaceDescriptor {
        InterfaceDescriptor::builder("objsh.IEnumerable").build()
    }
}

cached! {
    fn collection_interface() -> InterfaceDescriptor {
        InterfaceDescriptor::builder("objsh.ICollection")
            .extends(enumerable_interface())
            .property(
                MemberTemplate::property("Count")
                    .get(|this| Ok(Value::from(this_array(this, "Count")?.len())))
                    .definition("int Count {get;}"),
            )
            .property(
                MemberTemplate::property("IsSynchronized")
                    .get(|_| Ok(Value::Bool(false)))
                    .definition("bool IsSynchronized {get;}"),
            )
            .build()
    }
}

cached! {
    fn list_interface() -> InterfaceDescriptor {
        InterfaceDescriptor::builder("objsh.IList")
            .extends(collection_interface())
            .property(
                MemberTemplate::property("IsFixedSize")
                    .get(|_| Ok(Value::Bool(true)))
                    .definition("bool IsFixedSize {get;}"),
            )
            .property(
                MemberTemplate::property("IsReadOnly")
                    .get(|_| Ok(Value::Bool(false)))
                    .definition("bool IsReadOnly {get;}"),
            )
            .build()
    }
}

cached! {
    pub fn array_type() -> TypeDescriptor {
        TypeDescriptor::builder(ARRAY)
            .implements(list_interface())
            .property(
                MemberTemplate::property("Length")
                    .get(|this| Ok(Value::from(this_array(this, "Length")?.len())))
                    .definition("int Length {get;}"),
            )
            .property(
                MemberTemplate::property("Rank")
                    .get(|_| Ok(Value::Int(1)))
                    .definition("int Rank {get;}"),
            )
            .method(
                MemberTemplate::method("GetValue", |this, args| {
                    let items = this_array(this, "GetValue")?;
                    let index = int_arg(args, 0, "GetValue")?;
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| items.get(i))
                        .cloned()
                        .ok_or_else(|| ShellError::member("GetValue", format!("index {index} is out of range")))
                })
                .definition("object GetValue(long index)"),
            )
            .method(
                MemberTemplate::method("Clone", |this, _| {
                    Ok(Value::Array(this_array(this, "Clone")?.to_vec()))
                })
                .definition("object Clone()"),
            )
            .static_method(
                MemberTemplate::method("IndexOf", |_, args| {
                    let items = argument(args, 0, "IndexOf")?
                        .as_array()
                        .ok_or_else(|| ShellError::member("IndexOf", "argument 0 is not an array"))?;
                    let needle = argument(args, 1, "IndexOf")?;
                    let index = items
                        .iter()
                        .position(|item| item == needle)
                        .map_or(-1, |i| i as i64);
                    Ok(Value::Int(index))
                })
                .definition("static int IndexOf(array array, object value)"),
            )
            .build()
    }
}

cached! {
    pub fn type_type() -> TypeDescriptor {
        TypeDescriptor::builder(TYPE)
            .property(
                MemberTemplate::property("Name")
                    .get(|this| Ok(this_type(this, "Name")?.name().into()))
                    .definition("string Name {get;}"),
            )
            .property(
                MemberTemplate::property("FullName")
                    .get(|this| Ok(this_type(this, "FullName")?.full_name().into()))
                    .definition("string FullName {get;}"),
            )
            .property(
                MemberTemplate::property("Namespace")
                    .get(|this| Ok(this_type(this, "Namespace")?.namespace().into()))
                    .definition("string Namespace {get;}"),
            )
            .property(
                MemberTemplate::property("BaseType")
                    .get(|this| Ok(this_type(this, "BaseType")?.base().cloned().into()))
                    .definition("type BaseType {get;}"),
            )
            .method(
                MemberTemplate::method("GetInterfaces", |this, _| {
                    let t = this_type(this, "GetInterfaces")?;
                    Ok(Value::Array(
                        t.all_interfaces()
                            .iter()
                            .map(|i| Value::from(i.name()))
                            .collect(),
                    ))
                })
                .definition("string[] GetInterfaces()"),
            )
            .build()
    }
}
