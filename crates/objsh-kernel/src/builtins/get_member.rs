//! get-member — Describe the members of pipeline objects.
//!
//! Members are reported once per distinct type, in discovery order:
//! methods, then properties, then note properties of the first instance.

use std::collections::HashSet;

use async_trait::async_trait;
use objsh_types::builtin;
use objsh_types::{Adaptable, MemberInfo, MemberTemplate, ShellObject, ShellResult, TypeDescriptor, Value};

use crate::binder::BoundParameters;
use crate::commands::{Command, CommandSchema, ParamSpec, ParamType};
use crate::context::ExecContext;
use crate::scheduler::StageIo;
use crate::wildcard::WildcardPattern;

/// One row of get-member output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDefinition {
    pub name: String,
    pub member_type: String,
    pub type_name: String,
    pub definition: String,
}

impl MemberDefinition {
    fn from_member(type_name: &str, member: &MemberInfo) -> Self {
        Self {
            name: member.name().to_string(),
            member_type: member.kind().to_string(),
            type_name: type_name.to_string(),
            definition: member.definition(),
        }
    }
}

impl Adaptable for MemberDefinition {
    fn describe() -> TypeDescriptor {
        let text = |name: &'static str, f: fn(&MemberDefinition) -> &str| {
            MemberTemplate::property(name)
                .record_getter(move |m: &MemberDefinition| Value::from(f(m)))
                .definition(format!("string {name} {{get;}}"))
        };
        TypeDescriptor::builder("objsh.MemberDefinition")
            .property(text("Name", |m| &m.name))
            .property(text("MemberType", |m| &m.member_type))
            .property(text("TypeName", |m| &m.type_name))
            .property(text("Definition", |m| &m.definition))
            .build()
    }

    fn render(&self) -> Option<String> {
        Some(self.definition.clone())
    }
}

/// Get-member: emits a [`MemberDefinition`] per member of each input type.
pub struct GetMember;

#[async_trait]
impl Command for GetMember {
    fn name(&self) -> &str {
        "get-member"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("get-member", "Get the properties and methods of objects")
            .param(
                ParamSpec::new("Name", ParamType::StringArray)
                    .at(0)
                    .describe("Member names or wildcard patterns"),
            )
            .param(ParamSpec::switch("Static").describe("Report static members of the type"))
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, _ctx: &mut ExecContext) -> ShellResult<()> {
        let patterns: Option<Vec<WildcardPattern>> = params
            .strings("Name")
            .map(|names| names.iter().map(|n| WildcardPattern::ignore_case(n)).collect());
        let statics = params.switch("Static");
        let mut seen = HashSet::new();

        while let Some(item) = io.input.next().await {
            let type_name = type_name(&item, statics);
            if !seen.insert(type_name.to_lowercase()) {
                continue;
            }
            for member in members(&item, statics) {
                let wanted = patterns
                    .as_deref()
                    .map_or(true, |p| p.iter().any(|p| p.is_match(member.name())));
                if wanted {
                    let row = MemberDefinition::from_member(&type_name, &member);
                    io.output.write(Value::record(row)).await?;
                }
            }
        }
        Ok(())
    }
}

fn type_name(item: &ShellObject, statics: bool) -> String {
    match item.base_object() {
        Value::Type(t) if statics => t.full_name().to_string(),
        _ => item
            .type_names()
            .first()
            .cloned()
            .unwrap_or_else(|| builtin::OBJECT.to_string()),
    }
}

fn members(item: &ShellObject, statics: bool) -> Vec<MemberInfo> {
    if statics {
        return item.static_members().to_vec();
    }
    let mut all = item.members().to_vec();
    all.extend(item.extensions().to_vec());
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::commands::CommandArgs;
    use crate::runspace::Runspace;
    use crate::scheduler::PipelineInput;

    async fn get_member(args: CommandArgs, input: Vec<Value>) -> Vec<MemberDefinition> {
        let rs = Arc::new(Runspace::transient());
        let out = rs.invoke("get-member", &args, PipelineInput::Items(input)).await.unwrap();
        out.iter()
            .map(|o| match o.base_object() {
                Value::Record(r) => r.with(|m: &MemberDefinition| m.clone()).unwrap(),
                other => panic!("unexpected output {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_members_reported_once_per_type() {
        let rows = get_member(CommandArgs::new(), vec![Value::from("a"), Value::from("b")]).await;
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.type_name == builtin::STRING));
        let lengths = rows.iter().filter(|r| r.name == "Length").count();
        assert_eq!(lengths, 1);
    }

    #[tokio::test]
    async fn test_name_filter_uses_wildcards() {
        let rows = get_member(CommandArgs::new().arg("to*"), vec![Value::Int(3)]).await;
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ToString"]);
        assert_eq!(rows[0].member_type, "Method");
    }

    #[tokio::test]
    async fn test_static_members_of_type_value() {
        let input = vec![Value::Type(builtin::int64_type())];
        let rows = get_member(CommandArgs::new().switch("Static"), input).await;
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Parse", "MaxValue", "MinValue"]);
        assert!(rows.iter().all(|r| r.type_name == builtin::INT64));
    }

    #[tokio::test]
    async fn test_note_properties_are_listed() {
        let obj = ShellObject::new(Value::Int(1)).unwrap();
        obj.set_note("Origin", Value::from("test"));
        let rows = get_member(CommandArgs::new().arg("Origin"), vec![Value::Object(obj)]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member_type, "NoteProperty");
    }
}
