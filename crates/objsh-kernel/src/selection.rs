//! Variable selection by name, include and exclude patterns.
//!
//! Shared by every command that addresses variables by name so they all
//! filter the same way.

use objsh_types::{Record, ShellError, ShellResult};

use crate::scope::{Scope, Variable};
use crate::wildcard::WildcardPattern;

/// Name/include/exclude filter over a [`Scope`].
///
/// All patterns fold case. `None` means "no filter" for that stage.
#[derive(Debug, Clone, Default)]
pub struct VariableSelection {
    pub names: Option<Vec<String>>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

fn compile(patterns: &[String]) -> Vec<WildcardPattern> {
    patterns.iter().map(|p| WildcardPattern::ignore_case(p)).collect()
}

fn any_match(patterns: &[WildcardPattern], name: &str) -> bool {
    patterns.iter().any(|p| p.is_match(name))
}

impl VariableSelection {
    pub fn new(
        names: Option<Vec<String>>,
        include: Option<Vec<String>>,
        exclude: Option<Vec<String>>,
    ) -> Self {
        Self {
            names,
            include,
            exclude,
        }
    }

    /// Records of the selected variables, in scope order.
    pub fn select(&self, scope: &Scope) -> Vec<Record> {
        let names = self.names.as_deref().map(compile);
        let include = self.include.as_deref().map(compile);
        let exclude = self.exclude.as_deref().map(compile);

        scope
            .records()
            .filter(|record| {
                let Some(name) = record.with(|v: &Variable| v.name.clone()) else {
                    return false;
                };
                names.as_deref().map_or(true, |p| any_match(p, &name))
                    && include.as_deref().map_or(true, |p| any_match(p, &name))
                    && !exclude.as_deref().is_some_and(|p| any_match(p, &name))
            })
            .cloned()
            .collect()
    }

    /// Literal names (no wildcard) that selected nothing.
    pub fn missing(&self, selected: &[Record]) -> Vec<String> {
        let Some(names) = &self.names else {
            return Vec::new();
        };
        names
            .iter()
            .filter(|name| !WildcardPattern::contains_wildcard(name))
            .filter(|name| {
                !selected.iter().any(|r| {
                    r.with(|v: &Variable| v.name.eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect()
    }

    /// Run `action` on each selected variable, then `on_missing` on each
    /// literal name that matched nothing.
    pub fn process<A, M>(&self, scope: &Scope, mut action: A, mut on_missing: M) -> ShellResult<()>
    where
        A: FnMut(&Record) -> ShellResult<()>,
        M: FnMut(&str) -> ShellResult<()>,
    {
        let selected = self.select(scope);
        for record in &selected {
            action(record)?;
        }
        for name in self.missing(&selected) {
            tracing::debug!(variable = %name, "variable not found");
            on_missing(&name)?;
        }
        Ok(())
    }

    /// Like [`process`](Self::process), failing on the first missing name.
    pub fn process_strict<A>(&self, scope: &Scope, action: A) -> ShellResult<()>
    where
        A: FnMut(&Record) -> ShellResult<()>,
    {
        self.process(scope, action, missing_variable)
    }
}

/// Default missing-name handler.
pub fn missing_variable(name: &str) -> ShellResult<()> {
    Err(ShellError::VariableNotFound(name.to_string()))
}
