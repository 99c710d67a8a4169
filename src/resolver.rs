//! Scope resolution: turns a parsed [`Unit`] into the per-domain map
//! handed to the routing layer.
//!
//! Each block becomes a [`Scope`] that points back at its enclosing scope.
//! A scope is finalised (inherited entries merged, `$name` references
//! substituted) before any of its children are built, so a child only
//! ever reads a finished parent.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::ast::{
    BlockKind, CallExpression, DomainBlock, LocationBlock, LocationPattern, SimpleRule, Statement,
    Unit, VariableDeclaration, VariableValue,
};
use crate::config::CompilerConfig;

/// A resolved variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    /// Text inserted where the variable is referenced. Lists are joined
    /// with single spaces.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::List(items) => items.join(" "),
        }
    }
}

impl From<&VariableValue> for Value {
    fn from(value: &VariableValue) -> Self {
        match value {
            VariableValue::Scalar(token) => Self::Scalar(token.value.clone()),
            VariableValue::List(tokens) => {
                Self::List(tokens.iter().map(|t| t.value.clone()).collect())
            }
        }
    }
}

/// Variable bindings of one scope, keyed by name including the `$`.
pub type Variables = BTreeMap<String, Value>;

/// A directive with its arguments reduced to plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDirective {
    pub directive: String,
    pub arguments: Vec<String>,
}

impl From<&CallExpression> for ResolvedDirective {
    fn from(call: &CallExpression) -> Self {
        Self {
            directive: call.directive.clone(),
            arguments: call.arguments.iter().map(|t| t.value.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub location: LocationPattern,
    /// Synthesised from a `source => target` shorthand.
    pub is_base_rule: bool,
    pub directives: Vec<ResolvedDirective>,
    pub variables: Variables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDomain {
    pub domain: String,
    pub directives: Vec<ResolvedDirective>,
    pub variables: Variables,
    pub locations: Vec<ResolvedLocation>,
}

impl ResolvedDomain {
    /// Fold a second definition of the same host into this one.
    fn absorb(&mut self, other: Self) {
        for (name, value) in other.variables {
            self.variables.entry(name).or_insert(value);
        }

        let known: HashSet<String> = self
            .directives
            .iter()
            .map(|d| d.directive.clone())
            .collect();
        self.directives.extend(
            other
                .directives
                .into_iter()
                .filter(|d| !known.contains(&d.directive)),
        );

        self.locations.extend(other.locations);
    }
}

/// The compiled output: one entry per host name.
pub type ResolvedConfig = BTreeMap<String, ResolvedDomain>;

/// Resolve a unit with the default configuration.
#[must_use]
pub fn resolve(unit: &Unit) -> ResolvedConfig {
    Resolver::default().resolve(unit)
}

/// Replace every `$name` reference in `text`.
///
/// Longer names are replaced first so `$a` never eats the front of
/// `$abc`. Unknown names are left as they are.
#[must_use]
pub fn substitute_str(text: &str, bindings: &Variables) -> String {
    let mut ordered: Vec<(&String, &Value)> =
        bindings.iter().filter(|(name, _)| !name.is_empty()).collect();
    ordered.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    ordered
        .into_iter()
        .fold(text.to_string(), |acc, (name, value)| {
            if acc.contains(name.as_str()) {
                acc.replace(name.as_str(), &value.to_text())
            } else {
                acc
            }
        })
}

/// Substitute inside a scalar or every item of a list.
#[must_use]
pub fn substitute(value: &Value, bindings: &Variables) -> Value {
    match value {
        Value::Scalar(s) => Value::Scalar(substitute_str(s, bindings)),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| substitute_str(item, bindings))
                .collect(),
        ),
    }
}

/// Substitute inside every value of a keyed map, leaving the entries
/// named in `exclude` untouched.
#[must_use]
pub fn substitute_map(map: &Variables, bindings: &Variables, exclude: &[&str]) -> Variables {
    map.iter()
        .map(|(key, value)| {
            let value = if exclude.contains(&key.as_str()) {
                value.clone()
            } else {
                substitute(value, bindings)
            };
            (key.clone(), value)
        })
        .collect()
}

/// Variables and directives of one block, layered over its parent.
#[derive(Debug, Default)]
pub struct Scope<'p> {
    variables: Variables,
    /// Local directives as written; children inherit these unsubstituted.
    directives: Vec<ResolvedDirective>,
    /// Inherited plus local directives, filled by `merge_inheritance`.
    resolved: Vec<ResolvedDirective>,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(parent: &'p Scope<'p>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Bind a variable. The value sees only bindings made earlier in
    /// this same scope; a repeated name overwrites the earlier binding.
    pub fn declare(&mut self, id: impl Into<String>, value: &Value) {
        let value = substitute(value, &self.variables);
        self.variables.insert(id.into(), value);
    }

    pub fn push_directive(&mut self, directive: ResolvedDirective) {
        self.directives.push(directive);
    }

    /// Find a binding here or in any enclosing scope.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.variables
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }

    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Directives declared in this block, before substitution.
    #[must_use]
    pub fn directives(&self) -> &[ResolvedDirective] {
        &self.directives
    }

    /// The merged directive list. Empty until `merge_inheritance` runs.
    #[must_use]
    pub fn resolved_directives(&self) -> &[ResolvedDirective] {
        &self.resolved
    }

    /// Every binding visible here; local names win over inherited ones.
    #[must_use]
    pub fn effective_variables(&self) -> Variables {
        let mut merged = self
            .parent
            .map(Scope::effective_variables)
            .unwrap_or_default();
        merged.extend(
            self.variables
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        merged
    }

    /// Inherited directives not redefined locally, followed by the local
    /// ones. Arguments are returned as written.
    #[must_use]
    pub fn effective_directives(&self) -> Vec<ResolvedDirective> {
        let local: HashSet<&str> = self
            .directives
            .iter()
            .map(|d| d.directive.as_str())
            .collect();

        let mut merged: Vec<ResolvedDirective> = self
            .parent
            .map(Scope::effective_directives)
            .unwrap_or_default()
            .into_iter()
            .filter(|d| !local.contains(d.directive.as_str()))
            .collect();
        merged.extend(self.directives.iter().cloned());
        merged
    }

    /// Pull in inherited entries, then substitute this scope's values and
    /// every directive argument, inherited ones included, against the
    /// complete variable set.
    pub fn merge_inheritance(&mut self) {
        let variables = self.effective_variables();
        self.variables = substitute_map(&variables, &variables, &[]);

        self.resolved = self
            .effective_directives()
            .into_iter()
            .map(|d| ResolvedDirective {
                arguments: d
                    .arguments
                    .iter()
                    .map(|arg| substitute_str(arg, &self.variables))
                    .collect(),
                directive: d.directive,
            })
            .collect();
    }

    fn into_parts(self) -> (Variables, Vec<ResolvedDirective>) {
        (self.variables, self.resolved)
    }
}

/// A shorthand rule with references already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BaseRule {
    source: String,
    target: String,
}

/// A domain before it is split per host name.
#[derive(Debug)]
struct PendingDomain {
    names: Vec<String>,
    directives: Vec<ResolvedDirective>,
    variables: Variables,
    locations: Vec<ResolvedLocation>,
}

/// Blocks and rules found while walking one body, handled after the
/// body's own scope is finalised.
#[derive(Default)]
struct Nested<'u> {
    domains: Vec<&'u DomainBlock>,
    locations: Vec<&'u LocationBlock>,
    rules: Vec<&'u SimpleRule>,
}

/// Resolves parsed units into [`ResolvedConfig`] maps.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: CompilerConfig,
}

impl Resolver {
    #[must_use]
    pub const fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn resolve(&self, unit: &Unit) -> ResolvedConfig {
        let mut pending_rules = Vec::new();

        let mut global = Scope::root();
        let nested = walk_scope(&unit.body, &mut global);
        global.merge_inheritance();
        collect_rules(&nested.rules, &global, &mut pending_rules);
        warn_misplaced(&unit.body, BlockKind::Global);

        let mut domains: Vec<PendingDomain> = nested
            .domains
            .iter()
            .map(|block| self.resolve_domain(block, &global, &mut pending_rules))
            .collect();

        domains.extend(pending_rules.iter().map(|rule| self.expand_base_rule(rule)));

        flatten(domains)
    }

    fn resolve_domain(
        &self,
        block: &DomainBlock,
        global: &Scope<'_>,
        pending_rules: &mut Vec<BaseRule>,
    ) -> PendingDomain {
        let mut scope = Scope::child(global);
        let nested = walk_scope(&block.body, &mut scope);
        scope.merge_inheritance();
        collect_rules(&nested.rules, &scope, pending_rules);
        warn_misplaced(&block.body, BlockKind::Domain);

        let names = block
            .domains
            .iter()
            .map(|name| substitute_str(name, scope.variables()))
            .collect();

        let locations = nested
            .locations
            .iter()
            .map(|location| Self::resolve_location(location, &scope, pending_rules))
            .collect();

        let (variables, directives) = scope.into_parts();
        tracing::debug!(?names, "resolved domain");

        PendingDomain {
            names,
            directives,
            variables,
            locations,
        }
    }

    fn resolve_location(
        block: &LocationBlock,
        domain: &Scope<'_>,
        pending_rules: &mut Vec<BaseRule>,
    ) -> ResolvedLocation {
        let mut scope = Scope::child(domain);
        let nested = walk_scope(&block.body, &mut scope);
        scope.merge_inheritance();
        collect_rules(&nested.rules, &scope, pending_rules);
        warn_misplaced(&block.body, BlockKind::Location);

        let location = match &block.location {
            LocationPattern::Path(path) => {
                LocationPattern::Path(substitute_str(path, scope.variables()))
            }
            pattern @ LocationPattern::Regex(_) => pattern.clone(),
        };

        let (variables, directives) = scope.into_parts();

        ResolvedLocation {
            location,
            is_base_rule: false,
            directives,
            variables,
        }
    }

    /// `scheme://host/path => target` becomes a domain `host` with one
    /// location `/path` whose passthrough variable is `target`.
    fn expand_base_rule(&self, rule: &BaseRule) -> PendingDomain {
        let rest = rule
            .source
            .split_once("//")
            .map_or(rule.source.as_str(), |(_, rest)| rest);
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));

        if host.is_empty() {
            tracing::warn!(source = %rule.source, "base rule has no host");
        }

        let mut variables = Variables::new();
        variables.insert(
            self.config.passthrough_directive.clone(),
            Value::Scalar(rule.target.clone()),
        );

        PendingDomain {
            names: vec![host.to_string()],
            directives: Vec::new(),
            variables: Variables::new(),
            locations: vec![ResolvedLocation {
                location: LocationPattern::Path(format!("/{path}")),
                is_base_rule: true,
                directives: Vec::new(),
                variables,
            }],
        }
    }
}

fn walk_scope<'u>(body: &'u [Statement], scope: &mut Scope<'_>) -> Nested<'u> {
    let mut nested = Nested::default();

    for statement in body {
        match statement {
            Statement::Rule(rule) => nested.rules.push(rule),
            Statement::Call(call) => scope.push_directive(call.into()),
            Statement::Variable(VariableDeclaration { id, value }) => {
                scope.declare(id.clone(), &Value::from(value));
            }
            Statement::Domain(block) => nested.domains.push(block),
            Statement::Location(block) => nested.locations.push(block),
        }
    }

    nested
}

fn collect_rules(rules: &[&SimpleRule], scope: &Scope<'_>, out: &mut Vec<BaseRule>) {
    out.extend(rules.iter().map(|rule| BaseRule {
        source: substitute_str(&rule.left.value, scope.variables()),
        target: substitute_str(&rule.right.value, scope.variables()),
    }));
}

/// Warn about blocks that may not open directly inside `scope`. Such
/// blocks are skipped.
fn warn_misplaced(body: &[Statement], scope: BlockKind) {
    let count = body
        .iter()
        .filter_map(Statement::block_kind)
        .filter(|kind| kind.parent() != Some(scope))
        .count();
    if count > 0 {
        tracing::warn!(count, %scope, "ignoring blocks nested at the wrong depth");
    }
}

/// Key the domains by host name, copying multi-host domains once per
/// host and merging repeated hosts.
fn flatten(domains: Vec<PendingDomain>) -> ResolvedConfig {
    let mut out = ResolvedConfig::new();

    for pending in domains {
        for name in &pending.names {
            let domain = ResolvedDomain {
                domain: name.clone(),
                directives: pending.directives.clone(),
                variables: pending.variables.clone(),
                locations: pending.locations.clone(),
            };

            match out.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(domain);
                }
                Entry::Occupied(mut slot) => {
                    tracing::debug!(domain = %name, "merging repeated domain");
                    slot.get_mut().absorb(domain);
                }
            }
        }
    }

    out
}
