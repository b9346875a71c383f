//! Syntax facts: the declarations, imports, calls, instantiations and assignments
//! of one source file, pulled out of a tree-sitter parse.
//!
//! Facts are pattern matches over the syntax tree. Nothing here resolves names
//! across files or looks at types.

use crate::error::Result;
use crate::language::SyntaxLanguage;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Parser};

const MAX_DEPTH: usize = 400;
const MAX_CALLEE_LEN: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Function,
    Class,
    Interface,
    Type,
    Variable,
    Module,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Module => "module",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub start: usize,
    pub end: usize,
    pub exported: bool,
    pub returns_jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFact {
    pub source: String,
    pub names: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFact {
    /// Callee text with argument lists stripped, e.g. `db.prepare.get`.
    pub callee: String,
    pub line: usize,
    /// Name of the innermost named function around the call.
    pub enclosing: Option<String>,
    /// First argument when it is a plain string literal.
    pub first_arg: Option<String>,
    /// Function this call decorates (Python decorators).
    pub decorates: Option<String>,
}

impl CallFact {
    /// Last segment of the callee (`db.prepare.get` -> `get`).
    pub fn short_name(&self) -> &str {
        last_segment(&self.callee)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFact {
    pub class: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignFact {
    pub target: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxFacts {
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportFact>,
    pub calls: Vec<CallFact>,
    pub news: Vec<NewFact>,
    pub assigns: Vec<AssignFact>,
}

impl SyntaxFacts {
    pub fn exported(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|decl| decl.exported)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
            && self.imports.is_empty()
            && self.calls.is_empty()
            && self.news.is_empty()
            && self.assigns.is_empty()
    }
}

/// Parses files and extracts [`SyntaxFacts`], reusing one parser per language.
#[derive(Default)]
pub struct FactExtractor {
    parsers: HashMap<SyntaxLanguage, Parser>,
}

impl FactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(None)` when the file's language has no grammar.
    pub fn extract(&mut self, path: &str, source: &str) -> Result<Option<SyntaxFacts>> {
        let Some(language) = SyntaxLanguage::from_path(path) else {
            return Ok(None);
        };
        let parser = match self.parsers.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(language.parser()?),
        };
        let Some(tree) = parser.parse(source, None) else {
            log::debug!("No syntax tree for {path}");
            return Ok(Some(SyntaxFacts::default()));
        };

        let mut walker = Walker {
            source: source.as_bytes(),
            language,
            facts: SyntaxFacts::default(),
            reexports: Vec::new(),
        };
        walker.visit_children(tree.root_node(), Scope::root());
        Ok(Some(walker.finish()))
    }
}

#[derive(Clone, Copy)]
struct Scope<'s> {
    enclosing: Option<&'s str>,
    exported: bool,
    top_level: bool,
    depth: usize,
}

impl<'s> Scope<'s> {
    fn root() -> Self {
        Self {
            enclosing: None,
            exported: false,
            top_level: true,
            depth: 0,
        }
    }

    fn nested(self) -> Self {
        Self {
            exported: false,
            top_level: false,
            depth: self.depth + 1,
            ..self
        }
    }

    fn enter(self, name: &'s str) -> Self {
        Self {
            enclosing: Some(name),
            ..self.nested()
        }
    }

    fn exporting(self) -> Self {
        Self {
            exported: true,
            depth: self.depth + 1,
            ..self
        }
    }
}

#[derive(Clone, Copy)]
enum ExportRule {
    /// `export` keyword seen by the caller.
    Scope,
    /// Module-level name without a leading underscore.
    PublicName,
    /// Item carries a `pub` visibility modifier.
    Visibility,
}

struct Walker<'s> {
    source: &'s [u8],
    language: SyntaxLanguage,
    facts: SyntaxFacts,
    reexports: Vec<(String, usize)>,
}

impl<'s> Walker<'s> {
    fn finish(mut self) -> SyntaxFacts {
        let mut seen: HashSet<String> = HashSet::new();
        for (name, line) in std::mem::take(&mut self.reexports) {
            let mut found = false;
            for decl in self.facts.declarations.iter_mut().filter(|d| d.name == name) {
                decl.exported = true;
                found = true;
            }
            if !found && seen.insert(name.clone()) {
                self.facts.declarations.push(Declaration {
                    name,
                    kind: DeclKind::Variable,
                    start: line,
                    end: line,
                    exported: true,
                    returns_jsx: false,
                });
            }
        }
        self.facts
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn string_value(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" | "string_literal" | "raw_string_literal" => {}
            "template_string" => {
                let mut cursor = node.walk();
                let interpolated = node
                    .named_children(&mut cursor)
                    .any(|child| child.kind() == "template_substitution");
                if interpolated {
                    return None;
                }
            }
            _ => return None,
        }
        let raw = self.text(node);
        let value = raw
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '#'));
        Some(value.to_string())
    }

    fn visit_children(&mut self, node: Node<'_>, scope: Scope<'s>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, scope);
        }
    }

    fn visit(&mut self, node: Node<'_>, scope: Scope<'s>) {
        if scope.depth > MAX_DEPTH {
            return;
        }
        match self.language {
            SyntaxLanguage::TypeScript | SyntaxLanguage::Tsx | SyntaxLanguage::JavaScript => {
                self.visit_ecma(node, scope)
            }
            SyntaxLanguage::Python => self.visit_python(node, scope),
            SyntaxLanguage::Rust => self.visit_rust(node, scope),
        }
    }

    fn declare(
        &mut self,
        node: Node<'_>,
        kind: DeclKind,
        scope: Scope<'s>,
        rule: ExportRule,
    ) -> Option<&'s str> {
        let name = self.text(node.child_by_field_name("name")?);
        if name.is_empty() {
            return None;
        }
        let exported = match rule {
            ExportRule::Scope => scope.exported,
            ExportRule::PublicName => scope.top_level && !name.starts_with('_'),
            ExportRule::Visibility => has_child_kind(node, "visibility_modifier"),
        };
        let returns_jsx = self.language.is_ecmascript()
            && matches!(kind, DeclKind::Function | DeclKind::Class)
            && contains_jsx(node);
        self.facts.declarations.push(Declaration {
            name: name.to_string(),
            kind,
            start: start_line(node),
            end: end_line(node),
            exported,
            returns_jsx,
        });
        Some(name)
    }

    fn declare_and_descend(
        &mut self,
        node: Node<'_>,
        kind: DeclKind,
        scope: Scope<'s>,
        rule: ExportRule,
    ) {
        match self.declare(node, kind, scope, rule) {
            Some(name) => self.visit_children(node, scope.enter(name)),
            None => self.visit_children(node, scope.nested()),
        }
    }

    fn push_call(
        &mut self,
        node: Node<'_>,
        function: Node<'_>,
        scope: Scope<'s>,
        decorates: Option<&str>,
    ) -> String {
        let callee = normalize_callee(self.text(function));
        let first_arg = node
            .child_by_field_name("arguments")
            .and_then(|args| args.named_child(0))
            .and_then(|arg| self.string_value(arg));
        self.facts.calls.push(CallFact {
            callee: callee.clone(),
            line: start_line(node),
            enclosing: scope.enclosing.map(str::to_string),
            first_arg,
            decorates: decorates.map(str::to_string),
        });
        callee
    }

    // ---- JavaScript / TypeScript ----

    fn visit_ecma(&mut self, node: Node<'_>, scope: Scope<'s>) {
        match node.kind() {
            "import_statement" => self.ecma_import(node),
            "export_statement" => self.ecma_export(node, scope),
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                self.declare_and_descend(node, DeclKind::Function, scope, ExportRule::Scope)
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.declare_and_descend(node, DeclKind::Class, scope, ExportRule::Scope)
            }
            "interface_declaration" => {
                self.declare_and_descend(node, DeclKind::Interface, scope, ExportRule::Scope)
            }
            "type_alias_declaration" | "enum_declaration" => {
                self.declare_and_descend(node, DeclKind::Type, scope, ExportRule::Scope)
            }
            "method_definition" => {
                let scope = Scope {
                    exported: false,
                    ..scope
                };
                self.declare_and_descend(node, DeclKind::Function, scope, ExportRule::Scope)
            }
            "lexical_declaration" | "variable_declaration" => self.ecma_variables(node, scope),
            "call_expression" => self.ecma_call(node, scope),
            "new_expression" => {
                if let Some(ctor) = node.child_by_field_name("constructor") {
                    self.facts.news.push(NewFact {
                        class: normalize_callee(self.text(ctor)),
                        line: start_line(node),
                    });
                }
                self.visit_children(node, scope.nested())
            }
            "assignment_expression" | "augmented_assignment_expression" => {
                self.ecma_assign(node, scope)
            }
            "expression_statement" => self.visit_children(node, scope),
            _ => self.visit_children(node, scope.nested()),
        }
    }

    fn ecma_import(&mut self, node: Node<'_>) {
        let Some(source) = node
            .child_by_field_name("source")
            .and_then(|s| self.string_value(s))
        else {
            return;
        };
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor) {
            if clause.kind() == "import_clause" {
                self.collect_import_names(clause, &mut names);
            }
        }
        self.facts.imports.push(ImportFact {
            source,
            names,
            line: start_line(node),
        });
    }

    fn collect_import_names(&self, clause: Node<'_>, names: &mut Vec<String>) {
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => names.push(self.text(child).to_string()),
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if let Some(name) = spec.child_by_field_name("name") {
                            names.push(self.text(name).to_string());
                        }
                    }
                }
                "namespace_import" => {
                    let mut inner = child.walk();
                    for id in child.named_children(&mut inner) {
                        if id.kind() == "identifier" {
                            names.push(self.text(id).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn ecma_export(&mut self, node: Node<'_>, scope: Scope<'s>) {
        if let Some(decl) = node.child_by_field_name("declaration") {
            self.visit(decl, scope.exporting());
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            match value.kind() {
                "identifier" => self
                    .reexports
                    .push((self.text(value).to_string(), start_line(node))),
                "function_expression" | "function" | "arrow_function" | "generator_function"
                | "class" => {
                    let name = value
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or("default");
                    let kind = if value.kind() == "class" {
                        DeclKind::Class
                    } else {
                        DeclKind::Function
                    };
                    self.facts.declarations.push(Declaration {
                        name: name.to_string(),
                        kind,
                        start: start_line(node),
                        end: end_line(node),
                        exported: true,
                        returns_jsx: contains_jsx(value),
                    });
                    self.visit_children(value, scope.enter(name));
                }
                _ => self.visit(value, scope.nested()),
            }
            return;
        }

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "export_clause" {
                continue;
            }
            let mut inner = child.walk();
            for spec in child.named_children(&mut inner) {
                if let Some(name) = spec.child_by_field_name("name") {
                    names.push(self.text(name).to_string());
                }
            }
        }

        // `export { a } from './x'` is both an import edge and an export.
        if let Some(source) = node
            .child_by_field_name("source")
            .and_then(|s| self.string_value(s))
        {
            self.facts.imports.push(ImportFact {
                source,
                names: names.clone(),
                line: start_line(node),
            });
        }
        let line = start_line(node);
        self.reexports
            .extend(names.into_iter().map(|name| (name, line)));
    }

    fn ecma_variables(&mut self, node: Node<'_>, scope: Scope<'s>) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let value = declarator.child_by_field_name("value");
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                if let Some(value) = value {
                    self.visit(value, scope.nested());
                }
                continue;
            }

            let name = self.text(name_node);
            let is_function = value.is_some_and(|v| is_function_node(v.kind()));
            if scope.top_level || scope.exported {
                self.facts.declarations.push(Declaration {
                    name: name.to_string(),
                    kind: if is_function {
                        DeclKind::Function
                    } else {
                        DeclKind::Variable
                    },
                    start: start_line(node),
                    end: end_line(node),
                    exported: scope.exported,
                    returns_jsx: value.is_some_and(contains_jsx),
                });
            }
            if let Some(value) = value {
                self.facts.assigns.push(AssignFact {
                    target: name.to_string(),
                    line: start_line(declarator),
                });
                let inner = if is_function {
                    scope.enter(name)
                } else {
                    scope.nested()
                };
                self.visit(value, inner);
            }
        }
    }

    fn ecma_call(&mut self, node: Node<'_>, scope: Scope<'s>) {
        let Some(function) = node.child_by_field_name("function") else {
            return self.visit_children(node, scope.nested());
        };
        let is_module_load = function.kind() == "import" || self.text(function) == "require";
        if is_module_load {
            let source = node
                .child_by_field_name("arguments")
                .and_then(|args| args.named_child(0))
                .and_then(|arg| self.string_value(arg));
            if let Some(source) = source {
                self.facts.imports.push(ImportFact {
                    source,
                    names: Vec::new(),
                    line: start_line(node),
                });
            }
            return;
        }
        self.push_call(node, function, scope, None);
        self.visit_children(node, scope.nested());
    }

    fn ecma_assign(&mut self, node: Node<'_>, scope: Scope<'s>) {
        let right = node.child_by_field_name("right");
        if let Some(left) = node.child_by_field_name("left") {
            let target = normalize_callee(self.text(left));
            let line = start_line(node);
            if let Some(name) = target
                .strip_prefix("module.exports.")
                .or_else(|| target.strip_prefix("exports."))
            {
                let is_function = right.is_some_and(|r| is_function_node(r.kind()));
                self.facts.declarations.push(Declaration {
                    name: name.to_string(),
                    kind: if is_function {
                        DeclKind::Function
                    } else {
                        DeclKind::Variable
                    },
                    start: line,
                    end: end_line(node),
                    exported: true,
                    returns_jsx: right.is_some_and(contains_jsx),
                });
            } else if target == "module.exports" {
                if let Some(right) = right {
                    self.commonjs_exports(right, line);
                }
            }
            self.facts.assigns.push(AssignFact { target, line });
        }
        if let Some(right) = right {
            self.visit(right, scope.nested());
        }
    }

    fn commonjs_exports(&mut self, right: Node<'_>, line: usize) {
        match right.kind() {
            "identifier" => self.reexports.push((self.text(right).to_string(), line)),
            "object" => {
                let mut cursor = right.walk();
                for child in right.named_children(&mut cursor) {
                    let name = match child.kind() {
                        "shorthand_property_identifier" => Some(self.text(child)),
                        "pair" => child.child_by_field_name("key").map(|k| self.text(k)),
                        _ => None,
                    };
                    if let Some(name) = name {
                        self.reexports.push((name.to_string(), line));
                    }
                }
            }
            _ => {}
        }
    }

    // ---- Python ----

    fn visit_python(&mut self, node: Node<'_>, scope: Scope<'s>) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let module = match child.kind() {
                        "dotted_name" => Some(child),
                        "aliased_import" => child.child_by_field_name("name"),
                        _ => None,
                    };
                    if let Some(module) = module {
                        let source = self.text(module).to_string();
                        let names = vec![last_segment(&source).to_string()];
                        self.facts.imports.push(ImportFact {
                            source,
                            names,
                            line: start_line(node),
                        });
                    }
                }
            }
            "import_from_statement" => {
                let source = node
                    .child_by_field_name("module_name")
                    .map(|m| self.text(m).to_string())
                    .unwrap_or_default();
                let mut names = Vec::new();
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let target = if name.kind() == "aliased_import" {
                        name.child_by_field_name("name").unwrap_or(name)
                    } else {
                        name
                    };
                    names.push(self.text(target).to_string());
                }
                if has_child_kind(node, "wildcard_import") {
                    names.push("*".to_string());
                }
                self.facts.imports.push(ImportFact {
                    source,
                    names,
                    line: start_line(node),
                });
            }
            "function_definition" => {
                self.declare_and_descend(node, DeclKind::Function, scope, ExportRule::PublicName)
            }
            "class_definition" => {
                self.declare_and_descend(node, DeclKind::Class, scope, ExportRule::PublicName)
            }
            "decorated_definition" => {
                let definition = node.child_by_field_name("definition");
                let target = definition
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| self.text(n));
                let mut cursor = node.walk();
                for decorator in node.named_children(&mut cursor) {
                    if decorator.kind() != "decorator" {
                        continue;
                    }
                    let mut inner = decorator.walk();
                    for expr in decorator.named_children(&mut inner) {
                        if expr.kind() == "call" {
                            self.python_call(expr, scope.nested(), target);
                        } else {
                            self.visit(expr, scope.nested());
                        }
                    }
                }
                if let Some(definition) = definition {
                    self.visit(definition, scope);
                }
            }
            "call" => self.python_call(node, scope, None),
            "assignment" | "augmented_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    let target = self.text(left);
                    if scope.top_level && left.kind() == "identifier" {
                        self.facts.declarations.push(Declaration {
                            name: target.to_string(),
                            kind: DeclKind::Variable,
                            start: start_line(node),
                            end: end_line(node),
                            exported: !target.starts_with('_'),
                            returns_jsx: false,
                        });
                    }
                    self.facts.assigns.push(AssignFact {
                        target: normalize_callee(target),
                        line: start_line(node),
                    });
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right, scope.nested());
                }
            }
            "expression_statement" => self.visit_children(node, scope),
            _ => self.visit_children(node, scope.nested()),
        }
    }

    fn python_call(&mut self, node: Node<'_>, scope: Scope<'s>, decorates: Option<&str>) {
        if let Some(function) = node.child_by_field_name("function") {
            let callee = self.push_call(node, function, scope, decorates);
            if last_segment(&callee)
                .chars()
                .next()
                .is_some_and(char::is_uppercase)
            {
                self.facts.news.push(NewFact {
                    class: callee,
                    line: start_line(node),
                });
            }
        }
        self.visit_children(node, scope.nested());
    }

    // ---- Rust ----

    fn visit_rust(&mut self, node: Node<'_>, scope: Scope<'s>) {
        match node.kind() {
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    let (source, names) = split_rust_use(self.text(argument));
                    self.facts.imports.push(ImportFact {
                        source,
                        names,
                        line: start_line(node),
                    });
                }
            }
            "function_item" | "function_signature_item" => {
                self.declare_and_descend(node, DeclKind::Function, scope, ExportRule::Visibility)
            }
            "struct_item" | "enum_item" | "union_item" => {
                self.declare_and_descend(node, DeclKind::Class, scope, ExportRule::Visibility)
            }
            "trait_item" => {
                self.declare_and_descend(node, DeclKind::Interface, scope, ExportRule::Visibility)
            }
            "type_item" => {
                self.declare_and_descend(node, DeclKind::Type, scope, ExportRule::Visibility)
            }
            "mod_item" => {
                self.declare_and_descend(node, DeclKind::Module, scope, ExportRule::Visibility)
            }
            "const_item" | "static_item" => {
                self.declare_and_descend(node, DeclKind::Variable, scope, ExportRule::Visibility)
            }
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let callee = self.push_call(node, function, scope, None);
                    if let Some((ty, ctor)) = callee.rsplit_once("::") {
                        if matches!(ctor, "new" | "default" | "builder") {
                            self.facts.news.push(NewFact {
                                class: ty.to_string(),
                                line: start_line(node),
                            });
                        }
                    }
                }
                self.visit_children(node, scope.nested());
            }
            "struct_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.facts.news.push(NewFact {
                        class: normalize_callee(self.text(name)),
                        line: start_line(node),
                    });
                }
                self.visit_children(node, scope.nested());
            }
            "assignment_expression" | "compound_assignment_expr" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.facts.assigns.push(AssignFact {
                        target: normalize_callee(self.text(left)),
                        line: start_line(node),
                    });
                }
                self.visit_children(node, scope.nested());
            }
            "let_declaration" => {
                let pattern = node.child_by_field_name("pattern");
                if let (Some(pattern), Some(_)) = (pattern, node.child_by_field_name("value")) {
                    if pattern.kind() == "identifier" {
                        self.facts.assigns.push(AssignFact {
                            target: self.text(pattern).to_string(),
                            line: start_line(node),
                        });
                    }
                }
                self.visit_children(node, scope.nested());
            }
            _ => self.visit_children(node, scope.nested()),
        }
    }
}

fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn end_line(node: Node<'_>) -> usize {
    node.end_position().row + 1
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

fn is_function_node(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn contains_jsx(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if matches!(
            current.kind(),
            "jsx_element" | "jsx_self_closing_element" | "jsx_fragment"
        ) {
            return true;
        }
        stack.extend(current.named_children(&mut cursor));
    }
    false
}

fn last_segment(path: &str) -> &str {
    path.rsplit(['.', ':']).next().unwrap_or(path)
}

/// Callee text without argument lists, generics, whitespace or non-null marks.
///
/// `db!.prepare('SELECT 1').get` becomes `db.prepare.get`.
pub(crate) fn normalize_callee(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_CALLEE_LEN));
    let mut parens = 0usize;
    let mut angles = 0usize;
    for c in raw.chars() {
        match c {
            '(' | '[' => parens += 1,
            ')' | ']' => parens = parens.saturating_sub(1),
            _ if parens > 0 => {}
            '<' => angles += 1,
            '>' => angles = angles.saturating_sub(1),
            _ if angles > 0 => {}
            '!' | '?' => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    let out = out.replace("::::", "::");
    if out.chars().count() > MAX_CALLEE_LEN {
        return last_segment(&out).to_string();
    }
    out
}

fn split_rust_use(path: &str) -> (String, Vec<String>) {
    let path = path.trim();
    if let Some((prefix, group)) = path.split_once("::{") {
        let names = group
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '{' || c == '}'))
            .map(|item| item.split(" as ").next().unwrap_or(item).trim())
            .map(|item| item.rsplit("::").next().unwrap_or(item))
            .filter(|item| !item.is_empty() && *item != "self")
            .map(str::to_string)
            .collect();
        return (prefix.to_string(), names);
    }
    let unaliased = path.split(" as ").next().unwrap_or(path).trim();
    match unaliased.rsplit_once("::") {
        Some((source, name)) => (source.to_string(), vec![name.to_string()]),
        None => (unaliased.to_string(), Vec::new()),
    }
}
