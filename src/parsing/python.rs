//! Python structural extractor.
//!
//! Walks a tree-sitter syntax tree once, classifying every node exactly
//! once: unit-defining constructs (classes, functions, methods) become
//! profiles; call expressions are attributed to the nearest enclosing
//! unit's profile without crossing into a nested unit's body (nested units
//! report their own calls). Module-level calls attach to the file profile,
//! class-body calls to the class profile.

use crate::parsing::parser::sanitize_call_name;
use crate::parsing::{Language, LanguageParser};
use crate::{
    EnrichmentRecord, FileId, IndexError, IndexResult, Param, Profile, ProfileId, ProfileKind,
    Range,
};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct PythonParser {
    parser: Parser,
}

impl std::fmt::Debug for PythonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonParser")
            .field("language", &"Python")
            .finish()
    }
}

impl PythonParser {
    pub fn new() -> IndexResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| IndexError::ParserInit(format!("Failed to set Python language: {e}")))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for PythonParser {
    fn extract(
        &mut self,
        source: &str,
        relative_path: &str,
        file_id: FileId,
        counter: &mut u32,
    ) -> IndexResult<Vec<Profile>> {
        let tree = self.parser.parse(source, None).ok_or_else(|| IndexError::Parse {
            path: relative_path.into(),
            reason: "tree-sitter produced no tree".to_string(),
        })?;
        let root = tree.root_node();

        let file_name = Path::new(relative_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(relative_path)
            .to_string();

        let mut collector = UnitCollector {
            source,
            relative_path,
            file_id,
            counter,
            profiles: Vec::new(),
        };

        let file_profile = Profile {
            id: collector.alloc_id(),
            kind: ProfileKind::File,
            name: file_name,
            qualified_name: relative_path.to_string(),
            file_path: relative_path.to_string(),
            file_id: Some(file_id),
            range: Range::new(
                1,
                root.end_position().row as u32 + 1,
                0,
                source.len() as u32,
            ),
            doc: collector.extract_docstring(root),
            params: Vec::new(),
            calls: Vec::new(),
            parent_id: None,
            enrichment: EnrichmentRecord::default(),
            score: None,
        };
        let file_idx = collector.push_profile(file_profile);

        let mut stack = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            collector.collect(child, file_idx, &mut stack);
        }

        Ok(collector.profiles)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

/// Single-pass tree walker. `owner` is the index of the profile that calls
/// encountered at the current depth are attributed to.
struct UnitCollector<'a> {
    source: &'a str,
    relative_path: &'a str,
    file_id: FileId,
    counter: &'a mut u32,
    profiles: Vec<Profile>,
}

impl<'a> UnitCollector<'a> {
    fn alloc_id(&mut self) -> ProfileId {
        *self.counter += 1;
        ProfileId::new(*self.counter).expect("profile id counter overflow")
    }

    fn push_profile(&mut self, profile: Profile) -> usize {
        self.profiles.push(profile);
        self.profiles.len() - 1
    }

    fn text(&self, node: Node) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn collect(&mut self, node: Node, owner: usize, stack: &mut Vec<String>) {
        match node.kind() {
            "decorated_definition" => {
                // Decorator expressions evaluate in the enclosing scope;
                // their calls belong to the current owner.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect(child, owner, stack);
                }
            }
            "function_definition" => self.collect_function(node, owner, stack),
            "class_definition" => self.collect_class(node, owner, stack),
            "call" => {
                if let Some(fn_node) = node.child_by_field_name("function") {
                    let name = sanitize_call_name(self.text(fn_node));
                    if !name.is_empty() {
                        self.profiles[owner].calls.push(name);
                    }
                }
                // Arguments may contain further calls; they belong to the
                // same owner.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect(child, owner, stack);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect(child, owner, stack);
                }
            }
        }
    }

    fn collect_function(&mut self, node: Node, owner: usize, stack: &mut Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();

        let kind = if self.profiles[owner].kind == ProfileKind::Class {
            ProfileKind::Method
        } else {
            ProfileKind::Function
        };

        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.extract_params(p))
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let doc = body.and_then(|b| self.extract_docstring(b));

        let local_path = join_path(stack, &name);
        let parent_id = self.profiles[owner].id;
        let profile = Profile {
            id: self.alloc_id(),
            kind,
            name: name.clone(),
            qualified_name: format!("{}::{}", self.relative_path, local_path),
            file_path: self.relative_path.to_string(),
            file_id: Some(self.file_id),
            range: node_range(node),
            doc,
            params,
            calls: Vec::new(),
            parent_id: Some(parent_id),
            enrichment: EnrichmentRecord::default(),
            score: None,
        };
        let idx = self.push_profile(profile);

        if let Some(body) = body {
            stack.push(name);
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                self.collect(child, idx, stack);
            }
            stack.pop();
        }
    }

    fn collect_class(&mut self, node: Node, owner: usize, stack: &mut Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();

        let body = node.child_by_field_name("body");
        let doc = body.and_then(|b| self.extract_docstring(b));

        let local_path = join_path(stack, &name);
        let parent_id = self.profiles[owner].id;
        let profile = Profile {
            id: self.alloc_id(),
            kind: ProfileKind::Class,
            name: name.clone(),
            qualified_name: format!("{}::{}", self.relative_path, local_path),
            file_path: self.relative_path.to_string(),
            file_id: Some(self.file_id),
            range: node_range(node),
            doc,
            params: Vec::new(),
            calls: Vec::new(),
            parent_id: Some(parent_id),
            enrichment: EnrichmentRecord::default(),
            score: None,
        };
        let idx = self.push_profile(profile);

        if let Some(body) = body {
            stack.push(name);
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                self.collect(child, idx, stack);
            }
            stack.pop();
        }
    }

    fn extract_params(&self, params_node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        let mut cursor = params_node.walk();

        for child in params_node.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => params.push(Param::new(self.text(child))),
                "default_parameter" => {
                    let Some(name_node) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let mut param = Param::new(self.text(name_node));
                    param.default = child
                        .child_by_field_name("value")
                        .map(|v| self.text(v).to_string());
                    params.push(param);
                }
                "typed_parameter" => {
                    let Some(name_node) = child.named_child(0) else {
                        continue;
                    };
                    let mut param = Param::new(self.text(name_node));
                    param.type_hint = child
                        .child_by_field_name("type")
                        .map(|t| self.text(t).to_string());
                    params.push(param);
                }
                "typed_default_parameter" => {
                    let Some(name_node) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let mut param = Param::new(self.text(name_node));
                    param.type_hint = child
                        .child_by_field_name("type")
                        .map(|t| self.text(t).to_string());
                    param.default = child
                        .child_by_field_name("value")
                        .map(|v| self.text(v).to_string());
                    params.push(param);
                }
                "list_splat_pattern" => {
                    if let Some(inner) = child.named_child(0) {
                        params.push(Param::new(format!("*{}", self.text(inner))));
                    }
                }
                "dictionary_splat_pattern" => {
                    if let Some(inner) = child.named_child(0) {
                        params.push(Param::new(format!("**{}", self.text(inner))));
                    }
                }
                _ => {}
            }
        }

        params
    }

    /// Docstring convention: the first statement of a body is an
    /// expression statement holding a string literal.
    fn extract_docstring(&self, body: Node) -> Option<String> {
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).next()?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;

        match expr.kind() {
            "string" => self.string_literal_content(expr),
            "concatenated_string" => {
                let mut cursor = expr.walk();
                let parts: Vec<String> = expr
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "string")
                    .filter_map(|c| self.string_literal_content(c))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(""))
                }
            }
            _ => None,
        }
    }

    fn string_literal_content(&self, string_node: Node) -> Option<String> {
        let mut cursor = string_node.walk();
        let content: String = string_node
            .named_children(&mut cursor)
            .filter(|c| matches!(c.kind(), "string_content" | "escape_sequence"))
            .map(|c| self.text(c))
            .collect();
        if content.is_empty() {
            None
        } else {
            Some(content)
        }
    }
}

fn node_range(node: Node) -> Range {
    Range::new(
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
        node.start_byte() as u32,
        node.end_byte() as u32,
    )
}

fn join_path(stack: &[String], name: &str) -> String {
    if stack.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", stack.join("."), name)
    }
}
