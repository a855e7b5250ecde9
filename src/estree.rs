//! ESTree front-end: convert the JSON AST of an external JS/TS parser
//! into the unified tree.
//!
//! Dispatch is a closed match over the node-type discriminator with a
//! catch-all that skips unknown kinds. Locations come bit-exact from the
//! ESTree `range`/`loc` fields. Parse failures produce a stub module with
//! `has_syntax_errors` set.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::program::Program;
use crate::source::{SourceId, Span};

/// Parse a foreign source file into a unified module, shelling out to the
/// external parser and transforming its output. Any failure along the way
/// yields an error-flagged stub.
pub fn parse_foreign_module(
    source_str: &str,
    file_path: &Path,
    src_id: SourceId,
    prog: &mut Program,
) -> Module {
    match parse_to_estree(file_path, source_str) {
        Ok(estree) => {
            let mut transformer = EsTreeTransform::new(src_id, file_path);
            let module = transformer.transform(&estree, source_str.len());
            for alert in transformer.alerts {
                prog.append_alert(alert);
            }
            module
        }
        Err(message) => {
            prog.append_alert(Alert::new(
                AlertKind::SyntaxError,
                format!("foreign parse failed for '{}': {}", file_path.display(), message),
                Span::new(src_id, 0, 0),
            ));
            let mut module = Module::stub(module_name(file_path), src_id);
            module.has_syntax_errors = true;
            module
        }
    }
}

/// Invoke the external JS parser subprocess (bun, then node) with the
/// script named by `JAC_TS_PARSE_SCRIPT`. Each call spawns one process;
/// embedders that want a long-lived server front this function.
pub fn parse_to_estree(file_path: &Path, source: &str) -> Result<Value, String> {
    let script = std::env::var("JAC_TS_PARSE_SCRIPT")
        .map_err(|_| "JAC_TS_PARSE_SCRIPT is not set and no parser server is running".to_string())?;
    let runtime = ["bun", "node"]
        .iter()
        .find(|cmd| {
            Command::new(cmd)
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .ok_or_else(|| "no JavaScript runtime found (bun or node)".to_string())?;

    let output = Command::new(runtime)
        .arg(&script)
        .arg(file_path)
        .arg("stdin")
        .env("JAC_TS_SOURCE", source)
        .output()
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).into_owned());
    }
    serde_json::from_slice(&output.stdout).map_err(|e| e.to_string())
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.split('.').next().unwrap_or(s).to_string())
        .unwrap_or_else(|| "module".to_string())
}

pub struct EsTreeTransform {
    src: SourceId,
    name: String,
    ids: NodeIdGen,
    pub alerts: Vec<Alert>,
}

impl EsTreeTransform {
    pub fn new(src: SourceId, file_path: &Path) -> Self {
        EsTreeTransform {
            src,
            name: module_name(file_path),
            ids: NodeIdGen::new(),
            alerts: Vec::new(),
        }
    }

    /// Transform a full parse result (`{ program: { body: [...] } }`).
    pub fn transform(&mut self, estree: &Value, source_len: usize) -> Module {
        let id = self.ids.next();
        let program = estree.get("program").unwrap_or(estree);
        let body_nodes = program
            .get("body")
            .and_then(|b| b.as_array())
            .cloned()
            .unwrap_or_default();

        let mut body = Vec::new();
        for node in &body_nodes {
            if let Some(elems) = self.node(node) {
                body.extend(elems);
            }
        }

        let has_errors = estree
            .get("errors")
            .and_then(|e| e.as_array())
            .map(|e| !e.is_empty())
            .unwrap_or(false);

        Module {
            id,
            name: self.name.clone(),
            span: Span::new(self.src, 0, source_len),
            src: self.src,
            doc: None,
            body,
            has_syntax_errors: has_errors,
            stub_only: false,
            code_context: CodeContext::Default,
            terminals: Vec::new(),
            comments: Vec::new(),
            annexed: Vec::new(),
            sym_tab: None,
            gen: Gen::default(),
        }
    }

    /// Closed dispatch over the node-type discriminator. Unknown kinds
    /// transform to nothing.
    fn node(&mut self, node: &Value) -> Option<Vec<ElementStmt>> {
        let node_type = node.get("type")?.as_str()?;
        match node_type {
            "VariableDeclaration" => Some(vec![ElementStmt::GlobalVars(
                self.variable_declaration(node),
            )]),
            "FunctionDeclaration" => {
                Some(vec![ElementStmt::Ability(self.function_declaration(node))])
            }
            "ClassDeclaration" => {
                Some(vec![ElementStmt::Archetype(
                    self.class_declaration(node, ArchKind::Class),
                )])
            }
            "TSInterfaceDeclaration" => Some(vec![ElementStmt::Archetype(
                self.interface_declaration(node),
            )]),
            "TSTypeAliasDeclaration" => {
                Some(vec![ElementStmt::GlobalVars(self.type_alias(node))])
            }
            "TSEnumDeclaration" => Some(vec![ElementStmt::Enum(self.enum_declaration(node))]),
            "ImportDeclaration" => Some(vec![ElementStmt::Import(self.import_declaration(node))]),
            "ExportNamedDeclaration" | "ExportDefaultDeclaration" => {
                // Passthrough of the inner declaration.
                node.get("declaration").and_then(|decl| self.node(decl))
            }
            "ExportAllDeclaration" => {
                let span = self.span_of(node);
                let id = self.ids.next();
                let source = node
                    .get("source")
                    .and_then(|s| s.get("value"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                Some(vec![ElementStmt::Import(Import {
                    id,
                    span,
                    from_path: None,
                    paths: vec![ModulePath {
                        span,
                        dots: 0,
                        segments: vec![Ident::new(source, span)],
                        alias: None,
                    }],
                    items: Vec::new(),
                    is_include: true,
                })])
            }
            _ => None,
        }
    }

    fn span_of(&self, node: &Value) -> Span {
        let range = node.get("range").and_then(|r| r.as_array());
        match range {
            Some(range) if range.len() == 2 => {
                let start = range[0].as_u64().unwrap_or(0) as usize;
                let end = range[1].as_u64().unwrap_or(start as u64) as usize;
                Span::new(self.src, start, end.max(start))
            }
            _ => {
                // Fall back to loc offsets when range is absent.
                let start = node
                    .pointer("/start")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize;
                let end = node.pointer("/end").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                Span::new(self.src, start, end.max(start))
            }
        }
    }

    fn ident_of(&mut self, node: &Value) -> Ident {
        let span = self.span_of(node);
        let name = node.get("name").and_then(|n| n.as_str()).unwrap_or("_");
        Ident::new(name, span)
    }

    fn synthetic_name(&self, node: &Value, fallback: &str) -> Ident {
        Ident::new(fallback, self.span_of(node))
    }

    /// Expressions summarise to a Name token; the transformer never
    /// evaluates them.
    fn summary_expr(&mut self, node: &Value) -> Expr {
        let span = self.span_of(node);
        let text = node
            .get("name")
            .and_then(|n| n.as_str())
            .map(|s| s.to_string())
            .or_else(|| node.get("value").map(value_summary))
            .unwrap_or_else(|| {
                node.get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("expr")
                    .to_string()
            });
        Expr::Name(Ident::new(text, span))
    }

    fn type_annotation_of(&mut self, node: &Value) -> Option<Expr> {
        let annotation = node
            .get("typeAnnotation")
            .and_then(|t| t.get("typeAnnotation").or(Some(t)))?;
        Some(self.summary_expr(annotation))
    }

    // -- declarations ---------------------------------------------------

    fn variable_declaration(&mut self, node: &Value) -> GlobalVars {
        let span = self.span_of(node);
        let id = self.ids.next();
        let is_const = node.get("kind").and_then(|k| k.as_str()) == Some("const");
        let mut vars = Vec::new();
        if let Some(declarations) = node.get("declarations").and_then(|d| d.as_array()) {
            for decl in declarations {
                let var_id = self.ids.next();
                let var_span = self.span_of(decl);
                let name = decl
                    .get("id")
                    .map(|i| self.ident_of(i))
                    .unwrap_or_else(|| self.synthetic_name(decl, "_"));
                let ty = decl.get("id").and_then(|i| self.type_annotation_of(i));
                let value = decl
                    .get("init")
                    .filter(|v| !v.is_null())
                    .map(|v| self.summary_expr(v));
                vars.push(GlobVar {
                    id: var_id,
                    span: var_span,
                    name,
                    ty,
                    value,
                });
            }
        }
        GlobalVars {
            id,
            span,
            access: None,
            is_frozen: is_const,
            vars,
        }
    }

    fn function_declaration(&mut self, node: &Value) -> Ability {
        let span = self.span_of(node);
        let id = self.ids.next();
        let name = node
            .get("id")
            .filter(|v| !v.is_null())
            .map(|i| self.ident_of(i))
            .unwrap_or_else(|| self.synthetic_name(node, "default"));
        let params = self.params_of(node.get("params"));
        let return_ty = node
            .get("returnType")
            .and_then(|t| self.type_annotation_of(t))
            .map(Box::new);
        Ability {
            id,
            span,
            name,
            is_def: true,
            is_async: node
                .get("async")
                .and_then(|a| a.as_bool())
                .unwrap_or(false),
            is_static: false,
            is_abstract: false,
            is_override: false,
            access: None,
            decorators: Vec::new(),
            signature: FuncSignature {
                span,
                params,
                return_ty,
            },
            doc: None,
            body: Some(Vec::new()),
            semstr: None,
        }
    }

    fn params_of(&mut self, params: Option<&Value>) -> Vec<ParamVar> {
        let mut out = Vec::new();
        let Some(params) = params.and_then(|p| p.as_array()) else {
            return out;
        };
        for param in params {
            let id = self.ids.next();
            let span = self.span_of(param);
            let (name, star) = match param.get("type").and_then(|t| t.as_str()) {
                Some("RestElement") => (
                    param
                        .get("argument")
                        .map(|a| self.ident_of(a))
                        .unwrap_or_else(|| self.synthetic_name(param, "rest")),
                    ParamStar::Args,
                ),
                Some("AssignmentPattern") => (
                    param
                        .get("left")
                        .map(|l| self.ident_of(l))
                        .unwrap_or_else(|| self.synthetic_name(param, "_")),
                    ParamStar::None,
                ),
                _ => (self.ident_of(param), ParamStar::None),
            };
            let ty = self.type_annotation_of(param);
            let default = param
                .get("right")
                .filter(|v| !v.is_null())
                .map(|v| self.summary_expr(v));
            out.push(ParamVar {
                id,
                span,
                name,
                ty,
                default,
                star,
                computed_ty: None,
            });
        }
        out
    }

    fn class_declaration(&mut self, node: &Value, kind: ArchKind) -> Archetype {
        let span = self.span_of(node);
        let id = self.ids.next();
        let name = node
            .get("id")
            .filter(|v| !v.is_null())
            .map(|i| self.ident_of(i))
            .unwrap_or_else(|| self.synthetic_name(node, "default"));
        let mut bases = Vec::new();
        if let Some(super_class) = node.get("superClass").filter(|v| !v.is_null()) {
            if super_class.get("type").and_then(|t| t.as_str()) == Some("Identifier") {
                bases.push(Expr::Name(self.ident_of(super_class)));
            }
        }

        let mut items = Vec::new();
        if let Some(body) = node.pointer("/body/body").and_then(|b| b.as_array()) {
            for member in body {
                match member.get("type").and_then(|t| t.as_str()) {
                    Some("MethodDefinition") => {
                        if let Some(ability) = self.method_definition(member) {
                            items.push(ArchItem::Ability(ability));
                        }
                    }
                    Some("PropertyDefinition") => {
                        items.push(ArchItem::Has(self.property_definition(member)));
                    }
                    _ => {}
                }
            }
        }

        Archetype {
            id,
            span,
            kind,
            name,
            access: None,
            is_async: false,
            is_abstract: false,
            bases,
            decorators: Vec::new(),
            doc: None,
            body: Some(items),
            semstr: None,
        }
    }

    fn method_definition(&mut self, node: &Value) -> Option<Ability> {
        let span = self.span_of(node);
        let id = self.ids.next();
        let name = node.get("key").map(|k| self.ident_of(k))?;
        let value = node.get("value")?;
        let params = self.params_of(value.get("params"));
        let return_ty = value
            .get("returnType")
            .and_then(|t| self.type_annotation_of(t))
            .map(Box::new);
        Some(Ability {
            id,
            span,
            name,
            is_def: true,
            is_async: value
                .get("async")
                .and_then(|a| a.as_bool())
                .unwrap_or(false),
            is_static: node
                .get("static")
                .and_then(|s| s.as_bool())
                .unwrap_or(false),
            is_abstract: false,
            is_override: false,
            access: None,
            decorators: Vec::new(),
            signature: FuncSignature {
                span,
                params,
                return_ty,
            },
            doc: None,
            body: Some(Vec::new()),
            semstr: None,
        })
    }

    fn property_definition(&mut self, node: &Value) -> ArchHas {
        let span = self.span_of(node);
        let id = self.ids.next();
        let var_id = self.ids.next();
        let name = node
            .get("key")
            .map(|k| self.ident_of(k))
            .unwrap_or_else(|| self.synthetic_name(node, "_"));
        let ty = self
            .type_annotation_of(node)
            .unwrap_or_else(|| Expr::Name(Ident::new("any", span)));
        let value = node
            .get("value")
            .filter(|v| !v.is_null())
            .map(|v| self.summary_expr(v));
        ArchHas {
            id,
            span,
            is_static: node
                .get("static")
                .and_then(|s| s.as_bool())
                .unwrap_or(false),
            access: None,
            vars: vec![HasVar {
                id: var_id,
                span,
                name,
                ty,
                value,
                computed_ty: None,
            }],
        }
    }

    fn interface_declaration(&mut self, node: &Value) -> Archetype {
        let span = self.span_of(node);
        let id = self.ids.next();
        let name = node
            .get("id")
            .map(|i| self.ident_of(i))
            .unwrap_or_else(|| self.synthetic_name(node, "Interface"));

        let mut items = Vec::new();
        if let Some(body) = node.pointer("/body/body").and_then(|b| b.as_array()) {
            for member in body {
                match member.get("type").and_then(|t| t.as_str()) {
                    Some("TSPropertySignature") => {
                        items.push(ArchItem::Has(self.property_definition(member)));
                    }
                    Some("TSMethodSignature") => {
                        let mid = self.ids.next();
                        let mspan = self.span_of(member);
                        let mname = member
                            .get("key")
                            .map(|k| self.ident_of(k))
                            .unwrap_or_else(|| self.synthetic_name(member, "_"));
                        let params = self.params_of(member.get("params"));
                        items.push(ArchItem::Ability(Ability {
                            id: mid,
                            span: mspan,
                            name: mname,
                            is_def: true,
                            is_async: false,
                            is_static: false,
                            is_abstract: false,
                            is_override: false,
                            access: None,
                            decorators: Vec::new(),
                            signature: FuncSignature {
                                span: mspan,
                                params,
                                return_ty: member
                                    .get("returnType")
                                    .and_then(|t| self.type_annotation_of(t))
                                    .map(Box::new),
                            },
                            doc: None,
                            // Interface methods have no body.
                            body: None,
                            semstr: None,
                        }));
                    }
                    _ => {}
                }
            }
        }

        Archetype {
            id,
            span,
            kind: ArchKind::Obj,
            name,
            access: None,
            is_async: false,
            is_abstract: false,
            bases: Vec::new(),
            decorators: Vec::new(),
            doc: None,
            body: Some(items),
            semstr: None,
        }
    }

    fn type_alias(&mut self, node: &Value) -> GlobalVars {
        let span = self.span_of(node);
        let id = self.ids.next();
        let var_id = self.ids.next();
        let name = node
            .get("id")
            .map(|i| self.ident_of(i))
            .unwrap_or_else(|| self.synthetic_name(node, "_"));
        let ty = node
            .get("typeAnnotation")
            .map(|t| self.summary_expr(t))
            .unwrap_or(Expr::Name(Ident::new("any", span)));
        GlobalVars {
            id,
            span,
            access: None,
            is_frozen: true,
            vars: vec![GlobVar {
                id: var_id,
                span,
                name,
                ty: Some(ty),
                value: None,
            }],
        }
    }

    fn enum_declaration(&mut self, node: &Value) -> EnumDef {
        let span = self.span_of(node);
        let id = self.ids.next();
        let name = node
            .get("id")
            .map(|i| self.ident_of(i))
            .unwrap_or_else(|| self.synthetic_name(node, "Enum"));
        let mut members = Vec::new();
        let member_nodes = node
            .get("members")
            .or_else(|| node.pointer("/body/members"))
            .and_then(|m| m.as_array());
        if let Some(member_nodes) = member_nodes {
            for member in member_nodes {
                let member_id = self.ids.next();
                let member_span = self.span_of(member);
                let member_name = member
                    .get("id")
                    .map(|i| self.ident_of(i))
                    .unwrap_or_else(|| self.synthetic_name(member, "_"));
                let value = member
                    .get("initializer")
                    .filter(|v| !v.is_null())
                    .map(|v| self.summary_expr(v));
                members.push(EnumMember {
                    id: member_id,
                    span: member_span,
                    name: member_name,
                    value,
                });
            }
        }
        EnumDef {
            id,
            span,
            name,
            access: None,
            bases: Vec::new(),
            doc: None,
            members,
            semstr: None,
        }
    }

    fn import_declaration(&mut self, node: &Value) -> Import {
        let span = self.span_of(node);
        let id = self.ids.next();
        let source = node
            .pointer("/source/value")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let path = ModulePath {
            span,
            dots: 0,
            segments: vec![Ident::new(source, span)],
            alias: None,
        };
        let mut items = Vec::new();
        if let Some(specifiers) = node.get("specifiers").and_then(|s| s.as_array()) {
            for spec in specifiers {
                let spec_span = self.span_of(spec);
                let local = spec
                    .get("local")
                    .map(|l| self.ident_of(l))
                    .unwrap_or_else(|| self.synthetic_name(spec, "_"));
                let name = match spec.get("type").and_then(|t| t.as_str()) {
                    Some("ImportDefaultSpecifier") => Ident::new("default", spec_span),
                    Some("ImportNamespaceSpecifier") => Ident::new("*", spec_span),
                    _ => spec
                        .get("imported")
                        .map(|i| self.ident_of(i))
                        .unwrap_or_else(|| local.clone()),
                };
                items.push(ModuleItem {
                    span: spec_span,
                    name,
                    alias: Some(local),
                });
            }
        }
        Import {
            id,
            span,
            from_path: Some(path),
            paths: Vec::new(),
            items,
            is_include: false,
        }
    }
}

fn value_summary(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => "value".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transform(program_body: Value) -> Module {
        let mut t = EsTreeTransform::new(SourceId(0), Path::new("app.ts"));
        t.transform(&json!({ "program": { "body": program_body } }), 100)
    }

    #[test]
    fn const_becomes_frozen_globals() {
        let module = transform(json!([{
            "type": "VariableDeclaration",
            "kind": "const",
            "range": [0, 20],
            "declarations": [{
                "type": "VariableDeclarator",
                "range": [6, 19],
                "id": { "type": "Identifier", "name": "limit", "range": [6, 11] },
                "init": { "type": "Literal", "value": 10, "range": [14, 16] },
            }],
        }]));
        let ElementStmt::GlobalVars(gv) = &module.body[0] else {
            panic!("expected globals");
        };
        assert!(gv.is_frozen);
        assert_eq!(gv.vars[0].name.value, "limit");
        assert_eq!((gv.span.start, gv.span.end), (0, 20));
    }

    #[test]
    fn let_is_not_frozen() {
        let module = transform(json!([{
            "type": "VariableDeclaration",
            "kind": "let",
            "range": [0, 10],
            "declarations": [],
        }]));
        let ElementStmt::GlobalVars(gv) = &module.body[0] else {
            panic!();
        };
        assert!(!gv.is_frozen);
    }

    #[test]
    fn function_declaration_maps_to_ability() {
        let module = transform(json!([{
            "type": "FunctionDeclaration",
            "range": [0, 30],
            "id": { "type": "Identifier", "name": "greet", "range": [9, 14] },
            "params": [
                { "type": "Identifier", "name": "who", "range": [15, 18] }
            ],
        }]));
        let ElementStmt::Ability(f) = &module.body[0] else {
            panic!();
        };
        assert_eq!(f.name.value, "greet");
        assert_eq!(f.signature.params[0].name.value, "who");
    }

    #[test]
    fn class_declaration_maps_members() {
        let module = transform(json!([{
            "type": "ClassDeclaration",
            "range": [0, 60],
            "id": { "type": "Identifier", "name": "App", "range": [6, 9] },
            "superClass": { "type": "Identifier", "name": "Base", "range": [18, 22] },
            "body": { "body": [
                {
                    "type": "PropertyDefinition",
                    "range": [26, 35],
                    "key": { "type": "Identifier", "name": "count", "range": [26, 31] },
                    "value": { "type": "Literal", "value": 0, "range": [34, 35] },
                },
                {
                    "type": "MethodDefinition",
                    "range": [38, 58],
                    "key": { "type": "Identifier", "name": "run", "range": [38, 41] },
                    "value": { "type": "FunctionExpression", "params": [] },
                },
            ]},
        }]));
        let ElementStmt::Archetype(arch) = &module.body[0] else {
            panic!();
        };
        assert_eq!(arch.kind, ArchKind::Class);
        assert_eq!(arch.bases.len(), 1);
        let items = arch.body.as_ref().unwrap();
        assert!(matches!(items[0], ArchItem::Has(_)));
        assert!(matches!(items[1], ArchItem::Ability(_)));
    }

    #[test]
    fn interface_maps_to_obj_with_bodyless_methods() {
        let module = transform(json!([{
            "type": "TSInterfaceDeclaration",
            "range": [0, 50],
            "id": { "type": "Identifier", "name": "Shape", "range": [10, 15] },
            "body": { "body": [
                {
                    "type": "TSPropertySignature",
                    "range": [19, 29],
                    "key": { "type": "Identifier", "name": "width", "range": [19, 24] },
                },
                {
                    "type": "TSMethodSignature",
                    "range": [32, 48],
                    "key": { "type": "Identifier", "name": "area", "range": [32, 36] },
                    "params": [],
                },
            ]},
        }]));
        let ElementStmt::Archetype(arch) = &module.body[0] else {
            panic!();
        };
        assert_eq!(arch.kind, ArchKind::Obj);
        let items = arch.body.as_ref().unwrap();
        let ArchItem::Ability(method) = &items[1] else {
            panic!();
        };
        assert!(method.body.is_none());
    }

    #[test]
    fn type_alias_is_frozen_global_with_type_only() {
        let module = transform(json!([{
            "type": "TSTypeAliasDeclaration",
            "range": [0, 20],
            "id": { "type": "Identifier", "name": "Id", "range": [5, 7] },
            "typeAnnotation": { "type": "TSNumberKeyword", "range": [10, 16] },
        }]));
        let ElementStmt::GlobalVars(gv) = &module.body[0] else {
            panic!();
        };
        assert!(gv.is_frozen);
        assert!(gv.vars[0].ty.is_some());
        assert!(gv.vars[0].value.is_none());
    }

    #[test]
    fn ts_enum_maps_members() {
        let module = transform(json!([{
            "type": "TSEnumDeclaration",
            "range": [0, 40],
            "id": { "type": "Identifier", "name": "Dir", "range": [5, 8] },
            "members": [
                {
                    "type": "TSEnumMember",
                    "range": [11, 17],
                    "id": { "type": "Identifier", "name": "Up", "range": [11, 13] },
                    "initializer": { "type": "Literal", "value": 1, "range": [16, 17] },
                },
                {
                    "type": "TSEnumMember",
                    "range": [19, 23],
                    "id": { "type": "Identifier", "name": "Down", "range": [19, 23] },
                },
            ],
        }]));
        let ElementStmt::Enum(en) = &module.body[0] else {
            panic!();
        };
        assert_eq!(en.members.len(), 2);
        assert!(en.members[0].value.is_some());
    }

    #[test]
    fn import_specifiers_get_synthetic_names() {
        let module = transform(json!([{
            "type": "ImportDeclaration",
            "range": [0, 40],
            "source": { "value": "react", "range": [30, 37] },
            "specifiers": [
                {
                    "type": "ImportDefaultSpecifier",
                    "range": [7, 12],
                    "local": { "type": "Identifier", "name": "React", "range": [7, 12] },
                },
                {
                    "type": "ImportSpecifier",
                    "range": [14, 22],
                    "imported": { "type": "Identifier", "name": "useState", "range": [14, 22] },
                    "local": { "type": "Identifier", "name": "useState", "range": [14, 22] },
                },
            ],
        }]));
        let ElementStmt::Import(import) = &module.body[0] else {
            panic!();
        };
        assert_eq!(import.from_path.as_ref().unwrap().segments[0].value, "react");
        assert_eq!(import.items[0].name.value, "default");
        assert_eq!(import.items[0].alias.as_ref().unwrap().value, "React");
        assert_eq!(import.items[1].name.value, "useState");
    }

    #[test]
    fn export_named_passes_through() {
        let module = transform(json!([{
            "type": "ExportNamedDeclaration",
            "range": [0, 30],
            "declaration": {
                "type": "FunctionDeclaration",
                "range": [7, 30],
                "id": { "type": "Identifier", "name": "go", "range": [16, 18] },
                "params": [],
            },
        }]));
        assert!(matches!(module.body[0], ElementStmt::Ability(_)));
    }

    #[test]
    fn export_all_becomes_reexport_import() {
        let module = transform(json!([{
            "type": "ExportAllDeclaration",
            "range": [0, 20],
            "source": { "value": "./lib", "range": [14, 19] },
        }]));
        let ElementStmt::Import(import) = &module.body[0] else {
            panic!();
        };
        assert!(import.is_include);
    }

    #[test]
    fn unknown_node_kinds_are_skipped() {
        let module = transform(json!([
            { "type": "MysteryNode", "range": [0, 5] },
            {
                "type": "VariableDeclaration",
                "kind": "let",
                "range": [6, 16],
                "declarations": [],
            },
        ]));
        assert_eq!(module.body.len(), 1);
    }
}
