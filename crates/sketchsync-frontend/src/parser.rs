//! Java parsing with tree-sitter
//!
//! [`parse`] runs the tree-sitter Java grammar over the derived text and
//! lowers the concrete tree into [`crate::ast`]. The grammar recovers from
//! syntax errors on its own; ERROR and MISSING nodes become
//! [`CompilerProblem`]s (see [`crate::recovery`]) and lowering steps over
//! them, so a tree is produced for any input.

use thiserror::Error;
use tree_sitter::{Node, Parser};

use crate::ast::*;
use crate::cst::{child_of_kind, children, field, fields, has_token, named_children, text};
use crate::problem::CompilerProblem;
use crate::recovery::syntax_problems;

/// A parsed unit plus every syntax problem found in it.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub unit: CompilationUnit,
    pub problems: Vec<CompilerProblem>,
}

impl SyntaxTree {
    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(CompilerProblem::is_error)
    }
}

/// The grammar could not be used at all. Syntax errors in the input are
/// never reported this way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Failed to load the Java grammar: {0}")]
    Language(String),

    #[error("Tree-sitter produced no tree")]
    NoTree,
}

/// A tree-sitter parser loaded with the Java grammar, reusable across units.
pub struct JavaParser {
    parser: Parser,
}

impl std::fmt::Debug for JavaParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaParser").finish_non_exhaustive()
    }
}

impl JavaParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::Language(e.to_string()))?;
        Ok(JavaParser { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<SyntaxTree, ParseError> {
        let tree = self.parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();

        let mut problems = syntax_problems(root, source);
        problems.sort_by_key(|p| p.start);

        let mut lower = Lower { src: source, next_name: 0 };
        let unit = lower.unit(root);
        tracing::trace!(
            bytes = source.len(),
            problems = problems.len(),
            has_error = root.has_error(),
            "parsed unit"
        );
        Ok(SyntaxTree { unit, problems })
    }
}

pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    JavaParser::new()?.parse(source)
}

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Named children of `node` with ERROR children replaced by their own
/// contents, so whatever the grammar salvaged is still lowered.
fn flatten<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    for child in named_children(node) {
        if child.is_error() {
            out.extend(flatten(&child));
        } else {
            out.push(child);
        }
    }
    out
}

fn span(node: &Node) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

/// Number of `[]` pairs in a `dimensions` node.
fn dims_of(node: Option<Node>, src: &str) -> usize {
    node.map_or(0, |n| text(&n, src).matches('[').count())
}

struct Lower<'s> {
    src: &'s str,
    next_name: u32,
}

impl<'s> Lower<'s> {
    fn text(&self, node: &Node) -> &'s str {
        text(node, self.src)
    }

    fn name(&mut self, node: &Node) -> Name {
        let id = NameId(self.next_name);
        self.next_name += 1;
        Name {
            id,
            text: self.text(node).to_string(),
            span: span(node),
        }
    }

    /// Zero-width placeholder for a name the grammar had to invent.
    fn missing_name(&mut self, at: usize) -> Name {
        let id = NameId(self.next_name);
        self.next_name += 1;
        Name {
            id,
            text: String::new(),
            span: Span::new(at, at),
        }
    }

    fn name_field(&mut self, node: &Node, name: &str) -> Name {
        match field(node, name) {
            Some(n) if !n.is_missing() && !n.is_error() => self.name(&n),
            _ => self.missing_name(node.end_byte()),
        }
    }

    /// Identifiers of a dotted name, outermost first.
    fn dotted(&mut self, node: &Node) -> Vec<Name> {
        match node.kind() {
            "identifier" | "type_identifier" => vec![self.name(node)],
            "scoped_identifier" => {
                let mut names = field(node, "scope").map_or_else(Vec::new, |s| self.dotted(&s));
                if let Some(last) = field(node, "name") {
                    names.push(self.name(&last));
                }
                names
            }
            "scoped_type_identifier" => {
                let mut names = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "type_identifier" | "scoped_type_identifier" => names.extend(self.dotted(&child)),
                        "generic_type" => {
                            if let Some(base) = named_children(&child).first() {
                                names.extend(self.dotted(base));
                            }
                        }
                        _ => {}
                    }
                }
                names
            }
            _ => Vec::new(),
        }
    }

    // ---- declarations ----

    fn unit(&mut self, root: Node) -> CompilationUnit {
        let mut unit = CompilationUnit {
            span: Span::new(0, self.src.len()),
            ..CompilationUnit::default()
        };
        for item in flatten(&root) {
            match item.kind() {
                "import_declaration" => unit.imports.push(self.import(&item)),
                kind if TYPE_DECLARATIONS.contains(&kind) => unit.types.push(self.type_decl(&item)),
                _ => {}
            }
        }
        unit
    }

    fn import(&mut self, node: &Node) -> ImportDecl {
        let path = match named_children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        {
            Some(n) => self.dotted(&n),
            None => vec![self.missing_name(node.end_byte())],
        };
        ImportDecl {
            is_static: has_token(node, "static"),
            path,
            wildcard: child_of_kind(node, "asterisk").is_some(),
            span: span(node),
        }
    }

    fn modifiers(&mut self, node: &Node) -> Modifiers {
        let mut mods = Modifiers::default();
        let Some(list) = child_of_kind(node, "modifiers") else {
            return mods;
        };
        for child in children(&list) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    if let Some(name) = field(&child, "name") {
                        if let Some(last) = self.dotted(&name).pop() {
                            mods.annotations.push(last);
                        }
                    }
                }
                keyword if !child.is_named() => mods.keywords.push(Modifier {
                    keyword: keyword.to_string(),
                    span: span(&child),
                }),
                _ => {}
            }
        }
        mods
    }

    fn type_params(&mut self, node: Option<Node>) -> Vec<Name> {
        let Some(node) = node else {
            return Vec::new();
        };
        named_children(&node)
            .into_iter()
            .filter(|p| p.kind() == "type_parameter")
            .filter_map(|p| child_of_kind(&p, "type_identifier").or_else(|| child_of_kind(&p, "identifier")))
            .map(|n| self.name(&n))
            .collect()
    }

    fn type_list(&mut self, node: Option<Node>) -> Vec<TypeRef> {
        let Some(node) = node else {
            return Vec::new();
        };
        let list = child_of_kind(&node, "type_list").unwrap_or(node);
        named_children(&list).iter().map(|t| self.type_ref(t)).collect()
    }

    fn type_decl(&mut self, node: &Node) -> TypeDecl {
        let kind = match node.kind() {
            "interface_declaration" | "annotation_type_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            _ => TypeKind::Class,
        };
        let modifiers = self.modifiers(node);
        let name = self.name_field(node, "name");
        let type_params = self.type_params(field(node, "type_parameters"));

        let extends = field(node, "superclass")
            .and_then(|sup| named_children(&sup).into_iter().next())
            .map(|t| self.type_ref(&t));
        let mut implements = self.type_list(field(node, "interfaces"));
        if kind == TypeKind::Interface {
            implements.extend(self.type_list(child_of_kind(node, "extends_interfaces")));
        }

        let members = match field(node, "body") {
            Some(body) => self.class_body(&body, &name.text),
            None => Vec::new(),
        };
        TypeDecl {
            kind,
            modifiers,
            name,
            type_params,
            extends,
            implements,
            members,
            span: span(node),
        }
    }

    fn class_body(&mut self, body: &Node, class_name: &str) -> Vec<Member> {
        let mut members = Vec::new();
        for item in flatten(body) {
            match item.kind() {
                "enum_constant" => members.push(self.enum_constant(&item, class_name)),
                "enum_body_declarations" => members.extend(self.class_body(&item, class_name)),
                _ => members.extend(self.member(&item)),
            }
        }
        members
    }

    fn enum_constant(&mut self, node: &Node, enum_name: &str) -> Member {
        let name = self.name_field(node, "name");
        let at = node.start_byte();
        Member::Field(FieldDecl {
            modifiers: Modifiers::default(),
            ty: TypeRef {
                name: TypeName::Primitive(enum_name.to_string()),
                args: Vec::new(),
                dims: 0,
                span: Span::new(at, at),
            },
            declarators: vec![VarDeclarator {
                name,
                dims: 0,
                init: None,
                span: span(node),
            }],
            span: span(node),
        })
    }

    fn member(&mut self, node: &Node) -> Option<Member> {
        match node.kind() {
            "field_declaration" | "constant_declaration" => Some(Member::Field(FieldDecl {
                modifiers: self.modifiers(node),
                ty: self.type_field(node),
                declarators: self.declarators(node),
                span: span(node),
            })),
            "method_declaration" => Some(Member::Method(self.method(node, false))),
            "constructor_declaration" => Some(Member::Method(self.method(node, true))),
            "block" => Some(Member::Initializer(self.block(node))),
            "static_initializer" => child_of_kind(node, "block").map(|b| Member::Initializer(self.block(&b))),
            kind if TYPE_DECLARATIONS.contains(&kind) => Some(Member::Type(self.type_decl(node))),
            _ => None,
        }
    }

    fn method(&mut self, node: &Node, constructor: bool) -> MethodDecl {
        let modifiers = self.modifiers(node);
        let type_params_node = field(node, "type_parameters");
        let return_node = if constructor { None } else { field(node, "type") };
        let name = self.name_field(node, "name");
        let header_start = type_params_node
            .or(return_node)
            .map_or(name.span.start, |n| n.start_byte());

        let type_params = self.type_params(type_params_node);
        let return_type = return_node.map(|t| {
            let mut ty = self.type_ref(&t);
            ty.dims += dims_of(field(node, "dimensions"), self.src);
            ty
        });
        let params = field(node, "parameters").map_or_else(Vec::new, |p| self.params(&p));
        let throws = self.type_list(child_of_kind(node, "throws"));
        let body = field(node, "body").map(|b| self.block(&b));
        MethodDecl {
            modifiers,
            type_params,
            return_type,
            name,
            params,
            throws,
            body,
            span: span(node),
            header_start,
        }
    }

    fn params(&mut self, node: &Node) -> Vec<Param> {
        let mut params = Vec::new();
        for p in flatten(node) {
            match p.kind() {
                "formal_parameter" => {
                    let modifiers = self.modifiers(&p);
                    let mut ty = self.type_field(&p);
                    ty.dims += dims_of(field(&p, "dimensions"), self.src);
                    let name = self.name_field(&p, "name");
                    params.push(Param {
                        modifiers,
                        ty,
                        varargs: false,
                        name,
                    });
                }
                "spread_parameter" => {
                    let modifiers = self.modifiers(&p);
                    let parts = named_children(&p);
                    let ty = match parts.iter().find(|c| c.kind() != "modifiers") {
                        Some(t) => self.type_ref(t),
                        None => self.error_type(p.start_byte()),
                    };
                    let name = match child_of_kind(&p, "variable_declarator") {
                        Some(d) => self.name_field(&d, "name"),
                        None => self.missing_name(p.end_byte()),
                    };
                    params.push(Param {
                        modifiers,
                        ty,
                        varargs: true,
                        name,
                    });
                }
                _ => {}
            }
        }
        params
    }

    fn declarators(&mut self, node: &Node) -> Vec<VarDeclarator> {
        fields(node, "declarator")
            .iter()
            .map(|d| self.declarator(d))
            .collect()
    }

    fn declarator(&mut self, node: &Node) -> VarDeclarator {
        VarDeclarator {
            name: self.name_field(node, "name"),
            dims: dims_of(field(node, "dimensions"), self.src),
            init: field(node, "value").map(|v| self.expr(&v)),
            span: span(node),
        }
    }

    // ---- types ----

    fn error_type(&mut self, at: usize) -> TypeRef {
        TypeRef {
            name: TypeName::Named(Vec::new()),
            args: Vec::new(),
            dims: 0,
            span: Span::new(at, at),
        }
    }

    fn type_field(&mut self, node: &Node) -> TypeRef {
        match field(node, "type") {
            Some(t) => self.type_ref(&t),
            None => self.error_type(node.start_byte()),
        }
    }

    fn type_ref(&mut self, node: &Node) -> TypeRef {
        let simple = |name| TypeRef {
            name,
            args: Vec::new(),
            dims: 0,
            span: span(node),
        };
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                simple(TypeName::Primitive(self.text(node).to_string()))
            }
            "type_identifier" | "identifier" | "scoped_type_identifier" | "scoped_identifier" => {
                simple(TypeName::Named(self.dotted(node)))
            }
            "generic_type" => {
                let parts = named_children(node);
                let mut ty = match parts.first() {
                    Some(base) => self.type_ref(base),
                    None => self.error_type(node.start_byte()),
                };
                if let Some(args) = parts.iter().find(|p| p.kind() == "type_arguments") {
                    ty.args = named_children(args)
                        .iter()
                        .filter_map(|a| self.type_arg(a))
                        .collect();
                }
                ty.span = span(node);
                ty
            }
            "array_type" => {
                let mut ty = match field(node, "element") {
                    Some(element) => self.type_ref(&element),
                    None => self.error_type(node.start_byte()),
                };
                ty.dims += dims_of(field(node, "dimensions"), self.src);
                ty.span = span(node);
                ty
            }
            "annotated_type" => match named_children(node).last() {
                Some(inner) => self.type_ref(inner),
                None => self.error_type(node.start_byte()),
            },
            _ => self.error_type(node.start_byte()),
        }
    }

    /// `?` binds nothing; a bounded wildcard refers to its bound.
    fn type_arg(&mut self, node: &Node) -> Option<TypeRef> {
        if node.kind() == "wildcard" {
            let bound = named_children(node).into_iter().find(|c| c.kind() != "annotation")?;
            return Some(self.type_ref(&bound));
        }
        Some(self.type_ref(node))
    }

    // ---- statements ----

    fn block(&mut self, node: &Node) -> Block {
        Block {
            stmts: flatten(node).iter().filter_map(|s| self.stmt(s)).collect(),
            span: span(node),
        }
    }

    fn body(&mut self, node: Option<Node>, at: usize) -> Box<Stmt> {
        let stmt = node.and_then(|n| self.stmt(&n));
        Box::new(stmt.unwrap_or(Stmt::Empty(Span::new(at, at))))
    }

    /// Condition of `if`/`while`/`do`, without its parentheses.
    fn condition(&mut self, node: &Node) -> Expr {
        match field(node, "condition") {
            Some(c) if c.kind() == "parenthesized_expression" => match named_children(&c).first() {
                Some(inner) => self.expr(inner),
                None => self.error_expr(c.start_byte()),
            },
            Some(c) => self.expr(&c),
            None => self.error_expr(node.start_byte()),
        }
    }

    fn local_var(&mut self, node: &Node) -> LocalVarDecl {
        LocalVarDecl {
            modifiers: self.modifiers(node),
            ty: self.type_field(node),
            declarators: self.declarators(node),
            span: span(node),
        }
    }

    fn stmt(&mut self, node: &Node) -> Option<Stmt> {
        let sp = span(node);
        let stmt = match node.kind() {
            "block" | "constructor_body" => Stmt::Block(self.block(node)),
            "local_variable_declaration" => Stmt::LocalVar(self.local_var(node)),
            kind if TYPE_DECLARATIONS.contains(&kind) => Stmt::LocalClass(self.type_decl(node)),
            "expression_statement" => {
                let inner = named_children(node).into_iter().next()?;
                Stmt::Expr(self.expr(&inner))
            }
            "explicit_constructor_invocation" => Stmt::Expr(self.expr(node)),
            "if_statement" => Stmt::If {
                cond: self.condition(node),
                then: self.body(field(node, "consequence"), node.end_byte()),
                otherwise: field(node, "alternative")
                    .and_then(|n| self.stmt(&n))
                    .map(Box::new),
                span: sp,
            },
            "while_statement" => Stmt::While {
                cond: self.condition(node),
                body: self.body(field(node, "body"), node.end_byte()),
                span: sp,
            },
            "do_statement" => Stmt::DoWhile {
                body: self.body(field(node, "body"), node.end_byte()),
                cond: self.condition(node),
                span: sp,
            },
            "for_statement" => {
                let init = fields(node, "init")
                    .iter()
                    .map(|i| match i.kind() {
                        "local_variable_declaration" => Stmt::LocalVar(self.local_var(i)),
                        _ => Stmt::Expr(self.expr(i)),
                    })
                    .collect();
                Stmt::For {
                    init,
                    cond: field(node, "condition").map(|c| self.expr(&c)),
                    update: fields(node, "update").iter().map(|u| self.expr(u)).collect(),
                    body: self.body(field(node, "body"), node.end_byte()),
                    span: sp,
                }
            }
            "enhanced_for_statement" => {
                let mut ty = self.type_field(node);
                ty.dims += dims_of(field(node, "dimensions"), self.src);
                let name = self.name_field(node, "name");
                let var = LocalVarDecl {
                    modifiers: self.modifiers(node),
                    declarators: vec![VarDeclarator {
                        dims: 0,
                        init: None,
                        span: ty.span.to(name.span),
                        name,
                    }],
                    span: ty.span,
                    ty,
                };
                Stmt::ForEach {
                    var,
                    iterable: match field(node, "value") {
                        Some(v) => self.expr(&v),
                        None => self.error_expr(node.start_byte()),
                    },
                    body: self.body(field(node, "body"), node.end_byte()),
                    span: sp,
                }
            }
            "switch_expression" => Stmt::Switch {
                selector: self.condition(node),
                cases: field(node, "body").map_or_else(Vec::new, |b| self.switch_cases(&b)),
                span: sp,
            },
            "try_statement" | "try_with_resources_statement" => {
                let resources = field(node, "resources").map_or_else(Vec::new, |r| self.resources(&r));
                let body = match field(node, "body") {
                    Some(b) => self.block(&b),
                    None => Block {
                        stmts: Vec::new(),
                        span: Span::new(node.end_byte(), node.end_byte()),
                    },
                };
                let catches = named_children(node)
                    .iter()
                    .filter(|c| c.kind() == "catch_clause")
                    .map(|c| self.catch_clause(c))
                    .collect();
                let finally = child_of_kind(node, "finally_clause")
                    .and_then(|f| child_of_kind(&f, "block"))
                    .map(|b| self.block(&b));
                Stmt::Try {
                    resources,
                    body,
                    catches,
                    finally,
                    span: sp,
                }
            }
            "return_statement" => Stmt::Return(
                named_children(node).first().map(|e| self.expr(e)),
                sp,
            ),
            "yield_statement" => {
                let value = named_children(node).into_iter().next()?;
                Stmt::Expr(self.expr(&value))
            }
            "throw_statement" => {
                let value = match named_children(node).first() {
                    Some(e) => self.expr(e),
                    None => self.error_expr(node.end_byte()),
                };
                Stmt::Throw(value, sp)
            }
            "break_statement" => Stmt::Break(sp),
            "continue_statement" => Stmt::Continue(sp),
            "labeled_statement" => {
                let inner = named_children(node).into_iter().find(|c| c.kind() != "identifier")?;
                return self.stmt(&inner);
            }
            "assert_statement" => {
                let mut exprs = named_children(node).into_iter();
                let cond = exprs.next()?;
                Stmt::Assert {
                    cond: self.expr(&cond),
                    message: exprs.next().map(|m| self.expr(&m)),
                    span: sp,
                }
            }
            "synchronized_statement" => {
                let lock = match child_of_kind(node, "parenthesized_expression")
                    .and_then(|p| named_children(&p).into_iter().next())
                {
                    Some(e) => self.expr(&e),
                    None => self.error_expr(node.start_byte()),
                };
                let body = match field(node, "body") {
                    Some(b) => self.block(&b),
                    None => Block {
                        stmts: Vec::new(),
                        span: Span::new(node.end_byte(), node.end_byte()),
                    },
                };
                Stmt::Synchronized { lock, body, span: sp }
            }
            ";" => Stmt::Empty(sp),
            "ERROR" => Stmt::Block(self.block(node)),
            _ => return None,
        };
        Some(stmt)
    }

    fn switch_cases(&mut self, body: &Node) -> Vec<SwitchCase> {
        let mut cases = Vec::new();
        for group in flatten(body) {
            if !matches!(group.kind(), "switch_block_statement_group" | "switch_rule") {
                continue;
            }
            let mut case = SwitchCase {
                labels: Vec::new(),
                stmts: Vec::new(),
            };
            for part in named_children(&group) {
                if part.kind() == "switch_label" {
                    for label in named_children(&part) {
                        if !matches!(label.kind(), "pattern" | "guard" | "record_pattern") {
                            case.labels.push(self.expr(&label));
                        }
                    }
                } else if let Some(stmt) = self.stmt(&part) {
                    case.stmts.push(stmt);
                }
            }
            cases.push(case);
        }
        cases
    }

    fn resources(&mut self, node: &Node) -> Vec<LocalVarDecl> {
        named_children(node)
            .iter()
            .filter(|r| r.kind() == "resource" && field(r, "type").is_some())
            .map(|r| {
                let name = self.name_field(r, "name");
                let init = field(r, "value").map(|v| self.expr(&v));
                LocalVarDecl {
                    modifiers: self.modifiers(r),
                    ty: self.type_field(r),
                    declarators: vec![VarDeclarator {
                        span: span(r),
                        name,
                        dims: 0,
                        init,
                    }],
                    span: span(r),
                }
            })
            .collect()
    }

    fn catch_clause(&mut self, node: &Node) -> CatchClause {
        let param = child_of_kind(node, "catch_formal_parameter");
        let types = param
            .and_then(|p| child_of_kind(&p, "catch_type"))
            .map_or_else(Vec::new, |t| named_children(&t).iter().map(|c| self.type_ref(c)).collect());
        let name = match param {
            Some(p) => self.name_field(&p, "name"),
            None => self.missing_name(node.start_byte()),
        };
        let body = match field(node, "body") {
            Some(b) => self.block(&b),
            None => Block {
                stmts: Vec::new(),
                span: Span::new(node.end_byte(), node.end_byte()),
            },
        };
        CatchClause { types, name, body }
    }

    // ---- expressions ----

    fn error_expr(&self, at: usize) -> Expr {
        Expr {
            kind: ExprKind::Error,
            span: Span::new(at, at),
        }
    }

    fn boxed(&mut self, node: Option<Node>, at: usize) -> Box<Expr> {
        Box::new(match node {
            Some(n) => self.expr(&n),
            None => self.error_expr(at),
        })
    }

    fn arguments(&mut self, node: Option<Node>) -> Vec<Expr> {
        node.map_or_else(Vec::new, |args| flatten(&args).iter().map(|a| self.expr(a)).collect())
    }

    fn op(&self, node: &Node) -> String {
        field(node, "operator").map_or_else(String::new, |o| self.text(&o).to_string())
    }

    fn expr(&mut self, node: &Node) -> Expr {
        let sp = span(node);
        let end = node.end_byte();
        let kind = match node.kind() {
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal" => {
                ExprKind::Literal(LiteralKind::Int)
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => ExprKind::Literal(LiteralKind::Float),
            "character_literal" => ExprKind::Literal(LiteralKind::Char),
            "string_literal" | "text_block" => ExprKind::Literal(LiteralKind::Str),
            "true" | "false" => ExprKind::Literal(LiteralKind::Bool),
            "null_literal" => ExprKind::Literal(LiteralKind::Null),
            "identifier" => ExprKind::Name(self.name(node)),
            "this" => ExprKind::This,
            "super" => ExprKind::Super,
            "parenthesized_expression" => ExprKind::Paren(self.boxed(named_children(node).into_iter().next(), end)),
            "field_access" => {
                let target = self.boxed(field(node, "object"), node.start_byte());
                match field(node, "field") {
                    Some(f) if f.kind() == "this" => ExprKind::This,
                    Some(f) if !f.is_missing() => ExprKind::Field {
                        target,
                        name: self.name(&f),
                    },
                    _ => ExprKind::Field {
                        target,
                        name: self.missing_name(end),
                    },
                }
            }
            "method_invocation" => {
                let target = field(node, "object").map(|o| Box::new(self.expr(&o)));
                ExprKind::Call {
                    target,
                    name: self.name_field(node, "name"),
                    args: self.arguments(field(node, "arguments")),
                }
            }
            "explicit_constructor_invocation" => ExprKind::ConstructorCall {
                is_super: field(node, "constructor").is_some_and(|c| c.kind() == "super"),
                args: self.arguments(field(node, "arguments")),
            },
            "object_creation_expression" => {
                let ty = self.type_field(node);
                let args = self.arguments(field(node, "arguments"));
                let body = child_of_kind(node, "class_body").map(|b| self.class_body(&b, ""));
                ExprKind::New { ty, args, body }
            }
            "array_creation_expression" => {
                let mut ty = self.type_field(node);
                let mut dims = Vec::new();
                for d in fields(node, "dimensions") {
                    if d.kind() == "dimensions_expr" {
                        ty.dims += 1;
                        if let Some(e) = named_children(&d).into_iter().next() {
                            dims.push(self.expr(&e));
                        }
                    } else {
                        ty.dims += dims_of(Some(d), self.src);
                    }
                }
                let init = field(node, "value").map(|v| flatten(&v).iter().map(|e| self.expr(e)).collect());
                ExprKind::NewArray { ty, dims, init }
            }
            "array_initializer" => ExprKind::ArrayInit(flatten(node).iter().map(|e| self.expr(e)).collect()),
            "array_access" => ExprKind::Index {
                target: self.boxed(field(node, "array"), node.start_byte()),
                index: self.boxed(field(node, "index"), end),
            },
            "unary_expression" => ExprKind::Unary {
                op: self.op(node),
                operand: self.boxed(field(node, "operand"), end),
                postfix: false,
            },
            "update_expression" => {
                let parts = children(node);
                let postfix = parts.first().is_some_and(|p| p.is_named());
                let op = parts
                    .iter()
                    .find(|p| !p.is_named())
                    .map_or_else(String::new, |p| p.kind().to_string());
                let operand = parts.iter().find(|p| p.is_named()).copied();
                ExprKind::Unary {
                    op,
                    operand: self.boxed(operand, end),
                    postfix,
                }
            }
            "binary_expression" => ExprKind::Binary {
                op: self.op(node),
                lhs: self.boxed(field(node, "left"), node.start_byte()),
                rhs: self.boxed(field(node, "right"), end),
            },
            "assignment_expression" => ExprKind::Assign {
                op: self.op(node),
                target: self.boxed(field(node, "left"), node.start_byte()),
                value: self.boxed(field(node, "right"), end),
            },
            "ternary_expression" => ExprKind::Conditional {
                cond: self.boxed(field(node, "condition"), node.start_byte()),
                then: self.boxed(field(node, "consequence"), end),
                otherwise: self.boxed(field(node, "alternative"), end),
            },
            "cast_expression" => ExprKind::Cast {
                ty: self.type_field(node),
                expr: self.boxed(field(node, "value"), end),
            },
            "instanceof_expression" => {
                let ty = match field(node, "right").or_else(|| field(node, "pattern")) {
                    Some(t) => self.type_ref(&t),
                    None => self.error_type(end),
                };
                ExprKind::InstanceOf {
                    expr: self.boxed(field(node, "left"), node.start_byte()),
                    ty,
                }
            }
            "lambda_expression" => ExprKind::Lambda {
                params: field(node, "parameters").map_or_else(Vec::new, |p| self.lambda_params(&p)),
                body: match field(node, "body") {
                    Some(b) if b.kind() == "block" => LambdaBody::Block(self.block(&b)),
                    b => LambdaBody::Expr(self.boxed(b, end)),
                },
            },
            "method_reference" => {
                let parts = named_children(node);
                let target = match parts.first() {
                    Some(t) if is_type_node(t) => Box::new(Expr {
                        kind: ExprKind::Type(self.type_ref(t)),
                        span: span(t),
                    }),
                    Some(t) => Box::new(self.expr(t)),
                    None => Box::new(self.error_expr(node.start_byte())),
                };
                let name = parts
                    .iter()
                    .skip(1)
                    .rev()
                    .find(|p| p.kind() == "identifier")
                    .map(|n| self.name(n));
                ExprKind::MethodRef { target, name }
            }
            "class_literal" => match named_children(node).first() {
                Some(t) => ExprKind::Type(self.type_ref(t)),
                None => ExprKind::Error,
            },
            _ => ExprKind::Error,
        };
        Expr { kind, span: sp }
    }

    fn lambda_params(&mut self, node: &Node) -> Vec<LambdaParam> {
        match node.kind() {
            "identifier" => vec![LambdaParam {
                ty: None,
                name: self.name(node),
            }],
            "inferred_parameters" => named_children(node)
                .iter()
                .filter(|p| p.kind() == "identifier")
                .map(|p| LambdaParam {
                    ty: None,
                    name: self.name(p),
                })
                .collect(),
            _ => self
                .params(node)
                .into_iter()
                .map(|p| LambdaParam {
                    ty: Some(p.ty),
                    name: p.name,
                })
                .collect(),
        }
    }
}

fn is_type_node(node: &Node) -> bool {
    matches!(
        node.kind(),
        "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemId;

    fn problems(src: &str) -> Vec<(ProblemId, usize, Vec<String>)> {
        parse(src)
            .unwrap()
            .problems
            .into_iter()
            .map(|p| (p.id, p.start, p.arguments))
            .collect()
    }

    fn first_method(tree: &SyntaxTree) -> &MethodDecl {
        tree.unit.types[0]
            .members
            .iter()
            .find_map(|m| match m {
                Member::Method(m) => Some(m),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_class_with_members() {
        let tree = parse(
            "import java.util.*;\npublic class S extends PApplet {\n int y = 3;\n void f(int a) { y = a + 1; }\n S() {}\n}\n",
        )
        .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        assert_eq!(tree.unit.imports.len(), 1);
        assert!(tree.unit.imports[0].wildcard);
        assert_eq!(tree.unit.imports[0].qualified_name(), "java.util");
        let class = &tree.unit.types[0];
        assert_eq!(class.name.text, "S");
        assert!(class.modifiers.has("public"));
        assert_eq!(class.extends.as_ref().unwrap().base_name(), "PApplet");
        assert_eq!(class.members.len(), 3);
        match &class.members[2] {
            Member::Method(m) => assert!(m.is_constructor()),
            other => panic!("expected constructor, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_semicolon_reports_previous_token() {
        let src = "class A { void f(){x} }";
        let found = problems(src);
        let x = src.find('x').unwrap();
        assert!(!found.is_empty());
        assert_eq!(found[0].1, x);
        assert!(
            found.iter().any(|(id, at, args)| {
                *at == x
                    && match id {
                        ProblemId::ParsingErrorInsertTokenAfter => args.get(1).is_some_and(|a| a == ";"),
                        ProblemId::ParsingErrorInsertToComplete => args[0] == ";",
                        _ => false,
                    }
            }),
            "{found:?}"
        );
        // The noisy follow-up is reported at the same token
        assert!(found.iter().any(|(_, at, args)| *at == x && args[0] == ":: IdentifierOrNew"));
    }

    #[test]
    fn test_missing_semicolon_after_call() {
        let src = "class A { void f() { g()\n h(); } void g() {} void h() {} }";
        let found = problems(src);
        let paren = src.find(")\n").unwrap();
        assert!(
            found.iter().any(|(id, at, args)| *at == paren
                && match id {
                    ProblemId::ParsingErrorInsertTokenAfter => *args == vec![")".to_string(), ";".to_string()],
                    ProblemId::ParsingErrorInsertToComplete => args[0] == ";",
                    _ => false,
                }),
            "{found:?}"
        );
    }

    #[test]
    fn test_bare_name_statement_is_not_a_statement() {
        let found = problems("class A { int x; void f() { x; } }");
        assert_eq!(found.len(), 1, "{found:?}");
        assert_eq!(found[0].0, ProblemId::ParsingErrorInsertToComplete);
        assert_eq!(found[0].2[0], "AssignmentOperator Expression");
    }

    #[test]
    fn test_missing_closing_brace_at_end() {
        let src = "class A { void f() { if (true) { g(); }\n}";
        let found = problems(src);
        assert!(!found.is_empty());
        assert!(
            found
                .iter()
                .any(|(_, _, args)| args.iter().any(|a| a == "}")),
            "{found:?}"
        );
        assert!(found.iter().all(|(_, at, _)| *at >= src.find("}\n").unwrap()));
    }

    #[test]
    fn test_local_variables_and_loops() {
        let tree = parse(
            "class A { void f() {\n int[] xs = {1, 2};\n for (int i = 0; i < xs.length; i++) { xs[i] *= 2; }\n for (int v : xs) println(v);\n ArrayList<PVector> ps = new ArrayList<PVector>();\n float s = (float) xs[0] / 2.0;\n } }",
        )
        .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        let body = first_method(&tree).body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 5);
        match &body.stmts[0] {
            Stmt::LocalVar(decl) => {
                assert_eq!(decl.ty.base_name(), "int");
                assert_eq!(decl.ty.dims, 1);
                assert!(matches!(
                    decl.declarators[0].init.as_ref().map(|e| &e.kind),
                    Some(ExprKind::ArrayInit(items)) if items.len() == 2
                ));
            }
            other => panic!("expected local, got {other:?}"),
        }
        assert!(matches!(body.stmts[1], Stmt::For { .. }));
        match &body.stmts[2] {
            Stmt::ForEach { var, .. } => assert_eq!(var.declarators[0].name.text, "v"),
            other => panic!("expected foreach, got {other:?}"),
        }
    }

    #[test]
    fn test_generics_and_shift() {
        let tree = parse("class A { HashMap<String, ArrayList<Integer>> m; int f(int a) { return a >> 2 >>> 1; } }")
            .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        match &tree.unit.types[0].members[0] {
            Member::Field(f) => {
                assert_eq!(f.ty.base_name(), "HashMap");
                assert_eq!(f.ty.args.len(), 2);
                assert_eq!(f.ty.args[1].args[0].base_name(), "Integer");
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_switch_and_try() {
        let tree = parse(
            "class A { void f(char k) { switch (k) { case 'a': g(); break; default: h(); }\n try { g(); } catch (Exception e) { e.printStackTrace(); } finally { h(); } } }",
        )
        .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        let body = first_method(&tree).body.as_ref().unwrap();
        match &body.stmts[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].labels.len(), 1);
                assert!(cases[1].labels.is_empty());
            }
            other => panic!("expected switch, got {other:?}"),
        }
        match &body.stmts[1] {
            Stmt::Try { catches, finally, .. } => {
                assert_eq!(catches[0].name.text, "e");
                assert_eq!(catches[0].types[0].base_name(), "Exception");
                assert!(finally.is_some());
            }
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_token_is_reported() {
        let found = problems("class A { void f() { int x = 1 ) ; } }");
        assert!(!found.is_empty());
    }

    #[test]
    fn test_curly_quote_is_invalid_token() {
        let src = "class A { void f() { g(“hi”); } }";
        let found = problems(src);
        let open = src.find('“').unwrap();
        assert!(
            found
                .iter()
                .any(|(id, at, args)| *id == ProblemId::ParsingErrorInvalidToken && *at == open && args[0] == "“"),
            "{found:?}"
        );
    }

    #[test]
    fn test_unterminated_string() {
        let src = "class A { void f() { String s = \"abc;\n g(); } }";
        let found = problems(src);
        let quote = src.find('"').unwrap();
        assert!(
            found.iter().any(|(id, at, _)| *id == ProblemId::UnterminatedString && *at == quote),
            "{found:?}"
        );
    }

    #[test]
    fn test_invalid_character_constant() {
        let found = problems("class A { char c = 'ab'; }");
        assert_eq!(found.len(), 1, "{found:?}");
        assert_eq!(found[0].0, ProblemId::InvalidCharacterConstant);
    }

    #[test]
    fn test_anonymous_class_and_inner_class() {
        let tree = parse(
            "class A { Runnable r = new Runnable() { public void run() { } };\n class Ball { float x; Ball(float x) { this.x = x; } } }",
        )
        .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        assert_eq!(tree.unit.types[0].members.len(), 2);
    }

    #[test]
    fn test_lambda_and_method_reference() {
        let tree = parse(
            "class A { void f(java.util.List<String> xs) { xs.forEach(s -> println(s)); xs.forEach(System.out::println); Runnable r = () -> { g(); }; } }",
        )
        .unwrap();
        assert!(tree.problems.is_empty(), "{:?}", tree.problems);
        let body = first_method(&tree).body.as_ref().unwrap();
        let Stmt::Expr(Expr {
            kind: ExprKind::Call { args, .. },
            ..
        }) = &body.stmts[0]
        else {
            panic!("expected call, got {:?}", body.stmts[0]);
        };
        match &args[0].kind {
            ExprKind::Lambda { params, body } => {
                assert_eq!(params[0].name.text, "s");
                assert!(params[0].ty.is_none());
                assert!(matches!(body, LambdaBody::Expr(_)));
            }
            other => panic!("expected lambda, got {other:?}"),
        }
        let Stmt::Expr(Expr {
            kind: ExprKind::Call { args, .. },
            ..
        }) = &body.stmts[1]
        else {
            panic!("expected call, got {:?}", body.stmts[1]);
        };
        assert!(matches!(&args[0].kind, ExprKind::MethodRef { name: Some(n), .. } if n.text == "println"));
    }

    #[test]
    fn test_method_header_start_skips_modifiers() {
        let src = "class A { public static <T> T id(T t) { return t; } }";
        let tree = parse(src).unwrap();
        let method = first_method(&tree);
        assert_eq!(method.header_start, src.find('<').unwrap());
        assert_eq!(method.span.start, src.find("public").unwrap());
        assert_eq!(method.type_params[0].text, "T");
    }

    #[test]
    fn test_name_ids_are_unique() {
        let tree = parse("class A { int x; void f(int a) { x = a; } }").unwrap();
        let class = &tree.unit.types[0];
        let method = first_method(&tree);
        let mut ids = vec![class.name.id, method.name.id, method.params[0].name.id];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_parser_terminates_on_garbage() {
        for src in ["}}}}", "class", "class A {", "((((", "class A { void f( { } }", "a b c d ; ) ("] {
            let tree = parse(src).unwrap();
            if src != "class A {" {
                assert!(tree.has_errors() || tree.unit.types.is_empty(), "{src}");
            }
        }
    }

    #[test]
    fn test_parser_is_reusable() {
        let mut parser = JavaParser::new().unwrap();
        assert!(parser.parse("class A {}").unwrap().problems.is_empty());
        assert!(parser.parse("class B {").unwrap().has_errors());
    }
}
