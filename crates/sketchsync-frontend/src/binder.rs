//! Binding of names to declarations.
//!
//! The binder walks a parsed unit, records every declaration the sketch makes
//! and attaches a [`Symbol`] to each name it can resolve. Names defined on the
//! class path resolve to [`Symbol::External`] handles; everything declared in
//! the unit itself resolves to [`Symbol::Local`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::*;
use crate::parser::SyntaxTree;
use crate::problem::{CompilerProblem, ProblemId};
use crate::resolve::{ExternalKind, ImportResolver, ResolvedHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Field,
    Method,
    Constructor,
    Parameter,
    LocalVariable,
}

impl DeclKind {
    pub fn is_type(&self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Interface | DeclKind::Enum)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclKind,
    pub name: String,
    pub name_id: NameId,
    pub name_span: Span,
    /// Enclosing type, if any
    pub container: Option<DeclId>,
    /// Declared type of variables, return type of methods
    pub type_name: Option<String>,
}

/// What a name refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Local(DeclId),
    External(ResolvedHandle),
}

/// One identifier occurrence in the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub id: NameId,
    pub text: String,
    pub span: Span,
    pub is_declaration: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    decls: Vec<Declaration>,
    names: Vec<NameRef>,
    symbols: HashMap<NameId, Symbol>,
    constructors: HashMap<DeclId, Vec<DeclId>>,
    problems: Vec<CompilerProblem>,
}

impl Bindings {
    pub fn declarations(&self) -> &[Declaration] {
        &self.decls
    }

    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    pub fn names(&self) -> &[NameRef] {
        &self.names
    }

    /// Name whose span covers `offset`; a name ending exactly at `offset`
    /// counts when nothing starts there.
    pub fn name_at(&self, offset: usize) -> Option<&NameRef> {
        let idx = self.names.partition_point(|n| n.span.start <= offset);
        let candidate = idx.checked_sub(1).and_then(|i| self.names.get(i))?;
        (offset < candidate.span.end || offset == candidate.span.end).then_some(candidate)
    }

    pub fn symbol_of(&self, name: NameId) -> Option<&Symbol> {
        self.symbols.get(&name)
    }

    pub fn symbol_at(&self, offset: usize) -> Option<&Symbol> {
        self.name_at(offset).and_then(|n| self.symbol_of(n.id))
    }

    /// Every occurrence bound to `symbol`, in source order.
    pub fn occurrences(&self, symbol: &Symbol) -> Vec<&NameRef> {
        self.names
            .iter()
            .filter(|n| self.symbols.get(&n.id) == Some(symbol))
            .collect()
    }

    pub fn constructors_of(&self, class: DeclId) -> &[DeclId] {
        self.constructors.get(&class).map_or(&[], Vec::as_slice)
    }

    pub fn problems(&self) -> &[CompilerProblem] {
        &self.problems
    }
}

pub fn bind(tree: &SyntaxTree, resolver: &dyn ImportResolver) -> Bindings {
    let mut binder = Binder::new(resolver);
    binder.bind_imports(&tree.unit.imports);
    for decl in &tree.unit.types {
        binder.collect_type(decl, None);
    }
    binder.resolve_supertypes();
    for decl in &tree.unit.types {
        binder.bind_type(decl);
    }
    let bindings = binder.finish();
    tracing::debug!(
        declarations = bindings.decls.len(),
        names = bindings.names.len(),
        problems = bindings.problems.len(),
        "bound compilation unit"
    );
    bindings
}

#[derive(Debug, Clone)]
enum SuperRef {
    Unresolved(Option<TypeRef>),
    Local(usize),
    External(String),
    Object,
}

#[derive(Debug)]
struct TypeInfo {
    decl: Option<DeclId>,
    name: String,
    fields: HashMap<String, DeclId>,
    methods: HashMap<String, Vec<(DeclId, usize)>>,
    superclass: SuperRef,
}

#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, DeclId>,
    locals: Vec<DeclId>,
}

#[derive(Debug, Default)]
struct Imports {
    single: HashMap<String, String>,
    wildcards: Vec<String>,
    static_single: HashMap<String, String>,
    static_wildcards: Vec<String>,
}

struct Binder<'r> {
    resolver: &'r dyn ImportResolver,
    out: Bindings,
    imports: Imports,
    types: Vec<TypeInfo>,
    type_by_name: HashMap<String, usize>,
    type_of_decl: HashMap<DeclId, usize>,
    type_of_name: HashMap<NameId, usize>,
    type_stack: Vec<usize>,
    type_params: Vec<Vec<String>>,
    scopes: Vec<Scope>,
    method_base: usize,
    uses: HashMap<DeclId, usize>,
}

const MAX_SUPER_DEPTH: usize = 32;

impl<'r> Binder<'r> {
    fn new(resolver: &'r dyn ImportResolver) -> Self {
        Binder {
            resolver,
            out: Bindings::default(),
            imports: Imports::default(),
            types: Vec::new(),
            type_by_name: HashMap::new(),
            type_of_decl: HashMap::new(),
            type_of_name: HashMap::new(),
            type_stack: Vec::new(),
            type_params: Vec::new(),
            scopes: Vec::new(),
            method_base: 0,
            uses: HashMap::new(),
        }
    }

    fn finish(mut self) -> Bindings {
        self.out.names.sort_by_key(|n| (n.span.start, n.span.end));
        self.out.problems.sort_by_key(|p| p.start);
        self.out
    }

    // ---- bookkeeping ----

    fn record(&mut self, name: &Name, is_declaration: bool) {
        if name.text.is_empty() {
            return;
        }
        self.out.names.push(NameRef {
            id: name.id,
            text: name.text.clone(),
            span: name.span,
            is_declaration,
        });
    }

    fn bind_name(&mut self, name: &Name, symbol: Symbol) {
        if let Symbol::Local(id) = &symbol {
            *self.uses.entry(*id).or_default() += 1;
        }
        self.out.symbols.insert(name.id, symbol);
    }

    fn declare(&mut self, name: &Name, kind: DeclKind, type_name: Option<String>) -> DeclId {
        let id = DeclId(self.out.decls.len() as u32);
        let container = self.type_stack.last().and_then(|&t| self.types[t].decl);
        self.out.decls.push(Declaration {
            id,
            kind,
            name: name.text.clone(),
            name_id: name.id,
            name_span: name.span,
            container,
            type_name,
        });
        self.record(name, true);
        self.out.symbols.insert(name.id, Symbol::Local(id));
        id
    }

    fn problem(&mut self, id: ProblemId, span: Span, message: String, arguments: Vec<String>) {
        self.out
            .problems
            .push(CompilerProblem::error(id, span.start, span.end, message, arguments));
    }

    // ---- imports ----

    fn bind_imports(&mut self, imports: &[ImportDecl]) {
        for import in imports {
            for name in &import.path {
                self.record(name, false);
            }
            let qualified = import.qualified_name();
            if import.path.iter().any(|n| n.text.is_empty()) {
                continue;
            }
            let found = if import.is_static {
                let (owner, member) = qualified.rsplit_once('.').unwrap_or(("", &qualified));
                if import.wildcard {
                    let ok = self.resolver.resolve_type(&qualified).is_some();
                    if ok {
                        self.imports.static_wildcards.push(qualified.clone());
                    }
                    ok
                } else {
                    let ok = self.resolver.resolve_type(owner).is_some();
                    if ok {
                        self.imports
                            .static_single
                            .insert(member.to_string(), owner.to_string());
                    }
                    ok
                }
            } else if import.wildcard {
                let ok = self.resolver.has_package(&qualified)
                    || self.resolver.resolve_type(&qualified).is_some();
                if ok {
                    self.imports.wildcards.push(qualified.clone());
                }
                ok
            } else {
                match self.resolver.resolve_type(&qualified) {
                    Some(handle) => {
                        if let Some(last) = import.path.last() {
                            self.imports
                                .single
                                .insert(last.text.clone(), qualified.clone());
                            self.bind_name(last, Symbol::External(handle));
                        }
                        true
                    }
                    None => false,
                }
            };
            if found {
                self.bind_package_prefixes(&import.path);
            } else {
                let span = match (import.path.first(), import.path.last()) {
                    (Some(first), Some(last)) => first.span.to(last.span),
                    _ => import.span,
                };
                self.problem(
                    ProblemId::ImportNotFound,
                    span,
                    format!("The import {qualified} cannot be resolved"),
                    vec![qualified],
                );
            }
        }
    }

    fn bind_package_prefixes(&mut self, path: &[Name]) {
        for i in 0..path.len() {
            let prefix = join_names(&path[..=i]);
            if self.resolver.has_package(&prefix) {
                self.bind_name(
                    &path[i],
                    Symbol::External(ResolvedHandle::new(prefix, ExternalKind::Package)),
                );
            }
        }
    }

    // ---- types ----

    fn collect_type(&mut self, decl: &TypeDecl, outer: Option<usize>) -> usize {
        let kind = match decl.kind {
            TypeKind::Class => DeclKind::Class,
            TypeKind::Interface => DeclKind::Interface,
            TypeKind::Enum => DeclKind::Enum,
        };
        if let Some(outer) = outer {
            self.type_stack.push(outer);
        }
        let id = self.declare(&decl.name, kind, None);
        if outer.is_some() {
            self.type_stack.pop();
        }

        let idx = self.types.len();
        self.types.push(TypeInfo {
            decl: Some(id),
            name: decl.name.text.clone(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            superclass: SuperRef::Unresolved(decl.extends.clone()),
        });
        self.type_by_name.entry(decl.name.text.clone()).or_insert(idx);
        self.type_of_decl.insert(id, idx);
        self.type_of_name.insert(decl.name.id, idx);

        self.type_stack.push(idx);
        self.collect_members(idx, &decl.members);
        self.type_stack.pop();
        idx
    }

    fn collect_members(&mut self, idx: usize, members: &[Member]) {
        for member in members {
            match member {
                Member::Field(field) => {
                    let ty = field.ty.base_name();
                    for d in &field.declarators {
                        let id = self.declare(&d.name, DeclKind::Field, Some(ty.clone()));
                        self.types[idx].fields.entry(d.name.text.clone()).or_insert(id);
                    }
                }
                Member::Method(method) => {
                    let kind = if method.is_constructor() {
                        DeclKind::Constructor
                    } else {
                        DeclKind::Method
                    };
                    let ret = method.return_type.as_ref().map(TypeRef::base_name);
                    let id = self.declare(&method.name, kind, ret);
                    if kind == DeclKind::Constructor {
                        if let Some(class) = self.types[idx].decl {
                            self.out.constructors.entry(class).or_default().push(id);
                        }
                    } else {
                        self.types[idx]
                            .methods
                            .entry(method.name.text.clone())
                            .or_default()
                            .push((id, method.params.len()));
                    }
                }
                Member::Type(inner) => {
                    self.collect_type(inner, Some(idx));
                }
                Member::Initializer(_) => {}
            }
        }
    }

    fn resolve_supertypes(&mut self) {
        for idx in 0..self.types.len() {
            let SuperRef::Unresolved(extends) = &self.types[idx].superclass else {
                continue;
            };
            let extends = extends.clone();
            let resolved = match extends {
                None => SuperRef::Object,
                Some(ty) => match self.resolve_type_ref(&ty) {
                    Some(Symbol::Local(id)) => self
                        .type_of_decl
                        .get(&id)
                        .map_or(SuperRef::Object, |&t| SuperRef::Local(t)),
                    Some(Symbol::External(handle)) => SuperRef::External(handle.qualified_name),
                    None => SuperRef::Object,
                },
            };
            self.types[idx].superclass = resolved;
        }
    }

    fn is_type_param(&self, name: &str) -> bool {
        self.type_params
            .iter()
            .any(|params| params.iter().any(|p| p == name))
    }

    fn lookup_type(&self, simple: &str) -> Option<Symbol> {
        if let Some(&idx) = self.type_by_name.get(simple) {
            if let Some(decl) = self.types[idx].decl {
                return Some(Symbol::Local(decl));
            }
        }
        if let Some(qualified) = self.imports.single.get(simple) {
            if let Some(handle) = self.resolver.resolve_type(qualified) {
                return Some(Symbol::External(handle));
            }
        }
        self.imports
            .wildcards
            .iter()
            .find_map(|pkg| self.resolver.resolve_type(&format!("{pkg}.{simple}")))
            .or_else(|| self.resolver.resolve_type(&format!("java.lang.{simple}")))
            .map(Symbol::External)
    }

    fn resolve_type_ref(&mut self, ty: &TypeRef) -> Option<Symbol> {
        for arg in &ty.args {
            self.resolve_type_ref(arg);
        }
        let TypeName::Named(names) = &ty.name else {
            return None;
        };
        let (first, last) = (names.first()?, names.last()?);
        for name in names {
            self.record(name, false);
        }
        if names.len() == 1 {
            // `var` is inferred, not a type name
            if self.is_type_param(&first.text) || first.text.is_empty() || first.text == "var" {
                return None;
            }
            return match self.lookup_type(&first.text) {
                Some(symbol) => {
                    self.bind_name(first, symbol.clone());
                    Some(symbol)
                }
                None => {
                    let text = first.text.clone();
                    self.problem(
                        ProblemId::UndefinedType,
                        first.span,
                        format!("{text} cannot be resolved to a type"),
                        vec![text],
                    );
                    None
                }
            };
        }

        let full = join_names(names);
        if let Some(handle) = self.resolver.resolve_type(&full) {
            self.bind_package_prefixes(&names[..names.len() - 1]);
            let symbol = Symbol::External(handle);
            self.bind_name(last, symbol.clone());
            Some(symbol)
        } else if let Some(symbol) = self.lookup_type(&first.text) {
            // Member types are not tracked; only the outer type binds
            self.bind_name(first, symbol);
            None
        } else {
            self.problem(
                ProblemId::UndefinedType,
                first.span.to(last.span),
                format!("{full} cannot be resolved to a type"),
                vec![full],
            );
            None
        }
    }

    // ---- member lookup ----

    fn lookup_field_in(&self, start: usize, name: &str) -> Option<Symbol> {
        let mut current = start;
        for _ in 0..MAX_SUPER_DEPTH {
            let info = &self.types[current];
            if let Some(&id) = info.fields.get(name) {
                return Some(Symbol::Local(id));
            }
            match &info.superclass {
                SuperRef::Local(next) => current = *next,
                SuperRef::External(qualified) => {
                    return self
                        .resolver
                        .resolve_member(qualified, name, ExternalKind::Field)
                        .map(Symbol::External);
                }
                SuperRef::Object | SuperRef::Unresolved(_) => return None,
            }
        }
        None
    }

    fn lookup_method_in(&self, start: usize, name: &str, arity: usize) -> Option<Symbol> {
        let mut current = start;
        for _ in 0..MAX_SUPER_DEPTH {
            let info = &self.types[current];
            if let Some(overloads) = info.methods.get(name) {
                let chosen = overloads
                    .iter()
                    .find(|(_, n)| *n == arity)
                    .or(overloads.first());
                if let Some((id, _)) = chosen {
                    return Some(Symbol::Local(*id));
                }
            }
            let qualified = match &info.superclass {
                SuperRef::Local(next) => {
                    current = *next;
                    continue;
                }
                SuperRef::External(qualified) => qualified.as_str(),
                SuperRef::Object | SuperRef::Unresolved(_) => "java.lang.Object",
            };
            return self
                .resolver
                .resolve_member(qualified, name, ExternalKind::Method)
                .map(Symbol::External);
        }
        None
    }

    fn lookup_static(&self, name: &str, kind: ExternalKind) -> Option<Symbol> {
        if let Some(owner) = self.imports.static_single.get(name) {
            if let Some(handle) = self.resolver.resolve_member(owner, name, kind) {
                return Some(Symbol::External(handle));
            }
        }
        self.imports
            .static_wildcards
            .iter()
            .find_map(|owner| self.resolver.resolve_member(owner, name, kind))
            .map(Symbol::External)
    }

    fn lookup_local(&self, name: &str) -> Option<DeclId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.vars.get(name).copied())
    }

    fn lookup_variable(&self, name: &str) -> Option<Symbol> {
        if let Some(id) = self.lookup_local(name) {
            return Some(Symbol::Local(id));
        }
        self.type_stack
            .iter()
            .rev()
            .find_map(|&t| self.lookup_field_in(t, name))
            .or_else(|| self.lookup_static(name, ExternalKind::Field))
    }

    fn lookup_method(&self, name: &str, arity: usize) -> Option<Symbol> {
        self.type_stack
            .iter()
            .rev()
            .find_map(|&t| self.lookup_method_in(t, name, arity))
            .or_else(|| self.lookup_static(name, ExternalKind::Method))
    }

    fn type_index_of(&self, symbol: &Symbol) -> Option<usize> {
        match symbol {
            Symbol::Local(id) => self.type_of_decl.get(id).copied(),
            Symbol::External(_) => None,
        }
    }

    // ---- scopes ----

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for id in scope.locals {
            if self.uses.get(&id).copied().unwrap_or(0) > 0 {
                continue;
            }
            let Some(decl) = self.out.decls.get(id.0 as usize) else {
                continue;
            };
            let (span, name) = (decl.name_span, decl.name.clone());
            self.out.problems.push(CompilerProblem::warning(
                ProblemId::LocalVariableIsNeverUsed,
                span.start,
                span.end,
                format!("The value of the local variable {name} is not used"),
                vec![name],
            ));
        }
    }

    /// `ty` is `None` for inferred lambda parameters.
    fn declare_local(&mut self, name: &Name, kind: DeclKind, ty: Option<&TypeRef>) {
        if name.text.is_empty() {
            return;
        }
        let duplicate = self.scopes[self.method_base.min(self.scopes.len())..]
            .iter()
            .any(|s| s.vars.contains_key(&name.text));
        if duplicate {
            self.problem(
                ProblemId::DuplicateLocalVariable,
                name.span,
                format!("Duplicate local variable {}", name.text),
                vec![name.text.clone()],
            );
        }
        let type_name = ty.map(|ty| {
            let mut type_name = ty.base_name();
            for _ in 0..ty.dims {
                type_name.push_str("[]");
            }
            type_name
        });
        let id = self.declare(name, kind, type_name);
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.insert(name.text.clone(), id);
            if kind == DeclKind::LocalVariable {
                scope.locals.push(id);
            }
        }
    }

    // ---- declarations ----

    fn bind_type(&mut self, decl: &TypeDecl) {
        let Some(&idx) = self.type_of_name.get(&decl.name.id) else {
            return;
        };
        for ty in &decl.implements {
            self.resolve_type_ref(ty);
        }
        self.type_stack.push(idx);
        self.type_params
            .push(decl.type_params.iter().map(|p| p.text.clone()).collect());
        self.bind_members(&decl.members);
        self.type_params.pop();
        self.type_stack.pop();
    }

    fn bind_members(&mut self, members: &[Member]) {
        for member in members {
            match member {
                Member::Field(field) => {
                    self.resolve_type_ref(&field.ty);
                    for d in &field.declarators {
                        if let Some(init) = &d.init {
                            self.push_scope();
                            self.bind_expr(init);
                            self.pop_scope();
                        }
                    }
                }
                Member::Method(method) => self.bind_method(method),
                Member::Initializer(block) => {
                    let base = std::mem::replace(&mut self.method_base, self.scopes.len());
                    self.bind_block(block);
                    self.method_base = base;
                }
                Member::Type(inner) => self.bind_type(inner),
            }
        }
    }

    fn bind_method(&mut self, method: &MethodDecl) {
        self.type_params
            .push(method.type_params.iter().map(|p| p.text.clone()).collect());
        if let Some(ret) = &method.return_type {
            self.resolve_type_ref(ret);
        }
        let base = std::mem::replace(&mut self.method_base, self.scopes.len());
        self.push_scope();
        for param in &method.params {
            self.resolve_type_ref(&param.ty);
            self.declare_local(&param.name, DeclKind::Parameter, Some(&param.ty));
        }
        for ty in &method.throws {
            self.resolve_type_ref(ty);
        }
        if let Some(body) = &method.body {
            self.bind_block(body);
        }
        self.pop_scope();
        self.method_base = base;
        self.type_params.pop();
    }

    fn bind_local_class(&mut self, decl: &TypeDecl) {
        let outer = self.type_stack.last().copied();
        self.collect_type(decl, outer);
        self.resolve_supertypes();
        self.bind_type(decl);
    }

    fn bind_anonymous(&mut self, base: Option<Symbol>, members: &[Member]) {
        let superclass = match &base {
            Some(Symbol::Local(id)) => self
                .type_of_decl
                .get(id)
                .map_or(SuperRef::Object, |&t| SuperRef::Local(t)),
            Some(Symbol::External(handle)) => SuperRef::External(handle.qualified_name.clone()),
            None => SuperRef::Object,
        };
        let idx = self.types.len();
        self.types.push(TypeInfo {
            decl: None,
            name: String::new(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            superclass,
        });
        self.type_stack.push(idx);
        self.collect_members(idx, members);
        self.bind_members(members);
        self.type_stack.pop();
    }

    // ---- statements ----

    fn bind_block(&mut self, block: &Block) {
        self.push_scope();
        for stmt in &block.stmts {
            self.bind_stmt(stmt);
        }
        self.pop_scope();
    }

    fn bind_local_var(&mut self, decl: &LocalVarDecl) {
        self.resolve_type_ref(&decl.ty);
        for d in &decl.declarators {
            if let Some(init) = &d.init {
                self.bind_expr(init);
            }
            self.declare_local(&d.name, DeclKind::LocalVariable, Some(&decl.ty));
        }
    }

    fn bind_nested(&mut self, stmt: &Stmt) {
        self.push_scope();
        self.bind_stmt(stmt);
        self.pop_scope();
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.bind_block(block),
            Stmt::LocalVar(decl) => self.bind_local_var(decl),
            Stmt::LocalClass(decl) => self.bind_local_class(decl),
            Stmt::Expr(expr) | Stmt::Throw(expr, _) => {
                self.bind_expr(expr);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                self.bind_expr(cond);
                self.bind_nested(then);
                if let Some(otherwise) = otherwise {
                    self.bind_nested(otherwise);
                }
            }
            Stmt::While { cond, body, .. } | Stmt::DoWhile { body, cond, .. } => {
                self.bind_expr(cond);
                self.bind_nested(body);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                self.push_scope();
                for s in init {
                    self.bind_stmt(s);
                }
                if let Some(cond) = cond {
                    self.bind_expr(cond);
                }
                for e in update {
                    self.bind_expr(e);
                }
                self.bind_nested(body);
                self.pop_scope();
            }
            Stmt::ForEach {
                var,
                iterable,
                body,
                ..
            } => {
                self.bind_expr(iterable);
                self.push_scope();
                self.bind_local_var(var);
                self.bind_nested(body);
                self.pop_scope();
            }
            Stmt::Switch {
                selector, cases, ..
            } => {
                self.bind_expr(selector);
                self.push_scope();
                for case in cases {
                    for label in &case.labels {
                        // Enum constants in labels are unqualified
                        if let ExprKind::Name(name) = &label.kind {
                            self.record(name, false);
                            if let Some(symbol) = self.lookup_variable(&name.text) {
                                self.bind_name(name, symbol);
                            }
                        } else {
                            self.bind_expr(label);
                        }
                    }
                    for s in &case.stmts {
                        self.bind_stmt(s);
                    }
                }
                self.pop_scope();
            }
            Stmt::Try {
                resources,
                body,
                catches,
                finally,
                ..
            } => {
                self.push_scope();
                for r in resources {
                    self.bind_local_var(r);
                    // Closing a resource counts as using it
                    for d in &r.declarators {
                        if let Some(Symbol::Local(id)) = self.out.symbols.get(&d.name.id).cloned() {
                            *self.uses.entry(id).or_default() += 1;
                        }
                    }
                }
                self.bind_block(body);
                self.pop_scope();
                for catch in catches {
                    for ty in &catch.types {
                        self.resolve_type_ref(ty);
                    }
                    self.push_scope();
                    self.declare_local(&catch.name, DeclKind::Parameter, catch.types.first());
                    self.bind_block(&catch.body);
                    self.pop_scope();
                }
                if let Some(finally) = finally {
                    self.bind_block(finally);
                }
            }
            Stmt::Assert { cond, message, .. } => {
                self.bind_expr(cond);
                if let Some(message) = message {
                    self.bind_expr(message);
                }
            }
            Stmt::Synchronized { lock, body, .. } => {
                self.bind_expr(lock);
                self.bind_block(body);
            }
            Stmt::Return(value, _) => {
                if let Some(value) = value {
                    self.bind_expr(value);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
        }
    }

    // ---- expressions ----

    fn guess_type(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(kind) => match kind {
                LiteralKind::Int => "int",
                LiteralKind::Float => "float",
                LiteralKind::Char => "char",
                LiteralKind::Str => "String",
                LiteralKind::Bool => "boolean",
                LiteralKind::Null => "null",
            }
            .to_string(),
            ExprKind::Name(name) => match self.out.symbols.get(&name.id) {
                Some(Symbol::Local(id)) => self
                    .out
                    .decls
                    .get(id.0 as usize)
                    .and_then(|d| d.type_name.clone())
                    .unwrap_or_else(|| "Object".to_string()),
                _ => "Object".to_string(),
            },
            ExprKind::Paren(inner) => self.guess_type(inner),
            ExprKind::Cast { ty, .. } | ExprKind::New { ty, .. } => ty.base_name(),
            ExprKind::Binary { op, lhs, rhs } => match op.as_str() {
                "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => "boolean".to_string(),
                _ => {
                    let (l, r) = (self.guess_type(lhs), self.guess_type(rhs));
                    if l == "String" || r == "String" {
                        "String".to_string()
                    } else if l == "float" || r == "float" {
                        "float".to_string()
                    } else {
                        l
                    }
                }
            },
            _ => "Object".to_string(),
        }
    }

    fn undefined_method(&mut self, name: &Name, args: &[Expr], owner: String) {
        let arg_types: Vec<String> = args.iter().map(|a| self.guess_type(a)).collect();
        let arg_types = arg_types.join(", ");
        let text = name.text.clone();
        self.problem(
            ProblemId::UndefinedMethod,
            name.span,
            format!("The method {text}({arg_types}) is undefined for the type {owner}"),
            vec![owner, text, arg_types],
        );
    }

    fn current_type_name(&self) -> String {
        self.type_stack
            .iter()
            .rev()
            .map(|&t| self.types[t].name.as_str())
            .find(|n| !n.is_empty())
            .unwrap_or("Object")
            .to_string()
    }

    /// Binds `expr` and returns what it names, when it is a name at all.
    fn bind_expr(&mut self, expr: &Expr) -> Option<Symbol> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Error => None,
            ExprKind::This | ExprKind::Super => None,
            ExprKind::Name(name) => {
                self.record(name, false);
                let symbol = self
                    .lookup_variable(&name.text)
                    .or_else(|| self.lookup_type(&name.text))
                    .or_else(|| {
                        self.resolver.has_package(&name.text).then(|| {
                            Symbol::External(ResolvedHandle::new(
                                name.text.clone(),
                                ExternalKind::Package,
                            ))
                        })
                    });
                match symbol {
                    Some(symbol) => {
                        self.bind_name(name, symbol.clone());
                        Some(symbol)
                    }
                    None => {
                        let text = name.text.clone();
                        self.problem(
                            ProblemId::UndefinedName,
                            name.span,
                            format!("{text} cannot be resolved to a variable"),
                            vec![text],
                        );
                        None
                    }
                }
            }
            ExprKind::Field { target, name } => {
                self.record(name, false);
                let symbol = match &target.kind {
                    ExprKind::This => self
                        .type_stack
                        .last()
                        .and_then(|&t| self.lookup_field_in(t, &name.text)),
                    ExprKind::Super => self.super_of_current().and_then(|sup| match sup {
                        SuperRef::Local(t) => self.lookup_field_in(t, &name.text),
                        SuperRef::External(q) => self
                            .resolver
                            .resolve_member(&q, &name.text, ExternalKind::Field)
                            .map(Symbol::External),
                        _ => None,
                    }),
                    _ => {
                        let owner = self.bind_expr(target);
                        self.member_of(owner.as_ref(), &name.text)
                    }
                };
                if let Some(symbol) = &symbol {
                    self.bind_name(name, symbol.clone());
                }
                symbol
            }
            ExprKind::Call { target, name, args } => {
                self.record(name, false);
                let owner = match target.as_deref() {
                    None => None,
                    Some(Expr {
                        kind: ExprKind::This,
                        ..
                    }) => None,
                    Some(Expr {
                        kind: ExprKind::Super,
                        ..
                    }) => None,
                    Some(t) => Some(self.bind_expr(t)),
                };
                for arg in args {
                    self.bind_expr(arg);
                }
                let symbol = match (target.as_deref(), owner) {
                    (None, _) => {
                        let found = self.lookup_method(&name.text, args.len());
                        if found.is_none() {
                            let owner = self.current_type_name();
                            self.undefined_method(name, args, owner);
                        }
                        found
                    }
                    (Some(Expr { kind: ExprKind::This, .. }), _) => self
                        .type_stack
                        .last()
                        .and_then(|&t| self.lookup_method_in(t, &name.text, args.len())),
                    (Some(Expr { kind: ExprKind::Super, .. }), _) => {
                        self.super_of_current().and_then(|sup| match sup {
                            SuperRef::Local(t) => self.lookup_method_in(t, &name.text, args.len()),
                            SuperRef::External(q) => self
                                .resolver
                                .resolve_member(&q, &name.text, ExternalKind::Method)
                                .map(Symbol::External),
                            _ => None,
                        })
                    }
                    (Some(_), Some(Some(owner))) => self.method_of(&owner, &name.text, args.len()),
                    _ => None,
                };
                if let Some(symbol) = &symbol {
                    self.bind_name(name, symbol.clone());
                }
                None
            }
            ExprKind::New { ty, args, body } => {
                let base = self.resolve_type_ref(ty);
                for arg in args {
                    self.bind_expr(arg);
                }
                if let Some(body) = body {
                    self.bind_anonymous(base, body);
                }
                None
            }
            ExprKind::NewArray { ty, dims, init } => {
                self.resolve_type_ref(ty);
                for d in dims {
                    self.bind_expr(d);
                }
                for e in init.iter().flatten() {
                    self.bind_expr(e);
                }
                None
            }
            ExprKind::ArrayInit(elements) => {
                for e in elements {
                    self.bind_expr(e);
                }
                None
            }
            ExprKind::Index { target, index } => {
                self.bind_expr(target);
                self.bind_expr(index);
                None
            }
            ExprKind::Unary { operand, .. } => {
                self.bind_expr(operand);
                None
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.bind_expr(lhs);
                self.bind_expr(rhs);
                None
            }
            ExprKind::Assign { target, value, .. } => {
                self.bind_expr(target);
                self.bind_expr(value);
                None
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.bind_expr(cond);
                self.bind_expr(then);
                self.bind_expr(otherwise);
                None
            }
            ExprKind::Cast { ty, expr } => {
                self.resolve_type_ref(ty);
                self.bind_expr(expr);
                None
            }
            ExprKind::InstanceOf { expr, ty } => {
                self.bind_expr(expr);
                self.resolve_type_ref(ty);
                None
            }
            ExprKind::Paren(inner) => {
                self.bind_expr(inner);
                None
            }
            ExprKind::Lambda { params, body } => {
                self.push_scope();
                for param in params {
                    if let Some(ty) = &param.ty {
                        self.resolve_type_ref(ty);
                    }
                    self.declare_local(&param.name, DeclKind::Parameter, param.ty.as_ref());
                }
                match body {
                    LambdaBody::Expr(expr) => {
                        self.bind_expr(expr);
                    }
                    LambdaBody::Block(block) => self.bind_block(block),
                }
                self.pop_scope();
                None
            }
            ExprKind::MethodRef { target, name } => {
                let owner = self.bind_expr(target);
                if let Some(name) = name {
                    self.record(name, false);
                    if let Some(symbol) = owner.and_then(|owner| self.method_of(&owner, &name.text, 0)) {
                        self.bind_name(name, symbol);
                    }
                }
                None
            }
            ExprKind::Type(ty) => self.resolve_type_ref(ty),
            ExprKind::ConstructorCall { args, .. } => {
                for arg in args {
                    self.bind_expr(arg);
                }
                None
            }
        }
    }

    fn super_of_current(&self) -> Option<SuperRef> {
        let &t = self.type_stack.last()?;
        Some(self.types[t].superclass.clone())
    }

    /// `owner.name` where `owner` is a package or a type.
    fn member_of(&self, owner: Option<&Symbol>, name: &str) -> Option<Symbol> {
        match owner? {
            Symbol::External(handle) if handle.kind == ExternalKind::Package => {
                let qualified = format!("{}.{name}", handle.qualified_name);
                self.resolver
                    .resolve_type(&qualified)
                    .map(Symbol::External)
                    .or_else(|| {
                        self.resolver.has_package(&qualified).then(|| {
                            Symbol::External(ResolvedHandle::new(qualified, ExternalKind::Package))
                        })
                    })
            }
            Symbol::External(handle) if handle.kind == ExternalKind::Type => self
                .resolver
                .resolve_member(&handle.qualified_name, name, ExternalKind::Field)
                .map(Symbol::External),
            symbol @ Symbol::Local(_) => {
                let t = self.type_index_of(symbol)?;
                self.types[t].fields.get(name).map(|&id| Symbol::Local(id))
            }
            Symbol::External(_) => None,
        }
    }

    fn method_of(&self, owner: &Symbol, name: &str, arity: usize) -> Option<Symbol> {
        match owner {
            Symbol::External(handle) if handle.kind == ExternalKind::Type => self
                .resolver
                .resolve_member(&handle.qualified_name, name, ExternalKind::Method)
                .map(Symbol::External),
            Symbol::Local(_) => {
                let t = self.type_index_of(owner)?;
                self.lookup_method_in(t, name, arity)
            }
            Symbol::External(_) => None,
        }
    }
}
