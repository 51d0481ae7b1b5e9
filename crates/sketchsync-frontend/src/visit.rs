//! Read-only traversal of the syntax tree.
//!
//! Override the `visit_*` hooks you care about and call the matching `walk_*`
//! function to keep descending.

use crate::ast::*;

pub trait Visitor {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        walk_type_decl(self, decl);
    }

    fn visit_method(&mut self, method: &MethodDecl) {
        walk_method(self, method);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_type_ref(&mut self, ty: &TypeRef) {
        walk_type_ref(self, ty);
    }

    fn visit_name(&mut self, _name: &Name) {}
}

pub fn walk_unit<V: Visitor + ?Sized>(v: &mut V, unit: &CompilationUnit) {
    for decl in &unit.types {
        v.visit_type_decl(decl);
    }
}

pub fn walk_type_decl<V: Visitor + ?Sized>(v: &mut V, decl: &TypeDecl) {
    v.visit_name(&decl.name);
    if let Some(extends) = &decl.extends {
        v.visit_type_ref(extends);
    }
    for ty in &decl.implements {
        v.visit_type_ref(ty);
    }
    walk_members(v, &decl.members);
}

pub fn walk_members<V: Visitor + ?Sized>(v: &mut V, members: &[Member]) {
    for member in members {
        match member {
            Member::Field(field) => {
                v.visit_type_ref(&field.ty);
                walk_declarators(v, &field.declarators);
            }
            Member::Method(method) => v.visit_method(method),
            Member::Initializer(block) => walk_block(v, block),
            Member::Type(decl) => v.visit_type_decl(decl),
        }
    }
}

fn walk_declarators<V: Visitor + ?Sized>(v: &mut V, declarators: &[VarDeclarator]) {
    for d in declarators {
        v.visit_name(&d.name);
        if let Some(init) = &d.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_method<V: Visitor + ?Sized>(v: &mut V, method: &MethodDecl) {
    if let Some(ret) = &method.return_type {
        v.visit_type_ref(ret);
    }
    v.visit_name(&method.name);
    for param in &method.params {
        v.visit_type_ref(&param.ty);
        v.visit_name(&param.name);
    }
    for ty in &method.throws {
        v.visit_type_ref(ty);
    }
    if let Some(body) = &method.body {
        walk_block(v, body);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

fn walk_local<V: Visitor + ?Sized>(v: &mut V, decl: &LocalVarDecl) {
    v.visit_type_ref(&decl.ty);
    walk_declarators(v, &decl.declarators);
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Block(block) => walk_block(v, block),
        Stmt::LocalVar(decl) => walk_local(v, decl),
        Stmt::LocalClass(decl) => v.visit_type_decl(decl),
        Stmt::Expr(expr) | Stmt::Throw(expr, _) => v.visit_expr(expr),
        Stmt::If {
            cond,
            then,
            otherwise,
            ..
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then);
            if let Some(otherwise) = otherwise {
                v.visit_stmt(otherwise);
            }
        }
        Stmt::While { cond, body, .. } | Stmt::DoWhile { body, cond, .. } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
            ..
        } => {
            for s in init {
                v.visit_stmt(s);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            for e in update {
                v.visit_expr(e);
            }
            v.visit_stmt(body);
        }
        Stmt::ForEach {
            var,
            iterable,
            body,
            ..
        } => {
            walk_local(v, var);
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        Stmt::Switch {
            selector, cases, ..
        } => {
            v.visit_expr(selector);
            for case in cases {
                for label in &case.labels {
                    v.visit_expr(label);
                }
                for s in &case.stmts {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::Try {
            resources,
            body,
            catches,
            finally,
            ..
        } => {
            for r in resources {
                walk_local(v, r);
            }
            walk_block(v, body);
            for catch in catches {
                for ty in &catch.types {
                    v.visit_type_ref(ty);
                }
                v.visit_name(&catch.name);
                walk_block(v, &catch.body);
            }
            if let Some(finally) = finally {
                walk_block(v, finally);
            }
        }
        Stmt::Assert { cond, message, .. } => {
            v.visit_expr(cond);
            if let Some(message) = message {
                v.visit_expr(message);
            }
        }
        Stmt::Synchronized { lock, body, .. } => {
            v.visit_expr(lock);
            walk_block(v, body);
        }
        Stmt::Return(value, _) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::This | ExprKind::Super | ExprKind::Error => {}
        ExprKind::Name(name) => v.visit_name(name),
        ExprKind::Field { target, name } => {
            v.visit_expr(target);
            v.visit_name(name);
        }
        ExprKind::Call { target, name, args } => {
            if let Some(target) = target {
                v.visit_expr(target);
            }
            v.visit_name(name);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::New { ty, args, body } => {
            v.visit_type_ref(ty);
            for arg in args {
                v.visit_expr(arg);
            }
            if let Some(body) = body {
                walk_members(v, body);
            }
        }
        ExprKind::NewArray { ty, dims, init } => {
            v.visit_type_ref(ty);
            for d in dims {
                v.visit_expr(d);
            }
            for e in init.iter().flatten() {
                v.visit_expr(e);
            }
        }
        ExprKind::ArrayInit(elements) => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        ExprKind::Index { target, index } => {
            v.visit_expr(target);
            v.visit_expr(index);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Conditional {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then);
            v.visit_expr(otherwise);
        }
        ExprKind::Cast { ty, expr } => {
            v.visit_type_ref(ty);
            v.visit_expr(expr);
        }
        ExprKind::InstanceOf { expr, ty } => {
            v.visit_expr(expr);
            v.visit_type_ref(ty);
        }
        ExprKind::Paren(inner) => v.visit_expr(inner),
        ExprKind::Lambda { params, body } => {
            for param in params {
                if let Some(ty) = &param.ty {
                    v.visit_type_ref(ty);
                }
                v.visit_name(&param.name);
            }
            match body {
                LambdaBody::Expr(expr) => v.visit_expr(expr),
                LambdaBody::Block(block) => walk_block(v, block),
            }
        }
        ExprKind::MethodRef { target, name } => {
            v.visit_expr(target);
            if let Some(name) = name {
                v.visit_name(name);
            }
        }
        ExprKind::Type(ty) => v.visit_type_ref(ty),
        ExprKind::ConstructorCall { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
    }
}

pub fn walk_type_ref<V: Visitor + ?Sized>(v: &mut V, ty: &TypeRef) {
    if let TypeName::Named(names) = &ty.name {
        for name in names {
            v.visit_name(name);
        }
    }
    for arg in &ty.args {
        v.visit_type_ref(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[derive(Default)]
    struct NameCollector(Vec<String>);

    impl Visitor for NameCollector {
        fn visit_name(&mut self, name: &Name) {
            self.0.push(name.text.clone());
        }
    }

    #[test]
    fn test_visits_names_in_source_order() {
        let tree = parse("class A { int x; void f(int a) { x = a + g(x); } }").unwrap();
        let mut names = NameCollector::default();
        walk_unit(&mut names, &tree.unit);
        assert_eq!(names.0, vec!["A", "x", "f", "a", "x", "a", "g", "x"]);
    }

    #[test]
    fn test_override_can_stop_descent() {
        struct MethodsOnly(usize);
        impl Visitor for MethodsOnly {
            fn visit_method(&mut self, _method: &MethodDecl) {
                self.0 += 1;
            }
        }
        let tree = parse("class A { void f() {} void g() {} class B { void h() {} } }").unwrap();
        let mut count = MethodsOnly(0);
        walk_unit(&mut count, &tree.unit);
        assert_eq!(count.0, 3);
    }

    #[test]
    fn test_lambda_parameters_are_visited() {
        let tree = parse("class A { void f() { run((int n) -> n + 1); } }").unwrap();
        let mut names = NameCollector::default();
        walk_unit(&mut names, &tree.unit);
        assert_eq!(names.0, vec!["A", "f", "run", "n", "n"]);
    }
}
