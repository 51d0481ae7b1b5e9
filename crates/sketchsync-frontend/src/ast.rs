//! Syntax tree for the Java subset
//!
//! Every node carries a byte [`Span`] into the parsed text. Identifiers are
//! [`Name`]s with a unit-unique [`NameId`] so the binder can attach symbols
//! to individual occurrences.

use serde::{Deserialize, Serialize};

/// Half-open byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start, other.end.max(self.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub id: NameId,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub is_static: bool,
    pub path: Vec<Name>,
    /// `import a.b.*;`
    pub wildcard: bool,
    pub span: Span,
}

impl ImportDecl {
    pub fn qualified_name(&self) -> String {
        join_names(&self.path)
    }
}

pub fn join_names(names: &[Name]) -> String {
    names
        .iter()
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub keyword: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub keywords: Vec<Modifier>,
    pub annotations: Vec<Name>,
}

impl Modifiers {
    /// No keyword modifiers; annotations do not count.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|m| m.keyword == keyword)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub name: Name,
    pub type_params: Vec<Name>,
    pub extends: Option<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(Block),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: Name,
    pub dims: usize,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub type_params: Vec<Name>,
    /// `None` for constructors
    pub return_type: Option<TypeRef>,
    pub name: Name,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Option<Block>,
    /// From the first modifier (or type) to the end of the body
    pub span: Span,
    /// Where the return type, type parameters or constructor name begins
    pub header_start: usize,
}

impl MethodDecl {
    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub varargs: bool,
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Primitive(String),
    Named(Vec<Name>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    pub args: Vec<TypeRef>,
    pub dims: usize,
    pub span: Span,
}

impl TypeRef {
    /// Source form without generic arguments or dimensions.
    pub fn base_name(&self) -> String {
        match &self.name {
            TypeName::Primitive(p) => p.clone(),
            TypeName::Named(names) => join_names(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Empty for `default:`
    pub labels: Vec<Expr>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub types: Vec<TypeRef>,
    pub name: Name,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    LocalVar(LocalVarDecl),
    LocalClass(TypeDecl),
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        span: Span,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    ForEach {
        var: LocalVarDecl,
        iterable: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Try {
        /// `try (var r = ...)` declarations
        resources: Vec<LocalVarDecl>,
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
        span: Span,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
        span: Span,
    },
    Synchronized {
        lock: Expr,
        body: Block,
        span: Span,
    },
    Return(Option<Expr>, Span),
    Throw(Expr, Span),
    Break(Span),
    Continue(Span),
    Empty(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Int,
    Float,
    Char,
    Str,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(LiteralKind),
    Name(Name),
    This,
    Super,
    Field {
        target: Box<Expr>,
        name: Name,
    },
    Call {
        target: Option<Box<Expr>>,
        name: Name,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
        body: Option<Vec<Member>>,
    },
    NewArray {
        ty: TypeRef,
        dims: Vec<Expr>,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        postfix: bool,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
    },
    Paren(Box<Expr>),
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
    },
    /// `target::name`; `name` is `None` for `::new`
    MethodRef {
        target: Box<Expr>,
        name: Option<Name>,
    },
    /// A type in expression position: `Foo.class`, `int[]::new`
    Type(TypeRef),
    /// `this(..)` or `super(..)` at the start of a constructor body
    ConstructorCall {
        is_super: bool,
        args: Vec<Expr>,
    },
    /// Placeholder for a node that error recovery left incomplete
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    /// `None` when the type is inferred
    pub ty: Option<TypeRef>,
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}
