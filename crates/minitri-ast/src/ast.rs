//! AST node definitions for Mini Triangle parser output.
//!
//! The parser produces simple untyped structures: just syntactic form plus
//! source locations. Types are checked later, during code generation.
//! Every node owns its children exclusively; the tree is write-once and
//! contains no sharing or back pointers.

use crate::foundation::{BinaryOp, Span, UnaryOp};

/// A complete parsed program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The top-level command.
    pub body: Command,
    /// Span of the whole program text.
    pub span: Span,
}

/// A command (statement).
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub span: Span,
}

impl Command {
    pub fn new(kind: CommandKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Command kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// `target := value`
    Assign {
        /// Name of the variable being assigned.
        target: Name,
        value: Expr,
    },

    /// `name(args)` in command position.
    Call { name: Name, args: Vec<Expr> },

    /// Two or more commands joined by `;`.
    Sequence(Vec<Command>),

    /// `if cond then … else …` — both branches are required.
    If {
        cond: Expr,
        then_branch: Box<Command>,
        else_branch: Box<Command>,
    },

    /// `while cond do body`
    While { cond: Expr, body: Box<Command> },

    /// `let decls in body`
    Let {
        decls: Vec<Declaration>,
        body: Box<Command>,
    },

    /// `begin … end`
    Block(Box<Command>),

    /// `return expr` — only meaningful inside a `func` body.
    Return(Expr),
}

/// A declaration inside a `let`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub span: Span,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Declaration kinds.
///
/// Declarations are elaborated strictly in source order: a later declaration
/// may refer to an earlier one in the same list, never the reverse.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationKind {
    /// `const name ~ value`
    Const { name: Name, value: Expr },

    /// `var name : type`
    Var { name: Name, ty: TypeDenoter },

    /// `proc name(formals) body`
    Proc {
        name: Name,
        params: Vec<Param>,
        body: Box<Command>,
    },

    /// `func name(formals) : type body`
    Func {
        name: Name,
        params: Vec<Param>,
        return_ty: TypeDenoter,
        body: Box<Command>,
    },
}

/// A formal parameter: `name : type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeDenoter,
    pub span: Span,
}

/// A type denoter, syntactically an identifier (`Integer`, `Boolean`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDenoter {
    pub name: String,
    pub span: Span,
}

/// An identifier occurrence with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub text: String,
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an integer literal expression.
    pub fn int(value: i64, span: Span) -> Self {
        Self::new(ExprKind::IntLiteral(value), span)
    }

    /// Create a variable reference expression.
    pub fn var(name: Name, span: Span) -> Self {
        Self::new(ExprKind::Var(name), span)
    }

    /// Create a binary operator expression.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    /// Create a unary operator expression.
    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal, e.g. `42`.
    IntLiteral(i64),

    /// Variable (or constant, or parameter) reference.
    Var(Name),

    /// Unary operator application, e.g. `-x`.
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operator application, e.g. `a + b`.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call in expression position, e.g. `fact(n - 1)`.
    Call { name: Name, args: Vec<Expr> },

    /// Parenthesized expression. Kept as a node so the tree records where
    /// precedence was overridden in source.
    Grouped(Box<Expr>),
}
