//! AST nodes for the Vela language.
//!
//! Every statement and expression carries the 1-based source line it starts
//! on; the profiler records executed statements under that line number.

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Stmt>,
}

/// A statement with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What the statement does.
    pub kind: StmtKind,
    /// 1-based line the statement starts on.
    pub line: u32,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Import a module by dotted name: `import pkg.mod`
    Import {
        /// Dotted module path.
        path: String,
    },

    /// Function declaration
    Function {
        /// Function name.
        name: String,
        /// Parameter names.
        params: Vec<String>,
        /// Body statements.
        body: Vec<Stmt>,
    },

    /// Variable declaration: `let x = expr`
    Let {
        /// Variable name.
        name: String,
        /// Initializer.
        value: Expr,
    },

    /// Assignment to an existing variable: `x = expr`
    Assign {
        /// Variable name.
        name: String,
        /// New value.
        value: Expr,
    },

    /// If statement with optional else branch
    If {
        /// Condition (must evaluate to a boolean).
        cond: Expr,
        /// Then branch.
        then_body: Vec<Stmt>,
        /// Else branch, if any. An `else if` chain nests here.
        else_body: Option<Vec<Stmt>>,
    },

    /// While loop
    While {
        /// Condition (must evaluate to a boolean).
        cond: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },

    /// Break out of the innermost loop
    Break,

    /// Continue the innermost loop
    Continue,

    /// Return from the enclosing function
    Return {
        /// Returned value; `()` when omitted.
        value: Option<Expr>,
    },

    /// Scoped profiling session: `profile { ... }`
    ///
    /// Opens a session on entry and closes it on every exit path.
    Profile {
        /// Statements executed while the session is open.
        body: Vec<Stmt>,
    },

    /// Expression statement (e.g. a call)
    Expr {
        /// The expression.
        expr: Expr,
    },
}

/// An expression with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// What the expression computes.
    pub kind: ExprKind,
    /// 1-based line the expression starts on.
    pub line: u32,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// Variable or builtin reference
    Ident(String),
    /// Array literal: `[a, b, c]`
    Array(Vec<Expr>),
    /// Unary operation
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Call: `callee(args...)`
    Call {
        /// Called expression.
        callee: Box<Expr>,
        /// Argument expressions.
        args: Vec<Expr>,
    },
    /// Index: `object[index]`
    Index {
        /// Indexed expression.
        object: Box<Expr>,
        /// Index expression.
        index: Box<Expr>,
    },
    /// Member access on a module value: `module.name`
    Member {
        /// Module expression.
        object: Box<Expr>,
        /// Member name.
        field: String,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Boolean not
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&` (short-circuit)
    And,
    /// `||` (short-circuit)
    Or,
}
