//! The core (desugared) AST that the evaluator actually walks.
//!
//! Everything sugared away by [`crate::desugar`] — comprehensions, object
//! extension, field-function sugar, slices, `in`/`in super`, assert-as-sugar
//! — is gone by the time a tree reaches this representation. What remains is
//! a small fixed set of primitive forms, each still carrying its original
//! [`Span`] so diagnostics point at user-written source rather than
//! generated code.

use std::rc::Rc;

use crate::ast::{BinaryOp, UnaryOp};
use crate::span::Span;

pub type PCore = Rc<CoreNode>;

#[derive(Debug, Clone, PartialEq)]
pub struct CoreNode {
    pub expr: CoreExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldVisibility {
    Visible,
    Hidden,
    ForceVisible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreField {
    /// Field names are always evaluated to a string at runtime; a fixed
    /// identifier/string literal key is pre-evaluated to `CoreExpr::Str` by
    /// the desugarer so the common case skips that work.
    pub name: PCore,
    pub visibility: FieldVisibility,
    pub plus: bool,
    pub value: PCore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreAssert {
    pub cond: PCore,
    pub message: Option<PCore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreObject {
    pub asserts: Vec<CoreAssert>,
    pub fields: Vec<CoreField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreParam {
    pub name: Rc<str>,
    pub default: Option<PCore>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoreArg {
    Positional(PCore),
    Named(Rc<str>, PCore),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoreCompClause {
    For { var: Rc<str>, expr: PCore },
    If(PCore),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoreExpr {
    Null,
    True,
    False,
    Number(f64),
    Str(Rc<str>),

    /// De Bruijn-free variable reference resolved against the live
    /// environment chain at evaluation time (spec.md §4.5).
    Var(Rc<str>),
    SelfExpr,
    /// `super` only ever appears as the target of a field/index lookup by
    /// the time desugaring is done; kept as its own node so the evaluator
    /// can special-case super-lookup without re-deriving it from `$`.
    Super,
    /// Desugared from `$`: a reference to the outermost object's `self`,
    /// captured by a synthetic local at the root of every object body.
    Dollarself,

    Array(Vec<PCore>),
    /// `[body for x in e if c ...]`. Desugaring only normalizes the clause
    /// list (folding `locals_before`/nested for-if chains into plain
    /// `for`/`if` clauses); the loop itself is still a primitive the
    /// evaluator walks directly, the same way a real implementation's
    /// evaluator interprets comprehension clauses without flattening them
    /// into a separate fold combinator.
    ArrayComp {
        body: PCore,
        clauses: Vec<CoreCompClause>,
    },

    Object(CoreObject),
    ObjectComp {
        key: PCore,
        value: PCore,
        clauses: Vec<CoreCompClause>,
    },

    Function {
        params: Vec<CoreParam>,
        body: PCore,
    },

    /// All bindings from one `local` statement, bound simultaneously: each
    /// bound expression can see every sibling (including itself), so mutual
    /// recursion between them resolves at evaluation time.
    Local {
        binds: Vec<(Rc<str>, PCore)>,
        body: PCore,
    },

    If {
        cond: PCore,
        then_branch: PCore,
        else_branch: PCore,
    },

    Binary {
        op: BinaryOp,
        lhs: PCore,
        rhs: PCore,
    },

    Unary {
        op: UnaryOp,
        operand: PCore,
    },

    Apply {
        target: PCore,
        args: Vec<CoreArg>,
        tailstrict: bool,
    },

    Index {
        target: PCore,
        index: PCore,
    },

    IndexSuper {
        index: PCore,
    },

    /// `e in super`: true if the field named by evaluating `e` exists in
    /// one of the layers below the current one, per spec.md §4.3's
    /// membership-test rewrite.
    InSuper(PCore),

    Error {
        message: PCore,
    },

    Assert {
        assert: CoreAssert,
        body: PCore,
    },

    Import(String),
    ImportStr(String),
    ImportBin(String),
}

impl CoreNode {
    pub fn new(expr: CoreExpr, span: Span) -> PCore {
        Rc::new(Self { expr, span })
    }
}
