//! Abstract syntax tree for AXX.
//!
//! The node set is closed. Passes implement [`Visitor`], and
//! [`Expr::accept`] / [`Stmt::accept`] route each node to the matching
//! visitor method, so a new node kind has to be handled by every pass.

use crate::token::{Token, TokenKind};

/// A node wrapping a single token: identifier, literal or operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub token: Token,
}

impl Leaf {
    pub fn new(token: Token) -> Self {
        Leaf { token }
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    pub fn text(&self) -> &str {
        &self.token.value
    }
}

/// Inclusive index range of an array declaration, `array(low..high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayRange {
    pub low: i64,
    pub high: i64,
}

impl ArrayRange {
    /// Number of elements, or `None` when it does not fit in `usize`.
    pub fn len(&self) -> Option<usize> {
        let len = (i128::from(self.high) - i128::from(self.low) + 1).max(0);
        usize::try_from(len).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.high < self.low
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub name: Leaf,
    pub ty: Leaf,
    pub range: Option<ArrayRange>,
}

impl VariableDeclaration {
    /// Number of elements, 0 for a scalar, `None` if the range is too wide.
    pub fn size(&self) -> Option<usize> {
        self.range.map_or(Some(0), |range| range.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalParam {
    pub name: Leaf,
    pub ty: Leaf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormalParams {
    pub params: Vec<FormalParam>,
}

impl FormalParams {
    pub fn push(&mut self, name: Leaf, ty: Leaf) {
        self.params.push(FormalParam { name, ty });
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualParams {
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callee: Leaf,
    pub args: ActualParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub op: Leaf,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unary {
    pub op: Leaf,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(Leaf),
    Call(Call),
    Binary(Binary),
    Unary(Unary),
}

impl Expr {
    pub fn binary(left: Expr, op: Token, right: Expr) -> Expr {
        Expr::Binary(Binary {
            op: Leaf::new(op),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(op: Token, operand: Expr) -> Expr {
        Expr::Unary(Unary {
            op: Leaf::new(op),
            operand: Box::new(operand),
        })
    }

    /// Token used to locate diagnostics about this expression.
    pub fn anchor(&self) -> &Token {
        match self {
            Expr::Leaf(leaf) => &leaf.token,
            Expr::Call(call) => &call.callee.token,
            Expr::Binary(binary) => &binary.op.token,
            Expr::Unary(unary) => &unary.op.token,
        }
    }

    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::ExprOutput {
        match self {
            Expr::Leaf(leaf) => visitor.visit_leaf(leaf),
            Expr::Call(call) => visitor.visit_call(call),
            Expr::Binary(binary) => visitor.visit_binary(binary),
            Expr::Unary(unary) => visitor.visit_unary(unary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub target: Leaf,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub keyword: Token,
    pub value: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Leaf,
    pub params: FormalParams,
    pub return_type: Leaf,
    pub declarations: Vec<VariableDeclaration>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub name: Leaf,
    pub params: FormalParams,
    pub declarations: Vec<VariableDeclaration>,
    pub body: Block,
}

/// What may follow the body of an `if` or `elsif`: another `elsif`, a final
/// `else`, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElseBranch {
    Elif(Box<Elif>),
    Else(Else),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub condition: Expr,
    pub body: Block,
    pub tail: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elif {
    pub condition: Expr,
    pub body: Block,
    pub tail: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Else {
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While {
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct For {
    pub iterator: Leaf,
    pub from: Leaf,
    pub to: Leaf,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    Assignment(Assignment),
    Return(Return),
    If(If),
    While(While),
    For(For),
    Function(Function),
    Procedure(Procedure),
}

impl Stmt {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::StmtOutput {
        match self {
            Stmt::Expr(expr) => visitor.visit_expr_stmt(expr),
            Stmt::Assignment(assignment) => visitor.visit_assignment(assignment),
            Stmt::Return(ret) => visitor.visit_return(ret),
            Stmt::If(if_stmt) => visitor.visit_if(if_stmt),
            Stmt::While(while_stmt) => visitor.visit_while(while_stmt),
            Stmt::For(for_stmt) => visitor.visit_for(for_stmt),
            Stmt::Function(function) => visitor.visit_function(function),
            Stmt::Procedure(procedure) => visitor.visit_procedure(procedure),
        }
    }

    pub fn is_subprogram(&self) -> bool {
        matches!(self, Stmt::Function(_) | Stmt::Procedure(_))
    }
}

/// A pass over the tree. Expression and statement visits may produce
/// different results (a type for expressions, nothing for statements).
pub trait Visitor {
    type ExprOutput;
    type StmtOutput;

    fn visit_leaf(&mut self, leaf: &Leaf) -> Self::ExprOutput;
    fn visit_call(&mut self, call: &Call) -> Self::ExprOutput;
    fn visit_binary(&mut self, binary: &Binary) -> Self::ExprOutput;
    fn visit_unary(&mut self, unary: &Unary) -> Self::ExprOutput;

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Self::StmtOutput;
    fn visit_assignment(&mut self, assignment: &Assignment) -> Self::StmtOutput;
    fn visit_return(&mut self, ret: &Return) -> Self::StmtOutput;
    fn visit_if(&mut self, if_stmt: &If) -> Self::StmtOutput;
    fn visit_while(&mut self, while_stmt: &While) -> Self::StmtOutput;
    fn visit_for(&mut self, for_stmt: &For) -> Self::StmtOutput;
    fn visit_function(&mut self, function: &Function) -> Self::StmtOutput;
    fn visit_procedure(&mut self, procedure: &Procedure) -> Self::StmtOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Token {
        Token::new(TokenKind::Id, name, 1, 1)
    }

    struct LeafCounter;

    impl Visitor for LeafCounter {
        type ExprOutput = usize;
        type StmtOutput = usize;

        fn visit_leaf(&mut self, _leaf: &Leaf) -> usize {
            1
        }
        fn visit_call(&mut self, call: &Call) -> usize {
            call.args.args.iter().map(|arg| arg.accept(self)).sum()
        }
        fn visit_binary(&mut self, binary: &Binary) -> usize {
            binary.left.accept(self) + binary.right.accept(self)
        }
        fn visit_unary(&mut self, unary: &Unary) -> usize {
            unary.operand.accept(self)
        }
        fn visit_expr_stmt(&mut self, expr: &Expr) -> usize {
            expr.accept(self)
        }
        fn visit_assignment(&mut self, assignment: &Assignment) -> usize {
            1 + assignment.value.accept(self)
        }
        fn visit_return(&mut self, ret: &Return) -> usize {
            ret.value.accept(self)
        }
        fn visit_if(&mut self, _if_stmt: &If) -> usize {
            0
        }
        fn visit_while(&mut self, _while_stmt: &While) -> usize {
            0
        }
        fn visit_for(&mut self, _for_stmt: &For) -> usize {
            0
        }
        fn visit_function(&mut self, _function: &Function) -> usize {
            0
        }
        fn visit_procedure(&mut self, _procedure: &Procedure) -> usize {
            0
        }
    }

    #[test]
    fn accept_dispatches_on_variant() {
        let sum = Expr::binary(
            Expr::Leaf(Leaf::new(id("a"))),
            Token::new(TokenKind::Plus, "+", 3, 1),
            Expr::unary(
                Token::new(TokenKind::Minus, "-", 5, 1),
                Expr::Leaf(Leaf::new(id("b"))),
            ),
        );
        let stmt = Stmt::Assignment(Assignment {
            target: Leaf::new(id("x")),
            value: sum,
        });
        assert_eq!(stmt.accept(&mut LeafCounter), 3);
    }

    #[test]
    fn anchor_points_at_operator() {
        let expr = Expr::binary(
            Expr::Leaf(Leaf::new(id("a"))),
            Token::new(TokenKind::Star, "*", 7, 2),
            Expr::Leaf(Leaf::new(id("b"))),
        );
        assert_eq!(expr.anchor().position, 7);
        assert_eq!(expr.anchor().row, 2);
    }

    #[test]
    fn array_size_counts_inclusive_range() {
        let decl = VariableDeclaration {
            name: Leaf::new(id("xs")),
            ty: Leaf::new(id("Integer")),
            range: Some(ArrayRange { low: 1, high: 10 }),
        };
        assert_eq!(decl.size(), Some(10));

        let scalar = VariableDeclaration { range: None, ..decl };
        assert_eq!(scalar.size(), Some(0));
    }

    #[test]
    fn extreme_ranges_do_not_overflow() {
        let widest = ArrayRange {
            low: -i64::MAX,
            high: i64::MAX,
        };
        assert!(!widest.is_empty());
        if usize::BITS <= 64 {
            assert_eq!(widest.len(), None);
        }

        let reversed = ArrayRange {
            low: i64::MAX,
            high: -i64::MAX,
        };
        assert!(reversed.is_empty());
        assert_eq!(reversed.len(), Some(0));
    }
}
