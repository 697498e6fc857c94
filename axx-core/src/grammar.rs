//! FIRST sets of the AXX grammar.
//!
//! The parser never backtracks: at every choice point it checks the current
//! token against the FIRST set of each alternative.

use crate::token::TokenKind::{self, *};

/// Grammar nonterminals that the parser dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonTerminal {
    Statements,
    RootStmt,
    FunctionDeclaration,
    ProcedureDeclaration,
    FormalParams,
    VariableDeclaration,
    Block,
    NestedStmt,
    CompoundStmt,
    IfStmt,
    ElsifStmt,
    ElseBlock,
    WhileStmt,
    ForStmt,
    SimpleStmt,
    Assignment,
    ReturnStmt,
    Expression,
    Primary,
    FuncCall,
    ActualParams,
    Atom,
}

const ATOM: &[TokenKind] = &[Id, Number, String, Character];
const PRIMARY: &[TokenKind] = &[Lpr, Id, Number, String, Character];
const EXPRESSION: &[TokenKind] = &[Not, Plus, Minus, Lpr, Id, Number, String, Character];
const SIMPLE_STMT: &[TokenKind] = &[
    Return, Not, Plus, Minus, Lpr, Id, Number, String, Character,
];
const COMPOUND_STMT: &[TokenKind] = &[If, While, For];
const NESTED_STMT: &[TokenKind] = &[
    If, While, For, Return, Not, Plus, Minus, Lpr, Id, Number, String, Character,
];
const ROOT_STMT: &[TokenKind] = &[Function, Procedure];
const STATEMENT: &[TokenKind] = &[
    Function, Procedure, If, While, For, Return, Not, Plus, Minus, Lpr, Id, Number, String,
    Character,
];

impl NonTerminal {
    /// Token kinds that can begin a derivation of this nonterminal.
    pub fn first(self) -> &'static [TokenKind] {
        match self {
            NonTerminal::Statements => STATEMENT,
            NonTerminal::RootStmt => ROOT_STMT,
            NonTerminal::FunctionDeclaration => &[Function],
            NonTerminal::ProcedureDeclaration => &[Procedure],
            NonTerminal::FormalParams
            | NonTerminal::VariableDeclaration
            | NonTerminal::Assignment => &[Id],
            NonTerminal::Block | NonTerminal::NestedStmt => NESTED_STMT,
            NonTerminal::CompoundStmt => COMPOUND_STMT,
            NonTerminal::IfStmt => &[If],
            NonTerminal::ElsifStmt => &[Elsif],
            NonTerminal::ElseBlock => &[Else],
            NonTerminal::WhileStmt => &[While],
            NonTerminal::ForStmt => &[For],
            NonTerminal::SimpleStmt => SIMPLE_STMT,
            NonTerminal::ReturnStmt => &[Return],
            NonTerminal::Expression | NonTerminal::ActualParams => EXPRESSION,
            NonTerminal::Primary => PRIMARY,
            NonTerminal::FuncCall => &[Lpr],
            NonTerminal::Atom => ATOM,
        }
    }

    pub fn starts_with(self, kind: TokenKind) -> bool {
        self.first().contains(&kind)
    }
}
