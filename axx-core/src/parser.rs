//! Recursive-descent parser for AXX.
//!
//! One method per grammar nonterminal. Alternatives are chosen by looking
//! the current token up in the FIRST sets of [`crate::grammar`]; the only
//! extra lookahead is [`Parser::forward`], which separates `x := ...` from an
//! expression statement that starts with an identifier.

use std::collections::VecDeque;
use std::mem;

use log::debug;

use crate::ast::{
    ActualParams, ArrayRange, Assignment, Block, Call, Elif, Else, ElseBranch, Expr, For,
    FormalParams, Function, If, Leaf, Procedure, Program, Return, Stmt, VariableDeclaration,
    While,
};
use crate::error::CompileError;
use crate::grammar::NonTerminal;
use crate::lexer::{Lexer, TokenSource};
use crate::token::{Token, TokenKind};

const COMPARISON_OPS: &[TokenKind] = &[
    TokenKind::Greater,
    TokenKind::Less,
    TokenKind::Equal,
    TokenKind::NotEq,
    TokenKind::GrEqual,
    TokenKind::LEqual,
];
const SUM_OPS: &[TokenKind] = &[TokenKind::Plus, TokenKind::Minus];
const TERM_OPS: &[TokenKind] = &[TokenKind::Star, TokenKind::Div, TokenKind::Mod];
const LOOP_BOUNDS: &[TokenKind] = &[TokenKind::Number, TokenKind::Id];

/// Parse a complete program from source text.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let mut parser = Parser::new();
    parser.set_lexer(Lexer::from_source(source))?;
    parser.get_ast()
}

#[derive(Debug)]
pub struct Parser<S> {
    source: Option<S>,
    token: Token,
    pending: VecDeque<Token>,
}

impl<S: TokenSource> Default for Parser<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TokenSource> Parser<S> {
    pub fn new() -> Self {
        Parser {
            source: None,
            token: Token::new(TokenKind::Eof, "", 0, 0),
            pending: VecDeque::new(),
        }
    }

    /// Bind a token source and read the first token.
    pub fn set_lexer(&mut self, source: S) -> Result<(), CompileError> {
        self.source = Some(source);
        self.pending.clear();
        self.token = self.fetch()?;
        Ok(())
    }

    /// Parse the whole token stream into a program.
    pub fn get_ast(&mut self) -> Result<Program, CompileError> {
        if self.source.is_none() {
            return Err(CompileError::Internal(
                "parser used before a token source was bound".to_string(),
            ));
        }
        let program = self.program()?;
        debug!(
            "parsed program with {} top-level statements",
            program.body.statements.len()
        );
        Ok(program)
    }

    // -----------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------

    fn fetch(&mut self) -> Result<Token, CompileError> {
        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }
        match self.source.as_mut() {
            Some(source) => source.next_token(),
            None => Err(CompileError::Internal(
                "parser used before a token source was bound".to_string(),
            )),
        }
    }

    /// Peek `k` tokens past the current one without consuming anything.
    fn forward(&mut self, k: usize) -> Result<&Token, CompileError> {
        while self.pending.len() < k {
            let token = match self.source.as_mut() {
                Some(source) => source.next_token()?,
                None => {
                    return Err(CompileError::Internal(
                        "parser used before a token source was bound".to_string(),
                    ));
                }
            };
            self.pending.push_back(token);
        }
        Ok(&self.pending[k - 1])
    }

    /// Return the current token and advance.
    fn take(&mut self) -> Result<Token, CompileError> {
        let next = self.fetch()?;
        Ok(mem::replace(&mut self.token, next))
    }

    /// Check that the current token has `kind`, return it and advance.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.token.kind != kind {
            return Err(self.error(format!("unexpected token, expected {kind:?}")));
        }
        self.take()
    }

    fn at(&self, nonterminal: NonTerminal) -> bool {
        nonterminal.starts_with(self.token.kind)
    }

    fn matches(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    fn matches_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.token.kind)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(message, &self.token)
    }

    // -----------------------------------------------------------------
    // Program structure
    // -----------------------------------------------------------------

    /// program = statements? EOF
    fn program(&mut self) -> Result<Program, CompileError> {
        let mut body = Block::default();
        if self.at(NonTerminal::Statements) {
            self.statements(&mut body)?;
        }
        self.expect(TokenKind::Eof)?;
        Ok(Program { body })
    }

    /// statements = statement+
    fn statements(&mut self, block: &mut Block) -> Result<(), CompileError> {
        while self.at(NonTerminal::Statements) {
            self.statement(block)?;
        }
        Ok(())
    }

    /// statement = root_stmt | nested_stmt
    fn statement(&mut self, block: &mut Block) -> Result<(), CompileError> {
        if self.at(NonTerminal::RootStmt) {
            self.root_stmt(block)
        } else if self.at(NonTerminal::NestedStmt) {
            self.nested_stmt(block)
        } else {
            Err(self.error("expected a statement"))
        }
    }

    /// root_stmt = (function_declaration | procedure_declaration) ";"
    fn root_stmt(&mut self, block: &mut Block) -> Result<(), CompileError> {
        if self.at(NonTerminal::FunctionDeclaration) {
            let function = self.function_declaration()?;
            block.statements.push(Stmt::Function(function));
        } else if self.at(NonTerminal::ProcedureDeclaration) {
            let procedure = self.procedure_declaration()?;
            block.statements.push(Stmt::Procedure(procedure));
        } else {
            return Err(self.error("expected a function or procedure declaration"));
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// function_declaration =
    ///     "function" ID "(" formal_params? ")" "return" ID "is"
    ///     variable_declarations "begin" block "end" ID
    fn function_declaration(&mut self) -> Result<Function, CompileError> {
        self.expect(TokenKind::Function)?;
        let name = Leaf::new(self.expect(TokenKind::Id)?);
        let params = self.parenthesized_formal_params()?;
        self.expect(TokenKind::Return)?;
        let return_type = Leaf::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::Is)?;
        let declarations = self.variable_declarations()?;
        self.expect(TokenKind::Begin)?;
        let body = self.block()?;
        self.expect(TokenKind::End)?;
        self.closing_name(&name)?;
        debug!("parsed function {}", name.text());
        Ok(Function {
            name,
            params,
            return_type,
            declarations,
            body,
        })
    }

    /// procedure_declaration =
    ///     "procedure" ID "(" formal_params? ")" "is"
    ///     variable_declarations "begin" block "end" ID
    fn procedure_declaration(&mut self) -> Result<Procedure, CompileError> {
        self.expect(TokenKind::Procedure)?;
        let name = Leaf::new(self.expect(TokenKind::Id)?);
        let params = self.parenthesized_formal_params()?;
        self.expect(TokenKind::Is)?;
        let declarations = self.variable_declarations()?;
        self.expect(TokenKind::Begin)?;
        let body = self.block()?;
        self.expect(TokenKind::End)?;
        self.closing_name(&name)?;
        debug!("parsed procedure {}", name.text());
        Ok(Procedure {
            name,
            params,
            declarations,
            body,
        })
    }

    fn parenthesized_formal_params(&mut self) -> Result<FormalParams, CompileError> {
        self.expect(TokenKind::Lpr)?;
        let params = if self.at(NonTerminal::FormalParams) {
            self.formal_params()?
        } else {
            FormalParams::default()
        };
        self.expect(TokenKind::Rpr)?;
        Ok(params)
    }

    /// The identifier after `end` has to repeat the subprogram name.
    fn closing_name(&mut self, name: &Leaf) -> Result<(), CompileError> {
        if self.matches(TokenKind::Id) && self.token.value != name.text() {
            return Err(self.error(format!("expected `end {}`", name.text())));
        }
        self.expect(TokenKind::Id)?;
        Ok(())
    }

    /// formal_params = ID ":" ID { ";" ID ":" ID }
    fn formal_params(&mut self) -> Result<FormalParams, CompileError> {
        let mut params = FormalParams::default();
        loop {
            let name = Leaf::new(self.expect(TokenKind::Id)?);
            self.expect(TokenKind::Colon)?;
            let ty = Leaf::new(self.expect(TokenKind::Id)?);
            params.push(name, ty);
            if !self.matches(TokenKind::Semicolon) {
                return Ok(params);
            }
            self.take()?;
        }
    }

    /// variable_declarations = { variable_declaration ";" }
    fn variable_declarations(&mut self) -> Result<Vec<VariableDeclaration>, CompileError> {
        let mut declarations = Vec::new();
        while self.at(NonTerminal::VariableDeclaration) {
            declarations.push(self.variable_declaration()?);
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(declarations)
    }

    /// variable_declaration =
    ///       ID ":" ID
    ///     | ID ":" "array" "(" NUMBER ".." NUMBER ")" "of" ID
    fn variable_declaration(&mut self) -> Result<VariableDeclaration, CompileError> {
        let name = Leaf::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::Colon)?;
        if self.matches(TokenKind::Id) {
            let ty = Leaf::new(self.take()?);
            return Ok(VariableDeclaration {
                name,
                ty,
                range: None,
            });
        }

        self.expect(TokenKind::Array)?;
        self.expect(TokenKind::Lpr)?;
        let low = self.integer_literal()?;
        self.expect(TokenKind::DoubleDot)?;
        let high = self.integer_literal()?;
        self.expect(TokenKind::Rpr)?;
        self.expect(TokenKind::Of)?;
        let ty = Leaf::new(self.expect(TokenKind::Id)?);
        Ok(VariableDeclaration {
            name,
            ty,
            range: Some(ArrayRange { low, high }),
        })
    }

    /// An optionally negated integer literal (array bounds).
    fn integer_literal(&mut self) -> Result<i64, CompileError> {
        let negative = self.matches(TokenKind::Minus);
        if negative {
            self.take()?;
        }
        if !self.matches(TokenKind::Number) {
            return Err(self.error("expected an integer literal"));
        }
        let value = self
            .token
            .value
            .parse::<i64>()
            .map_err(|_| self.error("array bounds must be integer literals"))?;
        self.take()?;
        Ok(if negative { -value } else { value })
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    /// block = { nested_stmt }
    fn block(&mut self) -> Result<Block, CompileError> {
        let mut block = Block::default();
        while self.at(NonTerminal::Block) {
            self.nested_stmt(&mut block)?;
        }
        Ok(block)
    }

    /// nested_stmt = (compound_stmt | simple_stmt) ";"
    fn nested_stmt(&mut self, block: &mut Block) -> Result<(), CompileError> {
        let stmt = if self.at(NonTerminal::CompoundStmt) {
            self.compound_stmt()?
        } else if self.at(NonTerminal::SimpleStmt) {
            self.simple_stmt()?
        } else {
            return Err(self.error("expected a statement"));
        };
        block.statements.push(stmt);
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// compound_stmt = if_stmt | for_stmt | while_stmt
    fn compound_stmt(&mut self) -> Result<Stmt, CompileError> {
        if self.at(NonTerminal::IfStmt) {
            Ok(Stmt::If(self.if_stmt()?))
        } else if self.at(NonTerminal::ForStmt) {
            Ok(Stmt::For(self.for_stmt()?))
        } else if self.at(NonTerminal::WhileStmt) {
            Ok(Stmt::While(self.while_stmt()?))
        } else {
            Err(self.error("expected if, for or while"))
        }
    }

    /// if_stmt = "if" expression "then" block [elsif_stmt | else_block] "end" "if"
    fn if_stmt(&mut self) -> Result<If, CompileError> {
        self.expect(TokenKind::If)?;
        let condition = self.expression()?;
        self.expect(TokenKind::Then)?;
        let body = self.block()?;
        let tail = self.else_tail()?;
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::If)?;
        Ok(If {
            condition,
            body,
            tail,
        })
    }

    fn else_tail(&mut self) -> Result<Option<ElseBranch>, CompileError> {
        if self.at(NonTerminal::ElsifStmt) {
            Ok(Some(ElseBranch::Elif(Box::new(self.elsif_stmt()?))))
        } else if self.at(NonTerminal::ElseBlock) {
            Ok(Some(ElseBranch::Else(self.else_block()?)))
        } else {
            Ok(None)
        }
    }

    /// elsif_stmt = "elsif" expression "then" block [elsif_stmt | else_block]
    fn elsif_stmt(&mut self) -> Result<Elif, CompileError> {
        self.expect(TokenKind::Elsif)?;
        let condition = self.expression()?;
        self.expect(TokenKind::Then)?;
        let body = self.block()?;
        let tail = self.else_tail()?;
        Ok(Elif {
            condition,
            body,
            tail,
        })
    }

    /// else_block = "else" block
    fn else_block(&mut self) -> Result<Else, CompileError> {
        self.expect(TokenKind::Else)?;
        let body = self.block()?;
        Ok(Else { body })
    }

    /// while_stmt = "while" expression "loop" block "end" "loop"
    fn while_stmt(&mut self) -> Result<While, CompileError> {
        self.expect(TokenKind::While)?;
        let condition = self.expression()?;
        self.expect(TokenKind::Loop)?;
        let body = self.block()?;
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Loop)?;
        Ok(While { condition, body })
    }

    /// for_stmt = "for" ID "in" (NUMBER | ID) ".." (NUMBER | ID) "loop" block "end" "loop"
    fn for_stmt(&mut self) -> Result<For, CompileError> {
        self.expect(TokenKind::For)?;
        let iterator = Leaf::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::In)?;
        let from = self.loop_bound()?;
        self.expect(TokenKind::DoubleDot)?;
        let to = self.loop_bound()?;
        self.expect(TokenKind::Loop)?;
        let body = self.block()?;
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Loop)?;
        Ok(For {
            iterator,
            from,
            to,
            body,
        })
    }

    fn loop_bound(&mut self) -> Result<Leaf, CompileError> {
        if !self.matches_any(LOOP_BOUNDS) {
            return Err(self.error("expected a number or identifier as loop bound"));
        }
        Ok(Leaf::new(self.take()?))
    }

    /// simple_stmt = assignment | expression | return_stmt
    fn simple_stmt(&mut self) -> Result<Stmt, CompileError> {
        if self.at(NonTerminal::Assignment) && self.forward(1)?.kind == TokenKind::Assign {
            Ok(Stmt::Assignment(self.assignment()?))
        } else if self.at(NonTerminal::Expression) {
            Ok(Stmt::Expr(self.expression()?))
        } else if self.at(NonTerminal::ReturnStmt) {
            Ok(Stmt::Return(self.return_stmt()?))
        } else {
            Err(self.error("expected an assignment, expression or return"))
        }
    }

    /// assignment = ID ":=" expression
    fn assignment(&mut self) -> Result<Assignment, CompileError> {
        let target = Leaf::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::Assign)?;
        let value = self.expression()?;
        Ok(Assignment { target, value })
    }

    /// return_stmt = "return" expression
    fn return_stmt(&mut self) -> Result<Return, CompileError> {
        let keyword = self.expect(TokenKind::Return)?;
        let value = self.expression()?;
        Ok(Return { keyword, value })
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// expression = disjunction
    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.disjunction()
    }

    /// Fold `operand { op operand }` into a left-leaning chain.
    fn left_assoc(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut left = operand(self)?;
        while self.matches_any(ops) {
            let op = self.take()?;
            let right = operand(self)?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    /// disjunction = conjunction { "or" conjunction }
    fn disjunction(&mut self) -> Result<Expr, CompileError> {
        self.left_assoc(&[TokenKind::Or], Self::conjunction)
    }

    /// conjunction = inversion { "and" inversion }
    fn conjunction(&mut self) -> Result<Expr, CompileError> {
        self.left_assoc(&[TokenKind::And], Self::inversion)
    }

    /// inversion = "not" inversion | comparison
    fn inversion(&mut self) -> Result<Expr, CompileError> {
        if self.matches(TokenKind::Not) {
            let op = self.take()?;
            let operand = self.inversion()?;
            return Ok(Expr::unary(op, operand));
        }
        self.comparison()
    }

    /// comparison = sum { ("=" | "/=" | "<" | "<=" | ">" | ">=") sum }
    fn comparison(&mut self) -> Result<Expr, CompileError> {
        self.left_assoc(COMPARISON_OPS, Self::sum)
    }

    /// sum = term { ("+" | "-") term }
    fn sum(&mut self) -> Result<Expr, CompileError> {
        self.left_assoc(SUM_OPS, Self::term)
    }

    /// term = factor { ("*" | "/" | "mod") factor }
    fn term(&mut self) -> Result<Expr, CompileError> {
        self.left_assoc(TERM_OPS, Self::factor)
    }

    /// factor = ("+" | "-") factor | primary
    fn factor(&mut self) -> Result<Expr, CompileError> {
        if self.matches_any(SUM_OPS) {
            let op = self.take()?;
            let operand = self.factor()?;
            return Ok(Expr::unary(op, operand));
        }
        self.primary()
    }

    /// primary = "(" expression ")" | atom [func_call]
    fn primary(&mut self) -> Result<Expr, CompileError> {
        if !self.at(NonTerminal::Primary) {
            return Err(self.error("expected an expression"));
        }
        if self.matches(TokenKind::Lpr) {
            self.take()?;
            let expr = self.expression()?;
            self.expect(TokenKind::Rpr)?;
            return Ok(expr);
        }

        let atom = self.atom()?;
        if atom.kind() == TokenKind::Id && self.at(NonTerminal::FuncCall) {
            let args = self.func_call()?;
            return Ok(Expr::Call(Call { callee: atom, args }));
        }
        Ok(Expr::Leaf(atom))
    }

    /// func_call = "(" [actual_params] ")"
    fn func_call(&mut self) -> Result<ActualParams, CompileError> {
        self.expect(TokenKind::Lpr)?;
        let args = if self.at(NonTerminal::ActualParams) {
            self.actual_params()?
        } else {
            ActualParams::default()
        };
        self.expect(TokenKind::Rpr)?;
        Ok(args)
    }

    /// actual_params = expression { "," expression }
    fn actual_params(&mut self) -> Result<ActualParams, CompileError> {
        let mut args = vec![self.expression()?];
        while self.matches(TokenKind::Comma) {
            self.take()?;
            args.push(self.expression()?);
        }
        Ok(ActualParams { args })
    }

    /// atom = ID | STRING | CHARACTER | NUMBER
    fn atom(&mut self) -> Result<Leaf, CompileError> {
        if !self.at(NonTerminal::Atom) {
            return Err(self.error("expected an identifier or literal"));
        }
        Ok(Leaf::new(self.take()?))
    }
}
