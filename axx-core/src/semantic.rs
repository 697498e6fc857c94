//! Semantic analysis: scoped name resolution and static type checking.
//!
//! The analyzer walks the tree once after a pre-pass that records every
//! subprogram signature, so a function may call another one declared later
//! in the file. It stops at the first violation and never modifies the tree.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::ast::{
    Assignment, Binary, Block, Call, ElseBranch, Expr, For, Function, If, Leaf, Procedure,
    Program, Return, Stmt, Unary, VariableDeclaration, Visitor, While,
};
use crate::error::CompileError;
use crate::token::{Token, TokenKind};
use crate::types::Type;

/// Largest array the generated C++ may declare, in elements.
pub const MAX_ARRAY_LEN: usize = 1 << 24;

/// Constants visible in every program.
const BUILTIN_CONSTANTS: &[(&str, Type)] = &[("true", Type::Boolean), ("false", Type::Boolean)];

/// Parameter and result types of a function or procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// `None` for procedures.
    pub result: Option<Type>,
    pub params: Vec<Type>,
}

/// The subprogram whose body is being checked.
#[derive(Debug, Clone)]
enum Routine {
    Program,
    Function { name: String, result: Type },
    Procedure { name: String },
}

#[derive(Debug)]
pub struct SemanticAnalyzer {
    opaque_types: HashSet<String>,
    scopes: Vec<HashMap<String, Type>>,
    /// Indices into `scopes` of the scopes opened by `for` loops.
    loop_scopes: Vec<usize>,
    functions: HashMap<String, Signature>,
    routine: Routine,
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        SemanticAnalyzer {
            opaque_types: HashSet::new(),
            scopes: Vec::new(),
            loop_scopes: Vec::new(),
            functions: HashMap::new(),
            routine: Routine::Program,
        }
    }

    /// Make an extra type name usable in declarations. Values of an opaque
    /// type are only compatible with the same type.
    pub fn register_type(&mut self, name: impl Into<String>) {
        self.opaque_types.insert(name.into());
    }

    /// Signature of a subprogram recorded by the last [`check`](Self::check).
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    /// Validate a whole program.
    pub fn check(&mut self, program: &Program) -> Result<(), CompileError> {
        self.scopes.clear();
        self.loop_scopes.clear();
        self.functions.clear();
        self.routine = Routine::Program;

        self.register_signatures(program)?;

        self.push_scope();
        for (name, ty) in BUILTIN_CONSTANTS {
            self.innermost()?.insert((*name).to_string(), ty.clone());
        }
        self.block(&program.body)?;
        self.pop_scope();

        debug!(
            "semantic check passed ({} subprograms)",
            self.functions.len()
        );
        Ok(())
    }

    fn register_signatures(&mut self, program: &Program) -> Result<(), CompileError> {
        for stmt in &program.body.statements {
            let (name, signature) = match stmt {
                Stmt::Function(function) => (
                    &function.name,
                    Signature {
                        result: Some(self.resolve_type(&function.return_type)?),
                        params: self.param_types(&function.params.params)?,
                    },
                ),
                Stmt::Procedure(procedure) => (
                    &procedure.name,
                    Signature {
                        result: None,
                        params: self.param_types(&procedure.params.params)?,
                    },
                ),
                _ => continue,
            };

            if self.functions.contains_key(name.text()) {
                return Err(CompileError::semantic(
                    format!("subprogram '{}' is already declared", name.text()),
                    &name.token,
                ));
            }
            debug!("registered signature {} {:?}", name.text(), signature);
            self.functions.insert(name.text().to_string(), signature);
        }
        Ok(())
    }

    fn param_types(&self, params: &[crate::ast::FormalParam]) -> Result<Vec<Type>, CompileError> {
        params.iter().map(|param| self.resolve_type(&param.ty)).collect()
    }

    fn resolve_type(&self, leaf: &Leaf) -> Result<Type, CompileError> {
        if let Some(ty) = Type::primitive(leaf.text()) {
            return Ok(ty);
        }
        if self.opaque_types.contains(leaf.text()) {
            return Ok(Type::Named(leaf.text().to_string()));
        }
        Err(CompileError::semantic(
            format!("unknown type '{}'", leaf.text()),
            &leaf.token,
        ))
    }

    // -----------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn innermost(&mut self) -> Result<&mut HashMap<String, Type>, CompileError> {
        self.scopes
            .last_mut()
            .ok_or_else(|| CompileError::Internal("declaration outside of any scope".to_string()))
    }

    fn declare(&mut self, name: &Leaf, ty: Type) -> Result<(), CompileError> {
        if BUILTIN_CONSTANTS.iter().any(|(builtin, _)| *builtin == name.text()) {
            return Err(CompileError::semantic(
                format!("'{}' is a reserved name", name.text()),
                &name.token,
            ));
        }
        let scope = self.innermost()?;
        if scope.contains_key(name.text()) {
            return Err(CompileError::semantic(
                format!("redeclaration of '{}'", name.text()),
                &name.token,
            ));
        }
        scope.insert(name.text().to_string(), ty);
        Ok(())
    }

    fn declare_variable(&mut self, declaration: &VariableDeclaration) -> Result<(), CompileError> {
        let element = self.resolve_type(&declaration.ty)?;
        let ty = match declaration.range {
            None => element,
            Some(range) => {
                if range.is_empty() {
                    return Err(CompileError::semantic(
                        format!(
                            "array '{}' has an empty range {}..{}",
                            declaration.name.text(),
                            range.low,
                            range.high
                        ),
                        &declaration.name.token,
                    ));
                }
                let name = declaration.name.text();
                if i32::try_from(range.low).is_err() || i32::try_from(range.high).is_err() {
                    return Err(CompileError::semantic(
                        format!("bounds of array '{name}' do not fit in Integer"),
                        &declaration.name.token,
                    ));
                }
                let len = match range.len() {
                    Some(len) if len <= MAX_ARRAY_LEN => len,
                    _ => {
                        return Err(CompileError::semantic(
                            format!("array '{name}' exceeds {MAX_ARRAY_LEN} elements"),
                            &declaration.name.token,
                        ));
                    }
                };
                Type::Array {
                    element: Box::new(element),
                    low: range.low,
                    len,
                }
            }
        };
        self.declare(&declaration.name, ty)
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Whether `name` currently resolves to a `for` loop iterator.
    fn is_iterator(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rposition(|scope| scope.contains_key(name))
            .is_some_and(|index| self.loop_scopes.contains(&index))
    }

    /// Resolve an identifier that is used as a scalar value.
    fn variable(&self, leaf: &Leaf) -> Result<Type, CompileError> {
        match self.lookup(leaf.text()) {
            None => Err(CompileError::semantic(
                format!("undeclared identifier '{}'", leaf.text()),
                &leaf.token,
            )),
            Some(ty) if ty.is_array() => Err(CompileError::semantic(
                format!("array '{}' cannot be used as a value", leaf.text()),
                &leaf.token,
            )),
            Some(ty) => Ok(ty.clone()),
        }
    }

    // -----------------------------------------------------------------
    // Helpers shared by several statements
    // -----------------------------------------------------------------

    fn block(&mut self, block: &Block) -> Result<(), CompileError> {
        for stmt in &block.statements {
            stmt.accept(self)?;
        }
        Ok(())
    }

    fn condition(&mut self, condition: &Expr) -> Result<(), CompileError> {
        let ty = condition.accept(self)?;
        if ty != Type::Boolean {
            return Err(CompileError::semantic(
                format!("condition must be Boolean, found {ty}"),
                condition.anchor(),
            ));
        }
        Ok(())
    }

    fn else_branch(&mut self, tail: &Option<ElseBranch>) -> Result<(), CompileError> {
        match tail {
            Some(ElseBranch::Elif(elif)) => {
                self.condition(&elif.condition)?;
                self.block(&elif.body)?;
                self.else_branch(&elif.tail)
            }
            Some(ElseBranch::Else(else_block)) => self.block(&else_block.body),
            None => Ok(()),
        }
    }

    /// Iterators are emitted as C++ `int`, so both bounds must be Integer.
    fn loop_bound(&self, bound: &Leaf) -> Result<(), CompileError> {
        let ty = match bound.kind() {
            TokenKind::Number => literal_type(&bound.token)?,
            _ => self.variable(bound)?,
        };
        if ty != Type::Integer {
            return Err(CompileError::semantic(
                format!("loop bound must be an Integer, found {ty}"),
                &bound.token,
            ));
        }
        Ok(())
    }

    fn subprogram(
        &mut self,
        routine: Routine,
        params: &[crate::ast::FormalParam],
        declarations: &[VariableDeclaration],
        body: &Block,
    ) -> Result<(), CompileError> {
        self.routine = routine;
        self.push_scope();
        for param in params {
            let ty = self.resolve_type(&param.ty)?;
            self.declare(&param.name, ty)?;
        }
        for declaration in declarations {
            self.declare_variable(declaration)?;
        }
        self.block(body)?;
        self.pop_scope();
        self.routine = Routine::Program;
        Ok(())
    }

    fn operator_error(op: &Leaf, operands: &[&Type]) -> CompileError {
        let operands = operands
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(" and ");
        CompileError::semantic(
            format!("operator '{}' cannot be applied to {operands}", op.text()),
            &op.token,
        )
    }
}

fn literal_type(token: &Token) -> Result<Type, CompileError> {
    match token.kind {
        TokenKind::Number if token.value.contains('.') => {
            match token.value.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Type::Float),
                _ => Err(CompileError::semantic(
                    format!("float literal {} is out of range", token.value),
                    token,
                )),
            }
        }
        TokenKind::Number => match token.value.parse::<i32>() {
            Ok(_) => Ok(Type::Integer),
            Err(_) => Err(CompileError::semantic(
                format!("integer literal {} does not fit in Integer", token.value),
                token,
            )),
        },
        TokenKind::Character => Ok(Type::Character),
        _ => Ok(Type::String),
    }
}

impl Visitor for SemanticAnalyzer {
    type ExprOutput = Result<Type, CompileError>;
    type StmtOutput = Result<(), CompileError>;

    fn visit_leaf(&mut self, leaf: &Leaf) -> Result<Type, CompileError> {
        match leaf.kind() {
            TokenKind::Number | TokenKind::String | TokenKind::Character => {
                literal_type(&leaf.token)
            }
            TokenKind::Id => self.variable(leaf),
            other => Err(CompileError::Internal(format!(
                "{other:?} token used as an operand"
            ))),
        }
    }

    fn visit_call(&mut self, call: &Call) -> Result<Type, CompileError> {
        let name = call.callee.text();
        let args = &call.args.args;

        // A variable shadows a subprogram of the same name.
        if let Some(ty) = self.lookup(name).cloned() {
            let Type::Array { element, .. } = ty else {
                return Err(CompileError::semantic(
                    format!("'{name}' is not a function"),
                    &call.callee.token,
                ));
            };
            if args.len() != 1 {
                return Err(CompileError::semantic(
                    format!("array '{name}' takes exactly one index, received {}", args.len()),
                    &call.callee.token,
                ));
            }
            let index = args[0].accept(self)?;
            if index != Type::Integer {
                return Err(CompileError::semantic(
                    format!("array index must be an Integer, found {index}"),
                    args[0].anchor(),
                ));
            }
            return Ok(*element);
        }

        let Some(signature) = self.functions.get(name).cloned() else {
            return Err(CompileError::semantic(
                format!("unknown function '{name}'"),
                &call.callee.token,
            ));
        };
        if args.len() != signature.params.len() {
            return Err(CompileError::semantic(
                format!(
                    "'{name}' expects {} arguments but received {}",
                    signature.params.len(),
                    args.len()
                ),
                &call.callee.token,
            ));
        }
        for (position, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
            let found = arg.accept(self)?;
            if !expected.accepts(&found) {
                return Err(CompileError::semantic(
                    format!(
                        "argument {} of '{name}' has type {found}, expected {expected}",
                        position + 1
                    ),
                    arg.anchor(),
                ));
            }
        }
        Ok(signature.result.unwrap_or(Type::Void))
    }

    fn visit_binary(&mut self, binary: &Binary) -> Result<Type, CompileError> {
        let left = binary.left.accept(self)?;
        let right = binary.right.accept(self)?;
        let result = match binary.op.kind() {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Div => {
                Type::arithmetic(&left, &right)
            }
            TokenKind::Mod => {
                (left == Type::Integer && right == Type::Integer).then_some(Type::Integer)
            }
            TokenKind::And | TokenKind::Or => {
                (left == Type::Boolean && right == Type::Boolean).then_some(Type::Boolean)
            }
            TokenKind::Less | TokenKind::LEqual | TokenKind::Greater | TokenKind::GrEqual => {
                let ordered = (left.is_numeric() && right.is_numeric())
                    || (left == right && matches!(left, Type::String | Type::Character));
                ordered.then_some(Type::Boolean)
            }
            TokenKind::Equal | TokenKind::NotEq => {
                let comparable = (left.is_numeric() && right.is_numeric())
                    || (left == right && left != Type::Void);
                comparable.then_some(Type::Boolean)
            }
            other => {
                return Err(CompileError::Internal(format!(
                    "{other:?} is not a binary operator"
                )));
            }
        };
        result.ok_or_else(|| Self::operator_error(&binary.op, &[&left, &right]))
    }

    fn visit_unary(&mut self, unary: &Unary) -> Result<Type, CompileError> {
        let operand = unary.operand.accept(self)?;
        let valid = match unary.op.kind() {
            TokenKind::Not => operand == Type::Boolean,
            TokenKind::Plus | TokenKind::Minus => operand.is_numeric(),
            other => {
                return Err(CompileError::Internal(format!(
                    "{other:?} is not a unary operator"
                )));
            }
        };
        if !valid {
            return Err(Self::operator_error(&unary.op, &[&operand]));
        }
        Ok(operand)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<(), CompileError> {
        expr.accept(self).map(|_| ())
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> Result<(), CompileError> {
        let target = match self.lookup(assignment.target.text()) {
            None => {
                return Err(CompileError::semantic(
                    format!("undeclared identifier '{}'", assignment.target.text()),
                    &assignment.target.token,
                ));
            }
            Some(ty) if ty.is_array() => {
                return Err(CompileError::semantic(
                    format!("cannot assign to array '{}'", assignment.target.text()),
                    &assignment.target.token,
                ));
            }
            Some(ty) => ty.clone(),
        };
        if self.is_iterator(assignment.target.text()) {
            return Err(CompileError::semantic(
                format!("cannot assign to loop variable '{}'", assignment.target.text()),
                &assignment.target.token,
            ));
        }
        let value = assignment.value.accept(self)?;
        if !target.accepts(&value) {
            return Err(CompileError::semantic(
                format!(
                    "cannot assign {value} to '{}' of type {target}",
                    assignment.target.text()
                ),
                &assignment.target.token,
            ));
        }
        Ok(())
    }

    fn visit_return(&mut self, ret: &Return) -> Result<(), CompileError> {
        let expected = match &self.routine {
            Routine::Program => {
                return Err(CompileError::semantic(
                    "return outside of a function",
                    &ret.keyword,
                ));
            }
            Routine::Procedure { name } => {
                return Err(CompileError::semantic(
                    format!("procedure '{name}' cannot return a value"),
                    &ret.keyword,
                ));
            }
            Routine::Function { result, .. } => result.clone(),
        };
        let found = ret.value.accept(self)?;
        if !expected.accepts(&found) {
            let name = match &self.routine {
                Routine::Function { name, .. } => name.as_str(),
                _ => "",
            };
            return Err(CompileError::semantic(
                format!("function '{name}' returns {expected}, found {found}"),
                ret.value.anchor(),
            ));
        }
        Ok(())
    }

    fn visit_if(&mut self, if_stmt: &If) -> Result<(), CompileError> {
        self.condition(&if_stmt.condition)?;
        self.block(&if_stmt.body)?;
        self.else_branch(&if_stmt.tail)
    }

    fn visit_while(&mut self, while_stmt: &While) -> Result<(), CompileError> {
        self.condition(&while_stmt.condition)?;
        self.block(&while_stmt.body)
    }

    fn visit_for(&mut self, for_stmt: &For) -> Result<(), CompileError> {
        self.loop_bound(&for_stmt.from)?;
        self.loop_bound(&for_stmt.to)?;
        self.push_scope();
        self.loop_scopes.push(self.scopes.len() - 1);
        self.declare(&for_stmt.iterator, Type::Integer)?;
        self.block(&for_stmt.body)?;
        self.loop_scopes.pop();
        self.pop_scope();
        Ok(())
    }

    fn visit_function(&mut self, function: &Function) -> Result<(), CompileError> {
        let result = self.resolve_type(&function.return_type)?;
        let routine = Routine::Function {
            name: function.name.text().to_string(),
            result,
        };
        self.subprogram(
            routine,
            &function.params.params,
            &function.declarations,
            &function.body,
        )
    }

    fn visit_procedure(&mut self, procedure: &Procedure) -> Result<(), CompileError> {
        let routine = Routine::Procedure {
            name: procedure.name.text().to_string(),
        };
        self.subprogram(
            routine,
            &procedure.params.params,
            &procedure.declarations,
            &procedure.body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check(source: &str) -> Result<(), CompileError> {
        let program = parse(source).expect("parse");
        SemanticAnalyzer::new().check(&program)
    }

    fn semantic_message(source: &str) -> String {
        match check(source) {
            Err(CompileError::Semantic { message, .. }) => message,
            other => panic!("expected a semantic error, got {other:?}"),
        }
    }

    const VALID: &str = "\
function square(x: Float) return Float is
begin
    return x * x;
end square;

procedure report(total: Integer; label: String) is
    seen: Boolean;
begin
    seen := total > 0 and not (label = \"\");
end report;

function sum_to(n: Integer) return Integer is
    acc: Integer;
    values: array(1..10) of Integer;
begin
    acc := 0;
    for i in 1..n loop
        acc := acc + i mod 3 + values(i);
    end loop;
    if acc > 100 then
        report(acc, \"big\");
    elsif acc > 10 then
        report(acc, \"medium\");
    else
        acc := -acc;
    end if;
    while acc < 0 loop
        acc := acc + 1;
    end loop;
    return acc;
end sum_to;
";

    #[test]
    fn accepts_well_typed_program() {
        check(VALID).expect("valid program");
    }

    #[test]
    fn records_signatures() {
        let program = parse(VALID).unwrap();
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.check(&program).unwrap();
        let report = analyzer.signature("report").unwrap();
        assert_eq!(report.result, None);
        assert_eq!(report.params, vec![Type::Integer, Type::String]);
        assert_eq!(
            analyzer.signature("square").unwrap().result,
            Some(Type::Float)
        );
    }

    #[test]
    fn resolves_forward_references() {
        let source = "\
function a() return Integer is begin return b(); end a;
function b() return Integer is begin return 1; end b;
";
        check(source).expect("forward call");
    }

    #[test]
    fn rejects_redeclaration_in_same_scope() {
        let source = "procedure p(x: Integer) is x: Integer; begin end p;";
        assert!(semantic_message(source).contains("redeclaration of 'x'"));
    }

    #[test]
    fn rejects_undeclared_identifier() {
        let source = "procedure p() is y: Integer; begin y := z; end p;";
        assert!(semantic_message(source).contains("undeclared identifier 'z'"));
    }

    #[test]
    fn scopes_do_not_leak_between_subprograms() {
        let source = "\
procedure p() is x: Integer; begin x := 1; end p;
procedure q() is begin x := 2; end q;
";
        assert!(semantic_message(source).contains("'x'"));
    }

    #[test]
    fn loop_iterator_is_scoped_to_body() {
        let source = "\
procedure p() is y: Integer; begin
    for i in 1..3 loop y := i; end loop;
    y := i;
end p;
";
        assert!(semantic_message(source).contains("undeclared identifier 'i'"));
    }

    #[test]
    fn rejects_operator_type_mismatch() {
        let source = "procedure p() is b: Boolean; begin b := 1 + true; end p;";
        assert!(semantic_message(source).contains("operator '+'"));
        let source = "procedure p() is x: Float; begin x := 2.5 mod 2; end p;";
        assert!(semantic_message(source).contains("operator 'mod'"));
        let source = "procedure p() is b: Boolean; begin b := not 1; end p;";
        assert!(semantic_message(source).contains("operator 'not'"));
    }

    #[test]
    fn rejects_assignment_mismatch() {
        let source = "procedure p() is n: Integer; begin n := \"text\"; end p;";
        assert!(semantic_message(source).contains("cannot assign String"));
    }

    #[test]
    fn integer_widens_to_float() {
        check("procedure p() is f: Float; begin f := 1 + 2; end p;").expect("widening");
    }

    #[test]
    fn checks_call_arity_and_types() {
        let prelude = "function f(a: Integer; b: Boolean) return Integer is begin return a; end f;\n";
        let arity = format!("{prelude}procedure p() is n: Integer; begin n := f(1); end p;");
        assert!(semantic_message(&arity).contains("expects 2 arguments but received 1"));
        let types = format!("{prelude}procedure p() is n: Integer; begin n := f(1, 2); end p;");
        assert!(semantic_message(&types).contains("argument 2 of 'f'"));
        let unknown = "procedure p() is begin g(); end p;";
        assert!(semantic_message(unknown).contains("unknown function 'g'"));
    }

    #[test]
    fn procedure_results_are_not_values() {
        let source = "\
procedure q() is begin end q;
procedure p() is n: Integer; begin n := q(); end p;
";
        assert!(semantic_message(source).contains("cannot assign no value"));
    }

    #[test]
    fn checks_return_statements() {
        let mismatch = "function f() return Integer is begin return \"s\"; end f;";
        assert!(semantic_message(mismatch).contains("returns Integer, found String"));
        let in_procedure = "procedure p() is begin return 1; end p;";
        assert!(semantic_message(in_procedure).contains("cannot return a value"));
        assert!(semantic_message("return 1;").contains("return outside of a function"));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let source = "procedure p() is n: Integer; begin if n then n := 1; end if; end p;";
        assert!(semantic_message(source).contains("condition must be Boolean"));
        let source = "\
procedure p() is n: Integer; begin
    if n > 1 then n := 1; elsif n then n := 2; end if;
end p;
";
        assert!(semantic_message(source).contains("condition must be Boolean"));
    }

    #[test]
    fn loop_bounds_must_be_integers() {
        let source = "procedure p() is f: Float; begin for i in 1..f loop end loop; end p;";
        assert!(semantic_message(source).contains("loop bound must be an Integer"));
        let source = "procedure p() is begin for i in 1..m loop end loop; end p;";
        assert!(semantic_message(source).contains("undeclared identifier 'm'"));
    }

    #[test]
    fn arrays_are_indexed_not_used_whole() {
        let base = "procedure p() is xs: array(0..4) of Integer; n: Integer; begin";
        let whole = format!("{base} n := xs; end p;");
        assert!(semantic_message(&whole).contains("cannot be used as a value"));
        let assign = format!("{base} xs := n; end p;");
        assert!(semantic_message(&assign).contains("cannot assign to array"));
        let index = format!("{base} n := xs(true); end p;");
        assert!(semantic_message(&index).contains("array index must be an Integer"));
        let empty = "procedure p() is xs: array(5..1) of Integer; begin end p;";
        assert!(semantic_message(empty).contains("empty range"));
    }

    #[test]
    fn rejects_arrays_the_target_cannot_hold() {
        let widest = "procedure p() is xs: array(-9223372036854775807..9223372036854775807) of Integer; begin end p;";
        assert!(semantic_message(widest).contains("do not fit in Integer"));
        let huge = "procedure p() is xs: array(1..2000000000) of Integer; begin end p;";
        assert!(semantic_message(huge).contains("exceeds"));
        check("procedure p() is xs: array(1..16777216) of Integer; begin end p;")
            .expect("array at the size limit");
    }

    #[test]
    fn integer_literals_must_fit_in_int() {
        let source = "procedure p() is n: Integer; begin n := 99999999999999999999999; end p;";
        assert!(semantic_message(source).contains("does not fit in Integer"));
        let bound = "procedure p() is begin for i in 1..3000000000 loop end loop; end p;";
        assert!(semantic_message(bound).contains("does not fit in Integer"));
        check("procedure p() is n: Integer; begin n := 2147483647; end p;").expect("int max");
    }

    #[test]
    fn loop_variables_are_read_only() {
        let source = "procedure p() is begin for i in 1..3 loop i := 5; end loop; end p;";
        assert!(semantic_message(source).contains("cannot assign to loop variable 'i'"));
        let nested = "\
procedure p() is begin
    for i in 1..3 loop
        for j in 1..i loop
            i := j;
        end loop;
    end loop;
end p;
";
        assert!(semantic_message(nested).contains("loop variable 'i'"));
    }

    #[test]
    fn rejects_unknown_types_unless_registered() {
        let source = "procedure p(h: Handle) is begin end p;";
        assert!(semantic_message(source).contains("unknown type 'Handle'"));

        let program = parse(source).unwrap();
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.register_type("Handle");
        analyzer.check(&program).expect("registered opaque type");
    }

    #[test]
    fn rejects_duplicate_subprograms_and_reserved_names() {
        let source = "procedure p() is begin end p;\nprocedure p() is begin end p;";
        assert!(semantic_message(source).contains("already declared"));
        let source = "procedure p() is true: Integer; begin end p;";
        assert!(semantic_message(source).contains("reserved"));
    }

    #[test]
    fn reports_error_position() {
        let source = "procedure p() is begin\n  x := 1;\nend p;";
        match check(source) {
            Err(CompileError::Semantic { position, row, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(position, 3);
            }
            other => panic!("expected semantic error, got {other:?}"),
        }
    }
}
