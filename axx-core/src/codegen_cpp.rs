//! C++ backend.
//!
//! Emits a single translation unit from a checked [`Program`]:
//!
//! ```text
//! #include <string>
//!
//! <prototype of every subprogram>
//!
//! <subprogram definitions, declarations hoisted to the top of each body>
//!
//! int main() { <top-level statements> return 0; }
//! ```
//!
//! The generator assumes the tree passed [`SemanticAnalyzer`] and does not
//! re-check types. An operator without a C++ mapping is reported as
//! [`CompileError::Internal`].
//!
//! [`SemanticAnalyzer`]: crate::semantic::SemanticAnalyzer

use std::collections::HashMap;
use std::io;

use log::debug;
use phf::{phf_map, phf_set};

use crate::ast::{
    Assignment, Binary, Block, Call, ElseBranch, Expr, For, FormalParams, Function, If, Leaf,
    Procedure, Program, Return, Stmt, Unary, VariableDeclaration, Visitor, While,
};
use crate::error::CompileError;
use crate::token::TokenKind;

pub const PREAMBLE: &str = "#include <string>";

const INDENT: &str = "    ";

/// AXX primitive type names (lowercased) and their C++ spelling.
static TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "integer" => "int",
    "float" => "double",
    "boolean" => "bool",
    "string" => "std::string",
    "character" => "char",
};

/// Valid AXX identifiers that would not be usable as C++ identifiers.
/// They are emitted with a trailing underscore, which AXX identifiers
/// cannot have.
static RESERVED: phf::Set<&'static str> = phf_set! {
    "alignas", "alignof", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break", "case",
    "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept", "const",
    "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await", "co_return",
    "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast", "enum",
    "explicit", "export", "extern", "float", "friend", "goto", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not_eq", "nullptr", "operator", "or_eq",
    "private", "protected", "public", "register", "reinterpret_cast", "requires", "short",
    "signed", "sizeof", "static", "static_assert", "static_cast", "struct", "switch",
    "template", "this", "thread_local", "throw", "try", "typedef", "typeid", "typename",
    "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "xor", "xor_eq",
    "main", "std",
};

fn binary_operator(kind: TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Or => "||",
        TokenKind::And => "&&",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Div => "/",
        TokenKind::Mod => "%",
        TokenKind::Equal => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Less => "<",
        TokenKind::LEqual => "<=",
        TokenKind::Greater => ">",
        TokenKind::GrEqual => ">=",
        _ => return None,
    })
}

fn unary_operator(kind: TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Not => "!",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        _ => return None,
    })
}

/// C++ spelling of an AXX type name. Unknown names pass through unchanged.
pub fn cpp_type(name: &str) -> String {
    match TYPES.get(name.to_ascii_lowercase().as_str()) {
        Some(cpp) => (*cpp).to_string(),
        None => name.to_string(),
    }
}

/// C++ spelling of an AXX identifier.
pub fn cpp_ident(name: &str) -> String {
    if RESERVED.contains(name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Integer literals lose leading zeros so C++ does not read them as octal.
fn number_literal(text: &str) -> String {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let trimmed = whole.trim_start_matches('0');
    let whole = if trimmed.is_empty() { "0" } else { trimmed };
    match fraction {
        Some(fraction) => format!("{whole}.{fraction}"),
        None => whole.to_string(),
    }
}

fn escape(text: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Default)]
pub struct CodeGenerator {
    out: String,
    depth: usize,
    /// Lower bound of every array declared in the current subprogram.
    arrays: HashMap<String, i64>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `program` as C++ into `writer`.
    pub fn generate<W: io::Write>(
        &mut self,
        program: &Program,
        writer: &mut W,
    ) -> Result<(), CompileError> {
        let text = self.emit(program)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Emit `program` as C++ and return the text.
    pub fn emit(&mut self, program: &Program) -> Result<String, CompileError> {
        self.out.clear();
        self.depth = 0;
        self.arrays.clear();

        self.line(PREAMBLE);

        let (subprograms, main_body): (Vec<&Stmt>, Vec<&Stmt>) = program
            .body
            .statements
            .iter()
            .partition(|stmt| stmt.is_subprogram());

        if !subprograms.is_empty() {
            self.out.push('\n');
            for stmt in &subprograms {
                let prototype = match stmt {
                    Stmt::Function(function) => Self::prototype(
                        &cpp_type(function.return_type.text()),
                        &function.name,
                        &function.params,
                    ),
                    Stmt::Procedure(procedure) => {
                        Self::prototype("void", &procedure.name, &procedure.params)
                    }
                    _ => continue,
                };
                self.line(&format!("{prototype};"));
            }
        }

        for stmt in subprograms {
            self.out.push('\n');
            stmt.accept(self)?;
        }

        if !main_body.is_empty() {
            self.out.push('\n');
            self.arrays.clear();
            self.line("int main() {");
            self.depth += 1;
            for stmt in main_body {
                stmt.accept(self)?;
            }
            self.line("return 0;");
            self.depth -= 1;
            self.line("}");
        }

        debug!("emitted {} bytes of C++", self.out.len());
        Ok(std::mem::take(&mut self.out))
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn prototype(result: &str, name: &Leaf, params: &FormalParams) -> String {
        let params = params
            .params
            .iter()
            .map(|param| format!("{} {}", cpp_type(param.ty.text()), cpp_ident(param.name.text())))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{result} {}({params})", cpp_ident(name.text()))
    }

    fn declaration(&mut self, declaration: &VariableDeclaration) -> Result<(), CompileError> {
        let ty = cpp_type(declaration.ty.text());
        let name = cpp_ident(declaration.name.text());
        match declaration.range {
            Some(range) => {
                let len = range.len().ok_or_else(|| {
                    CompileError::Internal(format!(
                        "array '{}' has no representable length",
                        declaration.name.text()
                    ))
                })?;
                self.arrays.insert(declaration.name.text().to_string(), range.low);
                self.line(&format!("{ty} {name}[{len}];"));
            }
            None => self.line(&format!("{ty} {name};")),
        }
        Ok(())
    }

    /// Emit the statements of `block` one level deeper, preceded by the
    /// hoisted `declarations`.
    fn block(
        &mut self,
        block: &Block,
        declarations: &[VariableDeclaration],
    ) -> Result<(), CompileError> {
        self.depth += 1;
        for declaration in declarations {
            self.declaration(declaration)?;
        }
        for stmt in &block.statements {
            stmt.accept(self)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn subprogram(
        &mut self,
        header: String,
        declarations: &[VariableDeclaration],
        body: &Block,
    ) -> Result<(), CompileError> {
        self.arrays.clear();
        self.line(&format!("{header} {{"));
        self.block(body, declarations)?;
        self.line("}");
        Ok(())
    }

    /// An expression without its outermost parentheses.
    fn bare(&mut self, expr: &Expr) -> Result<String, CompileError> {
        match expr {
            Expr::Binary(binary) => self.infix(binary),
            other => other.accept(self),
        }
    }

    fn infix(&mut self, binary: &Binary) -> Result<String, CompileError> {
        let op = binary_operator(binary.op.kind()).ok_or_else(|| {
            CompileError::Internal(format!("no C++ operator for {:?}", binary.op.kind()))
        })?;
        let left = binary.left.accept(self)?;
        let right = binary.right.accept(self)?;
        Ok(format!("{left} {op} {right}"))
    }

    fn else_branch(&mut self, tail: &Option<ElseBranch>) -> Result<(), CompileError> {
        match tail {
            Some(ElseBranch::Elif(elif)) => {
                let condition = self.bare(&elif.condition)?;
                self.line(&format!("}} else if ({condition}) {{"));
                self.block(&elif.body, &[])?;
                self.else_branch(&elif.tail)
            }
            Some(ElseBranch::Else(else_block)) => {
                self.line("} else {");
                self.block(&else_block.body, &[])
            }
            None => Ok(()),
        }
    }
}

impl Visitor for CodeGenerator {
    type ExprOutput = Result<String, CompileError>;
    type StmtOutput = Result<(), CompileError>;

    fn visit_leaf(&mut self, leaf: &Leaf) -> Result<String, CompileError> {
        match leaf.kind() {
            TokenKind::Id => Ok(cpp_ident(leaf.text())),
            TokenKind::Number => Ok(number_literal(leaf.text())),
            TokenKind::String => Ok(format!("std::string(\"{}\")", escape(leaf.text(), '"'))),
            TokenKind::Character => Ok(format!("'{}'", escape(leaf.text(), '\''))),
            other => Err(CompileError::Internal(format!(
                "{other:?} token used as an operand"
            ))),
        }
    }

    fn visit_call(&mut self, call: &Call) -> Result<String, CompileError> {
        let name = cpp_ident(call.callee.text());

        if let Some(&low) = self.arrays.get(call.callee.text()) {
            let [index] = call.args.args.as_slice() else {
                return Err(CompileError::Internal(format!(
                    "array '{}' indexed with {} subscripts",
                    call.callee.text(),
                    call.args.args.len()
                )));
            };
            let subscript = match low {
                0 => self.bare(index)?,
                low if low > 0 => format!("{} - {low}", index.accept(self)?),
                low => format!("{} + {}", index.accept(self)?, -low),
            };
            return Ok(format!("{name}[{subscript}]"));
        }

        let args = call
            .args
            .args
            .iter()
            .map(|arg| self.bare(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{name}({})", args.join(", ")))
    }

    fn visit_binary(&mut self, binary: &Binary) -> Result<String, CompileError> {
        Ok(format!("({})", self.infix(binary)?))
    }

    fn visit_unary(&mut self, unary: &Unary) -> Result<String, CompileError> {
        let op = unary_operator(unary.op.kind()).ok_or_else(|| {
            CompileError::Internal(format!("no C++ operator for {:?}", unary.op.kind()))
        })?;
        Ok(format!("({op}{})", unary.operand.accept(self)?))
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let expr = self.bare(expr)?;
        self.line(&format!("{expr};"));
        Ok(())
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> Result<(), CompileError> {
        let value = self.bare(&assignment.value)?;
        let target = cpp_ident(assignment.target.text());
        self.line(&format!("{target} = {value};"));
        Ok(())
    }

    fn visit_return(&mut self, ret: &Return) -> Result<(), CompileError> {
        let value = self.bare(&ret.value)?;
        self.line(&format!("return {value};"));
        Ok(())
    }

    fn visit_if(&mut self, if_stmt: &If) -> Result<(), CompileError> {
        let condition = self.bare(&if_stmt.condition)?;
        self.line(&format!("if ({condition}) {{"));
        self.block(&if_stmt.body, &[])?;
        self.else_branch(&if_stmt.tail)?;
        self.line("}");
        Ok(())
    }

    fn visit_while(&mut self, while_stmt: &While) -> Result<(), CompileError> {
        let condition = self.bare(&while_stmt.condition)?;
        self.line(&format!("while ({condition}) {{"));
        self.block(&while_stmt.body, &[])?;
        self.line("}");
        Ok(())
    }

    fn visit_for(&mut self, for_stmt: &For) -> Result<(), CompileError> {
        let raw = for_stmt.iterator.text();
        let iterator = cpp_ident(raw);
        // The upper bound is exclusive. Bounds resolve outside the loop, so a
        // variable bound is copied into `<iterator>_end_` (or `_start_`) before
        // the iterator is declared. No AXX identifier ends in `_`.
        let mut locals = Vec::new();
        let mut to = self.visit_leaf(&for_stmt.to)?;
        if for_stmt.to.kind() == TokenKind::Id {
            let end = format!("{raw}_end_");
            locals.push(format!("{end} = {to}"));
            to = end;
        }
        let mut from = self.visit_leaf(&for_stmt.from)?;
        if for_stmt.from.kind() == TokenKind::Id && for_stmt.from.text() == raw {
            let start = format!("{raw}_start_");
            locals.push(format!("{start} = {from}"));
            from = start;
        }
        locals.push(format!("{iterator} = {from}"));
        self.line(&format!(
            "for (int {}; {iterator} < {to}; {iterator}++) {{",
            locals.join(", ")
        ));
        self.block(&for_stmt.body, &[])?;
        self.line("}");
        Ok(())
    }

    fn visit_function(&mut self, function: &Function) -> Result<(), CompileError> {
        let header = Self::prototype(
            &cpp_type(function.return_type.text()),
            &function.name,
            &function.params,
        );
        self.subprogram(header, &function.declarations, &function.body)
    }

    fn visit_procedure(&mut self, procedure: &Procedure) -> Result<(), CompileError> {
        let header = Self::prototype("void", &procedure.name, &procedure.params);
        self.subprogram(header, &procedure.declarations, &procedure.body)
    }
}
