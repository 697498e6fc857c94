use std::io::{Read, Write};

use log::{debug, info};

use crate::ast::Program;
use crate::codegen_cpp::CodeGenerator;
use crate::error::CompileError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyzer;

/// The full pipeline: lex, parse, check, emit C++.
///
/// Every stage runs to completion before the next starts, and nothing is
/// emitted unless all of them succeed.
#[derive(Debug, Default, Clone)]
pub struct Compiler {
    opaque_types: Vec<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `name` as a type in declarations. It is emitted verbatim.
    pub fn register_type(mut self, name: impl Into<String>) -> Self {
        self.opaque_types.push(name.into());
        self
    }

    /// Parse and check `source` without generating code.
    pub fn analyze(&self, source: impl Read) -> Result<Program, CompileError> {
        let mut lexer = Lexer::new();
        lexer.open(source)?;

        let mut parser = Parser::new();
        parser.set_lexer(lexer)?;
        let program = parser.get_ast()?;
        debug!(
            "parsed {} top-level statements",
            program.body.statements.len()
        );

        let mut analyzer = SemanticAnalyzer::new();
        for name in &self.opaque_types {
            analyzer.register_type(name.as_str());
        }
        analyzer.check(&program)?;
        Ok(program)
    }

    /// Compile everything readable from `source` and write C++ to `sink`.
    pub fn compile_to<R: Read, W: Write>(&self, source: R, sink: &mut W) -> Result<(), CompileError> {
        let program = self.analyze(source)?;
        CodeGenerator::new().generate(&program, sink)?;
        info!("compilation finished");
        Ok(())
    }

    pub fn compile(&self, source: &str) -> Result<String, CompileError> {
        let program = self.analyze(source.as_bytes())?;
        let cpp = CodeGenerator::new().emit(&program)?;
        info!("compilation finished");
        Ok(cpp)
    }
}

/// Compile AXX source text into C++ with the default type set.
pub fn compile(source: &str) -> Result<String, CompileError> {
    Compiler::new().compile(source)
}

/// One token per line, as the lexer produces them.
pub fn dump_tokens(source: &str) -> Result<String, CompileError> {
    Lexer::from_source(source).dump_tokens()
}

/// Pretty-printed syntax tree of an unchecked program.
pub fn dump_ast(source: &str) -> Result<String, CompileError> {
    let program = crate::parser::parse(source)?;
    Ok(format!("{program:#?}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
-- greatest common divisor
function gcd(a: Integer; b: Integer) return Integer is
    x: Integer;
    y: Integer;
    t: Integer;
begin
    x := a;
    y := b;
    while y /= 0 loop
        t := x mod y;
        x := y;
        y := t;
    end loop;
    return x;
end gcd;

procedure fill(n: Integer) is
    squares: array(1..10) of Integer;
    total: Integer;
begin
    total := 0;
    for i in 1..n loop
        total := total + squares(i) * gcd(i, n);
    end loop;
end fill;

fill(10);
";

    #[test]
    fn compiles_sample_program() {
        let _ = env_logger::builder().is_test(true).try_init();
        let cpp = compile(SAMPLE).expect("compile");
        assert!(cpp.starts_with("#include <string>\n"));
        assert!(cpp.contains("int gcd(int a, int b);\n"));
        assert!(cpp.contains("void fill(int n);\n"));
        assert!(cpp.contains("    while (y != 0) {\n        t = x % y;\n"));
        assert!(cpp.contains("    int squares[10];\n"));
        assert!(cpp.contains("total = total + (squares[i - 1] * gcd(i, n));"));
        assert!(cpp.contains("int main() {\n    fill(10);\n    return 0;\n}\n"));
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(compile(SAMPLE).unwrap(), compile(SAMPLE).unwrap());
    }

    #[test]
    fn reader_and_string_entry_points_agree() {
        let mut sink = Vec::new();
        Compiler::new()
            .compile_to(SAMPLE.as_bytes(), &mut sink)
            .unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), compile(SAMPLE).unwrap());
    }

    #[test]
    fn stops_at_first_failing_stage() {
        assert!(matches!(
            compile("procedure p() is begin x := 1 end p;"),
            Err(CompileError::Syntax { .. })
        ));
        assert!(matches!(
            compile("procedure p() is begin x := 1; end p;"),
            Err(CompileError::Semantic { .. })
        ));
        assert!(matches!(
            compile("procedure p() is begin x := \"open; end p;"),
            Err(CompileError::Lexical { .. })
        ));
    }

    #[test]
    fn registered_types_are_emitted_verbatim() {
        let source = "procedure use_handle(h: Handle) is copy: Handle; begin copy := h; end use_handle;";
        assert!(compile(source).is_err());

        let cpp = Compiler::new()
            .register_type("Handle")
            .compile(source)
            .unwrap();
        assert!(cpp.contains("void use_handle(Handle h) {\n    Handle copy;\n    copy = h;\n}\n"));
    }

    #[test]
    fn dumps_tokens_and_tree() {
        let tokens = dump_tokens("x := 1;").unwrap();
        assert!(tokens.lines().next().unwrap().starts_with("Id 'x'"));
        let tree = dump_ast("x := 1;").unwrap();
        assert!(tree.contains("Assignment"));
    }
}
