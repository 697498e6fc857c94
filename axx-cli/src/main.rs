use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use axx_core::{Compiler, dump_ast, dump_tokens};
use clap::Parser;
use clap::error::ErrorKind;
use log::info;

/// Compile an AXX source file into C++.
#[derive(Parser, Debug)]
#[command(name = "axx", version, about, long_about = None)]
struct Cli {
    /// AXX source file
    input: PathBuf,

    #[arg(short, long, value_name = "PATH", default_value = "output.cpp")]
    output: PathBuf,

    #[arg(
        long = "type",
        value_name = "NAME",
        help = "Accept NAME as an opaque type (repeatable)"
    )]
    types: Vec<String>,

    #[arg(long, conflicts_with = "ast", help = "Print the token stream instead of compiling")]
    tokens: bool,

    #[arg(long, help = "Print the syntax tree instead of compiling")]
    ast: bool,
}

const FAILURE: u8 = 255;

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(FAILURE),
            };
        }
    };

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(FAILURE)
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    if !cli.input.is_file() {
        bail!("input file {} does not exist or is not a file", cli.input.display());
    }
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {}", cli.input.display()))?;

    if cli.tokens {
        print!("{}", dump_tokens(&source)?);
        return Ok(());
    }
    if cli.ast {
        print!("{}", dump_ast(&source)?);
        return Ok(());
    }

    let compiler = cli
        .types
        .iter()
        .fold(Compiler::new(), |compiler, name| compiler.register_type(name.as_str()));
    let cpp = compiler
        .compile(&source)
        .with_context(|| format!("failed to compile {}", cli.input.display()))?;

    write_output(&cli.output, cpp.as_bytes())?;
    info!("wrote {}", cli.output.display());
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    const PROGRAM: &str = "\
function twice(x: Integer) return Integer is
begin
    return x * 2;
end twice;

procedure main_loop() is
    total: Integer;
begin
    total := 0;
    for i in 1..5 loop
        total := total + twice(i);
    end loop;
end main_loop;

main_loop();
";

    fn axx() -> Command {
        Command::cargo_bin("axx").expect("binary exists")
    }

    #[test]
    fn compiles_to_requested_output() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.axx");
        fs::write(&input_path, PROGRAM).expect("write input");
        let output_path = dir.path().join("build").join("out.cpp");

        axx()
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        let cpp = fs::read_to_string(&output_path).expect("read output");
        assert!(cpp.starts_with("#include <string>\n"));
        assert!(cpp.contains("int twice(int x) {"));
        assert!(cpp.contains("for (int i = 1; i < 5; i++) {"));
        assert!(cpp.contains("int main() {"));
    }

    #[test]
    fn defaults_to_output_cpp_in_working_directory() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("input.axx"), PROGRAM).expect("write input");

        axx()
            .current_dir(dir.path())
            .arg("input.axx")
            .assert()
            .success();

        assert!(dir.path().join("output.cpp").exists(), "output.cpp was not created");
    }

    #[test]
    fn reports_missing_input() {
        let dir = tempdir().expect("tempdir");
        axx()
            .arg(dir.path().join("missing.axx"))
            .assert()
            .code(255)
            .stderr(predicate::str::contains("does not exist"));
    }

    #[test]
    fn rejects_directory_as_input() {
        let dir = tempdir().expect("tempdir");
        axx()
            .arg(dir.path())
            .assert()
            .code(255)
            .stderr(predicate::str::contains("not a file"));
    }

    #[test]
    fn requires_an_input_argument() {
        axx().assert().code(255);
    }

    #[test]
    fn help_exits_successfully() {
        axx()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--output"));
    }

    #[test]
    fn semantic_errors_fail_without_output() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("bad.axx");
        fs::write(&input_path, "procedure p() is begin y := 1; end p;").expect("write input");
        let output_path = dir.path().join("out.cpp");

        axx()
            .arg(&input_path)
            .arg("-o")
            .arg(&output_path)
            .assert()
            .code(255)
            .stderr(predicate::str::contains("undeclared identifier 'y'"))
            .stderr(predicate::str::contains("row=1"));

        assert!(!output_path.exists(), "no output expected on error");
    }

    #[test]
    fn syntax_errors_report_offending_token() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("bad.axx");
        fs::write(&input_path, "procedure p() is\nbegin\n  if then\nend p;").expect("write input");

        axx()
            .current_dir(dir.path())
            .arg(&input_path)
            .assert()
            .code(255)
            .stderr(predicate::str::contains("syntax error"))
            .stderr(predicate::str::contains("row=3"));
    }

    #[test]
    fn opaque_types_from_command_line() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.axx");
        fs::write(&input_path, "procedure p(f: File) is begin end p;").expect("write input");
        let output_path = dir.path().join("out.cpp");

        axx()
            .arg(&input_path)
            .arg("-o")
            .arg(&output_path)
            .assert()
            .code(255)
            .stderr(predicate::str::contains("unknown type 'File'"));

        axx()
            .arg(&input_path)
            .arg("-o")
            .arg(&output_path)
            .arg("--type")
            .arg("File")
            .assert()
            .success();

        let cpp = fs::read_to_string(&output_path).expect("read output");
        assert!(cpp.contains("void p(File f)"));
    }

    #[test]
    fn prints_tokens() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.axx");
        fs::write(&input_path, "x := 42;").expect("write input");

        axx()
            .arg(&input_path)
            .arg("--tokens")
            .assert()
            .success()
            .stdout(predicate::str::contains("Assign ':=' pos=3 row=1"))
            .stdout(predicate::str::contains("Number '42'"));
    }

    #[test]
    fn prints_syntax_tree() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.axx");
        fs::write(&input_path, PROGRAM).expect("write input");

        axx()
            .arg(&input_path)
            .arg("--ast")
            .assert()
            .success()
            .stdout(predicate::str::contains("Function"))
            .stdout(predicate::str::contains("For"));
    }
}
