use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use log::{LevelFilter, info};
use twopass_core::sources::{SourceFile, load_sources};
use twopass_core::{Compiler, CompilerOptions, GrammarTable, InstructionQueue};

/// Checks source files against a BNF grammar.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Grammar file in BNF notation")]
    grammar: PathBuf,

    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with = "dir",
        help = "Source file to check (reads stdin when neither --input nor --dir is given)"
    )]
    input: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Check every matching file under DIR")]
    dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "EXT",
        default_value = "txt",
        help = "File extension used with --dir"
    )]
    ext: String,

    #[arg(long, help = "Print the instruction queue of every source")]
    dump: bool,

    #[arg(long, help = "Print the compiled grammar rules")]
    rules: bool,

    #[arg(
        long = "comment",
        value_name = "MARKER",
        help = "Line comment marker for source files; may be repeated (defaults to //, ; and #)"
    )]
    comments: Vec<String>,

    #[arg(short, long, action = ArgAction::Count, help = "Raise log verbosity")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let grammar_text = fs::read_to_string(&cli.grammar)
        .with_context(|| format!("failed to read grammar file {}", cli.grammar.display()))?;

    let mut options =
        CompilerOptions::default().with_grammar_name(cli.grammar.display().to_string());
    if !cli.comments.is_empty() {
        options = options.with_comment_markers(cli.comments.iter().cloned());
    }
    let mut compiler = Compiler::new(options);
    let grammar = compiler
        .set_grammar(&grammar_text)
        .with_context(|| format!("failed to compile grammar {}", cli.grammar.display()))?;
    info!("{} rules compiled", grammar.rule_count());
    if cli.rules {
        println!("{}", grammar.to_bnf());
    }

    let sources = read_sources(&cli)?;
    let mut failures = 0usize;
    for source in &sources {
        let name = source.path.display();
        match compiler.tokenize(&source.contents) {
            Ok(_) => println!("{name}: ok"),
            Err(err) => {
                failures += 1;
                eprintln!("{name}: {err}");
            }
        }
        if cli.dump {
            if let (Some(grammar), Some(queue)) = (compiler.grammar(), compiler.instructions()) {
                print!("{}", dump_queue(grammar, queue));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} sources failed", sources.len());
    }
    Ok(())
}

fn read_sources(cli: &Cli) -> Result<Vec<SourceFile>> {
    if let Some(dir) = &cli.dir {
        let files = load_sources(dir, &cli.ext)
            .with_context(|| format!("failed to read sources under {}", dir.display()))?;
        if files.is_empty() {
            bail!("no .{} files under {}", cli.ext.trim_start_matches('.'), dir.display());
        }
        return Ok(files);
    }

    let (path, contents) = match &cli.input {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {}", path.display()))?;
            (path.clone(), contents)
        }
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            (PathBuf::from("<stdin>"), buffer)
        }
    };
    Ok(vec![SourceFile { path, contents }])
}

/// One line per instruction: index, position, lexeme and any side value.
fn dump_queue(grammar: &GrammarTable, queue: &InstructionQueue) -> String {
    let mut out = String::new();
    for (index, instance) in queue.iter().enumerate() {
        let lexeme = grammar
            .token(instance.token)
            .map_or("?", |token| token.lexeme.as_str());
        let _ = write!(
            out,
            "{index:>4}  {}:{}  {} {lexeme}",
            instance.line, instance.column, instance.token
        );
        if let Some(value) = queue.number(index) {
            let _ = write!(out, " = {value}");
        }
        if let Some(label) = queue.label(index) {
            let _ = write!(out, " = {label:?}");
        }
        if !instance.found {
            out.push_str(" (not found)");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    const GREETING: &str = "<g> ::= {<line>}\n<line> ::= 'hello' <#count>\n";

    fn write_grammar(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("greeting.bnf");
        fs::write(&path, GREETING).expect("write grammar");
        path
    }

    #[test]
    fn accepts_valid_input() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());
        let input = dir.path().join("input.txt");
        fs::write(&input, "hello 1\nhello 2").expect("write input");

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--input")
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("input.txt: ok"));
    }

    #[test]
    fn reports_unknown_token_position() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());
        let input = dir.path().join("input.txt");
        fs::write(&input, "hello 1\nhello x").expect("write input");

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--input")
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("line 2, column 7"));
    }

    #[test]
    fn reads_stdin_and_dumps_queue() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--dump")
            .write_stdin("hello 42")
            .assert()
            .success()
            .stdout(predicate::str::contains("<stdin>: ok"))
            .stdout(predicate::str::contains("= 42"));
    }

    #[test]
    fn prints_compiled_rules() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--rules")
            .write_stdin("")
            .assert()
            .success()
            .stdout(predicate::str::contains("<line> ::= 'hello' <#>"));
    }

    #[test]
    fn checks_every_file_in_a_directory() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());
        let sources = dir.path().join("src");
        fs::create_dir_all(&sources).expect("mkdir");
        fs::write(sources.join("a.greet"), "hello 1").expect("write");
        fs::write(sources.join("b.greet"), "goodbye").expect("write");

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--dir")
            .arg(&sources)
            .arg("--ext")
            .arg("greet")
            .assert()
            .failure()
            .stdout(predicate::str::contains("a.greet: ok"))
            .stderr(predicate::str::contains("b.greet: unknown token"))
            .stderr(predicate::str::contains("1 of 2 sources failed"));
    }

    #[test]
    fn reports_grammar_errors() {
        let dir = tempdir().expect("tempdir");
        let grammar = dir.path().join("broken.bnf");
        fs::write(&grammar, "<g> ::= <missing>").expect("write grammar");

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to compile grammar"));
    }

    #[test]
    fn custom_comment_markers() {
        let dir = tempdir().expect("tempdir");
        let grammar = write_grammar(dir.path());

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(&grammar)
            .arg("--comment")
            .arg("%%")
            .write_stdin("hello 1 %% note\nhello 2")
            .assert()
            .success();
    }

    #[test]
    fn checks_bundled_material_sample() {
        let grammars = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../grammars");

        Command::cargo_bin("twopass-cli")
            .expect("binary exists")
            .arg("--grammar")
            .arg(grammars.join("material.bnf"))
            .arg("--dir")
            .arg(&grammars)
            .arg("--ext")
            .arg("material")
            .assert()
            .success()
            .stdout(predicate::str::contains("rock.material: ok"));
    }

    #[test]
    fn dump_lists_values_in_order() {
        let mut compiler = Compiler::default();
        compiler.set_grammar(GREETING).expect("grammar");
        compiler.tokenize("hello 7").expect("tokenize");
        let (Some(grammar), Some(queue)) = (compiler.grammar(), compiler.instructions()) else {
            panic!("compiler state missing");
        };
        let text = dump_queue(grammar, queue);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("1:1") && lines[0].contains("hello"));
        assert!(lines[1].ends_with("= 7"));
    }
}
