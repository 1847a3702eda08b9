// ==============================================================================
// CLI for the Wayland Protocol Scanner
// ==============================================================================
//
//   wl-scanner [OPTIONS] <SOURCE> [OUTPUT]
//
// Reads a protocol document (a file, or stdin for `-`), generates Go bindings,
// and writes them to OUTPUT or stdout. Output files are written in one piece
// after generation succeeded, then handed to `gofmt`.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;

use miette::{Context, IntoDiagnostic};

use wl_scanner::{DEFAULT_BASE_IMPORT, Role, Scanner, Warning};

const USAGE: &str = "\
Generate Go bindings from a Wayland protocol XML file.

Usage: wl-scanner [OPTIONS] <SOURCE> [OUTPUT]

Arguments:
  <SOURCE>  Protocol XML file (`-` reads stdin)
  [OUTPUT]  Go file to write (stdout if omitted or `-`)

Options:
      --side <SIDE>          Generate `client` or `server` bindings [default: client]
      --pkg <NAME>           Go package name [default: wl]
      --unstable <TOKEN>     Strip `_<TOKEN>` from interface names (e.g. v6)
      --strip-prefix <PFX>   Interface prefix to strip [default: wl_ or <pkg>_]
      --base-import <PATH>   Import path of the wl package [default: github.com/malcolmstill/wl]
      --no-fmt               Do not run gofmt on the output file
  -h, --help                 Print help
  -V, --version              Print version
";

// ==============================================================================
// CLI Argument Definitions
// ==============================================================================

struct Args {
    side: Role,
    pkg: String,
    unstable: String,
    strip_prefix: Option<String>,
    base_import: String,
    fmt: bool,
    source: OsString,
    output: Option<PathBuf>,
}

enum Invocation {
    Run(Args),
    Help,
    Version,
}

fn parse_args() -> Result<Invocation, lexopt::Error> {
    use lexopt::prelude::*;

    let mut side = Role::Client;
    let mut pkg = "wl".to_string();
    let mut unstable = String::new();
    let mut strip_prefix = None;
    let mut base_import = DEFAULT_BASE_IMPORT.to_string();
    let mut fmt = true;
    let mut positional = Vec::new();

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("side") => {
                let value = parser.value()?.string()?;
                side = value
                    .parse()
                    .map_err(|e: String| lexopt::Error::from(e))?;
            }
            Long("pkg") => pkg = parser.value()?.string()?,
            Long("unstable") => unstable = parser.value()?.string()?,
            Long("strip-prefix") => strip_prefix = Some(parser.value()?.string()?),
            Long("base-import") => base_import = parser.value()?.string()?,
            Long("no-fmt") => fmt = false,
            Short('h') | Long("help") => return Ok(Invocation::Help),
            Short('V') | Long("version") => return Ok(Invocation::Version),
            Value(value) if positional.len() < 2 => positional.push(value),
            _ => return Err(arg.unexpected()),
        }
    }

    let mut positional = positional.into_iter();
    let source = positional
        .next()
        .ok_or_else(|| lexopt::Error::from("missing <SOURCE> argument"))?;
    Ok(Invocation::Run(Args {
        side,
        pkg,
        unstable,
        strip_prefix,
        base_import,
        fmt,
        source,
        output: positional.next().filter(|o| o != "-").map(PathBuf::from),
    }))
}

// ==============================================================================
// Entry Point
// ==============================================================================

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().build())
    }))?;

    let args = match parse_args() {
        Ok(Invocation::Run(args)) => args,
        Ok(Invocation::Help) => {
            print!("{USAGE}");
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!("wl-scanner {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Err(e) => {
            return Err(miette::miette!(
                help = "run `wl-scanner --help` for usage",
                "{e}"
            ));
        }
    };
    run(args)
}

fn run(args: Args) -> miette::Result<()> {
    let mut scanner = Scanner::new();
    scanner
        .role(args.side)
        .package(args.pkg)
        .unstable_suffix(args.unstable)
        .base_import(args.base_import);
    if let Some(prefix) = args.strip_prefix {
        scanner.strip_prefix(prefix);
    }

    let result = if args.source == "-" {
        let mut xml = String::new();
        io::stdin()
            .read_to_string(&mut xml)
            .into_diagnostic()
            .wrap_err("read protocol from stdin")?;
        scanner.generate_str_named(&xml, "<stdin>")
    } else {
        scanner.generate(&args.source)
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            for warning in scanner.drain_warnings() {
                eprintln!("{warning:?}");
            }
            return Err(e);
        }
    };
    for warning in &output.warnings {
        eprintln!("{warning:?}");
    }

    match &args.output {
        None => write_stdout(&output.code),
        Some(path) => {
            fs::write(path, &output.code)
                .into_diagnostic()
                .wrap_err_with(|| format!("write {}", path.display()))?;
            if args.fmt {
                gofmt(path)?;
            }
            Ok(())
        }
    }
}

/// Write to stdout, exiting quietly when the reader went away.
fn write_stdout(code: &str) -> miette::Result<()> {
    let mut stdout = io::stdout().lock();
    let written = stdout
        .write_all(code.as_bytes())
        .and_then(|()| stdout.flush());
    match written {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.into_diagnostic().wrap_err("write to stdout"),
    }
}

/// Format the written file in place. A missing `gofmt` only warns.
fn gofmt(path: &Path) -> miette::Result<()> {
    let shown = path.display();
    match Command::new("gofmt").arg("-w").arg(path).status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(miette::miette!("gofmt failed on {shown} ({status})")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let warning = Warning {
                message: format!("gofmt not found, {shown} was left unformatted"),
                help: Some(format!("run `gofmt -w {shown}` yourself")),
            };
            eprintln!("{:?}", miette::Report::new(warning));
            Ok(())
        }
        Err(e) => Err(e).into_diagnostic().wrap_err("run gofmt"),
    }
}
