use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};

use jsonnet::resolver::{ImportError, ImportResolver};
use jsonnet::{EvalOptions, StderrTracer};

/// Resolves `import`/`importstr`/`importbin` against the filesystem:
/// relative to the importing file's own directory first, then each `-J`
/// search path in order, matching the reference implementation's search
/// order.
#[derive(Debug)]
struct FsResolver {
    search_paths: Vec<PathBuf>,
}

impl ImportResolver for FsResolver {
    fn resolve(&mut self, importer: &str, requested: &str) -> Result<(String, String), ImportError> {
        let requested_path = Path::new(requested);
        if requested_path.is_absolute() {
            return read(requested_path);
        }
        if let Some(dir) = Path::new(importer).parent() {
            let candidate = dir.join(requested_path);
            if candidate.is_file() {
                return read(&candidate);
            }
        }
        for base in &self.search_paths {
            let candidate = base.join(requested_path);
            if candidate.is_file() {
                return read(&candidate);
            }
        }
        Err(ImportError(format!("no such file or has no permission to read: {requested}")))
    }
}

fn read(path: &Path) -> Result<(String, String), ImportError> {
    let canonical = path.to_string_lossy().into_owned();
    let contents = fs::read_to_string(path).map_err(|e| ImportError(format!("couldn't open {canonical}: {e}")))?;
    Ok((canonical, contents))
}

struct Args {
    input: Input,
    options: EvalOptions,
    output_file: Option<String>,
    library_paths: Vec<PathBuf>,
}

enum Input {
    File(String),
    Inline(String),
}

fn usage() -> ! {
    eprintln!(
        "usage: jsonnet [options] <file>\n\
         \n\
         options:\n\
         \x20 -e, --exec <code>       evaluate <code> instead of reading a file\n\
         \x20 -J, --jpath <dir>       add a library search directory (repeatable)\n\
         \x20 -o, --output-file <f>   write output to <f> instead of stdout\n\
         \x20 -S, --string            expect a string result, print it raw\n\
         \x20 -V, --ext-str <k=v>     set an external string variable\n\
         \x20     --ext-code <k=v>   set an external variable from code\n\
         \x20 -A, --tla-str <k=v>     pass a top-level string argument\n\
         \x20     --tla-code <k=v>   pass a top-level argument from code\n\
         \x20     --max-stack <n>    override the recursion depth limit\n"
    );
    std::process::exit(2);
}

fn split_kv(s: &str, flag: &str) -> (String, String) {
    match s.split_once('=') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => {
            eprintln!("{flag} expects NAME=VALUE, got: {s}");
            std::process::exit(2);
        }
    }
}

fn parse_args() -> Args {
    let mut raw = env::args().skip(1);
    let mut input: Option<Input> = None;
    let mut options = EvalOptions { tracer: Box::new(StderrTracer::new()), ..EvalOptions::default() };
    let mut output_file = None;
    let mut library_paths = Vec::new();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-e" | "--exec" => input = Some(Input::Inline(raw.next().unwrap_or_else(|| usage()))),
            "-J" | "--jpath" => library_paths.push(PathBuf::from(raw.next().unwrap_or_else(|| usage()))),
            "-o" | "--output-file" => output_file = Some(raw.next().unwrap_or_else(|| usage())),
            "-S" | "--string" => options.string_output = true,
            "-V" | "--ext-str" => options.ext_vars.push(split_kv(&raw.next().unwrap_or_else(|| usage()), "--ext-str")),
            "--ext-code" => options.ext_codes.push(split_kv(&raw.next().unwrap_or_else(|| usage()), "--ext-code")),
            "-A" | "--tla-str" => options.tla_vars.push(split_kv(&raw.next().unwrap_or_else(|| usage()), "--tla-str")),
            "--tla-code" => options.tla_codes.push(split_kv(&raw.next().unwrap_or_else(|| usage()), "--tla-code")),
            "--max-stack" => {
                let n = raw.next().unwrap_or_else(|| usage());
                options.max_stack = Some(n.parse().unwrap_or_else(|_| {
                    eprintln!("--max-stack expects an integer, got: {n}");
                    std::process::exit(2);
                }));
            }
            "-h" | "--help" => usage(),
            other if input.is_none() => input = Some(Input::File(other.to_string())),
            other => {
                eprintln!("unexpected argument: {other}");
                usage();
            }
        }
    }

    let Some(input) = input else { usage() };
    Args { input, options, output_file, library_paths }
}

fn main() -> ExitCode {
    let mut args = parse_args();

    let (source, file_name) = match &args.input {
        Input::Inline(code) => (code.clone(), "<cmdline>".to_string()),
        Input::File(path) => match fs::read_to_string(path) {
            Ok(contents) => (contents, path.clone()),
            Err(e) => {
                eprintln!("jsonnet: couldn't open {path}: {e}");
                return ExitCode::from(1);
            }
        },
    };

    args.options.import_resolver = Box::new(FsResolver { search_paths: std::mem::take(&mut args.library_paths) });

    let result = jsonnet::evaluate(&source, file_name, args.options);
    match result {
        Ok(mut output) => {
            if !output.ends_with('\n') {
                output.push('\n');
            }
            match &args.output_file {
                Some(path) => {
                    if let Err(e) = fs::write(path, output) {
                        eprintln!("jsonnet: couldn't write {path}: {e}");
                        return ExitCode::from(1);
                    }
                }
                None => print!("{output}"),
            }
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("{diag}");
            ExitCode::from(1)
        }
    }
}
