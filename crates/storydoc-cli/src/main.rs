//! Re-render a canonical `RawRun` dump into any report format.
//!
//! The engine can write a `raw-run.json` alongside its reports; this tool
//! lets downstream tooling (or a curious human) turn that dump back into
//! Markdown, JSON, JUnit XML, or Cucumber-JSON without re-running tests.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};

use storydoc_engine::ReportFormat;
use storydoc_report::{
    render_cucumber, render_json, render_junit, render_markdown, CucumberOptions,
    CustomRendererRegistry, JUnitOptions, JsonReportOptions, MarkdownOptions,
};
use storydoc_types::RawRun;

const DEFAULT_FORMAT: ReportFormat = ReportFormat::Markdown;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    input: Option<String>,
    output: Option<String>,
    format: ReportFormat,
    title: Option<String>,
    show_help: bool,
}

fn main() {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let exit_code = run(std::env::args_os(), &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let Some(input) = options.input.as_deref() else {
        let _ = writeln!(err, "error: --input is required");
        let _ = write_usage(err);
        return 2;
    };

    let raw = match fs::read_to_string(input) {
        Ok(raw) => raw,
        Err(error) => {
            let _ = writeln!(err, "error: cannot read '{input}': {error}");
            return 1;
        }
    };
    let run: RawRun = match serde_json::from_str(&raw) {
        Ok(run) => run,
        Err(error) => {
            let _ = writeln!(err, "error: '{input}' is not a raw run dump: {error}");
            return 1;
        }
    };

    let rendered = match render(&run, &options) {
        Ok(rendered) => rendered,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return 1;
        }
    };

    match options.output.as_deref() {
        Some(path) => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(error) = fs::create_dir_all(parent) {
                        let _ = writeln!(err, "error: cannot create '{}': {error}", parent.display());
                        return 1;
                    }
                }
            }
            if let Err(error) = fs::write(path, format!("{rendered}\n")) {
                let _ = writeln!(err, "error: cannot write '{path}': {error}");
                return 1;
            }
            0
        }
        None => {
            if writeln!(out, "{rendered}").is_err() {
                return 1;
            }
            0
        }
    }
}

fn render(run: &RawRun, options: &CliOptions) -> Result<String, String> {
    let title = options
        .title
        .clone()
        .unwrap_or_else(|| "User Stories".to_owned());
    let destination = options.output.as_deref().unwrap_or("stdout");

    match options.format {
        ReportFormat::Markdown => {
            let opts = MarkdownOptions {
                title,
                ..MarkdownOptions::default()
            };
            Ok(render_markdown(
                run,
                &run.test_cases,
                destination,
                &opts,
                &CustomRendererRegistry::new(),
            ))
        }
        ReportFormat::Json => {
            let opts = JsonReportOptions {
                title,
                ..JsonReportOptions::default()
            };
            render_json(run, &run.test_cases, destination, &opts).map_err(|e| e.to_string())
        }
        ReportFormat::JunitXml => {
            let opts = JUnitOptions {
                suite_name: title,
                ..JUnitOptions::default()
            };
            Ok(render_junit(run, &run.test_cases, &opts))
        }
        ReportFormat::CucumberJson => {
            render_cucumber(run, &run.test_cases, &CucumberOptions::default())
                .map_err(|e| e.to_string())
        }
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut input: Option<String> = None;
    let mut output: Option<String> = None;
    let mut format = DEFAULT_FORMAT;
    let mut title: Option<String> = None;
    let mut show_help = false;
    let mut saw_render = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        match arg.as_ref() {
            "render" if !saw_render => saw_render = true,
            "--help" | "-h" => show_help = true,
            "--input" | "-i" => {
                input = Some(expect_value(&mut iter, "--input")?);
            }
            "--output" | "-o" => {
                output = Some(expect_value(&mut iter, "--output")?);
            }
            "--title" => {
                title = Some(expect_value(&mut iter, "--title")?);
            }
            "--format" | "-f" => {
                let value = expect_value(&mut iter, "--format")?;
                format = ReportFormat::parse(&value)
                    .ok_or_else(|| format!("unknown format '{value}'"))?;
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    if !saw_render && !show_help {
        return Err("expected the 'render' subcommand".to_owned());
    }

    Ok(CliOptions {
        input,
        output,
        format,
        title,
        show_help,
    })
}

fn expect_value<I>(iter: &mut I, flag: &str) -> Result<String, String>
where
    I: Iterator<Item = OsString>,
{
    iter.next()
        .map(|v| v.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "usage: storydoc render --input <raw-run.json> [options]")?;
    writeln!(out)?;
    writeln!(out, "options:")?;
    writeln!(out, "  -i, --input <path>    canonical raw run dump to render")?;
    writeln!(out, "  -o, --output <path>   destination file (stdout when omitted)")?;
    writeln!(
        out,
        "  -f, --format <name>   markdown | json | junit | cucumber (default: markdown)"
    )?;
    writeln!(out, "      --title <text>    report title")?;
    writeln!(out, "  -h, --help            show this help")?;
    Ok(())
}
