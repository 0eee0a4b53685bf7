use anyhow::Context;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::filter::{Filter, FilterError};

#[derive(Args)]
pub struct DetailArgs {
    #[arg(help = "Path to the detail JSON document, or - for stdin")]
    pub file: PathBuf,
}

fn read_detail(args: &DetailArgs) -> anyhow::Result<String> {
    if args.file.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("reading detail from stdin");
    }
    std::fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file.display()))
}

fn report(err: &FilterError, output_format: &OutputFormat) -> anyhow::Result<()> {
    output_error(output_format, &err.to_string(), Some(err.path()))?;
    anyhow::bail!("detail document does not compile")
}

pub fn compile(args: DetailArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let raw = read_detail(&args)?;
    match Filter::compile_str(&raw) {
        Ok(clause) => match output_format {
            OutputFormat::Text => {
                println!("{}", clause);
                Ok(())
            }
            OutputFormat::Json => output_success(&output_format, "compiled", Some(json!({ "row_filter_clause": clause }))),
        },
        Err(e) => report(&e, &output_format),
    }
}

pub fn validate(args: DetailArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let raw = read_detail(&args)?;
    match Filter::compile_str(&raw) {
        Ok(clause) if clause.is_empty() => output_success(&output_format, "valid (no row restriction)", None),
        Ok(_) => output_success(&output_format, "valid", None),
        Err(e) => report(&e, &output_format),
    }
}
