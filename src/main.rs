//! This program provides a quick way to check that a VPC matches the
//! properties it is expected to have: that it exists at all, that its CIDR
//! block is the configured one, and that it carries the expected tags. AWS
//! configuration must be set up to access the account owning the VPC.

mod checks;
mod provider;
mod types;

use clap::Parser;
use std::process::exit;

use checks::properties::PropertyCheckBuilder;
use provider::aws::{aws_setup, VpcProvider, FIELD_CIDR_BLOCK, FIELD_TAGS};
use types::{Expectation, FieldValue};

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Checks,
    Json,
    Debug,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Verifies that a VPC exists and has the expected CIDR block and tags. AWS configuration must be setup to access the account owning the VPC.",
    long_about = "Verifies that a VPC exists and has the expected CIDR block and tags. AWS configuration must be setup to access the account owning the VPC."
)]
struct Options {
    /// The VPC to check. Falls back to the VPC_ID environment variable.
    #[arg(short = 'i', long)]
    vpc_id: Option<String>,
    /// Expected CIDR block, compared as an exact string.
    #[arg(short, long)]
    cidr_block: Option<String>,
    /// Expected tag as KEY=VALUE. May be passed multiple times.
    #[arg(short, long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Checks)]
    format: OutputFormat,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got: '{}'", raw)),
    }
}

/// The existence check always runs first; field checks only run when the
/// matching flag was given.
fn build_expectations(options: &Options) -> Vec<Expectation> {
    let mut expectations = vec![Expectation::Exists];
    if let Some(cidr_block) = &options.cidr_block {
        expectations.push(Expectation::Equals {
            path: FIELD_CIDR_BLOCK.into(),
            expected: FieldValue::Scalar(cidr_block.clone()),
        });
    }
    for (key, value) in &options.tags {
        expectations.push(Expectation::ContainsEntry {
            path: FIELD_TAGS.into(),
            key: key.clone(),
            value: value.clone(),
        });
    }
    expectations
}

#[tokio::main]
async fn main() {
    let options = Options::parse();
    env_logger::Builder::new()
        .filter_level(options.verbose.log_level_filter())
        .init();
    let vpc_id = match options
        .vpc_id
        .clone()
        .or_else(|| std::env::var("VPC_ID").ok())
    {
        Some(vpc_id) => vpc_id,
        None => {
            eprintln!("Must set a VPC via --vpc-id or VPC_ID to proceed.");
            exit(2);
        }
    };

    let expectations = build_expectations(&options);
    let config = aws_setup().await;
    let client = aws_sdk_ec2::Client::new(&config);
    let vpc_provider = VpcProvider { client: &client };

    let mut pcb = PropertyCheckBuilder::default();
    let check = pcb
        .resource_id(vpc_id)
        .expectations(expectations)
        .build()
        .unwrap();
    let report = match check.evaluate(&vpc_provider).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", err);
            exit(2);
        }
    };

    match options.format {
        OutputFormat::Debug => {
            println!("{}", &format!("{:#?}", report))
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap())
        }
        OutputFormat::Checks => {
            for res in &report.results {
                println!("{}", res);
            }
        }
    }
    if !report.passed() {
        exit(1);
    }
}
