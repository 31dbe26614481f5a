// Copyright 2022 Oxide Computer Company

use anyhow::{anyhow, Result};
use clap::Parser;
use colored::Colorize;
use gs1::engine::{DlPathOrder, ExtractedAi};
use gs1::validate::Validation;
use gs1::Engine;

#[derive(Parser)]
#[clap(version = "0.1")]
struct Opts {
    /// Input data: a bracketed AI element string such as
    /// (01)12345678901231(10)ABC123, unbracketed AI data with ^ as FNC1,
    /// or a GS1 Digital Link URI.
    input: String,

    /// Treat the input as the given form instead of sniffing it.
    #[clap(long, value_enum)]
    form: Option<Form>,

    /// Permit AIs that are not in the AI table.
    #[clap(long)]
    permit_unknown_ais: bool,

    /// Permit zero-suppressed GTINs in DL URI paths and query strings.
    #[clap(long)]
    permit_zero_suppressed_gtin: bool,

    /// Stem to use when generating the Digital Link URI.
    #[clap(long, default_value = "https://id.gs1.org")]
    stem: String,

    /// Show the extracted AI table.
    #[clap(long)]
    show_extracted: bool,

    /// Skip the requisite-AI validation.
    #[clap(long)]
    no_validate_requisites: bool,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum Form {
    /// Bracketed AI element string.
    AiData,
    /// Unbracketed AI data.
    Data,
    /// GS1 Digital Link URI.
    DlUri,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    let mut eng = Engine::new();
    eng.set_permit_unknown_ais(opts.permit_unknown_ais);
    eng.set_permit_zero_suppressed_gtin_in_dl_uris(
        opts.permit_zero_suppressed_gtin,
    );
    if opts.no_validate_requisites {
        eng.set_validation_enabled(Validation::RequisiteAis, false)
            .map_err(|e| anyhow!("{}", e.message))?;
    }

    let form = opts.form.unwrap_or_else(|| sniff(&opts.input));
    let result = match form {
        Form::AiData => eng.set_ai_data(&opts.input),
        Form::Data => eng.set_data(&opts.input),
        Form::DlUri => eng.set_dl_uri(&opts.input),
    };
    if let Err(e) = result {
        eprintln!("{}", e);
        return Err(anyhow!("failed to process input"));
    }

    println!("DATA: {}", eng.data_str());
    println!("AI:   {}", eng.ai_data_str());
    match eng.dl_uri(Some(&opts.stem)) {
        Ok(uri) => println!("DL:   {}", uri),
        Err(e) => println!("DL:   {} {}", "unavailable:".dimmed(), e.message),
    }

    if opts.show_extracted {
        println!("\nextracted AIs:");
        show_extracted(&eng);
    }

    Ok(())
}

fn sniff(input: &str) -> Form {
    if input.starts_with('(') {
        Form::AiData
    } else if input.starts_with("http://")
        || input.starts_with("https://")
        || input.starts_with("HTTP://")
        || input.starts_with("HTTPS://")
    {
        Form::DlUri
    } else {
        Form::Data
    }
}

fn show_extracted(eng: &Engine) {
    let data = eng.data_str();
    for x in eng.extracted() {
        match x {
            ExtractedAi::Ai(el) => {
                let place = match el.dl_path_order() {
                    DlPathOrder::Path(i) => format!("path[{}]", i),
                    DlPathOrder::Attribute => "attribute".to_string(),
                };
                println!(
                    "  ({}) {}  [{}]",
                    el.ai(data).bold(),
                    el.value(data),
                    place
                );
            }
            ExtractedAi::DlIgnored(s) => {
                println!("  {}  [ignored]", s.dimmed());
            }
        }
    }
}
