//! OCTAVE Processing API
//!
//! Pure functions for processing OCTAVE content through the pipeline,
//! stopping at any phase. This module contains no I/O, CLI handling, or
//! process exits; all functions take structured input and return
//! structured output for easy testing. Transports and tools sit on top.

use std::error::Error;
use std::fmt;

use crate::diagnostics;
use crate::emitter;
use crate::normalizer;
use crate::parser;
use crate::pipeline::{self, PipelineOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    // Phase 1: lexer output
    TokenStream,

    // Phase 2+3: parsed and normalized tree
    AstJson,

    // Phase 5: emission
    Canonical,
    Json,
    Yaml,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token-stream" => Ok(OutputFormat::TokenStream),
            "ast-json" => Ok(OutputFormat::AstJson),
            "canonical" => Ok(OutputFormat::Canonical),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "markdown" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessArgs {
    pub content: String,
    pub format: OutputFormat,
}

#[derive(Debug)]
pub enum ProcessError {
    SerializationError(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for ProcessError {}

/// Main processing function - pure, no I/O or side effects. Every output
/// carries the diagnostics alongside the payload, keeping the audit
/// contract visible at every phase.
pub fn process(args: ProcessArgs) -> Result<String, ProcessError> {
    match args.format {
        OutputFormat::TokenStream => process_token_stream(&args.content),
        OutputFormat::AstJson => process_ast_json(&args.content),
        OutputFormat::Canonical => {
            let outcome = pipeline::run(&args.content, PipelineOptions::default());
            Ok(outcome.canonical)
        }
        OutputFormat::Json => project(&args.content, emitter::json::project),
        OutputFormat::Yaml => project(&args.content, emitter::yaml::project),
        OutputFormat::Markdown => project(&args.content, emitter::markdown::project),
    }
}

fn process_token_stream(content: &str) -> Result<String, ProcessError> {
    let lex = crate::lexer::tokenize(content);

    let result = serde_json::json!({
        "tokens": lex.tokens,
        "diagnostics": diagnostics::to_json(&lex.diagnostics),
    });

    serde_json::to_string_pretty(&result)
        .map_err(|e| ProcessError::SerializationError(e.to_string()))
}

fn process_ast_json(content: &str) -> Result<String, ProcessError> {
    let parsed = parser::parse(content);
    let normalized = normalizer::normalize(parsed.document);
    let mut all = parsed.diagnostics;
    all.extend(normalized.diagnostics);

    let result = serde_json::json!({
        "document": normalized.document,
        "diagnostics": diagnostics::to_json(&all),
    });

    serde_json::to_string_pretty(&result)
        .map_err(|e| ProcessError::SerializationError(e.to_string()))
}

fn project(
    content: &str,
    projector: fn(&crate::ast::Document) -> emitter::Projection,
) -> Result<String, ProcessError> {
    let outcome = pipeline::run(content, PipelineOptions::default());
    let projection = projector(&outcome.document);

    let result = serde_json::json!({
        "output": projection.output,
        "lossy": projection.lossy,
        "fields_omitted": projection.fields_omitted,
    });

    serde_json::to_string_pretty(&result)
        .map_err(|e| ProcessError::SerializationError(e.to_string()))
}
