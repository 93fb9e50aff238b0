use clap::{Parser, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "ldf-client")]
/// Evaluates a SPARQL query against Linked Data Fragments that are loaded from RDF files
pub struct Args {
    /// RDF file to load the data from
    ///
    /// Can be given multiple times. The format is guessed from the file extension.
    #[arg(short, long = "file", value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
    /// The SPARQL query to evaluate
    #[arg(short, long, conflicts_with = "query_file", required_unless_present = "query_file")]
    pub query: Option<String>,
    /// File that contains the SPARQL query to evaluate
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub query_file: Option<PathBuf>,
    /// The format of the results
    ///
    /// It can be an extension like "json" or "nt" or a MIME type like "application/n-triples".
    ///
    /// By default, SELECT and ASK results are written as JSON and CONSTRUCT and DESCRIBE results
    /// as N-Triples.
    #[arg(long)]
    pub format: Option<String>,
    /// A prefix that can be used in the query without declaring it, written as `name=iri`
    #[arg(short, long = "prefix", value_parser = parse_prefix)]
    pub prefixes: Vec<(String, String)>,
    /// Base IRI of the query
    #[arg(long, value_hint = ValueHint::Url)]
    pub base: Option<String>,
    /// How many bindings an ORDER BY key may buffer
    ///
    /// 0 buffers all bindings, which results in a total order.
    #[arg(long, default_value_t = 0)]
    pub window: usize,
}

fn parse_prefix(value: &str) -> Result<(String, String), String> {
    let (name, iri) = value
        .split_once('=')
        .ok_or_else(|| format!("The prefix '{value}' is not of the form name=iri"))?;
    Ok((name.to_owned(), iri.to_owned()))
}
