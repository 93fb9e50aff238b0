use crate::cli::Args;
use anyhow::{bail, Context};
use clap::Parser;
use ldf_execution::results::QueryResults;
use ldf_execution::source::InMemoryPatternMatcher;
use ldf_execution::sparql::{QueryCompiler, QueryOptions, SortWindow};
use ldf_model::{Graph, TripleRef};
use oxrdfio::{RdfFormat, RdfParser};
use sparesults::QueryResultsFormat;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, stdout, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let query = match (args.query, args.query_file) {
        (Some(query), _) => query,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read the query from {}", path.display()))?,
        (None, None) => bail!("Either --query or --query-file must be set"),
    };

    let graph = load_files(&args.files)?;
    info!(triples = graph.len(), "Loaded the data");
    let compiler = QueryCompiler::new(Arc::new(InMemoryPatternMatcher::new(&graph)));
    let options = QueryOptions {
        prefixes: args.prefixes.into_iter().collect(),
        base_iri: args.base,
        sort_window: SortWindow::from(args.window),
    };
    let results = compiler.compile(query, &options)?;

    let writer = BufWriter::new(stdout().lock());
    let mut writer = if matches!(results, QueryResults::Graph(_)) {
        let format = rdf_format_from_name(args.format.as_deref().unwrap_or("nt"))?;
        results.write_graph(writer, format).await?
    } else {
        let format = results_format_from_name(args.format.as_deref().unwrap_or("json"))?;
        results.write(writer, format).await?
    };
    writer.flush()?;
    Ok(())
}

/// Loads all files into one graph. Files that cannot be parsed are skipped.
fn load_files(files: &[PathBuf]) -> anyhow::Result<Graph> {
    let mut graph = Graph::new();
    for file in files {
        let format = rdf_format_from_path(file)?;
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
        );
        match load_file(format, reader) {
            Ok(triples) => {
                for triple in &triples {
                    graph.insert(triple);
                }
            }
            Err(error) => warn!(file = %file.display(), %error, "Skipping a file that cannot be parsed"),
        }
    }
    Ok(graph)
}

fn load_file(format: RdfFormat, reader: impl io::Read) -> anyhow::Result<Graph> {
    let mut graph = Graph::new();
    // Blank nodes of different files must not be merged.
    for quad in RdfParser::from_format(format)
        .rename_blank_nodes()
        .for_reader(reader)
    {
        let quad = quad?;
        graph.insert(TripleRef::new(&quad.subject, &quad.predicate, &quad.object));
    }
    Ok(graph)
}

fn format_from_path<T>(
    path: &Path,
    from_extension: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        from_extension(ext).map_err(|e| {
            e.context(format!(
                "Not able to guess the file format from file name extension '{ext}'"
            ))
        })
    } else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    }
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    format_from_path(path, |ext| {
        RdfFormat::from_extension(ext)
            .with_context(|| format!("The file extension '{ext}' is unknown"))
    })
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    if let Some(t) = RdfFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = RdfFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The graph format '{name}' is unknown")
}

fn results_format_from_name(name: &str) -> anyhow::Result<QueryResultsFormat> {
    if let Some(t) = QueryResultsFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = QueryResultsFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The results format '{name}' is unknown")
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use assert_fs::NamedTempFile;
    use predicates::prelude::*;

    const DATA: &str = "@prefix ex: <http://example.com/> .\nex:alice ex:knows ex:bob .\nex:bob ex:name \"Bob\" .\n";

    fn cli_command() -> Command {
        let mut command = Command::new(env!("CARGO"));
        command.arg("run").arg("--bin").arg("ldf-client");
        command.arg("--");
        command
    }

    fn data_file() -> Result<NamedTempFile> {
        let file = NamedTempFile::new("data.ttl")?;
        file.write_str(DATA)?;
        Ok(file)
    }

    #[test]
    fn cli_help() {
        cli_command()
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("Usage"));
    }

    #[test]
    fn cli_select() -> Result<()> {
        let file = data_file()?;
        cli_command()
            .arg("--file")
            .arg(file.path())
            .arg("--query")
            .arg("SELECT ?name WHERE { <http://example.com/bob> <http://example.com/name> ?name }")
            .arg("--format")
            .arg("tsv")
            .assert()
            .success()
            .stdout("?name\n\"Bob\"\n");
        Ok(())
    }

    #[test]
    fn cli_select_with_prefix_from_file() -> Result<()> {
        let file = data_file()?;
        let query_file = NamedTempFile::new("query.rq")?;
        query_file.write_str("SELECT ?x WHERE { ?x ex:knows ex:bob }")?;
        cli_command()
            .arg("--file")
            .arg(file.path())
            .arg("--query-file")
            .arg(query_file.path())
            .arg("--prefix")
            .arg("ex=http://example.com/")
            .assert()
            .success()
            .stdout(predicate::str::contains("http://example.com/alice"));
        Ok(())
    }

    #[test]
    fn cli_construct() -> Result<()> {
        let file = data_file()?;
        cli_command()
            .arg("--file")
            .arg(file.path())
            .arg("--query")
            .arg("CONSTRUCT { ?o <http://example.com/knownBy> ?s } WHERE { ?s <http://example.com/knows> ?o }")
            .assert()
            .success()
            .stdout("<http://example.com/bob> <http://example.com/knownBy> <http://example.com/alice> .\n");
        Ok(())
    }

    #[test]
    fn cli_ask() -> Result<()> {
        let file = data_file()?;
        cli_command()
            .arg("--file")
            .arg(file.path())
            .arg("--query")
            .arg("ASK { ?s <http://example.com/knows> ?o }")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"boolean\":true"));
        Ok(())
    }

    #[test]
    fn cli_skips_invalid_file() -> Result<()> {
        let file = data_file()?;
        let broken = NamedTempFile::new("broken.ttl")?;
        broken.write_str("<http://example.com/s> <http://example.com/p> .")?;
        cli_command()
            .arg("--file")
            .arg(broken.path())
            .arg("--file")
            .arg(file.path())
            .arg("--query")
            .arg("SELECT ?name WHERE { ?s <http://example.com/name> ?name }")
            .arg("--format")
            .arg("csv")
            .assert()
            .success()
            .stdout("name\r\nBob\r\n")
            .stderr(predicate::str::contains("broken.ttl"));
        Ok(())
    }

    #[test]
    fn cli_invalid_query() {
        cli_command()
            .arg("--query")
            .arg("SELECT WHERE")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Syntax error"));
    }

    #[test]
    fn clap_debug() {
        use clap::CommandFactory;

        Args::command().debug_assert()
    }
}
