use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use regex::Regex;

mod diagnostics;
mod dump;
mod graph;
mod model;
mod render;
mod summary;

use dump::RelationKind;
use graph::RelationSet;
use summary::Summary;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "heapgraph")]
#[command(about = "Reconstruct and render the reference graph of a heap dump", long_about = None)]
struct Cli {
    /// Heap dump file (JSON array of object records).
    dump: String,

    /// Write a Graphviz rendering here.
    #[arg(long)]
    dot: Option<String>,

    /// Write a self-contained HTML viewer here.
    #[arg(long)]
    html: Option<String>,

    /// Also follow a frame slot that is skipped by default.
    #[arg(long, value_enum)]
    follow: Vec<Follow>,

    /// Do not add owner -> owned edges.
    #[arg(long)]
    no_owner_edges: bool,

    /// Only list nodes whose type matches this regex.
    #[arg(long)]
    type_filter: Option<String>,

    /// Only list the N largest allocations.
    #[arg(long)]
    top: Option<usize>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Follow {
    Locals,
    Function,
}

impl Cli {
    fn relations(&self) -> RelationSet {
        let mut relations = RelationSet::default();
        for f in &self.follow {
            relations = relations.with(match f {
                Follow::Locals => RelationKind::Locals,
                Follow::Function => RelationKind::Function,
            });
        }
        if self.no_owner_edges {
            relations = relations.without(RelationKind::Owner);
        }
        relations
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let type_filter = cli
        .type_filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --type-filter")?;
    let relations = cli.relations();
    log::info!(
        "following: {}",
        relations
            .iter()
            .map(RelationKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    // 1) Load; only an unreadable dump stops the run.
    let dump = dump::load_dump(&cli.dump)?;

    // 2) Reconstruct.
    let graph = graph::build_graph(&dump, &relations);

    // 3) Triage listings.
    let summary = Summary::filtered(&graph, type_filter.as_ref());
    for line in summary.referrer_lines() {
        println!("{}", line);
    }
    for line in summary.allocation_lines(cli.top) {
        println!("{}", line);
    }
    println!("{}", summary.totals_line());
    for (kind, count) in graph.anomalies().by_kind() {
        println!("{} {}", count, kind.as_str());
    }

    // 4) Render.
    if cli.dot.is_some() || cli.html.is_some() {
        let view = model::build_graph_view(&graph);
        if let Some(out) = &cli.dot {
            std::fs::write(out, render::render_dot(&view)?)
                .with_context(|| diagnostics::error_message(format!("write {}", out)))?;
            println!("Wrote {}", out);
        }
        if let Some(out) = &cli.html {
            std::fs::write(out, render::render_html_viewer(&view)?)
                .with_context(|| diagnostics::error_message(format!("write {}", out)))?;
            println!("Wrote {}", out);
        }
    }

    println!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_relations() {
        let cli = Cli::parse_from(["heapgraph", "dump.json"]);
        assert_eq!(cli.relations(), RelationSet::default());
        assert!(!cli.relations().contains(RelationKind::Locals));
    }

    #[test]
    fn follow_and_owner_flags() {
        let cli = Cli::parse_from([
            "heapgraph",
            "dump.json",
            "--follow",
            "locals",
            "--follow",
            "function",
            "--no-owner-edges",
        ]);
        let relations = cli.relations();
        assert!(relations.contains(RelationKind::Locals));
        assert!(relations.contains(RelationKind::Function));
        assert!(!relations.contains(RelationKind::Owner));
        assert_eq!(
            relations,
            RelationSet::all().without(RelationKind::Owner)
        );
    }

    #[test]
    fn dump_path_is_required() {
        assert!(Cli::try_parse_from(["heapgraph"]).is_err());
    }
}
