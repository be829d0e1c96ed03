use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::Confirm;
use rsr_core::{
    find, launch, ChildSlot, DisplayOptions, FilterOptions, KindFilter, MatchedEntry, Mover,
    OverwritePrompt, Presenter, ReplaceOptions, ReplaceOutcome, ReplaceStats, RsrError,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rsr", version)]
#[command(about = "Search a directory tree with a regular expression and rename what matches")]
#[command(after_help = "examples:
    rsr search ./MyFolder \"DSC([0-9]{4})\\.(jpg|png)\"
    rsr replace ./music \"([0-9a-f]+)\\s-\\s(.*)\\.mp3\" \"$2 - $1.mp3\" -cr
    rsr search /usr/bin calc -x")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List entries whose name matches the pattern
    #[command(visible_alias = "s")]
    Search(SearchArgs),
    /// Rename entries whose name matches the pattern
    #[command(visible_alias = "r")]
    Replace(ReplaceArgs),
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Commands::Search(args) => &args.common,
            Commands::Replace(args) => &args.common,
        }
    }
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Match case-sensitively
    #[arg(short = 'c', long)]
    case_sensitive: bool,
    /// Only print result lines
    #[arg(short, long)]
    quiet: bool,
    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,
    /// Display short (8.3) path names where the platform has them
    #[arg(short, long)]
    short_names: bool,
    /// Prefix each line with timestamps and size
    #[arg(short = 'l', long)]
    detailed: bool,
    /// Only directories
    #[arg(short = 'd', long, conflicts_with = "only_files")]
    only_dirs: bool,
    /// Only files
    #[arg(short = 'i', long)]
    only_files: bool,
    /// Match against the absolute path instead of the name
    #[arg(short, long)]
    full_path: bool,
    /// Stop after N results
    #[arg(short = 'm', long, value_name = "N")]
    max_results: Option<usize>,
    /// Same as --max-results 1
    #[arg(short = '1', long, conflicts_with = "max_results")]
    first: bool,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    fn limit(&self) -> Option<usize> {
        if self.first {
            Some(1)
        } else {
            self.max_results
        }
    }

    fn filter_options(&self) -> FilterOptions {
        let kind = if self.only_dirs {
            KindFilter::DirsOnly
        } else if self.only_files {
            KindFilter::FilesOnly
        } else {
            KindFilter::All
        };
        FilterOptions {
            case_sensitive: self.case_sensitive,
            full_path: self.full_path,
            recursive: self.recursive,
            invert: false,
            kind,
            limit: self.limit(),
        }
    }

    fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            detailed: self.detailed,
            short_names: self.short_names,
        }
    }
}

#[derive(Debug, Args)]
struct SearchArgs {
    directory: PathBuf,
    pattern: String,
    /// List entries that do NOT match
    #[arg(short = 'n', long)]
    invert: bool,
    /// Open the single result with its default application (implies --first)
    #[arg(short = 'x', long)]
    execute: bool,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct ReplaceArgs {
    directory: PathBuf,
    pattern: String,
    /// New name; `$1`, `$name`, `$size`, `$hsize`, `$created`, `$modified`,
    /// `$accessed` (and `$u...` for UTC) are substituted, `$$` is a literal `$`
    replacement: String,
    /// Show what would be renamed without touching anything
    #[arg(long)]
    mock: bool,
    /// Replace only the matched part of the name
    #[arg(long)]
    match_only: bool,
    /// Overwrite existing destinations without asking
    #[arg(short = 'y', long)]
    force: bool,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.command.common().verbose);

    let launched = ChildSlot::new();
    let handler_slot = launched.clone();
    if let Err(err) = ctrlc::set_handler(move || cancel(&handler_slot)) {
        warn!("could not install the interrupt handler: {err}");
    }

    let result = match cli.command {
        Commands::Search(args) => cmd_search(args, &launched),
        Commands::Replace(args) => cmd_replace(args, &launched),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", style(format!("{err:#}")).red());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Interrupt path: stop the launched handler, reset the terminal, leave.
fn cancel(launched: &ChildSlot) -> ! {
    eprintln!("{}", style("\n[cancelled]").red());
    launched.kill();
    let term = console::Term::stdout();
    let _ = term.show_cursor();
    if console::colors_enabled() {
        let _ = term.write_str("\x1b[0m");
    }
    std::process::exit(130);
}

fn search_filter(args: &SearchArgs) -> Result<FilterOptions, RsrError> {
    let mut filter = args.common.filter_options();
    filter.invert = args.invert;
    if args.execute {
        match filter.limit {
            None | Some(1) => filter.limit = Some(1),
            Some(n) => {
                return Err(RsrError::IncompatibleOptions(format!(
                    "--execute needs exactly one result, but --max-results is {n}"
                )))
            }
        }
    }
    Ok(filter)
}

fn cmd_search(args: SearchArgs, launched: &ChildSlot) -> Result<()> {
    let filter = search_filter(&args)?;
    let single = filter.limit == Some(1);
    let presenter = Presenter::new(args.common.display_options());
    let results = find(&args.directory, &args.pattern, &filter)?;

    let mut count = 0usize;
    let mut first: Option<MatchedEntry> = None;
    let mut collected = Vec::<MatchedEntry>::new();
    for matched in results {
        count += 1;
        if args.execute && first.is_none() {
            first = Some(matched.clone());
        }
        match args.common.output {
            OutputFormat::Json => collected.push(matched),
            OutputFormat::Text => {
                let line = presenter.search_line(&matched.entry);
                let line = if single && !args.common.detailed {
                    format!("\"{line}\"")
                } else {
                    line
                };
                println!("{}", style(line).green());
            }
        }
    }

    match args.common.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&collected)?),
        OutputFormat::Text => {
            if !args.common.quiet && !single {
                println!("{}", style(format!("\n {count} matches")).dim());
            }
        }
    }

    if args.execute {
        if let Some(matched) = first {
            let status = launch(&matched.entry.path, launched)?;
            debug!(%status, "launched process exited");
        }
    }

    Ok(())
}

/// Yes/no on the terminal, default no.
struct ConsolePrompt {
    launched: ChildSlot,
}

impl OverwritePrompt for ConsolePrompt {
    fn confirm_overwrite(&mut self, source: &Path, destination: &Path) -> Result<bool> {
        let answer = Confirm::new()
            .with_prompt(format!(
                "'{}' already exists. Overwrite it with '{}'?",
                destination.display(),
                source.display()
            ))
            .default(false)
            .interact();

        match answer {
            Ok(answer) => Ok(answer),
            Err(dialoguer::Error::IO(err)) if err.kind() == io::ErrorKind::Interrupted => {
                cancel(&self.launched)
            }
            Err(err) => Err(anyhow::Error::from(err).context("Could not ask for confirmation")),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplaceRecord {
    from: PathBuf,
    to: Option<PathBuf>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&ReplaceOutcome> for ReplaceRecord {
    fn from(outcome: &ReplaceOutcome) -> Self {
        let (status, error) = match outcome {
            ReplaceOutcome::Moved { mocked: true, .. } => ("mocked", None),
            ReplaceOutcome::Moved { .. } => ("moved", None),
            ReplaceOutcome::Unchanged { .. } => ("unchanged", None),
            ReplaceOutcome::Skipped { .. } => ("skipped", None),
            ReplaceOutcome::Failed { error, .. } => ("failed", Some(format!("{error:#}"))),
        };
        Self {
            from: outcome.source().to_path_buf(),
            to: outcome.destination().map(Path::to_path_buf),
            status,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplaceReport {
    outcomes: Vec<ReplaceRecord>,
    stats: ReplaceStats,
}

fn cmd_replace(args: ReplaceArgs, launched: &ChildSlot) -> Result<()> {
    let common = &args.common;
    let filter = common.filter_options();
    let presenter = Presenter::new(DisplayOptions {
        detailed: common.detailed && !common.quiet,
        short_names: common.short_names,
    });
    let mover = Mover::new(
        &args.replacement,
        ReplaceOptions {
            mock: args.mock,
            match_only: args.match_only,
            force: args.force,
        },
    );
    let results = find(&args.directory, &args.pattern, &filter)?;

    let mut prompt = ConsolePrompt {
        launched: launched.clone(),
    };
    let mut stats = ReplaceStats::default();
    let mut records = Vec::new();
    for matched in results {
        let outcome = mover.apply(&matched, &mut prompt);
        stats.record(&outcome);
        match common.output {
            OutputFormat::Text => print_outcome(&presenter, &matched, &outcome),
            OutputFormat::Json => records.push(ReplaceRecord::from(&outcome)),
        }
    }

    match common.output {
        OutputFormat::Json => {
            let report = ReplaceReport {
                outcomes: records,
                stats,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            if !common.quiet {
                print_summary(&stats, args.mock);
            }
        }
    }

    Ok(())
}

fn print_outcome(presenter: &Presenter, matched: &MatchedEntry, outcome: &ReplaceOutcome) {
    let entry = &matched.entry;
    match outcome {
        ReplaceOutcome::Moved { to, .. } => {
            println!("{}", style(presenter.replace_line(entry, to)).green());
        }
        ReplaceOutcome::Unchanged { path } => {
            println!(
                "{}",
                style(format!("{} (unchanged)", presenter.replace_line(entry, path))).dim()
            );
        }
        ReplaceOutcome::Skipped { to, .. } => {
            println!(
                "{}",
                style(format!("{} (skipped)", presenter.replace_line(entry, to))).yellow()
            );
        }
        ReplaceOutcome::Failed { to, error, .. } => {
            let line = match to {
                Some(to) => presenter.replace_line(entry, to),
                None => presenter.search_line(entry),
            };
            println!("{}", style(line).red());
            println!("{}", style(format!("    {error:#}")).red());
        }
    }
}

fn print_summary(stats: &ReplaceStats, mock: bool) {
    println!(
        "{}",
        style(format!(
            "\n {} matches ({} replaced, {} skipped, {} unchanged, {} failed)",
            stats.matched, stats.replaced, stats.skipped, stats.unchanged, stats.failed
        ))
        .dim()
    );
    if mock {
        println!(
            "{}",
            style(" mock mode: nothing was renamed. Drop --mock to apply.").yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_takes_short_option_letters() {
        let cli = parse(&["rsr", "s", ".", "photo", "-crfl", "-i"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert!(args.common.case_sensitive);
        assert!(args.common.recursive);
        assert!(args.common.full_path);
        assert!(args.common.detailed);

        let filter = search_filter(&args).expect("valid options");
        assert_eq!(filter.kind, KindFilter::FilesOnly);
        assert_eq!(filter.limit, None);
    }

    #[test]
    fn only_dirs_and_only_files_conflict() {
        assert!(Cli::try_parse_from(["rsr", "search", ".", "x", "-d", "-i"]).is_err());
    }

    #[test]
    fn invert_is_search_only() {
        assert!(Cli::try_parse_from(["rsr", "replace", ".", "x", "y", "-n"]).is_err());
    }

    #[test]
    fn execute_implies_a_single_result() {
        let cli = parse(&["rsr", "search", ".", "calc", "-x"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(search_filter(&args).expect("valid").limit, Some(1));
    }

    #[test]
    fn execute_with_a_larger_cap_is_incompatible() {
        let cli = parse(&["rsr", "search", ".", "calc", "-x", "-m", "3"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        let err = search_filter(&args).expect_err("must be rejected");
        assert!(matches!(err, RsrError::IncompatibleOptions(_)));
    }

    #[test]
    fn replace_parses_flags_and_replacement() {
        let cli = parse(&[
            "rsr",
            "replace",
            "/tmp",
            r"photo(\d{4})",
            "img_$1",
            "--mock",
            "--match-only",
            "-y",
            "-1",
        ]);
        let Commands::Replace(args) = cli.command else {
            panic!("expected replace");
        };
        assert_eq!(args.replacement, "img_$1");
        assert!(args.mock && args.match_only && args.force);
        assert_eq!(args.common.limit(), Some(1));
    }

    #[test]
    fn replace_record_reports_status_and_error() {
        let outcome = ReplaceOutcome::Failed {
            from: PathBuf::from("/a"),
            to: None,
            error: anyhow::anyhow!("boom"),
        };
        let record = ReplaceRecord::from(&outcome);
        assert_eq!(record.status, "failed");
        assert_eq!(record.error.as_deref(), Some("boom"));

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["to"], serde_json::Value::Null);
    }
}
