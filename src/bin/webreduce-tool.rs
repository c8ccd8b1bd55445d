use std::{collections::BTreeMap, fs, process::exit, sync::Arc};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{to_string, to_string_pretty};
use url::Url;

use webreduce::{
    abstract_server::{make_memory_server, make_remote_server, AbstractServer},
    category_tree::sort::sort_tree_alphanumeric,
    config::BrowserConfig,
    file_format::template::{template_source_paths, ModuleDef, Template},
    instrument::InstrumentRegistry,
    logging::{init_logging, LoggedSpan},
    nav_state::{NavState, SourcePath},
    session::{BrowserSession, PlotOutcome},
};

#[derive(Clone, Debug, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON.
    Pretty,
    /// Un-pretty-printed JSON.
    Concise,
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct ToolOpts {
    /// URL of the reduction server, or the path of a JSON fixture file to
    /// serve canned listings and files from.  Falls back to the config file.
    #[arg(long, env = "WEBREDUCE_SERVER")]
    server: Option<String>,

    /// Instrument id.  Falls back to the config file.
    #[arg(long, env = "WEBREDUCE_INSTRUMENT")]
    instrument: Option<String>,

    /// TOML browser configuration.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, short, value_enum, ignore_case = true, default_value = "pretty")]
    output_format: OutputFormat,

    /// Print the captured log tree after the output.
    #[arg(long)]
    explain: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List, load, categorize and decorate one datasource path.
    Browse(BrowseArgs),
    /// Plot checked entries, given as selection keys.
    Plot(PlotArgs),
    /// Print the navigation string for a set of datasource paths.
    NavState(NavStateArgs),
    /// Group the files a template's modules refer to by source and directory.
    TemplatePaths(TemplatePathsArgs),
}

#[derive(Debug, Args)]
struct BrowseArgs {
    #[arg(long)]
    source: String,

    /// `/`-delimited path within the source.
    #[arg(long, default_value = "")]
    path: String,

    /// Order siblings naturally by id (so `run9` precedes `run10`) instead of
    /// in listing order.
    #[arg(long)]
    sort: bool,
}

#[derive(Debug, Args)]
struct PlotArgs {
    /// A selection key like `["ncnr","path/file.nxz","entry",1447353862]`.
    #[arg(long = "key", required = true)]
    keys: Vec<String>,
}

#[derive(Debug, Args)]
struct NavStateArgs {
    /// Datasource; pair each with a `--path`, newest first.
    #[arg(long = "source")]
    sources: Vec<String>,

    #[arg(long = "path")]
    paths: Vec<String>,
}

#[derive(Debug, Args)]
struct TemplatePathsArgs {
    /// Template JSON file.
    #[arg(long)]
    template: String,

    /// JSON file holding a list of module definitions.
    #[arg(long)]
    module_defs: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let raw_str = fs::read_to_string(path).map_err(|err| format!("{}: {}", path, err))?;
    serde_json::from_str(&raw_str).map_err(|err| format!("{}: {}", path, err))
}

fn print_value<T: Serialize>(value: &T, output_format: &OutputFormat) {
    let rendered = match output_format {
        OutputFormat::Pretty => to_string_pretty(value),
        OutputFormat::Concise => to_string(value),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(err) => eprintln!("Unable to serialize output: {}", err),
    }
}

async fn make_session(opts: &ToolOpts, config: &BrowserConfig) -> Result<BrowserSession, String> {
    let server_str = opts
        .server
        .clone()
        .or_else(|| config.server.clone())
        .ok_or_else(|| "No server specified; use --server or set it in --config".to_string())?;

    let server: Box<dyn AbstractServer + Send + Sync> = match Url::parse(&server_str) {
        Ok(url) => make_remote_server(url),
        Err(_) => make_memory_server(&server_str).await,
    }
    .map_err(|err| format!("{:?}", err))?;

    let instruments = InstrumentRegistry::with_defaults(config.refl_options()?);
    let instrument_id = opts.instrument.as_deref().unwrap_or(&config.instrument);
    BrowserSession::new(Arc::from(server), instruments, instrument_id)
        .map_err(|err| format!("{:?}", err))
}

async fn run(opts: &ToolOpts) -> Result<(), String> {
    let config = match &opts.config {
        Some(path) => BrowserConfig::load(path)?,
        None => BrowserConfig::default(),
    };

    match &opts.cmd {
        Command::Browse(args) => {
            let session = make_session(opts, &config).await?;
            let pathlist = SourcePath::new(&args.source, &args.path).pathlist();
            let mut view = session
                .browse(&args.source, &pathlist)
                .await
                .map_err(|err| format!("{:?}", err))?;
            if args.sort {
                sort_tree_alphanumeric(&mut view.treedata);
            }
            print_value(&view, &opts.output_format);
        }
        Command::Plot(args) => {
            let session = make_session(opts, &config).await?;
            match session
                .handle_checked(&args.keys)
                .await
                .map_err(|err| format!("{:?}", err))?
            {
                PlotOutcome::Rendered(plottable) => print_value(&plottable, &opts.output_format),
                PlotOutcome::NoPlot => println!("No plot."),
                PlotOutcome::Superseded => println!("Superseded."),
            }
        }
        Command::NavState(args) => {
            if args.sources.len() != args.paths.len() {
                return Err(format!(
                    "{} sources but {} paths",
                    args.sources.len(),
                    args.paths.len()
                ));
            }
            let state = NavState {
                instrument: opts
                    .instrument
                    .clone()
                    .unwrap_or_else(|| config.instrument.clone()),
                sources: args
                    .sources
                    .iter()
                    .zip(&args.paths)
                    .map(|(source, path)| SourcePath::new(source, path))
                    .collect(),
            };
            println!("{}", state.to_query_string());
        }
        Command::TemplatePaths(args) => {
            let template: Template = read_json(&args.template)?;
            let defs: Vec<ModuleDef> = read_json(&args.module_defs)?;
            let defs: BTreeMap<String, ModuleDef> =
                defs.into_iter().map(|def| (def.id.clone(), def)).collect();
            print_value(&template_source_paths(&template, &defs), &opts.output_format);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let opts = ToolOpts::parse();

    if opts.explain {
        init_logging();
    }
    let logged_span = if opts.explain {
        Some(LoggedSpan::new_logged_span("webreduce-tool"))
    } else {
        None
    };

    let result = run(&opts).await;

    if let Some(lspan) = logged_span {
        print_value(&lspan.retrieve_serde_json().await, &opts.output_format);
    }

    if let Err(err) = result {
        eprintln!("Error!");
        eprintln!("{}", err);
        exit(1);
    }
}
