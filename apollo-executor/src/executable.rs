//! Main entry point for CLI command to execute a request.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::Context;
use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;
use crate::configuration::validate_configuration;
use crate::demo;
use crate::execution::Executor;
use crate::graphql::Request;
use crate::spec::Schema;

/// Options for the executor
#[derive(Parser, Debug)]
#[command(
    name = "executor",
    about = "Executes a GraphQL selection tree against the demonstration schema",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "APOLLO_EXECUTOR_LOG"
    )]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, env = "APOLLO_EXECUTOR_JSON_LOGS")]
    json_logs: bool,

    /// Configuration file location.
    #[arg(short, long = "config", env = "APOLLO_EXECUTOR_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// JSON request file location, `-` to read from stdin.
    #[arg(short, long = "request")]
    request_path: Option<PathBuf>,

    /// Prints the schema requests are executed against.
    #[arg(long)]
    print_schema: bool,

    /// Prints the configuration schema.
    #[arg(long)]
    config_schema: bool,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

/// This is the main executor entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("APOLLO_EXECUTOR_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(Executable::builder().start())
}

/// Entry point into creating an executor executable.
pub struct Executable {}

#[buildstructor::buildstructor]
impl Executable {
    /// Build an executable that will parse commandline options and set up logging.
    /// You may optionally supply a `schema` to run requests against instead of the
    /// demonstration one.
    ///
    /// Note that if you do not specify a runtime you must be in the context of an existing tokio runtime.
    #[builder(entry = "builder", exit = "start", visibility = "pub")]
    async fn start(schema: Option<Schema>) -> Result<()> {
        let opt = Opt::parse();

        if opt.version {
            println!("{}", std::env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if opt.config_schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        let schema = schema_or_demo(schema)?;
        if opt.print_schema {
            print!("{schema}");
            return Ok(());
        }

        let filter =
            EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?;
        let builder = tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        if opt.json_logs {
            builder.json().init();
        } else {
            builder.init();
        }

        let configuration = match &opt.config_path {
            Some(path) => validate_configuration(&read_input(path)?)?,
            None => Configuration::default(),
        };

        let Some(request_path) = &opt.request_path else {
            anyhow::bail!(
                r#"
The executor requires a request to be set using '--request':

    $ ./executor --request request.json

or, to read it from the standard input:

    $ echo '{{"selectionSet": [{{"field": {{"name": "hello"}}}}]}}' | ./executor --request -
"#
            );
        };
        let request = parse_request(&read_input(request_path)?)?;

        tracing::info!(execution = %configuration.execution(), "executing request");

        let executor = Executor::builder()
            .schema(Arc::new(schema))
            .configuration(Arc::new(configuration))
            .build();
        let response = executor.execute(&request, &Context::new()).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}

/// The schema requests run against, the demonstration one unless the embedder gave its own.
fn schema_or_demo(schema: Option<Schema>) -> Result<Schema> {
    match schema {
        Some(schema) => Ok(schema),
        None => demo::schema().context("could not build the demonstration schema"),
    }
}

/// Reads a file, or the standard input when `path` is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("could not read the standard input")?;
        return Ok(input);
    }
    std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

fn parse_request(raw: &str) -> Result<Request> {
    serde_json::from_str(raw).context("could not parse request")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;

    use super::*;
    use crate::spec::Field;
    use crate::spec::OperationKind;

    #[test]
    fn cli_definition() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parse_options() {
        let opt = Opt::try_parse_from([
            "executor",
            "--request",
            "-",
            "--config",
            "executor.yaml",
            "--log",
            "debug",
        ])
        .unwrap();
        assert_eq!(opt.request_path, Some(PathBuf::from("-")));
        assert_eq!(opt.config_path, Some(PathBuf::from("executor.yaml")));
        assert_eq!(opt.log_level, "debug");
        assert!(!opt.print_schema);
    }

    #[test]
    fn read_request_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"operation": "mutation", "selectionSet": [{{"field": {{"name": "createMessage"}}}}]}}"#
        )
        .unwrap();

        let request = parse_request(&read_input(file.path()).unwrap()).unwrap();
        assert_eq!(
            request,
            Request::builder()
                .operation(OperationKind::Mutation)
                .selection(Field::new("createMessage"))
                .build()
        );
    }

    #[test]
    fn embedded_schema_replaces_the_demo() {
        let custom = Schema::parse("type Query { ping: String }", Default::default()).unwrap();
        let printed = schema_or_demo(Some(custom)).unwrap().to_string();
        assert_eq!(printed, "type Query {\n  ping: String\n}\n");

        let demo = schema_or_demo(None).unwrap().to_string();
        assert!(demo.contains("type RandomDie {"), "{demo}");
        assert!(demo.contains("type Article implements Content {"), "{demo}");
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let error = read_input(&path).unwrap_err();
        assert!(error.to_string().starts_with("could not read"));
        assert!(parse_request("{").is_err());
    }
}
