use clap::{Args, Parser, Subcommand, ValueEnum};
use diffusers_kit::{
    config::DEFAULT_PORT,
    drivers::{
        diffusers::{DiffusersSmokeTest, Preset},
        openai::OpenAiSmokeTest,
        openai_sdk::{SdkSmokeTest, DEFAULT_API_KEY, DEFAULT_BASE_URL},
        DEFAULT_PROMPT, DEFAULT_REQUEST_SIZE,
    },
    launcher::LaunchConfig,
    logger::{self, LogLevel, LoggerConfig},
    models::{ResponseFormat, DEFAULT_MODEL},
    ClientConfig, KitError, ServerClient,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Smoke tests for a Diffusers image-generation server")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Minimum log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also append log lines to this file.
    #[arg(long, global = true, env = "DIFFUSERS_LOG_FILE")]
    log_file: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Call the native `/api/diffusers/inference` endpoint.
    Flux {
        /// Payload preset matching the pipeline the server runs.
        #[arg(value_enum, default_value = "flux")]
        model: ModelArg,

        /// Server base URL.
        #[arg(long, env = "DIFFUSERS_BASE_URL", default_value = "http://localhost:8500")]
        base_url: String,

        /// Download the returned images into this directory.
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Call the OpenAI-compatible endpoints with plain HTTP.
    Openai(OpenAiArgs),

    /// Call the OpenAI-compatible endpoints through the OpenAI SDK.
    OpenaiSdk(SdkArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Flux,
    Sd3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    #[value(name = "url")]
    Url,
    #[value(name = "b64_json")]
    B64Json,
}

impl From<FormatArg> for ResponseFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Url => ResponseFormat::Url,
            FormatArg::B64Json => ResponseFormat::B64Json,
        }
    }
}

#[derive(Args)]
struct OpenAiArgs {
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    #[arg(long, default_value = DEFAULT_REQUEST_SIZE)]
    size: String,

    #[arg(long, default_value_t = 1)]
    n: u32,

    #[arg(long, value_enum, default_value = "url")]
    response_format: FormatArg,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Start the server in a child process for the test.
    #[arg(long, requires = "server_cmd")]
    start_server: bool,

    /// Command line that starts the server, e.g. "python serverasync.py".
    #[arg(long, env = "DIFFUSERS_SERVER_CMD")]
    server_cmd: Option<String>,

    #[arg(long, default_value = "openai_test.png")]
    output: PathBuf,
}

#[derive(Args)]
struct SdkArgs {
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    #[arg(long, default_value = DEFAULT_REQUEST_SIZE)]
    size: String,

    #[arg(long, default_value_t = 1)]
    n: u32,

    #[arg(long, value_enum, default_value = "url")]
    response_format: FormatArg,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value = "openai_sdk.png")]
    output: PathBuf,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", default_value = DEFAULT_API_KEY)]
    api_key: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let config = log_config(cli.log_level, cli.json_logs, cli.log_file.as_deref());
    if let Err(e) = logger::init_with_config(config) {
        eprintln!("{}", e);
    }
    if env_loaded {
        log::debug!(".env file loaded");
    }

    match run(cli.command).await {
        Ok(()) => {
            log::info!("🎉 Test completed successfully!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            eprintln!("{}", failure_message(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

/// JSON lines when asked for; debug and trace levels get the verbose preset.
fn log_config(level: LogLevel, json: bool, log_file: Option<&str>) -> LoggerConfig {
    let config = if json {
        LoggerConfig::production()
    } else if level <= LogLevel::Debug {
        LoggerConfig::development()
    } else {
        LoggerConfig::new()
    };
    let config = config.with_level(level);
    match log_file {
        Some(path) => config.with_file_output(path),
        None => config,
    }
}

fn failure_message(e: &KitError) -> String {
    match e {
        KitError::Startup(_) => "Server did not become ready in time".to_string(),
        e => format!("💥 Test failed: {}", e),
    }
}

async fn run(command: Command) -> diffusers_kit::Result<()> {
    match command {
        Command::Flux {
            model,
            base_url,
            save_dir,
        } => {
            logger::log_startup_info("flux", &base_url);
            let client = ServerClient::new(ClientConfig::new().with_base_url(base_url))?;
            let preset = match model {
                ModelArg::Flux => Preset::Flux,
                ModelArg::Sd3 => Preset::Sd3,
            };
            let mut test = DiffusersSmokeTest::new(preset);
            if let Some(dir) = save_dir {
                test = test.with_save_dir(dir);
            }
            test.run(&client).await?;
        }
        Command::Openai(args) => {
            let client = ServerClient::new(ClientConfig::new().with_address(&args.host, args.port))?;
            logger::log_startup_info("openai", client.base_url());

            let launch = match (args.start_server, &args.server_cmd) {
                (true, Some(cmd)) => Some(
                    LaunchConfig::from_command_line(cmd)?
                        .with_bind("0.0.0.0", args.port)
                        .with_service_url(client.base_url()),
                ),
                _ => None,
            };
            let test = OpenAiSmokeTest {
                prompt: args.prompt,
                size: args.size,
                n: args.n,
                response_format: args.response_format.into(),
                output: args.output,
                launch,
            };
            test.run(&client).await?;
        }
        Command::OpenaiSdk(args) => {
            logger::log_startup_info("openai-sdk", &args.base_url);
            let test = SdkSmokeTest {
                prompt: args.prompt,
                size: args.size,
                n: args.n,
                response_format: args.response_format.into(),
                model: args.model,
                output: args.output,
                base_url: args.base_url,
                api_key: args.api_key,
            };
            test.run().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = log_config(LogLevel::Debug, false, None);
        assert!(config.show_file_location);
        assert_eq!(config.min_level, LogLevel::Debug);

        let config = log_config(LogLevel::Info, false, Some("run.log"));
        assert!(!config.show_file_location);
        assert_eq!(config.log_file_path.as_deref(), Some("run.log"));

        let config = log_config(LogLevel::Trace, true, None);
        assert!(config.output_json);
        assert_eq!(config.min_level, LogLevel::Trace);
    }

    #[test]
    fn test_failure_message_names_spawn_errors() {
        let startup = KitError::Startup("no healthy status after 50 attempts".into());
        assert_eq!(failure_message(&startup), "Server did not become ready in time");

        let spawn = KitError::Spawn("failed to spawn python3: No such file or directory".into());
        let message = failure_message(&spawn);
        assert!(message.contains("failed to spawn python3"));
        assert!(!message.contains("ready in time"));
    }

    #[test]
    fn test_cli_parses_sdk_subcommand() {
        let cli = Cli::try_parse_from([
            "diffusers-kit",
            "openai-sdk",
            "--size",
            "320x200",
            "--response-format",
            "b64_json",
        ])
        .unwrap();
        let Command::OpenaiSdk(args) = cli.command else {
            panic!("expected the openai-sdk subcommand");
        };
        assert_eq!(args.size, "320x200");
        assert_eq!(args.response_format, FormatArg::B64Json);
    }
}
