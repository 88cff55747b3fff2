use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod logging;

use logging::LoggingMode;
use neo_api::{ClientConfig, Credential, NeoClient, SessionMode, SubscriptionRequestSpec, SubscriptionTarget};
use neo_stream::{run_session, JsonLinesSink, LoggingSink, PollingConfig, PollingSummary};
use neo_transport::{HttpTransport, TransportConfig};

/// Where collected events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Log each event through tracing
    Log,
    /// Write each event to stdout as a JSON line
    Json,
}

/// neo bit-rate collector
///
/// Logs in to a neo transcoder, subscribes to bit-rate events at one output
/// mux (or line, or program), polls for events until the duration elapses or
/// Ctrl-C is pressed, then unsubscribes and logs out.
#[derive(Parser, Debug)]
#[command(name = "neo-collector")]
#[command(about = "Collect bit-rate events from a neo transcoder")]
#[command(version)]
pub struct Args {
    /// Controller request URL, e.g. https://10.0.0.5/neoreq/
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Login user name
    #[arg(short, long, default_value = "Admin")]
    pub username: String,

    /// Login password
    #[arg(long, default_value = "")]
    pub password: String,

    /// Farmer (chassis) id
    #[arg(long)]
    pub farmer: Option<String>,

    /// Board id
    #[arg(long)]
    pub board: Option<String>,

    /// GigE line id
    #[arg(long)]
    pub line: Option<String>,

    /// GigE output mux id; omit to subscribe at line level
    #[arg(long)]
    pub mux: Option<String>,

    /// Output program id; requires --mux
    #[arg(long)]
    pub program: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short = 'i', long, default_value = "500")]
    pub interval_ms: u64,

    /// How long to collect, in seconds
    #[arg(short = 'd', long, default_value = "60")]
    pub duration_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "5")]
    pub request_timeout_secs: u64,

    /// Idle connections kept per host
    #[arg(long, default_value = "20")]
    pub max_idle_connections: usize,

    /// Skip TLS certificate validation
    #[arg(long)]
    pub insecure: bool,

    /// Do not request average bit rates
    #[arg(long)]
    pub no_avg_bitrate: bool,

    /// Do not request instantaneous bit rates
    #[arg(long)]
    pub no_inst_bitrate: bool,

    /// Do not request per-stream breakdowns
    #[arg(long)]
    pub no_streams: bool,

    /// Do not request standard deviation
    #[arg(long)]
    pub no_std_dev: bool,

    /// Envelope origin attribute
    #[arg(long, default_value = "transcoder-collector")]
    pub origin: String,

    /// Event output
    #[arg(short, long, value_enum, default_value = "log")]
    pub output: OutputFormat,

    /// Logging mode
    #[arg(long, value_enum, default_value = "development")]
    pub log_mode: LoggingMode,
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        match self.endpoint.as_deref() {
            None | Some("") => {
                return Err(anyhow::anyhow!(
                    "An endpoint is required (--endpoint or NEO_ENDPOINT)"
                ))
            }
            Some(_) => {}
        }

        for (name, value) in [("farmer", &self.farmer), ("board", &self.board), ("line", &self.line)] {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(anyhow::anyhow!(
                    "--{} is required to build the subscription path",
                    name
                ));
            }
        }

        if self.program.is_some() && self.mux.is_none() {
            return Err(anyhow::anyhow!("--program requires --mux"));
        }

        if self.interval_ms == 0 {
            return Err(anyhow::anyhow!("Poll interval must be positive"));
        }

        if self.duration_secs == 0 {
            return Err(anyhow::anyhow!("Duration must be positive"));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be positive"));
        }

        Ok(())
    }

    /// Apply `NEO_*` environment overrides
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = var("NEO_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }

        if let Some(username) = var("NEO_USERNAME") {
            self.username = username;
        }

        if let Some(password) = var("NEO_PASSWORD") {
            self.password = password;
        }

        if let Some(farmer) = var("NEO_FARMER") {
            self.farmer = Some(farmer);
        }

        if let Some(board) = var("NEO_BOARD") {
            self.board = Some(board);
        }

        if let Some(line) = var("NEO_LINE") {
            self.line = Some(line);
        }

        if let Some(mux) = var("NEO_MUX") {
            self.mux = Some(mux);
        }

        if let Some(program) = var("NEO_PROGRAM") {
            self.program = Some(program);
        }

        if let Some(interval) = var("NEO_INTERVAL_MS") {
            self.interval_ms = interval
                .parse()
                .context("Invalid NEO_INTERVAL_MS environment variable")?;
        }

        if let Some(duration) = var("NEO_DURATION_SECS") {
            self.duration_secs = duration
                .parse()
                .context("Invalid NEO_DURATION_SECS environment variable")?;
        }

        if var("NEO_INSECURE").is_some() {
            self.insecure = true;
        }

        if let Some(output) = var("NEO_OUTPUT") {
            self.output = OutputFormat::from_str(&output, true)
                .map_err(anyhow::Error::msg)
                .context("Invalid NEO_OUTPUT environment variable")?;
        }

        if let Some(mode) = var("NEO_LOG_MODE") {
            self.log_mode = LoggingMode::from_str(&mode, true)
                .map_err(anyhow::Error::msg)
                .context("Invalid NEO_LOG_MODE environment variable")?;
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments and environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    pub client: ClientConfig,
    pub credential: Credential,
    pub subscription: SubscriptionRequestSpec,
    pub polling: PollingConfig,
    pub output: OutputFormat,
    pub log_mode: LoggingMode,
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        args.validate()?;

        let endpoint = args.endpoint.unwrap_or_default();
        let transport = TransportConfig::new(endpoint)
            .with_request_timeout(Duration::from_secs(args.request_timeout_secs))
            .with_max_idle_per_host(args.max_idle_connections)
            .with_accept_invalid_certs(args.insecure);

        let target = match args.mux {
            Some(mux) => SubscriptionTarget::mux(
                args.farmer.unwrap_or_default(),
                args.board.unwrap_or_default(),
                args.line.unwrap_or_default(),
                mux,
            ),
            None => SubscriptionTarget::line(
                args.farmer.unwrap_or_default(),
                args.board.unwrap_or_default(),
                args.line.unwrap_or_default(),
            ),
        };
        let target = match args.program {
            Some(program) => target.with_program(program),
            None => target,
        };

        let subscription = SubscriptionRequestSpec::new(target)
            .with_avg_bitrate(!args.no_avg_bitrate)
            .with_inst_bitrate(!args.no_inst_bitrate)
            .with_streams(!args.no_streams)
            .with_std_dev(!args.no_std_dev);

        Ok(Self {
            transport,
            client: ClientConfig::default().with_origin(args.origin),
            credential: Credential::new(args.username, args.password, SessionMode::Pull),
            subscription,
            polling: PollingConfig::new(
                Duration::from_millis(args.interval_ms),
                Duration::from_secs(args.duration_secs),
            ),
            output: args.output,
            log_mode: args.log_mode,
        })
    }
}

impl Config {
    /// Create configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();
        args.apply_env(|key| std::env::var(key).ok())?;
        Config::try_from(args)
    }

    /// Log a configuration summary
    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  Endpoint: {}", self.transport.endpoint);
        info!("  User: {}", self.credential.username);
        info!("  Target: {}", self.subscription.target);
        info!("  Poll interval: {}ms", self.polling.interval.as_millis());
        info!("  Duration: {}s", self.polling.max_duration.as_secs());
        info!("  Request timeout: {}s", self.transport.request_timeout.as_secs());
        info!("  Verify certificates: {}", !self.transport.accept_invalid_certs);
        info!("  Output: {:?}", self.output);
    }
}

/// Run one session, writing events to the configured output
async fn collect(config: Config, cancel: CancellationToken) -> Result<PollingSummary> {
    let transport = HttpTransport::new(config.transport.clone()).context("Failed to build HTTP transport")?;
    let mut client = NeoClient::with_config(transport, config.client.clone());

    let summary = match config.output {
        OutputFormat::Log => {
            run_session(
                &mut client,
                &config.credential,
                config.subscription.clone(),
                &config.polling,
                &mut LoggingSink,
                &cancel,
            )
            .await
        }
        OutputFormat::Json => {
            run_session(
                &mut client,
                &config.credential,
                config.subscription.clone(),
                &config.polling,
                &mut JsonLinesSink::stdout(),
                &cancel,
            )
            .await
        }
    }
    .context("Collection session failed")?;

    Ok(summary)
}

/// Cancel `cancel` on the first interrupt
///
/// Returns true once a second interrupt arrives, false if the signal source
/// fails first.
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupted().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        return false;
    }
    info!("Received Ctrl-C, stopping after the current poll; press again to exit");
    cancel.cancel();

    interrupted().await.is_ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to parse configuration")?;

    logging::init_logging(config.log_mode).context("Failed to initialize logging")?;
    config.print_summary();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, shutdown).await {
            warn!("Received a second Ctrl-C, exiting without finishing teardown");
            std::process::exit(130);
        }
    });

    match collect(config, cancel).await {
        Ok(summary) => {
            info!(
                "Collected {} events in {} polls ({} failed), stopped: {}",
                summary.events_delivered, summary.ticks, summary.failed_polls, summary.stop_reason
            );
        }
        Err(e) => {
            error!("Collector failed: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
