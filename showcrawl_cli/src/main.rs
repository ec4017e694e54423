use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use error::AppError;
use log::LevelFilter;
use showcrawl::{Browser, Crawler, FromHTML, NoProgress, ProjectRecord, Progress};
use webdriver::WebDriverBrowser;

mod error;
mod progress;
mod sessions;
mod storage;
mod webdriver;

#[derive(Subcommand)]
pub enum Command {
    /// Discover project URLs and scrape every project page
    Crawl(CrawlArgs),

    /// Only run the listing scroll and print the discovered URLs
    Discover(TuningArgs),

    /// Run the extraction heuristics on a saved project page
    Extract {
        /// URL the page was saved from
        #[arg(long)]
        url: String,

        /// Path to the saved HTML
        #[arg(long)]
        html: PathBuf,
    },
}

#[derive(Args)]
pub struct CrawlArgs {
    #[command(flatten)]
    tuning: TuningArgs,

    /// CSV path for project data
    #[arg(long, default_value = "projects_data.csv")]
    data_path: PathBuf,

    /// CSV path for the embeddings placeholder
    #[arg(long, default_value = "embeddings.csv")]
    embeddings_path: PathBuf,

    /// Path to record failed URLs
    #[arg(long, default_value = "failed_projects.txt")]
    failures_path: PathBuf,
}

#[derive(Args)]
pub struct TuningArgs {
    /// Number of projects to scrape
    #[arg(long, default_value_t = 1000)]
    limit: usize,

    /// Run the browser in headless mode
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    headless: bool,

    /// Number of concurrent project page fetches
    #[arg(long, default_value_t = 6)]
    concurrency: usize,

    /// Minimum delay (seconds) between actions; needs --rate-max
    #[arg(long, requires = "rate_max")]
    rate_min: Option<f64>,

    /// Maximum delay (seconds) between actions; needs --rate-min
    #[arg(long, requires = "rate_min")]
    rate_max: Option<f64>,

    /// Base pause between scroll attempts (seconds)
    #[arg(long)]
    scroll_pause: Option<f64>,

    /// Timeout to wait for new cards after each scroll (seconds)
    #[arg(long)]
    scroll_wait_timeout: Option<f64>,

    /// Window height multiplier for each scroll step
    #[arg(long)]
    scroll_step_multiplier: Option<f64>,

    /// Extra attempts per project page after the first one fails
    #[arg(long)]
    max_retries: Option<u32>,

    /// Backoff unit (seconds); retry n waits n times this
    #[arg(long)]
    retry_backoff: Option<f64>,

    /// Page load budget (seconds)
    #[arg(long)]
    request_timeout: Option<f64>,

    /// Save a screenshot of every failed attempt into this directory
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Site root the listing path and relative links are resolved against
    #[arg(long)]
    base_url: Option<String>,

    /// WebDriver server to open browser sessions on
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,
}

impl TuningArgs {
    fn crawler(&self, progress: Arc<dyn Progress>) -> Result<Crawler, AppError> {
        let mut builder = Crawler::builder()
            .target_projects(self.limit)
            .headless(self.headless)
            .concurrency(self.concurrency)
            .screenshot_dir(self.screenshot_dir.clone())
            .progress(progress);

        if let (Some(min), Some(max)) = (self.rate_min, self.rate_max) {
            builder = builder.rate_delay(seconds(min), seconds(max));
        }
        if let Some(pause) = self.scroll_pause {
            builder = builder.scroll_pause(seconds(pause));
        }
        if let Some(timeout) = self.scroll_wait_timeout {
            builder = builder.scroll_wait_timeout(seconds(timeout));
        }
        if let Some(multiplier) = self.scroll_step_multiplier {
            builder = builder.scroll_step_multiplier(multiplier);
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(backoff) = self.retry_backoff {
            builder = builder.retry_backoff(seconds(backoff));
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.request_timeout(seconds(timeout));
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url.clone());
        }

        Ok(builder.build()?)
    }
}

#[derive(Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Also write logs to this file, in addition to stderr
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = setup_logging(cli.log_path.as_deref(), cli.verbose) {
        eprintln!("Cannot set up logging: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Crawl(args) => crawl(args).await,
        Command::Discover(args) => discover(args).await,
        Command::Extract { url, html } => extract(&url, &html),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Interrupted) => {
            eprintln!("Interrupted by user.");
            ExitCode::from(130)
        }
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(log_path: Option<&Path>, verbose: bool) -> Result<(), AppError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = log_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee(io::stderr(), file))));
    }

    builder.init();
    Ok(())
}

/// Writes everything to both sinks.
struct Tee<A, B>(A, B);

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_all(buf)?;
        self.1.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.1.flush()
    }
}

async fn crawl(args: CrawlArgs) -> Result<(), AppError> {
    let crawler = args.tuning.crawler(Arc::new(progress::BarProgress::new()))?;
    log::info!("Scraper started with configuration: {:?}", crawler.config());

    let browser = WebDriverBrowser::new(&args.tuning.webdriver_url, crawler.config().headless())?;
    let outcome = tokio::select! {
        harvest = crawler.crawl::<_, ProjectRecord>(&browser) => harvest.map_err(AppError::from),
        _ = tokio::signal::ctrl_c() => Err(AppError::Interrupted),
    };
    if let Err(err) = browser.close().await {
        log::warn!("Failed to close the browser cleanly: {}", err);
    }

    let harvest = outcome?;
    if harvest.is_empty() {
        return Err(AppError::NoUrls);
    }

    storage::write_projects_csv(&harvest.records, &args.data_path)?;
    storage::write_embeddings_placeholder(&harvest.records, &args.embeddings_path)?;
    storage::write_failures(harvest.failed_urls(), &args.failures_path)?;

    log::info!(
        "Successfully wrote {} project records to {}.",
        harvest.records.len(),
        args.data_path.display()
    );
    if harvest.failures.is_empty() {
        log::info!("All project pages scraped successfully.");
    } else {
        log::warn!(
            "Failed to scrape {} projects. See {} for details.",
            harvest.failures.len(),
            args.failures_path.display()
        );
    }

    Ok(())
}

async fn discover(args: TuningArgs) -> Result<(), AppError> {
    let crawler = args.crawler(Arc::new(NoProgress))?;
    let browser = WebDriverBrowser::new(&args.webdriver_url, crawler.config().headless())?;

    let outcome = tokio::select! {
        urls = crawler.discover(&browser) => urls.map_err(AppError::from),
        _ = tokio::signal::ctrl_c() => Err(AppError::Interrupted),
    };
    if let Err(err) = browser.close().await {
        log::warn!("Failed to close the browser cleanly: {}", err);
    }

    let urls = outcome?;
    if urls.is_empty() {
        return Err(AppError::NoUrls);
    }
    for url in urls {
        println!("{url}");
    }

    Ok(())
}

fn extract(url: &str, html: &Path) -> Result<(), AppError> {
    let source = std::fs::read_to_string(html)?;
    let record = ProjectRecord::from_html(url, &source)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Seconds from the command line; negatives clamp to zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}
