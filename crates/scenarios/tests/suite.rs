//! Suite entry point
//!
//! This binary runs the chained scenario suite against either the
//! in-memory simulation or a real deployment through the Playwright
//! bridge. Run with: cargo test --package prodflow-scenarios --test suite

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use prodflow_harness::HarnessResult;
use prodflow_scenarios::driver::{PlaywrightConfig, PlaywrightDriver};
use prodflow_scenarios::runner::{write_results, ScenarioRunner, SuiteCx};
use prodflow_scenarios::{scenarios, DriverKind, SimErp, SuiteConfig};

#[derive(Parser, Debug)]
#[command(name = "prodflow-suite")]
#[command(about = "Chained E2E scenario suite for the ProdFlow ERP")]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Driver override (sim, playwright)
    #[arg(long)]
    driver: Option<String>,

    /// Web UI base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// API base URL override
    #[arg(long)]
    api_url: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long, default_value = "true")]
    headless: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> HarnessResult<bool> {
    let mut config = match &args.config {
        Some(path) => SuiteConfig::from_file(path)?,
        None => SuiteConfig::default(),
    }
    .apply_env();

    if let Some(driver) = &args.driver {
        config.driver = match driver.as_str() {
            "playwright" => DriverKind::Playwright,
            _ => DriverKind::Sim,
        };
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let mut playwright: Option<PlaywrightDriver> = None;
    let driver: Box<dyn prodflow_scenarios::PageDriver> = match config.driver {
        DriverKind::Sim => Box::new(SimErp::new().driver()),
        DriverKind::Playwright => {
            let handle = PlaywrightDriver::launch(PlaywrightConfig {
                base_url: config.base_url.clone(),
                screenshot_dir: config.screenshot_dir.clone(),
                headless: args.headless,
            })
            .await?;
            playwright = Some(handle.clone());
            Box::new(handle)
        }
    };

    let mut runner = ScenarioRunner::new(scenarios::suite());
    if let Some(tag) = &args.tag {
        runner.retain_tagged(tag);
    }
    if let Some(name) = &args.name {
        runner.retain_named(name);
    }
    if runner.is_empty() {
        eprintln!("no scenarios match the given filter");
        return Ok(false);
    }

    let output_dir = config.output_dir.clone();
    let mut cx = SuiteCx::new(config, driver)?;
    let result = runner.run(&mut cx).await;
    write_results(&output_dir, &result)?;

    if let Some(mut handle) = playwright {
        handle.shutdown().await?;
    }

    Ok(result.all_passed())
}
