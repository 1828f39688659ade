use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn, LevelFilter};
use managed_cloud_sdk::{
    cli::{Cli, Commands},
    command::OperationHandle,
    config::ConfigManager,
    listener::{LogMessageListener, MessageListener},
    progress::{ProgressListener, ProgressSink},
    utils, ManagedCloudSdk, ManagedSdkError, OsInfo, Result, SdkComponent,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging with default INFO (DEBUG if --debug)
    let mut builder = env_logger::Builder::from_default_env();
    if cli.debug { builder.filter_level(LevelFilter::Debug); } else { builder.filter_level(LevelFilter::Info); }
    let _ = builder.try_init();

    // Run the application
    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config_manager = ConfigManager::new(cli.config.clone())?;
    debug!("Using configuration {}", config_manager.config_path().display());

    // CLI flags win over the configuration file
    if let Some(dir) = &cli.sdk_dir {
        config_manager.get_config_mut().managed_sdk_directory = dir.clone();
    }
    if let Some(version) = &cli.sdk_version {
        config_manager.set_version(version)?;
    }
    if cli.usage_reporting {
        config_manager.get_config_mut().usage_reporting = true;
    }

    let os_info = OsInfo::system()?;
    let config = config_manager.get_config();
    let mut sdk = ManagedCloudSdk::from_config(config, os_info)?;
    if let Some(url) = &cli.download_url {
        sdk = sdk.download_url(Url::parse(url)?);
    }
    info!("Managed Cloud SDK home: {}", sdk.sdk_home().display());

    match cli.get_command() {
        Commands::Install { components } => {
            let mut wanted = config.sdk_components();
            wanted.extend(components.iter().map(String::as_str).map(parse_component));
            install(&sdk, &wanted).await
        }
        Commands::InstallComponent { component } => {
            require_installed(&sdk)?;
            install(&sdk, &[parse_component(&component)]).await
        }
        Commands::Update => update(&sdk).await,
        Commands::Status { components } => {
            let mut wanted = config.sdk_components();
            wanted.extend(components.iter().map(String::as_str).map(parse_component));
            show_status(&sdk, &os_info, &wanted)
        }
        Commands::Path => {
            require_installed(&sdk)?;
            println!("{}", sdk.gcloud().display());
            Ok(())
        }
        Commands::Version => {
            utils::show_version();
            Ok(())
        }
    }
}

fn parse_component(id: &str) -> SdkComponent {
    match id.parse() {
        Ok(component) => component,
        Err(never) => match never {},
    }
}

fn require_installed(sdk: &ManagedCloudSdk) -> Result<()> {
    if sdk.is_installed() {
        return Ok(());
    }
    Err(ManagedSdkError::installation(format!(
        "Cloud SDK {} is not installed, run `managed-cloud-sdk install` first",
        sdk.version()
    )))
}

async fn install(sdk: &ManagedCloudSdk, components: &[SdkComponent]) -> Result<()> {
    let listener: Arc<dyn MessageListener> = Arc::new(LogMessageListener);

    if sdk.is_installed() {
        info!("Cloud SDK {} is already installed", sdk.version());
    } else {
        let installer = sdk.new_installer();
        let home = drive(installer.install(indicatif_progress(), Arc::clone(&listener))).await?;
        println!("Installed Cloud SDK at {}", home.display());
    }

    let component_installer = sdk.new_component_installer();
    for component in components {
        if sdk.has_component(component)? {
            info!("Component {} is already installed", component);
            continue;
        }
        drive(component_installer.install(component.clone(), indicatif_progress(), Arc::clone(&listener))).await?;
        println!("Installed component {}", component);
    }
    Ok(())
}

async fn update(sdk: &ManagedCloudSdk) -> Result<()> {
    require_installed(sdk)?;
    let Some(updater) = sdk.new_updater() else {
        warn!("Cloud SDK {} is pinned and is never updated in place", sdk.version());
        return Ok(());
    };
    if sdk.is_up_to_date()? {
        println!("Cloud SDK is up to date");
        return Ok(());
    }
    drive(updater.update(indicatif_progress(), Arc::new(LogMessageListener))).await?;
    println!("Cloud SDK updated");
    Ok(())
}

fn show_status(sdk: &ManagedCloudSdk, os_info: &OsInfo, components: &[SdkComponent]) -> Result<()> {
    println!("{}", utils::get_system_info(os_info));
    println!("Managed version: {}", sdk.version());
    println!("Managed SDK home: {}", sdk.sdk_home().display());
    if !sdk.is_installed() {
        println!("Installed: no");
        return Ok(());
    }
    println!("Installed: yes");
    println!("Up to date: {}", if sdk.is_up_to_date()? { "yes" } else { "no" });
    for component in components {
        let present = sdk.has_component(component)?;
        println!("Component {}: {}", component, if present { "installed" } else { "missing" });
    }
    Ok(())
}

/// Await an operation, cancelling it on Ctrl-C.
async fn drive<T>(mut handle: OperationHandle<T>) -> Result<T> {
    tokio::select! {
        result = &mut handle => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cleaning up...");
            handle.cancel();
            handle.await
        }
    }
}

fn indicatif_progress() -> ProgressListener {
    ProgressListener::new(Arc::new(IndicatifProgressSink::default()))
}

/// Renders the root of a progress tree: a bar when the total is known, a
/// spinner otherwise.
#[derive(Default)]
struct IndicatifProgressSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressSink for IndicatifProgressSink {
    fn start(&self, message: &str, total_work: Option<u64>) {
        let bar = match total_work {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template("{msg}\n[{elapsed_precise}] {bar:40} {percent}%")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_message(message.to_string());
        if let Ok(mut current) = self.bar.lock() {
            *current = Some(bar);
        }
    }

    fn message(&self, message: &str) {
        if let Ok(current) = self.bar.lock() {
            if let Some(bar) = current.as_ref() {
                bar.set_message(message.trim_end().to_string());
            }
        }
    }

    fn update(&self, work_done: u64) {
        if let Ok(current) = self.bar.lock() {
            if let Some(bar) = current.as_ref() {
                bar.inc(work_done);
            }
        }
    }

    fn done(&self) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(bar) = current.take() {
                bar.finish_and_clear();
            }
        }
    }
}
