//! CLI entry point for kctrl-config
//!
//! Inspects and edits the KCtrl module config, its key scripts and its
//! service, either through the privileged shell or on a local copy of the
//! module directory.

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::*;
use kctrl_config::{
    config::{
        package, settings::expand_path, AppSettings, ConfigManager, ConfigRepository,
        ConfigValidator, ModulePaths, ValidationLevel,
    },
    core::{keycodes, EventType, KeyBindingSet, MatchMode},
    module::{KeyScanner, ServiceController, ShellDeviceScanner},
    shell::{CommandRunner, OneShotShell, ShellCommand, SuSession},
    store::{AccessMode, LocalModuleStore, ModeGuard, ModuleStore, RootModuleStore},
};
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kctrl-config")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Module directory, overrides the settings file
    #[arg(long, global = true)]
    module_path: Option<PathBuf>,

    /// Access the module directory directly instead of through su
    #[arg(long, global = true)]
    local: bool,

    /// Log writes without performing them
    #[arg(long, global = true, conflicts_with = "read_only")]
    dry_run: bool,

    /// Reject every write
    #[arg(long, global = true)]
    read_only: bool,

    /// Start a new shell for every command
    #[arg(long, global = true)]
    one_shot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the decoded config
    Show,

    /// Validate the config and exit non-zero on errors
    Validate,

    /// Input devices the service listens on
    #[command(subcommand)]
    Devices(DeviceCommand),

    /// Change timing, logging or CPU settings
    Set(SetArgs),

    /// Key bindings and their scripts
    #[command(subcommand)]
    Keys(KeyCommand),

    /// Read or replace one event script
    #[command(subcommand)]
    Script(ScriptCommand),

    /// Export config and scripts to a zip file
    Export { path: PathBuf },

    /// Import config and scripts from a zip file
    Import { path: PathBuf },

    /// Config backups
    #[command(subcommand)]
    Backups(BackupCommand),

    /// Show whether the service is running
    Status,

    /// Start the service
    Start,

    /// Stop the service
    Stop,

    /// Restart the service
    Restart,

    /// Show module.prop
    Info,

    /// Collect logging config and the tail of the service log
    LogReport {
        /// Output file, stdout if omitted
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DeviceCommand {
    /// List devices with their selection
    List,
    /// Select or deselect a device
    Toggle { index: usize },
    /// Match a device by node path or by name
    Mode { index: usize, mode: MatchMode },
}

#[derive(Args)]
struct SetArgs {
    /// Click threshold in milliseconds
    #[arg(long)]
    click: Option<u32>,
    /// Short press threshold in milliseconds
    #[arg(long)]
    short_press: Option<u32>,
    /// Long press threshold in milliseconds
    #[arg(long)]
    long_press: Option<u32>,
    /// Double click interval in milliseconds
    #[arg(long)]
    double_click: Option<u32>,
    /// Service logging (on/off)
    #[arg(long, value_parser = parse_switch, action = ArgAction::Set)]
    log: Option<bool>,
    /// CPU cores, comma separated
    #[arg(long, value_delimiter = ',')]
    cpu: Option<Vec<usize>>,
}

#[derive(Subcommand)]
enum KeyCommand {
    /// List bound keys and their scripts
    List,
    /// Bind a key with all four event scripts
    Add { code: u32 },
    /// Detect a key press with kfind
    Scan {
        /// Bind the detected key
        #[arg(long)]
        add: bool,
    },
    /// Unbind a key and delete its scripts
    Remove { code: u32 },
    /// Map or unmap one event of a key
    Event {
        code: u32,
        event: EventType,
        #[arg(value_parser = parse_switch, action = ArgAction::Set)]
        state: bool,
    },
    /// Recreate missing scripts and delete unmapped ones
    Sync { code: u32 },
}

#[derive(Subcommand)]
enum ScriptCommand {
    /// Print a script
    Show { code: u32, event: EventType },
    /// Replace a script from a file or stdin
    Edit {
        code: u32,
        event: EventType,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BackupCommand {
    /// List backups, newest first
    List,
    /// Restore a backup by file name or path
    Restore { backup: PathBuf },
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Ok(true),
        "off" | "0" | "false" | "no" => Ok(false),
        other => Err(format!("expected on or off, got '{}'", other)),
    }
}

/// Everything a command needs, built once from flags and settings.
struct Context {
    settings: AppSettings,
    runner: Arc<dyn CommandRunner>,
    repo: ConfigRepository,
}

impl Context {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = match &cli.settings {
            Some(path) => AppSettings::load(path)?,
            None => AppSettings::default(),
        };
        if let Some(path) = &cli.module_path {
            settings.module_path = expand_path(path);
        }
        if cli.dry_run {
            settings.access_mode = AccessMode::DryRun;
        } else if cli.read_only {
            settings.access_mode = AccessMode::ReadOnly;
        }
        if cli.one_shot {
            settings.shell.session = false;
        }

        let command = if cli.local {
            ShellCommand::new("sh")
        } else {
            settings.shell.command()
        };
        let timeout = settings.shell.timeout();
        let runner: Arc<dyn CommandRunner> = if settings.shell.session {
            Arc::new(SuSession::new(command, timeout))
        } else {
            Arc::new(OneShotShell::new(command, timeout))
        };

        let store: Arc<dyn ModuleStore> = if cli.local {
            Arc::new(LocalModuleStore::new())
        } else {
            Arc::new(RootModuleStore::new(runner.clone()))
        };
        let store = Arc::new(ModeGuard::new(store, settings.access_mode));

        tracing::debug!(
            module = %settings.module_path.display(),
            mode = ?settings.access_mode,
            session = settings.shell.session,
            local = cli.local,
            "Configured"
        );

        let manager = ConfigManager::new(store, settings.module_paths())
            .with_backups_to_keep(settings.save.backups_to_keep);

        Ok(Self {
            settings,
            runner,
            repo: ConfigRepository::new(manager),
        })
    }

    fn paths(&self) -> &ModulePaths {
        self.repo.paths()
    }

    fn devices(&self) -> ShellDeviceScanner {
        ShellDeviceScanner::new(self.runner.clone())
    }

    fn service(&self) -> ServiceController {
        ServiceController::new(self.runner.clone(), self.paths().clone())
            .with_mode(self.settings.access_mode)
    }

    fn key_scanner(&self) -> KeyScanner {
        KeyScanner::new(self.runner.clone(), self.paths().clone())
            .with_timeout(Duration::from_secs(self.settings.scan.key_timeout_secs))
            .with_settle(Duration::from_millis(self.settings.scan.settle_ms))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Show => show(&ctx)?,
        Commands::Validate => validate(&ctx)?,
        Commands::Devices(cmd) => devices(&ctx, cmd)?,
        Commands::Set(args) => set(&ctx, args)?,
        Commands::Keys(cmd) => keys(&ctx, cmd)?,
        Commands::Script(cmd) => script(&ctx, cmd)?,
        Commands::Export { path } => {
            let path = expand_path(&path);
            let summary = package::export_to_file(ctx.repo.manager(), &path)?;
            println!(
                "{} Exported config and {} script{} to {}",
                "✓".green(),
                summary.scripts.len(),
                plural(summary.scripts.len()),
                path.display()
            );
            if summary.default_config {
                println!("  {} No config found, exported the default document", "⚠".yellow());
            }
            for skipped in &summary.skipped {
                println!("  {} {} (empty)", "skipped".dimmed(), skipped);
            }
        }
        Commands::Import { path } => {
            let path = expand_path(&path);
            let summary = package::import_from_file(ctx.repo.manager(), &path)?;
            println!(
                "{} Imported {}{} script{}",
                "✓".green(),
                if summary.config_imported { "config and " } else { "" },
                summary.scripts.len(),
                plural(summary.scripts.len())
            );
            for ignored in &summary.ignored {
                println!("  {} {}", "ignored".dimmed(), ignored);
            }
        }
        Commands::Backups(cmd) => backups(&ctx, cmd)?,
        Commands::Status => {
            let service = ctx.service();
            if !service.is_installed()? {
                println!("{} Module not installed at {}", "✗".red(), ctx.paths().root().display());
                std::process::exit(1);
            }
            println!("{} {}", "→".cyan(), service.status()?);
        }
        Commands::Start => {
            ctx.service().start()?;
            println!("{} Service started", "✓".green());
        }
        Commands::Stop => {
            ctx.service().stop()?;
            println!("{} Service stopped", "✓".green());
        }
        Commands::Restart => {
            ctx.service().restart()?;
            println!("{} Service restarted", "✓".green());
        }
        Commands::Info => {
            let info = ctx.service().module_info()?;
            for (key, value) in &info.properties {
                println!("{} {}", format!("{}:", key).bold(), value);
            }
        }
        Commands::LogReport { out } => {
            let report = ctx.service().log_report()?;
            match out {
                Some(path) => {
                    let path = expand_path(&path);
                    fs::write(&path, report)?;
                    println!("{} Log report written to {}", "✓".green(), path.display());
                }
                None => print!("{}", report),
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Print the decoded config
fn show(ctx: &Context) -> anyhow::Result<()> {
    let snapshot = ctx.repo.load(&ctx.devices())?;

    println!(
        "{}",
        format!("Config: {}\n", ctx.paths().config_file().display()).bold()
    );
    if !snapshot.exists {
        println!("{} No config yet, showing defaults\n", "⚠".yellow());
    }
    println!("{} {:?}", "Format:".bold(), snapshot.format);

    let t = &snapshot.settings.thresholds;
    println!("{} {} ms", "Click:".bold(), t.click);
    println!("{} {} ms", "Short press:".bold(), t.short_press);
    println!("{} {} ms", "Long press:".bold(), t.long_press);
    println!("{} {} ms", "Double click:".bold(), t.double_click_interval);
    println!(
        "{} {}",
        "Logging:".bold(),
        if snapshot.settings.enable_log { "on" } else { "off" }
    );
    println!(
        "{} {}\n",
        "CPU cores:".bold(),
        snapshot
            .settings
            .cpu_affinity
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    print_devices(&snapshot.devices);
    println!();
    print_bindings(&snapshot.bindings);

    if !snapshot.diagnostics.is_empty() {
        let skipped = snapshot.diagnostics.len();
        println!("\n{} {} line{} skipped:", "⚠".yellow(), skipped, plural(skipped));
        for diagnostic in &snapshot.diagnostics {
            println!("  {}", diagnostic.to_string().yellow());
        }
    }

    Ok(())
}

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let document = ctx.repo.read_document()?;
    let report = ConfigValidator::new().validate_config(&document);

    for issue in &report.issues {
        let label = match issue.validation_level {
            ValidationLevel::Error => "error".red().bold(),
            ValidationLevel::Warning => "warning".yellow().bold(),
            ValidationLevel::Info => "info".cyan(),
        };
        println!("{}: {}", label, issue);
    }

    let errors = report.count(ValidationLevel::Error);
    let warnings = report.count(ValidationLevel::Warning);
    if errors > 0 {
        println!(
            "\n{} {} error{}, {} warning{}",
            "✗".red().bold(),
            errors,
            plural(errors),
            warnings,
            plural(warnings)
        );
        std::process::exit(1);
    }

    println!(
        "{} Config is valid ({} warning{})",
        "✓".green().bold(),
        warnings,
        plural(warnings)
    );
    Ok(())
}

fn print_devices(devices: &[kctrl_config::DeviceSelection]) {
    println!("{}", "Devices:".bold());
    for (index, device) in devices.iter().enumerate() {
        let mark = if device.is_selected {
            "●".green()
        } else {
            "○".dimmed()
        };
        let mode = match device.match_mode() {
            MatchMode::Name => "name".magenta(),
            MatchMode::Path => "path".dimmed(),
        };
        println!(
            "  {} {} {} {} [{}]",
            format!("{:>2}.", index).dimmed(),
            mark,
            device.path.cyan(),
            device.name,
            mode
        );
    }
}

fn print_bindings(bindings: &KeyBindingSet) {
    println!("{}", "Keys:".bold());
    if bindings.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }
    for binding in bindings.iter() {
        println!(
            "  {} {}",
            binding.code.to_string().cyan().bold(),
            keycodes::display_name(binding.code)
        );
        for event in EventType::ALL {
            match binding.script(event) {
                Some(script) => println!("    {} → {}", event.to_string().green(), script),
                None => println!("    {}", event.to_string().dimmed()),
            }
        }
    }
}

fn devices(ctx: &Context, cmd: DeviceCommand) -> anyhow::Result<()> {
    let snapshot = match cmd {
        DeviceCommand::List => ctx.repo.load(&ctx.devices())?,
        DeviceCommand::Toggle { index } => ctx.repo.toggle_device(&ctx.devices(), index)?,
        DeviceCommand::Mode { index, mode } => {
            ctx.repo.set_device_mode(&ctx.devices(), index, mode)?
        }
    };
    print_devices(&snapshot.devices);
    Ok(())
}

fn set(ctx: &Context, args: SetArgs) -> anyhow::Result<()> {
    let snapshot = ctx.repo.update_settings(&ctx.devices(), |s| {
        if let Some(ms) = args.click {
            s.thresholds.click = ms;
        }
        if let Some(ms) = args.short_press {
            s.thresholds.short_press = ms;
        }
        if let Some(ms) = args.long_press {
            s.thresholds.long_press = ms;
        }
        if let Some(ms) = args.double_click {
            s.thresholds.double_click_interval = ms;
        }
        if let Some(enabled) = args.log {
            s.enable_log = enabled;
        }
        if let Some(cores) = args.cpu {
            s.cpu_affinity = cores;
        }
    })?;

    let t = &snapshot.settings.thresholds;
    println!(
        "{} Saved: click {} ms, short {} ms, long {} ms, double {} ms, log {}",
        "✓".green(),
        t.click,
        t.short_press,
        t.long_press,
        t.double_click_interval,
        if snapshot.settings.enable_log { "on" } else { "off" }
    );
    Ok(())
}

fn keys(ctx: &Context, cmd: KeyCommand) -> anyhow::Result<()> {
    match cmd {
        KeyCommand::List => print_bindings(&ctx.repo.bindings()?),
        KeyCommand::Add { code } => {
            ctx.repo.add_key(code)?;
            println!("{} Added {} ({})", "✓".green(), code, keycodes::display_name(code));
        }
        KeyCommand::Scan { add } => {
            println!("{} Press the key to detect...", "→".cyan());
            let key = ctx.key_scanner().scan(None)?;
            println!("{} Detected {} ({})", "✓".green(), key.code.to_string().bold(), key.name);

            if add {
                if ctx.repo.bindings()?.contains(key.code) {
                    println!("{} Key {} is already bound", "⚠".yellow(), key.code);
                } else {
                    ctx.repo.add_key(key.code)?;
                    println!("{} Added {}", "✓".green(), key.code);
                }
            }
        }
        KeyCommand::Remove { code } => {
            ctx.repo.remove_key(code)?;
            println!("{} Removed {} and its scripts", "✓".green(), code);
        }
        KeyCommand::Event { code, event, state } => {
            ctx.repo.set_event(code, event, state)?;
            println!(
                "{} {} {} for {}",
                "✓".green(),
                if state { "Mapped" } else { "Unmapped" },
                event,
                code
            );
        }
        KeyCommand::Sync { code } => {
            let changes = ctx.repo.sync_scripts(code)?;
            println!("{} Checked {} scripts for {}", "✓".green(), changes.len(), code);
        }
    }
    Ok(())
}

fn script(ctx: &Context, cmd: ScriptCommand) -> anyhow::Result<()> {
    match cmd {
        ScriptCommand::Show { code, event } => {
            print!("{}", ctx.repo.read_script(code, event)?);
        }
        ScriptCommand::Edit { code, event, file } => {
            let content = match file {
                Some(path) => fs::read_to_string(expand_path(&path))?,
                None => {
                    let mut content = String::new();
                    io::stdin().read_to_string(&mut content)?;
                    content
                }
            };
            ctx.repo.write_script(code, event, &content)?;
            println!(
                "{} Saved {}",
                "✓".green(),
                ctx.repo.script_path(code, event).display()
            );
        }
    }
    Ok(())
}

fn backups(ctx: &Context, cmd: BackupCommand) -> anyhow::Result<()> {
    let manager = ctx.repo.manager();
    match cmd {
        BackupCommand::List => {
            let backups = manager.list_backups()?;
            if backups.is_empty() {
                println!("{}", "No backups".dimmed());
            }
            for backup in backups {
                println!("{}", backup.display());
            }
        }
        BackupCommand::Restore { backup } => {
            let path = resolve_backup(ctx.paths(), &backup);
            manager.restore_backup(&path)?;
            println!("{} Restored {}", "✓".green(), path.display());
        }
    }
    Ok(())
}

/// Bare file names refer to the module's backups directory.
fn resolve_backup(paths: &ModulePaths, backup: &Path) -> PathBuf {
    if backup.is_absolute() {
        backup.to_path_buf()
    } else {
        paths.backups_dir().join(backup)
    }
}
