use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use quadlet_backup::config::{
    default_config_root, BackupConfig, BackupType, ConfigStore, EmailOverrides, Engine, Settings,
};
use quadlet_backup::managers::backup::{BackupManager, RunResult};
use quadlet_backup::managers::logging::{self, LogGuard, LoggingConfig};
use quadlet_backup::managers::notification::{format_duration, Notifier, NotifyStatus};
use quadlet_backup::managers::{cleanup, verify};
use quadlet_backup::utils::executor::RealExecutor;
use quadlet_backup::utils::schedule::parse_schedule;
use quadlet_backup::utils::systemd::{self, Invocation, SystemdUnits};
use quadlet_backup::utils::{tools, SmtpMailer};
use std::path::PathBuf;
use std::process::{Command, ExitCode, Stdio};

/// Journal lines attached to `notify` reports
const NOTIFY_JOURNAL_LINES: usize = 100;

#[derive(Parser)]
#[command(name = "qh-backup")]
#[command(about = "Scheduled rsync/restic/rclone backups for Quadlet hosts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration root (defaults to ~/.config/quadlet-helper)
    #[arg(long, global = true, env = "QH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(flatten)]
    email: EmailArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `[email]` section of config.toml
#[derive(Args)]
struct EmailArgs {
    /// SMTP server host
    #[arg(long = "email-host", global = true, env = "QH_EMAIL_HOST")]
    host: Option<String>,

    /// SMTP server port
    #[arg(long = "email-port", global = true, env = "QH_EMAIL_PORT")]
    port: Option<u16>,

    /// SMTP username
    #[arg(long = "email-username", global = true, env = "QH_EMAIL_USERNAME")]
    username: Option<String>,

    /// File holding the SMTP password
    #[arg(long = "email-password-file", global = true, env = "QH_EMAIL_PASSWORD_FILE")]
    password_file: Option<PathBuf>,

    /// Require TLS (true/false)
    #[arg(long = "email-tls", global = true, env = "QH_EMAIL_TLS")]
    tls: Option<bool>,

    /// Default sender address
    #[arg(long = "email-from", global = true, env = "QH_EMAIL_FROM")]
    from: Option<String>,

    /// Default recipient address
    #[arg(long = "email-to", global = true, env = "QH_EMAIL_TO")]
    to: Option<String>,
}

impl EmailArgs {
    fn overrides(&self) -> EmailOverrides {
        EmailOverrides {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password_file: self.password_file.clone(),
            tls: self.tls,
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backup
    Run {
        /// Backup name
        name: String,

        /// Show what would be transferred without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Do not send a success/failure email (used by the systemd unit)
        #[arg(long)]
        no_notify: bool,
    },

    /// Validate a backup and perform a dry run
    Test {
        /// Backup name
        name: String,
    },

    /// Verify a backup destination against its sources
    Verify {
        /// Backup name
        name: String,
    },

    /// Apply the retention policy
    Cleanup {
        /// Backup name
        name: String,
    },

    /// Send a success or failure report with recent journal output
    Notify {
        /// Backup name
        name: String,

        /// success or failure
        status: NotifyStatus,
    },

    /// Send a test email using the backup's notification settings
    TestEmail {
        /// Backup name
        name: String,
    },

    /// List all configured backups
    List,

    /// Print a backup configuration
    Show {
        /// Backup name
        name: String,
    },

    /// Validate a backup configuration
    Validate {
        /// Backup name
        name: String,
    },

    /// Create a backup configuration interactively
    Create {
        /// Backup name (prompted if omitted)
        name: Option<String>,
    },

    /// Open a backup configuration in $EDITOR and validate the result
    Edit {
        /// Backup name
        name: String,
    },

    /// Delete a backup configuration and its systemd units
    Delete {
        /// Backup name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Install and start the systemd timer for a backup
    Install {
        /// Backup name
        name: String,
    },

    /// Stop and remove the systemd units for a backup
    Uninstall {
        /// Backup name
        name: String,
    },

    /// Show systemd timer and service status
    Status {
        /// Backup name
        name: String,
    },

    /// Show recent journal output of a backup
    Logs {
        /// Backup name
        name: String,

        /// Number of lines
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },

    /// Translate a schedule into a systemd OnCalendar expression
    Schedule {
        /// e.g. "daily 02:00" or "weekly sun 03:00"
        expr: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Commands that don't touch configuration - use simple console logging
    if let Commands::Schedule { ref expr } = cli.command {
        logging::init_console_logging();
        println!("{}", parse_schedule(expr)?);
        return Ok(ExitCode::SUCCESS);
    }

    let root = cli.config_dir.clone().unwrap_or_else(default_config_root);
    let store = ConfigStore::new(&root);

    let mut settings = Settings::load(&root.join("config.toml"))?;
    cli.email.overrides().apply(&mut settings.email);

    // Dropped when main returns, flushing buffered lines to the log file
    let _log_guard = setup_logging(&settings);

    let executor = RealExecutor::new();

    match cli.command {
        Commands::Run {
            name,
            dry_run,
            no_notify,
        } => handle_run(&store, &settings, &executor, &name, dry_run, no_notify),
        Commands::Test { name } => handle_test(&store, &settings, &executor, &name),
        Commands::Verify { name } => handle_verify(&store, &executor, &name),
        Commands::Cleanup { name } => {
            let config = store.load(&name)?;
            config.validate_with(&settings.email)?;
            println!("Running cleanup for '{}'...", name);
            cleanup::cleanup(&executor, &config, Some(settings.lock_directory().as_path()))?;
            println!("✓ Cleanup completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Notify { name, status } => {
            handle_notify(&store, &settings, &executor, &name, status).map(|()| ExitCode::SUCCESS)
        }
        Commands::TestEmail { name } => {
            let config = store.load(&name)?;
            let notifier = Notifier::new(settings.email.clone(), Box::new(SmtpMailer::new()));
            println!("Sending test email for '{}'...", name);
            notifier.send_test(&config)?;
            println!("✓ Test email sent");
            Ok(ExitCode::SUCCESS)
        }
        Commands::List => handle_list(&store, &executor).map(|()| ExitCode::SUCCESS),
        Commands::Show { name } => {
            let config = store.load(&name)?;
            println!("# {}", store.path(&name).display());
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { name } => handle_validate(&store, &settings, &name),
        Commands::Create { name } => {
            handle_create(&store, &settings, name).map(|()| ExitCode::SUCCESS)
        }
        Commands::Delete { name, yes } => {
            handle_delete(&store, &executor, &name, yes).map(|()| ExitCode::SUCCESS)
        }
        Commands::Edit { name } => handle_edit(&store, &settings, &executor, &name),
        Commands::Install { name } => {
            handle_install(&store, &settings, &executor, &name).map(|()| ExitCode::SUCCESS)
        }
        Commands::Uninstall { name } => {
            let units = SystemdUnits::new(systemd::default_unit_dir(), &executor);
            let removed = units.uninstall(&name)?;
            if removed.is_empty() {
                println!("No systemd units installed for '{}'", name);
            } else {
                for path in removed {
                    println!("  Removed {}", path.display());
                }
                println!("✓ Uninstalled '{}'", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { name } => {
            let units = SystemdUnits::new(systemd::default_unit_dir(), &executor);
            if !units.is_installed(&name) {
                println!("'{}' is not installed (run: qh-backup install {})", name, name);
                return Ok(ExitCode::SUCCESS);
            }
            print!("{}", units.status(&name)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Logs { name, lines } => {
            let units = SystemdUnits::new(systemd::default_unit_dir(), &executor);
            print!("{}", units.journal(&name, lines)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schedule { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// File + console logging, falling back to console only when the log
/// directory can't be used
fn setup_logging(settings: &Settings) -> Option<LogGuard> {
    match logging::init_logging(&LoggingConfig::from_settings(settings)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_logging();
            tracing::warn!("File logging disabled: {:#}", e);
            None
        }
    }
}

fn handle_run(
    store: &ConfigStore,
    settings: &Settings,
    executor: &RealExecutor,
    name: &str,
    dry_run: bool,
    no_notify: bool,
) -> Result<ExitCode> {
    let config = store.load(name)?;
    config.validate_with(&settings.email)?;

    if dry_run {
        println!("Running dry run for backup: {}", name);
    } else {
        println!("Running backup: {}", name);
    }

    let manager = BackupManager::new(executor).with_lock_dir(settings.lock_directory());
    let result = manager.run(&config, dry_run);

    if !streams_output(&config, dry_run) && !result.output.is_empty() {
        println!("{}", result.output.trim_end());
    }

    let notified = if dry_run || no_notify {
        true
    } else {
        send_run_notification(settings, &config, &result)
    };

    match result.error {
        None => {
            println!(
                "✓ Backup completed successfully ({})",
                format_duration(result.elapsed())
            );
        }
        Some(ref e) => {
            eprintln!("\n✗ Backup failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    }

    if !notified {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Whether the tool's output already went to the terminal during the run
fn streams_output(config: &BackupConfig, dry_run: bool) -> bool {
    match &config.engine {
        Engine::Rsync { .. } => true,
        Engine::Restic { .. } => !dry_run,
        Engine::Rclone { .. } => config.source.len() == 1,
    }
}

/// Returns false when a required notification could not be delivered
fn send_run_notification(settings: &Settings, config: &BackupConfig, result: &RunResult) -> bool {
    let (status, mut details) = match result.error {
        None => (
            NotifyStatus::Success,
            format!(
                "Backup completed in {}",
                format_duration(result.elapsed())
            ),
        ),
        Some(ref e) => (NotifyStatus::Failure, format!("Backup failed: {}", e)),
    };
    if !result.output.is_empty() {
        details.push_str("\n\n");
        details.push_str(&result.output);
    }

    let notifier = Notifier::new(settings.email.clone(), Box::new(SmtpMailer::new()));
    match notifier.send_notification(config, status, &details) {
        Ok(true) => {
            println!("✓ {} notification sent", status);
            true
        }
        Ok(false) => true,
        Err(e) => {
            eprintln!("✗ Failed to send {} notification: {}", status, e);
            false
        }
    }
}

fn handle_test(
    store: &ConfigStore,
    settings: &Settings,
    executor: &RealExecutor,
    name: &str,
) -> Result<ExitCode> {
    let config = store.load(name)?;
    config.validate_with(&settings.email)?;
    println!("✓ Configuration is valid");

    if !tools::check_available(executor, config.backup_type()) {
        eprintln!("✗ {} is not installed\n", config.backup_type());
        eprintln!("{}", tools::install_instructions(config.backup_type()));
        return Ok(ExitCode::FAILURE);
    }
    println!("✓ {} is available", config.backup_type());

    println!("\nPerforming dry run...\n");
    let result = BackupManager::new(executor).run(&config, true);
    if !streams_output(&config, true) && !result.output.is_empty() {
        println!("{}", result.output.trim_end());
    }

    match result.error {
        None => println!("\n✓ Test completed successfully"),
        Some(e) => {
            eprintln!("\n✗ Dry run failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_verify(store: &ConfigStore, executor: &RealExecutor, name: &str) -> Result<ExitCode> {
    let config = store.load(name)?;
    println!("Verifying backup: {}", name);

    let result = verify::verify(executor, &config)?;
    if !result.details.is_empty() {
        println!("{}", result.details.trim_end());
    }

    if result.success {
        println!("✓ {}", result.message);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("✗ {}", result.message);
        Ok(ExitCode::FAILURE)
    }
}

fn handle_notify(
    store: &ConfigStore,
    settings: &Settings,
    executor: &RealExecutor,
    name: &str,
    status: NotifyStatus,
) -> Result<()> {
    let config = store.load(name)?;

    let units = SystemdUnits::new(systemd::default_unit_dir(), executor);
    let details = match units.journal(name, NOTIFY_JOURNAL_LINES) {
        Ok(journal) => format!("Recent log output:\n{}", journal),
        Err(e) => format!("Could not retrieve journal output: {}", e),
    };

    let notifier = Notifier::new(settings.email.clone(), Box::new(SmtpMailer::new()));
    if notifier.send_notification(&config, status, &details)? {
        println!("✓ {} notification sent for '{}'", status, name);
    } else {
        println!("{} notifications are disabled for '{}'", status, name);
    }
    Ok(())
}

fn handle_list(store: &ConfigStore, executor: &RealExecutor) -> Result<()> {
    let names = store.list()?;
    if names.is_empty() {
        println!("No backups configured in {}", store.backups_dir().display());
        return Ok(());
    }

    let units = SystemdUnits::new(systemd::default_unit_dir(), executor);
    println!("Configured backups:\n");
    for name in names {
        match store.load(&name) {
            Ok(config) => {
                let installed = if units.is_installed(&name) { "installed" } else { "not installed" };
                println!("  {} ({})", name, config.backup_type());
                println!("    Schedule: {}", config.schedule);
                println!("    Sources: {}", config.source.join(", "));
                println!("    Destination: {}", config.destination());
                println!("    Timer: {}", installed);
            }
            Err(e) => println!("  {} (✗ {})", name, e),
        }
        println!();
    }
    Ok(())
}

fn handle_validate(store: &ConfigStore, settings: &Settings, name: &str) -> Result<ExitCode> {
    let config = store.load(name)?;

    if let Err(e) = config.validate_with(&settings.email) {
        eprintln!("✗ {}", e);
        return Ok(ExitCode::FAILURE);
    }
    println!("✓ Configuration '{}' is valid", name);

    // Schedule syntax is only enforced at install time
    match parse_schedule(&config.schedule) {
        Ok(calendar) => println!("  OnCalendar={}", calendar),
        Err(e) => println!("⚠️  {} (install will fail)", e),
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_create(store: &ConfigStore, settings: &Settings, name: Option<String>) -> Result<()> {
    use dialoguer::{Confirm, Input, Select};

    println!("=== Create Backup ===\n");

    let name = match name {
        Some(name) => name,
        None => Input::<String>::new().with_prompt("Backup name").interact_text()?,
    };

    if store.exists(&name) {
        let overwrite = Confirm::new()
            .with_prompt(format!("Backup '{}' already exists. Overwrite?", name))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let types = BackupType::ALL;
    let selection = Select::new()
        .with_prompt("Backup type")
        .items(&types)
        .default(0)
        .interact()?;
    let backup_type = types[selection];

    let sources: String = Input::new()
        .with_prompt("Source paths (comma separated)")
        .interact_text()?;
    let sources: Vec<String> = sources
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let engine = match backup_type {
        BackupType::Rsync => {
            let path: String = Input::new().with_prompt("Destination path").interact_text()?;
            Engine::rsync(path)
        }
        BackupType::Restic => {
            let repository: String = Input::new().with_prompt("Restic repository").interact_text()?;
            let password_file: String = Input::new()
                .with_prompt("Repository password file")
                .default("~/.config/restic/password".to_string())
                .interact_text()?;
            let mut engine = Engine::restic(repository);
            if let Engine::Restic { ref mut options, .. } = engine {
                options.password_file = Some(PathBuf::from(password_file));
            }
            engine
        }
        BackupType::Rclone => {
            let remote: String = Input::new()
                .with_prompt("Rclone remote (e.g. gdrive:backups)")
                .interact_text()?;
            Engine::rclone(remote)
        }
    };

    let schedule: String = Input::new()
        .with_prompt("Schedule (hourly, daily, daily 02:00, weekly sun 03:00, ...)")
        .default("daily".to_string())
        .validate_with(|input: &String| parse_schedule(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?;

    let mut config = BackupConfig::new(name.clone(), engine, schedule, sources);

    config.verification.enabled = Confirm::new()
        .with_prompt("Enable verification?")
        .default(true)
        .interact()?;
    if config.verification.enabled {
        config.verification.auto_verify = Confirm::new()
            .with_prompt("Verify automatically after each backup?")
            .default(false)
            .interact()?;
    }

    match backup_type {
        BackupType::Restic => {
            config.retention.keep_daily = Input::new()
                .with_prompt("Daily snapshots to keep (0 = keep all)")
                .default(7u32)
                .interact_text()?;
            config.retention.keep_weekly = Input::new()
                .with_prompt("Weekly snapshots to keep")
                .default(4u32)
                .interact_text()?;
        }
        BackupType::Rclone => {
            config.retention.keep_days = Input::new()
                .with_prompt("Delete remote files older than N days (0 = never)")
                .default(0u32)
                .interact_text()?;
        }
        BackupType::Rsync => {}
    }

    config.notifications.enabled = Confirm::new()
        .with_prompt("Enable email notifications?")
        .default(false)
        .interact()?;
    if config.notifications.enabled {
        config.notifications.on_failure = true;
        config.notifications.on_success = Confirm::new()
            .with_prompt("Also notify on success?")
            .default(false)
            .interact()?;
        config.notifications.email.to = Input::new()
            .with_prompt("Recipient (empty = default from config.toml)")
            .allow_empty(true)
            .default(settings.email.to.clone())
            .interact_text()?;
    }

    if let Err(e) = config.validate_with(&settings.email) {
        bail!("Configuration is invalid, not saved: {}", e);
    }

    let path = store.save(&config)?;
    println!("\n✓ Saved {}", path.display());
    println!("Run 'qh-backup install {}' to schedule it.", name);
    Ok(())
}

fn handle_edit(
    store: &ConfigStore,
    settings: &Settings,
    executor: &RealExecutor,
    name: &str,
) -> Result<ExitCode> {
    if !store.exists(name) {
        bail!("Backup configuration '{}' not found", name);
    }
    let path = store.path(name);

    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string());
    let mut words = editor.split_whitespace();
    let program = words.next().unwrap_or("vi");

    println!("Editing backup: {}", name);
    println!("{}\n", path.display());

    let status = Command::new(program)
        .args(words)
        .arg(&path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", program))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}", program, status);
    }

    let checked = store
        .load(name)
        .and_then(|config| config.validate_with(&settings.email));
    if let Err(e) = checked {
        eprintln!("✗ {}", e);
        eprintln!("Please fix the configuration file and try again.");
        return Ok(ExitCode::FAILURE);
    }
    println!("✓ Configuration updated successfully");

    let units = SystemdUnits::new(systemd::default_unit_dir(), executor);
    if units.is_installed(name) {
        println!("\nThe backup is installed. Reinstall it for the changes to take effect:");
        println!("  qh-backup uninstall {}", name);
        println!("  qh-backup install {}", name);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_delete(store: &ConfigStore, executor: &RealExecutor, name: &str, yes: bool) -> Result<()> {
    if !store.exists(name) {
        bail!("Backup configuration '{}' not found", name);
    }

    if !yes {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Delete backup '{}'?", name))
            .default(false)
            .interact()?;
        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let units = SystemdUnits::new(systemd::default_unit_dir(), executor);
    if units.is_installed(name) {
        units.uninstall(name)?;
        println!("  Removed systemd units");
    }

    store.remove(name)?;
    println!("✓ Deleted '{}'", name);
    Ok(())
}

fn handle_install(
    store: &ConfigStore,
    settings: &Settings,
    executor: &RealExecutor,
    name: &str,
) -> Result<()> {
    let config = store.load(name)?;
    config.validate_with(&settings.email)?;

    let invocation = Invocation {
        executable: std::env::current_exe().context("Failed to locate qh-backup executable")?,
        config_root: store.root().to_path_buf(),
    };

    let units = SystemdUnits::new(systemd::default_unit_dir(), executor);
    println!("Installing systemd units for '{}'...", name);
    for path in units.install(&invocation, &config)? {
        println!("  Wrote {}", path.display());
    }
    println!("✓ Enabled {}", systemd::timer_name(name));
    Ok(())
}
