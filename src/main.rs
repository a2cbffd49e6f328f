mod api;
mod config;
mod constants;
mod error;
mod monitor;
mod notification;
mod repository;
mod scheduler;
mod session;
mod stats;
mod types;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::ApiClient;
use crate::config::Config;
use crate::monitor::Monitor;
use crate::notification::NotificationSink;
use crate::repository::ViewMode;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kinbox=debug"));

    // Try to create a log file in the config directory
    let log_file = Config::config_dir()
        .ok()
        .map(|dir| dir.join("kinbox.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        // Log to file
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"kinbox - Live email monitor for the terminal

Usage: kinbox [command]

Commands:
    (none)      Start the monitor
    setup       Configure the mail service endpoint and account
    help        Show this help message

While running:
    refresh           Refresh the full listing now
    search <sender>   Show only messages from a sender
    all               Return to the full listing
    stats             Show folder counts
    quit              Exit

Configuration file: ~/.config/kinbox/config.toml
The account password is prompted at startup and never written to disk.
"#
    );
}

fn run_setup() -> Result<()> {
    use std::io::{self, Write};

    println!("Kinbox Setup");
    println!("============\n");

    let config_path = Config::config_path()?;
    if config_path.exists() {
        print!("Configuration already exists. Overwrite? [y/N]: ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    // Get the service endpoint
    let base_url = loop {
        print!("Mail service URL [{}]: ", constants::DEFAULT_BASE_URL);
        io::stdout().flush()?;
        let mut url = String::new();
        io::stdin().read_line(&mut url)?;
        let url = url.trim();
        if url.is_empty() {
            break constants::DEFAULT_BASE_URL.to_string();
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            break url.trim_end_matches('/').to_string();
        }
        println!("Invalid URL. Please enter an http:// or https:// address.");
    };

    // Get email with validation
    let email = loop {
        print!("Email address: ");
        io::stdout().flush()?;
        let mut email = String::new();
        io::stdin().read_line(&mut email)?;
        let email = email.trim().to_string();

        // Basic email validation: must contain @ and have parts before/after
        if email.contains('@') {
            let parts: Vec<&str> = email.split('@').collect();
            if parts.len() == 2
                && !parts[0].is_empty()
                && parts[1].contains('.')
                && !parts[1].starts_with('.')
                && !parts[1].ends_with('.')
            {
                break email;
            }
        }
        println!(
            "Invalid email format. Please enter a valid email address (e.g., user@example.com)"
        );
    };

    let config = Config {
        server: config::ServerConfig { base_url },
        monitor: config::MonitorConfig::default(),
        notifications: config::NotificationConfig::default(),
        account: Some(config::AccountConfig { email }),
    };

    Config::ensure_dirs()?;
    config.save()?;
    println!("Configuration saved to {}", config_path.display());
    println!("\nSetup complete! Run 'kinbox' to start.");
    println!("Your password will be asked for at startup; it is never stored.");
    Ok(())
}

fn prompt_password() -> Result<String> {
    use std::io::{self, Write};

    print!("Password: ");
    io::stdout().flush()?;
    let password = read_password_no_echo()?;
    println!();
    Ok(password)
}

fn read_password_no_echo() -> Result<String> {
    use std::io;

    // Disable echo
    let _guard = DisableEcho::new()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    Ok(password.trim().to_string())
}

struct DisableEcho {
    #[cfg(unix)]
    original: libc::termios,
}

impl DisableEcho {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use std::mem::MaybeUninit;
        use std::os::unix::io::AsRawFd;

        let fd = std::io::stdin().as_raw_fd();
        let mut termios = MaybeUninit::<libc::termios>::uninit();

        unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                anyhow::bail!("Failed to get terminal attributes");
            }
            let original = termios.assume_init();
            let mut new = original;
            new.c_lflag &= !libc::ECHO;
            if libc::tcsetattr(fd, libc::TCSANOW, &new) != 0 {
                anyhow::bail!("Failed to set terminal attributes");
            }
            Ok(Self { original })
        }
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for DisableEcho {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let fd = std::io::stdin().as_raw_fd();
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.original);
        }
    }
}

fn build_sink(config: &Config) -> Arc<dyn NotificationSink> {
    #[cfg(feature = "notifications")]
    {
        Arc::new(notification::DesktopSink::from_config(config))
    }
    #[cfg(not(feature = "notifications"))]
    {
        let _ = config;
        Arc::new(notification::TracingSink)
    }
}

fn print_status(monitor: &Monitor) {
    let snapshot = monitor.snapshot();
    let stats = monitor.stats();
    match &snapshot.mode {
        ViewMode::Full => println!(
            "{} messages ({} inbox, {} spam, {} promotions)",
            stats.total, stats.inbox, stats.spam, stats.promotions
        ),
        ViewMode::FilteredBy(term) => {
            println!("{} messages from {}", stats.total, term)
        }
    }
    for message in &snapshot.messages {
        let folder = if message.folder.is_empty() {
            "-"
        } else {
            &message.folder
        };
        println!("  [{}] {}: {}", folder, message.sender, message.subject);
    }
}

async fn run_monitor() -> Result<()> {
    setup_logging();

    let config = Config::load()?;
    Config::ensure_dirs()?;

    let email = match &config.account {
        Some(account) => account.email.clone(),
        None => {
            eprintln!("No account configured. Run 'kinbox setup' first.");
            std::process::exit(1);
        }
    };

    println!("Account: {}", email);
    let password = prompt_password()?;

    let sink = build_sink(&config);
    let monitor = Arc::new(Monitor::new(
        ApiClient::new(&config.server.base_url)?,
        sink,
        Duration::from_secs(config.monitor.poll_interval_secs),
    ));

    if let Err(e) = monitor.configure(&email, &password).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    println!("Fetching messages from {}...", config.server.base_url);
    match monitor.load_all(false).await {
        Ok(_) => print_status(&monitor),
        Err(e) => eprintln!("Initial fetch failed: {}", e),
    }

    monitor.start_refresh().await?;
    println!(
        "Monitoring every {}s. Type 'help' for commands.",
        config.monitor.poll_interval_secs
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                let (command, rest) = match line.split_once(' ') {
                    Some((c, r)) => (c, r.trim()),
                    None => (line, ""),
                };
                match command {
                    "" => {}
                    "refresh" | "all" => match monitor.show_all().await {
                        Ok(_) => print_status(&monitor),
                        Err(e) => eprintln!("{}", e),
                    },
                    "search" => match monitor.search(rest).await {
                        Ok(_) => print_status(&monitor),
                        Err(e) => eprintln!("{}", e),
                    },
                    "stats" => {
                        let stats = monitor.stats();
                        println!(
                            "total: {}  inbox: {}  spam: {}  promotions: {}",
                            stats.total, stats.inbox, stats.spam, stats.promotions
                        );
                    }
                    "help" => print_usage(),
                    "quit" | "exit" => break,
                    other => eprintln!("Unknown command: {} (try 'help')", other),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    monitor.reset().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("setup") => run_setup(),
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
        None => run_monitor().await,
    }
}
