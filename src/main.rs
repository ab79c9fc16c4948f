use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ttyprobe_lib::{settings, BridgeSettings, SerialBridge};

#[derive(Parser)]
#[command(name = "ttyprobe", version, about = "Discover, inspect and read serial devices")]
struct Cli {
    /// Settings file (defaults to <config dir>/ttyprobe/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the driver table path
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// Override the device root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List "<device> (<driver>)" labels
    Labels,
    /// List device paths
    Paths,
    /// Print whether a device path exists
    Check { path: String },
    /// Print device info as JSON
    Info { path: String },
    /// Open a port and perform single reads
    Read {
        path: String,
        #[arg(long)]
        baud: Option<u32>,
        /// Number of read attempts
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Answer JSON-lines method calls on stdin/stdout
    Serve,
}

fn load(cli: &Cli) -> Result<BridgeSettings, String> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => settings::default_settings_path()?,
    };
    let mut loaded = settings::load_settings(&path)?;

    if let Some(table) = &cli.table {
        loaded.driver_table_path = table.clone();
    }
    if let Some(root) = &cli.root {
        loaded.device_root = root.clone();
    }
    if let Some(dir) = &cli.log_dir {
        loaded.log_dir = Some(dir.clone());
    }
    Ok(loaded)
}

fn run(cli: Cli) -> Result<(), String> {
    let settings = load(&cli)?;
    if let Some(dir) = &settings.log_dir {
        ttyprobe_lib::init_file_logging(dir)?;
    }

    let mut bridge = SerialBridge::new(&settings);

    match cli.command {
        Command::Labels => {
            for label in bridge.list_all_device_labels() {
                println!("{}", label);
            }
        }
        Command::Paths => {
            for path in bridge.list_all_device_paths() {
                println!("{}", path);
            }
        }
        Command::Check { path } => println!("{}", bridge.is_device_accessible(&path)),
        Command::Info { path } => {
            let info = bridge.device_info(&path);
            let json = serde_json::to_string_pretty(&info)
                .map_err(|e| format!("Failed to serialize device info: {}", e))?;
            println!("{}", json);
        }
        Command::Read { path, baud, count } => {
            bridge.open_port(&path, baud).map_err(|e| e.to_string())?;
            for _ in 0..count {
                match bridge.read_data().map_err(|e| e.to_string())? {
                    Some(bytes) => println!("{}", hex::encode(bytes)),
                    None => println!("(no data)"),
                }
            }
        }
        Command::Serve => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            ttyprobe_lib::channel::serve(&mut bridge, stdin.lock(), stdout.lock())
                .map_err(|e| format!("Channel failed: {}", e))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let result = run(Cli::parse());
    ttyprobe_lib::stop_file_logging();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ttyprobe: {}", e);
            ExitCode::FAILURE
        }
    }
}
