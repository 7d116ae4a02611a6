use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceRecord, Identity};
use rollcall_hw::Camera;
use std::time::Duration;

mod render;

// `#[zbus::proxy]` generates `AttendanceProxy` (async) and `AttendanceProxyBlocking`.
#[zbus::proxy(
    interface = "org.rollcall.Attendance1",
    default_service = "org.rollcall.Attendance1",
    default_path = "/org/rollcall/Attendance1"
)]
trait Attendance {
    async fn status(&self) -> zbus::Result<String>;
    async fn roster(&self) -> zbus::Result<String>;
    async fn identities(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall face-recognition attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon status
    Status,
    /// Show who has been marked present
    Roster {
        /// Keep refreshing the roster every second
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the identity table
    Users,
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status => {
            let proxy = connect().await?;
            let status: render::Status = fetch(proxy.status().await)?;
            print!("{}", render::status(&status));
        }
        Commands::Roster { watch } => {
            let proxy = connect().await?;
            loop {
                let records: Vec<AttendanceRecord> = fetch(proxy.roster().await)?;
                if watch {
                    // Clear screen and home the cursor.
                    print!("\x1b[2J\x1b[H");
                }
                print!("{}", render::roster(&records));
                if !watch {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        Commands::Users => {
            let proxy = connect().await?;
            let identities: Vec<Identity> = fetch(proxy.identities().await)?;
            print!("{}", render::users(&identities));
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}

async fn connect() -> Result<AttendanceProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("failed to connect to the session bus")?;
    Ok(AttendanceProxy::new(&conn).await?)
}

fn fetch<T: serde::de::DeserializeOwned>(reply: zbus::Result<String>) -> Result<T> {
    let json = reply.context("rollcalld not reachable (is the daemon running?)")?;
    tracing::debug!(bytes = json.len(), "reply received");
    serde_json::from_str(&json).context("unexpected reply from rollcalld")
}
