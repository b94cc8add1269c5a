use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use log::info;

use ringring_core::backend::{run_call_backend, LoggingBackend};
use ringring_core::bridge::{run_bridge, StateBridge};
use ringring_core::config;
use ringring_core::dialer::run_dialer;
use ringring_core::hook::run_hook;
use ringring_core::lines::MemoryLine;
use ringring_core::ringer::run_ringer;
use ringring_core::state::StateStore;
use ringring_core::DEFAULT_SHM_DIR;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub action: Option<DaemonAction>,

    /// Directory holding the shared segment file
    #[arg(long, default_value = DEFAULT_SHM_DIR)]
    pub shm_dir: PathBuf,

    /// Path of the provisioning-owned config file
    #[arg(long, default_value = "ringring.conf")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

pub async fn run(args: DaemonArgs) {
    match args.action {
        None => start(args.shm_dir, args.config).await,
        Some(DaemonAction::Stop) => stop_daemon(),
        Some(DaemonAction::Status) => daemon_status(),
    }
}

async fn start(shm_dir: PathBuf, config_path: PathBuf) {
    write_pid_file();

    let store = Arc::new(StateStore::new());

    // Line wiring. A pin backend implements the line traits against real
    // GPIO; the in-memory lines keep every worker running without one.
    let click = MemoryLine::new();
    let stop = MemoryLine::new();
    let hook_switch = MemoryLine::new();
    let ring1 = MemoryLine::new();
    let ring2 = MemoryLine::new();

    let bridge = StateBridge::new(store.clone(), &shm_dir);
    println!(
        "ringring daemon running, segment at {}",
        bridge.segment_path().display()
    );

    let mut workers = vec![
        tokio::spawn(run_dialer(store.clone(), click.clone(), stop.clone())),
        tokio::spawn(run_hook(store.clone(), hook_switch.clone())),
        tokio::spawn(run_ringer(store.clone(), ring1.clone(), ring2.clone())),
        tokio::spawn(run_bridge(bridge)),
    ];

    // The call backend only starts consuming dialed sequences once the
    // provisioning service has written a readable config.
    workers.push(tokio::spawn({
        let store = store.clone();
        async move {
            let phone = config::wait_for(&config_path).await;
            info!(
                "provisioned as {} against registrar {}",
                phone.phone_number, phone.sip_ip
            );
            run_call_backend(store, Arc::new(LoggingBackend)).await;
        }
    }));

    shutdown_signal().await;
    println!("\nShutting down...");

    // Cancelling the bridge worker drops the bridge, which releases and
    // removes the shared segment.
    for worker in &workers {
        worker.abort();
    }
    for worker in workers {
        let _ = worker.await;
    }

    remove_pid_file();
}

// ============================================
// PID file management
// ============================================

fn pid_file_path() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".ringring");
    std::fs::create_dir_all(&dir).ok();
    dir.join("ringring.pid")
}

fn write_pid_file() {
    let pid = std::process::id();
    std::fs::write(pid_file_path(), pid.to_string()).ok();
}

fn remove_pid_file() {
    std::fs::remove_file(pid_file_path()).ok();
}

fn read_pid_file() -> Option<u32> {
    std::fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false
}

fn stop_daemon() {
    match read_pid_file() {
        Some(pid) => {
            if !is_process_alive(pid) {
                println!("Daemon is not running (stale PID file for pid {})", pid);
                remove_pid_file();
                return;
            }

            #[cfg(unix)]
            {
                use nix::sys::signal::{self, Signal};
                use nix::unistd::Pid;
                match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    Ok(_) => {
                        println!("Sent SIGTERM to daemon (pid {})", pid);
                        remove_pid_file();
                    }
                    Err(e) => eprintln!("Failed to stop daemon (pid {}): {}", pid, e),
                }
            }

            #[cfg(not(unix))]
            eprintln!("Stop not supported on this platform");
        }
        None => println!("Daemon is not running (no PID file found)"),
    }
}

fn daemon_status() {
    match read_pid_file() {
        Some(pid) => {
            if is_process_alive(pid) {
                println!("Daemon is running (pid {})", pid);
            } else {
                println!("Daemon is not running (stale PID file for pid {})", pid);
                remove_pid_file();
            }
        }
        None => println!("Daemon is not running"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
