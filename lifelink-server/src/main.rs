//! LifeLink 献血者终端

mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{parse_input, ConsoleInput, ConsoleRenderer};
use lifelink_admin::{ConfigManager, LifelinkConfig, StorageBackend};
use lifelink_core::{BloodGroup, DonorProfile};
use lifelink_matching::{
    AcceptOutcome, Availability, DashboardCommand, DashboardSettings, DonorDashboard,
};
use lifelink_storage::{FileStore, KeyValueStore, MemoryStore, ProfileResolver, RequestRepository};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// 献血者终端命令行参数
#[derive(Parser, Debug)]
#[command(name = "lifelink-donor")]
#[command(about = "LifeLink 献血者仪表盘：查看附近的用血请求并接受")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 数据目录，覆盖配置文件中的 storage.data_dir
    #[arg(short, long, global = true)]
    data_dir: Option<String>,

    /// 日志级别，覆盖配置文件中的 logging.level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 持续轮询并显示提醒（默认）
    Watch {
        /// 以离线状态启动
        #[arg(long)]
        offline: bool,
    },
    /// 刷新一次并退出
    List,
    /// 接受指定请求
    Accept {
        request_id: String,
    },
    /// 保存献血者会话
    SignIn {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        blood_group: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
    },
    /// 清除献血者会话
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::load(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }

    // 日志写到 stderr，stdout 留给仪表盘
    let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(level.as_str())
        .with_writer(std::io::stderr)
        .init();

    let store = build_store(&config);
    let resolver = ProfileResolver::new(
        store.clone(),
        config.storage.session_key.clone(),
        config.fallback_profile.to_profile(),
    );

    let command = args.command.unwrap_or(Command::Watch { offline: false });
    match command {
        Command::SignIn {
            id,
            name,
            blood_group,
            lat,
            lng,
        } => {
            let profile = DonorProfile {
                id,
                name,
                blood_group: BloodGroup::new(blood_group),
                lat,
                lng,
            };
            resolver.sign_in(&profile).await?;
            println!("Signed in as {} ({})", profile.name, profile.id);
            return Ok(());
        }
        Command::Logout => {
            resolver.logout().await?;
            println!("Logged out");
            return Ok(());
        }
        _ => {}
    }

    let profile = resolver.resolve().await.context("failed to resolve donor session")?;
    let repository = RequestRepository::new(store, config.storage.requests_key.clone())
        .with_default_hospital(config.matching.default_hospital);
    let settings = DashboardSettings {
        poll_interval: config.poll_interval(),
        radius_km: config.matching.radius_km,
        default_hospital_name: config.matching.default_hospital_name.clone(),
        max_accept_attempts: config.storage.max_accept_attempts,
    };

    let renderer = Arc::new(ConsoleRenderer::new(profile.clone()));
    renderer.print_header();

    match command {
        Command::List => {
            let mut dashboard =
                DonorDashboard::new(profile, repository, renderer, Availability::new(true), settings);
            dashboard.tick().await?;
        }
        Command::Accept { request_id } => {
            let mut dashboard =
                DonorDashboard::new(profile, repository, renderer, Availability::new(true), settings);
            if dashboard.accept(&request_id).await? == AcceptOutcome::NotFound {
                println!("No request with id {}", request_id);
            }
        }
        Command::Watch { offline } => {
            let availability = Availability::new(config.poll.start_available && !offline);
            let mut dashboard =
                DonorDashboard::new(profile, repository, renderer, availability.clone(), settings);

            let (tx, rx) = mpsc::channel(16);
            spawn_input_reader(std::io::BufReader::new(std::io::stdin()), tx, availability);

            println!("Commands: accept <id> | refresh | online | offline | toggle (Ctrl-C to quit)");
            dashboard
                .run(rx, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
        }
        Command::SignIn { .. } | Command::Logout => {}
    }

    Ok(())
}

fn build_store(config: &LifelinkConfig) -> Arc<dyn KeyValueStore> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage, requests are not shared with other processes");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            info!("Using file storage at {}", config.storage.data_dir);
            Arc::new(FileStore::new(&config.storage.data_dir))
        }
    }
}

/// 在独立线程上读取终端输入
///
/// 阻塞读取不占用运行时线程，Ctrl-C 后进程无需等待下一行输入即可退出。
fn spawn_input_reader<R>(
    reader: R,
    tx: mpsc::Sender<DashboardCommand>,
    availability: Availability,
) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };

            let command = match parse_input(&line) {
                ConsoleInput::Dashboard(command) => command,
                ConsoleInput::SetAvailable(available) => {
                    availability.set_available(available);
                    DashboardCommand::Refresh
                }
                ConsoleInput::ToggleAvailability => {
                    availability.toggle();
                    DashboardCommand::Refresh
                }
                ConsoleInput::Empty => continue,
                ConsoleInput::Unknown(input) => {
                    println!("Unknown command: {}", input);
                    continue;
                }
            };

            if tx.blocking_send(command).is_err() {
                break;
            }
        }
    })
}
