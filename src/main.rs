use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod bot;
pub mod cache;
pub mod calculation;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod util;
pub mod web;

use crate::web::AppState;

/// 盤中監看觀察清單，跌幅超過門檻時發出警示
#[derive(Parser, Debug)]
#[command(name = "dip_watcher")]
#[command(about = "Alerts when watched instruments dip during the trading session")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 立即掃描一次並輸出 JSON 結果（預設）
    Scan {
        /// 只掃描，不送出任何推播
        #[arg(long)]
        quiet: bool,
    },
    /// 啟動 HTTP 服務，設定 SCAN_CRON 時一併啟動排程
    Serve {
        /// 覆蓋 HTTP_PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            logging::error_file_async(format!("{:?}", why));
            logging::error_console(format!("{:#}", why));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::App::get()?;
    settings.validate()?;

    let state = Arc::new(AppState::from_settings(&settings)?);

    match cli.command.unwrap_or(Command::Scan { quiet: false }) {
        Command::Scan { quiet } => {
            let result = state.scanner.scan(state.notifier.as_ref(), quiet).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve { port } => {
            let _sched = if settings.system.scan_cron.trim().is_empty() {
                None
            } else {
                Some(scheduler::start(state.clone(), settings.system.scan_cron.trim()).await?)
            };

            logging::info_console(format!(
                "dip_watcher 已啟動\r\nRust OS/Arch: {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ));
            web::serve(state, port.unwrap_or(settings.system.http_port)).await?;
        }
    }

    Ok(())
}
