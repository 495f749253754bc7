use chrono::{format::DelayedFormat, DateTime, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;
use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("dip_watcher"));

/// 以背景執行緒寫入日誌檔的記錄器
///
/// 呼叫端只負責把訊息丟進 channel，實際的檔案 I/O 由另一個線程批次處理，
/// 掃描流程不會因為寫檔而被卡住。
pub struct Logger {
    writer: Option<Sender<LogMessage>>,
}

impl Logger {
    fn new(log_name: &str) -> Self {
        let log_path = match Self::get_log_path(log_name) {
            Some(path) => path,
            None => {
                error_console("Failed to create log directory, falling back to console".to_string());
                return Logger { writer: None };
            }
        };
        let (tx, rx) = unbounded::<LogMessage>();

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
            {
                Ok(file) => file,
                Err(why) => {
                    error_console(format!("Failed to open log file {:?}: {}", log_path, why));
                    while let Ok(received) = rx.recv() {
                        received.to_console();
                    }
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(4096);

            while let Ok(received) = rx.recv() {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 4096 {
                    if writer.write_all(line.as_bytes()).is_err() || writer.flush().is_err() {
                        info_console(line.clone())
                    }

                    line.clear();
                }
            }
        });

        Logger { writer: Some(tx) }
    }

    fn send(&self, level: log::Level, msg: String) {
        let message = LogMessage::new(level, msg);
        match &self.writer {
            Some(writer) => {
                if let Err(why) = writer.send(message) {
                    why.into_inner().to_console();
                }
            }
            None => message.to_console(),
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new("log");

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", name, Local::now().format("%Y-%m-%d")));

        Some(log_path)
    }
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }

    fn to_console(&self) {
        println!(
            "{} {} {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S.%3f"),
            self.level,
            self.msg
        );
    }
}

pub fn info_file_async(log: String) {
    LOGGER.send(log::Level::Info, log);
}

pub fn warn_file_async(log: String) {
    LOGGER.send(log::Level::Warn, log);
}

pub fn error_file_async(log: String) {
    LOGGER.send(log::Level::Error, log);
}

pub fn debug_file_async(log: String) {
    LOGGER.send(log::Level::Debug, log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
