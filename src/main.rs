use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use agentchat::agent::{handle_chat, service_info, ChatOutcome, ChatRequest, ReplyService};
use agentchat::config::{ServiceSettings, DEFAULT_CONFIG_PATH};
use anyhow::{bail, Context, Result};
use log::{debug, warn};

/// 命令列參數。
struct CliArgs {
    config_path: PathBuf,
    info: bool,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            info: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let Some(path) = args.next() else {
                        bail!("--config 需要指定設定檔路徑");
                    };
                    parsed.config_path = PathBuf::from(path);
                }
                "--info" => parsed.info = true,
                "--help" | "-h" => {
                    println!("usage: agentchat [--config <path>] [--info] < request.json");
                    std::process::exit(0);
                }
                other => bail!("未知的參數: {other}"),
            }
        }
        Ok(parsed)
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CliArgs::parse(env::args().skip(1))?;
    let settings = ServiceSettings::load(&args.config_path)?;
    init_logging(&settings.log_level);
    debug!("已載入設定: {}", args.config_path.display());

    if args.info {
        println!("{}", serde_json::to_string_pretty(&service_info())?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("讀取標準輸入失敗")?;

    let service = ReplyService::from_settings(&settings)?;
    let outcome = match serde_json::from_str::<ChatRequest>(&raw) {
        Ok(request) => handle_chat(&service, request).await,
        Err(err) => {
            warn!("無法解析聊天請求: {err}");
            ChatOutcome::invalid_body(err.to_string())
        }
    };

    println!("{}", serde_json::to_string(&outcome.body)?);
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
