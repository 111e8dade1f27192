pub mod config;
pub mod coordinator;
pub mod error;
pub mod poller;
pub mod provider;
pub mod reading;

use crate::config::{Config, ProviderKind};
use crate::coordinator::Coordinator;
use crate::provider::eaudupic::EauDuPic;
use crate::provider::saur::Saur;
use crate::provider::ProviderAdapter;
use log::{error, info};
use std::path::{Path, PathBuf};

pub fn run() -> Result<(), String> {
    // 1) Load config, pick the provider adapter
    let cfg = Config::from_env()?;
    let adapter: Box<dyn ProviderAdapter> = match cfg.provider {
        ProviderKind::EauDuPic => Box::new(EauDuPic::new(cfg.email.clone(), cfg.password.clone())),
        ProviderKind::Saur => Box::new(Saur::new(cfg.email.clone(), cfg.password.clone())),
    };
    let interval = cfg.poll_interval.unwrap_or_else(|| adapter.default_poll_interval());
    info!(
        "Config loaded (provider={}, poll_interval={}s)",
        adapter.name(),
        interval.as_secs()
    );

    // 2) First refresh is blocking; a failure here aborts startup so the
    //    poll loop never runs without data.
    let mut coordinator =
        Coordinator::start(adapter).map_err(|e| format!("initial refresh failed, not starting: {}", e))?;
    if let (Some(value), Some((start, end))) = (coordinator.value(), coordinator.period()) {
        info!(
            "{}: initial reading {} m3 over {}..{}",
            coordinator.provider_name(),
            value,
            start,
            end
        );
    }

    // 3) Poll forever on a steady cadence
    poller::run_loop(&mut coordinator, interval);
    Ok(())
}

fn configure_env_from_cli() -> Result<Option<PathBuf>, String> {
    let mut args = std::env::args_os().skip(1);
    let mut env_file: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let Some(s) = arg.to_str() else {
            return Err("argument contains invalid UTF-8".to_string());
        };
        if s == "--env-file" {
            if env_file.is_some() {
                return Err("`--env-file` provided more than once".to_string());
            }
            let value = args
                .next()
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
            env_file = Some(PathBuf::from(value));
        } else if let Some(path_str) = s.strip_prefix("--env-file=") {
            if env_file.is_some() {
                return Err("`--env-file` provided more than once".to_string());
            }
            if path_str.is_empty() {
                return Err("`--env-file` requires a path argument".to_string());
            }
            env_file = Some(PathBuf::from(path_str));
        } else {
            return Err(format!("unrecognised argument: {}", s));
        }
    }

    match env_file {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            load_env_file(&path)?;
            Ok(Some(path))
        }
        None => {
            let default_path = PathBuf::from(".env");
            if default_path.is_file() {
                load_env_file(&default_path)?;
                Ok(Some(default_path))
            } else {
                Ok(None)
            }
        }
    }
}

fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(format!("{}:{}: missing '=' in assignment", path.display(), index + 1));
        };
        let key = key.trim();
        if key.is_empty() || key.chars().any(|c| c.is_whitespace()) {
            return Err(format!(
                "{}:{}: invalid environment variable name {:?}",
                path.display(),
                index + 1,
                key
            ));
        }
        let value = unquote(value.trim());
        // Values already supplied via the process environment win.
        if std::env::var_os(key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

fn main() {
    let loaded_env = match configure_env_from_cli() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = loaded_env.as_ref() {
        info!("Environment loaded from {}", path.display());
    }

    info!(
        "aquapoll {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
