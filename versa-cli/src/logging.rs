//! Настройка tracing для CLI.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Крейты, чей уровень поднимает `-v`.
const OWN_TARGETS: [&str; 2] = ["versa_client", "versa_cli"];

/// Директива фильтра: базовый уровень плюс подъём своих крейтов.
///
/// `-v` включает debug для клиента и CLI, `-vv` и дальше — trace. Чужие
/// крейты (reqwest, hyper) остаются на базовом уровне.
pub fn filter_directive(base: &str, verbose: u8) -> String {
    let base = match base.trim() {
        "" => "warn",
        level => level,
    };
    let own_level = match verbose {
        0 => return base.to_string(),
        1 => "debug",
        _ => "trace",
    };

    OWN_TARGETS
        .iter()
        .fold(base.to_string(), |directive, target| {
            format!("{directive},{target}={own_level}")
        })
}

/// `RUST_LOG` перекрывает и `LOG_LEVEL`, и `-v`.
///
/// Логи идут в stderr, stdout остаётся под вывод команд.
pub fn init_logging(default_level: &str, verbose: u8) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(default_level, verbose))
            .map_err(|e| anyhow!("некорректный уровень логирования {default_level:?}: {e}"))?,
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .with_file(verbose > 1)
        .with_line_number(verbose > 1)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}
