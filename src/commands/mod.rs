pub mod clear;
pub mod list;

use crate::base::{self, BaseInfo};
use crate::cache::{self, CacheKind};
use crate::config::Layout;
use crate::filter::{CompareParameter, CompareType};
use crate::registry;

use anyhow::Result;
use clap::{Args, CommandFactory, error::ErrorKind};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Name filter options shared by `list` and `clear`.
#[derive(Args, Debug)]
#[command(next_help_heading = "Name filter")]
pub struct NameArgs {
    /// Filter bases by name
    #[arg(long)]
    name: Option<String>,

    /// Treat --name as a regular expression
    #[arg(long)]
    regexp: bool,

    /// Ignore case when comparing names
    #[arg(long)]
    ignore_case: bool,

    /// How --name is compared with base names
    #[arg(long, value_enum, default_value_t = CompareType::Any)]
    compare_type: CompareType,
}

impl NameArgs {
    /// Compile the name filter, if one was given.
    ///
    /// An empty `--name` is treated as absent. An invalid regular expression
    /// is reported as a usage error.
    pub fn compile(&self) -> Result<Option<CompareParameter>, clap::Error> {
        let Some(pattern) = self.name.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(None);
        };

        CompareParameter::new(pattern, self.regexp, self.compare_type, self.ignore_case)
            .map(Some)
            .map_err(|err| {
                crate::Cli::command().error(
                    ErrorKind::ValueValidation,
                    format!("Error parsing regexp {pattern}: {err}"),
                )
            })
    }
}

/// Resolve `--cache` / `--no-cache` style flag pairs into a tri-state.
pub(crate) fn tri_state(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Read registrations, scan both cache locations and join them.
pub fn load_bases(layout: &Layout) -> Result<Vec<BaseInfo>> {
    let registrations = registry::load_all(&layout.registry_file(), &layout.start_config_file())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")?.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.set_message(format!("{}", "Scanning caches...".cyan().bold()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let roaming = cache::scan(&layout.roaming_cache_roots(), CacheKind::Roaming);
    let local = cache::scan(&layout.local_cache_roots(), CacheKind::Local);
    spinner.finish_and_clear();
    let (roaming, local) = (roaming?, local?);

    let bases = base::merge(&registrations, &roaming, &local);
    tracing::info!(
        registered = registrations.len(),
        roaming = roaming.len(),
        local = local.len(),
        total = bases.len(),
        "loaded bases"
    );
    Ok(bases)
}
