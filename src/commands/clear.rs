use crate::base::BaseInfo;
use crate::cache::CacheKind;
use crate::commands::{NameArgs, load_bases};
use crate::config::Layout;
use crate::filter::BaseFilter;
use crate::output::format_size;

use anyhow::Result;
use clap::{ArgGroup, Args};
use colored::Colorize;
use std::fs;
use std::io::{self, Write};

/// Arguments for the `bases1c clear` subcommand.
///
/// At least one selector (`--id`, `--name` or `--no-base`) must be given.
/// `--id` without values and an empty `--name` satisfy it but filter nothing,
/// so every cache found is deleted, registered bases included.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selector")
        .required(true)
        .multiple(true)
        .args(["id", "name", "no_base"])
))]
pub struct ClearArgs {
    /// Clear the local cache (default)
    #[arg(long, overrides_with = "no_local")]
    local: bool,

    /// Keep the local cache
    #[arg(long, overrides_with = "local")]
    no_local: bool,

    /// Clear the roaming cache (default)
    #[arg(long, overrides_with = "no_roaming")]
    roaming: bool,

    /// Keep the roaming cache
    #[arg(long, overrides_with = "roaming")]
    no_roaming: bool,

    /// Filter bases by IDs
    #[arg(long, num_args = 0..)]
    id: Option<Vec<String>>,

    /// Only bases not registered in ibases.v8i
    #[arg(long)]
    no_base: bool,

    /// Show what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    name: NameArgs,
}

impl ClearArgs {
    fn kinds(&self) -> Vec<CacheKind> {
        let mut kinds = Vec::new();
        if !self.no_local {
            kinds.push(CacheKind::Local);
        }
        if !self.no_roaming {
            kinds.push(CacheKind::Roaming);
        }
        kinds
    }
}

/// Outcome of a [`clear_caches`] pass.
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub removed: usize,
    pub failed: usize,
    pub freed: u64,
}

/// Runs the `clear` command.
pub fn run(args: ClearArgs, layout: &Layout) -> Result<()> {
    let name = args.name.compile().unwrap_or_else(|err| err.exit());
    let filter = BaseFilter {
        ids: args.id.clone().unwrap_or_default(),
        name,
        cache: None,
        base: None,
        unregistered_only: args.no_base,
    };

    let bases = load_bases(layout)?;
    let selected: Vec<&BaseInfo> = bases.iter().filter(|base| filter.matches(base)).collect();

    let stdout = io::stdout();
    let summary = clear_caches(&mut stdout.lock(), &selected, &args.kinds(), args.dry_run)?;
    tracing::info!(
        removed = summary.removed,
        failed = summary.failed,
        freed = %format_size(summary.freed),
        "clear finished"
    );
    Ok(())
}

/// Delete the selected cache folders of each base, reporting progress to `out`.
///
/// A folder that fails to delete is reported and skipped; only errors writing
/// to `out` abort the pass.
pub fn clear_caches<W: Write>(
    out: &mut W,
    bases: &[&BaseInfo],
    kinds: &[CacheKind],
    dry_run: bool,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for base in bases {
        for &kind in kinds {
            let (path, size) = match kind {
                CacheKind::Local => (base.local_path(), base.local_size()),
                CacheKind::Roaming => (base.roaming_path(), base.roaming_size()),
            };
            let Some(path) = path.filter(|p| p.is_dir()) else {
                continue;
            };

            if dry_run {
                writeln!(out, "Would delete dir {}", path.display())?;
                continue;
            }

            write!(out, "Delete dir {}...", path.display())?;
            out.flush()?;
            match fs::remove_dir_all(path) {
                Ok(()) => {
                    writeln!(out, " - {}", "Ok!".green().bold())?;
                    tracing::debug!(%kind, id = base.id(), path = %path.display(), "deleted cache");
                    summary.removed += 1;
                    summary.freed += size;
                }
                Err(err) => {
                    writeln!(out, " - {}", "Error!".red().bold())?;
                    writeln!(out, "{err}")?;
                    tracing::warn!(%kind, id = base.id(), path = %path.display(), error = %err, "failed to delete cache");
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}
