use crate::base::{self, BaseInfo, Field};
use crate::commands::{NameArgs, load_bases, tri_state};
use crate::config::Layout;
use crate::filter::BaseFilter;
use crate::output::{Table, unescape};

use anyhow::Result;
use clap::Args;
use std::io::{self, Write};

/// Arguments for the `bases1c list` subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Fields to show, empty parameter to show all fields
    #[arg(long, value_enum, num_args = 0.., default_values_t = [Field::Id, Field::Name])]
    fields: Vec<Field>,

    /// Fields to sort the list by, empty parameter to cancel sorting
    #[arg(long, value_enum, num_args = 0.., default_values_t = [Field::Name])]
    order: Vec<Field>,

    /// Field delimiter, backslash escapes like \t are decoded
    #[arg(long, default_value = ";", allow_hyphen_values = true)]
    delimiter: String,

    /// Quote used around values containing the delimiter
    #[arg(long, default_value = "\"")]
    quote: String,

    /// Show sizes as KB/MB/GB
    #[arg(short = 'H', long)]
    human_readable: bool,

    /// Filter bases by IDs
    #[arg(long, num_args = 0..)]
    id: Option<Vec<String>>,

    /// Only bases with a disk cache
    #[arg(long, overrides_with = "no_cache")]
    cache: bool,

    /// Only bases without a disk cache
    #[arg(long, overrides_with = "cache")]
    no_cache: bool,

    /// Only bases registered in ibases.v8i
    #[arg(long, overrides_with = "no_base")]
    base: bool,

    /// Only bases not registered in ibases.v8i
    #[arg(long, overrides_with = "base")]
    no_base: bool,

    #[command(flatten)]
    name: NameArgs,
}

impl ListArgs {
    fn table(&self) -> Table {
        let fields = if self.fields.is_empty() {
            Field::ALL.to_vec()
        } else {
            self.fields.clone()
        };
        Table {
            fields,
            delimiter: unescape(&self.delimiter),
            quote: self.quote.clone(),
            human_readable: self.human_readable,
        }
    }
}

/// Runs the `list` command.
///
/// Prints a header row followed by one row per matching base to stdout.
pub fn run(args: ListArgs, layout: &Layout) -> Result<()> {
    let name = args.name.compile().unwrap_or_else(|err| err.exit());
    let filter = BaseFilter {
        ids: args.id.clone().unwrap_or_default(),
        name,
        cache: tri_state(args.cache, args.no_cache),
        base: tri_state(args.base, args.no_base),
        unregistered_only: false,
    };

    let mut bases = load_bases(layout)?;
    let stdout = io::stdout();
    write_list(&mut stdout.lock(), &mut bases, &args.order, &filter, &args.table())
}

/// Sort, filter and print `bases`.
pub fn write_list<W: Write>(
    out: &mut W,
    bases: &mut [BaseInfo],
    order: &[Field],
    filter: &BaseFilter,
    table: &Table,
) -> Result<()> {
    if !order.is_empty() {
        base::sort_by_fields(bases, order);
    }

    writeln!(out, "{}", table.header())?;
    for base in bases.iter().filter(|base| filter.matches(base)) {
        writeln!(out, "{}", table.row(base))?;
    }
    Ok(())
}
