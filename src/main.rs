//! iommu-groups - list IOMMU groups and the PCI devices in them.
//!
//! Devices that share an IOMMU group can only be passed through to a virtual
//! machine together. This tool walks the host's PCI devices (sysfs, or the
//! udev database when built with the `udev` feature), groups them, and prints
//! the result as plain text or JSON.

mod bounded;
mod buffer;
mod cli;
#[macro_use]
mod debug;
mod error;
mod fields;
mod io;
mod iommu;
mod json;
mod output;
mod pci;
mod print;
mod sort;
mod source;

use cli::{Invocation, SourceKind, print_help, print_version};
use error::Result;
use iommu::GroupTable;
use source::sysfs::SysfsSource;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let inv = match Invocation::parse() {
        Ok(inv) => inv,
        Err((program, e)) => {
            report(&program, &e);
            return 1;
        }
    };
    let opts = &inv.options;

    debug::set_enabled(opts.debug);
    dbg_print!("{} {} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    dbg_print!("source: {}, style: {:?}", opts.source.name(), opts.style);

    let result = if opts.help {
        print_help(&inv.program)
    } else if opts.version {
        print_version()
    } else {
        read_groups(opts).and_then(|table| output::print_table(&table, opts.style, opts.pretty))
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            report(&inv.program, &e);
            1
        }
    }
}

/// Discover with the selected backend and sort.
fn read_groups(opts: &cli::Options) -> Result<GroupTable> {
    let mut table = match opts.source {
        SourceKind::Sysfs => iommu::discover(SysfsSource::new(opts.sysfs_root()))?,
        #[cfg(feature = "udev")]
        SourceKind::Udev => iommu::discover(source::udev::UdevSource)?,
    };
    if table.is_empty() {
        dbg_print!("no IOMMU groups found; is the IOMMU enabled?");
    }
    table.sort()?;
    Ok(table)
}

fn report(program: &str, e: &error::Error) {
    print::eprintln(&format!("error: {}", e));
    print::eprintln(&format!("Try '{} --help' for more information.", program));
}
