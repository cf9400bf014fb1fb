//! Command-line argument parsing.
//!
//! Hand-rolled: a handful of flags, two of which take a value. The parser
//! works over any iterator of strings so tests don't need a process.

use std::env;

use crate::debug::DEBUG_ENV;
use crate::error::{Error, Result};
use crate::output::Style;
use crate::print;
use crate::source::sysfs::PCI_SYSFS_PATH;

/// Discovery backend, chosen with `--source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Sysfs,
    #[cfg(feature = "udev")]
    Udev,
}

impl SourceKind {
    /// Backends compiled into this binary.
    pub const COMPILED: &'static [SourceKind] = &[
        SourceKind::Sysfs,
        #[cfg(feature = "udev")]
        SourceKind::Udev,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Sysfs => "sysfs",
            #[cfg(feature = "udev")]
            SourceKind::Udev => "udev",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::COMPILED.iter().copied().find(|k| k.name() == name)
    }
}

impl Default for SourceKind {
    /// The device database when we have it, sysfs otherwise.
    fn default() -> Self {
        #[cfg(feature = "udev")]
        return SourceKind::Udev;
        #[cfg(not(feature = "udev"))]
        return SourceKind::Sysfs;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub style: Style,
    pub source: SourceKind,
    /// Override for the sysfs PCI device directory
    pub sysfs_root: Option<String>,
    /// Indented JSON instead of one line
    pub pretty: bool,
    /// Debug mode - show skipped devices and failed reads
    pub debug: bool,
    pub help: bool,
    pub version: bool,
}

impl Options {
    pub fn sysfs_root(&self) -> &str {
        self.sysfs_root.as_deref().unwrap_or(PCI_SYSFS_PATH)
    }
}

/// The parsed command-line invocation.
#[derive(Debug)]
pub struct Invocation {
    /// argv[0], for usage messages
    pub program: String,
    pub options: Options,
}

impl Invocation {
    /// Parse a full argv, program name first.
    ///
    /// A help request wins over anything else on the line: `--help --bogus`
    /// prints help instead of complaining about `--bogus`.
    pub fn parse_from<I, S>(args: I) -> (String, Result<Options>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let program = args
            .next()
            .map(|s| s.as_ref().to_string())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        let rest: Vec<String> = args.map(|s| s.as_ref().to_string()).collect();

        let options = match parse_options(&rest) {
            Err(_) if rest.iter().any(|a| asks_for_help(a)) => Ok(Options {
                help: true,
                ..Options::default()
            }),
            result => result,
        };
        (program, options)
    }

    /// Parse the process arguments. On error, returns the program name too so
    /// the caller can point at `--help`.
    pub fn parse() -> core::result::Result<Self, (String, Error)> {
        let (program, options) = Self::parse_from(env::args());
        match options {
            Ok(mut options) => {
                if env::var_os(DEBUG_ENV).is_some() {
                    options.debug = true;
                }
                Ok(Invocation { program, options })
            }
            Err(e) => Err((program, e)),
        }
    }
}

/// `-h`, `--help`, or a short-flag combo containing `h`.
fn asks_for_help(arg: &str) -> bool {
    match arg {
        "--help" => true,
        s if s.starts_with('-') && !s.starts_with("--") => s[1..].contains('h'),
        _ => false,
    }
}

/// Long flags that take no value, so `--flag=value` is an error.
const SWITCHES: &[&str] = &["--json", "--pretty", "--debug", "--help", "--version"];

fn parse_options(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        let arg = arg.as_str();

        // --flag=value
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg, None),
        };
        if inline.is_some() && SWITCHES.contains(&flag) {
            return Err(Error::InvalidArgument(format!(
                "option '{}' doesn't take a value",
                flag
            )));
        }
        let mut value = |name: &str| -> Result<String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args
                    .next()
                    .cloned()
                    .ok_or_else(|| Error::InvalidArgument(format!("option '{}' needs a value", name))),
            }
        };

        match flag {
            "-s" | "--style" => {
                let name = value("--style")?;
                opts.style = Style::from_name(&name)
                    .ok_or_else(|| Error::InvalidArgument(format!("invalid style '{}'", name)))?;
            }
            "--source" => {
                let name = value("--source")?;
                opts.source = SourceKind::from_name(&name).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "invalid source '{}' (compiled in: {})",
                        name,
                        compiled_sources()
                    ))
                })?;
            }
            "--sysfs-root" => opts.sysfs_root = Some(value("--sysfs-root")?),
            "-j" | "--json" => opts.style = Style::Json,
            "-p" | "--pretty" => opts.pretty = true,
            "-D" | "--debug" => opts.debug = true,
            "-h" | "--help" => opts.help = true,
            "-V" | "--version" => opts.version = true,

            // Combo flags like -jD
            s if s.starts_with('-') && !s.starts_with("--") && s.len() > 2 => {
                for c in s[1..].chars() {
                    match c {
                        'j' => opts.style = Style::Json,
                        'p' => opts.pretty = true,
                        'D' => opts.debug = true,
                        'h' => opts.help = true,
                        'V' => opts.version = true,
                        _ => return Err(Error::InvalidArgument(format!("unknown option '-{}'", c))),
                    }
                }
            }

            _ if flag.starts_with('-') => {
                return Err(Error::InvalidArgument(format!("unknown option '{}'", flag)));
            }
            _ => {
                return Err(Error::InvalidArgument(format!("unexpected argument '{}'", arg)));
            }
        }
    }

    Ok(opts)
}

fn compiled_sources() -> String {
    SourceKind::COMPILED
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The main help text, without a trailing newline.
///
/// Lists only the discovery backends that are compiled in.
pub fn help_text(program: &str) -> String {
    let mut text = format!(
        concat!(
            "Usage: {} [OPTIONS]\n\n",
            "Lists IOMMU groups and their associated PCI devices.\n",
            "Discovery backends: {} (default: {})\n\n",
        ),
        program,
        compiled_sources(),
        SourceKind::default().name()
    );
    text.push_str(concat!(
        "OPTIONS:\n",
        "    -s, --style <style>    Output style (plain|json), default plain\n",
        "    -j, --json             Same as --style json\n",
        "    -p, --pretty           Indent JSON output\n",
        "        --source <name>    Discovery backend\n",
        "        --sysfs-root <dir> PCI device directory for the sysfs backend\n",
        "                           (default /sys/bus/pci/devices)\n",
        "    -D, --debug            Show skipped devices and failed reads\n",
        "    -h, --help             Show this help\n",
        "    -V, --version          Show version and compiled backends\n",
        "\n",
        "ENVIRONMENT:\n",
        "    IOMMU_GROUPS_DEBUG=1   Enable debug mode (same as -D)\n",
        "\n",
        "EXIT CODES:\n",
        "    0    Success\n",
        "    1    Error (bad arguments, enumeration failure, table full,\n",
        "         output could not be written)",
    ));
    text
}

pub fn print_help(program: &str) -> Result<()> {
    print::println(help_text(program).as_bytes())
}

/// Version line plus the compiled backends.
pub fn version_text() -> String {
    format!(
        "{} {}\nbackends: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        compiled_sources()
    )
}

pub fn print_version() -> Result<()> {
    print::println(version_text().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        let mut argv = vec!["iommu-groups"];
        argv.extend_from_slice(args);
        Invocation::parse_from(argv).1
    }

    mod options_tests {
        use super::*;

        #[test]
        fn defaults() {
            let opts = parse(&[]).unwrap();
            assert_eq!(opts.style, Style::Plain);
            assert_eq!(opts.source, SourceKind::default());
            assert_eq!(opts.sysfs_root(), "/sys/bus/pci/devices");
            assert!(!opts.debug);
            assert!(!opts.help);
        }

        #[test]
        fn style_separate_value() {
            assert_eq!(parse(&["--style", "json"]).unwrap().style, Style::Json);
            assert_eq!(parse(&["-s", "plain"]).unwrap().style, Style::Plain);
        }

        #[test]
        fn style_inline_value() {
            assert_eq!(parse(&["--style=json"]).unwrap().style, Style::Json);
        }

        #[test]
        fn json_shorthand() {
            assert_eq!(parse(&["-j"]).unwrap().style, Style::Json);
        }

        #[test]
        fn invalid_style() {
            let err = parse(&["--style", "xml"]).unwrap_err();
            assert_eq!(err.to_string(), "invalid style 'xml'");
        }

        #[test]
        fn missing_value() {
            assert!(matches!(parse(&["--style"]), Err(Error::InvalidArgument(_))));
        }

        #[test]
        fn sysfs_source_and_root() {
            let opts = parse(&["--source", "sysfs", "--sysfs-root", "/tmp/pci"]).unwrap();
            assert_eq!(opts.source, SourceKind::Sysfs);
            assert_eq!(opts.sysfs_root(), "/tmp/pci");
        }

        #[test]
        fn unknown_source() {
            assert!(parse(&["--source", "acpi"]).is_err());
        }

        #[test]
        fn combined_short_flags() {
            let opts = parse(&["-jD"]).unwrap();
            assert_eq!(opts.style, Style::Json);
            assert!(opts.debug);
        }

        #[test]
        fn help_and_version() {
            assert!(parse(&["-h"]).unwrap().help);
            assert!(parse(&["--help"]).unwrap().help);
            assert!(parse(&["-V"]).unwrap().version);
        }

        #[test]
        fn pretty_flag() {
            assert!(!parse(&[]).unwrap().pretty);
            assert!(parse(&["--pretty"]).unwrap().pretty);
            let opts = parse(&["-jp"]).unwrap();
            assert_eq!(opts.style, Style::Json);
            assert!(opts.pretty);
        }

        #[test]
        fn switches_reject_inline_values() {
            for arg in ["--debug=0", "--json=no", "--pretty=1", "--version=2"] {
                let err = parse(&[arg]).unwrap_err();
                assert!(matches!(err, Error::InvalidArgument(_)), "{}", arg);
                assert!(err.to_string().contains("doesn't take a value"), "{}", err);
            }
            // Value-taking flags still accept one
            assert_eq!(parse(&["--source=sysfs"]).unwrap().source, SourceKind::Sysfs);
        }

        #[test]
        fn help_wins_over_bad_arguments() {
            assert!(parse(&["--help", "--bogus"]).unwrap().help);
            assert!(parse(&["--bogus", "-h"]).unwrap().help);
            assert!(parse(&["--style", "xml", "-jh"]).unwrap().help);
            assert!(parse(&["--bogus", "--helpful"]).is_err());
        }

        #[test]
        fn unknown_flags_and_arguments() {
            assert!(parse(&["--verbose"]).is_err());
            assert!(parse(&["-jx"]).is_err());
            assert!(parse(&["pci"]).is_err());
        }
    }

    mod invocation_tests {
        use super::*;

        #[test]
        fn program_name() {
            let (program, _) = Invocation::parse_from(["/usr/bin/iommu-groups", "-j"]);
            assert_eq!(program, "/usr/bin/iommu-groups");
        }

        #[test]
        fn empty_argv() {
            let (program, opts) = Invocation::parse_from(Vec::<String>::new());
            assert_eq!(program, "iommu-groups");
            assert!(opts.is_ok());
        }
    }

    mod text_tests {
        use super::*;

        #[test]
        fn help_lists_flags_and_backends() {
            let text = help_text("iommu-groups");
            assert!(text.starts_with("Usage: iommu-groups [OPTIONS]\n"));
            assert!(text.contains("--pretty"));
            assert!(text.contains(&compiled_sources()));
            assert!(!text.ends_with('\n'));
        }

        #[test]
        fn version_has_two_lines() {
            let text = version_text();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.len(), 2);
            assert!(lines[0].ends_with(env!("CARGO_PKG_VERSION")));
            assert!(lines[1].starts_with("backends: sysfs"));
        }
    }

    #[test]
    fn source_names_round_trip() {
        for kind in SourceKind::COMPILED {
            assert_eq!(SourceKind::from_name(kind.name()), Some(*kind));
        }
    }
}
