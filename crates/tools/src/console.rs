use std::str::FromStr;

use railstream_common::SectionIndex;

/// Operator commands. All are read-only or idempotent toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    /// Flip the on-screen performance overlay.
    ToggleOverlay,
    /// Full performance report.
    Report,
    /// List current budget violations.
    CheckBudgets,
    /// Residency and LOD table. With an index, only that section.
    Sections { only: Option<SectionIndex> },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("bad argument `{arg}`; usage: {usage}")]
    BadArgument { arg: String, usage: &'static str },
}

#[derive(Clone, Copy)]
enum Kind {
    Help,
    Overlay,
    Report,
    Check,
    Sections,
}

struct CommandSpec {
    kind: Kind,
    names: &'static [&'static str],
    usage: &'static str,
    help: &'static str,
}

static COMMANDS: [CommandSpec; 5] = [
    CommandSpec {
        kind: Kind::Help,
        names: &["help"],
        usage: "help",
        help: "List commands",
    },
    CommandSpec {
        kind: Kind::Overlay,
        names: &["perf.overlay", "railstream.perf.overlay"],
        usage: "perf.overlay",
        help: "Toggle performance debug overlay",
    },
    CommandSpec {
        kind: Kind::Report,
        names: &["perf.report", "railstream.perf.report"],
        usage: "perf.report",
        help: "Log a full performance report",
    },
    CommandSpec {
        kind: Kind::Check,
        names: &["perf.check_budgets", "railstream.perf.check_budgets"],
        usage: "perf.check_budgets",
        help: "Check and log budget violations",
    },
    CommandSpec {
        kind: Kind::Sections,
        names: &["sections", "railstream.sections"],
        usage: "sections [index]",
        help: "Show residency and LOD of sections",
    },
];

impl ConsoleCommand {
    /// Parse one command line. Names are case-insensitive.
    pub fn parse(line: &str) -> Result<Self, ConsoleError> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ConsoleError::Empty)?.to_ascii_lowercase();
        let entry = COMMANDS
            .iter()
            .find(|c| c.names.contains(&name.as_str()))
            .ok_or_else(|| ConsoleError::Unknown(name.clone()))?;

        let arg = words.next();
        let command = match entry.kind {
            Kind::Help => Self::Help,
            Kind::Overlay => Self::ToggleOverlay,
            Kind::Report => Self::Report,
            Kind::Check => Self::CheckBudgets,
            Kind::Sections => {
                let only = arg
                    .map(|a| {
                        a.parse::<u32>()
                            .map(SectionIndex)
                            .map_err(|_| ConsoleError::BadArgument {
                                arg: a.to_string(),
                                usage: entry.usage,
                            })
                    })
                    .transpose()?;
                return Ok(Self::Sections { only });
            }
        };
        match arg {
            Some(extra) => Err(ConsoleError::BadArgument {
                arg: extra.to_string(),
                usage: entry.usage,
            }),
            None => Ok(command),
        }
    }

    /// One line per command: usage and description.
    pub fn help_text() -> String {
        COMMANDS
            .iter()
            .map(|c| format!("{:<20} {}", c.usage, c.help))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
