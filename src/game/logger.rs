//! Game event logger
//!
//! The rules core never logs; it returns descriptions. A session hands
//! those descriptions to the logger, tagged with what kind of event they
//! describe. Each kind has a fixed verbosity, so a quiet game still prints
//! who won while a verbose one also shows every rejected action.

use serde::{Deserialize, Serialize};

/// Verbosity level for game output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum VerbosityLevel {
    /// Silent - no output during game
    Silent = 0,
    /// Minimal - game start and outcome only
    Minimal = 1,
    /// Normal - turns and accepted actions (default)
    #[default]
    Normal = 2,
    /// Verbose - rejected actions too
    Verbose = 3,
}

/// What a log line is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    /// Players seated, hands dealt
    Setup,
    /// A new turn began
    Turn,
    /// An accepted action
    Action,
    /// A rejected or suspended action, with the reason
    Rejected,
    /// The game ended
    Outcome,
}

impl LogKind {
    /// Lowest verbosity at which this kind is printed
    pub fn level(&self) -> VerbosityLevel {
        match self {
            LogKind::Setup | LogKind::Outcome => VerbosityLevel::Minimal,
            LogKind::Turn | LogKind::Action => VerbosityLevel::Normal,
            LogKind::Rejected => VerbosityLevel::Verbose,
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Keep entries in memory only
    Memory,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub turn: u32,
    pub message: String,
}

/// Logger for one game
///
/// Captured entries are kept regardless of verbosity; verbosity only
/// filters what is printed.
#[derive(Debug, Clone, Default)]
pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    entries: Vec<LogEntry>,
}

impl GameLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            ..Self::default()
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    fn captures(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    fn prints(&self, kind: LogKind) -> bool {
        matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both)
            && kind.level() <= self.verbosity
    }

    /// Record one event
    pub fn log(&mut self, kind: LogKind, turn: u32, message: impl Into<String>) {
        let printed = self.prints(kind);
        if !printed && !self.captures() {
            return;
        }
        let message = message.into();
        if printed {
            match kind {
                LogKind::Setup | LogKind::Outcome | LogKind::Turn => println!("{message}"),
                LogKind::Action | LogKind::Rejected => println!("  {message}"),
            }
        }
        if self.captures() {
            self.entries.push(LogEntry {
                kind,
                turn,
                message,
            });
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_of(&self, kind: LogKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Hand over everything captured so far
    pub fn take_entries(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }
}
