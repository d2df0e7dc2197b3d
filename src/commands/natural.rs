//! Fixed natural-language grammar.
//!
//! Each entry pairs one anchored pattern with the command it produces and a
//! description of where its capture groups go. Patterns are tried in order
//! against the trimmed input, case-insensitively; captures are taken from the
//! input as typed so URLs, tokens, and tool names keep their casing.

use super::CommandKind;
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Destination of one capture group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capture {
    Positional,
    Option(&'static str),
    CallArguments,
}

pub(crate) struct Pattern {
    pub source: &'static str,
    pub kind: CommandKind,
    /// Indexed by capture group number minus one.
    pub captures: &'static [Capture],
}

pub(crate) const PATTERNS: &[Pattern] = &[
    Pattern {
        source: r"^connect\s+to\s+(\S+)(?:\s+with\s+token\s+env\s+(\S+)|\s+with\s+token\s+(\S+))?$",
        kind: CommandKind::Connect,
        captures: &[
            Capture::Positional,
            Capture::Option(super::OPTION_TOKEN_ENV_VAR),
            Capture::Option(super::OPTION_TOKEN),
        ],
    },
    Pattern {
        source: r"^disconnect$",
        kind: CommandKind::Disconnect,
        captures: &[],
    },
    Pattern {
        source: r"^list\s+tools$",
        kind: CommandKind::List,
        captures: &[],
    },
    Pattern {
        source: r"^call\s+(\S+)(?:\s+(.+))?$",
        kind: CommandKind::Call,
        captures: &[Capture::Positional, Capture::CallArguments],
    },
    Pattern {
        source: r"^status$",
        kind: CommandKind::Status,
        captures: &[],
    },
    Pattern {
        source: r"^help(?:\s+(\S+))?$",
        kind: CommandKind::Help,
        captures: &[Capture::Positional],
    },
    Pattern {
        source: r"^schema\s+(\S+)$",
        kind: CommandKind::Schema,
        captures: &[Capture::Positional],
    },
];

pub(crate) struct CompiledPattern {
    pub pattern: &'static Pattern,
    pub regex: Regex,
}

pub(crate) fn compiled_patterns() -> &'static [CompiledPattern] {
    static COMPILED: OnceLock<Vec<CompiledPattern>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|pattern| {
                RegexBuilder::new(pattern.source)
                    .case_insensitive(true)
                    .dot_matches_new_line(true)
                    .build()
                    .ok()
                    .map(|regex| CompiledPattern { pattern, regex })
            })
            .collect()
    })
}

/// Captured values of the first matching pattern, in capture order.
pub(crate) struct NaturalMatch {
    pub pattern: &'static Pattern,
    pub groups: Vec<Option<String>>,
}

pub(crate) fn match_natural(input: &str) -> Option<NaturalMatch> {
    compiled_patterns().iter().find_map(|compiled| {
        let captures = compiled.regex.captures(input)?;
        let groups = (1..=compiled.pattern.captures.len())
            .map(|index| captures.get(index).map(|m| m.as_str().to_string()))
            .collect();
        Some(NaturalMatch {
            pattern: compiled.pattern,
            groups,
        })
    })
}
