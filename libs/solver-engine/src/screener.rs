/// Safety Screener - Textual Pre-Execution Gate
///
/// **Core Responsibility:**
/// Decide whether generated source is allowed to reach the harness at all.
///
/// **Critical Properties:**
/// - Pure string analysis: no parsing, no AST, no interpreter
/// - Knows nothing about processes or timeouts
/// - Deterministic: same source, same verdict
///
/// **Known Limitation:**
/// The scan is lexical and can be evaded by obfuscation (string-built
/// imports, encoded payloads). That is an accepted property of this gate,
/// not a bug to fix here; it is a deterrent, not a proof.

/// Name of the required top-level function inside generated code.
pub const ENTRY_POINT: &str = "solve";

/// Substrings that immediately disqualify a source, matched
/// case-insensitively anywhere in the text. Covers process/OS/network/
/// filesystem access, dynamic evaluation, reflection primitives, and
/// interactive input.
const DANGEROUS_PATTERNS: &[&str] = &[
    "import os",
    "from os",
    "import sys",
    "from sys",
    "import subprocess",
    "from subprocess",
    "import socket",
    "from socket",
    "import shutil",
    "from shutil",
    "eval(",
    "exec(",
    "compile(",
    "__import__",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "globals(",
    "locals(",
    "vars(",
    "getattr",
    "setattr",
    "delattr",
    "breakpoint(",
    "help(",
    "dir(",
];

/// Standard-library modules generated code may import.
const ALLOWED_IMPORTS: &[&str] = &[
    "math",
    "random",
    "itertools",
    "functools",
    "collections",
    "heapq",
    "bisect",
    "array",
    "queue",
    "string",
    "re",
    "datetime",
    "time",
    "decimal",
    "fractions",
    "statistics",
    "json",
    "copy",
    "typing",
];

/// Verdict of the screen: either the source may proceed to execution, or
/// it is rejected with the reason that tripped the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Safe,
    Violation(String),
}

impl Screen {
    pub fn is_safe(&self) -> bool {
        matches!(self, Screen::Safe)
    }
}

/// Screen generated source text. Runs the denylist scan first, then the
/// import allow-list; the first hit wins.
pub fn screen(source: &str) -> Screen {
    let lowered = source.to_lowercase();
    for pattern in DANGEROUS_PATTERNS {
        // patterns are stored lowercase, so a plain contains() on the
        // lowered source gives the case-insensitive match
        if lowered.contains(pattern) {
            return Screen::Violation(format!(
                "Blocked potentially unsafe code pattern: {}",
                pattern
            ));
        }
    }

    for line in source.lines() {
        let stripped = line.trim();
        if let Some(module) = import_target(stripped) {
            if module != ENTRY_POINT && !ALLOWED_IMPORTS.contains(&module) {
                let mut allowed: Vec<&str> = ALLOWED_IMPORTS.to_vec();
                allowed.sort_unstable();
                return Screen::Violation(format!(
                    "Import '{}' not allowed. Only: {}",
                    module,
                    allowed.join(", ")
                ));
            }
        }
    }

    Screen::Safe
}

/// Module name checked for an import line, or `None` when the line is not
/// an import. `import a.b` resolves to the top-level `a`; a dotted
/// `from a.b import c` is checked as the full `a.b` and therefore never
/// matches the allow-list of bare module names.
fn import_target(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix("import ") {
        rest
    } else if let Some(rest) = line.strip_prefix("from ") {
        return rest.split_whitespace().next();
    } else {
        return None;
    };
    let first = rest.split_whitespace().next()?;
    Some(first.split('.').next().unwrap_or(first))
}
