/// Harness Builder - Entry-Point Wrapper Generation
///
/// **Core Responsibility:**
/// Turn screened source text into a runnable artifact with a fixed
/// process interface: one JSON argument in, one line of JSON out.
///
/// **Artifact Contract:**
/// - The payload is `sys.argv[1]`, either `{"args": [...], "kwargs": {...}}`
///   or a bare array (positional args, empty kwargs).
/// - A top-level `solve` function is required; its calling convention is
///   unknown ahead of time, so the wrapper probes strategies in a fixed
///   order (spread args, whole list, single-element unwrap) and treats
///   `TypeError` as the signature-mismatch signal.
/// - The return value is serialized to stdout; any exception becomes
///   `{"error": <message>}` with a non-zero exit.
///
/// Each build writes into a freshly created, uniquely named scratch
/// directory so concurrent runs never collide; the directory is removed
/// when the artifact is dropped.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCRATCH_ROOT_DIR: &str = "solver-scratch";
const SOLUTION_FILE: &str = "solution.py";

/// Reject pathological inputs before they hit the filesystem.
const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB

const HARNESS_TEMPLATE: &str = r#"import json
import sys

{{source}}


def _call_with_fallbacks(fn, fargs, fkwargs):
    # Calling conventions are probed in a fixed order; TypeError is the
    # signature-mismatch signal between strategies.
    # 1) spread positional args -> solve(a, b, ...)
    try:
        return True, fn(*fargs, **fkwargs)
    except TypeError:
        pass
    # 2) whole list as one parameter -> solve([a, b, ...])
    try:
        return True, fn(fargs, **fkwargs)
    except TypeError:
        pass
    # 3) single-element unwrap -> solve(a)
    if isinstance(fargs, list) and len(fargs) == 1:
        try:
            return True, fn(fargs[0], **fkwargs)
        except TypeError:
            pass
    return False, None


if __name__ == "__main__":
    try:
        payload = json.loads(sys.argv[1])
        if isinstance(payload, dict):
            fargs = payload.get("args", [])
            fkwargs = payload.get("kwargs", {})
        else:
            fargs, fkwargs = payload, {}

        if "solve" not in globals():
            print(json.dumps({"error": "No 'solve' function found in generated code"}))
            sys.exit(1)

        matched, result = _call_with_fallbacks(globals()["solve"], fargs, fkwargs)
        if not matched:
            print(json.dumps({"error": "Could not match function signature"}))
            sys.exit(1)

        print(json.dumps(result))

    except Exception as e:
        print(json.dumps({"error": str(e)}))
        sys.exit(1)
"#;

/// A built harness on disk. Owns its scratch directory; dropping the
/// artifact removes the directory (best effort, mirroring how container
/// cleanup is guaranteed by a drop guard rather than explicit teardown).
#[derive(Debug)]
pub struct HarnessArtifact {
    scratch_dir: PathBuf,
    path: PathBuf,
}

impl HarnessArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HarnessArtifact {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.scratch_dir);
    }
}

/// Embed screened source in the wrapper and write it to a unique scratch
/// location. Artifacts are never reused or overwritten across calls.
pub fn build(source: &str) -> Result<HarnessArtifact> {
    if source.len() > MAX_SOURCE_CODE_BYTES {
        bail!(
            "Source code exceeds maximum size of {} bytes",
            MAX_SOURCE_CODE_BYTES
        );
    }

    let scratch_dir = std::env::temp_dir()
        .join(SCRATCH_ROOT_DIR)
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&scratch_dir).with_context(|| {
        format!(
            "Failed to create scratch directory '{}'",
            scratch_dir.display()
        )
    })?;

    let path = scratch_dir.join(SOLUTION_FILE);
    let program = HARNESS_TEMPLATE.replace("{{source}}", source);
    std::fs::write(&path, program)
        .with_context(|| format!("Failed to write harness '{}'", path.display()))?;

    Ok(HarnessArtifact { scratch_dir, path })
}
