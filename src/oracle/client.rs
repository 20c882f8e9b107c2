//! Oracle process invocation.
//!
//! The oracle is an external command that prints build metadata for one id.
//! It routinely exits non-zero after printing perfectly usable output, so the
//! exit status is logged and otherwise ignored. Only a timeout or an I/O
//! failure produces an error. One deadline bounds the whole invocation,
//! including collection of its output.
use crate::util::truncate_bytes;
use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Placeholder substituted with the catalog id in each oracle argument.
pub const ID_PLACEHOLDER: &str = "{id}";

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_ORACLE_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

/// Anything that can be asked for the raw metadata text of one id.
pub trait Oracle: Sync {
    /// Run one invocation and return its captured text.
    fn invoke(&self, id: &str) -> Result<String>;
}

/// Oracle backed by an external command line.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOracle {
    /// Build an oracle from a shell-words command template.
    ///
    /// The program is resolved on `PATH` up front so a missing tool fails the
    /// run once instead of failing every entry.
    pub fn from_template(template: &str, timeout: Duration) -> Result<Self> {
        let words = shell_words::split(template)
            .with_context(|| format!("parse oracle command: {template}"))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| anyhow!("oracle command is empty"))?;
        if !args.iter().any(|arg| arg.contains(ID_PLACEHOLDER)) {
            return Err(anyhow!(
                "oracle command must contain an {ID_PLACEHOLDER} placeholder: {template}"
            ));
        }
        let program = which::which(program)
            .with_context(|| format!("resolve oracle program {program}"))?;
        Ok(Self {
            program,
            args: args.to_vec(),
            timeout,
        })
    }

    fn argv_for(&self, id: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ID_PLACEHOLDER, id))
            .collect()
    }
}

impl Oracle for CommandOracle {
    fn invoke(&self, id: &str) -> Result<String> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut child = Command::new(&self.program)
            .args(self.argv_for(id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn oracle {}", self.program.display()))?;

        // Drain both pipes concurrently so a chatty oracle cannot block on a
        // full pipe while we wait for it to exit.
        let (tx, rx) = mpsc::channel();
        drain(child.stdout.take(), Pipe::Stdout, tx.clone());
        drain(child.stderr.take(), Pipe::Stderr, tx);

        let Some(status) = wait_until(&mut child, deadline)? else {
            tracing::warn!(
                id,
                elapsed_ms = start.elapsed().as_millis(),
                "oracle timed out"
            );
            return Err(anyhow!(
                "oracle timed out after {}ms for id {id}",
                self.timeout.as_millis()
            ));
        };

        // A helper process left behind by the oracle can hold the pipes open
        // long after it exits, so collection shares the invocation deadline.
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        loop {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((Pipe::Stdout, chunk)) => stdout.extend_from_slice(&chunk),
                Ok((Pipe::Stderr, chunk)) => stderr.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        id,
                        elapsed_ms = start.elapsed().as_millis(),
                        "oracle output still open at deadline; using what was captured"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            id,
            elapsed_ms = start.elapsed().as_millis(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            exit_code = status.code(),
            "oracle invoke complete"
        );

        let mut text = truncate_bytes(&stdout, MAX_ORACLE_OUTPUT_BYTES);
        if !stderr.is_empty() {
            text.push('\n');
            text.push_str(&truncate_bytes(&stderr, MAX_ORACLE_OUTPUT_BYTES));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Forward a pipe's output in chunks, keeping at most
/// `MAX_ORACLE_OUTPUT_BYTES` and discarding the rest so the pipe never fills.
fn drain<R: Read + Send + 'static>(pipe: Option<R>, which: Pipe, tx: Sender<(Pipe, Vec<u8>)>) {
    let Some(pipe) = pipe else {
        return;
    };
    thread::spawn(move || {
        let result = read_capped(pipe, MAX_ORACLE_OUTPUT_BYTES, |chunk| {
            tx.send((which, chunk)).is_ok()
        });
        if let Err(err) = result {
            tracing::warn!(pipe = ?which, error = %err, "read oracle output");
        }
    });
}

/// Read `pipe` to end, handing at most `cap` bytes to `sink`.
///
/// Stops early when `sink` returns `false`. Returns the total bytes read,
/// including discarded ones.
fn read_capped<R, F>(mut pipe: R, cap: usize, mut sink: F) -> std::io::Result<usize>
where
    R: Read,
    F: FnMut(Vec<u8>) -> bool,
{
    let mut buf = [0u8; 8192];
    let mut kept = 0;
    let mut total = 0;
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        total += n;
        let keep = n.min(cap - kept);
        if keep > 0 {
            kept += keep;
            if !sink(buf[..keep].to_vec()) {
                return Ok(total);
            }
        }
    }
}

/// Wait for the child until `deadline`; `None` means it was killed.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait().context("check oracle status")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
