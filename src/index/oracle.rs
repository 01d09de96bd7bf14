//! Disk usage oracle: lists the entries under a root together with their
//! sizes, from the oracle's own database rather than by walking the disk.
//!
//! The default oracle is `duc`. Its plain listing form prints one entry per
//! line as `<decimal size><space><relative path>`; the path may itself
//! contain spaces.

use crate::error::{Error, Result};
use crate::index::types::IndexEntry;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Line the oracle produces when its database cannot be opened
pub const DATABASE_NOT_FOUND: &str = "Error opening:";

/// Prefix of the oracle's error output for paths outside its database
pub const PATH_NOT_IN_DATABASE: &str = "Requested path not found";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of (relative path, size) listings for a root.
pub trait Oracle: Send + Sync {
    /// Raw per-entry report for `root`
    fn list(&self, root: &str) -> Result<String>;

    /// Roots the oracle itself has data for
    fn coverage(&self) -> Result<Vec<OracleCoverage>>;
}

/// One row of the oracle's coverage report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCoverage {
    pub date: String,
    pub time: String,
    pub files: u64,
    pub dirs: u64,
    /// Human formatted size as printed by the oracle
    pub size: String,
    pub path: String,
}

/// Oracle backed by the `duc` command line tool
#[derive(Debug, Clone)]
pub struct DucOracle {
    binary: String,
    database: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Default for DucOracle {
    fn default() -> Self {
        Self::new("duc")
    }
}

impl DucOracle {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            database: None,
            timeout: None,
        }
    }

    /// Use a specific oracle database instead of its default one
    pub fn with_database(mut self, database: Option<PathBuf>) -> Self {
        self.database = database;
        self
    }

    /// Kill the oracle and fail when it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn database_args(&self) -> Vec<String> {
        match &self.database {
            Some(db) => vec!["-d".to_string(), db.to_string_lossy().into_owned()],
            None => Vec::new(),
        }
    }

    fn run(&self, args: &[String], path: &str) -> Result<String> {
        debug!("running {} {}", self.binary, args.join(" "));

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::OracleUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        let output = wait_with_deadline(child, self.timeout, path)?;
        interpret_output(output, path)
    }
}

impl Oracle for DucOracle {
    fn list(&self, root: &str) -> Result<String> {
        let mut args = vec!["ls".to_string()];
        args.extend(self.database_args());
        args.extend(
            ["-a", "-b", "-R", "--full-path", root]
                .iter()
                .map(|s| s.to_string()),
        );
        self.run(&args, root)
    }

    fn coverage(&self) -> Result<Vec<OracleCoverage>> {
        let mut args = vec!["info".to_string()];
        args.extend(self.database_args());
        let report = self.run(&args, "<info>")?;
        Ok(parse_coverage(&report))
    }
}

/// Collected result of one oracle process
struct ProcessOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    success: bool,
}

/// Wait for the child, killing it once `timeout` elapses.
///
/// Both pipes are drained on helper threads so a chatty oracle cannot block
/// on a full pipe while we poll for its exit.
fn wait_with_deadline(mut child: Child, timeout: Option<Duration>, path: &str) -> Result<ProcessOutput> {
    let Some(timeout) = timeout else {
        let output = child.wait_with_output()?;
        return Ok(ProcessOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        });
    };

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // Not joined: a grandchild may still hold the pipes open. The
            // drain threads exit on their own once every writer is gone.
            drop((stdout, stderr));
            return Err(Error::OracleTimeout {
                path: path.to_string(),
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    };

    Ok(ProcessOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
        success: status.success(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

/// Map the oracle's error stream onto our error kinds
fn interpret_output(output: ProcessOutput, path: &str) -> Result<String> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if !stderr.is_empty() {
        if stderr.starts_with(PATH_NOT_IN_DATABASE) {
            return Err(Error::OracleQueryFailed {
                path: path.to_string(),
                message: stderr.to_string(),
            });
        }
        if stderr.starts_with(DATABASE_NOT_FOUND) {
            warn!("oracle database missing: {}", stderr);
            return Ok(DATABASE_NOT_FOUND.to_string());
        }
        return Err(Error::OracleFailed {
            path: path.to_string(),
            message: stderr.to_string(),
        });
    }

    if !output.success {
        return Err(Error::OracleFailed {
            path: path.to_string(),
            message: "oracle exited with a failure status".to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse a per-entry report into (relative path, size) pairs.
///
/// The size is the decimal prefix up to the first space and the path is
/// everything after that single space. The database-missing sentinel, blank
/// lines and lines without a numeric prefix are skipped.
pub fn parse_report(report: &str) -> Vec<IndexEntry> {
    let mut entries = Vec::new();

    for raw in report.lines() {
        let line = raw.trim_start().trim_end_matches('\r');
        if line.is_empty() || line == DATABASE_NOT_FOUND {
            continue;
        }

        match parse_line(line) {
            Some(entry) => entries.push(entry),
            None => debug!("skipping unparsable oracle line: {:?}", line),
        }
    }

    entries
}

fn parse_line(line: &str) -> Option<IndexEntry> {
    let space = memchr::memchr(b' ', line.as_bytes())?;
    let (size, rest) = line.split_at(space);
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let size: u64 = size.parse().ok()?;
    let path = &rest[1..];
    if path.is_empty() {
        return None;
    }
    Some(IndexEntry::new(path, size))
}

/// Parse the oracle's coverage report: a header line followed by
/// `date time files dirs size path` rows.
pub fn parse_coverage(report: &str) -> Vec<OracleCoverage> {
    report
        .lines()
        .skip(1)
        .filter_map(|line| {
            let (fields, path) = split_fields(line, 5)?;
            Some(OracleCoverage {
                date: fields[0].to_string(),
                time: fields[1].to_string(),
                files: fields[2].parse().ok()?,
                dirs: fields[3].parse().ok()?,
                size: fields[4].to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}

/// Split off `n` whitespace separated fields and return the remainder
fn split_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line.trim_start();

    for _ in 0..n {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    let rest = rest.trim_end();
    (!rest.is_empty()).then_some((fields, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_basic() {
        let entries = parse_report("12 a.txt\n500 sub/b.bin\n");
        assert_eq!(
            entries,
            vec![IndexEntry::new("a.txt", 12), IndexEntry::new("sub/b.bin", 500)]
        );
    }

    #[test]
    fn test_parse_report_paths_with_spaces() {
        let entries = parse_report("4096 My Documents/tax return 2023.pdf\r\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "My Documents/tax return 2023.pdf");
        assert_eq!(entries[0].size, 4096);
    }

    #[test]
    fn test_parse_report_keeps_trailing_space_in_path() {
        let entries = parse_report("31 odd name \n");
        assert_eq!(entries[0].path, "odd name ");
    }

    #[test]
    fn test_parse_report_drops_sentinel_and_garbage() {
        let report = format!("{}\n\nnot-a-size foo\n12\n7 ok\n", DATABASE_NOT_FOUND);
        let entries = parse_report(&report);
        assert_eq!(entries, vec![IndexEntry::new("ok", 7)]);
    }

    #[test]
    fn test_parse_coverage() {
        let report = "Date       Time       Files    Dirs    Size Path\n\
                      2023-09-21 08:24:12     199     134    1.5M /home/aloha/code/duc magic\n";
        let coverage = parse_coverage(report);
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].path, "/home/aloha/code/duc magic");
        assert_eq!(coverage[0].files, 199);
        assert_eq!(coverage[0].dirs, 134);
        assert_eq!(coverage[0].size, "1.5M");
    }

    #[test]
    fn test_interpret_output_errors() {
        let out = |stderr: &str| ProcessOutput {
            stdout: b"1 x".to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            success: true,
        };

        assert!(matches!(
            interpret_output(out("Requested path not found"), "/x"),
            Err(Error::OracleQueryFailed { .. })
        ));
        assert_eq!(
            interpret_output(out("Error opening: /root/.duc.db"), "/x").unwrap(),
            DATABASE_NOT_FOUND
        );
        assert!(matches!(
            interpret_output(out("segfault"), "/x"),
            Err(Error::OracleFailed { .. })
        ));
        assert_eq!(interpret_output(out(""), "/x").unwrap(), "1 x");
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let oracle = DucOracle::new("/nonexistent/dutype-oracle-binary");
        assert!(matches!(
            oracle.list("/tmp"),
            Err(Error::OracleUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_oracle() {
        let oracle = DucOracle::new("sleep").with_timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let result = oracle.run(&["5".to_string()], "/slow");
        assert!(matches!(result, Err(Error::OracleTimeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
