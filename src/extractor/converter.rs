use crate::config::ImageFormat;
use crate::error::{PageSplitError, Result};
use crate::extractor::ExtractionKind;
use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One call into the external converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub kind: ExtractionKind,
    pub output_dir: PathBuf,
    /// Geometry for image output; `None` renders at native size.
    pub geometry: Option<String>,
    pub format: ImageFormat,
}

/// Turns an input document into derived files under `output_dir`.
pub trait Converter: Send + Sync {
    fn convert(&self, request: &ConversionRequest) -> Result<()>;
}

/// Runs the `docsplit` command line tool.
///
/// A single size per invocation keeps docsplit writing straight into the
/// requested output directory instead of nesting by geometry.
#[derive(Debug, Clone)]
pub struct DocsplitConverter {
    program: String,
    timeout: Option<Duration>,
}

impl DocsplitConverter {
    pub fn new() -> Self {
        Self {
            program: "docsplit".to_string(),
            timeout: None,
        }
    }

    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn build_args(&self, request: &ConversionRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![request.kind.as_str().into()];

        args.push("--output".into());
        args.push(request.output_dir.clone().into_os_string());

        if request.kind == ExtractionKind::Images {
            if let Some(ref geometry) = request.geometry {
                args.push("--size".into());
                args.push(geometry.into());
            }
            args.push("--format".into());
            args.push(request.format.as_str().into());
        }

        args.push(request.input.clone().into_os_string());
        args
    }

    fn run(&self, request: &ConversionRequest) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PageSplitError::ConverterUnavailable {
                program: self.program.clone(),
                source: e,
            })?;

        // Drain stderr off-thread so a chatty converter cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer);
                buffer
            })
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    reap(&mut child, stderr_reader);
                    return Err(e.into());
                }
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() > timeout {
                    reap(&mut child, stderr_reader);
                    return Err(PageSplitError::Timeout {
                        seconds: timeout.as_secs(),
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(PageSplitError::ConversionFailed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr,
            });
        }

        if !stderr.trim().is_empty() {
            warn!("{} reported: {}", self.program, stderr.trim());
        }

        Ok(())
    }
}

/// Kills an abandoned child and waits for it.
///
/// The stderr reader is not joined: a grandchild may still hold the pipe
/// open, and the thread ends on its own once the pipe closes.
fn reap(child: &mut Child, stderr_reader: Option<JoinHandle<String>>) {
    let _ = child.kill();
    let _ = child.wait();
    drop(stderr_reader);
}

impl Default for DocsplitConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for DocsplitConverter {
    fn convert(&self, request: &ConversionRequest) -> Result<()> {
        fs::create_dir_all(&request.output_dir)?;

        info!(
            "Running {} {} on {} into {}",
            self.program,
            request.kind,
            request.input.display(),
            request.output_dir.display()
        );

        self.run(request)
    }
}
