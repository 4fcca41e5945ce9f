use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error};

use super::{ensure_compressed, CompressionError, Compressor};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TEMP_PREFIX: &str = "diggers-";
const TEMP_SUFFIX: &str = ".bin";

/// A program plus leading arguments, e.g. `wine bin/dernc.exe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a command line on whitespace. Returns `None` when empty.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self {
            program: program.into(),
            args: words.map(OsString::from).collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProPackConfig {
    /// Packer, invoked as `<pack> p <src> <dest>`.
    pub pack: ToolCommand,
    /// Unpacker, invoked as `<unpack> -o <src> <dest>`.
    pub unpack: ToolCommand,
    pub timeout: Duration,
}

impl Default for ProPackConfig {
    fn default() -> Self {
        Self {
            pack: ToolCommand::new("bin/rnc_lib.exe"),
            unpack: ToolCommand::new("bin/dernc.exe"),
            timeout: Duration::from_secs(60),
        }
    }
}

/// RNC Pro-Pack through the external command line tools. Every call runs a
/// separate process over a pair of scratch files.
#[derive(Debug, Clone, Default)]
pub struct ProPack {
    config: ProPackConfig,
}

impl ProPack {
    pub fn new(config: ProPackConfig) -> Self {
        Self { config }
    }

    fn run_over_buffer(
        &self,
        tool: &ToolCommand,
        mode: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, CompressionError> {
        let src = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile()?;
        let dest = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile()?;
        fs::write(src.path(), data)?;

        self.run(tool, &[OsStr::new(mode), src.path().as_os_str(), dest.path().as_os_str()])?;

        let output = fs::read(dest.path())?;
        if output.is_empty() {
            return Err(tool_error(tool, "produced no output".to_string()));
        }
        Ok(output)
    }

    fn run(&self, tool: &ToolCommand, args: &[&OsStr]) -> Result<(), CompressionError> {
        let mut stderr = tempfile::tempfile()?;
        debug!("Running {:?} {:?} {:?}", tool.program, tool.args, args);

        let mut child = Command::new(&tool.program)
            .args(&tool.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()?;

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                error!("Killing {:?} after {:?}", tool.program, self.config.timeout);
                // The process may have exited between the poll and the kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(CompressionError::Timeout {
                    tool: tool.program.clone(),
                    seconds: self.config.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let mut message = String::new();
            stderr.seek(SeekFrom::Start(0))?;
            stderr.read_to_string(&mut message)?;
            let reason = match message.trim() {
                "" => format!("exited with {}", status),
                text => format!("exited with {}: {}", status, text),
            };
            return Err(tool_error(tool, reason));
        }
        Ok(())
    }
}

fn tool_error(tool: &ToolCommand, reason: String) -> CompressionError {
    error!("{:?}: {}", tool.program, reason);
    CompressionError::Tool {
        tool: tool.program.clone(),
        reason,
    }
}

impl Compressor for ProPack {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        self.run_over_buffer(&self.config.pack, "p", data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        ensure_compressed(data)?;
        self.run_over_buffer(&self.config.unpack, "-o", data)
    }
}
