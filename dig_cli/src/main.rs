use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use lib_dig::batch::{self, BatchConfig};
use lib_dig::compression::{ProPack, ProPackConfig, ToolCommand};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "digmod", about = "Unpack and pack Diggers / Extractors mod assets")]
#[command(group(ArgGroup::new("mode").args(["unpack", "pack"])))]
struct Cli {
    /// Unpack the game's assets into <dir>/MOD.
    #[arg(short, long, value_name = "dir")]
    unpack: Option<PathBuf>,
    /// Pack <dir>/MOD back into the game's asset files.
    #[arg(short, long, value_name = "dir")]
    pack: Option<PathBuf>,
    /// Directory holding the asset manifests.
    #[arg(long, env = "DIGMOD_META_DIR", default_value = "meta")]
    meta: PathBuf,
    /// Pro-Pack packer command line.
    #[arg(long, env = "DIGMOD_RNC_PACK", default_value = "bin/rnc_lib.exe")]
    rnc_pack: String,
    /// Pro-Pack unpacker command line.
    #[arg(long, env = "DIGMOD_RNC_UNPACK", default_value = "bin/dernc.exe")]
    rnc_unpack: String,
    /// Seconds a compressor process may run before it is killed.
    #[arg(long, default_value_t = 60)]
    tool_timeout: u64,
    /// Worker threads; 0 uses one per core.
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,
    /// Log per-stage details.
    #[arg(short, long)]
    verbose: bool,
    /// Write the log to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn propack(&self) -> Result<ProPack> {
        let pack = ToolCommand::parse(&self.rnc_pack).context("empty --rnc-pack command")?;
        let unpack = ToolCommand::parse(&self.rnc_unpack).context("empty --rnc-unpack command")?;
        Ok(ProPack::new(ProPackConfig {
            pack,
            unpack,
            timeout: Duration::from_secs(self.tool_timeout),
        }))
    }

    fn batch_config(&self, game_dir: PathBuf) -> BatchConfig {
        BatchConfig {
            game_dir,
            meta_dir: self.meta.clone(),
            jobs: self.jobs,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    lib_dig::init_logging(cli.verbose, cli.log_file.as_deref())
        .context("failed to open log file")?;

    let compressor = cli.propack()?;
    let report = if let Some(dir) = &cli.unpack {
        batch::unpack(&cli.batch_config(dir.clone()), &compressor)
            .with_context(|| format!("unpacking {}", dir.display()))?
    } else if let Some(dir) = &cli.pack {
        batch::pack(&cli.batch_config(dir.clone()), &compressor)
            .with_context(|| format!("packing {}", dir.display()))?
    } else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    info!(
        "{} converted, {} skipped, {} failed",
        report.converted,
        report.skipped,
        report.failed.len()
    );
    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Failed assets: {}", report.failed.join(", "));
        Ok(ExitCode::FAILURE)
    }
}
