use crate::Error;
use crate::config::Config;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compiles home-automation rules for the SmartCode runtime")]
pub struct Cli {
    /// Rules source file
    pub source: PathBuf,
    /// Runtime stream to write; defaults to SOURCE with an .smt extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Also write a JSON listing of the compiled tables
    #[arg(long)]
    pub listing: Option<PathBuf>,
}

impl Cli {
    /// `-o`, else the configured output, else the source renamed.
    pub fn output_path(&self, config: &Config) -> PathBuf {
        self.output
            .clone()
            .or_else(|| config.output.clone())
            .unwrap_or_else(|| self.source.with_extension("smt"))
    }

    /// The source must exist and every output must have an existing parent
    /// directory.
    pub fn validate(&self, output: &Path) -> Result<(), Error> {
        if !self.source.is_file() {
            return Err(Error::InvalidArguments(format!(
                "source file {} does not exist",
                self.source.display()
            )));
        }
        for path in std::iter::once(output).chain(self.listing.as_deref()) {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if !parent.is_dir() {
                return Err(Error::InvalidArguments(format!(
                    "output directory {} does not exist",
                    parent.display()
                )));
            }
        }
        Ok(())
    }
}
