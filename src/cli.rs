use clap::Parser;
use log::LevelFilter;

/// Archive extracted when no FILE is given.
pub const DEFAULT_ARCHIVE: &str = "pixel-sanctuary.zip";

#[derive(Parser, Debug)]
#[command(name = "sanctuary-unzip")]
#[command(version)]
#[command(about = "Extract a ZIP archive into the current directory", long_about = None)]
#[command(after_help = "Examples:\n  \
  sanctuary-unzip                    extract pixel-sanctuary.zip into .\n  \
  sanctuary-unzip -d out other.zip   extract other.zip into out/\n  \
  sanctuary-unzip -l                 list files in pixel-sanctuary.zip")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE", default_value = DEFAULT_ARCHIVE)]
    pub file: String,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: String,

    /// List files instead of extracting
    #[arg(short = 'l')]
    pub list: bool,

    /// Verbose logging on stderr (-vv => debug, -vvv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log level used when `RUST_LOG` is not set
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
