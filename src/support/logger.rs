use log::LevelFilter;
use simplelog::{CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};
use snafu::{ResultExt, Snafu};
use std::{fs::File, path::Path};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create log file '{}': {}", path, source))]
    CreateLogFile {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to install the logger: {}", source))]
    InstallLogger { source: log::SetLoggerError },
}

pub fn create_logger(log_file_path: impl AsRef<Path>) -> Result<()> {
    let path = log_file_path.as_ref();
    let log_file = File::create(path).context(CreateLogFile {
        path: path.display().to_string(),
    })?;

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, Config::default(), TerminalMode::Mixed),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ])
    .context(InstallLogger)
}
