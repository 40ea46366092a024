use clap::Parser;
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "requesty")]
#[command(about = "Collects per-domain request counts and serves top domain statistics")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Snapshot file the counters are loaded from and flushed to
    #[arg(short, long, default_value = "requesty.json")]
    pub data_file: PathBuf,

    // Keep counters in memory only
    #[arg(long, default_value_t = false)]
    pub no_persist: bool,

    // Seconds between snapshot flushes, 0 disables the periodic flush
    #[arg(short, long, default_value_t = 30)]
    pub flush_interval: u64,
}

impl Args {
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if self.no_persist {
            None
        } else {
            Some(self.data_file.clone())
        }
    }
}
