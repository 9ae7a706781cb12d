pub mod config;
pub mod cue;
pub mod extractor;
pub mod subprocess;

pub use config::ExtractorConfig;
pub use extractor::YtDlpExtractor;
