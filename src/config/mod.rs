mod settings;

pub use settings::{Config, MetricsSettings, OutputFormat, Settings};
