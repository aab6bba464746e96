use anyhow::{Context, Result};
use engine::capture::normalize_script;
use engine::conf::CaptureConfig;
use engine::filter::{FilterEngine, FilterMode, Patterns};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub output: OutputConfig,
    /// Shell text that produces varnishlog block output on stdout.
    pub script: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Stdout carries the transactions, so logs go to stderr or a file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stderr,
    File { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Two-line summary per transaction
    Summary,
    /// Summary plus the timestamp chain
    Item,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Print a family report for every shown transaction tree once the capture ends
    pub report: bool,
    /// Write the raw lines of shown transactions to this file
    pub export_raw: Option<String>,
    /// Regex or preset name (5xx, 4xx, esi, fetch, pass, session)
    pub filter: Option<String>,
    pub filter_mode: FilterMode,
    pub case_sensitive: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Summary,
            report: true,
            export_raw: None,
            filter: None,
            filter_mode: FilterMode::Include,
            case_sensitive: false,
        }
    }
}

impl OutputConfig {
    /// The configured filter with presets expanded, if any.
    pub fn filter_pattern(&self) -> Option<&str> {
        let filter = self.filter.as_deref()?.trim();
        if filter.is_empty() {
            return None;
        }
        Some(Patterns::by_name(filter).unwrap_or(filter))
    }
}

impl ViewerConfig {
    /// Load configuration from defaults, viewer.toml files and environment variables.
    ///
    /// `explicit` is layered last among the files and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&ViewerConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        // 1. /etc/vxview/viewer.toml (system wide)
        // 2. config/viewer.toml (working directory)
        for path in ["/etc/vxview/viewer", "config/viewer"] {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // Double underscore for nested keys: VXVIEW_OUTPUT__FORMAT
        builder = builder.add_source(
            config::Environment::with_prefix("VXVIEW")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        self.capture
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid capture section")?;

        if normalize_script(&self.script).is_empty() {
            anyhow::bail!("script is empty");
        }

        if let Some(pattern) = self.output.filter_pattern() {
            FilterEngine::new(pattern, self.output.case_sensitive, self.output.filter_mode)
                .with_context(|| format!("Invalid output.filter '{pattern}'"))?;
        }

        if let LogOutput::File { path } = &self.logging.output {
            if path.trim().is_empty() {
                anyhow::bail!("logging.output file path is empty");
            }
        }

        Ok(())
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "warn,viewer=info,engine=info".to_string(),
                format: LogFormat::Pretty,
                output: LogOutput::Stderr,
            },
            capture: CaptureConfig::default(),
            output: OutputConfig::default(),
            script: "varnishlog -g session".to_string(),
        }
    }
}
