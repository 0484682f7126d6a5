use copilot_relay_core::TelemetrySettings;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
        }
    }
}

impl TelemetryConfig {
    /// `--verbose` raises the level to debug unless the file asks for more.
    pub fn from_settings(settings: &TelemetrySettings, verbose: bool) -> Self {
        let level = if verbose && !matches!(settings.level.as_str(), "debug" | "trace") {
            "debug".to_string()
        } else {
            settings.level.clone()
        };

        Self {
            level,
            json_output: settings.json_output,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Formatting layer for either output style. Logs never share stdout with
/// the approval prompt or the startup banner.
fn fmt_layer<W>(json_output: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json_output {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).boxed()
    }
}

pub fn init_subscriber(config: &TelemetryConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config.json_output, std::io::stderr))
        .with(build_filter(config))
        .try_init()
}
