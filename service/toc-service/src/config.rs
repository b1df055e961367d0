use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use outline_provider::config::default_openai_config;
use outline_provider::OpenAiConfig;
use paper_chunker::{backend_available, backend_name, parse_backend, ChunkParams, PdfBackend, ReaderOptions, SegmentParams};

use crate::writer::OutputToggles;

/// Pipeline defaults that are not tied to the completion client.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDefaults {
    pub input_dir: &'static str,
    pub output_dir: &'static str,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub page_tolerance: u32,
    pub jobs: usize,
}

pub const SERVICE_DEFAULTS: ServiceDefaults = ServiceDefaults {
    input_dir: "data/input",
    output_dir: "data/output",
    chunk_size: 4000,
    chunk_overlap: 200,
    page_tolerance: 0,
    jobs: 1,
};

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_TEMPERATURE: &str = "TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "MAX_TOKENS";
pub const ENV_CHUNK_SIZE: &str = "CHUNK_SIZE";
pub const ENV_CHUNK_OVERLAP: &str = "CHUNK_OVERLAP";
pub const ENV_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const ENV_PAGE_TOLERANCE: &str = "PAGE_TOLERANCE";
pub const ENV_PDF_PASSWORD: &str = "PDF_PASSWORD";
pub const ENV_PDF_BACKEND: &str = "PDF_BACKEND";
pub const ENV_INPUT_DIR: &str = "INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
    #[error(transparent)]
    Chunk(#[from] paper_chunker::ConfigError),
    #[error("jobs must be at least 1")]
    ZeroJobs,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub page_tolerance: Option<u32>,
    pub jobs: Option<usize>,
    pub password: Option<String>,
    pub backend: Option<PdfBackend>,
    pub keep_stream_order: bool,
    pub no_markdown: bool,
    pub no_summary: bool,
    pub no_documents: bool,
}

/// Fully resolved, validated settings for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub openai: OpenAiConfig,
    pub reader: ReaderOptions,
    pub segment: SegmentParams,
    pub chunk: ChunkParams,
    pub page_tolerance: u32,
    pub jobs: usize,
    pub outputs: OutputToggles,
    /// Pinned `generated_at`, from `SOURCE_DATE_EPOCH`.
    pub fixed_timestamp: Option<DateTime<Utc>>,
}

impl PipelineConfig {
    /// Defaults, then `.env` and the process environment, then `overrides`.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Same as [`PipelineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F, o: ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_opt = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let chunk_size = o.chunk_size.or(env_parse(&env_opt, ENV_CHUNK_SIZE)?).unwrap_or(SERVICE_DEFAULTS.chunk_size);
        let chunk_overlap =
            o.chunk_overlap.or(env_parse(&env_opt, ENV_CHUNK_OVERLAP)?).unwrap_or(SERVICE_DEFAULTS.chunk_overlap);
        let chunk = ChunkParams::new(chunk_size, chunk_overlap)?;

        let jobs = o.jobs.unwrap_or(SERVICE_DEFAULTS.jobs);
        if jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }

        let mut openai = default_openai_config(o.api_key.or_else(|| env_opt(ENV_API_KEY)).unwrap_or_default());
        if let Some(model) = o.model.or_else(|| env_opt(ENV_MODEL)) {
            openai.model = model;
        }
        if let Some(url) = o.base_url.or_else(|| env_opt(ENV_BASE_URL)) {
            openai.base_url = url;
        }
        if let Some(t) = env_parse::<f32, _>(&env_opt, ENV_TEMPERATURE)? {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid(ENV_TEMPERATURE, t, "expected 0.0 to 2.0"));
            }
            openai.temperature = t;
        }
        if let Some(n) = env_parse(&env_opt, ENV_MAX_TOKENS)? {
            openai.max_tokens = n;
        }
        if let Some(secs) = o.timeout_secs.or(env_parse(&env_opt, ENV_TIMEOUT_SECS)?) {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout);
            }
            openai.timeout = Duration::from_secs(secs);
        }

        let backend = match o.backend {
            Some(b) => Some(b),
            None => match env_opt(ENV_PDF_BACKEND) {
                Some(name) => Some(
                    parse_backend(&name).ok_or_else(|| invalid(ENV_PDF_BACKEND, &name, "expected pure-pdf or pdfium"))?,
                ),
                None => None,
            },
        };
        if let Some(b) = backend.filter(|b| !backend_available(*b)) {
            return Err(invalid(ENV_PDF_BACKEND, backend_name(b), "backend not enabled in this build"));
        }

        let fixed_timestamp = match env_parse::<i64, _>(&env_opt, ENV_SOURCE_DATE_EPOCH)? {
            Some(secs) => Some(
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| invalid(ENV_SOURCE_DATE_EPOCH, secs, "out of range"))?,
            ),
            None => None,
        };

        Ok(Self {
            input_dir: o
                .input_dir
                .or_else(|| env_opt(ENV_INPUT_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(SERVICE_DEFAULTS.input_dir)),
            output_dir: o
                .output_dir
                .or_else(|| env_opt(ENV_OUTPUT_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(SERVICE_DEFAULTS.output_dir)),
            openai,
            reader: ReaderOptions {
                password: o.password.or_else(|| env_opt(ENV_PDF_PASSWORD)),
                keep_stream_order: o.keep_stream_order,
                backend,
            },
            segment: SegmentParams::default(),
            chunk,
            page_tolerance: o
                .page_tolerance
                .or(env_parse(&env_opt, ENV_PAGE_TOLERANCE)?)
                .unwrap_or(SERVICE_DEFAULTS.page_tolerance),
            jobs,
            outputs: OutputToggles {
                markdown: !o.no_markdown,
                summary: !o.no_summary,
                documents: !o.no_documents,
            },
            fixed_timestamp,
        })
    }
}

fn env_parse<T, F>(env_opt: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid { key, value: raw, reason: e.to_string() }),
        None => Ok(None),
    }
}

fn invalid(key: &'static str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.to_string() }
}
