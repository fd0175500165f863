use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// S3-compatible object storage (MinIO in development).
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Vision model used to classify uploaded food photos.
/// Analysis is disabled when `api_key` is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Knobs for the analytics aggregator, the recommendation scorer and the
/// periodic rollup job.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub lookback_days: i64,
    pub backfill_days: u32,
    pub default_daily_calories: f64,
    pub default_weight_kg: f64,
    pub default_height_cm: f64,
    pub activity_factor: f64,
    pub recommendation_limit: usize,
    pub rollup_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            backfill_days: 7,
            default_daily_calories: 2000.0,
            default_weight_kg: 70.0,
            default_height_cm: 170.0,
            activity_factor: 1.2,
            recommendation_limit: 5,
            rollup_interval_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub vision: VisionConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{} is not set", key));
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: or("JWT_ISSUER", "fittrack"),
            audience: or("JWT_AUDIENCE", "fittrack-users"),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parse_or(&lookup, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let storage = StorageConfig {
            endpoint: or("MINIO_ENDPOINT", "http://localhost:9000"),
            bucket: or("MINIO_BUCKET", "fittrack"),
            access_key: or("MINIO_ACCESS_KEY", "minioadmin"),
            secret_key: or("MINIO_SECRET_KEY", "minioadmin"),
            region: or("MINIO_REGION", "us-east-1"),
        };
        let vision = VisionConfig {
            api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            endpoint: or(
                "VISION_ENDPOINT",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            model: or("VISION_MODEL", "gemini-2.0-flash-exp"),
            timeout_secs: parse_or(&lookup, "VISION_TIMEOUT_SECS", 30)?,
        };

        let d = EngineConfig::default();
        let engine = EngineConfig {
            lookback_days: parse_or(&lookup, "LOOKBACK_DAYS", d.lookback_days)?,
            backfill_days: parse_or(&lookup, "BACKFILL_DAYS", d.backfill_days)?,
            default_daily_calories: parse_or(
                &lookup,
                "DEFAULT_DAILY_CALORIES",
                d.default_daily_calories,
            )?,
            default_weight_kg: parse_or(&lookup, "DEFAULT_WEIGHT_KG", d.default_weight_kg)?,
            default_height_cm: parse_or(&lookup, "DEFAULT_HEIGHT_CM", d.default_height_cm)?,
            activity_factor: parse_or(&lookup, "ACTIVITY_FACTOR", d.activity_factor)?,
            recommendation_limit: parse_or(
                &lookup,
                "RECOMMENDATION_LIMIT",
                d.recommendation_limit,
            )?,
            rollup_interval_secs: parse_or(
                &lookup,
                "ROLLUP_INTERVAL_SECS",
                d.rollup_interval_secs,
            )?,
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            vision,
            engine,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
