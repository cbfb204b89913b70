use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

fn default_cache_capacity() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Comma-separated list of CSV paths or http(s) URLs.
    pub dataset_sources: Vec<String>,
    pub answer_cache_capacity: u64,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|e| anyhow::anyhow!("Failed to load GEMINI_API_KEY: {}", e))?;

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let dataset_sources: Vec<String> = std::env::var("DATASET_PATHS")
            .unwrap_or_else(|_| "data/h1_2025.csv,data/h2_2024.csv".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let answer_cache_capacity = std::env::var("ANSWER_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_cache_capacity);

        Ok(Config {
            gemini_api_key,
            gemini_model,
            dataset_sources,
            answer_cache_capacity,
        })
    }
}
