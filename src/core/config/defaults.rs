//! Default values for optional configuration keys.

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_VECTORSET: &str = "multilingual-2024-05-06";
pub const DEFAULT_DOWNLOAD_URL_TTL_SECS: u64 = 3600;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ASK_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 800;
pub const DEFAULT_LLM_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_INSTRUCTIONS: &str = "You are an assistant that answers questions using only the \
documents provided in the context. Cite the document title (and page when available) for every \
fact you use. If the context does not contain the answer, say so plainly instead of guessing. \
Answer in the same language as the question.";

pub fn default_internal_domains() -> Vec<String> {
    vec!["nuclia".to_string(), "rag.progress.cloud".to_string()]
}

pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
pub fn default_port() -> u16 {
    DEFAULT_PORT
}
pub fn default_vectorset() -> String {
    DEFAULT_VECTORSET.to_string()
}
pub fn default_download_url_ttl_secs() -> u64 {
    DEFAULT_DOWNLOAD_URL_TTL_SECS
}
pub fn default_search_timeout_secs() -> u64 {
    DEFAULT_SEARCH_TIMEOUT_SECS
}
pub fn default_ask_timeout_secs() -> u64 {
    DEFAULT_ASK_TIMEOUT_SECS
}
pub fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}
pub fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}
pub fn default_llm_max_tokens() -> u32 {
    DEFAULT_LLM_MAX_TOKENS
}
pub fn default_llm_temperature() -> f64 {
    DEFAULT_LLM_TEMPERATURE
}
pub fn default_llm_timeout_secs() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}
pub fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}
pub fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}
pub fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
