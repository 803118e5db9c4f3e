use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub repo: RepoConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest fragments returned per semantic query.
    pub top_k: usize,
    /// Maximum fragment size in characters at index time.
    pub fragment_chars: usize,
    /// Character budget for context appended to a question.
    pub context_chars: usize,
    /// Character budget for the repository outline in the system prompt.
    pub outline_chars: usize,
    /// Context lines shown before each exact match.
    pub before_lines: usize,
    /// Context lines shown after each exact match.
    pub after_lines: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            max_tokens: 2048,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            root: "./code_repo".into(),
            cache_dir: ".".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: codelore_index::snapshot::DEFAULT_TOP_K,
            fragment_chars: 1500,
            context_chars: 6000,
            outline_chars: 4000,
            before_lines: 5,
            after_lines: 10,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CODELORE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("CODELORE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("CODELORE_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("CODELORE_REPO_ROOT") {
            self.repo.root = v.into();
        }
        if let Ok(v) = std::env::var("CODELORE_CACHE_DIR") {
            self.repo.cache_dir = v.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;

    // Tests touching process-global env vars must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_when_file_missing() {
        let config = Config::default();
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.fragment_chars, 1500);
        assert_eq!(config.retrieval.before_lines, 5);
        assert_eq!(config.retrieval.after_lines, 10);
    }

    #[test]
    fn parse_valid_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
[llm]
base_url = "http://localhost:11434/v1"
model = "llama3:8b"

[repo]
root = "/tmp/somerepo"

[retrieval]
top_k = 5
context_chars = 2000
"#
        )
        .unwrap();

        for key in [
            "CODELORE_LLM_BASE_URL",
            "CODELORE_LLM_MODEL",
            "CODELORE_EMBEDDING_MODEL",
            "CODELORE_REPO_ROOT",
            "CODELORE_CACHE_DIR",
        ] {
            unsafe { std::env::remove_var(key) };
        }

        let config = Config::load(&path).unwrap();
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "llama3:8b");
        assert_eq!(config.repo.root, PathBuf::from("/tmp/somerepo"));
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.context_chars, 2000);
        // Omitted sections keep their defaults.
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(config.retrieval.fragment_chars, 1500);
    }

    #[test]
    fn env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = Config::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");

        unsafe { std::env::set_var("CODELORE_LLM_MODEL", "gpt-4o") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("CODELORE_LLM_MODEL") };

        assert_eq!(config.llm.model, "gpt-4o");
    }
}
