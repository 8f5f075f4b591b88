use crate::poller::PollConfig;

/// Connection context for the generation backend.
///
/// Injected explicitly into [`GenerationClient`](crate::GenerationClient)
/// at construction time -- nothing is read from ambient globals, so the
/// protocol is testable without a running application shell.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the task API, e.g. `https://api.muse.example`.
    pub api_base_url: String,
    /// Base URL used to resolve result `file_path`s into fetchable
    /// image URLs.
    pub storage_base_url: String,
    /// Bearer token sent on every request.
    pub auth_token: String,
    /// Id of the acting user, attached to submissions.
    pub user_id: String,
    /// Polling cadence and attempt budget.
    pub poll: PollConfig,
}

impl ClientConfig {
    /// Create a config with the default polling parameters.
    pub fn new(
        api_base_url: impl Into<String>,
        storage_base_url: impl Into<String>,
        auth_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            storage_base_url: storage_base_url.into(),
            auth_token: auth_token.into(),
            user_id: user_id.into(),
            poll: PollConfig::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `MUSE_API_URL`           | `http://localhost:8000`          |
    /// | `MUSE_STORAGE_URL`       | `http://localhost:8000/storage`  |
    /// | `MUSE_AUTH_TOKEN`        | (empty)                          |
    /// | `MUSE_USER_ID`           | `dev-user`                       |
    /// | `MUSE_POLL_INTERVAL_SECS`| `5`                              |
    /// | `MUSE_POLL_MAX_ATTEMPTS` | `60`                             |
    pub fn from_env() -> Self {
        let api_base_url =
            std::env::var("MUSE_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        let storage_base_url = std::env::var("MUSE_STORAGE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/storage".into());

        let auth_token = std::env::var("MUSE_AUTH_TOKEN").unwrap_or_default();

        let user_id = std::env::var("MUSE_USER_ID").unwrap_or_else(|_| "dev-user".into());

        let interval_secs: u64 = std::env::var("MUSE_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("MUSE_POLL_INTERVAL_SECS must be a valid u64");

        let max_attempts: u32 = std::env::var("MUSE_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("MUSE_POLL_MAX_ATTEMPTS must be a valid u32");

        Self {
            api_base_url,
            storage_base_url,
            auth_token,
            user_id,
            poll: PollConfig {
                interval: std::time::Duration::from_secs(interval_secs),
                max_attempts,
            },
        }
    }
}
