//! Sandbox capability trait abstracting the external sandbox edge, exactly as
//! the teacher's `conway::client::ConwayClient` shapes the same calls.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// The four sandbox operations replication needs. Real implementation talks
/// to Conway Cloud; tests use an in-memory double.
#[async_trait]
pub trait SandboxCapability: Send + Sync {
    async fn create_sandbox(&self, name: &str) -> anyhow::Result<String>;
    async fn exec(&self, sandbox_id: &str, command: &str) -> anyhow::Result<ExecOutput>;
    async fn write_file(&self, sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()>;
    async fn delete_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()>;
}

/// Real sandbox capability backed by Conway Cloud, grounded in the teacher's
/// `conway::client::ConwayClient` (same endpoints, generalized to operate
/// across sandbox ids instead of one fixed sandbox per client instance).
pub struct ConwaySandbox {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ConwaySandbox {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn sandbox_url(&self, sandbox_id: &str, path: &str) -> String {
        format!("{}/v1/sandboxes/{}/{}", self.base_url, sandbox_id, path)
    }
}

#[derive(serde::Serialize)]
struct CreateSandboxRequest<'a> {
    name: &'a str,
}

#[derive(serde::Deserialize)]
struct CreateSandboxResponse {
    sandbox_id: String,
}

#[derive(serde::Serialize)]
struct ExecRequest<'a> {
    command: &'a str,
    timeout_ms: u64,
}

#[derive(serde::Deserialize)]
struct ExecResponse {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

#[derive(serde::Serialize)]
struct WriteFileRequest<'a> {
    path: &'a str,
    content: &'a str,
}

const SANDBOX_OP_TIMEOUT_SECS: u64 = 60;

#[async_trait]
impl SandboxCapability for ConwaySandbox {
    async fn create_sandbox(&self, name: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(format!("{}/v1/sandboxes", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateSandboxRequest { name })
            .timeout(std::time::Duration::from_secs(SANDBOX_OP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("create_sandbox failed ({status}): {body}");
        }
        let body: CreateSandboxResponse = resp.json().await?;
        Ok(body.sandbox_id)
    }

    async fn exec(&self, sandbox_id: &str, command: &str) -> anyhow::Result<ExecOutput> {
        let resp = self
            .http
            .post(self.sandbox_url(sandbox_id, "exec"))
            .bearer_auth(&self.api_key)
            .json(&ExecRequest {
                command,
                timeout_ms: SANDBOX_OP_TIMEOUT_SECS * 1000,
            })
            .timeout(std::time::Duration::from_secs(SANDBOX_OP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("exec failed ({status}): {body}");
        }
        let body: ExecResponse = resp.json().await?;
        Ok(ExecOutput {
            stdout: body.stdout,
            stderr: body.stderr,
            exit_code: body.exit_code,
        })
    }

    async fn write_file(&self, sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        let resp = self
            .http
            .put(self.sandbox_url(sandbox_id, "files"))
            .bearer_auth(&self.api_key)
            .json(&WriteFileRequest { path, content })
            .timeout(std::time::Duration::from_secs(SANDBOX_OP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("write_file failed ({status}): {body}");
        }
        Ok(())
    }

    async fn delete_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()> {
        let resp = self
            .http
            .delete(format!("{}/v1/sandboxes/{}", self.base_url, sandbox_id))
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(SANDBOX_OP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("delete_sandbox failed ({status}): {body}");
        }
        Ok(())
    }
}
