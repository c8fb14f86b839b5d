//! Replication subsystem: spawns and manages child automata inside remote
//! sandboxes, grounded in the teacher's `self_mod::tools_manager::install_tool`
//! (exec + typed failure propagation) and `conway::client::ConwayClient` (the
//! shape of a capability client).

pub mod lifecycle;
pub mod sandbox;

pub use sandbox::{ConwaySandbox, ExecOutput, SandboxCapability};

use crate::error::MoneyClawError;
use crate::store::Database;
use crate::types::{ChildRecord, ChildStatus, Identity};
use chrono::Utc;
use std::sync::OnceLock;
use tracing::{info, warn};

fn wallet_address_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap())
}

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Validate a reported wallet address: `0x` + 40 hex digits, not the zero address.
pub fn validate_wallet_address(address: &str) -> Result<(), MoneyClawError> {
    if !wallet_address_re().is_match(address) {
        return Err(MoneyClawError::Validation(format!(
            "child wallet address invalid: {address}"
        )));
    }
    if address.eq_ignore_ascii_case(ZERO_ADDRESS) {
        return Err(MoneyClawError::Validation(
            "child wallet address invalid: zero address".to_string(),
        ));
    }
    Ok(())
}

/// Pull the first `0x`-prefixed 40-hex-digit token out of init-command stdout.
fn extract_wallet_address(stdout: &str) -> Option<String> {
    static TOKEN_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| regex::Regex::new(r"0x[0-9a-fA-F]{40}").unwrap());
    re.find(stdout).map(|m| m.as_str().to_string())
}

/// Spawn a child automaton per the protocol in spec.md §4.6.
///
/// On failure in steps 2-4, attempts sandbox deletion then propagates the
/// *original* error — a delete-time error is logged but never masks it.
pub async fn spawn_child(
    sandbox_cap: &dyn SandboxCapability,
    identity: &Identity,
    db: &mut Database,
    name: &str,
    genesis_prompt: &str,
) -> anyhow::Result<ChildRecord> {
    let sandbox_id = sandbox_cap.create_sandbox(name).await?;

    let address = match install_and_verify(sandbox_cap, &sandbox_id).await {
        Ok(address) => address,
        Err(original) => {
            if let Err(delete_err) = sandbox_cap.delete_sandbox(&sandbox_id).await {
                warn!(sandbox_id, error = %delete_err, "sandbox cleanup after spawn failure also failed");
            }
            return Err(original);
        }
    };

    let mut child = ChildRecord {
        id: ulid::Ulid::new().to_string(),
        name: name.to_string(),
        address,
        sandbox_id: sandbox_id.clone(),
        genesis_prompt: genesis_prompt.to_string(),
        status: ChildStatus::SandboxCreated,
        created_at: Utc::now(),
    };
    db.add_child(&child)?;
    info!(child_id = %child.id, sandbox_id, "child sandbox created and wallet verified");

    fund_child(&child).await?;
    db.update_child_status(&child.id, "funded", ChildStatus::Funded)?;
    child.status = ChildStatus::Funded;

    db.update_child_status(&child.id, "starting", ChildStatus::Starting)?;
    child.status = ChildStatus::Starting;
    sandbox_cap
        .exec(&sandbox_id, "automaton --run &")
        .await
        .map_err(|e| anyhow::anyhow!("failed to start child agent loop: {e}"))?;
    db.update_child_status(&child.id, "healthy", ChildStatus::Healthy)?;
    child.status = ChildStatus::Healthy;

    info!(child_id = %child.id, creator = %identity.wallet_address, "child is healthy");
    Ok(child)
}

/// Steps 2-4 of the spawn protocol: install deps, run init, parse + validate
/// the wallet address. Returns the validated address or the original failure.
async fn install_and_verify(
    sandbox_cap: &dyn SandboxCapability,
    sandbox_id: &str,
) -> anyhow::Result<String> {
    sandbox_cap
        .exec(sandbox_id, "automaton-runtime install")
        .await
        .map_err(|e| anyhow::anyhow!("runtime dependency install failed: {e}"))?;

    let init = sandbox_cap
        .exec(sandbox_id, "automaton-runtime init")
        .await
        .map_err(|e| anyhow::anyhow!("init command failed: {e}"))?;

    let address = extract_wallet_address(&init.stdout).ok_or_else(|| {
        anyhow::Error::from(MoneyClawError::Validation(
            "no wallet address found in init output".to_string(),
        ))
    })?;

    validate_wallet_address(&address)?;
    Ok(address)
}

/// Fund the child wallet. Described abstractly as a capability call in the
/// spec; this crate has no payment rail of its own, so this is a no-op hook
/// kept for the protocol's shape (the step still records its lifecycle event).
async fn fund_child(_child: &ChildRecord) -> anyhow::Result<()> {
    Ok(())
}

/// Attempt sandbox deletion; only on success transition the child to
/// `cleaned_up`. On failure the child remains in its prior state.
pub async fn cleanup(
    child_id: &str,
    sandbox_cap: &dyn SandboxCapability,
    db: &mut Database,
) -> anyhow::Result<()> {
    let child = db
        .get_child(child_id)?
        .ok_or_else(|| anyhow::anyhow!("unknown child: {child_id}"))?;

    sandbox_cap.delete_sandbox(&child.sandbox_id).await?;
    db.update_child_status(child_id, "cleaned_up", ChildStatus::CleanedUp)?;
    Ok(())
}

/// List children in `dead` status oldest-first; clean up all but the most
/// recent `keep_last`. Returns the number removed. Order-stable: ties on
/// timestamp break by id ascending (guaranteed by `list_children_by_status`).
pub async fn prune_dead_children(
    db: &mut Database,
    sandbox_cap: &dyn SandboxCapability,
    keep_last: usize,
) -> anyhow::Result<usize> {
    let dead = db.list_children_by_status(ChildStatus::Dead)?;
    if dead.len() <= keep_last {
        return Ok(0);
    }

    let to_remove = &dead[..dead.len() - keep_last];
    let mut removed = 0;
    for child in to_remove {
        cleanup(&child.id, sandbox_cap, db).await?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory sandbox double, grounded in `inference::providers::mock`'s
    /// scripted-response pattern.
    #[derive(Default)]
    struct MockSandboxCapability {
        exec_stdout: Mutex<Vec<String>>,
        create_should_fail: bool,
        deleted: Mutex<Vec<String>>,
    }

    impl MockSandboxCapability {
        fn with_exec_outputs(outputs: Vec<&str>) -> Self {
            Self {
                exec_stdout: Mutex::new(outputs.into_iter().map(String::from).collect()),
                ..Default::default()
            }
        }

        fn deleted_ids(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SandboxCapability for MockSandboxCapability {
        async fn create_sandbox(&self, _name: &str) -> anyhow::Result<String> {
            if self.create_should_fail {
                anyhow::bail!("create_sandbox failed");
            }
            Ok("sbx-test".to_string())
        }

        async fn exec(&self, _sandbox_id: &str, _command: &str) -> anyhow::Result<ExecOutput> {
            let mut queue = self.exec_stdout.lock().unwrap();
            if queue.is_empty() {
                return Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: 0,
                });
            }
            let stdout = queue.remove(0);
            Ok(ExecOutput {
                stdout,
                stderr: String::new(),
                exit_code: 0,
            })
        }

        async fn write_file(&self, _sandbox_id: &str, _path: &str, _content: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn delete_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()> {
            self.deleted.lock().unwrap().push(sandbox_id.to_string());
            Ok(())
        }
    }

    fn sample_identity() -> Identity {
        Identity {
            wallet_address: "0x1111111111111111111111111111111111111111".into(),
            creator_address: "0x2222222222222222222222222222222222222222".into(),
            genesis_prompt: "exist".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn address_validation_accepts_well_formed_address() {
        assert!(validate_wallet_address("0x1111111111111111111111111111111111111111").is_ok());
    }

    #[test]
    fn address_validation_rejects_zero_address() {
        let err = validate_wallet_address(ZERO_ADDRESS).unwrap_err();
        assert!(matches!(err, MoneyClawError::Validation(_)));
    }

    #[test]
    fn address_validation_rejects_malformed_address() {
        assert!(validate_wallet_address("0xnothex").is_err());
        assert!(validate_wallet_address("not-an-address").is_err());
    }

    #[tokio::test]
    async fn zero_address_guard_deletes_sandbox_and_inserts_no_child() {
        let cap = MockSandboxCapability::with_exec_outputs(vec![
            "installed ok",
            "Wallet: 0x0000000000000000000000000000000000000000",
        ]);
        let mut db = Database::open_memory().unwrap();
        let identity = sample_identity();

        let result = spawn_child(&cap, &identity, &mut db, "child-1", "survive").await;
        assert!(result.is_err());
        assert_eq!(cap.deleted_ids(), vec!["sbx-test".to_string()]);
        assert!(db.list_children().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sandbox_create_failure_never_attempts_delete() {
        let cap = MockSandboxCapability {
            create_should_fail: true,
            ..Default::default()
        };
        let mut db = Database::open_memory().unwrap();
        let identity = sample_identity();

        let result = spawn_child(&cap, &identity, &mut db, "child-1", "survive").await;
        assert!(result.is_err());
        assert!(cap.deleted_ids().is_empty());
        assert!(db.list_children().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_spawn_reaches_healthy() {
        let cap = MockSandboxCapability::with_exec_outputs(vec![
            "installed ok",
            "Wallet: 0x1234567890123456789012345678901234567890",
            "starting ok",
        ]);
        let mut db = Database::open_memory().unwrap();
        let identity = sample_identity();

        let child = spawn_child(&cap, &identity, &mut db, "child-1", "survive")
            .await
            .unwrap();
        assert_eq!(child.status, ChildStatus::Healthy);
        assert_eq!(
            db.latest_lifecycle_state(&child.id).unwrap(),
            Some(ChildStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn cleanup_failure_preserves_prior_state() {
        struct FailingDelete;
        #[async_trait::async_trait]
        impl SandboxCapability for FailingDelete {
            async fn create_sandbox(&self, _name: &str) -> anyhow::Result<String> {
                Ok("sbx-x".into())
            }
            async fn exec(&self, _sandbox_id: &str, _command: &str) -> anyhow::Result<ExecOutput> {
                Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: 0,
                })
            }
            async fn write_file(&self, _s: &str, _p: &str, _c: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn delete_sandbox(&self, _sandbox_id: &str) -> anyhow::Result<()> {
                anyhow::bail!("delete failed")
            }
        }

        let mut db = Database::open_memory().unwrap();
        let child = ChildRecord {
            id: ulid::Ulid::new().to_string(),
            name: "kid".into(),
            address: "0x1234567890123456789012345678901234567890".into(),
            sandbox_id: "sbx-x".into(),
            genesis_prompt: "survive".into(),
            status: ChildStatus::Stopped,
            created_at: Utc::now(),
        };
        db.add_child(&child).unwrap();
        db.update_child_status(&child.id, "stopped", ChildStatus::Stopped)
            .unwrap();

        let cap = FailingDelete;
        let result = cleanup(&child.id, &cap, &mut db).await;
        assert!(result.is_err());
        assert_eq!(
            db.latest_lifecycle_state(&child.id).unwrap(),
            Some(ChildStatus::Stopped)
        );
    }

    #[tokio::test]
    async fn dead_child_pruning_removes_oldest_first() {
        let cap = MockSandboxCapability::default();
        let mut db = Database::open_memory().unwrap();

        let mut ids = Vec::new();
        for i in 0..7 {
            let child = ChildRecord {
                id: format!("dead-{i}"),
                name: format!("child-{i}"),
                address: "0x1234567890123456789012345678901234567890".into(),
                sandbox_id: format!("sbx-{i}"),
                genesis_prompt: "survive".into(),
                status: ChildStatus::Dead,
                created_at: Utc::now(),
            };
            db.add_child(&child).unwrap();
            ids.push(child.id);
        }

        let removed = prune_dead_children(&mut db, &cap, 5).await.unwrap();
        assert_eq!(removed, 2);
        let mut deleted = cap.deleted_ids();
        deleted.sort();
        let mut expected = vec!["sbx-0".to_string(), "sbx-1".to_string()];
        expected.sort();
        assert_eq!(deleted, expected);
    }
}
