//! Site hook script invocation.
//!
//! The script is run as `SCRIPT ACTION` and the daemon blocks until it exits.
//! Only spawning and reaping can fail; the exit status is logged.

use crate::error::Result;
use crate::process::{self, ProcessSpec};
use q6voiced_protocol::HookAction;
use std::path::PathBuf;

pub trait HookRunner {
    fn run(&mut self, action: HookAction) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    script: PathBuf,
}

impl ScriptRunner {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl HookRunner for ScriptRunner {
    fn run(&mut self, action: HookAction) -> Result<()> {
        let spec = ProcessSpec::new(&self.script)
            .arg(action.as_str())
            .die_on_parent_exit();
        let status = process::run_to_completion(&spec)?;
        if status.success() {
            tracing::debug!(action = %action, "Hook script finished");
        } else {
            tracing::warn!(
                action = %action,
                script = %self.script.display(),
                status = %status,
                "Hook script exited unsuccessfully"
            );
        }
        Ok(())
    }
}
