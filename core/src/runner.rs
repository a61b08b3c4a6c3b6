//! Lifecycle hooks run over an execution chain.
//!
//! After a successful parse the execution chain lists the visited commands,
//! root first. [`Runner::execute`] walks it and calls the hooks registered
//! for each command path:
//!
//! 1. `persistent_pre_run` for every command, root first;
//! 2. `pre_run`, `run` and `post_run` for the final command only;
//! 3. `persistent_post_run` for every command reached, leaf first.
//!
//! What happens when a hook fails is decided by the [`OnErrorStrategy`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ChainLink, Record};

/// Error handling policy for lifecycle hooks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnErrorStrategy {
    /// Stop at the first error; persistent post hooks are skipped.
    #[default]
    Break,
    /// Stop the main phase at the first error, then run persistent post
    /// hooks, stopping at the first of those that fails.
    PostRunners,
    /// Like `PostRunners`, but every persistent post hook runs and the last
    /// error is returned.
    PostRunnersContinue,
    /// Never stop; each hook sees the most recent error.
    Continue,
}

/// What a hook gets to see.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    /// Space-separated command path, e.g. `app remote add`.
    pub command: &'a str,
    /// The whole parsed record.
    pub record: &'a Record,
    /// The command's own sub-record; `None` if it was never materialized.
    pub value: Option<&'a Record>,
    /// Most recent hook error, if any.
    pub last_error: Option<&'a anyhow::Error>,
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("command", &self.command)
            .field("last_error", &self.last_error.map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

/// Hooks attached to one command. Every method defaults to a no-op.
pub trait Hooks: Send + Sync {
    fn persistent_pre_run(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn pre_run(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn run(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn post_run(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn persistent_post_run(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    PersistentPre,
    Pre,
    Run,
    Post,
    PersistentPost,
}

/// Hook registry plus the error strategy.
#[derive(Clone, Default)]
pub struct Runner {
    hooks: HashMap<String, Arc<dyn Hooks>>,
    strategy: OnErrorStrategy,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.hooks.keys().collect();
        paths.sort();
        f.debug_struct("Runner")
            .field("hooks", &paths)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl Runner {
    pub fn new(strategy: OnErrorStrategy) -> Self {
        Self {
            hooks: HashMap::new(),
            strategy,
        }
    }

    pub fn strategy(&self) -> OnErrorStrategy {
        self.strategy
    }

    /// Attaches hooks to the command at `path` (e.g. `app remote`),
    /// replacing earlier ones.
    pub fn register(&mut self, path: &str, hooks: impl Hooks + 'static) {
        self.hooks.insert(path.to_string(), Arc::new(hooks));
    }

    /// Runs the hooks of `chain` against `record`.
    pub fn execute(&self, record: &Record, chain: &[ChainLink]) -> anyhow::Result<()> {
        let final_index = chain.len().saturating_sub(1);
        let mut last_error: Option<anyhow::Error> = None;
        let mut failed = false;
        let mut reached = Vec::new();

        'main: for (index, link) in chain.iter().enumerate() {
            let Some(hooks) = self.hooks.get(&link.path) else {
                continue;
            };
            reached.push((link, hooks));

            let phases: &[Phase] = if index == final_index {
                &[Phase::PersistentPre, Phase::Pre, Phase::Run, Phase::Post]
            } else {
                &[Phase::PersistentPre]
            };
            for &phase in phases {
                if let Err(err) = call(phase, hooks.as_ref(), record, link, last_error.as_ref()) {
                    failed = true;
                    last_error = Some(err);
                    if self.strategy != OnErrorStrategy::Continue {
                        break 'main;
                    }
                }
            }
        }

        if failed && self.strategy == OnErrorStrategy::Break {
            return Err(last_error.unwrap_or_else(|| anyhow::anyhow!("hook failed")));
        }

        for (link, hooks) in reached.into_iter().rev() {
            let result = call(
                Phase::PersistentPost,
                hooks.as_ref(),
                record,
                link,
                last_error.as_ref(),
            );
            if let Err(err) = result {
                if matches!(
                    self.strategy,
                    OnErrorStrategy::Break | OnErrorStrategy::PostRunners
                ) {
                    return Err(err);
                }
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn call(
    phase: Phase,
    hooks: &dyn Hooks,
    record: &Record,
    link: &ChainLink,
    last_error: Option<&anyhow::Error>,
) -> anyhow::Result<()> {
    let ctx = HookContext {
        command: &link.path,
        record,
        value: link.binding.get_record(record),
        last_error,
    };
    debug!(command = %link.path, phase = ?phase, "Running hook");
    let result = match phase {
        Phase::PersistentPre => hooks.persistent_pre_run(&ctx),
        Phase::Pre => hooks.pre_run(&ctx),
        Phase::Run => hooks.run(&ctx),
        Phase::Post => hooks.post_run(&ctx),
        Phase::PersistentPost => hooks.persistent_post_run(&ctx),
    };
    if let Err(err) = &result {
        debug!(command = %link.path, phase = ?phase, error = %err, "Hook failed");
    }
    result
}
