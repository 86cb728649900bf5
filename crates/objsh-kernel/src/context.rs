//! Execution context passed to commands.
//!
//! The context replaces any process-wide "current runspace" or "current
//! pipeline": it carries the runspace handle, the stack of running
//! pipelines, and the cancellation token that stops them. Stages get a
//! child context whose stack includes the pipeline they run in.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use objsh_types::{ShellError, ShellObject, ShellResult};
use tokio_util::sync::CancellationToken;

use crate::binder::{bind, BoundCommand};
use crate::commands::{CommandArgs, CommandInfo};
use crate::runspace::Runspace;
use crate::scheduler::{OutputStream, Pipeline, PipelineInput};
use crate::scope::OFS;

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Stack entry for a running pipeline.
#[derive(Debug, Clone)]
pub struct PipelineFrame {
    pub id: u64,
    /// Command names of the stages, in order.
    pub commands: Vec<String>,
    stop: CancellationToken,
}

impl PipelineFrame {
    pub fn new(stages: &[BoundCommand], stop: CancellationToken) -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            commands: stages.iter().map(|s| s.name().to_string()).collect(),
            stop,
        }
    }

    /// Stop the pipeline this frame belongs to.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Execution context passed to commands.
#[derive(Debug, Clone)]
pub struct ExecContext {
    runspace: Arc<Runspace>,
    /// Running pipelines, outermost first.
    frames: Vec<PipelineFrame>,
    cancel: CancellationToken,
}

impl ExecContext {
    /// A fresh top-level context with an empty pipeline stack.
    pub fn new(runspace: Arc<Runspace>) -> Self {
        Self {
            runspace,
            frames: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn runspace(&self) -> &Arc<Runspace> {
        &self.runspace
    }

    /// Number of pipelines currently running in this context.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost running pipeline.
    pub fn current_pipeline(&self) -> Option<&PipelineFrame> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[PipelineFrame] {
        &self.frames
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop everything running under this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve a command in this context's runspace. Never touches the stack.
    pub fn resolve(&self, name: &str) -> ShellResult<CommandInfo> {
        self.runspace.resolve(name)
    }

    /// Push a frame; it is popped when the guard drops.
    pub fn push(&mut self, frame: PipelineFrame) -> StackGuard<'_> {
        tracing::trace!(pipeline = frame.id, depth = self.frames.len() + 1, "push pipeline");
        self.frames.push(frame);
        StackGuard { ctx: self }
    }

    /// Context for a stage of the innermost pipeline: same runspace and
    /// stack, cancelled when that pipeline stops.
    pub(crate) fn stage_context(&self, stop: CancellationToken) -> ExecContext {
        ExecContext {
            runspace: self.runspace.clone(),
            frames: self.frames.clone(),
            cancel: stop,
        }
    }

    /// An empty pipeline meant to run inside the current one.
    pub fn create_nested_pipeline(&self) -> ShellResult<Pipeline> {
        if self.frames.is_empty() {
            return Err(ShellError::InvalidOperation(
                "a nested pipeline requires a running pipeline".into(),
            ));
        }
        Ok(Pipeline::new(Vec::new()))
    }

    fn prepare(&self, name: &str, args: &CommandArgs, input: PipelineInput) -> ShellResult<Pipeline> {
        let info = self.resolve(name)?;
        let bound = bind(&info, args)?;
        let mut pipeline = if self.frames.is_empty() {
            Pipeline::new(Vec::new())
        } else {
            self.create_nested_pipeline()?
        };
        pipeline.add_stage(bound);
        Ok(pipeline.with_input(input))
    }

    /// Resolve, bind and run one command, collecting its output.
    #[tracing::instrument(level = "debug", skip(self, args, input), fields(command = %name, depth = self.depth()))]
    pub async fn invoke_command(
        &mut self,
        name: &str,
        args: &CommandArgs,
        input: PipelineInput,
    ) -> ShellResult<Vec<ShellObject>> {
        let mut pipeline = self.prepare(name, args, input)?;
        pipeline.invoke(self).await
    }

    /// Like [`invoke_command`](Self::invoke_command), streaming the output
    /// into `out` as it is produced.
    #[tracing::instrument(level = "debug", skip(self, args, input, out), fields(command = %name, depth = self.depth()))]
    pub async fn invoke_command_into(
        &mut self,
        name: &str,
        args: &CommandArgs,
        input: PipelineInput,
        out: &mut OutputStream,
    ) -> ShellResult<()> {
        let mut pipeline = self.prepare(name, args, input)?;
        pipeline.invoke_into(self, out).await
    }

    /// Array separator for text rendering: `$OFS` if set, else the
    /// configured one.
    pub async fn output_field_separator(&self) -> String {
        match self.runspace.scope().read().await.get(OFS) {
            Some(ofs) if !ofs.is_null() => ofs.to_string(),
            _ => self.runspace.config().output_field_separator.clone(),
        }
    }

    /// Text form of an item using the session's separator.
    pub async fn render(&self, obj: &ShellObject) -> String {
        obj.to_string_with(&self.output_field_separator().await)
    }
}

/// Keeps a pipeline frame on the stack for as long as it lives.
///
/// Dropping the guard (on success, error, or when the owning future is
/// dropped) pops the frame.
pub struct StackGuard<'a> {
    ctx: &'a mut ExecContext,
}

impl Deref for StackGuard<'_> {
    type Target = ExecContext;

    fn deref(&self) -> &ExecContext {
        self.ctx
    }
}

impl DerefMut for StackGuard<'_> {
    fn deref_mut(&mut self) -> &mut ExecContext {
        self.ctx
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.ctx.frames.pop() {
            tracing::trace!(pipeline = frame.id, depth = self.ctx.frames.len(), "pop pipeline");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunspaceConfig;

    fn make_ctx() -> ExecContext {
        ExecContext::new(Arc::new(Runspace::new(RunspaceConfig::transient())))
    }

    #[test]
    fn guard_pops_on_drop() {
        let mut ctx = make_ctx();
        {
            let guard = ctx.push(PipelineFrame::new(&[], CancellationToken::new()));
            assert_eq!(guard.depth(), 1);
            assert!(guard.current_pipeline().is_some());
        }
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.current_pipeline().is_none());
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let mut ctx = make_ctx();
        let mut outer = ctx.push(PipelineFrame::new(&[], CancellationToken::new()));
        let outer_id = outer.current_pipeline().map(|f| f.id);
        {
            let inner = outer.push(PipelineFrame::new(&[], CancellationToken::new()));
            assert_eq!(inner.depth(), 2);
            assert_ne!(inner.current_pipeline().map(|f| f.id), outer_id);
        }
        assert_eq!(outer.current_pipeline().map(|f| f.id), outer_id);
        drop(outer);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn nested_pipeline_requires_running_pipeline() {
        let mut ctx = make_ctx();
        assert!(matches!(
            ctx.create_nested_pipeline(),
            Err(ShellError::InvalidOperation(_))
        ));
        let guard = ctx.push(PipelineFrame::new(&[], CancellationToken::new()));
        assert!(guard.create_nested_pipeline().is_ok());
    }

    #[test]
    fn stage_context_shares_stack_and_stop() {
        let mut ctx = make_ctx();
        let stop = CancellationToken::new();
        let guard = ctx.push(PipelineFrame::new(&[], stop.clone()));
        let child = guard.stage_context(stop.clone());
        assert_eq!(child.depth(), 1);
        assert!(Arc::ptr_eq(child.runspace(), guard.runspace()));
        child.cancel();
        assert!(stop.is_cancelled());
        assert!(guard.current_pipeline().is_some_and(PipelineFrame::is_stopping));
        assert!(!guard.is_cancelled());
    }

    #[tokio::test]
    async fn ofs_variable_overrides_config() {
        let ctx = make_ctx();
        assert_eq!(ctx.output_field_separator().await, " ");
        ctx.runspace().scope().write().await.set("ofs", ",".into());
        let obj = ShellObject::new(objsh_types::Value::Array(vec![1i64.into(), 2i64.into()])).unwrap();
        assert_eq!(ctx.render(&obj).await, "1,2");
    }
}
