//! Pipeline execution for objsh.
//!
//! Runs a sequence of bound commands where each stage's output stream is
//! the next stage's input stream. All stages, the input feeder and the
//! output collector are polled together on the invoking task, so a stage
//! waiting on an empty input or a full output simply yields.

use futures::future::try_join_all;
use objsh_types::{ShellError, ShellObject, ShellResult, Value};
use tokio_util::sync::CancellationToken;

use crate::binder::BoundCommand;
use crate::context::{ExecContext, PipelineFrame};

use super::stream::{object_stream, InputStream, OutputStream, StageIo};

/// What the first stage reads.
#[derive(Debug, Default)]
pub enum PipelineInput {
    #[default]
    None,
    /// Caller-supplied values, wrapped as they are fed. Nulls are skipped.
    Items(Vec<Value>),
    /// The rest of an enclosing stage's input.
    Stream(InputStream),
}

impl From<Vec<Value>> for PipelineInput {
    fn from(items: Vec<Value>) -> Self {
        PipelineInput::Items(items)
    }
}

impl From<InputStream> for PipelineInput {
    fn from(stream: InputStream) -> Self {
        PipelineInput::Stream(stream)
    }
}

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running,
    Completed,
    /// Cancelled, or the consumer stopped reading.
    Stopped,
    Failed,
}

enum Sink<'a> {
    Collect(Vec<ShellObject>),
    Forward(&'a mut OutputStream),
}

impl Sink<'_> {
    async fn push(&mut self, item: ShellObject) -> ShellResult<()> {
        match self {
            Sink::Collect(items) => {
                items.push(item);
                Ok(())
            }
            Sink::Forward(out) => out.write_object(item).await,
        }
    }
}

/// An ordered list of bound commands plus the input they consume.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<BoundCommand>,
    input: PipelineInput,
    state: PipelineState,
    stop: CancellationToken,
}

impl Pipeline {
    pub fn new(stages: Vec<BoundCommand>) -> Self {
        Self {
            stages,
            input: PipelineInput::None,
            state: PipelineState::NotStarted,
            stop: CancellationToken::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<PipelineInput>) -> Self {
        self.input = input.into();
        self
    }

    /// Replace the input for the next invocation.
    pub fn set_input(&mut self, input: impl Into<PipelineInput>) {
        self.input = input.into();
    }

    pub fn add_stage(&mut self, stage: BoundCommand) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[BoundCommand] {
        &self.stages
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Token that stops this pipeline. A finished pipeline that was stopped
    /// gets a fresh token when invoked again.
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Run to completion and return the last stage's output in order.
    ///
    /// Stopping (through [`stop_handle`](Self::stop_handle) or the
    /// context's token) is not an error: the items produced so far are
    /// returned and the state becomes [`PipelineState::Stopped`].
    pub async fn invoke(&mut self, ctx: &mut ExecContext) -> ShellResult<Vec<ShellObject>> {
        let mut sink = Sink::Collect(Vec::new());
        self.run(ctx, &mut sink).await?;
        match sink {
            Sink::Collect(items) => Ok(items),
            Sink::Forward(_) => Ok(Vec::new()),
        }
    }

    /// Run, writing the last stage's output into `out` as it arrives.
    pub async fn invoke_into(&mut self, ctx: &mut ExecContext, out: &mut OutputStream) -> ShellResult<()> {
        self.run(ctx, &mut Sink::Forward(out)).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(stages = self.stages.len(), depth = ctx.depth()))]
    async fn run(&mut self, ctx: &mut ExecContext, sink: &mut Sink<'_>) -> ShellResult<()> {
        if self.stages.is_empty() {
            return Err(ShellError::InvalidOperation(
                "a pipeline needs at least one command".into(),
            ));
        }
        if self.state != PipelineState::NotStarted && self.stop.is_cancelled() {
            self.stop = CancellationToken::new();
        }

        let stop = self.stop.clone();
        let parent = ctx.cancel_token().clone();
        let capacity = ctx.runspace().config().stage_buffer;
        let input = std::mem::take(&mut self.input);

        let guard = ctx.push(PipelineFrame::new(&self.stages, stop.clone()));
        self.state = PipelineState::Running;

        let (feed_out, mut upstream) = object_stream(capacity, stop.clone());
        let mut stages = Vec::with_capacity(self.stages.len());
        for bound in &self.stages {
            let (out, next) = object_stream(capacity, stop.clone());
            let io = StageIo::new(upstream, out);
            stages.push(run_stage(bound.clone(), io, guard.stage_context(stop.clone())));
            upstream = next;
        }
        let mut last = upstream;

        let outcome = {
            let joined = async {
                tokio::try_join!(feed(input, feed_out), try_join_all(stages), collect(&mut last, &mut *sink))
                    .map(|_| ())
            };
            tokio::pin!(joined);
            tokio::select! {
                biased;
                _ = stop.cancelled() => None,
                _ = parent.cancelled() => {
                    stop.cancel();
                    None
                }
                result = &mut joined => Some(result),
            }
        };

        // Items the last stage emitted before a stop still count as output.
        for item in last.drain_ready() {
            if sink.push(item).await.is_err() {
                break;
            }
        }

        let result = match outcome {
            None | Some(Err(ShellError::PipelineStopped)) => {
                tracing::debug!("pipeline stopped");
                self.state = PipelineState::Stopped;
                Ok(())
            }
            Some(Ok(())) => {
                self.state = PipelineState::Completed;
                Ok(())
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "pipeline failed");
                self.state = PipelineState::Failed;
                Err(e)
            }
        };
        drop(guard);
        result
    }
}

async fn feed(input: PipelineInput, mut out: OutputStream) -> ShellResult<()> {
    match input {
        PipelineInput::None => {}
        PipelineInput::Items(items) => {
            for item in items {
                if out.write(item).await.is_err() {
                    break;
                }
            }
        }
        PipelineInput::Stream(mut stream) => {
            while let Some(item) = stream.next().await {
                if out.write_object(item).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn run_stage(bound: BoundCommand, mut io: StageIo, mut ctx: ExecContext) -> ShellResult<()> {
    let BoundCommand {
        info,
        params,
        argument,
    } = bound;
    tracing::trace!(command = %info.name, "stage start");
    let result = info.command.execute(params, &mut io, &mut ctx).await;
    // Closing both ends lets neighbours see end of input / stopped output.
    drop(io);
    match result {
        Ok(()) | Err(ShellError::PipelineStopped) => Ok(()),
        Err(e @ ShellError::StageExecution { .. }) => Err(e),
        Err(e) => Err(ShellError::StageExecution {
            command: info.name,
            argument,
            source: Box::new(e),
        }),
    }
}

async fn collect(input: &mut InputStream, sink: &mut Sink<'_>) -> ShellResult<()> {
    while let Some(item) = input.next().await {
        sink.push(item).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::binder::{bind, BoundParameters};
    use crate::commands::{Command, CommandArgs, CommandInfo, CommandSchema};
    use crate::config::RunspaceConfig;
    use crate::runspace::Runspace;

    struct Fail;

    #[async_trait]
    impl Command for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn schema(&self) -> CommandSchema {
            CommandSchema::new("fail", "always fails")
        }

        async fn execute(&self, _: BoundParameters, _: &mut StageIo, _: &mut ExecContext) -> ShellResult<()> {
            Err(ShellError::Failed("boom".into()))
        }
    }

    fn make_ctx() -> ExecContext {
        ExecContext::new(Arc::new(Runspace::new(RunspaceConfig::transient())))
    }

    fn stage(ctx: &ExecContext, name: &str) -> BoundCommand {
        let info = ctx.resolve(name).unwrap();
        bind(&info, &CommandArgs::new()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_invalid() {
        let mut ctx = make_ctx();
        let mut pipeline = Pipeline::new(Vec::new());
        assert!(matches!(
            pipeline.invoke(&mut ctx).await,
            Err(ShellError::InvalidOperation(_))
        ));
        assert_eq!(pipeline.state(), PipelineState::NotStarted);
    }

    #[tokio::test]
    async fn test_input_passes_through() {
        let mut ctx = make_ctx();
        let mut pipeline = Pipeline::new(vec![stage(&ctx, "write-output")])
            .with_input(vec![Value::Int(1), Value::Null, Value::from("two")]);
        let out = pipeline.invoke(&mut ctx).await.unwrap();
        let values: Vec<_> = out.iter().map(|o| o.base_object().clone()).collect();
        assert_eq!(values, vec![Value::Int(1), Value::from("two")]);
        assert_eq!(pipeline.state(), PipelineState::Completed);
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn test_stage_error_is_wrapped() {
        let mut ctx = make_ctx();
        let info = CommandInfo::new(Arc::new(Fail));
        let bound = bind(&info, &CommandArgs::new()).unwrap();
        let mut pipeline = Pipeline::new(vec![stage(&ctx, "write-output"), bound]).with_input(vec![Value::Int(1)]);
        let err = pipeline.invoke(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "fail: boom");
        assert_eq!(err.root_cause(), &ShellError::Failed("boom".into()));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn test_stopped_before_start_yields_nothing() {
        let mut ctx = make_ctx();
        let mut pipeline = Pipeline::new(vec![stage(&ctx, "write-output")]).with_input(vec![Value::Int(1)]);
        pipeline.stop();
        let out = pipeline.invoke(&mut ctx).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        // A stopped pipeline can run again with a fresh token.
        pipeline.set_input(vec![Value::Int(2)]);
        let out = pipeline.invoke(&mut ctx).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(pipeline.state(), PipelineState::Completed);
        assert!(!pipeline.stop_handle().is_cancelled());
    }
}
