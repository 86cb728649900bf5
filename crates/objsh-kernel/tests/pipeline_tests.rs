//! Integration tests for pipelines, nesting and cancellation.
//!
//! Tests verify:
//! - stages stream items to each other in order
//! - resolution failures leave the pipeline stack alone
//! - stopping mid-stream keeps what was already emitted
//! - nested invocations see the parent stack and input

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use objsh_kernel::{
    bind, BoundParameters, Command, CommandArgs, CommandSchema, ExecContext, ParamSpec, ParamType,
    Pipeline, PipelineInput, PipelineState, Runspace, RunspaceConfig, StageIo,
};
use objsh_types::{ShellError, ShellObject, ShellResult, Value};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Test Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Log = Arc<Mutex<Vec<String>>>;

fn log(log: &Log, entry: String) {
    log.lock().unwrap().push(entry);
}

/// Emits 1..=Count, logging each emission.
struct Emit(Log);

#[async_trait]
impl Command for Emit {
    fn name(&self) -> &str {
        "emit"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("emit", "emit numbers").param(ParamSpec::new("Count", ParamType::Int).at(0).required())
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, _ctx: &mut ExecContext) -> ShellResult<()> {
        let count = params.get("Count").and_then(Value::as_int).unwrap_or(0);
        for n in 1..=count {
            log(&self.0, format!("emit {n}"));
            io.output.write(n).await?;
        }
        Ok(())
    }
}

/// Doubles each integer it reads.
struct Double(Log);

#[async_trait]
impl Command for Double {
    fn name(&self) -> &str {
        "double"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("double", "double each input")
    }

    async fn execute(&self, _params: BoundParameters, io: &mut StageIo, _ctx: &mut ExecContext) -> ShellResult<()> {
        while let Some(item) = io.input.next().await {
            let n = item.base_object().as_int().unwrap_or(0);
            log(&self.0, format!("see {n}"));
            io.output.write(n * 2).await?;
        }
        Ok(())
    }
}

/// Passes input through and stops its pipeline after Count items.
struct StopAfter;

#[async_trait]
impl Command for StopAfter {
    fn name(&self) -> &str {
        "stop-after"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("stop-after", "stop the pipeline after some items")
            .param(ParamSpec::new("Count", ParamType::Int).at(0).required())
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, ctx: &mut ExecContext) -> ShellResult<()> {
        let limit = params.get("Count").and_then(Value::as_int).unwrap_or(0);
        let mut seen = 0;
        while let Some(item) = io.input.next().await {
            io.output.write_object(item).await?;
            seen += 1;
            if seen == limit {
                ctx.cancel();
            }
        }
        Ok(())
    }
}

/// Writes the depth of the pipeline stack it runs in.
struct Depth;

#[async_trait]
impl Command for Depth {
    fn name(&self) -> &str {
        "get-depth"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("get-depth", "report the stack depth")
    }

    async fn execute(&self, _params: BoundParameters, io: &mut StageIo, ctx: &mut ExecContext) -> ShellResult<()> {
        io.output.write(ctx.depth()).await
    }
}

fn make_runspace(log: &Log) -> Arc<Runspace> {
    init_tracing();
    let mut rs = Runspace::new(RunspaceConfig::transient().with_stage_buffer(1));
    rs.register(Emit(log.clone()));
    rs.register(Double(log.clone()));
    rs.register(StopAfter);
    rs.register(Depth);
    Arc::new(rs)
}

fn stage(ctx: &ExecContext, name: &str, args: CommandArgs) -> objsh_kernel::BoundCommand {
    let info = ctx.resolve(name).unwrap();
    bind(&info, &args).unwrap()
}

fn ints(out: &[ShellObject]) -> Vec<i64> {
    out.iter().filter_map(|o| o.base_object().as_int()).collect()
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter().position(|e| e == entry).unwrap()
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_two_stages_stream_in_order() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    let mut pipeline = Pipeline::new(vec![
        stage(&ctx, "emit", CommandArgs::new().arg(3)),
        stage(&ctx, "double", CommandArgs::new()),
    ]);

    let out = pipeline.invoke(&mut ctx).await.unwrap();
    assert_eq!(ints(&out), vec![2, 4, 6]);
    assert_eq!(pipeline.state(), PipelineState::Completed);

    let events = events.lock().unwrap().clone();
    for n in 1..=3 {
        assert!(position(&events, &format!("emit {n}")) < position(&events, &format!("see {n}")));
    }
    // With a one-slot channel the second stage must start before the
    // first one finishes.
    assert!(position(&events, "see 1") < position(&events, "emit 3"));
}

#[tokio::test]
async fn test_caller_input_feeds_first_stage() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let out = rs
        .invoke("double", &CommandArgs::new(), vec![Value::Int(5), Value::Int(7)])
        .await
        .unwrap();
    assert_eq!(ints(&out), vec![10, 14]);
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_command_not_found_leaves_stack_unchanged() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    assert_eq!(ctx.depth(), 0);

    let err = ctx
        .invoke_command("no-such-command", &CommandArgs::new(), PipelineInput::None)
        .await
        .unwrap_err();
    assert_eq!(err, ShellError::CommandNotFound("no-such-command".into()));
    assert_eq!(ctx.depth(), 0);
    assert!(ctx.current_pipeline().is_none());
}

#[tokio::test]
async fn test_stage_failure_pops_stack() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    let err = ctx
        .invoke_command("get-variable", &CommandArgs::new().arg("missing"), PipelineInput::None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "get-variable missing: the variable missing could not be found");
    assert_eq!(ctx.depth(), 0);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_stop_mid_stream_keeps_emitted_items() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    let mut pipeline = Pipeline::new(vec![
        stage(&ctx, "emit", CommandArgs::new().arg(100)),
        stage(&ctx, "stop-after", CommandArgs::new().arg(3)),
    ]);

    let out = pipeline.invoke(&mut ctx).await.unwrap();
    assert_eq!(ints(&out), vec![1, 2, 3]);
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(ctx.depth(), 0);
    assert!(!ctx.is_cancelled(), "stopping a pipeline leaves its caller running");
}

#[tokio::test]
async fn test_cancelled_context_stops_pipeline() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    ctx.cancel();
    let mut pipeline = Pipeline::new(vec![stage(&ctx, "emit", CommandArgs::new().arg(10))]);
    let out = pipeline.invoke(&mut ctx).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(ctx.depth(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_handle_from_another_task() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    let mut pipeline = Pipeline::new(vec![stage(&ctx, "emit", CommandArgs::new().arg(i64::MAX))]);
    let handle = pipeline.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        handle.cancel();
    });

    let out = pipeline.invoke(&mut ctx).await.unwrap();
    let values = ints(&out);
    assert!(values.iter().copied().eq(1..=values.len() as i64), "prefix kept in order");
    assert_eq!(pipeline.state(), PipelineState::Stopped);
}

// ============================================================================
// Nesting
// ============================================================================

#[tokio::test]
async fn test_nested_invocation_sees_parent_stack() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();

    let top = ctx
        .invoke_command("get-depth", &CommandArgs::new(), PipelineInput::None)
        .await
        .unwrap();
    assert_eq!(ints(&top), vec![1]);

    let nested = ctx
        .invoke_command("invoke-command", &CommandArgs::new().arg("get-depth"), PipelineInput::None)
        .await
        .unwrap();
    assert_eq!(ints(&nested), vec![2]);
    assert_eq!(ctx.depth(), 0);
}

#[tokio::test]
async fn test_nested_invocation_consumes_stage_input() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let mut ctx = rs.context();
    let mut pipeline = Pipeline::new(vec![
        stage(&ctx, "emit", CommandArgs::new().arg(3)),
        stage(&ctx, "invoke-command", CommandArgs::new().arg("double")),
    ]);
    let out = pipeline.invoke(&mut ctx).await.unwrap();
    assert_eq!(ints(&out), vec![2, 4, 6]);
}

#[tokio::test]
async fn test_nested_pipeline_requires_running_pipeline() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let ctx = rs.context();
    assert!(matches!(
        ctx.create_nested_pipeline(),
        Err(ShellError::InvalidOperation(_))
    ));
}

// ============================================================================
// Error stream
// ============================================================================

#[tokio::test]
async fn test_errors_travel_with_output() {
    let events = Log::default();
    let rs = make_runspace(&events);
    let out = rs
        .invoke("write-error", &CommandArgs::new().arg("bad input"), vec![Value::from("also bad")])
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(ShellObject::write_to_error_stream));
}
