//! Object streams linking pipeline stages.
//!
//! ```text
//!   OutputStream ──▶ [bounded mpsc channel] ──▶ InputStream
//!                    ├── writer waits when full (backpressure)
//!                    ├── reader waits when empty
//!                    ├── drop writer → end of input (next() returns None)
//!                    ├── drop reader → stopped pipeline (write returns PipelineStopped)
//!                    └── stop token  → both ends give up at the next await
//! ```

use objsh_types::{ShellError, ShellObject, ShellResult, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create a linked writer/reader pair with the given capacity.
pub fn object_stream(capacity: usize, stop: CancellationToken) -> (OutputStream, InputStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        OutputStream {
            tx: Some(tx),
            stop: stop.clone(),
        },
        InputStream { rx: Some(rx), stop },
    )
}

/// Reading end of a stage link.
#[derive(Debug)]
pub struct InputStream {
    rx: Option<mpsc::Receiver<ShellObject>>,
    stop: CancellationToken,
}

impl InputStream {
    /// A stream that is already at its end.
    pub fn empty() -> Self {
        Self {
            rx: None,
            stop: CancellationToken::new(),
        }
    }

    /// Next item, or `None` at end of input or once the pipeline stops.
    pub async fn next(&mut self) -> Option<ShellObject> {
        let rx = self.rx.as_mut()?;
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            item = rx.recv() => item,
        }
    }

    /// Drain everything that is left.
    pub async fn read_to_end(&mut self) -> Vec<ShellObject> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }

    /// Items already buffered, taken without waiting. Ignores the stop
    /// token.
    pub(crate) fn drain_ready(&mut self) -> Vec<ShellObject> {
        let mut items = Vec::new();
        if let Some(rx) = self.rx.as_mut() {
            while let Ok(item) = rx.try_recv() {
                items.push(item);
            }
        }
        items
    }

    /// Move the remaining input out, leaving this stream empty.
    pub fn take(&mut self) -> InputStream {
        std::mem::replace(self, InputStream::empty())
    }

    /// Stop reading; upstream writers see a stopped pipeline.
    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

/// Writing end of a stage link. Values are wrapped on write.
#[derive(Debug)]
pub struct OutputStream {
    tx: Option<mpsc::Sender<ShellObject>>,
    stop: CancellationToken,
}

impl OutputStream {
    /// A sink that refuses every write.
    pub fn closed() -> Self {
        Self {
            tx: None,
            stop: CancellationToken::new(),
        }
    }

    /// Wrap and write one value. Null is not written.
    pub async fn write(&mut self, value: impl Into<Value>) -> ShellResult<()> {
        match ShellObject::wrap_or_none(value.into()) {
            Some(obj) => self.write_object(obj).await,
            None => Ok(()),
        }
    }

    /// Write an array's elements one at a time; other values as-is.
    pub async fn write_enumerated(&mut self, value: impl Into<Value>) -> ShellResult<()> {
        match value.into() {
            Value::Array(items) => {
                for item in items {
                    self.write(item).await?;
                }
                Ok(())
            }
            other => self.write(other).await,
        }
    }

    /// Write an already-wrapped item, waiting while downstream is full.
    ///
    /// Fails with [`ShellError::PipelineStopped`] once the pipeline stops
    /// or downstream stops reading.
    pub async fn write_object(&mut self, obj: ShellObject) -> ShellResult<()> {
        if self.stop.is_cancelled() {
            return Err(ShellError::PipelineStopped);
        }
        let Some(tx) = self.tx.as_ref() else {
            return Err(ShellError::PipelineStopped);
        };
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => Err(ShellError::PipelineStopped),
            sent = tx.send(obj) => sent.map_err(|_| ShellError::PipelineStopped),
        }
    }

    /// Signal end of output to downstream.
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

/// The two ends a command sees while it runs as a stage.
#[derive(Debug)]
pub struct StageIo {
    pub input: InputStream,
    pub output: OutputStream,
}

impl StageIo {
    pub fn new(input: InputStream, output: OutputStream) -> Self {
        Self { input, output }
    }

    /// Copy every remaining input item to the output.
    pub async fn pass_through(&mut self) -> ShellResult<()> {
        while let Some(item) = self.input.next().await {
            self.output.write_object(item).await?;
        }
        Ok(())
    }
}
