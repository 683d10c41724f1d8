use crate::backend::ProcessHandle;
use crate::RuntimeError;
use std::io::{BufRead, BufReader, Write};
use tracing::debug;

/// Copy a container's output to `sink`, one line at a time, until the stream
/// ends. Each chunk is decoded as UTF-8 (invalid sequences replaced) and
/// flushed as soon as it arrives.
///
/// A handle without a log stream is left untouched. Returns the number of
/// chunks written.
pub fn stream_logs<W: Write + ?Sized>(
    handle: &mut ProcessHandle,
    sink: &mut W,
) -> Result<u64, RuntimeError> {
    let Some(logs) = handle.logs.as_mut() else {
        debug!("container {} has no logs to stream", handle.container_id());
        return Ok(0);
    };

    let mut reader = BufReader::new(logs);
    let mut chunk = Vec::new();
    let mut count = 0;
    loop {
        chunk.clear();
        if reader.read_until(b'\n', &mut chunk)? == 0 {
            break;
        }
        sink.write_all(String::from_utf8_lossy(&chunk).as_bytes())?;
        sink.flush()?;
        count += 1;
    }
    debug!("log stream ended after {count} chunks");
    Ok(count)
}
