// src/channel.rs
//
// JSON-lines transport for the bridge: one `MethodCall` per input line, one
// `MethodResult` per output line. Lets a host drive the bridge over a pipe
// (stdin/stdout of `ttyprobe serve`).

use std::io::{BufRead, Write};

use crate::bridge::{MethodCall, MethodResult, SerialBridge};
use crate::error::BridgeError;

/// Serve calls until `input` reaches EOF. Returns the number of calls answered.
pub fn serve<R: BufRead, W: Write>(
    bridge: &mut SerialBridge,
    input: R,
    mut output: W,
) -> std::io::Result<usize> {
    let mut answered = 0;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => bridge.handle(&call),
            Err(e) => {
                tlog!("[channel] Malformed request: {}", e);
                let err = BridgeError::InvalidArgument {
                    name: "request",
                    reason: e.to_string(),
                };
                MethodResult::failure("Malformed request", &err)
            }
        };

        serde_json::to_writer(&mut output, &result)?;
        output.write_all(b"\n")?;
        output.flush()?;
        answered += 1;
    }

    Ok(answered)
}
