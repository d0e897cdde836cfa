/// One delimited unit of the streaming wire protocol.
///
/// `data` is the newline-joined concatenation of every `data:` line in the
/// frame, in order. Frames without any data line are dropped by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Optional `event:` label naming the event kind.
    pub event: Option<String>,
    /// Concatenated data payload, not yet parsed as JSON.
    pub data: String,
}

/// Incremental decoder for blank-line-delimited event streams.
///
/// Operates on the accumulated buffer rather than per-chunk, so delimiters
/// split across network reads are handled. An incomplete trailing frame stays
/// buffered awaiting more bytes; on stream end an undelimited remainder is
/// discarded by dropping the decoder.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
}

impl SseFrameDecoder {
    /// Feed arbitrary bytes and drain every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        let text = String::from_utf8_lossy(bytes);
        // Some servers emit \r\n line endings; normalize before splitting.
        self.buffer.push_str(&text.replace('\r', ""));
        let mut frames = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let block = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            if let Some(frame) = parse_frame_block(&block) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Decode a complete stream body in one shot.
    pub fn decode_all(input: &str) -> Vec<RawFrame> {
        let mut decoder = Self::default();
        decoder.feed(input.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn parse_frame_block(block: &str) -> Option<RawFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(RawFrame {
        event,
        data: data_lines.join("\n"),
    })
}
