use serde_json::Value;

use super::utf8::Utf8Decoder;
use crate::core::GenerationError;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";
const CONTENT_POINTER: &str = "/choices/0/delta/content";

pub const DEFAULT_MAX_PENDING_BYTES: usize = 1_048_576;

enum Line {
    Skip,
    Done,
    Delta(Option<String>),
    /// Payload did not parse; assumed to be cut short.
    Incomplete,
}

fn classify(line: &str) -> Line {
    if line.starts_with(':') || line.trim().is_empty() {
        return Line::Skip;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };

    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Line::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Line::Delta(
            value
                .pointer(CONTENT_POINTER)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        ),
        Err(_) => Line::Incomplete,
    }
}

/// Decodes `data: {...}` event-stream lines into text deltas.
///
/// Bytes may arrive in chunks of any size. A complete line whose payload
/// fails to parse stays at the head of the buffer and is retried when more
/// bytes arrive; once the buffer outgrows `max_pending` the stream is
/// rejected as malformed. Deltas decoded from the chunk that crossed the
/// limit are still returned, and the error is reported by [`Self::overflow`]
/// and by every later call.
#[derive(Debug)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    done: bool,
    max_pending: usize,
    overflow: Option<GenerationError>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING_BYTES)
    }

    pub fn with_limit(max_pending: usize) -> Self {
        SseDecoder {
            utf8: Utf8Decoder::new(),
            buffer: String::new(),
            done: false,
            max_pending,
            overflow: None,
        }
    }

    /// True once `[DONE]` was seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Set once undecoded bytes outgrew the limit. The decoder accepts no
    /// more input after that.
    pub fn overflow(&self) -> Option<&GenerationError> {
        self.overflow.as_ref()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, GenerationError> {
        if self.done {
            return Ok(Vec::new());
        }
        if let Some(err) = &self.overflow {
            return Err(err.clone());
        }

        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
        let deltas = self.drain_lines();

        let pending = self.buffer.len() + self.utf8.pending_len();
        if !self.done && pending > self.max_pending {
            let err = GenerationError::Framing(format!(
                "{pending} undecoded bytes exceed the {} byte limit",
                self.max_pending
            ));
            self.overflow = Some(err.clone());
            if deltas.is_empty() {
                return Err(err);
            }
        }

        Ok(deltas)
    }

    /// Called when the transport closes. The unterminated tail is decoded as
    /// a last line; a payload that still does not parse is an error.
    pub fn finish(&mut self) -> Result<Vec<String>, GenerationError> {
        if self.done {
            return Ok(Vec::new());
        }
        if let Some(err) = &self.overflow {
            return Err(err.clone());
        }

        let rest = self.utf8.finish();
        self.buffer.push_str(&rest);
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }

        let deltas = self.drain_lines();
        if !self.done && !self.buffer.is_empty() {
            let line = self.buffer.lines().next().unwrap_or_default();
            let preview: String = line.chars().take(80).collect();
            return Err(GenerationError::Framing(format!("unparseable event payload: {preview}")));
        }

        Ok(deltas)
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        let mut consumed = 0;

        while let Some(offset) = self.buffer[consumed..].find('\n') {
            let end = consumed + offset;
            let raw = &self.buffer[consumed..end];
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let line_len = line.len();

            match classify(line) {
                Line::Skip | Line::Delta(None) => {}
                Line::Delta(Some(delta)) => deltas.push(delta),
                Line::Done => {
                    self.done = true;
                    self.buffer.clear();
                    return deltas;
                }
                Line::Incomplete => {
                    tracing::warn!(bytes = line_len, "event payload did not parse, waiting for more data");
                    break;
                }
            }

            consumed = end + 1;
        }

        self.buffer.drain(..consumed);
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    #[test]
    fn object_split_mid_payload_yields_one_delta() {
        let mut decoder = SseDecoder::new();

        let first = decoder.push(br#"data: {"choices":[{"delta":{"con"#).unwrap();
        assert!(first.is_empty());

        let second = decoder.push("tent\":\"你\"}}]}\n".as_bytes()).unwrap();
        assert_eq!(second, vec!["你".to_string()]);
    }

    #[test]
    fn skips_comments_blank_and_foreign_lines() {
        let mut decoder = SseDecoder::new();
        let input = format!(": keep-alive\n\n\r\nevent: message\nid: 7\n{}", frame("段落"));

        assert_eq!(decoder.push(input.as_bytes()).unwrap(), vec!["段落".to_string()]);
    }

    #[test]
    fn strips_carriage_return() {
        let mut decoder = SseDecoder::new();
        let input = frame("一").replace('\n', "\r\n");
        assert_eq!(decoder.push(input.as_bytes()).unwrap(), vec!["一".to_string()]);
    }

    #[test]
    fn stops_at_done_marker() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}data: [DONE]\n{}", frame("甲"), frame("乙"));

        assert_eq!(decoder.push(input.as_bytes()).unwrap(), vec!["甲".to_string()]);
        assert!(decoder.is_done());
        assert!(decoder.push(frame("丙").as_bytes()).unwrap().is_empty());
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn missing_or_empty_content_is_not_a_delta() {
        let mut decoder = SseDecoder::new();
        let input = concat!(
            "data: {\"choices\":[]}\n",
            "data: {\"choices\":[{\"delta\":{}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"usage\":{\"total_tokens\":3}}\n",
        );
        assert!(decoder.push(input.as_bytes()).unwrap().is_empty());
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn unterminated_tail_is_decoded_at_close() {
        let mut decoder = SseDecoder::new();
        let input = frame("尾");
        let without_newline = input.trim_end();

        assert!(decoder.push(without_newline.as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec!["尾".to_string()]);
    }

    #[test]
    fn corrupt_line_is_held_then_rejected_at_close() {
        let mut decoder = SseDecoder::new();
        let input = format!("data: {{not json\n{}", frame("后"));

        // the corrupt line blocks everything behind it
        assert!(decoder.push(input.as_bytes()).unwrap().is_empty());
        assert!(matches!(decoder.finish(), Err(GenerationError::Framing(_))));
    }

    #[test]
    fn pending_buffer_is_capped() {
        let mut decoder = SseDecoder::with_limit(64);
        let oversized = format!("data: {}", "x".repeat(100));

        assert!(matches!(
            decoder.push(oversized.as_bytes()),
            Err(GenerationError::Framing(_))
        ));
    }

    #[test]
    fn deltas_before_the_cap_are_kept() {
        let mut decoder = SseDecoder::with_limit(64);
        let input = format!("{}data: {}", frame("前文"), "x".repeat(100));

        assert_eq!(decoder.push(input.as_bytes()).unwrap(), vec!["前文".to_string()]);
        assert!(matches!(decoder.overflow(), Some(GenerationError::Framing(_))));
        assert!(matches!(decoder.push(frame("后").as_bytes()), Err(GenerationError::Framing(_))));
        assert!(matches!(decoder.finish(), Err(GenerationError::Framing(_))));
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = frame("合同").into_bytes();
        let cut = bytes.len() - 8; // inside the second character

        let mut out = decoder.push(&bytes[..cut]).unwrap();
        out.extend(decoder.push(&bytes[cut..]).unwrap());
        assert_eq!(out, vec!["合同".to_string()]);
    }
}
