//! Server-Sent Events 디코더
//!
//! 네트워크 청크 경계가 줄이나 UTF-8 문자 중간에 걸려도 동작하도록
//! 바이트 단위로 버퍼링합니다. `data:` 필드만 해석합니다.
//! ref: https://html.spec.whatwg.org/multipage/server-sent-events.html

/// 증분 SSE 디코더
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// 아직 줄바꿈을 만나지 못한 바이트
    buffer: Vec<u8>,
    /// 현재 이벤트의 data 줄들
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 청크를 넣고 완성된 이벤트의 data 페이로드를 반환
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.process_line(&String::from_utf8_lossy(&line), &mut events);
        }
        events
    }

    /// 스트림 종료 시 남은 이벤트 반환 (마지막 빈 줄 누락 허용)
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(String::from_utf8_lossy(&line).trim_end_matches('\r'), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        // 주석
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data_lines.is_empty() {
            events.push(self.data_lines.join("\n"));
            self.data_lines.clear();
        }
    }
}
