use std::io::{self, Write};

use crate::types::Message;

/// Append-only renderer of the transcript. Owns the full message history;
/// entries are never removed or mutated after append.
pub struct TranscriptView<W> {
    out: W,
    entries: Vec<Message>,
}

impl<W: Write> TranscriptView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            entries: Vec::new(),
        }
    }

    /// Appends the message and writes one kind-tagged entry to the sink.
    pub fn render(&mut self, message: Message) -> io::Result<()> {
        writeln!(self.out, "[{}] {}", message.kind, message.text)?;
        self.out.flush()?;
        self.entries.push(message);
        Ok(())
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    #[test]
    fn render_appends_in_order() {
        let mut view = TranscriptView::new(Vec::new());
        for i in 0..5 {
            view.render(Message::sent(format!("msg {i}"))).expect("render");
        }

        assert_eq!(view.len(), 5);
        let texts: Vec<&str> = view.entries().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn render_never_mutates_prior_entries() {
        let mut view = TranscriptView::new(Vec::new());
        view.render(Message::system("first")).expect("render");
        let before = view.entries()[0].clone();

        view.render(Message::error("second")).expect("render");

        assert_eq!(view.entries()[0], before);
        assert_eq!(view.entries()[1].kind, MessageKind::Error);
    }

    #[test]
    fn output_lines_are_tagged_by_kind() {
        let mut view = TranscriptView::new(Vec::new());
        view.render(Message::system("Connected to WebSocket server"))
            .expect("render");
        view.render(Message::received("pong")).expect("render");

        let output = String::from_utf8(view.out.clone()).expect("utf8");
        assert_eq!(
            output,
            "[system] Connected to WebSocket server\n[received] pong\n"
        );
    }
}
