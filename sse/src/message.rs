use serde::Serialize;
use std::time::Duration;

/// Anything that can be written to an event stream as one SSE block.
pub trait Event: Send + 'static {
    /// Render the complete wire block, including the terminating blank line.
    fn render(&self) -> String;
}

/// A Server-Sent Events message.
///
/// Every field is optional: an empty field is left out of the rendered block
/// entirely, so `Message::new()` renders as a lone blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Event name; the browser dispatches the message to listeners for this name.
    pub event: String,
    /// Payload. Embedded newlines are sent as additional `data:` lines.
    pub data: String,
    /// Sets the EventSource's last event ID.
    pub id: String,
    /// Reconnection delay hint in milliseconds.
    pub retry: String,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// A message carrying only an event name.
    pub fn named(event: impl Into<String>) -> Self {
        Self::new().event(event)
    }

    /// A named message whose data is the JSON serialization of `payload`.
    pub fn json<T: Serialize + ?Sized>(
        event: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::named(event).data(serde_json::to_string(payload)?))
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = retry.as_millis().to_string();
        self
    }
}

impl Event for Message {
    fn render(&self) -> String {
        let mut block = String::new();
        for (field, value) in [
            ("event", &self.event),
            ("data", &self.data),
            ("id", &self.id),
            ("retry", &self.retry),
        ] {
            push_field(&mut block, field, value);
        }
        block.push('\n');
        block
    }
}

/// A comment line. The browser's event parser ignores it, which makes it the
/// conventional keep-alive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment(pub String);

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Event for Comment {
    fn render(&self) -> String {
        let mut block = String::new();
        push_field(&mut block, "", &self.0);
        if self.0.is_empty() {
            block.push_str(": \n");
        }
        block.push('\n');
        block
    }
}

/// Appends `<field>: <value>\n`, continuing every embedded newline as another
/// line with the same prefix. Empty values are skipped.
fn push_field(block: &mut String, field: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let prefix = format!("{field}: ");
    block.push_str(&prefix);
    block.push_str(&value.replace('\n', &format!("\n{prefix}")));
    block.push('\n');
}
