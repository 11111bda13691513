//! i3bar wire protocol: feed encoding and click-event decoding.
//!
//! The output is the streaming-array form of the i3bar protocol: a one-line
//! capability header, an opening `[`, then one array element per dispatch
//! cycle, every element ending in a comma. Input is the click-event stream
//! the bar writes back; fragments are parsed leniently and dropped silently
//! when malformed.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::Registry;

/// Capability header, first line of the feed.
#[derive(Debug, Serialize)]
struct Header {
    version: u32,
    click_events: bool,
}

/// One status block, i3bar JSON shape.
#[derive(Debug, Serialize)]
struct Block<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    full_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    markup: &'static str,
    separator: bool,
    separator_block_width: u32,
}

impl<'a> Block<'a> {
    fn widget(name: &'a str, full_text: &'a str, color: &'a str) -> Self {
        Self {
            name: Some(name),
            full_text,
            color: Some(color),
            markup: "pango",
            separator: false,
            separator_block_width: 0,
        }
    }

    /// Fixed spacer inserted after every widget block.
    fn spacer() -> Self {
        Self {
            name: None,
            full_text: " ",
            color: None,
            markup: "pango",
            separator: false,
            separator_block_width: 0,
        }
    }
}

/// Emit the protocol preamble: header, array opener, empty first element.
pub fn write_preamble<W: Write>(out: &mut W) -> io::Result<()> {
    let header = Header {
        version: 1,
        click_events: true,
    };
    serde_json::to_writer(&mut *out, &header)?;
    out.write_all(b"\n[\n[],\n")?;
    out.flush()
}

/// Emit one feed cycle: every widget with a non-empty payload, in registry
/// order, each followed by the spacer block.
pub fn write_cycle<W: Write>(out: &mut W, registry: &Registry) -> io::Result<()> {
    let mut blocks: Vec<Block<'_>> = Vec::with_capacity(registry.len() * 2);
    for slot in registry.iter() {
        let widget = slot.widget();
        let payload = widget.payload();
        if payload.is_empty() {
            continue;
        }
        blocks.push(Block::widget(
            widget.name(),
            payload.text(),
            payload.severity().color(),
        ));
        blocks.push(Block::spacer());
    }
    serde_json::to_writer(&mut *out, &blocks)?;
    out.write_all(b",\n")?;
    out.flush()
}

/// A click event fed back from the bar. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickEvent {
    pub name: String,
    pub button: u64,
}

/// Decode one click event from a raw read buffer.
///
/// The bar's stream is newline-insensitive and may batch fragments, so this
/// locates the first `{` and parses a single JSON object from there,
/// tolerating trailing bytes. Anything malformed or incomplete yields `None`.
pub fn decode_click(buf: &[u8]) -> Option<ClickEvent> {
    let start = buf.iter().position(|&b| b == b'{')?;
    let text = std::str::from_utf8(&buf[start..]).ok()?;
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<ClickEvent>();
    match stream.next()? {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(%err, "dropping malformed click event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{Payload, Severity, Widget};
    use anyhow::Result;
    use serde_json::Value;

    struct Fixed {
        name: &'static str,
        payload: Payload,
    }

    impl Fixed {
        fn boxed(name: &'static str, text: &str, severity: Severity) -> Box<dyn Widget> {
            let mut payload = Payload::new();
            payload.set(text, severity);
            Box::new(Self { name, payload })
        }
    }

    impl Widget for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn update(&mut self) -> Result<()> {
            Ok(())
        }
        fn payload(&self) -> &Payload {
            &self.payload
        }
    }

    #[test]
    fn preamble_is_byte_exact() {
        let mut out = Vec::new();
        write_preamble(&mut out).unwrap();
        assert_eq!(
            out,
            b"{\"version\":1,\"click_events\":true}\n[\n[],\n"
        );
    }

    #[test]
    fn cycle_emits_blocks_with_spacers_and_trailing_comma() {
        let mut reg = Registry::new();
        reg.add(Fixed::boxed("battery", "\u{f240} 93%", Severity::Good))
            .unwrap();
        reg.add(Fixed::boxed("date", "Sat 08/30 12:00:00", Severity::Idle))
            .unwrap();

        let mut out = Vec::new();
        write_cycle(&mut out, &reg).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with(",\n"));

        let parsed: Value = serde_json::from_str(line.trim_end_matches(",\n")).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 4, "two widgets, two spacers");

        assert_eq!(arr[0]["name"], "battery");
        assert_eq!(arr[0]["color"], "#98BC37");
        assert_eq!(arr[0]["markup"], "pango");
        assert_eq!(arr[0]["separator"], false);
        assert_eq!(arr[0]["separator_block_width"], 0);

        assert_eq!(arr[1]["full_text"], " ");
        assert!(arr[1].get("name").is_none(), "spacer carries no name");
        assert_eq!(arr[2]["name"], "date");
        assert_eq!(arr[2]["color"], "#FCE8C3");
    }

    #[test]
    fn empty_payloads_are_skipped() {
        let mut reg = Registry::new();
        reg.add(Fixed::boxed("visible", "up", Severity::Idle)).unwrap();
        reg.add(Box::new(Fixed {
            name: "silent",
            payload: Payload::new(),
        }))
        .unwrap();

        let mut out = Vec::new();
        write_cycle(&mut out, &reg).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.contains("visible"));
        assert!(!line.contains("silent"));
    }

    #[test]
    fn click_round_trip() {
        let event = decode_click(b"{\"name\":\"volume\",\"button\":3}").unwrap();
        assert_eq!(event.name, "volume");
        assert_eq!(event.button, 3);
    }

    #[test]
    fn click_with_leading_garbage_and_trailing_bytes() {
        let event = decode_click(b",\n{\"name\":\"date\",\"button\":2,\"x\":140}\n{").unwrap();
        assert_eq!(event.name, "date");
        assert_eq!(event.button, 2);
    }

    #[test]
    fn malformed_clicks_are_dropped() {
        assert!(decode_click(b"").is_none());
        assert!(decode_click(b"[]").is_none(), "no object start");
        assert!(decode_click(b"{\"name\":\"volume\"}").is_none(), "missing button");
        assert!(decode_click(b"{\"button\":1}").is_none(), "missing name");
        assert!(decode_click(b"{\"name\":\"v\",\"button\":1.5}").is_none(), "non-integer button");
        assert!(decode_click(b"{\"name\":\"v\",\"button\":").is_none(), "truncated");
        assert!(decode_click(&[0xff, b'{', 0xfe]).is_none(), "invalid utf-8");
    }
}
