//! Minimal TwiML voice-response documents.
//!
//! The webhook acknowledgment must always be a well-formed voice-response
//! document, so this stays deliberately small: `<Say>` and `<Play>` verbs,
//! escaped text, nothing else.

use std::fmt::Write;

enum Verb {
    Say { text: String, language: Option<String> },
    Play { url: String },
}

/// Builder for a `<Response>` document.
#[derive(Default)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    /// Create an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` to the caller.
    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            language: None,
        });
        self
    }

    /// Speak `text` in a specific language (e.g. `en-IE`).
    pub fn say_in(mut self, text: impl Into<String>, language: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            language: Some(language.into()),
        });
        self
    }

    /// Play an audio resource to the caller.
    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play { url: url.into() });
        self
    }

    /// Render the XML document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            match verb {
                Verb::Say { text, language } => {
                    match language {
                        Some(lang) => {
                            let _ = write!(xml, "<Say language=\"{}\">", escape(lang));
                        }
                        None => xml.push_str("<Say>"),
                    }
                    xml.push_str(&escape(text));
                    xml.push_str("</Say>");
                }
                Verb::Play { url } => {
                    let _ = write!(xml, "<Play>{}</Play>", escape(url));
                }
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_say_and_play() {
        let xml = VoiceResponse::new()
            .say_in("Please hold while we connect you to an operator.", "en-IE")
            .play("http://example.com/hold.wav")
            .to_xml();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
        assert!(xml.contains(
            "<Say language=\"en-IE\">Please hold while we connect you to an operator.</Say>"
        ));
        assert!(xml.contains("<Play>http://example.com/hold.wav</Play>"));
        assert!(xml.ends_with("</Response>"));
    }

    #[test]
    fn escapes_reserved_characters() {
        let xml = VoiceResponse::new().say("Tom & Jerry <call>").to_xml();
        assert!(xml.contains("<Say>Tom &amp; Jerry &lt;call&gt;</Say>"));
    }

    #[test]
    fn empty_response_is_still_a_document() {
        let xml = VoiceResponse::new().to_xml();
        assert!(xml.contains("<Response></Response>"));
    }
}
