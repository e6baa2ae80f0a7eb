//! Voice-response (TwiML) documents.
//!
//! Only the `<Say>` verb is modelled. Documents are rendered with a fixed
//! layout so the same input always produces the same bytes.

use crate::config::SayConfig;
use bytes::Bytes;
use std::fmt::Write;

pub const TWIML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Speak `text` with an optional language and voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Say {
    pub text: String,
    pub language: Option<String>,
    pub voice: Option<String>,
}

impl Say {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            voice: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("  <Say");
        if let Some(language) = &self.language {
            let _ = write!(out, r#" language="{}""#, escape(language));
        }
        if let Some(voice) = &self.voice {
            let _ = write!(out, r#" voice="{}""#, escape(voice));
        }
        let _ = write!(out, ">\n    {}\n  </Say>\n", escape(&self.text));
    }
}

impl From<&SayConfig> for Say {
    fn from(config: &SayConfig) -> Self {
        Say::new(config.text.clone())
            .language(config.language.clone())
            .voice(config.voice.clone())
    }
}

/// Root `<Response>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Say>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, say: Say) -> Self {
        self.verbs.push(say);
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(160);
        out.push_str(XML_DECLARATION);
        out.push_str("\n<Response>\n");
        for verb in &self.verbs {
            verb.write_xml(&mut out);
        }
        out.push_str("</Response>");
        out
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.to_xml())
    }
}

/// The document served by `POST /voice`.
pub fn voice_document(config: &SayConfig) -> Bytes {
    VoiceResponse::new().say(Say::from(config)).into_bytes()
}

/// Escape the five XML special characters. Text and attribute values share
/// the same rules.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `c` may appear in an XML 1.0 document. Tab, newline and carriage
/// return are the only permitted C0 controls.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_is_byte_exact() {
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                        <Response>\n  \
                        <Say language=\"es-ES\" voice=\"Polly.Conchita\">\n    \
                        ¡Gracias por ver el video!\n  \
                        </Say>\n\
                        </Response>";

        let document = voice_document(&SayConfig::default());
        assert_eq!(std::str::from_utf8(&document).unwrap(), expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = SayConfig::default();
        assert_eq!(voice_document(&config), voice_document(&config));
    }

    #[test]
    fn special_characters_are_escaped() {
        let xml = VoiceResponse::new()
            .say(Say::new(r#"Tom & Jerry's "show" <3"#).voice(r#"a"b'c"#))
            .to_xml();

        assert!(xml.contains("Tom &amp; Jerry&apos;s &quot;show&quot; &lt;3"));
        assert!(xml.contains(r#"voice="a&quot;b&apos;c""#));
        assert!(!xml.contains("language="));
    }

    #[test]
    fn escaped_document_parses_back_to_the_input() {
        let text = r#"<Play>&amp; 'single' "double" > done"#;
        let voice = r#"x' y="z"#;
        let xml = VoiceResponse::new()
            .say(Say::new(text).language("en-US").voice(voice))
            .to_xml();

        let document = roxmltree::Document::parse(&xml).unwrap();
        let say = document.root_element().first_element_child().unwrap();
        assert_eq!(say.tag_name().name(), "Say");
        assert_eq!(say.text().unwrap().trim(), text);
        assert_eq!(say.attribute("voice"), Some(voice));
        assert_eq!(
            document.root_element().children().filter(|n| n.is_element()).count(),
            1
        );
    }

    #[test]
    fn xml_char_excludes_c0_controls() {
        assert!(is_xml_char('\t'));
        assert!(is_xml_char('\n'));
        assert!(is_xml_char('\r'));
        assert!(is_xml_char('¡'));
        assert!(!is_xml_char('\0'));
        assert!(!is_xml_char('\u{1b}'));
        assert!(!is_xml_char('\u{0b}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn empty_response_is_still_a_document() {
        assert_eq!(
            VoiceResponse::new().to_xml(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n</Response>"
        );
    }
}
