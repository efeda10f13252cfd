//! Markdown report envelope and WeChat-Work markdown helpers.

use serde::{Deserialize, Serialize};

/// Wire envelope: `{"msgtype":"markdown","markdown":{"content":...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub msgtype: String,
    pub markdown: Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    pub content: String,
}

impl Message {
    pub fn markdown(content: impl Into<String>) -> Self {
        Self {
            msgtype: "markdown".into(),
            markdown: Markdown {
                content: content.into(),
            },
        }
    }

    pub fn content(&self) -> &str {
        &self.markdown.content
    }
}

/// Colors understood by the WeChat-Work `<font>` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontColor {
    /// Green.
    Info,
    /// Grey.
    Comment,
    /// Orange-red.
    Warning,
}

impl FontColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontColor::Info => "info",
            FontColor::Comment => "comment",
            FontColor::Warning => "warning",
        }
    }
}

/// Wrap `text` in a colored `<font>` tag.
pub fn font(color: FontColor, text: &str) -> String {
    format!("<font color='{}'>{}</font>", color.as_str(), text)
}

/// Mention everyone in the group.
pub fn mention_all() -> &'static str {
    "<@all>"
}

/// Standard report heading: title, project and timestamp.
pub fn header(title: &str, project: &str) -> String {
    format!(
        "# {title}\n> project: **{project}**\n> time: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(Message::markdown("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"msgtype": "markdown", "markdown": {"content": "hi"}})
        );
    }

    #[test]
    fn test_font_extension_survives_json() {
        let content = format!("status: {} {}", font(FontColor::Warning, "red & <b>"), mention_all());
        let wire = serde_json::to_string(&Message::markdown(content.clone())).unwrap();
        let back: Message = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.content(), content);
        assert_eq!(back.msgtype, "markdown");
    }

    #[test]
    fn test_font_colors() {
        assert_eq!(font(FontColor::Info, "ok"), "<font color='info'>ok</font>");
        assert_eq!(FontColor::Comment.as_str(), "comment");
    }

    #[test]
    fn test_header_mentions_project() {
        let h = header("ES inspection", "prod");
        assert!(h.starts_with("# ES inspection\n"));
        assert!(h.contains("**prod**"));
    }
}
