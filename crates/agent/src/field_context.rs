//! Bridges a long text field with the assistant chat.
//!
//! Outgoing: the current field text is folded into the latest user message so
//! the model sees what is being edited. Incoming: a reply may carry a full
//! replacement of the field after the [`UPDATED_CONTENT_MARKER`].

use quill_core::{ChatMessage, ChatRole};

pub const UPDATED_CONTENT_MARKER: &str = "UPDATED_MARKDOWN:";
pub const DEFAULT_UPDATE_EXPLANATION: &str = "Content updated.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentUpdate {
    /// Reply text shown to the user in place of the full reply.
    pub explanation: String,
    /// Replacement field text, when the reply carried a non-empty code block.
    pub content: Option<String>,
}

/// Rewrites the last user message to carry `field_text`. Returns whether a
/// message was rewritten.
pub fn inject_field_context(messages: &mut [ChatMessage], field_text: &str) -> bool {
    if field_text.is_empty() {
        return false;
    }

    let Some(message) = messages.iter_mut().rev().find(|message| message.role == ChatRole::User)
    else {
        return false;
    };

    message.text = format!(
        "[Current markdown content in the field]:\n```\n{field_text}\n```\n\n[User question]: {}",
        message.text
    );
    true
}

pub fn extract_content_update(reply: &str) -> Option<ContentUpdate> {
    let index = reply.find(UPDATED_CONTENT_MARKER)?;
    let after_marker = &reply[index + UPDATED_CONTENT_MARKER.len()..];

    let content = fenced_block(after_marker)
        .or_else(|| element_body(after_marker, "code"))
        .or_else(|| element_body(after_marker, "pre"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());

    let explanation = reply[..index].trim();
    let explanation = if explanation.is_empty() {
        DEFAULT_UPDATE_EXPLANATION.to_string()
    } else {
        explanation.to_string()
    };

    Some(ContentUpdate { explanation, content })
}

fn fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // the rest of the opening line is the info string
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].to_string())
}

fn element_body(html: &str, tag: &str) -> Option<String> {
    let open = find_open_tag(html, tag)?;
    let after_open = &html[open..];
    let body_start = after_open.find('>')? + 1;
    let body = &after_open[body_start..];
    let close = body.find(&format!("</{tag}>"))?;
    Some(decode_entities(&strip_tags(&body[..close])))
}

fn find_open_tag(html: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut offset = 0;
    while let Some(found) = html[offset..].find(&needle) {
        let start = offset + found;
        let next = html[start + needle.len()..].chars().next();
        if matches!(next, Some('>') | Some(' ') | Some('\t') | Some('\n')) {
            return Some(start);
        }
        offset = start + needle.len();
    }
    None
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use quill_core::ChatMessage;

    use super::{extract_content_update, inject_field_context, DEFAULT_UPDATE_EXPLANATION};

    #[test]
    fn injects_field_text_into_last_user_message() {
        let mut messages = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
            ChatMessage::user("Make the title shorter"),
        ];

        assert!(inject_field_context(&mut messages, "# A very long title"));
        assert_eq!(messages[0].text, "earlier question");
        assert_eq!(
            messages[2].text,
            "[Current markdown content in the field]:\n```\n# A very long title\n```\n\n\
             [User question]: Make the title shorter"
        );
    }

    #[test]
    fn empty_field_or_no_user_message_leaves_history_alone() {
        let mut messages = vec![ChatMessage::user("hello")];
        assert!(!inject_field_context(&mut messages, ""));
        assert_eq!(messages[0].text, "hello");

        let mut messages = vec![ChatMessage::assistant("hi")];
        assert!(!inject_field_context(&mut messages, "# Title"));
        assert_eq!(messages[0].text, "hi");
    }

    #[test]
    fn reply_without_marker_is_not_an_update() {
        assert_eq!(extract_content_update("Looks good to me."), None);
    }

    #[test]
    fn extracts_fenced_block_and_explanation() {
        let reply = "I shortened the title.\n\nUPDATED_MARKDOWN:\n```markdown\n# Short\n\nBody\n```\n";
        let update = extract_content_update(reply).expect("marker present");

        assert_eq!(update.explanation, "I shortened the title.");
        assert_eq!(update.content.as_deref(), Some("# Short\n\nBody"));
    }

    #[test]
    fn extracts_html_code_block_and_decodes_entities() {
        let reply = "<p>Done.</p>UPDATED_MARKDOWN:<pre><code class=\"language-md\">a &lt;b&gt; &amp; <span>c</span></code></pre>";
        let update = extract_content_update(reply).expect("marker present");

        assert_eq!(update.explanation, "<p>Done.</p>");
        assert_eq!(update.content.as_deref(), Some("a <b> & c"));
    }

    #[test]
    fn marker_without_block_uses_default_explanation() {
        let update = extract_content_update("UPDATED_MARKDOWN: nothing here").expect("marker");

        assert_eq!(update.explanation, DEFAULT_UPDATE_EXPLANATION);
        assert_eq!(update.content, None);
    }

    #[test]
    fn blank_code_block_carries_no_content() {
        let update =
            extract_content_update("Here.\nUPDATED_MARKDOWN:\n```\n   \n```").expect("marker");
        assert_eq!(update.content, None);
        assert_eq!(update.explanation, "Here.");
    }
}
