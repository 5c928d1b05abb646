#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Local;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Tags how a message's content should be presented. Image content is a
/// direct URL to a generated image, notices are produced locally rather than
/// by the provider.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
    Notice,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    kind: ContentKind,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message::new_with_kind(role, ContentKind::Text, content);
    }

    pub fn new_with_kind(role: Role, kind: ContentKind, content: &str) -> Message {
        return Message {
            role,
            content: content.to_string(),
            kind,
            timestamp: Local::now(),
        };
    }

    pub fn kind(&self) -> ContentKind {
        return self.kind;
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        return self.timestamp;
    }

    pub fn with_role(mut self, role: Role) -> Message {
        self.role = role;
        return self;
    }

    pub fn as_string_lines(&self, line_max_width: usize) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for full_line in self.content.split('\n') {
            if full_line.trim().is_empty() {
                lines.push(" ".to_string());
                continue;
            }

            let mut char_count = 0;
            let mut current_lines: Vec<&str> = vec![];

            for word in full_line.split(' ') {
                let word_len = word.chars().count();
                if !current_lines.is_empty() && word_len + char_count + 1 > line_max_width {
                    lines.push(current_lines.join(" ").trim_end().to_string());
                    current_lines = vec![word];
                    char_count = word_len + 1;
                } else {
                    current_lines.push(word);
                    char_count += word_len + 1;
                }
            }
            if !current_lines.is_empty() {
                lines.push(current_lines.join(" ").trim_end().to_string());
            }
        }

        return lines;
    }
}
