use std::fmt;

/// What a reply needs to know about the command that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRef {
    pub name: String,
    pub can_clear_interrupt_state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: String,
    text: String,
    command: Option<CommandRef>,
}

impl Reply {
    pub fn new(command: Option<CommandRef>, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
            command,
        }
    }

    /// A reply the server sends on its own, not answering any command.
    pub fn system(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(None, code, text)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn command(&self) -> Option<&CommandRef> {
        self.command.as_ref()
    }

    /// System replies always clear; command replies only if their command may.
    pub fn can_clear_interrupt_state(&self) -> bool {
        self.command
            .as_ref()
            .map_or(true, |command| command.can_clear_interrupt_state)
    }

    /// Wire form, multi-line text as `code-first`, `middle`..., `code last`.
    pub fn to_wire(&self) -> String {
        let mut lines: Vec<&str> = self.text.lines().collect();
        if lines.is_empty() {
            lines.push("");
        }
        let last = lines.len() - 1;

        let mut wire = String::new();
        for (index, line) in lines.iter().enumerate() {
            if index == last {
                wire.push_str(&format!("{} {}\r\n", self.code, line));
            } else if index == 0 {
                wire.push_str(&format!("{}-{}\r\n", self.code, line));
            } else {
                wire.push_str(&format!("{}\r\n", line));
            }
        }
        wire
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text.replace('\n', " | "))
    }
}
