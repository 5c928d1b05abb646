#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }
        let prefix = args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_chat_mode()
            || cmd.is_image_mode()
            || cmd.is_image_size()
            || cmd.is_model_set()
            || cmd.is_key_set()
            || cmd.is_key_clear()
            || cmd.is_requirement()
            || cmd.is_help()
        {
            return Some(cmd);
        }

        return None;
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_chat_mode(&self) -> bool {
        return self.command == "/chat";
    }

    pub fn is_image_mode(&self) -> bool {
        return ["/i", "/image"].contains(&self.command.as_str());
    }

    pub fn is_image_size(&self) -> bool {
        return self.command == "/size";
    }

    pub fn is_model_set(&self) -> bool {
        return ["/m", "/model"].contains(&self.command.as_str());
    }

    pub fn is_key_set(&self) -> bool {
        return self.command == "/key";
    }

    pub fn is_key_clear(&self) -> bool {
        return self.command == "/forget-key";
    }

    pub fn is_requirement(&self) -> bool {
        return ["/r", "/requirement"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }
}
