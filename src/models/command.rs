use crate::error::EngineError;

/// Menu mutation sent by a client as `<verb>:<item>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Add(String),
    Remove(String),
}

impl MenuCommand {
    /// Parse a text frame. The verb is case-insensitive and the item is the
    /// remainder after the first `:`, so it may contain further colons.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let (verb, item) = text
            .split_once(':')
            .ok_or_else(|| EngineError::InvalidCommand(format!("missing ':' in '{}'", text)))?;

        match verb.to_lowercase().as_str() {
            "add" => Ok(MenuCommand::Add(item.to_string())),
            "remove" => Ok(MenuCommand::Remove(item.to_string())),
            other => Err(EngineError::InvalidCommand(format!("unknown verb '{}'", other))),
        }
    }

    /// Apply to a menu. Removing an item that is not present leaves the menu untouched.
    pub fn apply(&self, menu: &mut Vec<String>) -> Result<(), EngineError> {
        match self {
            MenuCommand::Add(item) => {
                menu.push(item.clone());
                Ok(())
            }
            MenuCommand::Remove(item) => {
                let pos = menu
                    .iter()
                    .position(|m| m == item)
                    .ok_or_else(|| EngineError::InvalidCommand(format!("'{}' is not on the menu", item)))?;
                menu.remove(pos);
                Ok(())
            }
        }
    }
}
