use tracing::info;

use crate::error::EngineError;
use crate::models::MenuCommand;
use crate::services::SessionService;

/// Handle a `<verb>:<item>` frame: apply it to the stored session and publish
/// the new menu. Returns the menu as written.
pub async fn handle_command_message(
    text: &str,
    session_id: &str,
    sessions: &SessionService,
) -> Result<Vec<String>, EngineError> {
    let command = MenuCommand::parse(text)?;
    info!("Command received for session {}: {:?}", session_id, command);

    let (session, _) = sessions
        .update_and_publish(session_id, |s| command.apply(&mut s.menu))
        .await?;
    Ok(session.menu)
}
