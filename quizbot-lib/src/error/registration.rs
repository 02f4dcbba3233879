//! Team registration errors

use super::StoreError;

/// Reasons a team registration can be refused.
///
/// The `Display` text is shown to the player verbatim.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The player already belongs to a team.
    #[error("Игрок уже состоит в команде.")]
    AlreadyInTeam,

    /// The name is empty after trimming.
    #[error("Название команды не может быть пустым.")]
    EmptyName,

    /// Another team already uses this name (case-insensitive).
    #[error("Команда с таким названием уже существует.")]
    NameTaken,

    /// Storage failure while registering.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<async_sqlite::Error> for RegistrationError {
    fn from(err: async_sqlite::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

impl RegistrationError {
    /// Returns `true` if the player can fix this by sending another name.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
