use serde::{Deserialize, Serialize};
use shared::UserDto;

/// The signed-in user. Serialized as-is into durable session storage under
/// the `user` key, so field changes here are a storage-format change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<UserDto> for AuthUser {
    fn from(dto: UserDto) -> Self {
        AuthUser { id: dto.id, email: dto.email, name: dto.name, avatar: dto.avatar }
    }
}
