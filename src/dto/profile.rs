use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Partial update of the caller's own profile. Username, password, loyalty
/// status and staff flag are not writable here.
#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(range(min = 18, max = 60))]
    pub age: Option<i32>,
    #[validate(length(min = 7, max = 20))]
    pub phone_number: Option<String>,
    #[validate(url)]
    pub avatar: Option<String>,
}
