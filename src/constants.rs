pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32767;
pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 32767;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Request bodies carry base64 images, so the limit is generous.
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";
pub const SESSION_COOKIE: &str = "session";
