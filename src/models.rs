pub mod lookup;
pub mod patch;
pub mod todo;

use jiff::Timestamp;
use uuid::Uuid;

/// Build an identifier of the form `{prefix}-{unix_millis}-{random}`.
///
/// Unique enough for a single user in a single process, not a security token.
pub fn generate_id(prefix: &str) -> String {
    let millis = Timestamp::now().as_millisecond();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, millis, &random[..7])
}
