/// Best-effort user-facing hint, such as a toast. Never required for correctness.
pub trait Notifier {
    fn notify(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str),
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save tasks. Storage may be full.";
pub const FOLLOW_UP_REMOVED_MESSAGE: &str = "Follow-up task removed";

pub fn follow_up_created_message(text: &str) -> String {
    format!("Follow-up created: {}", text)
}
