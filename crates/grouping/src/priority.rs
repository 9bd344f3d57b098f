use triage_protocol::{Category, Priority};

/// Map a message's category and classifier confidence to a priority level.
///
/// Bugs escalate with confidence; support always rates high because a customer
/// is actively blocked; questions need a response but can wait; feature
/// requests and irrelevant chatter are planned work at best.
pub fn determine_priority(category: Category, confidence: f32) -> Priority {
    match category {
        Category::Bug => {
            if confidence >= 0.8 {
                Priority::Critical
            } else if confidence >= 0.6 {
                Priority::High
            } else {
                Priority::Medium
            }
        }
        Category::Support => Priority::High,
        Category::Question => Priority::Medium,
        Category::Feature => Priority::Low,
        Category::Irrelevant => Priority::Low,
    }
}
