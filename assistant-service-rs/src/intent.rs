//! Utterance classification and spoken acknowledgments.

/// What the user is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    DailyBriefing,
    HrQuery,
}

/// Classifies an utterance by keyword. Anything that is not explicitly a
/// briefing request goes to the HR system.
pub fn classify(utterance: &str) -> Intent {
    let lowered = utterance.to_lowercase();
    if lowered.contains("daily briefing")
        || lowered.contains("my briefing")
        || lowered.contains("today's briefing")
    {
        Intent::DailyBriefing
    } else {
        Intent::HrQuery
    }
}

/// The acknowledgment spoken before the answer is fetched.
pub fn acknowledgment(intent: Intent, utterance: &str) -> &'static str {
    if intent == Intent::DailyBriefing {
        return "Sure, let me provide you with your daily HR briefing";
    }

    let lowered = utterance.to_lowercase();
    if lowered.contains("policy") || lowered.contains("policies") {
        "Of course, let me look up that policy information for you"
    } else if lowered.contains("leave") || lowered.contains("vacation") {
        "I'll help you with your leave request information"
    } else if lowered.contains("benefit") {
        "Let me get the latest benefits information for you"
    } else {
        "Sure, let me check that information for you"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_briefing_requests_classified() {
        assert_eq!(classify("Can I get my daily briefing?"), Intent::DailyBriefing);
        assert_eq!(classify("What's in today's briefing"), Intent::DailyBriefing);
        assert_eq!(classify("How many vacation days do I have?"), Intent::HrQuery);
    }

    #[test]
    fn test_acknowledgments_match_topic() {
        assert_eq!(
            acknowledgment(Intent::DailyBriefing, "my daily briefing please"),
            "Sure, let me provide you with your daily HR briefing"
        );
        assert_eq!(
            acknowledgment(Intent::HrQuery, "what's the remote work policy"),
            "Of course, let me look up that policy information for you"
        );
        assert_eq!(
            acknowledgment(Intent::HrQuery, "how do I file a leave request"),
            "I'll help you with your leave request information"
        );
        assert_eq!(
            acknowledgment(Intent::HrQuery, "tell me about dental benefits"),
            "Let me get the latest benefits information for you"
        );
        assert_eq!(
            acknowledgment(Intent::HrQuery, "when is payday"),
            "Sure, let me check that information for you"
        );
    }
}
