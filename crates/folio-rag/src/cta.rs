//! Call-to-action links appended to replies
//!
//! At most one link is added, and only when the reply does not already point
//! at a site section.
//!
//! Author: hephaex@gmail.com

use once_cell::sync::Lazy;
use regex::Regex;

/// Site sections a reply may already link to
pub const SITE_SECTIONS: [&str; 4] = ["/projects", "/experience", "/about", "/photography"];

struct CtaRule {
    pattern: Regex,
    cta: &'static str,
}

// Priority order: the first matching rule wins
static RULES: Lazy<Vec<CtaRule>> = Lazy::new(|| {
    [
        (
            r"(?i)\b(projects?|portfolio|case\s*stud(y|ies)|side\s*projects?)\b",
            "Explore more in [Projects](/projects).",
        ),
        (
            r"(?i)\b(experiences?|intern(ships?)?|work\s*history|roles?|jobs?)\b",
            "See roles in [Experience](/experience).",
        ),
        (
            r"(?i)\b(about(\s*me)?|bio|background|fun\s*facts?|interests?|hobbies|personality)\b",
            "Learn more on [About](/about).",
        ),
        (
            r"(?i)\b(photo(graphy)?|pictures?|gallery|camera|shots?)\b",
            "Browse photos in [Photography](/photography).",
        ),
    ]
    .into_iter()
    .map(|(pattern, cta)| CtaRule {
        pattern: Regex::new(pattern).expect("valid call-to-action pattern"),
        cta,
    })
    .collect()
});

/// The call-to-action for a question, if the reply has no section link yet
pub fn call_to_action(user_message: &str, reply: &str) -> Option<&'static str> {
    if SITE_SECTIONS.iter().any(|section| reply.contains(section)) {
        return None;
    }

    RULES
        .iter()
        .find(|rule| rule.pattern.is_match(user_message))
        .map(|rule| rule.cta)
}

/// Append the matching call-to-action, separated by a blank line
pub fn append_call_to_action(user_message: &str, reply: &str) -> String {
    match call_to_action(user_message, reply) {
        Some(cta) => format!("{reply}\n\n{cta}"),
        None => reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_count(text: &str) -> usize {
        SITE_SECTIONS
            .iter()
            .map(|s| text.matches(&format!("]({s})")).count())
            .sum()
    }

    #[test]
    fn test_each_category() {
        let cases = [
            ("What projects have you built?", "[Projects](/projects)"),
            ("Tell me about your internship", "[Experience](/experience)"),
            ("What are her hobbies?", "[About](/about)"),
            ("Do you have a photo gallery?", "[Photography](/photography)"),
        ];
        for (question, link) in cases {
            let reply = append_call_to_action(question, "Sure.");
            assert!(reply.starts_with("Sure.\n\n"), "{question}");
            assert!(reply.ends_with(&format!("{link}.")), "{question}");
            assert_eq!(link_count(&reply), 1, "{question}");
        }
    }

    #[test]
    fn test_priority_order() {
        // Matches both the projects and the about rules
        assert_eq!(
            call_to_action("tell me about your projects", "ok"),
            Some("Explore more in [Projects](/projects).")
        );
        assert_eq!(
            call_to_action("Any side project photos?", "ok"),
            Some("Explore more in [Projects](/projects).")
        );
    }

    #[test]
    fn test_existing_link_suppresses_cta() {
        let reply = "Check out the [About](/about) page.";
        assert_eq!(call_to_action("What projects?", reply), None);
        assert_eq!(append_call_to_action("What projects?", reply), reply);
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(call_to_action("What's her favourite programming language?", "ok"), None);
        assert_eq!(call_to_action("Is she a photographer?", "ok"), None);
        assert_eq!(call_to_action("hello", "ok"), None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            call_to_action("PORTFOLIO please", "ok"),
            Some("Explore more in [Projects](/projects).")
        );
    }
}
