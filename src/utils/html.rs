use ammonia;

/// Sanitizes user-supplied rich text (survey descriptions) with a whitelist.
///
/// Survey descriptions are rendered verbatim by respondent clients, so dangerous
/// tags (<script>, <iframe>) and event-handler attributes are stripped at write
/// time rather than trusting every renderer to escape them.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
