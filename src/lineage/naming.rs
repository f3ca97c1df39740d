use chrono::Utc;

/// Derive a human-readable element name from the originating prompt.
///
/// Case-insensitive keyword match against an ordered table; the first
/// match wins. Falls back to a dated generic name when nothing matches.
pub fn generate_element_name(prompt: &str) -> String {
    let words = prompt.to_lowercase();

    if words.contains("complaint") {
        if words.contains("israel") {
            return "Israel Complaints Analysis".to_string();
        }
        if words.contains("germany") {
            return "Germany Complaints Analysis".to_string();
        }
        return "Complaints Analysis".to_string();
    }

    if words.contains("extract") {
        return "Data Extraction".to_string();
    }

    if words.contains("summary") || words.contains("summarize") {
        return "Document Summary".to_string();
    }

    if words.contains("report") {
        return "Analysis Report".to_string();
    }

    format!("Analysis - {}", Utc::now().format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complaint_names() {
        assert_eq!(
            generate_element_name("Analyze complaints from Israel"),
            "Israel Complaints Analysis"
        );
        assert_eq!(
            generate_element_name("complaint trends in GERMANY"),
            "Germany Complaints Analysis"
        );
        assert_eq!(
            generate_element_name("List all complaints"),
            "Complaints Analysis"
        );
    }

    #[test]
    fn test_priority_order_prefers_complaints() {
        // "complaint" outranks "report" in the table
        assert_eq!(
            generate_element_name("report on complaints"),
            "Complaints Analysis"
        );
    }

    #[test]
    fn test_extraction_and_summary_names() {
        assert_eq!(
            generate_element_name("Extract the key figures"),
            "Data Extraction"
        );
        assert_eq!(
            generate_element_name("data extraction pass"),
            "Data Extraction"
        );
        assert_eq!(
            generate_element_name("Summarize doc"),
            "Document Summary"
        );
        assert_eq!(
            generate_element_name("give me a summary"),
            "Document Summary"
        );
    }

    #[test]
    fn test_report_name() {
        assert_eq!(
            generate_element_name("quarterly reporting overview"),
            "Analysis Report"
        );
    }

    #[test]
    fn test_fallback_is_dated() {
        let name = generate_element_name("something unrelated");
        assert!(name.starts_with("Analysis - "));
    }
}
