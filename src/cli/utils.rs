use std::time::Duration;

pub fn format_duration_ms(millis: u64) -> String {
    sprout::timing::format_duration(Duration::from_millis(millis))
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", count, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("source file", 1), "1 source file");
        assert_eq!(pluralize("source file", 0), "0 source files");
        assert_eq!(pluralize("source file", 12), "12 source files");
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(2500), "2.50s");
    }
}
