use regex::Regex;
use std::sync::LazyLock;

static IMAGE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)/[^\s"]+\.(png|jpg|jpeg|webp|bmp)"#).expect("valid regex")
});
static ANY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"/[^\s"]+"#).expect("valid regex"));
static QUOTED_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*/[^"]*""#).expect("valid regex"));

/// Strips filesystem paths from an error message before it reaches a client.
///
/// Image paths become `[file]`, other absolute paths `[path]`, and quoted
/// strings containing a separator `"[path]"`.
pub fn sanitize_error_message(message: &str) -> String {
    let message = IMAGE_PATH.replace_all(message, "[file]");
    let message = ANY_PATH.replace_all(&message, "[path]");
    QUOTED_PATH.replace_all(&message, "\"[path]\"").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_paths_become_file() {
        assert_eq!(
            sanitize_error_message("Failed to decode /srv/app/uploads/abc-123.PNG: bad header"),
            "Failed to decode [file]: bad header"
        );
    }

    #[test]
    fn test_other_paths_become_path() {
        assert_eq!(
            sanitize_error_message("Failed to create directory: /var/lib/squeeze/compressed"),
            "Failed to create directory: [path]"
        );
    }

    #[test]
    fn test_quoted_paths() {
        assert_eq!(
            sanitize_error_message(r#"cannot open "uploads/ old""#),
            r#"cannot open "[path]""#
        );
    }

    #[test]
    fn test_quoted_absolute_path_is_reduced_once() {
        assert_eq!(
            sanitize_error_message(r#"open "/tmp/x y""#),
            r#"open "[path] y""#
        );
    }

    #[test]
    fn test_plain_messages_untouched() {
        let message = "pngquant exited with status 99: quality too low";
        assert_eq!(sanitize_error_message(message), message);
    }
}
