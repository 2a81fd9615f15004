//! Best-effort interpretation of helper output.
//!
//! Download scripts and the quantize binary report problems as free text.
//! Failure messages are picked from ordered known-cause tables; the first
//! matching substring wins.

use std::sync::LazyLock;

use regex::Regex;

/// Characters of raw output kept in fallback messages.
const EXCERPT_CHARS: usize = 200;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("percent pattern is valid"));

static ERROR_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*(?:Error|Exception|Failed):\s*").expect("error prefix pattern is valid")
});

const ERROR_MARKERS: [&str; 3] = ["Error:", "Exception:", "Failed:"];

const HF_CAUSES: [(&str, &str); 4] = [
    (
        "llama.cpp not found",
        "llama.cpp installation not found. Please ensure llama.cpp is installed at the configured path.",
    ),
    (
        "No compatible GGUF files",
        "No compatible pre-quantized GGUF files found. The app will download and convert the base model locally.",
    ),
    (
        "pip install",
        "Python dependencies are missing. Please install: pip install huggingface-hub tqdm",
    ),
    (
        "No such file or directory",
        "Script not found. Please ensure the download script exists.",
    ),
];

/// First percentage in a progress line, capped at 100.
pub fn parse_percent(line: &str) -> Option<u8> {
    PERCENT
        .captures(line)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .map(|p| p.min(100))
}

/// Whether a line carries an error signal.
pub fn is_error_line(line: &str) -> bool {
    ERROR_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Error line with its `... Error:` style prefix removed.
pub fn clean_error_line(line: &str) -> Option<String> {
    let cleaned = ERROR_PREFIX.replace_all(line, "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

fn exit_code_label(exit_code: Option<i32>) -> String {
    exit_code.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Failure message for a HuggingFace download.
pub fn huggingface_failure(buffer: &str, exit_code: Option<i32>) -> String {
    let buffer = buffer.trim_end();
    if let Some((_, message)) = HF_CAUSES.iter().find(|(cause, _)| buffer.contains(cause)) {
        return (*message).to_string();
    }
    if buffer.is_empty() {
        format!("Download failed (exit code {})", exit_code_label(exit_code))
    } else {
        format!("Download failed: {}", excerpt(buffer))
    }
}

/// Failure message for an Ollama registry download.
pub fn ollama_failure(model_name: &str, buffer: &str, exit_code: Option<i32>) -> String {
    let buffer = buffer.trim_end();
    if buffer.contains("not found") {
        format!("Model '{model_name}' not found in Ollama registry. Please check the model name.")
    } else if buffer.contains("pip install") {
        "Python dependencies are missing. Please install: pip install requests".to_string()
    } else if buffer.is_empty() {
        format!("Download failed (exit code {})", exit_code_label(exit_code))
    } else {
        format!("Download failed: {}", excerpt(buffer))
    }
}

/// Failure message for a nonzero quantize exit.
pub fn quantize_failure(stderr: &str, stdout: &str) -> String {
    let detail = [stderr, stdout]
        .into_iter()
        .map(str::trim_end)
        .find(|s| !s.trim_start().is_empty())
        .unwrap_or("Unknown error");
    format!("Quantization failed: {}", excerpt(detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_extracted() {
        assert_eq!(parse_percent("Downloading: 42% |####"), Some(42));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent("done"), None);
        assert_eq!(parse_percent("999% weird"), None);
    }

    #[test]
    fn error_lines_are_cleaned() {
        assert!(is_error_line("Traceback Exception: boom"));
        assert!(!is_error_line("error: lowercase is ignored"));
        assert_eq!(
            clean_error_line("2024-01-01 Error: repo gated").as_deref(),
            Some("repo gated")
        );
        assert_eq!(clean_error_line("Failed:   "), None);
    }

    #[test]
    fn known_causes_win_in_order() {
        let buffer = "pip install huggingface-hub\nError: llama.cpp not found\n";
        assert_eq!(
            huggingface_failure(buffer, Some(1)),
            "llama.cpp installation not found. Please ensure llama.cpp is installed at the configured path."
        );
        assert!(
            huggingface_failure("python3: can't open file: No such file or directory", Some(2))
                .starts_with("Script not found")
        );
    }

    #[test]
    fn unknown_causes_fall_back_to_excerpt_or_exit_code() {
        let long = "x".repeat(500);
        let message = huggingface_failure(&long, Some(1));
        assert_eq!(message, format!("Download failed: {}", "x".repeat(200)));
        assert_eq!(huggingface_failure("", Some(3)), "Download failed (exit code 3)");
    }

    #[test]
    fn ollama_table() {
        assert_eq!(
            ollama_failure("llama9", "Error: manifest not found", Some(1)),
            "Model 'llama9' not found in Ollama registry. Please check the model name."
        );
        assert!(ollama_failure("m", "run pip install requests", Some(1)).contains("pip install requests"));
        assert_eq!(ollama_failure("m", "", None), "Download failed (exit code signal)");
    }

    #[test]
    fn quantize_prefers_stderr_then_stdout() {
        assert_eq!(quantize_failure("bad magic", "loading"), "Quantization failed: bad magic");
        assert_eq!(quantize_failure("", "loading"), "Quantization failed: loading");
        assert_eq!(quantize_failure("", ""), "Quantization failed: Unknown error");
    }

    #[test]
    fn buffered_newlines_do_not_leak_into_messages() {
        assert_eq!(
            quantize_failure("invalid magic\n", "loading model\n"),
            "Quantization failed: invalid magic"
        );
        assert_eq!(quantize_failure("\n", "loading\n"), "Quantization failed: loading");
        assert_eq!(
            huggingface_failure("Error: gated repo\n", Some(1)),
            "Download failed: Error: gated repo"
        );
        assert_eq!(huggingface_failure("\n", Some(4)), "Download failed (exit code 4)");
        assert_eq!(ollama_failure("m", "Error: timeout\n\n", Some(1)), "Download failed: Error: timeout");
    }
}
