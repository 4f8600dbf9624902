//! Formatting utilities for Telegram HTML replies.

use std::time::Duration;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render an AI code answer: fenced blocks become `<pre><code>`, everything
/// else is escaped. A reply without fences is shown as one code block.
pub fn code_reply_html(reply: &str) -> String {
    let (text, blocks) = extract_code_blocks(reply);
    if blocks.is_empty() {
        return format!("<pre><code>{}</code></pre>", escape_html(reply.trim()));
    }

    let mut out = escape_html(&text);
    for (i, code) in blocks.iter().enumerate() {
        out = out.replace(
            &format!("\0CODEBLOCK{i}\0"),
            &format!("<pre><code>{}</code></pre>", escape_html(code.trim_end())),
        );
    }

    // Collapse multiple newlines
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}

fn extract_code_blocks(input: &str) -> (String, Vec<String>) {
    let mut blocks = Vec::new();
    let mut out = String::new();

    let mut i = 0usize;
    while let Some(rel) = input[i..].find("```") {
        let start = i + rel;
        out.push_str(&input[i..start]);

        let mut p = start + 3;
        // Optional language identifier: [A-Za-z0-9_+-]+
        while p < input.len() {
            let b = input.as_bytes()[p];
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'-') {
                p += 1;
            } else {
                break;
            }
        }
        if p < input.len() && input.as_bytes()[p] == b'\n' {
            p += 1;
        }

        if let Some(end_rel) = input[p..].find("```") {
            let end = p + end_rel;
            let idx = blocks.len();
            blocks.push(input[p..end].to_string());
            out.push_str(&format!("\0CODEBLOCK{idx}\0"));
            i = end + 3;
            continue;
        }

        // Unclosed fence: keep the rest as text.
        out.push_str(&input[start..]);
        return (out, blocks);
    }

    out.push_str(&input[i..]);
    (out, blocks)
}

/// Cut to `max_chars` characters, appending `...` when something was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

/// Split a long message into chunks of at most `limit` bytes, preferring line
/// boundaries and never cutting inside a UTF-8 character.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if let Some(nl) = rest[..cut].rfind('\n') {
            if nl > 0 {
                cut = nl;
            }
        }
        if cut == 0 {
            // A single character wider than the limit.
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches('\n');
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// `1234567` → `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `H:MM:SS`, with a day prefix past 24 hours.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        return format!("{days} {unit}, {h}:{m:02}:{s:02}");
    }
    format!("{h}:{m:02}:{s:02}")
}

/// Prefix `https://` when the user left out the scheme.
pub fn ensure_scheme(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>&\"</b>"), "&lt;b&gt;&amp;&quot;&lt;/b&gt;");
    }

    #[test]
    fn fenced_code_becomes_pre_and_prose_is_escaped() {
        let out = code_reply_html("Here <it> is:\n```rust\nfn main() { a < b }\n```\nDone.");
        assert_eq!(
            out,
            "Here &lt;it&gt; is:\n<pre><code>fn main() { a &lt; b }</code></pre>\nDone."
        );
    }

    #[test]
    fn reply_without_fence_is_one_block() {
        assert_eq!(code_reply_html("x = 1\n"), "<pre><code>x = 1</code></pre>");
    }

    #[test]
    fn unclosed_fence_stays_text() {
        let out = code_reply_html("a ```b");
        assert_eq!(out, "<pre><code>a ```b</code></pre>");
    }

    #[test]
    fn split_prefers_newlines_and_respects_limit() {
        let text = format!("{}\n{}", "a".repeat(8), "b".repeat(8));
        let parts = split_message(&text, 10);
        assert_eq!(parts, vec!["a".repeat(8), "b".repeat(8)]);

        let long = "é".repeat(20);
        for part in split_message(&long, 7) {
            assert!(part.len() <= 7);
        }
        assert_eq!(split_message(&long, 7).concat(), long);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn uptime_formats() {
        assert_eq!(format_uptime(Duration::from_secs(65)), "0:01:05");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1 day, 1:01:01");
    }

    #[test]
    fn scheme_is_added_once() {
        assert_eq!(ensure_scheme("example.com"), "https://example.com");
        assert_eq!(ensure_scheme(" http://x.io "), "http://x.io");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }
}
