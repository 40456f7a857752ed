//! Removal of `<think>…</think>` reasoning spans from model output.
//!
//! Reasoning models served through OpenAI-compatible endpoints often inline
//! their chain of thought in the content. The user only wants the answer.

use std::sync::OnceLock;

use regex::Regex;

const OPEN: &str = "<think>";
const CLOSE: &str = "</think>";

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"))
}

/// Strip every complete think span and trim the result.
pub fn sanitize(content: &str) -> String {
    think_block().replace_all(content, "").trim().to_string()
}

/// Streaming counterpart of [`sanitize`].
///
/// Tags may be split across chunks, so a possible partial tag at the end of
/// a chunk is held back until the next chunk decides it. An open span is
/// held until its close tag arrives; if the stream ends first it is released
/// unchanged. Leading and trailing whitespace of the answer is dropped, so
/// the concatenated output equals `sanitize` of the whole text.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    held: String,
    in_think: bool,
    started: bool,
    trailing_ws: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the text that is safe to show.
    pub fn push(&mut self, chunk: &str) -> String {
        self.held.push_str(chunk);
        let mut out = String::new();

        loop {
            if self.in_think {
                // `held` starts with the opening tag.
                match self.held.find(CLOSE) {
                    Some(idx) => {
                        self.held.drain(..idx + CLOSE.len());
                        self.in_think = false;
                    }
                    None => break,
                }
            } else {
                match self.held.find(OPEN) {
                    Some(idx) => {
                        out.push_str(&self.held[..idx]);
                        self.held.drain(..idx);
                        self.in_think = true;
                    }
                    None => {
                        let keep = partial_suffix(&self.held, OPEN);
                        let cut = self.held.len() - keep;
                        out.extend(self.held.drain(..cut));
                        break;
                    }
                }
            }
        }

        self.emit(&out)
    }

    /// Flush held text at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.held);
        self.in_think = false;
        let out = self.emit(&rest);
        self.trailing_ws.clear();
        out
    }

    fn emit(&mut self, text: &str) -> String {
        let text = if self.started { text } else { text.trim_start() };
        let body = text.trim_end();
        if body.is_empty() {
            if self.started {
                self.trailing_ws.push_str(text);
            }
            return String::new();
        }
        self.started = true;
        let mut out = std::mem::take(&mut self.trailing_ws);
        out.push_str(body);
        self.trailing_ws.push_str(&text[body.len()..]);
        out
    }
}

/// Length of the longest proper prefix of `tag` that `text` ends with.
fn partial_suffix(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&k| text.ends_with(&tag[..k]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&str]) -> String {
        let mut filter = ThinkFilter::new();
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&filter.push(chunk));
        }
        out.push_str(&filter.finish());
        out
    }

    #[test]
    fn sanitize_removes_spans() {
        assert_eq!(
            sanitize("<think>\nuser wants ls\n</think>\n\nRun `ls -la`."),
            "Run `ls -la`."
        );
    }

    #[test]
    fn sanitize_is_non_greedy() {
        assert_eq!(
            sanitize("<think>a</think>keep<think>b</think> this"),
            "keep this"
        );
    }

    #[test]
    fn sanitize_leaves_unclosed_tag() {
        assert_eq!(sanitize("  <think>never closed"), "<think>never closed");
    }

    #[test]
    fn filter_passes_plain_text() {
        assert_eq!(run(&["Hello", " world"]), "Hello world");
    }

    #[test]
    fn filter_strips_span_in_one_chunk() {
        assert_eq!(run(&["<think>hmm</think>\n\nAnswer"]), "Answer");
    }

    #[test]
    fn filter_strips_tags_split_across_chunks() {
        assert_eq!(
            run(&["<thi", "nk>reason", "ing</thi", "nk>", "\nThe fix", " is sudo."]),
            "The fix is sudo."
        );
    }

    #[test]
    fn filter_releases_false_partial_tag() {
        assert_eq!(run(&["a <th", "ree"]), "a <three");
        assert_eq!(run(&["ends with <"]), "ends with <");
    }

    #[test]
    fn filter_releases_unterminated_span() {
        assert_eq!(
            run(&["Use the <think> tag", " like this: ls -la"]),
            "Use the <think> tag like this: ls -la"
        );
    }

    #[test]
    fn filter_matches_sanitize_at_every_split() {
        let inputs = [
            "Use the <think> tag like this: ls -la",
            "  <think>\nplan\n</think>\n\nRun `ls`.\n\n",
            "<think>a</think>keep<think>b</think> this <think>open",
            "a </think> b <thin",
            "plain answer with trailing space   ",
        ];
        for input in inputs {
            let expected = sanitize(input);
            for (i, _) in input.char_indices() {
                let (head, tail) = input.split_at(i);
                assert_eq!(run(&[head, tail]), expected, "split {i} of {input:?}");
            }
            let chars: Vec<String> = input.chars().map(String::from).collect();
            let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
            assert_eq!(run(&chunks), expected, "per-char {input:?}");
        }
    }

    #[test]
    fn filter_holds_trailing_whitespace() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.push("one \n"), "one");
        assert_eq!(filter.push("two"), " \ntwo");
        assert_eq!(filter.push("  "), "");
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn filter_keeps_multibyte_text() {
        assert_eq!(run(&["<think>x</think>héllo ", "wörld"]), "héllo wörld");
    }

    #[test]
    fn partial_suffix_lengths() {
        assert_eq!(partial_suffix("abc<thi", OPEN), 4);
        assert_eq!(partial_suffix("abc", OPEN), 0);
        assert_eq!(partial_suffix("x</", CLOSE), 2);
    }
}
