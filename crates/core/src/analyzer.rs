//! Hook and call-to-action detection over a plain transcript.
//!
//! Everything here is a pure function of its inputs, so running the analysis
//! twice on the same transcript and duration yields identical output.

use crate::types::{CtaFinding, Finding, HookFinding, Sentence, SentenceTiming, Transcript};

/// Only the first few sentences may hold the hook.
pub const HOOK_SCAN_LIMIT: usize = 6;

/// A hook is short and punchy.
pub const HOOK_MAX_WORDS: usize = 12;

/// Matched case-insensitively anywhere in a sentence.
pub const CTA_KEYWORDS: [&str; 9] = [
    "subscribe",
    "buy",
    "download",
    "sign up",
    "click",
    "check out",
    "join",
    "learn more",
    "visit",
];

/// Externally visible text when no CTA sentence was found.
pub const NO_CTA_PLACEHOLDER: &str = "No CTA found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptAnalysis {
    pub transcript: String,
    pub sentences: Vec<Sentence>,
    pub timings: Vec<SentenceTiming>,
    pub hook: HookFinding,
    pub cta: CtaFinding,
}

pub fn analyze(transcript: &Transcript, duration_secs: u64) -> TranscriptAnalysis {
    let normalized = transcript.normalized();
    let sentences = split_sentences(&normalized);
    // Segment timing, when present, is not consumed: proportional timing is
    // the only timestamp source.
    let timings = approximate_timings(&sentences, duration_secs);

    let hook = finding_at(&sentences, &timings, detect_hook(&sentences));
    let cta = finding_at(&sentences, &timings, detect_cta(&sentences));

    TranscriptAnalysis {
        transcript: normalized,
        sentences,
        timings,
        hook,
        cta,
    }
}

/// Split on `.`, `!` and `?`, dropping empty pieces. Order is the sentence index.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, s)| Sentence {
            index,
            text: s.to_string(),
            char_len: s.chars().count(),
        })
        .collect()
}

/// First of the opening sentences with at most [`HOOK_MAX_WORDS`] words,
/// falling back to sentence 0.
pub fn detect_hook(sentences: &[Sentence]) -> Option<usize> {
    if sentences.is_empty() {
        return None;
    }

    sentences
        .iter()
        .take(HOOK_SCAN_LIMIT)
        .find(|s| s.text.split_whitespace().count() <= HOOK_MAX_WORDS)
        .map(|s| s.index)
        .or(Some(0))
}

/// Latest sentence mentioning any of [`CTA_KEYWORDS`].
pub fn detect_cta(sentences: &[Sentence]) -> Option<usize> {
    sentences
        .iter()
        .rev()
        .find(|s| is_call_to_action(&s.text))
        .map(|s| s.index)
}

pub fn is_call_to_action(sentence: &str) -> bool {
    let lowered = sentence.to_lowercase();
    CTA_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Spread `duration_secs` over the sentences in proportion to their length.
///
/// This is a cheap approximation, not derived from speech pacing: sentence
/// `i` starts at `floor(acc / total * duration)` where `acc` is the length of
/// all previous sentences. Adjacent sentences share endpoints, the first
/// starts at 0 and the last ends at `duration_secs`.
pub fn approximate_timings(sentences: &[Sentence], duration_secs: u64) -> Vec<SentenceTiming> {
    let total = sentences.iter().map(|s| s.char_len as u128).sum::<u128>().max(1);
    let duration = duration_secs as u128;
    let at = |accumulated: u128| (accumulated * duration / total) as u64;

    let mut accumulated: u128 = 0;
    sentences
        .iter()
        .map(|s| {
            let start_sec = at(accumulated);
            accumulated += s.char_len as u128;
            SentenceTiming {
                index: s.index,
                start_sec,
                end_sec: at(accumulated),
            }
        })
        .collect()
}

fn finding_at(
    sentences: &[Sentence],
    timings: &[SentenceTiming],
    index: Option<usize>,
) -> Finding {
    match index.and_then(|i| sentences.get(i).zip(timings.get(i))) {
        Some((sentence, timing)) => Finding {
            sentence: Some(sentence.clone()),
            start_sec: Some(timing.start_sec),
        },
        None => Finding::absent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sentences: &[Sentence]) -> Vec<&str> {
        sentences.iter().map(|s| s.text.as_str()).collect()
    }

    fn assert_partition(timings: &[SentenceTiming], duration: u64) {
        assert_eq!(timings[0].start_sec, 0);
        for pair in timings.windows(2) {
            assert_eq!(pair[0].end_sec, pair[1].start_sec);
        }
        for (i, t) in timings.iter().enumerate() {
            assert_eq!(t.index, i);
            assert!(t.start_sec <= t.end_sec);
        }
        assert!(timings.last().unwrap().end_sec <= duration);
    }

    #[test]
    fn splits_on_terminal_punctuation_and_drops_empty_pieces() {
        let sentences = split_sentences("Hi there!! Is this on?  Yes. ");
        assert_eq!(texts(&sentences), vec!["Hi there", "Is this on", "Yes"]);
        assert_eq!(sentences[1].index, 1);
        assert_eq!(sentences[1].char_len, 10);
    }

    #[test]
    fn hook_is_first_short_sentence() {
        let analysis = analyze(
            &Transcript::from_text(
                "Hi there. This changes everything forever and completely. Buy now.",
            ),
            30,
        );
        assert_eq!(analysis.hook.text(), Some("Hi there"));
        assert_eq!(analysis.hook.index(), 0);
        assert_eq!(analysis.hook.start_sec, Some(0));
    }

    #[test]
    fn hook_skips_long_opening_sentences() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen";
        let text = format!("{long}. {long}. Short one here. Another.");
        let sentences = split_sentences(&text);
        assert_eq!(detect_hook(&sentences), Some(2));
    }

    #[test]
    fn hook_falls_back_to_first_sentence_when_opening_is_all_long() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen";
        let text = format!("{long}. {long}. {long}. {long}. {long}. {long}. Short.");
        let sentences = split_sentences(&text);
        assert_eq!(sentences.len(), 7);
        assert_eq!(detect_hook(&sentences), Some(0));
    }

    #[test]
    fn cta_is_latest_matching_sentence() {
        let analysis = analyze(
            &Transcript::from_text("This is great. You should subscribe today. More info here."),
            60,
        );
        assert_eq!(analysis.cta.text(), Some("You should subscribe today"));
        assert_eq!(analysis.cta.index(), 1);

        let sentences = split_sentences("Click below. Then visit our site. Thanks.");
        assert_eq!(detect_cta(&sentences), Some(1));
    }

    #[test]
    fn cta_matching_ignores_case() {
        assert!(is_call_to_action("SIGN UP for the newsletter"));
        assert!(is_call_to_action("Go Check Out the link"));
        assert!(!is_call_to_action("Nothing to see"));
    }

    #[test]
    fn cta_absent_without_action_words() {
        let analysis = analyze(
            &Transcript::from_text("This is a plain statement with no action words."),
            10,
        );
        assert!(!analysis.cta.is_present());
        assert_eq!(analysis.cta.index(), -1);
        assert_eq!(analysis.cta.start_sec, None);
    }

    #[test]
    fn empty_transcript_has_no_findings() {
        let analysis = analyze(&Transcript::from_text("   \n\t "), 120);
        assert!(analysis.sentences.is_empty());
        assert!(analysis.timings.is_empty());
        assert!(!analysis.hook.is_present());
        assert!(!analysis.cta.is_present());
        assert_eq!(analysis.transcript, "");
    }

    #[test]
    fn normalizes_whitespace_before_splitting() {
        let analysis = analyze(&Transcript::from_text("  Hello\n\n  world.\tBye  now. "), 4);
        assert_eq!(analysis.transcript, "Hello world. Bye now.");
        assert_eq!(texts(&analysis.sentences), vec!["Hello world", "Bye now"]);
    }

    #[test]
    fn timings_partition_the_duration() {
        let sentences =
            split_sentences("A. Somewhat longer sentence here. Mid sized one. End of the video.");
        for duration in [0, 1, 7, 59, 61, 3600] {
            let timings = approximate_timings(&sentences, duration);
            assert_eq!(timings.len(), sentences.len());
            assert_partition(&timings, duration);
            assert_eq!(timings.last().unwrap().end_sec, duration);
        }
    }

    #[test]
    fn timings_are_proportional_to_length() {
        let sentences = split_sentences("aaaa. bbbb. cccccccc.");
        let timings = approximate_timings(&sentences, 16);
        let spans: Vec<(u64, u64)> = timings.iter().map(|t| (t.start_sec, t.end_sec)).collect();
        assert_eq!(spans, vec![(0, 4), (4, 8), (8, 16)]);
    }

    #[test]
    fn findings_use_sentence_start_times() {
        let analysis = analyze(&Transcript::from_text("aaaa. bbbb. join us now."), 12);
        assert_eq!(analysis.cta.index(), 2);
        assert_eq!(analysis.cta.start_sec, Some(analysis.timings[2].start_sec));
    }

    #[test]
    fn analysis_is_deterministic() {
        let transcript = Transcript::from_text(
            "Stop scrolling. Here is the trick nobody tells you. Download the app today!",
        );
        assert_eq!(analyze(&transcript, 45), analyze(&transcript, 45));
    }
}
