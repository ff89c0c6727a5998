//! Rule-based comment spam scoring.
//!
//! Each rule adds a fixed weight; the sum is clamped to `[0, 1]`. A score of
//! [`SPAM_THRESHOLD`] or more marks the comment as spam. Nothing here ever
//! approves a comment: the best possible outcome is `PENDING`.

use std::sync::LazyLock;

use redline_core::{CommentStatus, Email};
use regex::Regex;
use serde::Serialize;

pub const SPAM_THRESHOLD: f64 = 0.7;

const MIN_CONTENT_CHARS: usize = 10;
const MAX_CONTENT_CHARS: usize = 2000;
const MAX_FREE_URLS: usize = 2;
const CAPS_MIN_CHARS: usize = 20;
const CAPS_RATIO: f64 = 0.7;
const REPEATED_RUN: usize = 5;

const W_TOO_SHORT: f64 = 0.3;
const W_TOO_LONG: f64 = 0.5;
const W_PER_EXTRA_URL: f64 = 0.2;
const W_HIGH: f64 = 0.8;
const W_MEDIUM: f64 = 0.15;
const W_LOW: f64 = 0.1;
const W_BAD_EMAIL: f64 = 0.2;
const W_DISPOSABLE: f64 = 0.3;
const W_CAPS: f64 = 0.2;
const W_URL_IN_NAME: f64 = 0.5;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("Invalid regex"))
        .collect()
}

/// Explicit spam vocabulary. Only the first match counts.
static HIGH_SEVERITY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(viagra|cialis|levitra|xanax|valium|tramadol|phentermine|online pharmacy)\b",
        r"(?i)\b(lottery|jackpot|you(?:'ve| have)? won|claim (?:your )?prize|free (?:gift|money|iphone))\b",
        r"(?i)\bclick here\b",
        r"(?i)\b(bitcoin|crypto(?:currency)?|forex|nft)\s+(invest(?:ment|ing)?|trading|profits?|opportunit(?:y|ies))\b",
        r"(?i)\bguaranteed (returns?|profits?|income)\b",
        r"(?i)\b(work|earn money|make money) from home\b",
        r"(?i)\b(online casino|sports betting|payday loans?)\b",
    ])
});

/// Promotional wording and shouty punctuation. Every match counts.
static MEDIUM_SEVERITY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(buy now|order now|act now|limited time|special offer|best price|risk[- ]free|100% free)\b",
        r"(?i)\b(cheap|discount|promo code|coupon)\b",
        r"[!?]{4,}",
    ])
});

/// Generic low-effort praise and superlatives. Every match counts.
static LOW_SEVERITY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(great|nice|awesome|amazing|excellent|good) (post|article|blog|read|content|write-?up)\b",
        r"(?i)\bthanks? (?:you )?for (sharing|the info(?:rmation)?|this post)\b",
        r"(?i)\b(very|really|super) (helpful|informative|useful)\b",
        r"(?i)\b(best|greatest) (ever|in the world)\b",
    ])
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("Invalid regex"));

static NAME_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://|www\.|\.(com|net|org|biz|info|ru|xyz|top|io)\b)")
        .expect("Invalid regex")
});

const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "throwawaymail.com",
    "trashmail.com",
    "getnada.com",
    "sharklasers.com",
    "maildrop.cc",
    "dispostable.com",
    "fakeinbox.com",
];

/// The fields the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct CommentCandidate<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub content: &'a str,
}

/// Classification result. `status` is always `Pending` or `Spam`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpamVerdict {
    pub status: CommentStatus,
    pub score: f64,
    pub reasons: Vec<String>,
}

impl SpamVerdict {
    #[must_use]
    pub fn is_spam(&self) -> bool {
        self.status == CommentStatus::Spam
    }
}

#[derive(Default)]
struct Score {
    total: f64,
    reasons: Vec<String>,
}

impl Score {
    fn add(&mut self, weight: f64, reason: impl Into<String>) {
        self.total += weight;
        self.reasons.push(reason.into());
    }
}

/// Score a comment submission.
#[must_use]
pub fn classify(candidate: &CommentCandidate<'_>) -> SpamVerdict {
    let mut score = Score::default();
    let content = candidate.content;
    let chars = content.chars().count();

    if chars < MIN_CONTENT_CHARS {
        score.add(W_TOO_SHORT, "content too short");
    } else if chars > MAX_CONTENT_CHARS {
        score.add(W_TOO_LONG, "content too long");
    }

    let urls = URL_RE.find_iter(content).count();
    if urls > MAX_FREE_URLS {
        let extra = urls - MAX_FREE_URLS;
        #[allow(clippy::cast_precision_loss)]
        score.add(W_PER_EXTRA_URL * extra as f64, format!("{urls} links"));
    }

    if let Some(m) = HIGH_SEVERITY.iter().find_map(|re| re.find(content)) {
        score.add(W_HIGH, format!("spam keyword: {}", m.as_str().to_lowercase()));
    }

    let medium = MEDIUM_SEVERITY
        .iter()
        .map(|re| re.find_iter(content).count())
        .sum::<usize>()
        + usize::from(has_repeated_run(content, REPEATED_RUN));
    if medium > 0 {
        #[allow(clippy::cast_precision_loss)]
        score.add(W_MEDIUM * medium as f64, format!("{medium} promotional patterns"));
    }

    let low: usize = LOW_SEVERITY
        .iter()
        .map(|re| re.find_iter(content).count())
        .sum();
    if low > 0 {
        #[allow(clippy::cast_precision_loss)]
        score.add(W_LOW * low as f64, format!("{low} generic phrases"));
    }

    if let Some(raw) = candidate.email.map(str::trim).filter(|e| !e.is_empty()) {
        match Email::parse(raw) {
            Ok(email) if is_disposable(email.domain()) => {
                score.add(W_DISPOSABLE, "disposable email domain");
            }
            Ok(_) => {}
            Err(_) => score.add(W_BAD_EMAIL, "malformed email"),
        }
    }

    if chars > CAPS_MIN_CHARS && caps_ratio(content) > CAPS_RATIO {
        score.add(W_CAPS, "excessive capitals");
    }

    if NAME_URL_RE.is_match(candidate.name) {
        score.add(W_URL_IN_NAME, "link in name");
    }

    let total = score.total.clamp(0.0, 1.0);
    let status = if total >= SPAM_THRESHOLD {
        CommentStatus::Spam
    } else {
        CommentStatus::Pending
    };

    SpamVerdict {
        status,
        score: total,
        reasons: score.reasons,
    }
}

fn is_disposable(domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    DISPOSABLE_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
}

/// Uppercase letters over all letters; 0 when there are no letters.
fn caps_ratio(s: &str) -> f64 {
    let (letters, upper) = s
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0_u32, 0_u32), |(l, u), c| (l + 1, u + u32::from(c.is_uppercase())));
    if letters == 0 {
        return 0.0;
    }
    f64::from(upper) / f64::from(letters)
}

/// Whether any non-whitespace character repeats `run` or more times in a row.
fn has_repeated_run(s: &str, run: usize) -> bool {
    let mut prev = None;
    let mut count = 0;
    for c in s.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            prev = Some(c);
            count = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(name: &str, email: Option<&str>, content: &str) -> SpamVerdict {
        classify(&CommentCandidate {
            name,
            email,
            content,
        })
    }

    #[test]
    fn test_generic_praise_stays_pending() {
        let v = verdict("Bob", None, "Great article, thanks for sharing!!!");
        assert_eq!(v.status, CommentStatus::Pending);
        assert!((v.score - 0.2).abs() < 1e-9, "score was {}", v.score);
        assert_eq!(v.reasons, vec!["2 generic phrases".to_string()]);
    }

    #[test]
    fn test_obvious_spam_is_spam() {
        let v = verdict("http://spam.biz", None, "BUY NOW CHEAP VIAGRA CLICK HERE");
        assert_eq!(v.status, CommentStatus::Spam);
        assert!((v.score - 1.0).abs() < f64::EPSILON);
        assert!(v.reasons.iter().any(|r| r == "link in name"));
        assert!(v.reasons.iter().any(|r| r == "excessive capitals"));
    }

    #[test]
    fn test_high_severity_counts_once() {
        let v = verdict(
            "Ann",
            None,
            "viagra cialis and xanax at our online pharmacy, click here",
        );
        assert!(v.is_spam());
        assert_eq!(
            v.reasons
                .iter()
                .filter(|r| r.starts_with("spam keyword"))
                .count(),
            1
        );
    }

    #[test]
    fn test_clean_comment_scores_zero_but_is_not_approved() {
        let v = verdict(
            "Marco",
            Some("marco@example.com"),
            "What boost level were you running on the stock injectors?",
        );
        assert!((v.score - 0.0).abs() < f64::EPSILON);
        assert_eq!(v.status, CommentStatus::Pending);
        assert!(v.reasons.is_empty());
    }

    #[test]
    fn test_link_heavy_comment() {
        let v = verdict(
            "Lee",
            None,
            "see http://a.example http://b.example http://c.example www.d.example now",
        );
        assert!((v.score - 0.4).abs() < 1e-9, "score was {}", v.score);
        assert_eq!(v.status, CommentStatus::Pending);
    }

    #[test]
    fn test_length_penalties() {
        assert!((verdict("A", None, "hi").score - W_TOO_SHORT).abs() < 1e-9);
        let long = "word ".repeat(500);
        assert!((verdict("A", None, &long).score - W_TOO_LONG).abs() < 1e-9);
    }

    #[test]
    fn test_email_penalties() {
        let body = "Which clutch did you use for the track car build?";
        assert!((verdict("A", Some("nope"), body).score - W_BAD_EMAIL).abs() < 1e-9);
        assert!(
            (verdict("A", Some("x@mailinator.com"), body).score - W_DISPOSABLE).abs() < 1e-9
        );
        assert!((verdict("A", Some("  "), body).score).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_characters_count_as_medium() {
        let v = verdict("A", None, "sooooo good, I want one for my car");
        assert!((v.score - W_MEDIUM).abs() < 1e-9, "score was {}", v.score);
    }

    #[test]
    fn test_caps_ratio_needs_enough_content() {
        assert!((verdict("A", None, "WHAT BOOST LEVEL?").score).abs() < 1e-9);
        let shouty = verdict("A", None, "WHAT BOOST LEVEL ARE YOU RUNNING?");
        assert!((shouty.score - W_CAPS).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        let v = verdict(
            "www.win.ru",
            Some("bad"),
            "CLICK HERE!!!! BUY NOW!!!! CHEAP CHEAP CHEAP http://a.x http://b.x http://c.x http://d.x",
        );
        assert!((v.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_helpers() {
        assert!(has_repeated_run("aaaaa", 5));
        assert!(!has_repeated_run("aaaa a", 5));
        assert!(!has_repeated_run("     ", 5));
        assert!((caps_ratio("ABcd") - 0.5).abs() < f64::EPSILON);
        assert!((caps_ratio("1234") - 0.0).abs() < f64::EPSILON);
        assert!(is_disposable("Mailinator.com"));
        assert!(is_disposable("eu.mailinator.com"));
        assert!(!is_disposable("gmail.com"));
    }
}
