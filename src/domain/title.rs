use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Ratio above which two normalized titles are the same course.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Sequences at least this long get their most frequent characters excluded
/// from match seeding, as difflib does.
const AUTOJUNK_MIN_LEN: usize = 200;

static MARKER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bg\d\b",
        r"(?i)\bgr(?:\s?[a-z0-9])?\b",
        r"(?i)\bgroupe(?:\s?[a-z0-9])?\b",
        r"(?i)\btp\b",
        r"(?i)\btd\b",
        r"(?i)\bcm\b",
        r"\s-\s.*",
    ]
    .iter()
    .map(|pattern| {
        Regex::new(pattern).unwrap_or_else(|e| panic!("Invalid title marker regex {pattern}: {e}"))
    })
    .collect()
});

pub fn normalize_title(title: &str) -> String {
    let mut cleaned = title.to_lowercase();
    for pattern in MARKER_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

pub fn are_similar(left: &str, right: &str) -> bool {
    let left = normalize_title(left);
    let right = normalize_title(right);
    // The matching-blocks ratio depends on argument order; a canonical order
    // keeps the comparison symmetric.
    let (first, second) = if left <= right {
        (&left, &right)
    } else {
        (&right, &left)
    };
    sequence_ratio(first, second) > SIMILARITY_THRESHOLD
}

/// `2 * M / T` where `M` is the number of characters in matching blocks and
/// `T` the combined length. Two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matcher = SequenceMatcher::new(&a, &b);
    2.0 * matcher.matching_characters() as f64 / total as f64
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    a: usize,
    b: usize,
    size: usize,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (index, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(index);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let popular_above = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= popular_above);
        }
        Self { a, b, b2j }
    }

    fn matching_characters(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let found = self.find_longest_match(alo, ahi, blo, bhi);
            if found.size == 0 {
                continue;
            }
            total += found.size;
            if alo < found.a && blo < found.b {
                queue.push((alo, found.a, blo, found.b));
            }
            if found.a + found.size < ahi && found.b + found.size < bhi {
                queue.push((found.a + found.size, ahi, found.b + found.size, bhi));
            }
        }
        total
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`; ties go to the
    /// block starting earliest in `a`, then earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let mut best = Match {
            a: alo,
            b: blo,
            size: 0,
        };
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let previous = if j == 0 {
                        0
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    };
                    let k = previous + 1;
                    next_j2len.insert(j, k);
                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = next_j2len;
        }

        // Characters dropped from the index as too frequent can still extend
        // a seeded match.
        while best.a > alo && best.b > blo && self.a[best.a - 1] == self.b[best.b - 1] {
            best.a -= 1;
            best.b -= 1;
            best.size += 1;
        }
        while best.a + best.size < ahi
            && best.b + best.size < bhi
            && self.a[best.a + best.size] == self.b[best.b + best.size]
        {
            best.size += 1;
        }
        best
    }
}
