//! Porter suffix-stripping stemmer.
//!
//! Implements the five-step algorithm from M. F. Porter, "An algorithm for suffix stripping"
//! (1980), following the reference C implementation including its two departures
//! (`-bli` → `-ble` and `-logi` → `-log`). Input is expected to be lowercase ASCII; anything else
//! is returned unchanged.
//!
//! This is not NLTK's `PorterStemmer` in its default extended mode, so some stems differ from a
//! model trained with it: "news" becomes "new" here (NLTK keeps "news") and "today" becomes
//! "todai" (NLTK keeps "today").

/// Stem a single lowercase ASCII word.
///
/// Words of two letters or fewer are returned as-is.
pub fn stem(word: &str) -> String {
    if word.len() <= 2 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
        return word.to_string();
    }

    let mut stemmer = Stemmer {
        b: word.as_bytes().to_vec(),
        j: 0,
    };
    stemmer.step1ab();
    if stemmer.b.len() > 1 {
        stemmer.step1c();
        stemmer.step2();
        stemmer.step3();
        stemmer.step4();
        stemmer.step5();
    }

    // Only ASCII letters were ever written into the buffer.
    String::from_utf8(stemmer.b).unwrap_or_else(|_| word.to_string())
}

const STEP2_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("bli", "ble"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
    ("logi", "log"),
];

const STEP3_RULES: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4_SUFFIXES: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou",
    "ism", "ate", "iti", "ous", "ive", "ize",
];

/// Working buffer: `b` holds the word, `j` marks the end (exclusive) of the candidate stem set by
/// the last successful [`Stemmer::ends`] call.
struct Stemmer {
    b: Vec<u8>,
    j: usize,
}

impl Stemmer {
    fn is_consonant(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.is_consonant(i - 1),
            _ => true,
        }
    }

    /// Number of vowel-consonant sequences in `b[..j]`.
    fn measure(&self) -> usize {
        let mut n = 0;
        let mut i = 0;
        let j = self.j;
        loop {
            if i >= j {
                return n;
            }
            if !self.is_consonant(i) {
                break;
            }
            i += 1;
        }
        i += 1;
        loop {
            loop {
                if i >= j {
                    return n;
                }
                if self.is_consonant(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
            n += 1;
            loop {
                if i >= j {
                    return n;
                }
                if !self.is_consonant(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (0..self.j).any(|i| !self.is_consonant(i))
    }

    fn double_consonant(&self, i: usize) -> bool {
        i >= 1 && self.b[i] == self.b[i - 1] && self.is_consonant(i)
    }

    /// Consonant-vowel-consonant ending at `b[end - 1]`, where the last consonant is not w, x or y.
    fn cvc(&self, end: usize) -> bool {
        if end < 3 {
            return false;
        }
        let i = end - 1;
        if !self.is_consonant(i) || self.is_consonant(i - 1) || !self.is_consonant(i - 2) {
            return false;
        }
        !matches!(self.b[i], b'w' | b'x' | b'y')
    }

    fn ends(&mut self, suffix: &str) -> bool {
        let suffix = suffix.as_bytes();
        if suffix.len() > self.b.len() || !self.b.ends_with(suffix) {
            return false;
        }
        self.j = self.b.len() - suffix.len();
        true
    }

    fn set_to(&mut self, replacement: &str) {
        self.b.truncate(self.j);
        self.b.extend_from_slice(replacement.as_bytes());
    }

    fn replace_if_measured(&mut self, replacement: &str) {
        if self.measure() > 0 {
            self.set_to(replacement);
        }
    }

    fn last(&self) -> u8 {
        self.b[self.b.len() - 1]
    }

    /// Plurals and -ed / -ing.
    fn step1ab(&mut self) {
        if self.last() == b's' {
            if self.ends("sses") {
                self.b.truncate(self.b.len() - 2);
            } else if self.ends("ies") {
                self.set_to("i");
            } else if self.b[self.b.len() - 2] != b's' {
                self.b.pop();
            }
        }

        if self.ends("eed") {
            if self.measure() > 0 {
                self.b.pop();
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.b.truncate(self.j);
            if self.ends("at") {
                self.set_to("ate");
            } else if self.ends("bl") {
                self.set_to("ble");
            } else if self.ends("iz") {
                self.set_to("ize");
            } else if self.double_consonant(self.b.len() - 1) {
                if !matches!(self.last(), b'l' | b's' | b'z') {
                    self.b.pop();
                }
            } else if self.measure() == 1 && self.cvc(self.b.len()) {
                self.set_to("e");
            }
        }
    }

    /// Terminal y → i when there is another vowel in the stem.
    fn step1c(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            let last = self.b.len() - 1;
            self.b[last] = b'i';
        }
    }

    fn apply_first_rule(&mut self, rules: &[(&str, &str)]) {
        if let Some((_, replacement)) = rules.iter().find(|(suffix, _)| self.ends(suffix)) {
            self.replace_if_measured(replacement);
        }
    }

    /// Double suffixes → single ones, e.g. -ization → -ize.
    fn step2(&mut self) {
        self.apply_first_rule(STEP2_RULES);
    }

    /// -ic-, -full, -ness and friends.
    fn step3(&mut self) {
        self.apply_first_rule(STEP3_RULES);
    }

    /// Strip -ant, -ence etc. in context <c>vcvc<v>.
    fn step4(&mut self) {
        let Some(suffix) = STEP4_SUFFIXES.iter().copied().find(|suffix| self.ends(suffix)) else {
            return;
        };
        if suffix == "ion" && !(self.j >= 1 && matches!(self.b[self.j - 1], b's' | b't')) {
            return;
        }
        if self.measure() > 1 {
            self.b.truncate(self.j);
        }
    }

    /// Drop a final -e when m > 1 and reduce -ll to -l when m > 1.
    ///
    /// Both checks use the measure of the whole word, taken before anything is removed.
    fn step5(&mut self) {
        self.j = self.b.len();
        let m = self.measure();
        let mut end = self.b.len();
        if self.b[end - 1] == b'e' && (m > 1 || (m == 1 && !self.cvc(end - 1))) {
            end -= 1;
        }
        if self.b[end - 1] == b'l' && self.double_consonant(end - 1) && m > 1 {
            end -= 1;
        }
        self.b.truncate(end);
    }
}
