//! Character classification for the ink grammar.
//!
//! `CharacterSet` is a plain set of code points. `CharacterRange` describes a
//! contiguous Unicode block minus a handful of excluded points and converts
//! lazily into a set. The identifier alphabet is the union of every supported
//! script range with ASCII letters, digits and underscore, computed once.

use std::collections::HashSet;

use once_cell::sync::Lazy;

// ============================================================================
// CHARACTER SET
// ============================================================================

/// An unordered set of code points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterSet {
    chars: HashSet<char>,
}

impl CharacterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from every character of `chars`.
    pub fn from_chars(chars: &str) -> Self {
        chars.chars().collect()
    }

    /// Builds a set covering `start..=end`.
    pub fn from_range(start: char, end: char) -> Self {
        let mut set = Self::new();
        set.add_range(start, end);
        set
    }

    pub fn add(&mut self, c: char) -> &mut Self {
        self.chars.insert(c);
        self
    }

    pub fn add_range(&mut self, start: char, end: char) -> &mut Self {
        self.chars.extend(start..=end);
        self
    }

    pub fn add_chars(&mut self, chars: &str) -> &mut Self {
        self.chars.extend(chars.chars());
        self
    }

    pub fn union_with(&mut self, other: &CharacterSet) -> &mut Self {
        self.chars.extend(other.chars.iter().copied());
        self
    }

    /// Returns a new set holding the members of both sets.
    pub fn union(&self, other: &CharacterSet) -> CharacterSet {
        let mut set = self.clone();
        set.union_with(other);
        set
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }
}

impl FromIterator<char> for CharacterSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self {
            chars: iter.into_iter().collect(),
        }
    }
}

impl Extend<char> for CharacterSet {
    fn extend<I: IntoIterator<Item = char>>(&mut self, iter: I) {
        self.chars.extend(iter);
    }
}

impl From<&str> for CharacterSet {
    fn from(chars: &str) -> Self {
        Self::from_chars(chars)
    }
}

// ============================================================================
// CHARACTER RANGE
// ============================================================================

/// A contiguous block of code points with optional holes.
#[derive(Debug, Clone)]
pub struct CharacterRange {
    start: char,
    end: char,
    excludes: CharacterSet,
    set: once_cell::unsync::OnceCell<CharacterSet>,
}

impl CharacterRange {
    pub fn define(start: char, end: char, excludes: CharacterSet) -> Self {
        Self {
            start,
            end,
            excludes,
            set: once_cell::unsync::OnceCell::new(),
        }
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn end(&self) -> char {
        self.end
    }

    pub fn excludes(&self) -> &CharacterSet {
        &self.excludes
    }

    /// Expands the range into a set, skipping the excluded points.
    pub fn to_character_set(&self) -> &CharacterSet {
        self.set.get_or_init(|| {
            (self.start..=self.end)
                .filter(|c| !self.excludes.contains(*c))
                .collect()
        })
    }

    pub fn contains(&self, c: char) -> bool {
        (self.start..=self.end).contains(&c) && !self.excludes.contains(c)
    }
}

// ============================================================================
// SUPPORTED SCRIPTS
// ============================================================================

fn excluding(chars: &str) -> CharacterSet {
    CharacterSet::from_chars(chars)
}

/// Letters of the Latin alphabet, without the punctuation between the cases.
pub fn latin_basic() -> CharacterRange {
    CharacterRange::define('\u{0041}', '\u{007A}', CharacterSet::from_range('\u{005B}', '\u{0060}'))
}

pub fn latin_extended_a() -> CharacterRange {
    CharacterRange::define('\u{0100}', '\u{017F}', CharacterSet::new())
}

pub fn latin_extended_b() -> CharacterRange {
    CharacterRange::define('\u{0180}', '\u{024F}', CharacterSet::new())
}

pub fn greek() -> CharacterRange {
    let mut excludes = CharacterSet::from_range('\u{0378}', '\u{0385}');
    excludes.add_chars("\u{0374}\u{0375}\u{0378}\u{0387}\u{038B}\u{038D}\u{03A2}");
    CharacterRange::define('\u{0370}', '\u{03FF}', excludes)
}

pub fn cyrillic() -> CharacterRange {
    CharacterRange::define('\u{0400}', '\u{04FF}', CharacterSet::from_range('\u{0482}', '\u{0489}'))
}

pub fn armenian() -> CharacterRange {
    let mut excludes = excluding("\u{0530}");
    excludes
        .add_range('\u{0557}', '\u{0560}')
        .add_range('\u{0588}', '\u{058E}');
    CharacterRange::define('\u{0530}', '\u{058F}', excludes)
}

pub fn hebrew() -> CharacterRange {
    CharacterRange::define('\u{0590}', '\u{05FF}', CharacterSet::new())
}

pub fn arabic() -> CharacterRange {
    CharacterRange::define('\u{0600}', '\u{06FF}', CharacterSet::new())
}

pub fn korean() -> CharacterRange {
    CharacterRange::define('\u{AC00}', '\u{D7AF}', CharacterSet::new())
}

pub fn latin_1_supplement() -> CharacterRange {
    CharacterRange::define('\u{0080}', '\u{00FF}', CharacterSet::new())
}

pub fn chinese() -> CharacterRange {
    CharacterRange::define('\u{4E00}', '\u{9FFF}', CharacterSet::new())
}

/// Every non-ASCII script allowed in identifiers.
pub fn all_ranges() -> Vec<CharacterRange> {
    vec![
        latin_basic(),
        latin_extended_a(),
        latin_extended_b(),
        greek(),
        cyrillic(),
        armenian(),
        hebrew(),
        arabic(),
        korean(),
        latin_1_supplement(),
        chinese(),
    ]
}

// ============================================================================
// SHARED SETS
// ============================================================================

/// Characters that may appear in an identifier.
pub static IDENTIFIER_CHARS: Lazy<CharacterSet> = Lazy::new(|| {
    let mut set = CharacterSet::new();
    set.add_range('A', 'Z').add_range('a', 'z').add_range('0', '9').add('_');
    for range in all_ranges() {
        set.union_with(range.to_character_set());
    }
    set
});

/// Space and tab.
pub static INLINE_WHITESPACE: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars(" \t"));

pub static DIGITS: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_range('0', '9'));

pub fn is_identifier_char(c: char) -> bool {
    IDENTIFIER_CHARS.contains(c)
}
