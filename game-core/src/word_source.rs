use anyhow::{Context, Result, anyhow};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::Environment;

/// How many recently drawn answers are avoided while alternatives remain.
pub const RECENT_ANSWER_LIMIT: usize = 20;

pub const DEFAULT_WORD_LENGTH: usize = 5;

/// Built-in list used when no word file is configured.
const DEFAULT_WORDS: &str = "about\nabove\nafter\nagain\nalarm\napple\nbeach\nblack\nbrain\nbread\n\
brown\nchair\ncheck\nclose\ncrane\ncream\ndance\nearly\nearth\nfield\nflame\nfresh\nglass\ngrape\n\
green\nheart\nhouse\nlemon\nlight\nmouse\nmusic\nnight\nocean\nother\nplace\nplane\nplant\nquiet\n\
right\nriver\nround\nscore\nshade\nslate\nsmile\nspeed\nstone\nsugar\ntable\ntoday\ntrain\ntruck\n\
water\nwhich\nworld\nwrong\nyoung";

/// Supplies round answers and answers dictionary lookups.
pub trait WordSource: Send + Sync {
    /// Draw one answer, upper-case.
    fn pick_answer(&self) -> Result<String>;

    fn is_valid_word(&self, word: &str) -> bool;
}

pub struct WordList {
    word_length: usize,
    valid_words: HashSet<String>,
    answers: Vec<String>,
    recent: Mutex<VecDeque<String>>,
    env: Arc<dyn Environment>,
}

impl WordList {
    /// Build from newline-separated lists.
    ///
    /// `answer_list` marks the subset that may be drawn as answers; answers
    /// missing from `word_list` are added to the dictionary. An empty answer
    /// list makes every valid word an answer.
    pub fn from_word_lists(
        word_list: &str,
        answer_list: &str,
        word_length: usize,
        env: Arc<dyn Environment>,
    ) -> Self {
        let mut valid_words: HashSet<String> = parse_words(word_list, word_length).collect();

        let mut answers: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for word in parse_words(answer_list, word_length) {
            if seen.insert(word.clone()) {
                valid_words.insert(word.clone());
                answers.push(word);
            }
        }

        if answers.is_empty() {
            answers = valid_words.iter().cloned().collect();
        }
        // HashSet iteration order is not stable; keep draws reproducible.
        answers.sort();

        Self {
            word_length,
            valid_words,
            answers,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_ANSWER_LIMIT)),
            env,
        }
    }

    /// Load the dictionary (and optionally a separate answer list) from disk.
    pub fn from_files<P: AsRef<Path>>(
        words_file: P,
        answers_file: Option<P>,
        word_length: usize,
        env: Arc<dyn Environment>,
    ) -> Result<Self> {
        let words_path = words_file.as_ref();
        let word_list = std::fs::read_to_string(words_path)
            .with_context(|| format!("Failed to read word list {}", words_path.display()))?;

        let answer_list = match answers_file {
            Some(path) => {
                let path = path.as_ref();
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read answer list {}", path.display()))?
            }
            None => String::new(),
        };

        let list = Self::from_word_lists(&word_list, &answer_list, word_length, env);
        if list.answers.is_empty() {
            return Err(anyhow!(
                "No {}-letter words found in {}",
                word_length,
                words_path.display()
            ));
        }

        info!(
            "Loaded {} words ({} answers) from {}",
            list.word_count(),
            list.answer_count(),
            words_path.display()
        );
        Ok(list)
    }

    /// The built-in list; every word is an answer.
    pub fn with_default_words(env: Arc<dyn Environment>) -> Self {
        Self::from_word_lists(DEFAULT_WORDS, "", DEFAULT_WORD_LENGTH, env)
    }

    pub fn word_length(&self) -> usize {
        self.word_length
    }

    pub fn word_count(&self) -> usize {
        self.valid_words.len()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Check if word contains only alphabetic characters
    pub fn is_alphabetic(word: &str) -> bool {
        !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl WordSource for WordList {
    fn pick_answer(&self) -> Result<String> {
        if self.answers.is_empty() {
            return Err(anyhow!("No answer words available"));
        }

        let mut recent = self
            .recent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let fresh: Vec<&String> = self
            .answers
            .iter()
            .filter(|word| !recent.contains(*word))
            .collect();

        let answer = if fresh.is_empty() {
            self.answers[self.env.random_below(self.answers.len())].clone()
        } else {
            fresh[self.env.random_below(fresh.len())].clone()
        };

        if recent.len() == RECENT_ANSWER_LIMIT {
            recent.pop_front();
        }
        recent.push_back(answer.clone());

        Ok(answer.to_uppercase())
    }

    fn is_valid_word(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        self.valid_words.contains(&word)
    }
}

/// Hands out a fixed sequence of answers in rotation.
pub struct FixedWordSource {
    answers: Vec<String>,
    next: AtomicUsize,
}

impl FixedWordSource {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers
                .into_iter()
                .map(|word| Into::<String>::into(word).to_uppercase())
                .collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl WordSource for FixedWordSource {
    fn pick_answer(&self) -> Result<String> {
        if self.answers.is_empty() {
            return Err(anyhow!("No answer words available"));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.answers.len();
        Ok(self.answers[index].clone())
    }

    fn is_valid_word(&self, word: &str) -> bool {
        let word = word.trim().to_uppercase();
        self.answers.contains(&word)
    }
}

fn parse_words(list: &str, word_length: usize) -> impl Iterator<Item = String> + '_ {
    list.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|word| word.to_lowercase())
        .filter(move |word| word.len() == word_length && WordList::is_alphabetic(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualEnvironment;

    fn env() -> Arc<dyn Environment> {
        Arc::new(ManualEnvironment::seeded(11))
    }

    #[test]
    fn test_word_list_filters() {
        let word_list = "apple\nbanana\n# comment\n\n  Tests  \nab1de\nhello";
        let list = WordList::from_word_lists(word_list, "", 5, env());

        assert!(list.is_valid_word("apple"));
        assert!(list.is_valid_word("APPLE")); // case insensitive
        assert!(list.is_valid_word("tests"));
        assert!(!list.is_valid_word("banana")); // wrong length
        assert!(!list.is_valid_word("ab1de")); // not alphabetic
        assert!(!list.is_valid_word("# comment"));
        assert_eq!(list.word_count(), 3);
    }

    #[test]
    fn test_answers_are_a_marked_subset() {
        let list = WordList::from_word_lists("apple\nhello\nworld", "hello\nzesty", 5, env());

        assert_eq!(list.answer_count(), 2);
        // Answers missing from the dictionary are added to it.
        assert!(list.is_valid_word("zesty"));
        for _ in 0..20 {
            let answer = list.pick_answer().unwrap();
            assert!(answer == "HELLO" || answer == "ZESTY", "{}", answer);
        }
    }

    #[test]
    fn test_empty_answer_list_uses_every_word() {
        let list = WordList::from_word_lists("apple\nhello\nworld", "", 5, env());
        assert_eq!(list.answer_count(), 3);
    }

    #[test]
    fn test_empty_word_list() {
        let list = WordList::from_word_lists("", "", 5, env());
        assert!(!list.is_valid_word("hello"));

        let result = list.pick_answer();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No answer words"));
    }

    #[test]
    fn test_recent_answers_are_avoided() {
        let list = WordList::from_word_lists("apple\nhello\nworld\nstone", "", 5, env());

        let mut drawn: Vec<String> = (0..4).map(|_| list.pick_answer().unwrap()).collect();
        drawn.sort();
        assert_eq!(drawn, vec!["APPLE", "HELLO", "STONE", "WORLD"]);

        // Once everything is recent, draws still succeed.
        assert!(list.pick_answer().is_ok());
    }

    #[test]
    fn test_default_words() {
        let list = WordList::with_default_words(env());
        assert!(list.answer_count() > 50);
        assert_eq!(list.word_length(), 5);

        let answer = list.pick_answer().unwrap();
        assert_eq!(answer.len(), 5);
        assert!(list.is_valid_word(&answer));
        assert_eq!(answer, answer.to_uppercase());
    }

    #[test]
    fn test_fixed_source_rotates() {
        let source = FixedWordSource::new(["apple", "crane"]);

        assert_eq!(source.pick_answer().unwrap(), "APPLE");
        assert_eq!(source.pick_answer().unwrap(), "CRANE");
        assert_eq!(source.pick_answer().unwrap(), "APPLE");
        assert!(source.is_valid_word("Crane"));
        assert!(!source.is_valid_word("stone"));
        assert!(FixedWordSource::new(Vec::<String>::new()).pick_answer().is_err());
    }

    #[test]
    fn test_is_alphabetic() {
        assert!(WordList::is_alphabetic("hello"));
        assert!(!WordList::is_alphabetic("hello123"));
        assert!(!WordList::is_alphabetic("hello-world"));
        assert!(!WordList::is_alphabetic(""));
        assert!(!WordList::is_alphabetic(" "));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = WordList::from_files("/definitely/not/here.txt", None, 5, env());
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("Failed to read word list"));
    }

    #[test]
    fn test_from_files() {
        let dir = std::env::temp_dir().join(format!("word-list-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let words = dir.join("words.txt");
        let answers = dir.join("answers.txt");
        std::fs::write(&words, "apple\nhello\nworld\n").unwrap();
        std::fs::write(&answers, "world\n").unwrap();

        let list = WordList::from_files(&words, Some(&answers), 5, env()).unwrap();
        assert_eq!(list.word_count(), 3);
        assert_eq!(list.pick_answer().unwrap(), "WORLD");

        std::fs::remove_dir_all(&dir).ok();
    }
}
