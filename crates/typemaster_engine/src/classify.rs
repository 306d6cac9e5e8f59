//! 逐字符比对，用于练习区的实时高亮

use std::iter::Enumerate;
use std::str::Chars;
use typemaster_core::CharClass;

/// 原文中一个字符的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedChar {
    pub index: usize,
    pub expected: char,
    /// 该位置实际输入的字符（未输入为 None）
    pub typed: Option<char>,
    pub class: CharClass,
}

/// 对原文每个字符产出一个分类，惰性且可通过 `clone` 重新开始
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    target: Enumerate<Chars<'a>>,
    input: Chars<'a>,
    input_exhausted: bool,
}

pub fn classify<'a>(target: &'a str, input: &'a str) -> Classifier<'a> {
    Classifier {
        target: target.chars().enumerate(),
        input: input.chars(),
        input_exhausted: false,
    }
}

impl Iterator for Classifier<'_> {
    type Item = ClassifiedChar;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, expected) = self.target.next()?;

        let typed = if self.input_exhausted {
            None
        } else {
            self.input.next()
        };

        let class = match typed {
            Some(ch) if ch == expected => CharClass::Correct,
            Some(_) => CharClass::Incorrect,
            None if !self.input_exhausted => {
                // 第一个未输入的位置就是光标
                self.input_exhausted = true;
                CharClass::CurrentCursor
            }
            None => CharClass::Untyped,
        };

        Some(ClassifiedChar {
            index,
            expected,
            typed,
            class,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.target.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(target: &str, input: &str) -> Vec<CharClass> {
        classify(target, input).map(|c| c.class).collect()
    }

    #[test]
    fn test_empty_input_marks_cursor_at_start() {
        let result = classes("hello world", "");
        assert_eq!(result.len(), 11);
        assert_eq!(result[0], CharClass::CurrentCursor);
        assert!(result[1..].iter().all(|c| *c == CharClass::Untyped));
    }

    #[test]
    fn test_mixed_input() {
        use CharClass::*;
        assert_eq!(
            classes("cat dog", "cbt"),
            vec![Correct, Incorrect, Correct, CurrentCursor, Untyped, Untyped, Untyped]
        );
    }

    #[test]
    fn test_complete_input_has_no_cursor() {
        let result = classes("cat", "cat");
        assert_eq!(result, vec![CharClass::Correct; 3]);
    }

    #[test]
    fn test_typed_char_is_reported() {
        let chars: Vec<_> = classify("ab", "x").collect();
        assert_eq!(chars[0].typed, Some('x'));
        assert_eq!(chars[0].expected, 'a');
        assert_eq!(chars[1].typed, None);
        assert_eq!(chars[1].index, 1);
    }

    #[test]
    fn test_empty_target_yields_nothing() {
        assert_eq!(classify("", "").count(), 0);
    }

    #[test]
    fn test_classifier_restarts_from_clone() {
        let classifier = classify("héllo", "hé");
        let first: Vec<_> = classifier.clone().collect();
        let second: Vec<_> = classifier.collect();
        assert_eq!(first, second);
        assert_eq!(first[2].class, CharClass::CurrentCursor);
    }
}
