//! Line classification against a document's pattern groups.

use tracing::{trace, warn};

use crate::domain::hierarchy::{HierarchyType, PatternGroup, PatternTable};

/// A successful classification of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'l> {
    /// The nesting level, starting at 1 for the shallowest group.
    pub level: u32,
    /// The literal numbering token matched at the start of the line.
    pub token: &'l str,
}

/// Classifies lines of a single document into nesting levels.
///
/// A classifier is bound to one document name and the [`HierarchyType`] that
/// governs it. A document without a usable type still gets a classifier, it
/// just never matches anything.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    groups: Option<&'a [PatternGroup]>,
    document: &'a str,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier for `document`.
    ///
    /// Logs a warning if no hierarchy type is known for the document, or if
    /// the table has no groups for it.
    #[must_use]
    pub fn new(
        table: &'a PatternTable,
        hierarchy_type: Option<HierarchyType>,
        document: &'a str,
    ) -> Self {
        let groups = hierarchy_type.and_then(|ty| table.groups(ty));
        if groups.is_none() {
            warn!("No hierarchy type found for document {document}");
        }
        Self { groups, document }
    }

    /// Whether the classifier has pattern groups to match against.
    #[must_use]
    pub const fn is_typed(&self) -> bool {
        self.groups.is_some()
    }

    /// Classifies a line.
    ///
    /// Levels are checked shallowest first and patterns within a level in
    /// listed order. The first pattern matching at the very start of the line
    /// decides the level, so a shallower level always wins over a deeper one.
    #[must_use]
    pub fn classify<'l>(&self, line: &'l str) -> Option<Match<'l>> {
        let groups = self.groups?;

        for (level, group) in (1..).zip(groups) {
            for pattern in group.patterns() {
                if let Some(found) = pattern.find(line).filter(|m| m.start() == 0) {
                    trace!(
                        "Match found: {} for pattern {} in document {}",
                        found.as_str(),
                        pattern.as_str(),
                        self.document
                    );
                    return Some(Match {
                        level,
                        token: found.as_str(),
                    });
                }
            }
        }

        trace!("No match found for text: {line} in document {}", self.document);
        None
    }

    /// The nesting level of a line, or `0` if it is not a heading.
    #[must_use]
    pub fn level(&self, line: &str) -> u32 {
        self.classify(line).map_or(0, |m| m.level)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn classify(ty: HierarchyType, line: &str) -> Option<(u32, String)> {
        let table = PatternTable::builtin();
        Classifier::new(&table, Some(ty), "test")
            .classify(line)
            .map(|m| (m.level, m.token.to_string()))
    }

    #[test_case("第一章 總則", 1, "第一章"; "chapter")]
    #[test_case("第 三 章 罰則", 1, "第 三 章"; "spaced chapter")]
    #[test_case("第一編 總則", 1, "第一編"; "part")]
    #[test_case("第一節 通則", 2, "第一節"; "section")]
    #[test_case("第 1 條 本法依憲法制定之。", 3, "第 1 條"; "article")]
    #[test_case("第 15-1 條 前條規定", 3, "第 15-1 條"; "inserted article")]
    #[test_case("2 前項情形", 4, "2 "; "paragraph")]
    #[test_case("一、申請人姓名", 5, "一、"; "item")]
    #[test_case("（二）住所", 6, "（二）"; "sub item")]
    #[test_case("(三)居所", 6, "(三)"; "ascii parentheses")]
    fn classifies_statute_lines(line: &str, level: u32, token: &str) {
        assert_eq!(
            classify(HierarchyType::Type1, line),
            Some((level, token.to_string()))
        );
    }

    #[test_case(HierarchyType::Type1, Some(5))]
    #[test_case(HierarchyType::Type2, Some(1))]
    #[test_case(HierarchyType::Type3, Some(2))]
    #[test_case(HierarchyType::Type4, Some(4))]
    #[test_case(HierarchyType::Type5, Some(1))]
    fn same_token_depends_on_type(ty: HierarchyType, level: Option<u32>) {
        assert_eq!(classify(ty, "一、總則").map(|(level, _)| level), level);
    }

    fn custom(levels: &[&[&str]]) -> PatternTable {
        let levels: Vec<Vec<String>> = levels
            .iter()
            .map(|group| group.iter().map(ToString::to_string).collect())
            .collect();
        PatternTable::builtin()
            .with_overrides(&[(HierarchyType::Type2, levels)].into_iter().collect())
            .unwrap()
    }

    #[test]
    fn shallower_level_wins() {
        let table = custom(&[&["^第一"], &["^第一章"]]);
        let classifier = Classifier::new(&table, Some(HierarchyType::Type2), "test");
        assert_eq!(
            classifier.classify("第一章 總則"),
            Some(Match {
                level: 1,
                token: "第一"
            })
        );
    }

    #[test]
    fn first_listed_pattern_in_a_level_wins() {
        let table = custom(&[&["^第一章", "^第一"]]);
        let classifier = Classifier::new(&table, Some(HierarchyType::Type2), "test");
        assert_eq!(classifier.classify("第一章").map(|m| m.token), Some("第一章"));
    }

    #[test]
    fn unanchored_custom_pattern_only_matches_at_start() {
        let table = custom(&[&["章"]]);
        let classifier = Classifier::new(&table, Some(HierarchyType::Type2), "test");
        assert_eq!(classifier.classify("第一章"), None);
        assert_eq!(classifier.level("章名"), 1);
    }

    #[test]
    fn dotted_numbers_are_not_paragraphs() {
        assert_eq!(classify(HierarchyType::Type3, "1. 說明"), Some((5, "1.".to_string())));
        assert_eq!(classify(HierarchyType::Type3, "1 說明"), Some((4, "1 ".to_string())));
    }

    #[test]
    fn match_is_anchored_at_line_start() {
        assert_eq!(classify(HierarchyType::Type1, "依第一章規定辦理"), None);
        assert_eq!(classify(HierarchyType::Type2, "詳見（一）"), None);
    }

    #[test]
    fn roman_items_in_type_5() {
        assert_eq!(classify(HierarchyType::Type5, "ii. 其他"), Some((5, "ii.".to_string())));
        assert_eq!(classify(HierarchyType::Type5, "v. 其他"), None);
    }

    #[test]
    fn untyped_classifier_never_matches() {
        let table = PatternTable::builtin();
        let classifier = Classifier::new(&table, None, "unknown");
        assert!(!classifier.is_typed());
        assert_eq!(classifier.classify("第一章 總則"), None);
        assert_eq!(classifier.level("一、"), 0);
    }

    #[test]
    fn classification_is_deterministic() {
        let table = PatternTable::builtin();
        let classifier = Classifier::new(&table, Some(HierarchyType::Type1), "test");
        for line in ["第一章 總則", "本法所稱主管機關", "", "（一）"] {
            assert_eq!(classifier.classify(line), classifier.classify(line));
        }
    }
}
