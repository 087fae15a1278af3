use std::{collections::BTreeMap, fmt, str::FromStr};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The numbering convention a regulation is written in.
///
/// Each type selects an ordered list of [`PatternGroup`]s in a
/// [`PatternTable`]. The same token can sit at different depths in different
/// types (for example `一、` is level 1 in [`HierarchyType::Type2`] but level 5
/// in [`HierarchyType::Type1`]), so the type must be known before a document
/// can be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HierarchyType {
    /// Statutes: `第一編`/`第一章`, `第一節`, `第 1 條`, then numbered items.
    #[serde(rename = "type_1")]
    Type1,
    /// Directives numbered `一、`, `（一）`, `（1）`, `1.`.
    #[serde(rename = "type_2")]
    Type2,
    /// Directives headed by formal numerals `壹、`.
    #[serde(rename = "type_3")]
    Type3,
    /// Regulations with `第一百條` style article numbers.
    #[serde(rename = "type_4")]
    Type4,
    /// Directives whose deepest items use roman numerals `i.`.
    #[serde(rename = "type_5")]
    Type5,
}

impl HierarchyType {
    /// All hierarchy types, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Type1,
        Self::Type2,
        Self::Type3,
        Self::Type4,
        Self::Type5,
    ];

    /// The identifier used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type1 => "type_1",
            Self::Type2 => "type_2",
            Self::Type3 => "type_3",
            Self::Type4 => "type_4",
            Self::Type5 => "type_5",
        }
    }

    /// Pattern sources for this type, one inner slice per level.
    const fn builtin_patterns(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Type1 => &[
                &[
                    r"^第\s*(?:[零一二三四五六七八九十]+\s*)章",
                    r"^第\s*(?:[零一二三四五六七八九十]+\s*)章之[零一二三四五六七八九十]+",
                    r"^第\s*(?:[零一二三四五六七八九十]+\s*)編",
                ],
                &[r"^第\s*(?:[零一二三四五六七八九十]+\s*)節"],
                &[r"^第\s\d+\s條", r"^第\s\d+-\d+\s條"],
                &[r"^\d+\s"],
                &[r"^\s*(?:[一二三四五六七八九十]+\s*)、"],
                &[r"^[（(]\s*(?:[一二三四五六七八九十]+\s*)[）)]"],
            ],
            Self::Type2 => &[
                &[r"^\s*(?:[一二三四五六七八九十]+\s*)、"],
                &[r"^[（(]\s*(?:[一二三四五六七八九十]+\s*)[）)]"],
                &[r"^[（(]\d+[）)]"],
                &[r"^\d+\."],
            ],
            Self::Type3 => &[
                &[r"^\s*[壹貳參肆伍陸柒捌玖拾]+\s*、"],
                &[r"^\s*(?:[一二三四五六七八九十]+\s*)、"],
                &[r"^[（(]\s*(?:[一二三四五六七八九十]+\s*)[）)]"],
                &[r"^\d+\s"],
                &[r"^\d+\."],
                &[r"^[（(]\d+[）)]"],
            ],
            Self::Type4 => &[
                &[r"^第\s*(?:[零一二三四五六七八九十百千]+\s*)+章"],
                &[r"^第\s*(?:[零一二三四五六七八九十百千]+(?:\s*[零一二三四五六七八九十百千]+)*)\s*節"],
                &[r"^第\s*(?:[零一二三四五六七八九十百千]+\s*)+條"],
                &[r"^[一二三四五六七八九十]+、"],
                &[r"^[（(]\s*(?:[一二三四五六七八九十]+\s*)[）)]"],
                &[r"^\d+、"],
            ],
            Self::Type5 => &[
                &[r"^\s*(?:[一二三四五六七八九十]+\s*)、"],
                &[r"^[（(]\s*(?:[一二三四五六七八九十]+\s*)[）)]"],
                &[r"^\d+\."],
                &[r"^[（(]\d+[）)]"],
                &[r"^[iI]{1,4}\."],
            ],
        }
    }
}

impl fmt::Display for HierarchyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown hierarchy type identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown hierarchy type '{0}': expected one of type_1 .. type_5")]
pub struct UnknownHierarchyType(String);

impl FromStr for HierarchyType {
    type Err = UnknownHierarchyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownHierarchyType(s.to_string()))
    }
}

/// A set of equivalent patterns for one nesting level.
///
/// A line matching any pattern in the group is classified at the group's
/// level. Patterns are tried in the order they were listed.
#[derive(Debug, Clone)]
pub struct PatternGroup {
    patterns: Vec<Regex>,
}

impl PatternGroup {
    /// Compiles a group from pattern sources.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the sources is not a valid regular
    /// expression.
    pub fn new<I, S>(sources: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|source| Regex::new(source.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// The compiled patterns, in match order.
    #[must_use]
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }
}

/// Pattern groups for every known [`HierarchyType`].
///
/// The table is immutable once built. It is constructed once per run and
/// shared (by reference) with every classifier.
#[derive(Debug, Clone)]
pub struct PatternTable {
    groups: BTreeMap<HierarchyType, Vec<PatternGroup>>,
}

impl PatternTable {
    /// The built-in table covering all hierarchy types.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile, which is covered by the
    /// test suite.
    #[must_use]
    pub fn builtin() -> Self {
        let groups = HierarchyType::ALL
            .into_iter()
            .map(|ty| {
                let levels = ty
                    .builtin_patterns()
                    .iter()
                    .map(|sources| {
                        PatternGroup::new(sources.iter()).expect("built-in patterns are valid")
                    })
                    .collect();
                (ty, levels)
            })
            .collect();
        Self { groups }
    }

    /// Replaces the groups of the given types with custom pattern sources.
    ///
    /// Each entry of `overrides` lists the pattern sources for one type,
    /// one inner list per level, shallowest first.
    ///
    /// # Errors
    ///
    /// Returns an error if any override pattern fails to compile.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<HierarchyType, Vec<Vec<String>>>,
    ) -> Result<Self, regex::Error> {
        for (&ty, levels) in overrides {
            let groups = levels
                .iter()
                .map(PatternGroup::new)
                .collect::<Result<Vec<_>, _>>()?;
            tracing::debug!("Overriding {} with {} custom levels", ty, groups.len());
            self.groups.insert(ty, groups);
        }
        Ok(self)
    }

    /// The ordered groups for a hierarchy type, shallowest level first.
    #[must_use]
    pub fn groups(&self, hierarchy_type: HierarchyType) -> Option<&[PatternGroup]> {
        self.groups.get(&hierarchy_type).map(Vec::as_slice)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::builtin()
    }
}
