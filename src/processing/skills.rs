//! Skill sets and their provenance

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which detector produced a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillSource {
    FromVocabulary,
    FromNer,
}

/// Provenance of a skill after two skill sets were unioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Vocabulary,
    Ner,
    Both,
}

impl Provenance {
    fn merge(self, other: Provenance) -> Provenance {
        if self == other {
            self
        } else {
            Provenance::Both
        }
    }
}

impl From<SkillSource> for Provenance {
    fn from(source: SkillSource) -> Self {
        match source {
            SkillSource::FromVocabulary => Provenance::Vocabulary,
            SkillSource::FromNer => Provenance::Ner,
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Vocabulary => write!(f, "vocabulary"),
            Provenance::Ner => write!(f, "ner"),
            Provenance::Both => write!(f, "vocabulary+ner"),
        }
    }
}

/// Lower-cased skills found in one document, tagged with the detector that found them.
///
/// Backed by a `BTreeSet` so iteration order is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    source: SkillSource,
    skills: BTreeSet<String>,
}

impl SkillSet {
    pub fn new(source: SkillSource) -> Self {
        Self {
            source,
            skills: BTreeSet::new(),
        }
    }

    pub fn from_skills<I, S>(source: SkillSource, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(source);
        set.extend(skills);
        set
    }

    /// Insert a skill; it is trimmed and lower-cased, empty strings are ignored.
    pub fn insert(&mut self, skill: impl AsRef<str>) -> bool {
        let cleaned = skill.as_ref().trim().to_lowercase();
        if cleaned.is_empty() {
            return false;
        }
        self.skills.insert(cleaned)
    }

    pub fn extend<I, S>(&mut self, skills: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for skill in skills {
            self.insert(skill);
        }
    }

    pub fn source(&self) -> SkillSource {
        self.source
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.skills.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.skills
    }

    /// Number of skills present in both sets
    pub fn intersection_count(&self, other: &SkillSet) -> usize {
        self.skills.intersection(&other.skills).count()
    }

    /// Union of two sets; a skill present in both collapses to one entry
    /// with [`Provenance::Both`].
    pub fn union(&self, other: &SkillSet) -> SkillUnion {
        let mut union = SkillUnion::default();
        union.add(self);
        union.add(other);
        union
    }
}

/// Union of skill sets, remembering which detector contributed each skill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillUnion {
    skills: BTreeMap<String, Provenance>,
}

impl SkillUnion {
    pub fn add(&mut self, set: &SkillSet) {
        let provenance = Provenance::from(set.source());
        for skill in set.iter() {
            self.skills
                .entry(skill.clone())
                .and_modify(|p| *p = p.merge(provenance))
                .or_insert(provenance);
        }
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.skills.contains_key(skill)
    }

    pub fn provenance(&self, skill: &str) -> Option<Provenance> {
        self.skills.get(skill).copied()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Provenance)> {
        self.skills.iter()
    }
}
