//! Composable predicate engine.
//!
//! An [`ObjectFilter`] holds an ordered list of rules and named sub-filters,
//! combined with [`MatchType::All`] or [`MatchType::Any`]. Rules can be added
//! or removed for the duration of a scope through [`TempRule`] guards, which
//! restore the previous rule list on drop (including early returns, `?` and
//! panics).

pub mod rules;

use std::ops::{Deref, DerefMut};
use thiserror::Error;

pub use rules::{LayerRule, Rule};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Rule not found in filter: {0}")]
    RuleNotFound(String),
    #[error("Subfilter not found: {0}")]
    SubfilterNotFound(String),
    #[error("Subfilter already exists: {0}")]
    DuplicateSubfilter(String),
}

/// How the rules and sub-filters of one filter are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// Every rule and sub-filter must match. Vacuously true.
    All,
    /// At least one rule or sub-filter must match. Vacuously false.
    Any,
}

/// Whether removing a rule that is not present is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRule {
    Error,
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFilter<R> {
    match_type: MatchType,
    rules: Vec<R>,
    subfilters: Vec<(String, ObjectFilter<R>)>,
}

impl<R> ObjectFilter<R> {
    pub fn new(match_type: MatchType) -> Self {
        Self {
            match_type,
            rules: Vec::new(),
            subfilters: Vec::new(),
        }
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn rules(&self) -> &[R] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.subfilters.is_empty()
    }

    pub fn add_rule(&mut self, rule: R) {
        self.rules.push(rule);
    }

    pub fn add_subfilter(&mut self, name: &str, filter: ObjectFilter<R>) -> Result<(), FilterError> {
        if self.subfilter(name).is_some() {
            return Err(FilterError::DuplicateSubfilter(name.to_string()));
        }
        self.subfilters.push((name.to_string(), filter));
        Ok(())
    }

    pub fn subfilter(&self, name: &str) -> Option<&ObjectFilter<R>> {
        self.subfilters
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, filter)| filter)
    }

    pub fn subfilter_mut(&mut self, name: &str) -> Result<&mut ObjectFilter<R>, FilterError> {
        self.subfilters
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, filter)| filter)
            .ok_or_else(|| FilterError::SubfilterNotFound(name.to_string()))
    }

    /// Evaluate `item` against the rules and sub-filters (each sub-filter uses
    /// its own match type).
    pub fn is_match<T: ?Sized>(&self, item: &T) -> bool
    where
        R: Rule<T>,
    {
        let mut results = self
            .rules
            .iter()
            .map(|rule| rule.matches(item))
            .chain(self.subfilters.iter().map(|(_, sub)| sub.is_match(item)));

        match self.match_type {
            MatchType::All => results.all(|matched| matched),
            MatchType::Any => results.any(|matched| matched),
        }
    }
}

impl<R: PartialEq + std::fmt::Debug> ObjectFilter<R> {
    pub fn has_rule(&self, rule: &R) -> bool {
        self.rules.contains(rule)
    }

    /// Remove the first occurrence of `rule`.
    pub fn remove_rule(&mut self, rule: &R, missing: MissingRule) -> Result<(), FilterError> {
        match self.take_rule(rule) {
            Some(_) => Ok(()),
            None if missing == MissingRule::Ignore => Ok(()),
            None => Err(FilterError::RuleNotFound(format!("{rule:?}"))),
        }
    }

    fn take_rule(&mut self, rule: &R) -> Option<usize> {
        let index = self.rules.iter().position(|existing| existing == rule)?;
        self.rules.remove(index);
        Some(index)
    }
}

/// Anything that owns a filter and can hand out temporary rule scopes over it.
pub trait FilterOwner<R: PartialEq + std::fmt::Debug> {
    fn filter_mut(&mut self) -> &mut ObjectFilter<R>;

    /// Add `rule` to the top-level filter until the guard drops.
    fn add_rule_temp(&mut self, rule: R) -> TempRule<'_, Self, R>
    where
        Self: Sized,
    {
        let filter = self.filter_mut();
        filter.add_rule(rule);
        let index = filter.rules.len() - 1;
        TempRule {
            owner: self,
            subfilter: None,
            undo: Undo::Added { index },
        }
    }

    /// Add `rule` to the named sub-filter until the guard drops.
    fn add_rule_temp_in(
        &mut self,
        subfilter: &str,
        rule: R,
    ) -> Result<TempRule<'_, Self, R>, FilterError>
    where
        Self: Sized,
    {
        let filter = self.filter_mut().subfilter_mut(subfilter)?;
        filter.add_rule(rule);
        let index = filter.rules.len() - 1;
        Ok(TempRule {
            owner: self,
            subfilter: Some(subfilter.to_string()),
            undo: Undo::Added { index },
        })
    }

    /// Remove `rule` from the top-level filter until the guard drops.
    fn remove_rule_temp(
        &mut self,
        rule: R,
        missing: MissingRule,
    ) -> Result<TempRule<'_, Self, R>, FilterError>
    where
        Self: Sized,
    {
        let undo = removal_undo(self.filter_mut(), rule, missing)?;
        Ok(TempRule {
            owner: self,
            subfilter: None,
            undo,
        })
    }

    /// Remove `rule` from the named sub-filter until the guard drops.
    fn remove_rule_temp_in(
        &mut self,
        subfilter: &str,
        rule: R,
        missing: MissingRule,
    ) -> Result<TempRule<'_, Self, R>, FilterError>
    where
        Self: Sized,
    {
        let undo = removal_undo(self.filter_mut().subfilter_mut(subfilter)?, rule, missing)?;
        Ok(TempRule {
            owner: self,
            subfilter: Some(subfilter.to_string()),
            undo,
        })
    }
}

impl<R: PartialEq + std::fmt::Debug> FilterOwner<R> for ObjectFilter<R> {
    fn filter_mut(&mut self) -> &mut ObjectFilter<R> {
        self
    }
}

fn removal_undo<R: PartialEq + std::fmt::Debug>(
    filter: &mut ObjectFilter<R>,
    rule: R,
    missing: MissingRule,
) -> Result<Undo<R>, FilterError> {
    match filter.take_rule(&rule) {
        Some(index) => Ok(Undo::Removed { rule, index }),
        None if missing == MissingRule::Ignore => Ok(Undo::Nothing),
        None => Err(FilterError::RuleNotFound(format!("{rule:?}"))),
    }
}

#[derive(Debug)]
enum Undo<R> {
    Added { index: usize },
    Removed { rule: R, index: usize },
    Nothing,
}

/// Scope guard returned by the [`FilterOwner`] temporary-rule methods.
///
/// Dereferences to the owner, so the owner can be queried while the
/// temporary rule is in effect.
pub struct TempRule<'a, O, R>
where
    O: FilterOwner<R>,
    R: PartialEq + std::fmt::Debug,
{
    owner: &'a mut O,
    subfilter: Option<String>,
    undo: Undo<R>,
}

impl<O, R> Deref for TempRule<'_, O, R>
where
    O: FilterOwner<R>,
    R: PartialEq + std::fmt::Debug,
{
    type Target = O;

    fn deref(&self) -> &O {
        self.owner
    }
}

impl<O, R> DerefMut for TempRule<'_, O, R>
where
    O: FilterOwner<R>,
    R: PartialEq + std::fmt::Debug,
{
    fn deref_mut(&mut self) -> &mut O {
        self.owner
    }
}

impl<O, R> Drop for TempRule<'_, O, R>
where
    O: FilterOwner<R>,
    R: PartialEq + std::fmt::Debug,
{
    fn drop(&mut self) {
        let root = self.owner.filter_mut();
        let filter = match &self.subfilter {
            Some(name) => match root.subfilter_mut(name) {
                Ok(filter) => filter,
                Err(e) => {
                    log::warn!("Temporary rule scope lost its subfilter: {e}");
                    return;
                }
            },
            None => root,
        };

        match std::mem::replace(&mut self.undo, Undo::Nothing) {
            Undo::Added { index } => {
                if index < filter.rules.len() {
                    filter.rules.remove(index);
                }
            }
            Undo::Removed { rule, index } => {
                let index = index.min(filter.rules.len());
                filter.rules.insert(index, rule);
            }
            Undo::Nothing => {}
        }
    }
}

#[cfg(test)]
#[path = "tests/object_filter_tests.rs"]
mod object_filter_tests;

#[cfg(test)]
#[path = "tests/rules_tests.rs"]
mod rules_tests;
