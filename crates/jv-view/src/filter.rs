//! Filter predicates over journal entries.
//!
//! Every axis is an allow-list; an empty allow-list leaves that axis
//! unrestricted. Setters report which field changed so the owner can
//! invalidate its window explicitly instead of reacting to callbacks.

use std::collections::BTreeSet;

use jv_journal::{LogEntry, Priority};

use crate::error::FilterError;

/// Which filter field a mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterChange {
    Units,
    Exes,
    Boots,
    Kernel,
    Priority,
}

/// Active filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    units: BTreeSet<String>,
    exes: BTreeSet<String>,
    boots: BTreeSet<String>,
    kernel: bool,
    priority: Option<Priority>,
}

fn to_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only show entries whose `_SYSTEMD_UNIT` is one of `units`.
    pub fn set_units<I, S>(&mut self, units: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let units = to_set(units);
        if units == self.units {
            return None;
        }
        self.units = units;
        Some(FilterChange::Units)
    }

    /// Only show entries whose `_EXE` is one of `exes`.
    pub fn set_exes<I, S>(&mut self, exes: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exes = to_set(exes);
        if exes == self.exes {
            return None;
        }
        self.exes = exes;
        Some(FilterChange::Exes)
    }

    /// Only show entries whose `_BOOT_ID` is one of `boots`.
    pub fn set_boots<I, S>(&mut self, boots: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let boots = to_set(boots);
        if boots == self.boots {
            return None;
        }
        self.boots = boots;
        Some(FilterChange::Boots)
    }

    /// Include kernel messages. They are hidden by default.
    pub fn set_kernel(&mut self, enabled: bool) -> Option<FilterChange> {
        if enabled == self.kernel {
            return None;
        }
        self.kernel = enabled;
        Some(FilterChange::Kernel)
    }

    /// Only show entries with this priority or a more severe one.
    pub fn set_priority(&mut self, threshold: u8) -> Result<Option<FilterChange>, FilterError> {
        let priority =
            Priority::from_value(threshold).ok_or(FilterError::PriorityOutOfRange(threshold))?;
        Ok(self.set_priority_level(priority))
    }

    pub fn set_priority_level(&mut self, priority: Priority) -> Option<FilterChange> {
        if self.priority == Some(priority) {
            return None;
        }
        self.priority = Some(priority);
        Some(FilterChange::Priority)
    }

    pub fn reset_priority(&mut self) -> Option<FilterChange> {
        self.priority.take().map(|_| FilterChange::Priority)
    }

    /// Replace every field with `other`'s, returning the fields that changed.
    pub fn replace(&mut self, other: FilterSpec) -> Vec<FilterChange> {
        let mut changes = Vec::new();
        changes.extend(self.set_units(other.units));
        changes.extend(self.set_exes(other.exes));
        changes.extend(self.set_boots(other.boots));
        changes.extend(self.set_kernel(other.kernel));
        if self.priority != other.priority {
            self.priority = other.priority;
            changes.push(FilterChange::Priority);
        }
        changes
    }

    pub fn units(&self) -> &BTreeSet<String> {
        &self.units
    }

    pub fn exes(&self) -> &BTreeSet<String> {
        &self.exes
    }

    pub fn boots(&self) -> &BTreeSet<String> {
        &self.boots
    }

    pub fn kernel_enabled(&self) -> bool {
        self.kernel
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Whether `entry` passes every active predicate.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.unit_allowed(entry)
            && self.exe_allowed(entry)
            && self.boot_allowed(entry)
            && self.priority.is_none_or(|threshold| entry.priority <= threshold)
    }

    fn unit_allowed(&self, entry: &LogEntry) -> bool {
        self.units.is_empty()
            || entry
                .unit
                .as_ref()
                .is_some_and(|unit| self.units.contains(unit))
    }

    // Kernel messages carry no executable; they pass this axis only when
    // kernel messages are enabled, whatever the exe allow-list holds.
    fn exe_allowed(&self, entry: &LogEntry) -> bool {
        if entry.is_kernel() {
            return self.kernel;
        }
        self.exes.is_empty()
            || entry
                .exe
                .as_ref()
                .is_some_and(|exe| self.exes.contains(exe))
    }

    fn boot_allowed(&self, entry: &LogEntry) -> bool {
        self.boots.is_empty() || self.boots.contains(&entry.boot_id)
    }
}
