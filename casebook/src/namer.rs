//! Sub-case naming.
//!
//! Each group owns a counter that starts at zero and is bumped once per
//! call, so the n-th call in a group is always named `group#n`.

use std::collections::HashMap;

/// Hands out `group#n` names with one monotonic counter per group.
///
/// Counters are created lazily on first use and are never reset or reused
/// while the namer lives. They are 64 bits wide, so a group cannot run out
/// of names within any realistic test; the count would saturate at
/// `u64::MAX`.
///
/// # Examples
///
/// ```
/// use casebook::CallNamer;
///
/// let mut namer = CallNamer::default();
/// assert_eq!(namer.name_for("add"), "add#1");
/// assert_eq!(namer.name_for("add"), "add#2");
/// assert_eq!(namer.name_for("sub"), "sub#1");
/// ```
#[derive(Debug, Default)]
pub struct CallNamer {
    counters: HashMap<String, u64>,
}

impl CallNamer {
    /// Advances the counter for `group` and returns the resulting name.
    pub fn name_for(&mut self, group: &str) -> String {
        let counter = self.counters.entry(group.to_owned()).or_default();
        *counter = counter.saturating_add(1);
        format!("{group}#{counter}")
    }

    /// Returns how many names have been issued for `group`.
    #[must_use]
    pub fn calls(&self, group: &str) -> u64 {
        self.counters.get(group).copied().unwrap_or_default()
    }
}
