//! Per-argument conversion policies.
//!
//! A [`PolicyList`] is produced once per bound signature (normally by a code
//! generator) and folded into one [`ArgPolicy`] per argument position when
//! the signature is bound. Conversion then only looks at the folded policy.
//!
//! ```
//! use wirebind_core::{Passing, Policy, PolicyList};
//!
//! let policies = PolicyList::new()
//!     .with(0, Policy::ByValue)
//!     .with(1, Policy::ByConstRef)
//!     .with(1, Policy::Nullable);
//!
//! assert_eq!(policies.for_arg(1).passing, Passing::ConstRef);
//! assert!(policies.for_arg(1).allows_null());
//! assert!(!policies.for_arg(0).allows_null());
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::RegistrationError;

/// How a converted argument relates to the wire value it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Passing {
    /// Copied out of the wire value.
    #[default]
    Value,
    /// Read-only view, valid for the duration of the call.
    ConstRef,
    /// Mutable view, valid for the duration of the call.
    Ref,
    /// Ownership (one reference) moves to the native side.
    Transfer,
}

bitflags! {
    /// Modifier flags of an effective argument policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PolicyFlags: u8 {
        /// A null or void wire value is accepted for optional arguments.
        const NULLABLE = 1 << 0;
        /// No coercion between wire kinds (an int is not a float).
        const STRICT = 1 << 1;
        /// Narrowing numeric conversions truncate instead of failing.
        const LOSSY = 1 << 2;
    }
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One policy tag, as found in a generated policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    ByValue,
    ByConstRef,
    ByRef,
    Transfer,
    Nullable,
    NonNull,
    Strict,
    Lossy,
}

impl Policy {
    /// Name used in generated policy tables.
    pub const fn name(self) -> &'static str {
        match self {
            Policy::ByValue => "ByValue",
            Policy::ByConstRef => "ByConstRef",
            Policy::ByRef => "ByRef",
            Policy::Transfer => "Transfer",
            Policy::Nullable => "Nullable",
            Policy::NonNull => "NonNull",
            Policy::Strict => "Strict",
            Policy::Lossy => "Lossy",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ByValue" => Policy::ByValue,
            "ByConstRef" => Policy::ByConstRef,
            "ByRef" => Policy::ByRef,
            "Transfer" => Policy::Transfer,
            "Nullable" => Policy::Nullable,
            "NonNull" => Policy::NonNull,
            "Strict" => Policy::Strict,
            "Lossy" => Policy::Lossy,
            other => return Err(RegistrationError::UnknownPolicy(other.to_string())),
        })
    }
}

/// The effective policy of one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArgPolicy {
    pub passing: Passing,
    pub flags: PolicyFlags,
}

impl ArgPolicy {
    /// Pass by value with no modifiers.
    pub const BY_VALUE: ArgPolicy = ArgPolicy {
        passing: Passing::Value,
        flags: PolicyFlags::empty(),
    };

    /// Fold one policy tag into this policy. Later tags refine earlier ones.
    pub fn apply(mut self, policy: Policy) -> Self {
        match policy {
            Policy::ByValue => self.passing = Passing::Value,
            Policy::ByConstRef => self.passing = Passing::ConstRef,
            Policy::ByRef => self.passing = Passing::Ref,
            Policy::Transfer => self.passing = Passing::Transfer,
            Policy::Nullable => self.flags.insert(PolicyFlags::NULLABLE),
            Policy::NonNull => self.flags.remove(PolicyFlags::NULLABLE),
            Policy::Strict => self.flags.insert(PolicyFlags::STRICT),
            Policy::Lossy => self.flags.insert(PolicyFlags::LOSSY),
        }
        self
    }

    pub fn allows_null(&self) -> bool {
        self.flags.contains(PolicyFlags::NULLABLE)
    }

    pub fn is_strict(&self) -> bool {
        self.flags.contains(PolicyFlags::STRICT)
    }

    pub fn is_lossy(&self) -> bool {
        self.flags.contains(PolicyFlags::LOSSY)
    }

    pub fn transfers_ownership(&self) -> bool {
        self.passing == Passing::Transfer
    }
}

impl fmt::Display for ArgPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passing = match self.passing {
            Passing::Value => "by-value",
            Passing::ConstRef => "by-const-reference",
            Passing::Ref => "by-reference",
            Passing::Transfer => "transfer",
        };
        f.write_str(passing)?;
        for (name, _) in self.flags.iter_names() {
            write!(f, "+{}", name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Which argument positions a policy entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyTarget {
    /// Every argument of the signature.
    All,
    /// One zero-based argument position.
    Arg(usize),
}

/// Ordered policy entries for one bound signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyList {
    entries: Vec<(PolicyTarget, Policy)>,
}

impl PolicyList {
    /// An empty list: every argument passes by value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy for one argument position.
    pub fn with(mut self, arg: usize, policy: Policy) -> Self {
        self.entries.push((PolicyTarget::Arg(arg), policy));
        self
    }

    /// Append a signature-wide policy.
    pub fn all(mut self, policy: Policy) -> Self {
        self.entries.push((PolicyTarget::All, policy));
        self
    }

    /// Parse a signature-wide policy table such as `["Nullable", "Strict"]`.
    pub fn from_names<'a>(
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RegistrationError> {
        let mut list = Self::new();
        for name in names {
            list = list.all(name.parse()?);
        }
        Ok(list)
    }

    /// Prepend a baseline policy so explicit entries still override it.
    pub fn with_baseline(mut self, baseline: ArgPolicy) -> Self {
        let mut prefix = Vec::new();
        let passing = match baseline.passing {
            Passing::Value => None,
            Passing::ConstRef => Some(Policy::ByConstRef),
            Passing::Ref => Some(Policy::ByRef),
            Passing::Transfer => Some(Policy::Transfer),
        };
        prefix.extend(passing.map(|p| (PolicyTarget::All, p)));
        for (flag, policy) in [
            (PolicyFlags::NULLABLE, Policy::Nullable),
            (PolicyFlags::STRICT, Policy::Strict),
            (PolicyFlags::LOSSY, Policy::Lossy),
        ] {
            if baseline.flags.contains(flag) {
                prefix.push((PolicyTarget::All, policy));
            }
        }
        prefix.append(&mut self.entries);
        self.entries = prefix;
        self
    }

    /// Effective policy for argument `index`.
    ///
    /// Signature-wide entries apply first, then per-argument entries, each
    /// group in list order.
    pub fn for_arg(&self, index: usize) -> ArgPolicy {
        let global = self
            .entries
            .iter()
            .filter(|(target, _)| *target == PolicyTarget::All);
        let local = self
            .entries
            .iter()
            .filter(|(target, _)| *target == PolicyTarget::Arg(index));
        global
            .chain(local)
            .fold(ArgPolicy::default(), |acc, (_, policy)| acc.apply(*policy))
    }

    /// Effective policies for the first `arity` arguments.
    pub fn resolve(&self, arity: usize) -> Vec<ArgPolicy> {
        (0..arity).map(|i| self.for_arg(i)).collect()
    }

    /// Check that no entry targets an argument beyond `arity`.
    pub fn validate(&self, arity: usize) -> Result<(), RegistrationError> {
        for (target, policy) in &self.entries {
            if let PolicyTarget::Arg(index) = target
                && *index >= arity
            {
                return Err(RegistrationError::PolicyOutOfRange {
                    policy: policy.name(),
                    index: *index,
                    arity,
                });
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[(PolicyTarget, Policy)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_by_value() {
        let list = PolicyList::new();
        assert_eq!(list.for_arg(3), ArgPolicy::BY_VALUE);
    }

    #[test]
    fn later_policies_refine_earlier() {
        let list = PolicyList::new()
            .with(0, Policy::Nullable)
            .with(0, Policy::ByConstRef)
            .with(0, Policy::NonNull)
            .with(0, Policy::Transfer);
        let p = list.for_arg(0);
        assert_eq!(p.passing, Passing::Transfer);
        assert!(!p.allows_null());
    }

    #[test]
    fn signature_wide_applies_before_local() {
        let list = PolicyList::new()
            .with(1, Policy::NonNull)
            .all(Policy::Nullable)
            .all(Policy::Strict);
        assert!(list.for_arg(0).allows_null());
        assert!(list.for_arg(0).is_strict());
        assert!(!list.for_arg(1).allows_null());
        assert!(list.for_arg(1).is_strict());
    }

    #[test]
    fn parse_policy_names() {
        let list = PolicyList::from_names(["Nullable", "Strict"]).unwrap();
        assert!(list.for_arg(0).allows_null());
        assert!(list.for_arg(5).is_strict());

        let err = PolicyList::from_names(["Sometimes"]).unwrap_err();
        assert!(err.to_string().contains("Sometimes"));
    }

    #[test]
    fn baseline_is_overridable() {
        let baseline = ArgPolicy::BY_VALUE.apply(Policy::Strict).apply(Policy::Nullable);
        let list = PolicyList::new()
            .with(0, Policy::NonNull)
            .with_baseline(baseline);
        assert!(list.for_arg(0).is_strict());
        assert!(!list.for_arg(0).allows_null());
        assert!(list.for_arg(1).allows_null());
    }

    #[test]
    fn validate_rejects_out_of_range_entries() {
        let list = PolicyList::new().with(2, Policy::Nullable);
        assert!(list.validate(3).is_ok());
        assert!(matches!(
            list.validate(2),
            Err(RegistrationError::PolicyOutOfRange { index: 2, arity: 2, .. })
        ));
    }

    #[test]
    fn display() {
        let p = ArgPolicy::BY_VALUE.apply(Policy::ByConstRef).apply(Policy::Nullable);
        assert_eq!(p.to_string(), "by-const-reference+nullable");
        assert_eq!(ArgPolicy::BY_VALUE.to_string(), "by-value");
    }
}
