//! Service scope definitions.

use std::fmt;

/// Service scopes controlling instance caching behavior.
///
/// Scopes are ordered by lifetime span: `Singleton < Dependent < Transient`.
/// A service may only depend on services whose scope is less than or equal to
/// its own, so a longer-lived service never captures a shorter-lived one.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Scope;
///
/// assert!(Scope::Singleton < Scope::Dependent);
/// assert!(Scope::Dependent < Scope::Transient);
///
/// // A transient consumer may depend on anything.
/// assert!(Scope::Singleton.can_be_injected_into(Scope::Transient));
/// // A singleton must never capture a transient.
/// assert!(!Scope::Transient.can_be_injected_into(Scope::Singleton));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Scope {
    /// Single instance per container, cached until the container finalizes.
    Singleton,
    /// Single instance per externally supplied [`Context`](crate::Context),
    /// cached until that context is finalized or dropped.
    Dependent,
    /// New instance per resolution, never cached.
    Transient,
}

impl Scope {
    /// Whether a service with this scope may be injected into a consumer of
    /// scope `consumer`.
    #[inline]
    pub fn can_be_injected_into(self, consumer: Scope) -> bool {
        self <= consumer
    }

    /// Whether instances of this scope are cached.
    #[inline]
    pub fn is_cached(self) -> bool {
        !matches!(self, Scope::Transient)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Transient
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Singleton => "singleton",
            Scope::Dependent => "dependent",
            Scope::Transient => "transient",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_total_and_by_lifetime_span() {
        let mut scopes = vec![Scope::Transient, Scope::Singleton, Scope::Dependent];
        scopes.sort();
        assert_eq!(scopes, vec![Scope::Singleton, Scope::Dependent, Scope::Transient]);
    }

    #[test]
    fn injection_matrix() {
        use Scope::*;
        let allowed = [
            (Singleton, Singleton),
            (Singleton, Dependent),
            (Singleton, Transient),
            (Dependent, Dependent),
            (Dependent, Transient),
            (Transient, Transient),
        ];
        for dep in [Singleton, Dependent, Transient] {
            for consumer in [Singleton, Dependent, Transient] {
                assert_eq!(
                    dep.can_be_injected_into(consumer),
                    allowed.contains(&(dep, consumer)),
                    "{} into {}",
                    dep,
                    consumer
                );
            }
        }
    }

    #[test]
    fn default_is_transient() {
        assert_eq!(Scope::default(), Scope::Transient);
        assert!(!Scope::Transient.is_cached());
        assert!(Scope::Dependent.is_cached());
    }
}
