//! The timestamp-tracking capability.
//!
//! Composed into every stored entity type except `Country`. The store
//! calls [`Timestamped::touch`] as part of each save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last-update instants of a stored entity.
///
/// Both are `None` until the entity is first saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Records a save at `now`. `created` is only ever set once.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.updated = Some(now);
    }
}

pub trait Timestamped {
    fn timestamps(&self) -> &Timestamps;
    fn timestamps_mut(&mut self) -> &mut Timestamps;

    fn touch(&mut self, now: DateTime<Utc>) {
        self.timestamps_mut().touch(now);
    }
}

/// Implements [`Timestamped`] for types with a `timestamps` field.
macro_rules! timestamped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::timestamps::Timestamped for $ty {
                fn timestamps(&self) -> &$crate::timestamps::Timestamps {
                    &self.timestamps
                }

                fn timestamps_mut(&mut self) -> &mut $crate::timestamps::Timestamps {
                    &mut self.timestamps
                }
            }
        )*
    };
}

pub(crate) use timestamped;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn touch_sets_created_once_and_updated_always() {
        let first = Utc.with_ymd_and_hms(2015, 4, 28, 4, 55, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2015, 5, 1, 12, 0, 0).unwrap();

        let mut ts = Timestamps::default();
        ts.touch(first);
        assert_eq!(ts.created, Some(first));
        assert_eq!(ts.updated, Some(first));

        ts.touch(second);
        assert_eq!(ts.created, Some(first));
        assert_eq!(ts.updated, Some(second));
    }
}
