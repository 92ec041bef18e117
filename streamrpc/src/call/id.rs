//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Call identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one call on one connection.
///
/// Ids are only unique per connection: two connections may both carry a
/// `Call(1)`. The client allocates them, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CallId> for u64 {
    fn from(id: CallId) -> Self {
        id.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call({})", self.0)
    }
}

/// Hands out increasing call ids for one client connection.
#[derive(Debug)]
pub(crate) struct CallIdGenerator {
    next: AtomicU64,
}

impl CallIdGenerator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_starts_at_one() {
        let ids = CallIdGenerator::new();
        assert_eq!(ids.next(), CallId::from(1));
        assert_eq!(ids.next(), CallId::from(2));
    }

    #[test]
    fn test_generators_are_independent() {
        let a = CallIdGenerator::new();
        let b = CallIdGenerator::new();
        a.next();
        assert_eq!(b.next().as_u64(), 1);
    }

    #[test]
    fn test_call_id_display() {
        assert_eq!(CallId::from(42).to_string(), "Call(42)");
        assert_eq!(u64::from(CallId::from(42)), 42);
    }
}
