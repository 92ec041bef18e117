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

use std::fmt;

/// Half-close state of a session, seen from the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Both directions are open.
    Open,
    /// The local side closed its sending direction; the peer may still send.
    HalfClosedBySelf,
    /// The peer closed its sending direction; the local side may still send.
    HalfClosedByPeer,
    /// Both directions are closed or the call has a terminal status.
    Closed,
}

impl StreamState {
    /// Derives the state from the two direction flags and whether the call
    /// already has a terminal status.
    pub(crate) fn from_flags(send_closed: bool, recv_closed: bool, finished: bool) -> Self {
        match (finished, send_closed, recv_closed) {
            (true, _, _) | (false, true, true) => StreamState::Closed,
            (false, true, false) => StreamState::HalfClosedBySelf,
            (false, false, true) => StreamState::HalfClosedByPeer,
            (false, false, false) => StreamState::Open,
        }
    }

    /// `true` if the local side may still send.
    pub fn can_send(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedByPeer)
    }

    /// `true` if more messages may still arrive.
    pub fn can_receive(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedBySelf)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamState::Open => "open",
            StreamState::HalfClosedBySelf => "half-closed-by-self",
            StreamState::HalfClosedByPeer => "half-closed-by-peer",
            StreamState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(StreamState::from_flags(false, false, false), StreamState::Open);
        assert_eq!(StreamState::from_flags(true, false, false), StreamState::HalfClosedBySelf);
        assert_eq!(StreamState::from_flags(false, true, false), StreamState::HalfClosedByPeer);
        assert_eq!(StreamState::from_flags(true, true, false), StreamState::Closed);
        assert_eq!(StreamState::from_flags(false, false, true), StreamState::Closed);
    }

    #[test]
    fn test_direction_predicates() {
        assert!(StreamState::HalfClosedByPeer.can_send());
        assert!(!StreamState::HalfClosedByPeer.can_receive());
        assert!(!StreamState::HalfClosedBySelf.can_send());
        assert!(!StreamState::Closed.can_receive());
    }
}
