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

use crate::call::{Metadata, Status};
use serde::{Deserialize, Serialize};

/// The body of one frame, tagged with the call it belongs to by the framing layer.
///
/// | Kind           | Sent by | Meaning                                           |
/// |----------------|---------|---------------------------------------------------|
/// | `Open`         | client  | starts a call                                     |
/// | `Message`      | both    | one application message                           |
/// | `HalfClose`    | client  | the client will send no more messages             |
/// | `Status`       | server  | terminal status; also ends the server's direction |
/// | `Cancel`       | client  | the caller gave up or its deadline passed         |
/// | `WindowUpdate` | both    | the receiver consumed messages; more may be sent  |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Starts a call.
    Open {
        /// Full method path.
        method: String,
        /// Remaining time until the caller's deadline, in milliseconds.
        timeout_ms: Option<u64>,
        /// Caller metadata.
        metadata: Metadata,
    },
    /// One application message.
    Message {
        /// Position within this direction, starting at 0.
        sequence: u64,
        /// Encoded message.
        payload: Vec<u8>,
    },
    /// The client finished sending.
    HalfClose,
    /// The call is over.
    Status(Status),
    /// The caller abandoned the call.
    Cancel,
    /// The receiver hands back credit for this many more messages.
    WindowUpdate {
        /// Messages consumed since the last update.
        credit: u32,
    },
}

impl FrameKind {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::Open { .. } => "open",
            FrameKind::Message { .. } => "message",
            FrameKind::HalfClose => "half_close",
            FrameKind::Status(_) => "status",
            FrameKind::Cancel => "cancel",
            FrameKind::WindowUpdate { .. } => "window_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{Codec, Serializer};

    #[test]
    fn test_open_frame_over_both_codecs() {
        let open = FrameKind::Open {
            method: "/greet.GreetService/Greet".to_string(),
            timeout_ms: Some(1000),
            metadata: Metadata::new().with("key", "test-run"),
        };
        for codec in [Codec::Postcard, Codec::Json] {
            let bytes = Serializer::serialize(&codec, &open).unwrap();
            let decoded: FrameKind = codec.deserialize(&bytes).unwrap();
            assert_eq!(decoded, open, "codec {}", codec);
        }
    }

    #[test]
    fn test_frame_names() {
        assert_eq!(FrameKind::Cancel.name(), "cancel");
        assert_eq!(FrameKind::Status(Status::ok()).name(), "status");
        assert_eq!(FrameKind::WindowUpdate { credit: 32 }.name(), "window_update");
    }
}
