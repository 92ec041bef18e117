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

//! JSON wire format, mainly useful when inspecting traffic by hand.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// [`Serializer`] backed by `serde_json`.
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Creates a serializer producing compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Produces indented JSON instead.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Greeting {
        first_name: String,
        last_name: String,
    }

    #[test]
    fn test_json_is_readable() {
        let serializer = JsonSerializer::new();
        let bytes = serializer
            .serialize(&Greeting {
                first_name: "Pavan".into(),
                last_name: "Tikkani".into(),
            })
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"first_name":"Pavan","last_name":"Tikkani"}"#
        );
    }

    #[test]
    fn test_json_pretty_output_decodes() {
        let serializer = JsonSerializer::new().pretty();
        let greeting = Greeting {
            first_name: "Roy".into(),
            last_name: String::new(),
        };
        let bytes = serializer.serialize(&greeting).unwrap();
        assert!(bytes.contains(&b'\n'));
        let decoded: Greeting = serializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, greeting);
    }

    #[test]
    fn test_json_rejects_wrong_shape() {
        let serializer = JsonSerializer::new();
        let result: Result<Greeting, _> = serializer.deserialize(b"[1,2,3]");
        assert!(result.is_err());
    }
}
