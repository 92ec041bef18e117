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

use crate::call::{MethodDescriptor, MethodShape, ServiceDescriptor};
use serde::{Deserialize, Serialize};

/// A person to greet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    /// First name
    pub first_name: String,
    /// Last name, may be empty
    pub last_name: String,
}

impl Greeting {
    /// A greeting with both names.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// A greeting with only a first name.
    pub fn first(first_name: impl Into<String>) -> Self {
        Self::new(first_name, "")
    }
}

macro_rules! greet_messages {
    ($($request:ident => $response:ident),* $(,)?) => {
        $(
            #[doc = concat!("Request of `", stringify!($request), "`.")]
            #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $request {
                /// Who to greet
                pub greeting: Greeting,
            }

            impl From<Greeting> for $request {
                fn from(greeting: Greeting) -> Self {
                    Self { greeting }
                }
            }

            #[doc = concat!("Response of `", stringify!($request), "`.")]
            #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $response {
                /// The greeting text
                pub result: String,
            }

            impl From<String> for $response {
                fn from(result: String) -> Self {
                    Self { result }
                }
            }
        )*
    };
}

greet_messages! {
    GreetRequest => GreetResponse,
    GreetManyTimesRequest => GreetManyTimesResponse,
    LongGreetRequest => LongGreetResponse,
    GreetEveryoneRequest => GreetEveryoneResponse,
    GreetWithDeadlineRequest => GreetWithDeadlineResponse,
}

/// `Greet`: one greeting in, one greeting out.
pub const GREET: MethodDescriptor = MethodDescriptor::new(
    "/greet.GreetService/Greet",
    MethodShape::Unary,
    "GreetRequest",
    "GreetResponse",
);

/// `GreetManyTimes`: one greeting in, a series of greetings out.
pub const GREET_MANY_TIMES: MethodDescriptor = MethodDescriptor::new(
    "/greet.GreetService/GreetManyTimes",
    MethodShape::ServerStream,
    "GreetManyTimesRequest",
    "GreetManyTimesResponse",
);

/// `LongGreet`: many greetings in, one combined greeting out.
pub const LONG_GREET: MethodDescriptor = MethodDescriptor::new(
    "/greet.GreetService/LongGreet",
    MethodShape::ClientStream,
    "LongGreetRequest",
    "LongGreetResponse",
);

/// `GreetEveryone`: one greeting out per greeting in.
pub const GREET_EVERYONE: MethodDescriptor = MethodDescriptor::new(
    "/greet.GreetService/GreetEveryone",
    MethodShape::BidiStream,
    "GreetEveryoneRequest",
    "GreetEveryoneResponse",
);

/// `GreetWithDeadline`: a slow unary greeting that honours cancellation.
pub const GREET_WITH_DEADLINE: MethodDescriptor = MethodDescriptor::new(
    "/greet.GreetService/GreetWithDeadline",
    MethodShape::Unary,
    "GreetWithDeadlineRequest",
    "GreetWithDeadlineResponse",
);

/// The `greet.GreetService` service.
pub const GREET_SERVICE: ServiceDescriptor = ServiceDescriptor::new(
    "greet.GreetService",
    &[
        GREET,
        GREET_MANY_TIMES,
        LONG_GREET,
        GREET_EVERYONE,
        GREET_WITH_DEADLINE,
    ],
);
