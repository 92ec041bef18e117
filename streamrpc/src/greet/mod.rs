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

//! The `greet.GreetService` demonstration service.
//!
//! One method per call shape, plus a slow unary method for exercising
//! deadlines:
//!
//! | Method              | Shape        | Reply                                        |
//! |---------------------|--------------|----------------------------------------------|
//! | `Greet`             | Unary        | `Hello <first>`                              |
//! | `GreetManyTimes`    | ServerStream | `Hello <first> number <i>` for i in 0..10    |
//! | `LongGreet`         | ClientStream | `Hello <first>! ` for every request, joined  |
//! | `GreetEveryone`     | BidiStream   | `Hello <first>! ` per request                |
//! | `GreetWithDeadline` | Unary        | `Hello <first>` after three seconds of work  |

mod client;
mod messages;
mod service;

pub use client::{GreetClient, paced};
pub use messages::{
    GREET, GREET_EVERYONE, GREET_MANY_TIMES, GREET_SERVICE, GREET_WITH_DEADLINE,
    GreetEveryoneRequest, GreetEveryoneResponse, GreetManyTimesRequest, GreetManyTimesResponse,
    GreetRequest, GreetResponse, GreetWithDeadlineRequest, GreetWithDeadlineResponse, Greeting,
    LONG_GREET, LongGreetRequest, LongGreetResponse,
};
pub use service::{GreetService, GreetSettings};
