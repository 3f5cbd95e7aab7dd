// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering contracts consumed by the mesh batching lane.
//!
//! Nothing in here draws by itself. The types describe what a graphics device
//! can do ([`GraphicsDevice`]), what an effect and its parameters look like,
//! and how meshes are arranged in the scene. A recording [`HeadlessDevice`]
//! is provided for tools and tests that have no GPU.

pub mod api;
pub mod error;
pub mod headless;
pub mod settings;
pub mod traits;

pub use self::api::*;
pub use self::error::{ResourceError, SettingsError};
pub use self::headless::{DeviceCommand, HeadlessDevice};
pub use self::settings::{BatchSettings, MAX_INSTANCE_BUFFER_CAPACITY};
pub use self::traits::GraphicsDevice;
